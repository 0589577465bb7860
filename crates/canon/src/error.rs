use thiserror::Error;

/// Rejections returned by canonical-machine setters. Never raised from a
/// panic; every setter validates before touching model state.
#[derive(Debug, Error, Clone, Copy, PartialEq)]
pub enum CmError {
    #[error("feedrate is required in this feedrate mode but was not set")]
    FeedrateMissing,
    #[error("move requires at least one participating axis")]
    AxisMissing,
    #[error("axis {0:?} is not allowed for this command")]
    AxisNotAllowed(tinyg_motion::Axis),
    #[error("commanded position exceeds axis {0:?}'s travel extent")]
    SoftLimitExceeded(tinyg_motion::Axis),
    #[error("coordinate system index {0} is out of range")]
    CoordinateSystemOutOfRange(u8),
    #[error("cannot start a cycle while another cycle is active")]
    CycleAlreadyActive,
    #[error("cannot start a cycle while the planner is not idle")]
    PlannerNotIdle,
    #[error("axis {0:?} has no homing switch configured")]
    NoHomingSwitch(tinyg_motion::Axis),
    #[error("axis {0:?} has more than one homing switch configured")]
    MultipleHomingSwitches(tinyg_motion::Axis),
    #[error("zero search velocity configured for axis {0:?}")]
    ZeroSearchVelocity(tinyg_motion::Axis),
    #[error("zero travel limit configured for axis {0:?}")]
    ZeroTravelLimit(tinyg_motion::Axis),
}
