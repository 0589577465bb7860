//! Hard faults: the top error tier (§7). Unlike `CmError` rejections or
//! `ExitCode` soft faults, a hard fault latches the loop — no further motion
//! is admitted until an explicit reset clears it.

use thiserror::Error;

/// Raised by the periodic sentinel-assertion callback or by an explicit
/// ownership/invariant check in the stepper driver or planner.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum HardFault {
    /// A `MotionBlock`, `Segment`, or prep/run slot sentinel no longer reads
    /// its magic constant.
    #[error("sentinel magic constant corrupted")]
    SentinelCorrupted,
    /// The prep/run slot was written to by the wrong side of the handoff.
    #[error("prep/run slot ownership violation")]
    PrepBufferOwnershipViolation,
    /// A planner or executor invariant (§8) was violated.
    #[error("planner or executor invariant violated")]
    InvariantViolation,
    /// The operator requested an immediate abort (`^X`); latched the same
    /// way a corruption fault is, since resuming without an explicit reset
    /// would silently continue a program the operator just canceled.
    #[error("motion aborted by operator")]
    Aborted,
}
