//! Cycle state and the fixed exit-code enumeration returned by cycle
//! continuations and controller-loop callbacks (§6/§7).

/// What kind of cycle, if any, currently owns the motion pipeline.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum CycleState {
    #[default]
    Off,
    Machining,
    Homing,
    Probe,
    Jog,
    HoldRequested,
    Held,
}

/// The fixed result enumeration every cycle continuation and controller
/// callback returns. `Ok`/`Eagain`/`Noop`/`Complete` are control-flow
/// results; the rest are soft faults reported up to the caller.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ExitCode {
    Ok,
    /// Not ready yet; call again next tick.
    Eagain,
    /// Nothing to do this tick.
    Noop,
    /// The cycle or operation finished successfully.
    Complete,
    FeedrateMissing,
    AxisMissing,
    AxisNotAllowed,
    SoftLimitExceeded,
    MinLength,
    MinTime,
    HomingFailed,
    ProbeFailed,
    QueueFull,
    InternalError,
    MemoryFault,
}
