//! The planner's unit of work: a single line move between two resolved
//! target positions, along with the entry/cruise/exit velocities the
//! planner has negotiated for it.

use crate::axis::MAX_AXES;

/// What a block asks the machine to do. `Line` is the only kind that
/// consumes the jerk-limited profile; the others pass through the ring so
/// ordering against motion is preserved without being replanned.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum MoveKind {
    Line,
    Dwell,
    Command,
}

/// How the block is allowed to blend into its successor at the junction.
/// Mirrors G61 (exact path), G61.1 (exact stop) and G64 (continuous/blend).
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PathControl {
    /// G64: blend through the junction at the computed junction velocity.
    Continuous,
    /// G61: like continuous, but the junction velocity additionally respects
    /// a configured cornering tolerance (approximated here the same as
    /// `Continuous`; the distinction is carried for callers/CM bookkeeping).
    ExactPath,
    /// G61.1/G90.1 exact stop: the block must decelerate to zero at its end
    /// regardless of what follows.
    ExactStop,
}

/// Lifecycle of a ring slot. The planner may mutate a block only while it is
/// `Queued`; once `Running` the segment executor owns it exclusively.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum BlockState {
    /// Slot is free and holds no meaningful data.
    Empty,
    /// Block has been written by `plan_move` but not yet replanned.
    Queued,
    /// The segment executor is actively emitting segments for this block.
    Running,
    /// The block has finished emitting segments and awaits retirement once
    /// the stepper runtime confirms the corresponding steps have landed.
    Pending,
}

/// A single planned move in the ring.
#[derive(Debug, Copy, Clone)]
pub struct MotionBlock {
    pub state: BlockState,
    pub kind: MoveKind,
    pub path_control: PathControl,

    /// Unit vector of travel in axis space (zero for non-`Line` kinds).
    pub unit_vector: [f32; MAX_AXES],
    /// Euclidean length of the move in the caller's units.
    pub length: f32,

    /// Velocity this move was requested at (the active feedrate), already
    /// clamped to the move's own velocity limit.
    pub requested_cruise: f32,
    /// Cap on this block's entry velocity imposed by the junction with the
    /// previous block, computed once at admission time.
    pub entry_cap: f32,

    pub planned_entry: f32,
    pub planned_cruise: f32,
    pub planned_exit: f32,

    /// Per-axis-scaled limits for this specific move (see `scaled_limit`).
    pub velocity_limit: f32,
    pub accel_limit: f32,
    pub jerk_limit: f32,

    /// Dwell duration in seconds; meaningful only for `MoveKind::Dwell`.
    pub dwell_seconds: f32,

    /// Seven-phase profile timings, filled in by `finalize_profile`.
    pub t_j1: f32,
    pub t_a: f32,
    pub t_j2: f32,
    pub t_c: f32,
    pub t_j3: f32,
    pub t_d: f32,
    pub t_j4: f32,
}

impl Default for MotionBlock {
    fn default() -> Self {
        Self {
            state: BlockState::Empty,
            kind: MoveKind::Line,
            path_control: PathControl::Continuous,
            unit_vector: [0.0; MAX_AXES],
            length: 0.0,
            requested_cruise: 0.0,
            entry_cap: 0.0,
            planned_entry: 0.0,
            planned_cruise: 0.0,
            planned_exit: 0.0,
            velocity_limit: 0.0,
            accel_limit: 0.0,
            jerk_limit: 0.0,
            dwell_seconds: 0.0,
            t_j1: 0.0,
            t_a: 0.0,
            t_j2: 0.0,
            t_c: 0.0,
            t_j3: 0.0,
            t_d: 0.0,
            t_j4: 0.0,
        }
    }
}

impl MotionBlock {
    /// Total duration of the seven-phase profile, in seconds.
    pub fn total_time(&self) -> f32 {
        self.t_j1 + self.t_a + self.t_j2 + self.t_c + self.t_j3 + self.t_d + self.t_j4
    }
}
