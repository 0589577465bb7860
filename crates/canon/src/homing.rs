//! Homing and probing: continuation-style cycles that dispatch one motion
//! request per controller tick rather than blocking the loop.
//!
//! Each cycle holds its position in a small state machine instead of a
//! function pointer — the "continuation binding" the governing design
//! calls for is realized here as an enum discriminant plus a `next`
//! method, which is the same idea with less unsafe plumbing.

use crate::axis_config::AxisConfig;
use crate::cycle::ExitCode;
use crate::error::CmError;
use heapless::Vec as HVec;
use tinyg_motion::{Axis, MotionPlanner, PathControl, MAX_AXES};

/// Per-axis progress through the homing sequence of §4.7.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum HomingStep {
    /// If the switch is already closed, back off by `zero_offset` at latch
    /// velocity before searching.
    InitialBackoff,
    /// Move by `-travel` at search velocity; expected to hit the switch.
    Search,
    /// Move by `+zero_offset` at search velocity, off the switch.
    SearchBackoff,
    /// Move by `-2*zero_offset` at latch velocity; expected to hit again.
    Latch,
    /// Move by `+zero_offset` at latch velocity.
    LatchBackoff,
    /// This axis is done; advance to the next one in `axis_order`.
    NextAxis,
    /// All axes done: move to the configured way-point.
    TraverseToWaypoint,
    /// Move from the way-point to work-zero.
    TraverseToWorkZero,
    Done,
}

/// Drives the per-axis homing search/latch/backoff sequence across the
/// user-specified axis order, one motion request per `next` call.
pub struct HomingCycle {
    axis_order: HVec<Axis, MAX_AXES>,
    axis_cursor: usize,
    step: HomingStep,
    /// True once the current step's block has been enqueued and the
    /// cycle is waiting for it (and any feedhold it induces) to resolve.
    awaiting_move: bool,
    waypoint: [f32; MAX_AXES],
    work_zero: [f32; MAX_AXES],
}

impl HomingCycle {
    pub fn new(
        axis_order: &[Axis],
        waypoint: [f32; MAX_AXES],
        work_zero: [f32; MAX_AXES],
    ) -> Result<Self, CmError> {
        if axis_order.is_empty() {
            return Err(CmError::AxisMissing);
        }
        let mut order = HVec::new();
        for axis in axis_order {
            let _ = order.push(*axis);
        }
        Ok(Self {
            axis_order: order,
            axis_cursor: 0,
            step: HomingStep::InitialBackoff,
            awaiting_move: false,
            waypoint,
            work_zero,
        })
    }

    fn current_axis(&self) -> Option<Axis> {
        self.axis_order.get(self.axis_cursor).copied()
    }

    /// Advances the cycle by at most one tick. `switch_triggered` reflects
    /// the debounced state of the current axis's homing switch;
    /// `planner_idle` is true once the planner has fully drained the last
    /// enqueued block (and the stepper runtime has retired it).
    pub fn next(
        &mut self,
        planner: &mut MotionPlanner,
        axis_configs: &[AxisConfig; MAX_AXES],
        switch_triggered: bool,
        planner_idle: bool,
    ) -> Result<ExitCode, CmError> {
        if self.awaiting_move {
            if !planner_idle {
                return Ok(ExitCode::Eagain);
            }
            self.awaiting_move = false;
        }

        let Some(axis) = self.current_axis() else {
            return Ok(ExitCode::Complete);
        };

        match self.step {
            HomingStep::InitialBackoff => {
                let config = &axis_configs[axis.index()];
                self.validate(axis, config)?;
                if switch_triggered {
                    self.dispatch(planner, axis, config.homing_search_backoff, config.homing_latch_velocity);
                }
                self.step = HomingStep::Search;
                Ok(ExitCode::Ok)
            }
            HomingStep::Search => {
                let config = &axis_configs[axis.index()];
                self.dispatch(planner, axis, -(config.travel_max - config.travel_min), config.homing_search_velocity);
                self.step = HomingStep::SearchBackoff;
                Ok(ExitCode::Ok)
            }
            HomingStep::SearchBackoff => {
                if !switch_triggered {
                    return Ok(ExitCode::HomingFailed);
                }
                let config = &axis_configs[axis.index()];
                self.dispatch(planner, axis, config.homing_search_backoff, config.homing_search_velocity);
                self.step = HomingStep::Latch;
                Ok(ExitCode::Ok)
            }
            HomingStep::Latch => {
                let config = &axis_configs[axis.index()];
                self.dispatch(planner, axis, -2.0 * config.homing_latch_backoff, config.homing_latch_velocity);
                self.step = HomingStep::LatchBackoff;
                Ok(ExitCode::Ok)
            }
            HomingStep::LatchBackoff => {
                if !switch_triggered {
                    return Ok(ExitCode::HomingFailed);
                }
                let config = &axis_configs[axis.index()];
                self.dispatch(planner, axis, config.homing_latch_backoff, config.homing_latch_velocity);
                self.step = HomingStep::NextAxis;
                Ok(ExitCode::Ok)
            }
            HomingStep::NextAxis => {
                self.axis_cursor += 1;
                self.step = if self.current_axis().is_some() {
                    HomingStep::InitialBackoff
                } else {
                    HomingStep::TraverseToWaypoint
                };
                Ok(ExitCode::Ok)
            }
            HomingStep::TraverseToWaypoint => {
                planner
                    .plan_move(self.waypoint, rapid_feedrate(axis_configs), PathControl::ExactStop)
                    .map_err(|_| CmError::PlannerNotIdle)?;
                self.awaiting_move = true;
                self.step = HomingStep::TraverseToWorkZero;
                Ok(ExitCode::Ok)
            }
            HomingStep::TraverseToWorkZero => {
                planner
                    .plan_move(self.work_zero, rapid_feedrate(axis_configs), PathControl::ExactStop)
                    .map_err(|_| CmError::PlannerNotIdle)?;
                self.awaiting_move = true;
                self.step = HomingStep::Done;
                Ok(ExitCode::Ok)
            }
            HomingStep::Done => Ok(ExitCode::Complete),
        }
    }

    fn validate(&self, axis: Axis, config: &AxisConfig) -> Result<(), CmError> {
        if config.homing_search_velocity <= 0.0 {
            return Err(CmError::ZeroSearchVelocity(axis));
        }
        if config.travel_max <= config.travel_min {
            return Err(CmError::ZeroTravelLimit(axis));
        }
        Ok(())
    }

    fn dispatch(&mut self, planner: &mut MotionPlanner, axis: Axis, delta: f32, feedrate: f32) {
        let mut target = planner.position();
        target[axis.index()] += delta;
        let _ = planner.plan_move(target, feedrate, PathControl::ExactStop);
        self.awaiting_move = true;
    }

    pub fn is_done(&self) -> bool {
        matches!(self.step, HomingStep::Done)
    }
}

fn rapid_feedrate(axis_configs: &[AxisConfig; MAX_AXES]) -> f32 {
    axis_configs.iter().map(|c| c.max_feedrate).fold(0.0f32, f32::max)
}

/// The result of a completed probe cycle.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum ProbeOutcome {
    /// The probe switch closed; the captured position is the contact
    /// point.
    Contact([f32; MAX_AXES]),
    /// Search travel was exhausted without a contact.
    NoContact,
}

/// G38.2-style probing: travels toward a target until the probe switch
/// closes, then cancels the remainder of the move and reports the
/// commanded position at the moment of contact.
pub struct ProbeCycle {
    target: [f32; MAX_AXES],
    feedrate: f32,
    dispatched: bool,
    outcome: Option<ProbeOutcome>,
}

impl ProbeCycle {
    /// Refuses ABC-axis targets and moves shorter than `min_length`.
    pub fn new(
        current: [f32; MAX_AXES],
        target: [f32; MAX_AXES],
        feedrate: f32,
        min_length: f32,
    ) -> Result<Self, CmError> {
        for axis in [Axis::A, Axis::B, Axis::C] {
            if (target[axis.index()] - current[axis.index()]).abs() > f32::EPSILON {
                return Err(CmError::AxisNotAllowed(axis));
            }
        }
        if feedrate <= 0.0 {
            return Err(CmError::FeedrateMissing);
        }
        let mut sum_sq = 0.0;
        for i in 0..MAX_AXES {
            let d = target[i] - current[i];
            sum_sq += d * d;
        }
        if sum_sq.sqrt() < min_length {
            return Err(CmError::AxisMissing);
        }
        Ok(Self {
            target,
            feedrate,
            dispatched: false,
            outcome: None,
        })
    }

    pub fn next(
        &mut self,
        planner: &mut MotionPlanner,
        probe_triggered: bool,
        planner_idle: bool,
    ) -> Result<ExitCode, CmError> {
        if let Some(outcome) = self.outcome {
            let _ = outcome;
            return Ok(ExitCode::Complete);
        }

        if !self.dispatched {
            planner
                .plan_move(self.target, self.feedrate, PathControl::ExactStop)
                .map_err(|_| CmError::PlannerNotIdle)?;
            self.dispatched = true;
            return Ok(ExitCode::Ok);
        }

        if probe_triggered {
            self.outcome = Some(ProbeOutcome::Contact(planner.position()));
            return Ok(ExitCode::Complete);
        }

        if planner_idle {
            self.outcome = Some(ProbeOutcome::NoContact);
            return Ok(ExitCode::ProbeFailed);
        }

        Ok(ExitCode::Eagain)
    }

    pub fn outcome(&self) -> Option<ProbeOutcome> {
        self.outcome
    }
}
