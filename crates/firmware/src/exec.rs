//! Bridges the planner's running block to the stepper runtime: pulls one
//! `MotionBlock` out of `MotionPlanner` at a time, and depending on its
//! kind either samples it through a `SegmentExecutor` (`Line`), spends it
//! down as zero-step dwell segments (`Dwell`), or completes it immediately
//! (`Command`) — exactly the three cases `SegmentExecutor::load`'s doc
//! comment calls out as the caller's responsibility.

use tinyg_canon::CycleState;
use tinyg_controller::{ControllerLoop, GcodeWordSource, PersistenceHook, ResponseSink};
use tinyg_driver_stepper::StepperRuntime;
use tinyg_motion::{dwell_segment, MoveKind, SegmentExecutor};

enum FeedMode {
    Idle,
    Line,
    Dwell { ticks_remaining: u32 },
    Command,
}

pub struct MotionFeed {
    executor: SegmentExecutor,
    dda_period: u32,
    mode: FeedMode,
}

impl MotionFeed {
    pub fn new(steps_per_unit: [f32; tinyg_motion::MAX_AXES], dda_period: u32) -> Self {
        Self {
            executor: SegmentExecutor::new(steps_per_unit, dda_period),
            dda_period,
            mode: FeedMode::Idle,
        }
    }

    /// Call once per controller tick, after `ControllerLoop::tick`. Returns
    /// true once both the executor and the stepper runtime have nothing
    /// left to run, which is exactly the `planner_idle` input the next
    /// tick needs.
    pub fn pump<W, R, P, const N: usize>(
        &mut self,
        controller: &mut ControllerLoop<W, R, P>,
        runtime: &mut StepperRuntime<N>,
    ) -> bool
    where
        W: GcodeWordSource,
        R: ResponseSink,
        P: PersistenceHook,
    {
        // A feedhold request fires exactly once here: reprofile whatever
        // line is currently executing down to a stop at its own jerk/accel
        // limit, reload the truncated block, and latch `Held` so this
        // doesn't re-trigger on the next tick.
        if controller.cm.cycle_state == CycleState::HoldRequested {
            if matches!(self.mode, FeedMode::Line) {
                let elapsed = self.executor.elapsed();
                if let Some(reprofiled) = controller.planner.reprofile_running_to_stop(elapsed) {
                    let _ = self.executor.load(reprofiled);
                }
            }
            controller.cm.mark_held();
        }

        let held = matches!(controller.cm.cycle_state, CycleState::HoldRequested | CycleState::Held);
        if matches!(self.mode, FeedMode::Idle) && !held {
            match controller.planner.activate_next() {
                Some(block) => self.mode = self.start(block),
                None => return !runtime.is_running(),
            }
        }

        match &mut self.mode {
            FeedMode::Line => {
                while runtime.slot_is_free() {
                    match self.executor.next_segment() {
                        Some(segment) => runtime.submit(segment),
                        None => {
                            self.mode = FeedMode::Idle;
                            break;
                        }
                    }
                }
            }
            FeedMode::Dwell { ticks_remaining } => {
                while runtime.slot_is_free() && *ticks_remaining > 0 {
                    let chunk = (*ticks_remaining).min(u16::MAX as u32);
                    runtime.submit(dwell_segment(chunk, self.dda_period));
                    *ticks_remaining -= chunk;
                }
                if *ticks_remaining == 0 {
                    self.mode = FeedMode::Idle;
                }
            }
            FeedMode::Command => self.mode = FeedMode::Idle,
            FeedMode::Idle => {}
        }

        matches!(self.mode, FeedMode::Idle) && !runtime.is_running()
    }

    fn start(&mut self, block: tinyg_motion::MotionBlock) -> FeedMode {
        match block.kind {
            MoveKind::Line => {
                let _ = self.executor.load(block);
                FeedMode::Line
            }
            MoveKind::Dwell => {
                let seconds_as_ticks = (block.dwell_seconds * 1_000_000.0 / self.dda_period.max(1) as f32).round();
                FeedMode::Dwell { ticks_remaining: (seconds_as_ticks as u32).max(1) }
            }
            MoveKind::Command => FeedMode::Command,
        }
    }
}
