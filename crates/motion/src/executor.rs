//! Converts one finalized `MotionBlock` into a stream of fixed-duration
//! `Segment`s, sampling the seven-phase velocity profile and resolving it
//! down to per-motor substep rates.
//!
//! Fractional step counts are *not* rounded away here. Each segment's ideal,
//! still-fractional step count is scaled into the fixed-point
//! `substep_increment` and handed to the stepper runtime's DDA accumulator,
//! which persists across segment boundaries. That persistence is what
//! folds the step-correction "nudge" in: the accumulator can never be more
//! than one step away from the ideal position, segment boundary or not.

use crate::axis::MAX_AXES;
use crate::block::{BlockState, MotionBlock, MoveKind};
use crate::error::MotionError;
use crate::profile::sample_velocity;
use crate::segment::{Segment, SUBSTEP_SCALE};

/// Target duration of one segment, in seconds. Shorter segments track the
/// velocity profile more faithfully at the cost of more frequent
/// executor/DDA reconfiguration; 1ms keeps curvature error well under a
/// step at typical CNC feedrates.
pub const DEFAULT_SEGMENT_SECONDS: f32 = 0.001;

pub struct SegmentExecutor {
    active: Option<MotionBlock>,
    elapsed: f32,
    steps_per_unit: [f32; MAX_AXES],
    segment_seconds: f32,
    dda_period: u32,
}

impl SegmentExecutor {
    pub fn new(steps_per_unit: [f32; MAX_AXES], dda_period: u32) -> Self {
        Self {
            active: None,
            elapsed: 0.0,
            steps_per_unit,
            segment_seconds: DEFAULT_SEGMENT_SECONDS,
            dda_period,
        }
    }

    pub fn with_segment_seconds(mut self, seconds: f32) -> Self {
        self.segment_seconds = seconds;
        self
    }

    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    /// Seconds into the active block's profile the executor has sampled so
    /// far. `0.0` if nothing is loaded.
    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    /// Loads a new block. Only `MoveKind::Line` blocks carry a motion
    /// profile; dwells and command markers are the caller's (controller's)
    /// responsibility to dispatch directly.
    pub fn load(&mut self, block: MotionBlock) -> Result<(), MotionError> {
        if block.kind != MoveKind::Line {
            return Err(MotionError::InvalidMove);
        }
        debug_assert_eq!(block.state, BlockState::Running);
        self.active = Some(block);
        self.elapsed = 0.0;
        Ok(())
    }

    /// Produces the next fixed-duration segment, or `None` once the active
    /// block's profile is exhausted (at which point the caller should
    /// retire it from the planner and `load` the next one).
    pub fn next_segment(&mut self) -> Option<Segment> {
        let block = self.active.as_ref()?;
        let total_time = block.total_time();
        if self.elapsed >= total_time {
            self.active = None;
            return None;
        }

        let duration = (total_time - self.elapsed).min(self.segment_seconds);
        let t_mid = self.elapsed + duration * 0.5;
        let (velocity, _accel) = sample_velocity(
            block.planned_entry,
            block.planned_cruise,
            block.planned_exit,
            block.jerk_limit,
            block.t_j1,
            block.t_a,
            block.t_j2,
            block.t_c,
            block.t_j3,
            block.t_d,
            block.t_j4,
            t_mid,
        );

        let ticks = ((duration / self.dda_tick_seconds()).round() as u32).max(1);

        let duration_minutes = duration / 60.0;
        let mut direction_mask = 0u8;
        let mut substep_increment = [0i32; MAX_AXES];
        for i in 0..MAX_AXES {
            let ideal_steps = velocity * block.unit_vector[i] * duration_minutes * self.steps_per_unit[i];
            if ideal_steps > 0.0 {
                direction_mask |= 1 << i;
            }
            // Per-tick fixed-point rate: the DDA accumulator overflows at a
            // constant `SUBSTEP_SCALE`, so the whole segment's ideal step
            // count is spread evenly across its ticks here rather than
            // handed over in one lump.
            let rate_per_tick = ideal_steps.abs() * SUBSTEP_SCALE as f32 / ticks as f32;
            substep_increment[i] = rate_per_tick.round() as i32;
        }
        self.elapsed += duration;

        let power_mask = direction_bits_to_power_mask(&substep_increment);

        Some(Segment {
            substep_increment,
            dda_ticks: ticks,
            dda_period: self.dda_period,
            direction_mask,
            power_mask,
        })
    }

    fn dda_tick_seconds(&self) -> f32 {
        // `dda_period` is expressed in board timer counts; the executor
        // only needs a tick count proportional to segment duration, so any
        // consistent unit works as long as `dda_period` and the timer's
        // clock are configured consistently by the firmware layer.
        (self.dda_period as f32).max(1.0) / 1_000_000.0
    }
}

fn direction_bits_to_power_mask(substep_increment: &[i32; MAX_AXES]) -> u8 {
    let mut mask = 0u8;
    for (i, &inc) in substep_increment.iter().enumerate() {
        if inc != 0 {
            mask |= 1 << i;
        }
    }
    mask
}
