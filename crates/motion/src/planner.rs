//! Jerk-limited motion planner.
//!
//! Moves are admitted into a fixed-size ring of blocks (see `MotionBlock`).
//! Each admission triggers a two-pass replan over every block still in the
//! `Queued` state: a backward pass that propagates achievable exit
//! velocities from the newest block back toward the one currently running,
//! and a forward pass that re-derives entry/cruise/exit from the now-fixed
//! chain of junction caps. A block's own seven-phase profile is finalized
//! immediately after, since only its own entry/cruise/exit change, never
//! its geometry.

#[cfg(not(feature = "std"))]
use libm::sqrtf;
#[cfg(feature = "std")]
fn sqrtf(x: f32) -> f32 {
    x.sqrt()
}

use crate::axis::{scaled_limit, AxisLimits, MAX_AXES};
use crate::block::{BlockState, MotionBlock, MoveKind, PathControl};
use crate::error::MotionError;
use crate::profile::{distance_traveled, ramp_length, ramp_timing, sample_velocity};
use heapless::Vec;

/// Depth of the planner's block ring. Real TinyG-class firmware runs
/// somewhere between 28 and 48 slots; 32 sits comfortably in that range
/// while keeping the ring's static footprint small.
pub const PLANNER_QUEUE_LEN: usize = 32;

/// Moves shorter than this (in the caller's units) are absorbed into the
/// planner's position bookkeeping without allocating a ring slot.
const MIN_BLOCK_LENGTH: f32 = 1e-4;

pub struct MotionPlanner {
    ring: [MotionBlock; PLANNER_QUEUE_LEN],
    /// Index of the next free slot to write into.
    write_idx: usize,
    /// Index of the oldest non-`Empty` block (queued, running, or pending).
    run_idx: usize,
    /// Number of non-`Empty` slots currently held.
    count: usize,
    /// Machine position as of the last admitted block, in the caller's
    /// units. Targets are resolved upstream (by the canonical machine);
    /// the planner only ever sees absolute positions to move to.
    position: [f32; MAX_AXES],
    /// Unit vector of the most recently admitted block, used to compute
    /// the next move's junction cap. `None` once the ring has drained back
    /// to empty (the next move starts from rest).
    last_unit_vector: Option<[f32; MAX_AXES]>,
    axis_limits: [AxisLimits; MAX_AXES],
    /// Whatever a `reprofile_running_to_stop` call cut short, waiting for
    /// `resume_from_hold` to re-admit it.
    held_remainder: Option<HeldRemainder>,
}

/// The distance a feedhold discarded from the block it interrupted: enough
/// to re-queue the rest of the move, starting from rest, once released.
#[derive(Debug, Copy, Clone)]
struct HeldRemainder {
    unit_vector: [f32; MAX_AXES],
    remaining_length: f32,
    requested_cruise: f32,
    path_control: PathControl,
}

impl MotionPlanner {
    pub fn new(axis_limits: [AxisLimits; MAX_AXES]) -> Self {
        Self {
            ring: [MotionBlock::default(); PLANNER_QUEUE_LEN],
            write_idx: 0,
            run_idx: 0,
            count: 0,
            position: [0.0; MAX_AXES],
            last_unit_vector: None,
            axis_limits,
            held_remainder: None,
        }
    }

    pub fn position(&self) -> [f32; MAX_AXES] {
        self.position
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn is_full(&self) -> bool {
        self.count == PLANNER_QUEUE_LEN
    }

    /// Drops every block in the ring without re-deriving anything: an
    /// abort needs the motors stopped and the queue empty, not a replan.
    /// `position` keeps whatever the machine had last reached, since the
    /// caller (the canonical machine) is the source of truth for where the
    /// abort left the tool.
    pub fn flush(&mut self) {
        self.ring = [MotionBlock::default(); PLANNER_QUEUE_LEN];
        self.write_idx = 0;
        self.run_idx = 0;
        self.count = 0;
        self.last_unit_vector = None;
        self.held_remainder = None;
    }

    /// Admits a straight-line move to `target`, at the given commanded
    /// feedrate, under the given path-control mode. Zero-length and
    /// below-minimum-length moves are absorbed (the position is still
    /// updated) rather than queued.
    pub fn plan_move(
        &mut self,
        target: [f32; MAX_AXES],
        feedrate: f32,
        path_control: PathControl,
    ) -> Result<(), MotionError> {
        let mut delta = [0.0f32; MAX_AXES];
        let mut length_sq = 0.0f32;
        for i in 0..MAX_AXES {
            delta[i] = target[i] - self.position[i];
            length_sq += delta[i] * delta[i];
        }
        let length = sqrtf(length_sq);

        if length < MIN_BLOCK_LENGTH {
            self.position = target;
            return Ok(());
        }

        let mut unit_vector = [0.0f32; MAX_AXES];
        for i in 0..MAX_AXES {
            unit_vector[i] = delta[i] / length;
        }

        if self.is_full() {
            return Err(MotionError::QueueFull);
        }

        let per_axis_velocity: [f32; MAX_AXES] = core::array::from_fn(|i| self.axis_limits[i].max_velocity);
        let per_axis_accel: [f32; MAX_AXES] = core::array::from_fn(|i| self.axis_limits[i].max_accel);
        let per_axis_jerk: [f32; MAX_AXES] = core::array::from_fn(|i| self.axis_limits[i].max_jerk);

        let velocity_limit = scaled_limit(&unit_vector, &per_axis_velocity);
        let accel_limit = scaled_limit(&unit_vector, &per_axis_accel);
        let jerk_limit = scaled_limit(&unit_vector, &per_axis_jerk);

        let entry_cap = match self.last_unit_vector {
            Some(prev_unit) => self.junction_velocity(&prev_unit, &unit_vector).min(velocity_limit),
            None => 0.0,
        };

        let block = MotionBlock {
            state: BlockState::Queued,
            kind: MoveKind::Line,
            path_control,
            unit_vector,
            length,
            requested_cruise: feedrate.min(velocity_limit),
            entry_cap,
            planned_entry: 0.0,
            planned_cruise: feedrate.min(velocity_limit),
            planned_exit: 0.0,
            velocity_limit,
            accel_limit,
            jerk_limit,
            dwell_seconds: 0.0,
            ..MotionBlock::default()
        };

        self.push(block);
        self.position = target;
        self.last_unit_vector = Some(unit_vector);
        self.replan();
        Ok(())
    }

    /// Admits a dwell: a pause of `seconds` with no axis motion. Dwells
    /// don't participate in junction planning; they simply hold position.
    pub fn plan_dwell(&mut self, seconds: f32) -> Result<(), MotionError> {
        if self.is_full() {
            return Err(MotionError::QueueFull);
        }
        let block = MotionBlock {
            state: BlockState::Queued,
            kind: MoveKind::Dwell,
            dwell_seconds: seconds,
            ..MotionBlock::default()
        };
        self.push(block);
        self.replan();
        Ok(())
    }

    /// Admits an opaque command marker (e.g. a spindle or coolant state
    /// change) so it retires in program order relative to surrounding
    /// motion, without itself carrying any motion profile.
    pub fn plan_command(&mut self) -> Result<(), MotionError> {
        if self.is_full() {
            return Err(MotionError::QueueFull);
        }
        let block = MotionBlock {
            state: BlockState::Queued,
            kind: MoveKind::Command,
            ..MotionBlock::default()
        };
        self.push(block);
        self.replan();
        Ok(())
    }

    /// Flushes lookahead: forces the newest queued block to plan an exact
    /// stop, so nothing is left assuming a future move will extend it.
    /// The canonical machine calls this on program end, feedhold, and
    /// before any cycle that must come to rest (e.g. a toolchange).
    pub fn finalize(&mut self) {
        if let Some(&newest) = self.queued_indices().last() {
            self.ring[newest].path_control = PathControl::ExactStop;
        }
        self.last_unit_vector = None;
        self.replan();
    }

    /// Decelerates the running block to a stop `elapsed` seconds into its
    /// current profile, discarding whatever distance it hasn't yet covered
    /// into a tail ramp down to zero exit velocity at jerk/accel limit.
    /// The discarded distance is stashed for `resume_from_hold` to re-admit.
    /// Returns the reprofiled block (for the caller to reload into its
    /// segment executor), or `None` if nothing is running.
    pub fn reprofile_running_to_stop(&mut self, elapsed: f32) -> Option<MotionBlock> {
        if self.count == 0 {
            return None;
        }
        let idx = self.run_idx;
        if self.ring[idx].state != BlockState::Running || self.ring[idx].kind != MoveKind::Line {
            return None;
        }

        let (velocity_now, traveled, unit_vector, requested_cruise, path_control) = {
            let b = &self.ring[idx];
            let t = elapsed.clamp(0.0, b.total_time());
            let (v, _) = sample_velocity(
                b.planned_entry, b.planned_cruise, b.planned_exit, b.jerk_limit, b.t_j1, b.t_a, b.t_j2, b.t_c,
                b.t_j3, b.t_d, b.t_j4, t,
            );
            let d = distance_traveled(
                b.planned_entry, b.planned_cruise, b.planned_exit, b.jerk_limit, b.t_j1, b.t_a, b.t_j2, b.t_c,
                b.t_j3, b.t_d, b.t_j4, t,
            )
            .min(b.length);
            (v, d, b.unit_vector, b.requested_cruise, b.path_control)
        };
        let remaining = self.ring[idx].length - traveled;
        let decel = ramp_timing(velocity_now, self.ring[idx].jerk_limit, self.ring[idx].accel_limit);

        let b = &mut self.ring[idx];
        b.length = traveled;
        b.planned_entry = velocity_now;
        b.planned_cruise = velocity_now;
        b.planned_exit = 0.0;
        b.t_j1 = 0.0;
        b.t_a = 0.0;
        b.t_j2 = 0.0;
        b.t_c = 0.0;
        b.t_j3 = decel.t_j;
        b.t_d = decel.t_a;
        b.t_j4 = decel.t_j;
        let reprofiled = *b;

        self.held_remainder = if remaining > MIN_BLOCK_LENGTH {
            Some(HeldRemainder { unit_vector, remaining_length: remaining, requested_cruise, path_control })
        } else {
            None
        };
        self.last_unit_vector = None;
        Some(reprofiled)
    }

    /// Re-admits whatever a prior `reprofile_running_to_stop` cut short,
    /// continuing from rest in the same direction toward the original
    /// target. A no-op if the hold didn't discard any distance.
    pub fn resume_from_hold(&mut self) -> Result<(), MotionError> {
        let Some(remainder) = self.held_remainder.take() else {
            return Ok(());
        };
        if self.is_full() {
            self.held_remainder = Some(remainder);
            return Err(MotionError::QueueFull);
        }

        let per_axis_velocity: [f32; MAX_AXES] = core::array::from_fn(|i| self.axis_limits[i].max_velocity);
        let per_axis_accel: [f32; MAX_AXES] = core::array::from_fn(|i| self.axis_limits[i].max_accel);
        let per_axis_jerk: [f32; MAX_AXES] = core::array::from_fn(|i| self.axis_limits[i].max_jerk);
        let velocity_limit = scaled_limit(&remainder.unit_vector, &per_axis_velocity);
        let accel_limit = scaled_limit(&remainder.unit_vector, &per_axis_accel);
        let jerk_limit = scaled_limit(&remainder.unit_vector, &per_axis_jerk);
        let cruise = remainder.requested_cruise.min(velocity_limit);

        let block = MotionBlock {
            state: BlockState::Queued,
            kind: MoveKind::Line,
            path_control: remainder.path_control,
            unit_vector: remainder.unit_vector,
            length: remainder.remaining_length,
            requested_cruise: cruise,
            entry_cap: 0.0,
            planned_entry: 0.0,
            planned_cruise: cruise,
            planned_exit: 0.0,
            velocity_limit,
            accel_limit,
            jerk_limit,
            dwell_seconds: 0.0,
            ..MotionBlock::default()
        };
        self.push(block);
        self.last_unit_vector = Some(remainder.unit_vector);
        self.replan();
        Ok(())
    }

    /// Promotes the oldest `Queued` block to `Running` (idempotent if it
    /// already is), returning a copy for the segment executor to consume.
    /// Returns `None` if the ring is empty or the oldest block is still
    /// `Pending` retirement.
    pub fn activate_next(&mut self) -> Option<MotionBlock> {
        if self.count == 0 {
            return None;
        }
        let blk = &mut self.ring[self.run_idx];
        match blk.state {
            BlockState::Queued => {
                blk.state = BlockState::Running;
                Some(*blk)
            }
            BlockState::Running => Some(*blk),
            _ => None,
        }
    }

    /// Retires the currently running block, freeing its ring slot.
    pub fn retire_current(&mut self) {
        if self.count == 0 {
            return;
        }
        self.ring[self.run_idx] = MotionBlock::default();
        self.run_idx = (self.run_idx + 1) % PLANNER_QUEUE_LEN;
        self.count -= 1;
    }

    fn push(&mut self, block: MotionBlock) {
        self.ring[self.write_idx] = block;
        self.write_idx = (self.write_idx + 1) % PLANNER_QUEUE_LEN;
        self.count += 1;
    }

    fn queued_indices(&self) -> Vec<usize, PLANNER_QUEUE_LEN> {
        let mut indices = Vec::new();
        let mut idx = self.run_idx;
        for _ in 0..self.count {
            if self.ring[idx].state == BlockState::Queued {
                let _ = indices.push(idx);
            }
            idx = (idx + 1) % PLANNER_QUEUE_LEN;
        }
        indices
    }

    fn running_exit_velocity(&self) -> f32 {
        let blk = &self.ring[self.run_idx];
        if self.count > 0 && blk.state == BlockState::Running {
            blk.planned_exit
        } else {
            0.0
        }
    }

    /// `v_j^2 = a * delta * sin(theta/2) / (1 - sin(theta/2))`, minimized
    /// over every axis that participates in either move. `theta` is the
    /// turn angle measured against the incoming direction continuing
    /// straight, so colinear moves (`theta = 0`) yield the largest
    /// possible junction velocity and reversals (`theta = pi`) yield zero.
    fn junction_velocity(&self, prev_unit: &[f32; MAX_AXES], next_unit: &[f32; MAX_AXES]) -> f32 {
        let mut dot = 0.0f32;
        for i in 0..MAX_AXES {
            dot += prev_unit[i] * next_unit[i];
        }
        // Negate: deviation is measured from the straight-through direction,
        // which is `-prev_unit` at the junction point.
        let cos_theta = (-dot).clamp(-1.0, 1.0);
        let sin_half_sq = ((1.0 - cos_theta) * 0.5).clamp(0.0, 1.0);
        let sin_half = sqrtf(sin_half_sq);

        if sin_half > 0.999_999 {
            return f32::INFINITY;
        }
        let denom = 1.0 - sin_half;
        if denom <= 1e-9 {
            return f32::INFINITY;
        }

        let mut v_min = f32::INFINITY;
        for i in 0..MAX_AXES {
            if prev_unit[i].abs() <= f32::EPSILON && next_unit[i].abs() <= f32::EPSILON {
                continue;
            }
            let limits = &self.axis_limits[i];
            let a_axis = powf_2_3(limits.max_jerk);
            let v_sq = a_axis * limits.junction_deviation * sin_half / denom;
            let v = sqrtf(v_sq.max(0.0));
            if v < v_min {
                v_min = v;
            }
        }
        v_min
    }

    fn replan(&mut self) {
        let indices = self.queued_indices();
        if indices.is_empty() {
            return;
        }

        let mut next_entry_cap = 0.0f32;
        for &i in indices.iter().rev() {
            let exit_cap = if self.ring[i].path_control == PathControl::ExactStop {
                0.0
            } else {
                next_entry_cap
            };
            let blk = &mut self.ring[i];
            blk.planned_exit = exit_cap.min(blk.requested_cruise);
            next_entry_cap = blk.entry_cap;
        }

        let mut entry_v = self.running_exit_velocity();
        for &i in indices.iter() {
            let blk = &mut self.ring[i];
            if blk.kind != MoveKind::Line {
                // Dwells and command markers don't carry a velocity profile;
                // they simply pass entry/exit through unchanged.
                entry_v = 0.0;
                continue;
            }
            blk.planned_entry = entry_v.min(blk.entry_cap);
            let reachable = sqrtf(blk.planned_entry * blk.planned_entry + 2.0 * blk.accel_limit * blk.length);
            blk.planned_exit = blk.planned_exit.min(reachable);
            blk.planned_cruise = blk.requested_cruise.min(reachable.max(blk.planned_entry));
            entry_v = blk.planned_exit;
        }

        for &i in indices.iter() {
            if self.ring[i].kind == MoveKind::Line {
                self.finalize_profile(i);
            }
        }
    }

    /// Resolves a block's cruise velocity and seven-phase timing so that
    /// the head and tail ramp lengths fit within the block's own length,
    /// reducing cruise velocity via bisection when they don't.
    fn finalize_profile(&mut self, idx: usize) {
        let (entry, exit, length, jerk, accel_limit, requested_cruise) = {
            let b = &self.ring[idx];
            (b.planned_entry, b.planned_exit, b.length, b.jerk_limit, b.accel_limit, b.planned_cruise)
        };

        let lo_bound = entry.max(exit);
        let mut lo = lo_bound;
        let mut hi = requested_cruise.max(lo_bound);
        let mut cruise = hi;

        for _ in 0..12 {
            cruise = 0.5 * (lo + hi);
            let dv_head = (cruise - entry).max(0.0);
            let dv_tail = (cruise - exit).max(0.0);
            let total_len = ramp_length(dv_head, jerk) + ramp_length(dv_tail, jerk);
            if total_len > length {
                hi = cruise;
            } else {
                lo = cruise;
            }
        }
        cruise = lo;

        let dv_head = (cruise - entry).max(0.0);
        let dv_tail = (cruise - exit).max(0.0);
        let head = ramp_timing(dv_head, jerk, accel_limit);
        let tail = ramp_timing(dv_tail, jerk, accel_limit);
        let l_head = ramp_length(dv_head, jerk);
        let l_tail = ramp_length(dv_tail, jerk);
        let t_c = if cruise > 1e-6 {
            ((length - l_head - l_tail) / cruise).max(0.0)
        } else {
            0.0
        };

        let b = &mut self.ring[idx];
        b.planned_cruise = cruise;
        b.t_j1 = head.t_j;
        b.t_a = head.t_a;
        b.t_j2 = head.t_j;
        b.t_c = t_c;
        b.t_j3 = tail.t_j;
        b.t_d = tail.t_a;
        b.t_j4 = tail.t_j;
    }
}

/// `x^(2/3)` via `sqrt(x) * cbrt(x)` to avoid pulling in a general `powf`
/// for a single fixed exponent.
fn powf_2_3(x: f32) -> f32 {
    if x <= 0.0 {
        return 0.0;
    }
    #[cfg(not(feature = "std"))]
    {
        libm::cbrtf(x * x)
    }
    #[cfg(feature = "std")]
    {
        (x * x).cbrt()
    }
}
