//! Seven-phase (S-curve) velocity profile math shared by the planner's
//! finalization step and the segment executor's sampling step.
//!
//! A profile ramp (the head or the tail of a block) is built from a
//! jerk-up phase, an optional constant-acceleration plateau, and a
//! jerk-down phase. Phases 2/6 (the plateau) collapse to zero duration
//! whenever the velocity change is too small to reach the configured
//! acceleration ceiling before it would have to start decelerating again.

#[cfg(not(feature = "std"))]
use libm::sqrtf;
#[cfg(feature = "std")]
fn sqrtf(x: f32) -> f32 {
    x.sqrt()
}

/// Timing of a single ramp (head or tail): two jerk phases of duration
/// `t_j` each, bracketing a constant-acceleration phase of duration `t_a`.
#[derive(Debug, Copy, Clone, Default)]
pub struct RampTiming {
    pub t_j: f32,
    pub t_a: f32,
    pub accel_peak: f32,
}

/// Computes the jerk/plateau timing for a ramp spanning a velocity change
/// of `delta_v`, limited to `jerk` and capped at `accel_limit`.
pub fn ramp_timing(delta_v: f32, jerk: f32, accel_limit: f32) -> RampTiming {
    if delta_v <= 0.0 || jerk <= 0.0 {
        return RampTiming::default();
    }
    let natural_peak = sqrtf(jerk * delta_v);
    let accel_peak = if accel_limit > 0.0 {
        natural_peak.min(accel_limit)
    } else {
        natural_peak
    };
    if accel_peak <= 0.0 {
        return RampTiming::default();
    }
    let t_j = accel_peak / jerk;
    let t_a = (delta_v / accel_peak - t_j).max(0.0);
    RampTiming { t_j, t_a, accel_peak }
}

/// The closed-form distance consumed purely by a velocity change of
/// `delta_v` under jerk `J`, ignoring the baseline distance contributed by
/// riding alongside any nonzero entry velocity: `L = delta_v * sqrt(delta_v / J)`.
pub fn ramp_length(delta_v: f32, jerk: f32) -> f32 {
    if delta_v <= 0.0 || jerk <= 0.0 {
        return 0.0;
    }
    delta_v * sqrtf(delta_v / jerk)
}

/// Evaluates velocity and acceleration at time `t` (seconds from the start
/// of the block) given the seven phase durations and the block's jerk.
#[allow(clippy::too_many_arguments)]
pub fn sample_velocity(
    entry_v: f32,
    cruise_v: f32,
    exit_v: f32,
    jerk: f32,
    t_j1: f32,
    t_a: f32,
    t_j2: f32,
    t_c: f32,
    t_j3: f32,
    t_d: f32,
    t_j4: f32,
    t: f32,
) -> (f32, f32) {
    let t1 = t_j1;
    let t2 = t1 + t_a;
    let t3 = t2 + t_j2;
    let t4 = t3 + t_c;
    let t5 = t4 + t_j3;
    let t6 = t5 + t_d;
    let accel_head = jerk * t_j1;
    let accel_tail = jerk * t_j3;

    if t < t1 {
        (entry_v + 0.5 * jerk * t * t, jerk * t)
    } else if t < t2 {
        let dt = t - t1;
        (entry_v + 0.5 * jerk * t1 * t1 + accel_head * dt, accel_head)
    } else if t < t3 {
        let dt = t3 - t;
        (cruise_v - 0.5 * jerk * dt * dt, jerk * dt)
    } else if t < t4 {
        (cruise_v, 0.0)
    } else if t < t5 {
        let dt = t - t4;
        (cruise_v - 0.5 * jerk * dt * dt, -jerk * dt)
    } else if t < t6 {
        let dt = t - t5;
        (cruise_v - 0.5 * jerk * t_j3 * t_j3 - accel_tail * dt, -accel_tail)
    } else {
        let dt = (t6 + t_j4 - t).max(0.0);
        (exit_v + 0.5 * jerk * dt * dt, -jerk * dt)
    }
}

/// Distance covered by the profile from its start through time `t`,
/// by numerically integrating `sample_velocity` on a fixed 64-step grid.
/// Only the feedhold reprofile calls this; the segment executor samples
/// velocity directly and never needs the integral.
#[allow(clippy::too_many_arguments)]
pub fn distance_traveled(
    entry_v: f32,
    cruise_v: f32,
    exit_v: f32,
    jerk: f32,
    t_j1: f32,
    t_a: f32,
    t_j2: f32,
    t_c: f32,
    t_j3: f32,
    t_d: f32,
    t_j4: f32,
    t: f32,
) -> f32 {
    const STEPS: u32 = 64;
    if t <= 0.0 {
        return 0.0;
    }
    let step = t / STEPS as f32;
    let mut distance = 0.0;
    let mut prev = entry_v;
    for i in 1..=STEPS {
        let (v, _) = sample_velocity(
            entry_v,
            cruise_v,
            exit_v,
            jerk,
            t_j1,
            t_a,
            t_j2,
            t_c,
            t_j3,
            t_d,
            t_j4,
            step * i as f32,
        );
        distance += 0.5 * (prev + v) * step;
        prev = v;
    }
    distance
}
