//! Tests for `HomingCycle`'s per-axis search/latch/backoff sequence and its
//! failure when a switch never reports a contact.

use tinyg_canon::{AxisConfig, CmError, ExitCode, HomingCycle};
use tinyg_motion::{Axis, AxisLimits, MotionPlanner, MAX_AXES};

fn planner() -> MotionPlanner {
    let mut limits = [AxisLimits::default(); MAX_AXES];
    for limit in limits.iter_mut() {
        limit.max_velocity = 1000.0;
        limit.max_accel = 5000.0;
        limit.max_jerk = 50_000.0;
        limit.junction_deviation = 0.01;
    }
    MotionPlanner::new(limits)
}

fn homing_configs() -> [AxisConfig; MAX_AXES] {
    let mut configs = [AxisConfig::default(); MAX_AXES];
    for axis in [Axis::X, Axis::Y] {
        let c = &mut configs[axis.index()];
        c.travel_min = 0.0;
        c.travel_max = 200.0;
        c.max_feedrate = 500.0;
        c.homing_search_velocity = 300.0;
        c.homing_latch_velocity = 50.0;
        c.homing_search_backoff = 5.0;
        c.homing_latch_backoff = 1.0;
    }
    configs
}

/// Drives a cycle to completion, feeding `switch_triggered` from a closure so
/// each test can script a different switch timeline.
fn drive(
    cycle: &mut HomingCycle,
    planner: &mut MotionPlanner,
    configs: &[AxisConfig; MAX_AXES],
    mut switch_triggered: impl FnMut() -> bool,
) -> Result<ExitCode, CmError> {
    for _ in 0..64 {
        let status = cycle.next(planner, configs, switch_triggered(), true)?;
        if matches!(status, ExitCode::Complete | ExitCode::HomingFailed) {
            return Ok(status);
        }
    }
    panic!("homing cycle did not terminate within the expected tick budget");
}

#[test]
fn rejects_an_empty_axis_order() {
    assert_eq!(
        HomingCycle::new(&[], [0.0; MAX_AXES], [0.0; MAX_AXES]).unwrap_err(),
        CmError::AxisMissing
    );
}

#[test]
fn single_axis_homing_completes_when_the_switch_always_reports_triggered() {
    let configs = homing_configs();
    let mut p = planner();
    let mut cycle = HomingCycle::new(&[Axis::X], [0.0; MAX_AXES], [0.0; MAX_AXES]).unwrap();

    let status = drive(&mut cycle, &mut p, &configs, || true);
    assert_eq!(status, Ok(ExitCode::Complete));
    assert!(cycle.is_done());
}

#[test]
fn homing_fails_when_the_switch_never_triggers_during_the_search_backoff() {
    let configs = homing_configs();
    let mut p = planner();
    let mut cycle = HomingCycle::new(&[Axis::X], [0.0; MAX_AXES], [0.0; MAX_AXES]).unwrap();

    // Never triggered: InitialBackoff sees it open (no backoff dispatched),
    // Search dispatches, and SearchBackoff's switch check then fails.
    let status = drive(&mut cycle, &mut p, &configs, || false);
    assert_eq!(status, Ok(ExitCode::HomingFailed));
}

#[test]
fn multi_axis_order_homes_each_axis_before_traversing_to_work_zero() {
    let configs = homing_configs();
    let mut p = planner();
    let mut waypoint = [0.0; MAX_AXES];
    waypoint[Axis::X.index()] = 10.0;
    let mut cycle = HomingCycle::new(&[Axis::X, Axis::Y], waypoint, [0.0; MAX_AXES]).unwrap();

    let status = drive(&mut cycle, &mut p, &configs, || true);
    assert_eq!(status, Ok(ExitCode::Complete));
}

#[test]
fn zero_search_velocity_is_rejected_before_any_motion_is_dispatched() {
    let mut configs = homing_configs();
    configs[Axis::X.index()].homing_search_velocity = 0.0;
    let mut p = planner();
    let mut cycle = HomingCycle::new(&[Axis::X], [0.0; MAX_AXES], [0.0; MAX_AXES]).unwrap();

    let err = cycle.next(&mut p, &configs, true, true).unwrap_err();
    assert_eq!(err, CmError::ZeroSearchVelocity(Axis::X));
}
