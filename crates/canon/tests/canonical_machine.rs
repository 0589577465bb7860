//! Tests for `CanonicalMachine`: coordinate system selection, mode setters,
//! and the feedrate/soft-limit rejection paths on `queue_linear_move`.

use tinyg_canon::{AxisConfig, AxisTarget, CanonicalMachine, CmError, ExitCode, FeedrateMode, MotionMode};
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

fn update_for(axis: Axis, value: f32) -> [AxisTarget; MAX_AXES] {
    let mut update = [AxisTarget::default(); MAX_AXES];
    update[axis.index()] = AxisTarget { value, specified: true };
    update
}

#[test]
fn selecting_an_out_of_range_coordinate_system_is_rejected() {
    let mut cm = CanonicalMachine::new([AxisConfig::default(); MAX_AXES]);
    assert_eq!(cm.select_coordinate_system(6), Err(CmError::CoordinateSystemOutOfRange(6)));
    assert!(cm.select_coordinate_system(5).is_ok());
}

#[test]
fn linear_move_without_a_feedrate_is_rejected_unless_in_rapid_mode() {
    let mut cm = CanonicalMachine::new([AxisConfig::default(); MAX_AXES]);
    let mut p = planner();
    cm.motion_mode = MotionMode::Linear;

    let update = update_for(Axis::X, 10.0);
    let err = cm.queue_linear_move(&mut p, &update, None).unwrap_err();
    assert_eq!(err, CmError::FeedrateMissing);

    cm.motion_mode = MotionMode::Rapid;
    let status = cm.queue_linear_move(&mut p, &update, None).unwrap();
    assert_eq!(status, ExitCode::Ok);
}

#[test]
fn feedrate_once_set_carries_forward_to_the_next_line() {
    let mut cm = CanonicalMachine::new([AxisConfig::default(); MAX_AXES]);
    let mut p = planner();
    cm.motion_mode = MotionMode::Linear;

    let first = update_for(Axis::X, 10.0);
    assert_eq!(cm.queue_linear_move(&mut p, &first, Some(500.0)).unwrap(), ExitCode::Ok);

    let second = update_for(Axis::Y, 20.0);
    assert_eq!(cm.queue_linear_move(&mut p, &second, None).unwrap(), ExitCode::Ok);
}

#[test]
fn soft_limit_violation_is_rejected_only_once_enabled() {
    let mut configs = [AxisConfig::default(); MAX_AXES];
    configs[Axis::X.index()].travel_min = 0.0;
    configs[Axis::X.index()].travel_max = 5.0;
    let mut cm = CanonicalMachine::new(configs);
    cm.motion_mode = MotionMode::Linear;
    let mut p = planner();

    let update = update_for(Axis::X, 10.0);

    // Disabled by default: the out-of-range move is accepted.
    assert_eq!(cm.queue_linear_move(&mut p, &update, Some(100.0)).unwrap(), ExitCode::Ok);

    cm.set_soft_limits_enabled(true);
    let mut p2 = planner();
    let err = cm.queue_linear_move(&mut p2, &update, Some(100.0)).unwrap_err();
    assert_eq!(err, CmError::SoftLimitExceeded(Axis::X));
}

#[test]
fn inverse_time_feedrate_mode_setter_round_trips() {
    let mut cm = CanonicalMachine::new([AxisConfig::default(); MAX_AXES]);
    cm.set_feedrate_mode(FeedrateMode::InverseTime);
    assert_eq!(cm.feedrate_mode, FeedrateMode::InverseTime);
}

#[test]
fn feedhold_is_accepted_during_ordinary_machining() {
    // `cycle_state` never leaves `Off` during plain machining (only
    // Homing/Probe/Jog set it directly), so gating `!` on cycle state would
    // make it unusable for the common case.
    let mut cm = CanonicalMachine::new([AxisConfig::default(); MAX_AXES]);
    assert_eq!(cm.request_feedhold(), ExitCode::Ok);
}

#[test]
fn feedhold_is_idempotent_while_already_requested_or_held() {
    let mut cm = CanonicalMachine::new([AxisConfig::default(); MAX_AXES]);
    assert_eq!(cm.request_feedhold(), ExitCode::Ok);
    assert_eq!(cm.request_feedhold(), ExitCode::Noop);
    cm.mark_held();
    assert_eq!(cm.request_feedhold(), ExitCode::Noop);
}
