//! Tests for `ProbeCycle`: contact/no-contact outcomes and its rejection of
//! rotary-axis targets and sub-minimum moves.

use tinyg_canon::{CmError, ExitCode, ProbeCycle, ProbeOutcome};
use tinyg_motion::{Axis, MAX_AXES};

#[test]
fn rejects_a_target_that_moves_a_rotary_axis() {
    let current = [0.0; MAX_AXES];
    let mut target = [0.0; MAX_AXES];
    target[Axis::A.index()] = 10.0;

    let err = ProbeCycle::new(current, target, 100.0, 0.01).unwrap_err();
    assert_eq!(err, CmError::AxisNotAllowed(Axis::A));
}

#[test]
fn rejects_a_move_shorter_than_the_minimum_length() {
    let current = [0.0; MAX_AXES];
    let mut target = [0.0; MAX_AXES];
    target[Axis::X.index()] = 0.001;

    let err = ProbeCycle::new(current, target, 100.0, 1.0).unwrap_err();
    assert_eq!(err, CmError::AxisMissing);
}

#[test]
fn rejects_a_non_positive_feedrate() {
    let current = [0.0; MAX_AXES];
    let mut target = [0.0; MAX_AXES];
    target[Axis::X.index()] = 10.0;

    let err = ProbeCycle::new(current, target, 0.0, 0.01).unwrap_err();
    assert_eq!(err, CmError::FeedrateMissing);
}

#[test]
fn probe_reports_contact_at_the_position_when_the_switch_closes() {
    let mut target = [0.0; MAX_AXES];
    target[Axis::X.index()] = 10.0;
    let mut cycle = ProbeCycle::new([0.0; MAX_AXES], target, 50.0, 0.01).unwrap();

    // no real planner is needed to reach a contact: dispatch, then the switch
    // closes before the planner drains.
    let mut p = fresh_planner();
    assert_eq!(cycle.next(&mut p, false, false).unwrap(), ExitCode::Ok);
    assert_eq!(cycle.next(&mut p, true, false).unwrap(), ExitCode::Complete);
    assert!(matches!(cycle.outcome(), Some(ProbeOutcome::Contact(_))));
}

#[test]
fn probe_reports_no_contact_once_the_planner_drains_without_a_trigger() {
    let mut target = [0.0; MAX_AXES];
    target[Axis::X.index()] = 10.0;
    let mut cycle = ProbeCycle::new([0.0; MAX_AXES], target, 50.0, 0.01).unwrap();

    let mut p = fresh_planner();
    assert_eq!(cycle.next(&mut p, false, false).unwrap(), ExitCode::Ok);
    assert_eq!(cycle.next(&mut p, false, true).unwrap(), ExitCode::ProbeFailed);
    assert_eq!(cycle.outcome(), Some(ProbeOutcome::NoContact));
}

fn fresh_planner() -> tinyg_motion::MotionPlanner {
    let mut limits = [tinyg_motion::AxisLimits::default(); MAX_AXES];
    for limit in limits.iter_mut() {
        limit.max_velocity = 1000.0;
        limit.max_accel = 5000.0;
        limit.max_jerk = 50_000.0;
        limit.junction_deviation = 0.01;
    }
    tinyg_motion::MotionPlanner::new(limits)
}
