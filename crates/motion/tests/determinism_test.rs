//! Tests for the motion planner and segment executor's determinism.

use tinyg_motion::{AxisLimits, MotionPlanner, PathControl, SegmentExecutor, MAX_AXES};

fn test_limits() -> [AxisLimits; MAX_AXES] {
    [AxisLimits {
        max_velocity: 6000.0, // units/min
        max_accel: 1500.0,
        max_jerk: 20_000_000.0,
        junction_deviation: 0.01,
    }; MAX_AXES]
}

#[test]
fn straight_move_ramps_up_and_back_down_to_rest() {
    let mut planner = MotionPlanner::new(test_limits());
    let mut target = [0.0; MAX_AXES];
    target[0] = 10.0;
    target[1] = 10.0;

    planner.plan_move(target, 3000.0, PathControl::Continuous).unwrap();
    planner.finalize();

    let block = planner.activate_next().expect("one block queued");
    assert_eq!(block.planned_entry, 0.0, "first move must start from rest");
    assert_eq!(block.planned_exit, 0.0, "finalize forces the tail to stop");
    assert!(block.planned_cruise > 0.0);

    let steps_per_unit = [80.0; MAX_AXES];
    let mut executor = SegmentExecutor::new(steps_per_unit, 400);
    executor.load(block).unwrap();

    let mut velocities = heapless::Vec::<f32, 512>::new();
    while let Some(seg) = executor.next_segment() {
        assert!(seg.dda_ticks > 0, "a segment must span at least one DDA tick");
        // Recover an approximate commanded speed for monotonicity checks below.
        let steps_x = seg.substep_increment[0] as f32 / tinyg_motion::SUBSTEP_SCALE as f32;
        velocities.push(steps_x).ok();
    }
    assert!(!velocities.is_empty(), "a nonzero-length move must produce segments");

    // Rises then falls: there exists a peak, and the tail trends toward zero.
    let peak = velocities.iter().cloned().fold(0.0f32, f32::max);
    assert!(peak > 0.0);
    let last = *velocities.last().unwrap();
    assert!(last <= peak, "profile must not still be accelerating at the very end");
}

#[test]
fn zero_length_move_is_absorbed_without_a_block() {
    let mut planner = MotionPlanner::new(test_limits());
    let target = [0.0; MAX_AXES];
    planner.plan_move(target, 1000.0, PathControl::Continuous).unwrap();
    assert!(planner.is_empty(), "a zero-length move must not occupy a ring slot");
}

#[test]
fn replanning_is_idempotent_for_identical_inputs() {
    // Running the exact same sequence of moves through two planners must
    // produce identical planned velocities: the planner has no hidden
    // randomness or timing dependence.
    let mut a = MotionPlanner::new(test_limits());
    let mut b = MotionPlanner::new(test_limits());

    let moves: [[f32; MAX_AXES]; 3] = [
        { let mut t = [0.0; MAX_AXES]; t[0] = 5.0; t },
        { let mut t = [0.0; MAX_AXES]; t[0] = 5.0; t[1] = 5.0; t },
        { let mut t = [0.0; MAX_AXES]; t[0] = 10.0; t[1] = 5.0; t },
    ];

    for m in moves {
        a.plan_move(m, 2000.0, PathControl::Continuous).unwrap();
        b.plan_move(m, 2000.0, PathControl::Continuous).unwrap();
    }
    a.finalize();
    b.finalize();

    while let (Some(ba), Some(bb)) = (a.activate_next(), b.activate_next()) {
        assert_eq!(ba.planned_entry, bb.planned_entry);
        assert_eq!(ba.planned_cruise, bb.planned_cruise);
        assert_eq!(ba.planned_exit, bb.planned_exit);
        a.retire_current();
        b.retire_current();
    }
}
