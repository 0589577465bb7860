#![cfg(test)]

use tinyg_motion::{AxisLimits, MotionError, MotionPlanner, PathControl, PLANNER_QUEUE_LEN, MAX_AXES};

fn test_limits() -> [AxisLimits; MAX_AXES] {
    [AxisLimits {
        max_velocity: 10_000.0,
        max_accel: 5_000.0,
        max_jerk: 200_000.0,
        junction_deviation: 0.01,
    }; MAX_AXES]
}

#[test]
fn queue_full_is_reported_once_the_ring_saturates() {
    let mut planner = MotionPlanner::new(test_limits());
    let mut target = [0.0; MAX_AXES];

    for i in 1..=(PLANNER_QUEUE_LEN + 10) {
        target[0] = i as f32 * 1.0;
        let result = planner.plan_move(target, 1000.0, PathControl::Continuous);
        if i > PLANNER_QUEUE_LEN {
            assert_eq!(result, Err(MotionError::QueueFull));
        } else {
            assert!(result.is_ok(), "move {i} should have been admitted");
        }
    }
}

#[test]
fn high_feedrate_move_never_yields_a_zero_tick_segment() {
    let mut planner = MotionPlanner::new(test_limits());
    let mut target = [0.0; MAX_AXES];
    target[0] = 200.0; // a long, fast move

    planner.plan_move(target, 9000.0, PathControl::Continuous).unwrap();
    planner.finalize();

    let block = planner.activate_next().unwrap();
    let mut executor = tinyg_motion::SegmentExecutor::new([80.0; MAX_AXES], 400);
    executor.load(block).unwrap();

    let mut segment_count = 0;
    while let Some(seg) = executor.next_segment() {
        assert!(seg.dda_ticks > 0, "a zero-tick segment would stall the DDA");
        segment_count += 1;
    }
    assert!(segment_count > 0);
}

#[test]
fn many_small_segments_rarely_decelerate_to_a_full_stop() {
    // A near-circular path made of many short chords should keep the
    // junction velocity high enough that most corners don't force the
    // planner down to zero, provided the junction deviation is generous.
    let mut limits = test_limits();
    for l in limits.iter_mut() {
        l.junction_deviation = 0.5;
    }
    let mut planner = MotionPlanner::new(limits);

    let segments = 48;
    let radius = 50.0;
    let mut stops = 0;

    for i in 1..=segments {
        let angle = (i as f32 / segments as f32) * 2.0 * core::f32::consts::PI;
        let mut target = [0.0; MAX_AXES];
        target[0] = radius * libm::cosf(angle);
        target[1] = radius * libm::sinf(angle);
        planner.plan_move(target, 3000.0, PathControl::Continuous).unwrap();
    }
    planner.finalize();

    while let Some(block) = planner.activate_next() {
        if block.planned_entry < 1.0 {
            stops += 1;
        }
        planner.retire_current();
    }

    assert!(
        stops < segments / 4,
        "planner stopped {stops} times out of {segments}, expected sustained cornering speed"
    );
}
