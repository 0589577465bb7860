use criterion::{black_box, criterion_group, criterion_main, Criterion};
use tinyg_motion::{AxisLimits, MotionPlanner, PathControl, MAX_AXES};

fn make_planner() -> MotionPlanner {
    let limits = [AxisLimits {
        max_velocity: 6000.0,
        max_accel: 1500.0,
        max_jerk: 20_000_000.0,
        junction_deviation: 0.01,
    }; MAX_AXES];
    MotionPlanner::new(limits)
}

fn benchmark_plan_move(c: &mut Criterion) {
    let mut planner = make_planner();
    let mut toggle = false;

    c.bench_function("plan_long_diagonal_move", |b| {
        b.iter(|| {
            toggle = !toggle;
            let mut target = [0.0; MAX_AXES];
            target[0] = if toggle { 150.0 } else { 0.0 };
            target[1] = if toggle { 50.0 } else { 0.0 };
            target[2] = if toggle { 20.0 } else { 0.0 };
            planner
                .plan_move(black_box(target), black_box(3000.0), PathControl::Continuous)
                .unwrap();
        })
    });
}

fn benchmark_replan_under_lookahead(c: &mut Criterion) {
    c.bench_function("replan_28_block_lookahead", |b| {
        b.iter(|| {
            let mut planner = make_planner();
            for i in 1..=28 {
                let mut target = [0.0; MAX_AXES];
                target[0] = i as f32 * 2.0;
                target[1] = (i as f32 * 0.3).sin() * 5.0;
                planner
                    .plan_move(black_box(target), black_box(4000.0), PathControl::Continuous)
                    .unwrap();
            }
        })
    });
}

criterion_group!(benches, benchmark_plan_move, benchmark_replan_under_lookahead);
criterion_main!(benches);
