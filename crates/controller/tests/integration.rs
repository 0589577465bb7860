//! Integration tests for `ControllerLoop`'s cooperative dispatch: line
//! admission, mode setters, and probe-cycle ownership of the planner.

use std::collections::VecDeque;
use tinyg_canon::{AxisConfig, CanonicalMachine, ExitCode};
use tinyg_controller::{ControllerLoop, GcodeWordSource, PersistenceHook, ResponseSink, Word};
use tinyg_motion::{AxisLimits, MotionPlanner, MAX_AXES};

struct QueueWordSource {
    lines: VecDeque<Vec<Word>>,
    current: VecDeque<Word>,
}

impl QueueWordSource {
    fn new(lines: Vec<Vec<Word>>) -> Self {
        Self {
            lines: lines.into_iter().collect(),
            current: VecDeque::new(),
        }
    }
}

impl GcodeWordSource for QueueWordSource {
    fn next_word(&mut self) -> Option<Word> {
        if self.current.is_empty() {
            self.current = self.lines.pop_front()?.into_iter().collect();
        }
        self.current.pop_front()
    }
}

#[derive(Default)]
struct RecordingSink {
    results: Vec<(ExitCode, u32)>,
}

impl ResponseSink for RecordingSink {
    fn accept(&mut self, code: ExitCode, line_number: u32) {
        self.results.push((code, line_number));
    }
}

#[derive(Default)]
struct NullPersistence;

impl PersistenceHook for NullPersistence {
    fn persist(&mut self, _index: u8, _value: f64) {}
}

fn word(letter: char, value: f64) -> Word {
    Word { letter, value }
}

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

fn idle_inputs() -> tinyg_controller::loop_::TickInputs {
    tinyg_controller::loop_::TickInputs {
        switch_triggered: false,
        planner_idle: true,
        sentinel_ok: true,
    }
}

#[test]
fn admits_a_linear_move_and_reports_ok() {
    let lines = vec![vec![word('G', 1.0), word('X', 10.0), word('F', 500.0)]];
    let mut controller = ControllerLoop::new(
        CanonicalMachine::new([AxisConfig::default(); MAX_AXES]),
        planner(),
        QueueWordSource::new(lines),
        RecordingSink::default(),
        NullPersistence,
    );

    let status = controller.tick(idle_inputs());
    assert_eq!(status, ExitCode::Ok);
    assert_eq!(controller.planner.position()[0], 10.0);
}

#[test]
fn rejects_a_linear_move_with_no_feedrate_in_effect() {
    let lines = vec![vec![word('G', 1.0), word('X', 10.0)]];
    let mut controller = ControllerLoop::new(
        CanonicalMachine::new([AxisConfig::default(); MAX_AXES]),
        planner(),
        QueueWordSource::new(lines),
        RecordingSink::default(),
        NullPersistence,
    );

    let status = controller.tick(idle_inputs());
    assert_eq!(status, ExitCode::FeedrateMissing);
}

#[test]
fn a_latched_sentinel_fault_blocks_every_later_tick() {
    let mut controller = ControllerLoop::new(
        CanonicalMachine::new([AxisConfig::default(); MAX_AXES]),
        planner(),
        QueueWordSource::new(vec![vec![word('G', 1.0), word('X', 1.0), word('F', 100.0)]]),
        RecordingSink::default(),
        NullPersistence,
    );

    let mut faulted = idle_inputs();
    faulted.sentinel_ok = false;
    assert_eq!(controller.tick(faulted), ExitCode::MemoryFault);

    // Even with a sentinel that now reads fine, the fault stays latched
    // until explicitly reset.
    assert_eq!(controller.tick(idle_inputs()), ExitCode::MemoryFault);

    controller.reset_fault();
    assert_eq!(controller.tick(idle_inputs()), ExitCode::Ok);
}

#[test]
fn g38_2_starts_a_probe_cycle_that_owns_word_admission_until_it_completes() {
    let lines = vec![
        vec![word('G', 38.2), word('X', 5.0), word('F', 100.0)],
        vec![word('G', 1.0), word('Y', 5.0), word('F', 100.0)],
    ];
    let mut controller = ControllerLoop::new(
        CanonicalMachine::new([AxisConfig::default(); MAX_AXES]),
        planner(),
        QueueWordSource::new(lines),
        RecordingSink::default(),
        NullPersistence,
    );

    // First tick admits the line and creates the probe cycle; the second
    // line must not be admitted while it's active.
    assert_eq!(controller.tick(idle_inputs()), ExitCode::Ok);
    assert!(matches!(controller.active_cycle, tinyg_controller::ActiveCycle::Probe(_)));

    // Second tick: the cycle dispatches its probing move.
    let mut moving = idle_inputs();
    moving.planner_idle = false;
    assert_eq!(controller.tick(moving), ExitCode::Noop);
    assert!(matches!(controller.active_cycle, tinyg_controller::ActiveCycle::Probe(_)));

    // Third tick: contact closes the switch.
    let mut contact = moving;
    contact.switch_triggered = true;
    assert_eq!(controller.tick(contact), ExitCode::Complete);
    assert!(matches!(controller.active_cycle, tinyg_controller::ActiveCycle::None));
}
