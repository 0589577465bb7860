//! Deterministic, synchronous simulation harness driving a real
//! `ControllerLoop`/`MotionPlanner`/`SegmentExecutor`/`StepperRuntime`
//! stack without any hardware, real time, or async runtime — a `step()`
//! call advances the virtual clock by exactly one DDA tick and returns
//! whatever the controller tick reported that period, mirroring the §5
//! main-loop cadence at simulation speed instead of wall-clock speed.

use std::cell::RefCell;
use std::collections::VecDeque;

use critical_section::Mutex as CsMutex;
use tinyg_canon::{AxisConfig, CanonicalMachine, CycleState, ExitCode};
use tinyg_controller::{ControllerLoop, GcodeWordSource, PersistenceHook, ResponseSink, Word};
use tinyg_driver_endstop::{Endstops, Polarity};
use tinyg_driver_stepper::{PowerMode, StepperRuntime};
use tinyg_motion::{dwell_segment, AxisLimits, MotionPlanner, MoveKind, SegmentExecutor, MAX_AXES};

use crate::fake_mcu::{RecordingPort, VirtualPin, VirtualTimer};

pub const MOTORS: usize = 3;
const DDA_PERIOD_US: u32 = 20;

/// Feeds a line at a time out of an in-memory queue; mirrors the
/// controller crate's own integration-test collaborator since no real
/// lexer is in scope here either.
#[derive(Default)]
pub struct QueueWordSource {
    lines: VecDeque<Vec<Word>>,
    current: VecDeque<Word>,
}

impl QueueWordSource {
    pub fn push_line(&mut self, words: Vec<Word>) {
        self.lines.push_back(words);
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

/// Records every response the controller reports, in tick order.
#[derive(Default)]
pub struct RecordingSink {
    pub results: Vec<(ExitCode, u32)>,
}

impl ResponseSink for RecordingSink {
    fn accept(&mut self, code: ExitCode, line_number: u32) {
        self.results.push((code, line_number));
    }
}

#[derive(Default)]
pub struct NullPersistence;

impl PersistenceHook for NullPersistence {
    fn persist(&mut self, _index: u8, _value: f64) {}
}

pub type Controller = ControllerLoop<QueueWordSource, RecordingSink, NullPersistence>;

enum FeedMode {
    Idle,
    Line,
    Dwell { ticks_remaining: u32 },
    Command,
}

/// The same planner-to-runtime bridge `tinyg-firmware::exec::MotionFeed`
/// implements, reproduced here rather than imported since firmware is a
/// binary crate with no library target to depend on.
struct MotionFeed {
    executor: SegmentExecutor,
    mode: FeedMode,
}

impl MotionFeed {
    fn new(steps_per_unit: [f32; MAX_AXES]) -> Self {
        Self { executor: SegmentExecutor::new(steps_per_unit, DDA_PERIOD_US), mode: FeedMode::Idle }
    }

    fn pump(&mut self, controller: &mut Controller, runtime: &mut StepperRuntime<MOTORS>) -> bool {
        // See `tinyg_firmware::exec::MotionFeed::pump`: this is the one
        // place that can reprofile the running block's remaining length
        // down to a stop once a feedhold is requested.
        if controller.cm.cycle_state == CycleState::HoldRequested {
            if matches!(self.mode, FeedMode::Line) {
                let elapsed = self.executor.elapsed();
                if let Some(reprofiled) = controller.planner.reprofile_running_to_stop(elapsed) {
                    let _ = self.executor.load(reprofiled);
                }
            }
            controller.cm.mark_held();
        }

        let held = matches!(controller.cm.cycle_state, CycleState::HoldRequested | CycleState::Held);
        if matches!(self.mode, FeedMode::Idle) && !held {
            match controller.planner.activate_next() {
                Some(block) => {
                    self.mode = match block.kind {
                        MoveKind::Line => {
                            let _ = self.executor.load(block);
                            FeedMode::Line
                        }
                        MoveKind::Dwell => {
                            let ticks = (block.dwell_seconds * 1_000_000.0 / DDA_PERIOD_US as f32).round();
                            FeedMode::Dwell { ticks_remaining: (ticks as u32).max(1) }
                        }
                        MoveKind::Command => FeedMode::Command,
                    }
                }
                None => return !runtime.is_running(),
            }
        }

        match &mut self.mode {
            FeedMode::Line => {
                while runtime.slot_is_free() {
                    match self.executor.next_segment() {
                        Some(segment) => runtime.submit(segment),
                        None => {
                            self.mode = FeedMode::Idle;
                            break;
                        }
                    }
                }
            }
            FeedMode::Dwell { ticks_remaining } => {
                while runtime.slot_is_free() && *ticks_remaining > 0 {
                    let chunk = (*ticks_remaining).min(u16::MAX as u32);
                    runtime.submit(dwell_segment(chunk, DDA_PERIOD_US));
                    *ticks_remaining -= chunk;
                }
                if *ticks_remaining == 0 {
                    self.mode = FeedMode::Idle;
                }
            }
            FeedMode::Command => self.mode = FeedMode::Idle,
            FeedMode::Idle => {}
        }

        matches!(self.mode, FeedMode::Idle) && !runtime.is_running()
    }
}

/// A fully wired, in-process machine: a `ControllerLoop` over the queue
/// collaborators above, a `StepperRuntime` over virtual ports/timer, and
/// `MOTORS` virtual limit-switch pins. `step()` advances it by exactly one
/// DDA tick.
pub struct SimHarness {
    pub controller: Controller,
    runtime: StepperRuntime<MOTORS>,
    feed: MotionFeed,
    step_port: RecordingPort,
    dir_port: RecordingPort,
    timer: VirtualTimer,
    switches: Endstops<MOTORS, VirtualPin>,
    switch_pins: [VirtualPin; MOTORS],
    planner_idle: bool,
    ticks_run: u64,
}

impl SimHarness {
    pub fn new(steps_per_unit: [f32; MAX_AXES], limits: [AxisLimits; MAX_AXES]) -> Self {
        let controller = ControllerLoop::new(
            CanonicalMachine::new([AxisConfig::default(); MAX_AXES]),
            MotionPlanner::new(limits),
            QueueWordSource::default(),
            RecordingSink::default(),
            NullPersistence,
        );
        let switch_pins = std::array::from_fn(|_| VirtualPin::new(false));
        let switches =
            Endstops::new(switch_pins.clone(), [Polarity::NormallyOpen; MOTORS], 1);
        Self {
            controller,
            runtime: StepperRuntime::new([PowerMode::OnWhenMoving; MOTORS]),
            feed: MotionFeed::new(steps_per_unit),
            step_port: RecordingPort::new(),
            dir_port: RecordingPort::new(),
            timer: VirtualTimer::new(),
            switches,
            switch_pins,
            planner_idle: true,
            ticks_run: 0,
        }
    }

    pub fn push_line(&mut self, words: Vec<Word>) {
        self.controller.word_source_mut().push_line(words);
    }

    /// Sets a limit switch's raw electrical state for the next `poll`.
    pub fn set_switch(&mut self, axis: usize, triggered: bool) {
        if triggered {
            self.switch_pins[axis].set_high();
        } else {
            self.switch_pins[axis].set_low();
        }
    }

    pub fn step_pulse_trace(&self) -> crate::fake_mcu::PulseTrace {
        self.step_port.trace()
    }

    pub fn position(&self) -> [f32; MAX_AXES] {
        self.controller.planner.position()
    }

    pub fn ticks_run(&self) -> u64 {
        self.ticks_run
    }

    /// Advances the virtual clock by one DDA tick and, every
    /// `controller_period_ticks` ticks, runs one cooperative controller
    /// tick (switch drain, sentinel, cycle, promote/retire, admission).
    pub fn step(&mut self, controller_period_ticks: u64) -> ExitCode {
        let step_port = CsMutex::new(RefCell::new(self.step_port.clone()));
        let dir_port = CsMutex::new(RefCell::new(self.dir_port.clone()));
        let timer = CsMutex::new(RefCell::new(self.timer.clone()));

        if self.ticks_run == 0 {
            self.runtime.start(&dir_port, &timer);
        }

        self.runtime.on_dda_tick(&step_port, &dir_port, &timer);
        if self.timer.take_load_request() {
            self.runtime.on_load_request(&dir_port, &timer);
        }
        self.ticks_run += 1;

        let mut status = ExitCode::Noop;
        if self.ticks_run % controller_period_ticks == 0 {
            let debounced = self.switches.poll().unwrap_or([false; MOTORS]);
            let switch_triggered = debounced.iter().any(|&s| s);
            status = self.controller.tick(tinyg_controller::loop_::TickInputs {
                switch_triggered,
                planner_idle: self.planner_idle,
                sentinel_ok: true,
            });
            self.planner_idle = self.feed.pump(&mut self.controller, &mut self.runtime);
        }
        status
    }

    /// Runs `step` until the planner and stepper runtime both report idle,
    /// or `max_ticks` elapses first (returned as `Err` so a scenario test
    /// can tell a timeout apart from a clean drain).
    pub fn run_to_idle(&mut self, controller_period_ticks: u64, max_ticks: u64) -> Result<(), u64> {
        for _ in 0..max_ticks {
            self.step(controller_period_ticks);
            if self.planner_idle && self.controller.planner.is_empty() {
                return Ok(());
            }
        }
        Err(self.ticks_run)
    }
}
