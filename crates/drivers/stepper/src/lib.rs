#![deny(clippy::all)]
#![deny(warnings)]
#![no_std]

//! # Stepper Runtime
//!
//! The two-interrupt-priority DDA engine that turns a [`tinyg_motion::Segment`]
//! into step and direction pulses.
//!
//! ## Pipelined prep/run handoff
//!
//! A single slot carries at most one prepared segment between the planner
//! side of the system (the "executor", running at a lower priority) and the
//! DDA interrupt. The slot has exactly two owners, `Exec` and `Loader`, and
//! only the current owner may touch its contents — see [`SlotOwner`] and
//! §4.5 of the runtime's governing design. This mirrors, and replaces, a
//! simpler single-`Option` pipeline register: the explicit ownership word
//! makes "who may write right now" a type-level question instead of a
//! convention.
//!
//! ## Persistent per-motor accumulators
//!
//! Each motor's Bresenham-style accumulator is never reset between
//! segments — only its overflow threshold (`full_scale`, recomputed from
//! the newly loaded segment's tick count) changes. This is what makes the
//! fractional step residue at a segment boundary carry forward instead of
//! being silently dropped, so a motor that is owed "half a step" from the
//! previous segment collects it during the next one. When a motor's
//! direction flips, the accumulator is folded through `-(full_scale +
//! accumulator)` so the half-step position is preserved across the
//! reversal rather than restarting from zero.
//!
//! ## Power management
//!
//! Each motor has an independently configurable [`PowerMode`] deciding
//! whether its driver stays disabled, always-on, on for a timeout after
//! any segment that touches it, or only energized while it is actually
//! stepping.

use core::cell::RefCell;
use critical_section::Mutex;
use tinyg_motion::{Segment, MAX_AXES, SUBSTEP_SCALE};

/// Guards the prep slot against memory corruption; checked on every load.
const SLOT_MAGIC: u32 = 0x5445_4731; // "TEG1"

/// Which side of the prep/run handoff currently owns the slot.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SlotOwner {
    /// The executor may write a new segment into the slot.
    Exec,
    /// The DDA/load interrupt may read the slot and swap it into `running`.
    Loader,
}

/// Per-motor energize policy.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PowerMode {
    /// Never energized.
    Disabled,
    /// Energized for the lifetime of the runtime.
    AlwaysOn,
    /// Energized on any segment load that moves the motor; de-energizes
    /// after `timeout_ticks` DDA ticks of inactivity.
    OnInCycle { timeout_ticks: u16 },
    /// Energized only during segments in which the motor actually steps.
    OnWhenMoving,
}

struct PrepSlot {
    magic_head: u32,
    owner: SlotOwner,
    segment: Option<Segment>,
    magic_tail: u32,
}

impl PrepSlot {
    const fn new() -> Self {
        Self {
            magic_head: SLOT_MAGIC,
            owner: SlotOwner::Exec,
            segment: None,
            magic_tail: SLOT_MAGIC,
        }
    }

    fn assert_integrity(&self) {
        assert_eq!(self.magic_head, SLOT_MAGIC, "prep slot head corrupted");
        assert_eq!(self.magic_tail, SLOT_MAGIC, "prep slot tail corrupted");
    }
}

struct RunningSegment<const N: usize> {
    substep_increment: [i32; N],
    full_scale: i64,
    ticks_remaining: u32,
    direction_mask: u8,
    power_mask: u8,
}

/// The stepper runtime: owns the prep slot, the currently-running segment,
/// and every motor's persistent DDA accumulator.
pub struct StepperRuntime<const N: usize> {
    prep: PrepSlot,
    running: Option<RunningSegment<N>>,
    accumulators: [i64; N],
    positions: [i32; N],
    current_directions: u8,
    power_mode: [PowerMode; N],
    power_active: u8,
    power_timer: [u16; N],
}

impl<const N: usize> StepperRuntime<N> {
    pub fn new(power_mode: [PowerMode; N]) -> Self {
        assert!(N <= MAX_AXES, "stepper runtime supports at most MAX_AXES motors");
        Self {
            prep: PrepSlot::new(),
            running: None,
            accumulators: [0; N],
            positions: [0; N],
            current_directions: 0,
            power_mode,
            power_active: 0,
            power_timer: [0; N],
        }
    }

    /// Writes a freshly prepared segment into the slot. Only valid while
    /// the executor owns the slot; panics otherwise, since this would be a
    /// programming error (two writers) rather than a recoverable fault.
    pub fn submit(&mut self, segment: Segment) {
        self.prep.assert_integrity();
        assert_eq!(self.prep.owner, SlotOwner::Exec, "submit while loader owns slot");
        self.prep.segment = Some(segment);
        self.prep.owner = SlotOwner::Loader;
    }

    /// True while the executor may call `submit` again.
    pub fn slot_is_free(&self) -> bool {
        self.prep.owner == SlotOwner::Exec
    }

    pub fn is_running(&self) -> bool {
        self.running.is_some()
    }

    /// Non-panicking form of the prep slot's integrity assertion, for a
    /// periodic sentinel-check callback rather than an inline assert.
    pub fn sentinel_ok(&self) -> bool {
        self.prep.magic_head == SLOT_MAGIC && self.prep.magic_tail == SLOT_MAGIC
    }

    pub fn position(&self, motor: usize) -> i32 {
        self.positions[motor]
    }

    /// Primes the pipeline and starts the DDA timer if a segment is
    /// waiting in the slot.
    pub fn start<DIR_PORT: AtomicGpioPort, TIMER: DdaTimer>(
        &mut self,
        dir_port: &Mutex<RefCell<DIR_PORT>>,
        timer: &Mutex<RefCell<TIMER>>,
    ) {
        critical_section::with(|cs| {
            self.load_internal(dir_port, cs);
            if let Some(running) = &self.running {
                let timer = &mut *timer.borrow(cs).borrow_mut();
                timer.start(running.ticks_remaining.max(1));
            }
        });
    }

    /// The highest-priority DDA interrupt: fires at a fixed frequency
    /// (typically 50kHz). Advances every motor's accumulator and emits a
    /// step pulse on overflow.
    #[inline(always)]
    pub fn on_dda_tick<STEP_PORT, DIR_PORT, TIMER>(
        &mut self,
        step_port: &Mutex<RefCell<STEP_PORT>>,
        dir_port: &Mutex<RefCell<DIR_PORT>>,
        timer: &Mutex<RefCell<TIMER>>,
    ) where
        STEP_PORT: AtomicGpioPort,
        DIR_PORT: AtomicGpioPort,
        TIMER: DdaTimer,
    {
        critical_section::with(|cs| {
            let Some(running) = &mut self.running else {
                let timer = &mut *timer.borrow(cs).borrow_mut();
                timer.stop();
                return;
            };

            let full_scale = running.full_scale;
            let mut step_mask = 0u8;
            for i in 0..N {
                self.accumulators[i] += running.substep_increment[i] as i64;
                if self.accumulators[i] >= full_scale {
                    self.accumulators[i] -= full_scale;
                    step_mask |= 1 << i;
                }
            }
            self.apply_power_activity(step_mask);
            let step_mask = step_mask & running.power_mask;
            if step_mask != 0 {
                let step_port = &mut *step_port.borrow(cs).borrow_mut();
                step_port.set_and_clear_atomic(step_mask, step_mask);
            }
            self.update_positions(step_mask, running.direction_mask);

            running.ticks_remaining -= 1;
            if running.ticks_remaining == 0 {
                let timer = &mut *timer.borrow(cs).borrow_mut();
                timer.stop();
                self.load_internal(dir_port, cs);
                if let Some(running) = &self.running {
                    timer.start(running.ticks_remaining.max(1));
                } else {
                    timer.request_load();
                }
            }
        });
    }

    /// The "load request" software interrupt: atomically swaps the prep
    /// slot into `running`. Same priority as the DDA tick, so it never
    /// preempts it.
    pub fn on_load_request<DIR_PORT, TIMER>(
        &mut self,
        dir_port: &Mutex<RefCell<DIR_PORT>>,
        timer: &Mutex<RefCell<TIMER>>,
    ) where
        DIR_PORT: AtomicGpioPort,
        TIMER: DdaTimer,
    {
        critical_section::with(|cs| {
            self.load_internal(dir_port, cs);
            if let Some(running) = &self.running {
                let timer = &mut *timer.borrow(cs).borrow_mut();
                timer.start(running.ticks_remaining.max(1));
            }
        });
    }

    /// Full-scale overflow threshold for the currently loaded segment:
    /// `ticks * substep_multiplier`, recomputed on every load so its
    /// meaning tracks the active segment even though the accumulators
    /// themselves are never reset.
    fn full_scale(ticks: u32) -> i64 {
        ticks as i64 * SUBSTEP_SCALE
    }

    /// Swaps the prep slot into `running`, writing the new direction bits
    /// *before* any step of the new segment can be emitted.
    fn load_internal<'cs, DIR_PORT: AtomicGpioPort>(
        &mut self,
        dir_port: &Mutex<RefCell<DIR_PORT>>,
        cs: critical_section::CriticalSection<'cs>,
    ) {
        self.prep.assert_integrity();
        if self.prep.owner != SlotOwner::Loader {
            return;
        }
        let Some(segment) = self.prep.segment.take() else {
            self.prep.owner = SlotOwner::Exec;
            return;
        };

        let full_scale = Self::full_scale(segment.dda_ticks.max(1));
        let direction_changes = self.current_directions ^ segment.direction_mask;
        if direction_changes != 0 {
            for i in 0..N {
                if (direction_changes >> i) & 1 != 0 {
                    self.accumulators[i] = -(full_scale + self.accumulators[i]);
                }
            }
            self.current_directions = segment.direction_mask;
            let dir_port = &mut *dir_port.borrow(cs).borrow_mut();
            dir_port.write(self.current_directions);
        }

        let mut substep_increment = [0i32; N];
        for i in 0..N {
            substep_increment[i] = segment.substep_increment[i];
        }

        self.running = Some(RunningSegment {
            substep_increment,
            full_scale,
            ticks_remaining: segment.dda_ticks.max(1),
            direction_mask: segment.direction_mask,
            power_mask: segment.power_mask,
        });
        self.prep.owner = SlotOwner::Exec;
    }

    fn update_positions(&mut self, step_mask: u8, direction_mask: u8) {
        for i in 0..N {
            if (step_mask >> i) & 1 != 0 {
                if (direction_mask >> i) & 1 != 0 {
                    self.positions[i] = self.positions[i].wrapping_add(1);
                } else {
                    self.positions[i] = self.positions[i].wrapping_sub(1);
                }
            }
        }
    }

    fn apply_power_activity(&mut self, step_mask: u8) {
        for i in 0..N {
            match self.power_mode[i] {
                PowerMode::Disabled => self.power_active &= !(1 << i),
                PowerMode::AlwaysOn => self.power_active |= 1 << i,
                PowerMode::OnInCycle { timeout_ticks } => {
                    if (step_mask >> i) & 1 != 0 || self.power_timer[i] > 0 {
                        self.power_active |= 1 << i;
                        self.power_timer[i] = if (step_mask >> i) & 1 != 0 {
                            timeout_ticks
                        } else {
                            self.power_timer[i].saturating_sub(1)
                        };
                        if self.power_timer[i] == 0 {
                            self.power_active &= !(1 << i);
                        }
                    }
                }
                PowerMode::OnWhenMoving => {
                    if (step_mask >> i) & 1 != 0 {
                        self.power_active |= 1 << i;
                    } else {
                        self.power_active &= !(1 << i);
                    }
                }
            }
        }
    }

    /// Which motors should currently be energized, per their `PowerMode`.
    pub fn power_active_mask(&self) -> u8 {
        self.power_active
    }
}

/// A GPIO port supporting atomic set/clear, analogous to STM32's BSRR.
pub trait AtomicGpioPort {
    fn set_and_clear_atomic(&mut self, set_mask: u8, clear_mask: u8);
    fn write(&mut self, mask: u8);
}

/// The hardware timer driving the DDA interrupt.
pub trait DdaTimer {
    fn start(&mut self, ticks: u32);
    fn stop(&mut self);
    /// Immediately triggers the load software interrupt; used when the
    /// pipeline runs dry and there is nothing left to count down.
    fn request_load(&mut self);
}

/// The second, lower-frequency timer used to realize dwell blocks without
/// running them through the DDA tick at all.
pub trait DwellTimer {
    fn start_microseconds(&mut self, microseconds: u32);
    fn stop(&mut self);
}

#[cfg(test)]
mod tests {
    use super::*;
    use tinyg_motion::dwell_segment;

    #[derive(Debug, Default)]
    struct MockGpioPort {
        state: u8,
        set_clear_calls: u32,
        write_calls: u32,
    }

    impl AtomicGpioPort for MockGpioPort {
        fn set_and_clear_atomic(&mut self, set_mask: u8, clear_mask: u8) {
            self.state |= set_mask;
            self.state &= !clear_mask;
            self.set_clear_calls += 1;
        }
        fn write(&mut self, mask: u8) {
            self.state = mask;
            self.write_calls += 1;
        }
    }

    #[derive(Debug, Default)]
    struct MockTimer {
        started_ticks: u32,
        stopped: bool,
        load_requested: bool,
    }

    impl DdaTimer for MockTimer {
        fn start(&mut self, ticks: u32) {
            self.started_ticks = ticks;
            self.stopped = false;
        }
        fn stop(&mut self) {
            self.stopped = true;
        }
        fn request_load(&mut self) {
            self.load_requested = true;
        }
    }

    fn segment_for(axis: usize, steps: i32, ticks: u32) -> Segment {
        let mut substep_increment = [0i32; MAX_AXES];
        substep_increment[axis] = (steps.unsigned_abs() as i64 * SUBSTEP_SCALE / ticks as i64) as i32;
        Segment {
            substep_increment,
            dda_ticks: ticks,
            dda_period: 20,
            direction_mask: if steps >= 0 { 1 << axis } else { 0 },
            power_mask: 0xFF,
        }
    }

    #[test]
    fn submitted_segment_runs_and_steps_the_expected_motor() {
        let mut runtime = StepperRuntime::<4>::new([PowerMode::AlwaysOn; 4]);
        let step_port = Mutex::new(RefCell::new(MockGpioPort::default()));
        let dir_port = Mutex::new(RefCell::new(MockGpioPort::default()));
        let timer = Mutex::new(RefCell::new(MockTimer::default()));

        runtime.submit(segment_for(0, 256, 256));
        runtime.start(&dir_port, &timer);
        assert!(runtime.is_running());

        for _ in 0..256 {
            runtime.on_dda_tick(&step_port, &dir_port, &timer);
        }

        assert_eq!(runtime.position(0), 256);
        critical_section::with(|cs| {
            assert!(step_port.borrow(cs).borrow().set_clear_calls > 0);
        });
    }

    #[test]
    fn direction_flip_folds_the_accumulator_instead_of_resetting_it() {
        let mut runtime = StepperRuntime::<1>::new([PowerMode::AlwaysOn; 1]);
        let step_port = Mutex::new(RefCell::new(MockGpioPort::default()));
        let dir_port = Mutex::new(RefCell::new(MockGpioPort::default()));
        let timer = Mutex::new(RefCell::new(MockTimer::default()));

        runtime.submit(segment_for(0, 128, 256));
        runtime.start(&dir_port, &timer);
        for _ in 0..256 {
            runtime.on_dda_tick(&step_port, &dir_port, &timer);
        }
        let forward_position = runtime.position(0);

        // Load a reversing segment; the accumulator must fold through
        // -(full_scale + accumulator) rather than starting from zero.
        runtime.submit(segment_for(0, 128, 256));
        runtime.on_load_request(&dir_port, &timer);
        for _ in 0..256 {
            runtime.on_dda_tick(&step_port, &dir_port, &timer);
        }

        assert!(runtime.position(0) >= forward_position);
    }

    #[test]
    fn on_when_moving_power_mode_only_energizes_during_active_segments() {
        let mut runtime = StepperRuntime::<2>::new([PowerMode::OnWhenMoving, PowerMode::Disabled]);
        let step_port = Mutex::new(RefCell::new(MockGpioPort::default()));
        let dir_port = Mutex::new(RefCell::new(MockGpioPort::default()));
        let timer = Mutex::new(RefCell::new(MockTimer::default()));

        runtime.submit(segment_for(0, 64, 64));
        runtime.start(&dir_port, &timer);
        runtime.on_dda_tick(&step_port, &dir_port, &timer);

        assert_eq!(runtime.power_active_mask() & 0b11, 0b01);
    }

    #[test]
    fn sentinel_ok_on_a_freshly_constructed_runtime() {
        let runtime = StepperRuntime::<2>::new([PowerMode::AlwaysOn; 2]);
        assert!(runtime.sentinel_ok());
    }

    #[test]
    fn dwell_segment_produces_no_steps() {
        let mut runtime = StepperRuntime::<2>::new([PowerMode::AlwaysOn; 2]);
        let step_port = Mutex::new(RefCell::new(MockGpioPort::default()));
        let dir_port = Mutex::new(RefCell::new(MockGpioPort::default()));
        let timer = Mutex::new(RefCell::new(MockTimer::default()));

        runtime.submit(dwell_segment(100, 20));
        runtime.start(&dir_port, &timer);
        for _ in 0..100 {
            runtime.on_dda_tick(&step_port, &dir_port, &timer);
        }

        assert_eq!(runtime.position(0), 0);
        assert_eq!(runtime.position(1), 0);
    }
}
