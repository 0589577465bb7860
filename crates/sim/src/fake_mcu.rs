//! Virtual hardware for `tinyg-sim`'s harness: stand-ins for the GPIO
//! ports, the DDA timer, and the limit-switch pins a real board would wire
//! into `tinyg-driver-stepper`/`tinyg-driver-endstop`, driven by a virtual
//! clock instead of real interrupts so a whole motion program can be run
//! to completion deterministically and instantly.

use std::cell::Cell;
use std::convert::Infallible;
use std::rc::Rc;

use embedded_hal::digital::{ErrorType, InputPin};
use tinyg_driver_stepper::{AtomicGpioPort, DdaTimer};

/// Records every pulse the stepper runtime's DDA tick emits, in tick order,
/// as `(set_mask, clear_mask)` pairs — a step/dir trace a scenario test can
/// assert against instead of only checking final position.
#[derive(Debug, Default, Clone)]
pub struct PulseTrace {
    pub pulses: Vec<(u8, u8)>,
    pub writes: Vec<u8>,
}

/// A port that both records its own activity and is shared between the
/// "step" and "direction" roles the same way a real board wires two
/// distinct pin groups to the same runtime.
#[derive(Clone)]
pub struct RecordingPort {
    trace: Rc<Cell<Option<PulseTrace>>>,
}

impl RecordingPort {
    pub fn new() -> Self {
        Self { trace: Rc::new(Cell::new(Some(PulseTrace::default()))) }
    }

    fn with_trace<T>(&self, f: impl FnOnce(&mut PulseTrace) -> T) -> T {
        let mut trace = self.trace.take().unwrap_or_default();
        let result = f(&mut trace);
        self.trace.set(Some(trace));
        result
    }

    pub fn trace(&self) -> PulseTrace {
        self.with_trace(|t| t.clone())
    }
}

impl AtomicGpioPort for RecordingPort {
    fn set_and_clear_atomic(&mut self, set_mask: u8, clear_mask: u8) {
        self.with_trace(|t| t.pulses.push((set_mask, clear_mask)));
    }
    fn write(&mut self, mask: u8) {
        self.with_trace(|t| t.writes.push(mask));
    }
}

/// A virtual DDA timer: instead of arming real hardware, it just remembers
/// how many ticks were requested and whether a load was requested, for the
/// harness's step loop to act on synchronously.
#[derive(Debug, Default, Clone)]
pub struct VirtualTimer {
    state: Rc<Cell<VirtualTimerState>>,
}

#[derive(Debug, Default, Clone, Copy)]
struct VirtualTimerState {
    running: bool,
    ticks_remaining: u32,
    load_requested: bool,
}

impl VirtualTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// True once `start` has been called with nothing stopping it since.
    pub fn is_running(&self) -> bool {
        self.state.get().running
    }

    /// Consumes and clears a pending load request, the way a real load
    /// software interrupt is serviced once and then re-armed.
    pub fn take_load_request(&self) -> bool {
        let mut s = self.state.get();
        let requested = s.load_requested;
        s.load_requested = false;
        self.state.set(s);
        requested
    }
}

impl DdaTimer for VirtualTimer {
    fn start(&mut self, ticks: u32) {
        let mut s = self.state.get();
        s.running = true;
        s.ticks_remaining = ticks;
        self.state.set(s);
    }
    fn stop(&mut self) {
        let mut s = self.state.get();
        s.running = false;
        self.state.set(s);
    }
    fn request_load(&mut self) {
        let mut s = self.state.get();
        s.load_requested = true;
        self.state.set(s);
    }
}

/// A settable digital input pin for simulating limit switches: the
/// scenario test flips `set_high`/`set_low` directly instead of wiring a
/// real debounced signal.
#[derive(Clone)]
pub struct VirtualPin {
    high: Rc<Cell<bool>>,
}

impl VirtualPin {
    pub fn new(initially_high: bool) -> Self {
        Self { high: Rc::new(Cell::new(initially_high)) }
    }

    pub fn set_high(&self) {
        self.high.set(true);
    }

    pub fn set_low(&self) {
        self.high.set(false);
    }
}

impl ErrorType for VirtualPin {
    type Error = Infallible;
}

impl InputPin for VirtualPin {
    fn is_high(&mut self) -> Result<bool, Infallible> {
        Ok(self.high.get())
    }
    fn is_low(&mut self) -> Result<bool, Infallible> {
        Ok(!self.high.get())
    }
}
