//! A `no_std` driver for debounced digital endstop/limit-switch inputs.
//!
//! Each switch is sampled on every call to [`Endstops::poll`], expected to
//! be called at a fixed scan rate from the controller's main loop. A
//! reading must hold steady for `lockout_ticks` consecutive polls before it
//! is reflected in the debounced state, and polarity is configurable per
//! switch so normally-open and normally-closed wiring can be mixed on the
//! same machine.

#![no_std]

use embedded_hal::digital::InputPin;

/// Switch wiring polarity: whether the triggered (hit) state corresponds to
/// the pin reading high or low.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Polarity {
    /// Triggered state reads electrically high.
    NormallyOpen,
    /// Triggered state reads electrically low.
    NormallyClosed,
}

impl Polarity {
    fn triggered(self, pin_high: bool) -> bool {
        match self {
            Polarity::NormallyOpen => pin_high,
            Polarity::NormallyClosed => !pin_high,
        }
    }
}

#[derive(Debug, Copy, Clone, Default)]
struct DebounceState {
    debounced: bool,
    candidate: bool,
    stable_ticks: u16,
}

/// A collection of debounced endstop input pins.
pub struct Endstops<const N: usize, PIN> {
    pins: [PIN; N],
    polarity: [Polarity; N],
    lockout_ticks: u16,
    state: [DebounceState; N],
    /// Bit `i` set if switch `i` transitioned from clear to triggered on
    /// the most recent `poll`.
    rising_edges: u8,
}

impl<const N: usize, PIN, E> Endstops<N, PIN>
where
    PIN: InputPin<Error = E>,
{
    /// Creates a new instance. `lockout_ticks` is how many consecutive
    /// identical readings are required before a state change is accepted;
    /// a scan rate of 1kHz with `lockout_ticks = 3` gives ~3ms of
    /// mechanical-bounce rejection.
    pub fn new(pins: [PIN; N], polarity: [Polarity; N], lockout_ticks: u16) -> Self {
        Self {
            pins,
            polarity,
            lockout_ticks: lockout_ticks.max(1),
            state: [DebounceState::default(); N],
            rising_edges: 0,
        }
    }

    /// Reads the raw (undebounced) state of a single switch.
    pub fn read_raw(&mut self, index: usize) -> Result<bool, E> {
        let pin_high = self.pins[index].is_high()?;
        Ok(self.polarity[index].triggered(pin_high))
    }

    /// Samples every switch, advances the debounce counters, and returns
    /// the debounced triggered state of each. Call at a fixed scan rate.
    pub fn poll(&mut self) -> Result<[bool; N], E> {
        let mut debounced = [false; N];
        self.rising_edges = 0;
        for i in 0..N {
            let raw = self.read_raw(i)?;
            let s = &mut self.state[i];
            if raw == s.candidate {
                if s.stable_ticks < self.lockout_ticks {
                    s.stable_ticks += 1;
                }
            } else {
                s.candidate = raw;
                s.stable_ticks = 1;
            }
            if s.stable_ticks >= self.lockout_ticks && s.debounced != s.candidate {
                let was_triggered = s.debounced;
                s.debounced = s.candidate;
                if s.debounced && !was_triggered {
                    self.rising_edges |= 1 << i;
                }
            }
            debounced[i] = s.debounced;
        }
        Ok(debounced)
    }

    /// Switches that transitioned from clear to triggered on the most
    /// recent `poll` call.
    pub fn rising_edges(&self) -> u8 {
        self.rising_edges
    }

    /// The current debounced state without sampling the pins again.
    pub fn debounced_states(&self) -> [bool; N] {
        let mut out = [false; N];
        for i in 0..N {
            out[i] = self.state[i].debounced;
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_hal_mock::pin::{Mock as PinMock, State, Transaction};

    #[test]
    fn debounced_state_ignores_a_single_bounce() {
        let pins = [PinMock::new(&[
            Transaction::get(State::Low),
            Transaction::get(State::High),
            Transaction::get(State::Low),
            Transaction::get(State::High),
            Transaction::get(State::High),
        ])];
        let mut endstops = Endstops::new(pins, [Polarity::NormallyOpen], 2);

        // Bounce: low, high, low, high, high -> only the last stable run
        // of two highs should flip the debounced state.
        assert_eq!(endstops.poll().unwrap(), [false]);
        assert_eq!(endstops.poll().unwrap(), [false]);
        assert_eq!(endstops.poll().unwrap(), [false]);
        assert_eq!(endstops.poll().unwrap(), [false]);
        assert_eq!(endstops.poll().unwrap(), [true]);
        assert_eq!(endstops.rising_edges(), 0b1);
    }

    #[test]
    fn normally_closed_polarity_inverts_the_trigger_sense() {
        let pins = [PinMock::new(&[
            Transaction::get(State::High),
            Transaction::get(State::High),
            Transaction::get(State::Low),
            Transaction::get(State::Low),
        ])];
        let mut endstops = Endstops::new(pins, [Polarity::NormallyClosed], 2);

        // High (untriggered, switch closed) then low (triggered, open).
        assert_eq!(endstops.poll().unwrap(), [false]);
        assert_eq!(endstops.poll().unwrap(), [false]);
        assert_eq!(endstops.poll().unwrap(), [false]);
        assert_eq!(endstops.poll().unwrap(), [true]);
    }

    #[test]
    fn six_axis_read_states_matches_configured_polarity() {
        let pins = [
            PinMock::new(&[Transaction::get(State::Low)]),
            PinMock::new(&[Transaction::get(State::High)]),
            PinMock::new(&[Transaction::get(State::Low)]),
            PinMock::new(&[Transaction::get(State::High)]),
            PinMock::new(&[Transaction::get(State::Low)]),
            PinMock::new(&[Transaction::get(State::Low)]),
        ];
        let mut endstops = Endstops::new(pins, [Polarity::NormallyOpen; 6], 1);
        let states = endstops.poll().unwrap();
        assert_eq!(states, [false, true, false, true, false, false]);
    }
}
