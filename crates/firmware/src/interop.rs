//! Placeholder `ControllerLoop` collaborators for the three traits in
//! `tinyg-controller`'s §6 boundary whose real implementations (the wire
//! lexer, the response transport, and the NVRAM persistence store) are out
//! of scope here; see `SPEC_FULL.md` §6. These stand in so the firmware
//! wiring below can instantiate a concrete `ControllerLoop` today.

use tinyg_controller::{ExitCode, GcodeWordSource, PersistenceHook, ResponseSink, Word};

/// Never yields a word. A real build replaces this with a lexer sitting on
/// top of the UART byte stream.
#[derive(Default)]
pub struct NoWords;

impl GcodeWordSource for NoWords {
    fn next_word(&mut self) -> Option<Word> {
        None
    }
}

/// Logs every response over defmt instead of sending it to a host.
#[derive(Default)]
pub struct DefmtSink;

impl ResponseSink for DefmtSink {
    fn accept(&mut self, code: ExitCode, line_number: u32) {
        #[cfg(feature = "defmt-logging")]
        defmt::debug!("line {}: {}", line_number, defmt::Debug2Format(&code));
        #[cfg(not(feature = "defmt-logging"))]
        let _ = (code, line_number);
    }
}

/// Discards every coordinate-system persistence request. A real build
/// replaces this with a write to on-chip flash or EEPROM.
#[derive(Default)]
pub struct NullPersistence;

impl PersistenceHook for NullPersistence {
    fn persist(&mut self, _index: u8, _value: f64) {}
}
