//! # Controller
//!
//! The cooperative main-loop glue: binds the canonical machine, the motion
//! planner, and the homing/probe continuations to a caller-supplied Gcode
//! word source, one `tick()` per controller invocation.
//!
//! This crate owns no hardware. Switch state, sentinel validity, and
//! planner-idle status are observations the caller (a real firmware loop, or
//! `tinyg-sim`'s harness) hands in each tick; `tinyg-firmware`'s realizations
//! poll the actual drivers and compute them.

pub mod fault;
pub mod interfaces;
pub mod loop_;

pub use fault::HardFault;
pub use interfaces::{GcodeWordSource, PersistenceHook, ResponseSink, Word};
pub use loop_::{ActiveCycle, ControllerLoop, TickInputs};
pub use tinyg_canon::ExitCode;
