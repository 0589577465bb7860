//! # Deterministic Simulation Harness
//!
//! Drives a real `ControllerLoop`/`MotionPlanner`/`SegmentExecutor`/
//! `StepperRuntime` stack in-process, against virtual GPIO ports, a
//! virtual DDA timer, and virtual limit-switch pins, so the six scenarios
//! in §8 run as ordinary `#[test]`s instead of needing physical hardware
//! or real time.

pub mod fake_mcu;
pub mod harness;

pub use fake_mcu::{PulseTrace, RecordingPort, VirtualPin, VirtualTimer};
pub use harness::{Controller, QueueWordSource, RecordingSink, SimHarness, MOTORS};
