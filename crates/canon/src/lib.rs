//! # Canonical Machine
//!
//! Gcode-semantic state sitting above the motion pipeline: coordinate
//! systems and origin offsets, unit/plane/distance/path-control/feedrate
//! modes, motion mode, spindle/coolant bookkeeping, and the cycle state
//! that gates homing, probing, and jogging.
//!
//! This crate knows nothing about the wire protocol or G-code lexing; it
//! only exposes setters a parsed word stream can call and a target
//! resolver the motion planner consumes.

pub mod axis_config;
pub mod coord;
pub mod cycle;
pub mod error;
pub mod homing;
pub mod machine;
pub mod modes;
pub mod target;

pub use axis_config::{AxisConfig, AxisMode, MotorConfig, MotorPolarity, MotorPowerMode};
pub use coord::{CoordinateSystem, OriginOffsetState, NUM_COORDINATE_SYSTEMS};
pub use cycle::{CycleState, ExitCode};
pub use error::CmError;
pub use homing::{HomingCycle, HomingStep, ProbeCycle, ProbeOutcome};
pub use machine::CanonicalMachine;
pub use modes::{DistanceMode, FeedrateMode, MotionMode, Plane, Units};
pub use target::{AxisTarget, TargetUpdate};
pub use tinyg_motion::PathControl;

