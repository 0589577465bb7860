//! # Motion Crate
//!
//! The jerk-limited planner and segment executor at the heart of the
//! controller: turns resolved target positions into a smooth velocity
//! profile, then samples that profile into fixed-duration segments the
//! stepper runtime's DDA can run without any floating point of its own.
//!
//! This crate knows nothing about G-code, coordinate systems, or switches;
//! it only deals in axis-space targets, velocities, and the seven-phase
//! profile that connects them.

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(feature = "alloc")]
extern crate alloc;

pub mod axis;
pub mod block;
pub mod error;
pub mod executor;
pub mod planner;
pub mod profile;
pub mod segment;

pub use axis::{scaled_limit, Axis, AxisLimits, MAX_AXES};
pub use block::{BlockState, MotionBlock, MoveKind, PathControl};
pub use error::MotionError;
pub use executor::SegmentExecutor;
pub use planner::{MotionPlanner, PLANNER_QUEUE_LEN};
pub use segment::{dwell_segment, Segment, SUBSTEP_SCALE};
