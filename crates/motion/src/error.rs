//! Error types for the motion planning crate.

/// Errors that can occur while admitting or executing motion.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum MotionError {
    /// The planner's block ring is full and cannot accept new moves.
    QueueFull,
    /// The requested move is impossible (e.g. exceeds an axis limit with no
    /// participating axis to blame it on).
    InvalidMove,
    /// `generate_segment` was called on an executor with no active block.
    NoActiveBlock,
}
