//! The Gcode-semantic mode group: everything G17/18/19, G20/21, G90/91,
//! G93/94, and the motion-mode word (G0/G1/G2/G3/G80) select between.

/// Active work plane, selected by G17/G18/G19.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum Plane {
    #[default]
    Xy,
    Xz,
    Yz,
}

/// Linear unit system, selected by G20/G21.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum Units {
    Inches,
    #[default]
    Millimeters,
}

impl Units {
    /// Conversion factor to millimeters.
    pub fn to_mm_factor(self) -> f32 {
        match self {
            Units::Inches => 25.4,
            Units::Millimeters => 1.0,
        }
    }
}

/// Absolute vs. incremental target interpretation, selected by G90/G91.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum DistanceMode {
    #[default]
    Absolute,
    Incremental,
}

/// Feedrate interpretation, selected by G93/G94.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum FeedrateMode {
    /// Feedrate is in units/minute.
    #[default]
    UnitsPerMinute,
    /// Feedrate is the reciprocal of the time, in minutes, the move must
    /// take (1/feed = minutes for the move).
    InverseTime,
}

/// The active motion mode, selected by G0/G1/G2/G3/G80 and carried forward
/// by modal Gcode (a bare coordinate line repeats the last motion mode).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum MotionMode {
    #[default]
    Cancelled,
    Rapid,
    Linear,
    ClockwiseArc,
    CounterClockwiseArc,
}
