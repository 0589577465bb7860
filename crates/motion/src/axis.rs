//! Axis identities and the per-axis motion limits the planner enforces.

/// Maximum number of simultaneously controlled axes (and, index for index,
/// motor channels: each axis drives exactly one motor channel).
pub const MAX_AXES: usize = 6;

/// Logical machine axis. `X`/`Y`/`Z` are linear; `A`/`B`/`C` are the rotary
/// axes around them.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde-support", derive(serde::Serialize, serde::Deserialize))]
pub enum Axis {
    X = 0,
    Y = 1,
    Z = 2,
    A = 3,
    B = 4,
    C = 5,
}

impl Axis {
    pub const ALL: [Axis; MAX_AXES] = [Axis::X, Axis::Y, Axis::Z, Axis::A, Axis::B, Axis::C];

    pub const fn index(self) -> usize {
        self as usize
    }

    pub const fn is_linear(self) -> bool {
        matches!(self, Axis::X | Axis::Y | Axis::Z)
    }

    pub const fn is_rotary(self) -> bool {
        !self.is_linear()
    }
}

/// Per-axis limits the planner uses to size junctions, ramps, and cruise
/// velocities. Distances are in the caller's native units (mm or degrees);
/// velocity/jerk/accel share that unit's time base (typically units/min,
/// units/min^3, units/min^2).
///
/// `max_accel` has no literal counterpart in real TinyG configuration, which
/// derives a peak ramp acceleration from jerk alone. It is carried here as an
/// explicit limit because the segment executor's seven-phase profile needs a
/// real ceiling for when the constant-acceleration phases 2/6 appear versus
/// collapse to a pure S-ramp; see DESIGN.md.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct AxisLimits {
    pub max_velocity: f32,
    pub max_accel: f32,
    pub max_jerk: f32,
    pub junction_deviation: f32,
}

impl Default for AxisLimits {
    fn default() -> Self {
        Self {
            max_velocity: 0.0,
            max_accel: 0.0,
            max_jerk: 0.0,
            junction_deviation: 0.0,
        }
    }
}

/// Scales a per-axis limit array down to the single number that bounds a
/// move along `unit_vector`: the smallest value any participating axis can
/// sustain once its component of the move is accounted for.
///
/// Returns `f32::INFINITY` if the move has no participating axes (all-zero
/// unit vector), which callers should treat as "unreachable" rather than
/// "unbounded".
pub fn scaled_limit(unit_vector: &[f32; MAX_AXES], per_axis_limit: &[f32; MAX_AXES]) -> f32 {
    let mut limit = f32::INFINITY;
    let mut participated = false;
    for i in 0..MAX_AXES {
        let component = unit_vector[i];
        if component.abs() > f32::EPSILON {
            participated = true;
            let axis_limit = per_axis_limit[i] / component.abs();
            if axis_limit < limit {
                limit = axis_limit;
            }
        }
    }
    if participated {
        limit
    } else {
        f32::INFINITY
    }
}
