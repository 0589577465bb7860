//! Per-axis and per-motor configuration, and the derived steps-per-unit
//! scalar that ties a motor's electrical step angle to its axis's physical
//! units.

use tinyg_motion::Axis;

/// How an axis participates in motion.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum AxisMode {
    Disabled,
    Standard,
    Inhibited,
    /// Rotary axis whose commanded degrees are derived from a linear axis's
    /// travel via `radius`.
    Radius,
    /// Rotary axis that synthesizes its own rotation from the path length
    /// of the named linear subspace.
    SlaveOfX,
    SlaveOfY,
    SlaveOfZ,
    SlaveOfXy,
    SlaveOfXz,
    SlaveOfYz,
    SlaveOfXyz,
}

/// Static per-axis configuration.
#[derive(Debug, Copy, Clone)]
pub struct AxisConfig {
    pub mode: AxisMode,
    pub max_velocity: f32,
    pub max_feedrate: f32,
    pub travel_min: f32,
    pub travel_max: f32,
    pub max_jerk: f32,
    pub junction_deviation: f32,
    /// Radius used to convert linear mm to rotary degrees for `Radius` and
    /// `Slave*` modes. Unused on linear axes.
    pub rotary_radius: f32,
    pub homing_search_velocity: f32,
    pub homing_latch_velocity: f32,
    pub homing_search_backoff: f32,
    pub homing_latch_backoff: f32,
    pub homing_jerk: f32,
}

impl Default for AxisConfig {
    fn default() -> Self {
        Self {
            mode: AxisMode::Disabled,
            max_velocity: 0.0,
            max_feedrate: 0.0,
            travel_min: 0.0,
            travel_max: 0.0,
            max_jerk: 0.0,
            junction_deviation: 0.01,
            rotary_radius: 1.0,
            homing_search_velocity: 0.0,
            homing_latch_velocity: 0.0,
            homing_search_backoff: 0.0,
            homing_latch_backoff: 0.0,
            homing_jerk: 0.0,
        }
    }
}

impl AxisConfig {
    pub fn is_linear(&self, axis: Axis) -> bool {
        axis.is_linear()
    }

    pub fn soft_limit_violation(&self, axis: Axis, position: f32) -> bool {
        let _ = axis;
        position < self.travel_min || position > self.travel_max
    }
}

/// Motor wiring polarity: whether a logical-positive direction corresponds
/// to the electrical direction bit being set.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum MotorPolarity {
    Normal,
    Inverted,
}

/// Per-motor energize policy, mirrored by `tinyg_driver_stepper::PowerMode`
/// at the runtime layer; this is the configuration-time counterpart.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum MotorPowerMode {
    Disabled,
    AlwaysOn,
    OnInCycle,
    OnWhenMoving,
}

/// Static per-motor configuration. Up to six motors, each mapped 1:1 to an
/// axis by index.
#[derive(Debug, Copy, Clone)]
pub struct MotorConfig {
    pub microsteps: u16,
    pub whole_step_angle_degrees: f32,
    pub travel_per_rev: f32,
    pub polarity: MotorPolarity,
    pub power_mode: MotorPowerMode,
}

impl MotorConfig {
    /// Derives the steps-per-unit scalar: `(360 * microsteps) /
    /// (travel_per_rev * whole_step_angle_degrees)`. Any change to
    /// `microsteps`, `travel_per_rev`, or `whole_step_angle_degrees`
    /// invalidates a previously cached value; callers should recompute
    /// rather than cache across configuration changes.
    pub fn steps_per_unit(&self) -> f32 {
        (360.0 * self.microsteps as f32) / (self.travel_per_rev * self.whole_step_angle_degrees)
    }
}

impl Default for MotorConfig {
    fn default() -> Self {
        Self {
            microsteps: 1,
            whole_step_angle_degrees: 1.8,
            travel_per_rev: 1.0,
            polarity: MotorPolarity::Normal,
            power_mode: MotorPowerMode::Disabled,
        }
    }
}
