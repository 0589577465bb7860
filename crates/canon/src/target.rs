//! Target resolution: turns an incoming, partially-specified target vector
//! plus the active mode group into an absolute target in machine mm.

use crate::axis_config::{AxisConfig, AxisMode};
use crate::coord::CoordinateSystem;
use crate::modes::{DistanceMode, Units};
use tinyg_motion::{Axis, MAX_AXES};

/// A single axis word from the Gcode line: the value as written, and
/// whether this axis was actually present on the line (an axis absent
/// from the line keeps its previous target under every distance mode).
#[derive(Debug, Copy, Clone)]
pub struct AxisTarget {
    pub value: f32,
    pub specified: bool,
}

impl Default for AxisTarget {
    fn default() -> Self {
        Self {
            value: 0.0,
            specified: false,
        }
    }
}

/// The incoming target vector for one resolution pass.
pub type TargetUpdate = [AxisTarget; MAX_AXES];

/// Resolves a raw target vector into absolute machine-mm coordinates.
///
/// For linear axes: convert inches to mm if `units == Inches`, then add the
/// coordinate-system offset and origin offset in absolute mode, or add the
/// previous target in incremental mode.
///
/// For rotary axes: `Radius` mode converts the commanded linear distance to
/// degrees via the axis's `rotary_radius`; `Slave*` modes synthesize
/// rotation from the path length of the named linear subspace rather than
/// reading the word directly.
pub fn resolve_target(
    update: &TargetUpdate,
    previous: &[f32; MAX_AXES],
    axis_configs: &[AxisConfig; MAX_AXES],
    coordinate_system: &CoordinateSystem,
    origin_offset: &[f32; MAX_AXES],
    units: Units,
    distance_mode: DistanceMode,
) -> [f32; MAX_AXES] {
    let mut linear_delta = [0.0f32; MAX_AXES];
    let mut resolved = *previous;

    for axis in Axis::ALL {
        let i = axis.index();
        let word = update[i];
        if !word.specified {
            continue;
        }
        if axis.is_linear() {
            let mm = word.value * units.to_mm_factor();
            resolved[i] = match distance_mode {
                DistanceMode::Absolute => mm + coordinate_system.offset[i] + origin_offset[i],
                DistanceMode::Incremental => previous[i] + mm,
            };
            linear_delta[i] = resolved[i] - previous[i];
        }
    }

    for axis in Axis::ALL {
        let i = axis.index();
        if axis.is_linear() {
            continue;
        }
        let config = &axis_configs[i];
        match config.mode {
            AxisMode::Radius => {
                let word = update[i];
                if word.specified {
                    let degrees = (word.value / config.rotary_radius).to_degrees();
                    resolved[i] = match distance_mode {
                        DistanceMode::Absolute => degrees,
                        DistanceMode::Incremental => previous[i] + degrees,
                    };
                }
            }
            AxisMode::SlaveOfX => resolved[i] = previous[i] + slave_path_length(&linear_delta, &[Axis::X]),
            AxisMode::SlaveOfY => resolved[i] = previous[i] + slave_path_length(&linear_delta, &[Axis::Y]),
            AxisMode::SlaveOfZ => resolved[i] = previous[i] + slave_path_length(&linear_delta, &[Axis::Z]),
            AxisMode::SlaveOfXy => resolved[i] = previous[i] + slave_path_length(&linear_delta, &[Axis::X, Axis::Y]),
            AxisMode::SlaveOfXz => resolved[i] = previous[i] + slave_path_length(&linear_delta, &[Axis::X, Axis::Z]),
            AxisMode::SlaveOfYz => resolved[i] = previous[i] + slave_path_length(&linear_delta, &[Axis::Y, Axis::Z]),
            AxisMode::SlaveOfXyz => {
                resolved[i] = previous[i] + slave_path_length(&linear_delta, &[Axis::X, Axis::Y, Axis::Z])
            }
            AxisMode::Disabled | AxisMode::Standard | AxisMode::Inhibited => {
                let word = update[i];
                if word.specified {
                    resolved[i] = match distance_mode {
                        DistanceMode::Absolute => word.value,
                        DistanceMode::Incremental => previous[i] + word.value,
                    };
                }
            }
        }
    }

    resolved
}

fn slave_path_length(linear_delta: &[f32; MAX_AXES], axes: &[Axis]) -> f32 {
    let mut sum_sq = 0.0f32;
    for axis in axes {
        let d = linear_delta[axis.index()];
        sum_sq += d * d;
    }
    sum_sq.sqrt()
}
