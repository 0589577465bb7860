//! The `CanonicalMachine`: owns the full Gcode-semantic mode group,
//! coordinate systems, origin offsets, and cycle state, and is the single
//! entry point a parsed word stream drives.

use crate::axis_config::AxisConfig;
use crate::coord::{CoordinateSystem, OriginOffsetState, NUM_COORDINATE_SYSTEMS};
use crate::cycle::{CycleState, ExitCode};
use crate::error::CmError;
use crate::modes::{DistanceMode, FeedrateMode, MotionMode, Plane, Units};
use crate::target::{resolve_target, TargetUpdate};
use tinyg_motion::{MotionPlanner, PathControl, MAX_AXES};
use tracing::{debug, info};

/// Spindle direction, tracked for status reporting only; PWM math and the
/// GPIO pins themselves are an explicit non-goal.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum SpindleState {
    #[default]
    Off,
    Clockwise,
    CounterClockwise,
}

/// Coolant relays, tracked for status reporting only. Flood and mist share
/// a single accepted-no-op GPIO surface at the collaborator layer; this
/// crate only remembers which were requested.
#[derive(Debug, Copy, Clone, Default)]
pub struct CoolantState {
    pub flood: bool,
    pub mist: bool,
}

/// The full Gcode-semantic machine state (§4.1).
pub struct CanonicalMachine {
    pub plane: Plane,
    pub units: Units,
    pub distance_mode: DistanceMode,
    pub path_control: PathControl,
    pub feedrate_mode: FeedrateMode,
    pub motion_mode: MotionMode,
    pub active_coordinate_system: usize,
    pub coordinate_systems: [CoordinateSystem; NUM_COORDINATE_SYSTEMS],
    pub origin_offset: OriginOffsetState,
    pub spindle: SpindleState,
    pub coolant: CoolantState,
    pub cycle_state: CycleState,
    /// Gcode-semantic endpoint of the last queued block ("model position").
    model_position: [f32; MAX_AXES],
    axis_configs: [AxisConfig; MAX_AXES],
    soft_limits_enabled: bool,
    last_feedrate: Option<f32>,
}

impl CanonicalMachine {
    pub fn axis_configs(&self) -> &[AxisConfig; MAX_AXES] {
        &self.axis_configs
    }

    pub fn new(axis_configs: [AxisConfig; MAX_AXES]) -> Self {
        Self {
            plane: Plane::default(),
            units: Units::default(),
            distance_mode: DistanceMode::default(),
            path_control: PathControl::Continuous,
            feedrate_mode: FeedrateMode::default(),
            motion_mode: MotionMode::default(),
            active_coordinate_system: 0,
            coordinate_systems: [CoordinateSystem::default(); NUM_COORDINATE_SYSTEMS],
            origin_offset: OriginOffsetState::default(),
            spindle: SpindleState::default(),
            coolant: CoolantState::default(),
            cycle_state: CycleState::Off,
            model_position: [0.0; MAX_AXES],
            axis_configs,
            // Off by default: a machine with unconfigured travel extents
            // would otherwise reject every move at (0, 0).
            soft_limits_enabled: false,
            last_feedrate: None,
        }
    }

    pub fn model_position(&self) -> [f32; MAX_AXES] {
        self.model_position
    }

    pub fn set_soft_limits_enabled(&mut self, enabled: bool) {
        self.soft_limits_enabled = enabled;
    }

    pub fn select_coordinate_system(&mut self, index: usize) -> Result<(), CmError> {
        if index >= NUM_COORDINATE_SYSTEMS {
            return Err(CmError::CoordinateSystemOutOfRange(index as u8));
        }
        info!(index, "selecting coordinate system");
        self.active_coordinate_system = index;
        Ok(())
    }

    pub fn set_coordinate_offset(&mut self, index: usize, offset: [f32; MAX_AXES]) -> Result<(), CmError> {
        if index >= NUM_COORDINATE_SYSTEMS {
            return Err(CmError::CoordinateSystemOutOfRange(index as u8));
        }
        self.coordinate_systems[index].offset = offset;
        Ok(())
    }

    pub fn set_plane(&mut self, plane: Plane) {
        self.plane = plane;
    }

    pub fn set_units(&mut self, units: Units) {
        self.units = units;
    }

    pub fn set_distance_mode(&mut self, mode: DistanceMode) {
        self.distance_mode = mode;
    }

    pub fn set_path_control(&mut self, mode: PathControl) {
        debug!(?mode, "path control changed");
        self.path_control = mode;
    }

    pub fn set_feedrate_mode(&mut self, mode: FeedrateMode) {
        self.feedrate_mode = mode;
    }

    /// Resolves and queues one straight move. `update` is the raw per-axis
    /// word set from the current Gcode line; `feedrate` is the last F word
    /// in effect (required unless the motion mode is `Rapid`).
    pub fn queue_linear_move(
        &mut self,
        planner: &mut MotionPlanner,
        update: &TargetUpdate,
        feedrate: Option<f32>,
    ) -> Result<ExitCode, CmError> {
        let coordinate_system = self.coordinate_systems[self.active_coordinate_system];
        let origin_offset = self.origin_offset.applied_offset();
        self.resolve_and_queue(planner, update, feedrate, &coordinate_system, &origin_offset)
    }

    /// G53: resolves and queues one straight move directly in machine
    /// coordinates, ignoring the active coordinate system and origin offset
    /// for this move only; neither is changed for subsequent lines.
    pub fn queue_linear_move_machine_coordinates(
        &mut self,
        planner: &mut MotionPlanner,
        update: &TargetUpdate,
        feedrate: Option<f32>,
    ) -> Result<ExitCode, CmError> {
        self.resolve_and_queue(planner, update, feedrate, &CoordinateSystem::default(), &[0.0; MAX_AXES])
    }

    fn resolve_and_queue(
        &mut self,
        planner: &mut MotionPlanner,
        update: &TargetUpdate,
        feedrate: Option<f32>,
        coordinate_system: &CoordinateSystem,
        origin_offset: &[f32; MAX_AXES],
    ) -> Result<ExitCode, CmError> {
        let feedrate = match self.motion_mode {
            MotionMode::Rapid => feedrate.or(self.last_feedrate).unwrap_or(f32::INFINITY),
            _ => feedrate.or(self.last_feedrate).ok_or(CmError::FeedrateMissing)?,
        };
        self.last_feedrate = Some(feedrate);

        let target = resolve_target(
            update,
            &self.model_position,
            &self.axis_configs,
            coordinate_system,
            origin_offset,
            self.units,
            self.distance_mode,
        );

        if self.soft_limits_enabled {
            for axis in tinyg_motion::Axis::ALL {
                let i = axis.index();
                if self.axis_configs[i].soft_limit_violation(axis, target[i]) {
                    return Err(CmError::SoftLimitExceeded(axis));
                }
            }
        }

        match planner.plan_move(target, feedrate, self.path_control) {
            Ok(()) => {
                self.model_position = target;
                Ok(ExitCode::Ok)
            }
            Err(tinyg_motion::MotionError::QueueFull) => Ok(ExitCode::QueueFull),
            Err(tinyg_motion::MotionError::InvalidMove) => Ok(ExitCode::AxisMissing),
            Err(tinyg_motion::MotionError::NoActiveBlock) => Ok(ExitCode::InternalError),
        }
    }

    pub fn queue_dwell(&mut self, planner: &mut MotionPlanner, seconds: f32) -> ExitCode {
        match planner.plan_dwell(seconds) {
            Ok(()) => ExitCode::Ok,
            Err(_) => ExitCode::QueueFull,
        }
    }

    /// Requests a feedhold, whether or not a cycle is currently active:
    /// ordinary machining never leaves `cycle_state` anywhere but `Off`, so
    /// gating this on anything but idempotence against an already-pending
    /// hold would make `!` unusable outside Homing/Probe. The caller (the
    /// planner-to-runtime bridge, which alone knows how far into the
    /// running block's profile the machine has reached) reprofiles the
    /// block's remaining length down to zero exit velocity and then calls
    /// `mark_held`.
    pub fn request_feedhold(&mut self) -> ExitCode {
        if matches!(self.cycle_state, CycleState::HoldRequested | CycleState::Held) {
            return ExitCode::Noop;
        }
        info!("feedhold requested");
        self.cycle_state = CycleState::HoldRequested;
        ExitCode::Ok
    }

    pub fn mark_held(&mut self) {
        self.cycle_state = CycleState::Held;
    }

    /// Resumes from a hold by rebuilding the forward plan from the held
    /// block; the actual replanning call, and re-admitting whatever the
    /// hold's reprofile cut short (`MotionPlanner::resume_from_hold`), are
    /// the caller's responsibility. This only clears the cycle-state gate.
    pub fn cycle_start(&mut self, planner: &mut MotionPlanner) -> ExitCode {
        if self.cycle_state != CycleState::Held {
            return ExitCode::Noop;
        }
        planner.finalize();
        self.cycle_state = CycleState::Machining;
        ExitCode::Ok
    }

    pub fn begin_cycle(&mut self, kind: CycleState, planner: &MotionPlanner) -> Result<(), CmError> {
        if self.cycle_state != CycleState::Off {
            return Err(CmError::CycleAlreadyActive);
        }
        if !planner.is_empty() {
            return Err(CmError::PlannerNotIdle);
        }
        self.cycle_state = kind;
        Ok(())
    }

    pub fn end_cycle(&mut self) {
        self.cycle_state = CycleState::Off;
    }

    pub fn set_spindle(&mut self, state: SpindleState) {
        self.spindle = state;
    }

    pub fn set_coolant(&mut self, flood: Option<bool>, mist: Option<bool>) {
        if let Some(flood) = flood {
            self.coolant.flood = flood;
        }
        if let Some(mist) = mist {
            self.coolant.mist = mist;
        }
    }
}
