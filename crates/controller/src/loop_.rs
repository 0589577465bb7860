//! `ControllerLoop`: the ordered cooperative dispatch of §5.
//!
//! Each `tick()` runs, in order: switch drain, sentinel check, active-cycle
//! continuation, planner promote/retire, Gcode line admission, and status
//! reporting. An earlier callback's non-`Ok`/`Eagain` result does not block
//! the callbacks after it in the same tick.

use crate::fault::HardFault;
use crate::interfaces::{GcodeWordSource, PersistenceHook, ResponseSink, Word};
use heapless::Vec as HVec;
use tinyg_canon::{
    AxisConfig, AxisTarget, CanonicalMachine, CycleState, ExitCode, HomingCycle, ProbeCycle, TargetUpdate,
};
use tinyg_motion::{Axis, MotionPlanner, PathControl, MAX_AXES};
use tracing::{debug, warn};

const MAX_WORDS_PER_LINE: usize = 24;

/// Which continuation, if any, currently owns the motion pipeline.
pub enum ActiveCycle {
    None,
    Homing(HomingCycle),
    Probe(ProbeCycle),
}

/// Everything a per-tick observation about the outside world the loop needs,
/// since this crate polls no hardware itself.
#[derive(Debug, Clone, Copy)]
pub struct TickInputs {
    /// Debounced state of the switch relevant to the active cycle, if any.
    pub switch_triggered: bool,
    /// True once the planner and stepper runtime have fully drained the last
    /// dispatched block.
    pub planner_idle: bool,
    /// False if the periodic sentinel-assertion callback found a corrupted
    /// magic constant anywhere in the pipeline.
    pub sentinel_ok: bool,
}

pub struct ControllerLoop<W, R, P> {
    pub cm: CanonicalMachine,
    pub planner: MotionPlanner,
    pub active_cycle: ActiveCycle,
    /// Per-axis homing/travel/jerk configuration, consulted by the active
    /// homing cycle each tick. Public so a config collaborator can push
    /// updates the same way it already can to `cm`/`planner` directly.
    pub axis_configs: [AxisConfig; MAX_AXES],
    word_source: W,
    response_sink: R,
    persistence: P,
    current_line: u32,
    fault: Option<HardFault>,
    /// F-word in effect across lines, independent of `cm`'s own tracking,
    /// so G28/G38.2 admission can still see the last commanded feedrate.
    pending_feedrate: Option<f32>,
}

impl<W: GcodeWordSource, R: ResponseSink, P: PersistenceHook> ControllerLoop<W, R, P> {
    pub fn new(cm: CanonicalMachine, planner: MotionPlanner, word_source: W, response_sink: R, persistence: P) -> Self {
        let axis_configs = *cm.axis_configs();
        Self {
            cm,
            planner,
            active_cycle: ActiveCycle::None,
            axis_configs,
            word_source,
            response_sink,
            persistence,
            current_line: 0,
            fault: None,
            pending_feedrate: None,
        }
    }

    pub fn fault(&self) -> Option<HardFault> {
        self.fault
    }

    /// Clears a latched hard fault. The caller is expected to have already
    /// de-energized and re-homed before calling this.
    pub fn reset_fault(&mut self) {
        self.fault = None;
    }

    pub fn persistence_mut(&mut self) -> &mut P {
        &mut self.persistence
    }

    /// Lets a collaborator feed more lines into the word source after
    /// construction, e.g. a simulation harness queuing a Gcode program.
    pub fn word_source_mut(&mut self) -> &mut W {
        &mut self.word_source
    }

    pub fn tick(&mut self, inputs: TickInputs) -> ExitCode {
        // 1. Switch flag drain: nothing to do here beyond logging, since the
        // debounced value already arrived via `inputs`; the real drain (ISR
        // flag -> debounced bool) lives in the firmware/sim poll loop.
        debug!(switch_triggered = inputs.switch_triggered, "switch state observed");

        // 2. Sentinel / assertion callback.
        if !inputs.sentinel_ok {
            warn!("sentinel check failed, latching hard fault");
            self.fault = Some(HardFault::SentinelCorrupted);
        }
        if self.fault.is_some() {
            return ExitCode::MemoryFault;
        }

        // 3. Active cycle continuation. A cycle finishing or failing here
        // does not block steps 4-6 from running in the same tick.
        let cycle_status = self.drive_active_cycle(inputs);

        // 4. Planner promote/retire. A block finishing while held still
        // retires (it's the decel-to-zero ramp a feedhold inserted), but
        // nothing new is promoted into `Running` until the hold lifts.
        if inputs.planner_idle {
            self.planner.retire_current();
            if self.planner.is_empty() && self.cm.cycle_state == CycleState::Machining {
                self.cm.end_cycle();
            }
        }
        if !self.is_held() {
            let _ = self.planner.activate_next();
        }

        // 5. Gcode word admission, only with room in the planner and no
        // cycle (or feedhold) holding exclusive ownership of it.
        let admission_status = if matches!(self.active_cycle, ActiveCycle::None) && !self.planner.is_full() && !self.is_held() {
            self.admit_next_line()
        } else {
            ExitCode::Noop
        };

        // 6. Status-report callback: surfaces whichever result is most
        // actionable this tick.
        let reported = if !matches!(cycle_status, ExitCode::Ok | ExitCode::Noop | ExitCode::Eagain) {
            cycle_status
        } else {
            admission_status
        };
        self.response_sink.accept(reported, self.current_line);
        reported
    }

    fn drive_active_cycle(&mut self, inputs: TickInputs) -> ExitCode {
        let status = match &mut self.active_cycle {
            ActiveCycle::None => return ExitCode::Noop,
            ActiveCycle::Homing(cycle) => cycle
                .next(&mut self.planner, &self.axis_configs, inputs.switch_triggered, inputs.planner_idle)
                .unwrap_or(ExitCode::InternalError),
            ActiveCycle::Probe(cycle) => cycle
                .next(&mut self.planner, inputs.switch_triggered, inputs.planner_idle)
                .unwrap_or(ExitCode::InternalError),
        };

        if matches!(status, ExitCode::Complete | ExitCode::HomingFailed | ExitCode::ProbeFailed) {
            self.active_cycle = ActiveCycle::None;
            self.cm.end_cycle();
        }
        status
    }

    fn admit_next_line(&mut self) -> ExitCode {
        let mut words: HVec<Word, MAX_WORDS_PER_LINE> = HVec::new();
        while let Some(word) = self.word_source.next_word() {
            if words.push(word).is_err() {
                return ExitCode::InternalError;
            }
        }
        if words.is_empty() {
            return ExitCode::Noop;
        }
        self.current_line += 1;
        self.dispatch_line(&words)
    }

    fn dispatch_line(&mut self, words: &[Word]) -> ExitCode {
        let mut target = TargetUpdate::default();
        let mut feedrate = None;
        let mut code_word = None;
        let mut p_word = None;
        let mut l_word = None;

        for word in words {
            match word.letter {
                'G' | 'M' => code_word = Some(*word),
                'F' => feedrate = Some(word.value as f32),
                'P' => p_word = Some(word.value as f32),
                'L' => l_word = Some(word.value as f32),
                'X' => target[Axis::X.index()] = AxisTarget { value: word.value as f32, specified: true },
                'Y' => target[Axis::Y.index()] = AxisTarget { value: word.value as f32, specified: true },
                'Z' => target[Axis::Z.index()] = AxisTarget { value: word.value as f32, specified: true },
                'A' => target[Axis::A.index()] = AxisTarget { value: word.value as f32, specified: true },
                'B' => target[Axis::B.index()] = AxisTarget { value: word.value as f32, specified: true },
                'C' => target[Axis::C.index()] = AxisTarget { value: word.value as f32, specified: true },
                _ => {}
            }
        }
        if feedrate.is_some() {
            self.pending_feedrate = feedrate;
        }

        let Some(code) = code_word else {
            return ExitCode::Noop;
        };

        match code.letter {
            'G' => self.dispatch_g_code(code.value, &target, p_word, l_word),
            'M' => self.dispatch_m_code(code.value),
            _ => ExitCode::Noop,
        }
    }

    fn dispatch_g_code(&mut self, code: f64, target: &TargetUpdate, p_word: Option<f32>, l_word: Option<f32>) -> ExitCode {
        use tinyg_canon::{DistanceMode, FeedrateMode, MotionMode, Plane, Units};

        if approx(code, 0.0) {
            self.cm.motion_mode = MotionMode::Rapid;
        } else if approx(code, 1.0) {
            self.cm.motion_mode = MotionMode::Linear;
        }

        if approx(code, 0.0) || approx(code, 1.0) {
            return match self.cm.queue_linear_move(&mut self.planner, target, self.pending_feedrate) {
                Ok(status) => status,
                Err(err) => cm_error_to_exit_code(err),
            };
        }
        if approx(code, 4.0) {
            let seconds = p_word.unwrap_or(0.0);
            return self.cm.queue_dwell(&mut self.planner, seconds);
        }
        if approx(code, 17.0) {
            self.cm.set_plane(Plane::Xy);
            return ExitCode::Ok;
        }
        if approx(code, 18.0) {
            self.cm.set_plane(Plane::Xz);
            return ExitCode::Ok;
        }
        if approx(code, 19.0) {
            self.cm.set_plane(Plane::Yz);
            return ExitCode::Ok;
        }
        if approx(code, 20.0) {
            self.cm.set_units(Units::Inches);
            return ExitCode::Ok;
        }
        if approx(code, 21.0) {
            self.cm.set_units(Units::Millimeters);
            return ExitCode::Ok;
        }
        if approx(code, 90.0) {
            self.cm.set_distance_mode(DistanceMode::Absolute);
            return ExitCode::Ok;
        }
        if approx(code, 91.0) {
            self.cm.set_distance_mode(DistanceMode::Incremental);
            return ExitCode::Ok;
        }
        if approx(code, 93.0) {
            self.cm.set_feedrate_mode(FeedrateMode::InverseTime);
            return ExitCode::Ok;
        }
        if approx(code, 94.0) {
            self.cm.set_feedrate_mode(FeedrateMode::UnitsPerMinute);
            return ExitCode::Ok;
        }
        if (54.0..=59.0).contains(&code) {
            return match self.cm.select_coordinate_system((code - 54.0).round() as usize) {
                Ok(()) => ExitCode::Ok,
                Err(err) => cm_error_to_exit_code(err),
            };
        }
        // G53: the current line's motion runs in raw machine coordinates.
        // Word capture only keeps one G code per line (the last one wins),
        // so `G53 G1 Xn` and a bare `G53 Xn` dispatch identically, riding
        // whatever motion mode is already active.
        if approx(code, 53.0) {
            return match self.cm.queue_linear_move_machine_coordinates(&mut self.planner, target, self.pending_feedrate)
            {
                Ok(status) => status,
                Err(err) => cm_error_to_exit_code(err),
            };
        }
        if approx(code, 61.0) {
            self.cm.set_path_control(PathControl::ExactPath);
            return ExitCode::Ok;
        }
        if approx(code, 61.1) {
            self.cm.set_path_control(PathControl::ExactStop);
            return ExitCode::Ok;
        }
        if approx(code, 64.0) {
            self.cm.set_path_control(PathControl::Continuous);
            return ExitCode::Ok;
        }
        if approx(code, 80.0) {
            self.cm.motion_mode = MotionMode::Cancelled;
            return ExitCode::Ok;
        }
        if approx(code, 92.0) {
            let current = self.planner.position();
            let mut requested = current;
            for axis in Axis::ALL {
                let word = target[axis.index()];
                if word.specified {
                    requested[axis.index()] = word.value;
                }
            }
            self.cm.origin_offset.set(current, requested);
            return ExitCode::Ok;
        }
        if approx(code, 92.1) {
            self.cm.origin_offset.cancel();
            return ExitCode::Ok;
        }
        if approx(code, 92.2) {
            self.cm.origin_offset.suspend();
            return ExitCode::Ok;
        }
        if approx(code, 92.3) {
            self.cm.origin_offset.resume();
            return ExitCode::Ok;
        }
        if approx(code, 38.2) {
            return self.begin_probe(target);
        }
        if approx(code, 28.0) {
            // See `begin_homing`'s doc comment: axis order and way-points
            // aren't expressible from a single G28 line.
            return ExitCode::Noop;
        }
        // G10 L2: set a coordinate system's offset, one axis at a time,
        // persisting each changed axis write-through. Any L word other
        // than 2 is out of scope (L1/L10/L20 tool-table offsets).
        if approx(code, 10.0) {
            if !approx(l_word.unwrap_or(0.0) as f64, 2.0) {
                return ExitCode::Noop;
            }
            let index = (p_word.unwrap_or(1.0) - 1.0).round().max(0.0) as usize;
            let mut offset =
                self.cm.coordinate_systems.get(index).map(|c| c.offset).unwrap_or([0.0; MAX_AXES]);
            for axis in Axis::ALL {
                let word = target[axis.index()];
                if word.specified {
                    offset[axis.index()] = word.value;
                }
            }
            return match self.cm.set_coordinate_offset(index, offset) {
                Ok(()) => {
                    for axis in Axis::ALL {
                        let word = target[axis.index()];
                        if word.specified {
                            self.persistence.persist((index * MAX_AXES + axis.index()) as u8, word.value as f64);
                        }
                    }
                    ExitCode::Ok
                }
                Err(err) => cm_error_to_exit_code(err),
            };
        }
        ExitCode::Noop
    }

    fn dispatch_m_code(&mut self, code: f64) -> ExitCode {
        use tinyg_canon::{MotionMode, SpindleState};

        if approx(code, 0.0) || approx(code, 1.0) || approx(code, 60.0) {
            // M0/M1 (program stop) and M60 (pallet-change stop) pause the
            // same way a feedhold does; `~` resumes any of them.
            return self.cm.request_feedhold();
        }
        if approx(code, 2.0) || approx(code, 30.0) {
            // M2/M30: end of program. Cancels the active motion mode and
            // the carried-forward feedrate, then pauses exactly like M0.
            self.cm.motion_mode = MotionMode::Cancelled;
            self.pending_feedrate = None;
            return self.cm.request_feedhold();
        }

        if approx(code, 3.0) {
            self.cm.set_spindle(SpindleState::Clockwise);
        } else if approx(code, 4.0) {
            self.cm.set_spindle(SpindleState::CounterClockwise);
        } else if approx(code, 5.0) {
            self.cm.set_spindle(SpindleState::Off);
        } else if approx(code, 7.0) {
            self.cm.set_coolant(None, Some(true));
        } else if approx(code, 8.0) {
            self.cm.set_coolant(Some(true), None);
        } else if approx(code, 9.0) {
            self.cm.set_coolant(Some(false), Some(false));
        }
        // M48/M49 (spindle override on/off): accepted, no-op.
        ExitCode::Ok
    }

    /// Starts a homing cycle for the given axis order. G28 itself carries no
    /// way to express an axis order or way-point/work-zero pair as a single
    /// line of words, so dispatching it from the Gcode stream is left to the
    /// config collaborator; this is the entry point it calls.
    pub fn begin_homing(
        &mut self,
        axis_order: &[Axis],
        waypoint: [f32; MAX_AXES],
        work_zero: [f32; MAX_AXES],
    ) -> ExitCode {
        match HomingCycle::new(axis_order, waypoint, work_zero) {
            Ok(cycle) => {
                if self.cm.begin_cycle(CycleState::Homing, &self.planner).is_err() {
                    return ExitCode::InternalError;
                }
                self.active_cycle = ActiveCycle::Homing(cycle);
                ExitCode::Ok
            }
            Err(err) => cm_error_to_exit_code(err),
        }
    }

    /// `!`: requests a feedhold. The actual decel-to-zero reprofile of the
    /// block currently running happens on the next `MotionFeed::pump`, the
    /// only layer that knows how far into that block's profile execution has
    /// reached; this only raises the request and blocks further admission.
    pub fn feedhold(&mut self) -> ExitCode {
        self.cm.request_feedhold()
    }

    /// `~`: resumes from a hold, rebuilding the forward plan and re-admitting
    /// whatever the hold's reprofile cut short of the block it interrupted.
    pub fn cycle_start(&mut self) -> ExitCode {
        let status = self.cm.cycle_start(&mut self.planner);
        if status == ExitCode::Ok {
            let _ = self.planner.resume_from_hold();
        }
        status
    }

    /// `^X`: empties the planner immediately and latches a hard fault so
    /// nothing is admitted again until `reset_fault`. The stepper runtime's
    /// own drain of its already-running segment is the caller's (firmware's)
    /// responsibility; this only stops anything further from being queued.
    pub fn abort(&mut self) -> ExitCode {
        self.planner.flush();
        self.cm.end_cycle();
        self.fault = Some(HardFault::Aborted);
        ExitCode::MemoryFault
    }

    /// True while a feedhold has been requested or is in effect, gating both
    /// promotion of the next planner block and new line admission.
    fn is_held(&self) -> bool {
        matches!(self.cm.cycle_state, CycleState::HoldRequested | CycleState::Held)
    }

    fn begin_probe(&mut self, target: &TargetUpdate) -> ExitCode {
        let current = self.planner.position();
        let mut resolved = current;
        for axis in Axis::ALL {
            let word = target[axis.index()];
            if word.specified {
                resolved[axis.index()] = word.value;
            }
        }
        let feedrate = self.pending_feedrate.unwrap_or(0.0);
        match ProbeCycle::new(current, resolved, feedrate, 1e-3) {
            Ok(cycle) => {
                if self.cm.begin_cycle(CycleState::Probe, &self.planner).is_err() {
                    return ExitCode::InternalError;
                }
                self.active_cycle = ActiveCycle::Probe(cycle);
                ExitCode::Ok
            }
            Err(err) => cm_error_to_exit_code(err),
        }
    }
}

fn approx(value: f64, target: f64) -> bool {
    (value - target).abs() < 1e-6
}

/// Maps a rejection-class error to the closest soft-fault code in the fixed
/// `ExitCode` enumeration, since `CmError` itself never crosses the §6 trait
/// boundary.
fn cm_error_to_exit_code(err: tinyg_canon::CmError) -> ExitCode {
    use tinyg_canon::CmError;
    match err {
        CmError::FeedrateMissing => ExitCode::FeedrateMissing,
        CmError::AxisMissing => ExitCode::AxisMissing,
        CmError::AxisNotAllowed(_) => ExitCode::AxisNotAllowed,
        CmError::SoftLimitExceeded(_) => ExitCode::SoftLimitExceeded,
        CmError::CoordinateSystemOutOfRange(_) => ExitCode::AxisMissing,
        CmError::CycleAlreadyActive | CmError::PlannerNotIdle => ExitCode::InternalError,
        CmError::NoHomingSwitch(_)
        | CmError::MultipleHomingSwitches(_)
        | CmError::ZeroSearchVelocity(_)
        | CmError::ZeroTravelLimit(_) => ExitCode::HomingFailed,
    }
}
