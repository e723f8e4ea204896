//! Implementations for the ActuatorCtrl state structure

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{debug, trace};
use serde::{Serialize, Deserialize};

// Internal
use super::{ActuatorCtrlError, InitError};
use bus_if::eqpt::{
    ctrl::{ControlRequest, FeatureState},
    frame::BusFrame,
    state::{ButtonId, VehicleStateSnapshot},
};
use util::{
    archive::{Archived, Archiver},
    cached_params::CachedParams,
    convert::{MS_TO_KPH, MS_TO_MPH},
    module::State,
    session::Session,
};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Lowest setpoint the native cruise control accepts on metric clusters.
///
/// Units: kilometers/hour
const MIN_CRUISE_SETTING_KPH: f64 = 8.0;

/// Lowest setpoint the native cruise control accepts on imperial clusters.
///
/// Units: miles/hour
const MIN_CRUISE_SETTING_MPH: f64 = 5.0;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Actuator control module state
#[derive(Default)]
pub struct ActuatorCtrl {
    /// True once init has run. Proc must not run on an uninitialised module
    /// since the display unit factors would be zero.
    initialised: bool,

    /// Runtime tuning values, refreshed by the executive at 1 Hz.
    pub(crate) tuning: CachedParams,

    // Settings latched at init
    pub(crate) auto_resume: bool,
    pub(crate) min_steer_check: bool,

    /// Factor from m/s to the cluster's display unit.
    pub(crate) round_to_unit: f64,

    /// Lowest native cruise setpoint, in display units.
    pub(crate) min_cruise_setting: f64,

    // Steering arbiter state
    pub(crate) prev_cycle_counter: Option<u32>,
    pub(crate) prev_steer_counter: Option<u8>,
    pub(crate) apply_steer_last: i32,
    pub(crate) steer_frame_count: u64,
    pub(crate) hud_count: u32,
    pub(crate) gone_fast_yet: bool,
    pub(crate) torq_enabled: bool,
    pub(crate) moving_fast: bool,
    pub(crate) steer_rate_limited: bool,

    // Button arbiter state
    pub(crate) prev_button_counter: Option<u32>,
    pub(crate) button_frame_count: u64,
    pub(crate) follow_lock: Option<u8>,

    // Longitudinal arbiter state
    pub(crate) prev_long_counter: Option<u32>,
    pub(crate) last_brake: Option<f64>,
    pub(crate) last_torque: Option<f64>,
    pub(crate) accel_steady: f64,
    pub(crate) last_a_target: f64,

    pub(crate) report: StatusReport,
    arch_report: Archiver,

    pub(crate) cmd_summary: CmdSummary,
    arch_cmd: Archiver,
}

/// Input data to Actuator Control.
#[derive(Default)]
pub struct InputData {
    /// True if the controller may actuate this cycle. The executive clears
    /// this while in safe mode regardless of what the planner requested.
    pub enabled: bool,

    /// The latest vehicle state snapshot, or `None` if the estimator has not
    /// produced one yet.
    pub state: Option<VehicleStateSnapshot>,

    /// The latest control request, or `None` if the planner has not produced
    /// one yet.
    pub request: Option<ControlRequest>,
}

/// Output from ActuatorCtrl that the bus bridge must encode.
#[derive(Clone, Default, Serialize, Deserialize, Debug)]
pub struct OutputData {
    /// Bus frames to send this cycle, in emission order.
    pub frames: Vec<BusFrame>,

    /// The feature state handed back to the UI layer, possibly updated by
    /// button handling this cycle.
    pub feature: FeatureState,
}

/// Status report for ActuatorCtrl processing.
///
/// The interface layer raises its driver alerts from this report, so the
/// flags persist across skipped (duplicate counter) cycles rather than being
/// cleared each cycle.
#[derive(Clone, Copy, Default, Serialize, Deserialize, Debug)]
pub struct StatusReport {
    /// True if the steering rate limiter clipped the last commanded torque.
    pub steer_rate_limited: bool,

    /// True if the vehicle is moving fast enough for the steering rack to
    /// accept torque.
    pub moving_fast: bool,
}

/// Flat per-cycle summary of the emitted demands, written to the session
/// archive.
#[derive(Clone, Copy, Default, Serialize, Debug)]
pub(crate) struct CmdSummary {
    /// Applied steering torque command.
    pub(crate) steer_torque: i32,

    /// Commanded axle torque.
    ///
    /// Units: newton meters
    pub(crate) acc_torque: f64,

    /// Commanded brake value, or the no-request sentinel.
    ///
    /// Units: meters/second/second
    pub(crate) acc_brake: f64,

    /// Number of frames emitted this cycle.
    pub(crate) num_frames: usize,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl State for ActuatorCtrl {
    type InitData = &'static str;
    type InitError = InitError;

    type InputData = InputData;
    type OutputData = OutputData;
    type StatusReport = StatusReport;
    type ProcError = ActuatorCtrlError;

    /// Initialise the ActuatorCtrl module.
    ///
    /// Expected init data is the name of the tuning parameter file, relative
    /// to the params directory.
    fn init(&mut self, init_data: Self::InitData, session: &Session)
        -> Result<(), Self::InitError>
    {
        // Load the tuning cache and latch those settings which must not
        // change while the controller is running
        self.tuning = CachedParams::load(init_data);
        self.latch_settings();

        // Create the arch folder for actuator_ctrl
        let mut arch_path = session.arch_root.clone();
        arch_path.push("actuator_ctrl");
        std::fs::create_dir_all(arch_path).map_err(InitError::ArchiveDirError)?;

        // Initialise the archivers
        self.arch_report = Archiver::from_path(session, "actuator_ctrl/status_report.csv")
            .map_err(|e| InitError::ArchiverCreateError(e.to_string()))?;
        self.arch_cmd = Archiver::from_path(session, "actuator_ctrl/cmd_summary.csv")
            .map_err(|e| InitError::ArchiverCreateError(e.to_string()))?;

        self.initialised = true;

        Ok(())
    }

    /// Perform cyclic processing of Actuator Control.
    fn proc(&mut self, input_data: &Self::InputData)
        -> Result<(Self::OutputData, Self::StatusReport), Self::ProcError>
    {
        if !self.initialised {
            return Err(ActuatorCtrlError::NotInit);
        }

        // Without both a vehicle state and a control request there is nothing
        // to arbitrate, skip the cycle without emitting frames.
        let (state, request) = match (&input_data.state, &input_data.request) {
            (Some(s), Some(r)) => (s, r),
            _ => return Ok((OutputData::default(), self.report)),
        };

        let mut feature = request.feature.clone();

        // A release of the lane assist toggle button flips the mode. The UI
        // layer persists the change, here it only has to be notified.
        if state.button_event(ButtonId::LaneAssistToggle, false).is_some() {
            feature.lane_assist_only = !feature.lane_assist_only;
            feature.notify_ui = true;
            debug!("Lane assist only mode toggled to {}", feature.lane_assist_only);
        }

        let mut frames: Vec<BusFrame> = Vec::new();

        self.calc_steer(input_data.enabled, state, request, &feature, &mut frames);
        self.calc_buttons(input_data.enabled, state, request, &mut feature, &mut frames);
        self.calc_long(input_data.enabled, state, request, &feature, &mut frames);

        // Refresh the externally visible report from the persistent flags
        self.report = StatusReport {
            steer_rate_limited: self.steer_rate_limited,
            moving_fast: self.moving_fast,
        };

        self.cmd_summary.num_frames = frames.len();

        trace!("ActuatorCtrl emitting {} frame(s)", frames.len());

        Ok((
            OutputData {
                frames,
                feature,
            },
            self.report,
        ))
    }
}

impl Archived for ActuatorCtrl {
    fn write(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        // Write each one individually
        self.arch_report.serialise(self.report)?;
        self.arch_cmd.serialise(self.cmd_summary)?;

        Ok(())
    }
}

impl ActuatorCtrl {
    /// Build a controller from tuning TOML held in a string, without a
    /// session. The archivers stay inert and records written to them are
    /// dropped. Used by benches and offline tooling.
    pub fn from_tuning_str(tuning_toml: &str) -> Result<Self, toml::de::Error> {
        let mut ctrl = Self::default();

        ctrl.tuning = CachedParams::from_str(tuning_toml)?;
        ctrl.latch_settings();
        ctrl.initialised = true;

        Ok(ctrl)
    }

    /// Latch those settings which must not change while the controller is
    /// running.
    fn latch_settings(&mut self) {
        self.auto_resume = self.tuning.get_bool("settings.auto_resume", false);
        self.min_steer_check = self.tuning.get_bool("settings.min_steer_check", true);

        if self.tuning.get_bool("settings.is_metric", false) {
            self.round_to_unit = MS_TO_KPH;
            self.min_cruise_setting = MIN_CRUISE_SETTING_KPH;
        } else {
            self.round_to_unit = MS_TO_MPH;
            self.min_cruise_setting = MIN_CRUISE_SETTING_MPH;
        }
    }

    /// Function called when entering safe mode.
    ///
    /// Must result in no actuation demands on the vehicle. The brake ramp
    /// value is kept so that a later re-engage does not step the brake.
    pub fn make_safe(&mut self) {
        self.last_torque = None;
    }

    /// Re-read the tuning file backing the cached parameters.
    ///
    /// Called by the executive at 1 Hz, never from proc.
    pub fn refresh_tuning(&mut self) {
        self.tuning.refresh();
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
pub(crate) mod test {
    use super::*;
    use bus_if::eqpt::ctrl::{DesiredTrajectory, LongControlPhase};
    use bus_if::eqpt::state::{
        AccDecelRequest, BusCounters, ButtonEvent, CruiseState, Drivetrain, GearState,
    };
    use bus_if::vehicle::Platform;

    /// Build a controller as init would, but without a session so that the
    /// archivers stay inert.
    pub(crate) fn test_ctrl(tuning_toml: &str) -> ActuatorCtrl {
        ActuatorCtrl::from_tuning_str(tuning_toml).unwrap()
    }

    /// A snapshot of a combustion minivan cruising on the flat.
    pub(crate) fn test_state() -> VehicleStateSnapshot {
        VehicleStateSnapshot {
            v_ego_ms: 20.0,
            a_ego_raw_ms2: 0.0,
            standstill: false,
            gas_pressed: false,
            brake_pressed: false,
            cruise: CruiseState {
                enabled: true,
                speed_ms: 25.0,
            },
            eps_torque: 0.0,
            steer_fault: false,
            torq_status: 2,
            lkas_active: true,
            lkas_heartbeat_echo: vec![0x00, 0x00, 0x00],
            gear: GearState::Drive,
            display_model_id: 0x64,
            platform: Platform::Minivan2020,
            drivetrain: Drivetrain::Combustion { engine_rpm: 1500.0 },
            acc_decel: AccDecelRequest::default(),
            counters: BusCounters {
                cycle: 1,
                long_status: 1,
                steer_frame: 1,
                button: 1,
            },
            button_events: Vec::new(),
        }
    }

    /// A request asking for gentle acceleration towards 25 m/s.
    pub(crate) fn test_request() -> ControlRequest {
        ControlRequest {
            enabled: true,
            trajectory: DesiredTrajectory {
                v_target_future_ms: 25.0,
                accel_ms2: 0.5,
                phase: LongControlPhase::Off,
                steer: 0.25,
            },
            cancel: false,
            resume_speed_ms: 2.0,
            feature: FeatureState {
                lane_assist_only: false,
                auto_follow: false,
                acc_eco: 0,
                max_cruise_ms: 30.0,
                follow_distance: 2,
                hud_alert: 0,
                notify_ui: false,
            },
        }
    }

    fn input(state: VehicleStateSnapshot, request: ControlRequest) -> InputData {
        InputData {
            enabled: true,
            state: Some(state),
            request: Some(request),
        }
    }

    #[test]
    fn test_proc_not_init() {
        let mut ctrl = ActuatorCtrl::default();
        assert!(matches!(
            ctrl.proc(&InputData::default()),
            Err(ActuatorCtrlError::NotInit)
        ));
    }

    #[test]
    fn test_proc_no_inputs_is_noop() {
        let mut ctrl = test_ctrl("");
        let (output, _) = ctrl.proc(&InputData::default()).unwrap();
        assert!(output.frames.is_empty());
    }

    #[test]
    fn test_frame_ordering() {
        let mut ctrl = test_ctrl("");
        let (output, _) = ctrl.proc(&input(test_state(), test_request())).unwrap();

        // First processed cycle emits everything: the periodic steering
        // frames fall on count 0, the button cadence is in an emitting phase
        // and the target setpoint is above the current one, and the
        // longitudinal arbiter sends its three frames.
        let kinds: Vec<&str> = output.frames.iter().map(|f| f.kind()).collect();
        assert_eq!(
            kinds,
            vec![
                "steering_heartbeat",
                "hud_status",
                "steering_command",
                "button_press_command",
                "longitudinal_debug_log",
                "longitudinal_torque_request",
                "longitudinal_torque_request_echo",
            ]
        );
    }

    #[test]
    fn test_duplicate_master_counter_skips_steer() {
        let mut ctrl = test_ctrl("");
        let state = test_state();
        let request = test_request();

        let (first, _) = ctrl.proc(&input(state.clone(), request.clone())).unwrap();
        let num_steer_first = first
            .frames
            .iter()
            .filter(|f| f.kind() == "steering_command")
            .count();
        assert_eq!(num_steer_first, 1);

        // Same counters again: the steering and button arbiters skip, and
        // the longitudinal arbiter also sees a stale counter
        let (second, _) = ctrl.proc(&input(state, request)).unwrap();
        assert!(second.frames.is_empty());
    }

    #[test]
    fn test_pedal_override_forces_no_request() {
        let mut ctrl = test_ctrl("");

        // Get into a braking state first
        let mut state = test_state();
        state.v_ego_ms = 10.0;
        let mut request = test_request();
        request.trajectory.accel_ms2 = -1.0;
        request.trajectory.v_target_future_ms = 5.0;

        ctrl.proc(&input(state.clone(), request.clone())).unwrap();
        assert!(ctrl.last_brake.is_some());

        // Driver touches the gas pedal mid ramp
        state.gas_pressed = true;
        state.counters.cycle += 1;
        state.counters.long_status += 1;
        state.counters.steer_frame += 1;
        state.counters.button += 1;

        let (output, _) = ctrl.proc(&input(state, request)).unwrap();
        let req = output
            .frames
            .iter()
            .find_map(|f| match f {
                BusFrame::LongitudinalTorqueRequest { torque, brake, .. } => {
                    Some((*torque, *brake))
                }
                _ => None,
            })
            .expect("no longitudinal request emitted");

        assert_eq!(req.0, 0.0);
        assert_eq!(req.1, bus_if::eqpt::frame::BRAKE_SENTINEL);
    }

    #[test]
    fn test_lane_assist_toggle_notifies_ui() {
        let mut ctrl = test_ctrl("");
        let mut state = test_state();
        state.button_events.push(ButtonEvent {
            button: ButtonId::LaneAssistToggle,
            pressed: false,
            pressed_cycles: 12,
        });

        let (output, _) = ctrl.proc(&input(state, test_request())).unwrap();
        assert!(output.feature.lane_assist_only);
        assert!(output.feature.notify_ui);
    }

    #[test]
    fn test_report_persists_across_skipped_cycles() {
        let mut ctrl = test_ctrl("");
        let state = test_state();

        let (_, report) = ctrl.proc(&input(state.clone(), test_request())).unwrap();
        assert!(report.moving_fast);

        // A duplicate cycle must not blank the report
        let (_, report) = ctrl.proc(&input(state, test_request())).unwrap();
        assert!(report.moving_fast);
    }
}
