//! Longitudinal arbiter calculations
//!
//! Spoofs the native adaptive cruise system's torque and brake requests so
//! that the planner's desired trajectory is followed while the native system
//! believes it is in charge. Torque follows the axle torque formula
//! `T = (mass * accel * velocity) / (0.105 * rpm)`, braking is a ramped
//! deceleration request on the native system's own signal.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External imports
use log::trace;

// Internal imports
use super::{
    accel_hysteresis, ActuatorCtrl, ACCEL_TORQ_MIN_COMBUSTION, COAST_WINDOW_MS, LOW_WINDOW_MS,
    MID_WINDOW_MS,
};
use bus_if::eqpt::{
    ctrl::{ControlRequest, FeatureState, LongControlPhase},
    frame::{BusFrame, BRAKE_SENTINEL},
    state::{Drivetrain, VehicleStateSnapshot},
};
use util::convert::MS_TO_MPH;
use util::maths::{clamp, floor_2dp, round_2dp};

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl ActuatorCtrl {
    /// Perform the longitudinal arbitration calculations.
    ///
    /// Emits the debug log, primary torque/brake request and torque echo
    /// frames once per fresh native longitudinal status frame. While the
    /// controller is disabled (or the native path is in charge) only the
    /// internal baselines are tracked so that a later engage is continuous.
    pub(crate) fn calc_long(
        &mut self,
        enabled: bool,
        state: &VehicleStateSnapshot,
        request: &ControlRequest,
        feature: &FeatureState,
        frames: &mut Vec<BusFrame>,
    ) {
        // Hybrids take their torque bounds from the live axle data
        let (torq_min, torq_max) = match state.drivetrain {
            Drivetrain::Hybrid {
                axle_torq_min,
                axle_torq_max,
                ..
            } => (axle_torq_min, axle_torq_max),
            Drivetrain::Combustion { .. } => (
                ACCEL_TORQ_MIN_COMBUSTION,
                self.tuning.get_f64("long_control.max_accel_torq", 500.0),
            ),
        };

        let vehicle_mass = self.tuning.get_f64("long_control.vehicle_mass", 500.0);
        let torq_start = self.tuning.get_f64("long_control.torq_start", 500.0);

        // Only act on a fresh native status frame
        let long_counter = state.counters.long_status;
        if self.prev_long_counter == Some(long_counter) {
            return;
        }
        self.prev_long_counter = Some(long_counter);

        if !enabled || feature.lane_assist_only {
            self.last_brake = None;
            self.last_torque = Some(torq_start);
            self.last_a_target = state.a_ego_raw_ms2;
            if state.acc_decel.active {
                // The native system is already braking, start from its demand
                self.last_brake = Some(round_2dp(state.acc_decel.decel_ms2));
            }
            return;
        }

        let v_target = request.trajectory.v_target_future_ms;

        let hyst_gap = self.tuning.get_f64("long_control.hyst_gap", 500.0);
        let (a_target, accel_steady) =
            accel_hysteresis(request.trajectory.accel_ms2, self.accel_steady, hyst_gap);
        self.accel_steady = accel_steady;

        let mut brake_press = false;
        let mut brake_target = 0.0;
        let mut torque = 0.0;

        let long_starting = request.trajectory.phase == LongControlPhase::Starting;
        let go_req = long_starting && state.standstill;

        let long_stopping = request.trajectory.phase == LongControlPhase::Stopping;
        let stop_req = long_stopping || (state.standstill && a_target == 0.0 && !go_req);

        // Speed gap is large, start braking
        let speed_to_far_off = state.v_ego_ms - v_target > COAST_WINDOW_MS;
        // Not going to get there, start braking
        let not_slowing_fast_enough =
            speed_to_far_off && v_target < state.v_ego_ms + state.a_ego_raw_ms2;
        let slow_speed_brake = a_target <= 0.0 && state.v_ego_ms < LOW_WINDOW_MS;
        let already_braking = a_target <= 0.0 && self.last_brake.is_some();

        let spoof_brake =
            long_stopping || already_braking || slow_speed_brake || not_slowing_fast_enough;

        if state.acc_decel.active && (state.acc_decel.decel_ms2 < a_target || !spoof_brake) {
            // The native system wants to slow harder than we do, let it
            brake_press = true;
            brake_target = state.acc_decel.decel_ms2;
        } else if spoof_brake || stop_req {
            brake_press = true;
            if stop_req && state.standstill {
                brake_target = -2.0;
            } else {
                brake_target = round_2dp(a_target).max(-4.0);
                if state.acc_decel.active {
                    let acc = state.acc_decel.decel_ms2;
                    brake_target = brake_target.min(acc);
                    if self.last_brake.is_none() {
                        // The native system is already braking, start from
                        // its demand
                        self.last_brake = Some(acc);
                    }
                }
            }
        } else {
            let v_smooth_target = (v_target + state.v_ego_ms) / 2.0;
            let accelerating = v_target - COAST_WINDOW_MS * MS_TO_MPH > state.v_ego_ms
                && a_target > 0.0
                && state.a_ego_raw_ms2 > 0.0
                && state.a_ego_raw_ms2 > self.last_a_target;
            let a_smooth_target = if accelerating {
                (a_target + state.a_ego_raw_ms2) / 2.0
            } else {
                a_target
            };

            let rpm = match state.drivetrain {
                Drivetrain::Hybrid { axle_torq, .. } => {
                    (vehicle_mass * state.a_ego_raw_ms2 * state.v_ego_ms) / (0.105 * axle_torq)
                }
                Drivetrain::Combustion { engine_rpm } => engine_rpm,
            };

            // A dead or non-finite engine speed would blow the formula up,
            // command no torque for this cycle instead
            let cruise = if rpm.is_finite() && rpm > 0.0 {
                if state.v_ego_ms < LOW_WINDOW_MS {
                    let mut c = (vehicle_mass * a_smooth_target * v_smooth_target) / (0.105 * rpm);
                    if a_target > 0.5 {
                        c = c.max(torq_start); // give it some oomph
                    }
                    c
                } else if state.v_ego_ms < MID_WINDOW_MS {
                    (vehicle_mass * a_target * v_target) / (0.105 * rpm)
                } else {
                    (vehicle_mass * a_smooth_target * v_smooth_target) / (0.105 * rpm)
                }
            } else {
                0.0
            };

            let clamped = clamp(&cruise, &torq_min, &torq_max);
            self.last_torque = Some(clamped);
            torque = if cruise > torq_min {
                floor_2dp(clamped)
            } else {
                0.0
            };

            trace!(
                "torq={:.2}, rpm={:.0}, a_ego_raw={:.3}, a_target={:.3}, a_smooth={:.3}, \
                v_ego={:.2}, v_target={:.2}",
                clamped,
                rpm,
                state.a_ego_raw_ms2,
                a_target,
                a_smooth_target,
                state.v_ego_ms,
                v_target
            );
        }

        if brake_press {
            self.last_torque = None;

            match self.last_brake {
                None => {
                    // First application, seed at half the target so the
                    // initial bite is gentle
                    self.last_brake = Some((brake_target / 2.0).min(0.0));
                }
                Some(l_brake) => {
                    // Ramp towards the target by at most 0.2 per cycle
                    if brake_target < l_brake {
                        self.last_brake = Some((l_brake - 0.2).max(brake_target));
                    } else if brake_target > l_brake {
                        self.last_brake = Some((l_brake + 0.2).min(brake_target));
                    }
                }
            }

            trace!(
                "last_brake={:?}, brake_target={:.2}",
                self.last_brake,
                brake_target
            );
        } else {
            self.last_brake = None;
        }

        let mut brake = match self.last_brake {
            Some(b) => floor_2dp(b),
            None => BRAKE_SENTINEL,
        };

        // The driver's pedals always win, stop requesting
        if state.gas_pressed || state.brake_pressed {
            torque = 0.0;
            brake = BRAKE_SENTINEL;
        }

        self.last_a_target = state.a_ego_raw_ms2;

        self.cmd_summary.acc_torque = torque;
        self.cmd_summary.acc_brake = brake;

        frames.push(BusFrame::LongitudinalDebugLog {
            accel_ms2: a_target,
            v_target_ms: v_target,
            starting: long_starting,
            stopping: long_stopping,
        });
        frames.push(BusFrame::LongitudinalTorqueRequest {
            counter: long_counter.wrapping_add(1),
            go: go_req,
            torque,
            stop: stop_req,
            brake,
        });
        frames.push(BusFrame::LongitudinalTorqueRequestEcho {
            counter: long_counter.wrapping_add(1),
            torque,
        });
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::super::state::test::{test_ctrl, test_request, test_state};
    use super::*;

    const TUNING: &str = r#"
        [long_control]
        max_accel_torq = 500.0
        vehicle_mass = 500.0
        torq_start = 300.0
        hyst_gap = 0.0
    "#;

    /// Extract (go, torque, stop, brake) from the primary request frame.
    fn torque_request(frames: &[BusFrame]) -> Option<(bool, f64, bool, f64)> {
        frames.iter().find_map(|f| match f {
            BusFrame::LongitudinalTorqueRequest {
                go,
                torque,
                stop,
                brake,
                ..
            } => Some((*go, *torque, *stop, *brake)),
            _ => None,
        })
    }

    #[test]
    fn test_torque_and_brake_stay_in_range() {
        let mut ctrl = test_ctrl(TUNING);
        let mut frames = Vec::new();
        let request = test_request();

        let mut counter = 0u32;
        for v_ego in &[0.5, 2.0, 5.0, 10.0, 20.0, 35.0] {
            for accel in &[-2.0, -1.0, 0.0, 0.3, 0.7, 1.5, 3.0] {
                for rpm in &[800.0, 1500.0, 4000.0] {
                    counter += 1;

                    let mut state = test_state();
                    state.v_ego_ms = *v_ego;
                    state.a_ego_raw_ms2 = *accel / 2.0;
                    state.drivetrain = Drivetrain::Combustion { engine_rpm: *rpm };
                    state.counters.long_status = counter;

                    let mut request = request.clone();
                    request.trajectory.accel_ms2 = *accel;
                    // Keep the target ahead of the vehicle when accelerating
                    // so that braking only occurs with non-positive targets
                    request.trajectory.v_target_future_ms = if *accel > 0.0 {
                        *v_ego + 2.0
                    } else {
                        (*v_ego - 3.0).max(0.0)
                    };

                    frames.clear();
                    ctrl.calc_long(true, &state, &request, &request.feature, &mut frames);

                    let (_, torque, _, brake) =
                        torque_request(&frames).expect("no request frame emitted");

                    assert!(
                        torque == 0.0 || (torque >= 20.0 && torque <= 500.0),
                        "torque {} out of range (v_ego={}, accel={}, rpm={})",
                        torque,
                        v_ego,
                        accel,
                        rpm
                    );
                    assert!(
                        brake == BRAKE_SENTINEL || (brake >= -4.0 && brake <= 0.0),
                        "brake {} out of range (v_ego={}, accel={}, rpm={})",
                        brake,
                        v_ego,
                        accel,
                        rpm
                    );
                }
            }
        }
    }

    #[test]
    fn test_brake_ramp_step_limited() {
        let mut ctrl = test_ctrl(TUNING);
        let mut frames = Vec::new();

        let mut state = test_state();
        state.v_ego_ms = 15.0;
        let mut request = test_request();
        request.trajectory.v_target_future_ms = 5.0;

        // Hold a hard target, then release it, then re-apply: the maintained
        // brake value must never move by more than 0.2 per cycle
        let targets = [
            -3.0, -3.0, -3.0, -3.0, -3.0, -0.5, -0.5, -0.5, -3.5, -3.5, -3.5,
        ];

        let mut prev_brake: Option<f64> = None;
        for (i, target) in targets.iter().enumerate() {
            state.counters.long_status = i as u32 + 1;
            request.trajectory.accel_ms2 = *target;

            frames.clear();
            ctrl.calc_long(true, &state, &request, &request.feature, &mut frames);

            let brake = ctrl.last_brake.expect("braking state lost mid ramp");
            if let Some(prev) = prev_brake {
                assert!(
                    (brake - prev).abs() <= 0.2 + 1e-9,
                    "brake stepped from {} to {}",
                    prev,
                    brake
                );
            }
            prev_brake = Some(brake);

            // Emitted value is the floored maintained value, in range
            let (_, _, _, emitted) = torque_request(&frames).unwrap();
            assert!(emitted >= -4.0 && emitted <= 0.0);
        }
    }

    #[test]
    fn test_first_brake_seeds_at_half_target() {
        let mut ctrl = test_ctrl(TUNING);
        let mut frames = Vec::new();

        let mut state = test_state();
        state.v_ego_ms = 15.0;
        let mut request = test_request();
        request.trajectory.v_target_future_ms = 5.0;
        request.trajectory.accel_ms2 = -3.0;

        ctrl.calc_long(true, &state, &request, &request.feature, &mut frames);

        assert_eq!(ctrl.last_brake, Some(-1.5));
        let (_, torque, _, brake) = torque_request(&frames).unwrap();
        assert_eq!(torque, 0.0);
        assert_eq!(brake, -1.5);
    }

    #[test]
    fn test_no_braking_gives_sentinel() {
        let mut ctrl = test_ctrl(TUNING);
        let mut frames = Vec::new();

        let state = test_state();
        let mut request = test_request();
        request.trajectory.accel_ms2 = 0.5;

        ctrl.calc_long(true, &state, &request, &request.feature, &mut frames);

        let (_, _, _, brake) = torque_request(&frames).unwrap();
        assert_eq!(brake, BRAKE_SENTINEL);
        assert!(ctrl.last_brake.is_none());
    }

    #[test]
    fn test_duplicate_counter_is_noop() {
        let mut ctrl = test_ctrl(TUNING);
        let mut frames = Vec::new();

        let state = test_state();
        let request = test_request();

        ctrl.calc_long(true, &state, &request, &request.feature, &mut frames);
        assert_eq!(frames.len(), 3);

        frames.clear();
        ctrl.calc_long(true, &state, &request, &request.feature, &mut frames);
        assert!(frames.is_empty());
    }

    #[test]
    fn test_disabled_tracks_baselines_without_frames() {
        let mut ctrl = test_ctrl(TUNING);
        let mut frames = Vec::new();

        let mut state = test_state();
        state.a_ego_raw_ms2 = 0.4;
        let request = test_request();

        ctrl.calc_long(false, &state, &request, &request.feature, &mut frames);

        assert!(frames.is_empty());
        assert_eq!(ctrl.last_torque, Some(300.0));
        assert_eq!(ctrl.last_brake, None);
        assert_eq!(ctrl.last_a_target, 0.4);
    }

    #[test]
    fn test_lane_assist_only_mode_is_treated_as_disabled() {
        let mut ctrl = test_ctrl(TUNING);
        let mut frames = Vec::new();

        let state = test_state();
        let mut request = test_request();
        request.feature.lane_assist_only = true;

        ctrl.calc_long(true, &state, &request, &request.feature, &mut frames);
        assert!(frames.is_empty());
    }

    #[test]
    fn test_native_decel_adopted_while_disabled() {
        // Scenario: the native system is braking at -1.5 while the
        // controller is disabled. On re-engage the controller must carry on
        // from -1.5 rather than jumping to its own -1.0 target.
        let mut ctrl = test_ctrl(TUNING);
        let mut frames = Vec::new();

        let mut state = test_state();
        state.v_ego_ms = 10.0;
        state.acc_decel.active = true;
        state.acc_decel.decel_ms2 = -1.5;

        let mut request = test_request();
        request.trajectory.v_target_future_ms = 8.0;
        request.trajectory.accel_ms2 = -1.0;

        ctrl.calc_long(false, &state, &request, &request.feature, &mut frames);
        assert!(frames.is_empty());
        assert_eq!(ctrl.last_brake, Some(-1.5));

        // Re-engage with the native request still active: its stronger
        // demand is held
        state.counters.long_status = 2;
        ctrl.calc_long(true, &state, &request, &request.feature, &mut frames);
        let (_, _, _, brake) = torque_request(&frames).unwrap();
        assert_eq!(brake, -1.5);

        // The native system releases, the ramp walks towards our own -1.0
        // target instead of jumping
        frames.clear();
        state.counters.long_status = 3;
        state.acc_decel.active = false;
        ctrl.calc_long(true, &state, &request, &request.feature, &mut frames);
        let (_, _, _, brake) = torque_request(&frames).unwrap();
        assert_eq!(brake, -1.3);
    }

    #[test]
    fn test_stop_request_holds_fixed_brake_at_standstill() {
        let mut ctrl = test_ctrl(TUNING);
        let mut frames = Vec::new();

        let mut state = test_state();
        state.v_ego_ms = 0.0;
        state.standstill = true;
        let mut request = test_request();
        request.trajectory.accel_ms2 = 0.0;
        request.trajectory.v_target_future_ms = 0.0;
        request.trajectory.phase = LongControlPhase::Stopping;

        ctrl.calc_long(true, &state, &request, &request.feature, &mut frames);

        let (go, torque, stop, _) = torque_request(&frames).unwrap();
        assert!(!go);
        assert!(stop);
        assert_eq!(torque, 0.0);
        // Seeded at half of the fixed -2 standstill target
        assert_eq!(ctrl.last_brake, Some(-1.0));
    }

    #[test]
    fn test_go_request_on_starting_from_standstill() {
        let mut ctrl = test_ctrl(TUNING);
        let mut frames = Vec::new();

        let mut state = test_state();
        state.v_ego_ms = 0.0;
        state.standstill = true;
        let mut request = test_request();
        request.trajectory.phase = LongControlPhase::Starting;
        request.trajectory.accel_ms2 = 1.0;
        request.trajectory.v_target_future_ms = 2.0;

        ctrl.calc_long(true, &state, &request, &request.feature, &mut frames);

        let (go, _, stop, _) = torque_request(&frames).unwrap();
        assert!(go);
        assert!(!stop);
    }

    #[test]
    fn test_zero_rpm_commands_no_torque() {
        let mut ctrl = test_ctrl(TUNING);
        let mut frames = Vec::new();

        let mut state = test_state();
        state.v_ego_ms = 5.0;
        state.a_ego_raw_ms2 = 0.5;
        state.drivetrain = Drivetrain::Combustion { engine_rpm: 0.0 };
        let mut request = test_request();
        request.trajectory.accel_ms2 = 1.0;
        request.trajectory.v_target_future_ms = 8.0;

        ctrl.calc_long(true, &state, &request, &request.feature, &mut frames);

        let (_, torque, _, brake) = torque_request(&frames).unwrap();
        assert_eq!(torque, 0.0);
        assert_eq!(brake, BRAKE_SENTINEL);

        // A non-finite reading is treated the same way
        frames.clear();
        state.counters.long_status = 2;
        state.drivetrain = Drivetrain::Combustion {
            engine_rpm: f64::NAN,
        };
        ctrl.calc_long(true, &state, &request, &request.feature, &mut frames);

        let (_, torque, _, _) = torque_request(&frames).unwrap();
        assert_eq!(torque, 0.0);
    }

    #[test]
    fn test_hybrid_pseudo_rpm_path() {
        let mut ctrl = test_ctrl(
            r#"
            [long_control]
            vehicle_mass = 2300.0
            hyst_gap = 0.0
            "#,
        );
        let mut frames = Vec::new();

        let mut state = test_state();
        state.v_ego_ms = 5.0;
        state.a_ego_raw_ms2 = 0.8;
        state.drivetrain = Drivetrain::Hybrid {
            axle_torq: 150.0,
            axle_torq_min: 10.0,
            axle_torq_max: 300.0,
        };
        let mut request = test_request();
        request.trajectory.accel_ms2 = 0.6;
        request.trajectory.v_target_future_ms = 7.0;

        // Mid band: torque = (m * a_target * v_target) / (0.105 * pseudo_rpm)
        // with pseudo_rpm = (m * a_ego * v_ego) / (0.105 * axle_torq), which
        // works out to 157.5 for these values
        ctrl.calc_long(true, &state, &request, &request.feature, &mut frames);

        let (_, torque, _, _) = torque_request(&frames).unwrap();
        assert!(
            (torque - 157.5).abs() < 0.02,
            "hybrid torque {} != 157.5",
            torque
        );

        // Hybrid bounds come from the axle data, not the tuning file
        frames.clear();
        state.counters.long_status = 2;
        request.trajectory.accel_ms2 = 3.0;
        ctrl.calc_long(true, &state, &request, &request.feature, &mut frames);
        let (_, torque, _, _) = torque_request(&frames).unwrap();
        assert!(torque <= 300.0);
    }

    #[test]
    fn test_low_speed_start_boost() {
        let mut ctrl = test_ctrl(TUNING);
        let mut frames = Vec::new();

        let mut state = test_state();
        state.v_ego_ms = 1.0;
        state.a_ego_raw_ms2 = 0.1;
        state.drivetrain = Drivetrain::Combustion { engine_rpm: 3000.0 };
        let mut request = test_request();
        request.trajectory.accel_ms2 = 0.6;
        request.trajectory.v_target_future_ms = 3.0;

        ctrl.calc_long(true, &state, &request, &request.feature, &mut frames);

        // The raw formula gives under 2 Nm here, the start boost lifts it to
        // the configured start torque
        let (_, torque, _, _) = torque_request(&frames).unwrap();
        assert_eq!(torque, 300.0);
    }

    #[test]
    fn test_brake_override_by_pedal() {
        let mut ctrl = test_ctrl(TUNING);
        let mut frames = Vec::new();

        let mut state = test_state();
        state.v_ego_ms = 15.0;
        state.brake_pressed = true;
        let mut request = test_request();
        request.trajectory.accel_ms2 = -2.0;
        request.trajectory.v_target_future_ms = 5.0;

        ctrl.calc_long(true, &state, &request, &request.feature, &mut frames);

        let (_, torque, _, brake) = torque_request(&frames).unwrap();
        assert_eq!(torque, 0.0);
        assert_eq!(brake, BRAKE_SENTINEL);
        // The ramp state itself is kept for when the pedal is released
        assert!(ctrl.last_brake.is_some());
    }
}
