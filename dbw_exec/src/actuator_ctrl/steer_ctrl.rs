//! Steering arbiter calculations
//!
//! Commands the steering rack through the native lane keep frame family. The
//! torque command is rate and band limited against the limits the rack
//! enforces, and the enable bit is held through the platform dependent speed
//! latch so that the rack does not drop the command at the minimum speed
//! boundary.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// Internal imports
use super::ActuatorCtrl;
use bus_if::eqpt::{
    ctrl::{ControlRequest, FeatureState},
    frame::BusFrame,
    state::VehicleStateSnapshot,
};
use bus_if::steer::apply_steer_torque_limits;
use bus_if::vehicle::VehicleParams;

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl ActuatorCtrl {
    /// Perform the steering arbitration calculations.
    ///
    /// Emits the periodic heartbeat and HUD frames and the per cycle steering
    /// command, once per fresh master cycle counter.
    pub(crate) fn calc_steer(
        &mut self,
        enabled: bool,
        state: &VehicleStateSnapshot,
        request: &ControlRequest,
        feature: &FeatureState,
        frames: &mut Vec<BusFrame>,
    ) {
        // Only act on a fresh master cycle
        let cycle_counter = state.counters.cycle;
        if self.prev_cycle_counter == Some(cycle_counter) {
            return;
        }
        self.prev_cycle_counter = Some(cycle_counter);

        // A stale steering frame counter is a bus echo of our own last
        // command, predict the next value instead of trusting it
        let mut steer_counter = state.counters.steer_frame;
        if self.prev_steer_counter == Some(steer_counter) {
            steer_counter = steer_counter.wrapping_add(1) % 16;
        }
        self.prev_steer_counter = Some(steer_counter);

        // Steer torque with the rack's band and rate limits applied
        let vehicle = VehicleParams::for_platform(state.platform);
        let new_steer = (request.trajectory.steer * vehicle.steer_limits.max as f64).round() as i32;
        let mut apply_steer = apply_steer_torque_limits(
            new_steer,
            self.apply_steer_last,
            state.eps_torque,
            &vehicle.steer_limits,
        );
        self.steer_rate_limited = new_steer != apply_steer;

        // Low minimum speed platforms latch the enable once the rack reports
        // it accepts torque
        if state.platform.low_speed_steer() {
            self.gone_fast_yet = self.gone_fast_yet || state.torq_status > 1;
        }

        if !self.min_steer_check {
            self.moving_fast = true;
            self.torq_enabled = enabled || state.platform.low_speed_steer();
        } else if state.platform.low_speed_steer() {
            self.moving_fast = !state.steer_fault && state.lkas_active;
            self.torq_enabled = self.torq_enabled || state.torq_status > 1;
        } else {
            // For the status message
            self.moving_fast = state.v_ego_ms > vehicle.min_steer_speed_ms;

            // For the command high bit: on half a unit below the minimum,
            // off three units below, so the bit does not chatter right at
            // the boundary
            if state.v_ego_ms > vehicle.min_steer_speed_ms - 0.5 {
                self.gone_fast_yet = true;
                self.torq_enabled = true;
            } else if state.v_ego_ms < vehicle.min_steer_speed_ms - 3.0 {
                self.gone_fast_yet = false;
                self.torq_enabled = false;
            }
        }

        let lkas_active = self.moving_fast && enabled;
        if !lkas_active {
            apply_steer = 0;
        }

        self.apply_steer_last = apply_steer;
        self.cmd_summary.steer_torque = apply_steer;

        // 0.1 s period
        if self.steer_frame_count % 10 == 0 {
            frames.push(BusFrame::SteeringHeartbeat {
                mode: if feature.lane_assist_only { 0 } else { 1 },
                echo: state.lkas_heartbeat_echo.clone(),
            });
        }

        // 0.25 s period, only once the cluster has reported its model
        if self.steer_frame_count % 25 == 0 && state.display_model_id != -1 {
            frames.push(BusFrame::HudStatus {
                gear: state.gear,
                active: lkas_active,
                alert_code: feature.hud_alert,
                display_counter: self.hud_count,
                model_id: state.display_model_id,
            });
            self.hud_count = self.hud_count.wrapping_add(1);
        }

        self.steer_frame_count += 1;

        let enable_bit = if self.tuning.get_bool("settings.bridge_mod", false) {
            self.gone_fast_yet && enabled
        } else {
            self.gone_fast_yet
        };

        frames.push(BusFrame::SteeringCommand {
            torque: apply_steer,
            enable_bit,
            counter: steer_counter,
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
    use bus_if::vehicle::Platform;

    /// Extract (torque, enable_bit, counter) from the steering command.
    fn steer_command(frames: &[BusFrame]) -> Option<(i32, bool, u8)> {
        frames.iter().find_map(|f| match f {
            BusFrame::SteeringCommand {
                torque,
                enable_bit,
                counter,
            } => Some((*torque, *enable_bit, *counter)),
            _ => None,
        })
    }

    #[test]
    fn test_stale_counter_is_predicted() {
        let mut ctrl = test_ctrl("");
        let mut frames = Vec::new();

        let mut state = test_state();
        state.counters.steer_frame = 5;
        let request = test_request();

        ctrl.calc_steer(true, &state, &request, &request.feature, &mut frames);
        let (_, _, counter) = steer_command(&frames).unwrap();
        assert_eq!(counter, 5);

        // The same echo again on a fresh cycle: predict 6 rather than
        // repeating 5
        frames.clear();
        state.counters.cycle = 2;
        ctrl.calc_steer(true, &state, &request, &request.feature, &mut frames);
        let (_, _, counter) = steer_command(&frames).unwrap();
        assert_eq!(counter, 6);
    }

    #[test]
    fn test_counter_prediction_wraps() {
        let mut ctrl = test_ctrl("");
        let mut frames = Vec::new();

        let mut state = test_state();
        state.counters.steer_frame = 15;
        let request = test_request();

        ctrl.calc_steer(true, &state, &request, &request.feature, &mut frames);

        frames.clear();
        state.counters.cycle = 2;
        ctrl.calc_steer(true, &state, &request, &request.feature, &mut frames);
        let (_, _, counter) = steer_command(&frames).unwrap();
        assert_eq!(counter, 0);
    }

    #[test]
    fn test_disabled_forces_zero_torque() {
        let mut ctrl = test_ctrl("");
        let mut frames = Vec::new();

        let state = test_state();
        let mut request = test_request();
        request.trajectory.steer = 0.8;

        ctrl.calc_steer(false, &state, &request, &request.feature, &mut frames);

        let (torque, _, _) = steer_command(&frames).unwrap();
        assert_eq!(torque, 0);
    }

    #[test]
    fn test_below_falling_threshold_unlatches() {
        // Minivan2020 has a 17.5 m/s minimum steer speed. Engage above it,
        // then drop below the falling threshold of 14.5.
        let mut ctrl = test_ctrl("");
        let mut frames = Vec::new();

        let mut state = test_state();
        state.v_ego_ms = 20.0;
        let mut request = test_request();
        request.trajectory.steer = 0.5;

        ctrl.calc_steer(true, &state, &request, &request.feature, &mut frames);
        let (torque, enable, _) = steer_command(&frames).unwrap();
        assert!(torque > 0);
        assert!(enable);
        assert!(ctrl.moving_fast);

        frames.clear();
        state.counters.cycle = 2;
        state.v_ego_ms = 14.0;
        ctrl.calc_steer(true, &state, &request, &request.feature, &mut frames);
        let (torque, enable, _) = steer_command(&frames).unwrap();
        assert_eq!(torque, 0);
        assert!(!enable);
        assert!(!ctrl.moving_fast);
    }

    #[test]
    fn test_latch_band_is_asymmetric() {
        let mut ctrl = test_ctrl("");
        let mut frames = Vec::new();

        let mut state = test_state();
        let mut request = test_request();
        request.trajectory.steer = 0.5;

        // (speed, expected enable bit, expect zero torque)
        let expectations = [
            // Inside the band from below: never latched on yet
            (16.0, false, true),
            // Above the rising threshold of 17.0: latched on, though the
            // status speed of 17.5 is not met yet
            (17.2, true, true),
            // Above the status speed: torque flows
            (18.0, true, false),
            // Back inside the band: latch holds, torque gated off again
            (15.0, true, true),
            // Below the falling threshold of 14.5: latch drops
            (14.0, false, true),
        ];

        for (i, (speed, want_enable, want_zero)) in expectations.iter().enumerate() {
            frames.clear();
            state.counters.cycle = i as u32 + 1;
            state.v_ego_ms = *speed;

            ctrl.calc_steer(true, &state, &request, &request.feature, &mut frames);
            let (torque, enable, _) = steer_command(&frames).unwrap();

            assert_eq!(enable, *want_enable, "enable bit at {} m/s", speed);
            assert_eq!(torque == 0, *want_zero, "torque gate at {} m/s", speed);
        }
    }

    #[test]
    fn test_low_speed_platform_follows_native_lkas() {
        let mut ctrl = test_ctrl("");
        let mut frames = Vec::new();

        let mut state = test_state();
        state.platform = Platform::Minivan2018;
        state.v_ego_ms = 2.0;
        state.torq_status = 2;
        state.lkas_active = true;
        let mut request = test_request();
        request.trajectory.steer = 0.5;

        ctrl.calc_steer(true, &state, &request, &request.feature, &mut frames);
        let (torque, enable, _) = steer_command(&frames).unwrap();
        assert!(torque > 0, "low speed platform steers at walking pace");
        assert!(enable);

        // A steering fault gates the torque but the enable latch holds
        frames.clear();
        state.counters.cycle = 2;
        state.steer_fault = true;
        state.torq_status = 0;
        ctrl.calc_steer(true, &state, &request, &request.feature, &mut frames);
        let (torque, enable, _) = steer_command(&frames).unwrap();
        assert_eq!(torque, 0);
        assert!(enable);
    }

    #[test]
    fn test_heartbeat_and_hud_cadence() {
        let mut ctrl = test_ctrl("");
        let mut frames = Vec::new();

        let mut state = test_state();
        let request = test_request();

        let mut heartbeats = 0;
        let mut huds = 0;
        for cycle in 0..26u32 {
            frames.clear();
            state.counters.cycle = cycle + 1;

            ctrl.calc_steer(true, &state, &request, &request.feature, &mut frames);
            heartbeats += frames
                .iter()
                .filter(|f| f.kind() == "steering_heartbeat")
                .count();
            huds += frames.iter().filter(|f| f.kind() == "hud_status").count();
        }

        // Counts 0, 10 and 20 carry a heartbeat, 0 and 25 a HUD frame
        assert_eq!(heartbeats, 3);
        assert_eq!(huds, 2);
        assert_eq!(ctrl.hud_count, 2);
    }

    #[test]
    fn test_hud_suppressed_without_display_model() {
        let mut ctrl = test_ctrl("");
        let mut frames = Vec::new();

        let mut state = test_state();
        state.display_model_id = -1;
        let request = test_request();

        ctrl.calc_steer(true, &state, &request, &request.feature, &mut frames);
        assert!(frames.iter().all(|f| f.kind() != "hud_status"));
        assert_eq!(ctrl.hud_count, 0);
    }

    #[test]
    fn test_rate_limited_flag() {
        let mut ctrl = test_ctrl("");
        let mut frames = Vec::new();

        let mut state = test_state();
        let mut request = test_request();

        // A full lock demand from rest is clipped by the rate limiter
        request.trajectory.steer = 1.0;
        ctrl.calc_steer(true, &state, &request, &request.feature, &mut frames);
        assert!(ctrl.steer_rate_limited);
        let (torque, _, _) = steer_command(&frames).unwrap();
        assert_eq!(torque, 3);

        // A demand matching what the limiter already allows is not clipped
        frames.clear();
        state.counters.cycle = 2;
        request.trajectory.steer = 6.0 / 261.0;
        ctrl.calc_steer(true, &state, &request, &request.feature, &mut frames);
        assert!(!ctrl.steer_rate_limited);
    }

    #[test]
    fn test_bridge_mod_gates_enable_with_enabled() {
        let mut ctrl = test_ctrl(
            r#"
            [settings]
            bridge_mod = true
            "#,
        );
        let mut frames = Vec::new();

        let mut state = test_state();
        state.v_ego_ms = 20.0;
        let request = test_request();

        // Latch on while enabled
        ctrl.calc_steer(true, &state, &request, &request.feature, &mut frames);
        let (_, enable, _) = steer_command(&frames).unwrap();
        assert!(enable);

        // Still latched, but the modifier clears the bit when disabled
        frames.clear();
        state.counters.cycle = 2;
        ctrl.calc_steer(false, &state, &request, &request.feature, &mut frames);
        let (_, enable, _) = steer_command(&frames).unwrap();
        assert!(ctrl.gone_fast_yet);
        assert!(!enable);
    }
}
