//! Cruise button arbiter calculations
//!
//! Drives the native cruise system by pressing its own steering wheel
//! buttons. Setpoint and follow distance intents are emitted through a four
//! phase cadence divider so the presses resemble a human tapping the stalk
//! rather than a solid hold.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// Internal imports
use super::{
    ActuatorCtrl, ACC_BRAKE_THRESHOLD_MS, AUTO_FOLLOW_LOCK_MS, AUTO_FOLLOW_TOGGLE_CYCLES,
};
use bus_if::eqpt::{
    ctrl::{ControlRequest, FeatureState},
    frame::{BusFrame, ButtonPress},
    state::{ButtonId, VehicleStateSnapshot},
};
use util::convert::MPH_TO_MS;

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl ActuatorCtrl {
    /// Perform the cruise button arbitration calculations.
    ///
    /// Emits at most one button frame per fresh native button counter: an
    /// explicit cancel always, automation intents only on the emitting
    /// phases of the cadence divider.
    pub(crate) fn calc_buttons(
        &mut self,
        enabled: bool,
        state: &VehicleStateSnapshot,
        request: &ControlRequest,
        feature: &mut FeatureState,
        frames: &mut Vec<BusFrame>,
    ) {
        // Only act on a fresh native button frame
        let button_counter = state.counters.button;
        if self.prev_button_counter == Some(button_counter) {
            return;
        }
        self.prev_button_counter = Some(button_counter);

        let phase = self.button_frame_count % 4;
        self.button_frame_count += 1;

        let mut buttons: Vec<ButtonPress> = Vec::new();

        if request.cancel {
            // An explicit cancel request bypasses the cadence divider
            buttons.push(ButtonPress::Cancel);
        } else {
            // Held or tapped follow buttons toggle auto follow even while
            // the driver is holding cancel
            self.update_auto_follow_toggle(state, feature);

            if !state.button_held(ButtonId::Cancel) && enabled && !state.brake_pressed {
                // Phases 2 and 3 pause between presses
                let emitting_phase = phase == 0 || phase == 1;

                if emitting_phase {
                    if !state.cruise.enabled || state.standstill {
                        // Stopped and waiting to resume
                        if let Some(b) = self.resume_button(state, request.resume_speed_ms) {
                            buttons.push(b);
                        }
                    } else {
                        // Control the native setpoints
                        if let Some(b) = self.follow_button(state, feature) {
                            buttons.push(b);
                        }
                        if let Some(b) = self.setpoint_button(state, request, feature) {
                            buttons.push(b);
                        }
                    }
                }
            }
        }

        if !buttons.is_empty() {
            frames.push(BusFrame::ButtonPressCommand {
                counter: button_counter.wrapping_add(1),
                buttons,
            });
        }
    }

    /// Toggle auto follow from the follow distance buttons: a short tap
    /// while it is on hands control back to the driver, a long hold while it
    /// is off engages it.
    fn update_auto_follow_toggle(
        &mut self,
        state: &VehicleStateSnapshot,
        feature: &mut FeatureState,
    ) {
        if feature.auto_follow {
            let inc = state.button_event(ButtonId::FollowInc, false);
            let dec = state.button_event(ButtonId::FollowDec, false);

            if inc.map_or(false, |e| e.pressed_cycles < AUTO_FOLLOW_TOGGLE_CYCLES)
                || dec.map_or(false, |e| e.pressed_cycles < AUTO_FOLLOW_TOGGLE_CYCLES)
            {
                feature.auto_follow = false;
                feature.notify_ui = true;
            }
        } else {
            let inc = state.button_event(ButtonId::FollowInc, true);
            let dec = state.button_event(ButtonId::FollowDec, true);

            if inc.map_or(false, |e| e.pressed_cycles >= AUTO_FOLLOW_TOGGLE_CYCLES)
                || dec.map_or(false, |e| e.pressed_cycles >= AUTO_FOLLOW_TOGGLE_CYCLES)
            {
                feature.auto_follow = true;
                feature.notify_ui = true;
            }
        }
    }

    /// Resume intent: keep pressing resume until the vehicle moves off.
    fn resume_button(
        &self,
        state: &VehicleStateSnapshot,
        resume_speed_ms: f64,
    ) -> Option<ButtonPress> {
        if self.auto_resume && state.v_ego_ms <= resume_speed_ms {
            Some(ButtonPress::Resume)
        } else {
            None
        }
    }

    /// Speed setpoint intent: walk the native cruise setpoint towards the
    /// target, one display unit per press.
    fn setpoint_button(
        &self,
        state: &VehicleStateSnapshot,
        request: &ControlRequest,
        feature: &FeatureState,
    ) -> Option<ButtonPress> {
        let mut target = if feature.lane_assist_only {
            // Run ahead of the planner's target so the native limiter stays
            // the binding one
            let mut t = request.trajectory.v_target_future_ms + 3.0 * MPH_TO_MS;

            let eco_limit = match feature.acc_eco {
                1 => self.tuning.get_f64("acc_eco.speed_ahead_level_1", 1000.0),
                2 => self.tuning.get_f64("acc_eco.speed_ahead_level_2", 1000.0),
                _ => 0.0,
            };
            if eco_limit > 0.0 {
                t = t.min(state.v_ego_ms + eco_limit * MPH_TO_MS);
            }
            t
        } else {
            feature.max_cruise_ms
        };

        // Pull the target down when running well over it, unless the gap is
        // explained by the driver having just lowered the max cruise
        let diff = state.v_ego_ms - target;
        if diff > ACC_BRAKE_THRESHOLD_MS
            && (target - feature.max_cruise_ms).abs() > ACC_BRAKE_THRESHOLD_MS
        {
            target -= diff;
        }

        // Compare in the cluster's display unit, which is also what one
        // press moves the native setpoint by
        let target = (target.min(feature.max_cruise_ms) * self.round_to_unit).round();
        let current = (state.cruise.speed_ms * self.round_to_unit).round();

        if target < current && current > self.min_cruise_setting {
            Some(ButtonPress::SpeedDec)
        } else if target > current {
            Some(ButtonPress::SpeedInc)
        } else {
            None
        }
    }

    /// Follow distance intent: move the native follow setting towards the
    /// level picked by speed, with a lock so the setting does not bounce
    /// around a crossover.
    fn follow_button(
        &mut self,
        state: &VehicleStateSnapshot,
        feature: &FeatureState,
    ) -> Option<ButtonPress> {
        if !feature.auto_follow {
            return None;
        }

        let crossover = [
            0.0,
            self.tuning.get_f64("auto_follow.speed_1_2_bars_mph", 1000.0) * MPH_TO_MS,
            self.tuning.get_f64("auto_follow.speed_2_3_bars_mph", 1000.0) * MPH_TO_MS,
            self.tuning.get_f64("auto_follow.speed_3_4_bars_mph", 1000.0) * MPH_TO_MS,
        ];

        let target_follow: u8 = if state.v_ego_ms < crossover[1] {
            0
        } else if state.v_ego_ms < crossover[2] {
            1
        } else if state.v_ego_ms < crossover[3] {
            2
        } else {
            3
        };

        // Release the lock once the speed has moved clear of the crossover
        // that set it
        if let Some(lock) = self.follow_lock {
            if (crossover[lock as usize] - state.v_ego_ms).abs() > AUTO_FOLLOW_LOCK_MS {
                self.follow_lock = None;
            }
        }

        let lock_allows = match self.follow_lock {
            None => true,
            Some(lock) => lock == target_follow,
        };

        if feature.follow_distance != target_follow && lock_allows {
            self.follow_lock = Some(target_follow);

            if feature.follow_distance > target_follow {
                Some(ButtonPress::FollowDec)
            } else {
                Some(ButtonPress::FollowInc)
            }
        } else {
            None
        }
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
