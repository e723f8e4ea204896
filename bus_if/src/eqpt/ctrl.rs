//! # Control Requests
//!
//! The trajectory planner publishes one control request per cycle: whether
//! the controller should be actuating, the desired trajectory, and the shared
//! feature switches. The actuator controller may flip feature switches (for
//! example when the driver toggles lane assist on the wheel) and hands the
//! updated record back in its output for the planner and UI to pick up.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Serialize, Deserialize};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// The planner's per-cycle request to the actuator controller.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ControlRequest {
    /// True when the controller should be actuating the vehicle.
    pub enabled: bool,

    /// The desired trajectory for this cycle.
    pub trajectory: DesiredTrajectory,

    /// Explicit request to cancel the native cruise control, bypassing the
    /// button press cadence.
    pub cancel: bool,

    /// Speed at or below which resume presses keep being retried.
    ///
    /// Units: meters/second
    pub resume_speed_ms: f64,

    /// Feature switches shared between planner, UI and controller.
    pub feature: FeatureState,
}

/// The desired trajectory for one control cycle.
#[derive(Serialize, Deserialize, Debug, Copy, Clone)]
pub struct DesiredTrajectory {
    /// Target velocity a short horizon ahead of now.
    ///
    /// Units: meters/second
    pub v_target_future_ms: f64,

    /// Target acceleration.
    ///
    /// Units: meters/second/second
    pub accel_ms2: f64,

    /// Longitudinal control phase.
    pub phase: LongControlPhase,

    /// Desired steering torque as a fraction of the platform maximum, in
    /// [-1, 1].
    pub steer: f64,
}

/// Feature switches shared with the planner and UI processes.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct FeatureState {
    /// True when only the native lane keep path is in use and longitudinal
    /// control stays with the vehicle's own adaptive cruise.
    pub lane_assist_only: bool,

    /// True when the controller selects the follow distance automatically
    /// from speed.
    pub auto_follow: bool,

    /// Eco level: 0 disables, 1 and 2 select the configured caps on how far
    /// the speed setpoint may run ahead of the vehicle.
    pub acc_eco: u8,

    /// Maximum cruise setpoint the driver has allowed.
    ///
    /// Units: meters/second
    pub max_cruise_ms: f64,

    /// Follow distance currently reported by the native adaptive cruise,
    /// bars 0 to 3.
    pub follow_distance: u8,

    /// Alert code to show on the cluster HUD, 0 for none.
    pub hud_alert: u8,

    /// Set by the controller when a feature flip should be surfaced to the
    /// driver. The UI process clears it once shown.
    pub notify_ui: bool,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Longitudinal control phases commanded by the planner.
#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq, Eq)]
pub enum LongControlPhase {
    /// Longitudinal control inactive.
    Off,

    /// Pulling away from rest.
    Starting,

    /// Tracking the target velocity.
    Holding,

    /// Coming to a stop.
    Stopping,
}

// -----------------------------------------------------------------------------------------------
// IMPLS
// -----------------------------------------------------------------------------------------------

impl ControlRequest {
    /// Parse a control request from a JSON packet.
    pub fn from_json(json_str: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json_str)
    }
}

impl Default for LongControlPhase {
    fn default() -> Self {
        LongControlPhase::Off
    }
}
