//! # Outgoing Bus Frames
//!
//! The actuator controller emits an ordered list of frames each cycle. The
//! encoder bridge turns them into raw bus frames; this crate only defines the
//! named signal values each frame carries. Field values are validated (in
//! range, clamped) by the controller before a frame is constructed.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Serialize, Deserialize};

use super::state::GearState;

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Frames sent from the controller to the encoder bridge, in transmit order.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub enum BusFrame {
    /// Primary steering torque command, sent once per master cycle.
    SteeringCommand {
        /// Commanded torque in limiter units.
        torque: i32,

        /// High bit allowing the rack to act on the torque.
        enable_bit: bool,

        /// Steering frame counter, wraps modulo 16.
        counter: u8,
    },

    /// Keep-alive for the native lane keep system, sent every 10th cycle.
    SteeringHeartbeat {
        /// 1 when the controller is overriding longitudinal control, 0 when
        /// only lane assist is in use.
        mode: u8,

        /// Payload echoed from the vehicle's own heartbeat frame.
        echo: Vec<u8>,
    },

    /// Cluster HUD status, sent every 25th cycle once the display model is
    /// known.
    HudStatus {
        /// Gear selector position to display.
        gear: GearState,

        /// True when steering is active.
        active: bool,

        /// Alert code, 0 for none.
        alert_code: u8,

        /// Increments on each HUD frame emission.
        display_counter: u32,

        /// The cluster's display model id.
        model_id: i32,
    },

    /// Log-only frame recording the longitudinal targets for this cycle.
    LongitudinalDebugLog {
        /// The hysteresis filtered acceleration target.
        ///
        /// Units: meters/second/second
        accel_ms2: f64,

        /// Target velocity.
        ///
        /// Units: meters/second
        v_target_ms: f64,

        /// True while in the starting phase.
        starting: bool,

        /// True while in the stopping phase.
        stopping: bool,
    },

    /// Primary longitudinal torque/brake request.
    LongitudinalTorqueRequest {
        /// Next predicted value of the native longitudinal status counter.
        counter: u32,

        /// Pull-away request from standstill.
        go: bool,

        /// Commanded axle torque, 0 when braking.
        ///
        /// Units: newton meters
        torque: f64,

        /// Request to come to (or hold) a stop.
        stop: bool,

        /// Brake request in [-4, 0], or [`BRAKE_SENTINEL`] when no braking is
        /// requested.
        ///
        /// Units: meters/second/second
        brake: f64,
    },

    /// Secondary torque echo consumed by the native system's cross check.
    LongitudinalTorqueRequestEcho {
        /// Next predicted value of the native longitudinal status counter.
        counter: u32,

        /// Commanded axle torque, matching the primary request.
        ///
        /// Units: newton meters
        torque: f64,
    },

    /// Emulated steering wheel button presses.
    ButtonPressCommand {
        /// Counter for the button frame family.
        counter: u32,

        /// The buttons to press this frame, in order.
        buttons: Vec<ButtonPress>,
    },
}

/// Buttons the controller can press on the driver's behalf.
#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq, Eq)]
pub enum ButtonPress {
    /// Cancel the native cruise control.
    Cancel,

    /// Resume the native cruise control.
    Resume,

    /// Raise the cruise setpoint by one display unit.
    SpeedInc,

    /// Lower the cruise setpoint by one display unit.
    SpeedDec,

    /// Increase the follow distance by one bar.
    FollowInc,

    /// Decrease the follow distance by one bar.
    FollowDec,
}

/// Response from the encoder bridge to a batch of frames.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq)]
pub enum FramesResponse {
    /// Frames accepted and queued for the bus.
    FramesOk,

    /// Frames rejected by the bridge.
    FramesInvalid,
}

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Brake field value meaning "no brake requested". The encoder transmits this
/// verbatim, it is a protocol value rather than a physical deceleration.
pub const BRAKE_SENTINEL: f64 = 4.0;

// -----------------------------------------------------------------------------------------------
// IMPLS
// -----------------------------------------------------------------------------------------------

impl BusFrame {
    /// Short name of the frame kind, for logs and archives.
    pub fn kind(&self) -> &'static str {
        match self {
            BusFrame::SteeringCommand { .. } => "steering_command",
            BusFrame::SteeringHeartbeat { .. } => "steering_heartbeat",
            BusFrame::HudStatus { .. } => "hud_status",
            BusFrame::LongitudinalDebugLog { .. } => "longitudinal_debug_log",
            BusFrame::LongitudinalTorqueRequest { .. } => "longitudinal_torque_request",
            BusFrame::LongitudinalTorqueRequestEcho { .. } => "longitudinal_torque_request_echo",
            BusFrame::ButtonPressCommand { .. } => "button_press_command",
        }
    }
}

impl FramesResponse {
    /// Parse a response from a JSON packet.
    pub fn from_json(json_str: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json_str)
    }
}
