//! # Vehicle State Snapshot
//!
//! The state estimator publishes one snapshot per master bus cycle. The
//! snapshot is everything the actuator controller is allowed to know about
//! the vehicle: measured motion, pedal and cruise state, the steering rack's
//! status, drivetrain readings, the native frame counters and any physical
//! button events.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Serialize, Deserialize};

use crate::vehicle::Platform;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A snapshot of the vehicle state, published by the state estimator.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct VehicleStateSnapshot {
    /// Measured forward speed.
    ///
    /// Units: meters/second
    pub v_ego_ms: f64,

    /// Measured longitudinal acceleration, unfiltered.
    ///
    /// Units: meters/second/second
    pub a_ego_raw_ms2: f64,

    /// True when the vehicle reports zero ground speed.
    pub standstill: bool,

    /// True while the driver is pressing the accelerator pedal.
    pub gas_pressed: bool,

    /// True while the driver is pressing the brake pedal.
    pub brake_pressed: bool,

    /// State of the vehicle's native cruise control.
    pub cruise: CruiseState,

    /// Torque currently applied by the power steering motor, in the same
    /// units as steering commands.
    pub eps_torque: f64,

    /// True when the steering rack reports a fault.
    pub steer_fault: bool,

    /// Torque status level reported by the steering rack. Levels above 1
    /// indicate the rack is accepting external torque.
    pub torq_status: u8,

    /// True when the vehicle's native lane keep system reports itself active.
    pub lkas_active: bool,

    /// Payload of the native lane keep heartbeat frame, echoed back in
    /// [`super::frame::BusFrame::SteeringHeartbeat`].
    pub lkas_heartbeat_echo: Vec<u8>,

    /// Gear selector position.
    pub gear: GearState,

    /// Display model id reported by the cluster, `-1` until known. HUD frames
    /// are only sent once this is valid.
    pub display_model_id: i32,

    /// The vehicle platform identified by the fingerprint stage.
    pub platform: Platform,

    /// Drivetrain specific readings.
    pub drivetrain: Drivetrain,

    /// The native adaptive cruise system's own deceleration request.
    pub acc_decel: AccDecelRequest,

    /// Native frame counters, used for duplicate rejection and counter
    /// prediction.
    pub counters: BusCounters,

    /// Physical button events observed this cycle.
    pub button_events: Vec<ButtonEvent>,
}

/// State of the native cruise control.
#[derive(Serialize, Deserialize, Debug, Copy, Clone)]
pub struct CruiseState {
    /// True when the native cruise control is engaged.
    pub enabled: bool,

    /// The native cruise setpoint.
    ///
    /// Units: meters/second
    pub speed_ms: f64,
}

/// The native adaptive cruise system's own longitudinal request, sampled from
/// its status frame.
#[derive(Serialize, Deserialize, Debug, Copy, Clone, Default)]
pub struct AccDecelRequest {
    /// True when the native system is actively requesting deceleration.
    pub active: bool,

    /// The requested deceleration, negative when slowing.
    ///
    /// Units: meters/second/second
    pub decel_ms2: f64,
}

/// Native frame counters sampled from the vehicle's own periodic frames.
///
/// Each counter increments (or wraps) when the vehicle sends a fresh frame of
/// that family. A counter equal to the previous cycle's value means no fresh
/// frame arrived and the matching arbiter must not act again.
#[derive(Serialize, Deserialize, Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct BusCounters {
    /// Master cycle counter, increments once per estimator frame.
    pub cycle: u32,

    /// Counter of the native longitudinal status frame.
    pub long_status: u32,

    /// Counter of the native steering frame. Wraps modulo 16.
    pub steer_frame: u8,

    /// Counter of the native button frame.
    pub button: u32,
}

/// A physical steering wheel button event.
#[derive(Serialize, Deserialize, Debug, Copy, Clone)]
pub struct ButtonEvent {
    /// Which button the event belongs to.
    pub button: ButtonId,

    /// True while the button is held, false on the release edge.
    pub pressed: bool,

    /// How long the press has been (or was, for a release) held for.
    ///
    /// Units: control cycles
    pub pressed_cycles: u32,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Gear selector positions.
#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq, Eq)]
pub enum GearState {
    Park,
    Reverse,
    Neutral,
    Drive,
    Low,
}

/// Drivetrain specific readings.
///
/// Which variant is published is fixed per platform: hybrids report axle
/// torque, combustion vehicles report engine speed.
#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq)]
pub enum Drivetrain {
    /// Hybrid drivetrain reporting axle torque and the axle torque limits.
    Hybrid {
        /// Currently applied axle torque.
        ///
        /// Units: newton meters
        axle_torq: f64,

        /// Minimum commandable axle torque.
        ///
        /// Units: newton meters
        axle_torq_min: f64,

        /// Maximum commandable axle torque.
        ///
        /// Units: newton meters
        axle_torq_max: f64,
    },

    /// Combustion drivetrain reporting engine speed.
    Combustion {
        /// Current engine speed.
        ///
        /// Units: revolutions/minute
        engine_rpm: f64,
    },
}

// -----------------------------------------------------------------------------------------------
// IMPLS
// -----------------------------------------------------------------------------------------------

impl VehicleStateSnapshot {
    /// Parse a snapshot from a JSON packet.
    pub fn from_json(json_str: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json_str)
    }

    /// Get the event for `button` with the given pressed state, if one is
    /// present this cycle.
    pub fn button_event(&self, button: ButtonId, pressed: bool) -> Option<&ButtonEvent> {
        self.button_events
            .iter()
            .find(|e| e.button == button && e.pressed == pressed)
    }

    /// True if the given button is currently held down.
    pub fn button_held(&self, button: ButtonId) -> bool {
        self.button_event(button, true).is_some()
    }
}

/// Identifiers of the physical steering wheel buttons the controller reacts
/// to.
#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq, Eq)]
pub enum ButtonId {
    /// Cruise cancel button.
    Cancel,

    /// Cruise resume button.
    Resume,

    /// Increase follow distance.
    FollowInc,

    /// Decrease follow distance.
    FollowDec,

    /// Toggle the lane assist mode.
    LaneAssistToggle,
}
