//! Actuator control module
//!
//! Arbitrates between the autonomy stack's desired trajectory and the
//! vehicle's native cruise and lane keep systems, producing the bus frames
//! which the bridge encodes onto the vehicle network. Split into the
//! longitudinal arbiter (torque and brake spoofing), the steering arbiter
//! (EPS torque command and periodic status frames) and the cruise button
//! arbiter (synthesised steering wheel button presses).

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod accel_hyst;
mod button_ctrl;
mod long_ctrl;
mod state;
mod steer_ctrl;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// Internal
pub use accel_hyst::*;
pub use state::*;

use util::convert::MPH_TO_MS;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Speed gap above the desired velocity beyond which coasting is abandoned
/// and braking starts.
///
/// Units: m/s
pub const COAST_WINDOW_MS: f64 = 3.0 * MPH_TO_MS;

/// Speed below which the low speed torque shaping band applies.
///
/// Units: m/s
pub const LOW_WINDOW_MS: f64 = 3.0 * MPH_TO_MS;

/// Top of the mid band of the torque target selection, above which smoothed
/// targets are used again.
///
/// Units: m/s
pub const MID_WINDOW_MS: f64 = 20.0 * MPH_TO_MS;

/// Minimum commanded axle torque for combustion drivetrains. Hybrids take
/// their bound from the live axle torque data instead.
///
/// Units: N m
pub const ACCEL_TORQ_MIN_COMBUSTION: f64 = 20.0;

/// Speed margin used to release the auto follow distance lock.
///
/// Units: m/s
pub const AUTO_FOLLOW_LOCK_MS: f64 = 3.0 * MPH_TO_MS;

/// Speed margin over the setpoint target before anti overshoot pulls the
/// target down.
///
/// Units: m/s
pub const ACC_BRAKE_THRESHOLD_MS: f64 = 2.0 * MPH_TO_MS;

/// Number of consecutive held cycles at which a follow button press toggles
/// auto follow on.
pub const AUTO_FOLLOW_TOGGLE_CYCLES: u32 = 50;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Possible errors that can occur during ActuatorCtrl operation.
#[derive(Debug, thiserror::Error)]
pub enum ActuatorCtrlError {
    #[error("Proc was called before the module was initialised")]
    NotInit,
}

/// Possible errors that can occur during ActuatorCtrl initialisation.
#[derive(Debug, thiserror::Error)]
pub enum InitError {
    #[error("Could not create the module's archive directory: {0}")]
    ArchiveDirError(std::io::Error),

    #[error("Could not create an archiver: {0}")]
    ArchiverCreateError(String),
}
