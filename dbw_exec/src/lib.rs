//! # Drive-by-wire library.
//!
//! This library allows other crates in the workspace to access items defined
//! inside the drive-by-wire executive crate.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Actuator control module - arbitrates the desired trajectory into steering,
/// longitudinal and button command frames
pub mod actuator_ctrl;

/// Bus client - sends command frames to the encoder bridge
pub mod bus_client;

/// Global data store for the executive
pub mod data_store;

/// Executive parameters
pub mod params;

/// Plan client - receives control requests from the trajectory planner
pub mod plan_client;

/// State client - receives vehicle state snapshots from the state estimator
pub mod state_client;

/// Telemetry server - publishes the executive's state once per cycle
pub mod tm_server;
