//! # Bus interface crate.
//!
//! Provides the common interfaces between the drive-by-wire executive and its
//! collaborator processes: the state estimator, the trajectory planner and the
//! frame encoder bridge.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Messages exchanged with equipment processes (state snapshots, control
/// requests and outgoing bus frames)
pub mod eqpt;

/// Network module
pub mod net;

/// Recorded drive replay records
pub mod replay;

/// Steering torque rate limiter
pub mod steer;

/// Vehicle platforms and their parameters
pub mod vehicle;
