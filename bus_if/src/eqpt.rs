//! # Equipment messages
//!
//! Everything crossing a process boundary lives here: the vehicle state
//! snapshot published by the state estimator, the control request published by
//! the trajectory planner, and the outgoing frames handed to the encoder
//! bridge. All types are plain serde data, serialised as JSON on the wire.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Control requests from the trajectory planner
pub mod ctrl;

/// Outgoing bus frames and the bridge's response
pub mod frame;

/// Vehicle state snapshots from the state estimator
pub mod state;
