//! # Drive-by-wire Executable Parameters
//!
//! This module provides parameters for the drive-by-wire executable.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Serialize, Deserialize};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

#[derive(Serialize, Deserialize)]
pub struct DbwExecParams {

    /// Network endpoint for the state estimator's snapshot publisher
    pub state_endpoint: String,

    /// Network endpoint for the trajectory planner's request publisher
    pub plan_endpoint: String,

    /// Network endpoint for the encoder bridge's frame demands socket
    pub bus_endpoint: String,

    /// Network endpoint for the telemetry publisher
    pub tm_endpoint: String
}
