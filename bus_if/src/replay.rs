//! # Replay Records
//!
//! A recorded drive is a sequence of the two inbound message kinds the
//! executive consumes: vehicle state snapshots and control requests. Replay
//! scripts feed these records back into the executive in place of the live
//! estimator and planner links, which is how the controller is exercised on
//! the bench.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Serialize, Deserialize};
use thiserror::Error;

use crate::eqpt::ctrl::ControlRequest;
use crate::eqpt::state::VehicleStateSnapshot;

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// A single recorded inbound message.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub enum LogRecord {
    /// A vehicle state snapshot, as the state estimator would publish it.
    State(VehicleStateSnapshot),

    /// A control request, as the trajectory planner would publish it.
    Request(ControlRequest),
}

/// Possible record parsing errors.
#[derive(Debug, Error)]
pub enum LogRecordParseError {
    #[error("Record contains invalid JSON: {0}")]
    InvalidJson(serde_json::Error),
}

// ------------------------------------------------------------------------------------------------
// IMPLEMENTATIONS
// ------------------------------------------------------------------------------------------------

impl LogRecord {
    /// Parse a record from a JSON packet
    pub fn from_json(json_str: &str) -> Result<Self, LogRecordParseError> {
        serde_json::from_str(json_str).map_err(LogRecordParseError::InvalidJson)
    }
}
