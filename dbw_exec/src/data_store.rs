//! # Data Store

use bus_if::eqpt::{ctrl::ControlRequest, state::VehicleStateSnapshot};
use log::{info, warn};

use crate::actuator_ctrl;

// ---------------------------------------------------------------------------
// ENUMS
// ---------------------------------------------------------------------------

/// Gives the reason the executive has been put into safe mode
#[derive(Debug, Eq, PartialEq, Copy, Clone)]
pub enum SafeModeCause {
    StateClientNotConnected,
    PlanClientNotConnected,
    BusClientNotConnected,
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Global data store for the executable.
#[derive(Default)]
pub struct DataStore {
    // Cycle management
    /// Number of cycles already executed
    pub num_cycles: u128,

    /// True if this cycle falls on a 1Hz boundary
    pub is_1_hz_cycle: bool,

    /// Session elapsed time
    pub elapsed_time_s: f64,

    // Safe mode variables
    /// Determines if the executive is in safe mode.
    ///
    /// While safe no actuation is commanded, the controller is run with its
    /// enable flag forced clear so that its internal baselines keep tracking
    /// the vehicle.
    pub safe: bool,

    /// Gives the reason for the executive being in safe mode.
    pub safe_cause: Option<SafeModeCause>,

    // Boundary data
    /// Most recent vehicle state snapshot, kept between cycles so that a
    /// missed message does not blank the controller's view of the vehicle.
    pub latest_state: Option<VehicleStateSnapshot>,

    /// Most recent control request from the planner, kept between cycles.
    pub latest_request: Option<ControlRequest>,

    // ActuatorCtrl
    pub actuator_ctrl: actuator_ctrl::ActuatorCtrl,
    pub actuator_ctrl_input: actuator_ctrl::InputData,
    pub actuator_ctrl_output: actuator_ctrl::OutputData,
    pub actuator_ctrl_status_rpt: actuator_ctrl::StatusReport,

    // Monitoring Counters
    /// Number of consecutive cycle overruns
    pub num_consec_cycle_overruns: u64,

    /// Number of consecutive bus bridge recieve errors
    pub num_consec_bus_recv_errors: u64,
}

// ---------------------------------------------------------------------------
// IMPLS
// ---------------------------------------------------------------------------

impl DataStore {
    /// Puts the executive into safe mode with the given cause.
    pub fn make_safe(&mut self, cause: SafeModeCause) {
        if !self.safe {
            warn!("Make safe requested, cause: {:?}", cause);
            self.safe = true;
            self.safe_cause = Some(cause);

            // Make actuator_ctrl safe
            self.actuator_ctrl.make_safe();
        }
    }

    /// Attempts to disable the safe mode by clearing the given cause.
    ///
    /// Returns `Ok(())` if this cause was cleared and safe mode was disabled, or `Err(())`
    /// otherwise. To remove safe mode the provided cause must match the initial reason for safe
    /// mode being enabled.
    ///
    /// If safe mode was not enabled `Ok(())` is returned
    pub fn make_unsafe(&mut self, cause: SafeModeCause) -> Result<(), ()> {
        if !self.safe {
            return Ok(());
        }

        match self.safe_cause {
            Some(root_cause) => {
                if cause == root_cause {
                    self.safe = false;
                    self.safe_cause = None;
                    info!("Make unsafe requested, root cause match, safe mode disabled");
                    Ok(())
                } else {
                    Err(())
                }
            }
            None => Ok(()),
        }
    }

    /// Perform actions required at the start of a cycle.
    ///
    /// Clears those items that need clearing at the start of a cycle, and sets the 1Hz cycle flag.
    /// The latest state and request are deliberately not cleared, last value wins.
    pub fn cycle_start(&mut self, cycle_frequency_hz: f64) {
        if self.num_cycles % (cycle_frequency_hz as u128) == 0 {
            self.is_1_hz_cycle = true;
        } else {
            self.is_1_hz_cycle = false;
        }

        self.actuator_ctrl_input = actuator_ctrl::InputData::default();
        self.actuator_ctrl_output = actuator_ctrl::OutputData::default();
        self.actuator_ctrl_status_rpt = actuator_ctrl::StatusReport::default();

        self.elapsed_time_s = util::session::get_elapsed_seconds();
    }
}
