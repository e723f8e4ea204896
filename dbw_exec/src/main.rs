//! Main drive-by-wire executable entry point.
//!
//! # Architecture
//!
//! The general execution methodology consists of:
//!
//!     - Initialise all modules
//!     - Main loop:
//!         - System input acquisition:
//!             - Vehicle state snapshot from the state estimator
//!             - Control request from the trajectory planner
//!         - Safe mode management
//!         - Actuator control processing
//!         - Frame despatch to the encoder bridge
//!         - Telemetry output
//!
//! # Modules
//!
//! All modules (e.g. `actuator_ctrl`) shall meet the following requirements:
//!     1. Provide a public struct implementing the `util::module::State` trait.
//!

// ---------------------------------------------------------------------------
// USE MODULES FROM LIBRARY
// ---------------------------------------------------------------------------

use dbw_lib::{
    *,
    bus_client::{BusClient, BusClientError},
    data_store::{DataStore, SafeModeCause},
    plan_client::PlanClient,
    state_client::StateClient,
};

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{debug, error, info, warn};
use tm_server::TmServer;
use std::env;
use std::thread;
use std::time::{Duration, Instant};
use color_eyre::{Report, eyre::{WrapErr, eyre}};

// Internal
use bus_if::{eqpt::frame::FramesResponse, replay::LogRecord};
use util::{
    raise_error,
    archive::Archived,
    module::State,
    logger::{logger_init, LevelFilter},
    session::Session,
    script_interpreter::{ScriptInterpreter, PendingRecords},
};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Target period of one cycle.
const CYCLE_PERIOD_S: f64 = 0.01;

/// Number of cycles per second
const CYCLE_FREQUENCY_HZ: f64 = 1.0 / CYCLE_PERIOD_S;

/// Limit of the number of times recieve errors from the encoder bridge can be
/// created consecutively before safe mode will be engaged.
const MAX_BUS_RECV_ERROR_LIMIT: u64 = 5;

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Executable main function, entry point.
fn main() -> Result<(), Report> {

    // ---- EARLY INITIALISATION ----

    // Initialise session
    let session = Session::new(
        "dbw_exec",
        "sessions"
    ).wrap_err("Failed to create the session")?;

    // Initialise logger
    logger_init(LevelFilter::Trace, &session)
        .wrap_err("Failed to initialise logging")?;

    // Log information on this execution.
    info!("Drive-by-Wire Executive\n");
    info!("Session directory: {:?}\n", session.session_root);

    // ---- LOAD PARAMETERS ----

    let exec_params: params::DbwExecParams = util::params::load(
        "dbw_exec.toml"
    ).wrap_err("Could not load exec params")?;

    info!("Exec parameters loaded");

    // ---- INITIALISE INPUT SOURCE ----

    // The input source is used to determine whether the vehicle state and
    // control requests come from the live network links or from a replay
    // script.
    let mut input_source = InputSource::None;
    let mut use_live_clients = false;

    // Collect all arguments
    let args: Vec<String> = env::args().collect();

    debug!("CLI arguments: {:?}", args);

    // If we have a single argument use it as the replay script path
    if args.len() == 2 {

        info!("Loading replay script from \"{}\"", &args[1]);

        // Load the script interpreter
        let si = ScriptInterpreter::new(
            &args[1]).wrap_err("Failed to load replay script")?;

        // Display some info
        info!(
            "Loaded script lasts {:.02} s and contains {} records\n",
            si.get_duration(),
            si.get_num_records()
        );

        // Set the interpreter in the source
        input_source = InputSource::Replay(si);
    }
    // If no arguments then setup the live clients
    else if args.len() == 1 {

        info!("No script provided, the live network links will be used\n");
        use_live_clients = true;

    }
    else {
        return Err(eyre!(
            "Expected either zero or one argument, found {}", args.len() - 1)
        );
    }

    // ---- INITIALISE DATASTORE ----

    info!("Initialising modules...");

    let mut ds = DataStore::default();

    // ---- INITIALISE MODULES ----

    ds.actuator_ctrl.init("actuator_ctrl.toml", &session)
        .wrap_err("Failed to initialise ActuatorCtrl")?;
    info!("ActuatorCtrl init complete");

    info!("Module initialisation complete\n");

    // ---- INITIALISE NETWORK ----

    info!("Initialising network");

    let zmq_ctx = bus_if::net::zmq::Context::new();

    let mut bus_client = None;

    if use_live_clients {
        let state_client = StateClient::new(&zmq_ctx, &exec_params)
            .wrap_err("Failed to initialise the StateClient")?;
        info!("StateClient initialised");

        let plan_client = PlanClient::new(&zmq_ctx, &exec_params)
            .wrap_err("Failed to initialise the PlanClient")?;
        info!("PlanClient initialised");

        bus_client = Some(
            BusClient::new(&zmq_ctx, &exec_params)
                .wrap_err("Failed to initialise the BusClient")?
        );
        info!("BusClient initialised");

        input_source = InputSource::Live {
            state_client,
            plan_client,
        };
    }

    let mut tm_server = {
        let s = TmServer::new(&zmq_ctx, &exec_params)
            .wrap_err("Failed to initialise TmServer")?;
        info!("TmServer initialised");
        s
    };

    info!("Network initialisation complete");

    // ---- MAIN LOOP ----

    info!("Begining main loop\n");

    loop {

        // Get cycle start time
        let cycle_start_instant = Instant::now();

        // Clear items that need wiping at the start of the cycle
        ds.cycle_start(CYCLE_FREQUENCY_HZ);

        // ---- DATA INPUT ----

        // Branch depending on the source
        match input_source {
            // If no source no point in continuing so break
            InputSource::None => raise_error!("No input source present"),

            InputSource::Live {
                ref state_client,
                ref plan_client,
            } => {
                // If a client is connected remove its safe mode cause,
                // otherwise make safe
                if state_client.is_connected() {
                    ds.make_unsafe(SafeModeCause::StateClientNotConnected).ok();
                }
                else {
                    ds.make_safe(SafeModeCause::StateClientNotConnected);
                }

                if plan_client.is_connected() {
                    ds.make_unsafe(SafeModeCause::PlanClientNotConnected).ok();
                }
                else {
                    ds.make_safe(SafeModeCause::PlanClientNotConnected);
                }

                // Sample the latest values, last value wins
                if let Some(s) = state_client.latest_state() {
                    ds.latest_state = Some(s);
                }
                if let Some(r) = plan_client.latest_request() {
                    ds.latest_request = Some(r);
                }
            }

            InputSource::Replay(ref mut si) =>
                match si.get_pending_records() {
                    PendingRecords::None => (),
                    PendingRecords::Some(record_vec) => {
                        for record in record_vec {
                            match record {
                                LogRecord::State(s) => ds.latest_state = Some(s),
                                LogRecord::Request(r) => ds.latest_request = Some(r),
                            }
                        }
                    }
                    // Exit if end of script reached
                    PendingRecords::EndOfScript => {
                        info!("End of replay script reached, stopping");
                        break
                    }
                }
        };

        // ---- CONTROL ALGORITHM PROCESSING ----

        // Build the controller inputs. While in safe mode the enable flag is
        // forced clear, the arbiters keep tracking the vehicle without
        // actuating it.
        let enabled = match ds.latest_request {
            Some(ref r) => r.enabled && !ds.safe,
            None => false,
        };

        ds.actuator_ctrl_input = actuator_ctrl::InputData {
            enabled,
            state: ds.latest_state.clone(),
            request: ds.latest_request.clone(),
        };

        // ActuatorCtrl processing
        match ds.actuator_ctrl.proc(&ds.actuator_ctrl_input) {
            Ok((o, r)) => {
                ds.actuator_ctrl_output = o;
                ds.actuator_ctrl_status_rpt = r;
            },
            Err(e) => {
                warn!("Error during ActuatorCtrl processing: {}", e)
            }
        };

        // ---- FRAME DESPATCH ----

        if let Some(ref mut client) = bus_client {
            match client.send_frames(&ds.actuator_ctrl_output.frames) {
                Ok(FramesResponse::FramesOk) => {
                    ds.make_unsafe(SafeModeCause::BusClientNotConnected).ok();

                    // Reset the recieve error counter
                    ds.num_consec_bus_recv_errors = 0;
                },
                Ok(r) => warn!(
                    "Recieved non-nominal response from the encoder bridge: {:?}",
                    r
                ),
                Err(BusClientError::NotConnected) => {
                    if !ds.safe {
                        error!("Connection to the encoder bridge lost");
                    }
                    ds.make_safe(SafeModeCause::BusClientNotConnected);
                }
                Err(BusClientError::RecvError(_)) => {
                    ds.num_consec_bus_recv_errors += 1;

                    // If over the limit print error and enter safe mode
                    if ds.num_consec_bus_recv_errors > MAX_BUS_RECV_ERROR_LIMIT {
                        if !ds.safe {
                            error!(
                                "Maximum number of BusClient recieve errors ({}) has been exceeded",
                                MAX_BUS_RECV_ERROR_LIMIT
                            );
                        }
                        ds.make_safe(SafeModeCause::BusClientNotConnected);
                    }
                },
                Err(e) => warn!("BusClient processing error: {}", e)
            }
        }

        // ---- PARAMETER REFRESH ----

        // Pick up tuning file edits at 1 Hz, outside the control path
        if ds.is_1_hz_cycle {
            ds.actuator_ctrl.refresh_tuning();
        }

        // ---- WRITE ARCHIVES ----

        if let Err(e) = ds.actuator_ctrl.write() {
            warn!("Could not write ActuatorCtrl archives: {}", e);
        }

        // ---- TELEMETRY ----

        match tm_server.send(&ds) {
            Ok(_) => (),
            Err(e) => warn!("TmServer error: {}", e)
        };

        // ---- CYCLE MANAGEMENT ----

        let cycle_dur = Instant::now() - cycle_start_instant;

        // Get sleep duration
        match Duration::from_secs_f64(CYCLE_PERIOD_S)
            .checked_sub(cycle_dur)
        {
            Some(d) => {
                ds.num_consec_cycle_overruns = 0;
                thread::sleep(d);
            },
            None => {
                warn!(
                    "Cycle overran by {:.06} s",
                    cycle_dur.as_secs_f64()
                        - Duration::from_secs_f64(CYCLE_PERIOD_S).as_secs_f64()
                );
                ds.num_consec_cycle_overruns += 1;
            }
        }

        // Increment cycle counter
        ds.num_cycles += 1;
    }

    // ---- SHUTDOWN ----

    info!("End of execution");

    Ok(())
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Various sources for the state and request inputs incoming to the exec.
enum InputSource {
    None,
    Live {
        state_client: StateClient,
        plan_client: PlanClient,
    },
    Replay(ScriptInterpreter)
}
