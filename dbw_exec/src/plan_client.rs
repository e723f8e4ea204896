//! # Plan Client
//!
//! The PlanClient subscribes to the trajectory planner's control request
//! publisher. As with the state link only the most recent request is kept,
//! the executive samples it once per control cycle and a stale request simply
//! keeps the previous demands (the arbiters hold their last values until
//! fresh native counters arrive anyway).

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex,
    },
    thread::{self, JoinHandle},
};

use log::{error, warn};

use bus_if::{
    eqpt::ctrl::ControlRequest,
    net::{zmq, MonitoredSocket, MonitoredSocketError, SocketOptions},
};

use crate::params::DbwExecParams;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

pub struct PlanClient {
    bg_jh: Option<JoinHandle<()>>,
    bg_run: Arc<AtomicBool>,
    connected: Arc<AtomicBool>,
    latest_request: Arc<Mutex<Option<ControlRequest>>>,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum PlanClientError {
    #[error("Socket error: {0}")]
    SocketError(MonitoredSocketError),

    #[error("Could not subscribe to the planner's publisher: {0}")]
    SubscribeError(zmq::Error),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl PlanClient {
    /// Create a new instance of the PlanClient.
    ///
    /// This function will not block until the planner connects. Use
    /// `is_connected` to monitor the link.
    pub fn new(ctx: &zmq::Context, params: &DbwExecParams) -> Result<Self, PlanClientError> {
        // Create the socket options
        let socket_options = SocketOptions {
            block_on_first_connect: false,
            connect_timeout: 1000,
            heartbeat_ivl: 500,
            heartbeat_ttl: 1000,
            heartbeat_timeout: 1000,
            linger: 1,
            recv_timeout: 10,
            send_timeout: 10,
            ..Default::default()
        };

        // Connect the socket
        let socket = MonitoredSocket::new(
            ctx,
            zmq::SUB,
            socket_options,
            &params.plan_endpoint
        ).map_err(PlanClientError::SocketError)?;

        // Subscribe to everything the planner publishes
        socket.set_subscribe(&[])
            .map_err(PlanClientError::SubscribeError)?;

        // Create the data shared objects
        let bg_run = Arc::new(AtomicBool::new(true));
        let connected = Arc::new(AtomicBool::new(false));
        let latest_request = Arc::new(Mutex::new(None));

        // Create clones of these to pass to the bg thread
        let bg_run_clone = bg_run.clone();
        let connected_clone = connected.clone();
        let latest_request_clone = latest_request.clone();

        // Start BG thread
        let bg_jh = Some(thread::spawn(move || {
            bg_thread(socket, bg_run_clone, connected_clone, latest_request_clone)
        }));

        Ok(Self {
            bg_jh,
            bg_run,
            connected,
            latest_request,
        })
    }

    /// Check if the client is connected to the planner.
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Relaxed)
    }

    /// Get the most recent control request received from the planner.
    pub fn latest_request(&self) -> Option<ControlRequest> {
        let lr = self.latest_request.lock()
            .expect("PlanClient: latest_request mutex poisoned");

        (*lr).clone()
    }
}

impl Drop for PlanClient {
    fn drop(&mut self) {
        self.bg_run.store(false, Ordering::Relaxed);

        // The bg thread rechecks the run flag within one receive timeout, so
        // this join cannot hang.
        if let Some(jh) = self.bg_jh.take() {
            jh.join().ok();
        }
    }
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Background thread, updates the latest request when the planner publishes
/// a new one.
fn bg_thread(
    socket: MonitoredSocket,
    run: Arc<AtomicBool>,
    connected: Arc<AtomicBool>,
    latest_request: Arc<Mutex<Option<ControlRequest>>>,
) {
    // While instructed to run
    while run.load(Ordering::Relaxed) {
        // Keep the connection flag fresh for the executive's safe mode
        // bookkeeping
        connected.store(socket.connected(), Ordering::Relaxed);

        // Read string from the socket
        let msg = match socket.recv_string(0) {
            Ok(Ok(s)) => s,
            Ok(Err(_)) => {
                warn!("Non UTF-8 message from the trajectory planner");
                continue
            }
            Err(zmq::Error::EAGAIN) => continue,
            Err(e) => {
                error!("Error receiving message from the trajectory planner: {:?}", e);
                break
            }
        };

        // Deserialize the message
        let request = match ControlRequest::from_json(&msg) {
            Ok(r) => r,
            Err(e) => {
                warn!("Error deserialising request from the trajectory planner: {:?}", e);
                continue
            }
        };

        // Set the request in the front end
        {
            let mut lr = latest_request.lock()
                .expect("PlanClient: latest_request mutex poisoned");

            *lr = Some(request);
        }
    }
}
