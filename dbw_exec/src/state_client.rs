//! # State Client
//!
//! The StateClient subscribes to the state estimator's snapshot publisher.
//! The estimator publishes one [`VehicleStateSnapshot`] per master bus cycle
//! and the client keeps only the most recent one, which the executive samples
//! at the top of each control cycle. Snapshots arriving between samples are
//! simply replaced, the native frame counters inside the snapshot let the
//! arbiters reject anything stale.

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
    eqpt::state::VehicleStateSnapshot,
    net::{zmq, MonitoredSocket, MonitoredSocketError, SocketOptions},
};

use crate::params::DbwExecParams;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

pub struct StateClient {
    bg_jh: Option<JoinHandle<()>>,
    bg_run: Arc<AtomicBool>,
    connected: Arc<AtomicBool>,
    latest_state: Arc<Mutex<Option<VehicleStateSnapshot>>>,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum StateClientError {
    #[error("Socket error: {0}")]
    SocketError(MonitoredSocketError),

    #[error("Could not subscribe to the estimator's publisher: {0}")]
    SubscribeError(zmq::Error),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl StateClient {
    /// Create a new instance of the StateClient.
    ///
    /// This function will not block until the estimator connects. Use
    /// `is_connected` to monitor the link.
    pub fn new(ctx: &zmq::Context, params: &DbwExecParams) -> Result<Self, StateClientError> {
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
            &params.state_endpoint
        ).map_err(StateClientError::SocketError)?;

        // Subscribe to everything the estimator publishes
        socket.set_subscribe(&[])
            .map_err(StateClientError::SubscribeError)?;

        // Create the data shared objects
        let bg_run = Arc::new(AtomicBool::new(true));
        let connected = Arc::new(AtomicBool::new(false));
        let latest_state = Arc::new(Mutex::new(None));

        // Create clones of these to pass to the bg thread
        let bg_run_clone = bg_run.clone();
        let connected_clone = connected.clone();
        let latest_state_clone = latest_state.clone();

        // Start BG thread
        let bg_jh = Some(thread::spawn(move || {
            bg_thread(socket, bg_run_clone, connected_clone, latest_state_clone)
        }));

        Ok(Self {
            bg_jh,
            bg_run,
            connected,
            latest_state,
        })
    }

    /// Check if the client is connected to the estimator.
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Relaxed)
    }

    /// Get the most recent snapshot received from the estimator.
    pub fn latest_state(&self) -> Option<VehicleStateSnapshot> {
        let ls = self.latest_state.lock()
            .expect("StateClient: latest_state mutex poisoned");

        (*ls).clone()
    }
}

impl Drop for StateClient {
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

/// Background thread, updates the latest snapshot when the estimator
/// publishes a new one.
fn bg_thread(
    socket: MonitoredSocket,
    run: Arc<AtomicBool>,
    connected: Arc<AtomicBool>,
    latest_state: Arc<Mutex<Option<VehicleStateSnapshot>>>,
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
                warn!("Non UTF-8 message from the state estimator");
                continue
            }
            Err(zmq::Error::EAGAIN) => continue,
            Err(e) => {
                error!("Error receiving message from the state estimator: {:?}", e);
                break
            }
        };

        // Deserialize the message
        let snapshot = match VehicleStateSnapshot::from_json(&msg) {
            Ok(s) => s,
            Err(e) => {
                warn!("Error deserialising snapshot from the state estimator: {:?}", e);
                continue
            }
        };

        // Set the snapshot in the front end
        {
            let mut ls = latest_state.lock()
                .expect("StateClient: latest_state mutex poisoned");

            *ls = Some(snapshot);
        }
    }
}
