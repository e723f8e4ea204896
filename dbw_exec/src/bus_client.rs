//! # Bus Client
//!
//! This module provides the networking abstractions to connect to the encoder
//! bridge, the process which owns the physical bus interface. The executive
//! sends the frames produced by the actuator controller once per cycle and
//! the bridge acknowledges each batch.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use bus_if::{
    eqpt::frame::{BusFrame, FramesResponse},
    net::{zmq, MonitoredSocket, MonitoredSocketError, SocketOptions},
};

use crate::params::DbwExecParams;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

pub struct BusClient {
    frames_socket: MonitoredSocket,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(thiserror::Error, Debug)]
pub enum BusClientError {
    #[error("Socket error: {0}")]
    SocketError(MonitoredSocketError),

    #[error("The client is not connected to the bridge")]
    NotConnected,

    #[error("Could not send frames to the bridge: {0}")]
    SendError(zmq::Error),

    #[error("Could not recieve a message from the bridge: {0}")]
    RecvError(zmq::Error),

    #[error("Could not serialize the frames: {0}")]
    SerializationError(serde_json::Error),

    #[error("Could not deserialize the response from the bridge: {0}")]
    DeserializeError(serde_json::Error),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl BusClient {
    /// Create a new instance of the bus client.
    pub fn new(ctx: &zmq::Context, params: &DbwExecParams) -> Result<Self, BusClientError> {
        // Create the socket options
        let frames_socket_options = SocketOptions {
            connect_timeout: 1000,
            heartbeat_ivl: 500,
            heartbeat_ttl: 1000,
            heartbeat_timeout: 1000,
            linger: 1,
            recv_timeout: 10,
            send_timeout: 10,
            req_correlate: true,
            req_relaxed: true,
            ..Default::default()
        };

        // Create the socket
        let frames_socket = MonitoredSocket::new(
            ctx,
            zmq::REQ,
            frames_socket_options,
            &params.bus_endpoint
        ).map_err(BusClientError::SocketError)?;

        // Create self
        Ok(Self {
            frames_socket,
        })
    }

    /// Send this cycle's frames to the bridge.
    ///
    /// Sends the given frames to the bridge. If the bridge acknowledges the
    /// batch within the configured timeout the response is returned,
    /// otherwise an `Err()` is returned. An empty batch is still sent so the
    /// bridge can tell a quiet cycle from a lost link.
    pub fn send_frames(
        &mut self,
        frames: &[BusFrame]
    ) -> Result<FramesResponse, BusClientError> {
        // If not connected return now
        if !self.frames_socket.connected() {
            return Err(BusClientError::NotConnected)
        }

        // Serialize the frames
        let frames_str = serde_json::to_string(frames)
            .map_err(BusClientError::SerializationError)?;

        // Send the frames to the bridge
        self.frames_socket.send(&frames_str, 0)
            .map_err(BusClientError::SendError)?;

        // Recieve response back from the bridge
        let msg = self.frames_socket.recv_msg(0);

        match msg {
            Ok(m) => {
                FramesResponse::from_json(m.as_str().unwrap_or(""))
                    .map_err(BusClientError::DeserializeError)
            }
            Err(e) => {
                Err(BusClientError::RecvError(e))
            }
        }
    }
}
