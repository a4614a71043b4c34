//! Connection management for the control socket.
//!
//! One listening socket, at most one live client. A new connection silently
//! replaces (and closes) the previous one; there is no handshake and no
//! session resumption. All socket operations are non-blocking polls invoked
//! once per host tick; none of them suspend the tick.

mod connection;
mod errors;
mod listener;

use std::net::SocketAddr;

use tracing::{debug, info, warn};

use croupier_config::SocketEndpoint;

pub(crate) use self::connection::{Connection, ConnectionStream, FramePoll};
pub use self::errors::{FrameError, TransportError};
use self::listener::Listener;

use crate::protocol::RequestId;
use crate::respond::OutboundFrame;

pub(crate) const TRANSPORT_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::transport");

/// Owns the listening socket and the single client slot.
pub struct Transport {
    listener: Listener,
    client: Option<Connection>,
    next_generation: u64,
    /// Correlation id of the request currently awaiting its response.
    in_flight: Option<RequestId>,
    max_frame: usize,
}

impl Transport {
    /// Binds the control endpoint and prepares the (empty) client slot.
    pub fn bind(endpoint: &SocketEndpoint, max_frame: usize) -> Result<Self, TransportError> {
        let listener = Listener::bind(endpoint)?;
        info!(
            target: TRANSPORT_TARGET,
            endpoint = %listener.endpoint(),
            "control socket listening"
        );
        Ok(Self {
            listener,
            client: None,
            next_generation: 0,
            in_flight: None,
            max_frame,
        })
    }

    /// Local address for TCP endpoints; useful when bound to port 0.
    #[must_use]
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.listener.local_addr()
    }

    /// Whether a client is currently connected.
    #[must_use]
    pub fn has_client(&self) -> bool {
        self.client.is_some()
    }

    /// Generation of the live connection, if any.
    #[must_use]
    pub fn current_generation(&self) -> Option<u64> {
        self.client.as_ref().map(Connection::generation)
    }

    /// Records the correlation id of the request just dispatched.
    pub fn note_in_flight(&mut self, id: RequestId) {
        self.in_flight = Some(id);
    }

    /// Accepts pending connections; the most recent one wins the slot.
    pub fn poll_accept(&mut self) {
        loop {
            match self.listener.poll_accept() {
                Ok(Some(stream)) => {
                    self.next_generation += 1;
                    let generation = self.next_generation;
                    if self.client.is_some() {
                        if self.in_flight.is_some() {
                            warn!(
                                target: TRANSPORT_TARGET,
                                generation,
                                "replacing client while a request is awaiting its response"
                            );
                        } else {
                            info!(
                                target: TRANSPORT_TARGET,
                                generation,
                                "replacing existing client connection"
                            );
                        }
                    } else {
                        info!(target: TRANSPORT_TARGET, generation, "client connected");
                    }
                    // Dropping the old connection closes its socket.
                    self.client = Some(Connection::new(stream, generation));
                    self.in_flight = None;
                }
                Ok(None) => break,
                Err(error) => {
                    warn!(target: TRANSPORT_TARGET, %error, "socket accept error");
                    break;
                }
            }
        }
    }

    /// Polls the live client for one request frame.
    ///
    /// Returns the connection generation together with either a complete
    /// line or the framing violation that consumed the offending bytes.
    pub fn poll_frame(&mut self) -> Option<(u64, Result<String, FrameError>)> {
        let connection = self.client.as_mut()?;
        let generation = connection.generation();
        match connection.poll_frame(self.max_frame) {
            FramePoll::Idle => None,
            FramePoll::Frame(line) => Some((generation, Ok(line))),
            FramePoll::Reject(error) => {
                debug!(target: TRANSPORT_TARGET, %error, "rejected request frame");
                Some((generation, Err(error)))
            }
            FramePoll::Disconnected => {
                info!(target: TRANSPORT_TARGET, generation, "client disconnected");
                self.client = None;
                self.in_flight = None;
                None
            }
        }
    }

    /// Queues a response frame for the connection it belongs to.
    ///
    /// Frames produced for a connection that has since been replaced are
    /// dropped: the request they answer died with its client.
    pub fn send(&mut self, frame: OutboundFrame) {
        match &mut self.client {
            Some(connection) if connection.generation() == frame.generation => {
                if self
                    .in_flight
                    .as_ref()
                    .is_some_and(|pending| *pending == frame.id)
                {
                    self.in_flight = None;
                }
                connection.queue_write(&frame.bytes);
            }
            _ => {
                debug!(
                    target: TRANSPORT_TARGET,
                    generation = frame.generation,
                    "dropping response for a dead connection"
                );
            }
        }
    }

    /// Flushes queued output; a write failure closes the connection.
    ///
    /// Send failures are swallowed by design: a deferred response racing a
    /// disconnect must never take the host tick loop down.
    pub fn flush(&mut self) {
        let Some(connection) = self.client.as_mut() else {
            return;
        };
        if let Err(error) = connection.flush_outgoing() {
            warn!(target: TRANSPORT_TARGET, %error, "client write failed; dropping connection");
            self.client = None;
            self.in_flight = None;
        }
    }
}
