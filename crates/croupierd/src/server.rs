//! Control server assembly and the per-tick update hook.
//!
//! The host application owns the loop; it calls [`ControlServer::start`]
//! once and [`ControlServer::update`] every tick. One update pass polls the
//! transport, dispatches at most one frame, re-evaluates pending
//! completions, and flushes queued responses, all without suspending the
//! tick.

use std::net::SocketAddr;

use thiserror::Error;
use tracing::info;

use croupier_config::{Config, SocketPreparationError};
use croupier_host::GameHost;

use crate::dispatch::{Dispatcher, Registry, RegistryError};
use crate::endpoints;
use crate::protocol::ApiError;
use crate::respond::{Responder, SharedOutbox, shared_outbox};
use crate::schedule::CompletionQueue;
use crate::telemetry::{self, TelemetryError};
use crate::transport::{Transport, TransportError};
use croupier_config::defaults::MAX_FRAME_BYTES;

const SERVER_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::server");

/// Errors surfaced while starting the control server.
///
/// Startup is fail-fast: any of these aborts before the socket serves a
/// single request.
#[derive(Debug, Error)]
pub enum StartupError {
    /// The endpoint table failed registration checks.
    #[error("failed to build endpoint registry: {source}")]
    Registry {
        #[source]
        source: RegistryError,
    },
    /// Telemetry initialisation failed.
    #[error("failed to initialise telemetry: {source}")]
    Telemetry {
        #[source]
        source: TelemetryError,
    },
    /// The socket directory could not be prepared.
    #[error("failed to prepare control socket: {source}")]
    Socket {
        #[source]
        source: SocketPreparationError,
    },
    /// The control socket could not be bound.
    #[error("failed to bind control socket: {source}")]
    Transport {
        #[source]
        source: TransportError,
    },
}

/// The assembled control surface.
pub struct ControlServer {
    transport: Transport,
    dispatcher: Dispatcher,
    scheduler: CompletionQueue,
    outbox: SharedOutbox,
    tick: u64,
}

impl ControlServer {
    /// Starts the server with the standard endpoint table.
    ///
    /// # Errors
    ///
    /// Returns [`StartupError`] when telemetry, the registry, or the socket
    /// cannot be set up.
    pub fn start(config: &Config) -> Result<Self, StartupError> {
        let registry =
            endpoints::standard_registry().map_err(|source| StartupError::Registry { source })?;
        Self::start_with_registry(config, registry)
    }

    /// Starts the server with a caller-supplied registry.
    ///
    /// # Errors
    ///
    /// Returns [`StartupError`] when telemetry or the socket cannot be set
    /// up.
    pub fn start_with_registry(config: &Config, registry: Registry) -> Result<Self, StartupError> {
        telemetry::initialise(config).map_err(|source| StartupError::Telemetry { source })?;
        config
            .socket()
            .prepare_filesystem()
            .map_err(|source| StartupError::Socket { source })?;
        let transport = Transport::bind(config.socket(), MAX_FRAME_BYTES)
            .map_err(|source| StartupError::Transport { source })?;

        let dispatcher = Dispatcher::new(registry);
        info!(
            target: SERVER_TARGET,
            endpoints = dispatcher.registry().len(),
            settle_budget = ?config.settle_budget(),
            "control server ready"
        );
        Ok(Self {
            transport,
            dispatcher,
            scheduler: CompletionQueue::new(config.settle_budget()),
            outbox: shared_outbox(),
            tick: 0,
        })
    }

    /// Local address of the control socket for TCP endpoints.
    #[must_use]
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.transport.local_addr()
    }

    /// Current tick count.
    #[must_use]
    pub fn tick(&self) -> u64 {
        self.tick
    }

    /// Number of deferred completions still polling.
    #[must_use]
    pub fn pending_completions(&self) -> usize {
        self.scheduler.len()
    }

    /// Drives one tick of transport, dispatch, and completion polling.
    pub fn update(&mut self, host: &mut dyn GameHost) {
        self.tick += 1;

        self.transport.poll_accept();

        if let Some((generation, frame)) = self.transport.poll_frame() {
            match frame {
                Ok(line) => {
                    let id = self.dispatcher.dispatch(
                        &line,
                        generation,
                        host,
                        self.tick,
                        &mut self.scheduler,
                        &self.outbox,
                    );
                    self.transport.note_in_flight(id);
                }
                Err(error) => {
                    // Framing violations never carry a parsed id.
                    let responder = Responder::new(
                        serde_json::Value::Null,
                        generation,
                        std::rc::Rc::clone(&self.outbox),
                    );
                    responder.error(&ApiError::from(&error));
                }
            }
        }

        self.scheduler.poll(host, self.tick);

        loop {
            let frame = self.outbox.borrow_mut().pop();
            match frame {
                Some(frame) => self.transport.send(frame),
                None => break,
            }
        }
        self.transport.flush();
    }
}
