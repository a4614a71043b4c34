//! Tick-driven control surface for a card-game host.
//!
//! A single external client drives the game over a newline-delimited
//! JSON-RPC 2.0 socket protocol while the game's own loop advances at its
//! own pace. The host integrates two hooks: [`ControlServer::start`] at
//! startup (bind the socket, load the endpoint registry) and
//! [`ControlServer::update`] once per tick (poll the transport, dispatch,
//! re-evaluate deferred completions).
//!
//! ## Pipeline
//!
//! Inbound frames pass four gates in order (protocol, schema,
//! precondition, execution) and the first failure short-circuits with a
//! structured error response. Handlers either reply immediately or register
//! a predicate with the completion queue; the predicate is re-evaluated
//! every tick until the action's effect has observably settled, at which
//! point the full state snapshot is sent.

pub mod dispatch;
pub mod endpoints;
pub mod protocol;
pub mod respond;
pub mod schedule;
pub mod sim;
pub mod telemetry;
mod transport;
pub mod validator;

mod server;

pub use server::{ControlServer, StartupError};
pub use transport::{FrameError, Transport, TransportError};

#[cfg(test)]
mod testing;
