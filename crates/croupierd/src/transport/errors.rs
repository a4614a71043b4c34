//! Error types for the control socket transport.

use std::io;
use std::net::SocketAddr;

use thiserror::Error;

use crate::protocol::ApiError;

/// Errors surfaced while binding or polling the control socket.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("failed to resolve TCP address {host}:{port}: {source}")]
    Resolve {
        host: String,
        port: u16,
        #[source]
        source: io::Error,
    },
    #[error("no TCP addresses resolved for {host}:{port}")]
    ResolveEmpty { host: String, port: u16 },
    #[error("failed to bind TCP listener at {addr}: {source}")]
    BindTcp {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },
    #[error("failed to enable non-blocking listener: {source}")]
    NonBlocking {
        #[source]
        source: io::Error,
    },
    #[cfg(not(unix))]
    #[error("unix sockets are unsupported for endpoint {endpoint}")]
    UnsupportedUnix { endpoint: String },
    #[cfg(unix)]
    #[error("failed to bind unix listener at {path}: {source}")]
    BindUnix {
        path: String,
        #[source]
        source: io::Error,
    },
    #[cfg(unix)]
    #[error("existing unix socket {path} is already in use")]
    UnixInUse { path: String },
    #[cfg(unix)]
    #[error("unix socket path {path} is not a socket")]
    UnixNotSocket { path: String },
    #[cfg(unix)]
    #[error("failed to read metadata for unix socket {path}: {source}")]
    UnixMetadata {
        path: String,
        #[source]
        source: io::Error,
    },
    #[cfg(unix)]
    #[error("failed to connect to existing unix socket {path}: {source}")]
    UnixConnect {
        path: String,
        #[source]
        source: io::Error,
    },
    #[cfg(unix)]
    #[error("failed to remove stale unix socket {path}: {source}")]
    UnixCleanup {
        path: String,
        #[source]
        source: io::Error,
    },
}

/// Framing violations detected before a request reaches the dispatcher.
///
/// Each rejection discards the offending bytes and is answered with a
/// protocol error; the connection itself stays open.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FrameError {
    /// The line (newline included) exceeds the frame cap.
    #[error("request too large: {size} bytes exceeds {max} byte limit")]
    TooLarge { size: usize, max: usize },
    /// Bytes were already buffered past the newline; only one request may
    /// be in flight.
    #[error("pipelined input rejected: {extra} bytes buffered after newline")]
    Pipelined { extra: usize },
    /// The trimmed line does not start with `{`.
    #[error("request must be a JSON object")]
    NotAnObject,
    /// The line is not valid UTF-8.
    #[error("request must be valid UTF-8")]
    InvalidEncoding,
}

impl From<&FrameError> for ApiError {
    fn from(error: &FrameError) -> Self {
        Self::bad_request(error.to_string())
    }
}
