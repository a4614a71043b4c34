//! Built-in defaults shared by the library and the binary.

use crate::SocketEndpoint;

/// Port the original mod listens on; kept for drop-in client compatibility.
pub const DEFAULT_PORT: u16 = 12346;

/// Loopback-only by default: the protocol carries no authentication.
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Default tracing filter expression.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Hard cap on one request line, newline terminator included.
pub const MAX_FRAME_BYTES: usize = 256;

/// Ticks a deferred completion may poll before it times out.
///
/// Roughly thirty seconds at the host's 60 Hz update rate. Zero disables the
/// budget and a stuck predicate polls forever.
pub const DEFAULT_SETTLE_BUDGET: u64 = 1800;

/// Default control socket endpoint.
#[must_use]
pub fn socket_endpoint() -> SocketEndpoint {
    SocketEndpoint::tcp(DEFAULT_HOST, DEFAULT_PORT)
}
