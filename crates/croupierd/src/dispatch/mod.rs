//! Command registry and request dispatch.
//!
//! Frames arrive from the transport, pass through the tiered pipeline in
//! [`dispatcher`], and reach an [`endpoint::Endpoint`] looked up in the
//! [`registry::Registry`]. The endpoint answers through a one-shot
//! responder, either immediately or via a deferred completion.

mod dispatcher;
mod endpoint;
mod registry;

pub use dispatcher::Dispatcher;
pub use endpoint::{ExecContext, Execution, FieldType, NO_ARGS, Endpoint, optional, required};
pub use registry::{Registry, RegistryError};
