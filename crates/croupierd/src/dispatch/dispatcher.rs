//! The four-tier dispatch pipeline.
//!
//! Each inbound frame passes through protocol, schema, precondition, and
//! execution checks in that order; the first failing tier short-circuits
//! with a typed error and the remaining tiers never run. Responses are
//! delivered through the one-shot responder, never by return value.

use std::rc::Rc;

use tracing::{debug, warn};

use croupier_host::GameHost;

use crate::protocol::{ApiError, Request, RequestId};
use crate::respond::{Responder, SharedOutbox};
use crate::schedule::CompletionQueue;
use crate::validator;

use super::endpoint::{Endpoint, ExecContext, Execution};
use super::registry::Registry;

pub(crate) const DISPATCH_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::dispatch");

/// Routes frames to endpoints and enforces the tier gates.
pub struct Dispatcher {
    registry: Registry,
}

impl Dispatcher {
    /// Creates a dispatcher over a fully built registry.
    #[must_use]
    pub fn new(registry: Registry) -> Self {
        Self { registry }
    }

    /// Read access to the registry, mainly for startup logging.
    #[must_use]
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Dispatches one framed request line.
    ///
    /// Always produces exactly one response: either through the endpoint's
    /// responder (now or deferred) or as an immediate error frame. Returns
    /// the request's correlation id once one was extracted.
    pub fn dispatch(
        &self,
        line: &str,
        generation: u64,
        host: &mut dyn GameHost,
        tick: u64,
        scheduler: &mut CompletionQueue,
        outbox: &SharedOutbox,
    ) -> RequestId {
        // Tier 1a: envelope.
        let request = match Request::parse(line) {
            Ok(request) => request,
            Err((error, id)) => {
                warn!(target: DISPATCH_TARGET, %error, "malformed request");
                Responder::new(id.clone(), generation, Rc::clone(outbox)).error(&error);
                return id;
            }
        };
        let id = request.id.clone();
        let responder = Responder::new(request.id, generation, Rc::clone(outbox));

        // Tier 1b: the method must name a registered endpoint.
        let Some(endpoint) = self.registry.get(&request.method) else {
            let error =
                ApiError::bad_request(format!("unknown endpoint '{}'", request.method));
            warn!(target: DISPATCH_TARGET, method = %request.method, "unknown endpoint");
            responder.error(&error);
            return id;
        };

        // Tier 2: schema validation, verdict propagated verbatim.
        let args = match validator::validate(&request.params, endpoint.schema()) {
            Ok(args) => args,
            Err(error) => {
                debug!(target: DISPATCH_TARGET, endpoint = endpoint.name(), %error, "schema rejection");
                responder.error(&error);
                return id;
            }
        };

        // Tier 3: state gate.
        if let Some(states) = endpoint.requires_state() {
            let current = host.current_state();
            if !states.contains(&current) {
                let error = state_gate_error(endpoint, states);
                debug!(
                    target: DISPATCH_TARGET,
                    endpoint = endpoint.name(),
                    state = %current,
                    "state gate rejection"
                );
                responder.error(&error);
                return id;
            }
        }

        // Tier 4: execution behind the failure boundary.
        debug!(target: DISPATCH_TARGET, endpoint = endpoint.name(), tick, "executing");
        let context = ExecContext { args, host, tick };
        match endpoint.execute(context) {
            Ok(Execution::Reply(payload)) => responder.result(&payload),
            Ok(Execution::Defer(deferred)) => {
                scheduler.register(endpoint.name(), deferred, responder, tick);
            }
            Err(error) => {
                debug!(target: DISPATCH_TARGET, endpoint = endpoint.name(), %error, "handler error");
                responder.error(&error);
            }
        }
        id
    }
}

fn state_gate_error(endpoint: &dyn Endpoint, states: &[croupier_host::GameState]) -> ApiError {
    let names: Vec<String> = states.iter().map(ToString::to_string).collect();
    ApiError::state_gate(format!(
        "Endpoint '{}' requires one of these states: {}",
        endpoint.name(),
        names.join(", ")
    ))
}
