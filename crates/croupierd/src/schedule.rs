//! Deferred-completion scheduling.
//!
//! Most commands issue an action whose effect settles some unknown number of
//! host ticks later. A handler that cannot answer immediately registers a
//! predicate over live state together with a payload builder; the queue
//! re-evaluates every pending predicate once per tick and fires the
//! continuation on the first tick the predicate holds. A completion carries
//! an optional tick budget: exhausting it answers the client with a timeout
//! error instead of polling forever.

use serde_json::{Map, Value};
use tracing::debug;

use croupier_host::GameHost;

use crate::protocol::ApiError;
use crate::respond::Responder;

const SCHEDULE_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::schedule");

/// Predicate re-evaluated once per tick against live state.
pub type Predicate = Box<dyn FnMut(&dyn GameHost) -> bool>;

/// Builds the success payload once the predicate holds.
pub type PayloadBuilder = Box<dyn FnOnce(&dyn GameHost) -> Map<String, Value>>;

/// A handler's request to answer later.
pub struct Deferred {
    predicate: Predicate,
    payload: PayloadBuilder,
}

impl std::fmt::Debug for Deferred {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Deferred").finish_non_exhaustive()
    }
}

impl Deferred {
    /// Defers until `predicate` holds, then responds with `payload`.
    #[must_use]
    pub fn new(
        predicate: impl FnMut(&dyn GameHost) -> bool + 'static,
        payload: impl FnOnce(&dyn GameHost) -> Map<String, Value> + 'static,
    ) -> Self {
        Self {
            predicate: Box::new(predicate),
            payload: Box::new(payload),
        }
    }

    /// Defers until `predicate` holds, then responds with the full state
    /// snapshot, the common case: callers treat every response as a full
    /// refresh.
    #[must_use]
    pub fn snapshot_when(predicate: impl FnMut(&dyn GameHost) -> bool + 'static) -> Self {
        Self::new(predicate, |host| snapshot_map(host))
    }
}

/// Serialises the host's full snapshot as a response payload.
#[must_use]
pub fn snapshot_map(host: &dyn GameHost) -> Map<String, Value> {
    match serde_json::to_value(host.snapshot()) {
        Ok(Value::Object(map)) => map,
        Ok(_) | Err(_) => Map::new(),
    }
}

struct Pending {
    endpoint: &'static str,
    predicate: Predicate,
    payload: Option<PayloadBuilder>,
    responder: Option<Responder>,
    created_at: u64,
    deadline: Option<u64>,
}

/// Queue of pending completions, drained once per host tick.
///
/// Entries are independent; nothing serialises them against each other, and
/// completions fire in whatever tick order their predicates are satisfied.
pub struct CompletionQueue {
    pending: Vec<Pending>,
    budget: Option<u64>,
}

impl CompletionQueue {
    /// Creates a queue whose completions expire after `budget` ticks, or
    /// never when `budget` is `None`.
    #[must_use]
    pub fn new(budget: Option<u64>) -> Self {
        Self {
            pending: Vec::new(),
            budget,
        }
    }

    /// Registers a deferred completion created at `tick`.
    pub fn register(&mut self, endpoint: &'static str, deferred: Deferred, responder: Responder, tick: u64) {
        debug!(
            target: SCHEDULE_TARGET,
            endpoint,
            tick,
            pending = self.pending.len() + 1,
            "completion registered"
        );
        self.pending.push(Pending {
            endpoint,
            predicate: deferred.predicate,
            payload: Some(deferred.payload),
            responder: Some(responder),
            created_at: tick,
            deadline: self.budget.map(|budget| tick.saturating_add(budget)),
        });
    }

    /// Number of completions still polling.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Whether no completion is pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Re-evaluates every pending predicate against live state.
    ///
    /// Satisfied completions respond with their payload; expired ones
    /// respond with a timeout error. Each fires at most once.
    pub fn poll(&mut self, host: &dyn GameHost, tick: u64) {
        let mut index = 0;
        while index < self.pending.len() {
            let entry = &mut self.pending[index];
            if (entry.predicate)(host) {
                let mut entry = self.pending.swap_remove(index);
                debug!(
                    target: SCHEDULE_TARGET,
                    endpoint = entry.endpoint,
                    waited = tick.saturating_sub(entry.created_at),
                    "completion satisfied"
                );
                if let (Some(payload), Some(responder)) =
                    (entry.payload.take(), entry.responder.take())
                {
                    responder.result(&payload(host));
                }
            } else if entry.deadline.is_some_and(|deadline| tick >= deadline) {
                let mut entry = self.pending.swap_remove(index);
                debug!(
                    target: SCHEDULE_TARGET,
                    endpoint = entry.endpoint,
                    "completion timed out"
                );
                if let Some(responder) = entry.responder.take() {
                    responder.error(&ApiError::timeout(format!(
                        "Endpoint '{}' did not settle within its tick budget",
                        entry.endpoint
                    )));
                }
            } else {
                index += 1;
            }
        }
    }
}
