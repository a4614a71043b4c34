//! One-shot response delivery.
//!
//! Every dispatched request yields exactly one [`Responder`], and consuming
//! it is the only way a response reaches the client. Responders write into a
//! shared outbox that the transport flushes at the end of the tick; frames
//! are tagged with the connection generation they belong to so a response
//! produced for a disconnected client is dropped instead of being delivered
//! to its successor.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use serde_json::{Map, Value};
use tracing::warn;

use crate::protocol::{self, ApiError, RequestId};

const RESPOND_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::respond");

/// A serialised response frame awaiting transmission.
#[derive(Debug)]
pub struct OutboundFrame {
    /// Connection generation the frame was produced for.
    pub generation: u64,
    /// Correlation id the frame answers.
    pub id: RequestId,
    /// Full frame bytes, newline terminator included.
    pub bytes: Vec<u8>,
}

/// Queue of response frames drained by the transport once per tick.
#[derive(Debug, Default)]
pub struct Outbox {
    frames: VecDeque<OutboundFrame>,
}

impl Outbox {
    fn push(&mut self, frame: OutboundFrame) {
        self.frames.push_back(frame);
    }

    /// Removes and returns the oldest queued frame.
    pub fn pop(&mut self) -> Option<OutboundFrame> {
        self.frames.pop_front()
    }

    /// Number of frames waiting to be flushed.
    #[must_use]
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// Whether the outbox holds no frames.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

/// Shared handle to the per-server outbox.
pub type SharedOutbox = Rc<RefCell<Outbox>>;

/// Creates an empty shared outbox.
#[must_use]
pub fn shared_outbox() -> SharedOutbox {
    Rc::new(RefCell::new(Outbox::default()))
}

struct ResponderInner {
    id: RequestId,
    generation: u64,
    outbox: SharedOutbox,
}

/// One-shot completion token for a single request.
///
/// Consuming [`Responder::result`] or [`Responder::error`] is the only way
/// to answer the request; the type-level consumption enforces the
/// exactly-one-response invariant. Dropping a responder unconsumed logs a
/// warning, because it means a handler accepted a request and forgot it.
pub struct Responder {
    inner: Option<ResponderInner>,
}

impl Responder {
    /// Creates a responder bound to a correlation id and connection
    /// generation.
    #[must_use]
    pub fn new(id: RequestId, generation: u64, outbox: SharedOutbox) -> Self {
        Self {
            inner: Some(ResponderInner {
                id,
                generation,
                outbox,
            }),
        }
    }

    /// The correlation id this responder will echo.
    #[must_use]
    pub fn id(&self) -> &RequestId {
        static NULL_ID: Value = Value::Null;
        self.inner.as_ref().map_or(&NULL_ID, |inner| &inner.id)
    }

    /// Sends a success response carrying `result`.
    pub fn result(mut self, result: &Map<String, Value>) {
        if let Some(inner) = self.inner.take() {
            let bytes = protocol::result_frame(&inner.id, result);
            inner.outbox.borrow_mut().push(OutboundFrame {
                generation: inner.generation,
                id: inner.id,
                bytes,
            });
        }
    }

    /// Sends a structured error response.
    pub fn error(mut self, error: &ApiError) {
        if let Some(inner) = self.inner.take() {
            let bytes = protocol::error_frame(&inner.id, error);
            inner.outbox.borrow_mut().push(OutboundFrame {
                generation: inner.generation,
                id: inner.id,
                bytes,
            });
        }
    }
}

impl Drop for Responder {
    fn drop(&mut self) {
        if let Some(inner) = &self.inner {
            warn!(
                target: RESPOND_TARGET,
                id = %inner.id,
                "request dropped without a response"
            );
        }
    }
}
