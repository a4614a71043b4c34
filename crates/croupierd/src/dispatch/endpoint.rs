//! The endpoint contract.
//!
//! Every externally triggerable behaviour is an [`Endpoint`]: a named,
//! schema-validated, optionally state-gated handler. The required method set
//! is fixed by the trait and checked once at registration, not per call.

use serde_json::{Map, Value};

use croupier_host::{GameHost, GameState};

use crate::protocol::ApiError;
use crate::schedule::Deferred;
use crate::validator::{Schema, SchemaField};

/// Empty schema shared by argument-less endpoints.
pub const NO_ARGS: &Schema = &[];

/// Everything a handler may touch while executing.
pub struct ExecContext<'a> {
    /// Validated arguments; unknown extra fields pass through untouched.
    pub args: &'a Map<String, Value>,
    /// Live host application; read via snapshots, mutate via actions.
    pub host: &'a mut dyn GameHost,
    /// Current host tick.
    pub tick: u64,
}

impl ExecContext<'_> {
    /// Integer argument accessor; validation guarantees the type when the
    /// schema declared it, so a mismatch reads as absent.
    #[must_use]
    pub fn int(&self, name: &str) -> Option<i64> {
        self.args.get(name).and_then(as_whole_number)
    }

    /// String argument accessor.
    #[must_use]
    pub fn str(&self, name: &str) -> Option<&str> {
        self.args.get(name).and_then(Value::as_str)
    }

    /// Boolean argument accessor.
    #[must_use]
    pub fn bool(&self, name: &str) -> Option<bool> {
        self.args.get(name).and_then(Value::as_bool)
    }

    /// Integer-array accessor covering both wire encodings of a sequence.
    #[must_use]
    pub fn int_array(&self, name: &str) -> Option<Vec<i64>> {
        let value = self.args.get(name)?;
        let items: Vec<&Value> = match value {
            Value::Array(items) => items.iter().collect(),
            Value::Object(map) => (1..=map.len())
                .filter_map(|index| map.get(&index.to_string()))
                .collect(),
            _ => return None,
        };
        items.into_iter().map(as_whole_number).collect()
    }
}

/// Shares the validator's view of integers: whole-valued floats count.
fn as_whole_number(value: &Value) -> Option<i64> {
    value.as_i64().or_else(|| {
        value
            .as_f64()
            .filter(|float| float.is_finite() && float.fract() == 0.0)
            .map(|float| float as i64)
    })
}

/// How an execution concluded.
#[derive(Debug)]
pub enum Execution {
    /// Respond right now with this payload.
    Reply(Map<String, Value>),
    /// Respond once the registered predicate holds.
    Defer(Deferred),
}

/// A named, schema-validated, optionally state-gated command.
pub trait Endpoint {
    /// Unique registry key and wire method name.
    fn name(&self) -> &'static str;

    /// One-line human description.
    fn description(&self) -> &'static str;

    /// Argument schema, checked before `execute` runs.
    fn schema(&self) -> &'static Schema;

    /// States the endpoint may run in; `None` runs anywhere, including
    /// states where no run is active.
    fn requires_state(&self) -> Option<&'static [GameState]> {
        None
    }

    /// Runs the command against validated arguments and live state.
    ///
    /// # Errors
    ///
    /// Any error is translated to a structured error response at the
    /// dispatch boundary; the host tick loop never observes it.
    fn execute(&self, ctx: ExecContext<'_>) -> Result<Execution, ApiError>;
}

/// Re-exported so endpoint modules can build schemas without reaching into
/// the validator directly.
pub use crate::validator::FieldType;

/// Shorthand used by endpoint schema tables.
pub const fn required(field_type: FieldType) -> SchemaField {
    SchemaField::required(field_type)
}

/// Shorthand used by endpoint schema tables.
pub const fn optional(field_type: FieldType) -> SchemaField {
    SchemaField::optional(field_type)
}
