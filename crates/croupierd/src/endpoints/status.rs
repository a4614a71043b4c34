//! Liveness and observation endpoints; no preconditions, no side effects.

use serde_json::{Map, Value};

use crate::dispatch::{Endpoint, ExecContext, Execution, NO_ARGS};
use crate::protocol::ApiError;
use crate::schedule::snapshot_map;
use crate::validator::Schema;

/// Immediate liveness probe.
pub struct Health;

impl Endpoint for Health {
    fn name(&self) -> &'static str {
        "health"
    }

    fn description(&self) -> &'static str {
        "Reports that the control socket is alive"
    }

    fn schema(&self) -> &'static Schema {
        NO_ARGS
    }

    fn execute(&self, _ctx: ExecContext<'_>) -> Result<Execution, ApiError> {
        let mut payload = Map::new();
        payload.insert("status".to_owned(), Value::from("ok"));
        Ok(Execution::Reply(payload))
    }
}

/// Full state snapshot on demand; valid in every state, including the menu.
pub struct Gamestate;

impl Endpoint for Gamestate {
    fn name(&self) -> &'static str {
        "gamestate"
    }

    fn description(&self) -> &'static str {
        "Returns the full current game state"
    }

    fn schema(&self) -> &'static Schema {
        NO_ARGS
    }

    fn execute(&self, ctx: ExecContext<'_>) -> Result<Execution, ApiError> {
        Ok(Execution::Reply(snapshot_map(ctx.host)))
    }
}
