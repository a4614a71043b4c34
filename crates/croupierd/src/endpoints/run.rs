//! Run lifecycle: menu navigation, starting, saving, and loading.

use croupier_host::{GameState, RUN_STATES};

use crate::dispatch::{Endpoint, ExecContext, Execution, FieldType, required, optional};
use crate::protocol::ApiError;
use crate::schedule::Deferred;
use crate::validator::Schema;

/// Returns to the main menu from anywhere.
pub struct Menu;

impl Endpoint for Menu {
    fn name(&self) -> &'static str {
        "menu"
    }

    fn description(&self) -> &'static str {
        "Abandons the current screen and returns to the main menu"
    }

    fn schema(&self) -> &'static Schema {
        crate::dispatch::NO_ARGS
    }

    fn execute(&self, ctx: ExecContext<'_>) -> Result<Execution, ApiError> {
        ctx.host.main_menu()?;
        Ok(Execution::Defer(Deferred::snapshot_when(|host| {
            host.current_state() == GameState::Menu && host.settled()
        })))
    }
}

const START_SCHEMA: &Schema = &[
    ("deck", required(FieldType::String)),
    ("stake", required(FieldType::String)),
    ("seed", optional(FieldType::String)),
];

/// Starts a fresh run from the menu.
pub struct Start;

impl Endpoint for Start {
    fn name(&self) -> &'static str {
        "start"
    }

    fn description(&self) -> &'static str {
        "Starts a run with the given deck, stake, and optional seed"
    }

    fn schema(&self) -> &'static Schema {
        START_SCHEMA
    }

    fn requires_state(&self) -> Option<&'static [GameState]> {
        Some(&[GameState::Menu])
    }

    fn execute(&self, ctx: ExecContext<'_>) -> Result<Execution, ApiError> {
        let deck = ctx.str("deck").unwrap_or_default().to_owned();
        let stake = ctx.str("stake").unwrap_or_default().to_owned();
        let seed = ctx.str("seed").map(str::to_owned);
        ctx.host.start_run(&deck, &stake, seed.as_deref())?;
        Ok(Execution::Defer(Deferred::snapshot_when(|host| {
            host.current_state() == GameState::BlindSelect && host.settled()
        })))
    }
}

const SAVE_SCHEMA: &Schema = &[("path", required(FieldType::String))];

/// Writes the current run to a save file.
pub struct Save;

impl Endpoint for Save {
    fn name(&self) -> &'static str {
        "save"
    }

    fn description(&self) -> &'static str {
        "Writes the current run to a save file"
    }

    fn schema(&self) -> &'static Schema {
        SAVE_SCHEMA
    }

    fn requires_state(&self) -> Option<&'static [GameState]> {
        Some(RUN_STATES)
    }

    fn execute(&self, ctx: ExecContext<'_>) -> Result<Execution, ApiError> {
        let path = ctx.str("path").unwrap_or_default().to_owned();
        ctx.host.save_run(&path)?;
        Ok(Execution::Reply(crate::schedule::snapshot_map(ctx.host)))
    }
}

const LOAD_SCHEMA: &Schema = &[("path", required(FieldType::String))];

/// Replaces the current situation with a saved run.
pub struct Load;

impl Endpoint for Load {
    fn name(&self) -> &'static str {
        "load"
    }

    fn description(&self) -> &'static str {
        "Loads a saved run, replacing whatever is on screen"
    }

    fn schema(&self) -> &'static Schema {
        LOAD_SCHEMA
    }

    fn execute(&self, ctx: ExecContext<'_>) -> Result<Execution, ApiError> {
        let path = ctx.str("path").unwrap_or_default().to_owned();
        ctx.host.load_run(&path)?;
        Ok(Execution::Defer(Deferred::snapshot_when(|host| {
            host.settled()
        })))
    }
}
