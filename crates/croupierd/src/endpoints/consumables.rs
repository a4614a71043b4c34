//! Consumable use and booster pack resolution.

use croupier_host::{GameState, PACK_STATES};

use crate::dispatch::{Endpoint, ExecContext, Execution, FieldType, optional, required};
use crate::protocol::ApiError;
use crate::schedule::Deferred;
use crate::validator::Schema;

use super::{checked_index, checked_indices};

const USE_SCHEMA: &Schema = &[
    ("consumable", required(FieldType::Integer)),
    ("cards", optional(FieldType::Array).items(FieldType::Integer)),
];

/// Uses a held consumable, optionally targeting hand cards.
pub struct Use;

impl Endpoint for Use {
    fn name(&self) -> &'static str {
        "use"
    }

    fn description(&self) -> &'static str {
        "Uses a held consumable, optionally targeting hand cards"
    }

    fn schema(&self) -> &'static Schema {
        USE_SCHEMA
    }

    fn requires_state(&self) -> Option<&'static [GameState]> {
        Some(&[GameState::SelectingHand, GameState::Shop])
    }

    fn execute(&self, ctx: ExecContext<'_>) -> Result<Execution, ApiError> {
        let baseline = ctx.host.snapshot();
        let index = ctx.int("consumable").unwrap_or(-1);
        let slot = checked_index(index, baseline.consumables.count(), "consumable")?;
        let cards = ctx.int_array("cards").unwrap_or_default();
        let targets = checked_indices(&cards, baseline.hand.count(), "card")?;

        let held_before = baseline.consumables.count();
        let state_before = baseline.state;

        ctx.host.use_consumable(slot, &targets)?;
        Ok(Execution::Defer(Deferred::snapshot_when(move |host| {
            let snapshot = host.snapshot();
            snapshot.consumables.count() + 1 == held_before
                && snapshot.state == state_before
                && host.settled()
        })))
    }
}

const PACK_SELECT_SCHEMA: &Schema = &[
    ("card", optional(FieldType::Integer)),
    ("skip", optional(FieldType::Boolean)),
];

/// Picks from or skips the open booster pack.
pub struct PackSelect;

impl Endpoint for PackSelect {
    fn name(&self) -> &'static str {
        "pack_select"
    }

    fn description(&self) -> &'static str {
        "Picks a card from the open booster pack, or skips it"
    }

    fn schema(&self) -> &'static Schema {
        PACK_SELECT_SCHEMA
    }

    fn requires_state(&self) -> Option<&'static [GameState]> {
        Some(PACK_STATES)
    }

    fn execute(&self, ctx: ExecContext<'_>) -> Result<Execution, ApiError> {
        let picking = ctx.args.contains_key("card");
        let skipping = ctx.bool("skip").unwrap_or(false);
        if picking && skipping {
            return Err(ApiError::invalid_value(
                "Invalid arguments. Cannot provide both: card and skip",
            ));
        }
        if !picking && !skipping {
            return Err(ApiError::invalid_value(
                "Invalid arguments. You must provide one of: card, skip",
            ));
        }

        if picking {
            let snapshot = ctx.host.snapshot();
            let Some(pack) = snapshot.pack else {
                return Err(ApiError::game_state("No pack is open"));
            };
            let index = ctx.int("card").unwrap_or(-1);
            let Some(slot) = usize::try_from(index)
                .ok()
                .filter(|slot| *slot < pack.cards.len())
            else {
                return Err(ApiError::invalid_value(format!(
                    "Card index out of range. Index: {index}, Available cards: {}",
                    pack.cards.len()
                )));
            };
            ctx.host.pack_pick(slot)?;
        } else {
            ctx.host.pack_skip()?;
        }

        Ok(Execution::Defer(Deferred::snapshot_when(|host| {
            let snapshot = host.snapshot();
            snapshot.pack.is_none() && !snapshot.state.is_pack() && host.settled()
        })))
    }
}
