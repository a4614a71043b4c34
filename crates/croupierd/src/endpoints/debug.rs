//! Development endpoints: spawning content and tweaking run state.
//!
//! Both exist for scripted test setups, not for play; they still pass the
//! same pipeline as everything else.

use croupier_host::{GameState, RUN_STATES, Tweaks};

use crate::dispatch::{Endpoint, ExecContext, Execution, FieldType, optional, required};
use crate::protocol::ApiError;
use crate::schedule::{Deferred, snapshot_map};
use crate::validator::Schema;

const ADD_SCHEMA: &Schema = &[("key", required(FieldType::String))];

/// Where a spawned key lands, derived from its prefix.
#[derive(Clone, Copy)]
enum SpawnDestination {
    Jokers,
    Consumables,
    Vouchers,
    Hand,
}

/// Spawns a card, joker, consumable, or voucher into the run by key.
pub struct Add;

impl Endpoint for Add {
    fn name(&self) -> &'static str {
        "add"
    }

    fn description(&self) -> &'static str {
        "Spawns a card, joker, consumable, or voucher by content key"
    }

    fn schema(&self) -> &'static Schema {
        ADD_SCHEMA
    }

    fn requires_state(&self) -> Option<&'static [GameState]> {
        Some(RUN_STATES)
    }

    fn execute(&self, ctx: ExecContext<'_>) -> Result<Execution, ApiError> {
        let key = ctx.str("key").unwrap_or_default().to_owned();
        let destination = destination_for(&key).ok_or_else(|| {
            ApiError::invalid_value(format!(
                "Unknown key '{key}'. Expected a joker (j_), consumable (c_), \
                 voucher (v_), or playing card key"
            ))
        })?;

        let baseline = ctx.host.snapshot();
        let count_before = match destination {
            SpawnDestination::Jokers => baseline.jokers.count(),
            SpawnDestination::Consumables => baseline.consumables.count(),
            SpawnDestination::Vouchers => baseline.used_vouchers.len(),
            SpawnDestination::Hand => baseline.hand.count(),
        };

        ctx.host.spawn_card(&key)?;
        Ok(Execution::Defer(Deferred::snapshot_when(move |host| {
            let snapshot = host.snapshot();
            let count_now = match destination {
                SpawnDestination::Jokers => snapshot.jokers.count(),
                SpawnDestination::Consumables => snapshot.consumables.count(),
                SpawnDestination::Vouchers => snapshot.used_vouchers.len(),
                SpawnDestination::Hand => snapshot.hand.count(),
            };
            count_now == count_before + 1 && host.settled()
        })))
    }
}

fn destination_for(key: &str) -> Option<SpawnDestination> {
    if key.starts_with("j_") {
        return Some(SpawnDestination::Jokers);
    }
    if key.starts_with("c_") {
        return Some(SpawnDestination::Consumables);
    }
    if key.starts_with("v_") {
        return Some(SpawnDestination::Vouchers);
    }
    is_playing_card_key(key).then_some(SpawnDestination::Hand)
}

/// Playing card keys look like `H_A` or `S_10`: suit, underscore, rank.
fn is_playing_card_key(key: &str) -> bool {
    let Some((suit, rank)) = key.split_once('_') else {
        return false;
    };
    let suit_ok = matches!(suit, "H" | "S" | "D" | "C");
    let rank_ok = matches!(
        rank,
        "2" | "3" | "4" | "5" | "6" | "7" | "8" | "9" | "10" | "J" | "Q" | "K" | "A"
    );
    suit_ok && rank_ok
}

const SET_SCHEMA: &Schema = &[
    ("money", optional(FieldType::Integer)),
    ("chips", optional(FieldType::Integer)),
    ("ante", optional(FieldType::Integer)),
    ("round", optional(FieldType::Integer)),
    ("hands", optional(FieldType::Integer)),
    ("discards", optional(FieldType::Integer)),
    ("shop", optional(FieldType::Boolean)),
];

/// Directly adjusts run counters.
pub struct Set;

impl Endpoint for Set {
    fn name(&self) -> &'static str {
        "set"
    }

    fn description(&self) -> &'static str {
        "Directly adjusts run counters such as money, chips, or ante"
    }

    fn schema(&self) -> &'static Schema {
        SET_SCHEMA
    }

    fn execute(&self, ctx: ExecContext<'_>) -> Result<Execution, ApiError> {
        if !ctx.host.current_state().in_run() {
            return Err(ApiError::not_in_run("Can only set during an active run"));
        }

        let restock_shop = ctx.bool("shop") == Some(true);
        if restock_shop && ctx.host.current_state() != GameState::Shop {
            return Err(ApiError::game_state("Can re-stock shop only in SHOP state"));
        }

        let tweaks = Tweaks {
            money: field(&ctx, "money", "Money")?,
            chips: unsigned(field(&ctx, "chips", "Chips")?),
            ante: narrowed(field(&ctx, "ante", "Ante")?),
            round: narrowed(field(&ctx, "round", "Round")?),
            hands: narrowed(field(&ctx, "hands", "Hands")?),
            discards: narrowed(field(&ctx, "discards", "Discards")?),
            restock_shop,
        };

        if tweaks.is_empty() {
            return Err(ApiError::invalid_value("Must provide at least one field to set"));
        }

        ctx.host.apply_tweaks(&tweaks)?;
        Ok(Execution::Reply(snapshot_map(ctx.host)))
    }
}

fn field(ctx: &ExecContext<'_>, name: &str, label: &str) -> Result<Option<i64>, ApiError> {
    if !ctx.args.contains_key(name) {
        return Ok(None);
    }
    match ctx.int(name) {
        Some(value) if value >= 0 => Ok(Some(value)),
        _ => Err(ApiError::invalid_value(format!(
            "{label} must be a positive integer"
        ))),
    }
}

fn unsigned(value: Option<i64>) -> Option<u64> {
    value.and_then(|value| u64::try_from(value).ok())
}

fn narrowed(value: Option<i64>) -> Option<u32> {
    value.and_then(|value| u32::try_from(value).ok())
}
