//! Playing a round: hands, discards, and moving between round and shop.
//!
//! These handlers are the canonical deferred-completion users: they snapshot
//! their baselines before invoking the action, then wait for every expected
//! delta to hold in the same tick so a half-settled state is never reported.

use croupier_host::GameState;

use crate::dispatch::{Endpoint, ExecContext, Execution, FieldType, NO_ARGS, required};
use crate::protocol::ApiError;
use crate::schedule::Deferred;
use crate::validator::Schema;

use super::checked_indices;

const CARDS_SCHEMA: &Schema = &[("cards", required(FieldType::Array).items(FieldType::Integer))];

/// Most cards one play may contain.
const MAX_PLAYED_CARDS: usize = 5;

/// Plays cards from the hand.
pub struct Play;

impl Endpoint for Play {
    fn name(&self) -> &'static str {
        "play"
    }

    fn description(&self) -> &'static str {
        "Plays the given hand cards"
    }

    fn schema(&self) -> &'static Schema {
        CARDS_SCHEMA
    }

    fn requires_state(&self) -> Option<&'static [GameState]> {
        Some(&[GameState::SelectingHand])
    }

    fn execute(&self, ctx: ExecContext<'_>) -> Result<Execution, ApiError> {
        let cards = ctx.int_array("cards").unwrap_or_default();
        if cards.is_empty() {
            return Err(ApiError::invalid_value("Must provide at least one card to play"));
        }
        if cards.len() > MAX_PLAYED_CARDS {
            return Err(ApiError::invalid_value(format!(
                "You can only play {MAX_PLAYED_CARDS} cards"
            )));
        }

        let baseline = ctx.host.snapshot();
        let indices = checked_indices(&cards, baseline.hand.count(), "card")?;
        let hands_before = baseline.round.hands_left;
        let hand_count = baseline.hand.count();

        ctx.host.play_hand(&indices)?;
        Ok(Execution::Defer(Deferred::snapshot_when(move |host| {
            let snapshot = host.snapshot();
            match snapshot.state {
                // The round resolved one way or the other; report once the
                // transition has finished animating.
                GameState::RoundEval | GameState::GameOver => host.settled(),
                // Still in the round: the hand counter moved by exactly one
                // and the hand has been redrawn to its previous size.
                GameState::SelectingHand => {
                    snapshot.round.hands_left + 1 == hands_before
                        && snapshot.hand.count() == hand_count
                        && host.settled()
                }
                _ => false,
            }
        })))
    }
}

/// Discards cards from the hand.
pub struct Discard;

impl Endpoint for Discard {
    fn name(&self) -> &'static str {
        "discard"
    }

    fn description(&self) -> &'static str {
        "Discards the given hand cards"
    }

    fn schema(&self) -> &'static Schema {
        CARDS_SCHEMA
    }

    fn requires_state(&self) -> Option<&'static [GameState]> {
        Some(&[GameState::SelectingHand])
    }

    fn execute(&self, ctx: ExecContext<'_>) -> Result<Execution, ApiError> {
        let cards = ctx.int_array("cards").unwrap_or_default();
        if cards.is_empty() {
            return Err(ApiError::invalid_value(
                "Must provide at least one card to discard",
            ));
        }

        let baseline = ctx.host.snapshot();
        if baseline.round.discards_left == 0 {
            return Err(ApiError::game_state("No discards remaining this round"));
        }
        let indices = checked_indices(&cards, baseline.hand.count(), "card")?;
        let discards_before = baseline.round.discards_left;
        let hand_count = baseline.hand.count();

        ctx.host.discard_cards(&indices)?;
        Ok(Execution::Defer(Deferred::snapshot_when(move |host| {
            let snapshot = host.snapshot();
            snapshot.state == GameState::SelectingHand
                && snapshot.round.discards_left + 1 == discards_before
                && snapshot.hand.count() == hand_count
                && host.settled()
        })))
    }
}

/// Collects round winnings.
pub struct CashOut;

impl Endpoint for CashOut {
    fn name(&self) -> &'static str {
        "cash_out"
    }

    fn description(&self) -> &'static str {
        "Collects round winnings and proceeds to the shop"
    }

    fn schema(&self) -> &'static Schema {
        NO_ARGS
    }

    fn requires_state(&self) -> Option<&'static [GameState]> {
        Some(&[GameState::RoundEval])
    }

    fn execute(&self, ctx: ExecContext<'_>) -> Result<Execution, ApiError> {
        ctx.host.cash_out()?;
        Ok(Execution::Defer(Deferred::snapshot_when(|host| {
            host.current_state() == GameState::Shop && host.settled()
        })))
    }
}

/// Leaves the shop for the next blind.
pub struct NextRound;

impl Endpoint for NextRound {
    fn name(&self) -> &'static str {
        "next_round"
    }

    fn description(&self) -> &'static str {
        "Leaves the shop for the next blind-select screen"
    }

    fn schema(&self) -> &'static Schema {
        NO_ARGS
    }

    fn requires_state(&self) -> Option<&'static [GameState]> {
        Some(&[GameState::Shop])
    }

    fn execute(&self, ctx: ExecContext<'_>) -> Result<Execution, ApiError> {
        ctx.host.next_round()?;
        Ok(Execution::Defer(Deferred::snapshot_when(|host| {
            host.current_state() == GameState::BlindSelect && host.settled()
        })))
    }
}
