//! The action boundary between the control layer and the host game.
//!
//! The control layer reads game state exclusively through
//! [`GameHost::snapshot`] and mutates it exclusively through the fixed menu
//! of action entry points below. The host's rules engine stays in charge of
//! its own invariants: an action call is a request, and its effect settles
//! over subsequent ticks, observed by re-reading snapshots.

use thiserror::Error;

use crate::snapshot::Snapshot;
use crate::state::GameState;

/// Failure reported by a host action entry point.
#[derive(Debug, Error)]
pub enum GameError {
    /// Arguments were well-typed but reference something the game rejects
    /// (bad index, unaffordable purchase, full slots).
    #[error("{0}")]
    InvalidValue(String),
    /// The game cannot perform the action from its current situation even
    /// though the coarse state gate passed (e.g. skipping a boss blind).
    #[error("{0}")]
    InvalidState(String),
    /// The action needs an active run and none is in progress.
    #[error("{0}")]
    NotInRun(String),
    /// The host failed internally.
    #[error("{0}")]
    Internal(String),
}

impl GameError {
    /// Convenience constructor for [`GameError::InvalidValue`].
    pub fn invalid_value(message: impl Into<String>) -> Self {
        Self::InvalidValue(message.into())
    }

    /// Convenience constructor for [`GameError::InvalidState`].
    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidState(message.into())
    }

    /// Convenience constructor for [`GameError::NotInRun`].
    pub fn not_in_run(message: impl Into<String>) -> Self {
        Self::NotInRun(message.into())
    }

    /// Convenience constructor for [`GameError::Internal`].
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }
}

/// Direct state adjustments applied by the `set` debug endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tweaks {
    pub money: Option<i64>,
    pub chips: Option<u64>,
    pub ante: Option<u32>,
    pub round: Option<u32>,
    pub hands: Option<u32>,
    pub discards: Option<u32>,
    /// Restock the shop in place; only legal while the shop is open.
    pub restock_shop: bool,
}

impl Tweaks {
    /// Whether the tweak set carries no change at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Live host application as consumed by the control layer.
pub trait GameHost {
    /// Current state of the host's state machine.
    fn current_state(&self) -> GameState;

    /// Extracts a full structured snapshot of current state.
    fn snapshot(&self) -> Snapshot;

    /// Whether the host has no transition or animation in flight.
    fn settled(&self) -> bool;

    /// Starts a fresh run with the given deck, stake, and optional seed.
    fn start_run(&mut self, deck: &str, stake: &str, seed: Option<&str>) -> Result<(), GameError>;

    /// Abandons whatever is on screen and returns to the main menu.
    fn main_menu(&mut self) -> Result<(), GameError>;

    /// Enters the currently offered blind.
    fn select_blind(&mut self) -> Result<(), GameError>;

    /// Skips the currently offered blind.
    fn skip_blind(&mut self) -> Result<(), GameError>;

    /// Plays the hand cards at the given indices.
    fn play_hand(&mut self, cards: &[usize]) -> Result<(), GameError>;

    /// Discards the hand cards at the given indices.
    fn discard_cards(&mut self, cards: &[usize]) -> Result<(), GameError>;

    /// Buys the shop card at the given index.
    fn buy_card(&mut self, index: usize) -> Result<(), GameError>;

    /// Redeems the shop voucher at the given index.
    fn buy_voucher(&mut self, index: usize) -> Result<(), GameError>;

    /// Buys and opens the shop booster pack at the given index.
    fn buy_pack(&mut self, index: usize) -> Result<(), GameError>;

    /// Rerolls the shop inventory.
    fn reroll_shop(&mut self) -> Result<(), GameError>;

    /// Collects round winnings and proceeds to the shop.
    fn cash_out(&mut self) -> Result<(), GameError>;

    /// Leaves the shop for the next blind-select screen.
    fn next_round(&mut self) -> Result<(), GameError>;

    /// Uses the consumable at `index`, optionally targeting hand cards.
    fn use_consumable(&mut self, index: usize, cards: &[usize]) -> Result<(), GameError>;

    /// Picks the card at `index` from the open pack.
    fn pack_pick(&mut self, index: usize) -> Result<(), GameError>;

    /// Skips the open pack without picking.
    fn pack_skip(&mut self) -> Result<(), GameError>;

    /// Spawns a card, joker, or voucher into the run by content key.
    fn spawn_card(&mut self, key: &str) -> Result<(), GameError>;

    /// Applies direct state adjustments; debug tooling only.
    fn apply_tweaks(&mut self, tweaks: &Tweaks) -> Result<(), GameError>;

    /// Writes the current run to a save file.
    fn save_run(&mut self, path: &str) -> Result<(), GameError>;

    /// Replaces the current situation with a saved run.
    fn load_run(&mut self, path: &str) -> Result<(), GameError>;
}
