//! Flattened view of live game state.
//!
//! The host's own objects never cross the boundary; every observation the
//! control layer makes happens through this snapshot, re-extracted on demand.
//! Clients are expected to treat each response carrying a snapshot as a full
//! state refresh, so the snapshot serialises whole, never as a diff.

use serde::{Deserialize, Serialize};
use strum::Display;

use crate::state::GameState;

/// Category a card belongs to; drives slot accounting on purchase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum CardSet {
    Joker,
    Tarot,
    Planet,
    Spectral,
    Playing,
    Voucher,
    Booster,
}

impl CardSet {
    /// Whether cards of this set occupy a consumable slot.
    #[must_use]
    pub fn is_consumable(self) -> bool {
        matches!(self, Self::Tarot | Self::Planet | Self::Spectral)
    }
}

/// One card as the control layer sees it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CardInfo {
    /// Host-unique element id, stable for the card's lifetime.
    pub id: u64,
    /// Content key, e.g. `j_joker` or `c_fool`.
    pub key: String,
    /// Display label.
    pub label: String,
    /// Set the card belongs to.
    pub set: CardSet,
    /// Purchase cost where the card is for sale, otherwise zero.
    pub cost: i64,
}

/// A card collection with its slot limit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CardArea {
    pub cards: Vec<CardInfo>,
    pub limit: usize,
}

impl CardArea {
    /// Number of cards currently held.
    #[must_use]
    pub fn count(&self) -> usize {
        self.cards.len()
    }

    /// Whether the area has no free slot left.
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.cards.len() >= self.limit
    }
}

/// Shop inventory, present only while the shop screen is open.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ShopArea {
    pub cards: Vec<CardInfo>,
    pub vouchers: Vec<CardInfo>,
    pub packs: Vec<CardInfo>,
    pub reroll_cost: i64,
}

/// Scoring totals for the round in progress.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RoundStatus {
    pub chips: u64,
    pub chips_target: u64,
    pub hands_left: u32,
    pub discards_left: u32,
}

/// Progress of one blind within the current ante.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum BlindStatus {
    Upcoming,
    Current,
    Defeated,
    Skipped,
}

/// The three blinds of the current ante.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Blinds {
    pub small: BlindStatus,
    pub big: BlindStatus,
    pub boss: BlindStatus,
}

impl Default for Blinds {
    fn default() -> Self {
        Self {
            small: BlindStatus::Upcoming,
            big: BlindStatus::Upcoming,
            boss: BlindStatus::Upcoming,
        }
    }
}

impl Blinds {
    /// The blind the player faces next, in ante order.
    #[must_use]
    pub fn upcoming_is_boss(&self) -> bool {
        self.small != BlindStatus::Upcoming
            && self.small != BlindStatus::Current
            && self.big != BlindStatus::Upcoming
            && self.big != BlindStatus::Current
    }
}

/// An open booster pack awaiting a pick or skip.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PackArea {
    pub cards: Vec<CardInfo>,
    /// How many picks the pack grants.
    pub choices: u32,
}

/// Full structured snapshot of current application state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub state: GameState,
    pub money: i64,
    pub ante_num: u32,
    pub round_num: u32,
    pub deck: String,
    pub stake: String,
    pub seed: String,
    pub won: bool,
    pub hand: CardArea,
    pub jokers: CardArea,
    pub consumables: CardArea,
    pub round: RoundStatus,
    pub blinds: Blinds,
    pub shop: Option<ShopArea>,
    pub pack: Option<PackArea>,
    pub used_vouchers: Vec<String>,
}

impl Snapshot {
    /// A snapshot for states where no run is active.
    #[must_use]
    pub fn out_of_run(state: GameState) -> Self {
        Self {
            state,
            money: 0,
            ante_num: 0,
            round_num: 0,
            deck: String::new(),
            stake: String::new(),
            seed: String::new(),
            won: false,
            hand: CardArea::default(),
            jokers: CardArea::default(),
            consumables: CardArea::default(),
            round: RoundStatus::default(),
            blinds: Blinds::default(),
            shop: None,
            pack: None,
            used_vouchers: Vec::new(),
        }
    }
}
