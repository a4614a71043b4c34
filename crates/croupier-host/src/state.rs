//! Host application states and the code/name lookup.
//!
//! The host exposes its state machine as numeric codes; the control layer
//! needs both directions: codes for membership checks and names for error
//! messages. The reverse lookup is built lazily on first use and cached for
//! the lifetime of the process.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoEnumIterator};

/// States of the host game's own state machine.
///
/// Discriminants mirror the host's numeric state codes; gaps are states the
/// control layer never observes (tutorial and demo screens).
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[repr(u8)]
pub enum GameState {
    SelectingHand = 1,
    HandPlayed = 2,
    DrawToHand = 3,
    GameOver = 4,
    Shop = 5,
    PlayTarot = 6,
    BlindSelect = 7,
    RoundEval = 8,
    TarotPack = 9,
    PlanetPack = 10,
    Menu = 11,
    Splash = 13,
    SpectralPack = 15,
    StandardPack = 17,
    BuffoonPack = 18,
    NewRound = 19,
}

static STATE_BY_CODE: Lazy<HashMap<u8, GameState>> =
    Lazy::new(|| GameState::iter().map(|state| (state.code(), state)).collect());

impl GameState {
    /// The host's numeric code for this state.
    #[must_use]
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Translates a numeric state code back to a state, if known.
    #[must_use]
    pub fn from_code(code: u8) -> Option<Self> {
        STATE_BY_CODE.get(&code).copied()
    }

    /// Whether a pack-opening overlay owns the screen in this state.
    #[must_use]
    pub fn is_pack(self) -> bool {
        PACK_STATES.contains(&self)
    }

    /// Whether a run is active in this state.
    #[must_use]
    pub fn in_run(self) -> bool {
        !matches!(self, Self::Menu | Self::Splash | Self::GameOver)
    }
}

/// States in which a booster pack is open and awaiting a pick or skip.
pub const PACK_STATES: &[GameState] = &[
    GameState::TarotPack,
    GameState::PlanetPack,
    GameState::SpectralPack,
    GameState::StandardPack,
    GameState::BuffoonPack,
];

/// States in which a run is active and run-scoped commands may execute.
pub const RUN_STATES: &[GameState] = &[
    GameState::SelectingHand,
    GameState::Shop,
    GameState::BlindSelect,
    GameState::RoundEval,
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_round_trip() {
        for state in GameState::iter() {
            assert_eq!(GameState::from_code(state.code()), Some(state));
        }
    }

    #[test]
    fn unknown_code_is_none() {
        assert_eq!(GameState::from_code(0), None);
        assert_eq!(GameState::from_code(99), None);
    }

    #[test]
    fn names_use_screaming_snake_case() {
        assert_eq!(GameState::SelectingHand.to_string(), "SELECTING_HAND");
        assert_eq!(GameState::BlindSelect.to_string(), "BLIND_SELECT");
    }

    #[test]
    fn pack_states_are_packs() {
        for state in PACK_STATES {
            assert!(state.is_pack());
        }
        assert!(!GameState::Shop.is_pack());
    }

    #[test]
    fn menu_is_not_in_run() {
        assert!(!GameState::Menu.in_run());
        assert!(GameState::Shop.in_run());
    }
}
