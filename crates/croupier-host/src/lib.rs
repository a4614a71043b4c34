//! Boundary types between the croupier control layer and the host game.
//!
//! The game's rules and rendering engine is an external collaborator; this
//! crate defines the only three things the control layer may know about it:
//! the state machine ([`GameState`]), the observable surface ([`Snapshot`]),
//! and the action entry points ([`GameHost`]).

mod actions;
mod snapshot;
mod state;

pub use actions::{GameError, GameHost, Tweaks};
pub use snapshot::{
    BlindStatus, Blinds, CardArea, CardInfo, CardSet, PackArea, RoundStatus, ShopArea, Snapshot,
};
pub use state::{GameState, PACK_STATES, RUN_STATES};
