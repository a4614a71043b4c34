//! The endpoint table.
//!
//! One module per command family; [`standard_registry`] assembles the full
//! table at startup. Handler-level messages follow the wording the game's
//! own checks produce, so scripted clients can match on them.

mod blinds;
mod consumables;
mod debug;
mod round;
mod run;
mod shop;
mod status;

use crate::dispatch::{Endpoint, Registry, RegistryError};
use crate::protocol::ApiError;

pub use status::{Gamestate, Health};

/// Builds the registry holding every standard endpoint.
///
/// # Errors
///
/// Returns [`RegistryError`] when the table is structurally broken; startup
/// must abort rather than expose a partial registry.
pub fn standard_registry() -> Result<Registry, RegistryError> {
    let mut registry = Registry::new();
    for endpoint in catalogue() {
        registry.register(endpoint)?;
    }
    Ok(registry)
}

fn catalogue() -> Vec<Box<dyn Endpoint>> {
    vec![
        Box::new(status::Health),
        Box::new(status::Gamestate),
        Box::new(run::Menu),
        Box::new(run::Start),
        Box::new(run::Save),
        Box::new(run::Load),
        Box::new(blinds::Select),
        Box::new(blinds::Skip),
        Box::new(round::Play),
        Box::new(round::Discard),
        Box::new(round::CashOut),
        Box::new(round::NextRound),
        Box::new(shop::Buy),
        Box::new(shop::Reroll),
        Box::new(consumables::Use),
        Box::new(consumables::PackSelect),
        Box::new(debug::Add),
        Box::new(debug::Set),
    ]
}

/// Bounds-checks a list of wire indices against an available count.
pub(crate) fn checked_indices(
    values: &[i64],
    available: usize,
    label: &str,
) -> Result<Vec<usize>, ApiError> {
    let mut indices = Vec::with_capacity(values.len());
    for value in values {
        indices.push(checked_index(*value, available, label)?);
    }
    Ok(indices)
}

/// Bounds-checks one wire index against an available count.
pub(crate) fn checked_index(
    value: i64,
    available: usize,
    label: &str,
) -> Result<usize, ApiError> {
    usize::try_from(value)
        .ok()
        .filter(|index| *index < available)
        .ok_or_else(|| ApiError::invalid_value(format!("Invalid {label} index: {value}")))
}
