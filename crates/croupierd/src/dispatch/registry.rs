//! The endpoint registry.
//!
//! Loaded once at startup and never mutated afterwards. Registration is
//! fail-fast: a structurally broken endpoint or a duplicate name aborts the
//! whole startup, so no partial registry is ever exposed to traffic.

use std::collections::BTreeMap;

use thiserror::Error;

use super::endpoint::Endpoint;

/// Errors raised while building the registry.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// Two endpoints claimed the same name.
    #[error("duplicate endpoint name '{0}'")]
    DuplicateName(&'static str),
    /// Name or description is empty.
    #[error("endpoint '{0}' is structurally incomplete")]
    Incomplete(&'static str),
    /// `requires_state` returned an empty set, which would gate the
    /// endpoint out of every state.
    #[error("endpoint '{0}' declares an empty state set")]
    EmptyStateSet(&'static str),
}

/// Immutable-after-load table of endpoints, keyed by name.
#[derive(Default)]
pub struct Registry {
    endpoints: BTreeMap<&'static str, Box<dyn Endpoint>>,
}

impl Registry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one endpoint, checking its structure first.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError`] for an empty name or description, an empty
    /// declared state set, or a duplicate name.
    pub fn register(&mut self, endpoint: Box<dyn Endpoint>) -> Result<(), RegistryError> {
        let name = endpoint.name();
        if name.trim().is_empty() || endpoint.description().trim().is_empty() {
            return Err(RegistryError::Incomplete(name));
        }
        if endpoint
            .requires_state()
            .is_some_and(|states| states.is_empty())
        {
            return Err(RegistryError::EmptyStateSet(name));
        }
        if self.endpoints.contains_key(name) {
            return Err(RegistryError::DuplicateName(name));
        }
        self.endpoints.insert(name, endpoint);
        Ok(())
    }

    /// Looks an endpoint up by wire method name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&dyn Endpoint> {
        self.endpoints.get(name).map(Box::as_ref)
    }

    /// Number of registered endpoints.
    #[must_use]
    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    /// Whether the registry holds no endpoints.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }

    /// Registered names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.endpoints.keys().copied()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::Map;

    use croupier_host::GameState;

    use crate::dispatch::endpoint::{ExecContext, Execution, NO_ARGS};
    use crate::protocol::ApiError;
    use crate::validator::Schema;

    use super::*;

    struct Probe {
        name: &'static str,
        description: &'static str,
        states: Option<&'static [GameState]>,
    }

    impl Endpoint for Probe {
        fn name(&self) -> &'static str {
            self.name
        }

        fn description(&self) -> &'static str {
            self.description
        }

        fn schema(&self) -> &'static Schema {
            NO_ARGS
        }

        fn requires_state(&self) -> Option<&'static [GameState]> {
            self.states
        }

        fn execute(&self, _ctx: ExecContext<'_>) -> Result<Execution, ApiError> {
            Ok(Execution::Reply(Map::new()))
        }
    }

    fn probe(name: &'static str) -> Box<Probe> {
        Box::new(Probe {
            name,
            description: "probe endpoint",
            states: None,
        })
    }

    #[test]
    fn registers_and_resolves_by_name() {
        let mut registry = Registry::new();
        registry.register(probe("alpha")).expect("register alpha");
        registry.register(probe("beta")).expect("register beta");
        assert_eq!(registry.len(), 2);
        assert!(registry.get("alpha").is_some());
        assert!(registry.get("gamma").is_none());
    }

    #[test]
    fn duplicate_name_aborts_registration() {
        let mut registry = Registry::new();
        registry.register(probe("alpha")).expect("first wins");
        let error = registry.register(probe("alpha")).expect_err("duplicate");
        assert!(matches!(error, RegistryError::DuplicateName("alpha")));
    }

    #[test]
    fn empty_name_is_structurally_incomplete() {
        let mut registry = Registry::new();
        let error = registry.register(probe("")).expect_err("empty name");
        assert!(matches!(error, RegistryError::Incomplete(_)));
    }

    #[test]
    fn empty_state_set_is_rejected() {
        let mut registry = Registry::new();
        let error = registry
            .register(Box::new(Probe {
                name: "gated",
                description: "gated probe",
                states: Some(&[]),
            }))
            .expect_err("empty state set");
        assert!(matches!(error, RegistryError::EmptyStateSet("gated")));
    }
}
