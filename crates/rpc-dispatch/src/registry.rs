//! Named factories for configured stages.
//!
//! Configuration names stages by identifier; the registry turns those
//! identifiers into stage values when the dispatcher is bootstrapped.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use crate::pipeline::Stage;

type StageFactory = Arc<dyn Fn() -> Arc<dyn Stage> + Send + Sync>;

/// Errors raised while resolving configured stage identifiers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// No factory is registered under the identifier.
    #[error("unknown stage '{name}' (known stages: {known})")]
    UnknownStage {
        /// Identifier taken from configuration.
        name: String,
        /// Comma-separated list of registered identifiers.
        known: String,
    },
}

impl RegistryError {
    /// Creates an unknown stage error listing the registered identifiers.
    pub fn unknown_stage<'a>(
        name: impl Into<String>,
        known: impl IntoIterator<Item = &'a str>,
    ) -> Self {
        let known = known.into_iter().collect::<Vec<_>>().join(", ");
        Self::UnknownStage {
            name: name.into(),
            known: if known.is_empty() {
                String::from("none")
            } else {
                known
            },
        }
    }
}

/// Explicit map from stage identifier to factory, owned by the caller.
#[derive(Clone, Default)]
pub struct StageRegistry {
    factories: BTreeMap<String, StageFactory>,
}

impl StageRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `factory` under `name`, replacing any earlier registration.
    #[must_use]
    pub fn register<F>(mut self, name: impl Into<String>, factory: F) -> Self
    where
        F: Fn() -> Arc<dyn Stage> + Send + Sync + 'static,
    {
        self.factories.insert(name.into(), Arc::new(factory));
        self
    }

    /// Registers a single shared stage instance under `name`.
    #[must_use]
    pub fn register_shared(self, name: impl Into<String>, stage: Arc<dyn Stage>) -> Self {
        self.register(name, move || Arc::clone(&stage))
    }

    /// Returns `true` when a factory exists for `name`.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Registered identifiers in lexical order.
    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.factories.keys().map(String::as_str)
    }

    /// Builds the stages named by `identifiers`, preserving their order.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::UnknownStage`] for the first identifier with
    /// no registered factory.
    pub fn resolve<S>(&self, identifiers: &[S]) -> Result<Vec<Arc<dyn Stage>>, RegistryError>
    where
        S: AsRef<str>,
    {
        identifiers
            .iter()
            .map(|identifier| {
                let name = identifier.as_ref();
                self.factories
                    .get(name)
                    .map(|factory| factory())
                    .ok_or_else(|| RegistryError::unknown_stage(name, self.names()))
            })
            .collect()
    }
}

impl fmt::Debug for StageRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StageRegistry")
            .field("stages", &self.names().collect::<Vec<_>>())
            .finish()
    }
}
