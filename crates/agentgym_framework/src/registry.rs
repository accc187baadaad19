//! Scenario registry.
//!
//! An explicit object rather than a process-wide table: the session manager is
//! handed one at construction and tests can build isolated registries. Entries
//! are inserted whole through the map's entry API, so concurrent readers never
//! see a half-registered scenario.
//!
//! Names are keyed by [`normalize_scenario_name`], the same canonical form a
//! validated [`TrainingConfig`](agentgym_types::config::TrainingConfig) carries,
//! so anything registered here can be reached from a session config.

use agentgym_scenarios::builtin_scenarios;
use agentgym_scenarios::templates::base_scenario::{Difficulty, Scenario};
use agentgym_types::config::{ConfigError, normalize_scenario_name};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::sync::Arc;
use thiserror::Error;

pub type ScenarioFactory = Arc<dyn Fn() -> Box<dyn Scenario> + Send + Sync>;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum RegistryError {
    #[error("Scenario '{name}' not found. Available scenarios: {}", .available.join(", "))]
    ScenarioNotFound { name: String, available: Vec<String> },
    #[error("Scenario '{0}' is already registered")]
    AlreadyRegistered(String),
    #[error("Invalid scenario name '{name}': {source}")]
    InvalidName {
        name: String,
        #[source]
        source: ConfigError,
    },
}

fn canonical_name(name: &str) -> Result<String, RegistryError> {
    normalize_scenario_name(name).map_err(|source| RegistryError::InvalidName {
        name: name.to_string(),
        source,
    })
}

/// Listing entry for a registered scenario.
#[derive(Debug, Clone, PartialEq)]
pub struct ScenarioMetadata {
    pub name: String,
    pub description: String,
    pub difficulty: Difficulty,
}

struct RegistryEntry {
    factory: ScenarioFactory,
    metadata: ScenarioMetadata,
}

#[derive(Default)]
pub struct ScenarioRegistry {
    entries: DashMap<String, RegistryEntry>,
}

impl ScenarioRegistry {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    /// A registry holding `customer_support`, `code_review` and `data_analysis`.
    pub fn with_builtins() -> Self {
        let registry = Self::new();
        for (name, construct) in builtin_scenarios() {
            if let Err(e) = registry.register(name, construct) {
                log::warn!("[ScenarioRegistry] Skipping built-in scenario: {}", e);
            }
        }
        registry
    }

    /// Registers `factory` under the canonical form of `name`. The factory is
    /// called once up front to capture the scenario's metadata.
    pub fn register<F>(&self, name: &str, factory: F) -> Result<(), RegistryError>
    where
        F: Fn() -> Box<dyn Scenario> + Send + Sync + 'static,
    {
        let name = canonical_name(name)?;
        match self.entries.entry(name.clone()) {
            Entry::Occupied(_) => Err(RegistryError::AlreadyRegistered(name)),
            Entry::Vacant(slot) => {
                let sample = factory();
                let metadata = ScenarioMetadata {
                    name: name.clone(),
                    description: sample.description().to_string(),
                    difficulty: sample.difficulty(),
                };
                slot.insert(RegistryEntry {
                    factory: Arc::new(factory),
                    metadata,
                });
                log::debug!("[ScenarioRegistry] Registered scenario '{}'", name);
                Ok(())
            }
        }
    }

    /// A fresh scenario instance built by the registered factory.
    pub fn load(&self, name: &str) -> Result<Arc<dyn Scenario>, RegistryError> {
        let name = canonical_name(name)?;
        // Clone the factory out so no shard lock is held while it runs.
        let factory = self
            .entries
            .get(&name)
            .map(|entry| entry.factory.clone())
            .ok_or_else(|| RegistryError::ScenarioNotFound {
                available: self.names(),
                name,
            })?;
        Ok(Arc::from(factory()))
    }

    /// Metadata of every registered scenario, ordered by name.
    pub fn list(&self) -> Vec<ScenarioMetadata> {
        let mut listed: Vec<ScenarioMetadata> = self
            .entries
            .iter()
            .map(|entry| entry.value().metadata.clone())
            .collect();
        listed.sort_by(|a, b| a.name.cmp(&b.name));
        listed
    }

    pub fn names(&self) -> Vec<String> {
        self.list().into_iter().map(|m| m.name).collect()
    }

    pub fn is_registered(&self, name: &str) -> bool {
        canonical_name(name).is_ok_and(|name| self.entries.contains_key(&name))
    }

    /// Returns whether something was removed.
    pub fn unregister(&self, name: &str) -> bool {
        canonical_name(name).is_ok_and(|name| self.entries.remove(&name).is_some())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
