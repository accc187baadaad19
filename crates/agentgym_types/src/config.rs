//! Training configuration for a single session.
//!
//! A [`TrainingConfig`] is created once, validated once at the session manager
//! boundary, and never mutated afterwards. Anything that fails [`TrainingConfig::validate`]
//! never produces a session.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use thiserror::Error;

pub const DEFAULT_EPISODES: u64 = 10_000;
pub const DEFAULT_LEARNING_RATE: f64 = 3e-4;
pub const DEFAULT_DISCOUNT_FACTOR: f64 = 0.95;
pub const DEFAULT_BATCH_SIZE: u32 = 64;
pub const DEFAULT_MAX_STEPS_PER_EPISODE: u32 = 100;
pub const DEFAULT_CHECKPOINT_INTERVAL: u64 = 1_000;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    #[error("Scenario name must not be empty")]
    EmptyScenario,
    #[error("Scenario name must contain only alphanumeric characters, underscores, and hyphens: {0}")]
    InvalidScenarioName(String),
    #[error("Episode count must be greater than zero")]
    InvalidEpisodes,
    #[error("Learning rate must be a positive finite number, got {0}")]
    InvalidLearningRate(f64),
    #[error("Discount factor must lie strictly between 0 and 1, got {0}")]
    InvalidDiscountFactor(f64),
    #[error("Batch size must be greater than zero")]
    InvalidBatchSize,
    #[error("Max steps per episode must be greater than zero")]
    InvalidMaxSteps,
    #[error("Failed to parse training config: {0}")]
    Parse(String),
    #[error("Failed to read training config: {0}")]
    Io(String),
}

/// Canonical form of a scenario name: trimmed and lower-cased, made of ASCII
/// alphanumerics, underscores and hyphens. Registries and configs both key
/// scenarios by this form.
pub fn normalize_scenario_name(name: &str) -> Result<String, ConfigError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ConfigError::EmptyScenario);
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return Err(ConfigError::InvalidScenarioName(name.to_string()));
    }
    Ok(name.to_ascii_lowercase())
}

/// Agent framework a session is tagged with. Metadata only: the core never
/// depends on adapter types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Framework {
    #[default]
    LangChain,
    AutoGen,
    CrewAI,
}

impl Framework {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "langchain" => Some(Self::LangChain),
            "autogen" => Some(Self::AutoGen),
            "crewai" => Some(Self::CrewAI),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::LangChain => "langchain",
            Self::AutoGen => "autogen",
            Self::CrewAI => "crewai",
        }
    }
}

impl fmt::Display for Framework {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn default_framework() -> Framework {
    Framework::default()
}
fn default_episodes() -> u64 {
    DEFAULT_EPISODES
}
fn default_learning_rate() -> f64 {
    DEFAULT_LEARNING_RATE
}
fn default_discount_factor() -> f64 {
    DEFAULT_DISCOUNT_FACTOR
}
fn default_batch_size() -> u32 {
    DEFAULT_BATCH_SIZE
}
fn default_max_steps() -> u32 {
    DEFAULT_MAX_STEPS_PER_EPISODE
}
fn default_checkpoint_interval() -> u64 {
    DEFAULT_CHECKPOINT_INTERVAL
}

/// Configuration for one training session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingConfig {
    pub scenario: String,
    #[serde(default = "default_framework")]
    pub framework: Framework,
    #[serde(default = "default_episodes")]
    pub episodes: u64,
    #[serde(default = "default_learning_rate")]
    pub learning_rate: f64,
    #[serde(default = "default_discount_factor")]
    pub discount_factor: f64,
    #[serde(default = "default_batch_size")]
    pub batch_size: u32,
    #[serde(default = "default_max_steps")]
    pub max_steps_per_episode: u32,
    #[serde(default = "default_checkpoint_interval")]
    pub checkpoint_interval: u64,
    #[serde(default)]
    pub seed: Option<u64>,
}

impl TrainingConfig {
    /// Config for `scenario` with every other field at its default.
    pub fn new(scenario: impl Into<String>) -> Self {
        Self {
            scenario: scenario.into(),
            framework: default_framework(),
            episodes: DEFAULT_EPISODES,
            learning_rate: DEFAULT_LEARNING_RATE,
            discount_factor: DEFAULT_DISCOUNT_FACTOR,
            batch_size: DEFAULT_BATCH_SIZE,
            max_steps_per_episode: DEFAULT_MAX_STEPS_PER_EPISODE,
            checkpoint_interval: DEFAULT_CHECKPOINT_INTERVAL,
            seed: None,
        }
    }

    pub fn builder(scenario: impl Into<String>) -> TrainingConfigBuilder {
        TrainingConfigBuilder::new(scenario)
    }

    /// Checks every field bound and returns the normalized config (scenario
    /// name lower-cased). This is the single validation boundary.
    pub fn validate(&self) -> Result<TrainingConfig, ConfigError> {
        let scenario = normalize_scenario_name(&self.scenario)?;
        if self.episodes == 0 {
            return Err(ConfigError::InvalidEpisodes);
        }
        if !(self.learning_rate.is_finite() && self.learning_rate > 0.0) {
            return Err(ConfigError::InvalidLearningRate(self.learning_rate));
        }
        if !(self.discount_factor > 0.0 && self.discount_factor < 1.0) {
            return Err(ConfigError::InvalidDiscountFactor(self.discount_factor));
        }
        if self.batch_size == 0 {
            return Err(ConfigError::InvalidBatchSize);
        }
        if self.max_steps_per_episode == 0 {
            return Err(ConfigError::InvalidMaxSteps);
        }

        let mut normalized = self.clone();
        normalized.scenario = scenario;
        Ok(normalized)
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        serde_json::to_string_pretty(self).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(format!("{}: {}", path.display(), e)))?;
        Self::from_json(&contents)
    }
}

/// Builder for [`TrainingConfig`]; unset fields keep their defaults.
#[derive(Debug, Clone)]
pub struct TrainingConfigBuilder {
    config: TrainingConfig,
}

impl TrainingConfigBuilder {
    pub fn new(scenario: impl Into<String>) -> Self {
        Self {
            config: TrainingConfig::new(scenario),
        }
    }

    pub fn framework(mut self, framework: Framework) -> Self {
        self.config.framework = framework;
        self
    }

    pub fn episodes(mut self, episodes: u64) -> Self {
        self.config.episodes = episodes;
        self
    }

    pub fn learning_rate(mut self, learning_rate: f64) -> Self {
        self.config.learning_rate = learning_rate;
        self
    }

    pub fn discount_factor(mut self, discount_factor: f64) -> Self {
        self.config.discount_factor = discount_factor;
        self
    }

    pub fn batch_size(mut self, batch_size: u32) -> Self {
        self.config.batch_size = batch_size;
        self
    }

    pub fn max_steps_per_episode(mut self, max_steps: u32) -> Self {
        self.config.max_steps_per_episode = max_steps;
        self
    }

    pub fn checkpoint_interval(mut self, interval: u64) -> Self {
        self.config.checkpoint_interval = interval;
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.config.seed = Some(seed);
        self
    }

    /// Builds and validates in one step.
    pub fn build(self) -> Result<TrainingConfig, ConfigError> {
        self.config.validate()
    }

    /// Returns the config without validating it.
    pub fn build_unchecked(self) -> TrainingConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = TrainingConfig::new("customer_support");
        assert_eq!(config.episodes, 10_000);
        assert_eq!(config.framework, Framework::LangChain);
        assert_eq!(config.checkpoint_interval, 1_000);
        assert!(config.seed.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn scenario_name_is_normalized() {
        let config = TrainingConfig::new("Customer_Support").validate().unwrap();
        assert_eq!(config.scenario, "customer_support");
    }

    #[test]
    fn scenario_names_share_one_canonical_form() {
        assert_eq!(normalize_scenario_name("  Code-Review ").unwrap(), "code-review");
        assert_eq!(normalize_scenario_name(" "), Err(ConfigError::EmptyScenario));
        assert_eq!(
            normalize_scenario_name("a.b"),
            Err(ConfigError::InvalidScenarioName("a.b".to_string()))
        );
    }

    #[test]
    fn invalid_fields_are_rejected() {
        let cases: Vec<(TrainingConfig, ConfigError)> = vec![
            (TrainingConfig::new(""), ConfigError::EmptyScenario),
            (
                TrainingConfig::new("bad name!"),
                ConfigError::InvalidScenarioName("bad name!".to_string()),
            ),
            (
                TrainingConfig::builder("x").episodes(0).build_unchecked(),
                ConfigError::InvalidEpisodes,
            ),
            (
                TrainingConfig::builder("x").learning_rate(0.0).build_unchecked(),
                ConfigError::InvalidLearningRate(0.0),
            ),
            (
                TrainingConfig::builder("x").discount_factor(1.0).build_unchecked(),
                ConfigError::InvalidDiscountFactor(1.0),
            ),
            (
                TrainingConfig::builder("x").discount_factor(0.0).build_unchecked(),
                ConfigError::InvalidDiscountFactor(0.0),
            ),
            (
                TrainingConfig::builder("x").batch_size(0).build_unchecked(),
                ConfigError::InvalidBatchSize,
            ),
            (
                TrainingConfig::builder("x").max_steps_per_episode(0).build_unchecked(),
                ConfigError::InvalidMaxSteps,
            ),
        ];

        for (config, expected) in cases {
            assert_eq!(config.validate().unwrap_err(), expected);
        }
    }

    #[test]
    fn nan_learning_rate_is_rejected() {
        let config = TrainingConfig::builder("x").learning_rate(f64::NAN).build_unchecked();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidLearningRate(_))
        ));
    }

    #[test]
    fn json_fills_missing_fields_with_defaults() {
        let config = TrainingConfig::from_json(r#"{"scenario": "code_review", "episodes": 5000}"#)
            .unwrap();
        assert_eq!(config.episodes, 5000);
        assert_eq!(config.learning_rate, DEFAULT_LEARNING_RATE);
        assert_eq!(config.framework, Framework::LangChain);

        let framework = TrainingConfig::from_json(r#"{"scenario": "x", "framework": "crewai"}"#)
            .unwrap()
            .framework;
        assert_eq!(framework, Framework::CrewAI);
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        assert!(matches!(
            TrainingConfig::from_json("{not json"),
            Err(ConfigError::Parse(_))
        ));
    }
}
