use agentgym_types::config::{
    DEFAULT_BATCH_SIZE, DEFAULT_CHECKPOINT_INTERVAL, DEFAULT_DISCOUNT_FACTOR, DEFAULT_EPISODES,
    DEFAULT_LEARNING_RATE, DEFAULT_MAX_STEPS_PER_EPISODE, Framework, TrainingConfig,
};
use log::LevelFilter;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[macro_use]
pub mod framework_config_macros {
    /// Resolves config json file between argument and default value.
    #[macro_export]
    macro_rules! resolve_framework_config_json_path {
        ($path: expr) => {
            match $path {
                Some(p) => $crate::get_or_create_framework_config_json_path!(p.clone()),
                None => $crate::utilities::configuration::DEFAULT_FRAMEWORK_CONFIG_PATH.clone(),
            }
        };
    }

    /// Returns the path if the file exists, otherwise writes the default
    /// config there first. `None` if the file could not be created.
    #[macro_export]
    macro_rules! get_or_create_framework_config_json_path {
        ($path: expr) => {{
            let path: std::path::PathBuf = $path;
            if path.exists() {
                log::debug!("[FrameworkConfigLoader] Found config at {:?}", path);
                Some(path)
            } else {
                match std::fs::write(
                    &path,
                    $crate::utilities::configuration::DEFAULT_FRAMEWORK_CONFIG_CONTENT,
                ) {
                    Ok(_) => {
                        log::info!("[FrameworkConfigLoader] Created new config at {:?}", path);
                        Some(path)
                    }
                    Err(e) => {
                        log::warn!(
                            "[FrameworkConfigLoader] Failed to create config file {:?}: {}",
                            path,
                            e
                        );
                        None
                    }
                }
            }
        }};
    }
}

pub const DEFAULT_CONFIG_FILE_NAME: &str = "agentgym_config.json";

/// The default configuration file path, resolved lazily. Retrieved from, or
/// created in, the current working directory.
pub static DEFAULT_FRAMEWORK_CONFIG_PATH: Lazy<Option<PathBuf>> = Lazy::new(|| {
    crate::get_or_create_framework_config_json_path!(PathBuf::from(DEFAULT_CONFIG_FILE_NAME))
});

pub const DEFAULT_FRAMEWORK_CONFIG_CONTENT: &str = r#"{
    "session_defaults": {
        "framework": "langchain",
        "episodes": 10000,
        "learning_rate": 0.0003,
        "discount_factor": 0.95,
        "batch_size": 64,
        "max_steps_per_episode": 100,
        "checkpoint_interval": 1000
    },
    "metrics": {
        "rolling_window": 100,
        "convergence_epsilon": 0.01,
        "min_convergence_window": 10,
        "max_history": 64
    },
    "result_output": {
        "enabled": true,
        "directory": "results"
    },
    "logging": {
        "level": "info",
        "file": null
    }
}"#;

pub const DEFAULT_ROLLING_WINDOW: usize = 100;
pub const DEFAULT_CONVERGENCE_EPSILON: f64 = 0.01;
pub const DEFAULT_MIN_CONVERGENCE_WINDOW: u64 = 10;
pub const DEFAULT_MAX_HISTORY: usize = 64;

/// Values applied to a session config when the caller leaves them out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionDefaultsParams {
    pub framework: Framework,
    pub episodes: u64,
    pub learning_rate: f64,
    pub discount_factor: f64,
    pub batch_size: u32,
    pub max_steps_per_episode: u32,
    pub checkpoint_interval: u64,
}

impl Default for SessionDefaultsParams {
    fn default() -> Self {
        Self {
            framework: Framework::default(),
            episodes: DEFAULT_EPISODES,
            learning_rate: DEFAULT_LEARNING_RATE,
            discount_factor: DEFAULT_DISCOUNT_FACTOR,
            batch_size: DEFAULT_BATCH_SIZE,
            max_steps_per_episode: DEFAULT_MAX_STEPS_PER_EPISODE,
            checkpoint_interval: DEFAULT_CHECKPOINT_INTERVAL,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsParams {
    /// Episodes the rolling statistics are computed over.
    pub rolling_window: usize,
    pub convergence_epsilon: f64,
    /// Lower bound of the convergence window.
    pub min_convergence_window: u64,
    /// Checkpoint snapshots kept for the result's metrics history.
    pub max_history: usize,
}

impl Default for MetricsParams {
    fn default() -> Self {
        Self {
            rolling_window: DEFAULT_ROLLING_WINDOW,
            convergence_epsilon: DEFAULT_CONVERGENCE_EPSILON,
            min_convergence_window: DEFAULT_MIN_CONVERGENCE_WINDOW,
            max_history: DEFAULT_MAX_HISTORY,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResultOutputParams {
    pub enabled: bool,
    pub directory: PathBuf,
}

impl Default for ResultOutputParams {
    fn default() -> Self {
        Self {
            enabled: true,
            directory: PathBuf::from("results"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingParams {
    pub level: String,
    pub file: Option<PathBuf>,
}

impl Default for LoggingParams {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
        }
    }
}

impl LoggingParams {
    /// Unknown level names fall back to `Info`.
    pub fn level_filter(&self) -> LevelFilter {
        self.level.parse().unwrap_or(LevelFilter::Info)
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FrameworkConfigLoader {
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
    pub session_defaults: SessionDefaultsParams,
    pub metrics: MetricsParams,
    pub result_output: ResultOutputParams,
    pub logging: LoggingParams,
}

impl FrameworkConfigLoader {
    /// Loads from `config_path`, or from the default path when `None`. Falls
    /// back to built-in defaults if no file can be resolved.
    pub fn new_config(config_path: Option<PathBuf>) -> Self {
        match crate::resolve_framework_config_json_path!(config_path.as_ref()) {
            Some(path) => Self::load_config(&path),
            None => {
                log::warn!("[FrameworkConfigLoader] No config file available, using defaults");
                Self::default()
            }
        }
    }

    /// Reads and parses `config_path`. A missing or malformed file yields the
    /// defaults with a warning.
    pub fn load_config(config_path: &Path) -> Self {
        let mut loader = match std::fs::read_to_string(config_path) {
            Ok(contents) => Self::from_json(&contents).unwrap_or_else(|e| {
                log::warn!(
                    "[FrameworkConfigLoader] Failed to parse {:?}, loading defaults: {}",
                    config_path,
                    e
                );
                Self::default()
            }),
            Err(e) => {
                log::warn!(
                    "[FrameworkConfigLoader] Failed to read {:?}, loading defaults: {}",
                    config_path,
                    e
                );
                Self::default()
            }
        };
        loader.config_path = Some(config_path.to_path_buf());
        loader
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn get_config_path(&self) -> Option<&PathBuf> {
        self.config_path.as_ref()
    }

    pub fn get_session_defaults(&self) -> &SessionDefaultsParams {
        &self.session_defaults
    }

    pub fn get_metrics_params(&self) -> &MetricsParams {
        &self.metrics
    }

    pub fn get_result_output(&self) -> &ResultOutputParams {
        &self.result_output
    }

    pub fn get_logging_params(&self) -> &LoggingParams {
        &self.logging
    }

    /// A training config for `scenario` filled from the session defaults.
    pub fn training_config(&self, scenario: impl Into<String>) -> TrainingConfig {
        let defaults = &self.session_defaults;
        TrainingConfig::builder(scenario)
            .framework(defaults.framework)
            .episodes(defaults.episodes)
            .learning_rate(defaults.learning_rate)
            .discount_factor(defaults.discount_factor)
            .batch_size(defaults.batch_size)
            .max_steps_per_episode(defaults.max_steps_per_episode)
            .checkpoint_interval(defaults.checkpoint_interval)
            .build_unchecked()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_content_parses_to_defaults() {
        let loader = FrameworkConfigLoader::from_json(DEFAULT_FRAMEWORK_CONFIG_CONTENT).unwrap();
        assert_eq!(loader.metrics, MetricsParams::default());
        assert_eq!(loader.session_defaults, SessionDefaultsParams::default());
        assert_eq!(loader.result_output, ResultOutputParams::default());
        assert_eq!(loader.logging.level_filter(), LevelFilter::Info);
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let loader = FrameworkConfigLoader::from_json(
            r#"{"metrics": {"rolling_window": 20}, "logging": {"level": "debug"}}"#,
        )
        .unwrap();
        assert_eq!(loader.metrics.rolling_window, 20);
        assert_eq!(loader.metrics.convergence_epsilon, DEFAULT_CONVERGENCE_EPSILON);
        assert_eq!(loader.logging.level_filter(), LevelFilter::Debug);
        assert!(loader.result_output.enabled);
    }

    #[test]
    fn malformed_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("agentgym_config.json");
        std::fs::write(&path, "{ not json").unwrap();

        let loader = FrameworkConfigLoader::load_config(&path);
        assert_eq!(loader.metrics, MetricsParams::default());
        assert_eq!(loader.get_config_path(), Some(&path));
    }

    #[test]
    fn missing_file_is_created_with_default_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("agentgym_config.json");

        let loader = FrameworkConfigLoader::new_config(Some(path.clone()));
        assert!(path.exists());
        assert_eq!(loader.session_defaults.episodes, DEFAULT_EPISODES);
    }

    #[test]
    fn training_config_applies_session_defaults() {
        let mut loader = FrameworkConfigLoader::default();
        loader.session_defaults.episodes = 250;
        loader.session_defaults.framework = Framework::AutoGen;

        let config = loader.training_config("code_review");
        assert_eq!(config.episodes, 250);
        assert_eq!(config.framework, Framework::AutoGen);
        assert!(config.validate().is_ok());
    }
}
