//! The write-once outcome of a training session.
//!
//! This is the only artifact handed to downstream RL engines, so its JSON shape
//! is kept stable: `status` serializes as `completed`, `stopped` or `failed`, and
//! `failure_reason` is present only for failed sessions.

use crate::config::TrainingConfig;
use crate::metrics::{SuccessCriteria, TrainingMetrics};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use thiserror::Error;
use uuid::Uuid;

pub const RESULT_VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Debug, Error)]
pub enum ResultRecordError {
    #[error("I/O error on result file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to (de)serialize result: {0}")]
    Serde(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultStatus {
    Completed,
    Stopped,
    Failed,
}

impl ResultStatus {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Completed => "completed",
            Self::Stopped => "stopped",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for ResultStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A metrics snapshot recorded at a checkpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckpointRecord {
    pub episode: u64,
    pub metrics: TrainingMetrics,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingResult {
    pub session_id: Uuid,
    pub config: TrainingConfig,
    pub metrics: TrainingMetrics,
    /// Opaque reference to the trained artifact, e.g. `./models/code_review_langchain_ep500`.
    pub artifact_ref: String,
    pub status: ResultStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
    #[serde(default)]
    pub trainable_components: BTreeMap<String, bool>,
    #[serde(default)]
    pub success_criteria: SuccessCriteria,
    #[serde(default)]
    pub criteria_met: BTreeMap<String, bool>,
    #[serde(default)]
    pub metrics_history: Vec<CheckpointRecord>,
    #[serde(default)]
    pub elapsed_seconds: f64,
    pub timestamp: u64,
    pub version: String,
}

fn current_timestamp() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Default artifact reference for a config: `./models/{scenario}_{framework}_ep{episodes}`.
pub fn artifact_ref_for(config: &TrainingConfig) -> String {
    format!(
        "./models/{}_{}_ep{}",
        config.scenario, config.framework, config.episodes
    )
}

impl TrainingResult {
    /// Builds a result stamped with the current time and crate version.
    /// `failure_reason` is dropped unless `status` is `Failed`.
    pub fn new(
        session_id: Uuid,
        config: TrainingConfig,
        metrics: TrainingMetrics,
        status: ResultStatus,
        failure_reason: Option<String>,
    ) -> Self {
        let artifact_ref = artifact_ref_for(&config);
        let failure_reason = match status {
            ResultStatus::Failed => {
                Some(failure_reason.unwrap_or_else(|| "unknown failure".to_string()))
            }
            _ => None,
        };

        Self {
            session_id,
            config,
            metrics,
            artifact_ref,
            status,
            failure_reason,
            trainable_components: BTreeMap::new(),
            success_criteria: SuccessCriteria::new(),
            criteria_met: BTreeMap::new(),
            metrics_history: Vec::new(),
            elapsed_seconds: 0.0,
            timestamp: current_timestamp(),
            version: RESULT_VERSION.to_string(),
        }
    }

    pub fn with_trainable_components(mut self, components: BTreeMap<String, bool>) -> Self {
        self.trainable_components = components;
        self
    }

    /// Attaches the criteria and evaluates them against the final metrics.
    pub fn with_success_criteria(mut self, criteria: SuccessCriteria) -> Self {
        self.criteria_met = self.metrics.evaluate(&criteria);
        self.success_criteria = criteria;
        self
    }

    pub fn with_metrics_history(mut self, history: Vec<CheckpointRecord>) -> Self {
        self.metrics_history = history;
        self
    }

    pub fn with_elapsed_seconds(mut self, elapsed: f64) -> Self {
        self.elapsed_seconds = elapsed;
        self
    }

    pub fn all_criteria_met(&self) -> bool {
        !self.criteria_met.is_empty() && self.criteria_met.values().all(|met| *met)
    }

    pub fn to_json(&self) -> Result<String, ResultRecordError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, ResultRecordError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn save(&self, path: &Path) -> Result<(), ResultRecordError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self, ResultRecordError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json(&contents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::Criterion;

    fn sample_config() -> TrainingConfig {
        TrainingConfig::builder("code_review")
            .episodes(500)
            .seed(7)
            .build()
            .unwrap()
    }

    #[test]
    fn status_serializes_lowercase_and_reason_only_on_failure() {
        let completed = TrainingResult::new(
            Uuid::new_v4(),
            sample_config(),
            TrainingMetrics::default(),
            ResultStatus::Completed,
            Some("ignored".to_string()),
        );
        let json: serde_json::Value = serde_json::from_str(&completed.to_json().unwrap()).unwrap();
        assert_eq!(json["status"], "completed");
        assert!(json.get("failure_reason").is_none());
        assert_eq!(json["artifact_ref"], "./models/code_review_langchain_ep500");

        let failed = TrainingResult::new(
            Uuid::new_v4(),
            sample_config(),
            TrainingMetrics::default(),
            ResultStatus::Failed,
            Some("scenario exploded".to_string()),
        );
        let json: serde_json::Value = serde_json::from_str(&failed.to_json().unwrap()).unwrap();
        assert_eq!(json["status"], "failed");
        assert_eq!(json["failure_reason"], "scenario exploded");
    }

    #[test]
    fn save_and_load_preserve_the_record() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("result.json");

        let mut criteria = SuccessCriteria::new();
        criteria.insert("accuracy".to_string(), Criterion::at_least(0.5));
        let metrics = TrainingMetrics {
            episodes_completed: 12,
            accuracy: 0.75,
            ..Default::default()
        };

        let result = TrainingResult::new(
            Uuid::new_v4(),
            sample_config(),
            metrics,
            ResultStatus::Stopped,
            None,
        )
        .with_success_criteria(criteria);
        assert!(result.all_criteria_met());

        result.save(&path).unwrap();
        let loaded = TrainingResult::load(&path).unwrap();
        assert_eq!(loaded, result);
        assert_eq!(loaded.status, ResultStatus::Stopped);
    }
}
