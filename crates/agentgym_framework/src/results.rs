//! Where finished results and checkpoints go.

use agentgym_types::result::{CheckpointRecord, TrainingResult};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum ResultSinkError {
    #[error("Failed to write {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to serialize record: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[async_trait]
pub trait ResultSink: Send + Sync {
    async fn write_result(&self, result: &TrainingResult) -> Result<(), ResultSinkError>;

    async fn write_checkpoint(
        &self,
        session_id: &Uuid,
        checkpoint: &CheckpointRecord,
    ) -> Result<(), ResultSinkError>;
}

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

#[async_trait]
impl ResultSink for NullSink {
    async fn write_result(&self, _result: &TrainingResult) -> Result<(), ResultSinkError> {
        Ok(())
    }

    async fn write_checkpoint(
        &self,
        _session_id: &Uuid,
        _checkpoint: &CheckpointRecord,
    ) -> Result<(), ResultSinkError> {
        Ok(())
    }
}

/// Writes `<dir>/<session_id>.json` for results and
/// `<dir>/<session_id>/checkpoint_<episode>.json` for checkpoints.
#[derive(Debug, Clone)]
pub struct JsonFileSink {
    directory: PathBuf,
}

impl JsonFileSink {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn result_path(&self, session_id: &Uuid) -> PathBuf {
        self.directory.join(format!("{session_id}.json"))
    }

    pub fn checkpoint_path(&self, session_id: &Uuid, episode: u64) -> PathBuf {
        self.directory
            .join(session_id.to_string())
            .join(format!("checkpoint_{episode}.json"))
    }

    async fn write_json(path: PathBuf, contents: String) -> Result<(), ResultSinkError> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| ResultSinkError::Io {
                    path: parent.to_path_buf(),
                    source,
                })?;
        }
        tokio::fs::write(&path, contents)
            .await
            .map_err(|source| ResultSinkError::Io { path, source })
    }
}

#[async_trait]
impl ResultSink for JsonFileSink {
    async fn write_result(&self, result: &TrainingResult) -> Result<(), ResultSinkError> {
        let contents = serde_json::to_string_pretty(result)?;
        Self::write_json(self.result_path(&result.session_id), contents).await
    }

    async fn write_checkpoint(
        &self,
        session_id: &Uuid,
        checkpoint: &CheckpointRecord,
    ) -> Result<(), ResultSinkError> {
        let contents = serde_json::to_string_pretty(checkpoint)?;
        Self::write_json(self.checkpoint_path(session_id, checkpoint.episode), contents).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentgym_types::config::TrainingConfig;
    use agentgym_types::metrics::TrainingMetrics;
    use agentgym_types::result::ResultStatus;

    #[tokio::test]
    async fn json_sink_writes_result_and_checkpoints() {
        let dir = tempfile::tempdir().unwrap();
        let sink = JsonFileSink::new(dir.path().join("results"));
        let session_id = Uuid::new_v4();

        let checkpoint = CheckpointRecord {
            episode: 10,
            metrics: TrainingMetrics {
                episodes_completed: 10,
                ..Default::default()
            },
        };
        sink.write_checkpoint(&session_id, &checkpoint).await.unwrap();
        let written = std::fs::read_to_string(sink.checkpoint_path(&session_id, 10)).unwrap();
        let parsed: CheckpointRecord = serde_json::from_str(&written).unwrap();
        assert_eq!(parsed, checkpoint);

        let result = TrainingResult::new(
            session_id,
            TrainingConfig::new("customer_support"),
            TrainingMetrics::default(),
            ResultStatus::Completed,
            None,
        );
        sink.write_result(&result).await.unwrap();
        let loaded = TrainingResult::load(&sink.result_path(&session_id)).unwrap();
        assert_eq!(loaded, result);
    }

    #[tokio::test]
    async fn null_sink_accepts_everything() {
        let sink = NullSink;
        let result = TrainingResult::new(
            Uuid::new_v4(),
            TrainingConfig::new("x"),
            TrainingMetrics::default(),
            ResultStatus::Stopped,
            None,
        );
        assert!(sink.write_result(&result).await.is_ok());
    }
}
