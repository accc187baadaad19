//! Multi-session control surface.
//!
//! [`SessionManager`] validates configs, resolves scenarios through its
//! [`ScenarioRegistry`], starts sessions and routes control calls to them by
//! id. Sessions are independent: each owns its loop, RNG and metrics, and
//! nothing here holds a map guard across an `.await`.

use crate::registry::{RegistryError, ScenarioRegistry};
use crate::results::{JsonFileSink, NullSink, ResultSink};
use crate::session::{SessionError, SessionSnapshot, SessionState, TrainingSession};
use crate::utilities::configuration::{FrameworkConfigLoader, MetricsParams};
use agentgym_types::config::{ConfigError, TrainingConfig};
use agentgym_types::result::TrainingResult;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum SessionManagerError {
    #[error("Invalid training config: {0}")]
    InvalidConfig(#[from] ConfigError),
    #[error("Scenario '{name}' not found. Available scenarios: {}", .available.join(", "))]
    ScenarioNotFound { name: String, available: Vec<String> },
    #[error("Cannot {action} a session that is {from}")]
    InvalidStateTransition {
        from: SessionState,
        action: &'static str,
    },
    #[error("Session {0} not found")]
    NotFound(Uuid),
    #[error("Session {0} is still active")]
    SessionActive(Uuid),
    #[error("Session {0} ended without producing a result")]
    ResultUnavailable(Uuid),
    #[error(transparent)]
    Registry(RegistryError),
}

impl SessionManagerError {
    /// HTTP-style status for callers that expose the manager over a wire
    /// protocol: 400 for bad input, 404 for unknown names or ids, 409 for
    /// calls that conflict with the session's current state.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::InvalidConfig(_) => 400,
            Self::ScenarioNotFound { .. } | Self::NotFound(_) => 404,
            Self::InvalidStateTransition { .. } | Self::SessionActive(_) | Self::Registry(_) => {
                409
            }
            Self::ResultUnavailable(_) => 500,
        }
    }
}

impl From<RegistryError> for SessionManagerError {
    fn from(e: RegistryError) -> Self {
        match e {
            RegistryError::ScenarioNotFound { name, available } => {
                Self::ScenarioNotFound { name, available }
            }
            RegistryError::InvalidName { source, .. } => Self::InvalidConfig(source),
            other => Self::Registry(other),
        }
    }
}

impl From<SessionError> for SessionManagerError {
    fn from(e: SessionError) -> Self {
        match e {
            SessionError::InvalidStateTransition { from, action } => {
                Self::InvalidStateTransition { from, action }
            }
            SessionError::ResultUnavailable(id) => Self::ResultUnavailable(id),
        }
    }
}

/// One row of [`SessionManager::list`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub session_id: Uuid,
    pub scenario: String,
    pub state: SessionState,
    pub episodes_completed: u64,
    pub episodes_target: u64,
}

impl From<SessionSnapshot> for SessionSummary {
    fn from(snapshot: SessionSnapshot) -> Self {
        Self {
            session_id: snapshot.session_id,
            scenario: snapshot.scenario,
            state: snapshot.state,
            episodes_completed: snapshot.metrics.episodes_completed,
            episodes_target: snapshot.episodes_target,
        }
    }
}

pub struct SessionManager {
    registry: Arc<ScenarioRegistry>,
    sessions: DashMap<Uuid, Arc<TrainingSession>>,
    sink: Arc<dyn ResultSink>,
    metrics_params: MetricsParams,
}

impl SessionManager {
    /// A manager that keeps results in memory only.
    pub fn new(registry: Arc<ScenarioRegistry>) -> Self {
        Self {
            registry,
            sessions: DashMap::new(),
            sink: Arc::new(NullSink),
            metrics_params: MetricsParams::default(),
        }
    }

    /// Uses the config's metrics parameters, and writes results to its output
    /// directory when result output is enabled.
    pub fn from_config(config: &FrameworkConfigLoader, registry: Arc<ScenarioRegistry>) -> Self {
        let output = config.get_result_output();
        let sink: Arc<dyn ResultSink> = if output.enabled {
            Arc::new(JsonFileSink::new(output.directory.clone()))
        } else {
            Arc::new(NullSink)
        };
        Self::new(registry)
            .with_result_sink(sink)
            .with_metrics_params(config.get_metrics_params().clone())
    }

    pub fn with_result_sink(mut self, sink: Arc<dyn ResultSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn with_metrics_params(mut self, params: MetricsParams) -> Self {
        self.metrics_params = params;
        self
    }

    pub fn registry(&self) -> &Arc<ScenarioRegistry> {
        &self.registry
    }

    /// Validates `config`, resolves its scenario and starts a new session.
    /// Nothing is created when validation or lookup fails. Must be called
    /// from within a tokio runtime.
    pub fn create(&self, config: TrainingConfig) -> Result<Uuid, SessionManagerError> {
        let config = config.validate()?;
        let scenario = self.registry.load(&config.scenario)?;

        loop {
            let id = Uuid::new_v4();
            if let Entry::Vacant(slot) = self.sessions.entry(id) {
                let session = Arc::new(TrainingSession::new(
                    id,
                    config,
                    scenario,
                    self.metrics_params.clone(),
                    self.sink.clone(),
                ));
                session.start()?;
                slot.insert(session);
                log::info!(
                    "[SessionManager] Created session {} ({} active)",
                    id,
                    self.sessions.len()
                );
                return Ok(id);
            }
        }
    }

    pub fn session(&self, id: Uuid) -> Result<Arc<TrainingSession>, SessionManagerError> {
        self.sessions
            .get(&id)
            .map(|entry| entry.value().clone())
            .ok_or(SessionManagerError::NotFound(id))
    }

    pub fn get(&self, id: Uuid) -> Result<SessionSnapshot, SessionManagerError> {
        Ok(self.session(id)?.snapshot())
    }

    /// Returns the state the session settled in: `Paused`, or a terminal
    /// state if it finished before it could park.
    pub async fn pause(&self, id: Uuid) -> Result<SessionState, SessionManagerError> {
        let session = self.session(id)?;
        Ok(session.pause().await?)
    }

    pub fn resume(&self, id: Uuid) -> Result<(), SessionManagerError> {
        Ok(self.session(id)?.resume()?)
    }

    /// Idempotent: stopping an ended session returns the result it ended with.
    pub async fn stop(&self, id: Uuid) -> Result<Arc<TrainingResult>, SessionManagerError> {
        let session = self.session(id)?;
        Ok(session.stop().await?)
    }

    pub async fn wait(&self, id: Uuid) -> Result<Arc<TrainingResult>, SessionManagerError> {
        let session = self.session(id)?;
        Ok(session.wait().await?)
    }

    /// `None` while the session is still active.
    pub fn result(&self, id: Uuid) -> Result<Option<Arc<TrainingResult>>, SessionManagerError> {
        Ok(self.session(id)?.result())
    }

    /// Summaries of every session, ordered by id.
    pub fn list(&self) -> Vec<SessionSummary> {
        let mut summaries: Vec<SessionSummary> = self
            .sessions
            .iter()
            .map(|entry| entry.value().snapshot().into())
            .collect();
        summaries.sort_by_key(|summary| summary.session_id);
        summaries
    }

    /// Removes an ended session and hands back its result. Active sessions
    /// must be stopped first.
    pub fn delete(&self, id: Uuid) -> Result<Option<Arc<TrainingResult>>, SessionManagerError> {
        match self
            .sessions
            .remove_if(&id, |_, session| session.state().is_terminal())
        {
            Some((_, session)) => {
                log::info!("[SessionManager] Deleted session {}", id);
                Ok(session.result())
            }
            None if self.sessions.contains_key(&id) => Err(SessionManagerError::SessionActive(id)),
            None => Err(SessionManagerError::NotFound(id)),
        }
    }

    /// Stops every active session and waits for all of them to end.
    pub async fn shutdown(&self) -> Vec<Arc<TrainingResult>> {
        let sessions: Vec<Arc<TrainingSession>> = self
            .sessions
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        log::info!(
            "[SessionManager] Shutting down {} session(s)",
            sessions.len()
        );

        for session in &sessions {
            if let Err(e) = session.request_stop() {
                log::warn!(
                    "[SessionManager] Could not stop session {}: {}",
                    session.id(),
                    e
                );
            }
        }

        let mut results = Vec::with_capacity(sessions.len());
        for session in sessions {
            match session.wait().await {
                Ok(result) => results.push(result),
                Err(e) => log::warn!(
                    "[SessionManager] Session {} ended without a result: {}",
                    session.id(),
                    e
                ),
            }
        }
        results
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes() {
        let id = Uuid::new_v4();
        assert_eq!(
            SessionManagerError::InvalidConfig(ConfigError::InvalidEpisodes).status_code(),
            400
        );
        assert_eq!(SessionManagerError::NotFound(id).status_code(), 404);
        assert_eq!(SessionManagerError::SessionActive(id).status_code(), 409);
        assert_eq!(
            SessionManagerError::InvalidStateTransition {
                from: SessionState::Running,
                action: "resume",
            }
            .status_code(),
            409
        );
    }

    #[test]
    fn registry_errors_map_to_scenario_not_found() {
        let err: SessionManagerError = RegistryError::ScenarioNotFound {
            name: "x".to_string(),
            available: vec!["a".to_string(), "b".to_string()],
        }
        .into();
        assert_eq!(err.status_code(), 404);
        assert_eq!(err.to_string(), "Scenario 'x' not found. Available scenarios: a, b");
    }

    #[test]
    fn malformed_registry_names_are_bad_input() {
        let err: SessionManagerError = RegistryError::InvalidName {
            name: "a b".to_string(),
            source: ConfigError::InvalidScenarioName("a b".to_string()),
        }
        .into();
        assert_eq!(err.status_code(), 400);
    }

    #[test]
    fn invalid_config_creates_nothing() {
        let manager = SessionManager::new(Arc::new(ScenarioRegistry::with_builtins()));
        let config = TrainingConfig::builder("customer_support")
            .episodes(0)
            .build_unchecked();
        let err = manager.create(config).unwrap_err();
        assert_eq!(err, SessionManagerError::InvalidConfig(ConfigError::InvalidEpisodes));
        assert!(manager.is_empty());
    }

    #[test]
    fn unknown_scenario_creates_nothing() {
        let manager = SessionManager::new(Arc::new(ScenarioRegistry::with_builtins()));
        let err = manager.create(TrainingConfig::new("unknown")).unwrap_err();
        assert_eq!(err.status_code(), 404);
        assert!(manager.is_empty());
    }
}
