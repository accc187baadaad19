//! Lifecycle of a single training session.
//!
//! ```text
//! Created --start--> Running --pause--> Paused --resume--> Running
//!                    Running --(all episodes done)--> Completed
//!        Running | Paused --stop--> Stopped
//!        Running --(episode error or panic)--> Failed
//! ```
//!
//! The session publishes a [`SessionSnapshot`] through a watch channel. The
//! episode loop and a supervisor task are the only writers while the session
//! runs; callers read owned copies. The terminal state is published only after
//! the final [`TrainingResult`] has been stored, so anyone who observes
//! `Completed`, `Stopped` or `Failed` can fetch the result right away.

use crate::results::ResultSink;
use crate::trainer::{ControlSignal, EpisodeLoop, LoopOutcome, LoopReport};
use crate::utilities::configuration::MetricsParams;
use agentgym_scenarios::templates::base_scenario::Scenario;
use agentgym_types::config::TrainingConfig;
use agentgym_types::metrics::TrainingMetrics;
use agentgym_types::result::{ResultStatus, TrainingResult};
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::fmt;
use std::sync::{Arc, OnceLock};
use std::time::Instant;
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    Created,
    Running,
    Paused,
    Completed,
    Stopped,
    Failed,
}

impl SessionState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Stopped | Self::Failed)
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Created => "created",
            Self::Running => "running",
            Self::Paused => "paused",
            Self::Completed => "completed",
            Self::Stopped => "stopped",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Consistent point-in-time view of a session. Metrics always cover a whole
/// number of episodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub session_id: Uuid,
    pub scenario: String,
    pub state: SessionState,
    pub metrics: TrainingMetrics,
    pub episodes_target: u64,
    pub checkpoints: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
}

impl SessionSnapshot {
    pub fn new(session_id: Uuid, config: &TrainingConfig) -> Self {
        Self {
            session_id,
            scenario: config.scenario.clone(),
            state: SessionState::Created,
            metrics: TrainingMetrics::default(),
            episodes_target: config.episodes,
            checkpoints: 0,
            failure_reason: None,
        }
    }

    /// Fraction of the target episodes completed, in `[0, 1]`.
    pub fn progress(&self) -> f64 {
        if self.episodes_target == 0 {
            return 0.0;
        }
        (self.metrics.episodes_completed as f64 / self.episodes_target as f64).min(1.0)
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum SessionError {
    #[error("Cannot {action} a session that is {from}")]
    InvalidStateTransition {
        from: SessionState,
        action: &'static str,
    },
    #[error("Session {0} ended without producing a result")]
    ResultUnavailable(Uuid),
}

pub struct TrainingSession {
    id: Uuid,
    config: TrainingConfig,
    scenario: Arc<dyn Scenario>,
    metrics_params: MetricsParams,
    sink: Arc<dyn ResultSink>,
    snapshots: Arc<watch::Sender<SessionSnapshot>>,
    control: watch::Sender<ControlSignal>,
    result: Arc<OnceLock<Arc<TrainingResult>>>,
}

impl TrainingSession {
    /// A session in `Created`. An unseeded config gets a random seed here, and
    /// the chosen seed is kept in [`TrainingSession::config`] so the run can
    /// be reproduced.
    pub fn new(
        id: Uuid,
        mut config: TrainingConfig,
        scenario: Arc<dyn Scenario>,
        metrics_params: MetricsParams,
        sink: Arc<dyn ResultSink>,
    ) -> Self {
        if config.seed.is_none() {
            config.seed = Some(rand::random::<u64>());
        }
        let (snapshots, _) = watch::channel(SessionSnapshot::new(id, &config));
        let (control, _) = watch::channel(ControlSignal::Run);

        Self {
            id,
            config,
            scenario,
            metrics_params,
            sink,
            snapshots: Arc::new(snapshots),
            control,
            result: Arc::new(OnceLock::new()),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }

    pub fn scenario(&self) -> &Arc<dyn Scenario> {
        &self.scenario
    }

    pub fn state(&self) -> SessionState {
        self.snapshots.borrow().state
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshots.borrow().clone()
    }

    /// A receiver that is notified on every published snapshot.
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshots.subscribe()
    }

    /// The final result, once the session is terminal.
    pub fn result(&self) -> Option<Arc<TrainingResult>> {
        self.result.get().cloned()
    }

    /// `Created -> Running`. Spawns the episode loop and its supervisor, so
    /// this must be called from within a tokio runtime.
    pub fn start(&self) -> Result<(), SessionError> {
        let mut from = SessionState::Created;
        let started = self.snapshots.send_if_modified(|snapshot| {
            from = snapshot.state;
            if snapshot.state == SessionState::Created {
                snapshot.state = SessionState::Running;
                true
            } else {
                false
            }
        });
        if !started {
            return Err(SessionError::InvalidStateTransition {
                from,
                action: "start",
            });
        }

        log::info!(
            "[TrainingSession] Session {} started: scenario '{}', {} episodes, seed {}",
            self.id,
            self.config.scenario,
            self.config.episodes,
            self.config.seed.unwrap_or_default()
        );

        let episode_loop = EpisodeLoop::new(
            self.id,
            self.config.clone(),
            self.scenario.clone(),
            &self.metrics_params,
            self.control.subscribe(),
            self.snapshots.clone(),
            self.sink.clone(),
        );
        let started_at = Instant::now();
        let handle = tokio::spawn(episode_loop.run());

        let supervisor = Supervisor {
            session_id: self.id,
            config: self.config.clone(),
            scenario: self.scenario.clone(),
            snapshots: self.snapshots.clone(),
            sink: self.sink.clone(),
            result: self.result.clone(),
        };
        tokio::spawn(supervisor.finalize(handle, started_at));
        Ok(())
    }

    /// `Running -> Paused`. Resolves once the loop has parked at its next
    /// episode boundary, or has finished, and returns the state it settled in.
    pub async fn pause(&self) -> Result<SessionState, SessionError> {
        let mut from = SessionState::Running;
        self.snapshots.send_if_modified(|snapshot| {
            from = snapshot.state;
            if snapshot.state == SessionState::Running {
                self.control.send_if_modified(|signal| {
                    if *signal == ControlSignal::Run {
                        *signal = ControlSignal::Pause;
                        true
                    } else {
                        false
                    }
                });
            }
            false
        });
        if from != SessionState::Running {
            return Err(SessionError::InvalidStateTransition {
                from,
                action: "pause",
            });
        }
        log::info!("[TrainingSession] Pause requested for session {}", self.id);

        self.wait_for_state(|state| state != SessionState::Running)
            .await
    }

    /// `Paused -> Running`.
    pub fn resume(&self) -> Result<(), SessionError> {
        let mut from = SessionState::Paused;
        // The state flip and the control release happen under the snapshot
        // lock, so a concurrent `pause` sees either both or neither.
        let resumed = self.snapshots.send_if_modified(|snapshot| {
            from = snapshot.state;
            if snapshot.state != SessionState::Paused {
                return false;
            }
            self.control.send_if_modified(|signal| {
                if *signal == ControlSignal::Pause {
                    *signal = ControlSignal::Run;
                    true
                } else {
                    false
                }
            });
            snapshot.state = SessionState::Running;
            true
        });
        if !resumed {
            return Err(SessionError::InvalidStateTransition {
                from,
                action: "resume",
            });
        }
        log::info!("[TrainingSession] Session {} resumed", self.id);
        Ok(())
    }

    /// Asks the loop to stop at its next episode boundary without waiting for
    /// it. Terminal sessions are left alone.
    pub fn request_stop(&self) -> Result<(), SessionError> {
        let state = self.state();
        if state == SessionState::Created {
            return Err(SessionError::InvalidStateTransition {
                from: state,
                action: "stop",
            });
        }
        if state.is_terminal() {
            return Ok(());
        }

        let requested = self.control.send_if_modified(|signal| {
            if *signal == ControlSignal::Stop {
                false
            } else {
                *signal = ControlSignal::Stop;
                true
            }
        });
        if requested {
            log::info!("[TrainingSession] Stop requested for session {}", self.id);
        }
        Ok(())
    }

    /// Stops a running or paused session and returns its result. Stopping a
    /// session that already ended returns the result it ended with.
    pub async fn stop(&self) -> Result<Arc<TrainingResult>, SessionError> {
        self.request_stop()?;
        self.wait().await
    }

    /// Waits for the session to end and returns its result.
    pub async fn wait(&self) -> Result<Arc<TrainingResult>, SessionError> {
        let state = self.state();
        if state == SessionState::Created {
            return Err(SessionError::InvalidStateTransition {
                from: state,
                action: "wait on",
            });
        }
        self.wait_for_state(|state| state.is_terminal()).await?;
        self.result().ok_or(SessionError::ResultUnavailable(self.id))
    }

    async fn wait_for_state<F>(&self, accept: F) -> Result<SessionState, SessionError>
    where
        F: Fn(SessionState) -> bool,
    {
        let mut updates = self.snapshots.subscribe();
        // The sender lives in `self`, so the channel cannot close under us.
        updates
            .wait_for(|snapshot| accept(snapshot.state))
            .await
            .map(|snapshot| snapshot.state)
            .map_err(|_| SessionError::ResultUnavailable(self.id))
    }
}

/// Awaits the episode loop, turns its report into a [`TrainingResult`] and
/// publishes the terminal state.
struct Supervisor {
    session_id: Uuid,
    config: TrainingConfig,
    scenario: Arc<dyn Scenario>,
    snapshots: Arc<watch::Sender<SessionSnapshot>>,
    sink: Arc<dyn ResultSink>,
    result: Arc<OnceLock<Arc<TrainingResult>>>,
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "non-string panic payload"
    }
}

impl Supervisor {
    async fn finalize(self, handle: JoinHandle<LoopReport>, started_at: Instant) {
        let report = match handle.await {
            Ok(report) => report,
            Err(e) => {
                let reason = if e.is_panic() {
                    let payload = e.into_panic();
                    format!("episode loop panicked: {}", panic_message(payload.as_ref()))
                } else {
                    "episode loop was cancelled".to_string()
                };
                log::error!("[TrainingSession] Session {}: {}", self.session_id, reason);
                // Last metrics the loop published before it died.
                let metrics = self.snapshots.borrow().metrics.clone();
                LoopReport {
                    outcome: LoopOutcome::Failed(reason),
                    metrics,
                    history: Vec::new(),
                }
            }
        };

        let (status, state, failure_reason) = match report.outcome {
            LoopOutcome::Completed => (ResultStatus::Completed, SessionState::Completed, None),
            LoopOutcome::Stopped => (ResultStatus::Stopped, SessionState::Stopped, None),
            LoopOutcome::Failed(reason) => {
                (ResultStatus::Failed, SessionState::Failed, Some(reason))
            }
        };

        let result = TrainingResult::new(
            self.session_id,
            self.config,
            report.metrics.clone(),
            status,
            failure_reason.clone(),
        )
        .with_trainable_components(self.scenario.define_trainable_components())
        .with_success_criteria(self.scenario.success_criteria())
        .with_metrics_history(report.history)
        .with_elapsed_seconds(started_at.elapsed().as_secs_f64());

        if let Err(e) = self.sink.write_result(&result).await {
            log::warn!(
                "[TrainingSession] Session {} failed to write result: {}",
                self.session_id,
                e
            );
        }

        let criteria_met = result.criteria_met.values().filter(|met| **met).count();
        let criteria_total = result.criteria_met.len();
        if self.result.set(Arc::new(result)).is_err() {
            log::warn!(
                "[TrainingSession] Session {} already had a result",
                self.session_id
            );
        }

        let episodes = report.metrics.episodes_completed;
        self.snapshots.send_modify(|snapshot| {
            snapshot.state = state;
            snapshot.metrics = report.metrics;
            snapshot.failure_reason = failure_reason;
        });

        match state {
            SessionState::Failed => log::warn!(
                "[TrainingSession] Session {} failed after {} episodes",
                self.session_id,
                episodes
            ),
            _ => log::info!(
                "[TrainingSession] Session {} {} after {} episodes, {}/{} success criteria met",
                self.session_id,
                state,
                episodes,
                criteria_met,
                criteria_total
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::results::NullSink;
    use agentgym_scenarios::prelude::CustomerSupportScenario;

    fn session(episodes: u64) -> TrainingSession {
        let config = TrainingConfig::builder("customer_support")
            .episodes(episodes)
            .checkpoint_interval(0)
            .build()
            .unwrap();
        TrainingSession::new(
            Uuid::new_v4(),
            config,
            Arc::new(CustomerSupportScenario::new()),
            MetricsParams::default(),
            Arc::new(NullSink),
        )
    }

    #[test]
    fn unseeded_config_gets_a_seed() {
        let session = session(10);
        assert!(session.config().seed.is_some());
        assert_eq!(session.state(), SessionState::Created);
    }

    #[test]
    fn terminal_states() {
        assert!(SessionState::Completed.is_terminal());
        assert!(SessionState::Stopped.is_terminal());
        assert!(SessionState::Failed.is_terminal());
        assert!(!SessionState::Paused.is_terminal());
        assert_eq!(
            serde_json::to_string(&SessionState::Running).unwrap(),
            "\"running\""
        );
    }

    #[tokio::test]
    async fn created_session_rejects_control() {
        let session = session(10);
        assert!(matches!(
            session.pause().await,
            Err(SessionError::InvalidStateTransition { from: SessionState::Created, .. })
        ));
        assert!(session.resume().is_err());
        assert!(session.stop().await.is_err());
        assert!(session.wait().await.is_err());
    }

    #[tokio::test]
    async fn start_twice_is_rejected() {
        let session = session(5);
        session.start().unwrap();
        assert_eq!(
            session.start(),
            Err(SessionError::InvalidStateTransition {
                from: SessionState::Running,
                action: "start",
            })
        );
        let result = session.wait().await.unwrap();
        assert_eq!(result.status, ResultStatus::Completed);
    }

    #[tokio::test]
    async fn terminal_state_is_published_after_the_result() {
        let session = session(20);
        let mut updates = session.subscribe();
        session.start().unwrap();

        updates
            .wait_for(|snapshot| snapshot.state.is_terminal())
            .await
            .unwrap();
        let result = session.result().unwrap();
        assert_eq!(result.metrics.episodes_completed, 20);
        assert_eq!(session.snapshot().progress(), 1.0);
    }
}
