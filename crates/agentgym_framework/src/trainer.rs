//! The episode loop that drives one training session.
//!
//! Each session runs exactly one [`EpisodeLoop`] on its own tokio task. The
//! loop owns the session's seeded RNG and its [`MetricsAggregator`], so
//! nothing else ever writes to either. Episodes run strictly in sequence and
//! the only place the loop yields is the episode boundary:
//!
//! 1. generate a case and simulate it
//! 2. broadcast rewards over the trajectory
//! 3. fold the episode into the metrics
//! 4. publish the new snapshot, emit a checkpoint if one is due, yield
//! 5. before the next episode, honor pause and stop requests
//!
//! Pause therefore takes effect within one episode, and readers always see
//! metrics for a whole number of episodes.

use crate::metrics::{MetricsAggregator, MetricsError};
use crate::results::ResultSink;
use crate::session::{SessionSnapshot, SessionState};
use crate::utilities::configuration::MetricsParams;
use agentgym_scenarios::templates::base_scenario::{EpisodeContext, Scenario, ScenarioError};
use agentgym_types::config::TrainingConfig;
use agentgym_types::metrics::TrainingMetrics;
use agentgym_types::result::CheckpointRecord;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::collections::VecDeque;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::watch;
use uuid::Uuid;

/// Requested run mode, written by the session and read by its loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlSignal {
    Run,
    Pause,
    Stop,
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum EpisodeExecutionError {
    #[error("Scenario failed in episode {episode}: {source}")]
    Scenario {
        episode: u64,
        #[source]
        source: ScenarioError,
    },
    #[error("Episode {episode}: reward vector has {rewards} entries for {steps} steps")]
    RewardShapeMismatch {
        episode: u64,
        steps: usize,
        rewards: usize,
    },
    #[error("Episode {episode}: trajectory has {steps} steps, limit is {max_steps}")]
    TooManySteps {
        episode: u64,
        steps: usize,
        max_steps: usize,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum LoopOutcome {
    Completed,
    Stopped,
    Failed(String),
}

/// What the loop hands back when it exits.
#[derive(Debug, Clone)]
pub struct LoopReport {
    pub outcome: LoopOutcome,
    pub metrics: TrainingMetrics,
    pub history: Vec<CheckpointRecord>,
}

pub struct EpisodeLoop {
    session_id: Uuid,
    config: TrainingConfig,
    scenario: Arc<dyn Scenario>,
    aggregator: MetricsAggregator,
    rng: ChaCha8Rng,
    control: watch::Receiver<ControlSignal>,
    snapshots: Arc<watch::Sender<SessionSnapshot>>,
    sink: Arc<dyn ResultSink>,
    history: VecDeque<CheckpointRecord>,
    max_history: usize,
}

impl EpisodeLoop {
    pub fn new(
        session_id: Uuid,
        config: TrainingConfig,
        scenario: Arc<dyn Scenario>,
        params: &MetricsParams,
        control: watch::Receiver<ControlSignal>,
        snapshots: Arc<watch::Sender<SessionSnapshot>>,
        sink: Arc<dyn ResultSink>,
    ) -> Self {
        let aggregator = MetricsAggregator::new(params, config.episodes, scenario.baseline());
        let rng = ChaCha8Rng::seed_from_u64(config.seed.unwrap_or_default());
        Self {
            session_id,
            config,
            scenario,
            aggregator,
            rng,
            control,
            snapshots,
            sink,
            history: VecDeque::new(),
            max_history: params.max_history,
        }
    }

    pub async fn run(mut self) -> LoopReport {
        log::debug!(
            "[EpisodeLoop] Session {} running {} episodes of '{}'",
            self.session_id,
            self.config.episodes,
            self.scenario.name()
        );

        for episode in 0..self.config.episodes {
            if self.suspension_point().await == ControlSignal::Stop {
                log::info!(
                    "[EpisodeLoop] Session {} stopped before episode {}",
                    self.session_id,
                    episode
                );
                return self.finish(LoopOutcome::Stopped);
            }

            if let Err(e) = self.run_episode(episode) {
                log::error!("[EpisodeLoop] Session {} failed: {}", self.session_id, e);
                return self.finish(LoopOutcome::Failed(e.to_string()));
            }

            self.publish();
            let completed = episode + 1;
            let interval = self.config.checkpoint_interval;
            if interval > 0 && completed % interval == 0 {
                self.checkpoint(completed).await;
            }
            tokio::task::yield_now().await;
        }

        self.finish(LoopOutcome::Completed)
    }

    fn run_episode(&mut self, episode: u64) -> Result<(), EpisodeExecutionError> {
        let ctx = EpisodeContext::new(
            episode,
            self.config.episodes,
            self.config.max_steps_per_episode as usize,
        );

        let case = self
            .scenario
            .generate_case(&mut self.rng)
            .map_err(|source| EpisodeExecutionError::Scenario { episode, source })?;
        let trajectory = self
            .scenario
            .simulate_episode(&case, &ctx, &mut self.rng)
            .map_err(|source| EpisodeExecutionError::Scenario { episode, source })?;
        if trajectory.len() > ctx.max_steps {
            return Err(EpisodeExecutionError::TooManySteps {
                episode,
                steps: trajectory.len(),
                max_steps: ctx.max_steps,
            });
        }

        let rewards = self.scenario.broadcast_rewards(&trajectory);
        self.aggregator
            .update(&trajectory, &rewards)
            .map_err(|e| match e {
                MetricsError::ShapeMismatch { steps, rewards } => {
                    EpisodeExecutionError::RewardShapeMismatch {
                        episode,
                        steps,
                        rewards,
                    }
                }
            })
    }

    /// Parks while paused. Returns `Run` to continue or `Stop` to exit.
    async fn suspension_point(&mut self) -> ControlSignal {
        loop {
            let signal = *self.control.borrow_and_update();
            match signal {
                ControlSignal::Pause => {
                    self.acknowledge_pause();
                    if self.control.changed().await.is_err() {
                        // The session is gone; nobody can resume us.
                        return ControlSignal::Stop;
                    }
                }
                other => return other,
            }
        }
    }

    fn acknowledge_pause(&self) {
        let session_id = self.session_id;
        let episodes = self.aggregator.snapshot().episodes_completed;
        self.snapshots.send_if_modified(|snapshot| {
            if snapshot.state == SessionState::Running {
                snapshot.state = SessionState::Paused;
                log::info!(
                    "[EpisodeLoop] Session {} paused after {} episodes",
                    session_id,
                    episodes
                );
                true
            } else {
                false
            }
        });
    }

    fn publish(&self) {
        let metrics = self.aggregator.snapshot();
        self.snapshots.send_modify(|snapshot| snapshot.metrics = metrics);
    }

    async fn checkpoint(&mut self, episode: u64) {
        let record = CheckpointRecord {
            episode,
            metrics: self.aggregator.snapshot(),
        };
        log::debug!(
            "[EpisodeLoop] Session {} checkpoint at episode {}: accuracy {:.3}, mean reward {:.3}",
            self.session_id,
            episode,
            record.metrics.accuracy,
            record.metrics.mean_reward
        );

        if let Err(e) = self.sink.write_checkpoint(&self.session_id, &record).await {
            log::warn!(
                "[EpisodeLoop] Session {} failed to write checkpoint {}: {}",
                self.session_id,
                episode,
                e
            );
        }

        if self.max_history > 0 {
            if self.history.len() == self.max_history {
                self.history.pop_front();
            }
            self.history.push_back(record);
        }
        self.snapshots.send_modify(|snapshot| snapshot.checkpoints += 1);
    }

    fn finish(self, outcome: LoopOutcome) -> LoopReport {
        LoopReport {
            outcome,
            metrics: self.aggregator.snapshot(),
            history: self.history.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::results::NullSink;
    use agentgym_scenarios::prelude::CustomerSupportScenario;

    fn snapshot_channel(config: &TrainingConfig) -> Arc<watch::Sender<SessionSnapshot>> {
        let mut snapshot = SessionSnapshot::new(Uuid::new_v4(), config);
        snapshot.state = SessionState::Running;
        Arc::new(watch::channel(snapshot).0)
    }

    fn episode_loop(
        config: &TrainingConfig,
        control: watch::Receiver<ControlSignal>,
    ) -> (EpisodeLoop, Arc<watch::Sender<SessionSnapshot>>) {
        let snapshots = snapshot_channel(config);
        let episode_loop = EpisodeLoop::new(
            Uuid::new_v4(),
            config.clone(),
            Arc::new(CustomerSupportScenario::new()),
            &MetricsParams::default(),
            control,
            snapshots.clone(),
            Arc::new(NullSink),
        );
        (episode_loop, snapshots)
    }

    #[tokio::test]
    async fn runs_every_episode_and_records_checkpoints() {
        let config = TrainingConfig::builder("customer_support")
            .episodes(30)
            .checkpoint_interval(10)
            .seed(5)
            .build()
            .unwrap();
        let (_control_tx, control_rx) = watch::channel(ControlSignal::Run);
        let (episode_loop, snapshots) = episode_loop(&config, control_rx);

        let report = episode_loop.run().await;
        assert_eq!(report.outcome, LoopOutcome::Completed);
        assert_eq!(report.metrics.episodes_completed, 30);
        let episodes: Vec<u64> = report.history.iter().map(|c| c.episode).collect();
        assert_eq!(episodes, vec![10, 20, 30]);

        let published = snapshots.borrow().clone();
        assert_eq!(published.metrics, report.metrics);
        assert_eq!(published.checkpoints, 3);
    }

    #[tokio::test]
    async fn stop_before_first_episode_runs_nothing() {
        let config = TrainingConfig::builder("customer_support")
            .episodes(10)
            .seed(1)
            .build()
            .unwrap();
        let (_control_tx, control_rx) = watch::channel(ControlSignal::Stop);
        let (episode_loop, _snapshots) = episode_loop(&config, control_rx);

        let report = episode_loop.run().await;
        assert_eq!(report.outcome, LoopOutcome::Stopped);
        assert_eq!(report.metrics.episodes_completed, 0);
    }

    #[tokio::test]
    async fn history_is_bounded() {
        let config = TrainingConfig::builder("customer_support")
            .episodes(20)
            .checkpoint_interval(1)
            .seed(2)
            .build()
            .unwrap();
        let (_control_tx, control_rx) = watch::channel(ControlSignal::Run);
        let snapshots = snapshot_channel(&config);
        let params = MetricsParams {
            max_history: 4,
            ..Default::default()
        };
        let episode_loop = EpisodeLoop::new(
            Uuid::new_v4(),
            config,
            Arc::new(CustomerSupportScenario::new()),
            &params,
            control_rx,
            snapshots,
            Arc::new(NullSink),
        );

        let report = episode_loop.run().await;
        let episodes: Vec<u64> = report.history.iter().map(|c| c.episode).collect();
        assert_eq!(episodes, vec![17, 18, 19, 20]);
    }
}
