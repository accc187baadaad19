//! Rolling metrics and convergence detection for one session.
//!
//! [`MetricsAggregator`] has exactly one writer, the session's episode loop.
//! Readers only ever see owned [`TrainingMetrics`] copies published by that
//! loop.

use crate::utilities::configuration::MetricsParams;
use agentgym_scenarios::templates::base_scenario::Baseline;
use agentgym_types::data::reward::RewardVector;
use agentgym_types::data::trajectory::Trajectory;
use agentgym_types::metrics::TrainingMetrics;
use std::collections::{BTreeMap, VecDeque};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum MetricsError {
    #[error("Reward vector has {rewards} entries but the trajectory has {steps} steps")]
    ShapeMismatch { steps: usize, rewards: usize },
}

/// What one episode contributes to the rolling window.
#[derive(Debug, Clone)]
struct EpisodeSummary {
    steps: usize,
    correct: usize,
    reward_sum: f64,
    cost: f64,
    latency: f64,
    accuracy: f64,
    /// signal name -> (steps carrying it, steps raising it)
    signals: BTreeMap<String, (usize, usize)>,
}

impl EpisodeSummary {
    fn new(trajectory: &Trajectory, rewards: &RewardVector) -> Self {
        let mut signals: BTreeMap<String, (usize, usize)> = BTreeMap::new();
        for step in trajectory.steps() {
            for (name, value) in &step.signals {
                let counts = signals.entry(name.clone()).or_insert((0, 0));
                counts.0 += 1;
                if *value > 0.0 {
                    counts.1 += 1;
                }
            }
        }

        Self {
            steps: trajectory.len(),
            correct: trajectory.correct_steps(),
            reward_sum: rewards.sum(),
            cost: trajectory.total_cost(),
            latency: trajectory.total_latency(),
            accuracy: trajectory.accuracy(),
            signals,
        }
    }
}

pub struct MetricsAggregator {
    rolling_window: usize,
    convergence_epsilon: f64,
    convergence_window: usize,
    baseline: Baseline,
    window: VecDeque<EpisodeSummary>,
    /// Per-episode accuracy of the last `2 * convergence_window` episodes.
    recent_accuracy: VecDeque<f64>,
    metrics: TrainingMetrics,
}

/// `max(min_window, ceil(total_episodes / 10))`.
pub fn convergence_window(total_episodes: u64, min_window: u64) -> usize {
    total_episodes.div_ceil(10).max(min_window).max(1) as usize
}

/// `(baseline - actual) / baseline` clamped to `[0, 1]`; 0 without a baseline.
fn reduction(baseline: f64, actual: f64) -> f64 {
    if baseline > 0.0 {
        ((baseline - actual) / baseline).clamp(0.0, 1.0)
    } else {
        0.0
    }
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, count) = values.fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}

impl MetricsAggregator {
    pub fn new(params: &MetricsParams, total_episodes: u64, baseline: Baseline) -> Self {
        let convergence_window = convergence_window(total_episodes, params.min_convergence_window);
        let rolling_window = params.rolling_window.max(1);
        Self {
            rolling_window,
            convergence_epsilon: params.convergence_epsilon,
            convergence_window,
            baseline,
            window: VecDeque::with_capacity(rolling_window),
            recent_accuracy: VecDeque::with_capacity(2 * convergence_window),
            metrics: TrainingMetrics::default(),
        }
    }

    pub fn convergence_window(&self) -> usize {
        self.convergence_window
    }

    /// Folds one finished episode into the rolling statistics. Shapes are
    /// checked before anything is touched, so a rejected update leaves the
    /// metrics exactly as they were.
    pub fn update(
        &mut self,
        trajectory: &Trajectory,
        rewards: &RewardVector,
    ) -> Result<(), MetricsError> {
        if rewards.len() != trajectory.len() {
            return Err(MetricsError::ShapeMismatch {
                steps: trajectory.len(),
                rewards: rewards.len(),
            });
        }

        let summary = EpisodeSummary::new(trajectory, rewards);
        self.recent_accuracy.push_back(summary.accuracy);
        if self.recent_accuracy.len() > 2 * self.convergence_window {
            self.recent_accuracy.pop_front();
        }
        self.window.push_back(summary);
        if self.window.len() > self.rolling_window {
            self.window.pop_front();
        }

        self.metrics.episodes_completed += 1;
        self.recompute();
        self.check_convergence();
        Ok(())
    }

    pub fn snapshot(&self) -> TrainingMetrics {
        self.metrics.clone()
    }

    fn recompute(&mut self) {
        let steps: usize = self.window.iter().map(|e| e.steps).sum();
        let correct: usize = self.window.iter().map(|e| e.correct).sum();
        let reward: f64 = self.window.iter().map(|e| e.reward_sum).sum();

        let metrics = &mut self.metrics;
        metrics.accuracy = if steps == 0 {
            0.0
        } else {
            correct as f64 / steps as f64
        };
        metrics.mean_reward = if steps == 0 { 0.0 } else { reward / steps as f64 };
        metrics.final_reward = mean(self.window.iter().map(|e| e.reward_sum));
        metrics.loss = mean(self.window.iter().map(|e| (1.0 - e.accuracy).powi(2)));
        metrics.avg_cost = mean(self.window.iter().map(|e| e.cost));
        metrics.avg_latency = mean(self.window.iter().map(|e| e.latency));
        metrics.cost_reduction = reduction(self.baseline.cost, metrics.avg_cost);
        metrics.time_savings = reduction(self.baseline.latency, metrics.avg_latency);

        let mut totals: BTreeMap<&str, (usize, usize)> = BTreeMap::new();
        for episode in &self.window {
            for (name, (present, raised)) in &episode.signals {
                let total = totals.entry(name.as_str()).or_insert((0, 0));
                total.0 += present;
                total.1 += raised;
            }
        }
        metrics.signal_rates = totals
            .into_iter()
            .map(|(name, (present, raised))| {
                let rate = if present == 0 {
                    0.0
                } else {
                    raised as f64 / present as f64
                };
                (name.to_string(), rate)
            })
            .collect();
    }

    /// Compares the last `w` episodes against the `w` before them and records
    /// the first episode at which accuracy stopped improving by more than
    /// epsilon. Never overwritten once set.
    fn check_convergence(&mut self) {
        if self.metrics.convergence_episode.is_some() {
            return;
        }
        let w = self.convergence_window;
        if self.recent_accuracy.len() < 2 * w {
            return;
        }

        let previous = mean(self.recent_accuracy.iter().take(w).copied());
        let latest = mean(self.recent_accuracy.iter().skip(w).copied());
        if latest - previous <= self.convergence_epsilon {
            self.metrics.convergence_episode = Some(self.metrics.episodes_completed);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentgym_types::data::trajectory::StepOutcome;

    fn trajectory(episode: u64, correct: &[bool]) -> Trajectory {
        let mut trajectory = Trajectory::new("case", episode);
        for (i, ok) in correct.iter().enumerate() {
            trajectory.push(
                StepOutcome::new(format!("a{i}"), *ok, 100.0, 10.0)
                    .with_signal("false_positive", if *ok { 0.0 } else { 1.0 }),
            );
        }
        trajectory.success = correct.iter().all(|c| *c);
        trajectory
    }

    fn aggregator(total: u64) -> MetricsAggregator {
        MetricsAggregator::new(&MetricsParams::default(), total, Baseline::new(400.0, 40.0))
    }

    #[test]
    fn window_size_follows_episode_count() {
        assert_eq!(convergence_window(50, 10), 10);
        assert_eq!(convergence_window(1000, 10), 100);
        assert_eq!(convergence_window(101, 10), 11);
    }

    #[test]
    fn shape_mismatch_leaves_metrics_untouched() {
        let mut agg = aggregator(10);
        let t = trajectory(0, &[true, true]);
        agg.update(&t, &RewardVector::new(vec![1.0, 1.0])).unwrap();
        let before = agg.snapshot();

        let err = agg
            .update(&t, &RewardVector::new(vec![1.0]))
            .unwrap_err();
        assert_eq!(err, MetricsError::ShapeMismatch { steps: 2, rewards: 1 });
        assert_eq!(agg.snapshot(), before);
    }

    #[test]
    fn rolling_statistics() {
        let mut agg = aggregator(10);
        agg.update(&trajectory(0, &[true, false]), &RewardVector::new(vec![4.0, -2.0]))
            .unwrap();
        agg.update(&trajectory(1, &[true, true]), &RewardVector::new(vec![3.0, 3.0]))
            .unwrap();

        let m = agg.snapshot();
        assert_eq!(m.episodes_completed, 2);
        assert!((m.accuracy - 0.75).abs() < 1e-12);
        assert!((m.mean_reward - 2.0).abs() < 1e-12);
        assert!((m.final_reward - 4.0).abs() < 1e-12);
        assert!((m.loss - 0.125).abs() < 1e-12);
        assert!((m.avg_cost - 200.0).abs() < 1e-12);
        assert!((m.cost_reduction - 0.5).abs() < 1e-12);
        assert!((m.time_savings - 0.5).abs() < 1e-12);
        assert!((m.signal_rates["false_positive"] - 0.25).abs() < 1e-12);
    }

    #[test]
    fn rolling_window_drops_old_episodes() {
        let params = MetricsParams {
            rolling_window: 2,
            ..Default::default()
        };
        let mut agg = MetricsAggregator::new(&params, 10, Baseline::default());
        for (i, ok) in [false, true, true].iter().enumerate() {
            let t = trajectory(i as u64, &[*ok]);
            agg.update(&t, &RewardVector::new(vec![0.0])).unwrap();
        }
        let m = agg.snapshot();
        assert_eq!(m.episodes_completed, 3);
        assert_eq!(m.accuracy, 1.0);
        assert_eq!(m.cost_reduction, 0.0);
    }

    #[test]
    fn flat_accuracy_converges_once_two_windows_exist() {
        let mut agg = aggregator(50);
        for episode in 0..19 {
            agg.update(&trajectory(episode, &[true]), &RewardVector::new(vec![1.0]))
                .unwrap();
            assert!(agg.snapshot().convergence_episode.is_none());
        }
        agg.update(&trajectory(19, &[true]), &RewardVector::new(vec![1.0]))
            .unwrap();
        assert_eq!(agg.snapshot().convergence_episode, Some(20));

        for episode in 20..50 {
            agg.update(&trajectory(episode, &[true]), &RewardVector::new(vec![1.0]))
                .unwrap();
        }
        assert_eq!(agg.snapshot().convergence_episode, Some(20));
    }

    #[test]
    fn improving_accuracy_does_not_converge() {
        let mut agg = aggregator(50);
        for episode in 0..10 {
            agg.update(&trajectory(episode, &[false]), &RewardVector::new(vec![0.0]))
                .unwrap();
        }
        for episode in 10..20 {
            agg.update(&trajectory(episode, &[true]), &RewardVector::new(vec![0.0]))
                .unwrap();
        }
        assert!(agg.snapshot().convergence_episode.is_none());
    }

    #[test]
    fn empty_trajectories_are_counted() {
        let mut agg = aggregator(10);
        agg.update(&Trajectory::new("none", 0), &RewardVector::default())
            .unwrap();
        let m = agg.snapshot();
        assert_eq!(m.episodes_completed, 1);
        assert_eq!(m.accuracy, 0.0);
    }
}
