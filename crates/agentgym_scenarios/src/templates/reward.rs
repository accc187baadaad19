//! Reward broadcasting.
//!
//! The outcome reward of an episode (success or failure) is copied onto every
//! step, then each step gets its own local terms on top. This gives every step
//! credit for the final outcome instead of rewarding only the terminal one.

use crate::templates::base_scenario::Baseline;
use agentgym_types::data::reward::RewardVector;
use agentgym_types::data::trajectory::{StepOutcome, Trajectory};
use std::collections::BTreeMap;

/// Reward table for one scenario.
#[derive(Debug, Clone, PartialEq)]
pub struct RewardBroadcaster {
    /// Outcome reward when the episode succeeded.
    pub success_reward: f64,
    /// Outcome reward when the episode failed (usually negative).
    pub failure_reward: f64,
    pub correct_bonus: f64,
    /// Subtracted from incorrect steps.
    pub incorrect_penalty: f64,
    pub cost_weight: f64,
    pub speed_weight: f64,
    pub baseline: Baseline,
    /// Reward per unit of each named step signal.
    pub signal_weights: BTreeMap<String, f64>,
}

impl RewardBroadcaster {
    pub fn new(success_reward: f64, failure_reward: f64) -> Self {
        Self {
            success_reward,
            failure_reward,
            correct_bonus: 0.0,
            incorrect_penalty: 0.0,
            cost_weight: 0.0,
            speed_weight: 0.0,
            baseline: Baseline::default(),
            signal_weights: BTreeMap::new(),
        }
    }

    pub fn with_step_terms(mut self, correct_bonus: f64, incorrect_penalty: f64) -> Self {
        self.correct_bonus = correct_bonus;
        self.incorrect_penalty = incorrect_penalty;
        self
    }

    pub fn with_cost_weight(mut self, weight: f64) -> Self {
        self.cost_weight = weight;
        self
    }

    pub fn with_speed_weight(mut self, weight: f64) -> Self {
        self.speed_weight = weight;
        self
    }

    pub fn with_baseline(mut self, baseline: Baseline) -> Self {
        self.baseline = baseline;
        self
    }

    pub fn with_signal(mut self, name: impl Into<String>, weight: f64) -> Self {
        self.signal_weights.insert(name.into(), weight);
        self
    }

    pub fn outcome_reward(&self, trajectory: &Trajectory) -> f64 {
        if trajectory.success {
            self.success_reward
        } else {
            self.failure_reward
        }
    }

    /// One reward per step; an empty trajectory yields an empty vector.
    pub fn broadcast(&self, trajectory: &Trajectory) -> RewardVector {
        let mut rewards =
            RewardVector::broadcast(self.outcome_reward(trajectory), trajectory.len());
        for (reward, step) in rewards.iter_mut().zip(trajectory.steps()) {
            *reward += self.step_reward(step);
        }
        rewards
    }

    fn step_reward(&self, step: &StepOutcome) -> f64 {
        let mut reward = if step.correct {
            self.correct_bonus
        } else {
            -self.incorrect_penalty
        };

        reward += self.cost_weight * savings_ratio(self.baseline.cost, step.cost);
        reward += self.speed_weight * savings_ratio(self.baseline.latency, step.latency);

        for (name, value) in &step.signals {
            if let Some(weight) = self.signal_weights.get(name) {
                reward += weight * value;
            }
        }
        reward
    }
}

/// `(baseline - actual) / baseline` when the step beat the baseline, else 0.
fn savings_ratio(baseline: f64, actual: f64) -> f64 {
    if baseline > 0.0 && actual < baseline {
        (baseline - actual) / baseline
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn support_table() -> RewardBroadcaster {
        RewardBroadcaster::new(10.0, -5.0)
            .with_step_terms(10.0, 20.0)
            .with_cost_weight(5.0)
            .with_speed_weight(3.0)
            .with_baseline(Baseline::new(500.0, 240.0))
    }

    #[test]
    fn outcome_is_broadcast_then_step_terms_added() {
        let mut trajectory = Trajectory::new("TICKET-001", 0);
        trajectory.success = true;
        trajectory.push(StepOutcome::new("search_kb", true, 250.0, 120.0));
        trajectory.push(StepOutcome::new("refund", false, 600.0, 300.0));

        let rewards = support_table().broadcast(&trajectory);
        assert_eq!(rewards.len(), 2);
        // 10 outcome + 10 correct + 5 * 0.5 cost + 3 * 0.5 speed
        assert!((rewards.as_slice()[0] - 24.0).abs() < 1e-9);
        // 10 outcome - 20 incorrect, no savings
        assert!((rewards.as_slice()[1] + 10.0).abs() < 1e-9);
    }

    #[test]
    fn failed_episode_broadcasts_failure_reward() {
        let mut trajectory = Trajectory::new("TICKET-002", 3);
        trajectory.push(StepOutcome::new("lookup_user", true, 500.0, 240.0));
        let rewards = support_table().broadcast(&trajectory);
        assert!((rewards.as_slice()[0] - 5.0).abs() < 1e-9);
    }

    #[test]
    fn empty_trajectory_yields_empty_rewards() {
        let trajectory = Trajectory::new("none", 0);
        assert!(support_table().broadcast(&trajectory).is_empty());
    }

    #[test]
    fn signals_are_weighted_and_unknown_ones_ignored() {
        let table = RewardBroadcaster::new(15.0, -10.0)
            .with_signal("critical", 20.0)
            .with_signal("false_positive", -15.0);

        let mut trajectory = Trajectory::new("PR-002", 0);
        trajectory.success = true;
        trajectory.push(
            StepOutcome::new("add_comment", true, 0.0, 0.0)
                .with_signal("critical", 1.0)
                .with_signal("unrelated", 100.0),
        );
        trajectory.push(
            StepOutcome::new("request_changes", false, 0.0, 0.0).with_signal("false_positive", 1.0),
        );

        let rewards = table.broadcast(&trajectory);
        assert_eq!(rewards.as_slice(), &[35.0, 0.0]);
    }
}
