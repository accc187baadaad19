//! Training metrics and success criteria.
//!
//! [`TrainingMetrics`] is the read-only view of a session's rolling statistics.
//! The aggregator that owns the live values only ever hands out copies.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Default tool-reliability target used by [`TrainingMetrics::meets_target`].
pub const DEFAULT_TARGET_RELIABILITY: f64 = 0.95;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrainingMetrics {
    pub episodes_completed: u64,
    /// Rolling fraction of locally-correct steps (tool reliability).
    pub accuracy: f64,
    /// Rolling mean per-step reward.
    pub mean_reward: f64,
    /// Rolling mean of per-episode summed reward.
    pub final_reward: f64,
    /// Rolling loss proxy, mean of `(1 - episode accuracy)^2`.
    pub loss: f64,
    /// Rolling mean cost per episode.
    pub avg_cost: f64,
    pub cost_reduction: f64,
    /// Rolling mean latency per episode.
    pub avg_latency: f64,
    pub time_savings: f64,
    pub convergence_episode: Option<u64>,
    /// Rolling fraction of steps raising each scenario signal.
    #[serde(default)]
    pub signal_rates: BTreeMap<String, f64>,
}

impl TrainingMetrics {
    pub fn meets_target(&self, target_reliability: f64) -> bool {
        self.accuracy >= target_reliability
    }

    /// Looks a metric up by name. Core metrics come first, then signal rates.
    pub fn metric(&self, name: &str) -> Option<f64> {
        match name {
            "episodes_completed" => Some(self.episodes_completed as f64),
            "accuracy" | "tool_reliability" => Some(self.accuracy),
            "mean_reward" => Some(self.mean_reward),
            "final_reward" => Some(self.final_reward),
            "loss" => Some(self.loss),
            "avg_cost" | "avg_tokens_used" => Some(self.avg_cost),
            "cost_reduction" => Some(self.cost_reduction),
            "avg_latency" | "avg_response_time" => Some(self.avg_latency),
            "time_savings" => Some(self.time_savings),
            "convergence_episode" => self.convergence_episode.map(|e| e as f64),
            other => self.signal_rates.get(other).copied(),
        }
    }

    /// Checks every criterion; metrics the criteria name but that were never
    /// observed count as not met.
    pub fn evaluate(&self, criteria: &SuccessCriteria) -> BTreeMap<String, bool> {
        criteria
            .iter()
            .map(|(name, criterion)| {
                let met = self
                    .metric(name)
                    .is_some_and(|value| criterion.is_met_by(value));
                (name.clone(), met)
            })
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    AtLeast,
    AtMost,
}

/// One named target value. Used for reporting only, never to gate execution.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Criterion {
    pub target: f64,
    pub direction: Direction,
}

impl Criterion {
    pub fn at_least(target: f64) -> Self {
        Self {
            target,
            direction: Direction::AtLeast,
        }
    }

    pub fn at_most(target: f64) -> Self {
        Self {
            target,
            direction: Direction::AtMost,
        }
    }

    pub fn is_met_by(&self, value: f64) -> bool {
        match self.direction {
            Direction::AtLeast => value >= self.target,
            Direction::AtMost => value <= self.target,
        }
    }
}

pub type SuccessCriteria = BTreeMap<String, Criterion>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn meets_target_uses_accuracy() {
        let metrics = TrainingMetrics {
            accuracy: 0.96,
            ..Default::default()
        };
        assert!(metrics.meets_target(DEFAULT_TARGET_RELIABILITY));
        assert!(!metrics.meets_target(0.97));
    }

    #[test]
    fn evaluate_handles_both_directions_and_unknown_metrics() {
        let mut metrics = TrainingMetrics {
            accuracy: 0.92,
            cost_reduction: 0.2,
            ..Default::default()
        };
        metrics.signal_rates.insert("false_positive".to_string(), 0.05);

        let mut criteria = SuccessCriteria::new();
        criteria.insert("accuracy".to_string(), Criterion::at_least(0.90));
        criteria.insert("cost_reduction".to_string(), Criterion::at_least(0.30));
        criteria.insert("false_positive".to_string(), Criterion::at_most(0.10));
        criteria.insert("never_seen".to_string(), Criterion::at_least(0.0));

        let report = metrics.evaluate(&criteria);
        assert_eq!(report["accuracy"], true);
        assert_eq!(report["cost_reduction"], false);
        assert_eq!(report["false_positive"], true);
        assert_eq!(report["never_seen"], false);
    }
}
