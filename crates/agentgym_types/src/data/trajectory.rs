//! Step outcomes and the per-episode trajectory that collects them.
//!
//! A trajectory is created fresh by the episode loop for every episode and is
//! dropped once rewards have been broadcast and metrics updated.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One action taken within an episode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepOutcome {
    pub action: String,
    /// Whether the chosen action was right for its case.
    pub correct: bool,
    /// Cost proxy (tokens).
    pub cost: f64,
    /// Latency proxy (seconds).
    pub latency: f64,
    /// Scenario-defined named signals (e.g. `false_positive`, `critical_issue`).
    #[serde(default)]
    pub signals: BTreeMap<String, f64>,
}

impl StepOutcome {
    pub fn new(action: impl Into<String>, correct: bool, cost: f64, latency: f64) -> Self {
        Self {
            action: action.into(),
            correct,
            cost,
            latency,
            signals: BTreeMap::new(),
        }
    }

    pub fn with_signal(mut self, name: impl Into<String>, value: f64) -> Self {
        self.signals.insert(name.into(), value);
        self
    }

    pub fn set_signal(&mut self, name: impl Into<String>, value: f64) {
        self.signals.insert(name.into(), value);
    }

    pub fn signal(&self, name: &str) -> Option<f64> {
        self.signals.get(name).copied()
    }

    /// A signal counts as raised when present and positive.
    pub fn flag(&self, name: &str) -> bool {
        self.signal(name).is_some_and(|v| v > 0.0)
    }
}

/// Ordered step outcomes for one episode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trajectory {
    pub case_id: String,
    pub episode: u64,
    pub success: bool,
    pub steps: Vec<StepOutcome>,
}

impl Trajectory {
    pub fn new(case_id: impl Into<String>, episode: u64) -> Self {
        Self {
            case_id: case_id.into(),
            episode,
            success: false,
            steps: Vec::new(),
        }
    }

    pub fn with_capacity(case_id: impl Into<String>, episode: u64, capacity: usize) -> Self {
        Self {
            case_id: case_id.into(),
            episode,
            success: false,
            steps: Vec::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, step: StepOutcome) {
        self.steps.push(step);
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn steps(&self) -> &[StepOutcome] {
        &self.steps
    }

    pub fn correct_steps(&self) -> usize {
        self.steps.iter().filter(|s| s.correct).count()
    }

    /// Fraction of locally-correct steps; 0.0 for an empty trajectory.
    pub fn accuracy(&self) -> f64 {
        if self.steps.is_empty() {
            0.0
        } else {
            self.correct_steps() as f64 / self.steps.len() as f64
        }
    }

    pub fn total_cost(&self) -> f64 {
        self.steps.iter().map(|s| s.cost).sum()
    }

    pub fn total_latency(&self) -> f64 {
        self.steps.iter().map(|s| s.latency).sum()
    }

    /// Number of steps that raised `signal`.
    pub fn count_flag(&self, signal: &str) -> usize {
        self.steps.iter().filter(|s| s.flag(signal)).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accuracy_counts_correct_steps() {
        let mut trajectory = Trajectory::new("TICKET-001", 0);
        assert_eq!(trajectory.accuracy(), 0.0);

        trajectory.push(StepOutcome::new("search_kb", true, 120.0, 0.8));
        trajectory.push(StepOutcome::new("refund", false, 80.0, 1.2));
        trajectory.push(StepOutcome::new("update_ticket", true, 50.0, 0.5));

        assert_eq!(trajectory.len(), 3);
        assert_eq!(trajectory.correct_steps(), 2);
        assert!((trajectory.accuracy() - 2.0 / 3.0).abs() < 1e-12);
        assert_eq!(trajectory.total_cost(), 250.0);
        assert!((trajectory.total_latency() - 2.5).abs() < 1e-12);
    }

    #[test]
    fn flags_require_positive_signal() {
        let step = StepOutcome::new("add_comment", true, 10.0, 1.0)
            .with_signal("false_positive", 0.0)
            .with_signal("thorough_review", 1.0);
        assert!(!step.flag("false_positive"));
        assert!(step.flag("thorough_review"));
        assert!(!step.flag("missing"));
    }
}
