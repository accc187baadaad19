//! The contract every training scenario implements.
//!
//! A scenario produces cases, simulates an acting policy over a case for one
//! episode, and turns the resulting trajectory into per-step rewards. The
//! episode loop only talks to scenarios through this trait, so framework
//! adapters (LangChain, AutoGen, CrewAI) can live behind
//! [`Scenario::simulate_episode`] without the core knowing about them.
//!
//! Implementations must be deterministic for a given RNG state: the loop owns
//! a seeded [`ChaCha8Rng`] and passes it in, and two sessions with the same
//! seed must produce identical metrics.

use agentgym_types::data::case::Case;
use agentgym_types::data::reward::RewardVector;
use agentgym_types::data::trajectory::Trajectory;
use agentgym_types::metrics::SuccessCriteria;
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Lower bound of the simulated per-step success probability.
pub const BASE_SUCCESS_RATE: f64 = 0.6;
/// How much the success probability grows over a full run.
pub const SUCCESS_RATE_GAIN: f64 = 0.35;
/// Upper bound of the simulated per-step success probability.
pub const MAX_SUCCESS_RATE: f64 = 0.95;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ScenarioError {
    #[error("Scenario {0} has no cases to draw from")]
    NoCases(String),
    #[error("Simulation of case {case_id} failed: {reason}")]
    SimulationFailed { case_id: String, reason: String },
    #[error("Scenario error: {0}")]
    Other(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Difficulty {
    Beginner,
    Intermediate,
    Advanced,
}

impl Difficulty {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Beginner => "beginner",
            Self::Intermediate => "intermediate",
            Self::Advanced => "advanced",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Cost and latency of an untrained agent handling one case.
/// A zero field means the scenario does not track that dimension.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Baseline {
    pub cost: f64,
    pub latency: f64,
}

impl Baseline {
    pub fn new(cost: f64, latency: f64) -> Self {
        Self { cost, latency }
    }
}

/// Where an episode sits within its session.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EpisodeContext {
    /// Zero-based episode index.
    pub episode: u64,
    pub total_episodes: u64,
    pub max_steps: usize,
}

impl EpisodeContext {
    pub fn new(episode: u64, total_episodes: u64, max_steps: usize) -> Self {
        Self {
            episode,
            total_episodes,
            max_steps,
        }
    }

    /// Fraction of the run already done, in `[0, 1)`.
    pub fn progress(&self) -> f64 {
        if self.total_episodes == 0 {
            0.0
        } else {
            self.episode as f64 / self.total_episodes as f64
        }
    }

    /// Simulated probability that a step picks the right action.
    pub fn success_rate(&self) -> f64 {
        (BASE_SUCCESS_RATE + self.progress() * SUCCESS_RATE_GAIN).min(MAX_SUCCESS_RATE)
    }
}

/// A training scenario. Object safe so the registry can hand out
/// `Arc<dyn Scenario>`.
pub trait Scenario: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    fn difficulty(&self) -> Difficulty;

    /// Draws the next case for an episode.
    fn generate_case(&self, rng: &mut ChaCha8Rng) -> Result<Case, ScenarioError>;

    /// Runs the acting policy over `case` and returns the step outcomes in
    /// order. Must not produce more than `ctx.max_steps` steps.
    fn simulate_episode(
        &self,
        case: &Case,
        ctx: &EpisodeContext,
        rng: &mut ChaCha8Rng,
    ) -> Result<Trajectory, ScenarioError>;

    /// Per-step rewards for a finished trajectory. The returned vector must
    /// have exactly one entry per step.
    fn broadcast_rewards(&self, trajectory: &Trajectory) -> RewardVector;

    /// Which agent components are trained and which stay frozen.
    fn define_trainable_components(&self) -> BTreeMap<String, bool> {
        default_trainable_components()
    }

    fn success_criteria(&self) -> SuccessCriteria;

    fn baseline(&self) -> Baseline;
}

pub fn default_trainable_components() -> BTreeMap<String, bool> {
    BTreeMap::from([
        ("tool_selection".to_string(), true),
        ("parameter_selection".to_string(), true),
        ("tool_execution".to_string(), false),
        ("output_generation".to_string(), false),
    ])
}

/// Uniformly picks one of `cases`.
pub fn pick_case(
    scenario: &str,
    cases: &[Case],
    rng: &mut ChaCha8Rng,
) -> Result<Case, ScenarioError> {
    if cases.is_empty() {
        return Err(ScenarioError::NoCases(scenario.to_string()));
    }
    let index = rng.random_range(0..cases.len());
    Ok(cases[index].clone())
}

/// Samples whether a step succeeds at probability `rate`, clamped into `[0, 1]`.
pub fn sample_correct(rate: f64, rng: &mut ChaCha8Rng) -> bool {
    rng.random_bool(rate.clamp(0.0, 1.0))
}

/// The action a policy takes instead of `expected` when it gets a step wrong.
pub fn wrong_action(expected: &str, vocabulary: &[&str], rng: &mut ChaCha8Rng) -> String {
    let candidates: Vec<&str> = vocabulary
        .iter()
        .copied()
        .filter(|action| *action != expected)
        .collect();
    if candidates.is_empty() {
        return expected.to_string();
    }
    candidates[rng.random_range(0..candidates.len())].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentgym_types::data::case::Complexity;
    use rand::SeedableRng;

    #[test]
    fn success_rate_ramps_and_caps() {
        let start = EpisodeContext::new(0, 100, 10);
        assert!((start.success_rate() - 0.6).abs() < 1e-12);

        let mid = EpisodeContext::new(50, 100, 10);
        assert!((mid.success_rate() - 0.775).abs() < 1e-12);

        let end = EpisodeContext::new(99, 100, 10);
        assert!(end.success_rate() <= MAX_SUCCESS_RATE);
    }

    #[test]
    fn default_components_train_selection_only() {
        let components = default_trainable_components();
        assert_eq!(components["tool_selection"], true);
        assert_eq!(components["parameter_selection"], true);
        assert_eq!(components["tool_execution"], false);
        assert_eq!(components["output_generation"], false);
    }

    #[test]
    fn pick_case_rejects_empty_pool() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        assert_eq!(
            pick_case("empty", &[], &mut rng),
            Err(ScenarioError::NoCases("empty".to_string()))
        );

        let cases = vec![Case::new("A", "a", "x", Complexity::Easy, vec![])];
        assert_eq!(pick_case("one", &cases, &mut rng).unwrap().id(), "A");
    }

    #[test]
    fn wrong_action_never_returns_expected_when_alternatives_exist() {
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        for _ in 0..50 {
            let action = wrong_action("approve", &["approve", "reject", "add_comment"], &mut rng);
            assert_ne!(action, "approve");
        }
        assert_eq!(wrong_action("approve", &["approve"], &mut rng), "approve");
    }
}
