//! Code review: find the real issues in a pull request, avoid false
//! positives and take the right approve / request-changes decision.

use crate::templates::base_scenario::{
    Baseline, Difficulty, EpisodeContext, Scenario, ScenarioError, pick_case, sample_correct,
    wrong_action,
};
use crate::templates::reward::RewardBroadcaster;
use agentgym_types::data::case::{Case, Complexity};
use agentgym_types::data::reward::RewardVector;
use agentgym_types::data::trajectory::{StepOutcome, Trajectory};
use agentgym_types::metrics::{Criterion, SuccessCriteria};
use rand::Rng;
use rand_chacha::ChaCha8Rng;

pub const NAME: &str = "code_review";

pub const AVAILABLE_ACTIONS: [&str; 11] = [
    "start_review",
    "read_code",
    "add_comment",
    "suggest_change",
    "request_changes",
    "approve",
    "reject",
    "check_tests",
    "check_docs",
    "run_linter",
    "check_security",
];

/// Issue severities, most severe first. Each is also a step signal name.
pub const SEVERITIES: [&str; 4] = ["critical", "high", "medium", "low"];

const BASELINE_SECONDS: f64 = 1800.0;

/// A pull request; issue counts per severity are stored as `issues_<severity>`
/// attributes and the diff size as `loc`.
fn pull_request(
    id: &str,
    title: &str,
    language: &str,
    complexity: Complexity,
    loc: f64,
    issues: [f64; 4],
    actions: &[&str],
) -> Case {
    let mut case = Case::new(
        id,
        title,
        language,
        complexity,
        actions.iter().map(|a| a.to_string()).collect(),
    )
    .with_attribute("loc", loc);
    for (severity, count) in SEVERITIES.iter().zip(issues) {
        case = case.with_attribute(format!("issues_{severity}"), count);
    }
    case
}

pub fn sample_submissions() -> Vec<Case> {
    vec![
        pull_request(
            "PR-001",
            "Add user authentication",
            "python",
            Complexity::Easy,
            50.0,
            [0.0, 1.0, 0.0, 1.0],
            &["add_comment", "request_changes"],
        ),
        pull_request(
            "PR-002",
            "Refactor database queries",
            "python",
            Complexity::Medium,
            150.0,
            [1.0, 0.0, 1.0, 1.0],
            &["add_comment", "request_changes"],
        ),
        pull_request(
            "PR-003",
            "Update documentation",
            "markdown",
            Complexity::Easy,
            30.0,
            [0.0, 0.0, 0.0, 1.0],
            &["add_comment", "approve"],
        ),
        pull_request(
            "PR-004",
            "Implement caching layer",
            "python",
            Complexity::Hard,
            300.0,
            [0.0, 1.0, 2.0, 1.0],
            &["add_comment", "request_changes"],
        ),
        pull_request(
            "PR-005",
            "Fix CSS styling bug",
            "css",
            Complexity::Easy,
            20.0,
            [0.0, 0.0, 0.0, 0.0],
            &["approve"],
        ),
        pull_request(
            "PR-006",
            "Add API rate limiting",
            "python",
            Complexity::Medium,
            100.0,
            [0.0, 1.0, 1.0, 0.0],
            &["add_comment", "request_changes"],
        ),
    ]
}

/// Most severe issue present in the pull request, if any.
fn worst_severity(case: &Case) -> Option<&'static str> {
    SEVERITIES
        .iter()
        .copied()
        .find(|severity| case.attribute(&format!("issues_{severity}")).unwrap_or(0.0) > 0.0)
}

fn is_decision(action: &str) -> bool {
    matches!(action, "approve" | "request_changes" | "reject")
}

pub struct CodeReviewScenario {
    submissions: Vec<Case>,
    rewards: RewardBroadcaster,
}

impl CodeReviewScenario {
    pub fn new() -> Self {
        Self::with_submissions(sample_submissions())
    }

    pub fn with_submissions(submissions: Vec<Case>) -> Self {
        let rewards = RewardBroadcaster::new(15.0, -10.0)
            .with_speed_weight(5.0)
            .with_baseline(Baseline::new(0.0, BASELINE_SECONDS))
            .with_signal("critical", 20.0)
            .with_signal("high", 10.0)
            .with_signal("medium", 5.0)
            .with_signal("low", 2.0)
            .with_signal("false_positive", -15.0)
            .with_signal("appropriate_action", 15.0)
            .with_signal("constructive_feedback", 10.0)
            .with_signal("thorough_review", 8.0);
        Self {
            submissions,
            rewards,
        }
    }

    pub fn submissions(&self) -> &[Case] {
        &self.submissions
    }
}

impl Default for CodeReviewScenario {
    fn default() -> Self {
        Self::new()
    }
}

impl Scenario for CodeReviewScenario {
    fn name(&self) -> &str {
        NAME
    }

    fn description(&self) -> &str {
        "Code review agent training for accurate and thorough reviews"
    }

    fn difficulty(&self) -> Difficulty {
        Difficulty::Intermediate
    }

    fn generate_case(&self, rng: &mut ChaCha8Rng) -> Result<Case, ScenarioError> {
        pick_case(NAME, &self.submissions, rng)
    }

    fn simulate_episode(
        &self,
        case: &Case,
        ctx: &EpisodeContext,
        rng: &mut ChaCha8Rng,
    ) -> Result<Trajectory, ScenarioError> {
        let rate = ctx.success_rate() - case.complexity().error_bias();
        let worst = worst_severity(case);
        let plan = std::iter::once("read_code")
            .chain(case.expected_actions().iter().map(String::as_str))
            .take(ctx.max_steps);

        let mut trajectory = Trajectory::with_capacity(case.id(), ctx.episode, ctx.max_steps);
        for expected in plan {
            let correct = sample_correct(rate, rng);
            let action = if correct {
                expected.to_string()
            } else {
                wrong_action(expected, &AVAILABLE_ACTIONS, rng)
            };
            // Larger diffs take longer to review.
            let loc = case.attribute("loc").unwrap_or(50.0);
            let seconds = rng.random_range(30.0..120.0) + loc * rng.random_range(0.5..1.5);
            let mut step = StepOutcome::new(action, correct, 0.0, seconds)
                .with_signal("false_positive", 0.0);

            if expected == "add_comment" {
                if correct {
                    if let Some(severity) = worst {
                        step.set_signal(severity, 1.0);
                    }
                    step.set_signal("constructive_feedback", 1.0);
                    let thorough = sample_correct(rate, rng);
                    step.set_signal("thorough_review", if thorough { 1.0 } else { 0.0 });
                } else {
                    step.set_signal("false_positive", 1.0);
                    step.set_signal("thorough_review", 0.0);
                }
            } else if is_decision(expected) {
                step.set_signal("appropriate_action", if correct { 1.0 } else { 0.0 });
                // Requesting changes on a clean PR is a false positive.
                if !correct && worst.is_none() && step.action == "request_changes" {
                    step.set_signal("false_positive", 1.0);
                }
            }
            trajectory.push(step);
        }

        trajectory.success =
            !trajectory.is_empty() && trajectory.correct_steps() == trajectory.len();
        Ok(trajectory)
    }

    fn broadcast_rewards(&self, trajectory: &Trajectory) -> RewardVector {
        self.rewards.broadcast(trajectory)
    }

    fn success_criteria(&self) -> SuccessCriteria {
        SuccessCriteria::from([
            ("accuracy".to_string(), Criterion::at_least(0.90)),
            ("false_positive".to_string(), Criterion::at_most(0.10)),
            ("thorough_review".to_string(), Criterion::at_least(0.85)),
        ])
    }

    fn baseline(&self) -> Baseline {
        Baseline::new(0.0, BASELINE_SECONDS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn worst_severity_prefers_most_severe() {
        let submissions = sample_submissions();
        assert_eq!(worst_severity(&submissions[0]), Some("high"));
        assert_eq!(worst_severity(&submissions[1]), Some("critical"));
        assert_eq!(worst_severity(&submissions[4]), None);
    }

    #[test]
    fn review_starts_by_reading_code() {
        let scenario = CodeReviewScenario::new();
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let case = scenario.submissions()[0].clone();
        let ctx = EpisodeContext::new(5, 10, 100);

        let trajectory = scenario.simulate_episode(&case, &ctx, &mut rng).unwrap();
        assert_eq!(trajectory.len(), 3);
        let comment = &trajectory.steps()[1];
        if comment.correct {
            assert!(comment.flag("high"));
            assert!(comment.flag("constructive_feedback"));
        } else {
            assert!(comment.flag("false_positive"));
        }
        assert!(trajectory.steps()[2].signal("appropriate_action").is_some());
    }

    #[test]
    fn criteria_bound_false_positives_from_above() {
        let criteria = CodeReviewScenario::new().success_criteria();
        assert!(criteria["false_positive"].is_met_by(0.05));
        assert!(!criteria["false_positive"].is_met_by(0.2));
    }
}
