//! Data analysis: work a dataset through cleaning, modelling and
//! visualization to accurate, actionable insights.

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

pub const NAME: &str = "data_analysis";

pub const AVAILABLE_ACTIONS: [&str; 15] = [
    "load_data",
    "inspect_data",
    "clean_data",
    "handle_missing_values",
    "remove_duplicates",
    "normalize_features",
    "calculate_statistics",
    "perform_correlation",
    "perform_clustering",
    "build_model",
    "validate_model",
    "create_visualization",
    "generate_insights",
    "generate_report",
    "export_results",
];

const BASELINE_SECONDS: f64 = 3600.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StepKind {
    Ingest,
    Modelling,
    Visualization,
    Insight,
    Other,
}

fn step_kind(action: &str) -> StepKind {
    match action {
        "load_data" | "clean_data" | "handle_missing_values" | "preprocess_time_series" => {
            StepKind::Ingest
        }
        "perform_clustering" | "build_model" | "validate_forecast" | "perform_statistical_test"
        | "calculate_confidence" | "detect_anomalies" | "check_stationarity" => {
            StepKind::Modelling
        }
        "create_visualization" | "create_dashboard" => StepKind::Visualization,
        "generate_insights" | "generate_report" | "generate_recommendation" => StepKind::Insight,
        _ => StepKind::Other,
    }
}

fn task(
    id: &str,
    title: &str,
    dataset: &str,
    complexity: Complexity,
    steps: &[&str],
    insights: f64,
    visualizations: f64,
) -> Case {
    Case::new(
        id,
        title,
        dataset,
        complexity,
        steps.iter().map(|s| s.to_string()).collect(),
    )
    .with_attribute("expected_insights", insights)
    .with_attribute("expected_visualizations", visualizations)
}

pub fn sample_tasks() -> Vec<Case> {
    vec![
        task(
            "TASK-001",
            "Sales trend analysis",
            "sales_data.csv",
            Complexity::Easy,
            &[
                "load_data",
                "clean_data",
                "calculate_trends",
                "create_visualization",
                "generate_insights",
            ],
            3.0,
            2.0,
        ),
        task(
            "TASK-002",
            "Customer segmentation",
            "customer_data.csv",
            Complexity::Medium,
            &[
                "load_data",
                "handle_missing_values",
                "normalize_features",
                "perform_clustering",
                "analyze_segments",
                "create_visualization",
                "generate_report",
            ],
            5.0,
            3.0,
        ),
        task(
            "TASK-003",
            "Product performance metrics",
            "product_metrics.csv",
            Complexity::Easy,
            &["load_data", "calculate_kpis", "compare_products", "create_dashboard"],
            4.0,
            4.0,
        ),
        task(
            "TASK-004",
            "Time series forecasting",
            "time_series.csv",
            Complexity::Hard,
            &[
                "load_data",
                "check_stationarity",
                "handle_seasonality",
                "build_model",
                "validate_forecast",
                "create_visualization",
                "generate_insights",
            ],
            6.0,
            3.0,
        ),
        task(
            "TASK-005",
            "A/B test analysis",
            "ab_test_results.csv",
            Complexity::Medium,
            &[
                "load_data",
                "check_sample_size",
                "perform_statistical_test",
                "calculate_confidence",
                "create_visualization",
                "generate_recommendation",
            ],
            4.0,
            2.0,
        ),
        task(
            "TASK-006",
            "Anomaly detection",
            "system_metrics.csv",
            Complexity::Hard,
            &[
                "load_data",
                "preprocess_time_series",
                "detect_anomalies",
                "analyze_patterns",
                "prioritize_alerts",
                "create_visualization",
                "generate_report",
            ],
            5.0,
            4.0,
        ),
    ]
}

fn flag(raised: bool) -> f64 {
    if raised {
        1.0
    } else {
        0.0
    }
}

pub struct DataAnalysisScenario {
    tasks: Vec<Case>,
    rewards: RewardBroadcaster,
}

impl DataAnalysisScenario {
    pub fn new() -> Self {
        Self::with_tasks(sample_tasks())
    }

    pub fn with_tasks(tasks: Vec<Case>) -> Self {
        let rewards = RewardBroadcaster::new(12.0, -8.0)
            .with_speed_weight(5.0)
            .with_baseline(Baseline::new(0.0, BASELINE_SECONDS))
            .with_signal("high_data_quality", 15.0)
            .with_signal("low_data_quality", -10.0)
            .with_signal("insight_accurate", 20.0)
            .with_signal("insight_inaccurate", -10.0)
            .with_signal("visualization_clear", 10.0)
            .with_signal("thorough_analysis", 12.0)
            .with_signal("statistically_valid", 8.0)
            .with_signal("actionable_insight", 10.0);
        Self { tasks, rewards }
    }

    pub fn tasks(&self) -> &[Case] {
        &self.tasks
    }
}

impl Default for DataAnalysisScenario {
    fn default() -> Self {
        Self::new()
    }
}

impl Scenario for DataAnalysisScenario {
    fn name(&self) -> &str {
        NAME
    }

    fn description(&self) -> &str {
        "Data analysis agent training for accurate insights and clear visualizations"
    }

    fn difficulty(&self) -> Difficulty {
        Difficulty::Advanced
    }

    fn generate_case(&self, rng: &mut ChaCha8Rng) -> Result<Case, ScenarioError> {
        pick_case(NAME, &self.tasks, rng)
    }

    fn simulate_episode(
        &self,
        case: &Case,
        ctx: &EpisodeContext,
        rng: &mut ChaCha8Rng,
    ) -> Result<Trajectory, ScenarioError> {
        let rate = ctx.success_rate() - case.complexity().error_bias();
        let mut trajectory = Trajectory::with_capacity(case.id(), ctx.episode, ctx.max_steps);

        for expected in case.expected_actions().iter().take(ctx.max_steps) {
            let correct = sample_correct(rate, rng);
            let action = if correct {
                expected.clone()
            } else {
                wrong_action(expected, &AVAILABLE_ACTIONS, rng)
            };
            let seconds = rng.random_range(60.0..300.0);
            let mut step = StepOutcome::new(action, correct, 0.0, seconds);

            match step_kind(expected) {
                StepKind::Ingest => {
                    step.set_signal("high_data_quality", flag(correct));
                    step.set_signal("low_data_quality", flag(!correct));
                }
                StepKind::Modelling => {
                    step.set_signal("statistically_valid", flag(correct));
                }
                StepKind::Visualization => {
                    step.set_signal("visualization_clear", flag(correct));
                }
                StepKind::Insight => {
                    step.set_signal("insight_accurate", flag(correct));
                    step.set_signal("insight_inaccurate", flag(!correct));
                    let actionable = correct && sample_correct(rate, rng);
                    step.set_signal("actionable_insight", flag(actionable));
                }
                StepKind::Other => {}
            }
            trajectory.push(step);
        }

        let all_correct = !trajectory.is_empty() && trajectory.correct_steps() == trajectory.len();
        // Only a fully planned run counts as thorough.
        let complete = trajectory.len() == case.expected_actions().len();
        if let Some(last) = trajectory.steps.last_mut() {
            last.set_signal("thorough_analysis", flag(all_correct && complete));
        }
        trajectory.success = all_correct;
        Ok(trajectory)
    }

    fn broadcast_rewards(&self, trajectory: &Trajectory) -> RewardVector {
        self.rewards.broadcast(trajectory)
    }

    fn success_criteria(&self) -> SuccessCriteria {
        SuccessCriteria::from([
            ("accuracy".to_string(), Criterion::at_least(0.85)),
            ("high_data_quality".to_string(), Criterion::at_least(0.90)),
            ("actionable_insight".to_string(), Criterion::at_least(0.80)),
            ("visualization_clear".to_string(), Criterion::at_least(0.85)),
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
    fn steps_carry_signals_for_their_kind() {
        let scenario = DataAnalysisScenario::new();
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let case = scenario.tasks()[0].clone();
        let ctx = EpisodeContext::new(0, 100, 100);

        let trajectory = scenario.simulate_episode(&case, &ctx, &mut rng).unwrap();
        assert_eq!(trajectory.len(), 5);
        assert!(trajectory.steps()[0].signal("high_data_quality").is_some());
        assert!(trajectory.steps()[3].signal("visualization_clear").is_some());
        assert!(trajectory.steps()[4].signal("insight_accurate").is_some());
        assert!(trajectory.steps()[4].signal("thorough_analysis").is_some());
    }

    #[test]
    fn truncated_run_is_never_thorough() {
        let scenario = DataAnalysisScenario::new();
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let case = scenario.tasks()[1].clone();
        let ctx = EpisodeContext::new(0, 10, 2);
        let trajectory = scenario.simulate_episode(&case, &ctx, &mut rng).unwrap();
        assert_eq!(trajectory.len(), 2);
        assert!(!trajectory.steps()[1].flag("thorough_analysis"));
    }
}
