//! # AgentGym Scenarios
//!
//! The [`Scenario`](templates::base_scenario::Scenario) contract, the reward
//! broadcaster shared by scenario implementations, and the built-in scenarios:
//!
//! - `customer_support` (beginner)
//! - `code_review` (intermediate)
//! - `data_analysis` (advanced)

/// **Scenario Templates**: the trait scenarios implement plus reusable reward
/// and simulation helpers.
pub mod templates;

/// **Built-in Scenarios**
pub mod scenarios;

use scenarios::code_review::CodeReviewScenario;
use scenarios::customer_support::CustomerSupportScenario;
use scenarios::data_analysis::DataAnalysisScenario;
use templates::base_scenario::Scenario;

/// Constructor for a fresh scenario instance.
pub type ScenarioConstructor = fn() -> Box<dyn Scenario>;

fn customer_support() -> Box<dyn Scenario> {
    Box::new(CustomerSupportScenario::new())
}

fn code_review() -> Box<dyn Scenario> {
    Box::new(CodeReviewScenario::new())
}

fn data_analysis() -> Box<dyn Scenario> {
    Box::new(DataAnalysisScenario::new())
}

/// Name and constructor of every built-in scenario.
pub fn builtin_scenarios() -> Vec<(&'static str, ScenarioConstructor)> {
    vec![
        (scenarios::customer_support::NAME, customer_support as ScenarioConstructor),
        (scenarios::code_review::NAME, code_review as ScenarioConstructor),
        (scenarios::data_analysis::NAME, data_analysis as ScenarioConstructor),
    ]
}

pub mod prelude {
    pub use crate::ScenarioConstructor;
    pub use crate::builtin_scenarios;
    pub use crate::scenarios::code_review::CodeReviewScenario;
    pub use crate::scenarios::customer_support::CustomerSupportScenario;
    pub use crate::scenarios::data_analysis::DataAnalysisScenario;
    pub use crate::templates::base_scenario::{
        Baseline, Difficulty, EpisodeContext, Scenario, ScenarioError,
        default_trainable_components,
    };
    pub use crate::templates::reward::RewardBroadcaster;
}
