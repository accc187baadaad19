pub mod base_scenario;
pub mod reward;
