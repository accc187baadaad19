//! # AgentGym Types
//!
//! Data model shared by the scenario and framework crates: session
//! configuration, cases, trajectories, reward vectors, metrics and the final
//! training result.

pub mod config;
pub mod data;
pub mod metrics;
pub mod result;

pub mod prelude {
    pub use crate::config::{
        ConfigError, Framework, TrainingConfig, TrainingConfigBuilder, normalize_scenario_name,
    };
    pub use crate::data::case::{Case, Complexity};
    pub use crate::data::reward::RewardVector;
    pub use crate::data::trajectory::{StepOutcome, Trajectory};
    pub use crate::metrics::{
        Criterion, DEFAULT_TARGET_RELIABILITY, Direction, SuccessCriteria, TrainingMetrics,
    };
    pub use crate::result::{
        CheckpointRecord, ResultRecordError, ResultStatus, TrainingResult, artifact_ref_for,
    };
}
