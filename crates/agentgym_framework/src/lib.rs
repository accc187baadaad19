//! # AgentGym Framework
//!
//! Orchestrates training sessions for LLM-agent scenarios. A session draws
//! simulated cases from a [`Scenario`](agentgym_scenarios::templates::base_scenario::Scenario),
//! broadcasts the episode outcome into per-step rewards, aggregates rolling
//! metrics and finally emits a [`TrainingResult`](agentgym_types::result::TrainingResult).
//!
//! ## Architecture
//!
//! - [`registry`]: name to scenario factory lookup
//! - [`metrics`]: rolling statistics and convergence detection
//! - [`trainer`]: the per-session episode loop
//! - [`session`]: lifecycle state machine and control surface for one session
//! - [`manager`]: creates sessions and routes control calls by id
//! - [`results`]: where finished results and checkpoints are written
//!
//! ```no_run
//! use agentgym_framework::prelude::*;
//! use std::sync::Arc;
//!
//! # async fn run() -> Result<(), SessionManagerError> {
//! let manager = SessionManager::new(Arc::new(ScenarioRegistry::with_builtins()));
//! let config = TrainingConfig::builder("customer_support").episodes(500).seed(7).build()?;
//! let id = manager.create(config)?;
//! let result = manager.wait(id).await?;
//! println!("accuracy {:.3}", result.metrics.accuracy);
//! # Ok(())
//! # }
//! ```

/// **Session Manager**: creates sessions and routes control calls by id.
pub mod manager;

/// **Metrics Aggregation**: rolling statistics over recent episodes.
pub mod metrics;

/// **Scenario Registry**
pub mod registry;

/// **Result Sinks**: persistence for results and checkpoints.
pub mod results;

/// **Training Sessions**: lifecycle and control of a single session.
pub mod session;

/// **Episode Loop**
pub mod trainer;

/// **Utilities**: configuration loading and logging.
pub mod utilities {
    pub mod configuration;
    pub mod observability;
}

pub mod prelude {
    pub use crate::manager::{SessionManager, SessionManagerError, SessionSummary};
    pub use crate::metrics::MetricsAggregator;
    pub use crate::registry::{RegistryError, ScenarioMetadata, ScenarioRegistry};
    pub use crate::results::{JsonFileSink, NullSink, ResultSink, ResultSinkError};
    pub use crate::session::{SessionError, SessionSnapshot, SessionState, TrainingSession};
    pub use crate::trainer::{ControlSignal, EpisodeExecutionError};
    pub use crate::utilities::configuration::{
        FrameworkConfigLoader, LoggingParams, MetricsParams, ResultOutputParams,
    };

    pub use agentgym_scenarios::prelude::*;
    pub use agentgym_types::prelude::*;
}
