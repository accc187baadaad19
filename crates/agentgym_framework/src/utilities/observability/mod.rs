// AgentGym Observability Module
//
// Logging for the session runtime and the CLI.

pub mod logging;

/// Initialize all observability components with their defaults.
pub fn init_observability() {
    logging::init_logging();
}
