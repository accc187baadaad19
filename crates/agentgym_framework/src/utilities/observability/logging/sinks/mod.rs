//! Logging sinks (outputs) used by the AgentGym framework.

pub mod console;
pub mod file;

pub use console::{create_console_appender, create_custom_console_appender};
pub use file::create_file_appender;
