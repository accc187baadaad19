//! Console output for AgentGym logs.

use log4rs::{
    append::console::{ConsoleAppender, Target},
    encode::pattern::PatternEncoder,
};

pub const DEFAULT_CONSOLE_PATTERN: &str = "[{d(%Y-%m-%d %H:%M:%S%.3f)} {h({l})} {M}] {m}{n}";

/// Stdout appender with the default pattern.
pub fn create_console_appender() -> ConsoleAppender {
    create_custom_console_appender(Target::Stdout, DEFAULT_CONSOLE_PATTERN)
}

/// # Arguments
///
/// * `target` - Stdout or Stderr
/// * `pattern` - log4rs pattern encoder string
pub fn create_custom_console_appender(target: Target, pattern: &str) -> ConsoleAppender {
    ConsoleAppender::builder()
        .target(target)
        .encoder(Box::new(PatternEncoder::new(pattern)))
        .build()
}
