//! Fluent builder for AgentGym logging configurations.

use super::LoggingError;
use super::sinks::{console::create_console_appender, file::create_file_appender};
use log::LevelFilter;
use log4rs::config::runtime::ConfigBuilder;
use log4rs::{
    config::{Appender, Config, Logger, Root},
    filter::threshold::ThresholdFilter,
};
use std::path::Path;

/// Builds a log4rs [`Config`] from console and file appenders plus optional
/// per-module levels.
pub struct LoggingBuilder {
    config_builder: ConfigBuilder,
    appenders: Vec<String>,
    level: LevelFilter,
}

impl Default for LoggingBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl LoggingBuilder {
    pub fn new() -> Self {
        Self {
            config_builder: Config::builder(),
            appenders: Vec::new(),
            level: LevelFilter::Info,
        }
    }

    /// Adds a stdout appender that passes records at `level` and above.
    pub fn with_console(mut self, name: &str, level: LevelFilter) -> Self {
        let appender = Appender::builder()
            .filter(Box::new(ThresholdFilter::new(level)))
            .build(name, Box::new(create_console_appender()));

        self.config_builder = self.config_builder.appender(appender);
        self.appenders.push(name.to_string());
        self
    }

    /// Adds a file appender, creating parent directories as needed.
    pub fn with_file(
        mut self,
        name: &str,
        path: &Path,
        level: LevelFilter,
    ) -> Result<Self, LoggingError> {
        if let Some(parent_dir) = path.parent() {
            if !parent_dir.as_os_str().is_empty() {
                std::fs::create_dir_all(parent_dir)?;
            }
        }

        let appender = Appender::builder()
            .filter(Box::new(ThresholdFilter::new(level)))
            .build(name, Box::new(create_file_appender(path)?));

        self.config_builder = self.config_builder.appender(appender);
        self.appenders.push(name.to_string());
        Ok(self)
    }

    /// Root logger level.
    pub fn with_level(mut self, level: LevelFilter) -> Self {
        self.level = level;
        self
    }

    /// Overrides the level for one module path, e.g. `agentgym_framework::trainer`.
    pub fn with_module_level(mut self, module: &str, level: LevelFilter) -> Self {
        let logger = Logger::builder().build(module, level);
        self.config_builder = self.config_builder.logger(logger);
        self
    }

    pub fn build(self) -> Result<Config, LoggingError> {
        if self.appenders.is_empty() {
            return Err(LoggingError::NoAppenders);
        }

        let root = Root::builder().appenders(self.appenders).build(self.level);
        self.config_builder
            .build(root)
            .map_err(|e| LoggingError::Build(e.to_string()))
    }
}
