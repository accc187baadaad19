//! AgentGym Logging Module
//!
//! Sessions log lifecycle transitions at `info`, checkpoints at `debug` and
//! failures at `warn`/`error` through the `log` facade. This module installs
//! the log4rs backend behind it.

use crate::utilities::configuration::LoggingParams;
use log::LevelFilter;
use log4rs::{
    append::console::Target,
    config::{Appender, Config, Root},
    filter::threshold::ThresholdFilter,
};
use std::sync::{Mutex, Once};
use thiserror::Error;

pub use log::{Level, debug, error, info, trace, warn};

pub mod builder;
pub mod sinks;

use builder::LoggingBuilder;
use sinks::console::{DEFAULT_CONSOLE_PATTERN, create_custom_console_appender};

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("At least one appender must be configured")]
    NoAppenders,
    #[error("Failed to build log configuration: {0}")]
    Build(String),
    #[error("Failed to initialize logging: {0}")]
    Init(String),
    #[error("Logging was already initialized")]
    AlreadyInitialized,
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

static INIT: Once = Once::new();

/// Installs a stderr logger at `Info`. Later calls, and calls after any other
/// initializer, do nothing.
pub fn init_logging() {
    INIT.call_once(|| {
        let stderr = create_custom_console_appender(Target::Stderr, DEFAULT_CONSOLE_PATTERN);
        let config = Config::builder()
            .appender(
                Appender::builder()
                    .filter(Box::new(ThresholdFilter::new(LevelFilter::Info)))
                    .build("stderr", Box::new(stderr)),
            )
            .build(Root::builder().appender("stderr").build(LevelFilter::Info));

        match config.map_err(|e| e.to_string()).and_then(|config| {
            log4rs::init_config(config)
                .map(|_| ())
                .map_err(|e| e.to_string())
        }) {
            Ok(()) => log::debug!("AgentGym logging initialized with default configuration"),
            Err(e) => eprintln!("Failed to initialize AgentGym logging: {}", e),
        }
    });
}

/// Initializes logging from a log4rs YAML/JSON configuration file.
pub fn init_logging_from_file(config_path: &str) -> Result<(), LoggingError> {
    init_once(|| {
        log4rs::init_file(config_path, Default::default())
            .map_err(|e| LoggingError::Init(e.to_string()))?;
        log::info!("AgentGym logging initialized from config file: {}", config_path);
        Ok(())
    })
}

/// Initializes logging from the `logging` section of the framework config:
/// stderr at the configured level, plus a file appender when a file is set.
pub fn init_logging_from_params(params: &LoggingParams) -> Result<(), LoggingError> {
    init_once(|| {
        let level = params.level_filter();
        let mut builder = LoggingBuilder::new()
            .with_level(level)
            .with_console("console", level);
        if let Some(file) = &params.file {
            builder = builder.with_file("file", file, level)?;
        }
        log4rs::init_config(builder.build()?).map_err(|e| LoggingError::Init(e.to_string()))?;
        Ok(())
    })
}

fn init_once<F>(init: F) -> Result<(), LoggingError>
where
    F: FnOnce() -> Result<(), LoggingError>,
{
    let result = Mutex::new(Err(LoggingError::AlreadyInitialized));
    INIT.call_once(|| {
        if let Ok(mut guard) = result.lock() {
            *guard = init();
        }
    });
    result
        .into_inner()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}
