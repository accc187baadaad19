//! File output for AgentGym logs.

use log4rs::{append::file::FileAppender, encode::pattern::PatternEncoder};
use std::path::Path;

pub const DEFAULT_FILE_PATTERN: &str = "[{d(%Y-%m-%d %H:%M:%S%.3f)} {l} {M}] {m}{n}";

/// Appends to `path`, creating the file if needed. No rotation.
pub fn create_file_appender(path: &Path) -> std::io::Result<FileAppender> {
    FileAppender::builder()
        .encoder(Box::new(PatternEncoder::new(DEFAULT_FILE_PATTERN)))
        .append(true)
        .build(path)
}
