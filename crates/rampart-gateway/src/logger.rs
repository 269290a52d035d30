//! Logger implementations for the terminal handler.
//!
//! [`TracingLogger`] is the structured default, forwarding to the
//! `tracing` macros; [`StderrLogger`] is the dependency-free fallback the
//! handler downgrades to when the structured sink fails.

use rampart_kernel::collab::{FailureLogger, LogLevel, LoggerError};
use serde_json::Value;
use std::io::Write;

/// Structured logger forwarding to `tracing`.
#[derive(Default)]
pub struct TracingLogger;

impl TracingLogger {
    /// New tracing-backed logger.
    pub fn new() -> Self {
        Self
    }
}

impl FailureLogger for TracingLogger {
    fn log(&self, level: LogLevel, message: &str, context: &Value) -> Result<(), LoggerError> {
        match level {
            LogLevel::Debug => tracing::debug!(context = %context, "{message}"),
            LogLevel::Info => tracing::info!(context = %context, "{message}"),
            LogLevel::Warning => tracing::warn!(context = %context, "{message}"),
            LogLevel::Error => tracing::error!(context = %context, "{message}"),
        }
        Ok(())
    }
}

/// Plain-text logger writing straight to stderr.
#[derive(Default)]
pub struct StderrLogger;

impl StderrLogger {
    /// New stderr logger.
    pub fn new() -> Self {
        Self
    }
}

impl FailureLogger for StderrLogger {
    fn log(&self, level: LogLevel, message: &str, context: &Value) -> Result<(), LoggerError> {
        let mut stderr = std::io::stderr().lock();
        writeln!(stderr, "rampart[{}]: {message} {context}", level.as_str())
            .map_err(|e| LoggerError(e.to_string()))
    }
}
