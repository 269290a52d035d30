//! Collaborator contracts consumed by the pipeline.
//!
//! The pipeline core never talks to a concrete session store, rate limiter,
//! logger, or view engine — only to the traits below.  Concrete
//! implementations live in the runtime crate (`rampart-gateway`); test
//! doubles implement the same traits.
//!
//! All collaborators must be `Send + Sync` so they can be shared across
//! Tokio tasks without additional synchronization by the caller.

use serde_json::Value;
use thiserror::Error;

// ─────────────────────────────────────────────────────────────────────────────
// Session
// ─────────────────────────────────────────────────────────────────────────────

/// Per-request session contract: CSRF token storage and post-redirect
/// flash messaging.
pub trait Session: Send + Sync {
    /// Stage a value to be shown on the next request (flash semantics).
    fn flash(&self, key: &str, value: Value);

    /// The URL the session last remembered, used as a redirect fallback
    /// when the request carries no `Referer` header.
    fn previous_url(&self) -> Option<String>;

    /// The CSRF token stored for this session, when one exists.
    fn token(&self) -> Option<String>;
}

// ─────────────────────────────────────────────────────────────────────────────
// RateLimiter
// ─────────────────────────────────────────────────────────────────────────────

/// Keyed attempt-counting contract backing the rate-limit stage.
///
/// Implementations own their concurrency-safe read/increment semantics;
/// the pipeline only specifies the calling contract.
pub trait RateLimiter: Send + Sync {
    /// Whether `key` has exhausted its allowance of `max_attempts`.
    fn too_many_attempts(&self, key: &str, max_attempts: u32) -> bool;

    /// Record one attempt under `key`; the counter decays after
    /// `decay_secs` seconds.
    fn hit(&self, key: &str, decay_secs: u64);

    /// Attempts left under `key` out of `max_attempts`.
    fn remaining(&self, key: &str, max_attempts: u32) -> u32;

    /// Seconds until the counter under `key` decays.
    fn available_in(&self, key: &str) -> u64;

    /// Unix timestamp at which the counter under `key` decays, when the
    /// key is currently tracked.
    fn available_at(&self, key: &str) -> Option<u64>;
}

// ─────────────────────────────────────────────────────────────────────────────
// FailureLogger
// ─────────────────────────────────────────────────────────────────────────────

/// Severity scale shared by the logger contract and the reporting
/// threshold in [`PipelineConfig`](crate::config::PipelineConfig).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
}

impl LogLevel {
    /// Lowercase name used in rendered log lines.
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warning => "warning",
            LogLevel::Error => "error",
        }
    }
}

/// Error surfaced when a log sink cannot accept a record.
///
/// Callers downgrade to a simpler logging path on this error; they never
/// retry and never propagate it.
#[derive(Debug, Error)]
#[error("log sink failed: {0}")]
pub struct LoggerError(pub String);

/// Injected logging contract used by the terminal handler.
pub trait FailureLogger: Send + Sync {
    /// Write one structured record.  A failing sink returns `Err` so the
    /// caller can fall back to a dependency-free channel.
    fn log(&self, level: LogLevel, message: &str, context: &Value) -> Result<(), LoggerError>;
}

// ─────────────────────────────────────────────────────────────────────────────
// ViewEngine
// ─────────────────────────────────────────────────────────────────────────────

/// Error surfaced when a template cannot be rendered.
#[derive(Debug, Error)]
#[error("view render failed: {0}")]
pub struct ViewError(pub String);

/// Optional template-rendering contract for the interactive debug tier.
///
/// Absence or failure of a view engine must never propagate — consumers
/// always fall back to inline HTML/JSON.
pub trait ViewEngine: Send + Sync {
    /// Render `template` with `data`, returning the finished markup.
    fn render(&self, template: &str, data: &Value) -> Result<String, ViewError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_levels_order_by_severity() {
        assert!(LogLevel::Debug < LogLevel::Info);
        assert!(LogLevel::Info < LogLevel::Warning);
        assert!(LogLevel::Warning < LogLevel::Error);
    }
}
