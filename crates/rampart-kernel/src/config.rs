//! Pipeline configuration container and validation.
//!
//! [`PipelineConfig`] aggregates the knobs the fault-handling pipeline
//! reads — debug mode, environment, CSRF exemptions, throttle parameters,
//! and the non-fatal reporting threshold — and exposes a single
//! [`validate()`](PipelineConfig::validate) method that checks all
//! structural invariants before any runtime resources are allocated.

use crate::collab::LogLevel;
use serde::Deserialize;
use thiserror::Error;

/// Configuration error detected by [`PipelineConfig::validate`].
#[derive(Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum ConfigError {
    /// `max_attempts` is zero, which would reject every request.
    #[error("throttle max_attempts must be greater than 0")]
    InvalidMaxAttempts,

    /// `decay_secs` is zero, which would never release a counter.
    #[error("throttle decay_secs must be greater than 0")]
    InvalidDecay,

    /// A CSRF exemption pattern is empty or whitespace-only.
    #[error("csrf exemption patterns cannot be empty")]
    EmptyExemptPattern,

    /// The TOML source could not be parsed.
    #[error("config parse error: {0}")]
    Parse(String),
}

/// Deployment environment the pipeline runs in.
///
/// The interactive debug tier is only offered outside production.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Development,
    Testing,
    Production,
}

impl Environment {
    /// Lowercase name used in logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Testing => "testing",
            Environment::Production => "production",
        }
    }
}

/// Rate-limit parameters for the throttle stage.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ThrottleConfig {
    /// Allowed attempts per decay window (must be > 0).
    pub max_attempts: u32,
    /// Seconds before an attempt counter decays (must be > 0).
    pub decay_secs: u64,
    /// Optional prefix namespacing the hashed rate-limit keys.
    #[serde(default)]
    pub key_prefix: Option<String>,
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self {
            max_attempts: 60,
            decay_secs: 60,
            key_prefix: None,
        }
    }
}

impl ThrottleConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_attempts == 0 {
            return Err(ConfigError::InvalidMaxAttempts);
        }
        if self.decay_secs == 0 {
            return Err(ConfigError::InvalidDecay);
        }
        Ok(())
    }
}

/// Top-level pipeline configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PipelineConfig {
    /// Whether debug renders (with failure details) are allowed.
    #[serde(default)]
    pub debug: bool,
    /// Deployment environment.
    #[serde(default = "default_environment")]
    pub environment: Environment,
    /// CSRF exemption patterns: exact paths, or prefixes ending in `*`.
    #[serde(default)]
    pub csrf_exempt: Vec<String>,
    /// Throttle-stage parameters.
    #[serde(default)]
    pub throttle: ThrottleConfig,
    /// Non-fatal signals at or above this level escalate to failures.
    #[serde(default = "default_report_threshold")]
    pub report_threshold: LogLevel,
}

fn default_environment() -> Environment {
    Environment::Production
}

fn default_report_threshold() -> LogLevel {
    LogLevel::Error
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            debug: false,
            environment: default_environment(),
            csrf_exempt: Vec::new(),
            throttle: ThrottleConfig::default(),
            report_threshold: default_report_threshold(),
        }
    }
}

impl PipelineConfig {
    /// Production defaults: debug off, no exemptions.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: enable or disable debug renders.
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Builder: set the environment.
    pub fn with_environment(mut self, environment: Environment) -> Self {
        self.environment = environment;
        self
    }

    /// Builder: add a CSRF exemption pattern.
    pub fn with_csrf_exempt(mut self, pattern: impl Into<String>) -> Self {
        self.csrf_exempt.push(pattern.into());
        self
    }

    /// Builder: set the throttle parameters.
    pub fn with_throttle(mut self, throttle: ThrottleConfig) -> Self {
        self.throttle = throttle;
        self
    }

    /// Builder: set the non-fatal reporting threshold.
    pub fn with_report_threshold(mut self, threshold: LogLevel) -> Self {
        self.report_threshold = threshold;
        self
    }

    /// Whether the interactive (view-engine) debug tier may be offered:
    /// debug must be on and the environment must not be production.
    pub fn debug_interactive(&self) -> bool {
        self.debug && self.environment != Environment::Production
    }

    /// Validate all structural invariants of this configuration.
    ///
    /// Returns the *first* detected [`ConfigError`].
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.throttle.validate()?;
        if self
            .csrf_exempt
            .iter()
            .any(|pattern| pattern.trim().is_empty())
        {
            return Err(ConfigError::EmptyExemptPattern);
        }
        Ok(())
    }

    /// Parse and validate a TOML document.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: Self =
            toml::from_str(source).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_production_safe() {
        let config = PipelineConfig::default();
        assert!(!config.debug);
        assert_eq!(config.environment, Environment::Production);
        assert!(!config.debug_interactive());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn debug_interactive_requires_non_production() {
        let config = PipelineConfig::new()
            .with_debug(true)
            .with_environment(Environment::Development);
        assert!(config.debug_interactive());

        let prod = PipelineConfig::new().with_debug(true);
        assert!(!prod.debug_interactive());
    }

    #[test]
    fn zero_max_attempts_is_rejected() {
        let config = PipelineConfig::new().with_throttle(ThrottleConfig {
            max_attempts: 0,
            decay_secs: 60,
            key_prefix: None,
        });
        assert_eq!(config.validate(), Err(ConfigError::InvalidMaxAttempts));
    }

    #[test]
    fn zero_decay_is_rejected() {
        let config = PipelineConfig::new().with_throttle(ThrottleConfig {
            max_attempts: 10,
            decay_secs: 0,
            key_prefix: None,
        });
        assert_eq!(config.validate(), Err(ConfigError::InvalidDecay));
    }

    #[test]
    fn whitespace_exemption_pattern_is_rejected() {
        let config = PipelineConfig::new().with_csrf_exempt("   ");
        assert_eq!(config.validate(), Err(ConfigError::EmptyExemptPattern));
    }

    #[test]
    fn toml_round_trip() {
        let config = PipelineConfig::from_toml_str(
            r#"
            debug = true
            environment = "development"
            csrf_exempt = ["/webhooks/*", "/health"]
            report_threshold = "warning"

            [throttle]
            max_attempts = 30
            decay_secs = 120
            key_prefix = "api"
            "#,
        )
        .unwrap();
        assert!(config.debug);
        assert_eq!(config.environment, Environment::Development);
        assert_eq!(config.csrf_exempt.len(), 2);
        assert_eq!(config.throttle.max_attempts, 30);
        assert_eq!(config.report_threshold, crate::collab::LogLevel::Warning);
    }

    #[test]
    fn malformed_toml_is_a_parse_error() {
        let err = PipelineConfig::from_toml_str("debug = maybe").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
