//! Failure taxonomy for the request-processing pipeline.
//!
//! [`Failure`] is the single error currency of the pipeline: every fault
//! detected during request processing — an authorization denial, a CSRF
//! mismatch, a rate-limit breach, a validation failure, or a
//! container-resolution problem — is expressed as one immutable `Failure`
//! value, fully formed at construction.  Downstream consumers (translators,
//! the terminal handler, loggers) only ever read it.
//!
//! Variants fall into three classes:
//!
//! - **recoverable-by-translation** — `Authorization`, `TokenMismatch`,
//!   `TooManyRequests`, `Validation`, `HttpStatus`.  Each has exactly one
//!   owning translator in the runtime crate.
//! - **diagnostic** — `ContainerResolution`, `CircularDependency`,
//!   `BindingConflict`.  Always constructed through
//!   [`DiagnosticFactory`](crate::diagnostics::DiagnosticFactory) so every
//!   instance carries remediation suggestions.
//! - **catastrophic** — `Internal`, plus anything no translator claims.
//!   Only the terminal handler accepts these.

use serde_json::Value;
use std::backtrace::Backtrace;
use std::collections::BTreeMap;
use std::panic::Location;
use thiserror::Error;

// ─────────────────────────────────────────────────────────────────────────────
// FailureKind
// ─────────────────────────────────────────────────────────────────────────────

/// The tagged union of recognized failure kinds and their carried data.
///
/// Kind data is immutable once constructed.  `suggestions` lists are
/// de-duplicated and insertion-ordered; `resolution_stack` and
/// `dependency_chain` are snapshots taken at the moment of failure.
#[derive(Debug, Error, PartialEq)]
#[non_exhaustive]
pub enum FailureKind {
    /// The caller is not allowed to perform this action (403).
    #[error("{0}")]
    Authorization(String),

    /// CSRF verification failed (419 "Page Expired").
    #[error("CSRF token mismatch")]
    TokenMismatch,

    /// The caller exhausted its rate-limit allowance (429).
    #[error("Too many requests")]
    TooManyRequests {
        /// Seconds until the caller may retry.
        retry_after_secs: u64,
    },

    /// Request input failed validation (422).
    ///
    /// Field errors preserve insertion order so "the first error message"
    /// is well-defined.
    #[error("The given data was invalid")]
    Validation {
        /// Ordered `field -> messages` pairs.
        errors: Vec<(String, Vec<String>)>,
    },

    /// A caller-supplied HTTP status with optional message and headers.
    #[error("{}", .message.as_deref().unwrap_or(.reason.as_str()))]
    HttpStatus {
        /// HTTP status code to emit.
        status: u16,
        /// Reason phrase, also the body fallback when `message` is absent.
        reason: String,
        /// Extra response headers to attach.
        headers: Vec<(String, String)>,
        /// Optional human-readable body text.
        message: Option<String>,
    },

    /// The container failed to resolve an identifier.
    #[error("{message}")]
    ContainerResolution {
        /// The identifier being resolved, when known.
        abstract_id: Option<String>,
        /// Rendered failure message.
        message: String,
        /// In-flight identifier stack at the moment of failure.
        resolution_stack: Vec<String>,
        /// Ranked remediation suggestions.
        suggestions: Vec<String>,
    },

    /// Resolution re-entered an identifier already being resolved.
    ///
    /// `dependency_chain` never contains the empty string; the full circular
    /// path is `dependency_chain + [abstract_id]`.
    #[error("Circular dependency detected: {}", join_chain(.dependency_chain, .abstract_id))]
    CircularDependency {
        /// The identifier whose resolution closed the cycle.
        abstract_id: String,
        /// Identifiers resolved on the way into the cycle, in order.
        dependency_chain: Vec<String>,
        /// Ranked remediation suggestions.
        suggestions: Vec<String>,
    },

    /// Two container registrations for the same identifier conflict.
    #[error("{message}")]
    BindingConflict {
        /// The identifier both registrations target.
        abstract_id: String,
        /// What kind of conflict was detected.
        conflict: ConflictKind,
        /// Conflict-specific detail fields (`existing_type`, `reason`, …).
        details: BTreeMap<String, Value>,
        /// Message rendered from the per-conflict-type template.
        message: String,
        /// Ranked remediation suggestions.
        suggestions: Vec<String>,
    },

    /// Catch-all for unrecognized or foreign failures (500).
    #[error("{0}")]
    Internal(String),
}

fn join_chain(chain: &[String], abstract_id: &str) -> String {
    format!("{} -> {}", chain.join(" -> "), abstract_id)
}

/// Classification of a binding conflict.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ConflictKind {
    /// The identifier is already bound to a different target.
    Duplicate,
    /// The new registration is incompatible with the existing one.
    Incompatible,
    /// The new registration failed a structural validation check.
    Validation,
    /// Alias resolution loops back onto itself.
    CircularAlias,
    /// A conflict type this taxonomy does not recognize.
    Other(String),
}

impl ConflictKind {
    /// Stable identifier used in messages and logs.
    pub fn as_str(&self) -> &str {
        match self {
            ConflictKind::Duplicate => "duplicate",
            ConflictKind::Incompatible => "incompatible",
            ConflictKind::Validation => "validation",
            ConflictKind::CircularAlias => "circular_alias",
            ConflictKind::Other(name) => name,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Failure
// ─────────────────────────────────────────────────────────────────────────────

/// HTTP-facing facts exposed by the kinds the generic status translator owns.
#[derive(Debug, Clone, Copy)]
pub struct HttpFacts<'a> {
    /// Status code to emit.
    pub status: u16,
    /// Reason phrase.
    pub reason: &'a str,
    /// Extra response headers carried by the failure.
    pub headers: &'a [(String, String)],
}

/// An immutable, typed description of an error condition.
///
/// Carries the [`FailureKind`], the source location where it was raised
/// (captured via `#[track_caller]`), a backtrace, and an optional cause
/// chain.  A `Failure` is created at the point of detection and never
/// mutated afterwards; it is safely shared read-only across concurrent
/// consumers.
#[derive(Debug)]
pub struct Failure {
    kind: FailureKind,
    origin: &'static Location<'static>,
    trace: Backtrace,
    cause: Option<Box<Failure>>,
}

impl Failure {
    /// Wrap a kind into a fully-formed failure, capturing the caller
    /// location and a backtrace.
    #[track_caller]
    pub fn new(kind: FailureKind) -> Self {
        Self {
            kind,
            origin: Location::caller(),
            trace: Backtrace::capture(),
            cause: None,
        }
    }

    /// An authorization denial (403).
    #[track_caller]
    pub fn authorization(message: impl Into<String>) -> Self {
        Self::new(FailureKind::Authorization(message.into()))
    }

    /// A CSRF token mismatch (419 "Page Expired").
    #[track_caller]
    pub fn token_mismatch() -> Self {
        Self::new(FailureKind::TokenMismatch)
    }

    /// A rate-limit breach (429).
    #[track_caller]
    pub fn too_many_requests(retry_after_secs: u64) -> Self {
        Self::new(FailureKind::TooManyRequests { retry_after_secs })
    }

    /// A validation failure (422) with ordered field errors.
    #[track_caller]
    pub fn validation(errors: Vec<(String, Vec<String>)>) -> Self {
        Self::new(FailureKind::Validation { errors })
    }

    /// A generic HTTP-status failure with no message or extra headers.
    #[track_caller]
    pub fn http_status(status: u16, reason: impl Into<String>) -> Self {
        Self::new(FailureKind::HttpStatus {
            status,
            reason: reason.into(),
            headers: Vec::new(),
            message: None,
        })
    }

    /// An unrecognized/foreign failure (500).
    #[track_caller]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(FailureKind::Internal(message.into()))
    }

    /// Builder: set the body message of an `HttpStatus` failure.
    /// No effect on other kinds.
    pub fn with_message(mut self, text: impl Into<String>) -> Self {
        if let FailureKind::HttpStatus { message, .. } = &mut self.kind {
            *message = Some(text.into());
        }
        self
    }

    /// Builder: attach a response header to an `HttpStatus` failure.
    /// No effect on other kinds.
    pub fn with_extra_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        if let FailureKind::HttpStatus { headers, .. } = &mut self.kind {
            headers.push((key.into(), value.into()));
        }
        self
    }

    /// Builder: attach a prior failure as the diagnostic cause.
    pub fn with_cause(mut self, cause: Failure) -> Self {
        self.cause = Some(Box::new(cause));
        self
    }

    // ── Accessors ────────────────────────────────────────────────────────────

    /// The tagged failure kind.
    pub fn kind(&self) -> &FailureKind {
        &self.kind
    }

    /// Variant name, used by debug renders and structured logs.
    pub fn kind_name(&self) -> &'static str {
        match &self.kind {
            FailureKind::Authorization(_) => "Authorization",
            FailureKind::TokenMismatch => "TokenMismatch",
            FailureKind::TooManyRequests { .. } => "TooManyRequests",
            FailureKind::Validation { .. } => "Validation",
            FailureKind::HttpStatus { .. } => "HttpStatus",
            FailureKind::ContainerResolution { .. } => "ContainerResolution",
            FailureKind::CircularDependency { .. } => "CircularDependency",
            FailureKind::BindingConflict { .. } => "BindingConflict",
            FailureKind::Internal(_) => "Internal",
        }
    }

    /// Source file where the failure was raised.
    pub fn file(&self) -> &'static str {
        self.origin.file()
    }

    /// Source line where the failure was raised.
    pub fn line(&self) -> u32 {
        self.origin.line()
    }

    /// Backtrace captured at construction.  Populated only when backtrace
    /// capture is enabled for the process.
    pub fn trace(&self) -> &Backtrace {
        &self.trace
    }

    /// The wrapped prior failure, when one was attached.
    pub fn cause(&self) -> Option<&Failure> {
        self.cause.as_deref()
    }

    /// The HTTP status this failure maps to.
    pub fn status(&self) -> u16 {
        match &self.kind {
            FailureKind::Authorization(_) => 403,
            FailureKind::TokenMismatch => 419,
            FailureKind::TooManyRequests { .. } => 429,
            FailureKind::Validation { .. } => 422,
            FailureKind::HttpStatus { status, .. } => *status,
            FailureKind::ContainerResolution { .. }
            | FailureKind::CircularDependency { .. }
            | FailureKind::BindingConflict { .. }
            | FailureKind::Internal(_) => 500,
        }
    }

    /// Reason phrase matching [`status()`](Self::status).
    pub fn reason_phrase(&self) -> &str {
        match &self.kind {
            FailureKind::Authorization(_) => "Forbidden",
            FailureKind::TokenMismatch => "Page Expired",
            FailureKind::TooManyRequests { .. } => "Too Many Requests",
            FailureKind::Validation { .. } => "Unprocessable Entity",
            FailureKind::HttpStatus { reason, .. } => reason,
            _ => "Internal Server Error",
        }
    }

    /// Status/reason/headers triple, for the kinds the generic HTTP-status
    /// translator owns (`HttpStatus`, `TokenMismatch`, `Authorization`).
    /// `None` for every other kind.
    pub fn http_facts(&self) -> Option<HttpFacts<'_>> {
        const NO_HEADERS: &[(String, String)] = &[];
        match &self.kind {
            FailureKind::HttpStatus {
                status,
                reason,
                headers,
                ..
            } => Some(HttpFacts {
                status: *status,
                reason,
                headers,
            }),
            FailureKind::TokenMismatch | FailureKind::Authorization(_) => Some(HttpFacts {
                status: self.status(),
                reason: self.reason_phrase(),
                headers: NO_HEADERS,
            }),
            _ => None,
        }
    }

    /// Seconds until retry, for `TooManyRequests`.
    pub fn retry_after(&self) -> Option<u64> {
        match &self.kind {
            FailureKind::TooManyRequests { retry_after_secs } => Some(*retry_after_secs),
            _ => None,
        }
    }

    /// Ordered field errors, for `Validation`.
    pub fn validation_errors(&self) -> Option<&[(String, Vec<String>)]> {
        match &self.kind {
            FailureKind::Validation { errors } => Some(errors),
            _ => None,
        }
    }

    /// Remediation suggestions carried by diagnostic kinds.  Empty for
    /// non-diagnostic kinds.
    pub fn suggestions(&self) -> &[String] {
        match &self.kind {
            FailureKind::ContainerResolution { suggestions, .. }
            | FailureKind::CircularDependency { suggestions, .. }
            | FailureKind::BindingConflict { suggestions, .. } => suggestions,
            _ => &[],
        }
    }

    /// The full circular path `chain -> … -> abstract_id`, for
    /// `CircularDependency`.
    pub fn circular_path(&self) -> Option<String> {
        match &self.kind {
            FailureKind::CircularDependency {
                abstract_id,
                dependency_chain,
                ..
            } => Some(join_chain(dependency_chain, abstract_id)),
            _ => None,
        }
    }

    /// Whether `id` participates in a `CircularDependency` cycle — true iff
    /// it appears in the dependency chain or equals the abstract id.
    /// Always false for other kinds.
    pub fn is_in_chain(&self, id: &str) -> bool {
        match &self.kind {
            FailureKind::CircularDependency {
                abstract_id,
                dependency_chain,
                ..
            } => abstract_id == id || dependency_chain.iter().any(|entry| entry == id),
            _ => false,
        }
    }
}

impl std::fmt::Display for Failure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.kind.fmt(f)
    }
}

impl std::error::Error for Failure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.cause.as_ref().map(|c| c.as_ref() as _)
    }
}

// =============================================================================
// Tests
// =============================================================================
