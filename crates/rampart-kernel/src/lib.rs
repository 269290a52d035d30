//! `rampart-kernel` — contracts and pure logic for the Rampart
//! fault-handling pipeline.
//!
//! This crate defines the *types, traits, and analyses* the pipeline is
//! built from.  No concrete runtime implementations live here — those
//! belong in `rampart-gateway`.
//!
//! # Architecture mapping
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │              rampart-kernel  (this crate)                   │
//! │  Failure taxonomy          PipelineStage / FailureTranslator│
//! │  Request/Response/Context  TranslatorRegistry               │
//! │  SuggestionEngine          DiagnosticFactory                │
//! │  PipelineConfig + validate()  collaborator contracts        │
//! └──────────────────────────┬──────────────────────────────────┘
//!                            │  depends on
//! ┌──────────────────────────▼──────────────────────────────────┐
//! │              rampart-gateway  (runtime crate)               │
//! │  CsrfGuard / RateLimitStage: impl PipelineStage             │
//! │  HttpStatus/Throttle/Validation translators                 │
//! │  TerminalHandler + EmergencyResponse                        │
//! │  InMemorySession / InMemoryRateLimiter                      │
//! │  axum HTTP server                                           │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Quick start
//!
//! ```rust
//! use rampart_kernel::diagnostics::{ContainerSnapshot, DiagnosticFactory, TypeInfo};
//!
//! let snapshot = ContainerSnapshot::new()
//!     .with_binding("app.mailer", "SmtpMailer")
//!     .with_type("SmtpMailer", TypeInfo::concrete());
//!
//! let failure = DiagnosticFactory::not_found("app.mailers", None, Vec::new(), &snapshot);
//! assert_eq!(failure.to_string(), "No binding found for 'app.mailers'");
//! assert!(!failure.suggestions().is_empty());
//! ```

pub mod collab;
pub mod config;
pub mod diagnostics;
pub mod failure;
pub mod http;
pub mod pipeline;

// ── Flat re-exports ────────────────────────────────────────────────────────

pub use collab::{FailureLogger, LogLevel, LoggerError, RateLimiter, Session, ViewEngine, ViewError};
pub use config::{ConfigError, Environment, PipelineConfig, ThrottleConfig};
pub use diagnostics::{ContainerSnapshot, DiagnosticFactory, TypeInfo, TypeShape};
pub use failure::{ConflictKind, Failure, FailureKind, HttpFacts};
pub use http::{HttpMethod, RecursionGuard, Request, RequestContext, Response};
pub use pipeline::{
    Endpoint, FailureTranslator, PipelineStage, StageOrder, TranslatorPriority, TranslatorRegistry,
};
