//! `rampart-gateway` — Rampart fault-handling pipeline runtime.
//!
//! This crate provides the concrete implementations of the kernel
//! contracts defined in `rampart-kernel`:
//!
//! | Kernel contract | Implementation |
//! |----------------|----------------|
//! | [`PipelineStage`](rampart_kernel::pipeline::PipelineStage) | [`filter::CsrfGuard`], [`filter::RateLimitStage`] |
//! | [`FailureTranslator`](rampart_kernel::pipeline::FailureTranslator) | [`filter::HttpStatusTranslator`], [`filter::ThrottleTranslator`], [`filter::ValidationTranslator`] |
//! | [`Session`](rampart_kernel::collab::Session) | [`session::InMemorySession`] |
//! | [`RateLimiter`](rampart_kernel::collab::RateLimiter) | [`limiter::InMemoryRateLimiter`] |
//! | [`FailureLogger`](rampart_kernel::collab::FailureLogger) | [`logger::TracingLogger`], [`logger::StderrLogger`] |
//!
//! [`terminal::TerminalHandler`] backstops everything the translators do
//! not claim, and [`server::GatewayServer`] wires the whole pipeline into
//! an axum HTTP service.

pub mod filter;
pub mod limiter;
pub mod logger;
pub mod server;
pub mod session;
pub mod terminal;

// Re-export the kernel for convenience.
pub use rampart_kernel as kernel;
