//! Terminal failure handler.
//!
//! The backstop for failures no translator claimed.  One state machine
//! pass per failure:
//!
//! ```text
//! Idle ──► Handling ──► Rendered
//!             │
//!             └───────► RecursivelyFailed   (guard tripped)
//! ```
//!
//! Entering `Handling` is an atomic transition on the request's
//! [`RecursionGuard`](rampart_kernel::http::RecursionGuard); a failure
//! raised while the handler is already rendering takes the
//! `RecursivelyFailed` path — logged to a dependency-free channel, no
//! second render attempt.  Both end states are terminal: the outcome
//! carries a nonzero exit code for embedding front-ends.
//!
//! Render tiers, best first:
//!
//! 1. interactive debug (view engine, non-production, debug on),
//! 2. plain debug (inline HTML, debug on),
//! 3. production (generic page, no details),
//!
//! with any tier-construction failure falling through to the
//! [`emergency`](super::emergency) builder.

use super::emergency;
use rampart_kernel::collab::{FailureLogger, LogLevel, ViewEngine, ViewError};
use rampart_kernel::config::PipelineConfig;
use rampart_kernel::failure::Failure;
use rampart_kernel::http::{RequestContext, Response, wants_json};
use serde_json::{Value, json};
use std::io::Write;
use std::sync::Arc;
use tracing::debug;

// ─────────────────────────────────────────────────────────────────────────────
// Outcome
// ─────────────────────────────────────────────────────────────────────────────

/// End state of one terminal-handling pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminalState {
    /// A response was rendered and emitted.
    Rendered,
    /// The recursion guard tripped; only the bare response was produced.
    RecursivelyFailed,
}

/// The rendered response plus the state the handler finished in.
#[derive(Debug)]
pub struct TerminalOutcome {
    /// Response to emit to the caller.
    pub response: Response,
    /// Which end state the pass reached.
    pub state: TerminalState,
}

impl TerminalOutcome {
    /// Process exit code an embedding front-end should terminate with.
    /// Nonzero for both end states.
    pub fn exit_code(&self) -> i32 {
        1
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Non-fatal diagnostic channel
// ─────────────────────────────────────────────────────────────────────────────

/// A recoverable runtime-level signal reported outside the failure path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuntimeSignal {
    /// Deprecation-class warning; logged, never escalated.
    Deprecation(String),
    /// Any other runtime signal, escalated when it reaches the configured
    /// reporting threshold.
    Runtime {
        /// Severity of the signal.
        level: LogLevel,
        /// Human-readable description.
        message: String,
    },
}

// ─────────────────────────────────────────────────────────────────────────────
// TerminalHandler
// ─────────────────────────────────────────────────────────────────────────────

/// Process-wide terminal handler, registered once at startup and shared
/// across requests.  Holds no per-request state — the recursion guard
/// lives on the request context.
pub struct TerminalHandler {
    config: PipelineConfig,
    logger: Option<Arc<dyn FailureLogger>>,
    views: Option<Arc<dyn ViewEngine>>,
}

impl TerminalHandler {
    /// Build a handler with no logger and no view engine; both fall back
    /// to their dependency-free paths.
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            config,
            logger: None,
            views: None,
        }
    }

    /// Builder: inject the structured logger.
    pub fn with_logger(mut self, logger: Arc<dyn FailureLogger>) -> Self {
        self.logger = Some(logger);
        self
    }

    /// Builder: inject the view engine enabling the interactive debug tier.
    pub fn with_view_engine(mut self, views: Arc<dyn ViewEngine>) -> Self {
        self.views = Some(views);
        self
    }

    /// Handle a failure that escaped the translation pipeline.
    pub fn handle(&self, failure: &Failure, ctx: &RequestContext) -> TerminalOutcome {
        if !ctx.guard().enter() {
            // A failure raised while rendering a failure.  No render
            // attempt — log on the dependency-free channel and bail out
            // with the bare response.
            fallback_log(
                &format!(
                    "recursive terminal failure while handling request {}: {failure}",
                    ctx.request.id
                ),
                &json!({ "kind": failure.kind_name() }),
            );
            return TerminalOutcome {
                response: emergency::bare(),
                state: TerminalState::RecursivelyFailed,
            };
        }

        let discarded = ctx.discard_buffered_output();
        if !discarded.is_empty() {
            debug!(
                request_id = %ctx.request.id,
                bytes = discarded.len(),
                "discarded buffered output before terminal render"
            );
        }

        self.log_failure(failure, ctx);
        TerminalOutcome {
            response: self.render(failure, ctx),
            state: TerminalState::Rendered,
        }
    }

    /// Report a non-fatal runtime signal.
    ///
    /// Deprecation-class signals are logged at warning and never enter
    /// the state machine.  Other signals at or above the configured
    /// reporting threshold return the failure the caller should raise;
    /// below the threshold they are only logged.
    pub fn observe(&self, signal: RuntimeSignal) -> Option<Failure> {
        match signal {
            RuntimeSignal::Deprecation(message) => {
                self.best_effort_log(LogLevel::Warning, &message, &json!({"class": "deprecation"}));
                None
            }
            RuntimeSignal::Runtime { level, message } => {
                if level >= self.config.report_threshold {
                    Some(Failure::internal(message))
                } else {
                    self.best_effort_log(level, &message, &json!({"class": "runtime"}));
                    None
                }
            }
        }
    }

    // ── Logging ──────────────────────────────────────────────────────────────

    /// Log a terminal failure exactly once: the structured logger first,
    /// downgrading to the stderr channel when it is absent or fails.
    fn log_failure(&self, failure: &Failure, ctx: &RequestContext) {
        let message = format!("{}: {failure}", failure.kind_name());
        let context = json!({
            "kind": failure.kind_name(),
            "file": failure.file(),
            "line": failure.line(),
            "request_id": ctx.request.id,
            "path": ctx.request.path,
            "suggestions": failure.suggestions(),
        });
        self.best_effort_log(LogLevel::Error, &message, &context);
    }

    fn best_effort_log(&self, level: LogLevel, message: &str, context: &Value) {
        match &self.logger {
            Some(logger) => {
                if logger.log(level, message, context).is_err() {
                    fallback_log(message, context);
                }
            }
            None => fallback_log(message, context),
        }
    }

    // ── Rendering tiers ──────────────────────────────────────────────────────

    fn render(&self, failure: &Failure, ctx: &RequestContext) -> Response {
        let attempt = match (&self.views, self.config.debug_interactive(), self.config.debug) {
            (Some(views), true, _) => self.render_interactive(views.as_ref(), failure, ctx),
            (_, _, true) => Ok(self.render_debug_page(failure)),
            _ => Ok(render_production()),
        };
        attempt.unwrap_or_else(|_| emergency::build(failure, &ctx.request, self.config.debug))
    }

    /// Tier 1: rich debug via the view engine (or structured JSON for
    /// JSON/AJAX callers).
    fn render_interactive(
        &self,
        views: &dyn ViewEngine,
        failure: &Failure,
        ctx: &RequestContext,
    ) -> Result<Response, ViewError> {
        let data = json!({
            "kind": failure.kind_name(),
            "message": failure.to_string(),
            "file": failure.file(),
            "line": failure.line(),
            "trace": format!("{}", failure.trace()),
            "suggestions": failure.suggestions(),
        });
        if wants_json(&ctx.request) {
            return Ok(Response::json(500, &data));
        }
        let markup = views.render("errors/debug", &data)?;
        Ok(Response::html(500, markup))
    }

    /// Tier 2: minimal self-contained debug page.
    fn render_debug_page(&self, failure: &Failure) -> Response {
        let suggestions = if failure.suggestions().is_empty() {
            String::new()
        } else {
            let items: String = failure
                .suggestions()
                .iter()
                .map(|s| format!("<li>{}</li>", emergency::html_escape(s)))
                .collect();
            format!("<ul>{items}</ul>\n")
        };
        Response::html(
            500,
            format!(
                "<!DOCTYPE html>\n<html><head><title>Internal Server Error</title></head><body>\n\
                 <h1>{kind}</h1>\n<p>{message}</p>\n<p><code>{file}:{line}</code></p>\n{suggestions}\
                 <pre>{trace}</pre>\n</body></html>\n",
                kind = emergency::html_escape(failure.kind_name()),
                message = emergency::html_escape(&failure.to_string()),
                file = emergency::html_escape(failure.file()),
                line = failure.line(),
                trace = emergency::html_escape(&format!("{}", failure.trace())),
            ),
        )
    }
}

/// Tier 3: generic production page, no failure details.
fn render_production() -> Response {
    Response::html(
        500,
        "<!DOCTYPE html>\n<html><head><title>Server Error</title></head><body>\n\
         <h1>Server Error</h1>\n<p>Something went wrong on our end. Please try again later.</p>\n\
         </body></html>\n",
    )
}

/// Dependency-free logging channel of last resort.  Write errors are
/// swallowed — there is nothing left to degrade to.
fn fallback_log(message: &str, context: &Value) {
    let mut stderr = std::io::stderr().lock();
    let _ = writeln!(stderr, "rampart[terminal]: {message} {context}");
}

// =============================================================================
// Tests
// =============================================================================
