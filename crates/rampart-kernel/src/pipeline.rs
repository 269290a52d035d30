//! Pipeline stage and translator contracts.
//!
//! A request flows through an ordered list of [`PipelineStage`] instances
//! wrapping the downstream [`Endpoint`].  Stages run their `before` hooks
//! in ascending [`StageOrder`] on the way in and their `after` hooks in
//! descending order on the way out:
//!
//! ```text
//! Request  ──► Csrf ──► RateLimit ──► Logging ──► Endpoint
//! Response ◄── Csrf ◄── RateLimit ◄── Logging ◄──────┘
//! ```
//!
//! Any hook (or the endpoint itself) may raise a [`Failure`].  A raised
//! failure is offered to the registered [`FailureTranslator`]s in priority
//! order; the first whose `matches` accepts it owns it and converts it to
//! a response.  Failures no translator claims propagate to the terminal
//! handler.

use crate::failure::Failure;
use crate::http::{RequestContext, Response};
use async_trait::async_trait;
use std::cmp::Reverse;
use std::sync::Arc;

// ─────────────────────────────────────────────────────────────────────────────
// Stage ordering
// ─────────────────────────────────────────────────────────────────────────────

/// Numeric ordering slot for a producing stage in the pipeline.
///
/// The well-known slots below act as guidelines; any `u32` value is
/// accepted so implementors can slot in custom stages between the
/// standard phases.  Stages with equal order values are executed in
/// registration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct StageOrder(pub u32);

impl StageOrder {
    /// Executes before all verification logic (e.g. request ID injection).
    pub const PRE: StageOrder = StageOrder(0);
    /// CSRF verification slot.
    pub const CSRF: StageOrder = StageOrder(100);
    /// Rate-limiting / throttling slot.
    pub const RATE_LIMIT: StageOrder = StageOrder(200);
    /// Audit logging slot — runs closest to the endpoint.
    pub const LOGGING: StageOrder = StageOrder(400);
}

// ─────────────────────────────────────────────────────────────────────────────
// PipelineStage
// ─────────────────────────────────────────────────────────────────────────────

/// A producing stage wrapping the downstream endpoint.
///
/// Stages verify preconditions (`before`) and decorate successful
/// responses (`after`).  A stage signals a violated precondition by
/// raising the matching [`Failure`]; it never builds a response directly.
#[async_trait]
pub trait PipelineStage: Send + Sync {
    /// Stable, human-readable identifier for this stage (used in logs).
    fn name(&self) -> &str;

    /// Position in the stage chain.  Lower values execute first on the
    /// request path.
    fn order(&self) -> StageOrder;

    /// Called before the downstream endpoint.  Raising a failure here
    /// skips the endpoint and every later stage.
    async fn before(&self, ctx: &mut RequestContext) -> Result<(), Failure>;

    /// Called with the successful response on the way out.  Stages that
    /// have nothing to decorate keep the default no-op.
    async fn after(&self, ctx: &RequestContext, resp: &mut Response) -> Result<(), Failure> {
        let _ = (ctx, resp);
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Endpoint
// ─────────────────────────────────────────────────────────────────────────────

/// The downstream request handler the pipeline wraps.
#[async_trait]
pub trait Endpoint: Send + Sync {
    /// Handle the request, producing a response or raising a failure.
    async fn call(&self, ctx: &RequestContext) -> Result<Response, Failure>;
}

// ─────────────────────────────────────────────────────────────────────────────
// FailureTranslator
// ─────────────────────────────────────────────────────────────────────────────

/// Priority slot for a translator; higher values are consulted first.
///
/// Ties between equal priorities resolve to registration order (first
/// registered wins).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct TranslatorPriority(pub u32);

impl TranslatorPriority {
    /// Rate-limit breaches — most specific.
    pub const THROTTLE: TranslatorPriority = TranslatorPriority(300);
    /// Validation failures.
    pub const VALIDATION: TranslatorPriority = TranslatorPriority(200);
    /// Generic HTTP-status failures — the catch-most slot.
    pub const HTTP_STATUS: TranslatorPriority = TranslatorPriority(100);
}

/// A translator owning exactly one failure kind.
///
/// Translators convert the failures they own into protocol responses plus
/// side effects (session flashes, headers).  They never claim kinds they
/// do not own — such failures pass through to the terminal handler.
#[async_trait]
pub trait FailureTranslator: Send + Sync {
    /// Stable, human-readable identifier for this translator.
    fn name(&self) -> &str;

    /// Priority slot; higher values are consulted first.
    fn priority(&self) -> TranslatorPriority;

    /// Whether this translator owns the given failure.
    fn matches(&self, failure: &Failure) -> bool;

    /// Convert an owned failure into a response, applying side effects.
    async fn translate(&self, failure: &Failure, ctx: &RequestContext) -> Response;
}

// ─────────────────────────────────────────────────────────────────────────────
// TranslatorRegistry
// ─────────────────────────────────────────────────────────────────────────────

/// Ordered set of translator registrations.
///
/// Registrations are consulted by descending priority; ties break to
/// registration order.  The first translator whose predicate accepts a
/// failure owns it.
pub struct TranslatorRegistry {
    translators: Vec<Arc<dyn FailureTranslator>>,
}

impl TranslatorRegistry {
    /// Build a registry, sorting by descending priority.  The sort is
    /// stable, so equal priorities keep their registration order.
    pub fn new(mut translators: Vec<Arc<dyn FailureTranslator>>) -> Self {
        translators.sort_by_key(|t| Reverse(t.priority()));
        Self { translators }
    }

    /// The translator that owns `failure`, if any claims it.
    pub fn claim(&self, failure: &Failure) -> Option<&Arc<dyn FailureTranslator>> {
        self.translators.iter().find(|t| t.matches(failure))
    }

    /// Registered translators in consultation order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn FailureTranslator>> {
        self.translators.iter()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::failure::FailureKind;
    use crate::http::Response;

    struct Claimer {
        name: &'static str,
        priority: u32,
    }

    #[async_trait]
    impl FailureTranslator for Claimer {
        fn name(&self) -> &str {
            self.name
        }
        fn priority(&self) -> TranslatorPriority {
            TranslatorPriority(self.priority)
        }
        fn matches(&self, failure: &Failure) -> bool {
            matches!(failure.kind(), FailureKind::Internal(_))
        }
        async fn translate(&self, _failure: &Failure, _ctx: &RequestContext) -> Response {
            Response::new(500)
        }
    }

    #[test]
    fn higher_priority_is_consulted_first() {
        let registry = TranslatorRegistry::new(vec![
            Arc::new(Claimer {
                name: "low",
                priority: 100,
            }),
            Arc::new(Claimer {
                name: "high",
                priority: 300,
            }),
        ]);
        let failure = Failure::internal("boom");
        assert_eq!(registry.claim(&failure).unwrap().name(), "high");
    }

    #[test]
    fn priority_ties_resolve_to_registration_order() {
        let registry = TranslatorRegistry::new(vec![
            Arc::new(Claimer {
                name: "first",
                priority: 200,
            }),
            Arc::new(Claimer {
                name: "second",
                priority: 200,
            }),
        ]);
        let failure = Failure::internal("boom");
        assert_eq!(registry.claim(&failure).unwrap().name(), "first");
    }

    #[test]
    fn unclaimed_failures_return_none() {
        let registry = TranslatorRegistry::new(vec![]);
        assert!(registry.claim(&Failure::internal("boom")).is_none());
    }

    struct NoopStage;

    #[async_trait]
    impl PipelineStage for NoopStage {
        fn name(&self) -> &str {
            "noop"
        }
        fn order(&self) -> StageOrder {
            StageOrder::PRE
        }
        async fn before(&self, _ctx: &mut RequestContext) -> Result<(), Failure> {
            Ok(())
        }
    }

    struct NullSession;
    impl crate::collab::Session for NullSession {
        fn flash(&self, _key: &str, _value: serde_json::Value) {}
        fn previous_url(&self) -> Option<String> {
            None
        }
        fn token(&self) -> Option<String> {
            None
        }
    }

    #[tokio::test]
    async fn stage_after_hook_defaults_to_a_no_op() {
        use crate::http::{HttpMethod, Request};
        let stage = NoopStage;
        let ctx = RequestContext::new(
            Request::new("r1", "/", HttpMethod::Get),
            Arc::new(NullSession),
        );
        let mut response = Response::new(200);
        stage.after(&ctx, &mut response).await.unwrap();
        assert_eq!(response.status, 200);
        assert!(response.headers.is_empty());
    }

    #[tokio::test]
    async fn claimed_translator_produces_a_response() {
        use crate::http::{HttpMethod, Request};
        let registry = TranslatorRegistry::new(vec![Arc::new(Claimer {
            name: "only",
            priority: 100,
        })]);
        let failure = Failure::internal("boom");
        let ctx = RequestContext::new(
            Request::new("r1", "/", HttpMethod::Get),
            Arc::new(NullSession),
        );
        let translator = registry.claim(&failure).unwrap();
        let response = translator.translate(&failure, &ctx).await;
        assert_eq!(response.status, 500);
    }
}
