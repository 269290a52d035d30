//! CSRF verification stage.
//!
//! A *producing* stage, not a catcher: before the endpoint runs it decides
//! whether verification applies and raises `TokenMismatch` on failure,
//! which the generic HTTP-status translator then converts (419 "Page
//! Expired").
//!
//! Verification is skipped for safe methods (GET/HEAD/OPTIONS/TRACE) and
//! for paths matching a configured exemption pattern — an exact string, or
//! a prefix when the pattern ends in `*`.  Otherwise the session's stored
//! token must exist and constant-time-equal a token taken from, in order:
//! parsed-body field `_token`, header `X-CSRF-TOKEN`, header
//! `X-XSRF-TOKEN`.

use async_trait::async_trait;
use rampart_kernel::failure::Failure;
use rampart_kernel::http::{Request, RequestContext};
use rampart_kernel::pipeline::{PipelineStage, StageOrder};
use subtle::ConstantTimeEq;
use tracing::warn;

/// CSRF verification stage with configurable path exemptions.
pub struct CsrfGuard {
    exempt_patterns: Vec<String>,
}

impl CsrfGuard {
    /// Build the guard from a list of exemption patterns.
    pub fn new(exempt_patterns: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            exempt_patterns: exempt_patterns.into_iter().map(Into::into).collect(),
        }
    }

    fn is_exempt(&self, path: &str) -> bool {
        self.exempt_patterns.iter().any(|pattern| {
            match pattern.strip_suffix('*') {
                Some(prefix) => path.starts_with(prefix),
                None => path == pattern,
            }
        })
    }

    /// The token the request carries, probing body field then headers.
    fn request_token(request: &Request) -> Option<String> {
        if let Some(token) = request.body_field("_token") {
            return Some(token.to_string());
        }
        if let Some(token) = request.header("x-csrf-token") {
            return Some(token.to_string());
        }
        request.header("x-xsrf-token").map(String::from)
    }
}

/// Constant-time string comparison, so token checks do not leak length
/// prefixes through timing.
fn tokens_match(expected: &str, provided: &str) -> bool {
    expected.as_bytes().ct_eq(provided.as_bytes()).into()
}

#[async_trait]
impl PipelineStage for CsrfGuard {
    fn name(&self) -> &str {
        "csrf"
    }

    fn order(&self) -> StageOrder {
        StageOrder::CSRF
    }

    async fn before(&self, ctx: &mut RequestContext) -> Result<(), Failure> {
        if ctx.request.method.is_safe() || self.is_exempt(&ctx.request.path) {
            return Ok(());
        }

        let Some(session_token) = ctx.session.token() else {
            warn!(request_id = %ctx.request.id, "CSRF rejected: session has no token");
            return Err(Failure::token_mismatch());
        };
        match Self::request_token(&ctx.request) {
            Some(provided) if tokens_match(&session_token, &provided) => Ok(()),
            _ => {
                warn!(request_id = %ctx.request.id, "CSRF rejected: token missing or mismatched");
                Err(Failure::token_mismatch())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rampart_kernel::http::HttpMethod;
    use serde_json::{Value, json};
    use std::sync::Arc;

    struct TokenSession {
        token: Option<&'static str>,
    }

    impl rampart_kernel::collab::Session for TokenSession {
        fn flash(&self, _key: &str, _value: Value) {}
        fn previous_url(&self) -> Option<String> {
            None
        }
        fn token(&self) -> Option<String> {
            self.token.map(String::from)
        }
    }

    fn ctx(request: Request, token: Option<&'static str>) -> RequestContext {
        RequestContext::new(request, Arc::new(TokenSession { token }))
    }

    #[tokio::test]
    async fn matching_body_token_passes() {
        let request = Request::new("r1", "/signup", HttpMethod::Post)
            .with_parsed_body(json!({"_token": "abc"}));
        let mut context = ctx(request, Some("abc"));
        assert!(CsrfGuard::new(Vec::<String>::new())
            .before(&mut context)
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn mismatched_token_raises_419() {
        let request = Request::new("r1", "/signup", HttpMethod::Post)
            .with_parsed_body(json!({"_token": "xyz"}));
        let mut context = ctx(request, Some("abc"));
        let failure = CsrfGuard::new(Vec::<String>::new())
            .before(&mut context)
            .await
            .unwrap_err();
        assert_eq!(failure.status(), 419);
        assert_eq!(failure.reason_phrase(), "Page Expired");
    }

    #[tokio::test]
    async fn get_requests_always_pass() {
        let request = Request::new("r1", "/signup", HttpMethod::Get);
        let mut context = ctx(request, None);
        assert!(CsrfGuard::new(Vec::<String>::new())
            .before(&mut context)
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn header_tokens_are_probed_in_order() {
        let request = Request::new("r1", "/signup", HttpMethod::Post)
            .with_header("x-csrf-token", "abc");
        let mut context = ctx(request, Some("abc"));
        assert!(CsrfGuard::new(Vec::<String>::new())
            .before(&mut context)
            .await
            .is_ok());

        let request = Request::new("r2", "/signup", HttpMethod::Post)
            .with_header("x-xsrf-token", "abc");
        let mut context = ctx(request, Some("abc"));
        assert!(CsrfGuard::new(Vec::<String>::new())
            .before(&mut context)
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn body_token_takes_precedence_over_headers() {
        let request = Request::new("r1", "/signup", HttpMethod::Post)
            .with_parsed_body(json!({"_token": "wrong"}))
            .with_header("x-csrf-token", "abc");
        let mut context = ctx(request, Some("abc"));
        assert!(CsrfGuard::new(Vec::<String>::new())
            .before(&mut context)
            .await
            .is_err());
    }

    #[tokio::test]
    async fn missing_session_token_rejects_unsafe_requests() {
        let request = Request::new("r1", "/signup", HttpMethod::Post)
            .with_parsed_body(json!({"_token": "abc"}));
        let mut context = ctx(request, None);
        assert!(CsrfGuard::new(Vec::<String>::new())
            .before(&mut context)
            .await
            .is_err());
    }

    #[tokio::test]
    async fn exact_and_prefix_exemptions_apply() {
        let guard = CsrfGuard::new(["/health", "/webhooks/*"]);
        assert!(guard.is_exempt("/health"));
        assert!(guard.is_exempt("/webhooks/github"));
        assert!(!guard.is_exempt("/health/deep"));
        assert!(!guard.is_exempt("/signup"));

        let request = Request::new("r1", "/webhooks/github", HttpMethod::Post);
        let mut context = ctx(request, None);
        assert!(guard.before(&mut context).await.is_ok());
    }
}
