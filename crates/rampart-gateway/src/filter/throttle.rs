//! Rate-limit breach translator.
//!
//! Owns `TooManyRequests`.  JSON/AJAX callers receive a structured 429
//! payload with rate-limit headers; browser callers get a flashed message
//! and a redirect back to where they came from.

use async_trait::async_trait;
use rampart_kernel::failure::{Failure, FailureKind};
use rampart_kernel::http::{RequestContext, Response, wants_json};
use rampart_kernel::pipeline::{FailureTranslator, TranslatorPriority};
use serde_json::json;

/// Flash key carrying the field-level throttle error.
const THROTTLE_ERROR_FIELD: &str = "throttle";

/// Render a retry wait as `"in N second(s)"` below one minute and
/// `"in M minute(s)"` (minutes rounded up) from one minute on.
pub fn format_retry_wait(secs: u64) -> String {
    if secs < 60 {
        format!("in {} second{}", secs, if secs == 1 { "" } else { "s" })
    } else {
        let minutes = secs.div_ceil(60);
        format!("in {} minute{}", minutes, if minutes == 1 { "" } else { "s" })
    }
}

/// Converts `TooManyRequests` into a 429 or a flash-and-redirect.
pub struct ThrottleTranslator;

#[async_trait]
impl FailureTranslator for ThrottleTranslator {
    fn name(&self) -> &str {
        "throttle"
    }

    fn priority(&self) -> TranslatorPriority {
        TranslatorPriority::THROTTLE
    }

    fn matches(&self, failure: &Failure) -> bool {
        matches!(failure.kind(), FailureKind::TooManyRequests { .. })
    }

    async fn translate(&self, failure: &Failure, ctx: &RequestContext) -> Response {
        let retry_after = failure.retry_after().unwrap_or(0);
        let message = format!(
            "Too many requests. Please try again {}.",
            format_retry_wait(retry_after)
        );

        if wants_json(&ctx.request) {
            return Response::json(
                429,
                &json!({
                    "error": "Too Many Requests",
                    "message": message,
                    "retry_after": retry_after,
                }),
            )
            .with_header("retry-after", retry_after.to_string())
            .with_header("x-ratelimit-limit", "0")
            .with_header("x-ratelimit-remaining", "0");
        }

        ctx.session.flash("error", json!(message));
        ctx.session
            .flash("errors", json!({ THROTTLE_ERROR_FIELD: [message] }));
        Response::redirect(ctx.redirect_target())
            .with_header("retry-after", retry_after.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use rampart_kernel::http::{HttpMethod, Request};
    use serde_json::Value;
    use std::collections::HashMap;
    use std::sync::Arc;

    #[derive(Default)]
    struct SpySession {
        flashes: Mutex<HashMap<String, Value>>,
    }

    impl rampart_kernel::collab::Session for SpySession {
        fn flash(&self, key: &str, value: Value) {
            self.flashes.lock().insert(key.to_string(), value);
        }
        fn previous_url(&self) -> Option<String> {
            Some("/previous".to_string())
        }
        fn token(&self) -> Option<String> {
            None
        }
    }

    fn ctx(request: Request) -> (RequestContext, Arc<SpySession>) {
        let session = Arc::new(SpySession::default());
        (RequestContext::new(request, session.clone()), session)
    }

    #[test]
    fn wait_formats_seconds_and_minutes() {
        assert_eq!(format_retry_wait(45), "in 45 seconds");
        assert_eq!(format_retry_wait(90), "in 2 minutes");
        assert_eq!(format_retry_wait(1), "in 1 second");
        assert_eq!(format_retry_wait(60), "in 1 minute");
    }

    #[tokio::test]
    async fn json_caller_gets_structured_429() {
        let request = Request::new("r1", "/api/things", HttpMethod::Post);
        let (context, _session) = ctx(request);
        let response = ThrottleTranslator
            .translate(&Failure::too_many_requests(45), &context)
            .await;

        assert_eq!(response.status, 429);
        assert_eq!(response.header("retry-after"), Some("45"));
        assert_eq!(response.header("x-ratelimit-limit"), Some("0"));
        assert_eq!(response.header("x-ratelimit-remaining"), Some("0"));

        let body: Value = serde_json::from_slice(&response.body).unwrap();
        assert_eq!(body["error"], "Too Many Requests");
        assert_eq!(body["retry_after"], 45);
        assert!(body["message"].as_str().unwrap().contains("in 45 seconds"));
    }

    #[tokio::test]
    async fn browser_caller_gets_flash_and_redirect() {
        let request = Request::new("r1", "/signup", HttpMethod::Post)
            .with_header("referer", "/signup-form");
        let (context, session) = ctx(request);
        let response = ThrottleTranslator
            .translate(&Failure::too_many_requests(90), &context)
            .await;

        assert_eq!(response.status, 302);
        assert_eq!(response.header("location"), Some("/signup-form"));
        assert_eq!(response.header("retry-after"), Some("90"));

        let flashes = session.flashes.lock();
        assert!(flashes["error"].as_str().unwrap().contains("in 2 minutes"));
        assert!(flashes["errors"]["throttle"][0]
            .as_str()
            .unwrap()
            .contains("in 2 minutes"));
    }

    #[tokio::test]
    async fn redirect_falls_back_to_session_previous_url() {
        let (context, _session) = ctx(Request::new("r1", "/signup", HttpMethod::Post));
        let response = ThrottleTranslator
            .translate(&Failure::too_many_requests(5), &context)
            .await;
        assert_eq!(response.header("location"), Some("/previous"));
    }
}
