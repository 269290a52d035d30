//! Validation failure translator.
//!
//! Owns `Validation`.  Flashes the field errors, the scrubbed old input,
//! and the first error message, then redirects the caller back to the
//! form (302).

use async_trait::async_trait;
use rampart_kernel::failure::{Failure, FailureKind};
use rampart_kernel::http::{RequestContext, Response, scrub_sensitive};
use rampart_kernel::pipeline::{FailureTranslator, TranslatorPriority};
use serde_json::{Map, Value, json};

/// Converts `Validation` into a flash-and-redirect.
pub struct ValidationTranslator;

#[async_trait]
impl FailureTranslator for ValidationTranslator {
    fn name(&self) -> &str {
        "validation"
    }

    fn priority(&self) -> TranslatorPriority {
        TranslatorPriority::VALIDATION
    }

    fn matches(&self, failure: &Failure) -> bool {
        matches!(failure.kind(), FailureKind::Validation { .. })
    }

    async fn translate(&self, failure: &Failure, ctx: &RequestContext) -> Response {
        let errors = failure.validation_errors().unwrap_or(&[]);

        // The full field -> messages map, verbatim.
        let error_map: Map<String, Value> = errors
            .iter()
            .map(|(field, messages)| (field.clone(), json!(messages)))
            .collect();
        ctx.session.flash("errors", Value::Object(error_map));

        // Old input, minus anything credential-like.
        if let Some(parsed) = &ctx.request.parsed_body {
            ctx.session.flash("old", scrub_sensitive(parsed));
        }

        // First error message as the top-level error string.
        if let Some(first) = errors
            .iter()
            .flat_map(|(_, messages)| messages.iter())
            .next()
        {
            ctx.session.flash("error", json!(first));
        }

        Response::redirect(ctx.redirect_target())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use rampart_kernel::http::{HttpMethod, Request};
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
            None
        }
        fn token(&self) -> Option<String> {
            None
        }
    }

    fn failure() -> Failure {
        Failure::validation(vec![
            (
                "email".to_string(),
                vec!["The email field is required.".to_string()],
            ),
            (
                "name".to_string(),
                vec!["The name field is required.".to_string()],
            ),
        ])
    }

    #[tokio::test]
    async fn flashes_errors_old_input_and_first_message() {
        let request = Request::new("r1", "/signup", HttpMethod::Post)
            .with_header("referer", "/signup-form")
            .with_parsed_body(json!({
                "email": "ada@example.com",
                "password": "hunter2",
                "profile": {"api_key": "k", "name": "Ada"}
            }));
        let session = Arc::new(SpySession::default());
        let context = RequestContext::new(request, session.clone());

        let response = ValidationTranslator.translate(&failure(), &context).await;
        assert_eq!(response.status, 302);
        assert_eq!(response.header("location"), Some("/signup-form"));

        let flashes = session.flashes.lock();
        assert_eq!(
            flashes["errors"]["email"][0],
            "The email field is required."
        );
        assert_eq!(flashes["error"], "The email field is required.");

        let old = &flashes["old"];
        assert_eq!(old["email"], "ada@example.com");
        assert!(old.get("password").is_none());
        assert!(old["profile"].get("api_key").is_none());
        assert_eq!(old["profile"]["name"], "Ada");
    }

    #[tokio::test]
    async fn no_parsed_body_flashes_no_old_input() {
        let request = Request::new("r1", "/signup", HttpMethod::Post);
        let session = Arc::new(SpySession::default());
        let context = RequestContext::new(request, session.clone());

        ValidationTranslator.translate(&failure(), &context).await;
        assert!(!session.flashes.lock().contains_key("old"));
    }

    #[tokio::test]
    async fn empty_error_map_flashes_no_top_level_error() {
        let request = Request::new("r1", "/signup", HttpMethod::Post);
        let session = Arc::new(SpySession::default());
        let context = RequestContext::new(request, session.clone());

        ValidationTranslator
            .translate(&Failure::validation(vec![]), &context)
            .await;
        let flashes = session.flashes.lock();
        assert!(flashes.contains_key("errors"));
        assert!(!flashes.contains_key("error"));
    }
}
