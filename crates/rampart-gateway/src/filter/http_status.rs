//! Generic HTTP-status failure translator.
//!
//! Owns every failure that exposes a (status, reason, headers) triple:
//! caller-supplied `HttpStatus` failures, CSRF `TokenMismatch` (419
//! "Page Expired"), and `Authorization` denials (403).  Runs at the
//! lowest priority so more specific translators claim their kinds first.

use async_trait::async_trait;
use rampart_kernel::failure::{Failure, FailureKind, HttpFacts};
use rampart_kernel::http::{RequestContext, Response};
use rampart_kernel::pipeline::{FailureTranslator, TranslatorPriority};

/// Converts status-carrying failures to plain-text responses.
pub struct HttpStatusTranslator;

#[async_trait]
impl FailureTranslator for HttpStatusTranslator {
    fn name(&self) -> &str {
        "http-status"
    }

    fn priority(&self) -> TranslatorPriority {
        TranslatorPriority::HTTP_STATUS
    }

    fn matches(&self, failure: &Failure) -> bool {
        failure.http_facts().is_some()
    }

    async fn translate(&self, failure: &Failure, _ctx: &RequestContext) -> Response {
        let facts = failure.http_facts().unwrap_or(HttpFacts {
            status: 500,
            reason: "Internal Server Error",
            headers: &[],
        });
        // Body is the failure's message, or the reason phrase when the
        // failure carries none.
        let body = match failure.kind() {
            FailureKind::HttpStatus {
                message: Some(message),
                ..
            } => message.clone(),
            FailureKind::HttpStatus { reason, .. } => reason.clone(),
            _ => failure.to_string(),
        };
        let mut response = Response::text(facts.status, body);
        for (key, value) in facts.headers {
            response = response.with_header(key.clone(), value.clone());
        }
        response
    }
}
