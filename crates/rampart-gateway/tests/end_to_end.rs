//! End-to-end pipeline behavior: stages, translators, and the terminal
//! handler wired together with the in-memory collaborators.

use async_trait::async_trait;
use rampart_gateway::filter::{CsrfGuard, Pipeline, RateLimitStage};
use rampart_gateway::limiter::InMemoryRateLimiter;
use rampart_gateway::session::InMemorySession;
use rampart_gateway::terminal::{TerminalHandler, TerminalState};
use rampart_kernel::config::{PipelineConfig, ThrottleConfig};
use rampart_kernel::diagnostics::{ContainerSnapshot, DiagnosticFactory};
use rampart_kernel::failure::Failure;
use rampart_kernel::http::{HttpMethod, Request, RequestContext, Response};
use rampart_kernel::pipeline::Endpoint;
use serde_json::json;
use std::sync::Arc;

/// Endpoint that always fails validation, as a form handler would after
/// checking its input.
struct SignupEndpoint;

#[async_trait]
impl Endpoint for SignupEndpoint {
    async fn call(&self, _ctx: &RequestContext) -> Result<Response, Failure> {
        Err(Failure::validation(vec![
            (
                "email".to_string(),
                vec!["The email field is required.".to_string()],
            ),
            (
                "terms".to_string(),
                vec!["The terms must be accepted.".to_string()],
            ),
        ]))
    }
}

/// Endpoint that succeeds with a plain page.
struct OkEndpoint;

#[async_trait]
impl Endpoint for OkEndpoint {
    async fn call(&self, _ctx: &RequestContext) -> Result<Response, Failure> {
        Ok(Response::html(200, "<p>welcome</p>"))
    }
}

fn throttle(max_attempts: u32) -> ThrottleConfig {
    ThrottleConfig {
        max_attempts,
        decay_secs: 60,
        key_prefix: None,
    }
}

fn pipeline_with(stages: Vec<Arc<dyn rampart_kernel::pipeline::PipelineStage>>) -> Pipeline {
    Pipeline::new(stages, Pipeline::standard_translators())
}

#[tokio::test]
async fn validation_failure_flashes_and_redirects_to_referer() {
    let request = Request::new("r1", "/signup", HttpMethod::Post)
        .with_header("referer", "/signup-form")
        .with_header("content-type", "application/x-www-form-urlencoded")
        .with_parsed_body(json!({
            "email": "",
            "name": "Ada",
            "password": "hunter2",
            "api_key": "k-123"
        }));
    let session = Arc::new(InMemorySession::with_token("tok"));
    let mut ctx = RequestContext::new(request, session.clone());

    // CSRF exempts the signup route in this app's configuration.
    let pipeline = pipeline_with(vec![Arc::new(CsrfGuard::new(["/signup"]))]);
    let response = pipeline.dispatch(&mut ctx, &SignupEndpoint).await.unwrap();

    assert_eq!(response.status, 302);
    assert_eq!(response.header("location"), Some("/signup-form"));

    let errors = session.flashed("errors").unwrap();
    assert_eq!(errors["email"][0], "The email field is required.");
    assert_eq!(errors["terms"][0], "The terms must be accepted.");

    let error = session.flashed("error").unwrap();
    assert_eq!(error, "The email field is required.");

    let old = session.flashed("old").unwrap();
    assert_eq!(old["name"], "Ada");
    assert_eq!(old["email"], "");
    assert!(old.get("password").is_none());
    assert!(old.get("api_key").is_none());
}

#[tokio::test]
async fn successful_request_is_decorated_with_rate_limit_headers() {
    let limiter = Arc::new(InMemoryRateLimiter::new());
    let stage = RateLimitStage::new(limiter.clone(), &throttle(5));
    let pipeline = pipeline_with(vec![Arc::new(stage)]);

    let session = Arc::new(InMemorySession::new());
    let mut last = None;
    for i in 0..2 {
        let request = Request::new(format!("r{i}"), "/widgets", HttpMethod::Get);
        let mut ctx = RequestContext::new(request, session.clone());
        last = Some(pipeline.dispatch(&mut ctx, &OkEndpoint).await.unwrap());
    }

    let response = last.unwrap();
    assert_eq!(response.status, 200);
    assert_eq!(response.header("x-ratelimit-limit"), Some("5"));
    assert_eq!(response.header("x-ratelimit-remaining"), Some("3"));
    assert!(response.header("x-ratelimit-reset").is_some());
}

#[tokio::test]
async fn exhausted_allowance_yields_json_429_for_ajax_callers() {
    let limiter = Arc::new(InMemoryRateLimiter::new());
    let stage = RateLimitStage::new(limiter, &throttle(1));
    let pipeline = pipeline_with(vec![Arc::new(stage)]);

    let session = Arc::new(InMemorySession::new());
    for i in 0..2 {
        let request = Request::new(format!("r{i}"), "/widgets", HttpMethod::Get)
            .with_header("x-requested-with", "XMLHttpRequest");
        let mut ctx = RequestContext::new(request, session.clone());
        let response = pipeline.dispatch(&mut ctx, &OkEndpoint).await.unwrap();
        if i == 0 {
            assert_eq!(response.status, 200);
        } else {
            assert_eq!(response.status, 429);
            assert!(response.header("retry-after").is_some());
            let body: serde_json::Value = serde_json::from_slice(&response.body).unwrap();
            assert_eq!(body["error"], "Too Many Requests");
        }
    }
}

#[tokio::test]
async fn csrf_mismatch_surfaces_as_419_page_expired() {
    let request = Request::new("r1", "/profile", HttpMethod::Post)
        .with_parsed_body(json!({"_token": "wrong"}));
    let session = Arc::new(InMemorySession::with_token("right"));
    let mut ctx = RequestContext::new(request, session);

    let pipeline = pipeline_with(vec![Arc::new(CsrfGuard::new(Vec::<String>::new()))]);
    let response = pipeline.dispatch(&mut ctx, &OkEndpoint).await.unwrap();

    assert_eq!(response.status, 419);
    assert_eq!(
        response.header("content-type"),
        Some("text/plain; charset=utf-8")
    );
}

#[tokio::test]
async fn unclaimed_diagnostic_failure_reaches_the_terminal_handler() {
    let snapshot = ContainerSnapshot::new().with_binding("app.mailer", "SmtpMailer");

    struct BrokenEndpoint {
        snapshot: ContainerSnapshot,
    }

    #[async_trait]
    impl Endpoint for BrokenEndpoint {
        async fn call(&self, _ctx: &RequestContext) -> Result<Response, Failure> {
            Err(DiagnosticFactory::not_found(
                "app.mailers",
                None,
                vec!["app.kernel".to_string()],
                &self.snapshot,
            ))
        }
    }

    let request = Request::new("r1", "/send", HttpMethod::Post);
    let session = Arc::new(InMemorySession::new());
    let mut ctx = RequestContext::new(request, session);

    let pipeline = pipeline_with(vec![]);
    let failure = pipeline
        .dispatch(&mut ctx, &BrokenEndpoint { snapshot })
        .await
        .unwrap_err();
    assert!(!failure.suggestions().is_empty());

    // Production terminal render: 500, no failure details leaked.
    let terminal = TerminalHandler::new(PipelineConfig::new());
    let outcome = terminal.handle(&failure, &ctx);
    assert_eq!(outcome.state, TerminalState::Rendered);
    assert_eq!(outcome.response.status, 500);
    let body = String::from_utf8(outcome.response.body).unwrap();
    assert!(!body.contains("app.mailers"));

    // A second failure on the same request trips the recursion guard.
    let outcome = terminal.handle(&Failure::internal("render blew up"), &ctx);
    assert_eq!(outcome.state, TerminalState::RecursivelyFailed);
    assert_eq!(outcome.response.body, b"Internal Server Error");
}
