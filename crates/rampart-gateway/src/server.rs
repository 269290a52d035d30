//! Axum-based HTTP front end.
//!
//! [`GatewayServer`] wires the translation pipeline, the terminal
//! handler, and the in-memory collaborators into a running axum service.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/health` | Liveness check — always `200 OK`. |
//! | `ANY`  | `*` | Dispatched through the pipeline to the application endpoint. |

use crate::filter::{CsrfGuard, Pipeline, RateLimitStage};
use crate::limiter::InMemoryRateLimiter;
use crate::logger::TracingLogger;
use crate::session::SessionManager;
use crate::terminal::TerminalHandler;
use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::{HeaderMap, Method, StatusCode, Uri, header},
    response::IntoResponse,
    routing::get,
};
use rampart_kernel::config::PipelineConfig;
use rampart_kernel::http::{HttpMethod, Request, RequestContext, Response, parse_body};
use rampart_kernel::pipeline::Endpoint;
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::{error, info};
use uuid::Uuid;

/// Name of the session cookie.
const SESSION_COOKIE: &str = "rampart_session";

// ─────────────────────────────────────────────────────────────────────────────
// Shared application state
// ─────────────────────────────────────────────────────────────────────────────

/// Shared state injected into every axum handler via [`State`] extractor.
#[derive(Clone)]
pub struct AppState {
    pipeline: Arc<Pipeline>,
    terminal: Arc<TerminalHandler>,
    sessions: Arc<SessionManager>,
    endpoint: Arc<dyn Endpoint>,
}

// ─────────────────────────────────────────────────────────────────────────────
// GatewayServerConfig
// ─────────────────────────────────────────────────────────────────────────────

/// Runtime configuration for [`GatewayServer`].
pub struct GatewayServerConfig {
    /// TCP port to listen on (default: 3000).
    pub port: u16,
    /// Pipeline configuration (debug/environment, CSRF exemptions,
    /// throttle parameters, reporting threshold).
    pub pipeline: PipelineConfig,
}

impl Default for GatewayServerConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            pipeline: PipelineConfig::default(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// GatewayServer
// ─────────────────────────────────────────────────────────────────────────────

/// High-level server encapsulating pipeline, terminal handler, and
/// session management.
pub struct GatewayServer {
    config: GatewayServerConfig,
}

impl GatewayServer {
    /// Create a new server from the given configuration.
    pub fn new(config: GatewayServerConfig) -> Self {
        Self { config }
    }

    /// Build the axum [`Router`] dispatching every request through the
    /// pipeline to `endpoint`.
    ///
    /// This method validates the config and constructs the stage chain
    /// and translator registry.  Call [`start()`](Self::start) to bind
    /// and serve.
    pub fn build_app(&self, endpoint: Arc<dyn Endpoint>) -> Router {
        self.config
            .pipeline
            .validate()
            .expect("invalid pipeline config");

        let limiter = Arc::new(InMemoryRateLimiter::new());
        let pipeline = Pipeline::new(
            vec![
                Arc::new(CsrfGuard::new(self.config.pipeline.csrf_exempt.clone())),
                Arc::new(RateLimitStage::new(limiter, &self.config.pipeline.throttle)),
            ],
            Pipeline::standard_translators(),
        );
        let terminal = TerminalHandler::new(self.config.pipeline.clone())
            .with_logger(Arc::new(TracingLogger::new()));

        let state = AppState {
            pipeline: Arc::new(pipeline),
            terminal: Arc::new(terminal),
            sessions: Arc::new(SessionManager::new()),
            endpoint,
        };

        Router::new()
            .route("/health", get(health_handler))
            .fallback(dispatch_handler)
            .layer(CorsLayer::permissive())
            .with_state(state)
    }

    /// Bind the server to `0.0.0.0:{port}` and serve until the process
    /// exits.
    pub async fn start(self, endpoint: Arc<dyn Endpoint>) -> std::io::Result<()> {
        let app = self.build_app(endpoint);
        let addr = format!("0.0.0.0:{}", self.config.port);
        info!(addr = %addr, "Rampart gateway starting");
        let listener = tokio::net::TcpListener::bind(&addr).await?;
        axum::serve(listener, app).await
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Handlers
// ─────────────────────────────────────────────────────────────────────────────

/// `GET /health` — liveness probe.
async fn health_handler() -> impl IntoResponse {
    Json(json!({ "status": "ok", "service": "rampart-gateway" }))
}

/// Catch-all handler — converts the axum request, runs the pipeline, and
/// hands unclaimed failures to the terminal handler.
async fn dispatch_handler(
    State(state): State<AppState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> axum::response::Response {
    let Some(http_method) = HttpMethod::from_str_ci(method.as_str()) else {
        return (
            StatusCode::METHOD_NOT_ALLOWED,
            Json(json!({ "error": format!("method '{}' is not supported", method) })),
        )
            .into_response();
    };

    let request_id = Uuid::new_v4().to_string();
    let mut request = Request::new(&request_id, uri.path(), http_method);
    for (name, value) in &headers {
        if let Ok(v) = value.to_str() {
            request = request.with_header(name.as_str(), v);
        }
    }
    if let Some(parsed) = parse_body(request.header("content-type"), &body) {
        request = request.with_parsed_body(parsed);
    }
    request = request.with_body(body.to_vec());

    // Session lookup, minting a cookie for first-time callers.
    let (cookie, is_new_session) = match session_cookie(&headers) {
        Some(cookie) => (cookie, false),
        None => (state.sessions.new_session_id(), true),
    };
    let session = state.sessions.get_or_create(&cookie);

    let mut ctx = RequestContext::new(request, session);
    let response = match state.pipeline.dispatch(&mut ctx, state.endpoint.as_ref()).await {
        Ok(response) => response,
        Err(failure) => {
            let outcome = state.terminal.handle(&failure, &ctx);
            error!(
                request_id = %request_id,
                state = ?outcome.state,
                exit_code = outcome.exit_code(),
                "terminal failure handled"
            );
            outcome.response
        }
    };

    let mut axum_response = to_axum_response(response);
    if is_new_session {
        if let Ok(value) =
            format!("{SESSION_COOKIE}={cookie}; Path=/; HttpOnly; SameSite=Lax").parse()
        {
            axum_response
                .headers_mut()
                .append(header::SET_COOKIE, value);
        }
    }
    axum_response
}

// ─────────────────────────────────────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────────────────────────────────────

/// Extract the session cookie value, when the request carries one.
fn session_cookie(headers: &HeaderMap) -> Option<String> {
    let raw = headers.get(header::COOKIE)?.to_str().ok()?;
    raw.split(';').find_map(|pair| {
        let (name, value) = pair.trim().split_once('=')?;
        (name == SESSION_COOKIE).then(|| value.to_string())
    })
}

/// Convert a kernel [`Response`] into an axum response.  A header that
/// cannot be encoded downgrades the whole response to a plain 500 —
/// this layer must never panic.
fn to_axum_response(resp: Response) -> axum::response::Response {
    let status = StatusCode::from_u16(resp.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let mut builder = axum::response::Response::builder().status(status);
    for (k, v) in &resp.headers {
        builder = builder.header(k, v);
    }
    match builder.body(axum::body::Body::from(resp.body)) {
        Ok(response) => response,
        Err(e) => {
            error!(error = %e, "response conversion failed");
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_cookie_is_parsed_from_the_header() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            "theme=dark; rampart_session=abc123; lang=en".parse().unwrap(),
        );
        assert_eq!(session_cookie(&headers), Some("abc123".to_string()));
    }

    #[test]
    fn missing_session_cookie_yields_none() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, "theme=dark".parse().unwrap());
        assert_eq!(session_cookie(&headers), None);
        assert_eq!(session_cookie(&HeaderMap::new()), None);
    }

    #[test]
    fn kernel_response_converts_with_headers() {
        let response = to_axum_response(
            Response::text(429, "slow down").with_header("retry-after", "30"),
        );
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(
            response.headers().get("retry-after").unwrap(),
            "30"
        );
    }
}
