//! Rampart gateway — entry point.
//!
//! Reads configuration from environment variables and starts the
//! axum-based HTTP service.
//!
//! # Environment variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `RAMPART_PORT` | `3000` | TCP port to listen on. |
//! | `RAMPART_DEBUG` | `false` | Enable debug failure renders. |
//! | `RAMPART_ENV` | `production` | `development`, `testing`, or `production`. |
//! | `RAMPART_MAX_ATTEMPTS` | `60` | Allowed requests per throttle window. |
//! | `RAMPART_DECAY_SECS` | `60` | Throttle window length in seconds. |
//! | `RAMPART_CSRF_EXEMPT` | *(none)* | Comma-separated CSRF exemption patterns. |

use async_trait::async_trait;
use rampart_gateway::server::{GatewayServer, GatewayServerConfig};
use rampart_kernel::config::{Environment, PipelineConfig, ThrottleConfig};
use rampart_kernel::failure::Failure;
use rampart_kernel::http::{HttpMethod, RequestContext, Response};
use rampart_kernel::pipeline::Endpoint;
use serde_json::json;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Placeholder application endpoint: a landing route plus a 404 failure
/// for everything else, demonstrating the translation path.
struct AppEndpoint;

#[async_trait]
impl Endpoint for AppEndpoint {
    async fn call(&self, ctx: &RequestContext) -> Result<Response, Failure> {
        match (ctx.request.method, ctx.request.path.as_str()) {
            (HttpMethod::Get, "/") => Ok(Response::json(
                200,
                &json!({ "service": "rampart", "status": "ok" }),
            )),
            _ => Err(Failure::http_status(404, "Not Found")),
        }
    }
}

#[tokio::main]
async fn main() {
    // Initialise structured logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("rampart_gateway=info".parse().unwrap()),
        )
        .init();

    let port: u16 = std::env::var("RAMPART_PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(3000);

    let debug = std::env::var("RAMPART_DEBUG")
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false);

    let environment = match std::env::var("RAMPART_ENV").as_deref() {
        Ok("development") => Environment::Development,
        Ok("testing") => Environment::Testing,
        _ => Environment::Production,
    };

    let max_attempts: u32 = std::env::var("RAMPART_MAX_ATTEMPTS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(60);

    let decay_secs: u64 = std::env::var("RAMPART_DECAY_SECS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(60);

    let csrf_exempt: Vec<String> = std::env::var("RAMPART_CSRF_EXEMPT")
        .unwrap_or_default()
        .split(',')
        .filter(|s| !s.trim().is_empty())
        .map(|s| s.trim().to_string())
        .collect();

    if debug && environment == Environment::Production {
        tracing::warn!(
            "RAMPART_DEBUG is set in production — debug renders stay disabled for \
             the interactive tier, but plain debug pages will reveal failure details."
        );
    }

    let mut pipeline = PipelineConfig::new()
        .with_debug(debug)
        .with_environment(environment)
        .with_throttle(ThrottleConfig {
            max_attempts,
            decay_secs,
            key_prefix: None,
        });
    for pattern in csrf_exempt {
        pipeline = pipeline.with_csrf_exempt(pattern);
    }

    let debug_enabled = debug;
    info!(
        port = port,
        debug = debug_enabled,
        environment = environment.as_str(),
        "Rampart gateway configuration loaded"
    );

    let server = GatewayServer::new(GatewayServerConfig { port, pipeline });
    if let Err(e) = server.start(Arc::new(AppEndpoint)).await {
        eprintln!("Gateway error: {e}");
        std::process::exit(1);
    }
}
