//! Rate-limit stage.
//!
//! A *producing* stage wrapping the endpoint: before dispatch it derives a
//! key from the client identity and consults the limiter, raising
//! `TooManyRequests` when the allowance is exhausted; after a successful
//! dispatch it decorates the response with the standard `X-RateLimit-*`
//! headers.
//!
//! The key hashes `client_ip + "|" + method + "|" + path` so one noisy
//! route cannot exhaust a client's allowance on every other route.

use async_trait::async_trait;
use rampart_kernel::collab::RateLimiter;
use rampart_kernel::config::ThrottleConfig;
use rampart_kernel::failure::Failure;
use rampart_kernel::http::{Request, RequestContext, Response, client_ip};
use rampart_kernel::pipeline::{PipelineStage, StageOrder};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use tracing::warn;

/// Context attribute carrying the derived key from `before` to `after`.
const KEY_ATTR: &str = "rate_limit.key";

/// Rate-limit stage delegating counting to a [`RateLimiter`] collaborator.
pub struct RateLimitStage {
    limiter: Arc<dyn RateLimiter>,
    max_attempts: u32,
    decay_secs: u64,
    key_prefix: Option<String>,
}

impl RateLimitStage {
    /// Build the stage from a limiter and throttle parameters.
    pub fn new(limiter: Arc<dyn RateLimiter>, config: &ThrottleConfig) -> Self {
        Self {
            limiter,
            max_attempts: config.max_attempts,
            decay_secs: config.decay_secs,
            key_prefix: config.key_prefix.clone(),
        }
    }

    /// Derive the limiter key for a request.
    fn key(&self, request: &Request) -> String {
        let raw = format!(
            "{}|{}|{}",
            client_ip(request),
            request.method.as_str(),
            request.path
        );
        let digest = hex::encode(Sha256::digest(raw.as_bytes()));
        match &self.key_prefix {
            Some(prefix) => format!("{prefix}:{digest}"),
            None => digest,
        }
    }
}

#[async_trait]
impl PipelineStage for RateLimitStage {
    fn name(&self) -> &str {
        "rate-limit"
    }

    fn order(&self) -> StageOrder {
        StageOrder::RATE_LIMIT
    }

    async fn before(&self, ctx: &mut RequestContext) -> Result<(), Failure> {
        let key = self.key(&ctx.request);
        if self.limiter.too_many_attempts(&key, self.max_attempts) {
            let retry_after = self.limiter.available_in(&key);
            warn!(
                request_id = %ctx.request.id,
                retry_after,
                "rate limit exceeded"
            );
            return Err(Failure::too_many_requests(retry_after));
        }
        self.limiter.hit(&key, self.decay_secs);
        ctx.set_attr(KEY_ATTR, &key);
        Ok(())
    }

    async fn after(&self, ctx: &RequestContext, resp: &mut Response) -> Result<(), Failure> {
        let key = ctx
            .get_attr::<String>(KEY_ATTR)
            .unwrap_or_else(|| self.key(&ctx.request));
        resp.headers.insert(
            "x-ratelimit-limit".to_string(),
            self.max_attempts.to_string(),
        );
        resp.headers.insert(
            "x-ratelimit-remaining".to_string(),
            self.limiter.remaining(&key, self.max_attempts).to_string(),
        );
        if let Some(reset_at) = self.limiter.available_at(&key) {
            resp.headers
                .insert("x-ratelimit-reset".to_string(), reset_at.to_string());
        }
        Ok(())
    }
}
