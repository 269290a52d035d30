//! Translation pipeline runtime.
//!
//! [`Pipeline`] wires producing stages and failure translators around a
//! downstream [`Endpoint`]:
//!
//! 1. Stage `before` hooks run in ascending [`StageOrder`]; any hook may
//!    raise a [`Failure`] that skips the endpoint.
//! 2. The endpoint runs.
//! 3. Stage `after` hooks decorate the successful response in descending
//!    order.
//! 4. A raised failure is offered to the translators in priority order;
//!    the first whose `matches` accepts it converts it.  Unclaimed
//!    failures propagate to the caller, which hands them to the terminal
//!    handler.

mod csrf;
mod http_status;
mod rate_limit;
mod throttle;
mod validation;

pub use csrf::CsrfGuard;
pub use http_status::HttpStatusTranslator;
pub use rate_limit::RateLimitStage;
pub use throttle::ThrottleTranslator;
pub use validation::ValidationTranslator;

use rampart_kernel::failure::Failure;
use rampart_kernel::http::{RequestContext, Response};
use rampart_kernel::pipeline::{Endpoint, PipelineStage, TranslatorRegistry};
use std::sync::Arc;
use tracing::debug;

/// Ordered stages plus the translator registry, executed as one unit.
pub struct Pipeline {
    stages: Vec<Arc<dyn PipelineStage>>,
    translators: TranslatorRegistry,
}

impl Pipeline {
    /// Build a pipeline from stages (sorted by their declared order) and a
    /// translator registry.
    pub fn new(mut stages: Vec<Arc<dyn PipelineStage>>, translators: TranslatorRegistry) -> Self {
        stages.sort_by_key(|s| s.order());
        Self {
            stages,
            translators,
        }
    }

    /// The standard translator set: throttle, validation, and the generic
    /// HTTP-status catch-most.
    pub fn standard_translators() -> TranslatorRegistry {
        TranslatorRegistry::new(vec![
            Arc::new(ThrottleTranslator),
            Arc::new(ValidationTranslator),
            Arc::new(HttpStatusTranslator),
        ])
    }

    /// Process one request.
    ///
    /// Returns `Ok` with either the endpoint's (decorated) response or a
    /// translated failure response.  Returns `Err` only for failures no
    /// translator owns; those belong to the terminal handler.
    pub async fn dispatch(
        &self,
        ctx: &mut RequestContext,
        endpoint: &dyn Endpoint,
    ) -> Result<Response, Failure> {
        match self.run_stages(ctx, endpoint).await {
            Ok(response) => Ok(response),
            Err(failure) => match self.translators.claim(&failure) {
                Some(translator) => {
                    debug!(
                        request_id = %ctx.request.id,
                        kind = failure.kind_name(),
                        translator = translator.name(),
                        "failure translated"
                    );
                    Ok(translator.translate(&failure, ctx).await)
                }
                None => Err(failure),
            },
        }
    }

    async fn run_stages(
        &self,
        ctx: &mut RequestContext,
        endpoint: &dyn Endpoint,
    ) -> Result<Response, Failure> {
        for stage in &self.stages {
            stage.before(ctx).await?;
        }
        let mut response = endpoint.call(ctx).await?;
        for stage in self.stages.iter().rev() {
            stage.after(ctx, &mut response).await?;
        }
        Ok(response)
    }
}

// =============================================================================
// Tests
// =============================================================================
