//! HTTP value types and request-classification helpers.
//!
//! Everything in this module is framework-agnostic: the runtime crate
//! converts between these owned types and the actual HTTP server's
//! representation at the boundary.

pub mod form;
pub mod negotiation;
pub mod sensitive;
pub mod types;

pub use form::{parse_body, parse_form};
pub use negotiation::{client_ip, wants_json};
pub use sensitive::{is_sensitive_field, scrub_sensitive};
pub use types::{HttpMethod, RecursionGuard, Request, RequestContext, Response};
