//! Core HTTP value types shared across the pipeline.
//!
//! These types carry no runtime dependencies beyond `serde` and `std`.
//! All fields use owned, allocation-friendly types so the structs can be
//! sent across async task boundaries without lifetime complications.

use crate::collab::Session;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

// ─────────────────────────────────────────────────────────────────────────────
// HTTP primitives
// ─────────────────────────────────────────────────────────────────────────────

/// HTTP method, covering the standard verbs the pipeline reasons about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[non_exhaustive]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
    Options,
    Trace,
}

impl HttpMethod {
    /// Case-insensitive parse from a string slice.
    pub fn from_str_ci(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "GET" => Some(HttpMethod::Get),
            "POST" => Some(HttpMethod::Post),
            "PUT" => Some(HttpMethod::Put),
            "PATCH" => Some(HttpMethod::Patch),
            "DELETE" => Some(HttpMethod::Delete),
            "HEAD" => Some(HttpMethod::Head),
            "OPTIONS" => Some(HttpMethod::Options),
            "TRACE" => Some(HttpMethod::Trace),
            _ => None,
        }
    }

    /// Return the standard uppercase string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Head => "HEAD",
            HttpMethod::Options => "OPTIONS",
            HttpMethod::Trace => "TRACE",
        }
    }

    /// Whether this is a safe (state-preserving) method.  Safe methods are
    /// exempt from CSRF verification.
    pub fn is_safe(&self) -> bool {
        matches!(
            self,
            HttpMethod::Get | HttpMethod::Head | HttpMethod::Options | HttpMethod::Trace
        )
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Request
// ─────────────────────────────────────────────────────────────────────────────

/// An inbound request flowing through the pipeline.
#[derive(Debug, Clone)]
pub struct Request {
    /// Unique identifier for correlating this request across logs.
    pub id: String,
    /// Request path, e.g. `/signup`.
    pub path: String,
    /// HTTP method.
    pub method: HttpMethod,
    /// HTTP headers (header names are lowercased).
    pub headers: HashMap<String, String>,
    /// Raw body bytes.
    pub body: Vec<u8>,
    /// Body parsed into a JSON value at the server boundary, when the
    /// content type was recognized (form-urlencoded or JSON).
    pub parsed_body: Option<Value>,
    /// Direct peer address, when known.
    pub peer_addr: Option<IpAddr>,
}

impl Request {
    /// Construct a minimal request with the given id, path, and method.
    pub fn new(id: impl Into<String>, path: impl Into<String>, method: HttpMethod) -> Self {
        Self {
            id: id.into(),
            path: path.into(),
            method,
            headers: HashMap::new(),
            body: Vec::new(),
            parsed_body: None,
            peer_addr: None,
        }
    }

    /// Builder helper: attach a header (name is lowercased).
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into().to_lowercase(), value.into());
        self
    }

    /// Builder helper: set the raw body.
    pub fn with_body(mut self, body: Vec<u8>) -> Self {
        self.body = body;
        self
    }

    /// Builder helper: set the parsed body.
    pub fn with_parsed_body(mut self, parsed: Value) -> Self {
        self.parsed_body = Some(parsed);
        self
    }

    /// Builder helper: set the peer address.
    pub fn with_peer_addr(mut self, addr: IpAddr) -> Self {
        self.peer_addr = Some(addr);
        self
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_lowercase()).map(String::as_str)
    }

    /// String value of a parsed-body field, when the body parsed to an
    /// object containing it.
    pub fn body_field(&self, name: &str) -> Option<&str> {
        self.parsed_body
            .as_ref()
            .and_then(|body| body.get(name))
            .and_then(Value::as_str)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Response
// ─────────────────────────────────────────────────────────────────────────────

/// An outbound response produced by an endpoint or a translator.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    /// HTTP status code (100–599).
    pub status: u16,
    /// Response headers (header names are lowercased).
    pub headers: HashMap<String, String>,
    /// Raw body bytes.
    pub body: Vec<u8>,
}

impl Response {
    /// Construct an empty response with the given status.
    pub fn new(status: u16) -> Self {
        Self {
            status,
            headers: HashMap::new(),
            body: Vec::new(),
        }
    }

    /// A plain-text response.
    pub fn text(status: u16, body: impl Into<String>) -> Self {
        Self::new(status)
            .with_header("content-type", "text/plain; charset=utf-8")
            .with_body(body.into().into_bytes())
    }

    /// An HTML response.
    pub fn html(status: u16, body: impl Into<String>) -> Self {
        Self::new(status)
            .with_header("content-type", "text/html; charset=utf-8")
            .with_body(body.into().into_bytes())
    }

    /// A JSON response serialized from `value`.
    pub fn json(status: u16, value: &Value) -> Self {
        Self::new(status)
            .with_header("content-type", "application/json")
            .with_body(value.to_string().into_bytes())
    }

    /// A `302 Found` redirect to `location`.
    pub fn redirect(location: impl Into<String>) -> Self {
        Self::new(302).with_header("location", location.into())
    }

    /// Builder helper: attach a header (name is lowercased).
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into().to_lowercase(), value.into());
        self
    }

    /// Builder helper: set the body.
    pub fn with_body(mut self, body: Vec<u8>) -> Self {
        self.body = body;
        self
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_lowercase()).map(String::as_str)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Recursion guard
// ─────────────────────────────────────────────────────────────────────────────

/// Per-request guard preventing the terminal handler from re-entering
/// itself while already rendering a failure.
///
/// The guard is scoped to one in-flight request: separate concurrent
/// requests failing simultaneously are independent handling passes and
/// never trip each other.
#[derive(Debug, Clone, Default)]
pub struct RecursionGuard {
    handling: Arc<AtomicBool>,
}

impl RecursionGuard {
    /// Fresh guard in the `Idle` state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Attempt the `Idle -> Handling` transition.  Returns `true` exactly
    /// once; a second call on the same guard observes the in-progress
    /// handling pass and returns `false`.
    pub fn enter(&self) -> bool {
        self.handling
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    /// Whether a terminal-handling pass is currently in flight.
    pub fn active(&self) -> bool {
        self.handling.load(Ordering::SeqCst)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Request context
// ─────────────────────────────────────────────────────────────────────────────

/// Per-request state that flows through the pipeline.
///
/// Carries the inbound request, the session collaborator, free-form
/// attributes written and read by stages, the terminal recursion guard,
/// and a staging buffer for output that has not yet been sent.
pub struct RequestContext {
    /// The inbound request.
    pub request: Request,
    /// Session collaborator for this request.
    pub session: Arc<dyn Session>,
    /// Free-form attributes written and read by stages.
    pub attributes: HashMap<String, Value>,
    guard: RecursionGuard,
    output_buffer: Mutex<Vec<u8>>,
}

impl RequestContext {
    /// Create a fresh context from an inbound request and its session.
    pub fn new(request: Request, session: Arc<dyn Session>) -> Self {
        Self {
            request,
            session,
            attributes: HashMap::new(),
            guard: RecursionGuard::new(),
            output_buffer: Mutex::new(Vec::new()),
        }
    }

    /// The terminal recursion guard scoped to this request.
    pub fn guard(&self) -> &RecursionGuard {
        &self.guard
    }

    /// Stage output bytes that have been produced but not yet sent.
    pub fn stage_output(&self, bytes: &[u8]) {
        if let Ok(mut buffer) = self.output_buffer.lock() {
            buffer.extend_from_slice(bytes);
        }
    }

    /// Drain and discard any buffered-but-unsent output, returning what
    /// was staged.  Called by the terminal handler so a partial page
    /// cannot corrupt the error response.
    pub fn discard_buffered_output(&self) -> Vec<u8> {
        match self.output_buffer.lock() {
            Ok(mut buffer) => std::mem::take(&mut *buffer),
            Err(_) => Vec::new(),
        }
    }

    /// Where a translator should redirect the caller after flashing:
    /// the `Referer` header, else the session's remembered previous URL,
    /// else `/`.
    pub fn redirect_target(&self) -> String {
        if let Some(referer) = self.request.header("referer") {
            return referer.to_string();
        }
        self.session
            .previous_url()
            .unwrap_or_else(|| "/".to_string())
    }

    /// Convenience: read a typed attribute, returning `None` if absent or
    /// if deserialization fails.
    pub fn get_attr<T: serde::de::DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.attributes
            .get(key)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    /// Convenience: write a serializable attribute.
    pub fn set_attr<T: serde::Serialize>(&mut self, key: impl Into<String>, val: &T) {
        if let Ok(v) = serde_json::to_value(val) {
            self.attributes.insert(key.into(), v);
        }
    }
}

impl std::fmt::Debug for RequestContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestContext")
            .field("request", &self.request)
            .field("attributes", &self.attributes)
            .field("guard", &self.guard)
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    struct NullSession {
        previous: Option<String>,
    }

    impl Session for NullSession {
        fn flash(&self, _key: &str, _value: Value) {}
        fn previous_url(&self) -> Option<String> {
            self.previous.clone()
        }
        fn token(&self) -> Option<String> {
            None
        }
    }

    fn ctx(request: Request, previous: Option<&str>) -> RequestContext {
        RequestContext::new(
            request,
            Arc::new(NullSession {
                previous: previous.map(String::from),
            }),
        )
    }

    #[test]
    fn method_parse_is_case_insensitive() {
        assert_eq!(HttpMethod::from_str_ci("post"), Some(HttpMethod::Post));
        assert_eq!(HttpMethod::from_str_ci("TRACE"), Some(HttpMethod::Trace));
        assert_eq!(HttpMethod::from_str_ci("LINK"), None);
    }

    #[test]
    fn safe_methods_are_get_head_options_trace() {
        assert!(HttpMethod::Get.is_safe());
        assert!(HttpMethod::Head.is_safe());
        assert!(HttpMethod::Options.is_safe());
        assert!(HttpMethod::Trace.is_safe());
        assert!(!HttpMethod::Post.is_safe());
        assert!(!HttpMethod::Delete.is_safe());
    }

    #[test]
    fn header_lookup_is_case_insensitive() {
        let req = Request::new("r1", "/", HttpMethod::Get).with_header("X-Real-IP", "10.0.0.1");
        assert_eq!(req.header("x-real-ip"), Some("10.0.0.1"));
        assert_eq!(req.header("X-REAL-IP"), Some("10.0.0.1"));
    }

    #[test]
    fn redirect_builder_sets_location_and_302() {
        let resp = Response::redirect("/signup-form");
        assert_eq!(resp.status, 302);
        assert_eq!(resp.header("location"), Some("/signup-form"));
    }

    #[test]
    fn redirect_target_prefers_referer_then_session_then_root() {
        let with_referer = Request::new("r1", "/signup", HttpMethod::Post)
            .with_header("referer", "/signup-form");
        assert_eq!(
            ctx(with_referer, Some("/previous")).redirect_target(),
            "/signup-form"
        );

        let bare = Request::new("r2", "/signup", HttpMethod::Post);
        assert_eq!(ctx(bare.clone(), Some("/previous")).redirect_target(), "/previous");
        assert_eq!(ctx(bare, None).redirect_target(), "/");
    }

    #[test]
    fn recursion_guard_enters_exactly_once() {
        let guard = RecursionGuard::new();
        assert!(guard.enter());
        assert!(guard.active());
        assert!(!guard.enter());
    }

    #[test]
    fn discard_buffered_output_drains_staging() {
        let context = ctx(Request::new("r1", "/", HttpMethod::Get), None);
        context.stage_output(b"partial page");
        assert_eq!(context.discard_buffered_output(), b"partial page");
        assert!(context.discard_buffered_output().is_empty());
    }
}
