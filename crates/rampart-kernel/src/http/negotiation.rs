//! Request classification helpers shared across the pipeline.
//!
//! Every component that branches on "is this a JSON/AJAX request" — the
//! throttle translator, the terminal render tiers, the emergency builder —
//! uses the same predicate, so a request is never classified one way by
//! one component and another way by the next.

use super::types::Request;
use std::net::IpAddr;

/// Whether the caller should receive a JSON body rather than HTML.
///
/// True when any of the following holds:
/// - the `Accept` or `Content-Type` header contains `application/json`;
/// - the `X-Requested-With` header equals `XMLHttpRequest`;
/// - the request path starts with `/api/`.
///
/// All comparisons are case-insensitive.
pub fn wants_json(request: &Request) -> bool {
    let header_contains = |name: &str, needle: &str| {
        request
            .header(name)
            .is_some_and(|value| value.to_lowercase().contains(needle))
    };

    header_contains("accept", "application/json")
        || header_contains("content-type", "application/json")
        || request
            .header("x-requested-with")
            .is_some_and(|value| value.eq_ignore_ascii_case("XMLHttpRequest"))
        || request.path.starts_with("/api/")
}

/// Headers consulted for the client address, most trustworthy first.
const CLIENT_IP_HEADERS: [&str; 4] = ["cf-connecting-ip", "x-forwarded-for", "x-real-ip", "client-ip"];

/// Resolve the client IP for rate-limit keying.
///
/// Checks `CF-Connecting-IP`, `X-Forwarded-For` (first comma-separated
/// value), `X-Real-IP`, and `Client-IP` in order, then the direct peer
/// address, accepting the first syntactically valid IP literal.  Falls
/// back to `127.0.0.1`.
pub fn client_ip(request: &Request) -> IpAddr {
    for name in CLIENT_IP_HEADERS {
        let Some(raw) = request.header(name) else {
            continue;
        };
        // X-Forwarded-For may carry a proxy chain; the first entry is the
        // original client.
        let candidate = raw.split(',').next().unwrap_or(raw).trim();
        if let Ok(ip) = candidate.parse::<IpAddr>() {
            return ip;
        }
    }
    request
        .peer_addr
        .unwrap_or_else(|| IpAddr::from([127, 0, 0, 1]))
}
