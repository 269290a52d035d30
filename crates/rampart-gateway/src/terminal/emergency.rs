//! Last-resort response construction.
//!
//! The emergency builder runs when the normal render tiers cannot — a view
//! engine blew up, or the handler is degrading defensively.  It uses no
//! optional collaborator: body construction is `format!` and
//! `serde_json::json!` over already-owned data, so there is nothing left
//! on this path that can fail.

use rampart_kernel::failure::Failure;
use rampart_kernel::http::{Request, Response, wants_json};
use serde_json::json;

/// Maximum backtrace lines included in a debug emergency body.
const TRACE_LINE_LIMIT: usize = 10;

/// Build the emergency response for `failure`.
///
/// JSON vs HTML follows the same request-classification predicate used
/// pipeline-wide.  Debug mode includes the failure's kind, message,
/// origin, and a bounded trace excerpt; production renders a static
/// apology with no details.
pub fn build(failure: &Failure, request: &Request, debug: bool) -> Response {
    if wants_json(request) {
        let payload = if debug {
            json!({
                "error": {
                    "kind": failure.kind_name(),
                    "message": failure.to_string(),
                    "file": failure.file(),
                    "line": failure.line(),
                    "trace": trace_excerpt(failure, TRACE_LINE_LIMIT),
                }
            })
        } else {
            json!({ "message": "Server Error" })
        };
        return Response::json(500, &payload);
    }

    let body = if debug {
        format!(
            "<!DOCTYPE html>\n<html><head><title>Internal Server Error</title></head><body>\n\
             <h1>{kind}</h1>\n<p>{message}</p>\n<p><code>{file}:{line}</code></p>\n\
             <pre>{trace}</pre>\n</body></html>\n",
            kind = html_escape(failure.kind_name()),
            message = html_escape(&failure.to_string()),
            file = html_escape(failure.file()),
            line = failure.line(),
            trace = html_escape(&trace_excerpt(failure, TRACE_LINE_LIMIT).join("\n")),
        )
    } else {
        "<!DOCTYPE html>\n<html><head><title>Server Error</title></head><body>\n\
         <h1>Server Error</h1>\n<p>Something went wrong on our end. Please try again later.</p>\n\
         </body></html>\n"
            .to_string()
    };
    Response::html(500, body)
}

/// The hand-built minimal response used when nothing else may run: no
/// headers beyond `Content-Type`, plain-text body, status 500.  Built
/// from a struct literal so the surrounding failure path has nothing to
/// break.
pub fn bare() -> Response {
    Response {
        status: 500,
        headers: std::collections::HashMap::from([(
            "content-type".to_string(),
            "text/plain; charset=utf-8".to_string(),
        )]),
        body: b"Internal Server Error".to_vec(),
    }
}

/// First `limit` non-empty lines of the failure's backtrace rendering.
pub fn trace_excerpt(failure: &Failure, limit: usize) -> Vec<String> {
    format!("{}", failure.trace())
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .take(limit)
        .map(String::from)
        .collect()
}

/// Minimal HTML entity escaping for failure-derived text.
pub fn html_escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}
