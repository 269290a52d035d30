//! Body parsing at the server boundary.
//!
//! Parsed bodies feed the CSRF `_token` lookup and the validation
//! translator's old-input flashing.  Parsing is best-effort: a body that
//! does not parse simply yields no parsed value, never an error.

use serde_json::{Map, Value};

/// Parse a request body into a JSON value based on its content type.
///
/// `application/json` bodies are deserialized directly;
/// `application/x-www-form-urlencoded` bodies become a flat JSON object.
/// Unrecognized content types and malformed bodies yield `None`.
pub fn parse_body(content_type: Option<&str>, body: &[u8]) -> Option<Value> {
    let content_type = content_type?.to_lowercase();
    if content_type.contains("application/json") {
        return serde_json::from_slice(body).ok();
    }
    if content_type.contains("application/x-www-form-urlencoded") {
        let text = std::str::from_utf8(body).ok()?;
        return Some(parse_form(text));
    }
    None
}

/// Parse an `application/x-www-form-urlencoded` payload into a JSON object.
///
/// Later occurrences of a repeated field overwrite earlier ones.
pub fn parse_form(payload: &str) -> Value {
    let mut fields = Map::new();
    for pair in payload.split('&').filter(|p| !p.is_empty()) {
        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        fields.insert(
            percent_decode(key),
            Value::String(percent_decode(value)),
        );
    }
    Value::Object(fields)
}

/// Decode a percent-encoded form component (`+` means space).
///
/// Invalid escape sequences are passed through verbatim rather than
/// rejected, matching lenient form-parsing behavior.
fn percent_decode(component: &str) -> String {
    let bytes = component.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'+' => {
                out.push(b' ');
                i += 1;
            }
            b'%' => match hex_pair(bytes.get(i + 1).copied(), bytes.get(i + 2).copied()) {
                Some(byte) => {
                    out.push(byte);
                    i += 3;
                }
                None => {
                    out.push(b'%');
                    i += 1;
                }
            },
            other => {
                out.push(other);
                i += 1;
            }
        }
    }
    String::from_utf8_lossy(&out).into_owned()
}

fn hex_pair(high: Option<u8>, low: Option<u8>) -> Option<u8> {
    let high = (high? as char).to_digit(16)?;
    let low = (low? as char).to_digit(16)?;
    Some((high * 16 + low) as u8)
}
