//! Sensitive-field filtering for flashed old input.
//!
//! When the validation translator flashes the parsed request body back to
//! the session as "old input", any field whose name looks credential-like
//! must be dropped first.  Filtering recurses into nested maps so a
//! sensitive field cannot hide inside a sub-object.

use serde_json::Value;

/// Substrings that mark a field name as sensitive (matched
/// case-insensitively).
const SENSITIVE_MARKERS: [&str; 12] = [
    "password",
    "password_confirmation",
    "current_password",
    "new_password",
    "token",
    "secret",
    "api_key",
    "credit_card",
    "card_number",
    "cvv",
    "cvc",
    "ssn",
];

/// Whether a field name must never be flashed back to the client.
pub fn is_sensitive_field(name: &str) -> bool {
    let lowered = name.to_lowercase();
    SENSITIVE_MARKERS
        .iter()
        .any(|marker| lowered.contains(marker))
}

/// Return a copy of `value` with every sensitive field removed,
/// recursing into nested objects and arrays.
pub fn scrub_sensitive(value: &Value) -> Value {
    match value {
        Value::Object(fields) => Value::Object(
            fields
                .iter()
                .filter(|(name, _)| !is_sensitive_field(name))
                .map(|(name, nested)| (name.clone(), scrub_sensitive(nested)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.iter().map(scrub_sensitive).collect()),
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn top_level_and_nested_sensitive_fields_are_removed() {
        let input = json!({
            "password": "x",
            "profile": {"api_key": "y", "name": "z"}
        });
        assert_eq!(
            scrub_sensitive(&input),
            json!({"profile": {"name": "z"}})
        );
    }

    #[test]
    fn matching_is_case_insensitive_and_substring_based() {
        assert!(is_sensitive_field("Password"));
        assert!(is_sensitive_field("user_api_key"));
        assert!(is_sensitive_field("CREDIT_CARD_NUMBER"));
        assert!(is_sensitive_field("csrf_token"));
        assert!(!is_sensitive_field("username"));
        assert!(!is_sensitive_field("email"));
    }

    #[test]
    fn non_object_values_pass_through() {
        assert_eq!(scrub_sensitive(&json!("plain")), json!("plain"));
        assert_eq!(scrub_sensitive(&json!(42)), json!(42));
    }

    #[test]
    fn arrays_are_scrubbed_element_wise() {
        let input = json!([{"ssn": "1", "name": "a"}, {"name": "b"}]);
        assert_eq!(
            scrub_sensitive(&input),
            json!([{"name": "a"}, {"name": "b"}])
        );
    }
}
