//! Construction point for diagnostic failures.
//!
//! Every container-resolution failure in the system is built here, so
//! every instance carries remediation suggestions before it ever reaches
//! a translator or the terminal handler.  Caller-supplied custom
//! suggestions fully replace generated ones — they are never merged.

use super::snapshot::ContainerSnapshot;
use super::suggest;
use crate::failure::{ConflictKind, Failure, FailureKind};
use serde_json::Value;
use std::collections::BTreeMap;

// ─────────────────────────────────────────────────────────────────────────────
// Canned suggestion sets
// ─────────────────────────────────────────────────────────────────────────────

const CIRCULAR_SUGGESTIONS: [&str; 4] = [
    "Resolve one participant lazily so the cycle is broken at construction time.",
    "Introduce an interface so both sides depend on an abstraction instead of each other.",
    "Move one of the dependencies to setter injection after construction.",
    "A dependency cycle often signals a design problem; consider merging or splitting the involved types.",
];

const DUPLICATE_SUGGESTIONS: [&str; 2] = [
    "Remove one of the duplicate registrations, or register the second under a distinct name.",
    "If the rebind is intentional, drop the existing binding before registering the new one.",
];

const INCOMPATIBLE_SUGGESTIONS: [&str; 2] = [
    "Check that the new registration satisfies the contract the identifier was declared with.",
    "Register the incompatible implementation under its own identifier instead.",
];

const VALIDATION_CONFLICT_SUGGESTIONS: [&str; 1] =
    ["Fix the registration so it passes the container's structural validation, then bind it again."];

const CIRCULAR_ALIAS_SUGGESTIONS: [&str; 2] = [
    "Point the alias at a concrete binding instead of another alias.",
    "Remove one link of the alias chain so resolution can terminate.",
];

const GENERIC_CONFLICT_SUGGESTIONS: [&str; 1] =
    ["Inspect the conflicting registrations and keep only the one the application should use."];

/// Kinds of parameter-resolution failure with their own canned advice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParameterErrorKind {
    /// The parameter carries no type information at all.
    Untyped,
    /// The parameter is typed but nothing satisfies it.
    Unresolvable,
}

/// Kinds of instantiation failure with their own canned advice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstantiationErrorKind {
    /// The target is abstract.
    Abstract,
    /// The target is an interface with no binding.
    Interface,
    /// The target has no accessible constructor.
    NoConstructor,
}

// ─────────────────────────────────────────────────────────────────────────────
// DiagnosticFactory
// ─────────────────────────────────────────────────────────────────────────────

/// Stateless factory for the diagnostic failure kinds.
pub struct DiagnosticFactory;

impl DiagnosticFactory {
    /// A general resolution failure.
    ///
    /// When `abstract_id` is known, suggestions are generated from the
    /// failure context; without an identifier there is nothing to analyze
    /// and the suggestion list is empty.
    #[track_caller]
    pub fn resolution_failure(
        message: impl Into<String>,
        abstract_id: Option<&str>,
        cause: Option<Failure>,
        resolution_stack: Vec<String>,
        snapshot: &ContainerSnapshot,
        custom_suggestions: Option<Vec<String>>,
    ) -> Failure {
        let suggestions = custom_suggestions.unwrap_or_else(|| match abstract_id {
            Some(id) => suggest::generate(id, cause.as_ref(), &resolution_stack, snapshot),
            None => Vec::new(),
        });
        let failure = Failure::new(FailureKind::ContainerResolution {
            abstract_id: abstract_id.map(String::from),
            message: message.into(),
            resolution_stack,
            suggestions,
        });
        match cause {
            Some(cause) => failure.with_cause(cause),
            None => failure,
        }
    }

    /// A circular dependency closed by resolving `abstract_id`.
    ///
    /// `dependency_chain` holds the identifiers resolved on the way into
    /// the cycle and must not contain empty strings.
    #[track_caller]
    pub fn circular_dependency(
        abstract_id: impl Into<String>,
        dependency_chain: Vec<String>,
        custom_suggestions: Option<Vec<String>>,
    ) -> Failure {
        debug_assert!(
            dependency_chain.iter().all(|entry| !entry.is_empty()),
            "dependency chain entries must be non-empty"
        );
        let suggestions = custom_suggestions
            .unwrap_or_else(|| CIRCULAR_SUGGESTIONS.iter().map(|s| s.to_string()).collect());
        Failure::new(FailureKind::CircularDependency {
            abstract_id: abstract_id.into(),
            dependency_chain,
            suggestions,
        })
    }

    /// A binding conflict, with the message rendered from the
    /// per-conflict-type template.
    #[track_caller]
    pub fn binding_conflict(
        abstract_id: impl Into<String>,
        conflict: ConflictKind,
        details: BTreeMap<String, Value>,
        custom_suggestions: Option<Vec<String>>,
    ) -> Failure {
        let abstract_id = abstract_id.into();
        let message = conflict_message(&abstract_id, &conflict, &details);
        let suggestions =
            custom_suggestions.unwrap_or_else(|| conflict_suggestions(&conflict));
        Failure::new(FailureKind::BindingConflict {
            abstract_id,
            conflict,
            details,
            message,
            suggestions,
        })
    }

    /// No binding exists for `abstract_id`.
    ///
    /// Suggestions are the canned not-found set merged with the generated
    /// set, de-duplicated in order.
    #[track_caller]
    pub fn not_found(
        abstract_id: &str,
        cause: Option<Failure>,
        resolution_stack: Vec<String>,
        snapshot: &ContainerSnapshot,
    ) -> Failure {
        let mut suggestions = vec![
            format!("Register '{abstract_id}' in the container before resolving it."),
            format!(
                "If '{abstract_id}' should resolve automatically, check that the type is declared and instantiable."
            ),
        ];
        suggestions.extend(suggest::generate(
            abstract_id,
            cause.as_ref(),
            &resolution_stack,
            snapshot,
        ));
        let mut seen = std::collections::HashSet::new();
        suggestions.retain(|s| seen.insert(s.clone()));

        let failure = Failure::new(FailureKind::ContainerResolution {
            abstract_id: Some(abstract_id.to_string()),
            message: format!("No binding found for '{abstract_id}'"),
            resolution_stack,
            suggestions,
        });
        match cause {
            Some(cause) => failure.with_cause(cause),
            None => failure,
        }
    }

    /// A constructor parameter of `abstract_id` cannot be resolved.
    ///
    /// No generation pass runs here — stack and container context rarely
    /// help for parameter failures, so the advice is canned per error kind.
    #[track_caller]
    pub fn parameter_resolution(
        abstract_id: &str,
        parameter: &str,
        kind: ParameterErrorKind,
        resolution_stack: Vec<String>,
    ) -> Failure {
        let (message, suggestions) = match kind {
            ParameterErrorKind::Untyped => (
                format!("Cannot resolve untyped parameter '{parameter}' while building '{abstract_id}'"),
                vec![
                    format!("Add type information to parameter '{parameter}' so the container can resolve it."),
                    format!("Alternatively, register an explicit value for '{parameter}' when binding '{abstract_id}'."),
                ],
            ),
            ParameterErrorKind::Unresolvable => (
                format!("Cannot resolve parameter '{parameter}' while building '{abstract_id}'"),
                vec![
                    format!("Register a binding satisfying parameter '{parameter}' of '{abstract_id}'."),
                    format!("Or supply a default value for '{parameter}' so resolution can proceed without one."),
                ],
            ),
        };
        Failure::new(FailureKind::ContainerResolution {
            abstract_id: Some(abstract_id.to_string()),
            message,
            resolution_stack,
            suggestions,
        })
    }

    /// `abstract_id` cannot be instantiated.
    ///
    /// Like [`parameter_resolution`](Self::parameter_resolution), advice is
    /// canned per error kind with no generation pass.
    #[track_caller]
    pub fn instantiation(
        abstract_id: &str,
        kind: InstantiationErrorKind,
        resolution_stack: Vec<String>,
    ) -> Failure {
        let (detail, suggestions) = match kind {
            InstantiationErrorKind::Abstract => (
                "it is abstract",
                vec![format!("Bind '{abstract_id}' to a concrete implementation.")],
            ),
            InstantiationErrorKind::Interface => (
                "it is an interface",
                vec![format!(
                    "Bind the interface '{abstract_id}' to a concrete implementation."
                )],
            ),
            InstantiationErrorKind::NoConstructor => (
                "it has no accessible constructor",
                vec![format!(
                    "Expose a public constructor on '{abstract_id}' or register a factory closure for it."
                )],
            ),
        };
        Failure::new(FailureKind::ContainerResolution {
            abstract_id: Some(abstract_id.to_string()),
            message: format!("'{abstract_id}' is not instantiable: {detail}"),
            resolution_stack,
            suggestions,
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Conflict templates
// ─────────────────────────────────────────────────────────────────────────────

fn detail_str<'a>(details: &'a BTreeMap<String, Value>, key: &str) -> &'a str {
    details
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or("unknown")
}

fn conflict_message(
    abstract_id: &str,
    conflict: &ConflictKind,
    details: &BTreeMap<String, Value>,
) -> String {
    match conflict {
        ConflictKind::Duplicate => format!(
            "Duplicate binding for '{abstract_id}': already bound to '{}', attempted rebind to '{}'",
            detail_str(details, "existing_type"),
            detail_str(details, "new_type"),
        ),
        ConflictKind::Incompatible => format!(
            "Incompatible binding for '{abstract_id}': {}",
            detail_str(details, "reason"),
        ),
        ConflictKind::Validation => format!(
            "Binding for '{abstract_id}' failed validation: {}",
            detail_str(details, "validation_error"),
        ),
        ConflictKind::CircularAlias => {
            let chain = details
                .get("alias_chain")
                .and_then(Value::as_array)
                .map(|entries| {
                    entries
                        .iter()
                        .filter_map(Value::as_str)
                        .collect::<Vec<_>>()
                        .join(" -> ")
                })
                .unwrap_or_else(|| "unknown".to_string());
            format!("Circular alias chain for '{abstract_id}': {chain}")
        }
        ConflictKind::Other(name) => {
            format!("Binding conflict for '{abstract_id}' (type '{name}')")
        }
    }
}

fn conflict_suggestions(conflict: &ConflictKind) -> Vec<String> {
    let canned: &[&str] = match conflict {
        ConflictKind::Duplicate => &DUPLICATE_SUGGESTIONS,
        ConflictKind::Incompatible => &INCOMPATIBLE_SUGGESTIONS,
        ConflictKind::Validation => &VALIDATION_CONFLICT_SUGGESTIONS,
        ConflictKind::CircularAlias => &CIRCULAR_ALIAS_SUGGESTIONS,
        ConflictKind::Other(_) => &GENERIC_CONFLICT_SUGGESTIONS,
    };
    canned.iter().map(|s| s.to_string()).collect()
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn details(pairs: &[(&str, Value)]) -> BTreeMap<String, Value> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn duplicate_conflict_message_names_both_types() {
        let failure = DiagnosticFactory::binding_conflict(
            "X",
            ConflictKind::Duplicate,
            details(&[
                ("existing_type", json!("Foo")),
                ("new_type", json!("Bar")),
            ]),
            None,
        );
        let message = failure.to_string();
        assert!(message.contains("Duplicate binding for 'X'"));
        assert!(message.contains("Foo"));
        assert!(message.contains("Bar"));
    }

    #[test]
    fn incompatible_conflict_uses_reason_field() {
        let failure = DiagnosticFactory::binding_conflict(
            "cache",
            ConflictKind::Incompatible,
            details(&[("reason", json!("target does not implement Store"))]),
            None,
        );
        assert!(failure.to_string().contains("target does not implement Store"));
    }

    #[test]
    fn circular_alias_conflict_joins_chain() {
        let failure = DiagnosticFactory::binding_conflict(
            "a",
            ConflictKind::CircularAlias,
            details(&[("alias_chain", json!(["a", "b", "a"]))]),
            None,
        );
        assert!(failure.to_string().contains("a -> b -> a"));
    }

    #[test]
    fn unknown_conflict_type_falls_back_to_generic() {
        let failure = DiagnosticFactory::binding_conflict(
            "x",
            ConflictKind::Other("exotic".to_string()),
            BTreeMap::new(),
            None,
        );
        assert!(failure.to_string().contains("type 'exotic'"));
        assert_eq!(failure.suggestions(), &GENERIC_CONFLICT_SUGGESTIONS.map(String::from));
    }

    #[test]
    fn missing_detail_fields_render_as_unknown() {
        let failure = DiagnosticFactory::binding_conflict(
            "x",
            ConflictKind::Duplicate,
            BTreeMap::new(),
            None,
        );
        assert!(failure.to_string().contains("'unknown'"));
    }

    #[test]
    fn circular_dependency_message_is_the_full_path() {
        let failure = DiagnosticFactory::circular_dependency(
            "c",
            vec!["a".to_string(), "b".to_string()],
            None,
        );
        assert_eq!(
            failure.to_string(),
            "Circular dependency detected: a -> b -> c"
        );
        assert_eq!(failure.suggestions().len(), CIRCULAR_SUGGESTIONS.len());
    }

    #[test]
    fn custom_suggestions_fully_replace_generated_ones() {
        let failure = DiagnosticFactory::circular_dependency(
            "c",
            vec!["a".to_string()],
            Some(vec!["only this".to_string()]),
        );
        assert_eq!(failure.suggestions(), ["only this".to_string()]);
    }

    #[test]
    fn not_found_message_and_merged_suggestions() {
        let snapshot = ContainerSnapshot::new().with_binding("app.mailer", "SmtpMailer");
        let failure =
            DiagnosticFactory::not_found("app.mailers", None, Vec::new(), &snapshot);
        assert_eq!(failure.to_string(), "No binding found for 'app.mailers'");
        // Canned set first, then generated hints, no duplicates.
        assert!(failure.suggestions()[0].contains("Register 'app.mailers'"));
        assert!(failure
            .suggestions()
            .iter()
            .any(|s| s.contains("app.mailer")));
        let mut seen = std::collections::HashSet::new();
        assert!(failure.suggestions().iter().all(|s| seen.insert(s)));
    }

    #[test]
    fn resolution_failure_without_identifier_has_no_suggestions() {
        let snapshot = ContainerSnapshot::new();
        let failure = DiagnosticFactory::resolution_failure(
            "resolution aborted",
            None,
            None,
            Vec::new(),
            &snapshot,
            None,
        );
        assert!(failure.suggestions().is_empty());
    }

    #[test]
    fn parameter_resolution_advice_is_keyed_by_error_kind() {
        let untyped = DiagnosticFactory::parameter_resolution(
            "Reporter",
            "sink",
            ParameterErrorKind::Untyped,
            Vec::new(),
        );
        assert!(untyped.to_string().contains("untyped parameter 'sink'"));
        assert!(untyped.suggestions()[0].contains("Add type information"));

        let unresolvable = DiagnosticFactory::parameter_resolution(
            "Reporter",
            "sink",
            ParameterErrorKind::Unresolvable,
            Vec::new(),
        );
        assert!(unresolvable.suggestions()[0].contains("Register a binding"));
    }

    #[test]
    fn instantiation_advice_is_keyed_by_error_kind() {
        let failure = DiagnosticFactory::instantiation(
            "MailerContract",
            InstantiationErrorKind::Interface,
            Vec::new(),
        );
        assert!(failure.to_string().contains("is not instantiable"));
        assert!(failure.suggestions()[0].contains("concrete implementation"));
    }

    #[test]
    fn cause_is_attached_to_the_built_failure() {
        use std::error::Error;
        let snapshot = ContainerSnapshot::new();
        let cause = Failure::internal("underlying");
        let failure = DiagnosticFactory::not_found("svc", Some(cause), Vec::new(), &snapshot);
        assert_eq!(failure.source().unwrap().to_string(), "underlying");
    }
}
