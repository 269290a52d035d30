//! Suggestion engine for container-resolution failures.
//!
//! [`generate`] is a pure function: given the failed identifier, the
//! triggering cause, the in-flight resolution stack, and a container
//! snapshot, it synthesizes a ranked list of human-readable remediation
//! suggestions.  It performs no I/O, holds no state, and never fails —
//! a lookup that finds nothing simply contributes no suggestion.
//!
//! Four independent analyses run in a fixed order (identifier, cause,
//! stack context, container state); their results are concatenated and
//! exact-duplicate strings collapse to their first occurrence, so
//! identical inputs always yield an identically ordered list.

use super::similarity::similarity;
use super::snapshot::{ContainerSnapshot, TypeShape};
use crate::failure::{Failure, FailureKind};
use std::collections::HashSet;

/// Identifier near-misses must score above this to be surfaced.
const NEAR_MISS_THRESHOLD: f64 = 0.8;
/// At most this many near-miss candidates are surfaced.
const NEAR_MISS_LIMIT: usize = 3;
/// Existing binding keys must score above this to be surfaced.
const BINDING_SIMILARITY_THRESHOLD: f64 = 0.7;
/// Resolution stacks deeper than this trigger a simplification hint.
const DEEP_STACK_THRESHOLD: usize = 10;

/// Canned remediation for a circular-dependency cause, shared between the
/// typed-tag shortcut and the message phrase table.
const CIRCULAR_CAUSE_REMEDY: &str =
    "Break the dependency cycle with lazy resolution or an intermediary abstraction.";

/// Known cause-message phrases and their canned remediations.
const CAUSE_PHRASES: [(&str, &str); 5] = [
    (
        "not found",
        "Register a binding for the missing identifier before resolving it.",
    ),
    ("circular dependency", CIRCULAR_CAUSE_REMEDY),
    (
        "not instantiable",
        "Ensure the target type is concrete and exposes a public constructor.",
    ),
    (
        "untyped parameter",
        "Add type information to the constructor parameters so the container can resolve them.",
    ),
    (
        "Cannot resolve parameter",
        "Provide an explicit binding or a default value for the parameter that cannot be resolved.",
    ),
];

/// Generate ranked remediation suggestions for a failed resolution.
pub fn generate(
    abstract_id: &str,
    cause: Option<&Failure>,
    resolution_stack: &[String],
    snapshot: &ContainerSnapshot,
) -> Vec<String> {
    let mut suggestions = Vec::new();
    suggestions.extend(identifier_analysis(abstract_id, snapshot));
    suggestions.extend(cause_analysis(cause));
    suggestions.extend(stack_analysis(abstract_id, resolution_stack));
    suggestions.extend(container_analysis(abstract_id, snapshot));
    dedupe(suggestions)
}

/// Collapse exact duplicates, keeping first-occurrence order.
fn dedupe(suggestions: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    suggestions
        .into_iter()
        .filter(|s| seen.insert(s.clone()))
        .collect()
}

// ─────────────────────────────────────────────────────────────────────────────
// Analysis 1: the identifier itself
// ─────────────────────────────────────────────────────────────────────────────

fn identifier_analysis(abstract_id: &str, snapshot: &ContainerSnapshot) -> Vec<String> {
    let mut out = Vec::new();
    match snapshot.type_info(abstract_id) {
        Some(info) => {
            match info.shape {
                TypeShape::Abstract => out.push(format!(
                    "'{abstract_id}' is abstract; bind it to a concrete implementation."
                )),
                TypeShape::Interface => out.push(format!(
                    "'{abstract_id}' is an interface; bind it to a concrete implementation."
                )),
                TypeShape::Concrete if !info.instantiable => out.push(format!(
                    "'{abstract_id}' is not instantiable; check that it exposes a public constructor."
                )),
                TypeShape::Concrete => {}
            }
            if !info.untyped_params.is_empty() {
                out.push(format!(
                    "Constructor parameters of '{abstract_id}' lack type information: {}; add explicit types so they can be resolved.",
                    info.untyped_params.join(", ")
                ));
            }
        }
        None => {
            out.push(format!(
                "'{abstract_id}' is not a declared type; check the spelling and that it is registered."
            ));
            out.extend(
                near_misses(abstract_id, snapshot)
                    .into_iter()
                    .map(|candidate| format!("Did you mean '{candidate}'?")),
            );
        }
    }
    out
}

/// Up to [`NEAR_MISS_LIMIT`] declared types scoring above
/// [`NEAR_MISS_THRESHOLD`], most similar first.
fn near_misses(abstract_id: &str, snapshot: &ContainerSnapshot) -> Vec<String> {
    let mut scored: Vec<(f64, &str)> = snapshot
        .declared_types()
        .map(|name| (similarity(abstract_id, name), name))
        .filter(|(score, _)| *score > NEAR_MISS_THRESHOLD)
        .collect();
    // Stable sort over the snapshot's deterministic iteration order, so
    // equal scores keep lexicographic order.
    scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
    scored
        .into_iter()
        .take(NEAR_MISS_LIMIT)
        .map(|(_, name)| name.to_string())
        .collect()
}

// ─────────────────────────────────────────────────────────────────────────────
// Analysis 2: the triggering cause
// ─────────────────────────────────────────────────────────────────────────────

fn cause_analysis(cause: Option<&Failure>) -> Vec<String> {
    let Some(cause) = cause else {
        return Vec::new();
    };
    // Prefer the typed kind tag where it is unambiguous; fall back to
    // substring matching against the rendered message for everything
    // else, including foreign causes carried as `Internal`.
    if matches!(cause.kind(), FailureKind::CircularDependency { .. }) {
        return vec![CIRCULAR_CAUSE_REMEDY.to_string()];
    }
    let message = cause.to_string();
    CAUSE_PHRASES
        .iter()
        .filter(|(phrase, _)| message.contains(phrase))
        .map(|(_, remedy)| remedy.to_string())
        .collect()
}

// ─────────────────────────────────────────────────────────────────────────────
// Analysis 3: the resolution stack
// ─────────────────────────────────────────────────────────────────────────────

fn stack_analysis(abstract_id: &str, stack: &[String]) -> Vec<String> {
    let mut out = Vec::new();
    if stack.len() > DEEP_STACK_THRESHOLD {
        out.push(format!(
            "The resolution stack is {} levels deep; consider simplifying the dependency graph.",
            stack.len()
        ));
    }
    if stack.iter().any(|entry| entry == abstract_id) {
        out.push(format!(
            "'{abstract_id}' is already being resolved further up the stack; break the cycle with lazy resolution."
        ));
    }
    let mentions = |pattern: &str| stack.iter().any(|entry| entry.contains(pattern));
    if mentions("Repository") && mentions("Service") {
        out.push(
            "Both Repository and Service types appear in the resolution stack; review the layering between those components."
                .to_string(),
        );
    }
    out
}

// ─────────────────────────────────────────────────────────────────────────────
// Analysis 4: container state
// ─────────────────────────────────────────────────────────────────────────────

fn container_analysis(abstract_id: &str, snapshot: &ContainerSnapshot) -> Vec<String> {
    let mut out = Vec::new();

    let mut scored: Vec<(f64, &str)> = snapshot
        .binding_keys()
        .filter(|key| *key != abstract_id)
        .map(|key| (similarity(abstract_id, key), key))
        .filter(|(score, _)| *score > BINDING_SIMILARITY_THRESHOLD)
        .collect();
    scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
    out.extend(
        scored
            .into_iter()
            .map(|(_, key)| format!("A similar binding exists: '{key}'.")),
    );

    if let Some(target) = snapshot.alias_target(abstract_id) {
        out.push(format!(
            "'{abstract_id}' is an alias for '{target}'; resolve the target directly if the alias is stale."
        ));
    }
    if snapshot.has_instance(abstract_id) {
        out.push(format!(
            "A shared instance of '{abstract_id}' is registered; it may have been corrupted or cleared before this resolution."
        ));
    }
    out
}

// =============================================================================
// Tests
// =============================================================================
