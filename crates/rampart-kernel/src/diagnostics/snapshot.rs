//! Read-only container snapshot consumed by the suggestion engine.
//!
//! The snapshot decouples diagnostics from the container's internal
//! representation: whoever assembles it copies the binding, alias, and
//! instance tables by value, plus an explicit declared-type registry that
//! stands in for runtime reflection.  BTree-backed maps keep iteration
//! deterministic, which the suggestion engine's ordering guarantee relies
//! on.

use std::collections::{BTreeMap, BTreeSet};

/// Structural shape of a declared type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeShape {
    /// A concrete type that can, in principle, be constructed.
    Concrete,
    /// An abstract type that requires a concrete binding.
    Abstract,
    /// An interface (trait-like) identifier that only exists as a contract.
    Interface,
}

/// Declared metadata for one type, populated at registration time.
///
/// This registry replaces runtime reflection: it carries exactly the
/// classifications the identifier analysis needs — shape, instantiability,
/// and the constructor parameters lacking type information.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeInfo {
    /// Structural shape.
    pub shape: TypeShape,
    /// Whether the container can construct the type directly.
    pub instantiable: bool,
    /// Names of constructor parameters with no type information.
    pub untyped_params: Vec<String>,
}

impl TypeInfo {
    /// A plain concrete, instantiable type.
    pub fn concrete() -> Self {
        Self {
            shape: TypeShape::Concrete,
            instantiable: true,
            untyped_params: Vec::new(),
        }
    }

    /// An abstract type.
    pub fn abstract_type() -> Self {
        Self {
            shape: TypeShape::Abstract,
            instantiable: false,
            untyped_params: Vec::new(),
        }
    }

    /// An interface-only identifier.
    pub fn interface() -> Self {
        Self {
            shape: TypeShape::Interface,
            instantiable: false,
            untyped_params: Vec::new(),
        }
    }

    /// Builder: mark the type non-instantiable (e.g. no public constructor).
    pub fn non_instantiable(mut self) -> Self {
        self.instantiable = false;
        self
    }

    /// Builder: record constructor parameters lacking type information.
    pub fn with_untyped_params(mut self, params: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.untyped_params = params.into_iter().map(Into::into).collect();
        self
    }
}

/// Immutable, by-value view of the container at the moment of failure.
#[derive(Debug, Clone, Default)]
pub struct ContainerSnapshot {
    bindings: BTreeMap<String, String>,
    aliases: BTreeMap<String, String>,
    instances: BTreeSet<String>,
    types: BTreeMap<String, TypeInfo>,
}

impl ContainerSnapshot {
    /// An empty snapshot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: record a binding from `abstract_id` to `target`.
    pub fn with_binding(mut self, abstract_id: impl Into<String>, target: impl Into<String>) -> Self {
        self.bindings.insert(abstract_id.into(), target.into());
        self
    }

    /// Builder: record an alias.
    pub fn with_alias(mut self, alias: impl Into<String>, target: impl Into<String>) -> Self {
        self.aliases.insert(alias.into(), target.into());
        self
    }

    /// Builder: record a shared (singleton) instance.
    pub fn with_instance(mut self, abstract_id: impl Into<String>) -> Self {
        self.instances.insert(abstract_id.into());
        self
    }

    /// Builder: record declared-type metadata.
    pub fn with_type(mut self, name: impl Into<String>, info: TypeInfo) -> Self {
        self.types.insert(name.into(), info);
        self
    }

    /// Whether a binding exists for `abstract_id`.
    pub fn has_binding(&self, abstract_id: &str) -> bool {
        self.bindings.contains_key(abstract_id)
    }

    /// All binding keys, in deterministic order.
    pub fn binding_keys(&self) -> impl Iterator<Item = &str> {
        self.bindings.keys().map(String::as_str)
    }

    /// The alias target for `alias`, when registered.
    pub fn alias_target(&self, alias: &str) -> Option<&str> {
        self.aliases.get(alias).map(String::as_str)
    }

    /// Whether a shared instance exists for `abstract_id`.
    pub fn has_instance(&self, abstract_id: &str) -> bool {
        self.instances.contains(abstract_id)
    }

    /// Declared metadata for `name`, when registered.
    pub fn type_info(&self, name: &str) -> Option<&TypeInfo> {
        self.types.get(name)
    }

    /// All declared type names, in deterministic order.
    pub fn declared_types(&self) -> impl Iterator<Item = &str> {
        self.types.keys().map(String::as_str)
    }
}
