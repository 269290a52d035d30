//! Container-resolution diagnostics.
//!
//! When the service container fails to resolve an identifier, this module
//! turns the failure context into actionable remediation advice:
//!
//! - [`ContainerSnapshot`] — read-only, by-value view of the container's
//!   bindings, aliases, instances, and declared-type metadata.
//! - [`suggest::generate`] — pure analysis producing ranked suggestions.
//! - [`DiagnosticFactory`] — the single construction point for diagnostic
//!   failures, so every instance carries suggestions.
//!
//! Everything here is stateless and side-effect-free, hence trivially safe
//! for concurrent invocation.

pub mod factory;
pub mod similarity;
pub mod snapshot;
pub mod suggest;

pub use factory::{DiagnosticFactory, InstantiationErrorKind, ParameterErrorKind};
pub use similarity::similarity;
pub use snapshot::{ContainerSnapshot, TypeInfo, TypeShape};
