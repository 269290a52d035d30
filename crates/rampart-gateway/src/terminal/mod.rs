//! Terminal failure handling.
//!
//! [`TerminalHandler`] is the single point where unknown failures are
//! accepted: it logs them, renders the best available tier, and never
//! itself throws past the [`emergency`] builder, whose final fallback has
//! no failing dependency.

pub mod emergency;
pub mod handler;

pub use handler::{RuntimeSignal, TerminalHandler, TerminalOutcome, TerminalState};
