//! Shared ValText types.
//!
//! The language catalogue used for asset staging and the lifecycle states
//! reported by the Riot Client patch log.

pub mod language;
pub mod lifecycle;

// Re-export primary types for convenience.
pub use language::{Language, Role, UnknownLanguage};
pub use lifecycle::{LifecycleState, Transition};
