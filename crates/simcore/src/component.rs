//! Simulation component identifiers.

/// Identifier of simulation component, assigned sequentially on registration.
pub type Id = u32;
