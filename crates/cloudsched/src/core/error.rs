//! Errors surfaced by configuration validation and simulation runs.

use thiserror::Error;

/// Fatal simulation errors.
///
/// Per-VM and per-cloudlet admission problems are statuses, not errors: they
/// change the entity's state without aborting the run. Errors of this type
/// abort the affected policy run and are propagated to the caller.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SimulationError {
    /// Malformed configuration, rejected before the clock starts.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// Internal modeling bug detected during the run.
    #[error("simulation invariant violated: {0}")]
    InvariantViolation(String),
}
