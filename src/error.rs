//! Error types for the particle field.

use std::collections::TryReserveError;
use thiserror::Error;

/// Errors reported by the simulation lifecycle.
#[derive(Debug, Error)]
pub enum SimulationError {
    /// A frame or read operation was requested before a successful `init`.
    #[error("simulation not initialized; call init first")]
    NotInitialized,

    /// A simulation buffer could not be obtained.
    #[error("could not allocate {buffer} buffer")]
    Allocation {
        buffer: &'static str,
        #[source]
        source: TryReserveError,
    },

    /// The host asked for a negative number of particles.
    #[error("invalid particle count {0}; must be non-negative")]
    InvalidParticleCount(i64),

    #[error("invalid physics settings: {0}")]
    InvalidSettings(&'static str),
}

impl SimulationError {
    pub(crate) fn allocation(buffer: &'static str) -> impl FnOnce(TryReserveError) -> Self {
        move |source| SimulationError::Allocation { buffer, source }
    }
}
