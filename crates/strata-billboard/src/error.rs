//! Errors raised while setting up billboard species.

use thiserror::Error;

/// Failure to register or configure a billboard batch.
#[derive(Debug, Error, PartialEq)]
pub enum BillboardError {
    /// A batch with this name already exists.
    #[error("duplicate billboard species: {0}")]
    DuplicateSpecies(String),
    /// A batch must be able to show at least one instance.
    #[error("billboard species {0} has zero capacity")]
    ZeroCapacity(String),
    /// The sort interval must be finite and non-negative.
    #[error("billboard species {species} has invalid sort interval {interval}")]
    InvalidSortInterval {
        /// Species name.
        species: String,
        /// Rejected interval, in seconds.
        interval: f32,
    },
}
