//! Errors that end a demo run.

use strata_billboard::BillboardError;
use strata_voxel::RegistryError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DemoError {
    #[error("world setup failed: {0}")]
    Registry(#[from] RegistryError),
    #[error("billboard setup failed: {0}")]
    Billboard(#[from] BillboardError),
    /// A species was registered but its spawner could not be looked up.
    #[error("billboard species {0} missing after registration")]
    MissingSpecies(&'static str),
    #[error("billboard producer thread panicked")]
    ProducerPanicked,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrapped_errors_keep_their_message() {
        let err: DemoError = BillboardError::ZeroCapacity("tree".to_string()).into();
        assert!(matches!(err, DemoError::Billboard(_)));
        assert_eq!(err.to_string(), "billboard setup failed: billboard species tree has zero capacity");
    }
}
