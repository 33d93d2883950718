//! Per-chunk mesh bookkeeping: which data version was last meshed, whether a
//! build is in flight, and which load of the chunk it belongs to.

/// Mesh cache state for one chunk address.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ChunkMeshState {
    /// Data version of the currently published mesh (0 = none yet).
    pub meshed_version: u64,
    /// Load generation the state refers to.
    pub generation: u64,
    /// A build is queued or running.
    pub in_flight: bool,
}

impl ChunkMeshState {
    /// State for a freshly loaded chunk with no mesh.
    pub fn new(generation: u64) -> Self {
        Self {
            meshed_version: 0,
            generation,
            in_flight: false,
        }
    }

    /// Returns `true` if the published mesh does not match `data_version`.
    pub fn is_stale(&self, data_version: u64) -> bool {
        self.meshed_version != data_version
    }

    /// Returns `true` if a build should be submitted now.
    pub fn needs_remesh(&self, data_version: u64) -> bool {
        self.is_stale(data_version) && !self.in_flight
    }
}

/// What happened to a mesh request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// A build was queued.
    Submitted,
    /// A build for this chunk is already running; the request was dropped.
    AlreadyInFlight,
    /// The published mesh already matches the chunk's data.
    UpToDate,
    /// Ramps must be resolved before the chunk can be meshed.
    RampsPending,
    /// The worker queue is full; retry on a later frame.
    BudgetExhausted,
    /// No chunk is loaded at the address.
    NotLoaded,
}

impl SubmitOutcome {
    /// Returns `true` if the chunk's mesh-dirty flag can be cleared.
    pub fn settles_dirty(self) -> bool {
        matches!(self, Self::Submitted | Self::UpToDate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_state_is_stale() {
        let state = ChunkMeshState::new(3);
        assert!(state.is_stale(1));
        assert!(state.needs_remesh(1));
    }

    #[test]
    fn test_in_flight_blocks_remesh() {
        let state = ChunkMeshState {
            meshed_version: 1,
            generation: 1,
            in_flight: true,
        };
        assert!(state.is_stale(2));
        assert!(!state.needs_remesh(2));
    }

    #[test]
    fn test_matching_version_is_fresh() {
        let state = ChunkMeshState {
            meshed_version: 5,
            generation: 1,
            in_flight: false,
        };
        assert!(!state.needs_remesh(5));
    }

    #[test]
    fn test_only_submitted_or_fresh_settle_dirty() {
        assert!(SubmitOutcome::Submitted.settles_dirty());
        assert!(SubmitOutcome::UpToDate.settles_dirty());
        assert!(!SubmitOutcome::AlreadyInFlight.settles_dirty());
        assert!(!SubmitOutcome::BudgetExhausted.settles_dirty());
        assert!(!SubmitOutcome::RampsPending.settles_dirty());
    }
}
