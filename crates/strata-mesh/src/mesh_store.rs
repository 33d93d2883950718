//! Render-thread side of meshing: submits dirty chunks to the worker pipeline
//! and publishes finished meshes.
//!
//! Meshes are never mutated after publication. A newer result replaces the
//! stored `Arc` wholesale; the render thread can keep drawing an older one
//! it already cloned.

use std::sync::Arc;

use rustc_hash::FxHashMap;
use strata_voxel::{ChunkAddress, ChunkManager, MESH_DIRTY, RAMP_DIRTY};

use crate::async_mesh::{ChunkMeshSet, MeshingPipeline, MeshingResult, MeshingTask};
use crate::invalidation::{ChunkMeshState, SubmitOutcome};
use crate::neighborhood::ChunkNeighborhood;

/// Counts from one [`MeshStore::schedule_dirty`] pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ScheduleReport {
    /// Builds queued.
    pub submitted: usize,
    /// Dirty chunks whose mesh was already current.
    pub up_to_date: usize,
    /// Chunks left dirty for a later pass.
    pub deferred: usize,
}

/// Published meshes and per-chunk build state.
#[derive(Default)]
pub struct MeshStore {
    states: FxHashMap<ChunkAddress, ChunkMeshState>,
    meshes: FxHashMap<ChunkAddress, Arc<ChunkMeshSet>>,
    log_stats: bool,
}

impl MeshStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Logs face counts for every published mesh at debug level.
    pub fn with_stats_logging(mut self, enabled: bool) -> Self {
        self.log_stats = enabled;
        self
    }

    /// Submits a build for the chunk at `addr` if one is needed.
    ///
    /// A request for a chunk that already has a build in flight is dropped;
    /// the chunk's dirty flag brings it back once that build lands.
    pub fn request(
        &mut self,
        world: &ChunkManager,
        pipeline: &MeshingPipeline,
        addr: ChunkAddress,
    ) -> SubmitOutcome {
        let Some(chunk) = world.get_chunk(&addr) else {
            return SubmitOutcome::NotLoaded;
        };
        if chunk.is_dirty(RAMP_DIRTY) {
            return SubmitOutcome::RampsPending;
        }

        let state = self
            .states
            .entry(addr)
            .or_insert_with(|| ChunkMeshState::new(chunk.generation()));
        if state.generation != chunk.generation() {
            *state = ChunkMeshState::new(chunk.generation());
            self.meshes.remove(&addr);
        }
        if state.in_flight {
            tracing::debug!("mesh request for {:?} dropped: build in flight", addr);
            return SubmitOutcome::AlreadyInFlight;
        }
        if !state.is_stale(chunk.version()) {
            return SubmitOutcome::UpToDate;
        }

        let Some(neighborhood) = ChunkNeighborhood::capture(world, addr) else {
            return SubmitOutcome::NotLoaded;
        };
        let task = MeshingTask {
            chunk_addr: addr,
            neighborhood,
            data_version: chunk.version(),
            generation: chunk.generation(),
        };
        if !pipeline.submit(task) {
            return SubmitOutcome::BudgetExhausted;
        }
        state.in_flight = true;
        SubmitOutcome::Submitted
    }

    /// Requests builds for every mesh-dirty chunk, clearing the flag on the
    /// ones that were submitted or found current.
    pub fn schedule_dirty(
        &mut self,
        world: &mut ChunkManager,
        pipeline: &MeshingPipeline,
    ) -> ScheduleReport {
        let mut report = ScheduleReport::default();
        for addr in world.dirty_addresses(MESH_DIRTY) {
            let outcome = self.request(world, pipeline, addr);
            if outcome.settles_dirty()
                && let Some(chunk) = world.get_chunk_mut(&addr)
            {
                chunk.clear_dirty(MESH_DIRTY);
            }
            match outcome {
                SubmitOutcome::Submitted => report.submitted += 1,
                SubmitOutcome::UpToDate => report.up_to_date += 1,
                _ => report.deferred += 1,
            }
        }
        if report.submitted > 0 || report.deferred > 0 {
            tracing::trace!(
                "scheduled meshes: {} submitted, {} deferred",
                report.submitted,
                report.deferred
            );
        }
        report
    }

    /// Publishes a finished build.
    ///
    /// The chunk must still be loaded with the generation the build was
    /// captured from; otherwise the result is discarded. Returns `true` if
    /// the mesh was stored.
    pub fn publish(&mut self, world: &ChunkManager, result: MeshingResult) -> bool {
        let addr = result.chunk_addr;
        let live = world
            .get_chunk(&addr)
            .filter(|chunk| chunk.generation() == result.generation);
        let Some(chunk) = live else {
            tracing::debug!("discarding mesh for {:?}: chunk unloaded or reloaded", addr);
            if self
                .states
                .get(&addr)
                .is_some_and(|s| s.generation == result.generation)
            {
                self.states.remove(&addr);
                self.meshes.remove(&addr);
            }
            return false;
        };

        let state = self
            .states
            .entry(addr)
            .or_insert_with(|| ChunkMeshState::new(result.generation));
        state.in_flight = false;
        if result.data_version < state.meshed_version {
            tracing::debug!("discarding outdated mesh for {:?}", addr);
            return false;
        }
        state.meshed_version = result.data_version;
        if result.data_version != chunk.version() {
            tracing::trace!(
                "mesh for {:?} published at version {}, data is at {}",
                addr,
                result.data_version,
                chunk.version()
            );
        }

        if self.log_stats {
            tracing::debug!(
                "published mesh for {:?}: {} faces, {} liquid meshes",
                addr,
                result.meshes.quad_count(),
                result.meshes.liquids.len()
            );
        }
        self.meshes.insert(addr, Arc::new(result.meshes));
        true
    }

    /// Drains the pipeline and publishes every result. Returns the number
    /// published.
    pub fn collect(&mut self, world: &ChunkManager, pipeline: &MeshingPipeline) -> usize {
        pipeline
            .drain_results()
            .into_iter()
            .map(|result| self.publish(world, result))
            .filter(|published| *published)
            .count()
    }

    /// The published meshes for `addr`.
    pub fn mesh(&self, addr: &ChunkAddress) -> Option<&Arc<ChunkMeshSet>> {
        self.meshes.get(addr)
    }

    /// Build state for `addr`.
    pub fn state(&self, addr: &ChunkAddress) -> Option<&ChunkMeshState> {
        self.states.get(addr)
    }

    /// Drops everything known about `addr`. Any build still in flight for
    /// it will be discarded on arrival.
    pub fn forget(&mut self, addr: &ChunkAddress) {
        self.states.remove(addr);
        self.meshes.remove(addr);
    }

    /// Forgets chunks that are no longer loaded, or were reloaded since they
    /// were meshed. Returns the number removed.
    pub fn prune(&mut self, world: &ChunkManager) -> usize {
        let stale: Vec<ChunkAddress> = self
            .states
            .iter()
            .filter(|(addr, state)| {
                world
                    .get_chunk(addr)
                    .is_none_or(|chunk| chunk.generation() != state.generation)
            })
            .map(|(addr, _)| *addr)
            .collect();
        for addr in &stale {
            self.forget(addr);
        }
        stale.len()
    }

    /// Number of chunks with a published mesh.
    pub fn published_count(&self) -> usize {
        self.meshes.len()
    }

    /// Number of chunks with a build in flight.
    pub fn in_flight_count(&self) -> usize {
        self.states.values().filter(|s| s.in_flight).count()
    }

    /// Iterates over all published meshes.
    pub fn iter(&self) -> impl Iterator<Item = (&ChunkAddress, &Arc<ChunkMeshSet>)> {
        self.meshes.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    use glam::IVec3;
    use strata_voxel::{
        Chunk, ChunkDims, FaceTextures, LiquidTypeRegistry, TextureId, Voxel, VoxelTypeDef,
        VoxelTypeId, VoxelTypeRegistry,
    };

    use crate::async_mesh::mesh_neighborhood;
    use crate::context::{MeshContext, MeshSettings};

    fn ctx() -> MeshContext {
        let mut reg = VoxelTypeRegistry::new();
        reg.register(VoxelTypeDef {
            name: "stone".to_string(),
            ramp_capable: false,
            textures: FaceTextures::uniform(TextureId(1)),
            ramp_textures: None,
        })
        .unwrap();
        MeshContext::new(
            Arc::new(reg),
            Arc::new(LiquidTypeRegistry::new()),
            MeshSettings::default(),
        )
    }

    fn world() -> ChunkManager {
        let dims = ChunkDims::cube(4);
        let mut world = ChunkManager::new(dims);
        let mut chunk = Chunk::new(dims);
        chunk.set_voxel(1, 1, 1, Voxel::new(VoxelTypeId(1)));
        world.load_chunk(ChunkAddress::new(0, 0, 0), chunk);
        clear_ramps(&mut world);
        world
    }

    fn clear_ramps(world: &mut ChunkManager) {
        for addr in world.dirty_addresses(RAMP_DIRTY) {
            if let Some(chunk) = world.get_chunk_mut(&addr) {
                chunk.clear_dirty(RAMP_DIRTY);
            }
        }
    }

    fn collect_until(
        store: &mut MeshStore,
        world: &ChunkManager,
        pipeline: &MeshingPipeline,
        count: usize,
    ) {
        let start = Instant::now();
        let mut published = 0;
        while published < count {
            published += store.collect(world, pipeline);
            assert!(start.elapsed() < Duration::from_secs(10), "Timed out");
            std::thread::sleep(Duration::from_millis(1));
        }
    }

    fn result_for(world: &ChunkManager, addr: ChunkAddress, generation: u64) -> MeshingResult {
        let hood = ChunkNeighborhood::capture(world, addr).unwrap();
        MeshingResult {
            chunk_addr: addr,
            meshes: mesh_neighborhood(&hood, &ctx()),
            data_version: world.get_chunk(&addr).unwrap().version(),
            generation,
        }
    }

    #[test]
    fn test_schedule_and_collect_publishes() {
        let mut world = world();
        let pipeline = MeshingPipeline::new(1, 8, ctx());
        let mut store = MeshStore::new();
        let addr = ChunkAddress::new(0, 0, 0);

        let report = store.schedule_dirty(&mut world, &pipeline);
        assert_eq!(report.submitted, 1);
        assert!(!world.get_chunk(&addr).unwrap().is_dirty(MESH_DIRTY));

        collect_until(&mut store, &world, &pipeline, 1);
        assert_eq!(store.mesh(&addr).unwrap().quad_count(), 6);
        assert_eq!(store.in_flight_count(), 0);

        // Nothing changed: a second request finds the mesh current.
        assert_eq!(store.request(&world, &pipeline, addr), SubmitOutcome::UpToDate);
    }

    #[test]
    fn test_request_while_in_flight_is_dropped() {
        let world = world();
        let pipeline = MeshingPipeline::new(1, 8, ctx());
        let mut store = MeshStore::new();
        let addr = ChunkAddress::new(0, 0, 0);
        assert_eq!(store.request(&world, &pipeline, addr), SubmitOutcome::Submitted);
        assert_eq!(store.request(&world, &pipeline, addr), SubmitOutcome::AlreadyInFlight);
    }

    #[test]
    fn test_ramp_dirty_chunk_waits() {
        let mut world = world();
        world.set_voxel(IVec3::new(2, 1, 1), Voxel::new(VoxelTypeId(1)));
        let pipeline = MeshingPipeline::new(1, 8, ctx());
        let mut store = MeshStore::new();
        let report = store.schedule_dirty(&mut world, &pipeline);
        assert_eq!(report.deferred, 1);
        assert!(world.get_chunk(&ChunkAddress::new(0, 0, 0)).unwrap().is_dirty(MESH_DIRTY));
    }

    #[test]
    fn test_result_for_unloaded_chunk_discarded() {
        let mut world = world();
        let addr = ChunkAddress::new(0, 0, 0);
        let generation = world.get_chunk(&addr).unwrap().generation();
        let result = result_for(&world, addr, generation);

        world.unload_chunk(addr);
        let mut store = MeshStore::new();
        assert!(!store.publish(&world, result));
        assert!(store.mesh(&addr).is_none());
    }

    #[test]
    fn test_result_for_reloaded_chunk_discarded() {
        let mut world = world();
        let addr = ChunkAddress::new(0, 0, 0);
        let generation = world.get_chunk(&addr).unwrap().generation();
        let result = result_for(&world, addr, generation);

        world.load_chunk(addr, Chunk::new(world.dims()));
        let mut store = MeshStore::new();
        assert!(!store.publish(&world, result));

        let fresh = world.get_chunk(&addr).unwrap().generation();
        let result = result_for(&world, addr, fresh);
        assert!(store.publish(&world, result));
    }

    #[test]
    fn test_edit_after_publish_makes_mesh_stale() {
        let mut world = world();
        let addr = ChunkAddress::new(0, 0, 0);
        let generation = world.get_chunk(&addr).unwrap().generation();
        let mut store = MeshStore::new();
        assert!(store.publish(&world, result_for(&world, addr, generation)));

        world.set_voxel(IVec3::new(2, 2, 2), Voxel::new(VoxelTypeId(1)));
        let version = world.get_chunk(&addr).unwrap().version();
        assert!(store.state(&addr).unwrap().needs_remesh(version));
    }

    #[test]
    fn test_prune_forgets_unloaded() {
        let mut world = world();
        let addr = ChunkAddress::new(0, 0, 0);
        let generation = world.get_chunk(&addr).unwrap().generation();
        let mut store = MeshStore::new();
        store.publish(&world, result_for(&world, addr, generation));
        world.unload_chunk(addr);
        assert_eq!(store.prune(&world), 1);
        assert_eq!(store.published_count(), 0);
    }
}
