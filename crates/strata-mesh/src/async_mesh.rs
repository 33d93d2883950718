//! Asynchronous meshing pipeline: offloads chunk meshing to a thread pool
//! using snapshot-based tasks and channels for result delivery.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread::JoinHandle;

use strata_voxel::ChunkAddress;

use crate::chunk_mesh::SolidMesh;
use crate::chunk_mesher::build_solid_mesh;
use crate::context::MeshContext;
use crate::liquid::{LiquidMesh, build_liquid_meshes};
use crate::neighborhood::ChunkNeighborhood;

/// Everything rendered for one chunk: solid geometry plus one surface mesh
/// per liquid type present.
#[derive(Clone, Debug, PartialEq)]
pub struct ChunkMeshSet {
    /// Solid voxel geometry.
    pub solid: SolidMesh,
    /// Liquid surfaces, in ascending liquid id order.
    pub liquids: Vec<LiquidMesh>,
}

impl ChunkMeshSet {
    /// Total faces across solid and liquid meshes.
    pub fn quad_count(&self) -> usize {
        self.solid.quad_count() + self.liquids.iter().map(LiquidMesh::quad_count).sum::<usize>()
    }
}

/// Meshes a captured neighborhood synchronously.
pub fn mesh_neighborhood(neighborhood: &ChunkNeighborhood, ctx: &MeshContext) -> ChunkMeshSet {
    let addr = neighborhood.addr();
    let center = neighborhood.center();
    ChunkMeshSet {
        solid: build_solid_mesh(addr, center, neighborhood, ctx),
        liquids: build_liquid_meshes(addr, center, neighborhood, ctx),
    }
}

/// A self-contained meshing task that can run on any thread.
///
/// Contains a snapshot of the chunk data and its neighborhood so that
/// no locks on world data are needed during meshing.
pub struct MeshingTask {
    /// The chunk address this mesh is for.
    pub chunk_addr: ChunkAddress,
    /// Snapshot of the chunk and its neighbors.
    pub neighborhood: ChunkNeighborhood,
    /// Version number of the chunk data at snapshot time.
    pub data_version: u64,
    /// Load generation of the chunk at snapshot time.
    pub generation: u64,
}

/// The result of a completed meshing task.
pub struct MeshingResult {
    /// The chunk address this mesh is for.
    pub chunk_addr: ChunkAddress,
    /// The generated meshes.
    pub meshes: ChunkMeshSet,
    /// Version number of the chunk data at snapshot time.
    pub data_version: u64,
    /// Load generation of the chunk at snapshot time.
    pub generation: u64,
}

/// Asynchronous meshing pipeline backed by a thread pool.
///
/// The main thread creates [`MeshingTask`]s containing neighborhood snapshots,
/// submits them via [`submit`](Self::submit), and collects [`MeshingResult`]s
/// each frame via [`drain_results`](Self::drain_results). Meshing never blocks
/// the main thread.
pub struct MeshingPipeline {
    task_sender: Option<crossbeam_channel::Sender<MeshingTask>>,
    result_receiver: crossbeam_channel::Receiver<MeshingResult>,
    worker_handles: Vec<JoinHandle<()>>,
    /// Maximum number of tasks that can be in flight simultaneously.
    budget: usize,
    in_flight: Arc<AtomicUsize>,
}

impl MeshingPipeline {
    /// Creates a pipeline with `worker_count` threads (at least one) and room
    /// for `budget` tasks in flight.
    pub fn new(worker_count: usize, budget: usize, ctx: MeshContext) -> Self {
        let budget = budget.max(1);
        let (task_tx, task_rx) = crossbeam_channel::bounded::<MeshingTask>(budget);
        let (result_tx, result_rx) = crossbeam_channel::unbounded();
        let in_flight = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::with_capacity(worker_count.max(1));
        for index in 0..worker_count.max(1) {
            let rx = task_rx.clone();
            let tx = result_tx.clone();
            let ctx = ctx.clone();
            let flight = Arc::clone(&in_flight);

            let spawned = std::thread::Builder::new()
                .name(format!("strata-mesh-{index}"))
                .spawn(move || {
                    while let Ok(task) = rx.recv() {
                        let meshes = mesh_neighborhood(&task.neighborhood, &ctx);
                        let _ = tx.send(MeshingResult {
                            chunk_addr: task.chunk_addr,
                            meshes,
                            data_version: task.data_version,
                            generation: task.generation,
                        });
                        flight.fetch_sub(1, Ordering::Relaxed);
                    }
                });
            match spawned {
                Ok(handle) => handles.push(handle),
                Err(e) => tracing::error!("failed to spawn mesh worker {index}: {e}"),
            }
        }
        tracing::info!("meshing pipeline started: {} workers, budget {}", handles.len(), budget);

        Self {
            task_sender: Some(task_tx),
            result_receiver: result_rx,
            worker_handles: handles,
            budget,
            in_flight,
        }
    }

    /// Submit a meshing task. Returns `false` if the budget is exhausted
    /// or the pipeline has been shut down.
    pub fn submit(&self, task: MeshingTask) -> bool {
        let Some(sender) = &self.task_sender else {
            return false;
        };
        if self.worker_handles.is_empty() || self.in_flight.load(Ordering::Relaxed) >= self.budget {
            return false;
        }
        self.in_flight.fetch_add(1, Ordering::Relaxed);
        if sender.try_send(task).is_err() {
            self.in_flight.fetch_sub(1, Ordering::Relaxed);
            return false;
        }
        true
    }

    /// Drain all completed results. Called once per frame on the main thread.
    pub fn drain_results(&self) -> Vec<MeshingResult> {
        self.result_receiver.try_iter().collect()
    }

    /// Number of tasks currently being processed or queued by workers.
    pub fn in_flight_count(&self) -> usize {
        self.in_flight.load(Ordering::Relaxed)
    }

    /// Number of running worker threads.
    pub fn worker_count(&self) -> usize {
        self.worker_handles.len()
    }

    /// Shut down all worker threads gracefully.
    ///
    /// Drops the task sender to signal workers to exit, then joins all threads.
    pub fn shutdown(&mut self) {
        self.task_sender.take();
        for handle in self.worker_handles.drain(..) {
            let _ = handle.join();
        }
    }
}

impl Drop for MeshingPipeline {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};
    use strata_voxel::{
        ChunkData, ChunkDims, FaceTextures, LiquidTypeRegistry, TextureId, Voxel, VoxelTypeDef,
        VoxelTypeId, VoxelTypeRegistry,
    };

    use crate::context::MeshSettings;

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

    fn task(addr: ChunkAddress, voxel: Voxel, version: u64) -> MeshingTask {
        let mut data = ChunkData::new(ChunkDims::cube(4));
        data.set_voxel(1, 1, 1, voxel);
        MeshingTask {
            chunk_addr: addr,
            neighborhood: ChunkNeighborhood::from_center_only(addr, Arc::new(data)),
            data_version: version,
            generation: 1,
        }
    }

    fn wait_for(pipeline: &MeshingPipeline, count: usize) -> Vec<MeshingResult> {
        let mut received = Vec::new();
        let start = Instant::now();
        while received.len() < count {
            received.extend(pipeline.drain_results());
            assert!(start.elapsed() < Duration::from_secs(10), "Timed out");
            std::thread::sleep(Duration::from_millis(1));
        }
        received
    }

    #[test]
    fn test_meshing_task_produces_valid_mesh() {
        let pipeline = MeshingPipeline::new(2, 8, ctx());
        let addr = ChunkAddress::new(0, 0, 0);
        assert!(pipeline.submit(task(addr, Voxel::new(VoxelTypeId(1)), 7)));

        let results = wait_for(&pipeline, 1);
        assert_eq!(results[0].chunk_addr, addr);
        assert_eq!(results[0].data_version, 7);
        assert_eq!(results[0].meshes.quad_count(), 6);
        assert!(results[0].meshes.liquids.is_empty());
    }

    #[test]
    fn test_concurrent_tasks_do_not_interfere() {
        let pipeline = MeshingPipeline::new(4, 16, ctx());
        let addresses: Vec<ChunkAddress> = (0..8).map(|i| ChunkAddress::new(i, 0, 0)).collect();
        for addr in &addresses {
            assert!(pipeline.submit(task(*addr, Voxel::EMPTY, 1)));
        }

        let mut received: Vec<_> = wait_for(&pipeline, 8).iter().map(|r| r.chunk_addr).collect();
        received.sort();
        assert_eq!(received, addresses);
    }

    #[test]
    fn test_budget_limits_active_tasks() {
        let pipeline = MeshingPipeline::new(1, 2, ctx());
        let submitted = (0..10)
            .filter(|i| pipeline.submit(task(ChunkAddress::new(*i, 0, 0), Voxel::new(VoxelTypeId(1)), 1)))
            .count();
        assert!(submitted <= 4, "Budget should limit submissions, got {submitted}");
    }

    #[test]
    fn test_shutdown_rejects_new_tasks() {
        let mut pipeline = MeshingPipeline::new(1, 2, ctx());
        pipeline.shutdown();
        assert!(!pipeline.submit(task(ChunkAddress::new(0, 0, 0), Voxel::EMPTY, 1)));
    }

    #[test]
    fn test_synchronous_mesh_matches_worker_output() {
        let pipeline = MeshingPipeline::new(1, 2, ctx());
        let addr = ChunkAddress::new(0, 0, 0);
        let expected = mesh_neighborhood(&task(addr, Voxel::new(VoxelTypeId(1)), 1).neighborhood, &ctx());
        assert!(pipeline.submit(task(addr, Voxel::new(VoxelTypeId(1)), 1)));
        let results = wait_for(&pipeline, 1);
        assert_eq!(results[0].meshes, expected);
    }
}
