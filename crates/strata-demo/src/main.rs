//! Headless demo of the Strata core: builds a small procedural world, meshes
//! it on the worker pool, edits it and remeshes, then drives billboard
//! batches from a producer thread while a camera moves through the scene.
//!
//! Configuration is loaded from `config.ron` and can be overridden via CLI
//! flags, e.g. `cargo run -p strata-demo -- --sliced --view-level 10`.

mod error;
mod world;

use std::process::ExitCode;
use std::sync::Arc;
use std::time::{Duration, Instant};

use clap::Parser;
use glam::{IVec3, Mat4, Vec3, Vec4};
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256StarStar;
use strata_billboard::{
    BatchSettings, BlendMode, CameraState, DepthPolicy, InstanceBatchRegistry, InstanceId,
};
use strata_config::{CliArgs, Config, ViewMode, default_config_dir};
use strata_mesh::{
    FaceDirection, MeshContext, MeshSettings, MeshStore, MeshingPipeline, SliceMode, SolidMesh,
    resolve_dirty_ramps,
};
use strata_voxel::{ChunkDims, ChunkManager, Voxel};
use tracing::{error, info, warn};

use crate::error::DemoError;

const SETTLE_TIMEOUT: Duration = Duration::from_secs(10);
const FRAME_DT: f32 = 1.0 / 30.0;
const FRAMES: usize = 30;

fn mesh_settings(config: &Config) -> MeshSettings {
    MeshSettings {
        ramp_depth: config.meshing.ramp_depth,
        jitter_amplitude: config.meshing.jitter_amplitude,
        jitter_seed: config.meshing.jitter_seed,
        slice_mode: match config.meshing.view_mode {
            ViewMode::Full => SliceMode::Whole,
            ViewMode::Sliced => SliceMode::Layers,
        },
        view_limit: config.meshing.view_level,
        puddle_depth_threshold: config.liquid.puddle_depth_threshold,
        puddle_foam: config.liquid.puddle_foam,
        liquid_uv_scale: config.liquid.uv_scale,
        max_column_scan: config.liquid.max_column_scan,
    }
}

fn worker_count(config: &Config) -> usize {
    match config.workers.mesh_threads {
        0 => num_cpus::get().saturating_sub(1).max(1),
        n => n as usize,
    }
}

/// Schedules and collects until every dirty chunk has a current mesh.
fn settle(store: &mut MeshStore, world: &mut ChunkManager, pipeline: &MeshingPipeline) -> bool {
    let started = Instant::now();
    loop {
        let report = store.schedule_dirty(world, pipeline);
        store.collect(world, pipeline);
        if report.submitted == 0 && report.deferred == 0 && store.in_flight_count() == 0 {
            return true;
        }
        if started.elapsed() > SETTLE_TIMEOUT {
            return false;
        }
        std::thread::sleep(Duration::from_millis(1));
    }
}

fn log_face_stats(store: &MeshStore) {
    let mut per_direction = [0usize; 6];
    let mut liquid_quads = 0;
    let mut ramped = 0;
    for (_, set) in store.iter() {
        if let SolidMesh::Whole(mesh) = &set.solid {
            for dir in FaceDirection::ALL {
                per_direction[dir.index()] += mesh.count_faces_for_direction(dir);
            }
            ramped += mesh.faces.iter().filter(|face| face.ramped).count();
        }
        liquid_quads += set.liquids.iter().map(|l| l.quad_count()).sum::<usize>();
    }
    let total: usize = store.iter().map(|(_, set)| set.quad_count()).sum();
    info!(
        "meshed {} chunks: {} quads (top {}, bottom {}, sides {}), {} ramped, {} liquid",
        store.published_count(),
        total,
        per_direction[FaceDirection::Top.index()],
        per_direction[FaceDirection::Bottom.index()],
        FaceDirection::SIDES
            .iter()
            .map(|dir| per_direction[dir.index()])
            .sum::<usize>(),
        ramped,
        liquid_quads
    );
}

fn species_settings(config: &Config, blend: BlendMode) -> BatchSettings {
    BatchSettings {
        capacity: config.billboards.default_capacity,
        sort_interval: config.billboards.sort_interval_secs,
        depth: DepthPolicy {
            cull_distance: config.billboards.cull_distance,
            depth_penalty: config.billboards.depth_penalty,
        },
        blend,
    }
}

fn run_billboards(config: &Config, points: Vec<IVec3>, center: Vec3) -> Result<(), DemoError> {
    let registry = InstanceBatchRegistry::new();
    registry.register("tree", species_settings(config, BlendMode::Alpha))?;
    registry.register("tuft", species_settings(config, BlendMode::Opaque))?;

    let trees = registry.spawner("tree").ok_or(DemoError::MissingSpecies("tree"))?;
    let tufts = registry.spawner("tuft").ok_or(DemoError::MissingSpecies("tuft"))?;

    let producer = std::thread::spawn(move || {
        let mut rng = Xoshiro256StarStar::seed_from_u64(42);
        let mut spawned: Vec<InstanceId> = Vec::new();
        for point in &points {
            let base = point.as_vec3() + Vec3::new(0.5, 0.0, 0.5);
            if rng.gen_bool(0.08) {
                let scale = rng.gen_range(2.0..4.0);
                let transform = Mat4::from_scale_rotation_translation(
                    Vec3::splat(scale),
                    glam::Quat::IDENTITY,
                    base,
                );
                spawned.push(trees.spawn(transform, Vec4::ONE));
            } else if rng.gen_bool(0.3) {
                let shade = rng.gen_range(0.7..1.0);
                let tint = Vec4::new(shade, 1.0, shade, 1.0);
                tufts.spawn(Mat4::from_translation(base), tint);
            }
        }
        // Fell a few trees once everything is queued.
        for id in spawned.iter().step_by(5) {
            trees.remove(*id);
        }
        spawned.len()
    });

    let mut resorts = 0;
    for frame in 0..FRAMES {
        let angle = frame as f32 / FRAMES as f32 * std::f32::consts::TAU;
        let position = center + Vec3::new(angle.cos() * 20.0, 18.0, angle.sin() * 20.0);
        let camera = CameraState::new(position, center - position);
        resorts += registry.update(&camera, FRAME_DT);
    }

    let trees_spawned = producer.join().map_err(|_| DemoError::ProducerPanicked)?;

    // Drain anything the producer queued after the last frame.
    let camera = CameraState::new(center + Vec3::new(0.0, 18.0, 20.0), Vec3::NEG_Z);
    for name in ["tree", "tuft"] {
        registry.with_batch_mut(name, |batch| batch.refresh(&camera));
    }

    let stats = registry.stats();
    info!(
        "billboards: {} species, {} instances ({} trees spawned), {} visible, {} re-sorts",
        stats.species, stats.instances, trees_spawned, stats.visible, resorts
    );
    Ok(())
}

fn run(config: &Config) -> Result<(), DemoError> {
    let [sx, sy, sz] = config.meshing.chunk_size;
    let dims = ChunkDims::new(sx as usize, sy as usize, sz as usize);
    let max_height = (world::WORLD_CHUNKS_Y * sy as i32).max(world::POND_LEVEL + 4);

    let (voxel_types, liquid_types, palette) = world::registries()?;
    let terrain = world::Terrain::new(config.meshing.jitter_seed, max_height);
    let mut chunks = world::build_world(dims, &terrain, &palette, &voxel_types, &liquid_types)?;

    let voxel_types = Arc::new(voxel_types);
    let liquid_types = Arc::new(liquid_types);
    let ramped = resolve_dirty_ramps(&mut chunks, &voxel_types);
    info!("resolved ramps in {ramped} chunks");

    let ctx = MeshContext::new(voxel_types.clone(), liquid_types, mesh_settings(config));
    let mut pipeline = MeshingPipeline::new(
        worker_count(config),
        config.workers.in_flight_budget.max(1) as usize,
        ctx,
    );
    let mut store = MeshStore::new().with_stats_logging(config.debug.log_mesh_stats);

    let started = Instant::now();
    if !settle(&mut store, &mut chunks, &pipeline) {
        warn!("initial meshing did not settle within {SETTLE_TIMEOUT:?}");
    }
    info!(
        "initial meshing on {} workers took {:?}",
        pipeline.worker_count(),
        started.elapsed()
    );
    log_face_stats(&store);

    // Dig a trench across the first chunk boundary and reslope its rim.
    let before = store.iter().map(|(_, set)| set.quad_count()).sum::<usize>();
    let boundary = sx as i32;
    for dx in -2..2 {
        let x = boundary + dx;
        let z = sz as i32 / 2;
        let top = terrain.height(x, z);
        for y in (top - 2)..=top {
            chunks.set_voxel(IVec3::new(x, y, z), Voxel::EMPTY);
        }
    }
    let resloped = resolve_dirty_ramps(&mut chunks, &voxel_types);
    if !settle(&mut store, &mut chunks, &pipeline) {
        warn!("remeshing did not settle within {SETTLE_TIMEOUT:?}");
    }
    let after = store.iter().map(|(_, set)| set.quad_count()).sum::<usize>();
    info!("trench edit: {resloped} chunks resloped, quads {before} -> {after}");

    pipeline.shutdown();

    let points = world::surface_points(dims, &terrain);
    let extent = Vec3::new(
        (world::WORLD_CHUNKS_XZ * sx as i32) as f32,
        0.0,
        (world::WORLD_CHUNKS_XZ * sz as i32) as f32,
    );
    run_billboards(config, points, extent * 0.5)
}

fn main() -> ExitCode {
    let args = CliArgs::parse();

    let config_dir = args.config.clone().unwrap_or_else(default_config_dir);

    let mut config = Config::load_or_create(&config_dir).unwrap_or_else(|e| {
        eprintln!("Failed to load config: {e}, using defaults");
        Config::default()
    });
    config.apply_cli_overrides(&args);

    let log_dir = config_dir.join("logs");
    strata_log::init_logging(Some(&log_dir), cfg!(debug_assertions), Some(&config));

    match run(&config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("demo failed: {e}");
            ExitCode::FAILURE
        }
    }
}
