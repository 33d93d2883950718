//! Shared, immutable inputs for every meshing call.

use std::sync::Arc;

use strata_voxel::{LiquidTypeRegistry, VoxelTypeRegistry};

use crate::face_visibility::FaceVisibilityTable;
use crate::jitter::VertexJitter;

/// Whether solid geometry is built as one mesh or one mesh per layer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SliceMode {
    /// One [`ChunkMesh`](crate::ChunkMesh) per chunk.
    #[default]
    Whole,
    /// One [`SliceMesh`](crate::SliceMesh) per horizontal layer.
    Layers,
}

/// Tunable meshing parameters.
#[derive(Clone, Debug, PartialEq)]
pub struct MeshSettings {
    /// How far a ramped top corner is lowered, in voxel units.
    pub ramp_depth: f32,
    /// Maximum jitter displacement per axis.
    pub jitter_amplitude: f32,
    /// Seed for the jitter noise.
    pub jitter_seed: u32,
    /// Solid mesh layout.
    pub slice_mode: SliceMode,
    /// Highest visible world Y, if the view is cut.
    pub view_limit: Option<i32>,
    /// Columns shallower than this (sum of levels) render as puddles.
    pub puddle_depth_threshold: u32,
    /// Foam floor applied to puddles.
    pub puddle_foam: f32,
    /// World-space tiling factor for liquid texture coordinates.
    pub liquid_uv_scale: f32,
    /// Cells walked below a chunk to seed column depth.
    pub max_column_scan: u32,
}

impl Default for MeshSettings {
    fn default() -> Self {
        Self {
            ramp_depth: 0.5,
            jitter_amplitude: 0.02,
            jitter_seed: 0x5EED,
            slice_mode: SliceMode::Whole,
            view_limit: None,
            puddle_depth_threshold: 32,
            puddle_foam: 0.95,
            liquid_uv_scale: 0.25,
            max_column_scan: 64,
        }
    }
}

/// Everything a mesher needs besides the voxels themselves.
///
/// Built once at startup. Cloning shares the registries and the face table.
#[derive(Clone, Debug)]
pub struct MeshContext {
    /// Voxel type definitions.
    pub voxel_types: Arc<VoxelTypeRegistry>,
    /// Liquid type definitions.
    pub liquid_types: Arc<LiquidTypeRegistry>,
    /// Precomputed side-face occlusion table.
    pub face_table: Arc<FaceVisibilityTable>,
    /// Meshing parameters.
    pub settings: MeshSettings,
    jitter: VertexJitter,
}

impl MeshContext {
    /// Builds a context, computing the face table.
    pub fn new(
        voxel_types: Arc<VoxelTypeRegistry>,
        liquid_types: Arc<LiquidTypeRegistry>,
        settings: MeshSettings,
    ) -> Self {
        Self::with_face_table(
            voxel_types,
            liquid_types,
            Arc::new(FaceVisibilityTable::new()),
            settings,
        )
    }

    /// Builds a context around an existing face table.
    pub fn with_face_table(
        voxel_types: Arc<VoxelTypeRegistry>,
        liquid_types: Arc<LiquidTypeRegistry>,
        face_table: Arc<FaceVisibilityTable>,
        settings: MeshSettings,
    ) -> Self {
        let jitter = VertexJitter::new(settings.jitter_seed, settings.jitter_amplitude);
        tracing::debug!(
            "mesh context: {} voxel types, {} liquid types, {} drawn face combinations",
            voxel_types.len(),
            liquid_types.len(),
            face_table.drawn_count()
        );
        Self {
            voxel_types,
            liquid_types,
            face_table,
            settings,
            jitter,
        }
    }

    /// Vertex jitter source.
    pub fn jitter(&self) -> &VertexJitter {
        &self.jitter
    }

    /// Copy of this context with a different view limit.
    pub fn with_view_limit(&self, view_limit: Option<i32>) -> Self {
        let mut ctx = self.clone();
        ctx.settings.view_limit = view_limit;
        ctx
    }
}
