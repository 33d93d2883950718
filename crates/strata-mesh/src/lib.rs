//! Chunk meshing: ramp resolution, face visibility, solid and liquid surface
//! meshes, and the worker pipeline that builds them off the main thread.

pub mod async_mesh;
pub mod chunk_mesh;
pub mod chunk_mesher;
pub mod context;
pub mod face_direction;
pub mod face_visibility;
pub mod invalidation;
pub mod jitter;
pub mod liquid;
pub mod mesh_store;
pub mod neighborhood;
pub mod ramp;
pub mod vertex_format;
pub mod visible_faces;

pub use chunk_mesh::{ChunkMesh, ChunkVertex, FaceInfo, SliceMesh, SolidMesh};
pub use chunk_mesher::{
    build_chunk_mesh, build_sliced_meshes, build_solid_mesh, is_fully_surrounded, visible_faces,
};
pub use context::{MeshContext, MeshSettings, SliceMode};
pub use face_direction::FaceDirection;
pub use face_visibility::{FaceVisibilityTable, edge_profile, face_exposed};
pub use jitter::VertexJitter;
pub use liquid::{
    CornerSample, LiquidFace, LiquidMesh, LiquidVertex, build_liquid_mesh, build_liquid_meshes,
    column_depth_run, column_depths, corner_sample, liquid_faces,
};
pub use neighborhood::ChunkNeighborhood;
pub use ramp::{RampPassReport, RampResolver, resolve_chunk_ramps, resolve_dirty_ramps};
pub use vertex_format::{
    CHUNK_VERTEX_ATTRIBUTES, CHUNK_VERTEX_LAYOUT, LIQUID_VERTEX_ATTRIBUTES, LIQUID_VERTEX_LAYOUT,
};
pub use visible_faces::VisibleFaces;

pub use async_mesh::{ChunkMeshSet, MeshingPipeline, MeshingResult, MeshingTask, mesh_neighborhood};
pub use invalidation::{ChunkMeshState, SubmitOutcome};
pub use mesh_store::{MeshStore, ScheduleReport};
