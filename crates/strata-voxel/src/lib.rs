//! Voxel and liquid cell storage, type registries, chunk lifecycle, and the
//! cross-chunk neighbor query used by the meshers.

pub mod chunk;
pub mod chunk_api;
pub mod chunk_manager;
pub mod query;
pub mod ramp;
pub mod registry;
pub mod voxel;

pub use chunk::{ChunkData, ChunkDims};
pub use chunk_api::{Chunk, MESH_DIRTY, RAMP_DIRTY};
pub use chunk_manager::{ChunkAddress, ChunkManager, affected_chunks};
pub use query::{FACE_OFFSETS, VoxelQuery};
pub use ramp::{RampMask, TopCorner};
pub use registry::{
    FaceTextures, LiquidTypeDef, LiquidTypeId, LiquidTypeRegistry, RegistryError, TextureId,
    VoxelTypeDef, VoxelTypeId, VoxelTypeRegistry,
};
pub use voxel::{CubeCorner, LiquidCell, Rgba8, Voxel};
