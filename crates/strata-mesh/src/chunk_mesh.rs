//! Solid chunk mesh data produced by the chunk mesher.

use strata_voxel::{Rgba8, TextureId};

use crate::face_direction::FaceDirection;

/// A single vertex in a solid chunk mesh.
///
/// Layout (40 bytes):
///   - `[0..12]`  position, chunk-local
///   - `[12..24]` face normal
///   - `[24..32]` uv within the face texture
///   - `[32..36]` baked corner color
///   - `[36..40]` texture layer
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ChunkVertex {
    /// Position relative to the chunk origin.
    pub position: [f32; 3],
    /// Face normal.
    pub normal: [f32; 3],
    /// Texture coordinates.
    pub uv: [f32; 2],
    /// Baked lighting, RGBA8.
    pub color: Rgba8,
    /// Texture atlas layer.
    pub texture: u32,
}

static_assertions::assert_eq_size!(ChunkVertex, [u8; 40]);

/// Metadata for a single emitted face, used for statistics and tests.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FaceInfo {
    /// Which direction the face points.
    pub direction: FaceDirection,
    /// Chunk-local voxel that owns the face.
    pub voxel: [u16; 3],
    /// Whether the owning voxel is ramped.
    pub ramped: bool,
}

/// The output of a solid meshing pass.
///
/// Immutable once built; moved from the worker to the render thread.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ChunkMesh {
    /// Vertex buffer.
    pub vertices: Vec<ChunkVertex>,
    /// Index buffer (triangles, 3 indices per triangle).
    pub indices: Vec<u32>,
    /// One entry per emitted face.
    pub faces: Vec<FaceInfo>,
}

impl ChunkMesh {
    /// Creates an empty mesh.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one quad. `corners` must wind counter-clockwise from outside.
    pub fn push_face(&mut self, info: FaceInfo, corners: [ChunkVertex; 4]) {
        let base = self.vertices.len() as u32;
        self.vertices.extend_from_slice(&corners);
        self.indices
            .extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
        self.faces.push(info);
    }

    /// Number of emitted faces.
    pub fn quad_count(&self) -> usize {
        self.faces.len()
    }

    /// Number of faces emitted for `direction`.
    pub fn count_faces_for_direction(&self, direction: FaceDirection) -> usize {
        self.faces.iter().filter(|f| f.direction == direction).count()
    }

    /// Faces emitted for the voxel at chunk-local `(x, y, z)`.
    pub fn faces_of(&self, x: u16, y: u16, z: u16) -> impl Iterator<Item = &FaceInfo> {
        self.faces.iter().filter(move |f| f.voxel == [x, y, z])
    }

    /// Returns `true` if nothing was emitted.
    pub fn is_empty(&self) -> bool {
        self.faces.is_empty()
    }

    /// Vertex data as raw bytes for GPU upload.
    pub fn vertex_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertices)
    }

    /// Index data as raw bytes for GPU upload.
    pub fn index_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.indices)
    }
}

/// Mesh of one horizontal layer in sliced view mode.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SliceMesh {
    /// Chunk-local y of the layer.
    pub layer: usize,
    /// Faces drawn whenever this layer is visible.
    pub body: ChunkMesh,
    /// Top faces that are only drawn when this layer is the highest visible
    /// one, closing the cut through solid ground.
    pub cap: ChunkMesh,
}

impl SliceMesh {
    /// Returns `true` if neither part has geometry.
    pub fn is_empty(&self) -> bool {
        self.body.is_empty() && self.cap.is_empty()
    }
}

/// Solid geometry for one chunk in either view mode.
#[derive(Clone, Debug, PartialEq)]
pub enum SolidMesh {
    /// One mesh for the whole chunk.
    Whole(ChunkMesh),
    /// One mesh per horizontal layer, bottom to top.
    Sliced(Vec<SliceMesh>),
}

impl SolidMesh {
    /// Total number of faces across all parts.
    pub fn quad_count(&self) -> usize {
        match self {
            Self::Whole(mesh) => mesh.quad_count(),
            Self::Sliced(slices) => slices
                .iter()
                .map(|s| s.body.quad_count() + s.cap.quad_count())
                .sum(),
        }
    }

    /// Returns `true` if nothing was emitted.
    pub fn is_empty(&self) -> bool {
        self.quad_count() == 0
    }
}

/// Converts a texture id into the vertex texture field.
pub(crate) fn texture_layer(texture: TextureId) -> u32 {
    u32::from(texture.0)
}
