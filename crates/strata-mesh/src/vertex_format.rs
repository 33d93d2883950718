//! Canonical `wgpu::VertexBufferLayout`s for solid and liquid chunk meshes.
//!
//! Every pipeline that draws chunk geometry references these constants so
//! the layouts cannot drift from the vertex structs.
//!
//! ## Solid vertex
//!
//! | Location | Offset | Format    | Field    |
//! |----------|--------|-----------|----------|
//! | 0        | 0      | Float32x3 | position |
//! | 1        | 12     | Float32x3 | normal   |
//! | 2        | 24     | Float32x2 | uv       |
//! | 3        | 32     | Unorm8x4  | color    |
//! | 4        | 36     | Uint32    | texture  |
//!
//! ## Liquid vertex
//!
//! | Location | Offset | Format    | Field    |
//! |----------|--------|-----------|----------|
//! | 0        | 0      | Float32x3 | position |
//! | 1        | 12     | Float32x3 | normal   |
//! | 2        | 24     | Float32x2 | uv       |
//! | 3        | 32     | Float32   | foam     |
//! | 4        | 36     | Float32x2 | flow     |
//! | 5        | 44     | Uint32    | texture  |

use std::mem;

use wgpu::{VertexAttribute, VertexBufferLayout, VertexFormat, VertexStepMode};

use crate::chunk_mesh::ChunkVertex;
use crate::liquid::LiquidVertex;

/// Vertex attributes for [`ChunkVertex`].
pub const CHUNK_VERTEX_ATTRIBUTES: [VertexAttribute; 5] = [
    VertexAttribute {
        format: VertexFormat::Float32x3,
        offset: 0,
        shader_location: 0,
    },
    VertexAttribute {
        format: VertexFormat::Float32x3,
        offset: 12,
        shader_location: 1,
    },
    VertexAttribute {
        format: VertexFormat::Float32x2,
        offset: 24,
        shader_location: 2,
    },
    VertexAttribute {
        format: VertexFormat::Unorm8x4,
        offset: 32,
        shader_location: 3,
    },
    VertexAttribute {
        format: VertexFormat::Uint32,
        offset: 36,
        shader_location: 4,
    },
];

/// Buffer layout for solid chunk meshes.
pub const CHUNK_VERTEX_LAYOUT: VertexBufferLayout<'static> = VertexBufferLayout {
    array_stride: mem::size_of::<ChunkVertex>() as u64,
    step_mode: VertexStepMode::Vertex,
    attributes: &CHUNK_VERTEX_ATTRIBUTES,
};

/// Vertex attributes for [`LiquidVertex`].
pub const LIQUID_VERTEX_ATTRIBUTES: [VertexAttribute; 6] = [
    VertexAttribute {
        format: VertexFormat::Float32x3,
        offset: 0,
        shader_location: 0,
    },
    VertexAttribute {
        format: VertexFormat::Float32x3,
        offset: 12,
        shader_location: 1,
    },
    VertexAttribute {
        format: VertexFormat::Float32x2,
        offset: 24,
        shader_location: 2,
    },
    VertexAttribute {
        format: VertexFormat::Float32,
        offset: 32,
        shader_location: 3,
    },
    VertexAttribute {
        format: VertexFormat::Float32x2,
        offset: 36,
        shader_location: 4,
    },
    VertexAttribute {
        format: VertexFormat::Uint32,
        offset: 44,
        shader_location: 5,
    },
];

/// Buffer layout for liquid surface meshes.
pub const LIQUID_VERTEX_LAYOUT: VertexBufferLayout<'static> = VertexBufferLayout {
    array_stride: mem::size_of::<LiquidVertex>() as u64,
    step_mode: VertexStepMode::Vertex,
    attributes: &LIQUID_VERTEX_ATTRIBUTES,
};

// ---------------------------------------------------------------------------
// Compile-time validation
// ---------------------------------------------------------------------------

const _: () = assert!(
    mem::size_of::<ChunkVertex>() == 40,
    "ChunkVertex size changed, update CHUNK_VERTEX_LAYOUT"
);
const _: () = assert!(
    mem::size_of::<LiquidVertex>() == 48,
    "LiquidVertex size changed, update LIQUID_VERTEX_LAYOUT"
);

const _: () = assert!(CHUNK_VERTEX_ATTRIBUTES[4].offset + 4 <= mem::size_of::<ChunkVertex>() as u64);
const _: () = assert!(LIQUID_VERTEX_ATTRIBUTES[5].offset + 4 <= mem::size_of::<LiquidVertex>() as u64);
