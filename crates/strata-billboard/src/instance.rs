//! Billboard instances, their GPU layout, and the camera they are sorted
//! against.

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3, Vec4};
use static_assertions::assert_eq_size;

/// Identity of one billboard instance. Ids increase monotonically per batch.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstanceId(pub u64);

/// A camera-facing sprite placement.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BillboardInstance {
    pub id: InstanceId,
    /// World placement. Translation is the sprite center; the lengths of the
    /// X and Y axes are its width and height.
    pub transform: Mat4,
    /// Linear RGBA tint multiplied with the species texture.
    pub tint: Vec4,
}

impl BillboardInstance {
    /// World position of the sprite center.
    pub fn position(&self) -> Vec3 {
        self.transform.w_axis.truncate()
    }

    /// Packs the instance for the GPU buffer.
    pub fn to_raw(&self) -> InstanceRaw {
        InstanceRaw {
            model: self.transform.to_cols_array_2d(),
            tint: self.tint.to_array(),
        }
    }
}

/// GPU instance data: model matrix columns followed by the tint.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct InstanceRaw {
    pub model: [[f32; 4]; 4],
    pub tint: [f32; 4],
}

assert_eq_size!(InstanceRaw, [u8; 80]);

impl InstanceRaw {
    /// Per-instance vertex buffer layout (buffer slot 1, locations 2-6).
    pub const LAYOUT: wgpu::VertexBufferLayout<'static> = wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<InstanceRaw>() as wgpu::BufferAddress,
        step_mode: wgpu::VertexStepMode::Instance,
        attributes: &[
            wgpu::VertexAttribute {
                format: wgpu::VertexFormat::Float32x4,
                offset: 0,
                shader_location: 2,
            },
            wgpu::VertexAttribute {
                format: wgpu::VertexFormat::Float32x4,
                offset: 16,
                shader_location: 3,
            },
            wgpu::VertexAttribute {
                format: wgpu::VertexFormat::Float32x4,
                offset: 32,
                shader_location: 4,
            },
            wgpu::VertexAttribute {
                format: wgpu::VertexFormat::Float32x4,
                offset: 48,
                shader_location: 5,
            },
            wgpu::VertexAttribute {
                format: wgpu::VertexFormat::Float32x4,
                offset: 64,
                shader_location: 6,
            },
        ],
    };
}

/// The only camera properties billboard sorting needs.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CameraState {
    /// World position of the eye.
    pub position: Vec3,
    /// Unit view direction.
    pub forward: Vec3,
}

impl CameraState {
    /// Creates a camera state, normalizing `forward` (falls back to -Z).
    pub fn new(position: Vec3, forward: Vec3) -> Self {
        Self {
            position,
            forward: forward.try_normalize().unwrap_or(Vec3::NEG_Z),
        }
    }
}

impl Default for CameraState {
    fn default() -> Self {
        Self::new(Vec3::ZERO, Vec3::NEG_Z)
    }
}
