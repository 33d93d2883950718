//! wgpu resources for drawing billboard batches with one instanced call per
//! species.
//!
//! [`BillboardRenderer`] owns what every species shares: the unit quad, the
//! camera uniform, and one pipeline per [`BlendMode`]. Each species gets a
//! [`SpeciesGpu`] holding its texture bind group and a fixed-size instance
//! buffer sized for the batch capacity.

use std::num::NonZeroU64;

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};
use wgpu::util::DeviceExt;

use crate::instance::InstanceRaw;

/// How a species' sprites are combined with what is already drawn.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum BlendMode {
    /// No blending; writes depth.
    Opaque,
    /// Standard alpha blending.
    #[default]
    Alpha,
    /// Additive, for glows and sparks.
    Additive,
}

impl BlendMode {
    pub const ALL: [BlendMode; 3] = [BlendMode::Opaque, BlendMode::Alpha, BlendMode::Additive];

    fn index(self) -> usize {
        self as usize
    }

    /// Blend state for the color target.
    pub fn blend_state(self) -> Option<wgpu::BlendState> {
        match self {
            BlendMode::Opaque => None,
            BlendMode::Alpha => Some(wgpu::BlendState::ALPHA_BLENDING),
            BlendMode::Additive => Some(wgpu::BlendState {
                color: wgpu::BlendComponent {
                    src_factor: wgpu::BlendFactor::SrcAlpha,
                    dst_factor: wgpu::BlendFactor::One,
                    operation: wgpu::BlendOperation::Add,
                },
                alpha: wgpu::BlendComponent::OVER,
            }),
        }
    }

    fn writes_depth(self) -> bool {
        self == BlendMode::Opaque
    }
}

/// Camera uniform: view-projection plus the camera's right and up axes,
/// which the vertex shader uses to face sprites toward the viewer.
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct BillboardCameraUniform {
    pub view_proj: [[f32; 4]; 4],
    pub right: [f32; 4],
    pub up: [f32; 4],
}

static_assertions::assert_eq_size!(BillboardCameraUniform, [u8; 96]);

impl BillboardCameraUniform {
    pub fn new(view_proj: Mat4, right: Vec3, up: Vec3) -> Self {
        Self {
            view_proj: view_proj.to_cols_array_2d(),
            right: right.extend(0.0).to_array(),
            up: up.extend(0.0).to_array(),
        }
    }
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
struct QuadVertex {
    corner: [f32; 2],
}

impl QuadVertex {
    const LAYOUT: wgpu::VertexBufferLayout<'static> = wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<QuadVertex>() as wgpu::BufferAddress,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &[wgpu::VertexAttribute {
            format: wgpu::VertexFormat::Float32x2,
            offset: 0,
            shader_location: 0,
        }],
    };
}

const QUAD_VERTICES: [QuadVertex; 4] = [
    QuadVertex { corner: [-0.5, 0.0] },
    QuadVertex { corner: [0.5, 0.0] },
    QuadVertex { corner: [0.5, 1.0] },
    QuadVertex { corner: [-0.5, 1.0] },
];
const QUAD_INDICES: [u16; 6] = [0, 1, 2, 2, 3, 0];

/// WGSL source for billboard sprites. The quad is anchored at its bottom
/// center so sprites stand on the ground at their translation.
pub const BILLBOARD_SHADER_SOURCE: &str = r#"
struct Camera {
    view_proj: mat4x4<f32>,
    right: vec4<f32>,
    up: vec4<f32>,
};

@group(0) @binding(0)
var<uniform> camera: Camera;

@group(1) @binding(0)
var t_sprite: texture_2d<f32>;
@group(1) @binding(1)
var s_sprite: sampler;

struct VertexInput {
    @location(0) corner: vec2<f32>,
    @location(2) model_0: vec4<f32>,
    @location(3) model_1: vec4<f32>,
    @location(4) model_2: vec4<f32>,
    @location(5) model_3: vec4<f32>,
    @location(6) tint: vec4<f32>,
};

struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) uv: vec2<f32>,
    @location(1) tint: vec4<f32>,
};

@vertex
fn vs_main(in: VertexInput) -> VertexOutput {
    let center = in.model_3.xyz;
    let width = length(in.model_0.xyz);
    let height = length(in.model_1.xyz);
    let world = center
        + camera.right.xyz * in.corner.x * width
        + camera.up.xyz * in.corner.y * height;

    var out: VertexOutput;
    out.clip_position = camera.view_proj * vec4<f32>(world, 1.0);
    out.uv = vec2<f32>(in.corner.x + 0.5, 1.0 - in.corner.y);
    out.tint = in.tint;
    return out;
}

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    let color = textureSample(t_sprite, s_sprite, in.uv) * in.tint;
    if color.a < 0.01 {
        discard;
    }
    return color;
}
"#;

/// GPU resources of one species.
pub struct SpeciesGpu {
    instance_buffer: wgpu::Buffer,
    texture_bind_group: wgpu::BindGroup,
    capacity: u32,
    blend: BlendMode,
}

impl SpeciesGpu {
    /// Instances the buffer holds.
    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Buffer size in bytes. Fixed at creation.
    pub fn buffer_size(&self) -> u64 {
        self.instance_buffer.size()
    }

    pub fn blend(&self) -> BlendMode {
        self.blend
    }

    /// Writes `instances` to the start of the buffer, clamped to capacity.
    pub fn upload(&self, queue: &wgpu::Queue, instances: &[InstanceRaw]) {
        let count = instances.len().min(self.capacity as usize);
        if count > 0 {
            queue.write_buffer(&self.instance_buffer, 0, bytemuck::cast_slice(&instances[..count]));
        }
    }
}

/// Shared billboard pipelines and geometry.
pub struct BillboardRenderer {
    pipelines: [wgpu::RenderPipeline; 3],
    texture_bind_group_layout: wgpu::BindGroupLayout,
    camera_buffer: wgpu::Buffer,
    camera_bind_group: wgpu::BindGroup,
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
}

impl BillboardRenderer {
    /// Creates the renderer for a color target of `surface_format`, with an
    /// optional reverse-Z depth attachment.
    pub fn new(
        device: &wgpu::Device,
        surface_format: wgpu::TextureFormat,
        depth_format: Option<wgpu::TextureFormat>,
    ) -> Self {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("billboard-shader"),
            source: wgpu::ShaderSource::Wgsl(BILLBOARD_SHADER_SOURCE.into()),
        });

        let camera_bgl = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("billboard-camera-bgl"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: NonZeroU64::new(
                        std::mem::size_of::<BillboardCameraUniform>() as u64,
                    ),
                },
                count: None,
            }],
        });

        let texture_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("billboard-texture-bgl"),
                entries: &[
                    wgpu::BindGroupLayoutEntry {
                        binding: 0,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Texture {
                            sample_type: wgpu::TextureSampleType::Float { filterable: true },
                            view_dimension: wgpu::TextureViewDimension::D2,
                            multisampled: false,
                        },
                        count: None,
                    },
                    wgpu::BindGroupLayoutEntry {
                        binding: 1,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                        count: None,
                    },
                ],
            });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("billboard-pipeline-layout"),
            bind_group_layouts: &[&camera_bgl, &texture_bind_group_layout],
            immediate_size: 0,
        });

        let pipelines = BlendMode::ALL.map(|mode| {
            let depth_stencil = depth_format.map(|format| wgpu::DepthStencilState {
                format,
                depth_write_enabled: mode.writes_depth(),
                depth_compare: wgpu::CompareFunction::GreaterEqual,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            });
            device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some(match mode {
                    BlendMode::Opaque => "billboard-pipeline-opaque",
                    BlendMode::Alpha => "billboard-pipeline-alpha",
                    BlendMode::Additive => "billboard-pipeline-additive",
                }),
                layout: Some(&pipeline_layout),
                vertex: wgpu::VertexState {
                    module: &shader,
                    entry_point: Some("vs_main"),
                    buffers: &[QuadVertex::LAYOUT, InstanceRaw::LAYOUT],
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                },
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleList,
                    cull_mode: None, // sprites are seen from both sides
                    ..Default::default()
                },
                depth_stencil,
                multisample: wgpu::MultisampleState::default(),
                fragment: Some(wgpu::FragmentState {
                    module: &shader,
                    entry_point: Some("fs_main"),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: surface_format,
                        blend: mode.blend_state(),
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                }),
                multiview_mask: None,
                cache: None,
            })
        });

        let camera_uniform = BillboardCameraUniform::new(Mat4::IDENTITY, Vec3::X, Vec3::Y);
        let camera_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("billboard-camera"),
            contents: bytemuck::bytes_of(&camera_uniform),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let camera_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("billboard-camera-bg"),
            layout: &camera_bgl,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: camera_buffer.as_entire_binding(),
            }],
        });

        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("billboard-quad-vertices"),
            contents: bytemuck::cast_slice(&QUAD_VERTICES),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("billboard-quad-indices"),
            contents: bytemuck::cast_slice(&QUAD_INDICES),
            usage: wgpu::BufferUsages::INDEX,
        });

        tracing::info!("billboard renderer initialized ({surface_format:?})");

        Self {
            pipelines,
            texture_bind_group_layout,
            camera_buffer,
            camera_bind_group,
            vertex_buffer,
            index_buffer,
        }
    }

    /// Uploads the camera for this frame.
    pub fn update_camera(&self, queue: &wgpu::Queue, uniform: &BillboardCameraUniform) {
        queue.write_buffer(&self.camera_buffer, 0, bytemuck::bytes_of(uniform));
    }

    /// Allocates the resources of one species: a bind group for `texture`
    /// and an instance buffer for exactly `capacity` instances.
    pub fn create_species(
        &self,
        device: &wgpu::Device,
        name: &str,
        capacity: u32,
        blend: BlendMode,
        texture: &wgpu::TextureView,
        sampler: &wgpu::Sampler,
    ) -> SpeciesGpu {
        let instance_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(&format!("billboard-{name}-instances")),
            size: u64::from(capacity) * std::mem::size_of::<InstanceRaw>() as u64,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let texture_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(&format!("billboard-{name}-texture")),
            layout: &self.texture_bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(texture),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(sampler),
                },
            ],
        });
        tracing::debug!("allocated billboard species {name}: capacity {capacity}, {blend:?}");

        SpeciesGpu {
            instance_buffer,
            texture_bind_group,
            capacity,
            blend,
        }
    }

    /// Issues one instanced draw of the first `count` instances of `species`.
    pub fn draw(&self, pass: &mut wgpu::RenderPass<'_>, species: &SpeciesGpu, count: u32) {
        let count = count.min(species.capacity);
        if count == 0 {
            return;
        }
        pass.set_pipeline(&self.pipelines[species.blend.index()]);
        pass.set_bind_group(0, &self.camera_bind_group, &[]);
        pass.set_bind_group(1, &species.texture_bind_group, &[]);
        pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
        pass.set_vertex_buffer(1, species.instance_buffer.slice(..));
        pass.set_index_buffer(self.index_buffer.slice(..), wgpu::IndexFormat::Uint16);
        pass.draw_indexed(0..QUAD_INDICES.len() as u32, 0, 0..count);
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn test_device() -> Option<(wgpu::Device, wgpu::Queue)> {
        pollster::block_on(async {
            let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
                backends: wgpu::Backends::all(),
                ..Default::default()
            });
            let adapter = instance
                .request_adapter(&wgpu::RequestAdapterOptions {
                    power_preference: wgpu::PowerPreference::default(),
                    compatible_surface: None,
                    force_fallback_adapter: false,
                })
                .await
                .ok()?;
            adapter
                .request_device(&wgpu::DeviceDescriptor::default())
                .await
                .ok()
        })
    }

    pub(crate) fn test_texture(device: &wgpu::Device) -> (wgpu::TextureView, wgpu::Sampler) {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("test-sprite"),
            size: wgpu::Extent3d {
                width: 4,
                height: 4,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
            usage: wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor::default());
        (view, sampler)
    }

    #[test]
    fn test_blend_modes() {
        assert!(BlendMode::Opaque.blend_state().is_none());
        assert_eq!(BlendMode::Alpha.blend_state(), Some(wgpu::BlendState::ALPHA_BLENDING));
        assert!(BlendMode::Opaque.writes_depth());
        assert!(!BlendMode::Additive.writes_depth());
    }

    #[test]
    fn test_shader_entry_points_present() {
        assert!(BILLBOARD_SHADER_SOURCE.contains("fn vs_main"));
        assert!(BILLBOARD_SHADER_SOURCE.contains("fn fs_main"));
        assert!(BILLBOARD_SHADER_SOURCE.contains("@location(6) tint"));
    }

    #[test]
    fn test_species_buffer_sized_for_capacity() {
        let Some((device, _queue)) = test_device() else {
            return;
        };
        let renderer = BillboardRenderer::new(
            &device,
            wgpu::TextureFormat::Rgba8UnormSrgb,
            Some(wgpu::TextureFormat::Depth32Float),
        );
        let (view, sampler) = test_texture(&device);
        let species = renderer.create_species(&device, "tree", 16, BlendMode::Alpha, &view, &sampler);
        assert_eq!(species.capacity(), 16);
        assert_eq!(species.buffer_size(), 16 * 80);
    }
}
