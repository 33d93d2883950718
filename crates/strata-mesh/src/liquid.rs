//! Liquid surface meshing, one mesh per liquid type per chunk.
//!
//! Column depth is the running sum of levels over a contiguous wet run of
//! one liquid type, accumulated bottom-up and reset to zero by a dry cell.
//! Top corners are smoothed by averaging the levels of the cells sharing
//! each vertical corner edge, and foam grows with the number of dry cells
//! around that edge. Shallow columns render as puddles.

use glam::{IVec3, Vec3};
use strata_voxel::{ChunkAddress, ChunkData, CubeCorner, LiquidTypeId, TopCorner, VoxelQuery};

use crate::chunk_mesh::texture_layer;
use crate::context::MeshContext;
use crate::face_direction::FaceDirection;
use crate::visible_faces::VisibleFaces;

const FULL_LEVEL: f32 = 255.0;

/// A single vertex in a liquid surface mesh.
///
/// Layout (48 bytes):
///   - `[0..12]`  position, chunk-local
///   - `[12..24]` face normal
///   - `[24..32]` uv
///   - `[32..36]` foam intensity (0.0 - 1.0)
///   - `[36..44]` flow direction (x, z), each in -1.0 - 1.0
///   - `[44..48]` texture layer
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct LiquidVertex {
    /// Position relative to the chunk origin.
    pub position: [f32; 3],
    /// Face normal.
    pub normal: [f32; 3],
    /// Texture coordinates.
    pub uv: [f32; 2],
    /// Foam intensity.
    pub foam: f32,
    /// Surface flow direction.
    pub flow: [f32; 2],
    /// Texture atlas layer.
    pub texture: u32,
}

static_assertions::assert_eq_size!(LiquidVertex, [u8; 48]);

/// Metadata for one emitted liquid face.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LiquidFace {
    /// Which direction the face points.
    pub direction: FaceDirection,
    /// Chunk-local cell that owns the face.
    pub cell: [u16; 3],
    /// Whether the cell's column was shallow enough to be a puddle.
    pub puddle: bool,
}

/// Surface mesh of one liquid type within one chunk.
#[derive(Clone, Debug, PartialEq)]
pub struct LiquidMesh {
    /// Liquid type this mesh draws.
    pub liquid: LiquidTypeId,
    /// Vertex buffer.
    pub vertices: Vec<LiquidVertex>,
    /// Index buffer (triangles).
    pub indices: Vec<u32>,
    /// One entry per emitted face.
    pub faces: Vec<LiquidFace>,
}

impl LiquidMesh {
    /// Creates an empty mesh for `liquid`.
    pub fn new(liquid: LiquidTypeId) -> Self {
        Self {
            liquid,
            vertices: Vec::new(),
            indices: Vec::new(),
            faces: Vec::new(),
        }
    }

    /// Appends one quad, counter-clockwise from outside.
    pub fn push_face(&mut self, info: LiquidFace, corners: [LiquidVertex; 4]) {
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

    /// Faces emitted for the cell at chunk-local `(x, y, z)`.
    pub fn faces_of(&self, x: u16, y: u16, z: u16) -> impl Iterator<Item = (usize, &LiquidFace)> {
        self.faces
            .iter()
            .enumerate()
            .filter(move |(_, f)| f.cell == [x, y, z])
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

/// Running column depth over `levels`, listed bottom to top.
///
/// A zero level is dry and resets the sum. `seed` is the depth already
/// accumulated below the first cell and only counts if that cell is wet.
pub fn column_depth_run(levels: &[u8], seed: u32) -> Vec<u32> {
    let mut running = seed;
    levels
        .iter()
        .map(|&level| {
            if level == 0 {
                running = 0;
            } else {
                running += u32::from(level);
            }
            running
        })
        .collect()
}

/// Depth accumulated by `liquid` directly below `start` (inclusive),
/// walking down at most `max_scan` cells.
fn depth_below<Q: VoxelQuery + ?Sized>(
    query: &Q,
    start: IVec3,
    liquid: LiquidTypeId,
    max_scan: u32,
) -> u32 {
    let mut depth = 0;
    let mut pos = start;
    for _ in 0..max_scan {
        match query.liquid_at(pos) {
            Some(cell) if cell.is_wet_with(liquid) => depth += u32::from(cell.level),
            _ => break,
        }
        pos -= IVec3::Y;
    }
    depth
}

/// Column depth of every cell in `chunk` for `liquid`, in storage order.
///
/// Runs that continue below the chunk are seeded through `query`, reading at
/// most `max_scan` cells and never past the chunk directly below. A worker
/// snapshot holds exactly that chunk, so the live world and a snapshot give
/// the same depths.
pub fn column_depths<Q: VoxelQuery + ?Sized>(
    addr: ChunkAddress,
    chunk: &ChunkData,
    query: &Q,
    liquid: LiquidTypeId,
    max_scan: u32,
) -> Vec<u32> {
    let dims = chunk.dims();
    let origin = addr.origin(dims);
    let max_scan = max_scan.min(dims.y as u32);
    let mut depths = vec![0; dims.volume()];
    let mut levels = Vec::with_capacity(dims.y);

    for z in 0..dims.z {
        for x in 0..dims.x {
            levels.clear();
            levels.extend((0..dims.y).map(|y| {
                let cell = chunk.liquid(x, y, z);
                if cell.is_wet_with(liquid) { cell.level } else { 0 }
            }));
            let below = origin + IVec3::new(x as i32, -1, z as i32);
            let seed = depth_below(query, below, liquid, max_scan);
            for (y, depth) in column_depth_run(&levels, seed).into_iter().enumerate() {
                depths[dims.index(x, y, z)] = depth;
            }
        }
    }
    depths
}

/// Decides which faces of the wet cell at world position `pos` are drawn.
///
/// Unresolved neighbors count as dry and empty.
pub fn liquid_faces<Q: VoxelQuery + ?Sized>(
    query: &Q,
    pos: IVec3,
    view_limit: Option<i32>,
) -> VisibleFaces {
    let mut faces = VisibleFaces::NONE;
    for face in FaceDirection::ALL {
        let neighbor = pos + face.offset();
        let wet = query.liquid_at(neighbor).is_some_and(|c| c.is_wet());
        let visible = match face {
            FaceDirection::Top => view_limit == Some(pos.y) || !wet,
            _ => !wet && !query.voxel_at(neighbor).is_some_and(|v| v.occludes()),
        };
        if visible {
            faces.set_visible(face);
        }
    }
    faces
}

/// Smoothed height and foam at one top corner of a cell.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CornerSample {
    /// Surface height within the cell, 0.0 - 1.0.
    pub height: f32,
    /// Fraction of the three neighbors around the corner edge that are dry
    /// open space.
    pub foam: f32,
}

/// Samples the corner `corner` of the cell at `pos` holding `level` of
/// `liquid`.
///
/// The height is the mean level of the cell and the three cells sharing the
/// corner's vertical edge. A neighbor wet with `liquid` contributes its level,
/// or a full level when the cell above it is wet too; any other resolving
/// neighbor contributes zero, so surfaces slope down toward their shores.
/// Unresolved neighbors are left out of the mean. Dry neighbors not blocked
/// by a solid voxel add foam.
pub fn corner_sample<Q: VoxelQuery + ?Sized>(
    query: &Q,
    pos: IVec3,
    level: u8,
    liquid: LiquidTypeId,
    corner: TopCorner,
) -> CornerSample {
    let (dx, dz) = corner.step();
    let neighbors = [
        IVec3::new(dx, 0, 0),
        IVec3::new(0, 0, dz),
        IVec3::new(dx, 0, dz),
    ];

    let mut sum = f32::from(level);
    let mut contributors = 1.0;
    let mut dry = 0.0;
    for offset in neighbors {
        let p = pos + offset;
        let Some(cell) = query.liquid_at(p) else {
            dry += 1.0;
            continue;
        };
        contributors += 1.0;
        if cell.is_wet_with(liquid) {
            let covered = query
                .liquid_at(p + IVec3::Y)
                .is_some_and(|above| above.is_wet_with(liquid));
            sum += if covered { FULL_LEVEL } else { f32::from(cell.level) };
        } else if !cell.is_wet() && !query.voxel_at(p).is_some_and(|v| v.occludes()) {
            dry += 1.0;
        }
    }

    CornerSample {
        height: (sum / (contributors * FULL_LEVEL)).clamp(0.0, 1.0),
        foam: dry / neighbors.len() as f32,
    }
}

/// Texture coordinates tiled by world position, for puddles.
fn world_uv(face: FaceDirection, world: Vec3, scale: f32) -> [f32; 2] {
    match face {
        FaceDirection::Top | FaceDirection::Bottom => [world.x * scale, world.z * scale],
        FaceDirection::Left | FaceDirection::Right => [world.z * scale, -world.y * scale],
        FaceDirection::Front | FaceDirection::Back => [world.x * scale, -world.y * scale],
    }
}

/// Builds the surface mesh of `liquid` for the chunk at `addr`.
///
/// Cells above the view limit are skipped.
pub fn build_liquid_mesh<Q: VoxelQuery + ?Sized>(
    addr: ChunkAddress,
    chunk: &ChunkData,
    query: &Q,
    liquid: LiquidTypeId,
    ctx: &MeshContext,
) -> LiquidMesh {
    let settings = &ctx.settings;
    let dims = chunk.dims();
    let origin = addr.origin(dims);
    let depths = column_depths(addr, chunk, query, liquid, settings.max_column_scan);
    let texture = ctx
        .liquid_types
        .get(liquid)
        .map_or(0, |def| texture_layer(def.texture));
    let mut mesh = LiquidMesh::new(liquid);

    for y in 0..dims.y {
        if settings.view_limit.is_some_and(|l| origin.y + y as i32 > l) {
            break;
        }
        for z in 0..dims.z {
            for x in 0..dims.x {
                let cell = chunk.liquid(x, y, z);
                if !cell.is_wet_with(liquid) {
                    continue;
                }
                let local = IVec3::new(x as i32, y as i32, z as i32);
                let pos = origin + local;
                let faces = liquid_faces(query, pos, settings.view_limit);
                if faces.count() == 0 {
                    continue;
                }

                let depth = depths[dims.index(x, y, z)];
                let puddle = depth < settings.puddle_depth_threshold;
                let surface = !query
                    .liquid_at(pos + IVec3::Y)
                    .is_some_and(|above| above.is_wet_with(liquid));
                let samples =
                    TopCorner::ALL.map(|corner| corner_sample(query, pos, cell.level, liquid, corner));
                let flow = cell.flow.map(|f| f32::from(f) / 127.0);
                let floor_depth = depth.saturating_sub(u32::from(cell.level)) as f32 / FULL_LEVEL;

                for face in faces.iter() {
                    let full_height = cell.falling || (face.is_side() && !surface);
                    let vertices = face.corners().map(|corner: CubeCorner| {
                        let [ux, uy, uz] = corner.unit();
                        let sample = samples[TopCorner::from_unit(ux, uz) as usize];
                        let height = match (uy, full_height) {
                            (0, _) => 0.0,
                            (_, true) => 1.0,
                            (_, false) => sample.height,
                        };
                        let position = local.as_vec3() + Vec3::new(f32::from(ux), height, f32::from(uz));
                        let mut foam = sample.foam;
                        let uv = if puddle {
                            foam = foam.max(settings.puddle_foam);
                            world_uv(face, origin.as_vec3() + position, settings.liquid_uv_scale)
                        } else if face.is_side() {
                            [face.uv(corner)[0], 1.0 - (floor_depth + height)]
                        } else {
                            face.uv(corner)
                        };
                        LiquidVertex {
                            position: position.to_array(),
                            normal: face.normal(),
                            uv,
                            foam,
                            flow,
                            texture,
                        }
                    });
                    let info = LiquidFace {
                        direction: face,
                        cell: [x as u16, y as u16, z as u16],
                        puddle,
                    };
                    mesh.push_face(info, vertices);
                }
            }
        }
    }

    tracing::trace!("chunk {:?} liquid {:?}: {} faces", addr, liquid, mesh.quad_count());
    mesh
}

/// Builds one mesh per liquid type present in `chunk`, skipping empty ones.
pub fn build_liquid_meshes<Q: VoxelQuery + ?Sized>(
    addr: ChunkAddress,
    chunk: &ChunkData,
    query: &Q,
    ctx: &MeshContext,
) -> Vec<LiquidMesh> {
    chunk
        .liquid_types_present()
        .into_iter()
        .map(|liquid| build_liquid_mesh(addr, chunk, query, liquid, ctx))
        .filter(|mesh| !mesh.is_empty())
        .collect()
}
