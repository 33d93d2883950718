//! Procedural demo world: a noise heightfield of stone under grass, a pond
//! filling the low ground, and a waterfall spilling off a pillar.

use glam::IVec3;
use noise::{NoiseFn, Simplex};
use strata_voxel::{
    Chunk, ChunkAddress, ChunkData, ChunkDims, ChunkManager, FaceTextures, LiquidCell,
    LiquidTypeDef, LiquidTypeId, LiquidTypeRegistry, RegistryError, TextureId, Voxel,
    VoxelTypeDef, VoxelTypeId, VoxelTypeRegistry,
};

/// Chunks along X and Z.
pub const WORLD_CHUNKS_XZ: i32 = 3;
/// Chunk layers along Y.
pub const WORLD_CHUNKS_Y: i32 = 2;
/// Surface heights at or below this level are flooded.
pub const POND_LEVEL: i32 = 9;

const TEXTURE_COUNT: u16 = 8;

/// Type ids used by the demo.
pub struct Palette {
    pub stone: VoxelTypeId,
    pub grass: VoxelTypeId,
    pub water: LiquidTypeId,
}

/// Registers the demo's voxel and liquid types.
pub fn registries() -> Result<(VoxelTypeRegistry, LiquidTypeRegistry, Palette), RegistryError> {
    let mut voxels = VoxelTypeRegistry::with_texture_count(TEXTURE_COUNT);
    let stone = voxels.register(VoxelTypeDef {
        name: "stone".to_string(),
        ramp_capable: false,
        textures: FaceTextures::uniform(TextureId(1)),
        ramp_textures: None,
    })?;
    let grass = voxels.register(VoxelTypeDef {
        name: "grass".to_string(),
        ramp_capable: true,
        textures: FaceTextures {
            top: TextureId(2),
            bottom: TextureId(3),
            side: TextureId(4),
        },
        ramp_textures: Some(FaceTextures {
            top: TextureId(2),
            bottom: TextureId(3),
            side: TextureId(5),
        }),
    })?;

    let mut liquids = LiquidTypeRegistry::with_texture_count(TEXTURE_COUNT);
    let water = liquids.register(LiquidTypeDef {
        name: "water".to_string(),
        texture: TextureId(6),
    })?;

    Ok((voxels, liquids, Palette { stone, grass, water }))
}

/// Deterministic terrain heights.
pub struct Terrain {
    noise: Simplex,
    max_height: i32,
}

impl Terrain {
    pub fn new(seed: u32, max_height: i32) -> Self {
        Self {
            noise: Simplex::new(seed),
            max_height,
        }
    }

    /// World Y of the topmost solid voxel in column `(x, z)`.
    pub fn height(&self, x: i32, z: i32) -> i32 {
        let n = self.noise.get([f64::from(x) * 0.06, f64::from(z) * 0.06]);
        let h = 11.0 + n * 5.0;
        (h.round() as i32).clamp(1, self.max_height - 1)
    }

    /// Top of the waterfall pillar, above the highest terrain.
    pub fn pillar(&self) -> (IVec3, i32) {
        (IVec3::new(6, 0, 6), (self.max_height - 4).max(POND_LEVEL + 2))
    }
}

fn shade(y: i32, max_height: i32) -> [u8; 4] {
    let t = (y.max(0) as f32 / max_height.max(1) as f32).clamp(0.0, 1.0);
    let v = (140.0 + t * 115.0) as u8;
    [v, v, v, 255]
}

fn fill_chunk(addr: ChunkAddress, dims: ChunkDims, terrain: &Terrain, palette: &Palette) -> ChunkData {
    let origin = addr.origin(dims);
    let (pillar, pillar_top) = terrain.pillar();
    let mut data = ChunkData::new(dims);

    for z in 0..dims.z {
        for x in 0..dims.x {
            let wx = origin.x + x as i32;
            let wz = origin.z + z as i32;
            let surface = terrain.height(wx, wz);
            let is_pillar = wx == pillar.x && wz == pillar.z;
            let falls_here = wx == pillar.x + 1 && wz == pillar.z;

            for y in 0..dims.y {
                let wy = origin.y + y as i32;
                let color = shade(wy, terrain.max_height);
                if wy < surface || (is_pillar && wy <= pillar_top) {
                    data.set_voxel(x, y, z, Voxel::new(palette.stone).with_color(color));
                } else if wy == surface {
                    data.set_voxel(x, y, z, Voxel::new(palette.grass).with_color(color));
                } else if falls_here && wy <= pillar_top {
                    let cell = LiquidCell::new(palette.water, 255).falling();
                    data.set_liquid(x, y, z, cell);
                } else if wy <= POND_LEVEL {
                    let level = if wy == POND_LEVEL { 200 } else { 255 };
                    let flow = if wx < pillar.x + 4 { [32, 0] } else { [0, 0] };
                    data.set_liquid(x, y, z, LiquidCell::new(palette.water, level).with_flow(flow));
                }
            }
        }
    }
    data
}

/// Builds and loads every chunk of the demo world.
pub fn build_world(
    dims: ChunkDims,
    terrain: &Terrain,
    palette: &Palette,
    voxel_types: &VoxelTypeRegistry,
    liquid_types: &LiquidTypeRegistry,
) -> Result<ChunkManager, RegistryError> {
    let mut world = ChunkManager::new(dims);
    for cy in 0..WORLD_CHUNKS_Y {
        for cz in 0..WORLD_CHUNKS_XZ {
            for cx in 0..WORLD_CHUNKS_XZ {
                let addr = ChunkAddress::new(cx, cy, cz);
                let data = fill_chunk(addr, dims, terrain, palette);
                voxel_types.validate_chunk(&data)?;
                liquid_types.validate_chunk(&data)?;
                world.load_chunk(addr, Chunk::from_data(data));
            }
        }
    }
    tracing::info!(
        "built world: {} chunks of {}x{}x{}",
        world.loaded_count(),
        dims.x,
        dims.y,
        dims.z
    );
    Ok(world)
}

/// World positions just above the grass, for scattering billboards.
pub fn surface_points(dims: ChunkDims, terrain: &Terrain) -> Vec<IVec3> {
    let extent_x = WORLD_CHUNKS_XZ * dims.x as i32;
    let extent_z = WORLD_CHUNKS_XZ * dims.z as i32;
    let mut points = Vec::new();
    for z in 0..extent_z {
        for x in 0..extent_x {
            let y = terrain.height(x, z);
            if y > POND_LEVEL {
                points.push(IVec3::new(x, y + 1, z));
            }
        }
    }
    points
}
