//! Ramp resolution: which top corners of each voxel slope down into empty space.
//!
//! Runs as a pre-pass on the live world before a chunk is snapshotted for
//! meshing. Only visible voxels of a ramp-capable type whose top is exposed
//! are considered. Each top corner looks at the three horizontal neighbors
//! sharing that corner (two orthogonal, one diagonal) at the same level; if
//! any is empty the corner is lowered. Unloaded neighbors do not count as
//! empty, so unloaded world edges stay flat. Degenerate results collapse to
//! a flat top.

use glam::IVec3;
use strata_voxel::{
    ChunkAddress, ChunkData, ChunkManager, RAMP_DIRTY, RampMask, TopCorner, Voxel, VoxelQuery,
    VoxelTypeRegistry, affected_chunks,
};

/// Computes ramp masks from neighbor occupancy.
pub struct RampResolver<'a> {
    registry: &'a VoxelTypeRegistry,
}

impl<'a> RampResolver<'a> {
    /// Creates a resolver using `registry` for the ramp-capable flag.
    pub fn new(registry: &'a VoxelTypeRegistry) -> Self {
        Self { registry }
    }

    /// Returns `true` if the voxel at `pos` takes part in ramping.
    pub fn is_eligible<Q: VoxelQuery + ?Sized>(&self, query: &Q, pos: IVec3, voxel: &Voxel) -> bool {
        voxel.occludes()
            && self.registry.is_ramp_capable(voxel.kind)
            && query.voxel_at(pos + IVec3::Y).is_none_or(|above| !above.occludes())
    }

    /// Corners whose neighbors are empty, before degenerate masks collapse.
    pub fn raw_mask<Q: VoxelQuery + ?Sized>(&self, query: &Q, pos: IVec3) -> RampMask {
        let is_empty = |p: IVec3| query.voxel_at(p).is_some_and(|v| !v.occludes());

        let mut mask = RampMask::NONE;
        for corner in TopCorner::ALL {
            let (dx, dz) = corner.step();
            let lowered = is_empty(pos + IVec3::new(dx, 0, 0))
                || is_empty(pos + IVec3::new(0, 0, dz))
                || is_empty(pos + IVec3::new(dx, 0, dz));
            mask.set(corner, lowered);
        }
        mask
    }

    /// Final mask for `voxel` at world position `pos`.
    pub fn resolve<Q: VoxelQuery + ?Sized>(&self, query: &Q, pos: IVec3, voxel: &Voxel) -> RampMask {
        if !self.is_eligible(query, pos, voxel) {
            return RampMask::NONE;
        }
        self.raw_mask(query, pos).normalized()
    }

    /// Masks for every voxel of `data`, in storage order.
    ///
    /// `query` must resolve positions inside the chunk as well as its
    /// neighbors.
    pub fn resolve_chunk<Q: VoxelQuery + ?Sized>(
        &self,
        query: &Q,
        origin: IVec3,
        data: &ChunkData,
    ) -> Vec<RampMask> {
        let dims = data.dims();
        data.voxels()
            .iter()
            .enumerate()
            .map(|(i, voxel)| {
                let (x, y, z) = dims.position(i);
                let pos = origin + IVec3::new(x as i32, y as i32, z as i32);
                self.resolve(query, pos, voxel)
            })
            .collect()
    }
}

/// Outcome of resolving one chunk's ramps.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RampPassReport {
    /// Voxels whose mask changed.
    pub changed: usize,
    /// Neighbor chunks whose meshes were invalidated by boundary changes.
    pub neighbors_invalidated: usize,
}

/// Recomputes and stores the ramp masks of the chunk at `addr`.
///
/// Neighboring chunks read this chunk's masks when deciding side-face
/// visibility, so a changed mask on the chunk boundary marks them for
/// remeshing. Returns `None` if the chunk is not loaded.
pub fn resolve_chunk_ramps(
    world: &mut ChunkManager,
    addr: ChunkAddress,
    registry: &VoxelTypeRegistry,
) -> Option<RampPassReport> {
    let dims = world.dims();
    let origin = addr.origin(dims);
    let masks = {
        let chunk = world.get_chunk(&addr)?;
        RampResolver::new(registry).resolve_chunk(&*world, origin, chunk.data())
    };

    let changed = world.get_chunk_mut(&addr)?.apply_ramp_masks(&masks);

    let mut neighbors = Vec::new();
    for &index in &changed {
        for neighbor in affected_chunks(addr, dims.position(index), dims).into_iter().skip(1) {
            if !neighbors.contains(&neighbor) {
                neighbors.push(neighbor);
            }
        }
    }
    let mut neighbors_invalidated = 0;
    for neighbor in neighbors {
        if let Some(chunk) = world.get_chunk_mut(&neighbor) {
            chunk.invalidate_mesh();
            neighbors_invalidated += 1;
        }
    }

    if !changed.is_empty() {
        tracing::trace!(
            "ramps for chunk {:?}: {} changed, {} neighbors invalidated",
            addr,
            changed.len(),
            neighbors_invalidated
        );
    }
    Some(RampPassReport {
        changed: changed.len(),
        neighbors_invalidated,
    })
}

/// Resolves ramps for every chunk flagged [`RAMP_DIRTY`]. Returns the number
/// of chunks processed.
pub fn resolve_dirty_ramps(world: &mut ChunkManager, registry: &VoxelTypeRegistry) -> usize {
    let dirty = world.dirty_addresses(RAMP_DIRTY);
    for addr in &dirty {
        resolve_chunk_ramps(world, *addr, registry);
    }
    dirty.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_voxel::{Chunk, ChunkDims, FaceTextures, MESH_DIRTY, TextureId, VoxelTypeDef, VoxelTypeId};

    fn registry() -> (VoxelTypeRegistry, VoxelTypeId, VoxelTypeId) {
        let mut reg = VoxelTypeRegistry::new();
        let grass = reg
            .register(VoxelTypeDef {
                name: "grass".to_string(),
                ramp_capable: true,
                textures: FaceTextures::uniform(TextureId(1)),
                ramp_textures: None,
            })
            .unwrap();
        let stone = reg
            .register(VoxelTypeDef {
                name: "stone".to_string(),
                ramp_capable: false,
                textures: FaceTextures::uniform(TextureId(2)),
                ramp_textures: None,
            })
            .unwrap();
        (reg, grass, stone)
    }

    /// One 8x4x8 chunk with a flat layer of `kind` at y = 1.
    fn flat_world(kind: VoxelTypeId) -> ChunkManager {
        let mut world = ChunkManager::new(ChunkDims::new(8, 4, 8));
        let mut chunk = Chunk::new(world.dims());
        for z in 0..8 {
            for x in 0..8 {
                chunk.set_voxel(x, 1, z, Voxel::new(kind));
            }
        }
        world.load_chunk(ChunkAddress::new(0, 0, 0), chunk);
        world
    }

    #[test]
    fn test_interior_of_flat_plateau_stays_flat() {
        let (reg, grass, _) = registry();
        let world = flat_world(grass);
        let resolver = RampResolver::new(&reg);
        let pos = IVec3::new(3, 1, 3);
        let voxel = world.voxel_at(pos).unwrap();
        assert_eq!(resolver.resolve(&world, pos, &voxel), RampMask::NONE);
    }

    #[test]
    fn test_plateau_edge_slopes_toward_empty_side() {
        let (reg, grass, _) = registry();
        let mut world = flat_world(grass);
        world.set_voxel(IVec3::new(3, 1, 2), Voxel::EMPTY);
        let resolver = RampResolver::new(&reg);

        // Voxel behind the hole (+Z of it) lowers its front corners.
        let pos = IVec3::new(3, 1, 3);
        let voxel = world.voxel_at(pos).unwrap();
        let expected = RampMask::FRONT_LEFT.with(TopCorner::FrontRight);
        assert_eq!(resolver.resolve(&world, pos, &voxel), expected);
    }

    #[test]
    fn test_diagonal_hole_lowers_single_corner() {
        let (reg, grass, _) = registry();
        let mut world = flat_world(grass);
        world.set_voxel(IVec3::new(2, 1, 2), Voxel::EMPTY);
        let resolver = RampResolver::new(&reg);
        let pos = IVec3::new(3, 1, 3);
        let voxel = world.voxel_at(pos).unwrap();
        assert_eq!(resolver.resolve(&world, pos, &voxel), RampMask::FRONT_LEFT);
    }

    #[test]
    fn test_opposite_holes_collapse_to_flat() {
        let (reg, grass, _) = registry();
        let mut world = flat_world(grass);
        world.set_voxel(IVec3::new(2, 1, 2), Voxel::EMPTY);
        world.set_voxel(IVec3::new(4, 1, 4), Voxel::EMPTY);
        let resolver = RampResolver::new(&reg);
        let pos = IVec3::new(3, 1, 3);
        let voxel = world.voxel_at(pos).unwrap();
        let raw = resolver.raw_mask(&world, pos);
        assert!(raw.is_degenerate());
        assert_eq!(resolver.resolve(&world, pos, &voxel), RampMask::NONE);
    }

    #[test]
    fn test_non_ramp_capable_and_covered_voxels_stay_flat() {
        let (reg, grass, stone) = registry();
        let mut world = flat_world(stone);
        world.set_voxel(IVec3::new(2, 1, 2), Voxel::EMPTY);
        let resolver = RampResolver::new(&reg);
        let pos = IVec3::new(3, 1, 3);
        let voxel = world.voxel_at(pos).unwrap();
        assert_eq!(resolver.resolve(&world, pos, &voxel), RampMask::NONE);

        let mut world = flat_world(grass);
        world.set_voxel(IVec3::new(2, 1, 2), Voxel::EMPTY);
        world.set_voxel(IVec3::new(3, 2, 3), Voxel::new(stone));
        let voxel = world.voxel_at(pos).unwrap();
        assert_eq!(resolver.resolve(&world, pos, &voxel), RampMask::NONE);
    }

    #[test]
    fn test_unloaded_neighbors_do_not_ramp() {
        let (reg, grass, _) = registry();
        let world = flat_world(grass);
        let resolver = RampResolver::new(&reg);
        // Corner of the only loaded chunk: every outside neighbor is unloaded.
        let pos = IVec3::new(0, 1, 0);
        let voxel = world.voxel_at(pos).unwrap();
        assert_eq!(resolver.resolve(&world, pos, &voxel), RampMask::NONE);
    }

    #[test]
    fn test_resolve_chunk_ramps_writes_masks_and_is_stable() {
        let (reg, grass, _) = registry();
        let mut world = flat_world(grass);
        world.set_voxel(IVec3::new(2, 1, 2), Voxel::EMPTY);
        let addr = ChunkAddress::new(0, 0, 0);

        let first = resolve_chunk_ramps(&mut world, addr, &reg).unwrap();
        assert!(first.changed > 0);
        let chunk = world.get_chunk(&addr).unwrap();
        assert_eq!(chunk.voxel(3, 1, 3).ramp, RampMask::FRONT_LEFT);
        assert!(!chunk.is_dirty(RAMP_DIRTY));
        assert!(chunk.is_dirty(MESH_DIRTY));

        let second = resolve_chunk_ramps(&mut world, addr, &reg).unwrap();
        assert_eq!(second.changed, 0);
    }

    #[test]
    fn test_boundary_change_invalidates_neighbor_mesh() {
        let (reg, grass, _) = registry();
        let mut world = flat_world(grass);
        let east = ChunkAddress::new(1, 0, 0);
        world.load_chunk(east, Chunk::new(world.dims()));
        let addr = ChunkAddress::new(0, 0, 0);
        resolve_chunk_ramps(&mut world, addr, &reg);

        // The empty east chunk makes the x = 7 column slope; that boundary
        // change must reach the east neighbor.
        world.get_chunk_mut(&east).unwrap().clear_dirty(MESH_DIRTY);
        world.set_voxel(IVec3::new(7, 1, 4), Voxel::EMPTY);
        world.get_chunk_mut(&east).unwrap().clear_dirty(MESH_DIRTY);
        let report = resolve_chunk_ramps(&mut world, addr, &reg).unwrap();
        assert!(report.changed > 0);
        assert!(report.neighbors_invalidated > 0);
        assert!(world.get_chunk(&east).unwrap().is_dirty(MESH_DIRTY));
    }

    #[test]
    fn test_resolve_dirty_ramps_clears_flags() {
        let (reg, grass, _) = registry();
        let mut world = flat_world(grass);
        assert_eq!(resolve_dirty_ramps(&mut world, &reg), 1);
        assert!(world.dirty_addresses(RAMP_DIRTY).is_empty());
    }
}
