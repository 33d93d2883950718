//! Central owner for all loaded chunks, keyed by [`ChunkAddress`].
//!
//! The [`ChunkManager`] provides O(1) chunk lookup, insert, and removal
//! using an [`FxHashMap`](rustc_hash::FxHashMap), resolves world positions
//! to chunk cells, and invalidates neighboring chunks whose meshes or ramps
//! depend on an edited cell.

use glam::IVec3;
use rustc_hash::FxHashMap;

use crate::chunk::ChunkDims;
use crate::chunk_api::Chunk;
use crate::query::VoxelQuery;
use crate::voxel::{LiquidCell, Voxel};

/// Identifies a chunk's position in the chunk grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChunkAddress {
    /// Chunk-grid X coordinate.
    pub x: i32,
    /// Chunk-grid Y coordinate.
    pub y: i32,
    /// Chunk-grid Z coordinate.
    pub z: i32,
}

impl ChunkAddress {
    /// Creates a new chunk address.
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// Returns the address offset by `(dx, dy, dz)` chunks.
    pub const fn offset(self, dx: i32, dy: i32, dz: i32) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
            z: self.z + dz,
        }
    }

    /// World position of this chunk's minimum corner.
    pub fn origin(self, dims: ChunkDims) -> IVec3 {
        IVec3::new(self.x, self.y, self.z) * dims.as_ivec3()
    }

    /// The 26 surrounding addresses.
    pub fn neighbors(self) -> impl Iterator<Item = ChunkAddress> {
        (-1..=1).flat_map(move |dy| {
            (-1..=1).flat_map(move |dz| {
                (-1..=1)
                    .filter(move |dx| (*dx, dy, dz) != (0, 0, 0))
                    .map(move |dx| self.offset(dx, dy, dz))
            })
        })
    }
}

/// Chunks whose ramps or meshes read the cell at `local` inside `chunk`.
///
/// The edited chunk comes first. A cell on a chunk face, edge, or corner
/// also affects the face, edge, or corner neighbors it touches, since ramp
/// resolution looks at diagonal neighbors.
pub fn affected_chunks(
    chunk: ChunkAddress,
    local: (usize, usize, usize),
    dims: ChunkDims,
) -> Vec<ChunkAddress> {
    fn steps(coord: usize, size: usize) -> Vec<i32> {
        let mut steps = vec![0];
        if coord == 0 {
            steps.push(-1);
        }
        if coord + 1 == size {
            steps.push(1);
        }
        steps
    }

    let xs = steps(local.0, dims.x);
    let ys = steps(local.1, dims.y);
    let zs = steps(local.2, dims.z);

    let mut affected = Vec::with_capacity(xs.len() * ys.len() * zs.len());
    for &dy in &ys {
        for &dz in &zs {
            for &dx in &xs {
                affected.push(chunk.offset(dx, dy, dz));
            }
        }
    }
    affected
}

/// Owns all currently-loaded chunks and provides fast access by [`ChunkAddress`].
pub struct ChunkManager {
    dims: ChunkDims,
    chunks: FxHashMap<ChunkAddress, Chunk>,
    next_generation: u64,
}

impl ChunkManager {
    /// Creates an empty manager for chunks of the given size.
    pub fn new(dims: ChunkDims) -> Self {
        Self {
            dims,
            chunks: FxHashMap::default(),
            next_generation: 1,
        }
    }

    /// Chunk dimensions shared by every chunk in this world.
    pub fn dims(&self) -> ChunkDims {
        self.dims
    }

    /// Inserts a chunk at the given address, replacing any previous one.
    ///
    /// The chunk gets a fresh generation, and loaded neighbors are touched
    /// because faces and ramps along the shared boundary can now resolve.
    /// Chunks whose size differs from the world's are rejected.
    pub fn load_chunk(&mut self, addr: ChunkAddress, mut chunk: Chunk) -> bool {
        if chunk.dims() != self.dims {
            tracing::warn!(
                "rejecting chunk {:?}: size {:?} does not match world size {:?}",
                addr,
                chunk.dims(),
                self.dims
            );
            return false;
        }
        chunk.set_generation(self.next_generation);
        self.next_generation += 1;
        chunk.touch();
        self.chunks.insert(addr, chunk);
        self.touch_neighbors(addr);
        true
    }

    /// Removes and returns the chunk at the given address.
    pub fn unload_chunk(&mut self, addr: ChunkAddress) -> Option<Chunk> {
        let removed = self.chunks.remove(&addr);
        if removed.is_some() {
            self.touch_neighbors(addr);
        }
        removed
    }

    fn touch_neighbors(&mut self, addr: ChunkAddress) {
        for neighbor in addr.neighbors() {
            if let Some(chunk) = self.chunks.get_mut(&neighbor) {
                chunk.touch();
            }
        }
    }

    /// Immutable access to a loaded chunk.
    pub fn get_chunk(&self, addr: &ChunkAddress) -> Option<&Chunk> {
        self.chunks.get(addr)
    }

    /// Mutable access to a loaded chunk.
    ///
    /// Edits made here do not invalidate neighbors; prefer
    /// [`set_voxel`](Self::set_voxel) for gameplay edits.
    pub fn get_chunk_mut(&mut self, addr: &ChunkAddress) -> Option<&mut Chunk> {
        self.chunks.get_mut(addr)
    }

    /// Returns `true` if a chunk is loaded at `addr`.
    pub fn is_loaded(&self, addr: &ChunkAddress) -> bool {
        self.chunks.contains_key(addr)
    }

    /// Number of currently loaded chunks.
    pub fn loaded_count(&self) -> usize {
        self.chunks.len()
    }

    /// Iterates over all loaded chunk addresses.
    pub fn loaded_addresses(&self) -> impl Iterator<Item = &ChunkAddress> {
        self.chunks.keys()
    }

    /// Iterates over all loaded `(address, chunk)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&ChunkAddress, &Chunk)> {
        self.chunks.iter()
    }

    /// Addresses of chunks that have the given dirty flag set, sorted.
    pub fn dirty_addresses(&self, flag: u8) -> Vec<ChunkAddress> {
        let mut dirty: Vec<ChunkAddress> = self
            .chunks
            .iter()
            .filter(|(_, chunk)| chunk.is_dirty(flag))
            .map(|(addr, _)| *addr)
            .collect();
        dirty.sort();
        dirty
    }

    /// Splits a world position into its chunk address and local cell.
    pub fn locate(&self, pos: IVec3) -> (ChunkAddress, (usize, usize, usize)) {
        let size = self.dims.as_ivec3();
        let chunk = pos.div_euclid(size);
        let local = pos.rem_euclid(size);
        (
            ChunkAddress::new(chunk.x, chunk.y, chunk.z),
            (local.x as usize, local.y as usize, local.z as usize),
        )
    }

    /// Writes a voxel at a world position and invalidates every chunk that
    /// reads it. Returns `false` if the chunk is not loaded.
    pub fn set_voxel(&mut self, pos: IVec3, voxel: Voxel) -> bool {
        let (addr, local) = self.locate(pos);
        let Some(chunk) = self.chunks.get_mut(&addr) else {
            tracing::debug!("set_voxel at {} ignored: chunk {:?} not loaded", pos, addr);
            return false;
        };
        chunk.set_voxel(local.0, local.1, local.2, voxel);
        self.invalidate_neighbors_of(addr, local);
        true
    }

    /// Writes a liquid cell at a world position and invalidates every chunk
    /// that reads it. Returns `false` if the chunk is not loaded.
    ///
    /// The chunk directly above seeds its column depths from this one, so its
    /// mesh goes stale whatever the height of the edited cell.
    pub fn set_liquid(&mut self, pos: IVec3, cell: LiquidCell) -> bool {
        let (addr, local) = self.locate(pos);
        let Some(chunk) = self.chunks.get_mut(&addr) else {
            tracing::debug!("set_liquid at {} ignored: chunk {:?} not loaded", pos, addr);
            return false;
        };
        chunk.set_liquid(local.0, local.1, local.2, cell);
        self.invalidate_neighbors_of(addr, local);
        if let Some(above) = self.chunks.get_mut(&addr.offset(0, 1, 0)) {
            above.invalidate_mesh();
        }
        true
    }

    fn invalidate_neighbors_of(&mut self, addr: ChunkAddress, local: (usize, usize, usize)) {
        for neighbor in affected_chunks(addr, local, self.dims).into_iter().skip(1) {
            if let Some(chunk) = self.chunks.get_mut(&neighbor) {
                chunk.touch();
            }
        }
    }
}

impl VoxelQuery for ChunkManager {
    fn voxel_at(&self, pos: IVec3) -> Option<Voxel> {
        let (addr, (x, y, z)) = self.locate(pos);
        self.chunks.get(&addr).map(|chunk| chunk.voxel(x, y, z))
    }

    fn liquid_at(&self, pos: IVec3) -> Option<LiquidCell> {
        let (addr, (x, y, z)) = self.locate(pos);
        self.chunks.get(&addr).map(|chunk| chunk.liquid(x, y, z))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk_api::{MESH_DIRTY, RAMP_DIRTY};
    use crate::registry::VoxelTypeId;

    fn addr(x: i32, y: i32, z: i32) -> ChunkAddress {
        ChunkAddress::new(x, y, z)
    }

    fn world() -> ChunkManager {
        ChunkManager::new(ChunkDims::cube(4))
    }

    fn clean(mgr: &mut ChunkManager) {
        let addrs: Vec<_> = mgr.loaded_addresses().copied().collect();
        for a in addrs {
            if let Some(chunk) = mgr.get_chunk_mut(&a) {
                chunk.clear_dirty(MESH_DIRTY | RAMP_DIRTY);
            }
        }
    }

    #[test]
    fn test_load_then_get_returns_some() {
        let mut mgr = world();
        let mut chunk = Chunk::new(mgr.dims());
        chunk.set_voxel(1, 2, 3, Voxel::new(VoxelTypeId(7)));
        assert!(mgr.load_chunk(addr(0, 0, 0), chunk));
        let got = mgr.get_chunk(&addr(0, 0, 0)).expect("just loaded");
        assert_eq!(got.voxel(1, 2, 3).kind, VoxelTypeId(7));
    }

    #[test]
    fn test_mismatched_size_rejected() {
        let mut mgr = world();
        assert!(!mgr.load_chunk(addr(0, 0, 0), Chunk::new(ChunkDims::cube(2))));
        assert_eq!(mgr.loaded_count(), 0);
    }

    #[test]
    fn test_reload_gets_new_generation() {
        let mut mgr = world();
        mgr.load_chunk(addr(0, 0, 0), Chunk::new(mgr.dims()));
        let first = mgr.get_chunk(&addr(0, 0, 0)).unwrap().generation();
        mgr.unload_chunk(addr(0, 0, 0));
        mgr.load_chunk(addr(0, 0, 0), Chunk::new(mgr.dims()));
        let second = mgr.get_chunk(&addr(0, 0, 0)).unwrap().generation();
        assert_ne!(first, second);
    }

    #[test]
    fn test_unload_then_get_returns_none() {
        let mut mgr = world();
        mgr.load_chunk(addr(1, 2, 3), Chunk::new(mgr.dims()));
        assert!(mgr.unload_chunk(addr(1, 2, 3)).is_some());
        assert!(mgr.get_chunk(&addr(1, 2, 3)).is_none());
        assert!(mgr.unload_chunk(addr(9, 9, 9)).is_none());
    }

    #[test]
    fn test_locate_handles_negative_positions() {
        let mgr = world();
        assert_eq!(mgr.locate(IVec3::new(5, 0, 3)), (addr(1, 0, 0), (1, 0, 3)));
        assert_eq!(mgr.locate(IVec3::new(-1, -4, -5)), (addr(-1, -1, -2), (3, 0, 3)));
    }

    #[test]
    fn test_query_resolves_across_chunks() {
        let mut mgr = world();
        mgr.load_chunk(addr(-1, 0, 0), Chunk::new(mgr.dims()));
        assert!(mgr.set_voxel(IVec3::new(-1, 2, 0), Voxel::new(VoxelTypeId(3))));
        assert_eq!(mgr.voxel_at(IVec3::new(-1, 2, 0)).unwrap().kind, VoxelTypeId(3));
        assert!(mgr.voxel_at(IVec3::new(0, 2, 0)).is_none());
        assert!(!mgr.set_voxel(IVec3::new(0, 2, 0), Voxel::new(VoxelTypeId(3))));
    }

    #[test]
    fn test_non_null_voxels_near_skips_unloaded() {
        let mut mgr = world();
        mgr.load_chunk(addr(0, 0, 0), Chunk::new(mgr.dims()));
        // Corner cell: three neighbors fall into unloaded chunks.
        let near = mgr.non_null_voxels_near(IVec3::new(0, 0, 0));
        assert_eq!(near.len(), 3);
        let interior = mgr.non_null_voxels_near(IVec3::new(1, 1, 1));
        assert_eq!(interior.len(), 6);
    }

    #[test]
    fn test_affected_chunks_interior_is_self_only() {
        let dirty = affected_chunks(addr(0, 0, 0), (1, 2, 1), ChunkDims::cube(4));
        assert_eq!(dirty, vec![addr(0, 0, 0)]);
    }

    #[test]
    fn test_affected_chunks_corner_includes_diagonals() {
        let dirty = affected_chunks(addr(0, 0, 0), (0, 1, 3), ChunkDims::cube(4));
        assert_eq!(dirty[0], addr(0, 0, 0));
        assert_eq!(dirty.len(), 4);
        assert!(dirty.contains(&addr(-1, 0, 0)));
        assert!(dirty.contains(&addr(0, 0, 1)));
        assert!(dirty.contains(&addr(-1, 0, 1)));
    }

    #[test]
    fn test_boundary_edit_touches_neighbor() {
        let mut mgr = world();
        mgr.load_chunk(addr(0, 0, 0), Chunk::new(mgr.dims()));
        mgr.load_chunk(addr(1, 0, 0), Chunk::new(mgr.dims()));
        clean(&mut mgr);
        let before = mgr.get_chunk(&addr(1, 0, 0)).unwrap().version();

        mgr.set_voxel(IVec3::new(3, 1, 1), Voxel::new(VoxelTypeId(1)));

        let neighbor = mgr.get_chunk(&addr(1, 0, 0)).unwrap();
        assert!(neighbor.is_dirty(MESH_DIRTY));
        assert!(neighbor.version() > before);
    }

    #[test]
    fn test_interior_liquid_edit_invalidates_chunk_above() {
        let mut mgr = world();
        for y in 0..3 {
            mgr.load_chunk(addr(0, y, 0), Chunk::new(mgr.dims()));
        }
        clean(&mut mgr);

        // Mid-height cell: not on any chunk face.
        mgr.set_liquid(IVec3::new(1, 1, 1), LiquidCell::new(crate::LiquidTypeId(1), 90));

        assert!(mgr.get_chunk(&addr(0, 1, 0)).unwrap().is_dirty(MESH_DIRTY));
        assert!(!mgr.get_chunk(&addr(0, 1, 0)).unwrap().is_dirty(RAMP_DIRTY));
        assert!(!mgr.get_chunk(&addr(0, 2, 0)).unwrap().is_dirty(MESH_DIRTY));
    }

    #[test]
    fn test_load_touches_existing_neighbors() {
        let mut mgr = world();
        mgr.load_chunk(addr(0, 0, 0), Chunk::new(mgr.dims()));
        clean(&mut mgr);
        mgr.load_chunk(addr(1, 1, 0), Chunk::new(mgr.dims()));
        assert_eq!(mgr.dirty_addresses(RAMP_DIRTY), vec![addr(0, 0, 0), addr(1, 1, 0)]);
    }
}
