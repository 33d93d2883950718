//! Owned snapshot of a chunk and its 26 neighbors for worker threads.
//!
//! Capturing clones `Arc`s only; the live world keeps copy-on-write ownership
//! of the cells, so later edits never reach a snapshot already handed off.

use std::sync::Arc;

use glam::IVec3;
use strata_voxel::{ChunkAddress, ChunkData, ChunkDims, ChunkManager, LiquidCell, Voxel, VoxelQuery};

const CENTER_SLOT: usize = 13;

fn slot(dx: i32, dy: i32, dz: i32) -> Option<usize> {
    let range = -1..=1;
    if !(range.contains(&dx) && range.contains(&dy) && range.contains(&dz)) {
        return None;
    }
    Some(((dx + 1) + 3 * ((dz + 1) + 3 * (dy + 1))) as usize)
}

/// A center chunk plus whichever of its neighbors were loaded at capture time.
#[derive(Clone, Debug)]
pub struct ChunkNeighborhood {
    addr: ChunkAddress,
    dims: ChunkDims,
    center: Arc<ChunkData>,
    neighbors: [Option<Arc<ChunkData>>; 27],
}

impl ChunkNeighborhood {
    /// Snapshots `addr` and its loaded neighbors. Returns `None` if the
    /// center chunk is not loaded.
    pub fn capture(world: &ChunkManager, addr: ChunkAddress) -> Option<Self> {
        let center = world.get_chunk(&addr)?.snapshot();
        let mut neighborhood = Self::from_center_only(addr, center);
        for neighbor in addr.neighbors() {
            if let Some(chunk) = world.get_chunk(&neighbor) {
                neighborhood = neighborhood.with_chunk(
                    neighbor.x - addr.x,
                    neighbor.y - addr.y,
                    neighbor.z - addr.z,
                    chunk.snapshot(),
                );
            }
        }
        Some(neighborhood)
    }

    /// A neighborhood where every neighbor is unloaded.
    pub fn from_center_only(addr: ChunkAddress, center: Arc<ChunkData>) -> Self {
        Self {
            addr,
            dims: center.dims(),
            center,
            neighbors: Default::default(),
        }
    }

    /// Adds the neighbor at chunk offset `(dx, dy, dz)`. Offsets outside
    /// `-1..=1`, the center itself, and chunks of a different size are
    /// ignored.
    pub fn with_chunk(mut self, dx: i32, dy: i32, dz: i32, data: Arc<ChunkData>) -> Self {
        match slot(dx, dy, dz) {
            Some(CENTER_SLOT) | None => {}
            Some(_) if data.dims() != self.dims => {
                tracing::warn!("neighbor ({dx}, {dy}, {dz}) of {:?} has mismatched size", self.addr);
            }
            Some(i) => self.neighbors[i] = Some(data),
        }
        self
    }

    /// Address of the center chunk.
    pub fn addr(&self) -> ChunkAddress {
        self.addr
    }

    /// The center chunk's cells.
    pub fn center(&self) -> &ChunkData {
        &self.center
    }

    /// Number of neighbors present.
    pub fn loaded_neighbors(&self) -> usize {
        self.neighbors.iter().flatten().count()
    }

    fn resolve(&self, pos: IVec3) -> Option<(&ChunkData, IVec3)> {
        let size = self.dims.as_ivec3();
        let rel = pos - self.addr.origin(self.dims);
        let chunk = rel.div_euclid(size);
        let local = rel.rem_euclid(size);
        let data = match slot(chunk.x, chunk.y, chunk.z)? {
            CENTER_SLOT => &*self.center,
            i => self.neighbors[i].as_deref()?,
        };
        Some((data, local))
    }
}

impl VoxelQuery for ChunkNeighborhood {
    fn voxel_at(&self, pos: IVec3) -> Option<Voxel> {
        let (data, local) = self.resolve(pos)?;
        data.voxel_local(local)
    }

    fn liquid_at(&self, pos: IVec3) -> Option<LiquidCell> {
        let (data, local) = self.resolve(pos)?;
        data.liquid_local(local)
    }
}
