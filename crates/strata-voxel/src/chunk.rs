//! Dense chunk storage: a voxel grid and a parallel liquid grid.
//!
//! Cells are stored layer by layer (`y` outermost) so a horizontal slice is
//! one contiguous run.

use glam::IVec3;

use crate::registry::LiquidTypeId;
use crate::voxel::{LiquidCell, Voxel};

/// Chunk dimensions in voxels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ChunkDims {
    /// Size along X.
    pub x: usize,
    /// Size along Y.
    pub y: usize,
    /// Size along Z.
    pub z: usize,
}

impl ChunkDims {
    /// Default world chunk size.
    pub const DEFAULT: Self = Self::cube(16);

    /// Creates dimensions; zero sizes are bumped to 1.
    pub const fn new(x: usize, y: usize, z: usize) -> Self {
        Self {
            x: if x == 0 { 1 } else { x },
            y: if y == 0 { 1 } else { y },
            z: if z == 0 { 1 } else { z },
        }
    }

    /// Cubic dimensions.
    pub const fn cube(size: usize) -> Self {
        Self::new(size, size, size)
    }

    /// Number of cells.
    pub const fn volume(&self) -> usize {
        self.x * self.y * self.z
    }

    /// Dimensions as a signed vector.
    pub fn as_ivec3(&self) -> IVec3 {
        IVec3::new(self.x as i32, self.y as i32, self.z as i32)
    }

    /// Returns `true` if a signed local position lies inside the chunk.
    pub fn contains(&self, local: IVec3) -> bool {
        local.x >= 0
            && local.y >= 0
            && local.z >= 0
            && (local.x as usize) < self.x
            && (local.y as usize) < self.y
            && (local.z as usize) < self.z
    }

    /// Linear index of `(x, y, z)`. Callers must stay in bounds.
    #[inline]
    pub fn index(&self, x: usize, y: usize, z: usize) -> usize {
        x + self.x * (z + self.z * y)
    }

    /// Inverse of [`index`](Self::index).
    pub fn position(&self, index: usize) -> (usize, usize, usize) {
        let x = index % self.x;
        let z = (index / self.x) % self.z;
        let y = index / (self.x * self.z);
        (x, y, z)
    }
}

impl Default for ChunkDims {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Voxel and liquid cells of one chunk.
#[derive(Clone, Debug, PartialEq)]
pub struct ChunkData {
    dims: ChunkDims,
    voxels: Vec<Voxel>,
    liquids: Vec<LiquidCell>,
}

impl ChunkData {
    /// Creates an empty, dry chunk.
    pub fn new(dims: ChunkDims) -> Self {
        Self::filled(dims, Voxel::EMPTY)
    }

    /// Creates a dry chunk with every voxel set to `voxel`.
    pub fn filled(dims: ChunkDims, voxel: Voxel) -> Self {
        Self {
            dims,
            voxels: vec![voxel; dims.volume()],
            liquids: vec![LiquidCell::DRY; dims.volume()],
        }
    }

    /// Chunk dimensions.
    pub fn dims(&self) -> ChunkDims {
        self.dims
    }

    fn in_bounds(&self, x: usize, y: usize, z: usize) -> bool {
        x < self.dims.x && y < self.dims.y && z < self.dims.z
    }

    /// Voxel at `(x, y, z)`; empty when out of bounds.
    pub fn voxel(&self, x: usize, y: usize, z: usize) -> Voxel {
        if !self.in_bounds(x, y, z) {
            return Voxel::EMPTY;
        }
        self.voxels[self.dims.index(x, y, z)]
    }

    /// Voxel at a signed local position, `None` outside the chunk.
    pub fn voxel_local(&self, local: IVec3) -> Option<Voxel> {
        self.dims
            .contains(local)
            .then(|| self.voxels[self.dims.index(local.x as usize, local.y as usize, local.z as usize)])
    }

    /// Writes a voxel. Returns `false` when out of bounds.
    pub fn set_voxel(&mut self, x: usize, y: usize, z: usize, voxel: Voxel) -> bool {
        if !self.in_bounds(x, y, z) {
            return false;
        }
        let index = self.dims.index(x, y, z);
        self.voxels[index] = voxel;
        true
    }

    /// Liquid at `(x, y, z)`; dry when out of bounds.
    pub fn liquid(&self, x: usize, y: usize, z: usize) -> LiquidCell {
        if !self.in_bounds(x, y, z) {
            return LiquidCell::DRY;
        }
        self.liquids[self.dims.index(x, y, z)]
    }

    /// Liquid at a signed local position, `None` outside the chunk.
    pub fn liquid_local(&self, local: IVec3) -> Option<LiquidCell> {
        self.dims
            .contains(local)
            .then(|| self.liquids[self.dims.index(local.x as usize, local.y as usize, local.z as usize)])
    }

    /// Writes a liquid cell. Returns `false` when out of bounds.
    pub fn set_liquid(&mut self, x: usize, y: usize, z: usize, cell: LiquidCell) -> bool {
        if !self.in_bounds(x, y, z) {
            return false;
        }
        let index = self.dims.index(x, y, z);
        self.liquids[index] = cell;
        true
    }

    /// All voxels in storage order.
    pub fn voxels(&self) -> &[Voxel] {
        &self.voxels
    }

    /// Mutable voxels in storage order.
    pub fn voxels_mut(&mut self) -> &mut [Voxel] {
        &mut self.voxels
    }

    /// All liquid cells in storage order.
    pub fn liquids(&self) -> &[LiquidCell] {
        &self.liquids
    }

    /// Returns `true` if every voxel is empty.
    pub fn is_empty(&self) -> bool {
        self.voxels.iter().all(Voxel::is_empty)
    }

    /// Liquid types with at least one wet cell, in ascending id order.
    pub fn liquid_types_present(&self) -> Vec<LiquidTypeId> {
        let mut present = [false; 256];
        for cell in self.liquids.iter().filter(|c| c.is_wet()) {
            present[cell.liquid.0 as usize] = true;
        }
        present
            .iter()
            .enumerate()
            .filter(|(_, p)| **p)
            .map(|(id, _)| LiquidTypeId(id as u8))
            .collect()
    }
}
