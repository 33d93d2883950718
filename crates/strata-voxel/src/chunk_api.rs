//! Chunk wrapper with bounds-checked access, dirty flags, versioning, and
//! copy-on-write storage.
//!
//! [`Chunk`] keeps its [`ChunkData`] behind an [`Arc`]. Taking a snapshot for
//! a mesh worker is a reference-count bump; the next write clones the data
//! only while a snapshot is still alive.

use std::sync::Arc;

use crate::chunk::{ChunkData, ChunkDims};
use crate::ramp::RampMask;
use crate::voxel::{LiquidCell, Voxel};

/// Dirty-flag bit: chunk mesh needs rebuilding.
pub const MESH_DIRTY: u8 = 0b0000_0001;
/// Dirty-flag bit: ramp masks need recomputing.
pub const RAMP_DIRTY: u8 = 0b0000_0010;

const ALL_DIRTY: u8 = MESH_DIRTY | RAMP_DIRTY;

/// A voxel chunk with dirty tracking and versioning.
///
/// Out-of-bounds reads return empty cells and out-of-bounds writes are
/// ignored with a warning log.
#[derive(Clone, Debug)]
pub struct Chunk {
    data: Arc<ChunkData>,
    dirty: u8,
    /// Incremented on every change that affects meshing.
    version: u64,
    /// Assigned by the chunk manager on load; distinguishes reloads of the same address.
    generation: u64,
}

impl Chunk {
    /// Creates an empty chunk.
    pub fn new(dims: ChunkDims) -> Self {
        Self::from_data(ChunkData::new(dims))
    }

    /// Wraps existing data. The chunk starts fully dirty.
    pub fn from_data(data: ChunkData) -> Self {
        Self {
            data: Arc::new(data),
            dirty: ALL_DIRTY,
            version: 1,
            generation: 0,
        }
    }

    /// Chunk dimensions.
    pub fn dims(&self) -> ChunkDims {
        self.data.dims()
    }

    /// Voxel at `(x, y, z)`.
    pub fn voxel(&self, x: usize, y: usize, z: usize) -> Voxel {
        self.data.voxel(x, y, z)
    }

    /// Liquid at `(x, y, z)`.
    pub fn liquid(&self, x: usize, y: usize, z: usize) -> LiquidCell {
        self.data.liquid(x, y, z)
    }

    /// Writes a voxel, marking meshes and ramps dirty.
    pub fn set_voxel(&mut self, x: usize, y: usize, z: usize, voxel: Voxel) -> bool {
        if !Arc::make_mut(&mut self.data).set_voxel(x, y, z, voxel) {
            tracing::warn!("Chunk::set_voxel out of bounds: ({}, {}, {})", x, y, z);
            return false;
        }
        self.touch();
        true
    }

    /// Writes a liquid cell, marking the mesh dirty.
    pub fn set_liquid(&mut self, x: usize, y: usize, z: usize, cell: LiquidCell) -> bool {
        if !Arc::make_mut(&mut self.data).set_liquid(x, y, z, cell) {
            tracing::warn!("Chunk::set_liquid out of bounds: ({}, {}, {})", x, y, z);
            return false;
        }
        self.dirty |= MESH_DIRTY;
        self.version += 1;
        true
    }

    /// Replaces every voxel's ramp mask with `masks` (storage order).
    ///
    /// Returns the storage indices that changed. The version is bumped once
    /// if anything changed; ramps are left clean either way.
    pub fn apply_ramp_masks(&mut self, masks: &[RampMask]) -> Vec<usize> {
        let changed: Vec<usize> = self
            .data
            .voxels()
            .iter()
            .zip(masks)
            .enumerate()
            .filter(|(_, (voxel, mask))| voxel.ramp != **mask)
            .map(|(i, _)| i)
            .collect();

        if !changed.is_empty() {
            let voxels = Arc::make_mut(&mut self.data).voxels_mut();
            for &i in &changed {
                voxels[i].ramp = masks[i];
            }
            self.dirty |= MESH_DIRTY;
            self.version += 1;
        }
        self.dirty &= !RAMP_DIRTY;
        changed
    }

    /// Marks the chunk as needing new ramps and a new mesh without changing
    /// its cells, e.g. after a neighbor changed.
    pub fn touch(&mut self) {
        self.dirty |= ALL_DIRTY;
        self.version += 1;
    }

    /// Marks only the mesh stale, e.g. after a neighbor's ramps changed.
    pub fn invalidate_mesh(&mut self) {
        self.dirty |= MESH_DIRTY;
        self.version += 1;
    }

    /// Returns the current dirty flags.
    pub fn dirty_flags(&self) -> u8 {
        self.dirty
    }

    /// Returns `true` if the specified dirty flag (or combination) is set.
    pub fn is_dirty(&self, flag: u8) -> bool {
        self.dirty & flag == flag
    }

    /// Mark specific dirty flags.
    pub fn mark_dirty(&mut self, flags: u8) {
        self.dirty |= flags;
    }

    /// Clears the specified dirty flag bits.
    pub fn clear_dirty(&mut self, flags: u8) {
        self.dirty &= !flags;
    }

    /// Returns the current version counter.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Returns the load generation.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub(crate) fn set_generation(&mut self, generation: u64) {
        self.generation = generation;
    }

    /// Read access to the cells.
    pub fn data(&self) -> &ChunkData {
        &self.data
    }

    /// Shares the current cells without copying.
    pub fn snapshot(&self) -> Arc<ChunkData> {
        Arc::clone(&self.data)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
