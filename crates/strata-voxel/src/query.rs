//! Neighbor queries across chunk boundaries.

use glam::IVec3;

use crate::voxel::{LiquidCell, Voxel};

/// Face neighbor offsets: +Y, -Y, -X, +X, -Z, +Z.
pub const FACE_OFFSETS: [IVec3; 6] = [
    IVec3::Y,
    IVec3::NEG_Y,
    IVec3::NEG_X,
    IVec3::X,
    IVec3::NEG_Z,
    IVec3::Z,
];

/// Read access to voxels and liquids by world position.
///
/// `None` means the position lies in a chunk that is not loaded (or not
/// captured in a snapshot). That is a normal boundary condition, never an
/// error.
pub trait VoxelQuery {
    /// Voxel at a world position.
    fn voxel_at(&self, pos: IVec3) -> Option<Voxel>;

    /// Liquid cell at a world position.
    fn liquid_at(&self, pos: IVec3) -> Option<LiquidCell>;

    /// The face neighbors of `pos` that resolve, with their positions.
    fn non_null_voxels_near(&self, pos: IVec3) -> Vec<(IVec3, Voxel)> {
        FACE_OFFSETS
            .iter()
            .filter_map(|offset| {
                let neighbor = pos + *offset;
                self.voxel_at(neighbor).map(|voxel| (neighbor, voxel))
            })
            .collect()
    }
}

impl<T: VoxelQuery + ?Sized> VoxelQuery for &T {
    fn voxel_at(&self, pos: IVec3) -> Option<Voxel> {
        (**self).voxel_at(pos)
    }

    fn liquid_at(&self, pos: IVec3) -> Option<LiquidCell> {
        (**self).liquid_at(pos)
    }

    fn non_null_voxels_near(&self, pos: IVec3) -> Vec<(IVec3, Voxel)> {
        (**self).non_null_voxels_near(pos)
    }
}
