//! Per-cell voxel and liquid state.

use crate::ramp::{RampMask, TopCorner};
use crate::registry::{LiquidTypeId, VoxelTypeId};

/// Baked vertex color, RGBA8.
pub type Rgba8 = [u8; 4];

const WHITE: Rgba8 = [255, 255, 255, 255];

/// One of the eight corners of a unit cube.
///
/// The discriminant is `x | y << 1 | z << 2` with each axis in `{0, 1}`, and
/// indexes [`Voxel::corner_colors`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum CubeCorner {
    /// (0, 0, 0)
    BottomFrontLeft = 0,
    /// (1, 0, 0)
    BottomFrontRight = 1,
    /// (0, 1, 0)
    TopFrontLeft = 2,
    /// (1, 1, 0)
    TopFrontRight = 3,
    /// (0, 0, 1)
    BottomBackLeft = 4,
    /// (1, 0, 1)
    BottomBackRight = 5,
    /// (0, 1, 1)
    TopBackLeft = 6,
    /// (1, 1, 1)
    TopBackRight = 7,
}

impl CubeCorner {
    /// All corners in index order.
    pub const ALL: [CubeCorner; 8] = [
        Self::BottomFrontLeft,
        Self::BottomFrontRight,
        Self::TopFrontLeft,
        Self::TopFrontRight,
        Self::BottomBackLeft,
        Self::BottomBackRight,
        Self::TopBackLeft,
        Self::TopBackRight,
    ];

    /// Corner index (0-7).
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Corner at the given unit offsets.
    pub const fn from_unit(x: bool, y: bool, z: bool) -> Self {
        Self::ALL[(x as usize) | (y as usize) << 1 | (z as usize) << 2]
    }

    /// The corner nearest to a point inside the unit cube.
    pub fn nearest(point: [f32; 3]) -> Self {
        Self::from_unit(point[0] >= 0.5, point[1] >= 0.5, point[2] >= 0.5)
    }

    /// Unit offsets of this corner.
    pub const fn unit(self) -> [u8; 3] {
        let i = self as u8;
        [i & 1, (i >> 1) & 1, (i >> 2) & 1]
    }

    /// Returns `true` for the four corners at `y = 1`.
    pub const fn is_top(self) -> bool {
        (self as u8) & 0b010 != 0
    }

    /// The matching top-face corner, for top corners only.
    pub const fn top_corner(self) -> Option<TopCorner> {
        if self.is_top() {
            let [x, _, z] = self.unit();
            Some(TopCorner::from_unit(x, z))
        } else {
            None
        }
    }
}

/// A single voxel cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Voxel {
    /// Registered type; [`VoxelTypeId::EMPTY`] clears the cell.
    pub kind: VoxelTypeId,
    /// Hidden voxels are skipped by meshing and never occlude neighbors.
    pub visible: bool,
    /// Lowered top corners, written by the ramp pass.
    pub ramp: RampMask,
    /// Baked lighting per cube corner, indexed by [`CubeCorner::index`].
    pub corner_colors: [Rgba8; 8],
}

impl Voxel {
    /// Empty space.
    pub const EMPTY: Self = Self {
        kind: VoxelTypeId::EMPTY,
        visible: false,
        ramp: RampMask::NONE,
        corner_colors: [WHITE; 8],
    };

    /// A visible, flat voxel of the given type, lit white.
    pub const fn new(kind: VoxelTypeId) -> Self {
        Self {
            kind,
            visible: true,
            ramp: RampMask::NONE,
            corner_colors: [WHITE; 8],
        }
    }

    /// Returns a copy with every corner set to `color`.
    pub fn with_color(mut self, color: Rgba8) -> Self {
        self.corner_colors = [color; 8];
        self
    }

    /// Returns `true` if the cell holds no voxel.
    pub fn is_empty(&self) -> bool {
        self.kind == VoxelTypeId::EMPTY
    }

    /// Visible, non-empty voxels hide the faces of their neighbors.
    pub fn occludes(&self) -> bool {
        self.visible && !self.is_empty()
    }

    /// Baked color at `corner`.
    pub fn color_at(&self, corner: CubeCorner) -> Rgba8 {
        self.corner_colors[corner.index()]
    }
}

impl Default for Voxel {
    fn default() -> Self {
        Self::EMPTY
    }
}

/// Liquid state at a voxel position.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LiquidCell {
    /// Liquid type; [`LiquidTypeId::DRY`] means no liquid.
    pub liquid: LiquidTypeId,
    /// Fill level, 0-255.
    pub level: u8,
    /// Horizontal flow direction (x, z), for surface scrolling.
    pub flow: [i8; 2],
    /// Set while the liquid is falling (waterfalls).
    pub falling: bool,
}

impl LiquidCell {
    /// No liquid.
    pub const DRY: Self = Self {
        liquid: LiquidTypeId::DRY,
        level: 0,
        flow: [0, 0],
        falling: false,
    };

    /// Still liquid of the given type and level.
    pub const fn new(liquid: LiquidTypeId, level: u8) -> Self {
        Self {
            liquid,
            level,
            flow: [0, 0],
            falling: false,
        }
    }

    /// Returns a copy flagged as falling.
    pub const fn falling(mut self) -> Self {
        self.falling = true;
        self
    }

    /// Returns a copy with the given flow vector.
    pub const fn with_flow(mut self, flow: [i8; 2]) -> Self {
        self.flow = flow;
        self
    }

    /// Holds any liquid at a non-zero level.
    pub fn is_wet(&self) -> bool {
        self.liquid != LiquidTypeId::DRY && self.level > 0
    }

    /// Holds liquid of type `liquid` at a non-zero level.
    pub fn is_wet_with(&self, liquid: LiquidTypeId) -> bool {
        self.liquid == liquid && self.level > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_corner_index_matches_unit_offsets() {
        for corner in CubeCorner::ALL {
            let [x, y, z] = corner.unit();
            assert_eq!(CubeCorner::from_unit(x == 1, y == 1, z == 1), corner);
        }
    }

    #[test]
    fn test_nearest_corner() {
        assert_eq!(CubeCorner::nearest([0.1, 0.9, 0.2]), CubeCorner::TopFrontLeft);
        assert_eq!(CubeCorner::nearest([1.0, 0.0, 1.0]), CubeCorner::BottomBackRight);
    }

    #[test]
    fn test_top_corner_mapping() {
        assert_eq!(CubeCorner::TopFrontLeft.top_corner(), Some(TopCorner::FrontLeft));
        assert_eq!(CubeCorner::TopBackRight.top_corner(), Some(TopCorner::BackRight));
        assert_eq!(CubeCorner::BottomBackRight.top_corner(), None);
        assert_eq!(CubeCorner::ALL.iter().filter(|c| c.is_top()).count(), 4);
    }

    #[test]
    fn test_empty_never_occludes() {
        assert!(!Voxel::EMPTY.occludes());
        assert!(Voxel::new(VoxelTypeId(1)).occludes());
        let mut hidden = Voxel::new(VoxelTypeId(1));
        hidden.visible = false;
        assert!(!hidden.occludes());
    }

    #[test]
    fn test_liquid_wetness() {
        let water = LiquidTypeId(1);
        assert!(!LiquidCell::DRY.is_wet());
        assert!(!LiquidCell::new(water, 0).is_wet());
        assert!(LiquidCell::new(water, 1).is_wet_with(water));
        assert!(!LiquidCell::new(water, 1).is_wet_with(LiquidTypeId(2)));
    }
}
