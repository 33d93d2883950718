//! The six face directions of a voxel and their canonical quad geometry.

use glam::IVec3;
use strata_voxel::{CubeCorner, FACE_OFFSETS, TopCorner};

/// One of the six directions a voxel face can point.
///
/// Left = -X, right = +X, front = -Z, back = +Z. The `repr(u8)` discriminant
/// doubles as the bit index inside [`super::VisibleFaces`] and matches the
/// order of [`FACE_OFFSETS`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum FaceDirection {
    /// +Y direction.
    Top = 0,
    /// -Y direction.
    Bottom = 1,
    /// -X direction.
    Left = 2,
    /// +X direction.
    Right = 3,
    /// -Z direction.
    Front = 4,
    /// +Z direction.
    Back = 5,
}

impl FaceDirection {
    /// All six directions in order.
    pub const ALL: [FaceDirection; 6] = [
        Self::Top,
        Self::Bottom,
        Self::Left,
        Self::Right,
        Self::Front,
        Self::Back,
    ];

    /// The four horizontal directions.
    pub const SIDES: [FaceDirection; 4] = [Self::Left, Self::Right, Self::Front, Self::Back];

    /// Returns the direction index (0-5).
    pub fn index(self) -> usize {
        self as usize
    }

    /// Returns `true` for the four horizontal faces.
    pub fn is_side(self) -> bool {
        !matches!(self, Self::Top | Self::Bottom)
    }

    /// Returns the neighbor offset for this direction.
    pub fn offset(self) -> IVec3 {
        FACE_OFFSETS[self.index()]
    }

    /// Returns the unit normal.
    pub fn normal(self) -> [f32; 3] {
        self.offset().as_vec3().to_array()
    }

    /// Returns the opposite face direction.
    pub fn opposite(self) -> Self {
        match self {
            Self::Top => Self::Bottom,
            Self::Bottom => Self::Top,
            Self::Left => Self::Right,
            Self::Right => Self::Left,
            Self::Front => Self::Back,
            Self::Back => Self::Front,
        }
    }

    /// Quad corners, counter-clockwise when viewed from outside the voxel.
    pub fn corners(self) -> [CubeCorner; 4] {
        use CubeCorner::*;
        match self {
            Self::Top => [TopFrontLeft, TopBackLeft, TopBackRight, TopFrontRight],
            Self::Bottom => [
                BottomFrontLeft,
                BottomFrontRight,
                BottomBackRight,
                BottomBackLeft,
            ],
            Self::Left => [BottomFrontLeft, BottomBackLeft, TopBackLeft, TopFrontLeft],
            Self::Right => [
                BottomFrontRight,
                TopFrontRight,
                TopBackRight,
                BottomBackRight,
            ],
            Self::Front => [BottomFrontLeft, TopFrontLeft, TopFrontRight, BottomFrontRight],
            Self::Back => [BottomBackLeft, BottomBackRight, TopBackRight, TopBackLeft],
        }
    }

    /// The two top corners along this face's upper edge, for side faces.
    ///
    /// Ordered by the coordinate that runs along the edge, so entry `i` of a
    /// face and entry `i` of its opposite face meet at the same world edge.
    pub fn top_edge(self) -> Option<[TopCorner; 2]> {
        match self {
            Self::Left => Some([TopCorner::FrontLeft, TopCorner::BackLeft]),
            Self::Right => Some([TopCorner::FrontRight, TopCorner::BackRight]),
            Self::Front => Some([TopCorner::FrontLeft, TopCorner::FrontRight]),
            Self::Back => Some([TopCorner::BackLeft, TopCorner::BackRight]),
            Self::Top | Self::Bottom => None,
        }
    }

    /// Texture coordinates of a corner on this face.
    ///
    /// Side faces run `v` from 0 at the top edge to 1 at the bottom; `u`
    /// increases to the right as seen from outside.
    pub fn uv(self, corner: CubeCorner) -> [f32; 2] {
        let [x, y, z] = corner.unit().map(f32::from);
        match self {
            Self::Top => [x, z],
            Self::Bottom => [x, 1.0 - z],
            Self::Left => [z, 1.0 - y],
            Self::Right => [1.0 - z, 1.0 - y],
            Self::Front => [1.0 - x, 1.0 - y],
            Self::Back => [x, 1.0 - y],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    #[test]
    fn test_opposite_is_involution() {
        for dir in FaceDirection::ALL {
            assert_eq!(dir.opposite().opposite(), dir);
            assert_eq!(dir.offset(), -dir.opposite().offset());
        }
    }

    #[test]
    fn test_offset_matches_axis_convention() {
        assert_eq!(FaceDirection::Left.offset(), IVec3::NEG_X);
        assert_eq!(FaceDirection::Front.offset(), IVec3::NEG_Z);
        assert_eq!(FaceDirection::Top.offset(), IVec3::Y);
    }

    #[test]
    fn test_corners_lie_on_face_plane() {
        for dir in FaceDirection::ALL {
            let n = dir.offset();
            for corner in dir.corners() {
                let p = IVec3::from_array(corner.unit().map(i32::from));
                // Positive faces sit at 1 along their axis, negative ones at 0.
                let along = p.dot(n.abs());
                let expected = if n.max_element() > 0 { 1 } else { 0 };
                assert_eq!(along, expected, "{dir:?} {corner:?}");
            }
        }
    }

    #[test]
    fn test_corners_wind_counter_clockwise_from_outside() {
        for dir in FaceDirection::ALL {
            let [a, b, c, _] = dir.corners().map(|c| Vec3::from(c.unit().map(f32::from)));
            let normal = (b - a).cross(c - a).normalize();
            assert_eq!(normal, Vec3::from(dir.normal()), "{dir:?}");
        }
    }

    #[test]
    fn test_top_edges_meet_across_opposite_faces() {
        for dir in FaceDirection::SIDES {
            let own = dir.top_edge().unwrap();
            let other = dir.opposite().top_edge().unwrap();
            for i in 0..2 {
                let (ox, oz) = own[i].unit();
                let (nx, nz) = other[i].unit();
                // Shift the neighbor's corner into the owner's frame.
                let shift = dir.offset();
                assert_eq!(ox as i32, nx as i32 + shift.x);
                assert_eq!(oz as i32, nz as i32 + shift.z);
            }
        }
        assert!(FaceDirection::Top.top_edge().is_none());
    }

    #[test]
    fn test_side_uv_top_edge_is_v_zero() {
        for dir in FaceDirection::SIDES {
            for corner in dir.corners() {
                let uv = dir.uv(corner);
                assert_eq!(uv[1] == 0.0, corner.is_top());
            }
        }
    }
}
