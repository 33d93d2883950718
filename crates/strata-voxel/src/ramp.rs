//! Ramp masks: which top corners of a voxel are pulled down into a slope.
//!
//! Axis convention: left = -X, right = +X, front = -Z, back = +Z.

use serde::{Deserialize, Serialize};

/// One of the four corners of a voxel's top face.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum TopCorner {
    /// -X, -Z.
    FrontLeft = 0,
    /// +X, -Z.
    FrontRight = 1,
    /// -X, +Z.
    BackLeft = 2,
    /// +X, +Z.
    BackRight = 3,
}

impl TopCorner {
    /// All four corners in bit order.
    pub const ALL: [TopCorner; 4] = [
        Self::FrontLeft,
        Self::FrontRight,
        Self::BackLeft,
        Self::BackRight,
    ];

    /// Bit for this corner inside a [`RampMask`].
    pub const fn bit(self) -> u8 {
        1 << self as u8
    }

    /// Horizontal step from the voxel center toward this corner, as `(dx, dz)`.
    pub const fn step(self) -> (i32, i32) {
        match self {
            Self::FrontLeft => (-1, -1),
            Self::FrontRight => (1, -1),
            Self::BackLeft => (-1, 1),
            Self::BackRight => (1, 1),
        }
    }

    /// Corner position on the unit top face, as `(x, z)` in `{0, 1}`.
    pub const fn unit(self) -> (u8, u8) {
        match self {
            Self::FrontLeft => (0, 0),
            Self::FrontRight => (1, 0),
            Self::BackLeft => (0, 1),
            Self::BackRight => (1, 1),
        }
    }

    /// The corner at unit position `(x, z)`; any non-zero value counts as 1.
    pub const fn from_unit(x: u8, z: u8) -> Self {
        match (x != 0, z != 0) {
            (false, false) => Self::FrontLeft,
            (true, false) => Self::FrontRight,
            (false, true) => Self::BackLeft,
            (true, true) => Self::BackRight,
        }
    }
}

/// Bitmask of lowered top corners.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RampMask(pub u8);

impl RampMask {
    /// Flat top.
    pub const NONE: Self = Self(0);
    /// Front-left corner lowered.
    pub const FRONT_LEFT: Self = Self(TopCorner::FrontLeft.bit());
    /// Front-right corner lowered.
    pub const FRONT_RIGHT: Self = Self(TopCorner::FrontRight.bit());
    /// Back-left corner lowered.
    pub const BACK_LEFT: Self = Self(TopCorner::BackLeft.bit());
    /// Back-right corner lowered.
    pub const BACK_RIGHT: Self = Self(TopCorner::BackRight.bit());
    /// Every corner lowered (degenerate).
    pub const ALL: Self = Self(0b1111);

    /// Number of distinct masks.
    pub const COUNT: usize = 16;

    /// Returns `true` if `corner` is lowered.
    pub fn contains(self, corner: TopCorner) -> bool {
        self.0 & corner.bit() != 0
    }

    /// Sets or clears `corner`.
    pub fn set(&mut self, corner: TopCorner, lowered: bool) {
        if lowered {
            self.0 |= corner.bit();
        } else {
            self.0 &= !corner.bit();
        }
    }

    /// Returns a copy with `corner` lowered.
    pub fn with(mut self, corner: TopCorner) -> Self {
        self.set(corner, true);
        self
    }

    /// Returns `true` if no corner is lowered.
    pub fn is_none(self) -> bool {
        self.0 & 0b1111 == 0
    }

    /// Number of lowered corners.
    pub fn count(self) -> u32 {
        (self.0 & 0b1111).count_ones()
    }

    /// Slopes that pull in opposing directions at once: the two diagonal
    /// pairs, and all four corners (front with back, left with right).
    pub fn is_degenerate(self) -> bool {
        let diagonal_a = Self::FRONT_LEFT.0 | Self::BACK_RIGHT.0;
        let diagonal_b = Self::FRONT_RIGHT.0 | Self::BACK_LEFT.0;
        let bits = self.0 & 0b1111;
        bits == diagonal_a || bits == diagonal_b || bits == Self::ALL.0
    }

    /// Collapses degenerate masks to [`RampMask::NONE`] and drops stray high bits.
    pub fn normalized(self) -> Self {
        if self.is_degenerate() {
            Self::NONE
        } else {
            Self(self.0 & 0b1111)
        }
    }

    /// Index into tables of size [`RampMask::COUNT`].
    pub fn index(self) -> usize {
        (self.0 & 0b1111) as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_corner_bits_are_distinct() {
        let combined = TopCorner::ALL.iter().fold(0u8, |acc, c| acc | c.bit());
        assert_eq!(combined, RampMask::ALL.0);
    }

    #[test]
    fn test_unit_round_trips_through_from_unit() {
        for corner in TopCorner::ALL {
            let (x, z) = corner.unit();
            assert_eq!(TopCorner::from_unit(x, z), corner);
        }
    }

    #[test]
    fn test_step_points_toward_corner() {
        assert_eq!(TopCorner::FrontLeft.step(), (-1, -1));
        assert_eq!(TopCorner::BackRight.step(), (1, 1));
    }

    #[test]
    fn test_set_and_contains() {
        let mut mask = RampMask::NONE;
        mask.set(TopCorner::BackLeft, true);
        assert!(mask.contains(TopCorner::BackLeft));
        assert!(!mask.contains(TopCorner::FrontLeft));
        mask.set(TopCorner::BackLeft, false);
        assert!(mask.is_none());
    }

    #[test]
    fn test_opposing_combinations_normalize_to_none() {
        let degenerate = [
            RampMask(RampMask::FRONT_LEFT.0 | RampMask::BACK_RIGHT.0),
            RampMask(RampMask::FRONT_RIGHT.0 | RampMask::BACK_LEFT.0),
            RampMask::ALL,
        ];
        for mask in degenerate {
            assert!(mask.is_degenerate(), "{mask:?}");
            assert_eq!(mask.normalized(), RampMask::NONE);
        }
    }

    #[test]
    fn test_resolvable_masks_survive_normalization() {
        let edge_slope = RampMask::FRONT_LEFT.with(TopCorner::FrontRight);
        assert_eq!(edge_slope.normalized(), edge_slope);
        assert_eq!(RampMask::BACK_RIGHT.normalized(), RampMask::BACK_RIGHT);
        let three = RampMask::ALL.0 & !RampMask::BACK_RIGHT.0;
        assert_eq!(RampMask(three).normalized(), RampMask(three));
    }

    #[test]
    fn test_every_normalized_mask_is_resolvable() {
        for bits in 0..=255u8 {
            let mask = RampMask(bits).normalized();
            assert!(!mask.is_degenerate());
            assert!(mask.index() < RampMask::COUNT);
        }
    }
}
