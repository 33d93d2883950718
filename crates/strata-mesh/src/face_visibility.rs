//! Face visibility against a solid, visible neighbor, given both ramp masks.
//!
//! A side face is hidden only when the neighbor's face on the shared plane
//! has exactly the same outline: the two top corners on the shared edge are
//! lowered (or not) identically on both voxels. Any mismatch leaves a sliver
//! of one face uncovered, so the face is drawn. The rule compares the two
//! outlines for equality, which makes it symmetric: the owner's face and the
//! neighbor's opposite face are drawn or hidden together.
//!
//! Ramps never change whether a top or bottom face is hidden, so a solid
//! neighbor above or below always hides it.
//!
//! [`FaceVisibilityTable`] evaluates the rule for every combination once.
//! Build one during startup, wrap it in an `Arc`, and share it with every
//! mesh worker; it is never mutated.

use strata_voxel::RampMask;

use crate::face_direction::FaceDirection;

/// Lowered flags of the two top corners on `face`'s upper edge.
///
/// Top and bottom faces have no such edge and report `[false, false]`.
pub fn edge_profile(face: FaceDirection, mask: RampMask) -> [bool; 2] {
    match face.top_edge() {
        Some([a, b]) => [mask.contains(a), mask.contains(b)],
        None => [false, false],
    }
}

/// Evaluates the occlusion rule directly.
///
/// Returns `true` if `face` of a voxel ramped by `own` must be drawn when
/// the neighbor on that side is solid, visible, and ramped by `neighbor`.
/// Masks are normalized first.
pub fn face_exposed(face: FaceDirection, own: RampMask, neighbor: RampMask) -> bool {
    if !face.is_side() {
        return false;
    }
    edge_profile(face, own.normalized()) != edge_profile(face.opposite(), neighbor.normalized())
}

/// Precomputed [`face_exposed`] for every face and pair of masks.
#[derive(Clone, Debug)]
pub struct FaceVisibilityTable {
    draw: [[[bool; RampMask::COUNT]; RampMask::COUNT]; 6],
}

impl FaceVisibilityTable {
    /// Builds the table from the occlusion rule.
    pub fn new() -> Self {
        let mut draw = [[[false; RampMask::COUNT]; RampMask::COUNT]; 6];
        for face in FaceDirection::ALL {
            for own in 0..RampMask::COUNT {
                for neighbor in 0..RampMask::COUNT {
                    draw[face.index()][own][neighbor] =
                        face_exposed(face, RampMask(own as u8), RampMask(neighbor as u8));
                }
            }
        }
        Self { draw }
    }

    /// Whether `face` must be drawn against a solid, visible neighbor.
    #[inline]
    pub fn should_draw(&self, face: FaceDirection, own: RampMask, neighbor: RampMask) -> bool {
        self.draw[face.index()][own.index()][neighbor.index()]
    }

    /// Number of (face, own, neighbor) combinations that draw.
    pub fn drawn_count(&self) -> usize {
        self.draw.iter().flatten().flatten().filter(|d| **d).count()
    }
}

impl Default for FaceVisibilityTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_voxel::TopCorner;

    fn all_masks() -> impl Iterator<Item = RampMask> {
        (0..RampMask::COUNT as u8).map(RampMask)
    }

    #[test]
    fn test_front_face_with_front_left_ramp_against_flat_neighbor_draws() {
        let table = FaceVisibilityTable::new();
        assert!(table.should_draw(FaceDirection::Front, RampMask::FRONT_LEFT, RampMask::NONE));
    }

    #[test]
    fn test_flat_neighbors_hide_each_other() {
        let table = FaceVisibilityTable::new();
        for face in FaceDirection::ALL {
            assert!(!table.should_draw(face, RampMask::NONE, RampMask::NONE));
        }
    }

    #[test]
    fn test_flat_face_against_neighbor_sloping_down_toward_it_draws() {
        let table = FaceVisibilityTable::new();
        // Neighbor on +X has its -X top corners lowered: its high side faces away.
        let toward_owner = RampMask::FRONT_LEFT.with(TopCorner::BackLeft);
        assert!(table.should_draw(FaceDirection::Right, RampMask::NONE, toward_owner));
    }

    #[test]
    fn test_flat_face_against_neighbor_high_edge_is_hidden() {
        let table = FaceVisibilityTable::new();
        // Neighbor on +X lowers its far (+X) corners; its full-height edge touches the owner.
        let away_from_owner = RampMask::FRONT_RIGHT.with(TopCorner::BackRight);
        assert!(!table.should_draw(FaceDirection::Right, RampMask::NONE, away_from_owner));
    }

    #[test]
    fn test_matching_slopes_hide_shared_face() {
        let table = FaceVisibilityTable::new();
        // A continuous slope descending toward -Z: both voxels lower their front pair.
        let slope = RampMask::FRONT_LEFT.with(TopCorner::FrontRight);
        assert!(!table.should_draw(FaceDirection::Left, slope, slope));
        assert!(!table.should_draw(FaceDirection::Right, slope, slope));
    }

    #[test]
    fn test_top_and_bottom_never_exposed_by_ramps() {
        let table = FaceVisibilityTable::new();
        for own in all_masks() {
            for neighbor in all_masks() {
                assert!(!table.should_draw(FaceDirection::Top, own, neighbor));
                assert!(!table.should_draw(FaceDirection::Bottom, own, neighbor));
            }
        }
    }

    #[test]
    fn test_symmetric_under_face_swap() {
        let table = FaceVisibilityTable::new();
        for face in FaceDirection::ALL {
            for own in all_masks() {
                for neighbor in all_masks() {
                    assert_eq!(
                        table.should_draw(face, own, neighbor),
                        table.should_draw(face.opposite(), neighbor, own),
                        "{face:?} {own:?} {neighbor:?}"
                    );
                }
            }
        }
    }

    #[test]
    fn test_table_matches_rule_and_is_deterministic() {
        let a = FaceVisibilityTable::new();
        let b = FaceVisibilityTable::new();
        for face in FaceDirection::ALL {
            for own in all_masks() {
                for neighbor in all_masks() {
                    let expected = face_exposed(face, own, neighbor);
                    assert_eq!(a.should_draw(face, own, neighbor), expected);
                    assert_eq!(b.should_draw(face, own, neighbor), expected);
                }
            }
        }
        assert_eq!(a.drawn_count(), b.drawn_count());
    }

    #[test]
    fn test_degenerate_masks_behave_as_flat() {
        let table = FaceVisibilityTable::new();
        let diagonal = RampMask(RampMask::FRONT_LEFT.0 | RampMask::BACK_RIGHT.0);
        for face in FaceDirection::SIDES {
            assert!(!table.should_draw(face, diagonal, RampMask::NONE));
            assert!(!table.should_draw(face, RampMask::ALL, RampMask::NONE));
        }
    }
}
