//! Depth scoring and visible-set selection.
//!
//! The score is squared distance to the camera, multiplied by a penalty when
//! the instance is beyond the cull radius or behind the camera plane. This
//! stands in for a frustum test: penalized instances sink to the back of the
//! queue but are never excluded outright, so they still fill spare capacity.

use std::cmp::Ordering;

use glam::Vec3;

use crate::instance::{CameraState, InstanceId};

/// Parameters of the depth heuristic.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DepthPolicy {
    /// Distance beyond which instances are penalized.
    pub cull_distance: f32,
    /// Multiplier for penalized scores.
    pub depth_penalty: f32,
}

impl Default for DepthPolicy {
    fn default() -> Self {
        Self {
            cull_distance: 96.0,
            depth_penalty: 100.0,
        }
    }
}

impl DepthPolicy {
    /// Depth score of an instance at `position`. Lower is nearer.
    pub fn score(&self, camera: &CameraState, position: Vec3) -> f32 {
        let offset = position - camera.position;
        let dist_sq = offset.length_squared();
        let behind = offset.dot(camera.forward) < 0.0;
        let culled = dist_sq > self.cull_distance * self.cull_distance;
        if behind || culled {
            dist_sq * self.depth_penalty
        } else {
            dist_sq
        }
    }
}

/// A scored instance.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Ranked {
    pub score: f32,
    pub id: InstanceId,
}

fn nearest_first(a: &Ranked, b: &Ranked) -> Ordering {
    a.score.total_cmp(&b.score).then(a.id.cmp(&b.id))
}

/// Keeps the `capacity` lowest scores and returns their ids ordered back to
/// front (farthest first), ready for blending.
///
/// Ties are broken by id, so the result does not depend on input order.
pub fn select_visible(mut ranked: Vec<Ranked>, capacity: usize) -> Vec<InstanceId> {
    if capacity == 0 {
        return Vec::new();
    }
    if ranked.len() > capacity {
        ranked.select_nth_unstable_by(capacity - 1, nearest_first);
        ranked.truncate(capacity);
    }
    ranked.sort_unstable_by(|a, b| nearest_first(b, a));
    ranked.into_iter().map(|r| r.id).collect()
}
