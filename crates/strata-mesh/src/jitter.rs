//! Deterministic cosmetic vertex jitter.
//!
//! Offsets are sampled from simplex noise at the vertex's integer lattice
//! position, so every face sharing a lattice point moves it identically and
//! re-meshing an unchanged chunk reproduces the same positions.

use glam::{IVec3, Vec3};
use noise::{NoiseFn, Simplex};

/// Sample frequency; keeps lattice points off the noise grid where simplex
/// noise is zero.
const FREQUENCY: f64 = 0.173;
const PHASE: f64 = 0.5;

/// Per-axis offsets into the noise field so the three channels decorrelate.
const CHANNEL_OFFSETS: [[f64; 3]; 3] = [[0.0, 0.0, 0.0], [31.7, 11.3, 5.9], [71.3, 43.1, 97.7]];

/// Position-seeded vertex offset generator.
#[derive(Clone)]
pub struct VertexJitter {
    noise: Simplex,
    amplitude: f32,
}

impl VertexJitter {
    /// Creates a jitter source. An amplitude of zero disables jitter.
    pub fn new(seed: u32, amplitude: f32) -> Self {
        Self {
            noise: Simplex::new(seed),
            amplitude: amplitude.max(0.0),
        }
    }

    /// Maximum displacement along each axis.
    pub fn amplitude(&self) -> f32 {
        self.amplitude
    }

    /// Offset for the vertex at world lattice position `lattice`.
    pub fn offset(&self, lattice: IVec3) -> Vec3 {
        if self.amplitude == 0.0 {
            return Vec3::ZERO;
        }
        let base = lattice.as_dvec3() * FREQUENCY + PHASE;
        let sample = |channel: [f64; 3]| {
            self.noise
                .get([base.x + channel[0], base.y + channel[1], base.z + channel[2]]) as f32
        };
        Vec3::new(
            sample(CHANNEL_OFFSETS[0]),
            sample(CHANNEL_OFFSETS[1]),
            sample(CHANNEL_OFFSETS[2]),
        ) * self.amplitude
    }
}

impl std::fmt::Debug for VertexJitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VertexJitter")
            .field("amplitude", &self.amplitude)
            .finish_non_exhaustive()
    }
}
