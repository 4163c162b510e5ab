//! Attractors: point locations carrying a target elevation

use serde::{Deserialize, Serialize};

/// A point that pulls the surface toward `target_z`.
///
/// Attractors are derived once from the raw input (spot-elevation rasters,
/// coordinate lists) and are read-only from then on.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Attractor {
    pub x: f64,
    pub y: f64,
    pub target_z: f64,
}

impl Attractor {
    pub fn new(x: f64, y: f64, target_z: f64) -> Self {
        Self { x, y, target_z }
    }

    /// Squared Euclidean distance to a map coordinate
    #[inline]
    pub fn dist_sq(&self, other_x: f64, other_y: f64) -> f64 {
        let dx = self.x - other_x;
        let dy = self.y - other_y;
        dx * dx + dy * dy
    }

    /// Euclidean distance to a map coordinate
    #[inline]
    pub fn dist(&self, other_x: f64, other_y: f64) -> f64 {
        self.dist_sq(other_x, other_y).sqrt()
    }
}
