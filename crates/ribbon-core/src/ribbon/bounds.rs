use glam::DVec3;
use serde::Serialize;

/// Axis-aligned summary of all ribbon fill vertices.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BoundingSummary {
    pub min: DVec3,
    pub max: DVec3,
    pub size: DVec3,
    pub center: DVec3,
    /// Largest extent, never below 1.
    pub max_dim: f64,
}

impl BoundingSummary {
    /// An empty point set yields a zero-sized box at the origin.
    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a [f32; 3]>) -> Self {
        let (min, max) = points.into_iter().fold(
            (DVec3::splat(f64::INFINITY), DVec3::splat(f64::NEG_INFINITY)),
            |(lo, hi), p| {
                let p = DVec3::new(p[0] as f64, p[1] as f64, p[2] as f64);
                (lo.min(p), hi.max(p))
            },
        );

        if min.cmpgt(max).any() {
            return Self {
                min: DVec3::ZERO,
                max: DVec3::ZERO,
                size: DVec3::ZERO,
                center: DVec3::ZERO,
                max_dim: 1.0,
            };
        }

        let size = max - min;
        let center = (min + max) * 0.5;
        let max_dim = size.x.max(size.y).max(size.z).max(1.0);
        Self { min, max, size, center, max_dim }
    }
}
