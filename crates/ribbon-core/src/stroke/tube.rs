//! Circular tube extruded along a curve using parallel-transported frames.

use std::f32::consts::TAU;

use glam::{Quat, Vec3};
use serde::Serialize;

use super::curve::CatmullRomCurve;
use crate::ribbon::IndexBuffer;

/// Fewest sides a tube cross-section may have.
pub const MIN_RADIAL_SEGMENTS: u32 = 3;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TubeMesh {
    pub radius: f32,
    pub tubular_segments: usize,
    pub radial_segments: usize,
    /// `(tubular_segments + 1) * (radial_segments + 1)` vertices, ring by ring.
    pub positions: Vec<[f32; 3]>,
    pub normals: Vec<[f32; 3]>,
    pub uvs: Vec<[f32; 2]>,
    pub indices: IndexBuffer,
}

/// Moving frame sampled at even arc-length steps.
#[derive(Debug, Clone)]
pub struct Frames {
    pub tangents: Vec<Vec3>,
    pub normals: Vec<Vec3>,
    pub binormals: Vec<Vec3>,
}

/// Tangents at `segments + 1` stations (`segments` is at least 1); the first
/// normal is seeded from the axis least aligned with the tangent and then
/// carried along by rotating it with each change in tangent direction.
pub fn frames(curve: &CatmullRomCurve, segments: usize) -> Frames {
    let segments = segments.max(1);
    let tangents: Vec<Vec3> =
        (0..=segments).map(|i| curve.tangent_at(i as f32 / segments as f32)).collect();

    let t0 = tangents[0];
    let seed = least_aligned_axis(t0);
    let side = t0.cross(seed).normalize_or_zero();
    let mut normals = Vec::with_capacity(segments + 1);
    let mut binormals = Vec::with_capacity(segments + 1);
    normals.push(t0.cross(side));
    binormals.push(t0.cross(normals[0]));

    for i in 1..=segments {
        let mut normal = normals[i - 1];
        let axis = tangents[i - 1].cross(tangents[i]);
        if axis.length() > f32::EPSILON {
            let theta = tangents[i - 1].dot(tangents[i]).clamp(-1.0, 1.0).acos();
            normal = Quat::from_axis_angle(axis.normalize(), theta) * normal;
        }
        binormals.push(tangents[i].cross(normal));
        normals.push(normal);
    }

    Frames { tangents, normals, binormals }
}

fn least_aligned_axis(t: Vec3) -> Vec3 {
    let a = t.abs();
    let mut min = f32::MAX;
    let mut axis = Vec3::X;
    if a.x <= min {
        min = a.x;
        axis = Vec3::X;
    }
    if a.y <= min {
        min = a.y;
        axis = Vec3::Y;
    }
    if a.z <= min {
        axis = Vec3::Z;
    }
    axis
}

/// Open tube (no end caps) of `radius` around `curve`.
pub fn extrude_tube(
    curve: &CatmullRomCurve,
    tubular_segments: usize,
    radius: f32,
    radial_segments: u32,
) -> TubeMesh {
    let tubular = tubular_segments.max(1);
    let radial = radial_segments.max(MIN_RADIAL_SEGMENTS) as usize;
    let frames = frames(curve, tubular);
    let ring = radial + 1;
    let vertex_count = (tubular + 1) * ring;

    let mut positions = Vec::with_capacity(vertex_count);
    let mut normals = Vec::with_capacity(vertex_count);
    let mut uvs = Vec::with_capacity(vertex_count);

    for i in 0..=tubular {
        let u = i as f32 / tubular as f32;
        let center = curve.point_at(u);
        let (n, b) = (frames.normals[i], frames.binormals[i]);
        for j in 0..=radial {
            let v = j as f32 / radial as f32 * TAU;
            let dir = (n * -v.cos() + b * v.sin()).normalize_or_zero();
            positions.push((center + dir * radius).to_array());
            normals.push(dir.to_array());
            uvs.push([u, j as f32 / radial as f32]);
        }
    }

    let ring = ring as u32;
    let faces = (1..=tubular as u32).flat_map(move |j| {
        (1..=radial as u32).flat_map(move |i| {
            let a = ring * (j - 1) + (i - 1);
            let b = ring * j + (i - 1);
            let c = ring * j + i;
            let d = ring * (j - 1) + i;
            [a, b, d, b, c, d]
        })
    });
    let indices = IndexBuffer::for_vertex_count(vertex_count, faces);

    TubeMesh {
        radius,
        tubular_segments: tubular,
        radial_segments: radial,
        positions,
        normals,
        uvs,
        indices,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn straight() -> CatmullRomCurve {
        CatmullRomCurve::new(&[[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [2.0, 0.0, 0.0]]).unwrap()
    }

    #[test]
    fn counts_follow_segments() {
        let tube = extrude_tube(&straight(), 4, 0.1, 6);
        assert_eq!(tube.positions.len(), 5 * 7);
        assert_eq!(tube.normals.len(), tube.positions.len());
        assert_eq!(tube.indices.triangle_count(), 4 * 6 * 2);
        assert!(tube.indices.iter().all(|i| (i as usize) < tube.positions.len()));
    }

    #[test]
    fn vertices_sit_at_radius_from_axis() {
        let tube = extrude_tube(&straight(), 2, 0.25, 8);
        for p in &tube.positions {
            let off = (p[1] * p[1] + p[2] * p[2]).sqrt();
            assert_abs_diff_eq!(off, 0.25, epsilon = 1e-5);
        }
    }

    #[test]
    fn frames_are_orthonormal_on_bent_curve() {
        let curve = CatmullRomCurve::new(&[
            [0.0, 0.0, 0.0],
            [1.0, 0.2, 0.5],
            [2.0, -0.1, 0.2],
            [3.0, 0.3, 0.9],
        ])
        .unwrap();
        let f = frames(&curve, 12);
        for i in 0..=12 {
            let (t, n, b) = (f.tangents[i], f.normals[i], f.binormals[i]);
            assert_abs_diff_eq!(t.length(), 1.0, epsilon = 1e-3);
            assert_abs_diff_eq!(n.length(), 1.0, epsilon = 1e-3);
            assert_abs_diff_eq!(t.dot(n), 0.0, epsilon = 1e-3);
            assert_abs_diff_eq!(t.dot(b), 0.0, epsilon = 1e-3);
        }
    }

    #[test]
    fn zero_segments_still_yield_finite_frames() {
        let f = frames(&straight(), 0);
        assert_eq!(f.tangents.len(), 2);
        for v in f.tangents.iter().chain(&f.normals).chain(&f.binormals) {
            assert!(v.is_finite(), "{v:?}");
        }
    }

    #[test]
    fn radial_segments_have_a_floor() {
        let tube = extrude_tube(&straight(), 2, 0.1, 1);
        assert_eq!(tube.radial_segments, MIN_RADIAL_SEGMENTS as usize);
    }

    #[test]
    fn large_tubes_switch_to_wide_indices() {
        let tube = extrude_tube(&straight(), 10_000, 0.1, 6);
        assert!(tube.positions.len() > 65_535);
        assert_eq!(tube.indices.format(), crate::ribbon::IndexFormat::U32);
    }
}
