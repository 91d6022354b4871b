//! Index buffers with a width picked from the vertex count, and vertex
//! normals for lit shading.

use glam::Vec3;
use serde::Serialize;

/// Largest vertex count addressable by a 16-bit index buffer.
pub const MAX_U16_VERTICES: usize = 65535;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexFormat {
    U16,
    U32,
}

impl IndexFormat {
    pub fn for_vertex_count(vertex_count: usize) -> Self {
        if vertex_count > MAX_U16_VERTICES {
            IndexFormat::U32
        } else {
            IndexFormat::U16
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "format", content = "data", rename_all = "lowercase")]
pub enum IndexBuffer {
    U16(Vec<u16>),
    U32(Vec<u32>),
}

impl IndexBuffer {
    /// Collect `indices` into a buffer sized for `vertex_count` vertices.
    /// Every index must be below `vertex_count`.
    pub fn for_vertex_count(vertex_count: usize, indices: impl IntoIterator<Item = u32>) -> Self {
        match IndexFormat::for_vertex_count(vertex_count) {
            IndexFormat::U16 => IndexBuffer::U16(indices.into_iter().map(|i| i as u16).collect()),
            IndexFormat::U32 => IndexBuffer::U32(indices.into_iter().collect()),
        }
    }

    pub fn format(&self) -> IndexFormat {
        match self {
            IndexBuffer::U16(_) => IndexFormat::U16,
            IndexBuffer::U32(_) => IndexFormat::U32,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            IndexBuffer::U16(v) => v.len(),
            IndexBuffer::U32(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn iter(&self) -> Box<dyn Iterator<Item = u32> + '_> {
        match self {
            IndexBuffer::U16(v) => Box::new(v.iter().map(|&i| i as u32)),
            IndexBuffer::U32(v) => Box::new(v.iter().copied()),
        }
    }

    pub fn triangle_count(&self) -> usize {
        self.len() / 3
    }
}

/// Area-weighted vertex normals for an indexed triangle list.
pub fn compute_vertex_normals(positions: &[[f32; 3]], indices: &IndexBuffer) -> Vec<[f32; 3]> {
    let mut acc = vec![Vec3::ZERO; positions.len()];
    let idx: Vec<usize> = indices.iter().map(|i| i as usize).collect();

    for tri in idx.chunks_exact(3) {
        let (a, b, c) = (tri[0], tri[1], tri[2]);
        let (pa, pb, pc) = (Vec3::from(positions[a]), Vec3::from(positions[b]), Vec3::from(positions[c]));
        let n = (pc - pb).cross(pa - pb);
        acc[a] += n;
        acc[b] += n;
        acc[c] += n;
    }

    acc.into_iter().map(|n| n.normalize_or_zero().to_array()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_switches_above_u16_range() {
        assert_eq!(IndexFormat::for_vertex_count(65534), IndexFormat::U16);
        assert_eq!(IndexFormat::for_vertex_count(65535), IndexFormat::U16);
        assert_eq!(IndexFormat::for_vertex_count(65536), IndexFormat::U32);
    }

    #[test]
    fn buffer_keeps_values_in_either_width() {
        let narrow = IndexBuffer::for_vertex_count(4, [0, 1, 2, 1, 3, 2]);
        let wide = IndexBuffer::for_vertex_count(70_000, [0, 1, 2, 1, 3, 2]);
        assert_eq!(narrow.format(), IndexFormat::U16);
        assert_eq!(wide.format(), IndexFormat::U32);
        assert!(narrow.iter().eq(wide.iter()));
        assert_eq!(narrow.triangle_count(), 2);
    }

    #[test]
    fn quad_in_xz_plane_faces_y() {
        // top0, base0, top1, base1 in the y = 0 plane.
        let positions = [[0.0, 0.0, 1.0], [0.0, 0.0, 0.0], [1.0, 0.0, 1.0], [1.0, 0.0, 0.0]];
        let indices = IndexBuffer::U16(vec![0, 1, 2, 1, 3, 2]);
        let normals = compute_vertex_normals(&positions, &indices);
        for n in normals {
            assert!((n[1].abs() - 1.0).abs() < 1e-6, "normal {n:?} should be ±Y");
            assert!(n[0].abs() < 1e-6 && n[2].abs() < 1e-6);
        }
    }
}
