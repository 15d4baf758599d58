//! Indexed triangle meshes.

use crate::{CoordF, Error, Result};
use serde::{Deserialize, Serialize};

/// Axis-aligned bounding box in 3D (mm).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox3 {
    pub min: [CoordF; 3],
    pub max: [CoordF; 3],
}

impl BoundingBox3 {
    pub fn size(&self) -> [CoordF; 3] {
        [
            self.max[0] - self.min[0],
            self.max[1] - self.min[1],
            self.max[2] - self.min[2],
        ]
    }

    pub fn center(&self) -> [CoordF; 3] {
        [
            (self.min[0] + self.max[0]) / 2.0,
            (self.min[1] + self.max[1]) / 2.0,
            (self.min[2] + self.max[2]) / 2.0,
        ]
    }

    pub fn merge(&mut self, other: &BoundingBox3) {
        for k in 0..3 {
            self.min[k] = self.min[k].min(other.min[k]);
            self.max[k] = self.max[k].max(other.max[k]);
        }
    }
}

/// A triangle mesh: shared vertices and facets indexing into them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TriangleMesh {
    pub vertices: Vec<[CoordF; 3]>,
    pub facets: Vec<[u32; 3]>,
}

impl TriangleMesh {
    pub fn new(vertices: Vec<[CoordF; 3]>, facets: Vec<[u32; 3]>) -> Self {
        Self { vertices, facets }
    }

    /// Axis-aligned box from `min` to `max`, facets facing outward.
    pub fn cuboid(min: [CoordF; 3], max: [CoordF; 3]) -> Self {
        let [x0, y0, z0] = min;
        let [x1, y1, z1] = max;
        let vertices = vec![
            [x0, y0, z0],
            [x1, y0, z0],
            [x1, y1, z0],
            [x0, y1, z0],
            [x0, y0, z1],
            [x1, y0, z1],
            [x1, y1, z1],
            [x0, y1, z1],
        ];
        let facets = vec![
            [0, 2, 1],
            [0, 3, 2],
            [4, 5, 6],
            [4, 6, 7],
            [0, 1, 5],
            [0, 5, 4],
            [1, 2, 6],
            [1, 6, 5],
            [2, 3, 7],
            [2, 7, 6],
            [3, 0, 4],
            [3, 4, 7],
        ];
        Self { vertices, facets }
    }

    /// Cube of the given size with a corner at the origin.
    pub fn cube(size: CoordF) -> Self {
        Self::cuboid([0.0; 3], [size; 3])
    }

    pub fn is_empty(&self) -> bool {
        self.facets.is_empty()
    }

    pub fn facets_count(&self) -> usize {
        self.facets.len()
    }

    /// Bounding box of the vertices, `None` for a mesh without vertices.
    pub fn bounding_box(&self) -> Option<BoundingBox3> {
        let first = *self.vertices.first()?;
        let mut bb = BoundingBox3 {
            min: first,
            max: first,
        };
        for v in &self.vertices[1..] {
            for k in 0..3 {
                bb.min[k] = bb.min[k].min(v[k]);
                bb.max[k] = bb.max[k].max(v[k]);
            }
        }
        Some(bb)
    }

    pub fn translate(&mut self, dx: CoordF, dy: CoordF, dz: CoordF) {
        for v in &mut self.vertices {
            v[0] += dx;
            v[1] += dy;
            v[2] += dz;
        }
    }

    /// Apply a row-major 3×4 affine matrix `[A | t]` to every vertex.
    pub fn transform(&mut self, m: &[CoordF; 12]) {
        for v in &mut self.vertices {
            let [x, y, z] = *v;
            *v = [
                m[0] * x + m[1] * y + m[2] * z + m[3],
                m[4] * x + m[5] * y + m[6] * z + m[7],
                m[8] * x + m[9] * y + m[10] * z + m[11],
            ];
        }
        // mirroring flips the facet orientation
        let det = m[0] * (m[5] * m[10] - m[6] * m[9]) - m[1] * (m[4] * m[10] - m[6] * m[8])
            + m[2] * (m[4] * m[9] - m[5] * m[8]);
        if det < 0.0 {
            for f in &mut self.facets {
                f.swap(1, 2);
            }
        }
    }

    /// Append another mesh, re-indexing its facets.
    pub fn merge(&mut self, other: &TriangleMesh) {
        let offset = self.vertices.len() as u32;
        self.vertices.extend_from_slice(&other.vertices);
        self.facets
            .extend(other.facets.iter().map(|f| [f[0] + offset, f[1] + offset, f[2] + offset]));
    }

    /// Enclosed volume (mm³), by the divergence theorem.
    pub fn volume(&self) -> CoordF {
        let mut volume = 0.0;
        for f in &self.facets {
            let (Some(a), Some(b), Some(c)) = (
                self.vertices.get(f[0] as usize),
                self.vertices.get(f[1] as usize),
                self.vertices.get(f[2] as usize),
            ) else {
                continue;
            };
            volume += a[0] * (b[1] * c[2] - b[2] * c[1])
                + b[0] * (c[1] * a[2] - c[2] * a[1])
                + c[0] * (a[1] * b[2] - a[2] * b[1]);
        }
        (volume / 6.0).abs()
    }

    /// A new mesh holding only the given facets. Unused vertices are
    /// dropped; the rest keep their relative order.
    pub fn subset<I>(&self, facets: I) -> TriangleMesh
    where
        I: IntoIterator<Item = usize>,
    {
        let picked: Vec<[u32; 3]> = facets
            .into_iter()
            .filter_map(|idx| self.facets.get(idx).copied())
            .collect();

        let mut used = vec![false; self.vertices.len()];
        for f in &picked {
            for &v in f {
                if let Some(slot) = used.get_mut(v as usize) {
                    *slot = true;
                }
            }
        }

        let mut remap = vec![0u32; self.vertices.len()];
        let mut vertices = Vec::new();
        for (i, _) in used.iter().enumerate().filter(|(_, &u)| u) {
            remap[i] = vertices.len() as u32;
            vertices.push(self.vertices[i]);
        }

        let facets = picked
            .into_iter()
            .filter(|f| f.iter().all(|&v| (v as usize) < remap.len()))
            .map(|f| f.map(|v| remap[v as usize]))
            .collect();
        TriangleMesh { vertices, facets }
    }

    /// Check that every facet indexes an existing vertex.
    pub fn validate(&self) -> Result<()> {
        let n = self.vertices.len();
        if let Some(f) = self.facets.iter().find(|f| f.iter().any(|&v| v as usize >= n)) {
            return Err(Error::Geometry(format!(
                "facet {:?} references a vertex out of {} vertices",
                f, n
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cube_volume_and_bounds() {
        let mesh = TriangleMesh::cube(10.0);
        assert_eq!(mesh.facets_count(), 12);
        assert!((mesh.volume() - 1000.0).abs() < 1e-9);
        let bb = mesh.bounding_box().unwrap();
        assert_eq!(bb.min, [0.0; 3]);
        assert_eq!(bb.max, [10.0; 3]);
        assert_eq!(bb.center(), [5.0; 3]);
        assert!(TriangleMesh::default().bounding_box().is_none());
        assert!(mesh.validate().is_ok());
    }

    #[test]
    fn test_transform_scale_and_translate() {
        let mut mesh = TriangleMesh::cube(1.0);
        let m = [2.0, 0.0, 0.0, 5.0, 0.0, 3.0, 0.0, 0.0, 0.0, 0.0, 4.0, -1.0];
        mesh.transform(&m);
        let bb = mesh.bounding_box().unwrap();
        assert_eq!(bb.min, [5.0, 0.0, -1.0]);
        assert_eq!(bb.max, [7.0, 3.0, 3.0]);
        assert!((mesh.volume() - 24.0).abs() < 1e-9);
    }

    #[test]
    fn test_mirror_keeps_volume_positive() {
        let mut mesh = TriangleMesh::cube(2.0);
        let original = mesh.facets[0];
        mesh.transform(&[-1.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0]);
        assert_eq!(mesh.facets[0], [original[0], original[2], original[1]]);
        assert!((mesh.volume() - 8.0).abs() < 1e-9);
    }

    #[test]
    fn test_merge_and_subset() {
        let mut mesh = TriangleMesh::cube(1.0);
        let mut other = TriangleMesh::cube(1.0);
        other.translate(5.0, 0.0, 0.0);
        mesh.merge(&other);
        assert_eq!(mesh.vertices.len(), 16);
        assert_eq!(mesh.facets_count(), 24);
        assert!(mesh.validate().is_ok());

        let second = mesh.subset(12..24);
        assert_eq!(second.vertices.len(), 8);
        // vertices keep their order
        assert_eq!(second, other);
        assert_eq!(second.bounding_box().unwrap().min[0], 5.0);
        assert!((second.volume() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_validate_rejects_bad_index() {
        let mesh = TriangleMesh::new(vec![[0.0; 3]], vec![[0, 1, 2]]);
        assert!(matches!(mesh.validate(), Err(Error::Geometry(_))));
    }
}
