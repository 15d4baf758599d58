//! Model tree: objects, their volumes and placed instances.
//!
//! This is what 3MF packages load into and what the print driver slices.

mod mesh;

pub use mesh::{BoundingBox3, TriangleMesh};

use crate::CoordF;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Key/value settings attached to objects and volumes.
pub type ConfigMap = BTreeMap<String, String>;

/// A printable material referenced by volumes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelMaterial {
    /// Free-form attributes, `name` and `displaycolor` among them.
    pub attributes: BTreeMap<String, String>,
    /// Settings stored alongside the material.
    #[serde(default)]
    pub config: ConfigMap,
}

impl ModelMaterial {
    pub fn new(name: &str) -> Self {
        let mut attributes = BTreeMap::new();
        attributes.insert("name".to_string(), name.to_string());
        Self {
            attributes,
            config: ConfigMap::new(),
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.attributes.get("name").map(String::as_str)
    }

    pub fn display_color(&self) -> Option<&str> {
        self.attributes.get("displaycolor").map(String::as_str)
    }
}

/// One mesh of an object. Modifier volumes carry settings, not geometry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelVolume {
    pub name: String,
    pub mesh: TriangleMesh,
    pub material_id: Option<String>,
    pub modifier: bool,
    pub config: ConfigMap,
}

impl ModelVolume {
    pub fn new(mesh: TriangleMesh) -> Self {
        Self {
            mesh,
            ..Default::default()
        }
    }

    pub fn material_id(mut self, id: &str) -> Self {
        self.material_id = Some(id.to_string());
        self
    }

    pub fn modifier(mut self, modifier: bool) -> Self {
        self.modifier = modifier;
        self
    }
}

/// Placement of an object on the bed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelInstance {
    /// Translation (mm).
    pub offset: [CoordF; 3],
    pub scaling_factor: [CoordF; 3],
    /// Rotation angles about X, Y and Z (radians). Applied about X first,
    /// then Z, then Y.
    pub rotation: [CoordF; 3],
}

impl Default for ModelInstance {
    fn default() -> Self {
        Self {
            offset: [0.0; 3],
            scaling_factor: [1.0; 3],
            rotation: [0.0; 3],
        }
    }
}

type Mat3 = [[CoordF; 3]; 3];

fn mat3_mul(a: &Mat3, b: &Mat3) -> Mat3 {
    let mut out = [[0.0; 3]; 3];
    for (r, row) in out.iter_mut().enumerate() {
        for (c, cell) in row.iter_mut().enumerate() {
            *cell = (0..3).map(|k| a[r][k] * b[k][c]).sum();
        }
    }
    out
}

impl ModelInstance {
    pub fn new(offset: [CoordF; 3]) -> Self {
        Self {
            offset,
            ..Default::default()
        }
    }

    pub fn scaling_factor(mut self, scale: [CoordF; 3]) -> Self {
        self.scaling_factor = scale;
        self
    }

    pub fn rotation(mut self, rotation: [CoordF; 3]) -> Self {
        self.rotation = rotation;
        self
    }

    /// Row-major 3×4 affine matrix `[R·S | t]`.
    pub fn matrix(&self) -> [CoordF; 12] {
        let (sx, cx) = self.rotation[0].sin_cos();
        let (sy, cy) = self.rotation[1].sin_cos();
        let (sz, cz) = self.rotation[2].sin_cos();
        let rx = [[1.0, 0.0, 0.0], [0.0, cx, -sx], [0.0, sx, cx]];
        let ry = [[cy, 0.0, sy], [0.0, 1.0, 0.0], [-sy, 0.0, cy]];
        let rz = [[cz, -sz, 0.0], [sz, cz, 0.0], [0.0, 0.0, 1.0]];
        let r = mat3_mul(&ry, &mat3_mul(&rz, &rx));

        let mut m = [0.0; 12];
        for row in 0..3 {
            for col in 0..3 {
                m[row * 4 + col] = r[row][col] * self.scaling_factor[col];
            }
            m[row * 4 + 3] = self.offset[row];
        }
        m
    }

    /// Apply this instance's placement to a mesh.
    pub fn transform_mesh(&self, mesh: &mut TriangleMesh) {
        mesh.transform(&self.matrix());
    }
}

/// A printable object: one or more volumes and where copies of it sit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelObject {
    pub name: String,
    pub volumes: Vec<ModelVolume>,
    pub instances: Vec<ModelInstance>,
    pub config: ConfigMap,
}

impl ModelObject {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    pub fn add_volume(&mut self, volume: ModelVolume) -> &mut ModelVolume {
        self.volumes.push(volume);
        let last = self.volumes.len() - 1;
        &mut self.volumes[last]
    }

    pub fn add_instance(&mut self, instance: ModelInstance) {
        self.instances.push(instance);
    }

    /// Merged mesh of every non-modifier volume.
    pub fn mesh(&self) -> TriangleMesh {
        let mut mesh = TriangleMesh::default();
        for volume in self.volumes.iter().filter(|v| !v.modifier) {
            mesh.merge(&volume.mesh);
        }
        mesh
    }

    /// Bounding box of the non-modifier volumes, before instancing.
    pub fn raw_bounding_box(&self) -> Option<BoundingBox3> {
        self.volumes
            .iter()
            .filter(|v| !v.modifier)
            .filter_map(|v| v.mesh.bounding_box())
            .reduce(|mut acc, bb| {
                acc.merge(&bb);
                acc
            })
    }

    pub fn facets_count(&self) -> usize {
        self.volumes.iter().map(|v| v.mesh.facets_count()).sum()
    }
}

/// Root of the model tree.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Model {
    pub objects: Vec<ModelObject>,
    pub materials: BTreeMap<String, ModelMaterial>,
    pub metadata: BTreeMap<String, String>,
}

impl Model {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_object(&mut self, object: ModelObject) -> &mut ModelObject {
        self.objects.push(object);
        let last = self.objects.len() - 1;
        &mut self.objects[last]
    }

    pub fn add_material(&mut self, id: &str, material: ModelMaterial) -> &mut ModelMaterial {
        self.materials.entry(id.to_string()).or_insert(material)
    }

    pub fn get_material(&self, id: &str) -> Option<&ModelMaterial> {
        self.materials.get(id)
    }

    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::FRAC_PI_2;

    fn assert_matrix_eq(a: &[f64; 12], b: &[f64; 12]) {
        for (x, y) in a.iter().zip(b) {
            assert!((x - y).abs() < 1e-9, "{:?} != {:?}", a, b);
        }
    }

    #[test]
    fn test_identity_instance() {
        let m = ModelInstance::default().matrix();
        assert_matrix_eq(
            &m,
            &[1.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0],
        );
    }

    #[test]
    fn test_instance_rotation_about_z() {
        let instance = ModelInstance::new([10.0, 20.0, 0.0])
            .scaling_factor([2.0, 2.0, 2.0])
            .rotation([0.0, 0.0, FRAC_PI_2]);
        let mut mesh = TriangleMesh::new(vec![[1.0, 0.0, 0.0]], Vec::new());
        instance.transform_mesh(&mut mesh);
        let v = mesh.vertices[0];
        assert!((v[0] - 10.0).abs() < 1e-9);
        assert!((v[1] - 22.0).abs() < 1e-9);
        assert!(v[2].abs() < 1e-9);
    }

    #[test]
    fn test_rotation_order() {
        // X first, then Z: the Y axis turns into Z, and Z stays put under Z
        let instance = ModelInstance::default().rotation([FRAC_PI_2, 0.0, FRAC_PI_2]);
        let mut mesh = TriangleMesh::new(vec![[0.0, 1.0, 0.0]], Vec::new());
        instance.transform_mesh(&mut mesh);
        let v = mesh.vertices[0];
        assert!(v[0].abs() < 1e-9 && v[1].abs() < 1e-9);
        assert!((v[2] - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_object_mesh_skips_modifiers() {
        let mut object = ModelObject::new("part");
        object.add_volume(ModelVolume::new(TriangleMesh::cube(10.0)));
        let mut modifier = TriangleMesh::cube(50.0);
        modifier.translate(-20.0, -20.0, 0.0);
        object.add_volume(ModelVolume::new(modifier).modifier(true));

        assert_eq!(object.mesh().facets_count(), 12);
        assert_eq!(object.facets_count(), 24);
        let bb = object.raw_bounding_box().unwrap();
        assert_eq!(bb.max, [10.0; 3]);
    }

    #[test]
    fn test_model_materials() {
        let mut model = Model::new();
        model.add_material("0", ModelMaterial::new("PLA"));
        assert_eq!(model.get_material("0").and_then(|m| m.name()), Some("PLA"));
        assert!(model.get_material("1").is_none());
        assert!(model.is_empty());
        model.add_object(ModelObject::new("a"));
        assert_eq!(model.object_count(), 1);
    }
}
