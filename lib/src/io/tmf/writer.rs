//! 3MF package writer.

use super::transform::{format_transform, to_tmf};
use super::{CONTENT_TYPES, CORE_NAMESPACE, MODEL_PATH, RELS, VENDOR_NAMESPACE};
use crate::model::{Model, ModelObject};
use crate::{Error, Result};
use log::info;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufWriter, Seek, Write};
use std::path::Path;
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

/// Id of the single base materials group.
const MATERIAL_GROUP_ID: usize = 1;

const DEFAULT_COLOR: &str = "#FFFFFFFF";

struct ModelWriter {
    xml: Writer<Vec<u8>>,
}

impl ModelWriter {
    fn new() -> Self {
        Self {
            xml: Writer::new_with_indent(Vec::new(), b' ', 2),
        }
    }

    fn event(&mut self, event: Event) -> Result<()> {
        self.xml
            .write_event(event)
            .map_err(|e| Error::Tmf(format!("failed to write model XML: {}", e)))
    }

    fn start(&mut self, elem: BytesStart) -> Result<()> {
        self.event(Event::Start(elem))
    }

    fn empty(&mut self, elem: BytesStart) -> Result<()> {
        self.event(Event::Empty(elem))
    }

    fn end(&mut self, name: &str) -> Result<()> {
        self.event(Event::End(BytesEnd::new(name)))
    }

    fn write_model(&mut self, model: &Model) -> Result<()> {
        self.event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

        let mut root = BytesStart::new("model");
        root.push_attribute(("unit", "millimeter"));
        root.push_attribute(("xml:lang", "en-US"));
        root.push_attribute(("xmlns", CORE_NAMESPACE));
        root.push_attribute(("xmlns:slic3r", VENDOR_NAMESPACE));
        self.start(root)?;

        for (name, value) in &model.metadata {
            let mut elem = BytesStart::new("metadata");
            elem.push_attribute(("name", name.as_str()));
            self.start(elem)?;
            self.event(Event::Text(BytesText::new(value)))?;
            self.end("metadata")?;
        }

        self.start(BytesStart::new("resources"))?;
        let material_index = self.write_materials(model)?;
        let first_object_id = if material_index.is_empty() { 1 } else { MATERIAL_GROUP_ID + 1 };
        for (i, object) in model.objects.iter().enumerate() {
            self.write_object(object, first_object_id + i, &material_index)?;
        }
        self.end("resources")?;

        self.start(BytesStart::new("build"))?;
        for (i, object) in model.objects.iter().enumerate() {
            let id = (first_object_id + i).to_string();
            for instance in &object.instances {
                let mut item = BytesStart::new("item");
                item.push_attribute(("objectid", id.as_str()));
                item.push_attribute(("transform", format_transform(&to_tmf(&instance.matrix())).as_str()));
                self.empty(item)?;
            }
        }
        self.end("build")?;
        self.end("model")
    }

    /// Write the base materials group; returns each material's index in it.
    fn write_materials(&mut self, model: &Model) -> Result<HashMap<String, usize>> {
        let mut index = HashMap::new();
        if model.materials.is_empty() {
            return Ok(index);
        }
        let group_id = MATERIAL_GROUP_ID.to_string();

        let mut group = BytesStart::new("basematerials");
        group.push_attribute(("id", group_id.as_str()));
        self.start(group)?;
        for (i, (id, material)) in model.materials.iter().enumerate() {
            let mut base = BytesStart::new("base");
            base.push_attribute(("name", material.name().unwrap_or(id.as_str())));
            base.push_attribute(("displaycolor", material.display_color().unwrap_or(DEFAULT_COLOR)));
            self.empty(base)?;
            index.insert(id.clone(), i);
        }
        self.end("basematerials")?;

        if model.materials.values().any(|m| !m.config.is_empty()) {
            self.start(BytesStart::new("slic3r:materials"))?;
            for (i, material) in model.materials.values().enumerate() {
                let pindex = i.to_string();
                for (key, value) in &material.config {
                    let mut elem = BytesStart::new("slic3r:material");
                    elem.push_attribute(("pid", group_id.as_str()));
                    elem.push_attribute(("pindex", pindex.as_str()));
                    elem.push_attribute(("type", key.as_str()));
                    elem.push_attribute(("config", value.as_str()));
                    self.empty(elem)?;
                }
            }
            self.end("slic3r:materials")?;
        }
        Ok(index)
    }

    fn write_object(
        &mut self,
        object: &ModelObject,
        id: usize,
        material_index: &HashMap<String, usize>,
    ) -> Result<()> {
        let mut elem = BytesStart::new("object");
        elem.push_attribute(("id", id.to_string().as_str()));
        elem.push_attribute(("type", "model"));
        if !object.name.is_empty() {
            elem.push_attribute(("name", object.name.as_str()));
        }
        self.start(elem)?;

        for (key, value) in &object.config {
            let mut config = BytesStart::new("slic3r:object");
            config.push_attribute(("type", key.as_str()));
            config.push_attribute(("config", value.as_str()));
            self.empty(config)?;
        }

        self.start(BytesStart::new("mesh"))?;

        self.start(BytesStart::new("vertices"))?;
        for volume in &object.volumes {
            for v in &volume.mesh.vertices {
                let mut vertex = BytesStart::new("vertex");
                vertex.push_attribute(("x", v[0].to_string().as_str()));
                vertex.push_attribute(("y", v[1].to_string().as_str()));
                vertex.push_attribute(("z", v[2].to_string().as_str()));
                self.empty(vertex)?;
            }
        }
        self.end("vertices")?;

        // triangle ranges of each volume in the merged list
        let mut ranges = Vec::with_capacity(object.volumes.len());
        let mut vertex_offset = 0u32;
        let mut facet_offset = 0usize;
        let group_id = MATERIAL_GROUP_ID.to_string();
        self.start(BytesStart::new("triangles"))?;
        for volume in &object.volumes {
            let material = volume
                .material_id
                .as_ref()
                .and_then(|m| material_index.get(m))
                .map(|i| i.to_string());
            for f in &volume.mesh.facets {
                let mut triangle = BytesStart::new("triangle");
                triangle.push_attribute(("v1", (f[0] + vertex_offset).to_string().as_str()));
                triangle.push_attribute(("v2", (f[1] + vertex_offset).to_string().as_str()));
                triangle.push_attribute(("v3", (f[2] + vertex_offset).to_string().as_str()));
                if let Some(p1) = &material {
                    triangle.push_attribute(("pid", group_id.as_str()));
                    triangle.push_attribute(("p1", p1.as_str()));
                }
                self.empty(triangle)?;
            }
            let count = volume.mesh.facets.len();
            if count > 0 {
                ranges.push((facet_offset, facet_offset + count - 1, volume));
            }
            facet_offset += count;
            vertex_offset += volume.mesh.vertices.len() as u32;
        }
        self.end("triangles")?;

        if !ranges.is_empty() {
            self.start(BytesStart::new("slic3r:volumes"))?;
            for (start, end, volume) in ranges {
                let mut elem = BytesStart::new("slic3r:volume");
                elem.push_attribute(("ts", start.to_string().as_str()));
                elem.push_attribute(("te", end.to_string().as_str()));
                elem.push_attribute(("modifier", if volume.modifier { "1" } else { "0" }));
                if volume.config.is_empty() {
                    self.empty(elem)?;
                    continue;
                }
                self.start(elem)?;
                for (key, value) in &volume.config {
                    let mut meta = BytesStart::new("slic3r:metadata");
                    meta.push_attribute(("type", key.as_str()));
                    meta.push_attribute(("config", value.as_str()));
                    self.empty(meta)?;
                }
                self.end("slic3r:volume")?;
            }
            self.end("slic3r:volumes")?;
        }

        self.end("mesh")?;
        self.end("object")
    }
}

/// Serialize the model part of a package.
pub fn write_model_xml(model: &Model) -> Result<Vec<u8>> {
    let mut writer = ModelWriter::new();
    writer.write_model(model)?;
    Ok(writer.xml.into_inner())
}

/// Write a 3MF package.
pub fn write_tmf<W: Write + Seek>(model: &Model, writer: W) -> Result<()> {
    let xml = write_model_xml(model)?;

    let mut zip = ZipWriter::new(writer);
    let options = SimpleFileOptions::default();
    zip.start_file("[Content_Types].xml", options)?;
    zip.write_all(CONTENT_TYPES.as_bytes())?;
    zip.start_file("_rels/.rels", options)?;
    zip.write_all(RELS.as_bytes())?;
    zip.start_file(MODEL_PATH, options)?;
    zip.write_all(&xml)?;
    zip.finish()?;

    info!(
        "3MF: wrote {} objects, {} materials",
        model.objects.len(),
        model.materials.len()
    );
    Ok(())
}

pub fn write_tmf_file<P: AsRef<Path>>(model: &Model, path: P) -> Result<()> {
    let file = File::create(path.as_ref())?;
    write_tmf(model, BufWriter::new(file))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ModelInstance, ModelMaterial, ModelVolume, TriangleMesh};

    fn sample_model() -> Model {
        let mut model = Model::new();
        model.metadata.insert("Title".into(), "Bolts <M3>".into());
        let mut material = ModelMaterial::new("PLA");
        material.config.insert("temperature".into(), "210".into());
        model.add_material("pla", material);

        let mut object = ModelObject::new("block");
        object.config.insert("support_material".into(), "1".into());
        object.add_volume(ModelVolume::new(TriangleMesh::cube(10.0)).material_id("pla"));
        let mut modifier = ModelVolume::new(TriangleMesh::cube(2.0)).modifier(true);
        modifier.config.insert("infill_density".into(), "50%".into());
        object.add_volume(modifier);
        object.add_instance(ModelInstance::new([20.0, 30.0, 0.0]));
        model.add_object(object);
        model
    }

    #[test]
    fn test_model_xml_layout() {
        let xml = String::from_utf8(write_model_xml(&sample_model()).unwrap()).unwrap();
        assert!(xml.contains(r#"xmlns:slic3r="http://link_to_Slic3r_schema.com/2017/06""#));
        assert!(xml.contains("Bolts &lt;M3&gt;"));
        assert!(xml.contains(r#"<basematerials id="1">"#));
        assert!(xml.contains(r#"<slic3r:material pid="1" pindex="0" type="temperature" config="210"/>"#));
        assert!(xml.contains(r#"<object id="2" type="model" name="block">"#));
        assert!(xml.contains(r#"<slic3r:object type="support_material" config="1"/>"#));
        assert!(xml.contains(r#"pid="1" p1="0""#));
        assert!(xml.contains(r#"<slic3r:volume ts="0" te="11" modifier="0"/>"#));
        assert!(xml.contains(r#"<slic3r:volume ts="12" te="23" modifier="1">"#));
        assert!(xml.contains(r#"<item objectid="2" transform="1 0 0 0 1 0 0 0 1 20 30 0"/>"#));
        // volumes are described inside the mesh
        let mesh_end = xml.find("</mesh>").unwrap();
        assert!(xml.find("<slic3r:volumes>").unwrap() < mesh_end);
    }

    #[test]
    fn test_no_materials_starts_ids_at_one() {
        let mut model = sample_model();
        model.materials.clear();
        let xml = String::from_utf8(write_model_xml(&model).unwrap()).unwrap();
        assert!(!xml.contains("basematerials"));
        assert!(xml.contains(r#"<object id="1""#));
        assert!(!xml.contains("p1="));
    }
}
