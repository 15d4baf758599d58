//! 3MF package reader.

use super::transform::{decompose, from_tmf, parse_transform};
use super::MODEL_PATH;
use crate::model::{ConfigMap, Model, ModelInstance, ModelMaterial, ModelObject, ModelVolume, TriangleMesh};
use crate::{Error, Result};
use log::{debug, info};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::Path;
use zip::ZipArchive;

/// Element the parser is currently inside.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Root,
    Model,
    Metadata,
    Resources,
    BaseMaterials,
    Base,
    VendorMaterials,
    VendorMaterial,
    Object,
    VendorObject,
    Mesh,
    Vertices,
    Vertex,
    Triangles,
    Triangle,
    VendorVolumes,
    VendorVolume,
    VendorMetadata,
    Components,
    Component,
    Build,
    Item,
}

impl State {
    /// Transition table: the state entered by a child element, if it is known.
    fn child(self, name: &str) -> Option<State> {
        use State::*;
        let next = match (self, name) {
            (Root, "model") => Model,
            (Model, "metadata") => Metadata,
            (Model, "resources") => Resources,
            (Model, "build") => Build,
            (Resources, "basematerials") => BaseMaterials,
            (Resources, "slic3r:materials") => VendorMaterials,
            (Resources, "object") => Object,
            (BaseMaterials, "base") => Base,
            (VendorMaterials, "slic3r:material") => VendorMaterial,
            (Object, "mesh") => Mesh,
            (Object, "components") => Components,
            (Object, "slic3r:object") => VendorObject,
            (Mesh, "vertices") => Vertices,
            (Mesh, "triangles") => Triangles,
            (Mesh, "slic3r:volumes") => VendorVolumes,
            (Vertices, "vertex") => Vertex,
            (Triangles, "triangle") => Triangle,
            (VendorVolumes, "slic3r:volume") => VendorVolume,
            (VendorVolume, "slic3r:metadata") => VendorMetadata,
            (Components, "component") => Component,
            (Build, "item") => Item,
            _ => return None,
        };
        Some(next)
    }
}

/// A `<slic3r:volume>` triangle range.
#[derive(Debug, Default)]
struct VolumeRange {
    start: usize,
    end: usize,
    modifier: bool,
    config: ConfigMap,
}

/// Object being assembled while its element is open.
#[derive(Debug, Default)]
struct ObjectBuilder {
    id: usize,
    name: String,
    config: ConfigMap,
    property: Option<(usize, usize)>,
    mesh: TriangleMesh,
    triangle_properties: Vec<Option<(usize, usize)>>,
    ranges: Vec<VolumeRange>,
    components: Vec<ModelVolume>,
}

type Attributes = HashMap<String, String>;

fn unescape(raw: &[u8]) -> Result<String> {
    let s = std::str::from_utf8(raw).map_err(|e| Error::Tmf(e.to_string()))?;
    quick_xml::escape::unescape(s)
        .map(|v| v.into_owned())
        .map_err(|e| Error::Tmf(e.to_string()))
}

fn attributes(e: &BytesStart) -> Result<Attributes> {
    let mut attrs = Attributes::new();
    for attr in e.attributes() {
        let attr = attr.map_err(|e| Error::Tmf(e.to_string()))?;
        let key = std::str::from_utf8(attr.key.as_ref()).map_err(|e| Error::Tmf(e.to_string()))?;
        attrs.insert(key.to_string(), unescape(&attr.value)?);
    }
    Ok(attrs)
}

fn required<'a>(attrs: &'a Attributes, element: &str, key: &str) -> Result<&'a str> {
    attrs
        .get(key)
        .map(String::as_str)
        .ok_or_else(|| Error::Tmf(format!("<{}> is missing attribute '{}'", element, key)))
}

fn parse_num<T: std::str::FromStr>(value: &str, element: &str, key: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| Error::Tmf(format!("<{}>: invalid {} '{}'", element, key, value)))
}

fn required_num<T: std::str::FromStr>(attrs: &Attributes, element: &str, key: &str) -> Result<T> {
    parse_num(required(attrs, element, key)?, element, key)
}

fn optional_num<T: std::str::FromStr>(attrs: &Attributes, element: &str, key: &str) -> Result<Option<T>> {
    attrs
        .get(key)
        .map(|v| parse_num(v, element, key))
        .transpose()
}

/// Streaming parser for the model part of a package.
struct TmfParser {
    model: Model,
    stack: Vec<State>,
    /// Depth inside an unknown element being skipped.
    skip_depth: usize,
    /// Every parsed object, in document order.
    objects: Vec<ModelObject>,
    /// 3MF resource id to index in `objects`.
    object_ids: HashMap<usize, usize>,
    current: Option<ObjectBuilder>,
    /// (group id, index in group) to material id.
    material_ids: HashMap<(usize, usize), String>,
    material_group: Option<(usize, usize)>,
    metadata_name: Option<String>,
    text: String,
    items: Vec<(usize, ModelInstance)>,
}

impl TmfParser {
    fn new() -> Self {
        Self {
            model: Model::new(),
            stack: vec![State::Root],
            skip_depth: 0,
            objects: Vec::new(),
            object_ids: HashMap::new(),
            current: None,
            material_ids: HashMap::new(),
            material_group: None,
            metadata_name: None,
            text: String::new(),
            items: Vec::new(),
        }
    }

    fn state(&self) -> State {
        self.stack.last().copied().unwrap_or(State::Root)
    }

    fn current_object(&mut self, element: &str) -> Result<&mut ObjectBuilder> {
        self.current
            .as_mut()
            .ok_or_else(|| Error::Tmf(format!("<{}> outside of an object", element)))
    }

    fn object_index(&self, id: usize, element: &str) -> Result<usize> {
        self.object_ids
            .get(&id)
            .copied()
            .ok_or_else(|| Error::Tmf(format!("<{}> references unknown object {}", element, id)))
    }

    fn parse(mut self, xml: &str) -> Result<Model> {
        // text arrives in pieces split at entity references, so metadata
        // is trimmed once when its element closes
        let mut reader = Reader::from_str(xml);
        let mut buf = Vec::new();

        loop {
            match reader.read_event_into(&mut buf)? {
                Event::Start(ref e) => {
                    let name = std::str::from_utf8(e.name().as_ref())
                        .map_err(|e| Error::Tmf(e.to_string()))?
                        .to_string();
                    if self.skip_depth > 0 {
                        self.skip_depth += 1;
                    } else if let Some(next) = self.state().child(&name) {
                        self.start(next, e)?;
                        self.stack.push(next);
                    } else {
                        debug!("3MF: skipping <{}>", name);
                        self.skip_depth = 1;
                    }
                }
                Event::Empty(ref e) => {
                    if self.skip_depth == 0 {
                        let name = std::str::from_utf8(e.name().as_ref())
                            .map_err(|e| Error::Tmf(e.to_string()))?
                            .to_string();
                        if let Some(next) = self.state().child(&name) {
                            self.start(next, e)?;
                            self.end(next)?;
                        }
                    }
                }
                Event::End(_) => {
                    if self.skip_depth > 0 {
                        self.skip_depth -= 1;
                    } else if let Some(state) = self.stack.pop() {
                        self.end(state)?;
                    }
                }
                Event::Text(ref t) => {
                    if self.skip_depth == 0 && self.state() == State::Metadata {
                        self.text.push_str(&unescape(t)?);
                    }
                }
                Event::GeneralRef(ref r) => {
                    if self.skip_depth == 0 && self.state() == State::Metadata {
                        let name = std::str::from_utf8(r).map_err(|e| Error::Tmf(e.to_string()))?;
                        self.text.push_str(&unescape(format!("&{};", name).as_bytes())?);
                    }
                }
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }

        if self.stack.len() > 1 {
            return Err(Error::Tmf("unexpected end of model".into()));
        }
        self.finish()
    }

    fn start(&mut self, state: State, e: &BytesStart) -> Result<()> {
        let attrs = attributes(e)?;
        match state {
            State::Metadata => {
                self.metadata_name = Some(required(&attrs, "metadata", "name")?.to_string());
                self.text.clear();
            }
            State::BaseMaterials => {
                self.material_group = Some((required_num(&attrs, "basematerials", "id")?, 0));
            }
            State::Base => {
                let (group, index) = self
                    .material_group
                    .ok_or_else(|| Error::Tmf("<base> outside of <basematerials>".into()))?;
                let id = self.model.materials.len().to_string();
                let material = ModelMaterial {
                    attributes: attrs.into_iter().collect(),
                    config: ConfigMap::new(),
                };
                self.model.materials.insert(id.clone(), material);
                self.material_ids.insert((group, index), id);
                self.material_group = Some((group, index + 1));
            }
            State::VendorMaterial => {
                let pid: usize = required_num(&attrs, "slic3r:material", "pid")?;
                let pindex: usize = required_num(&attrs, "slic3r:material", "pindex")?;
                let key = required(&attrs, "slic3r:material", "type")?;
                let value = required(&attrs, "slic3r:material", "config")?;
                let material = self
                    .material_ids
                    .get(&(pid, pindex))
                    .and_then(|id| self.model.materials.get_mut(id))
                    .ok_or_else(|| Error::Tmf(format!("unknown material {}:{}", pid, pindex)))?;
                material.config.insert(key.to_string(), value.to_string());
            }
            State::Object => {
                let id = required_num(&attrs, "object", "id")?;
                let pid = optional_num(&attrs, "object", "pid")?;
                let pindex = optional_num(&attrs, "object", "pindex")?;
                self.current = Some(ObjectBuilder {
                    id,
                    name: attrs.get("name").cloned().unwrap_or_default(),
                    property: pid.map(|pid| (pid, pindex.unwrap_or(0))),
                    ..Default::default()
                });
            }
            State::VendorObject => {
                let key = required(&attrs, "slic3r:object", "type")?.to_string();
                let value = required(&attrs, "slic3r:object", "config")?.to_string();
                self.current_object("slic3r:object")?.config.insert(key, value);
            }
            State::Vertex => {
                let x = required_num(&attrs, "vertex", "x")?;
                let y = required_num(&attrs, "vertex", "y")?;
                let z = required_num(&attrs, "vertex", "z")?;
                self.current_object("vertex")?.mesh.vertices.push([x, y, z]);
            }
            State::Triangle => {
                let v1: u32 = required_num(&attrs, "triangle", "v1")?;
                let v2: u32 = required_num(&attrs, "triangle", "v2")?;
                let v3: u32 = required_num(&attrs, "triangle", "v3")?;
                let pid: Option<usize> = optional_num(&attrs, "triangle", "pid")?;
                let p1: Option<usize> = optional_num(&attrs, "triangle", "p1")?;
                let object = self.current_object("triangle")?;
                let n = object.mesh.vertices.len() as u32;
                if v1 >= n || v2 >= n || v3 >= n {
                    return Err(Error::Tmf(format!(
                        "object {}: triangle ({}, {}, {}) references a vertex out of {}",
                        object.id, v1, v2, v3, n
                    )));
                }
                let property = match pid {
                    Some(pid) => Some((pid, p1.or(object.property.map(|p| p.1)).unwrap_or(0))),
                    None => None,
                };
                object.mesh.facets.push([v1, v2, v3]);
                object.triangle_properties.push(property);
            }
            State::VendorVolume => {
                let start = required_num(&attrs, "slic3r:volume", "ts")?;
                let end = required_num(&attrs, "slic3r:volume", "te")?;
                let modifier = attrs.get("modifier").is_some_and(|v| v == "1");
                self.current_object("slic3r:volume")?.ranges.push(VolumeRange {
                    start,
                    end,
                    modifier,
                    config: ConfigMap::new(),
                });
            }
            State::VendorMetadata => {
                let key = required(&attrs, "slic3r:metadata", "type")?.to_string();
                let value = required(&attrs, "slic3r:metadata", "config")?.to_string();
                if let Some(range) = self.current_object("slic3r:metadata")?.ranges.last_mut() {
                    range.config.insert(key, value);
                }
            }
            State::Component => {
                let id = required_num(&attrs, "component", "objectid")?;
                let index = self.object_index(id, "component")?;
                let source = &self.objects[index];
                let mut volume = ModelVolume::new(source.mesh());
                volume.name = source.name.clone();
                volume.material_id = source.volumes.first().and_then(|v| v.material_id.clone());
                if let Some(transform) = attrs.get("transform") {
                    volume.mesh.transform(&from_tmf(&parse_transform(transform)?));
                }
                self.current_object("component")?.components.push(volume);
            }
            State::Item => {
                let id = required_num(&attrs, "item", "objectid")?;
                let index = self.object_index(id, "item")?;
                let instance = match attrs.get("transform") {
                    Some(transform) => decompose(&parse_transform(transform)?),
                    None => ModelInstance::default(),
                };
                self.items.push((index, instance));
            }
            _ => {}
        }
        Ok(())
    }

    fn end(&mut self, state: State) -> Result<()> {
        match state {
            State::Metadata => {
                if let Some(name) = self.metadata_name.take() {
                    let value = std::mem::take(&mut self.text);
                    self.model.metadata.insert(name, value.trim().to_string());
                }
            }
            State::BaseMaterials => self.material_group = None,
            State::Object => {
                let builder = self
                    .current
                    .take()
                    .ok_or_else(|| Error::Tmf("unbalanced </object>".into()))?;
                let id = builder.id;
                if self.object_ids.contains_key(&id) {
                    return Err(Error::Tmf(format!("duplicate object id {}", id)));
                }
                let object = self.build_object(builder)?;
                self.object_ids.insert(id, self.objects.len());
                self.objects.push(object);
            }
            _ => {}
        }
        Ok(())
    }

    fn material_of(&self, property: Option<(usize, usize)>) -> Option<String> {
        property.and_then(|p| self.material_ids.get(&p).cloned())
    }

    fn build_object(&self, builder: ObjectBuilder) -> Result<ModelObject> {
        let mut object = ModelObject::new(&builder.name);
        object.config = builder.config;
        let facet_count = builder.mesh.facets.len();
        let property_at = |i: usize| {
            builder
                .triangle_properties
                .get(i)
                .copied()
                .flatten()
                .or(builder.property)
        };

        if builder.ranges.is_empty() {
            if !builder.mesh.is_empty() {
                let mut volume = ModelVolume::new(builder.mesh.clone());
                volume.material_id = self.material_of(property_at(0));
                object.add_volume(volume);
            }
        } else {
            let mut covered = vec![false; facet_count];
            for range in builder.ranges {
                if range.start > range.end || range.end >= facet_count {
                    return Err(Error::Tmf(format!(
                        "object {}: volume range {}..{} out of {} triangles",
                        builder.id, range.start, range.end, facet_count
                    )));
                }
                covered[range.start..=range.end].fill(true);
                let mut volume = ModelVolume::new(builder.mesh.subset(range.start..=range.end));
                volume.modifier = range.modifier;
                volume.config = range.config;
                volume.material_id = self.material_of(property_at(range.start));
                object.add_volume(volume);
            }
            let rest: Vec<usize> = (0..facet_count).filter(|&i| !covered[i]).collect();
            if let Some(&first) = rest.first() {
                let mut volume = ModelVolume::new(builder.mesh.subset(rest));
                volume.material_id = self.material_of(property_at(first));
                object.add_volume(volume);
            }
        }

        for volume in builder.components {
            object.add_volume(volume);
        }
        Ok(object)
    }

    fn finish(self) -> Result<Model> {
        let TmfParser {
            mut model,
            objects,
            items,
            ..
        } = self;

        let mut placed: Vec<Option<ModelObject>> = objects.into_iter().map(Some).collect();
        let mut instances: Vec<Vec<ModelInstance>> = vec![Vec::new(); placed.len()];
        for (index, instance) in items {
            instances[index].push(instance);
        }
        for (slot, instances) in placed.iter_mut().zip(instances) {
            // objects no item refers to are only building blocks
            if instances.is_empty() {
                *slot = None;
            } else if let Some(object) = slot {
                object.instances = instances;
            }
        }
        model.objects = placed.into_iter().flatten().collect();
        Ok(model)
    }
}

/// Parse the XML of a `3D/3dmodel.model` part.
pub fn read_model_xml(xml: &str) -> Result<Model> {
    TmfParser::new().parse(xml)
}

/// Read a 3MF package.
pub fn read_tmf<R: Read + Seek>(reader: R) -> Result<Model> {
    let mut archive = ZipArchive::new(reader)?;
    let mut xml = String::new();
    archive.by_name(MODEL_PATH)?.read_to_string(&mut xml)?;

    let model = read_model_xml(&xml)?;
    info!(
        "3MF: read {} objects, {} materials, {} metadata entries",
        model.objects.len(),
        model.materials.len(),
        model.metadata.len()
    );
    Ok(model)
}

pub fn read_tmf_file<P: AsRef<Path>>(path: P) -> Result<Model> {
    let file = File::open(path.as_ref())?;
    read_tmf(BufReader::new(file))
}
