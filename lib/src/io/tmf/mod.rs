//! 3MF packages.
//!
//! A package is a zip archive holding `[Content_Types].xml`, `_rels/.rels`
//! and the model part `3D/3dmodel.model`. Object and volume settings travel
//! in elements of the vendor namespace.

mod reader;
pub mod transform;
mod writer;

pub use reader::{read_model_xml, read_tmf, read_tmf_file};
pub use writer::{write_model_xml, write_tmf, write_tmf_file};

pub const CORE_NAMESPACE: &str = "http://schemas.microsoft.com/3dmanufacturing/core/2015/02";
pub const VENDOR_NAMESPACE: &str = "http://link_to_Slic3r_schema.com/2017/06";

/// Path of the model part inside the archive.
pub const MODEL_PATH: &str = "3D/3dmodel.model";

const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
  <Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
  <Default Extension="model" ContentType="application/vnd.ms-package.3dmanufacturing-3dmodel+xml"/>
</Types>
"#;

const RELS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
  <Relationship Id="rel0" Target="/3D/3dmodel.model" Type="http://schemas.microsoft.com/3dmanufacturing/2013/01/3dmodel"/>
</Relationships>
"#;
