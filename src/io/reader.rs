//! Model file reader
//!
//! # Usage
//!
//! ```rust,ignore
//! use skpdoc::io::ModelReader;
//!
//! let model = ModelReader::from_file("house.skpdoc")?.read()?;
//! ```
//!
//! The read pipeline is:
//!
//! 1. Parse the fixed header and check the signature and format tag.
//! 2. Check the body length and CRC, then inflate compressed bodies.
//! 3. Decode each section into PID-linked records.
//! 4. Rebuild the model with [`ModelBuilder`].

use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use flate2::read::ZlibDecoder;
use flate2::Crc;
use nom::bytes::complete::tag;
use nom::number::complete::{le_u16, le_u32};
use nom::sequence::tuple;
use nom::IResult;
use tracing::{debug, info};

use super::builder::{ElementRecord, MaterialRecord, ModelBuilder, ModelRecords};
use super::constants::{flags, sections, SIGNATURE};
use super::strategy::VersionStrategy;
use super::stream::StreamReader;
use crate::entities::{
    ComponentDefinition, ComponentInstance, DefinitionKind, DrawingCommon, Edge, EntityCommon,
    EntityKind, EntityType, Face, Font, Image, Layer, Material, Scene, SceneFlags, Texture,
};
use crate::error::{ModelError, Result};
use crate::model::Model;
use crate::notification::{NotificationCollection, NotificationType};
use crate::settings::{
    ArrowType, Camera, DimensionStyle, LengthFormat, LineStyles, ModelSettings, OptionsProvider,
    RenderingFlags,
};
use crate::types::{FileVersion, ModelVersion, Units};

/// Options for reading model files
#[derive(Debug, Clone, Copy, Default)]
pub struct ReaderConfiguration {
    /// Repair dangling references to fallbacks, with a notification, instead
    /// of failing with `ModelInvalid`. Duplicate PIDs always fail.
    pub failsafe: bool,
    /// Treat duplicate scene names as `ModelInvalid` rather than a warning
    pub enforce_unique_scene_names: bool,
}

/// Fixed-size file header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FileHeader {
    format_tag: u16,
    writer: FileVersion,
    flags: u16,
    body_len: u32,
    crc: u32,
}

fn parse_header(input: &[u8]) -> IResult<&[u8], FileHeader> {
    let (input, _) = tag(&SIGNATURE[..])(input)?;
    let (input, (format_tag, major, minor, build, flags, body_len, crc)) =
        tuple((le_u16, le_u16, le_u16, le_u32, le_u16, le_u32, le_u32))(input)?;
    Ok((
        input,
        FileHeader {
            format_tag,
            writer: FileVersion::new(major, minor, build),
            flags,
            body_len,
            crc,
        },
    ))
}

fn header_error(e: nom::Err<nom::error::Error<&[u8]>>) -> ModelError {
    match e {
        nom::Err::Error(err) | nom::Err::Failure(err)
            if err.code == nom::error::ErrorKind::Tag =>
        {
            ModelError::ModelInvalid("missing model file signature".to_string())
        }
        _ => ModelError::Serialization("truncated file header".to_string()),
    }
}

/// Reads a model from its binary container
pub struct ModelReader {
    bytes: Vec<u8>,
    config: ReaderConfiguration,
    path: Option<PathBuf>,
}

impl ModelReader {
    /// Read a whole file into memory
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let bytes = fs::read(path)?;
        Ok(Self {
            bytes,
            config: ReaderConfiguration::default(),
            path: Some(path.to_path_buf()),
        })
    }

    /// Drain any byte stream
    pub fn from_reader<R: Read>(mut reader: R) -> Result<Self> {
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes)?;
        Ok(Self::from_bytes(bytes))
    }

    /// Wrap an in-memory file image
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self {
            bytes,
            config: ReaderConfiguration::default(),
            path: None,
        }
    }

    /// Use a custom configuration
    pub fn with_config(mut self, config: ReaderConfiguration) -> Self {
        self.config = config;
        self
    }

    /// Decode the whole model
    pub fn read(self) -> Result<Model> {
        let (rest, header) = parse_header(&self.bytes).map_err(header_error)?;
        let version = ModelVersion::from_tag(header.format_tag).ok_or_else(|| {
            ModelError::ModelVersion(format!("unknown format tag {}", header.format_tag))
        })?;
        let strategy = VersionStrategy::for_version(version);
        debug!(%version, writer = %header.writer, flags = header.flags, "read header");

        let body_len = header.body_len as usize;
        if rest.len() < body_len {
            return Err(ModelError::Serialization(format!(
                "body is {} bytes, header announces {body_len}",
                rest.len()
            )));
        }
        if rest.len() > body_len {
            return Err(ModelError::ModelInvalid(format!(
                "{} bytes after the end of the body",
                rest.len() - body_len
            )));
        }

        let mut crc = Crc::new();
        crc.update(rest);
        if crc.sum() != header.crc {
            return Err(ModelError::ModelInvalid(format!(
                "body CRC {:08x} does not match header CRC {:08x}",
                crc.sum(),
                header.crc
            )));
        }

        let body = if header.flags & flags::COMPRESSED != 0 {
            let mut inflated = Vec::new();
            ZlibDecoder::new(rest)
                .read_to_end(&mut inflated)
                .map_err(|e| ModelError::Serialization(format!("cannot inflate body: {e}")))?;
            inflated
        } else {
            rest.to_vec()
        };

        let mut decoder = SectionDecoder {
            strategy,
            notifications: NotificationCollection::new(),
        };
        let records = decoder.decode(&body)?;

        let mut model = ModelBuilder::new(self.config, decoder.notifications)
            .build(records, header.writer)?;
        model.path = self.path;

        info!(
            %version,
            entities = model.registry.len(),
            notifications = model.notifications.len(),
            "loaded model"
        );
        Ok(model)
    }
}

/// Decodes the section sequence of one body
struct SectionDecoder {
    strategy: &'static VersionStrategy,
    notifications: NotificationCollection,
}

impl SectionDecoder {
    fn decode(&mut self, body: &[u8]) -> Result<ModelRecords> {
        let encoding = self.strategy.encoding();
        let mut records = ModelRecords::default();
        let mut stream = StreamReader::new(body, encoding);

        loop {
            if stream.remaining() == 0 {
                return Err(ModelError::Serialization(
                    "body ends without an END section".to_string(),
                ));
            }
            let tag = stream.read_u16()?;
            let len = stream.read_len()?;
            let data = stream.read_bytes(len)?;
            if tag == sections::END {
                break;
            }

            let Some(name) = sections::name(tag) else {
                self.notifications.notify(
                    NotificationType::NotImplemented,
                    format!("skipped unknown section 0x{tag:04x} ({len} bytes)"),
                );
                continue;
            };
            debug!(section = name, bytes = len, "decoding section");

            let mut s = StreamReader::new(data, encoding);
            match tag {
                sections::META => self.read_meta(&mut s, &mut records)?,
                sections::SETTINGS => records.settings = self.read_settings(&mut s)?,
                sections::ATTRIBUTES => records.attributes = s.read_attributes()?,
                sections::MATERIALS => records.materials = read_materials(&mut s)?,
                sections::LAYERS => self.read_layers(&mut s, &mut records)?,
                sections::FONTS => records.fonts = read_fonts(&mut s)?,
                sections::DEFINITIONS => records.definitions = read_definitions(&mut s)?,
                sections::ENTITIES => records.elements = read_elements(&mut s)?,
                sections::SCENES => self.read_scenes(&mut s, &mut records)?,
                _ => {}
            }
            if s.remaining() > 0 {
                self.notifications.notify(
                    NotificationType::Warning,
                    format!("ignored {} trailing bytes in section {name}", s.remaining()),
                );
            }
        }

        if stream.remaining() > 0 {
            return Err(ModelError::ModelInvalid(format!(
                "{} bytes after the END section",
                stream.remaining()
            )));
        }
        Ok(records)
    }

    fn read_meta(&self, s: &mut StreamReader, records: &mut ModelRecords) -> Result<()> {
        records.name = s.read_string()?;
        records.description = s.read_string()?;
        let units = s.read_u8()?;
        records.units = Units::from_u8(units)
            .ok_or_else(|| ModelError::ModelInvalid(format!("unknown units {units}")))?;
        let guid = s.read_bytes(16)?;
        records.guid = uuid::Uuid::from_slice(guid)
            .map_err(|e| ModelError::ModelInvalid(format!("bad model GUID: {e}")))?;
        Ok(())
    }

    fn read_settings(&self, s: &mut StreamReader) -> Result<ModelSettings> {
        let mut settings = ModelSettings::default();
        settings.camera = read_camera(s)?;

        settings.axes.origin = s.read_point()?;
        settings.axes.x_axis = s.read_vector()?;
        settings.axes.y_axis = s.read_vector()?;
        settings.axes.z_axis = s.read_vector()?;

        let styles = s.read_len()?;
        for _ in 0..styles {
            settings.styles.add(s.read_string()?);
        }
        let active_style = s.read_string()?;
        settings
            .styles
            .set_active(&active_style)
            .map_err(|_| ModelError::ModelInvalid(format!("unknown active style '{active_style}'")))?;

        let rendering = &mut settings.rendering_options;
        rendering.flags = RenderingFlags::from_bits_retain(s.read_u32()?);
        rendering.background_color = s.read_color()?;
        rendering.edge_color = s.read_color()?;

        let shadow = &mut settings.shadow_info;
        shadow.display_shadows = s.read_bool()?;
        shadow.shadow_time = s.read_i64()?;
        shadow.light = s.read_u8()?;
        shadow.dark = s.read_u8()?;
        shadow.use_sun_for_shading = s.read_bool()?;

        let providers = s.read_len()?;
        for _ in 0..providers {
            let name = s.read_string()?;
            let entries = s.read_len()?;
            let mut provider = OptionsProvider::with_capacity(entries);
            for _ in 0..entries {
                let key = s.read_string()?;
                provider.insert(key, s.read_value()?);
            }
            settings.options_manager.insert_provider(name, provider);
        }

        if self.strategy.classifications {
            let schemas = s.read_len()?;
            for _ in 0..schemas {
                settings.classifications.load_schema(s.read_string()?);
            }
        }

        let formatter = &mut settings.length_formatter;
        let format = s.read_u8()?;
        formatter.format = LengthFormat::from_u8(format)
            .ok_or_else(|| ModelError::ModelInvalid(format!("unknown length format {format}")))?;
        let units = s.read_u8()?;
        formatter.units = Units::from_u8(units)
            .ok_or_else(|| ModelError::ModelInvalid(format!("unknown units {units}")))?;
        formatter.precision = s.read_u8()?;
        formatter.suppress_units = s.read_bool()?;

        let font_face = s.read_string()?;
        let text_height = s.read_f64()?;
        let arrow = s.read_u8()?;
        settings.dimension_style = DimensionStyle {
            font_face,
            text_height,
            arrow_type: ArrowType::from_u8(arrow)
                .ok_or_else(|| ModelError::ModelInvalid(format!("unknown arrow type {arrow}")))?,
            show_radial_prefix: s.read_bool()?,
            hide_out_of_plane: s.read_bool()?,
        };

        let line_styles = s.read_len()?;
        let names = (0..line_styles)
            .map(|_| s.read_string())
            .collect::<Result<Vec<_>>>()?;
        settings.line_styles = LineStyles::from_names(names);

        if s.read_bool()? {
            let latitude = s.read_f64()?;
            let longitude = s.read_f64()?;
            let altitude = s.read_f64()?;
            let z_value_centered = s.read_bool()?;
            let on_ocean_floor = s.read_bool()?;
            settings
                .location
                .set_geo_reference(latitude, longitude, altitude, z_value_centered, on_ocean_floor)
                .map_err(|e| ModelError::ModelInvalid(format!("bad georeference: {e}")))?;
        }
        settings.location.north_angle = s.read_f64()?;
        Ok(settings)
    }

    fn read_layers(&self, s: &mut StreamReader, records: &mut ModelRecords) -> Result<()> {
        records.default_layer = s.read_pid()?;
        if self.strategy.active_layer {
            records.active_layer = s.read_opt_pid()?;
        }
        let count = s.read_len()?;
        let mut layers = Vec::with_capacity(count);
        for _ in 0..count {
            let pid = s.read_pid()?;
            let mut layer = Layer::new(s.read_string()?);
            layer.visible = s.read_bool()?;
            layer.color = s.read_color()?;
            layer.layer_material = s.read_opt_pid()?;
            layer.line_style = s.read_opt_string()?;
            layer.common = EntityCommon {
                pid,
                attributes: s.read_attributes()?,
            };
            layers.push(layer);
        }
        records.layers = layers;
        Ok(())
    }

    fn read_scenes(&self, s: &mut StreamReader, records: &mut ModelRecords) -> Result<()> {
        records.active_scene = s.read_opt_pid()?;
        let count = s.read_len()?;
        let mut scenes = Vec::with_capacity(count);
        for _ in 0..count {
            let pid = s.read_pid()?;
            let mut scene = Scene::new(s.read_string()?);
            scene.description = s.read_string()?;
            scene.camera = read_camera(s)?;
            scene.flags = SceneFlags::from_bits_retain(s.read_u32()?);
            let overrides = s.read_len()?;
            for _ in 0..overrides {
                let layer = s.read_pid()?;
                scene.layer_visibility.insert(layer, s.read_bool()?);
            }
            scene.style = s.read_opt_string()?;
            if self.strategy.match_photo_scenes {
                scene.photo_image = s.read_opt_string()?;
            }
            scene.common = EntityCommon {
                pid,
                attributes: s.read_attributes()?,
            };
            scenes.push(scene);
        }
        records.scenes = scenes;
        Ok(())
    }
}

fn read_camera(s: &mut StreamReader) -> Result<Camera> {
    Ok(Camera {
        eye: s.read_point()?,
        target: s.read_point()?,
        up: s.read_vector()?,
        perspective: s.read_bool()?,
        field_of_view: s.read_f64()?,
        ortho_height: s.read_f64()?,
    })
}

fn read_materials(s: &mut StreamReader) -> Result<Vec<MaterialRecord>> {
    let count = s.read_len()?;
    let mut materials = Vec::with_capacity(count);
    for _ in 0..count {
        let pid = s.read_pid()?;
        let owner = s.read_pid()?;
        let mut material = Material::new(s.read_string()?);
        material.color = s.read_color()?;
        material.opacity = s.read_f64()?;
        if s.read_bool()? {
            material.texture = Some(Texture {
                file_name: s.read_string()?,
                width: s.read_f64()?,
                height: s.read_f64()?,
            });
        }
        material.common = EntityCommon {
            pid,
            attributes: s.read_attributes()?,
        };
        materials.push(MaterialRecord { material, owner });
    }
    Ok(materials)
}

fn read_fonts(s: &mut StreamReader) -> Result<Vec<Font>> {
    let count = s.read_len()?;
    let mut fonts = Vec::with_capacity(count);
    for _ in 0..count {
        let pid = s.read_pid()?;
        let face_name = s.read_string()?;
        let bold = s.read_bool()?;
        let italic = s.read_bool()?;
        let mut font = Font::new(face_name, bold, italic);
        font.common = EntityCommon {
            pid,
            attributes: s.read_attributes()?,
        };
        fonts.push(font);
    }
    Ok(fonts)
}

fn read_definitions(s: &mut StreamReader) -> Result<Vec<ComponentDefinition>> {
    let count = s.read_len()?;
    let mut definitions = Vec::with_capacity(count);
    for _ in 0..count {
        let pid = s.read_pid()?;
        let name = s.read_string()?;
        let description = s.read_string()?;
        let kind = s.read_u8()?;
        let kind = DefinitionKind::from_u8(kind)
            .ok_or_else(|| ModelError::ModelInvalid(format!("unknown definition kind {kind}")))?;
        let mut def = ComponentDefinition::new(name, kind);
        def.description = description;
        def.insertion_point = s.read_point()?;
        def.always_face_camera = s.read_bool()?;
        def.common = EntityCommon {
            pid,
            attributes: s.read_attributes()?,
        };
        definitions.push(def);
    }
    Ok(definitions)
}

fn read_drawing(s: &mut StreamReader) -> Result<DrawingCommon> {
    Ok(DrawingCommon {
        layer: s.read_pid()?,
        material: s.read_opt_pid()?,
        hidden: s.read_bool()?,
        casts_shadows: s.read_bool()?,
        receives_shadows: s.read_bool()?,
    })
}

fn read_elements(s: &mut StreamReader) -> Result<Vec<ElementRecord>> {
    let count = s.read_len()?;
    let mut elements = Vec::with_capacity(count);
    for _ in 0..count {
        let container = s.read_i64()?;
        let kind = s.read_u8()?;
        let kind = EntityKind::from_u8(kind)
            .filter(EntityKind::is_drawing_element)
            .ok_or_else(|| ModelError::ModelInvalid(format!("unknown element kind {kind}")))?;
        let pid = s.read_pid()?;
        let drawing = read_drawing(s)?;
        let common = EntityCommon {
            pid,
            attributes: s.read_attributes()?,
        };

        let mut entity = match kind {
            EntityKind::Edge => {
                let mut edge = Edge::new(s.read_point()?, s.read_point()?);
                edge.soft = s.read_bool()?;
                edge.smooth = s.read_bool()?;
                EntityType::Edge(edge)
            }
            EntityKind::Face => {
                let mut face = Face::new(s.read_points()?);
                let holes = s.read_len()?;
                for _ in 0..holes {
                    face.inner_loops.push(s.read_points()?);
                }
                face.back_material = s.read_opt_pid()?;
                EntityType::Face(face)
            }
            EntityKind::ComponentInstance | EntityKind::Group => {
                let definition = s.read_pid()?;
                let mut inst = ComponentInstance::new(definition)
                    .with_name(s.read_string()?)
                    .with_transform(s.read_transform()?);
                inst.locked = s.read_bool()?;
                if kind == EntityKind::Group {
                    EntityType::Group(inst)
                } else {
                    EntityType::ComponentInstance(inst)
                }
            }
            EntityKind::Image => {
                let definition = s.read_pid()?;
                let file_name = s.read_string()?;
                let width = s.read_f64()?;
                let height = s.read_f64()?;
                let mut image = Image::new(definition, file_name, width, height);
                image.transform = s.read_transform()?;
                image.image_material = s.read_opt_pid()?;
                EntityType::Image(image)
            }
            other => {
                return Err(ModelError::ModelInvalid(format!(
                    "{other} cannot be placed in a container"
                )))
            }
        };

        *entity.common_mut() = common;
        if let Some(d) = entity.drawing_mut() {
            *d = drawing;
        }
        elements.push(ElementRecord { container, entity });
    }
    Ok(elements)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::io::constants::HEADER_SIZE;

    fn saved() -> Vec<u8> {
        let mut model = Model::new();
        model.set_name("Shed");
        model.to_bytes(ModelVersion::CURRENT).unwrap()
    }

    #[test]
    fn test_garbage_is_invalid() {
        let err = ModelReader::from_bytes(b"not a model at all, just text".to_vec())
            .read()
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ModelInvalid);
    }

    #[test]
    fn test_truncated_header_is_serialization_error() {
        let bytes = saved();
        let err = ModelReader::from_bytes(bytes[..12].to_vec()).read().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Serialization);
    }

    #[test]
    fn test_unknown_format_tag() {
        let mut bytes = saved();
        bytes[8..10].copy_from_slice(&99u16.to_le_bytes());
        let err = ModelReader::from_bytes(bytes).read().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ModelVersion);
    }

    #[test]
    fn test_corrupted_body_fails_crc() {
        let mut bytes = saved();
        let last = bytes.len() - 1;
        bytes[last] ^= 0xFF;
        let err = ModelReader::from_bytes(bytes).read().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ModelInvalid);
    }

    #[test]
    fn test_truncated_body() {
        let bytes = saved();
        let err = ModelReader::from_bytes(bytes[..bytes.len() - 4].to_vec())
            .read()
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Serialization);
    }

    #[test]
    fn test_reads_back_metadata() {
        let model = ModelReader::from_bytes(saved()).read().unwrap();
        assert_eq!(model.name(), "Shed");
        assert_eq!(model.num_layers(), 1);
        assert!(model.path().is_none());
        assert!(model.notifications.is_empty());
    }

    #[test]
    fn test_header_parser() {
        let bytes = saved();
        let (rest, header) = parse_header(&bytes).unwrap();
        assert_eq!(header.format_tag, ModelVersion::CURRENT.tag());
        assert_eq!(bytes.len() - rest.len(), HEADER_SIZE);
        assert_eq!(header.body_len as usize, rest.len());
    }
}
