//! Model file writer
//!
//! The whole file is encoded in memory first; nothing reaches the
//! destination unless encoding succeeded. Files are written to a sibling
//! temporary file and renamed over the destination. A successful write
//! gives the model a new GUID.

use std::io::{BufWriter, Write};
use std::path::Path;

use flate2::write::ZlibEncoder;
use flate2::{Compression, Crc};
use tempfile::NamedTempFile;
use tracing::{debug, info};
use uuid::Uuid;

use super::constants::{flags, sections, HEADER_SIZE, ROOT_CONTAINER, SIGNATURE, WRITER_VERSION};
use super::strategy::VersionStrategy;
use super::stream::StreamWriter;
use crate::collections::CollectionManager;
use crate::entities::{DrawingCommon, EntityType};
use crate::error::{ModelError, Result};
use crate::model::Model;
use crate::registry::Owner;
use crate::scene_graph::{ContainerId, Entities};
use crate::settings::ModelSettings;
use crate::types::{ModelVersion, PersistentId};

/// Options for writing model files
#[derive(Debug, Clone, Copy)]
pub struct WriterConfiguration {
    /// Target format version
    pub version: ModelVersion,
    /// zlib level 0-9, used by versions that compress
    pub compression_level: u32,
}

impl Default for WriterConfiguration {
    fn default() -> Self {
        Self {
            version: ModelVersion::CURRENT,
            compression_level: 6,
        }
    }
}

/// Writes a model in the binary container format
pub struct ModelWriter<'a> {
    model: &'a mut Model,
    config: WriterConfiguration,
}

impl<'a> ModelWriter<'a> {
    /// Create a new model writer
    pub fn new(model: &'a mut Model) -> Self {
        Self {
            model,
            config: WriterConfiguration::default(),
        }
    }

    /// Use a custom configuration
    pub fn with_config(mut self, config: WriterConfiguration) -> Self {
        self.config = config;
        self
    }

    /// Write to a file and remember it as the model's path.
    ///
    /// An existing file at `path` is only replaced once the new contents are
    /// completely on disk.
    pub fn write_to_file<P: AsRef<Path>>(mut self, path: P) -> Result<()> {
        let path = path.as_ref();
        let (bytes, guid) = self.encode()?;

        let dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let temp = NamedTempFile::new_in(dir)?;
        {
            let mut writer = BufWriter::new(temp.as_file());
            writer.write_all(&bytes)?;
            writer.flush()?;
        }
        temp.as_file().sync_all()?;
        temp.persist(path).map_err(|e| e.error)?;

        self.commit(guid);
        self.model.path = Some(path.to_path_buf());
        info!(
            path = %path.display(),
            version = %self.config.version,
            bytes = bytes.len(),
            "saved model"
        );
        Ok(())
    }

    /// Write to any byte sink
    pub fn write_to_writer<W: Write>(mut self, mut writer: W) -> Result<()> {
        let (bytes, guid) = self.encode()?;
        writer.write_all(&bytes)?;
        writer.flush()?;
        self.commit(guid);
        Ok(())
    }

    /// Write to a byte vector
    pub fn write_to_vec(mut self) -> Result<Vec<u8>> {
        let (bytes, guid) = self.encode()?;
        self.commit(guid);
        Ok(bytes)
    }

    fn commit(&mut self, guid: Uuid) {
        self.model.guid = guid;
        self.model.version = WRITER_VERSION;
    }

    /// Encode the complete file image under a fresh GUID
    fn encode(&self) -> Result<(Vec<u8>, Uuid)> {
        let strategy = VersionStrategy::for_version(self.config.version);
        strategy.check_model(self.model)?;

        let guid = Uuid::new_v4();
        let body = BodyEncoder {
            model: self.model,
            strategy,
        }
        .encode(guid)?;
        let raw_len = body.len();

        let (stored, header_flags) = if strategy.compressed_body {
            let level = Compression::new(self.config.compression_level.min(9));
            let mut encoder = ZlibEncoder::new(Vec::new(), level);
            encoder.write_all(&body)?;
            (encoder.finish()?, flags::COMPRESSED)
        } else {
            (body, 0)
        };

        let mut crc = Crc::new();
        crc.update(&stored);
        let body_len = u32::try_from(stored.len())
            .map_err(|_| ModelError::Serialization("model body exceeds 4 GiB".to_string()))?;

        let mut out = Vec::with_capacity(HEADER_SIZE + stored.len());
        out.extend_from_slice(SIGNATURE);
        out.extend_from_slice(&strategy.version.tag().to_le_bytes());
        out.extend_from_slice(&WRITER_VERSION.major.to_le_bytes());
        out.extend_from_slice(&WRITER_VERSION.minor.to_le_bytes());
        out.extend_from_slice(&WRITER_VERSION.build.to_le_bytes());
        out.extend_from_slice(&header_flags.to_le_bytes());
        out.extend_from_slice(&body_len.to_le_bytes());
        out.extend_from_slice(&crc.sum().to_le_bytes());
        out.extend_from_slice(&stored);

        debug!(
            version = %strategy.version,
            body = raw_len,
            stored = stored.len(),
            "encoded model"
        );
        Ok((out, guid))
    }
}

/// Encodes the section sequence of one model
struct BodyEncoder<'a> {
    model: &'a Model,
    strategy: &'static VersionStrategy,
}

impl BodyEncoder<'_> {
    fn stream(&self) -> StreamWriter {
        StreamWriter::new(self.strategy.encoding())
    }

    fn encode(&self, guid: Uuid) -> Result<Vec<u8>> {
        let mut body = self.stream();
        self.section(&mut body, sections::META, |s| self.write_meta(s, guid))?;
        self.section(&mut body, sections::SETTINGS, |s| {
            self.write_settings(s, &self.model.settings)
        })?;
        self.section(&mut body, sections::ATTRIBUTES, |s| {
            s.write_attributes(&self.model.attributes)
        })?;
        self.section(&mut body, sections::MATERIALS, |s| self.write_materials(s))?;
        self.section(&mut body, sections::LAYERS, |s| self.write_layers(s))?;
        if self.strategy.fonts {
            self.section(&mut body, sections::FONTS, |s| self.write_fonts(s))?;
        }
        self.section(&mut body, sections::DEFINITIONS, |s| self.write_definitions(s))?;
        self.section(&mut body, sections::ENTITIES, |s| self.write_entities(s))?;
        self.section(&mut body, sections::SCENES, |s| self.write_scenes(s))?;
        self.section(&mut body, sections::END, |_| Ok(()))?;
        Ok(body.into_inner())
    }

    fn section(
        &self,
        body: &mut StreamWriter,
        tag: u16,
        content: impl FnOnce(&mut StreamWriter) -> Result<()>,
    ) -> Result<()> {
        let mut section = self.stream();
        content(&mut section)?;
        let bytes = section.into_inner();
        body.write_u16(tag);
        body.write_len(bytes.len())?;
        body.write_raw(&bytes);
        Ok(())
    }

    fn entity(&self, pid: PersistentId) -> Result<&EntityType> {
        self.model.registry.resolve(pid)
    }

    fn write_meta(&self, s: &mut StreamWriter, guid: Uuid) -> Result<()> {
        s.write_string(&self.model.name)?;
        s.write_string(&self.model.description)?;
        s.write_u8(self.model.units as u8);
        s.write_raw(guid.as_bytes());
        Ok(())
    }

    fn write_settings(&self, s: &mut StreamWriter, settings: &ModelSettings) -> Result<()> {
        let camera = &settings.camera;
        s.write_point(&camera.eye);
        s.write_point(&camera.target);
        s.write_vector(&camera.up);
        s.write_bool(camera.perspective);
        s.write_f64(camera.field_of_view);
        s.write_f64(camera.ortho_height);

        let axes = &settings.axes;
        s.write_point(&axes.origin);
        s.write_vector(&axes.x_axis);
        s.write_vector(&axes.y_axis);
        s.write_vector(&axes.z_axis);

        s.write_len(settings.styles.len())?;
        for name in settings.styles.names() {
            s.write_string(name)?;
        }
        s.write_string(settings.styles.active())?;

        let rendering = &settings.rendering_options;
        s.write_u32(rendering.flags.bits());
        s.write_color(rendering.background_color);
        s.write_color(rendering.edge_color);

        let shadow = &settings.shadow_info;
        s.write_bool(shadow.display_shadows);
        s.write_i64(shadow.shadow_time);
        s.write_u8(shadow.light);
        s.write_u8(shadow.dark);
        s.write_bool(shadow.use_sun_for_shading);

        let providers: Vec<_> = settings.options_manager.iter().collect();
        s.write_len(providers.len())?;
        for (name, provider) in providers {
            s.write_string(name)?;
            s.write_len(provider.len())?;
            for (key, value) in provider {
                s.write_string(key)?;
                s.write_value(value)?;
            }
        }

        if self.strategy.classifications {
            s.write_len(settings.classifications.len())?;
            for schema in settings.classifications.schemas() {
                s.write_string(schema)?;
            }
        }

        let formatter = &settings.length_formatter;
        s.write_u8(formatter.format as u8);
        s.write_u8(formatter.units as u8);
        s.write_u8(formatter.precision);
        s.write_bool(formatter.suppress_units);

        let dimensions = &settings.dimension_style;
        s.write_string(&dimensions.font_face)?;
        s.write_f64(dimensions.text_height);
        s.write_u8(dimensions.arrow_type as u8);
        s.write_bool(dimensions.show_radial_prefix);
        s.write_bool(dimensions.hide_out_of_plane);

        s.write_len(settings.line_styles.len())?;
        for name in settings.line_styles.names() {
            s.write_string(name)?;
        }

        let location = &settings.location;
        let georeferenced = self.strategy.georeference && location.is_geo_referenced();
        s.write_bool(georeferenced);
        if georeferenced {
            s.write_f64(location.latitude);
            s.write_f64(location.longitude);
            s.write_f64(location.altitude);
            s.write_bool(location.z_value_centered);
            s.write_bool(location.on_ocean_floor);
        }
        s.write_f64(location.north_angle);
        Ok(())
    }

    /// Shared materials first, then private ones with their owner.
    ///
    /// Private materials of detached layers and images are not part of the
    /// document and are skipped along with their holder.
    fn write_materials(&self, s: &mut StreamWriter) -> Result<()> {
        let registry = &self.model.registry;
        let records: Vec<(PersistentId, PersistentId)> = self
            .model
            .materials
            .all(registry)
            .into_iter()
            .filter_map(|pid| match registry.owner(pid) {
                Some(Owner::Entity(holder)) => registry
                    .owner(holder)
                    .filter(|o| !o.is_detached())
                    .map(|_| (pid, holder)),
                _ => Some((pid, PersistentId::NULL)),
            })
            .collect();

        s.write_len(records.len())?;
        for (pid, owner) in records {
            let material = self
                .entity(pid)?
                .as_material()
                .ok_or_else(|| ModelError::Generic(format!("{pid} is not a material")))?;
            s.write_pid(pid);
            s.write_pid(owner);
            s.write_string(&material.name)?;
            s.write_color(material.color);
            s.write_f64(material.opacity);
            match &material.texture {
                Some(texture) => {
                    s.write_bool(true);
                    s.write_string(&texture.file_name)?;
                    s.write_f64(texture.width);
                    s.write_f64(texture.height);
                }
                None => s.write_bool(false),
            }
            s.write_attributes(&material.common.attributes)?;
        }
        Ok(())
    }

    fn write_layers(&self, s: &mut StreamWriter) -> Result<()> {
        let layers = &self.model.layers;
        s.write_pid(layers.default_layer());
        if self.strategy.active_layer {
            s.write_pid(layers.active_layer());
        }
        s.write_len(layers.count())?;
        for pid in layers.collection().iter() {
            let layer = self
                .entity(pid)?
                .as_layer()
                .ok_or_else(|| ModelError::Generic(format!("{pid} is not a layer")))?;
            s.write_pid(pid);
            s.write_string(&layer.name)?;
            s.write_bool(layer.visible);
            s.write_color(layer.color);
            s.write_opt_pid(layer.layer_material);
            s.write_opt_string(layer.line_style.as_deref())?;
            s.write_attributes(&layer.common.attributes)?;
        }
        Ok(())
    }

    fn write_fonts(&self, s: &mut StreamWriter) -> Result<()> {
        s.write_len(self.model.fonts.count())?;
        for pid in self.model.fonts.collection().iter() {
            let EntityType::Font(font) = self.entity(pid)? else {
                return Err(ModelError::Generic(format!("{pid} is not a font")));
            };
            s.write_pid(pid);
            s.write_string(&font.face_name)?;
            s.write_bool(font.bold);
            s.write_bool(font.italic);
            s.write_attributes(&font.common.attributes)?;
        }
        Ok(())
    }

    fn write_definitions(&self, s: &mut StreamWriter) -> Result<()> {
        s.write_len(self.model.definitions.count())?;
        for pid in self.model.definitions.collection().iter() {
            let def = self
                .entity(pid)?
                .as_definition()
                .ok_or_else(|| ModelError::Generic(format!("{pid} is not a definition")))?;
            s.write_pid(pid);
            s.write_string(&def.name)?;
            s.write_string(&def.description)?;
            s.write_u8(def.kind as u8);
            s.write_point(&def.insertion_point);
            s.write_bool(def.always_face_camera);
            s.write_attributes(&def.common.attributes)?;
        }
        Ok(())
    }

    /// Members of the root container, then of each definition
    fn write_entities(&self, s: &mut StreamWriter) -> Result<()> {
        let mut containers: Vec<(ContainerId, &Entities)> = vec![(ContainerId::Root, &self.model.root)];
        for def in self.model.definitions.collection().iter() {
            if let Some(d) = self.model.registry.get(def).and_then(EntityType::as_definition) {
                containers.push((ContainerId::Definition(def), &d.entities));
            }
        }

        let total: usize = containers.iter().map(|(_, c)| c.len()).sum();
        s.write_len(total)?;
        for (id, members) in containers {
            let container = match id {
                ContainerId::Root => ROOT_CONTAINER,
                ContainerId::Definition(def) => def.value(),
            };
            for pid in members.iter() {
                s.write_i64(container);
                self.write_element(s, pid)?;
            }
        }
        Ok(())
    }

    fn write_element(&self, s: &mut StreamWriter, pid: PersistentId) -> Result<()> {
        let entity = self.entity(pid)?;
        s.write_u8(entity.kind() as u8);
        s.write_pid(pid);
        if let Some(drawing) = entity.drawing() {
            write_drawing(s, drawing);
        }
        s.write_attributes(&entity.common().attributes)?;

        match entity {
            EntityType::Edge(edge) => {
                s.write_point(&edge.start);
                s.write_point(&edge.end);
                s.write_bool(edge.soft);
                s.write_bool(edge.smooth);
            }
            EntityType::Face(face) => {
                s.write_points(&face.outer_loop)?;
                s.write_len(face.inner_loops.len())?;
                for inner in &face.inner_loops {
                    s.write_points(inner)?;
                }
                s.write_opt_pid(face.back_material);
            }
            EntityType::ComponentInstance(inst) | EntityType::Group(inst) => {
                s.write_pid(inst.definition);
                s.write_string(&inst.name)?;
                s.write_transform(&inst.transform);
                s.write_bool(inst.locked);
            }
            EntityType::Image(image) => {
                s.write_pid(image.definition);
                s.write_string(&image.file_name)?;
                s.write_f64(image.width);
                s.write_f64(image.height);
                s.write_transform(&image.transform);
                s.write_opt_pid(image.image_material);
            }
            other => {
                return Err(ModelError::Generic(format!(
                    "{} {pid} cannot sit in a container",
                    other.kind()
                )))
            }
        }
        Ok(())
    }

    fn write_scenes(&self, s: &mut StreamWriter) -> Result<()> {
        s.write_opt_pid(self.model.scenes.active());
        s.write_len(self.model.scenes.count())?;
        for pid in self.model.scenes.collection().iter() {
            let scene = self
                .entity(pid)?
                .as_scene()
                .ok_or_else(|| ModelError::Generic(format!("{pid} is not a scene")))?;
            s.write_pid(pid);
            s.write_string(&scene.name)?;
            s.write_string(&scene.description)?;
            s.write_point(&scene.camera.eye);
            s.write_point(&scene.camera.target);
            s.write_vector(&scene.camera.up);
            s.write_bool(scene.camera.perspective);
            s.write_f64(scene.camera.field_of_view);
            s.write_f64(scene.camera.ortho_height);
            s.write_u32(scene.flags.bits());
            s.write_len(scene.layer_visibility.len())?;
            for (layer, visible) in &scene.layer_visibility {
                s.write_pid(*layer);
                s.write_bool(*visible);
            }
            s.write_opt_string(scene.style.as_deref())?;
            if self.strategy.match_photo_scenes {
                s.write_opt_string(scene.photo_image.as_deref())?;
            }
            s.write_attributes(&scene.common.attributes)?;
        }
        Ok(())
    }
}

fn write_drawing(s: &mut StreamWriter, drawing: &DrawingCommon) {
    s.write_pid(drawing.layer);
    s.write_opt_pid(drawing.material);
    s.write_bool(drawing.hidden);
    s.write_bool(drawing.casts_shadows);
    s.write_bool(drawing.receives_shadows);
}
