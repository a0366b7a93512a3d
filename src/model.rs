//! The model aggregate
//!
//! [`Model`] owns the entity registry, the collection managers, the root
//! entities container and the model-level settings. Every public operation
//! on a model goes through it.

use std::path::{Path, PathBuf};

use ahash::{AHashMap, AHashSet};
use tracing::{debug, info};
use uuid::Uuid;

use crate::attributes::{AttributeDictionaries, AttributeDictionary};
use crate::collections::{destroy_tree, detach_from_container, CollectionManager};
use crate::collections::{Definitions, Fonts, Layers, Materials, Scenes};
use crate::entities::{
    ComponentDefinition, ComponentInstance, DefinitionKind, DrawingCommon, Edge, EntityKind,
    EntityType, Face, Image, Layer, Material, Scene, Texture,
};
use crate::error::{BatchTally, ModelError, Result};
use crate::geometry::{self, RepairContext};
use crate::instance_path::{self, InstancePath, PathResolution};
use crate::io::{ModelReader, ModelWriter, WriterConfiguration, WRITER_VERSION};
use crate::notification::{NotificationCollection, NotificationType};
use crate::registry::{EntityRegistry, Owner, ResolvedBatch};
use crate::scene_graph::{ContainerId, Entities};
use crate::settings::{
    Axes, Camera, Classifications, DimensionStyle, LengthFormatter, LineStyles, Location,
    ModelSettings, OptionsManager, RenderingOptions, ShadowInfo, Styles,
};
use crate::types::{
    BoundingBox3D, FileVersion, ModelVersion, PersistentId, PidPath, Point3, Transform, Units,
};

/// Entity counts in the fixed interchange order: Edge, Face,
/// ComponentInstance, Group, Image, ComponentDefinition, Layer, Material
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ModelStatistics {
    counts: [usize; 8],
}

impl ModelStatistics {
    /// Count for one kind; zero for kinds that are not tracked
    pub fn count(&self, kind: EntityKind) -> usize {
        kind.statistics_index().map_or(0, |i| self.counts[i])
    }

    /// Raw counts in interchange order
    pub fn counts(&self) -> &[usize; 8] {
        &self.counts
    }
}

/// A 3D model document
#[derive(Debug, Clone)]
pub struct Model {
    pub(crate) registry: EntityRegistry,
    pub(crate) root: Entities,
    pub(crate) materials: Materials,
    pub(crate) layers: Layers,
    pub(crate) definitions: Definitions,
    pub(crate) scenes: Scenes,
    pub(crate) fonts: Fonts,
    pub(crate) attributes: AttributeDictionaries,
    pub(crate) settings: ModelSettings,
    pub(crate) name: String,
    pub(crate) description: String,
    pub(crate) units: Units,
    pub(crate) version: FileVersion,
    pub(crate) guid: Uuid,
    pub(crate) path: Option<PathBuf>,
    /// Non-fatal issues recorded by load, save and repair
    pub notifications: NotificationCollection,
}

impl Model {
    /// Create an empty model with its default layer
    pub fn new() -> Self {
        let mut registry = EntityRegistry::new();
        let layers = Layers::new(&mut registry);
        Model {
            registry,
            root: Entities::new(),
            materials: Materials::new(),
            layers,
            definitions: Definitions::new(),
            scenes: Scenes::new(),
            fonts: Fonts::new(),
            attributes: AttributeDictionaries::new(),
            settings: ModelSettings::default(),
            name: String::new(),
            description: String::new(),
            units: Units::default(),
            version: WRITER_VERSION,
            guid: Uuid::new_v4(),
            path: None,
            notifications: NotificationCollection::new(),
        }
    }

    // ------------------------------------------------------------------
    // Metadata
    // ------------------------------------------------------------------

    /// Get the model name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Set the model name
    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// File stem of the model's path, or its name if it was never saved
    pub fn title(&self) -> String {
        self.path
            .as_deref()
            .and_then(Path::file_stem)
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.name.clone())
    }

    /// Get the model description
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Set the model description
    pub fn set_description(&mut self, description: impl Into<String>) {
        self.description = description.into();
    }

    /// Path the model was last loaded from or saved to
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Get the model's length units
    pub fn units(&self) -> Units {
        self.units
    }

    /// Set the model's length units
    pub fn set_units(&mut self, units: Units) {
        self.units = units;
    }

    /// Version of the application that wrote the model
    pub fn version(&self) -> FileVersion {
        self.version
    }

    /// Globally unique ID; replaced by every save
    pub fn guid(&self) -> Uuid {
        self.guid
    }

    // ------------------------------------------------------------------
    // Entity access
    // ------------------------------------------------------------------

    /// Look up any entity by persistent ID
    pub fn entity(&self, pid: PersistentId) -> Result<&EntityType> {
        self.registry.resolve(pid)
    }

    /// Mutable access to an entity's own data.
    ///
    /// Identity, ownership and references to other entities are read-only
    /// here; change them through the model's setters, such as
    /// [`Model::set_entity_layer`], which check them first.
    pub fn entity_mut(&mut self, pid: PersistentId) -> Result<&mut EntityType> {
        self.registry
            .get_mut(pid)
            .ok_or_else(|| ModelError::InvalidInput(format!("no entity with persistent ID {pid}")))
    }

    /// Move a drawing element to `layer`, a layer of this model
    pub fn set_entity_layer(&mut self, pid: PersistentId, layer: PersistentId) -> Result<()> {
        if !self.layers.contains(layer) {
            return Err(ModelError::InvalidArgument(format!(
                "layer {layer} is not a layer of this model"
            )));
        }
        self.drawing_of(pid)?.layer = layer;
        Ok(())
    }

    /// Paint a drawing element with a shared material of this model, or
    /// clear its material with `None`
    pub fn set_entity_material(
        &mut self,
        pid: PersistentId,
        material: Option<PersistentId>,
    ) -> Result<()> {
        self.check_shared_material(material)?;
        self.drawing_of(pid)?.material = material;
        Ok(())
    }

    /// Material on the back side of a face
    pub fn set_back_material(
        &mut self,
        face: PersistentId,
        material: Option<PersistentId>,
    ) -> Result<()> {
        self.check_shared_material(material)?;
        let face_data = self
            .entity_mut(face)?
            .as_face_mut()
            .ok_or_else(|| ModelError::InvalidArgument(format!("{face} is not a face")))?;
        face_data.back_material = material;
        Ok(())
    }

    fn check_shared_material(&self, material: Option<PersistentId>) -> Result<()> {
        match material {
            Some(m) if !self.materials.contains(m) => Err(ModelError::InvalidArgument(format!(
                "material {m} is not a material of this model"
            ))),
            _ => Ok(()),
        }
    }

    fn drawing_of(&mut self, pid: PersistentId) -> Result<&mut DrawingCommon> {
        self.entity_mut(pid)?
            .drawing_mut()
            .ok_or_else(|| ModelError::InvalidArgument(format!("{pid} is not a drawing element")))
    }

    /// Resolve many PIDs at once, in input order.
    ///
    /// Unknown PIDs leave an empty slot; [`ResolvedBatch::status`] reports
    /// `PartialSuccess` if there are any.
    pub fn entities_by_persistent_ids(&self, pids: &[PersistentId]) -> ResolvedBatch<&EntityType> {
        self.registry.resolve_many(pids)
    }

    /// Owner of record of an entity
    pub fn owner_of(&self, pid: PersistentId) -> Option<Owner> {
        self.registry.owner(pid)
    }

    /// Read-only view of the identity ledger
    pub fn registry(&self) -> &EntityRegistry {
        &self.registry
    }

    /// Destroy a detached entity created by one of the `create_*` calls.
    ///
    /// Entities that were added somewhere belong to the model and fail with
    /// `InvalidArgument`.
    pub fn release_entity(&mut self, pid: PersistentId) -> Result<()> {
        match self.registry.owner(pid) {
            None => Err(ModelError::InvalidInput(format!("no entity with persistent ID {pid}"))),
            Some(Owner::Detached) => {
                destroy_tree(&mut self.registry, pid);
                self.definitions.prune(&self.registry);
                Ok(())
            }
            Some(_) => Err(ModelError::InvalidArgument(format!(
                "entity {pid} is owned by the model and cannot be released"
            ))),
        }
    }

    // ------------------------------------------------------------------
    // Creation (detached, caller-owned until added)
    // ------------------------------------------------------------------

    /// Register a prepared entity as a detached entity of this model
    pub fn create(&mut self, entity: EntityType) -> PersistentId {
        self.registry.register(entity)
    }

    /// Create a detached edge; zero-length edges are `InvalidInput`
    pub fn create_edge(&mut self, start: Point3, end: Point3) -> Result<PersistentId> {
        let edge = Edge::new(start, end);
        if edge.is_degenerate() {
            return Err(ModelError::InvalidInput("edge has zero length".to_string()));
        }
        Ok(self.registry.register(EntityType::Edge(edge)))
    }

    /// Create a face from its outer loop
    pub fn create_face(&mut self, outer_loop: Vec<Point3>) -> Result<PersistentId> {
        let face = Face::new(outer_loop);
        if face.is_degenerate() {
            return Err(ModelError::InvalidInput(
                "face loop is degenerate or not planar".to_string(),
            ));
        }
        Ok(self.registry.register(EntityType::Face(face)))
    }

    /// Create an instance of a component definition of this model
    pub fn create_instance(
        &mut self,
        definition: PersistentId,
        transform: Transform,
    ) -> Result<PersistentId> {
        let kind = self.definition_kind(definition)?;
        if kind != DefinitionKind::Component {
            return Err(ModelError::InvalidArgument(format!(
                "definition {definition} is not a component definition"
            )));
        }
        let instance = ComponentInstance::new(definition).with_transform(transform);
        Ok(self.registry.register(EntityType::ComponentInstance(instance)))
    }

    /// Create an empty group.
    ///
    /// The group's definition joins the definitions collection right away;
    /// the group itself stays detached. Add geometry to
    /// `ContainerId::Definition(group definition)`.
    pub fn create_group(&mut self) -> Result<PersistentId> {
        let name = self.definitions.generate_unique_name(&self.registry, "Group");
        let def = self
            .registry
            .register(EntityType::ComponentDefinition(ComponentDefinition::group(name)));
        self.definitions.add(&mut self.registry, &[def])?;
        Ok(self
            .registry
            .register(EntityType::Group(ComponentInstance::new(def))))
    }

    /// Create an image of `file_name` sized `width` x `height`.
    ///
    /// Creates the image definition and the image's private material along
    /// with the detached image.
    pub fn create_image(
        &mut self,
        file_name: &str,
        width: f64,
        height: f64,
    ) -> Result<PersistentId> {
        if !(width.is_finite() && height.is_finite() && width > 0.0 && height > 0.0) {
            return Err(ModelError::InvalidInput(format!(
                "image size {width} x {height} is not positive"
            )));
        }
        let stem = Path::new(file_name)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "Image".to_string());

        let def_name = self.definitions.generate_unique_name(&self.registry, &stem);
        let def = self.registry.register(EntityType::ComponentDefinition(
            ComponentDefinition::new(def_name, DefinitionKind::Image),
        ));
        self.definitions.add(&mut self.registry, &[def])?;

        let mut material = Material::new(stem);
        material.texture = Some(Texture {
            file_name: file_name.to_string(),
            width,
            height,
        });
        let material = self.registry.register(EntityType::Material(material));

        let mut image = Image::new(def, file_name, width, height);
        image.image_material = Some(material);
        let image = self.registry.register(EntityType::Image(image));
        self.registry.claim_ownership(material, Owner::Entity(image))?;
        Ok(image)
    }

    /// Create a detached material
    pub fn create_material(&mut self, name: &str) -> PersistentId {
        self.registry.register(EntityType::Material(Material::new(name)))
    }

    /// Create a detached layer
    pub fn create_layer(&mut self, name: &str) -> PersistentId {
        self.registry.register(EntityType::Layer(Layer::new(name)))
    }

    /// Create a detached scene
    pub fn create_scene(&mut self, name: &str) -> PersistentId {
        self.registry.register(EntityType::Scene(Scene::new(name)))
    }

    /// Create a detached component definition
    pub fn create_definition(&mut self, name: &str) -> PersistentId {
        self.registry
            .register(EntityType::ComponentDefinition(ComponentDefinition::component(name)))
    }

    fn definition_kind(&self, definition: PersistentId) -> Result<DefinitionKind> {
        if !self.definitions.contains(definition) {
            return Err(ModelError::InvalidArgument(format!(
                "{definition} is not a definition of this model"
            )));
        }
        self.registry
            .get(definition)
            .and_then(EntityType::as_definition)
            .map(|d| d.kind)
            .ok_or_else(|| ModelError::InvalidInput(format!("no definition {definition}")))
    }

    // ------------------------------------------------------------------
    // Entities containers
    // ------------------------------------------------------------------

    /// The root entities container
    pub fn root(&self) -> &Entities {
        &self.root
    }

    /// Look up an entities container
    pub fn container(&self, id: ContainerId) -> Result<&Entities> {
        match id {
            ContainerId::Root => Ok(&self.root),
            ContainerId::Definition(def) if self.definitions.contains(def) => self
                .registry
                .get(def)
                .and_then(EntityType::as_definition)
                .map(|d| &d.entities)
                .ok_or_else(|| ModelError::InvalidInput(format!("no definition {def}"))),
            ContainerId::Definition(def) => Err(ModelError::InvalidArgument(format!(
                "{def} is not a definition of this model"
            ))),
        }
    }

    fn container_mut(&mut self, id: ContainerId) -> Result<&mut Entities> {
        match id {
            ContainerId::Root => Ok(&mut self.root),
            ContainerId::Definition(def) => self
                .registry
                .get_mut(def)
                .and_then(EntityType::as_definition_mut)
                .map(|d| &mut d.entities)
                .ok_or_else(|| ModelError::InvalidInput(format!("no definition {def}"))),
        }
    }

    /// Lazily walk the entities of a container
    pub fn iter_entities(&self, id: ContainerId) -> Result<impl Iterator<Item = &EntityType> + '_> {
        Ok(self.container(id)?.resolve(&self.registry))
    }

    /// Check if `pid` sits directly in container `id`
    pub fn contains(&self, id: ContainerId, pid: PersistentId) -> bool {
        self.container(id).is_ok_and(|c| c.contains(pid))
    }

    /// Bounding box of a container in its own space
    pub fn bounds(&self, id: ContainerId) -> Result<Option<BoundingBox3D>> {
        Ok(self.container(id)?.bounds(&self.registry))
    }

    /// Add detached drawing elements to a container.
    ///
    /// Elements with no layer go on the active layer. Layers and materials
    /// they reference must belong to the model, instances must place a
    /// definition of the model, and a definition may not end up containing
    /// itself.
    pub fn add_to_container(&mut self, id: ContainerId, pids: &[PersistentId]) -> Result<()> {
        self.container(id)?;
        let mut tally = BatchTally::new();
        for (index, &pid) in pids.iter().enumerate() {
            tally.record(index, self.add_one(id, pid));
        }
        tally.finish()
    }

    fn add_one(&mut self, id: ContainerId, pid: PersistentId) -> Result<()> {
        let entity = self.registry.resolve(pid)?;
        let kind = entity.kind();
        if !kind.is_drawing_element() {
            return Err(ModelError::InvalidArgument(format!(
                "{kind} {pid} cannot be placed in a container"
            )));
        }
        if !self.registry.owner(pid).is_some_and(|o| o.is_detached()) {
            return Err(ModelError::AlreadyOwned(pid));
        }

        if let Some(def) = entity.definition() {
            let expected = match kind {
                EntityKind::Group => DefinitionKind::Group,
                EntityKind::Image => DefinitionKind::Image,
                _ => DefinitionKind::Component,
            };
            if self.definition_kind(def)? != expected {
                return Err(ModelError::InvalidArgument(format!(
                    "{kind} {pid} places definition {def} of the wrong kind"
                )));
            }
            if let ContainerId::Definition(target) = id {
                if self.definition_reaches(def, target) {
                    return Err(ModelError::InvalidArgument(format!(
                        "placing {pid} in {id} would make the definition contain itself"
                    )));
                }
            }
        }

        if let Some(drawing) = entity.drawing() {
            if !drawing.layer.is_null() && !self.layers.contains(drawing.layer) {
                return Err(ModelError::InvalidArgument(format!(
                    "layer {} is not a layer of this model",
                    drawing.layer
                )));
            }
            if let Some(m) = drawing.material.filter(|m| !self.materials.contains(*m)) {
                return Err(ModelError::InvalidArgument(format!(
                    "material {m} is not a material of this model"
                )));
            }
        }
        if let Some(m) = entity
            .as_face()
            .and_then(|f| f.back_material)
            .filter(|m| !self.materials.contains(*m))
        {
            return Err(ModelError::InvalidArgument(format!(
                "material {m} is not a material of this model"
            )));
        }

        let active = self.layers.active_layer();
        if let Some(drawing) = self.registry.get_mut(pid).and_then(EntityType::drawing_mut) {
            if drawing.layer.is_null() {
                drawing.layer = active;
            }
        }
        self.registry.claim_ownership(pid, Owner::Container(id))?;
        self.container_mut(id)?.insert(pid);
        Ok(())
    }

    /// Whether definition `from` is `target` or places it at any depth
    fn definition_reaches(&self, from: PersistentId, target: PersistentId) -> bool {
        let mut stack = vec![from];
        let mut seen = AHashSet::new();
        while let Some(def) = stack.pop() {
            if def == target {
                return true;
            }
            if !seen.insert(def) {
                continue;
            }
            if let Some(d) = self.registry.get(def).and_then(EntityType::as_definition) {
                stack.extend(d.entities.resolve(&self.registry).filter_map(EntityType::definition));
            }
        }
        false
    }

    /// Remove elements from a container and destroy them.
    ///
    /// `OutOfRange` for an empty batch; elements that are not members fail
    /// individually.
    pub fn remove_from_container(&mut self, id: ContainerId, pids: &[PersistentId]) -> Result<()> {
        if pids.is_empty() {
            return Err(ModelError::OutOfRange("no entities to remove".to_string()));
        }
        self.container(id)?;

        let mut tally = BatchTally::new();
        for (index, &pid) in pids.iter().enumerate() {
            let outcome = if self.contains(id, pid) {
                detach_from_container(&mut self.registry, &mut self.root, pid);
                destroy_tree(&mut self.registry, pid);
                Ok(())
            } else {
                Err(ModelError::InvalidArgument(format!("{pid} is not in {id}")))
            };
            tally.record(index, outcome);
        }
        self.definitions.prune(&self.registry);
        tally.finish()
    }

    /// Create and add an edge in one step
    pub fn add_edge(&mut self, id: ContainerId, start: Point3, end: Point3) -> Result<PersistentId> {
        let pid = self.create_edge(start, end)?;
        self.place(id, pid)
    }

    /// Create and add a face in one step
    pub fn add_face(&mut self, id: ContainerId, outer_loop: Vec<Point3>) -> Result<PersistentId> {
        let pid = self.create_face(outer_loop)?;
        self.place(id, pid)
    }

    /// Create and add an instance in one step
    pub fn add_instance(
        &mut self,
        id: ContainerId,
        definition: PersistentId,
        transform: Transform,
    ) -> Result<PersistentId> {
        let pid = self.create_instance(definition, transform)?;
        self.place(id, pid)
    }

    /// Create and add an empty group; returns the group
    pub fn add_group(&mut self, id: ContainerId) -> Result<PersistentId> {
        let pid = self.create_group()?;
        self.place(id, pid)
    }

    fn place(&mut self, id: ContainerId, pid: PersistentId) -> Result<PersistentId> {
        match self.add_one(id, pid) {
            Ok(()) => Ok(pid),
            Err(e) => {
                destroy_tree(&mut self.registry, pid);
                self.definitions.prune(&self.registry);
                Err(e)
            }
        }
    }

    /// Entity counts per kind.
    ///
    /// Drawing elements are counted once per container they sit in, not per
    /// placed occurrence. Definitions of every kind count together; only
    /// shared materials are counted.
    pub fn statistics(&self) -> ModelStatistics {
        let mut counts = [0usize; 8];
        for (pid, entity) in self.registry.iter() {
            let kind = entity.kind();
            if kind.is_drawing_element()
                && !matches!(self.registry.owner(pid), Some(Owner::Container(_)))
            {
                continue;
            }
            if let Some(slot) = kind.statistics_index() {
                counts[slot] += 1;
            }
        }
        counts[EntityKind::ComponentDefinition as usize] = self.definitions.count();
        counts[EntityKind::Layer as usize] = self.layers.count();
        counts[EntityKind::Material as usize] = self.materials.count();
        ModelStatistics { counts }
    }

    // ------------------------------------------------------------------
    // Materials
    // ------------------------------------------------------------------

    /// Number of shared materials
    pub fn num_materials(&self) -> usize {
        self.materials.count()
    }

    /// Up to `limit` shared materials in collection order
    pub fn materials(&self, limit: usize) -> Vec<PersistentId> {
        self.materials.list(limit)
    }

    /// Add detached materials; colliding names are made unique
    pub fn add_materials(&mut self, pids: &[PersistentId]) -> Result<()> {
        self.materials.add(&mut self.registry, pids)
    }

    /// Remove materials and clear every reference to them
    pub fn remove_materials(&mut self, pids: &[PersistentId]) -> Result<()> {
        self.materials.remove(&mut self.registry, pids)
    }

    /// Find a shared material by exact name
    pub fn material_by_name(&self, name: &str) -> Option<PersistentId> {
        self.materials.by_name(&self.registry, name)
    }

    /// A material name no shared material uses yet
    pub fn generate_unique_material_name(&self, suggested: &str) -> String {
        self.materials.generate_unique_name(&self.registry, suggested)
    }

    /// Shared materials plus the private materials of layers and images
    pub fn num_all_materials(&self) -> usize {
        self.materials.all(&self.registry).len()
    }

    /// Up to `limit` materials, private ones included
    pub fn all_materials(&self, limit: usize) -> Vec<PersistentId> {
        let mut all = self.materials.all(&self.registry);
        all.truncate(limit);
        all
    }

    // ------------------------------------------------------------------
    // Layers
    // ------------------------------------------------------------------

    /// Number of layers, the default layer included
    pub fn num_layers(&self) -> usize {
        self.layers.count()
    }

    /// Up to `limit` layers in collection order
    pub fn layers(&self, limit: usize) -> Vec<PersistentId> {
        self.layers.list(limit)
    }

    /// Add detached layers; a taken name is `InvalidArgument`
    pub fn add_layers(&mut self, pids: &[PersistentId]) -> Result<()> {
        self.layers.add(&mut self.registry, pids)
    }

    /// Remove layers, moving their elements to the default layer
    pub fn remove_layers(&mut self, pids: &[PersistentId]) -> Result<()> {
        self.layers.remove(&mut self.registry, pids)
    }

    /// The layer that can never be removed
    pub fn default_layer(&self) -> PersistentId {
        self.layers.default_layer()
    }

    /// The layer new elements go on
    pub fn active_layer(&self) -> PersistentId {
        self.layers.active_layer()
    }

    /// Select the active layer; `InvalidArgument` if it is not a layer of this model
    pub fn set_active_layer(&mut self, pid: PersistentId) -> Result<()> {
        self.layers.set_active_layer(pid)
    }

    /// Find a layer by exact name
    pub fn layer_by_name(&self, name: &str) -> Option<PersistentId> {
        self.layers.by_name(&self.registry, name)
    }

    /// Resolve PIDs as layers; anything else leaves an empty slot
    pub fn layers_by_persistent_ids(&self, pids: &[PersistentId]) -> ResolvedBatch<&Layer> {
        self.layers.by_persistent_ids(&self.registry, pids)
    }

    /// Rename a layer. Another layer of the model already using `name` is
    /// `InvalidArgument`.
    pub fn rename_layer(&mut self, layer: PersistentId, name: &str) -> Result<()> {
        if let Some(other) = self.layers.by_name(&self.registry, name) {
            if other != layer {
                return Err(ModelError::InvalidArgument(format!(
                    "layer name '{name}' is taken by {other}"
                )));
            }
        }
        let data = self
            .entity_mut(layer)?
            .as_layer_mut()
            .ok_or_else(|| ModelError::InvalidArgument(format!("{layer} is not a layer")))?;
        data.name = name.to_string();
        Ok(())
    }

    // ------------------------------------------------------------------
    // Component definitions
    // ------------------------------------------------------------------

    /// Number of component definitions (groups and images excluded)
    pub fn num_component_definitions(&self) -> usize {
        self.definitions.count_of_kind(&self.registry, DefinitionKind::Component)
    }

    /// Up to `limit` component definitions
    pub fn component_definitions(&self, limit: usize) -> Vec<PersistentId> {
        self.definitions
            .list_of_kind(&self.registry, DefinitionKind::Component, limit)
    }

    /// Number of group definitions
    pub fn num_group_definitions(&self) -> usize {
        self.definitions.count_of_kind(&self.registry, DefinitionKind::Group)
    }

    /// Up to `limit` group definitions
    pub fn group_definitions(&self, limit: usize) -> Vec<PersistentId> {
        self.definitions
            .list_of_kind(&self.registry, DefinitionKind::Group, limit)
    }

    /// Number of image definitions
    pub fn num_image_definitions(&self) -> usize {
        self.definitions.count_of_kind(&self.registry, DefinitionKind::Image)
    }

    /// Up to `limit` image definitions
    pub fn image_definitions(&self, limit: usize) -> Vec<PersistentId> {
        self.definitions
            .list_of_kind(&self.registry, DefinitionKind::Image, limit)
    }

    /// Add detached definitions; colliding names are made unique
    pub fn add_component_definitions(&mut self, pids: &[PersistentId]) -> Result<()> {
        self.definitions.add(&mut self.registry, pids)
    }

    /// Remove definitions and every instance, group or image placing them
    pub fn remove_component_definitions(&mut self, pids: &[PersistentId]) -> Result<()> {
        self.definitions
            .remove(&mut self.registry, &mut self.root, pids)
    }

    /// Find a definition of any kind by exact name
    pub fn definition_by_name(&self, name: &str) -> Option<PersistentId> {
        self.definitions.by_name(&self.registry, name)
    }

    /// Import another model file as a new component definition.
    ///
    /// The file's root geometry becomes the definition's geometry; its
    /// nested definitions come along with fresh PIDs. Layers and materials
    /// merge into same-named ones of this model.
    pub fn load_definition(&mut self, path: impl AsRef<Path>) -> Result<PersistentId> {
        let path = path.as_ref();
        let source = ModelReader::from_file(path)?.read()?;
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "Component".to_string());
        let pid = self.import_definition(&source, &stem)?;
        info!(path = %path.display(), definition = %pid, "loaded definition");
        Ok(pid)
    }

    fn import_definition(&mut self, source: &Model, name: &str) -> Result<PersistentId> {
        let mut map: AHashMap<PersistentId, PersistentId> = AHashMap::new();

        for layer in source.layers.list(usize::MAX) {
            let Some(src) = source.registry.get(layer).and_then(EntityType::as_layer) else {
                continue;
            };
            let target = match self.layer_by_name(&src.name) {
                Some(existing) => existing,
                None => {
                    let mut copy = src.clone();
                    let private = copy.layer_material.take().and_then(|m| {
                        source.registry.get(m).cloned().map(|e| self.registry.register(e))
                    });
                    copy.layer_material = private;
                    let pid = self.registry.register(EntityType::Layer(copy));
                    self.layers.add(&mut self.registry, &[pid])?;
                    pid
                }
            };
            map.insert(layer, target);
        }

        for material in source.materials.list(usize::MAX) {
            let Some(src) = source.registry.get(material).and_then(EntityType::as_material) else {
                continue;
            };
            let target = match self.material_by_name(&src.name) {
                Some(existing) => existing,
                None => {
                    let pid = self.registry.register(EntityType::Material(src.clone()));
                    self.materials.add(&mut self.registry, &[pid])?;
                    pid
                }
            };
            map.insert(material, target);
        }

        // Definition shells first, so placements can be remapped
        let source_defs = source.definitions.list(usize::MAX);
        for &def in &source_defs {
            let Some(src) = source.registry.get(def).and_then(EntityType::as_definition) else {
                continue;
            };
            let mut shell = src.clone();
            shell.entities = Entities::new();
            let pid = self.registry.register(EntityType::ComponentDefinition(shell));
            self.definitions.add(&mut self.registry, &[pid])?;
            map.insert(def, pid);
        }

        let new_def = self.create_definition(name);
        self.definitions.add(&mut self.registry, &[new_def])?;

        for &def in &source_defs {
            let (Some(&target), Some(src)) = (
                map.get(&def),
                source.registry.get(def).and_then(EntityType::as_definition),
            ) else {
                continue;
            };
            self.import_members(source, &src.entities, target, &map)?;
        }
        self.import_members(source, &source.root, new_def, &map)?;

        debug!(
            definition = %new_def,
            nested = source_defs.len(),
            "imported definition"
        );
        Ok(new_def)
    }

    fn import_members(
        &mut self,
        source: &Model,
        members: &Entities,
        target: PersistentId,
        map: &AHashMap<PersistentId, PersistentId>,
    ) -> Result<()> {
        let default_layer = self.layers.default_layer();
        let container = ContainerId::Definition(target);

        for src in members.resolve(&source.registry) {
            let mut entity = src.clone();
            entity.common_mut().pid = PersistentId::NULL;
            if let Some(drawing) = entity.drawing_mut() {
                drawing.layer = map.get(&drawing.layer).copied().unwrap_or(default_layer);
                drawing.material = drawing.material.and_then(|m| map.get(&m).copied());
            }
            let mut private = None;
            match &mut entity {
                EntityType::Face(face) => {
                    face.back_material = face.back_material.and_then(|m| map.get(&m).copied());
                }
                EntityType::ComponentInstance(inst) | EntityType::Group(inst) => {
                    let Some(&def) = map.get(&inst.definition) else {
                        continue;
                    };
                    inst.definition = def;
                }
                EntityType::Image(img) => {
                    let Some(&def) = map.get(&img.definition) else {
                        continue;
                    };
                    img.definition = def;
                    private = img
                        .image_material
                        .take()
                        .and_then(|m| source.registry.get(m).cloned())
                        .map(|m| self.registry.register(m));
                    img.image_material = private;
                }
                _ => {}
            }

            let pid = self.registry.register(entity);
            if let Some(m) = private {
                self.registry.claim_ownership(m, Owner::Entity(pid))?;
            }
            self.registry.claim_ownership(pid, Owner::Container(container))?;
            self.container_mut(container)?.insert(pid);
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Scenes
    // ------------------------------------------------------------------

    /// Number of scenes
    pub fn num_scenes(&self) -> usize {
        self.scenes.count()
    }

    /// Up to `limit` scenes in order; `NoData` if the model has none
    pub fn scenes(&self, limit: usize) -> Result<Vec<PersistentId>> {
        if self.scenes.count() == 0 {
            return Err(ModelError::NoData("the model has no scenes".to_string()));
        }
        Ok(self.scenes.list(limit))
    }

    /// Append scenes; any name collision fails the whole call
    pub fn add_scenes(&mut self, pids: &[PersistentId]) -> Result<()> {
        self.scenes.add(&mut self.registry, pids)
    }

    /// Insert one scene at `index` (`-1` appends); returns where it landed
    pub fn add_scene(&mut self, index: isize, pid: PersistentId) -> Result<usize> {
        self.scenes.add_at(&mut self.registry, index, pid)
    }

    /// Remove scenes; the active scene falls back to none
    pub fn remove_scenes(&mut self, pids: &[PersistentId]) -> Result<()> {
        self.scenes.remove(&mut self.registry, pids)
    }

    /// Find a scene by exact name; `NoData` if there is none
    pub fn scene_by_name(&self, name: &str) -> Result<PersistentId> {
        self.scenes
            .by_name(&self.registry, name)
            .ok_or_else(|| ModelError::NoData(format!("no scene named '{name}'")))
    }

    /// The active scene; `NoData` if none is active
    pub fn active_scene(&self) -> Result<PersistentId> {
        self.scenes
            .active()
            .ok_or_else(|| ModelError::NoData("no active scene".to_string()))
    }

    /// Make a scene of this model the active one; `Generic` otherwise
    pub fn set_active_scene(&mut self, pid: PersistentId) -> Result<()> {
        self.scenes.set_active(pid)
    }

    /// Rename a scene. Scene names are unique within a model, so a name
    /// used by another scene is `InvalidArgument`.
    pub fn rename_scene(&mut self, scene: PersistentId, name: &str) -> Result<()> {
        if let Some(other) = self.scenes.by_name(&self.registry, name) {
            if other != scene {
                return Err(ModelError::InvalidArgument(format!(
                    "scene name '{name}' is taken by {other}"
                )));
            }
        }
        self.scene_data_mut(scene)?.name = name.to_string();
        Ok(())
    }

    /// Override how a layer of this model shows while `scene` is active
    pub fn set_scene_layer_visibility(
        &mut self,
        scene: PersistentId,
        layer: PersistentId,
        visible: bool,
    ) -> Result<()> {
        if !self.layers.contains(layer) {
            return Err(ModelError::InvalidArgument(format!(
                "layer {layer} is not a layer of this model"
            )));
        }
        self.scene_data_mut(scene)?.set_layer_visibility(layer, visible);
        Ok(())
    }

    fn scene_data_mut(&mut self, scene: PersistentId) -> Result<&mut Scene> {
        self.entity_mut(scene)?
            .as_scene_mut()
            .ok_or_else(|| ModelError::InvalidArgument(format!("{scene} is not a scene")))
    }

    /// Create and append a match-photo scene for an image on disk.
    ///
    /// `Generic` if the image file does not exist; a taken name is
    /// `InvalidArgument`.
    pub fn add_match_photo_scene(
        &mut self,
        image: impl AsRef<Path>,
        camera: Camera,
        name: &str,
    ) -> Result<PersistentId> {
        let image = image.as_ref();
        if !image.is_file() {
            return Err(ModelError::Generic(format!(
                "image file {} does not exist",
                image.display()
            )));
        }

        let mut scene = Scene::new(name).with_camera(camera);
        scene.photo_image = Some(image.to_string_lossy().into_owned());
        let pid = self.registry.register(EntityType::Scene(scene));
        if let Err(e) = self.scenes.add_at(&mut self.registry, -1, pid) {
            self.registry.destroy(pid);
            return Err(e);
        }
        Ok(pid)
    }

    // ------------------------------------------------------------------
    // Fonts
    // ------------------------------------------------------------------

    /// Number of fonts
    pub fn num_fonts(&self) -> usize {
        self.fonts.count()
    }

    /// Up to `limit` fonts
    pub fn fonts(&self, limit: usize) -> Vec<PersistentId> {
        self.fonts.list(limit)
    }

    /// The model's font for this face and style, created on first use
    pub fn create_font(&mut self, face_name: &str, bold: bool, italic: bool) -> PersistentId {
        self.fonts
            .get_or_create(&mut self.registry, face_name, bold, italic)
    }

    // ------------------------------------------------------------------
    // Attribute dictionaries
    // ------------------------------------------------------------------

    /// Model-level dictionary, created if missing
    pub fn attribute_dictionary(&mut self, name: &str) -> &mut AttributeDictionary {
        self.attributes.get_or_create(name)
    }

    /// Number of model-level attribute dictionaries
    pub fn num_attribute_dictionaries(&self) -> usize {
        self.attributes.len()
    }

    /// Model-level attribute dictionaries
    pub fn attribute_dictionaries(&self) -> &AttributeDictionaries {
        &self.attributes
    }

    /// Attribute dictionaries of one entity
    pub fn entity_attributes(&self, pid: PersistentId) -> Result<&AttributeDictionaries> {
        Ok(&self.registry.resolve(pid)?.common().attributes)
    }

    /// Mutable attribute dictionaries of one entity
    pub fn entity_attributes_mut(&mut self, pid: PersistentId) -> Result<&mut AttributeDictionaries> {
        Ok(&mut self.entity_mut(pid)?.common_mut().attributes)
    }

    // ------------------------------------------------------------------
    // Settings
    // ------------------------------------------------------------------

    /// The current camera
    pub fn camera(&self) -> &Camera {
        &self.settings.camera
    }

    /// Replace the current camera
    pub fn set_camera(&mut self, camera: Camera) {
        self.settings.camera = camera;
    }

    /// Drawing axes
    pub fn axes(&self) -> &Axes {
        &self.settings.axes
    }

    /// Styles of the model
    pub fn styles(&self) -> &Styles {
        &self.settings.styles
    }

    /// Mutable styles
    pub fn styles_mut(&mut self) -> &mut Styles {
        &mut self.settings.styles
    }

    /// Rendering options
    pub fn rendering_options(&self) -> &RenderingOptions {
        &self.settings.rendering_options
    }

    /// Mutable rendering options
    pub fn rendering_options_mut(&mut self) -> &mut RenderingOptions {
        &mut self.settings.rendering_options
    }

    /// Shadow settings
    pub fn shadow_info(&self) -> &ShadowInfo {
        &self.settings.shadow_info
    }

    /// Mutable shadow settings
    pub fn shadow_info_mut(&mut self) -> &mut ShadowInfo {
        &mut self.settings.shadow_info
    }

    /// Named option providers
    pub fn options_manager(&self) -> &OptionsManager {
        &self.settings.options_manager
    }

    /// Mutable option providers
    pub fn options_manager_mut(&mut self) -> &mut OptionsManager {
        &mut self.settings.options_manager
    }

    /// Loaded classification schemas
    pub fn classifications(&self) -> &Classifications {
        &self.settings.classifications
    }

    /// Mutable classification schemas
    pub fn classifications_mut(&mut self) -> &mut Classifications {
        &mut self.settings.classifications
    }

    /// Dimension style
    pub fn dimension_style(&self) -> &DimensionStyle {
        &self.settings.dimension_style
    }

    /// Mutable dimension style
    pub fn dimension_style_mut(&mut self) -> &mut DimensionStyle {
        &mut self.settings.dimension_style
    }

    /// Line styles available to layers
    pub fn line_styles(&self) -> &LineStyles {
        &self.settings.line_styles
    }

    /// Geographic location
    pub fn location(&self) -> &Location {
        &self.settings.location
    }

    /// A copy of the model's length formatter, owned by the caller
    pub fn length_formatter(&self) -> LengthFormatter {
        self.settings.length_formatter.clone()
    }

    /// Replace the model's length formatting settings
    pub fn set_length_formatter(&mut self, formatter: LengthFormatter) {
        self.settings.length_formatter = formatter;
    }

    /// Check if the model has a geographic location
    pub fn is_geo_referenced(&self) -> bool {
        self.settings.location.is_geo_referenced()
    }

    /// Place the model on the globe; out-of-range or non-finite values are `InvalidInput`
    pub fn set_geo_reference(
        &mut self,
        latitude: f64,
        longitude: f64,
        altitude: f64,
        z_value_centered: bool,
        on_ocean_floor: bool,
    ) -> Result<()> {
        self.settings.location.set_geo_reference(
            latitude,
            longitude,
            altitude,
            z_value_centered,
            on_ocean_floor,
        )
    }

    /// Angle to true north in degrees
    pub fn north_correction(&self) -> f64 {
        self.settings.location.north_correction()
    }

    // ------------------------------------------------------------------
    // Instance paths
    // ------------------------------------------------------------------

    /// Resolve a PID or a `.`-separated PID path.
    ///
    /// A single PID is traced outward to the root; a longer path is traced
    /// downward from the root.
    pub fn instance_path_by_pid(&self, pid_path: &str) -> Result<PathResolution> {
        let path: PidPath = pid_path.parse()?;
        Ok(match path.pids() {
            [single] => instance_path::path_to_root(&self.registry, *single),
            _ => instance_path::resolve_path(&self.registry, &self.root, &path),
        })
    }

    /// Trace one entity outward to the root
    pub fn instance_path_for(&self, pid: PersistentId) -> PathResolution {
        instance_path::path_to_root(&self.registry, pid)
    }

    /// Whether the occurrence named by `path` is drawn
    pub fn is_drawing_element_visible(&self, path: &InstancePath) -> Result<bool> {
        instance_path::is_visible(
            &self.registry,
            &self.root,
            &self.settings.rendering_options,
            path,
        )
    }

    // ------------------------------------------------------------------
    // Geometry passes
    // ------------------------------------------------------------------

    fn all_containers(&self) -> Vec<ContainerId> {
        std::iter::once(ContainerId::Root)
            .chain(self.definitions.collection().iter().map(ContainerId::Definition))
            .collect()
    }

    /// Root plus every definition placed from it at any depth
    fn reachable_containers(&self) -> Vec<ContainerId> {
        let mut order = vec![ContainerId::Root];
        let mut seen = AHashSet::new();
        let mut index = 0;
        while index < order.len() {
            let placed: Vec<PersistentId> = self
                .container(order[index])
                .map(|c| c.resolve(&self.registry).filter_map(EntityType::definition).collect())
                .unwrap_or_default();
            for def in placed {
                if seen.insert(def) && self.definitions.contains(def) {
                    order.push(ContainerId::Definition(def));
                }
            }
            index += 1;
        }
        order
    }

    fn members_of(&self, id: ContainerId) -> Vec<PersistentId> {
        self.container(id)
            .map(|c| c.iter().collect())
            .unwrap_or_default()
    }

    fn forget_members(&mut self, id: ContainerId, removed: &[PersistentId]) {
        if let Ok(container) = self.container_mut(id) {
            for pid in removed {
                container.remove(*pid);
            }
        }
    }

    /// Merge coplanar neighbors in every container. Returns the number of
    /// faces and edges removed.
    pub fn merge_coplanar_faces(&mut self) -> usize {
        let mut total = 0;
        for id in self.all_containers() {
            let members = self.members_of(id);
            let removed = geometry::merge_coplanar_faces(&mut self.registry, &members);
            total += removed.len();
            self.forget_members(id, &removed);
        }
        info!(removed = total, "merge coplanar faces finished");
        total
    }

    /// Make neighboring faces agree on their front side, in the root and,
    /// with `recurse`, in every definition placed from it. Returns the
    /// number of faces flipped.
    pub fn orient_faces_consistently(&mut self, recurse: bool) -> usize {
        let containers = if recurse {
            self.reachable_containers()
        } else {
            vec![ContainerId::Root]
        };
        let mut flipped = 0;
        for id in containers {
            let members = self.members_of(id);
            flipped += geometry::orient_faces_consistently(&mut self.registry, &members);
        }
        info!(flipped, "orient faces finished");
        flipped
    }

    /// Best-effort repair of every container and of scene overrides.
    ///
    /// Each repair is recorded in [`Model::notifications`]; returns how many
    /// were made.
    pub fn fix_errors(&mut self) -> usize {
        let before = self.notifications.len();
        let layers: AHashSet<PersistentId> = self.layers.collection().iter().collect();
        let materials: AHashSet<PersistentId> = self.materials.collection().iter().collect();
        let ctx = RepairContext {
            default_layer: self.layers.default_layer(),
            layers: &layers,
            materials: &materials,
        };

        for id in self.all_containers() {
            let members = self.members_of(id);
            let removed =
                geometry::fix_errors(&mut self.registry, &members, &ctx, &mut self.notifications);
            self.forget_members(id, &removed);
        }
        self.definitions.prune(&self.registry);

        for scene in self.scenes.collection().iter() {
            let Some(s) = self.registry.get_mut(scene).and_then(EntityType::as_scene_mut) else {
                continue;
            };
            let count = s.layer_visibility.len();
            s.layer_visibility.retain(|layer, _| layers.contains(layer));
            let dropped = count - s.layer_visibility.len();
            if dropped > 0 {
                self.notifications.notify(
                    NotificationType::Warning,
                    format!("dropped {dropped} overrides for missing layers in scene {scene}"),
                );
            }
        }

        let repairs = self.notifications.len() - before;
        info!(repairs, "fix errors finished");
        repairs
    }

    // ------------------------------------------------------------------
    // Load / save
    // ------------------------------------------------------------------

    /// Read a model file
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Model> {
        ModelReader::from_file(path)?.read()
    }

    /// Read a model from an in-memory file image
    pub fn load_from_buffer(bytes: &[u8]) -> Result<Model> {
        ModelReader::from_bytes(bytes.to_vec()).read()
    }

    /// Save in the current format
    pub fn save(&mut self, path: impl AsRef<Path>) -> Result<()> {
        self.save_with_version(path, ModelVersion::CURRENT)
    }

    /// Save in a given format version.
    ///
    /// Fails with `ModelVersion`, writing nothing, if the model uses
    /// something that version cannot store. On success the model gets a new
    /// GUID and remembers `path`.
    pub fn save_with_version(&mut self, path: impl AsRef<Path>, version: ModelVersion) -> Result<()> {
        ModelWriter::new(self)
            .with_config(WriterConfiguration {
                version,
                ..Default::default()
            })
            .write_to_file(path)
    }

    /// Serialize into a file image. Like a save, this replaces the GUID.
    pub fn to_bytes(&mut self, version: ModelVersion) -> Result<Vec<u8>> {
        ModelWriter::new(self)
            .with_config(WriterConfiguration {
                version,
                ..Default::default()
            })
            .write_to_vec()
    }
}

impl Default for Model {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn square(x0: f64) -> Vec<Point3> {
        vec![
            Point3::new(x0, 0.0, 0.0),
            Point3::new(x0 + 1.0, 0.0, 0.0),
            Point3::new(x0 + 1.0, 1.0, 0.0),
            Point3::new(x0, 1.0, 0.0),
        ]
    }

    #[test]
    fn test_new_model_has_default_layer() {
        let model = Model::new();
        assert_eq!(model.num_layers(), 1);
        assert_eq!(model.active_layer(), model.default_layer());
        assert_eq!(model.statistics().count(EntityKind::Layer), 1);
    }

    #[test]
    fn test_added_elements_go_on_active_layer() {
        let mut model = Model::new();
        let walls = model.create_layer("Walls");
        model.add_layers(&[walls]).unwrap();
        model.set_active_layer(walls).unwrap();

        let face = model.add_face(ContainerId::Root, square(0.0)).unwrap();
        assert_eq!(model.entity(face).unwrap().drawing().unwrap().layer, walls);
        assert!(model.contains(ContainerId::Root, face));
    }

    #[test]
    fn test_second_add_fails_without_mutation() {
        let mut model = Model::new();
        let def = model.create_definition("Box");
        model.add_component_definitions(&[def]).unwrap();

        let edge = model
            .create_edge(Point3::origin(), Point3::new(1.0, 0.0, 0.0))
            .unwrap();
        model.add_to_container(ContainerId::Root, &[edge]).unwrap();
        let err = model
            .add_to_container(ContainerId::Definition(def), &[edge])
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PartialSuccess);
        assert!(model.container(ContainerId::Definition(def)).unwrap().is_empty());
    }

    #[test]
    fn test_definition_cannot_contain_itself() {
        let mut model = Model::new();
        let def = model.create_definition("Loop");
        model.add_component_definitions(&[def]).unwrap();
        let err = model
            .add_instance(ContainerId::Definition(def), def, Transform::identity())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        assert_eq!(model.statistics().count(EntityKind::ComponentInstance), 0);
    }

    #[test]
    fn test_release_only_detached() {
        let mut model = Model::new();
        let mat = model.create_material("Red");
        let other = model.create_material("Blue");
        model.add_materials(&[other]).unwrap();

        model.release_entity(mat).unwrap();
        assert!(model.entity(mat).is_err());
        assert_eq!(
            model.release_entity(other).unwrap_err().kind(),
            ErrorKind::InvalidArgument
        );
    }

    #[test]
    fn test_image_owns_private_material() {
        let mut model = Model::new();
        let image = model.create_image("photos/site.png", 4.0, 3.0).unwrap();
        model.add_to_container(ContainerId::Root, &[image]).unwrap();

        assert_eq!(model.num_image_definitions(), 1);
        assert_eq!(model.num_materials(), 0);
        assert_eq!(model.num_all_materials(), 1);

        model.remove_from_container(ContainerId::Root, &[image]).unwrap();
        assert_eq!(model.num_all_materials(), 0);
    }

    #[test]
    fn test_scene_queries() {
        let mut model = Model::new();
        assert_eq!(model.scenes(10).unwrap_err().kind(), ErrorKind::NoData);
        assert_eq!(model.active_scene().unwrap_err().kind(), ErrorKind::NoData);

        let a = model.create_scene("A");
        model.add_scenes(&[a]).unwrap();
        assert_eq!(model.scene_by_name("A").unwrap(), a);
        assert_eq!(model.scene_by_name("B").unwrap_err().kind(), ErrorKind::NoData);

        let missing = model.add_match_photo_scene("/no/such/photo.jpg", Camera::default(), "Photo");
        assert_eq!(missing.unwrap_err().kind(), ErrorKind::Generic);
    }

    #[test]
    fn test_title_falls_back_to_name() {
        let mut model = Model::new();
        model.set_name("Cabin");
        assert_eq!(model.title(), "Cabin");
        model.path = Some(PathBuf::from("/tmp/house.skp"));
        assert_eq!(model.title(), "house");
    }

    #[test]
    fn test_fix_errors_reports_repairs() {
        let mut model = Model::new();
        model.add_face(ContainerId::Root, square(0.0)).unwrap();
        let edge = model
            .add_edge(ContainerId::Root, Point3::origin(), Point3::new(0.0, 2.0, 0.0))
            .unwrap();
        model
            .entity_mut(edge)
            .unwrap()
            .drawing_mut()
            .unwrap()
            .layer = PersistentId::new(4242);

        assert_eq!(model.fix_errors(), 1);
        assert_eq!(
            model.entity(edge).unwrap().drawing().unwrap().layer,
            model.default_layer()
        );
        assert_eq!(model.fix_errors(), 0);
    }

    #[test]
    fn test_instance_path_by_pid() {
        let mut model = Model::new();
        let def = model.create_definition("Post");
        model.add_component_definitions(&[def]).unwrap();
        let edge = model
            .add_edge(
                ContainerId::Definition(def),
                Point3::origin(),
                Point3::new(0.0, 0.0, 3.0),
            )
            .unwrap();
        let inst = model
            .add_instance(ContainerId::Root, def, Transform::identity())
            .unwrap();

        let outward = model.instance_path_by_pid(&edge.to_string()).unwrap();
        let downward = model
            .instance_path_by_pid(&format!("{inst}.{edge}"))
            .unwrap();
        assert_eq!(outward, downward);
        assert!(outward.is_resolved());
        assert!(model.instance_path_by_pid("1.x").is_err());
    }
}
