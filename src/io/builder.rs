//! Model builder: turns decoded section records into a [`Model`].
//!
//! The reader collects records that still refer to each other by PID. Once
//! every section is decoded the builder resolves them in phases:
//!
//! 1. **Register identities**: every record enters the registry under the
//!    PID it was saved with. A PID seen twice aborts the load.
//! 2. **Claim ownership**: collections claim their members, containers claim
//!    their drawing elements, layers and images claim private materials.
//! 3. **Check references**: layer, material and definition references of
//!    every element, scene layer overrides and scene names.
//!
//! Dangling references fail the load with `ModelInvalid`. With
//! [`ReaderConfiguration::failsafe`] they are redirected to fallbacks and
//! reported through notifications.

use ahash::{AHashMap, AHashSet};
use tracing::debug;
use uuid::Uuid;

use super::constants::ROOT_CONTAINER;
use super::reader::ReaderConfiguration;
use crate::attributes::AttributeDictionaries;
use crate::collections::{CollectionManager, Definitions, Fonts, Layers, Materials, Scenes};
use crate::entities::{
    ComponentDefinition, DefinitionKind, EntityKind, EntityType, Font, Layer, Material, Scene,
};
use crate::error::{ModelError, Result};
use crate::model::Model;
use crate::notification::{NotificationCollection, NotificationType};
use crate::registry::{EntityRegistry, Owner};
use crate::scene_graph::{ContainerId, Entities};
use crate::settings::ModelSettings;
use crate::types::{FileVersion, PersistentId, Units};

/// A material and the PID of its private owner (NULL when shared)
#[derive(Debug, Clone)]
pub(crate) struct MaterialRecord {
    pub material: Material,
    pub owner: PersistentId,
}

/// A drawing element and the raw container PID it was saved under
#[derive(Debug, Clone)]
pub(crate) struct ElementRecord {
    pub container: i64,
    pub entity: EntityType,
}

/// Everything decoded from one file, before references are resolved
#[derive(Debug, Clone, Default)]
pub(crate) struct ModelRecords {
    pub name: String,
    pub description: String,
    pub units: Units,
    pub guid: Uuid,
    pub settings: ModelSettings,
    pub attributes: AttributeDictionaries,
    pub materials: Vec<MaterialRecord>,
    pub default_layer: PersistentId,
    /// Absent in versions that do not store it
    pub active_layer: Option<PersistentId>,
    pub layers: Vec<Layer>,
    pub fonts: Vec<Font>,
    pub definitions: Vec<ComponentDefinition>,
    pub elements: Vec<ElementRecord>,
    pub active_scene: Option<PersistentId>,
    pub scenes: Vec<Scene>,
}

pub(crate) struct ModelBuilder {
    registry: EntityRegistry,
    config: ReaderConfiguration,
    notifications: NotificationCollection,
}

impl ModelBuilder {
    pub(crate) fn new(config: ReaderConfiguration, notifications: NotificationCollection) -> Self {
        Self {
            registry: EntityRegistry::new(),
            config,
            notifications,
        }
    }

    pub(crate) fn build(mut self, records: ModelRecords, version: FileVersion) -> Result<Model> {
        let ModelRecords {
            name,
            description,
            units,
            guid,
            settings,
            attributes,
            materials: material_records,
            default_layer,
            active_layer,
            layers: layer_records,
            fonts: font_records,
            definitions: definition_records,
            elements: element_records,
            active_scene,
            scenes: scene_records,
        } = records;

        // Phase 1: identities
        let mut material_owners = Vec::with_capacity(material_records.len());
        for record in material_records {
            let pid = self.register(EntityType::Material(record.material))?;
            material_owners.push((pid, record.owner));
        }
        let layer_pids = self.register_all(layer_records.into_iter().map(EntityType::Layer))?;
        let font_pids = self.register_all(font_records.into_iter().map(EntityType::Font))?;
        let definition_pids = self.register_all(
            definition_records
                .into_iter()
                .map(EntityType::ComponentDefinition),
        )?;
        let mut placements = Vec::with_capacity(element_records.len());
        for record in element_records {
            if !record.entity.kind().is_drawing_element() {
                return Err(ModelError::ModelInvalid(format!(
                    "{} {} cannot be placed in a container",
                    record.entity.kind(),
                    record.entity.pid()
                )));
            }
            let pid = self.register(record.entity)?;
            placements.push((record.container, pid));
        }
        let scene_pids = self.register_all(scene_records.into_iter().map(EntityType::Scene))?;
        debug!(entities = self.registry.len(), "registered persistent IDs");

        // Phase 2: ownership
        let mut materials = Materials::new();
        for (pid, owner) in &material_owners {
            if owner.is_null() {
                self.claim(*pid, Owner::Model)?;
                materials.insert_loaded(*pid);
            }
        }

        let layers = Layers::from_loaded(
            layer_pids.clone(),
            default_layer,
            active_layer.unwrap_or(default_layer),
        )?;
        for pid in &layer_pids {
            self.claim(*pid, Owner::Model)?;
        }

        let mut fonts = Fonts::new();
        for pid in font_pids {
            self.claim(pid, Owner::Model)?;
            fonts.insert_loaded(pid);
        }

        let mut definitions = Definitions::new();
        for pid in &definition_pids {
            self.claim(*pid, Owner::Model)?;
            definitions.insert_loaded(*pid);
        }

        let mut root = Entities::new();
        let mut placed = Vec::with_capacity(placements.len());
        for (container, pid) in placements {
            let id = if container == ROOT_CONTAINER {
                ContainerId::Root
            } else {
                let def = PersistentId::new(container);
                if !definitions.collection().contains(def) {
                    return Err(ModelError::ModelInvalid(format!(
                        "element {pid} is placed in unknown container {container}"
                    )));
                }
                ContainerId::Definition(def)
            };
            self.claim(pid, Owner::Container(id))?;
            match id {
                ContainerId::Root => {
                    root.insert(pid);
                }
                ContainerId::Definition(def) => {
                    if let Some(d) = self
                        .registry
                        .get_mut(def)
                        .and_then(EntityType::as_definition_mut)
                    {
                        d.entities.insert(pid);
                    }
                }
            }
            placed.push(pid);
        }

        for (pid, owner) in &material_owners {
            if !owner.is_null() {
                self.claim_private_material(*pid, *owner, &mut materials)?;
            }
        }

        // Phase 3: references
        self.check_private_material_refs(&layer_pids, &placed)?;
        self.check_element_refs(&placed, &layers, &materials, &definitions)?;
        self.check_definition_cycles(&definition_pids)?;

        let mut scenes = Scenes::new();
        self.check_scenes(&scene_pids, &layers)?;
        for pid in &scene_pids {
            self.claim(*pid, Owner::Model)?;
            scenes.insert_loaded(*pid);
        }
        scenes.set_active_loaded(active_scene);

        debug!(
            materials = materials.count(),
            layers = layers.count(),
            definitions = definitions.count(),
            scenes = scenes.count(),
            "model rebuilt"
        );

        Ok(Model {
            registry: self.registry,
            root,
            materials,
            layers,
            definitions,
            scenes,
            fonts,
            attributes,
            settings,
            name,
            description,
            units,
            version,
            guid,
            path: None,
            notifications: self.notifications,
        })
    }

    fn register(&mut self, entity: EntityType) -> Result<PersistentId> {
        let pid = entity.pid();
        self.registry.register_with_pid(entity, pid)?;
        Ok(pid)
    }

    fn register_all(
        &mut self,
        entities: impl IntoIterator<Item = EntityType>,
    ) -> Result<Vec<PersistentId>> {
        entities.into_iter().map(|e| self.register(e)).collect()
    }

    fn claim(&mut self, pid: PersistentId, owner: Owner) -> Result<()> {
        self.registry.claim_ownership(pid, owner).map_err(|e| match e {
            ModelError::AlreadyOwned(pid) => {
                ModelError::ModelInvalid(format!("entity {pid} is owned twice"))
            }
            other => other,
        })
    }

    /// Report a dangling reference, or fail when repairs are not allowed
    fn dangling(&mut self, message: String) -> Result<()> {
        if self.config.failsafe {
            self.notifications
                .notify(NotificationType::Error, format!("{message}; repaired"));
            Ok(())
        } else {
            Err(ModelError::ModelInvalid(message))
        }
    }

    /// A private material must be claimed back by its owner
    fn claim_private_material(
        &mut self,
        pid: PersistentId,
        owner: PersistentId,
        materials: &mut Materials,
    ) -> Result<()> {
        let claimed_back = match self.registry.get(owner) {
            Some(EntityType::Layer(layer)) => layer.layer_material == Some(pid),
            Some(EntityType::Image(image)) => image.image_material == Some(pid),
            _ => false,
        };
        if claimed_back {
            return self.claim(pid, Owner::Entity(owner));
        }

        self.dangling(format!(
            "material {pid} names {owner} as owner, which does not hold it"
        ))?;
        self.claim(pid, Owner::Model)?;
        materials.insert_loaded(pid);
        Ok(())
    }

    fn check_private_material_refs(
        &mut self,
        layer_pids: &[PersistentId],
        placed: &[PersistentId],
    ) -> Result<()> {
        let holders = layer_pids.iter().chain(placed.iter()).copied();
        let mut broken = Vec::new();
        for holder in holders {
            let material = match self.registry.get(holder) {
                Some(EntityType::Layer(layer)) => layer.layer_material,
                Some(EntityType::Image(image)) => image.image_material,
                _ => None,
            };
            if let Some(material) = material {
                if self.registry.owner(material) != Some(Owner::Entity(holder)) {
                    broken.push((holder, material));
                }
            }
        }

        for (holder, material) in broken {
            self.dangling(format!(
                "{holder} refers to private material {material} it does not own"
            ))?;
            match self.registry.get_mut(holder) {
                Some(EntityType::Layer(layer)) => layer.layer_material = None,
                Some(EntityType::Image(image)) => image.image_material = None,
                _ => {}
            }
        }
        Ok(())
    }

    fn check_element_refs(
        &mut self,
        placed: &[PersistentId],
        layers: &Layers,
        materials: &Materials,
        definitions: &Definitions,
    ) -> Result<()> {
        for &pid in placed {
            let Some(entity) = self.registry.get(pid) else {
                continue;
            };
            let kind = entity.kind();

            if let Some(def) = entity.definition() {
                let expected = match kind {
                    EntityKind::Group => DefinitionKind::Group,
                    EntityKind::Image => DefinitionKind::Image,
                    _ => DefinitionKind::Component,
                };
                let matches = definitions.collection().contains(def)
                    && self
                        .registry
                        .get(def)
                        .and_then(EntityType::as_definition)
                        .is_some_and(|d| d.kind == expected);
                if !matches {
                    return Err(ModelError::ModelInvalid(format!(
                        "{kind} {pid} refers to {def}, which is not a {expected:?} definition"
                    )));
                }
            }

            let Some(drawing) = entity.drawing() else {
                continue;
            };
            let layer = drawing.layer;
            let material = drawing.material;
            let back_material = entity.as_face().and_then(|f| f.back_material);

            if !layers.collection().contains(layer) {
                self.dangling(format!("{kind} {pid} is on unknown layer {layer}"))?;
                if let Some(d) = self.registry.get_mut(pid).and_then(EntityType::drawing_mut) {
                    d.layer = layers.default_layer();
                }
            }
            if let Some(m) = material.filter(|m| !materials.collection().contains(*m)) {
                self.dangling(format!("{kind} {pid} uses unknown material {m}"))?;
                if let Some(d) = self.registry.get_mut(pid).and_then(EntityType::drawing_mut) {
                    d.material = None;
                }
            }
            if let Some(m) = back_material.filter(|m| !materials.collection().contains(*m)) {
                self.dangling(format!("face {pid} uses unknown back material {m}"))?;
                if let Some(f) = self.registry.get_mut(pid).and_then(EntityType::as_face_mut) {
                    f.back_material = None;
                }
            }
        }
        Ok(())
    }

    /// Definitions must not contain themselves, directly or through other
    /// definitions. Depth-first with an explicit stack, since the nesting
    /// depth comes from the file.
    fn check_definition_cycles(&self, definition_pids: &[PersistentId]) -> Result<()> {
        let mut state: AHashMap<PersistentId, Visit> = AHashMap::new();
        for &start in definition_pids {
            if state.contains_key(&start) {
                continue;
            }
            state.insert(start, Visit::Active);
            let mut stack = vec![(start, self.nested_definitions(start), 0usize)];
            while let Some((def, children, next)) = stack.last_mut() {
                let Some(&child) = children.get(*next) else {
                    state.insert(*def, Visit::Done);
                    stack.pop();
                    continue;
                };
                *next += 1;
                match state.get(&child) {
                    Some(Visit::Done) => {}
                    Some(Visit::Active) => {
                        return Err(ModelError::ModelInvalid(format!(
                            "definition {child} contains itself"
                        )))
                    }
                    None => {
                        state.insert(child, Visit::Active);
                        let nested = self.nested_definitions(child);
                        stack.push((child, nested, 0));
                    }
                }
            }
        }
        Ok(())
    }

    /// Definitions placed directly inside `def`
    fn nested_definitions(&self, def: PersistentId) -> Vec<PersistentId> {
        self.registry
            .get(def)
            .and_then(EntityType::as_definition)
            .map(|d| {
                d.entities
                    .iter()
                    .filter_map(|pid| self.registry.get(pid).and_then(EntityType::definition))
                    .collect()
            })
            .unwrap_or_default()
    }

    fn check_scenes(&mut self, scene_pids: &[PersistentId], layers: &Layers) -> Result<()> {
        let mut names: AHashSet<String> = AHashSet::new();
        for &pid in scene_pids {
            let Some(scene) = self.registry.get(pid).and_then(EntityType::as_scene) else {
                continue;
            };
            let name = scene.name.clone();
            let unknown: Vec<PersistentId> = scene
                .layer_visibility
                .keys()
                .copied()
                .filter(|layer| !layers.collection().contains(*layer))
                .collect();

            if !names.insert(name.clone()) {
                if self.config.enforce_unique_scene_names {
                    return Err(ModelError::ModelInvalid(format!(
                        "scene name '{name}' is used more than once"
                    )));
                }
                self.notifications.notify(
                    NotificationType::Warning,
                    format!("scene name '{name}' is used more than once"),
                );
            }

            if unknown.is_empty() {
                continue;
            }
            self.dangling(format!(
                "scene '{name}' overrides {} unknown layer(s)",
                unknown.len()
            ))?;
            if let Some(scene) = self.registry.get_mut(pid).and_then(EntityType::as_scene_mut) {
                scene
                    .layer_visibility
                    .retain(|layer, _| !unknown.contains(layer));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Visit {
    Active,
    Done,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{ComponentInstance, Edge};
    use crate::error::ErrorKind;
    use crate::types::Point3;

    fn layer(pid: i64, name: &str) -> Layer {
        let mut layer = Layer::new(name);
        layer.common.pid = PersistentId::new(pid);
        layer
    }

    fn edge_on(pid: i64, layer: i64) -> ElementRecord {
        let mut edge = Edge::new(Point3::origin(), Point3::new(1.0, 0.0, 0.0));
        edge.common.pid = PersistentId::new(pid);
        edge.drawing.layer = PersistentId::new(layer);
        ElementRecord {
            container: ROOT_CONTAINER,
            entity: EntityType::Edge(edge),
        }
    }

    fn records() -> ModelRecords {
        ModelRecords {
            default_layer: PersistentId::new(1),
            layers: vec![layer(1, "Layer0"), layer(2, "Walls")],
            elements: vec![edge_on(3, 2)],
            ..Default::default()
        }
    }

    fn build(records: ModelRecords, config: ReaderConfiguration) -> Result<Model> {
        ModelBuilder::new(config, NotificationCollection::new())
            .build(records, FileVersion::new(20, 0, 0))
    }

    #[test]
    fn test_build_restores_pids_and_ownership() {
        let model = build(records(), ReaderConfiguration::default()).unwrap();
        assert_eq!(model.default_layer(), PersistentId::new(1));
        assert!(model.root().contains(PersistentId::new(3)));
        assert_eq!(
            model.owner_of(PersistentId::new(3)),
            Some(Owner::Container(ContainerId::Root))
        );
        assert_eq!(model.registry().next_pid(), PersistentId::new(4));
    }

    #[test]
    fn test_duplicate_pid_is_invalid() {
        let mut r = records();
        r.elements.push(edge_on(2, 1));
        let err = build(r, ReaderConfiguration::default()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ModelInvalid);
    }

    #[test]
    fn test_dangling_layer_fails_or_is_repaired() {
        let mut r = records();
        r.elements.push(edge_on(4, 42));
        let err = build(r.clone(), ReaderConfiguration::default()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ModelInvalid);

        let config = ReaderConfiguration {
            failsafe: true,
            ..Default::default()
        };
        let model = build(r, config).unwrap();
        let edge = model.entity(PersistentId::new(4)).unwrap();
        assert_eq!(edge.drawing().unwrap().layer, PersistentId::new(1));
        assert!(model.notifications.has_type(NotificationType::Error));
    }

    #[test]
    fn test_self_containing_definition_is_invalid() {
        let mut r = records();
        let mut def = ComponentDefinition::component("Loop");
        def.common.pid = PersistentId::new(10);
        r.definitions.push(def);

        let mut inst = ComponentInstance::new(PersistentId::new(10));
        inst.common.pid = PersistentId::new(11);
        inst.drawing.layer = PersistentId::new(1);
        r.elements.push(ElementRecord {
            container: 10,
            entity: EntityType::ComponentInstance(inst),
        });

        let err = build(r, ReaderConfiguration::default()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ModelInvalid);
    }

    #[test]
    fn test_deeply_nested_definitions_load() {
        const DEPTH: i64 = 50_000;
        let mut r = records();
        for level in 0..DEPTH {
            let mut def = ComponentDefinition::component(format!("Level{level}"));
            def.common.pid = PersistentId::new(100 + level);
            r.definitions.push(def);
        }
        // Level k places level k + 1; the root places level 0
        for level in 0..DEPTH {
            let mut inst = ComponentInstance::new(PersistentId::new(100 + level));
            inst.common.pid = PersistentId::new(100 + DEPTH + level);
            inst.drawing.layer = PersistentId::new(1);
            let container = if level == 0 { ROOT_CONTAINER } else { 100 + level - 1 };
            r.elements.push(ElementRecord {
                container,
                entity: EntityType::ComponentInstance(inst),
            });
        }

        let model = build(r, ReaderConfiguration::default()).unwrap();
        assert_eq!(model.num_component_definitions(), DEPTH as usize);
    }

    #[test]
    fn test_duplicate_scene_names_follow_policy() {
        let mut r = records();
        for pid in [20, 21] {
            let mut scene = Scene::new("Front");
            scene.common.pid = PersistentId::new(pid);
            r.scenes.push(scene);
        }

        let model = build(r.clone(), ReaderConfiguration::default()).unwrap();
        assert_eq!(model.num_scenes(), 2);
        assert!(model.notifications.has_type(NotificationType::Warning));

        let strict = ReaderConfiguration {
            enforce_unique_scene_names: true,
            ..Default::default()
        };
        assert_eq!(build(r, strict).unwrap_err().kind(), ErrorKind::ModelInvalid);
    }
}
