//! Entity types
//!
//! Every entity placed in, or referenced by, a model is one variant of the
//! closed [`EntityType`] sum type. All variants share an [`EntityCommon`]
//! (persistent ID + attribute dictionaries); drawable ones additionally carry
//! a [`DrawingCommon`] with their layer/material references.

use std::fmt;

use crate::attributes::AttributeDictionaries;
use crate::types::PersistentId;

pub mod definition;
pub mod edge;
pub mod face;
pub mod font;
pub mod image;
pub mod instance;
pub mod layer;
pub mod material;
pub mod scene;

pub use definition::{ComponentDefinition, DefinitionKind};
pub use edge::Edge;
pub use face::Face;
pub use font::Font;
pub use image::Image;
pub use instance::{ComponentInstance, Group};
pub use layer::Layer;
pub use material::{Material, Texture};
pub use scene::{Scene, SceneFlags};

/// Kind tag of an entity.
///
/// The first eight kinds are the statistics kinds; their order is part of
/// the interchange format and must not change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum EntityKind {
    Edge = 0,
    Face = 1,
    ComponentInstance = 2,
    Group = 3,
    Image = 4,
    ComponentDefinition = 5,
    Layer = 6,
    Material = 7,
    Scene = 8,
    Font = 9,
}

impl EntityKind {
    /// Kinds counted by model statistics, in slot order
    pub const STATISTICS: [EntityKind; 8] = [
        EntityKind::Edge,
        EntityKind::Face,
        EntityKind::ComponentInstance,
        EntityKind::Group,
        EntityKind::Image,
        EntityKind::ComponentDefinition,
        EntityKind::Layer,
        EntityKind::Material,
    ];

    /// Slot of this kind in [`ModelStatistics`](crate::model::ModelStatistics)
    pub fn statistics_index(&self) -> Option<usize> {
        let index = *self as usize;
        (index < Self::STATISTICS.len()).then_some(index)
    }

    /// Decode from the stored byte
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(EntityKind::Edge),
            1 => Some(EntityKind::Face),
            2 => Some(EntityKind::ComponentInstance),
            3 => Some(EntityKind::Group),
            4 => Some(EntityKind::Image),
            5 => Some(EntityKind::ComponentDefinition),
            6 => Some(EntityKind::Layer),
            7 => Some(EntityKind::Material),
            8 => Some(EntityKind::Scene),
            9 => Some(EntityKind::Font),
            _ => None,
        }
    }

    /// Edges, faces, instances, groups and images
    pub fn is_drawing_element(&self) -> bool {
        matches!(
            self,
            EntityKind::Edge
                | EntityKind::Face
                | EntityKind::ComponentInstance
                | EntityKind::Group
                | EntityKind::Image
        )
    }

    /// Get the display name
    pub fn name(&self) -> &'static str {
        match self {
            EntityKind::Edge => "Edge",
            EntityKind::Face => "Face",
            EntityKind::ComponentInstance => "ComponentInstance",
            EntityKind::Group => "Group",
            EntityKind::Image => "Image",
            EntityKind::ComponentDefinition => "ComponentDefinition",
            EntityKind::Layer => "Layer",
            EntityKind::Material => "Material",
            EntityKind::Scene => "Scene",
            EntityKind::Font => "Font",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Identity shared by all entities
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EntityCommon {
    /// Persistent ID, assigned by the registry
    pub(crate) pid: PersistentId,
    /// Attached attribute dictionaries
    pub attributes: AttributeDictionaries,
}

/// Placement data shared by drawing elements
#[derive(Debug, Clone, PartialEq)]
pub struct DrawingCommon {
    /// Layer the element is on. Removing that layer moves the element to the
    /// default layer.
    pub(crate) layer: PersistentId,
    /// Shared material; cleared when the material is removed from the model
    pub(crate) material: Option<PersistentId>,
    pub hidden: bool,
    pub casts_shadows: bool,
    pub receives_shadows: bool,
}

impl EntityCommon {
    /// Get the persistent ID
    pub fn pid(&self) -> PersistentId {
        self.pid
    }
}

impl DrawingCommon {
    /// Drawing fields for an element on `layer`
    pub fn on_layer(layer: PersistentId) -> Self {
        DrawingCommon {
            layer,
            material: None,
            hidden: false,
            casts_shadows: true,
            receives_shadows: true,
        }
    }

    /// Layer the element is on; NULL until the element is placed
    pub fn layer(&self) -> PersistentId {
        self.layer
    }

    /// Get the front material
    pub fn material(&self) -> Option<PersistentId> {
        self.material
    }
}

impl Default for DrawingCommon {
    fn default() -> Self {
        Self::on_layer(PersistentId::NULL)
    }
}

/// Enumeration of all entity types for type-safe storage
#[derive(Debug, Clone, PartialEq)]
pub enum EntityType {
    Edge(Edge),
    Face(Face),
    ComponentInstance(ComponentInstance),
    Group(Group),
    Image(Image),
    ComponentDefinition(ComponentDefinition),
    Layer(Layer),
    Material(Material),
    Scene(Scene),
    Font(Font),
}

impl EntityType {
    /// Get the kind
    pub fn kind(&self) -> EntityKind {
        match self {
            EntityType::Edge(_) => EntityKind::Edge,
            EntityType::Face(_) => EntityKind::Face,
            EntityType::ComponentInstance(_) => EntityKind::ComponentInstance,
            EntityType::Group(_) => EntityKind::Group,
            EntityType::Image(_) => EntityKind::Image,
            EntityType::ComponentDefinition(_) => EntityKind::ComponentDefinition,
            EntityType::Layer(_) => EntityKind::Layer,
            EntityType::Material(_) => EntityKind::Material,
            EntityType::Scene(_) => EntityKind::Scene,
            EntityType::Font(_) => EntityKind::Font,
        }
    }

    /// Shared fields
    pub fn common(&self) -> &EntityCommon {
        match self {
            EntityType::Edge(e) => &e.common,
            EntityType::Face(e) => &e.common,
            EntityType::ComponentInstance(e) => &e.common,
            EntityType::Group(e) => &e.common,
            EntityType::Image(e) => &e.common,
            EntityType::ComponentDefinition(e) => &e.common,
            EntityType::Layer(e) => &e.common,
            EntityType::Material(e) => &e.common,
            EntityType::Scene(e) => &e.common,
            EntityType::Font(e) => &e.common,
        }
    }

    /// Mutable shared fields
    pub fn common_mut(&mut self) -> &mut EntityCommon {
        match self {
            EntityType::Edge(e) => &mut e.common,
            EntityType::Face(e) => &mut e.common,
            EntityType::ComponentInstance(e) => &mut e.common,
            EntityType::Group(e) => &mut e.common,
            EntityType::Image(e) => &mut e.common,
            EntityType::ComponentDefinition(e) => &mut e.common,
            EntityType::Layer(e) => &mut e.common,
            EntityType::Material(e) => &mut e.common,
            EntityType::Scene(e) => &mut e.common,
            EntityType::Font(e) => &mut e.common,
        }
    }

    /// Get the persistent ID
    pub fn pid(&self) -> PersistentId {
        self.common().pid
    }

    /// Placement data, for drawing elements only
    pub fn drawing(&self) -> Option<&DrawingCommon> {
        match self {
            EntityType::Edge(e) => Some(&e.drawing),
            EntityType::Face(e) => Some(&e.drawing),
            EntityType::ComponentInstance(e) | EntityType::Group(e) => Some(&e.drawing),
            EntityType::Image(e) => Some(&e.drawing),
            _ => None,
        }
    }

    /// Mutable drawing fields, for drawing elements only
    pub fn drawing_mut(&mut self) -> Option<&mut DrawingCommon> {
        match self {
            EntityType::Edge(e) => Some(&mut e.drawing),
            EntityType::Face(e) => Some(&mut e.drawing),
            EntityType::ComponentInstance(e) | EntityType::Group(e) => Some(&mut e.drawing),
            EntityType::Image(e) => Some(&mut e.drawing),
            _ => None,
        }
    }

    /// Name of named kinds (definitions, layers, materials, scenes, fonts,
    /// and instances)
    pub fn name(&self) -> Option<&str> {
        match self {
            EntityType::ComponentInstance(e) | EntityType::Group(e) => Some(&e.name),
            EntityType::ComponentDefinition(e) => Some(&e.name),
            EntityType::Layer(e) => Some(&e.name),
            EntityType::Material(e) => Some(&e.name),
            EntityType::Scene(e) => Some(&e.name),
            EntityType::Font(e) => Some(&e.face_name),
            _ => None,
        }
    }

    /// Definition referenced by an instance, group or image
    pub fn definition(&self) -> Option<PersistentId> {
        match self {
            EntityType::ComponentInstance(e) | EntityType::Group(e) => Some(e.definition),
            EntityType::Image(e) => Some(e.definition),
            _ => None,
        }
    }

    /// Borrow as a face, if it is one
    pub fn as_face(&self) -> Option<&Face> {
        match self {
            EntityType::Face(f) => Some(f),
            _ => None,
        }
    }

    /// Mutably borrow as a face, if it is one
    pub fn as_face_mut(&mut self) -> Option<&mut Face> {
        match self {
            EntityType::Face(f) => Some(f),
            _ => None,
        }
    }

    /// Borrow as a edge, if it is one
    pub fn as_edge(&self) -> Option<&Edge> {
        match self {
            EntityType::Edge(e) => Some(e),
            _ => None,
        }
    }

    /// Borrow as a definition, if it is one
    pub fn as_definition(&self) -> Option<&ComponentDefinition> {
        match self {
            EntityType::ComponentDefinition(d) => Some(d),
            _ => None,
        }
    }

    /// Mutably borrow as a definition, if it is one
    pub fn as_definition_mut(&mut self) -> Option<&mut ComponentDefinition> {
        match self {
            EntityType::ComponentDefinition(d) => Some(d),
            _ => None,
        }
    }

    /// Borrow as a layer, if it is one
    pub fn as_layer(&self) -> Option<&Layer> {
        match self {
            EntityType::Layer(l) => Some(l),
            _ => None,
        }
    }

    /// Mutably borrow as a layer, if it is one
    pub fn as_layer_mut(&mut self) -> Option<&mut Layer> {
        match self {
            EntityType::Layer(l) => Some(l),
            _ => None,
        }
    }

    /// Borrow as a material, if it is one
    pub fn as_material(&self) -> Option<&Material> {
        match self {
            EntityType::Material(m) => Some(m),
            _ => None,
        }
    }

    /// Mutably borrow as a material, if it is one
    pub fn as_material_mut(&mut self) -> Option<&mut Material> {
        match self {
            EntityType::Material(m) => Some(m),
            _ => None,
        }
    }

    /// Borrow as a scene, if it is one
    pub fn as_scene(&self) -> Option<&Scene> {
        match self {
            EntityType::Scene(s) => Some(s),
            _ => None,
        }
    }

    /// Mutably borrow as a scene, if it is one
    pub fn as_scene_mut(&mut self) -> Option<&mut Scene> {
        match self {
            EntityType::Scene(s) => Some(s),
            _ => None,
        }
    }

    /// Borrow as a font, if it is one
    pub fn as_font(&self) -> Option<&Font> {
        match self {
            EntityType::Font(f) => Some(f),
            _ => None,
        }
    }

    /// Instance or group data
    pub fn as_instance(&self) -> Option<&ComponentInstance> {
        match self {
            EntityType::ComponentInstance(i) | EntityType::Group(i) => Some(i),
            _ => None,
        }
    }

    /// Mutably borrow as a instance, if it is one
    pub fn as_instance_mut(&mut self) -> Option<&mut ComponentInstance> {
        match self {
            EntityType::ComponentInstance(i) | EntityType::Group(i) => Some(i),
            _ => None,
        }
    }

    /// Borrow as a image, if it is one
    pub fn as_image(&self) -> Option<&Image> {
        match self {
            EntityType::Image(i) => Some(i),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Point3;

    #[test]
    fn test_statistics_order_is_fixed() {
        let indices: Vec<_> = EntityKind::STATISTICS
            .iter()
            .map(|k| k.statistics_index().unwrap())
            .collect();
        assert_eq!(indices, vec![0, 1, 2, 3, 4, 5, 6, 7]);
        assert_eq!(EntityKind::Scene.statistics_index(), None);
        assert_eq!(EntityKind::Font.statistics_index(), None);
    }

    #[test]
    fn test_drawing_element_kinds() {
        assert!(EntityKind::Face.is_drawing_element());
        assert!(EntityKind::Group.is_drawing_element());
        assert!(!EntityKind::Layer.is_drawing_element());
        assert!(!EntityKind::ComponentDefinition.is_drawing_element());
    }

    #[test]
    fn test_entity_type_dispatch() {
        let mut e = EntityType::Edge(Edge::new(
            Point3::origin(),
            Point3::new(1.0, 0.0, 0.0),
        ));
        e.common_mut().pid = PersistentId::new(5);
        assert_eq!(e.pid(), PersistentId::new(5));
        assert_eq!(e.kind(), EntityKind::Edge);
        assert!(e.drawing().is_some());
        assert!(e.name().is_none());

        let layer = EntityType::Layer(Layer::new("Walls"));
        assert!(layer.drawing().is_none());
        assert_eq!(layer.name(), Some("Walls"));
    }
}
