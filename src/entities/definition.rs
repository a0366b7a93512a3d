//! Component definitions

use crate::entities::EntityCommon;
use crate::scene_graph::Entities;
use crate::types::Point3;

/// What a definition defines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum DefinitionKind {
    #[default]
    Component = 0,
    Group = 1,
    Image = 2,
}

impl DefinitionKind {
    /// Decode from the stored byte
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(DefinitionKind::Component),
            1 => Some(DefinitionKind::Group),
            2 => Some(DefinitionKind::Image),
            _ => None,
        }
    }
}

/// A named, reusable piece of geometry.
///
/// The definition exclusively owns its private entities container; any
/// number of instances reference it.
#[derive(Debug, Clone, PartialEq)]
pub struct ComponentDefinition {
    pub common: EntityCommon,
    pub name: String,
    pub description: String,
    pub(crate) kind: DefinitionKind,
    pub insertion_point: Point3,
    /// Instances always face the camera
    pub always_face_camera: bool,
    pub(crate) entities: Entities,
}

impl ComponentDefinition {
    /// Create a new component definition
    pub fn new(name: impl Into<String>, kind: DefinitionKind) -> Self {
        ComponentDefinition {
            common: EntityCommon::default(),
            name: name.into(),
            description: String::new(),
            kind,
            insertion_point: Point3::origin(),
            always_face_camera: false,
            entities: Entities::new(),
        }
    }

    /// Create a component definition
    pub fn component(name: impl Into<String>) -> Self {
        Self::new(name, DefinitionKind::Component)
    }

    /// Create a group definition
    pub fn group(name: impl Into<String>) -> Self {
        Self::new(name, DefinitionKind::Group)
    }

    /// Get the kind
    pub fn kind(&self) -> DefinitionKind {
        self.kind
    }

    /// The private container holding the definition's geometry
    pub fn entities(&self) -> &Entities {
        &self.entities
    }
}
