//! Component instances and groups

use crate::entities::{DrawingCommon, EntityCommon};
use crate::types::{PersistentId, Point3, Transform, Vector3};

/// A placement of a component definition inside an entities container.
///
/// Groups use the same data; a group's definition has
/// [`DefinitionKind::Group`](crate::entities::DefinitionKind::Group).
#[derive(Debug, Clone, PartialEq)]
pub struct ComponentInstance {
    pub common: EntityCommon,
    pub drawing: DrawingCommon,
    /// The definition this instance places
    pub(crate) definition: PersistentId,
    /// Instance name (distinct from the definition name)
    pub name: String,
    /// Placement relative to the owning container
    pub transform: Transform,
    pub locked: bool,
}

/// Groups share the instance layout
pub type Group = ComponentInstance;

impl ComponentInstance {
    /// Create a new component instance
    pub fn new(definition: PersistentId) -> Self {
        ComponentInstance {
            common: EntityCommon::default(),
            drawing: DrawingCommon::default(),
            definition,
            name: String::new(),
            transform: Transform::identity(),
            locked: false,
        }
    }

    /// Set the placement transform
    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }

    /// Set the instance name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// The definition this instance places
    pub fn definition(&self) -> PersistentId {
        self.definition
    }

    /// Translation-only placement
    pub fn translation(offset: Vector3) -> Transform {
        Transform::new_translation(&offset)
    }

    /// Map a point from definition space into the parent container
    pub fn transform_point(&self, point: &Point3) -> Point3 {
        self.transform.transform_point(point)
    }
}
