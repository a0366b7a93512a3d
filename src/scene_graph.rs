//! Entities containers
//!
//! A container holds the PIDs of the drawing elements it exclusively owns,
//! in insertion order. The elements themselves live in the
//! [`EntityRegistry`](crate::registry::EntityRegistry). There are two
//! flavors: the model's root container, and the private container of each
//! component definition.

use std::fmt;

use ahash::{AHashMap, AHashSet};
use indexmap::IndexSet;

use crate::entities::EntityType;
use crate::registry::EntityRegistry;
use crate::types::{BoundingBox3D, PersistentId, Point3};

/// Identifies an entities container within a model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContainerId {
    /// The model's root container
    Root,
    /// The private container of a component definition
    Definition(PersistentId),
}

impl fmt::Display for ContainerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContainerId::Root => f.write_str("root"),
            ContainerId::Definition(pid) => write!(f, "definition {pid}"),
        }
    }
}

/// Ordered set of drawing elements owned by one container
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Entities {
    members: IndexSet<PersistentId>,
}

impl Entities {
    /// Create an empty container
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns false if the element was already a member
    pub(crate) fn insert(&mut self, pid: PersistentId) -> bool {
        self.members.insert(pid)
    }

    /// Remove a member, keeping the order of the rest
    pub(crate) fn remove(&mut self, pid: PersistentId) -> bool {
        self.members.shift_remove(&pid)
    }

    /// Check if `pid` is a member
    pub fn contains(&self, pid: PersistentId) -> bool {
        self.members.contains(&pid)
    }

    /// Get the number of members
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Check if the container is empty
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Member PIDs in insertion order.
    ///
    /// Every call starts a fresh walk; walks do not affect each other.
    pub fn iter(&self) -> impl Iterator<Item = PersistentId> + '_ {
        self.members.iter().copied()
    }

    /// Resolve members against the registry, skipping any that are gone
    pub fn resolve<'a>(
        &'a self,
        registry: &'a EntityRegistry,
    ) -> impl Iterator<Item = &'a EntityType> + 'a {
        self.members.iter().filter_map(move |pid| registry.get(*pid))
    }

    /// Bounding box of the container's geometry, in container space.
    ///
    /// Instances contribute the transformed corners of their definition's
    /// bounds. Returns `None` for a container with no geometry.
    pub fn bounds(&self, registry: &EntityRegistry) -> Option<BoundingBox3D> {
        let nested = nested_definition_bounds(self, registry);
        local_bounds(self, registry, &nested)
    }
}

/// Definitions placed directly in `entities`
fn placed_definitions<'a>(
    entities: &'a Entities,
    registry: &'a EntityRegistry,
) -> impl Iterator<Item = PersistentId> + 'a {
    entities
        .resolve(registry)
        .filter_map(|e| e.as_instance().map(|i| i.definition))
}

/// Bounds of every definition placed from `entities` at any depth.
///
/// Post-order walk with an explicit stack; a definition that contains
/// itself contributes nothing to its own bounds.
fn nested_definition_bounds(
    entities: &Entities,
    registry: &EntityRegistry,
) -> AHashMap<PersistentId, Option<BoundingBox3D>> {
    let mut done: AHashMap<PersistentId, Option<BoundingBox3D>> = AHashMap::new();
    let mut active: AHashSet<PersistentId> = AHashSet::new();
    let mut stack: Vec<(PersistentId, bool)> = placed_definitions(entities, registry)
        .map(|def| (def, false))
        .collect();

    while let Some((def, expanded)) = stack.pop() {
        if done.contains_key(&def) {
            continue;
        }
        let Some(d) = registry.get(def).and_then(EntityType::as_definition) else {
            done.insert(def, None);
            continue;
        };
        if expanded {
            active.remove(&def);
            let bounds = local_bounds(&d.entities, registry, &done);
            done.insert(def, bounds);
        } else if active.insert(def) {
            stack.push((def, true));
            for child in placed_definitions(&d.entities, registry) {
                if !done.contains_key(&child) && !active.contains(&child) {
                    stack.push((child, false));
                }
            }
        }
    }
    done
}

/// Bounds of one container, taking placed definitions from `definitions`
fn local_bounds(
    entities: &Entities,
    registry: &EntityRegistry,
    definitions: &AHashMap<PersistentId, Option<BoundingBox3D>>,
) -> Option<BoundingBox3D> {
    let mut result: Option<BoundingBox3D> = None;
    let mut merge = |bbox: BoundingBox3D| {
        result = Some(match result {
            Some(r) => r.merge(&bbox),
            None => bbox,
        });
    };

    for entity in entities.resolve(registry) {
        match entity {
            EntityType::Edge(e) => merge(e.bounding_box()),
            EntityType::Face(f) => {
                if let Some(b) = f.bounding_box() {
                    merge(b);
                }
            }
            EntityType::ComponentInstance(inst) | EntityType::Group(inst) => {
                let Some(inner) = definitions.get(&inst.definition).copied().flatten() else {
                    continue;
                };
                let corners = box_corners(&inner).map(|p| inst.transform_point(&p));
                if let Some(b) = BoundingBox3D::from_points(corners.iter()) {
                    merge(b);
                }
            }
            EntityType::Image(img) => {
                let corners = [
                    Point3::origin(),
                    Point3::new(img.width, 0.0, 0.0),
                    Point3::new(img.width, img.height, 0.0),
                    Point3::new(0.0, img.height, 0.0),
                ]
                .map(|p| img.transform.transform_point(&p));
                if let Some(b) = BoundingBox3D::from_points(corners.iter()) {
                    merge(b);
                }
            }
            _ => {}
        }
    }
    result
}

fn box_corners(bbox: &BoundingBox3D) -> [Point3; 8] {
    let (a, b) = (bbox.min, bbox.max);
    [
        Point3::new(a.x, a.y, a.z),
        Point3::new(b.x, a.y, a.z),
        Point3::new(a.x, b.y, a.z),
        Point3::new(b.x, b.y, a.z),
        Point3::new(a.x, a.y, b.z),
        Point3::new(b.x, a.y, b.z),
        Point3::new(a.x, b.y, b.z),
        Point3::new(b.x, b.y, b.z),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{ComponentDefinition, ComponentInstance, Edge};
    use crate::types::Vector3;

    #[test]
    fn test_iteration_is_restartable() {
        let mut entities = Entities::new();
        for i in 1..=3 {
            entities.insert(PersistentId::new(i));
        }

        let mut first = entities.iter();
        let second: Vec<_> = entities.iter().collect();
        assert_eq!(first.next(), Some(PersistentId::new(1)));
        assert_eq!(second.len(), 3);
        assert_eq!(first.count(), 2);
    }

    #[test]
    fn test_remove_keeps_order() {
        let mut entities = Entities::new();
        for i in 1..=4 {
            entities.insert(PersistentId::new(i));
        }
        assert!(entities.remove(PersistentId::new(2)));
        assert!(!entities.remove(PersistentId::new(2)));
        let order: Vec<i64> = entities.iter().map(|p| p.value()).collect();
        assert_eq!(order, vec![1, 3, 4]);
    }

    #[test]
    fn test_bounds_through_instance() {
        let mut registry = EntityRegistry::new();
        let edge = registry.register(EntityType::Edge(Edge::new(
            Point3::origin(),
            Point3::new(1.0, 1.0, 1.0),
        )));
        let mut def = ComponentDefinition::component("Cube");
        def.entities.insert(edge);
        let def_pid = registry.register(EntityType::ComponentDefinition(def));

        let inst = ComponentInstance::new(def_pid)
            .with_transform(ComponentInstance::translation(Vector3::new(10.0, 0.0, 0.0)));
        let inst_pid = registry.register(EntityType::ComponentInstance(inst));

        let mut root = Entities::new();
        root.insert(inst_pid);
        let bbox = root.bounds(&registry).unwrap();
        assert_eq!(bbox.min, Point3::new(10.0, 0.0, 0.0));
        assert_eq!(bbox.max, Point3::new(11.0, 1.0, 1.0));

        assert!(Entities::new().bounds(&registry).is_none());
    }

    #[test]
    fn test_bounds_of_deep_nesting() {
        const DEPTH: usize = 50_000;
        let mut registry = EntityRegistry::new();
        let edge = registry.register(EntityType::Edge(Edge::new(
            Point3::origin(),
            Point3::new(1.0, 0.0, 0.0),
        )));
        let mut level = Entities::new();
        level.insert(edge);
        for _ in 0..DEPTH {
            let mut def = ComponentDefinition::component("Level");
            def.entities = level;
            let def_pid = registry.register(EntityType::ComponentDefinition(def));
            let inst = ComponentInstance::new(def_pid)
                .with_transform(ComponentInstance::translation(Vector3::new(1.0, 0.0, 0.0)));
            level = Entities::new();
            level.insert(registry.register(EntityType::ComponentInstance(inst)));
        }

        let bbox = level.bounds(&registry).unwrap();
        assert_eq!(bbox.min.x, DEPTH as f64);
        assert_eq!(bbox.max.x, DEPTH as f64 + 1.0);
    }
}
