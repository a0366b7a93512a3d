//! Instance path resolution
//!
//! The same definition can be placed many times, so a PID inside a
//! definition does not pin down one occurrence of geometry. An instance path
//! does: it lists the instance and group hops from the root container down to
//! the leaf entity.

use std::fmt;

use crate::entities::{EntityKind, EntityType};
use crate::error::{ModelError, Result};
use crate::registry::{EntityRegistry, Owner};
use crate::scene_graph::{ContainerId, Entities};
use crate::settings::RenderingOptions;
use crate::types::{PersistentId, PidPath, Transform};

/// A chain of instance hops ending in a leaf entity
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InstancePath {
    hops: Vec<PersistentId>,
    leaf: PersistentId,
}

impl InstancePath {
    /// Create a new instance path
    pub fn new(hops: Vec<PersistentId>, leaf: PersistentId) -> Self {
        InstancePath { hops, leaf }
    }

    /// Instance and group hops, outermost first
    pub fn hops(&self) -> &[PersistentId] {
        &self.hops
    }

    /// Get the entity the path ends at
    pub fn leaf(&self) -> PersistentId {
        self.leaf
    }

    /// Number of instancing levels above the leaf
    pub fn depth(&self) -> usize {
        self.hops.len()
    }

    /// Hops and leaf as a PID path
    pub fn to_pid_path(&self) -> PidPath {
        let mut pids = self.hops.clone();
        pids.push(self.leaf);
        PidPath::new(pids)
    }

    /// Accumulated transform of all hops
    pub fn transform(&self, registry: &EntityRegistry) -> Transform {
        self.hops
            .iter()
            .filter_map(|pid| registry.get(*pid).and_then(EntityType::as_instance))
            .fold(Transform::identity(), |acc, inst| acc * inst.transform)
    }
}

impl fmt::Display for InstancePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_pid_path())
    }
}

/// Outcome of resolving a PID or PID path
#[derive(Debug, Clone, PartialEq)]
pub enum PathResolution {
    /// Every hop was found
    Resolved(InstancePath),
    /// Some hops were found but the chain breaks; the path holds the part
    /// that could be traced and is not usable as an occurrence
    PartiallyTraced(InstancePath),
    /// Nothing on the path exists in the model
    NotFound,
}

impl PathResolution {
    /// Check if every hop resolved
    pub fn is_resolved(&self) -> bool {
        matches!(self, PathResolution::Resolved(_))
    }

    /// The path, if it fully resolved
    pub fn resolved(self) -> Option<InstancePath> {
        match self {
            PathResolution::Resolved(p) => Some(p),
            _ => None,
        }
    }
}

fn container<'a>(
    registry: &'a EntityRegistry,
    root: &'a Entities,
    id: ContainerId,
) -> Option<&'a Entities> {
    match id {
        ContainerId::Root => Some(root),
        ContainerId::Definition(def) => registry
            .get(def)
            .and_then(EntityType::as_definition)
            .map(|d| &d.entities),
    }
}

/// Trace a PID path downward from the root container.
///
/// Every element but the last must be an instance or group placed in the
/// container of the element before it.
pub fn resolve_path(registry: &EntityRegistry, root: &Entities, path: &PidPath) -> PathResolution {
    let pids = path.pids();
    let mut traced: Vec<PersistentId> = Vec::new();
    let mut current = ContainerId::Root;

    for (index, &pid) in pids.iter().enumerate() {
        let is_leaf = index + 1 == pids.len();
        let member = container(registry, root, current).is_some_and(|c| c.contains(pid));
        let entity = registry.get(pid);

        let next = if is_leaf {
            None
        } else {
            entity.and_then(EntityType::as_instance).map(|i| i.definition)
        };
        if !member || entity.is_none() || (!is_leaf && next.is_none()) {
            return match traced.split_last() {
                None => PathResolution::NotFound,
                Some((leaf, hops)) => {
                    PathResolution::PartiallyTraced(InstancePath::new(hops.to_vec(), *leaf))
                }
            };
        }

        traced.push(pid);
        if let Some(def) = next {
            current = ContainerId::Definition(def);
        }
    }

    match traced.split_last() {
        Some((leaf, hops)) => PathResolution::Resolved(InstancePath::new(hops.to_vec(), *leaf)),
        None => PathResolution::NotFound,
    }
}

/// Walk outward from one entity to the root container.
///
/// When a definition is placed several times, the placed instance with the
/// lowest PID is taken. A chain that ends in a definition with no placed
/// instance is reported as partially traced.
pub fn path_to_root(registry: &EntityRegistry, pid: PersistentId) -> PathResolution {
    if !registry.contains(pid) {
        return PathResolution::NotFound;
    }

    let mut reversed_hops: Vec<PersistentId> = Vec::new();
    let mut current = pid;
    let mut seen_definitions: Vec<PersistentId> = Vec::new();

    loop {
        match registry.owner(current) {
            Some(Owner::Container(ContainerId::Root)) => {
                reversed_hops.reverse();
                return PathResolution::Resolved(InstancePath::new(reversed_hops, pid));
            }
            Some(Owner::Container(ContainerId::Definition(def))) => {
                if seen_definitions.contains(&def) {
                    break;
                }
                seen_definitions.push(def);

                let placed = registry.placements_of(def).find(|p| {
                    matches!(registry.owner(*p), Some(Owner::Container(_)))
                        && registry.get(*p).is_some_and(|e| e.kind() != EntityKind::Image)
                });
                match placed {
                    Some(inst) => {
                        reversed_hops.push(inst);
                        current = inst;
                    }
                    None => break,
                }
            }
            _ if current == pid => return PathResolution::NotFound,
            _ => break,
        }
    }

    reversed_hops.reverse();
    PathResolution::PartiallyTraced(InstancePath::new(reversed_hops, pid))
}

/// Whether the occurrence named by `path` is drawn.
///
/// Every hop and the leaf must sit on a visible layer. Hidden instances,
/// groups and images are drawn only with "draw hidden objects"; hidden edges
/// and faces only with "draw hidden geometry". Fails with `InvalidArgument`
/// if the path does not resolve in the model.
pub fn is_visible(
    registry: &EntityRegistry,
    root: &Entities,
    rendering: &RenderingOptions,
    path: &InstancePath,
) -> Result<bool> {
    if !resolve_path(registry, root, &path.to_pid_path()).is_resolved() {
        return Err(ModelError::InvalidArgument(format!(
            "instance path {path} is not valid in this model"
        )));
    }

    for pid in path.hops.iter().chain(std::iter::once(&path.leaf)) {
        let entity = registry.resolve(*pid)?;
        let Some(drawing) = entity.drawing() else {
            continue;
        };

        let layer_visible = registry
            .get(drawing.layer)
            .and_then(EntityType::as_layer)
            .map_or(true, |l| l.visible);
        if !layer_visible {
            return Ok(false);
        }

        if drawing.hidden {
            let shown = match entity.kind() {
                EntityKind::Edge | EntityKind::Face => rendering.draw_hidden_geometry(),
                _ => rendering.draw_hidden_objects(),
            };
            if !shown {
                return Ok(false);
            }
        }
    }
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{ComponentDefinition, ComponentInstance, Edge};
    use crate::types::Point3;

    /// root -> outer instance -> inner instance -> edge
    struct Nested {
        registry: EntityRegistry,
        root: Entities,
        outer: PersistentId,
        inner: PersistentId,
        edge: PersistentId,
    }

    fn nested() -> Nested {
        let mut registry = EntityRegistry::new();
        let edge = registry.register(EntityType::Edge(Edge::new(
            Point3::origin(),
            Point3::new(1.0, 0.0, 0.0),
        )));
        let leaf_def = registry.register(EntityType::ComponentDefinition(
            ComponentDefinition::component("Leaf"),
        ));
        let owner = Owner::Container(ContainerId::Definition(leaf_def));
        registry.claim_ownership(edge, owner).unwrap();
        registry
            .get_mut(leaf_def)
            .and_then(EntityType::as_definition_mut)
            .unwrap()
            .entities
            .insert(edge);

        let inner = registry.register(EntityType::ComponentInstance(ComponentInstance::new(leaf_def)));
        let outer_def = registry.register(EntityType::ComponentDefinition(
            ComponentDefinition::component("Outer"),
        ));
        registry
            .claim_ownership(inner, Owner::Container(ContainerId::Definition(outer_def)))
            .unwrap();
        registry
            .get_mut(outer_def)
            .and_then(EntityType::as_definition_mut)
            .unwrap()
            .entities
            .insert(inner);

        let outer = registry.register(EntityType::ComponentInstance(ComponentInstance::new(outer_def)));
        registry
            .claim_ownership(outer, Owner::Container(ContainerId::Root))
            .unwrap();
        let mut root = Entities::new();
        root.insert(outer);

        Nested {
            registry,
            root,
            outer,
            inner,
            edge,
        }
    }

    #[test]
    fn test_resolve_full_path() {
        let n = nested();
        let path: PidPath = format!("{}.{}.{}", n.outer, n.inner, n.edge).parse().unwrap();
        let resolved = resolve_path(&n.registry, &n.root, &path);
        assert_eq!(
            resolved,
            PathResolution::Resolved(InstancePath::new(vec![n.outer, n.inner], n.edge))
        );
    }

    #[test]
    fn test_partial_and_missing_paths() {
        let n = nested();
        let broken: PidPath = format!("{}.{}.999", n.outer, n.inner).parse().unwrap();
        assert_eq!(
            resolve_path(&n.registry, &n.root, &broken),
            PathResolution::PartiallyTraced(InstancePath::new(vec![n.outer], n.inner))
        );

        let missing: PidPath = "999.1".parse().unwrap();
        assert_eq!(resolve_path(&n.registry, &n.root, &missing), PathResolution::NotFound);
    }

    #[test]
    fn test_path_to_root() {
        let n = nested();
        assert_eq!(
            path_to_root(&n.registry, n.edge),
            PathResolution::Resolved(InstancePath::new(vec![n.outer, n.inner], n.edge))
        );
        assert_eq!(path_to_root(&n.registry, PersistentId::new(999)), PathResolution::NotFound);
    }

    #[test]
    fn test_visibility_respects_hidden_flags() {
        let mut n = nested();
        let path = InstancePath::new(vec![n.outer, n.inner], n.edge);
        let mut rendering = RenderingOptions::default();
        assert!(is_visible(&n.registry, &n.root, &rendering, &path).unwrap());

        n.registry.get_mut(n.inner).unwrap().drawing_mut().unwrap().hidden = true;
        assert!(!is_visible(&n.registry, &n.root, &rendering, &path).unwrap());
        rendering.set_draw_hidden_objects(true);
        assert!(is_visible(&n.registry, &n.root, &rendering, &path).unwrap());

        n.registry.get_mut(n.edge).unwrap().drawing_mut().unwrap().hidden = true;
        assert!(!is_visible(&n.registry, &n.root, &rendering, &path).unwrap());
        rendering.set_draw_hidden_geometry(true);
        assert!(is_visible(&n.registry, &n.root, &rendering, &path).unwrap());
    }

    #[test]
    fn test_visibility_of_invalid_path_fails() {
        let n = nested();
        let bogus = InstancePath::new(vec![n.inner], n.edge);
        assert!(is_visible(&n.registry, &n.root, &RenderingOptions::default(), &bogus).is_err());
    }
}
