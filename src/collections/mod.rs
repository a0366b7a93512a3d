//! Collection managers
//!
//! Each manager is a typed, ordered set of PIDs for one entity kind, owned by
//! the model. The entities themselves live in the registry; managers enforce
//! the add/remove rules of their kind and take the registry as the context
//! of every mutating call.

use ahash::AHashSet;
use indexmap::IndexSet;

use crate::entities::{DefinitionKind, EntityKind, EntityType};
use crate::error::{ModelError, Result};
use crate::registry::{EntityRegistry, Owner};
use crate::scene_graph::{ContainerId, Entities};
use crate::types::PersistentId;

pub mod definitions;
pub mod fonts;
pub mod layers;
pub mod materials;
pub mod scenes;

pub use definitions::Definitions;
pub use fonts::Fonts;
pub use layers::Layers;
pub use materials::Materials;
pub use scenes::Scenes;

/// Ordered set of model-owned entities of one kind
#[derive(Debug, Clone, PartialEq)]
pub struct Collection {
    kind: EntityKind,
    members: IndexSet<PersistentId>,
}

impl Collection {
    /// Create an empty collection of one kind
    pub fn new(kind: EntityKind) -> Self {
        Collection {
            kind,
            members: IndexSet::new(),
        }
    }

    /// Get the entity kind this collection holds
    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    /// Get the number of members
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Check if the collection is empty
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Check if `pid` is a member
    pub fn contains(&self, pid: PersistentId) -> bool {
        self.members.contains(&pid)
    }

    /// Iterate over members in enumeration order
    pub fn iter(&self) -> impl Iterator<Item = PersistentId> + '_ {
        self.members.iter().copied()
    }

    /// Up to `limit` members in enumeration order
    pub fn list(&self, limit: usize) -> Vec<PersistentId> {
        self.members.iter().take(limit).copied().collect()
    }

    /// Position of a member in enumeration order
    pub fn index_of(&self, pid: PersistentId) -> Option<usize> {
        self.members.get_index_of(&pid)
    }

    /// First member whose name is exactly `name`
    pub fn find_by_name(&self, registry: &EntityRegistry, name: &str) -> Option<PersistentId> {
        self.iter()
            .find(|pid| registry.get(*pid).and_then(|e| e.name()) == Some(name))
    }

    /// Names of all members
    pub fn names<'a>(&'a self, registry: &'a EntityRegistry) -> impl Iterator<Item = &'a str> + 'a {
        self.members
            .iter()
            .filter_map(move |pid| registry.get(*pid).and_then(|e| e.name()))
    }

    pub(crate) fn insert(&mut self, pid: PersistentId) -> bool {
        self.members.insert(pid)
    }

    /// Insert at `index` (clamped to the end) and return the effective index
    pub(crate) fn insert_at(&mut self, index: usize, pid: PersistentId) -> usize {
        let index = index.min(self.members.len());
        self.members.shift_insert(index, pid);
        index
    }

    pub(crate) fn remove(&mut self, pid: PersistentId) -> bool {
        self.members.shift_remove(&pid)
    }

    /// Drop members the registry no longer holds; returns how many went
    pub(crate) fn retain_live(&mut self, registry: &EntityRegistry) -> usize {
        let before = self.members.len();
        self.members.retain(|pid| registry.contains(*pid));
        before - self.members.len()
    }

    /// Check that `pid` is a detached entity of this collection's kind
    pub(crate) fn check_candidate(&self, registry: &EntityRegistry, pid: PersistentId) -> Result<()> {
        let entity = registry.resolve(pid)?;
        if entity.kind() != self.kind {
            return Err(ModelError::InvalidArgument(format!(
                "entity {pid} is a {}, expected a {}",
                entity.kind(),
                self.kind
            )));
        }
        match registry.owner(pid) {
            Some(Owner::Detached) => Ok(()),
            _ => Err(ModelError::AlreadyOwned(pid)),
        }
    }

    /// Take ownership of a detached entity of this kind and append it
    pub(crate) fn adopt(&mut self, registry: &mut EntityRegistry, pid: PersistentId) -> Result<()> {
        self.check_candidate(registry, pid)?;
        registry.claim_ownership(pid, Owner::Model)?;
        self.members.insert(pid);
        Ok(())
    }
}

/// Read access shared by every collection manager
pub trait CollectionManager {
    /// The underlying ordered set
    fn collection(&self) -> &Collection;

    fn count(&self) -> usize {
        self.collection().len()
    }

    /// Up to `limit` members; the returned length is the actual count
    fn list(&self, limit: usize) -> Vec<PersistentId> {
        self.collection().list(limit)
    }

    fn contains(&self, pid: PersistentId) -> bool {
        self.collection().contains(pid)
    }

    fn by_name(&self, registry: &EntityRegistry, name: &str) -> Option<PersistentId> {
        self.collection().find_by_name(registry, name)
    }
}

/// Return `suggested` if no existing name equals it, otherwise a variant
/// with a numeric suffix that is distinct from every existing name.
///
/// A trailing number on `suggested` is incremented rather than extended:
/// `"Brick1"` becomes `"Brick2"`, not `"Brick11"`.
pub fn generate_unique_name<'a>(
    existing: impl IntoIterator<Item = &'a str>,
    suggested: &str,
) -> String {
    let taken: AHashSet<&str> = existing.into_iter().collect();
    if !taken.contains(suggested) {
        return suggested.to_string();
    }

    let base = suggested.trim_end_matches(|c: char| c.is_ascii_digit());
    let mut n: u64 = suggested[base.len()..].parse::<u64>().map_or(1, |v| v + 1);
    loop {
        let candidate = format!("{base}{n}");
        if !taken.contains(candidate.as_str()) {
            return candidate;
        }
        n += 1;
    }
}

/// Remove `pid` from the container that owns it.
///
/// The entity stays in the registry; callers decide whether to destroy it.
pub(crate) fn detach_from_container(
    registry: &mut EntityRegistry,
    root: &mut Entities,
    pid: PersistentId,
) {
    match registry.owner(pid) {
        Some(Owner::Container(ContainerId::Root)) => {
            root.remove(pid);
        }
        Some(Owner::Container(ContainerId::Definition(def))) => {
            if let Some(d) = registry.get_mut(def).and_then(EntityType::as_definition_mut) {
                d.entities.remove(pid);
            }
        }
        _ => {}
    }
    registry.relinquish(pid);
}

/// Destroy an entity together with everything it exclusively owns.
///
/// Definitions take their private container along; groups and images take
/// their group or image definition once nothing else places it; images and
/// layers take their private material. Destroyed definitions stay listed in
/// [`Definitions`] until [`Definitions::prune`] runs.
pub(crate) fn destroy_tree(registry: &mut EntityRegistry, pid: PersistentId) {
    let mut pending = vec![pid];
    while let Some(pid) = pending.pop() {
        let Some(entity) = registry.destroy(pid) else {
            continue;
        };
        match entity {
            EntityType::ComponentDefinition(def) => pending.extend(def.entities.iter()),
            EntityType::Group(group) => {
                if is_unplaced_private_definition(registry, group.definition) {
                    pending.push(group.definition);
                }
            }
            EntityType::Image(img) => {
                pending.extend(img.image_material);
                if is_unplaced_private_definition(registry, img.definition) {
                    pending.push(img.definition);
                }
            }
            EntityType::Layer(layer) => pending.extend(layer.layer_material),
            _ => {}
        }
    }
}

/// A group or image definition that no live entity places
fn is_unplaced_private_definition(registry: &EntityRegistry, def: PersistentId) -> bool {
    let private = registry
        .get(def)
        .and_then(EntityType::as_definition)
        .is_some_and(|d| d.kind != DefinitionKind::Component);
    private && registry.placements_of(def).next().is_none()
}
