//! Component definitions collection

use ahash::AHashSet;
use tracing::debug;

use super::{destroy_tree, detach_from_container, generate_unique_name, Collection, CollectionManager};
use crate::entities::{DefinitionKind, EntityKind, EntityType};
use crate::error::{BatchTally, ModelError, Result};
use crate::registry::EntityRegistry;
use crate::scene_graph::Entities;
use crate::types::PersistentId;

/// Component, group and image definitions of a model
#[derive(Debug, Clone, PartialEq)]
pub struct Definitions {
    set: Collection,
}

impl CollectionManager for Definitions {
    fn collection(&self) -> &Collection {
        &self.set
    }
}

impl Definitions {
    /// Create an empty definitions collection
    pub fn new() -> Self {
        Definitions {
            set: Collection::new(EntityKind::ComponentDefinition),
        }
    }

    /// Members of one definition kind, in insertion order
    pub fn of_kind<'a>(
        &'a self,
        registry: &'a EntityRegistry,
        kind: DefinitionKind,
    ) -> impl Iterator<Item = PersistentId> + 'a {
        self.set.iter().filter(move |pid| {
            registry
                .get(*pid)
                .and_then(EntityType::as_definition)
                .is_some_and(|d| d.kind == kind)
        })
    }

    /// Number of definitions of one kind
    pub fn count_of_kind(&self, registry: &EntityRegistry, kind: DefinitionKind) -> usize {
        self.of_kind(registry, kind).count()
    }

    /// Up to `limit` definitions of one kind
    pub fn list_of_kind(
        &self,
        registry: &EntityRegistry,
        kind: DefinitionKind,
        limit: usize,
    ) -> Vec<PersistentId> {
        self.of_kind(registry, kind).take(limit).collect()
    }

    /// Add detached definitions, renaming on name collisions
    pub fn add(&mut self, registry: &mut EntityRegistry, pids: &[PersistentId]) -> Result<()> {
        let mut tally = BatchTally::new();
        for (index, &pid) in pids.iter().enumerate() {
            let outcome = self.set.check_candidate(registry, pid).and_then(|_| {
                let name = registry.get(pid).and_then(|e| e.name()).unwrap_or_default();
                if self.set.find_by_name(registry, name).is_some() {
                    let unique = generate_unique_name(self.set.names(registry), name);
                    if let Some(d) = registry.get_mut(pid).and_then(EntityType::as_definition_mut) {
                        d.name = unique;
                    }
                }
                self.set.adopt(registry, pid)
            });
            tally.record(index, outcome);
        }
        tally.finish()
    }

    /// Remove definitions along with every instance of them.
    ///
    /// Instances are found first across the whole model and only then
    /// detached and destroyed.
    pub fn remove(
        &mut self,
        registry: &mut EntityRegistry,
        root: &mut Entities,
        pids: &[PersistentId],
    ) -> Result<()> {
        if pids.is_empty() {
            return Err(ModelError::OutOfRange("no definitions to remove".to_string()));
        }

        let mut tally = BatchTally::new();
        let mut doomed = AHashSet::new();
        for (index, &pid) in pids.iter().enumerate() {
            let outcome = if self.set.contains(pid) && doomed.insert(pid) {
                Ok(())
            } else {
                Err(ModelError::InvalidArgument(format!(
                    "{pid} is not a definition of this model"
                )))
            };
            tally.record(index, outcome);
        }

        // Phase 1: every instance, group or image placing a doomed definition
        let lookup: &EntityRegistry = registry;
        let mut instances: Vec<PersistentId> = doomed
            .iter()
            .flat_map(|def| lookup.placements_of(*def))
            .collect();
        instances.sort();

        // Phase 2: detach and destroy
        for pid in &instances {
            detach_from_container(registry, root, *pid);
            destroy_tree(registry, *pid);
        }
        for pid in &doomed {
            self.set.remove(*pid);
            destroy_tree(registry, *pid);
        }
        // Groups and images inside the doomed definitions took their own
        // definitions with them
        self.prune(registry);
        debug!(
            definitions = doomed.len(),
            instances = instances.len(),
            "removed definitions"
        );

        tally.finish()
    }

    /// Forget definitions destroyed along with the group or image that
    /// owned them
    pub(crate) fn prune(&mut self, registry: &EntityRegistry) {
        let dropped = self.set.retain_live(registry);
        if dropped > 0 {
            debug!(definitions = dropped, "dropped private definitions");
        }
    }

    pub(crate) fn insert_loaded(&mut self, pid: PersistentId) {
        self.set.insert(pid);
    }

    /// A definition name no definition uses yet
    pub fn generate_unique_name(&self, registry: &EntityRegistry, suggested: &str) -> String {
        generate_unique_name(self.set.names(registry), suggested)
    }
}

impl Default for Definitions {
    fn default() -> Self {
        Self::new()
    }
}
