//! Materials collection

use tracing::debug;

use super::{generate_unique_name, Collection, CollectionManager};
use crate::entities::{EntityKind, EntityType};
use crate::error::{BatchTally, ModelError, Result};
use crate::registry::{EntityRegistry, Owner};
use crate::types::PersistentId;

/// Shared materials of a model
#[derive(Debug, Clone, PartialEq)]
pub struct Materials {
    set: Collection,
}

impl CollectionManager for Materials {
    fn collection(&self) -> &Collection {
        &self.set
    }
}

impl Materials {
    /// Create an empty materials collection
    pub fn new() -> Self {
        Materials {
            set: Collection::new(EntityKind::Material),
        }
    }

    /// Add detached materials.
    ///
    /// A material whose name is already taken is renamed to a unique name.
    pub fn add(&mut self, registry: &mut EntityRegistry, pids: &[PersistentId]) -> Result<()> {
        let mut tally = BatchTally::new();
        for (index, &pid) in pids.iter().enumerate() {
            let outcome = self.set.check_candidate(registry, pid).and_then(|_| {
                let name = registry.get(pid).and_then(|e| e.name()).unwrap_or_default();
                if self.set.find_by_name(registry, name).is_some() {
                    let unique = generate_unique_name(self.set.names(registry), name);
                    debug!(from = name, to = %unique, "renaming material to keep names unique");
                    if let Some(m) = registry.get_mut(pid).and_then(EntityType::as_material_mut) {
                        m.name = unique;
                    }
                }
                self.set.adopt(registry, pid)
            });
            tally.record(index, outcome);
        }
        tally.finish()
    }

    /// Remove materials, clearing every reference to them.
    ///
    /// `OutOfRange` for an empty batch, `NoData` when none of the inputs is
    /// a material of this model, `PartialSuccess` when only some are.
    pub fn remove(&mut self, registry: &mut EntityRegistry, pids: &[PersistentId]) -> Result<()> {
        if pids.is_empty() {
            return Err(ModelError::OutOfRange("no materials to remove".to_string()));
        }

        let mut tally = BatchTally::new();
        let mut doomed = Vec::new();
        for (index, &pid) in pids.iter().enumerate() {
            if self.set.contains(pid) && !doomed.contains(&pid) {
                doomed.push(pid);
                tally.record(index, Ok(()));
            } else {
                tally.record(
                    index,
                    Err(ModelError::InvalidInput(format!("{pid} is not a material of this model"))),
                );
            }
        }

        // Collect referrers first, then rewrite them
        let referrers: Vec<PersistentId> = registry
            .iter()
            .filter(|(_, e)| references_any(e, &doomed))
            .map(|(pid, _)| pid)
            .collect();
        for pid in referrers {
            if let Some(entity) = registry.get_mut(pid) {
                clear_references(entity, &doomed);
            }
        }
        for pid in &doomed {
            self.set.remove(*pid);
            registry.destroy(*pid);
        }

        tally.finish_or_no_data("material")
    }

    /// A material name no shared material uses yet
    pub fn generate_unique_name(&self, registry: &EntityRegistry, suggested: &str) -> String {
        generate_unique_name(self.set.names(registry), suggested)
    }

    /// Shared materials followed by the private materials of layers and
    /// images (in PID order)
    pub fn all(&self, registry: &EntityRegistry) -> Vec<PersistentId> {
        let mut private: Vec<PersistentId> = registry
            .iter()
            .filter(|(pid, e)| {
                e.kind() == EntityKind::Material
                    && matches!(registry.owner(*pid), Some(Owner::Entity(_)))
            })
            .map(|(pid, _)| pid)
            .collect();
        private.sort();

        let mut all = self.set.list(usize::MAX);
        all.extend(private);
        all
    }

    pub(crate) fn insert_loaded(&mut self, pid: PersistentId) {
        self.set.insert(pid);
    }
}

impl Default for Materials {
    fn default() -> Self {
        Self::new()
    }
}

fn references_any(entity: &EntityType, materials: &[PersistentId]) -> bool {
    let front = entity
        .drawing()
        .and_then(|d| d.material)
        .is_some_and(|m| materials.contains(&m));
    let back = entity
        .as_face()
        .and_then(|f| f.back_material)
        .is_some_and(|m| materials.contains(&m));
    front || back
}

fn clear_references(entity: &mut EntityType, materials: &[PersistentId]) {
    if let Some(drawing) = entity.drawing_mut() {
        if drawing.material.is_some_and(|m| materials.contains(&m)) {
            drawing.material = None;
        }
    }
    if let Some(face) = entity.as_face_mut() {
        if face.back_material.is_some_and(|m| materials.contains(&m)) {
            face.back_material = None;
        }
    }
}
