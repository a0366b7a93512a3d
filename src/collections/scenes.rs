//! Scenes collection

use ahash::AHashSet;

use super::{Collection, CollectionManager};
use crate::entities::{EntityKind, EntityType};
use crate::error::{BatchTally, ModelError, Result};
use crate::registry::{EntityRegistry, Owner};
use crate::types::PersistentId;

/// Ordered scenes of a model.
///
/// Names are unique (exact, case-sensitive) for every scene added through
/// this collection. At most one scene is active; the active scene is a weak
/// pointer and is cleared when that scene is removed.
#[derive(Debug, Clone, PartialEq)]
pub struct Scenes {
    set: Collection,
    active: Option<PersistentId>,
}

impl CollectionManager for Scenes {
    fn collection(&self) -> &Collection {
        &self.set
    }
}

impl Scenes {
    /// Create an empty scene collection
    pub fn new() -> Self {
        Scenes {
            set: Collection::new(EntityKind::Scene),
            active: None,
        }
    }

    /// Add scenes at the end.
    ///
    /// Names are checked for the whole batch first, against the existing
    /// scenes and against each other; any collision fails the call with
    /// `InvalidArgument` before anything is added.
    pub fn add(&mut self, registry: &mut EntityRegistry, pids: &[PersistentId]) -> Result<()> {
        self.check_names(registry, pids)?;
        let mut tally = BatchTally::new();
        for (index, &pid) in pids.iter().enumerate() {
            tally.record(index, self.set.adopt(registry, pid));
        }
        tally.finish()
    }

    /// Add one scene at `index`; `-1` appends. Returns the effective index.
    pub fn add_at(
        &mut self,
        registry: &mut EntityRegistry,
        index: isize,
        pid: PersistentId,
    ) -> Result<usize> {
        let position = match index {
            -1 => self.set.len(),
            i if i >= 0 && (i as usize) <= self.set.len() => i as usize,
            _ => {
                return Err(ModelError::OutOfRange(format!(
                    "scene index {index} outside 0..={}",
                    self.set.len()
                )))
            }
        };
        self.check_names(registry, &[pid])?;
        self.set.check_candidate(registry, pid)?;
        registry.claim_ownership(pid, Owner::Model)?;
        Ok(self.set.insert_at(position, pid))
    }

    fn check_names(&self, registry: &EntityRegistry, pids: &[PersistentId]) -> Result<()> {
        let mut seen: AHashSet<&str> = self.set.names(registry).collect();
        for pid in pids {
            let Some(scene) = registry.get(*pid).and_then(EntityType::as_scene) else {
                // Reported per element by the ownership pass
                continue;
            };
            if !seen.insert(scene.name.as_str()) {
                return Err(ModelError::InvalidArgument(format!(
                    "a scene named '{}' already exists",
                    scene.name
                )));
            }
        }
        Ok(())
    }

    /// Remove scenes.
    ///
    /// `OutOfRange` for an empty batch, `NoData` when none is a scene of
    /// this model, `PartialSuccess` when only some are.
    pub fn remove(&mut self, registry: &mut EntityRegistry, pids: &[PersistentId]) -> Result<()> {
        if pids.is_empty() {
            return Err(ModelError::OutOfRange("no scenes to remove".to_string()));
        }
        let mut tally = BatchTally::new();
        for (index, &pid) in pids.iter().enumerate() {
            let outcome = if self.set.remove(pid) {
                registry.destroy(pid);
                if self.active == Some(pid) {
                    self.active = None;
                }
                Ok(())
            } else {
                Err(ModelError::InvalidInput(format!("{pid} is not a scene of this model")))
            };
            tally.record(index, outcome);
        }
        tally.finish_or_no_data("scene")
    }

    /// The active scene, if any
    pub fn active(&self) -> Option<PersistentId> {
        self.active
    }

    /// Make a scene of this model the active one
    pub fn set_active(&mut self, pid: PersistentId) -> Result<()> {
        if !self.set.contains(pid) {
            return Err(ModelError::Generic(format!("scene {pid} is not in the model")));
        }
        self.active = Some(pid);
        Ok(())
    }

    /// Position of a scene in scene order
    pub fn index_of(&self, pid: PersistentId) -> Option<usize> {
        self.set.index_of(pid)
    }

    /// Append a scene read from a file, without the name check
    pub(crate) fn insert_loaded(&mut self, pid: PersistentId) {
        self.set.insert(pid);
    }

    pub(crate) fn set_active_loaded(&mut self, pid: Option<PersistentId>) {
        self.active = pid.filter(|p| self.set.contains(*p));
    }
}

impl Default for Scenes {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::Scene;
    use crate::error::ErrorKind;

    fn scene(registry: &mut EntityRegistry, name: &str) -> PersistentId {
        registry.register(EntityType::Scene(Scene::new(name)))
    }

    #[test]
    fn test_duplicate_name_rejected_without_mutation() {
        let mut registry = EntityRegistry::new();
        let mut scenes = Scenes::new();
        let a = scene(&mut registry, "A");
        scenes.add(&mut registry, &[a]).unwrap();

        let a2 = scene(&mut registry, "A");
        let err = scenes.add(&mut registry, &[a2]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        assert_eq!(scenes.count(), 1);
        assert_eq!(registry.owner(a2), Some(Owner::Detached));
    }

    #[test]
    fn test_duplicate_within_batch_rejected() {
        let mut registry = EntityRegistry::new();
        let mut scenes = Scenes::new();
        let x = scene(&mut registry, "A");
        let y = scene(&mut registry, "A");
        let err = scenes.add(&mut registry, &[x, y]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        assert_eq!(scenes.count(), 0);
    }

    #[test]
    fn test_add_at_index() {
        let mut registry = EntityRegistry::new();
        let mut scenes = Scenes::new();
        let a = scene(&mut registry, "A");
        let b = scene(&mut registry, "B");
        let c = scene(&mut registry, "C");
        assert_eq!(scenes.add_at(&mut registry, -1, a).unwrap(), 0);
        assert_eq!(scenes.add_at(&mut registry, -1, b).unwrap(), 1);
        assert_eq!(scenes.add_at(&mut registry, 0, c).unwrap(), 0);
        assert_eq!(scenes.list(10), vec![c, a, b]);

        let d = scene(&mut registry, "D");
        assert_eq!(scenes.add_at(&mut registry, 9, d).unwrap_err().kind(), ErrorKind::OutOfRange);
    }

    #[test]
    fn test_active_scene_is_weak() {
        let mut registry = EntityRegistry::new();
        let mut scenes = Scenes::new();
        let a = scene(&mut registry, "A");
        scenes.add(&mut registry, &[a]).unwrap();
        scenes.set_active(a).unwrap();
        assert_eq!(scenes.active(), Some(a));

        scenes.remove(&mut registry, &[a]).unwrap();
        assert_eq!(scenes.active(), None);
        assert_eq!(
            scenes.set_active(a).unwrap_err().kind(),
            ErrorKind::Generic
        );
    }
}
