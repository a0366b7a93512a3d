//! Layers collection

use ahash::AHashSet;
use tracing::debug;

use super::{destroy_tree, Collection, CollectionManager};
use crate::entities::{EntityKind, EntityType, Layer};
use crate::error::{BatchTally, ModelError, Result};
use crate::registry::{EntityRegistry, Owner, ResolvedBatch};
use crate::types::PersistentId;

/// Layers of a model.
///
/// The default layer always exists and cannot be removed. The active layer
/// is a weak pointer into the set; it falls back to the default layer.
#[derive(Debug, Clone, PartialEq)]
pub struct Layers {
    set: Collection,
    default_layer: PersistentId,
    active_layer: PersistentId,
}

impl CollectionManager for Layers {
    fn collection(&self) -> &Collection {
        &self.set
    }
}

impl Layers {
    /// Create the collection with its default layer
    pub fn new(registry: &mut EntityRegistry) -> Self {
        let default_layer = registry.register_owned(EntityType::Layer(Layer::layer_0()), Owner::Model);
        let mut set = Collection::new(EntityKind::Layer);
        set.insert(default_layer);
        Layers {
            set,
            default_layer,
            active_layer: default_layer,
        }
    }

    /// Rebuild from loaded parts. `layers` must contain `default_layer`.
    pub(crate) fn from_loaded(
        layers: Vec<PersistentId>,
        default_layer: PersistentId,
        active_layer: PersistentId,
    ) -> Result<Self> {
        let mut set = Collection::new(EntityKind::Layer);
        for pid in layers {
            set.insert(pid);
        }
        if !set.contains(default_layer) {
            return Err(ModelError::ModelInvalid(format!(
                "default layer {default_layer} is not a layer of the model"
            )));
        }
        let active_layer = if set.contains(active_layer) {
            active_layer
        } else {
            default_layer
        };
        Ok(Layers {
            set,
            default_layer,
            active_layer,
        })
    }

    /// The layer that can never be removed
    pub fn default_layer(&self) -> PersistentId {
        self.default_layer
    }

    /// The layer new elements go on
    pub fn active_layer(&self) -> PersistentId {
        self.active_layer
    }

    /// Select the active layer
    pub fn set_active_layer(&mut self, pid: PersistentId) -> Result<()> {
        if !self.set.contains(pid) {
            return Err(ModelError::InvalidArgument(format!(
                "layer {pid} is not in the model"
            )));
        }
        self.active_layer = pid;
        Ok(())
    }

    /// Add detached layers.
    ///
    /// Names must be unique. A layer's private material is claimed along
    /// with the layer.
    pub fn add(&mut self, registry: &mut EntityRegistry, pids: &[PersistentId]) -> Result<()> {
        let mut tally = BatchTally::new();
        for (index, &pid) in pids.iter().enumerate() {
            tally.record(index, self.add_one(registry, pid));
        }
        tally.finish()
    }

    fn add_one(&mut self, registry: &mut EntityRegistry, pid: PersistentId) -> Result<()> {
        self.set.check_candidate(registry, pid)?;
        let layer = registry.get(pid).and_then(EntityType::as_layer).ok_or_else(|| {
            ModelError::InvalidInput(format!("no layer with persistent ID {pid}"))
        })?;
        if self.set.find_by_name(registry, &layer.name).is_some() {
            return Err(ModelError::InvalidArgument(format!(
                "a layer named '{}' already exists",
                layer.name
            )));
        }
        let private = layer.layer_material;
        if let Some(m) = private {
            match (registry.get(m).map(EntityType::kind), registry.owner(m)) {
                (Some(EntityKind::Material), Some(Owner::Detached)) => {}
                (Some(EntityKind::Material), _) => return Err(ModelError::AlreadyOwned(m)),
                _ => {
                    return Err(ModelError::InvalidArgument(format!(
                        "layer material {m} is not a material"
                    )))
                }
            }
        }

        self.set.adopt(registry, pid)?;
        if let Some(m) = private {
            registry.claim_ownership(m, Owner::Entity(pid))?;
        }
        Ok(())
    }

    /// Remove layers.
    ///
    /// Drawing elements on a removed layer move to the default layer, scene
    /// overrides for it are dropped, and a removed active layer hands the
    /// active role back to the default layer. Removing the default layer
    /// fails for that element only.
    pub fn remove(&mut self, registry: &mut EntityRegistry, pids: &[PersistentId]) -> Result<()> {
        if pids.is_empty() {
            return Err(ModelError::OutOfRange("no layers to remove".to_string()));
        }

        // Phase 1: decide what goes
        let mut tally = BatchTally::new();
        let mut doomed = AHashSet::new();
        for (index, &pid) in pids.iter().enumerate() {
            let outcome = if pid == self.default_layer {
                Err(ModelError::InvalidArgument(
                    "the default layer cannot be removed".to_string(),
                ))
            } else if !self.set.contains(pid) || doomed.contains(&pid) {
                Err(ModelError::InvalidArgument(format!("{pid} is not a layer of this model")))
            } else {
                doomed.insert(pid);
                Ok(())
            };
            tally.record(index, outcome);
        }

        // Phase 2: redirect referrers, then drop the layers
        let default_layer = self.default_layer;
        let mut moved = 0usize;
        for (_, entity) in registry.iter_mut() {
            if let Some(drawing) = entity.drawing_mut() {
                if doomed.contains(&drawing.layer) {
                    drawing.layer = default_layer;
                    moved += 1;
                }
            }
            if let Some(scene) = entity.as_scene_mut() {
                scene.layer_visibility.retain(|layer, _| !doomed.contains(layer));
            }
        }
        if doomed.contains(&self.active_layer) {
            self.active_layer = default_layer;
        }
        for pid in &doomed {
            self.set.remove(*pid);
            destroy_tree(registry, *pid);
        }
        debug!(removed = doomed.len(), moved, "removed layers");

        tally.finish()
    }

    /// Resolve layer PIDs in input order; non-layers yield empty slots
    pub fn by_persistent_ids<'a>(
        &self,
        registry: &'a EntityRegistry,
        pids: &[PersistentId],
    ) -> ResolvedBatch<&'a Layer> {
        let members: Vec<PersistentId> = pids
            .iter()
            .map(|pid| if self.set.contains(*pid) { *pid } else { PersistentId::NULL })
            .collect();
        registry.resolve_many(&members).map(EntityType::as_layer)
    }

    /// Whether a layer is shown; unknown layers count as visible
    pub fn is_visible(&self, registry: &EntityRegistry, pid: PersistentId) -> bool {
        registry
            .get(pid)
            .and_then(EntityType::as_layer)
            .map_or(true, |l| l.visible)
    }
}
