//! Entity registry
//!
//! The registry is the identity and ownership ledger of a model. It stores
//! every entity by persistent ID together with its owner of record.
//!
//! PIDs are assigned from a per-registry counter: strictly increasing,
//! starting at 1, and never reused even after the entity is gone.

use std::collections::BTreeSet;

use ahash::AHashMap;
use tracing::trace;

use crate::entities::EntityType;
use crate::error::{BatchFailures, ModelError, Result};
use crate::scene_graph::ContainerId;
use crate::types::PersistentId;

/// Owner of record for an entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Owner {
    /// Created but not yet added anywhere; the caller owns it
    Detached,
    /// Held by one of the model's collections
    Model,
    /// Held by an entities container
    Container(ContainerId),
    /// Privately held by another entity (layer or image materials)
    Entity(PersistentId),
}

impl Owner {
    /// Whether the caller still owns the entity
    pub fn is_detached(&self) -> bool {
        matches!(self, Owner::Detached)
    }
}

#[derive(Debug, Clone)]
struct Record {
    entity: EntityType,
    owner: Owner,
}

/// Identity and ownership ledger
#[derive(Debug, Clone)]
pub struct EntityRegistry {
    records: AHashMap<PersistentId, Record>,
    /// Instances, groups and images keyed by the definition they place
    placements: AHashMap<PersistentId, BTreeSet<PersistentId>>,
    next_pid: i64,
}

impl EntityRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        EntityRegistry {
            records: AHashMap::new(),
            placements: AHashMap::new(),
            next_pid: 1,
        }
    }

    /// Register a new entity, assigning it the next PID.
    ///
    /// The entity starts out detached.
    pub fn register(&mut self, entity: EntityType) -> PersistentId {
        self.register_owned(entity, Owner::Detached)
    }

    /// Register a new entity that belongs to `owner` from the start
    pub(crate) fn register_owned(&mut self, mut entity: EntityType, owner: Owner) -> PersistentId {
        let pid = PersistentId::new(self.next_pid);
        self.next_pid += 1;
        entity.common_mut().pid = pid;
        trace!(pid = pid.value(), kind = %entity.kind(), ?owner, "registered entity");
        self.index_placement(&entity, pid);
        self.records.insert(pid, Record { entity, owner });
        pid
    }

    /// Register an entity under a PID read from a file.
    ///
    /// Fails with `ModelInvalid` if the PID is not positive or already taken.
    /// The counter moves past the PID so later registrations never collide.
    pub fn register_with_pid(&mut self, mut entity: EntityType, pid: PersistentId) -> Result<()> {
        if !pid.is_valid() {
            return Err(ModelError::ModelInvalid(format!(
                "invalid persistent ID {pid}"
            )));
        }
        if self.records.contains_key(&pid) {
            return Err(ModelError::ModelInvalid(format!(
                "duplicate persistent ID {pid}"
            )));
        }
        entity.common_mut().pid = pid;
        self.index_placement(&entity, pid);
        self.records.insert(
            pid,
            Record {
                entity,
                owner: Owner::Detached,
            },
        );
        self.next_pid = self.next_pid.max(pid.value() + 1);
        Ok(())
    }

    /// Look up an entity
    pub fn resolve(&self, pid: PersistentId) -> Result<&EntityType> {
        self.get(pid)
            .ok_or_else(|| ModelError::InvalidInput(format!("no entity with persistent ID {pid}")))
    }

    /// Look up an entity, `None` if not present
    pub fn get(&self, pid: PersistentId) -> Option<&EntityType> {
        self.records.get(&pid).map(|r| &r.entity)
    }

    /// Get a mutable entity by PID
    pub fn get_mut(&mut self, pid: PersistentId) -> Option<&mut EntityType> {
        self.records.get_mut(&pid).map(|r| &mut r.entity)
    }

    /// Resolve a batch of PIDs, preserving input order.
    ///
    /// Unresolved PIDs yield empty slots; they never abort the batch.
    pub fn resolve_many(&self, pids: &[PersistentId]) -> ResolvedBatch<&EntityType> {
        ResolvedBatch::new(pids.iter().map(|pid| self.get(*pid)).collect())
    }

    /// Check if a PID is live
    pub fn contains(&self, pid: PersistentId) -> bool {
        self.records.contains_key(&pid)
    }

    /// Owner of record, `None` if the PID is unknown
    pub fn owner(&self, pid: PersistentId) -> Option<Owner> {
        self.records.get(&pid).map(|r| r.owner)
    }

    /// Make `owner` the owner of record.
    ///
    /// Fails with `AlreadyOwned` without changing anything if the entity
    /// already has an owner.
    pub fn claim_ownership(&mut self, pid: PersistentId, owner: Owner) -> Result<()> {
        let record = self
            .records
            .get_mut(&pid)
            .ok_or_else(|| ModelError::InvalidInput(format!("no entity with persistent ID {pid}")))?;
        if !record.owner.is_detached() {
            return Err(ModelError::AlreadyOwned(pid));
        }
        record.owner = owner;
        Ok(())
    }

    /// Return an owned entity to the detached state
    pub(crate) fn relinquish(&mut self, pid: PersistentId) {
        if let Some(record) = self.records.get_mut(&pid) {
            record.owner = Owner::Detached;
        }
    }

    /// Destroy a caller-owned (detached) entity.
    ///
    /// Owned entities can only leave the model through their owner.
    pub fn release(&mut self, pid: PersistentId) -> Result<EntityType> {
        match self.records.get(&pid) {
            None => Err(ModelError::InvalidInput(format!(
                "no entity with persistent ID {pid}"
            ))),
            Some(r) if !r.owner.is_detached() => Err(ModelError::InvalidArgument(format!(
                "entity {pid} is owned and cannot be released directly"
            ))),
            Some(_) => self.destroy(pid).ok_or_else(|| {
                ModelError::InvalidInput(format!("no entity with persistent ID {pid}"))
            }),
        }
    }

    /// Remove an entity regardless of owner
    pub(crate) fn destroy(&mut self, pid: PersistentId) -> Option<EntityType> {
        let record = self.records.remove(&pid)?;
        if let Some(def) = record.entity.definition() {
            if let Some(placed) = self.placements.get_mut(&def) {
                placed.remove(&pid);
                if placed.is_empty() {
                    self.placements.remove(&def);
                }
            }
        }
        Some(record.entity)
    }

    fn index_placement(&mut self, entity: &EntityType, pid: PersistentId) {
        if let Some(def) = entity.definition() {
            self.placements.entry(def).or_default().insert(pid);
        }
    }

    /// Live instances, groups and images placing `def`, lowest PID first.
    ///
    /// Detached placements are included.
    pub fn placements_of(&self, def: PersistentId) -> impl Iterator<Item = PersistentId> + '_ {
        self.placements.get(&def).into_iter().flatten().copied()
    }

    /// Number of live entities
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Check if the registry holds no entities
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// PID the next registration will receive
    pub fn next_pid(&self) -> PersistentId {
        PersistentId::new(self.next_pid)
    }

    /// All live entities, in no particular order
    pub fn iter(&self) -> impl Iterator<Item = (PersistentId, &EntityType)> {
        self.records.iter().map(|(pid, r)| (*pid, &r.entity))
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = (PersistentId, &mut EntityType)> {
        self.records.iter_mut().map(|(pid, r)| (*pid, &mut r.entity))
    }

    /// Entities with the given owner of record
    pub fn owned_by(&self, owner: Owner) -> impl Iterator<Item = PersistentId> + '_ {
        self.records
            .iter()
            .filter(move |(_, r)| r.owner == owner)
            .map(|(pid, _)| *pid)
    }
}

impl Default for EntityRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Result of a batch lookup.
///
/// Slot `i` holds the resolution of input `i`; unresolved inputs hold
/// `None`.
#[derive(Debug, Clone)]
pub struct ResolvedBatch<T> {
    slots: Vec<Option<T>>,
}

impl<T> ResolvedBatch<T> {
    pub(crate) fn new(slots: Vec<Option<T>>) -> Self {
        ResolvedBatch { slots }
    }

    /// One slot per requested PID, in request order
    pub fn slots(&self) -> &[Option<T>] {
        &self.slots
    }

    /// Consume the batch into its slots
    pub fn into_slots(self) -> Vec<Option<T>> {
        self.slots
    }

    /// Get the number of slots
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Check if nothing was requested
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// True when every input resolved
    pub fn is_complete(&self) -> bool {
        self.slots.iter().all(Option::is_some)
    }

    /// `Ok` when every input resolved, `PartialSuccess` naming the
    /// unresolved indices otherwise
    pub fn status(&self) -> Result<()> {
        if self.is_complete() {
            return Ok(());
        }
        let failures = self
            .slots
            .iter()
            .enumerate()
            .filter(|(_, s)| s.is_none())
            .map(|(i, _)| (i, ModelError::NoData("persistent ID not found".to_string())))
            .collect::<Vec<_>>();
        Err(ModelError::PartialSuccess(BatchFailures {
            succeeded: self.slots.len() - failures.len(),
            failures,
        }))
    }

    pub(crate) fn map<U>(self, f: impl Fn(T) -> Option<U>) -> ResolvedBatch<U> {
        ResolvedBatch {
            slots: self.slots.into_iter().map(|s| s.and_then(&f)).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{ComponentDefinition, ComponentInstance, Edge, Layer};
    use crate::error::ErrorKind;
    use crate::types::Point3;

    fn edge() -> EntityType {
        EntityType::Edge(Edge::new(Point3::origin(), Point3::new(1.0, 0.0, 0.0)))
    }

    #[test]
    fn test_pids_are_monotonic_and_not_reused() {
        let mut reg = EntityRegistry::new();
        let a = reg.register(edge());
        let b = reg.register(edge());
        assert_eq!(a, PersistentId::new(1));
        assert_eq!(b, PersistentId::new(2));

        reg.release(b).unwrap();
        let c = reg.register(edge());
        assert_eq!(c, PersistentId::new(3));
        assert_eq!(reg.get(c).unwrap().pid(), c);
    }

    #[test]
    fn test_claim_ownership_once() {
        let mut reg = EntityRegistry::new();
        let pid = reg.register(edge());
        reg.claim_ownership(pid, Owner::Container(ContainerId::Root)).unwrap();

        let err = reg.claim_ownership(pid, Owner::Model).unwrap_err();
        assert!(matches!(err, ModelError::AlreadyOwned(p) if p == pid));
        assert_eq!(reg.owner(pid), Some(Owner::Container(ContainerId::Root)));
    }

    #[test]
    fn test_release_owned_entity_fails() {
        let mut reg = EntityRegistry::new();
        let pid = reg.register(edge());
        reg.claim_ownership(pid, Owner::Model).unwrap();
        assert_eq!(reg.release(pid).unwrap_err().kind(), ErrorKind::InvalidArgument);
        assert!(reg.contains(pid));
    }

    #[test]
    fn test_register_with_pid_rejects_duplicates() {
        let mut reg = EntityRegistry::new();
        reg.register_with_pid(edge(), PersistentId::new(40)).unwrap();
        let err = reg
            .register_with_pid(EntityType::Layer(Layer::new("L")), PersistentId::new(40))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ModelInvalid);
        assert_eq!(reg.next_pid(), PersistentId::new(41));
    }

    #[test]
    fn test_resolve_many_preserves_order() {
        let mut reg = EntityRegistry::new();
        let a = reg.register(edge());
        let b = reg.register(edge());
        let batch = reg.resolve_many(&[b, PersistentId::new(999), a]);

        assert_eq!(batch.len(), 3);
        assert_eq!(batch.slots()[0].map(|e| e.pid()), Some(b));
        assert!(batch.slots()[1].is_none());
        assert_eq!(batch.slots()[2].map(|e| e.pid()), Some(a));

        let err = batch.status().unwrap_err();
        let failures = err.batch_failures().unwrap();
        assert_eq!(failures.succeeded, 2);
        assert_eq!(failures.failed_indices().collect::<Vec<_>>(), vec![1]);
    }

    #[test]
    fn test_placements_follow_registration_and_destroy() {
        let mut reg = EntityRegistry::new();
        let def = reg.register(EntityType::ComponentDefinition(ComponentDefinition::component("Chair")));
        let a = reg.register(EntityType::ComponentInstance(ComponentInstance::new(def)));
        let b = reg.register(EntityType::ComponentInstance(ComponentInstance::new(def)));
        reg.register_with_pid(
            EntityType::ComponentInstance(ComponentInstance::new(def)),
            PersistentId::new(50),
        )
        .unwrap();
        assert_eq!(reg.placements_of(def).collect::<Vec<_>>(), vec![a, b, PersistentId::new(50)]);

        reg.destroy(a);
        reg.destroy(PersistentId::new(50));
        assert_eq!(reg.placements_of(def).collect::<Vec<_>>(), vec![b]);
        reg.destroy(b);
        assert_eq!(reg.placements_of(def).count(), 0);
    }
}
