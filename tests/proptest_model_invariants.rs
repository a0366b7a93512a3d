//! Property-based invariant tests for the model's identity and layer rules.
//!
//! Random sequences of add/remove operations are applied to a fresh model;
//! after every step:
//!
//! 1. No two live entities share a PID, and each entity knows its own PID.
//! 2. A PID is never handed out twice, and new PIDs only grow.
//! 3. Exactly one default layer exists and it never changes.
//! 4. The active layer is always a layer of the model.

use std::collections::HashSet;

use proptest::prelude::*;
use skpdoc::{ContainerId, Model, PersistentId, Point3};

// ── Operations ──────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
enum Op {
    AddLayer(u8),
    RemoveLayer(usize),
    RemoveLayerBatch(Vec<usize>),
    ActivateLayer(usize),
    AddMaterial(u8),
    RemoveMaterial(usize),
    AddEdge(u8),
    RemoveElement(usize),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0u8..8).prop_map(Op::AddLayer),
        any::<usize>().prop_map(Op::RemoveLayer),
        prop::collection::vec(any::<usize>(), 1..4).prop_map(Op::RemoveLayerBatch),
        any::<usize>().prop_map(Op::ActivateLayer),
        (0u8..8).prop_map(Op::AddMaterial),
        any::<usize>().prop_map(Op::RemoveMaterial),
        (1u8..50).prop_map(Op::AddEdge),
        any::<usize>().prop_map(Op::RemoveElement),
    ]
}

fn pick(pids: &[PersistentId], index: usize) -> Option<PersistentId> {
    (!pids.is_empty()).then(|| pids[index % pids.len()])
}

/// Apply one operation; returns the PIDs it created.
///
/// Failures are expected (duplicate names, default layer removal) and only
/// matter through the invariants checked afterwards.
fn apply(model: &mut Model, op: &Op) -> Vec<PersistentId> {
    match op {
        Op::AddLayer(n) => {
            let pid = model.create_layer(&format!("L{n}"));
            if model.add_layers(&[pid]).is_err() {
                let _ = model.release_entity(pid);
            }
            vec![pid]
        }
        Op::RemoveLayer(i) => {
            if let Some(pid) = pick(&model.layers(usize::MAX), *i) {
                let _ = model.remove_layers(&[pid]);
            }
            Vec::new()
        }
        Op::RemoveLayerBatch(indices) => {
            let layers = model.layers(usize::MAX);
            let batch: Vec<PersistentId> =
                indices.iter().filter_map(|i| pick(&layers, *i)).collect();
            let _ = model.remove_layers(&batch);
            Vec::new()
        }
        Op::ActivateLayer(i) => {
            if let Some(pid) = pick(&model.layers(usize::MAX), *i) {
                let _ = model.set_active_layer(pid);
            }
            Vec::new()
        }
        Op::AddMaterial(n) => {
            let pid = model.create_material(&format!("M{n}"));
            let _ = model.add_materials(&[pid]);
            vec![pid]
        }
        Op::RemoveMaterial(i) => {
            if let Some(pid) = pick(&model.materials(usize::MAX), *i) {
                let _ = model.remove_materials(&[pid]);
            }
            Vec::new()
        }
        Op::AddEdge(len) => model
            .add_edge(
                ContainerId::Root,
                Point3::origin(),
                Point3::new(f64::from(*len), 0.0, 0.0),
            )
            .map(|pid| vec![pid])
            .unwrap_or_default(),
        Op::RemoveElement(i) => {
            let members: Vec<PersistentId> = model.root().iter().collect();
            if let Some(pid) = pick(&members, *i) {
                let _ = model.remove_from_container(ContainerId::Root, &[pid]);
            }
            Vec::new()
        }
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 1 + 2. PID uniqueness and no reuse
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn pids_unique_and_never_reused(ops in prop::collection::vec(op_strategy(), 1..60)) {
        let mut model = Model::new();
        let mut issued: HashSet<PersistentId> =
            model.registry().iter().map(|(pid, _)| pid).collect();
        let mut highest = issued.iter().copied().max().unwrap_or(PersistentId::NULL);

        for op in &ops {
            for pid in apply(&mut model, op) {
                prop_assert!(pid.is_valid(), "{:?} produced invalid {}", op, pid);
                prop_assert!(issued.insert(pid), "{:?} reused {}", op, pid);
                prop_assert!(pid > highest, "{:?} issued {} after {}", op, pid, highest);
                highest = pid;
            }

            let live: Vec<PersistentId> = model.registry().iter().map(|(pid, _)| pid).collect();
            let distinct: HashSet<PersistentId> = live.iter().copied().collect();
            prop_assert_eq!(live.len(), distinct.len());
            for (pid, entity) in model.registry().iter() {
                prop_assert_eq!(entity.pid(), pid);
                prop_assert!(issued.contains(&pid));
            }
        }
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 3 + 4. Default and active layer
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn default_layer_survives_any_removal(ops in prop::collection::vec(op_strategy(), 1..60)) {
        let mut model = Model::new();
        let default_layer = model.default_layer();

        for op in &ops {
            apply(&mut model, op);

            let layers = model.layers(usize::MAX);
            prop_assert_eq!(model.default_layer(), default_layer);
            prop_assert_eq!(
                layers.iter().filter(|pid| **pid == default_layer).count(),
                1,
                "default layer missing or repeated after {:?}",
                op
            );
            prop_assert!(layers.contains(&model.active_layer()));

            // Every element sits on a live layer of the model
            for entity in model.root().resolve(model.registry()) {
                let layer = entity.drawing().map(|d| d.layer()).unwrap_or(default_layer);
                prop_assert!(layers.contains(&layer), "element on removed layer {}", layer);
            }
        }
    }
}

proptest! {
    #[test]
    fn removing_only_the_default_layer_fails(extra in 0usize..5) {
        let mut model = Model::new();
        for i in 0..extra {
            let pid = model.create_layer(&format!("Extra{i}"));
            prop_assert!(model.add_layers(&[pid]).is_ok());
        }
        let before = model.layers(usize::MAX);

        prop_assert!(model.remove_layers(&[model.default_layer()]).is_err());
        prop_assert_eq!(model.layers(usize::MAX), before);
    }
}
