//! Shared test utilities for skpdoc integration tests.
//!
//! Consolidates the helpers every integration test needs (model builders,
//! save/load roundtrips, name collectors, statistics histograms) into a
//! single module that all test crates import via `mod common;`.

#![allow(dead_code)]

pub mod builders;
pub mod comparison;

use skpdoc::io::{ModelReader, ReaderConfiguration};
use skpdoc::{EntityKind, Model, ModelVersion};
use std::collections::BTreeMap;
use std::path::PathBuf;
use tempfile::TempDir;

// ===========================================================================
// Version constants
// ===========================================================================

/// Versions that can store everything [`builders::populated_model`] uses.
pub const ROUNDTRIP_VERSIONS: [ModelVersion; 4] = [
    ModelVersion::SU2017,
    ModelVersion::SU2018,
    ModelVersion::SU2019,
    ModelVersion::SU2020,
];

/// Versions that encode text as Windows-1252 and store the body uncompressed.
pub const LEGACY_VERSIONS: [ModelVersion; 6] = [
    ModelVersion::SU3,
    ModelVersion::SU4,
    ModelVersion::SU5,
    ModelVersion::SU6,
    ModelVersion::SU7,
    ModelVersion::SU8,
];

// ===========================================================================
// Save / load helpers
// ===========================================================================

/// Serialize `model` in memory and read it back.
pub fn roundtrip(model: &mut Model, version: ModelVersion) -> Model {
    let bytes = model
        .to_bytes(version)
        .unwrap_or_else(|e| panic!("Failed to write {version}: {e:?}"));
    Model::load_from_buffer(&bytes)
        .unwrap_or_else(|e| panic!("Failed to read back {version}: {e:?}"))
}

/// Save `model` into a fresh temporary directory and load the file again.
///
/// The directory is returned so the file outlives the call.
pub fn save_and_reload(model: &mut Model, version: ModelVersion) -> (Model, TempDir, PathBuf) {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join(format!("model_{version}.skp"));
    model
        .save_with_version(&path, version)
        .unwrap_or_else(|e| panic!("Failed to save {}: {e:?}", path.display()));
    let loaded = Model::load_from_file(&path)
        .unwrap_or_else(|e| panic!("Failed to load {}: {e:?}", path.display()));
    (loaded, dir, path)
}

/// Read a file image with dangling references repaired instead of fatal.
pub fn read_failsafe(bytes: Vec<u8>) -> Model {
    let config = ReaderConfiguration {
        failsafe: true,
        ..Default::default()
    };
    ModelReader::from_bytes(bytes)
        .with_config(config)
        .read()
        .unwrap_or_else(|e| panic!("Failed to read in failsafe mode: {e:?}"))
}

// ===========================================================================
// Statistics
// ===========================================================================

/// Sorted map of kind name to count, for readable assertion failures.
pub fn statistics_histogram(model: &Model) -> BTreeMap<&'static str, usize> {
    let stats = model.statistics();
    EntityKind::STATISTICS
        .iter()
        .map(|kind| (kind.name(), stats.count(*kind)))
        .collect()
}

// ===========================================================================
// Name collectors
// ===========================================================================

fn names_of(model: &Model, pids: Vec<skpdoc::PersistentId>) -> Vec<String> {
    pids.into_iter()
        .map(|pid| {
            model
                .entity(pid)
                .ok()
                .and_then(|e| e.name())
                .unwrap_or_default()
                .to_string()
        })
        .collect()
}

/// Layer names in collection order (the default layer comes first).
pub fn layer_names(model: &Model) -> Vec<String> {
    names_of(model, model.layers(usize::MAX))
}

/// Scene names in scene order; empty when the model has no scenes.
pub fn scene_names(model: &Model) -> Vec<String> {
    names_of(model, model.scenes(usize::MAX).unwrap_or_default())
}

/// Shared material names in collection order.
pub fn material_names(model: &Model) -> Vec<String> {
    names_of(model, model.materials(usize::MAX))
}

/// Component definition names, sorted.
pub fn definition_names(model: &Model) -> Vec<String> {
    let mut names = names_of(model, model.component_definitions(usize::MAX));
    names.sort();
    names
}
