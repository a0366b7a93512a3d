//! Format version gating.
//!
//! Saving to a version that cannot store something the model uses must fail
//! with `ModelVersion` before anything is written, and must leave the model
//! untouched (same GUID, same path).

mod common;

use common::builders::populated_model;
use common::roundtrip;
use skpdoc::io::{VersionStrategy, STRATEGY_TABLE};
use skpdoc::settings::Camera;
use skpdoc::{ContainerId, ErrorKind, Model, ModelVersion};

/// Assert a file save fails with `ModelVersion` and leaves no trace.
fn assert_refused(model: &mut Model, version: ModelVersion) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("refused.skp");
    let guid = model.guid();
    let previous_path = model.path().map(|p| p.to_path_buf());

    let err = model.save_with_version(&path, version).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ModelVersion, "{version}: {err}");
    assert!(!path.exists(), "{version}: nothing may be written");
    assert_eq!(model.guid(), guid, "{version}: GUID must not change");
    assert_eq!(model.path().map(|p| p.to_path_buf()), previous_path);
}

#[test]
fn test_fonts_need_2017() {
    let mut house = populated_model();
    for version in [ModelVersion::SU8, ModelVersion::SU2013, ModelVersion::SU2016] {
        assert_refused(&mut house.model, version);
    }
    assert!(house.model.to_bytes(ModelVersion::SU2017).is_ok());
}

#[test]
fn test_images_need_2019() {
    let mut model = Model::new();
    let image = model.create_image("facade.jpg", 8.0, 6.0).unwrap();
    model.add_to_container(ContainerId::Root, &[image]).unwrap();

    assert_refused(&mut model, ModelVersion::SU2018);
    assert!(model.to_bytes(ModelVersion::SU2019).is_ok());
}

#[test]
fn test_georeference_needs_su4() {
    let mut model = Model::new();
    model.set_geo_reference(-33.86, 151.21, 3.0, false, false).unwrap();

    assert_refused(&mut model, ModelVersion::SU3);
    assert!(model.to_bytes(ModelVersion::SU4).is_ok());
}

#[test]
fn test_classifications_need_2014() {
    let mut model = Model::new();
    model.classifications_mut().load_schema("IFC 2x3");

    assert_refused(&mut model, ModelVersion::SU2013);
    let loaded = roundtrip(&mut model, ModelVersion::SU2014);
    assert!(loaded.classifications().contains("IFC 2x3"));
}

#[test]
fn test_match_photo_scenes_need_su7() {
    let dir = tempfile::tempdir().unwrap();
    let photo = dir.path().join("street.jpg");
    std::fs::write(&photo, b"not really a jpeg").unwrap();

    let mut model = Model::new();
    model
        .add_match_photo_scene(&photo, Camera::default(), "Street")
        .unwrap();

    assert_refused(&mut model, ModelVersion::SU6);
    assert!(model.to_bytes(ModelVersion::SU7).is_ok());
}

#[test]
fn test_missing_photo_is_generic_error() {
    let mut model = Model::new();
    let err = model
        .add_match_photo_scene("/no/such/photo.jpg", Camera::default(), "Ghost")
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Generic);
    assert_eq!(model.num_scenes(), 0);
}

#[test]
fn test_text_outside_windows_1252_needs_2013() {
    let mut model = Model::new();
    model.set_name("\u{6a21}\u{578b}");

    assert_refused(&mut model, ModelVersion::SU8);
    let loaded = roundtrip(&mut model, ModelVersion::SU2013);
    assert_eq!(loaded.name(), "\u{6a21}\u{578b}");
}

#[test]
fn test_every_version_saves_an_empty_model() {
    for version in ModelVersion::ALL {
        let mut model = Model::new();
        let loaded = roundtrip(&mut model, version);
        assert_eq!(loaded.num_layers(), 1, "{version}");
        assert_eq!(loaded.default_layer(), model.default_layer(), "{version}");
    }
}

#[test]
fn test_strategy_table_is_monotonic() {
    assert_eq!(STRATEGY_TABLE.len(), ModelVersion::ALL.len());
    for pair in STRATEGY_TABLE.windows(2) {
        let (old, new): (&VersionStrategy, &VersionStrategy) = (&pair[0], &pair[1]);
        assert!(old.version < new.version);
        // A capability, once gained, is never lost
        assert!(!old.fonts || new.fonts);
        assert!(!old.georeference || new.georeference);
        assert!(!old.classifications || new.classifications);
        assert!(!old.image_definitions || new.image_definitions);
        assert!(!old.unicode_text || new.unicode_text);
    }
}

#[test]
fn test_unknown_version_names_do_not_parse() {
    assert_eq!(ModelVersion::parse("SU2017"), Some(ModelVersion::SU2017));
    assert_eq!(ModelVersion::parse("2013"), Some(ModelVersion::SU2013));
    assert_eq!(ModelVersion::parse("SU8"), Some(ModelVersion::SU8));
    assert_eq!(ModelVersion::parse("SU2011"), None);
    assert_eq!(ModelVersion::parse("latest"), None);
}
