//! Save/load roundtrip tests.
//!
//! A model written in some format version and read back must keep its
//! entity statistics, scene names and order, layer set (default layer
//! included) and attribute dictionaries. Saving replaces the GUID.

mod common;

use common::builders::{populated_model, square};
use common::comparison::{assert_f64_eq, assert_models_equivalent, assert_point_eq, TOL};
use common::{roundtrip, save_and_reload, scene_names, LEGACY_VERSIONS, ROUNDTRIP_VERSIONS};
use skpdoc::attributes::AttributeValue;
use skpdoc::io::WRITER_VERSION;
use skpdoc::{ContainerId, EntityKind, Model, ModelVersion, Point3};

// ===========================================================================
// Full model
// ===========================================================================

#[test]
fn test_populated_model_file_roundtrip() {
    let mut house = populated_model();
    let original_guid = house.model.guid();

    let (loaded, _dir, path) = save_and_reload(&mut house.model, ModelVersion::CURRENT);

    assert_models_equivalent(&house.model, &loaded);
    assert_ne!(house.model.guid(), original_guid, "save must assign a new GUID");
    assert_eq!(loaded.guid(), house.model.guid());
    assert_eq!(house.model.path(), Some(path.as_path()));
    assert_eq!(loaded.name(), "House");
    assert_eq!(loaded.description(), "Roundtrip fixture");
}

#[test]
fn test_save_over_existing_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("house.skp");

    let mut house = populated_model();
    house.model.save(&path).unwrap();
    let first = std::fs::read(&path).unwrap();

    // A refused save leaves the earlier file as it was
    assert!(house.model.save_with_version(&path, ModelVersion::SU8).is_err());
    assert_eq!(std::fs::read(&path).unwrap(), first);

    house.model.set_name("Renovated");
    house.model.save(&path).unwrap();
    assert_eq!(Model::load_from_file(&path).unwrap().name(), "Renovated");

    // No temporary files are left next to the model
    let entries: Vec<_> = std::fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name())
        .collect();
    assert_eq!(entries, vec![std::ffi::OsString::from("house.skp")]);
}

#[test]
fn test_roundtrip_in_every_version_that_stores_fonts() {
    for version in ROUNDTRIP_VERSIONS {
        let mut house = populated_model();
        let loaded = roundtrip(&mut house.model, version);
        assert_models_equivalent(&house.model, &loaded);
        assert_eq!(loaded.num_fonts(), 1, "{version}");
        assert_eq!(loaded.version(), WRITER_VERSION, "{version}");
    }
}

#[test]
fn test_pids_survive_roundtrip() {
    let mut house = populated_model();
    let loaded = roundtrip(&mut house.model, ModelVersion::CURRENT);

    for pid in house.instances.iter().chain([&house.floor, &house.group]) {
        let before = house.model.entity(*pid).unwrap();
        let after = loaded.entity(*pid).unwrap();
        assert_eq!(before.kind(), after.kind());
        assert!(loaded.contains(ContainerId::Root, *pid));
    }
    assert_eq!(loaded.layer_by_name("Walls"), Some(house.walls));
    assert_eq!(loaded.material_by_name("Brick"), Some(house.brick));
    assert_eq!(loaded.definition_by_name("Window"), Some(house.window));

    // New entities continue after the highest loaded PID
    let mut loaded = loaded;
    let highest = loaded.registry().iter().map(|(pid, _)| pid).max().unwrap();
    let fresh = loaded.create_layer("Fresh");
    assert!(fresh > highest);
}

#[test]
fn test_references_survive_roundtrip() {
    let mut house = populated_model();
    let loaded = roundtrip(&mut house.model, ModelVersion::CURRENT);

    let floor = loaded.entity(house.floor).unwrap();
    let drawing = floor.drawing().unwrap();
    assert_eq!(drawing.layer(), house.walls);
    assert_eq!(drawing.material(), Some(house.brick));

    let top = loaded.entity(house.scenes[2]).unwrap().as_scene().unwrap();
    assert_eq!(top.layer_visibility(house.roof), Some(false));
    assert_eq!(loaded.active_scene().unwrap(), house.scenes[1]);

    let instance = loaded.entity(house.instances[1]).unwrap().as_instance().unwrap();
    assert_eq!(instance.definition(), house.window);
    let placed = instance.transform_point(&Point3::origin());
    assert_point_eq(&placed, &Point3::new(5.0, 0.0, 3.0), TOL);
}

#[test]
fn test_attributes_survive_roundtrip() {
    let mut house = populated_model();
    let loaded = roundtrip(&mut house.model, ModelVersion::CURRENT);

    let project = loaded.attribute_dictionaries().get("project").unwrap();
    assert_eq!(project.get("name").and_then(AttributeValue::as_str), Some("Cottage"));
    assert_eq!(project.get("floors").and_then(AttributeValue::as_int), Some(2));
    assert_f64_eq(
        project.get("area").and_then(AttributeValue::as_double).unwrap(),
        84.5,
        TOL,
    );
    assert_eq!(project.get("draft").and_then(AttributeValue::as_bool), Some(true));

    let window = loaded
        .entity_attributes(house.instances[0])
        .unwrap()
        .get("window")
        .unwrap();
    assert_eq!(window.get("glazing").and_then(AttributeValue::as_str), Some("double"));
}

#[test]
fn test_geometry_survives_roundtrip() {
    let mut house = populated_model();
    let loaded = roundtrip(&mut house.model, ModelVersion::CURRENT);

    let floor = loaded.entity(house.floor).unwrap().as_face().unwrap();
    let expected = square(0.0, 0.0, 10.0, 0.0);
    assert_eq!(floor.outer_loop.len(), expected.len());
    for (a, b) in floor.outer_loop.iter().zip(&expected) {
        assert_point_eq(a, b, TOL);
    }
    assert_f64_eq(floor.area(), 100.0, TOL);

    let before = house.model.bounds(ContainerId::Root).unwrap().unwrap();
    let after = loaded.bounds(ContainerId::Root).unwrap().unwrap();
    assert_point_eq(&before.min, &after.min, TOL);
    assert_point_eq(&before.max, &after.max, TOL);
}

// ===========================================================================
// Version specifics
// ===========================================================================

/// A model using nothing a legacy version lacks
fn plain_model(name: &str) -> Model {
    let mut model = Model::new();
    model.set_name(name);
    let layer = model.create_layer("Terrain");
    model.add_layers(&[layer]).unwrap();
    model
        .add_face(ContainerId::Root, square(0.0, 0.0, 4.0, 0.0))
        .unwrap();
    let scene = model.create_scene("Overview");
    model.add_scenes(&[scene]).unwrap();
    model.attribute_dictionary("survey").set("plot", 17i64);
    model
}

#[test]
fn test_legacy_versions_roundtrip() {
    for version in LEGACY_VERSIONS {
        let mut model = plain_model("Caf\u{e9}");
        let loaded = roundtrip(&mut model, version);
        assert_models_equivalent(&model, &loaded);
        assert_eq!(loaded.name(), "Caf\u{e9}", "{version}");
        assert_eq!(loaded.statistics().count(EntityKind::Face), 1, "{version}");
    }
}

#[test]
fn test_active_layer_is_stored_only_by_newest_format() {
    let mut model = plain_model("Layers");
    let terrain = model.layer_by_name("Terrain").unwrap();
    model.set_active_layer(terrain).unwrap();

    let current = roundtrip(&mut model, ModelVersion::SU2020);
    assert_eq!(current.active_layer(), terrain);

    let older = roundtrip(&mut model, ModelVersion::SU2019);
    assert_eq!(older.active_layer(), older.default_layer());
}

#[test]
fn test_image_roundtrip_from_2019() {
    let mut model = Model::new();
    let image = model.create_image("site/plan.png", 4.0, 3.0).unwrap();
    model.add_to_container(ContainerId::Root, &[image]).unwrap();

    let loaded = roundtrip(&mut model, ModelVersion::SU2019);
    assert_eq!(loaded.statistics().count(EntityKind::Image), 1);
    assert_eq!(loaded.num_image_definitions(), 1);
    assert_eq!(loaded.num_all_materials(), model.num_all_materials());
    assert_eq!(loaded.num_materials(), 0);
}

#[test]
fn test_georeference_roundtrip() {
    let mut model = plain_model("Site");
    model
        .set_geo_reference(47.37, 8.54, 408.0, false, false)
        .unwrap();

    let loaded = roundtrip(&mut model, ModelVersion::SU2015);
    assert!(loaded.is_geo_referenced());
    assert_f64_eq(loaded.location().latitude, 47.37, TOL);
    assert_f64_eq(loaded.location().longitude, 8.54, TOL);
}

#[test]
fn test_scene_order_survives_file_roundtrip() {
    let mut house = populated_model();
    let side = house.model.create_scene("Side");
    house.model.add_scene(0, side).unwrap();

    let (loaded, _dir, _path) = save_and_reload(&mut house.model, ModelVersion::SU2018);
    assert_eq!(scene_names(&loaded), ["Side", "Front", "Back", "Top"]);
}
