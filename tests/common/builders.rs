//! Test model builders.
//!
//! `populated_model()` produces a model that touches every collection the
//! container format stores: extra layers, a shared material, a component
//! placed twice, a group, scenes with layer overrides, fonts and attribute
//! dictionaries. `nested_model()` builds the two-level instancing chain the
//! instance path tests walk.

#![allow(dead_code)]

use skpdoc::{ComponentInstance, ContainerId, Model, PersistentId, Point3, Vector3};

/// Counter-clockwise square in the XY plane at height `z`.
pub fn square(x0: f64, y0: f64, size: f64, z: f64) -> Vec<Point3> {
    vec![
        Point3::new(x0, y0, z),
        Point3::new(x0 + size, y0, z),
        Point3::new(x0 + size, y0 + size, z),
        Point3::new(x0, y0 + size, z),
    ]
}

/// Handles into the model built by [`populated_model`].
pub struct House {
    pub model: Model,
    pub walls: PersistentId,
    pub roof: PersistentId,
    pub brick: PersistentId,
    pub window: PersistentId,
    pub instances: Vec<PersistentId>,
    pub group: PersistentId,
    pub floor: PersistentId,
    pub scenes: Vec<PersistentId>,
}

/// A small house with one of everything.
pub fn populated_model() -> House {
    let mut model = Model::new();
    model.set_name("House");
    model.set_description("Roundtrip fixture");

    // Layers
    let walls = model.create_layer("Walls");
    let roof = model.create_layer("Roof");
    model.add_layers(&[walls, roof]).expect("layers");

    // Materials
    let brick = model.create_material("Brick");
    model.add_materials(&[brick]).expect("material");

    // A window component with two panes, placed twice
    let window = model.create_definition("Window");
    model.add_component_definitions(&[window]).expect("definition");
    let inside = ContainerId::Definition(window);
    model.add_face(inside, square(0.0, 0.0, 1.0, 0.0)).expect("pane");
    model.add_face(inside, square(1.0, 0.0, 1.0, 0.0)).expect("pane");

    let instances = [0.0, 5.0]
        .iter()
        .map(|x| {
            model
                .add_instance(
                    ContainerId::Root,
                    window,
                    ComponentInstance::translation(Vector3::new(*x, 0.0, 3.0)),
                )
                .expect("instance")
        })
        .collect::<Vec<_>>();

    // Floor on the walls layer with the brick material
    let floor = model
        .add_face(ContainerId::Root, square(0.0, 0.0, 10.0, 0.0))
        .expect("floor");
    model.set_entity_layer(floor, walls).expect("floor layer");
    model.set_entity_material(floor, Some(brick)).expect("floor material");
    model
        .add_edge(
            ContainerId::Root,
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(0.0, 0.0, 3.0),
        )
        .expect("edge");

    // A group holding the ridge line
    let group = model.add_group(ContainerId::Root).expect("group");
    let group_def = model
        .entity(group)
        .expect("group")
        .definition()
        .expect("group definition");
    model
        .add_edge(
            ContainerId::Definition(group_def),
            Point3::new(0.0, 5.0, 6.0),
            Point3::new(10.0, 5.0, 6.0),
        )
        .expect("ridge");

    // Scenes
    let scenes = ["Front", "Back", "Top"]
        .iter()
        .map(|name| model.create_scene(name))
        .collect::<Vec<_>>();
    model
        .set_scene_layer_visibility(scenes[2], roof, false)
        .expect("layer override");
    model.add_scenes(&scenes).expect("scenes");
    model.set_active_scene(scenes[1]).expect("active scene");

    model.create_font("Arial", false, false);

    // Attributes on the model and on one instance
    let project = model.attribute_dictionary("project");
    project.set("name", "Cottage");
    project.set("floors", 2i64);
    project.set("area", 84.5);
    project.set("draft", true);
    model
        .entity_attributes_mut(instances[0])
        .expect("instance attributes")
        .get_or_create("window")
        .set("glazing", "double");

    House {
        model,
        walls,
        roof,
        brick,
        window,
        instances,
        group,
        floor,
        scenes,
    }
}

/// Handles into the model built by [`nested_model`].
pub struct Nested {
    pub model: Model,
    pub outer_def: PersistentId,
    pub inner_def: PersistentId,
    pub outer: PersistentId,
    pub inner: PersistentId,
    pub edge: PersistentId,
}

/// root -> outer instance -> inner instance -> edge
pub fn nested_model() -> Nested {
    let mut model = Model::new();

    let inner_def = model.create_definition("Inner");
    let outer_def = model.create_definition("Outer");
    model
        .add_component_definitions(&[inner_def, outer_def])
        .expect("definitions");

    let edge = model
        .add_edge(
            ContainerId::Definition(inner_def),
            Point3::origin(),
            Point3::new(1.0, 0.0, 0.0),
        )
        .expect("edge");
    let inner = model
        .add_instance(
            ContainerId::Definition(outer_def),
            inner_def,
            ComponentInstance::translation(Vector3::new(0.0, 2.0, 0.0)),
        )
        .expect("inner");
    let outer = model
        .add_instance(
            ContainerId::Root,
            outer_def,
            ComponentInstance::translation(Vector3::new(10.0, 0.0, 0.0)),
        )
        .expect("outer");

    Nested {
        model,
        outer_def,
        inner_def,
        outer,
        inner,
        edge,
    }
}
