//! Geometry and model comparison utilities for tests.
//!
//! Provides tolerance-based f64/point assertions, face-loop snapshots of a
//! container, and whole-model comparisons used by the roundtrip tests.

#![allow(dead_code)]

use skpdoc::{ContainerId, Model, Point3};

/// Default tolerance for floating-point comparisons.
pub const TOL: f64 = 1e-6;

// ===========================================================================
// Scalar & point assertions
// ===========================================================================

/// Check approximate equality of two f64 values within `tol`.
pub fn approx_eq(a: f64, b: f64, tol: f64) -> bool {
    (a - b).abs() < tol
}

/// Assert two f64 values are approximately equal.
pub fn assert_f64_eq(a: f64, b: f64, tol: f64) {
    assert!(
        approx_eq(a, b, tol),
        "f64 mismatch: {a} vs {b} (delta={}, tol={tol})",
        (a - b).abs()
    );
}

/// Assert two points are approximately equal component-wise.
pub fn assert_point_eq(a: &Point3, b: &Point3, tol: f64) {
    assert!(
        approx_eq(a.x, b.x, tol) && approx_eq(a.y, b.y, tol) && approx_eq(a.z, b.z, tol),
        "Point3 mismatch: ({},{},{}) vs ({},{},{}) tol={tol}",
        a.x, a.y, a.z, b.x, b.y, b.z
    );
}

// ===========================================================================
// Geometry snapshots
// ===========================================================================

/// Outer loops of every face in a container, in member order.
pub fn face_loops(model: &Model, id: ContainerId) -> Vec<Vec<Point3>> {
    model
        .iter_entities(id)
        .expect("container")
        .filter_map(|e| e.as_face())
        .map(|f| f.outer_loop.clone())
        .collect()
}

/// Number of faces in a container.
pub fn face_count(model: &Model, id: ContainerId) -> usize {
    face_loops(model, id).len()
}

// ===========================================================================
// Model comparison
// ===========================================================================

/// Assert two models agree on everything a save/load must preserve.
pub fn assert_models_equivalent(expected: &Model, actual: &Model) {
    assert_eq!(
        super::statistics_histogram(expected),
        super::statistics_histogram(actual),
        "statistics differ"
    );
    assert_eq!(super::scene_names(expected), super::scene_names(actual));
    assert_eq!(super::layer_names(expected), super::layer_names(actual));
    assert_eq!(super::material_names(expected), super::material_names(actual));
    assert_eq!(
        super::definition_names(expected),
        super::definition_names(actual)
    );
    assert_eq!(expected.default_layer(), actual.default_layer());
    assert!(
        expected
            .attribute_dictionaries()
            .same_contents(actual.attribute_dictionaries()),
        "model attribute dictionaries differ"
    );
}
