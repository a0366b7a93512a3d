//! Core value types shared across the model

pub mod bounds;
pub mod color;
pub mod pid;
pub mod version;

pub use bounds::BoundingBox3D;
pub use color::Color;
pub use pid::{PersistentId, PidPath, PID_PATH_SEPARATOR};
pub use version::{FileVersion, ModelVersion, Units};

/// Point in model space
pub type Point3 = nalgebra::Point3<f64>;

/// Direction or offset in model space
pub type Vector3 = nalgebra::Vector3<f64>;

/// Affine placement of an instance inside its parent container
pub type Transform = nalgebra::Matrix4<f64>;

/// Distance tolerance used by geometry comparisons (model units)
pub const LENGTH_TOLERANCE: f64 = 1.0e-6;

/// Angular tolerance (cosine deviation) for coplanarity checks
pub const ANGLE_TOLERANCE: f64 = 1.0e-9;
