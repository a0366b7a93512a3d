//! # skpdoc
//!
//! A pure Rust document model for 3D modeling files.
//!
//! A [`Model`] owns every entity through a single registry keyed by
//! persistent ID, groups shared entities in ordered collections (materials,
//! layers, component definitions, scenes, fonts), and keeps geometry in a
//! scene graph of nested entities containers. Models load from and save to a
//! versioned binary container.
//!
//! ## Features
//!
//! - Persistent IDs that are unique, monotonic and stable across save/load
//! - Collections with default-layer, unique-name and cascade-removal rules
//! - Batch operations that report per-element failures
//! - Instance path resolution and visibility through nested instancing
//! - Geometry passes: coplanar face merge, face orientation, repair
//! - Saving to fourteen historical format versions with lossless downgrade
//!   checks
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use skpdoc::{ContainerId, Model, Point3};
//!
//! let mut model = Model::new();
//! let edge = model.add_edge(
//!     ContainerId::Root,
//!     Point3::origin(),
//!     Point3::new(100.0, 0.0, 0.0),
//! )?;
//! model.save("shed.skpdoc")?;
//!
//! let loaded = Model::load_from_file("shed.skpdoc")?;
//! assert!(loaded.entity(edge).is_ok());
//! # Ok::<(), skpdoc::ModelError>(())
//! ```
//!
//! ## Architecture
//!
//! - `EntityRegistry` - identity and ownership ledger
//! - `CollectionManager` - shared behaviour of the model's collections
//! - `Entities` - one container of drawing elements
//! - `ModelReader` / `ModelWriter` - the binary container

#![allow(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod attributes;
pub mod collections;
pub mod entities;
pub mod error;
pub mod geometry;
pub mod instance_path;
pub mod io;
pub mod model;
pub mod notification;
pub mod registry;
pub mod scene_graph;
pub mod settings;
pub mod types;

// Re-export commonly used types
pub use error::{BatchFailures, ErrorKind, ModelError, Result};
pub use model::{Model, ModelStatistics};
pub use registry::{EntityRegistry, Owner};
pub use scene_graph::{ContainerId, Entities};
pub use types::{
    BoundingBox3D, Color, FileVersion, ModelVersion, PersistentId, PidPath, Point3, Transform,
    Units, Vector3,
};

// Re-export entity types
pub use entities::{
    ComponentDefinition, ComponentInstance, DefinitionKind, EntityKind, EntityType, Face, Group,
    Image, Layer, Material, Scene,
};
pub use instance_path::{InstancePath, PathResolution};
