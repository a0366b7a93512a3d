//! Image entity

use crate::entities::{DrawingCommon, EntityCommon};
use crate::types::{PersistentId, Transform};

/// A raster image placed in the model.
///
/// Each image places an image-kind definition and uniquely owns a private
/// material that carries its pixels; that material is never shared.
#[derive(Debug, Clone, PartialEq)]
pub struct Image {
    pub common: EntityCommon,
    pub drawing: DrawingCommon,
    pub(crate) definition: PersistentId,
    pub file_name: String,
    pub width: f64,
    pub height: f64,
    pub transform: Transform,
    /// Private material owned by this image
    pub(crate) image_material: Option<PersistentId>,
}

impl Image {
    /// Create a new image
    pub fn new(definition: PersistentId, file_name: impl Into<String>, width: f64, height: f64) -> Self {
        Image {
            common: EntityCommon::default(),
            drawing: DrawingCommon::default(),
            definition,
            file_name: file_name.into(),
            width,
            height,
            transform: Transform::identity(),
            image_material: None,
        }
    }

    /// Get the placed definition
    pub fn definition(&self) -> PersistentId {
        self.definition
    }

    /// Private material carrying the image's pixels
    pub fn image_material(&self) -> Option<PersistentId> {
        self.image_material
    }
}
