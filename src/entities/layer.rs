//! Layer entity

use crate::entities::EntityCommon;
use crate::types::{Color, PersistentId};

/// A layer (tag).
///
/// Visibility applies to every drawing element on the layer. A layer may own
/// a private material that is never shared with drawing elements.
#[derive(Debug, Clone, PartialEq)]
pub struct Layer {
    pub common: EntityCommon,
    pub(crate) name: String,
    pub visible: bool,
    pub color: Color,
    /// Private material owned by this layer
    pub(crate) layer_material: Option<PersistentId>,
    /// Line style name, if one is applied
    pub line_style: Option<String>,
}

/// Name of the layer every model starts with
pub const DEFAULT_LAYER_NAME: &str = "Layer0";

impl Layer {
    /// Create a new layer
    pub fn new(name: impl Into<String>) -> Self {
        Layer {
            common: EntityCommon::default(),
            name: name.into(),
            visible: true,
            color: Color::WHITE,
            layer_material: None,
            line_style: None,
        }
    }

    /// The standard default layer
    pub fn layer_0() -> Self {
        Self::new(DEFAULT_LAYER_NAME)
    }

    /// Layer name; unique within a model. Rename through
    /// [`Model::rename_layer`](crate::Model::rename_layer).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the layer's own material
    pub fn layer_material(&self) -> Option<PersistentId> {
        self.layer_material
    }

    /// Hide the layer
    pub fn hide(&mut self) {
        self.visible = false;
    }

    /// Show the layer
    pub fn show(&mut self) {
        self.visible = true;
    }
}
