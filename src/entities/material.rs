//! Material entity

use crate::entities::EntityCommon;
use crate::types::Color;

/// Texture applied by a material
#[derive(Debug, Clone, PartialEq)]
pub struct Texture {
    pub file_name: String,
    /// Real-world size of one texture tile
    pub width: f64,
    pub height: f64,
}

/// A named material
#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    pub common: EntityCommon,
    pub name: String,
    pub color: Color,
    /// 0.0 (transparent) ..= 1.0 (opaque)
    pub opacity: f64,
    pub texture: Option<Texture>,
}

impl Material {
    /// Create a new material
    pub fn new(name: impl Into<String>) -> Self {
        Material {
            common: EntityCommon::default(),
            name: name.into(),
            color: Color::WHITE,
            opacity: 1.0,
            texture: None,
        }
    }

    /// Create a material with a color
    pub fn with_color(name: impl Into<String>, color: Color) -> Self {
        Material {
            color,
            ..Self::new(name)
        }
    }

    /// Check if the material has any transparency
    pub fn is_transparent(&self) -> bool {
        self.opacity < 1.0
    }
}
