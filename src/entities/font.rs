//! Font entity

use crate::entities::EntityCommon;

/// A font used by text and dimensions.
///
/// Fonts are model-owned and shared; one entry exists per face name and
/// style combination.
#[derive(Debug, Clone, PartialEq)]
pub struct Font {
    pub common: EntityCommon,
    /// Face name, e.g. "Arial"
    pub face_name: String,
    pub bold: bool,
    pub italic: bool,
}

impl Font {
    /// Create a new font
    pub fn new(face_name: impl Into<String>, bold: bool, italic: bool) -> Self {
        Font {
            common: EntityCommon::default(),
            face_name: face_name.into(),
            bold,
            italic,
        }
    }

    /// Same face and style
    pub fn same_style(&self, face_name: &str, bold: bool, italic: bool) -> bool {
        self.face_name == face_name && self.bold == bold && self.italic == italic
    }
}
