//! Display styles, dimension style and line styles

use indexmap::IndexSet;

use crate::error::{ModelError, Result};

/// Named display styles with one active style
#[derive(Debug, Clone, PartialEq)]
pub struct Styles {
    names: IndexSet<String>,
    active: usize,
}

/// Style every model starts with
pub const DEFAULT_STYLE_NAME: &str = "Default Style";

impl Styles {
    /// Create with the default style active
    pub fn new() -> Self {
        let mut names = IndexSet::new();
        names.insert(DEFAULT_STYLE_NAME.to_string());
        Styles { names, active: 0 }
    }

    /// Add a style; adding an existing name is a no-op
    pub fn add(&mut self, name: impl Into<String>) -> usize {
        self.names.insert_full(name.into()).0
    }

    /// Check if an entry exists
    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    /// Get the number of entries
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Check if there are no entries
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Iterate over the names
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    /// Name of the active style
    pub fn active(&self) -> &str {
        self.names
            .get_index(self.active)
            .map(String::as_str)
            .unwrap_or(DEFAULT_STYLE_NAME)
    }

    /// Select the active style; unknown names are `InvalidArgument`
    pub fn set_active(&mut self, name: &str) -> Result<()> {
        let index = self
            .names
            .get_index_of(name)
            .ok_or_else(|| ModelError::InvalidArgument(format!("style '{name}' not in model")))?;
        self.active = index;
        Ok(())
    }
}

impl Default for Styles {
    fn default() -> Self {
        Self::new()
    }
}

/// Arrow drawn at dimension ends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum ArrowType {
    None = 0,
    Slash = 1,
    Dot = 2,
    #[default]
    Closed = 3,
    Open = 4,
}

impl ArrowType {
    /// Decode from the stored byte
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(ArrowType::None),
            1 => Some(ArrowType::Slash),
            2 => Some(ArrowType::Dot),
            3 => Some(ArrowType::Closed),
            4 => Some(ArrowType::Open),
            _ => None,
        }
    }
}

/// Model-wide dimension settings
#[derive(Debug, Clone, PartialEq)]
pub struct DimensionStyle {
    pub font_face: String,
    /// Text height in points
    pub text_height: f64,
    pub arrow_type: ArrowType,
    pub show_radial_prefix: bool,
    pub hide_out_of_plane: bool,
}

impl Default for DimensionStyle {
    fn default() -> Self {
        DimensionStyle {
            font_face: "Arial".to_string(),
            text_height: 12.0,
            arrow_type: ArrowType::Closed,
            show_radial_prefix: true,
            hide_out_of_plane: false,
        }
    }
}

/// Available edge line styles
#[derive(Debug, Clone, PartialEq)]
pub struct LineStyles {
    names: Vec<String>,
}

impl LineStyles {
    /// Create the built-in line styles
    pub fn new() -> Self {
        LineStyles {
            names: ["Solid Basic", "Dash", "Dot", "Dash Dot", "Dash Dot Dot"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }

    /// Create from a list of names
    pub fn from_names(names: Vec<String>) -> Self {
        LineStyles { names }
    }

    /// Get the number of entries
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Check if there are no entries
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Iterate over the names
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Check if an entry exists
    pub fn contains(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }
}

impl Default for LineStyles {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_styles_active() {
        let mut styles = Styles::new();
        assert_eq!(styles.active(), DEFAULT_STYLE_NAME);

        styles.add("Sketchy");
        styles.set_active("Sketchy").unwrap();
        assert_eq!(styles.active(), "Sketchy");
        assert!(styles.set_active("Missing").is_err());
        assert_eq!(styles.add("Sketchy"), 1);
        assert_eq!(styles.len(), 2);
    }
}
