//! Fonts collection

use super::{Collection, CollectionManager};
use crate::entities::{EntityKind, EntityType, Font};
use crate::registry::EntityRegistry;
use crate::types::PersistentId;

/// Fonts of a model, one per face and style
#[derive(Debug, Clone, PartialEq)]
pub struct Fonts {
    set: Collection,
}

impl CollectionManager for Fonts {
    fn collection(&self) -> &Collection {
        &self.set
    }
}

impl Fonts {
    /// Create an empty font collection
    pub fn new() -> Self {
        Fonts {
            set: Collection::new(EntityKind::Font),
        }
    }

    /// Return the font with this face and style, creating it if needed
    pub fn get_or_create(
        &mut self,
        registry: &mut EntityRegistry,
        face_name: &str,
        bold: bool,
        italic: bool,
    ) -> PersistentId {
        let existing = self.set.iter().find(|pid| {
            registry
                .get(*pid)
                .and_then(EntityType::as_font)
                .is_some_and(|f| f.same_style(face_name, bold, italic))
        });
        if let Some(pid) = existing {
            return pid;
        }

        let pid = registry.register(EntityType::Font(Font::new(face_name, bold, italic)));
        // A fresh registration is always detached
        let _ = self.set.adopt(registry, pid);
        pid
    }

    pub(crate) fn insert_loaded(&mut self, pid: PersistentId) {
        self.set.insert(pid);
    }
}

impl Default for Fonts {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fonts_are_deduplicated() {
        let mut registry = EntityRegistry::new();
        let mut fonts = Fonts::new();
        let a = fonts.get_or_create(&mut registry, "Arial", false, false);
        let b = fonts.get_or_create(&mut registry, "Arial", false, false);
        let c = fonts.get_or_create(&mut registry, "Arial", true, false);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(fonts.count(), 2);
    }
}
