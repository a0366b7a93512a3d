//! Scene entity

use bitflags::bitflags;
use indexmap::IndexMap;

use crate::entities::EntityCommon;
use crate::settings::Camera;
use crate::types::PersistentId;

bitflags! {
    /// Which properties a scene stores and restores
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct SceneFlags: u32 {
        const USE_CAMERA = 0x0001;
        const USE_RENDERING_OPTIONS = 0x0002;
        const USE_SHADOW_INFO = 0x0004;
        const USE_AXES = 0x0008;
        const USE_HIDDEN = 0x0010;
        const USE_LAYER_VISIBILITY = 0x0020;
        const USE_SECTION_PLANES = 0x0040;
        const USE_STYLE = 0x0080;
        /// Scene takes part in animations
        const INCLUDE_IN_ANIMATION = 0x0100;
    }
}

impl Default for SceneFlags {
    fn default() -> Self {
        SceneFlags::USE_CAMERA
            | SceneFlags::USE_RENDERING_OPTIONS
            | SceneFlags::USE_SHADOW_INFO
            | SceneFlags::USE_LAYER_VISIBILITY
            | SceneFlags::USE_STYLE
            | SceneFlags::INCLUDE_IN_ANIMATION
    }
}

/// A named camera snapshot plus per-layer visibility overrides
#[derive(Debug, Clone, PartialEq)]
pub struct Scene {
    pub common: EntityCommon,
    /// Scene name, unique within a model
    pub(crate) name: String,
    pub description: String,
    pub camera: Camera,
    pub flags: SceneFlags,
    /// Layer visibility overrides keyed by layer PID
    pub(crate) layer_visibility: IndexMap<PersistentId, bool>,
    /// Name of the style applied by the scene
    pub style: Option<String>,
    /// Photo matched by a match-photo scene
    pub photo_image: Option<String>,
}

impl Scene {
    /// Create a new scene
    pub fn new(name: impl Into<String>) -> Self {
        Scene {
            common: EntityCommon::default(),
            name: name.into(),
            description: String::new(),
            camera: Camera::default(),
            flags: SceneFlags::default(),
            layer_visibility: IndexMap::new(),
            style: None,
            photo_image: None,
        }
    }

    /// Set the camera
    pub fn with_camera(mut self, camera: Camera) -> Self {
        self.camera = camera;
        self
    }

    /// Scene name; unique within a model
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Override the visibility of a layer while this scene is active
    pub(crate) fn set_layer_visibility(&mut self, layer: PersistentId, visible: bool) {
        self.layer_visibility.insert(layer, visible);
    }

    /// Overridden visibility for `layer`, if any
    pub fn layer_visibility(&self, layer: PersistentId) -> Option<bool> {
        if self.flags.contains(SceneFlags::USE_LAYER_VISIBILITY) {
            self.layer_visibility.get(&layer).copied()
        } else {
            None
        }
    }

    /// Every stored layer override, whether or not the scene applies them
    pub fn layer_overrides(&self) -> impl Iterator<Item = (PersistentId, bool)> + '_ {
        self.layer_visibility.iter().map(|(layer, visible)| (*layer, *visible))
    }

    /// Check if the scene is a photo match
    pub fn is_match_photo(&self) -> bool {
        self.photo_image.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layer_visibility_override() {
        let mut scene = Scene::new("Front");
        let layer = PersistentId::new(3);
        assert_eq!(scene.layer_visibility(layer), None);

        scene.set_layer_visibility(layer, false);
        assert_eq!(scene.layer_visibility(layer), Some(false));

        scene.flags.remove(SceneFlags::USE_LAYER_VISIBILITY);
        assert_eq!(scene.layer_visibility(layer), None);
    }
}
