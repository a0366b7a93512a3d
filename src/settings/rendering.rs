//! Rendering options and shadow settings

use bitflags::bitflags;

use crate::types::Color;

bitflags! {
    /// Boolean rendering switches.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct RenderingFlags: u32 {
        /// Show hidden edges and faces
        const DRAW_HIDDEN_GEOMETRY = 0x01;
        /// Show hidden groups, instances and images
        const DRAW_HIDDEN_OBJECTS = 0x02;
        const DISPLAY_SECTION_PLANES = 0x04;
        const DISPLAY_SKETCH_AXES = 0x08;
        const COLOR_BY_LAYER = 0x10;
        const DISPLAY_FOG = 0x20;
        const DRAW_PROFILE_EDGES = 0x40;
    }
}

impl Default for RenderingFlags {
    fn default() -> Self {
        RenderingFlags::DISPLAY_SECTION_PLANES
            | RenderingFlags::DISPLAY_SKETCH_AXES
            | RenderingFlags::DRAW_PROFILE_EDGES
    }
}

/// Renderer state owned by the model
#[derive(Debug, Clone, PartialEq)]
pub struct RenderingOptions {
    pub flags: RenderingFlags,
    pub background_color: Color,
    pub edge_color: Color,
}

impl RenderingOptions {
    /// Whether hidden geometry is drawn
    pub fn draw_hidden_geometry(&self) -> bool {
        self.flags.contains(RenderingFlags::DRAW_HIDDEN_GEOMETRY)
    }

    /// Whether hidden objects are drawn
    pub fn draw_hidden_objects(&self) -> bool {
        self.flags.contains(RenderingFlags::DRAW_HIDDEN_OBJECTS)
    }

    /// Draw or skip hidden geometry
    pub fn set_draw_hidden_geometry(&mut self, value: bool) {
        self.flags.set(RenderingFlags::DRAW_HIDDEN_GEOMETRY, value);
    }

    /// Draw or skip hidden objects
    pub fn set_draw_hidden_objects(&mut self, value: bool) {
        self.flags.set(RenderingFlags::DRAW_HIDDEN_OBJECTS, value);
    }
}

impl Default for RenderingOptions {
    fn default() -> Self {
        RenderingOptions {
            flags: RenderingFlags::default(),
            background_color: Color::WHITE,
            edge_color: Color::BLACK,
        }
    }
}

/// Sun and shadow settings
#[derive(Debug, Clone, PartialEq)]
pub struct ShadowInfo {
    pub display_shadows: bool,
    /// Shadow time, seconds since the Unix epoch (UTC)
    pub shadow_time: i64,
    /// Light intensity, 0..=100
    pub light: u8,
    /// Dark intensity, 0..=100
    pub dark: u8,
    pub use_sun_for_shading: bool,
}

impl Default for ShadowInfo {
    fn default() -> Self {
        ShadowInfo {
            display_shadows: false,
            // 2002-11-08 13:30 UTC
            shadow_time: 1_036_762_200,
            light: 80,
            dark: 45,
            use_sun_for_shading: false,
        }
    }
}
