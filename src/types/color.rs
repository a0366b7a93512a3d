//! RGBA color used by materials and layers

use std::fmt;

/// An 8-bit-per-channel RGBA color
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    /// Create an opaque color
    pub const fn from_rgb(r: u8, g: u8, b: u8) -> Self {
        Color { r, g, b, a: 255 }
    }

    /// Create a color with alpha
    pub const fn from_rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Color { r, g, b, a }
    }

    /// Pack into a little-endian `0xAABBGGRR` word
    pub fn to_packed(&self) -> u32 {
        u32::from_le_bytes([self.r, self.g, self.b, self.a])
    }

    /// Unpack from a little-endian `0xAABBGGRR` word
    pub fn from_packed(value: u32) -> Self {
        let [r, g, b, a] = value.to_le_bytes();
        Color { r, g, b, a }
    }

    /// Check if the color is fully opaque
    pub fn is_opaque(&self) -> bool {
        self.a == 255
    }

    pub const BLACK: Color = Color::from_rgb(0, 0, 0);
    pub const WHITE: Color = Color::from_rgb(255, 255, 255);
    pub const GRAY: Color = Color::from_rgb(128, 128, 128);
    pub const RED: Color = Color::from_rgb(255, 0, 0);
    pub const GREEN: Color = Color::from_rgb(0, 255, 0);
    pub const BLUE: Color = Color::from_rgb(0, 0, 255);
}

impl Default for Color {
    fn default() -> Self {
        Color::WHITE
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02X}{:02X}{:02X}{:02X}", self.r, self.g, self.b, self.a)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_packed_roundtrip() {
        let c = Color::from_rgba(10, 20, 30, 40);
        assert_eq!(Color::from_packed(c.to_packed()), c);
    }

    #[test]
    fn test_display() {
        assert_eq!(Color::RED.to_string(), "#FF0000FF");
        assert!(Color::RED.is_opaque());
    }
}
