//! Signature, header layout and section tags of the model container.

use crate::types::FileVersion;

/// First eight bytes of every model file
pub const SIGNATURE: &[u8; 8] = b"SKPDOC\r\n";

/// Size of the fixed file header in bytes
pub const HEADER_SIZE: usize = 28;

/// Version triple stamped into files written by this crate
pub const WRITER_VERSION: FileVersion = FileVersion::new(20, 0, 685);

/// Header flag bits
pub mod flags {
    /// Body is zlib-compressed
    pub const COMPRESSED: u16 = 0x0001;
}

/// Section tags, in the order sections are written
pub mod sections {
    /// Name, description, units and GUID
    pub const META: u16 = 0x0001;
    /// Camera, styles, rendering options and the other model settings
    pub const SETTINGS: u16 = 0x0002;
    /// Model-level attribute dictionaries
    pub const ATTRIBUTES: u16 = 0x0003;
    pub const MATERIALS: u16 = 0x0004;
    pub const LAYERS: u16 = 0x0005;
    pub const FONTS: u16 = 0x0006;
    /// Definition shells; members follow in ENTITIES
    pub const DEFINITIONS: u16 = 0x0007;
    /// Drawing elements with the container they belong to
    pub const ENTITIES: u16 = 0x0008;
    pub const SCENES: u16 = 0x0009;
    pub const END: u16 = 0xFFFF;

    /// Display name of a known section tag
    pub fn name(tag: u16) -> Option<&'static str> {
        match tag {
            META => Some("META"),
            SETTINGS => Some("SETTINGS"),
            ATTRIBUTES => Some("ATTRIBUTES"),
            MATERIALS => Some("MATERIALS"),
            LAYERS => Some("LAYERS"),
            FONTS => Some("FONTS"),
            DEFINITIONS => Some("DEFINITIONS"),
            ENTITIES => Some("ENTITIES"),
            SCENES => Some("SCENES"),
            END => Some("END"),
            _ => None,
        }
    }
}

/// Container PID written for members of the root container
pub const ROOT_CONTAINER: i64 = 0;
