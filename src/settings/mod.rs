//! Model-owned settings
//!
//! These objects are owned by the model and handed out by reference. The
//! length formatter is the exception: the model hands out a copy the caller
//! owns.

pub mod camera;
pub mod length_formatter;
pub mod location;
pub mod options;
pub mod rendering;
pub mod styles;

pub use camera::{Axes, Camera};
pub use length_formatter::{LengthFormat, LengthFormatter};
pub use location::Location;
pub use options::{Classifications, OptionsManager, OptionsProvider};
pub use rendering::{RenderingFlags, RenderingOptions, ShadowInfo};
pub use styles::{ArrowType, DimensionStyle, LineStyles, Styles};

/// All model-level settings in one place
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ModelSettings {
    pub camera: Camera,
    pub axes: Axes,
    pub styles: Styles,
    pub rendering_options: RenderingOptions,
    pub shadow_info: ShadowInfo,
    pub options_manager: OptionsManager,
    pub classifications: Classifications,
    pub length_formatter: LengthFormatter,
    pub dimension_style: DimensionStyle,
    pub line_styles: LineStyles,
    pub location: Location,
}
