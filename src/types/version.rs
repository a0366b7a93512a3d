//! File format versions and the version triple

use std::fmt;

/// File format generations, oldest to newest.
///
/// The discriminant is the format tag stored in the container header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u16)]
pub enum ModelVersion {
    SU3 = 3,
    SU4 = 4,
    SU5 = 5,
    SU6 = 6,
    SU7 = 7,
    SU8 = 8,
    SU2013 = 13,
    SU2014 = 14,
    SU2015 = 15,
    SU2016 = 16,
    SU2017 = 17,
    SU2018 = 18,
    SU2019 = 19,
    SU2020 = 20,
}

impl ModelVersion {
    /// The newest format this crate writes by default
    pub const CURRENT: ModelVersion = ModelVersion::SU2020;

    /// Every known version, oldest first
    pub const ALL: [ModelVersion; 14] = [
        ModelVersion::SU3,
        ModelVersion::SU4,
        ModelVersion::SU5,
        ModelVersion::SU6,
        ModelVersion::SU7,
        ModelVersion::SU8,
        ModelVersion::SU2013,
        ModelVersion::SU2014,
        ModelVersion::SU2015,
        ModelVersion::SU2016,
        ModelVersion::SU2017,
        ModelVersion::SU2018,
        ModelVersion::SU2019,
        ModelVersion::SU2020,
    ];

    /// Format tag stored in the file header
    pub fn tag(&self) -> u16 {
        *self as u16
    }

    /// Look up a version by its format tag
    pub fn from_tag(tag: u16) -> Option<Self> {
        Self::ALL.iter().copied().find(|v| v.tag() == tag)
    }

    /// Parse a release name such as `"SU2017"` or `"2017"`
    pub fn parse(name: &str) -> Option<Self> {
        let trimmed = name.trim();
        let digits = trimmed
            .strip_prefix("SU")
            .or_else(|| trimmed.strip_prefix("su"))
            .unwrap_or(trimmed);
        let number: u16 = digits.parse().ok()?;
        let tag = if number >= 2000 { number - 2000 } else { number };
        Self::from_tag(tag)
    }

    /// Release name, e.g. `"SU2017"`
    pub fn name(&self) -> &'static str {
        match self {
            ModelVersion::SU3 => "SU3",
            ModelVersion::SU4 => "SU4",
            ModelVersion::SU5 => "SU5",
            ModelVersion::SU6 => "SU6",
            ModelVersion::SU7 => "SU7",
            ModelVersion::SU8 => "SU8",
            ModelVersion::SU2013 => "SU2013",
            ModelVersion::SU2014 => "SU2014",
            ModelVersion::SU2015 => "SU2015",
            ModelVersion::SU2016 => "SU2016",
            ModelVersion::SU2017 => "SU2017",
            ModelVersion::SU2018 => "SU2018",
            ModelVersion::SU2019 => "SU2019",
            ModelVersion::SU2020 => "SU2020",
        }
    }

    /// Major application version that writes this format
    pub fn major(&self) -> u16 {
        self.tag()
    }
}

impl Default for ModelVersion {
    fn default() -> Self {
        ModelVersion::CURRENT
    }
}

impl fmt::Display for ModelVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Version triple of the application that wrote a file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct FileVersion {
    pub major: u16,
    pub minor: u16,
    pub build: u32,
}

impl FileVersion {
    pub const fn new(major: u16, minor: u16, build: u32) -> Self {
        FileVersion {
            major,
            minor,
            build,
        }
    }
}

impl fmt::Display for FileVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.build)
    }
}

/// Length units of a model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum Units {
    #[default]
    Inches = 0,
    Feet = 1,
    Millimeters = 2,
    Centimeters = 3,
    Meters = 4,
}

impl Units {
    /// Decode from the stored byte
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Units::Inches),
            1 => Some(Units::Feet),
            2 => Some(Units::Millimeters),
            3 => Some(Units::Centimeters),
            4 => Some(Units::Meters),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fourteen_versions_in_order() {
        assert_eq!(ModelVersion::ALL.len(), 14);
        assert!(ModelVersion::ALL.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(ModelVersion::CURRENT, *ModelVersion::ALL.last().unwrap());
    }

    #[test]
    fn test_tag_roundtrip() {
        for v in ModelVersion::ALL {
            assert_eq!(ModelVersion::from_tag(v.tag()), Some(v));
        }
        assert_eq!(ModelVersion::from_tag(9), None);
        assert_eq!(ModelVersion::from_tag(21), None);
    }

    #[test]
    fn test_parse() {
        assert_eq!(ModelVersion::parse("SU2017"), Some(ModelVersion::SU2017));
        assert_eq!(ModelVersion::parse("2019"), Some(ModelVersion::SU2019));
        assert_eq!(ModelVersion::parse("su8"), Some(ModelVersion::SU8));
        assert_eq!(ModelVersion::parse("SU2012"), None);
    }

    #[test]
    fn test_file_version_display() {
        assert_eq!(FileVersion::new(20, 1, 229).to_string(), "20.1.229");
    }
}
