//! Length formatting

use crate::types::Units;

/// Display style for lengths
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum LengthFormat {
    #[default]
    Decimal = 0,
    /// Feet and inches with fractional inches
    Architectural = 1,
    /// Feet with decimal fraction
    Engineering = 2,
}

impl LengthFormat {
    /// Decode from the stored byte
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(LengthFormat::Decimal),
            1 => Some(LengthFormat::Architectural),
            2 => Some(LengthFormat::Engineering),
            _ => None,
        }
    }
}

/// Formats model lengths (stored in inches) for display.
///
/// Obtained from the model as an independent copy; changing it does not
/// affect the model's own unit settings.
#[derive(Debug, Clone, PartialEq)]
pub struct LengthFormatter {
    pub format: LengthFormat,
    pub units: Units,
    /// Decimal places, or the power-of-two denominator for fractions
    pub precision: u8,
    pub suppress_units: bool,
}

impl LengthFormatter {
    /// Create a new length formatter
    pub fn new(format: LengthFormat, units: Units, precision: u8) -> Self {
        LengthFormatter {
            format,
            units,
            precision,
            suppress_units: false,
        }
    }

    /// Format a length given in inches
    pub fn format(&self, inches: f64) -> String {
        match self.format {
            LengthFormat::Decimal => {
                let value = inches * units_per_inch(self.units);
                let text = format!("{:.*}", self.precision as usize, value);
                if self.suppress_units {
                    text
                } else {
                    format!("{}{}", text, unit_suffix(self.units))
                }
            }
            LengthFormat::Engineering => {
                format!("{:.*}'", self.precision as usize, inches / 12.0)
            }
            LengthFormat::Architectural => self.format_architectural(inches),
        }
    }

    fn format_architectural(&self, inches: f64) -> String {
        let sign = if inches < 0.0 { "-" } else { "" };
        let denominator = 1u32 << self.precision.min(6);
        let total = (inches.abs() * denominator as f64).round() as u64;
        let feet = total / (12 * denominator as u64);
        let rest = total % (12 * denominator as u64);
        let whole = rest / denominator as u64;
        let mut numerator = (rest % denominator as u64) as u32;
        let mut denom = denominator;
        while numerator != 0 && numerator % 2 == 0 {
            numerator /= 2;
            denom /= 2;
        }

        let inch_text = if numerator == 0 {
            format!("{whole}\"")
        } else if whole == 0 {
            format!("{numerator}/{denom}\"")
        } else {
            format!("{whole} {numerator}/{denom}\"")
        };

        if feet > 0 {
            format!("{sign}{feet}' {inch_text}")
        } else {
            format!("{sign}{inch_text}")
        }
    }
}

impl Default for LengthFormatter {
    fn default() -> Self {
        Self::new(LengthFormat::Decimal, Units::Inches, 3)
    }
}

/// How many of `units` make up one inch
pub fn units_per_inch(units: Units) -> f64 {
    match units {
        Units::Inches => 1.0,
        Units::Feet => 1.0 / 12.0,
        Units::Millimeters => 25.4,
        Units::Centimeters => 2.54,
        Units::Meters => 0.0254,
    }
}

fn unit_suffix(units: Units) -> &'static str {
    match units {
        Units::Inches => "\"",
        Units::Feet => "'",
        Units::Millimeters => "mm",
        Units::Centimeters => "cm",
        Units::Meters => "m",
    }
}
