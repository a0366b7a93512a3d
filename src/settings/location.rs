//! Geographic location

use crate::error::{ModelError, Result};

/// Where the model sits on the globe.
///
/// Georeferencing math is left to consumers; the model validates and stores
/// the coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
    pub altitude: f64,
    pub z_value_centered: bool,
    pub on_ocean_floor: bool,
    /// Angle between model north and true north, in degrees
    pub north_angle: f64,
    georeferenced: bool,
}

impl Location {
    /// Validate and store a georeference.
    ///
    /// Latitude must lie in [-90, 90], longitude in [-180, 180], and every
    /// value must be finite. Invalid input is rejected, never clamped.
    pub fn set_geo_reference(
        &mut self,
        latitude: f64,
        longitude: f64,
        altitude: f64,
        z_value_centered: bool,
        on_ocean_floor: bool,
    ) -> Result<()> {
        if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
            return Err(ModelError::InvalidInput(format!("latitude {latitude} out of range")));
        }
        if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
            return Err(ModelError::InvalidInput(format!("longitude {longitude} out of range")));
        }
        if !altitude.is_finite() {
            return Err(ModelError::InvalidInput("altitude is not finite".to_string()));
        }

        self.latitude = latitude;
        self.longitude = longitude;
        self.altitude = altitude;
        self.z_value_centered = z_value_centered;
        self.on_ocean_floor = on_ocean_floor;
        self.georeferenced = true;
        Ok(())
    }

    /// Check if a location is set
    pub fn is_geo_referenced(&self) -> bool {
        self.georeferenced
    }

    /// Drop the georeference, keeping the north angle
    pub fn clear_geo_reference(&mut self) {
        let north_angle = self.north_angle;
        *self = Location {
            north_angle,
            ..Default::default()
        };
    }

    /// North correction in degrees, normalized to [0, 360)
    pub fn north_correction(&self) -> f64 {
        self.north_angle.rem_euclid(360.0)
    }
}

impl Default for Location {
    fn default() -> Self {
        // Boulder, Colorado
        Location {
            latitude: 40.01695,
            longitude: -105.28309,
            altitude: 0.0,
            z_value_centered: false,
            on_ocean_floor: false,
            north_angle: 0.0,
            georeferenced: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_set_geo_reference() {
        let mut loc = Location::default();
        assert!(!loc.is_geo_referenced());

        loc.set_geo_reference(59.33, 18.06, 12.0, false, false).unwrap();
        assert!(loc.is_geo_referenced());
        assert_eq!(loc.latitude, 59.33);
    }

    #[test]
    fn test_invalid_geo_reference_is_rejected() {
        let mut loc = Location::default();
        let err = loc.set_geo_reference(91.0, 0.0, 0.0, false, false).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
        assert!(loc.set_geo_reference(0.0, -180.5, 0.0, false, false).is_err());
        assert!(loc.set_geo_reference(0.0, 0.0, f64::NAN, false, false).is_err());
        assert!(!loc.is_geo_referenced());
    }

    #[test]
    fn test_north_correction_normalized() {
        let loc = Location {
            north_angle: -30.0,
            ..Default::default()
        };
        assert_eq!(loc.north_correction(), 330.0);
    }
}
