//! Claim Geo Library
//!
//! Location primitives for claim evidence: validated coordinates,
//! great-circle distance, photo EXIF location and reverse geocoding.

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use thiserror::Error;

pub mod photo;
pub mod geocode;

pub use photo::{exif_timestamp_to_iso, extract_exif_data, extract_exif_from_path, ExifEvidence};
pub use geocode::{google_maps_link, NominatimGeocoder, ReverseGeocoder};

/// Mean Earth radius in km
pub const EARTH_RADIUS_KM: f64 = 6371.0;

#[derive(Error, Debug)]
pub enum GeoError {
    #[error("Latitude out of range [-90, 90]: {0}")]
    InvalidLatitude(f64),
    #[error("Longitude out of range [-180, 180]: {0}")]
    InvalidLongitude(f64),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Unreadable EXIF data: {0}")]
    Exif(String),
}

pub type Result<T> = std::result::Result<T, GeoError>;

/// A WGS84 point, validated on construction and on deserialization
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawCoordinate")]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Deserialize)]
struct RawCoordinate {
    latitude: f64,
    longitude: f64,
}

impl TryFrom<RawCoordinate> for Coordinate {
    type Error = GeoError;

    fn try_from(raw: RawCoordinate) -> Result<Self> {
        Coordinate::new(raw.latitude, raw.longitude)
    }
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Result<Self> {
        if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
            return Err(GeoError::InvalidLatitude(latitude));
        }
        if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
            return Err(GeoError::InvalidLongitude(longitude));
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }

    /// Great-circle distance to another point in km
    pub fn distance_km(&self, other: &Coordinate) -> f64 {
        haversine_km(self.latitude, self.longitude, other.latitude, other.longitude)
    }
}

impl std::fmt::Display for Coordinate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.6},{:.6}", self.latitude, self.longitude)
    }
}

/// Haversine distance between two points in km
pub fn haversine_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let lat1_rad = lat1 * PI / 180.0;
    let lat2_rad = lat2 * PI / 180.0;
    let dlat = (lat2 - lat1) * PI / 180.0;
    let dlon = (lon2 - lon1) * PI / 180.0;

    // Rounding can push `a` just past 1.0 for near-antipodal points
    let a = ((dlat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (dlon / 2.0).sin().powi(2))
    .clamp(0.0, 1.0);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_KM * c
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_coordinate_validation() {
        assert!(Coordinate::new(19.0760, 72.8777).is_ok());
        assert!(Coordinate::new(90.0, 180.0).is_ok());
        assert!(Coordinate::new(-90.0, -180.0).is_ok());

        assert!(matches!(
            Coordinate::new(91.0, 0.0),
            Err(GeoError::InvalidLatitude(_))
        ));
        assert!(matches!(
            Coordinate::new(0.0, -180.5),
            Err(GeoError::InvalidLongitude(_))
        ));
        assert!(Coordinate::new(f64::NAN, 0.0).is_err());
    }

    #[test]
    fn test_deserialize_validates_range() {
        let ok: Coordinate =
            serde_json::from_str(r#"{"latitude": 19.076, "longitude": 72.8777}"#).unwrap();
        assert_eq!(ok, Coordinate::new(19.076, 72.8777).unwrap());

        let err = serde_json::from_str::<Coordinate>(r#"{"latitude": 120.0, "longitude": 0.0}"#)
            .unwrap_err();
        assert!(err.to_string().contains("Latitude out of range"));
        assert!(
            serde_json::from_str::<Coordinate>(r#"{"latitude": 0.0, "longitude": 200.0}"#).is_err()
        );
    }

    #[test]
    fn test_haversine() {
        // Mumbai to near Kota, Rajasthan: ~520 km
        let dist = haversine_km(19.0760, 72.8777, 25.78, 76.62);
        assert!(dist > 500.0 && dist < 900.0, "got {dist}");

        // Same point: 0 km
        let dist = haversine_km(19.0760, 72.8777, 19.0760, 72.8777);
        assert!(dist.abs() < 1e-9);
    }

    #[test]
    fn test_distance_km_matches_free_function() {
        let a = Coordinate::new(28.6139, 77.2090).unwrap();
        let b = Coordinate::new(12.9716, 77.5946).unwrap();
        assert_eq!(
            a.distance_km(&b),
            haversine_km(a.latitude, a.longitude, b.latitude, b.longitude)
        );
    }

    proptest! {
        #[test]
        fn haversine_is_symmetric(
            lat1 in -90.0f64..=90.0,
            lon1 in -180.0f64..=180.0,
            lat2 in -90.0f64..=90.0,
            lon2 in -180.0f64..=180.0,
        ) {
            let ab = haversine_km(lat1, lon1, lat2, lon2);
            let ba = haversine_km(lat2, lon2, lat1, lon1);
            prop_assert!((ab - ba).abs() < 1e-6);
            prop_assert!(ab >= 0.0);
            prop_assert!(ab <= PI * EARTH_RADIUS_KM + 1e-6);
        }

        #[test]
        fn haversine_self_distance_is_zero(
            lat in -90.0f64..=90.0,
            lon in -180.0f64..=180.0,
        ) {
            prop_assert!(haversine_km(lat, lon, lat, lon).abs() < 1e-9);
        }
    }
}
