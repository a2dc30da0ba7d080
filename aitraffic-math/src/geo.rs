use std::fmt;

use bevy_math::DVec2;

use crate::{Heading, Length};

/// Mean earth radius used for great-circle computations.
pub const EARTH_RADIUS_METERS: f64 = 6_371_008.8;

/// A horizontal geographic position in degrees.
#[derive(Clone, Copy, PartialEq, Default, serde::Serialize, serde::Deserialize)]
pub struct GeoPos {
    /// Latitude in degrees, positive north.
    pub lat: f64,
    /// Longitude in degrees, positive east.
    pub lon: f64,
}

impl GeoPos {
    #[must_use]
    pub const fn new(lat: f64, lon: f64) -> Self { Self { lat, lon } }

    #[must_use]
    pub fn is_finite(self) -> bool { self.lat.is_finite() && self.lon.is_finite() }

    /// Great-circle distance to `other`.
    #[must_use]
    pub fn distance(self, other: GeoPos) -> Length<f64> {
        let (lat1, lat2) = (self.lat.to_radians(), other.lat.to_radians());
        let dlat = lat2 - lat1;
        let dlon = (other.lon - self.lon).to_radians();

        let a = (dlat * 0.5).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon * 0.5).sin().powi(2);
        Length::from_meters(2. * EARTH_RADIUS_METERS * a.sqrt().min(1.).asin())
    }

    /// Initial great-circle course from `self` towards `other`.
    ///
    /// The course is NaN if both positions are equal.
    #[must_use]
    pub fn course_to(self, other: GeoPos) -> Heading {
        let (lat1, lat2) = (self.lat.to_radians(), other.lat.to_radians());
        let dlon = (other.lon - self.lon).to_radians();

        let east = dlon.sin() * lat2.cos();
        let north = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * dlon.cos();
        Heading::from_east_north(DVec2::new(east, north))
    }

    fn ft_per_deg_lat(self) -> f64 { 366_468.96 - 3_717.12 * self.lat.to_radians().cos() }

    fn ft_per_deg_lon(self) -> f64 { 365_228.16 * self.lat.to_radians().cos() }

    /// Moves the position by an east/north displacement,
    /// approximating the earth as flat around `self`.
    #[must_use]
    pub fn offset(self, east_north: Length<DVec2>) -> Self {
        let feet = east_north.into_feet();
        Self {
            lat: self.lat + feet.y / self.ft_per_deg_lat(),
            lon: self.lon + feet.x / self.ft_per_deg_lon(),
        }
    }

    /// East/north displacement from `self` to `other` on the local tangent plane.
    #[must_use]
    pub fn local_offset(self, other: GeoPos) -> Length<DVec2> {
        Length::vec2_from_feet(DVec2::new(
            (other.lon - self.lon) * self.ft_per_deg_lon(),
            (other.lat - self.lat) * self.ft_per_deg_lat(),
        ))
    }
}

impl fmt::Debug for GeoPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeoPos").field("lat", &self.lat).field("lon", &self.lon).finish()
    }
}

impl fmt::Display for GeoPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.6}, {:.6})", self.lat, self.lon)
    }
}
