//! Ground and sky positions.

use nalgebra::Vector3;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use uom::si::{
    angle::{degree, radian},
    f64::{Angle, Length},
    length::kilometer,
};

/// Wraps degrees into `[0, 360)`.
pub fn normalize_longitude_deg(lon: f64) -> f64 {
    let wrapped = lon.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360 for tiny negative inputs.
    if wrapped >= 360.0 { 0.0 } else { wrapped }
}

/// A body-fixed position given as planetocentric latitude, positive east
/// longitude and radius.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SurfacePoint {
    latitude: Angle,
    longitude: Angle,
    radius: Length,
}

impl SurfacePoint {
    /// Longitude is normalised into `[0, 360)` degrees.
    pub fn new(latitude: Angle, longitude: Angle, radius: Length) -> Self {
        let longitude = Angle::new::<degree>(normalize_longitude_deg(longitude.get::<degree>()));
        Self {
            latitude,
            longitude,
            radius,
        }
    }

    pub fn from_degrees(latitude: f64, longitude: f64, radius_km: f64) -> Self {
        Self::new(
            Angle::new::<degree>(latitude),
            Angle::new::<degree>(longitude),
            Length::new::<kilometer>(radius_km),
        )
    }

    /// Body-fixed rectangular coordinates in km.
    pub fn from_rectangular(position: &Vector3<f64>) -> Option<Self> {
        let radius = position.norm();
        if radius == 0.0 || !radius.is_finite() {
            return None;
        }
        let latitude = (position.z / radius).clamp(-1.0, 1.0).asin();
        let longitude = position.y.atan2(position.x);
        Some(Self::new(
            Angle::new::<radian>(latitude),
            Angle::new::<radian>(longitude),
            Length::new::<kilometer>(radius),
        ))
    }

    pub fn latitude(&self) -> Angle {
        self.latitude
    }

    pub fn longitude(&self) -> Angle {
        self.longitude
    }

    pub fn radius(&self) -> Length {
        self.radius
    }

    /// Body-fixed rectangular coordinates in km.
    pub fn to_rectangular(&self) -> Vector3<f64> {
        let lat = self.latitude.get::<radian>();
        let lon = self.longitude.get::<radian>();
        let r = self.radius.get::<kilometer>();
        Vector3::new(r * lat.cos() * lon.cos(), r * lat.cos() * lon.sin(), r * lat.sin())
    }
}

impl AsRef<SurfacePoint> for SurfacePoint {
    fn as_ref(&self) -> &SurfacePoint {
        self
    }
}

/// A direction on the celestial sphere.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SkyPoint {
    right_ascension: Angle,
    declination: Angle,
}

impl SkyPoint {
    pub fn new(right_ascension: Angle, declination: Angle) -> Self {
        let right_ascension = Angle::new::<degree>(normalize_longitude_deg(right_ascension.get::<degree>()));
        Self {
            right_ascension,
            declination,
        }
    }

    pub fn from_degrees(right_ascension: f64, declination: f64) -> Self {
        Self::new(Angle::new::<degree>(right_ascension), Angle::new::<degree>(declination))
    }

    pub fn from_vector(direction: &Vector3<f64>) -> Option<Self> {
        let unit = direction.try_normalize(f64::EPSILON)?;
        Some(Self::new(
            Angle::new::<radian>(unit.y.atan2(unit.x)),
            Angle::new::<radian>(unit.z.clamp(-1.0, 1.0).asin()),
        ))
    }

    pub fn right_ascension(&self) -> Angle {
        self.right_ascension
    }

    pub fn declination(&self) -> Angle {
        self.declination
    }

    /// Unit vector in the inertial frame.
    pub fn to_vector(&self) -> Vector3<f64> {
        let ra = self.right_ascension.get::<radian>();
        let dec = self.declination.get::<radian>();
        Vector3::new(dec.cos() * ra.cos(), dec.cos() * ra.sin(), dec.sin())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rstest::rstest;

    #[rstest]
    #[case(-1.0, 359.0)]
    #[case(360.0, 0.0)]
    #[case(721.5, 1.5)]
    #[case(-1.0e-18, 0.0)]
    fn longitudes_wrap(#[case] input: f64, #[case] expected: f64) {
        assert_relative_eq!(normalize_longitude_deg(input), expected, epsilon = 1e-9);
    }

    #[test]
    fn rectangular_round_trip() {
        let p = SurfacePoint::from_degrees(-23.5, 301.25, 3396.19);
        let back = SurfacePoint::from_rectangular(&p.to_rectangular()).unwrap();
        assert_relative_eq!(back.latitude().get::<degree>(), -23.5, epsilon = 1e-9);
        assert_relative_eq!(back.longitude().get::<degree>(), 301.25, epsilon = 1e-9);
        assert_relative_eq!(back.radius().get::<kilometer>(), 3396.19, epsilon = 1e-9);
    }

    #[test]
    fn origin_has_no_surface_point() {
        assert_eq!(SurfacePoint::from_rectangular(&Vector3::zeros()), None);
    }

    #[test]
    fn sky_vector_round_trip() {
        let s = SkyPoint::from_degrees(83.63, 22.01);
        let back = SkyPoint::from_vector(&(s.to_vector() * 5.0)).unwrap();
        assert_relative_eq!(back.right_ascension().get::<degree>(), 83.63, epsilon = 1e-9);
        assert_relative_eq!(back.declination().get::<degree>(), 22.01, epsilon = 1e-9);
    }
}
