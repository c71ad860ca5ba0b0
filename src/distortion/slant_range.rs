//! Ground range to slant range conversion for side-looking radar.
//!
//! Radar images are resampled to ground range along the sample axis, but the
//! geometry is solved in slant range. The focal plane `x` carries range in
//! units of `range_sigma` metres, so `km = x * range_sigma / 1000`. The line
//! axis is untouched.

use super::DistortionModel;
use crate::{coordinate::FocalPlanePoint, error::CameraError};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

const MAX_NEWTON_ITERATIONS: usize = 30;
const RANGE_TOLERANCE_KM: f64 = 1.0e-8;

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SlantRangeMap {
    coefficients: [f64; 4],
    ground_range_origin_km: f64,
    range_sigma_m: f64,
}

impl SlantRangeMap {
    /// `coefficients` give slant range in km as a cubic in
    /// `ground_range - ground_range_origin`.
    pub fn new(
        coefficients: [f64; 4],
        ground_range_origin_km: f64,
        range_sigma_m: f64,
    ) -> Result<Self, CameraError> {
        if !(range_sigma_m > 0.0) {
            return Err(CameraError::NonPositive {
                name: "range sigma",
                value: range_sigma_m,
            });
        }
        Ok(Self {
            coefficients,
            ground_range_origin_km,
            range_sigma_m,
        })
    }

    pub fn range_sigma_m(&self) -> f64 {
        self.range_sigma_m
    }

    /// Slant range in km for a ground range in km.
    pub fn slant_range_km(&self, ground_range_km: f64) -> f64 {
        let t = ground_range_km - self.ground_range_origin_km;
        let [a0, a1, a2, a3] = self.coefficients;
        a0 + t * (a1 + t * (a2 + t * a3))
    }

    /// Ground range in km for a slant range in km, by Newton's method.
    pub fn ground_range_km(&self, slant_range_km: f64) -> Option<f64> {
        let [_, a1, a2, a3] = self.coefficients;
        let mut ground = slant_range_km;

        for _ in 0..MAX_NEWTON_ITERATIONS {
            let t = ground - self.ground_range_origin_km;
            let residual = self.slant_range_km(ground) - slant_range_km;
            let slope = a1 + t * (2.0 * a2 + 3.0 * a3 * t);
            if slope == 0.0 || !slope.is_finite() {
                return None;
            }

            let step = residual / slope;
            ground -= step;
            if step.abs() < RANGE_TOLERANCE_KM {
                return Some(ground);
            }
        }

        None
    }

    fn to_km(&self, x: f64) -> f64 {
        x * self.range_sigma_m / 1000.0
    }

    fn from_km(&self, km: f64) -> f64 {
        km * 1000.0 / self.range_sigma_m
    }
}

impl DistortionModel for SlantRangeMap {
    fn undistort(&self, distorted: FocalPlanePoint) -> Option<FocalPlanePoint> {
        let slant = self.slant_range_km(self.to_km(distorted.x()));
        Some(FocalPlanePoint::new(self.from_km(slant), distorted.y()))
    }

    fn distort(&self, undistorted: FocalPlanePoint) -> Option<FocalPlanePoint> {
        let ground = self.ground_range_km(self.to_km(undistorted.x()))?;
        Some(FocalPlanePoint::new(self.from_km(ground), undistorted.y()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn map() -> SlantRangeMap {
        // Roughly a 300 km slant to a flat ground swath.
        SlantRangeMap::new([300.0, 0.45, 1.2e-4, -3.0e-8], 0.0, 75.0).unwrap()
    }

    #[test]
    fn line_axis_passes_through() {
        let d = FocalPlanePoint::new(1000.0, 42.0);
        let u = map().undistort(d).unwrap();
        assert_eq!(u.y(), 42.0);
    }

    #[test]
    fn newton_inverts_cubic() {
        let m = map();
        for ground in [0.0, 25.0, 80.0, 150.0] {
            let slant = m.slant_range_km(ground);
            assert_relative_eq!(m.ground_range_km(slant).unwrap(), ground, epsilon = 1e-7);
        }
    }

    #[test]
    fn focal_plane_round_trip() {
        let m = map();
        let d = FocalPlanePoint::new(512.0, 3.0);
        let back = m.distort(m.undistort(d).unwrap()).unwrap();
        assert_relative_eq!(back.x(), d.x(), epsilon = 1e-6);
    }

    #[test]
    fn flat_polynomial_cannot_be_inverted() {
        let m = SlantRangeMap::new([300.0, 0.0, 0.0, 0.0], 0.0, 75.0).unwrap();
        assert_eq!(m.ground_range_km(300.0), None);
    }

    #[test]
    fn rejects_zero_range_sigma() {
        assert!(SlantRangeMap::new([0.0, 1.0, 0.0, 0.0], 0.0, 0.0).is_err());
    }
}
