//! Rational radial plus tangential distortion in normalised coordinates.
//!
//! Unlike the other polynomial models this one is calibrated in the forward
//! direction, so [`DistortionModel::distort`] is the closed form and
//! [`DistortionModel::undistort`] iterates.

use super::{DEFAULT_TOLERANCE, DistortionModel, MAX_ITERATIONS};
use crate::{coordinate::FocalPlanePoint, error::CameraError};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

const SINGULAR: f64 = 1.0e-12;

/// Evaluates `c₀ + c₁ t + c₂ t² + ...`.
pub fn polynomial(coefficients: &[f64], t: f64) -> f64 {
    coefficients.iter().rev().fold(0.0, |acc, c| acc * t + c)
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct OpenCvDistortion {
    focal_length_mm: f64,
    k: [f64; 6],
    p: [f64; 2],
    tolerance: f64,
}

impl OpenCvDistortion {
    pub fn new(focal_length_mm: f64, k: [f64; 6], p: [f64; 2]) -> Result<Self, CameraError> {
        if !(focal_length_mm > 0.0) {
            return Err(CameraError::InvalidFocalLength { focal_length_mm });
        }
        Ok(Self {
            focal_length_mm,
            k,
            p,
            tolerance: DEFAULT_TOLERANCE,
        })
    }

    /// Uses the focal length given by a polynomial in instrument temperature.
    pub fn with_temperature(
        k: [f64; 6],
        p: [f64; 2],
        temperature_coefficients: &[f64],
        temperature: f64,
    ) -> Result<Self, CameraError> {
        Self::new(polynomial(temperature_coefficients, temperature), k, p)
    }

    /// Convergence tolerance in millimetres on the focal plane.
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn focal_length_mm(&self) -> f64 {
        self.focal_length_mm
    }

    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    fn radial_parts(&self, rr: f64) -> (f64, f64) {
        let [k1, k2, k3, k4, k5, k6] = self.k;
        let numerator = 1.0 + rr * (k1 + rr * (k2 + rr * k3));
        let denominator = 1.0 + rr * (k4 + rr * (k5 + rr * k6));
        (numerator, denominator)
    }

    fn tangential(&self, x: f64, y: f64, rr: f64) -> (f64, f64) {
        let [p1, p2] = self.p;
        (
            2.0 * p1 * x * y + p2 * (rr + 2.0 * x * x),
            p1 * (rr + 2.0 * y * y) + 2.0 * p2 * x * y,
        )
    }
}

impl DistortionModel for OpenCvDistortion {
    fn distort(&self, undistorted: FocalPlanePoint) -> Option<FocalPlanePoint> {
        let f = self.focal_length_mm;
        let (x, y) = (undistorted.x() / f, undistorted.y() / f);
        let rr = x * x + y * y;

        let (numerator, denominator) = self.radial_parts(rr);
        if denominator.abs() < SINGULAR {
            return None;
        }
        let radial = numerator / denominator;
        let (tx, ty) = self.tangential(x, y, rr);

        Some(FocalPlanePoint::new((x * radial + tx) * f, (y * radial + ty) * f))
    }

    fn undistort(&self, distorted: FocalPlanePoint) -> Option<FocalPlanePoint> {
        let f = self.focal_length_mm;
        let (xd, yd) = (distorted.x() / f, distorted.y() / f);
        let tolerance = self.tolerance / f;
        let (mut x, mut y) = (xd, yd);

        for _ in 0..MAX_ITERATIONS {
            let rr = x * x + y * y;
            let (numerator, denominator) = self.radial_parts(rr);
            if numerator.abs() < SINGULAR {
                return None;
            }
            let inverse_radial = denominator / numerator;
            let (tx, ty) = self.tangential(x, y, rr);

            let next_x = (xd - tx) * inverse_radial;
            let next_y = (yd - ty) * inverse_radial;
            let step = (next_x - x).hypot(next_y - y);
            x = next_x;
            y = next_y;
            if step < tolerance {
                return Some(FocalPlanePoint::new(x * f, y * f));
            }
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use quickcheck_macros::quickcheck;

    fn model() -> OpenCvDistortion {
        OpenCvDistortion::new(
            50.0,
            [-0.12, 0.03, 0.0, 0.01, 0.0, 0.0],
            [1.0e-4, -2.0e-4],
        )
        .unwrap()
    }

    #[test]
    fn polynomial_uses_ascending_powers() {
        assert_relative_eq!(polynomial(&[1.0, 2.0, 3.0], 2.0), 1.0 + 4.0 + 12.0);
        assert_relative_eq!(polynomial(&[], 2.0), 0.0);
    }

    #[test]
    fn temperature_sets_focal_length() {
        let m = OpenCvDistortion::with_temperature([0.0; 6], [0.0; 2], &[100.0, 0.01], 20.0).unwrap();
        assert_relative_eq!(m.focal_length_mm(), 100.2);
    }

    #[test]
    fn rejects_zero_focal_length() {
        assert!(OpenCvDistortion::new(0.0, [0.0; 6], [0.0; 2]).is_err());
    }

    #[test]
    fn singular_denominator_fails() {
        // 1 + k4 r² vanishes at r = 1 in normalised units.
        let m = OpenCvDistortion::new(1.0, [0.0, 0.0, 0.0, -1.0, 0.0, 0.0], [0.0; 2]).unwrap();
        assert_eq!(m.distort(FocalPlanePoint::new(1.0, 0.0)), None);
    }

    #[test]
    fn tight_tolerance_still_converges() {
        let m = model().with_tolerance(1e-9);
        let u = FocalPlanePoint::new(8.0, -5.0);
        let back = m.undistort(m.distort(u).unwrap()).unwrap();
        assert_relative_eq!(back.x(), u.x(), epsilon = 1e-8);
        assert_relative_eq!(back.y(), u.y(), epsilon = 1e-8);
    }

    #[quickcheck]
    fn undistort_recovers_distort(x: i16, y: i16) -> bool {
        let x = f64::from(x) / f64::from(i16::MAX) * 12.0;
        let y = f64::from(y) / f64::from(i16::MAX) * 12.0;
        let m = model();
        let u = FocalPlanePoint::new(x, y);
        m.distort(u)
            .and_then(|d| m.undistort(d))
            .is_some_and(|back| back.distance(&u) < 1e-5)
    }
}
