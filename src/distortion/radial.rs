//! Polynomial radial distortion families.
//!
//! All three models here are calibrated against the distorted position, so the
//! correction is a direct evaluation and the forward direction iterates.

use super::{DEFAULT_TOLERANCE, DistortionModel, solve_distorted};
use crate::coordinate::FocalPlanePoint;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Radial plus decentering model with an explicit decentering rotation.
///
/// The radial term is `k1 r² + k2 r⁴ + k3 r⁶` and the decentering magnitude is
/// `j1 + j2 r²`, split into two components by the angle `t0`.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RadialDecenteringDistortion {
    k: [f64; 3],
    j: [f64; 2],
    t0: f64,
    tolerance: f64,
}

impl RadialDecenteringDistortion {
    /// `t0` is the decentering angle in radians.
    pub fn new(k: [f64; 3], j: [f64; 2], t0: f64) -> Self {
        Self {
            k,
            j,
            t0,
            tolerance: DEFAULT_TOLERANCE,
        }
    }

    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn radial(&self) -> [f64; 3] {
        self.k
    }

    pub fn decentering(&self) -> [f64; 2] {
        self.j
    }

    pub fn angle(&self) -> f64 {
        self.t0
    }

    fn offset(&self, x: f64, y: f64) -> (f64, f64) {
        let rr = x * x + y * y;
        let dr = self.k[0] * rr + self.k[1] * rr * rr + self.k[2] * rr * rr * rr;

        let jr = self.j[0] + self.j[1] * rr;
        let (sin_t0, cos_t0) = self.t0.sin_cos();
        let p1 = -jr * sin_t0;
        let p2 = jr * cos_t0;

        let tx = p1 * (rr + 2.0 * x * x) + 2.0 * p2 * x * y;
        let ty = 2.0 * p1 * x * y + p2 * (rr + 2.0 * y * y);

        (x * dr + tx, y * dr + ty)
    }
}

impl DistortionModel for RadialDecenteringDistortion {
    fn undistort(&self, distorted: FocalPlanePoint) -> Option<FocalPlanePoint> {
        let (dx, dy) = self.offset(distorted.x(), distorted.y());
        Some(FocalPlanePoint::new(distorted.x() - dx, distorted.y() - dy))
    }

    fn distort(&self, undistorted: FocalPlanePoint) -> Option<FocalPlanePoint> {
        solve_distorted(undistorted, self.tolerance, |x, y| Some(self.offset(x, y)))
    }
}

/// Brown-Conrady radial and tangential terms about a principal point.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PrincipalPointDistortion {
    principal_point: FocalPlanePoint,
    k: [f64; 3],
    p: [f64; 2],
    tolerance: f64,
}

impl PrincipalPointDistortion {
    pub fn new(principal_point: FocalPlanePoint, k: [f64; 3], p: [f64; 2]) -> Self {
        Self {
            principal_point,
            k,
            p,
            tolerance: DEFAULT_TOLERANCE,
        }
    }

    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn principal_point(&self) -> FocalPlanePoint {
        self.principal_point
    }

    fn offset(&self, x: f64, y: f64) -> (f64, f64) {
        let x = x - self.principal_point.x();
        let y = y - self.principal_point.y();
        let rr = x * x + y * y;
        let dr = self.k[0] * rr + self.k[1] * rr * rr + self.k[2] * rr * rr * rr;

        let [p1, p2] = self.p;
        let tx = p1 * (rr + 2.0 * x * x) + 2.0 * p2 * x * y;
        let ty = p2 * (rr + 2.0 * y * y) + 2.0 * p1 * x * y;

        (x * dr + tx, y * dr + ty)
    }
}

impl DistortionModel for PrincipalPointDistortion {
    fn undistort(&self, distorted: FocalPlanePoint) -> Option<FocalPlanePoint> {
        let (dx, dy) = self.offset(distorted.x(), distorted.y());
        Some(FocalPlanePoint::new(distorted.x() - dx, distorted.y() - dy))
    }

    fn distort(&self, undistorted: FocalPlanePoint) -> Option<FocalPlanePoint> {
        solve_distorted(undistorted, self.tolerance, |x, y| Some(self.offset(x, y)))
    }
}

/// One radial coefficient: `u = d (1 + k r²)` with `r` the distorted radius.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SimpleRadialDistortion {
    k: f64,
    tolerance: f64,
}

impl SimpleRadialDistortion {
    pub fn new(k: f64) -> Self {
        Self {
            k,
            tolerance: DEFAULT_TOLERANCE,
        }
    }

    pub fn coefficient(&self) -> f64 {
        self.k
    }

    fn offset(&self, x: f64, y: f64) -> (f64, f64) {
        let scale = -self.k * (x * x + y * y);
        (x * scale, y * scale)
    }
}

impl DistortionModel for SimpleRadialDistortion {
    fn undistort(&self, distorted: FocalPlanePoint) -> Option<FocalPlanePoint> {
        let (dx, dy) = self.offset(distorted.x(), distorted.y());
        Some(FocalPlanePoint::new(distorted.x() - dx, distorted.y() - dy))
    }

    fn distort(&self, undistorted: FocalPlanePoint) -> Option<FocalPlanePoint> {
        solve_distorted(undistorted, self.tolerance, |x, y| Some(self.offset(x, y)))
    }
}
