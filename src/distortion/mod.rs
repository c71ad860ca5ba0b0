//! Optical distortion models.
//!
//! A distortion model converts between the *distorted* focal plane position
//! where light actually lands and the *undistorted* position an ideal pinhole
//! would produce. Most calibrations express the correction as a polynomial in
//! the distorted position, which makes [`DistortionModel::undistort`] a direct
//! evaluation and [`DistortionModel::distort`] a fixed-point iteration.
//!
//! # Supported models
//!
//! - [`DistortionMap::Identity`] for uncalibrated sensors
//! - [`DistortionMap::RadialDecentering`] radial plus decentering with a rotation angle
//! - [`DistortionMap::PrincipalPoint`] radial plus decentering about a principal point
//! - [`DistortionMap::SimpleRadial`] a single radial coefficient
//! - [`DistortionMap::Legendre`] per-axis Legendre polynomials about a boresight
//! - [`DistortionMap::OpenCv`] rational radial and tangential terms in normalised coordinates
//! - [`DistortionMap::SlantRange`] ground range to slant range for radar

pub mod legendre;
pub mod opencv;
pub mod radial;
pub mod slant_range;

pub use legendre::LegendreDistortion;
pub use opencv::OpenCvDistortion;
pub use radial::{PrincipalPointDistortion, RadialDecenteringDistortion, SimpleRadialDistortion};
pub use slant_range::SlantRangeMap;

use crate::coordinate::FocalPlanePoint;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Convergence tolerance in millimetres for the iterative inverses.
pub const DEFAULT_TOLERANCE: f64 = 1.0e-6;

/// Hard cap on fixed-point iterations.
pub const MAX_ITERATIONS: usize = 50;

/// Conversion between distorted and undistorted focal plane positions.
///
/// Both directions return `None` when the point has no valid mapping, either
/// because an iteration failed to converge or because the model is degenerate
/// at that position.
pub trait DistortionModel {
    /// Distorted to undistorted.
    fn undistort(&self, distorted: FocalPlanePoint) -> Option<FocalPlanePoint>;

    /// Undistorted to distorted.
    fn distort(&self, undistorted: FocalPlanePoint) -> Option<FocalPlanePoint>;
}

/// Solves `u = d - offset(d)` for `d` given `u`.
///
/// The offset is always evaluated at the current estimate of the distorted
/// position, never at the undistorted target.
pub(crate) fn solve_distorted<F>(
    undistorted: FocalPlanePoint,
    tolerance: f64,
    offset: F,
) -> Option<FocalPlanePoint>
where
    F: Fn(f64, f64) -> Option<(f64, f64)>,
{
    let (ux, uy) = (undistorted.x(), undistorted.y());
    let (mut x, mut y) = (ux, uy);

    for _ in 0..MAX_ITERATIONS {
        let (dx, dy) = offset(x, y)?;
        let (next_x, next_y) = (ux + dx, uy + dy);
        if !next_x.is_finite() || !next_y.is_finite() {
            return None;
        }

        let step = (next_x - x).hypot(next_y - y);
        x = next_x;
        y = next_y;
        if step < tolerance {
            return Some(FocalPlanePoint::new(x, y));
        }
    }

    None
}

/// Closed set of distortion models, one per optical design.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum DistortionMap {
    /// No distortion correction.
    #[default]
    Identity,
    RadialDecentering(RadialDecenteringDistortion),
    PrincipalPoint(PrincipalPointDistortion),
    SimpleRadial(SimpleRadialDistortion),
    Legendre(LegendreDistortion),
    OpenCv(OpenCvDistortion),
    SlantRange(SlantRangeMap),
}

impl DistortionMap {
    /// Returns `true` if this is `DistortionMap::Identity`.
    pub fn is_identity(&self) -> bool {
        matches!(self, DistortionMap::Identity)
    }

    /// Returns `true` for the radar ground range to slant range model.
    pub fn is_slant_range(&self) -> bool {
        matches!(self, DistortionMap::SlantRange(_))
    }

    pub(crate) fn name(&self) -> &'static str {
        match self {
            DistortionMap::Identity => "identity",
            DistortionMap::RadialDecentering(_) => "radial-decentering",
            DistortionMap::PrincipalPoint(_) => "principal-point",
            DistortionMap::SimpleRadial(_) => "simple-radial",
            DistortionMap::Legendre(_) => "legendre",
            DistortionMap::OpenCv(_) => "opencv",
            DistortionMap::SlantRange(_) => "slant-range",
        }
    }
}

impl DistortionModel for DistortionMap {
    fn undistort(&self, distorted: FocalPlanePoint) -> Option<FocalPlanePoint> {
        match self {
            DistortionMap::Identity => Some(distorted),
            DistortionMap::RadialDecentering(m) => m.undistort(distorted),
            DistortionMap::PrincipalPoint(m) => m.undistort(distorted),
            DistortionMap::SimpleRadial(m) => m.undistort(distorted),
            DistortionMap::Legendre(m) => m.undistort(distorted),
            DistortionMap::OpenCv(m) => m.undistort(distorted),
            DistortionMap::SlantRange(m) => m.undistort(distorted),
        }
    }

    fn distort(&self, undistorted: FocalPlanePoint) -> Option<FocalPlanePoint> {
        match self {
            DistortionMap::Identity => Some(undistorted),
            DistortionMap::RadialDecentering(m) => m.distort(undistorted),
            DistortionMap::PrincipalPoint(m) => m.distort(undistorted),
            DistortionMap::SimpleRadial(m) => m.distort(undistorted),
            DistortionMap::Legendre(m) => m.distort(undistorted),
            DistortionMap::OpenCv(m) => m.distort(undistorted),
            DistortionMap::SlantRange(m) => m.distort(undistorted),
        }
    }
}

impl From<RadialDecenteringDistortion> for DistortionMap {
    fn from(model: RadialDecenteringDistortion) -> Self {
        DistortionMap::RadialDecentering(model)
    }
}

impl From<PrincipalPointDistortion> for DistortionMap {
    fn from(model: PrincipalPointDistortion) -> Self {
        DistortionMap::PrincipalPoint(model)
    }
}

impl From<SimpleRadialDistortion> for DistortionMap {
    fn from(model: SimpleRadialDistortion) -> Self {
        DistortionMap::SimpleRadial(model)
    }
}

impl From<LegendreDistortion> for DistortionMap {
    fn from(model: LegendreDistortion) -> Self {
        DistortionMap::Legendre(model)
    }
}

impl From<OpenCvDistortion> for DistortionMap {
    fn from(model: OpenCvDistortion) -> Self {
        DistortionMap::OpenCv(model)
    }
}

impl From<SlantRangeMap> for DistortionMap {
    fn from(model: SlantRangeMap) -> Self {
        DistortionMap::SlantRange(model)
    }
}
