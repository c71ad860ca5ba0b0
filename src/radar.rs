//! Range/Doppler ground map for side-looking synthetic aperture radar.
//!
//! A radar pixel does not define a ray. Its sample is a slant range and its
//! line is the time of zero Doppler shift, so the ground point is where the
//! range sphere around the spacecraft, the zero Doppler plane and the body
//! surface meet. Which of the two candidates is imaged depends on the side the
//! antenna looks to.

use crate::{
    coordinate::FocalPlanePoint,
    geometry::SurfacePoint,
    ground::SensorContext,
    search::MAX_TIME_ITERATIONS,
    shape::ShapeModel,
};
use nalgebra::Vector3;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use tracing::debug;
use uom::si::length::kilometer;

/// Convergence of the local radius iteration in km.
const RADIUS_TOLERANCE_KM: f64 = 1.0e-8;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum LookDirection {
    Left,
    Right,
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RadarGroundMap {
    look_direction: LookDirection,
    range_sigma_m: f64,
}

impl RadarGroundMap {
    /// `range_sigma_m` is the slant range spacing of one focal plane unit.
    pub fn new(look_direction: LookDirection, range_sigma_m: f64) -> Self {
        Self {
            look_direction,
            range_sigma_m,
        }
    }

    pub fn look_direction(&self) -> LookDirection {
        self.look_direction
    }

    pub fn range_sigma_m(&self) -> f64 {
        self.range_sigma_m
    }

    pub fn slant_range_km(&self, undistorted: FocalPlanePoint) -> f64 {
        undistorted.x() * self.range_sigma_m / 1000.0
    }

    /// Ground point at the given slant range in the zero Doppler plane at
    /// `time`.
    pub(crate) fn intersect(
        &self,
        context: &SensorContext,
        shape: &dyn ShapeModel,
        undistorted: FocalPlanePoint,
        time: f64,
    ) -> Option<Vector3<f64>> {
        let s = context.ephemeris.position(time).ok()?;
        let v = context.ephemeris.velocity(time).ok()?;

        // In-track, cross-track radial and cross-track horizontal axes.
        let i = v.try_normalize(f64::EPSILON)?;
        let c = (s - i * s.dot(&i)).try_normalize(f64::EPSILON)?;
        let r = i.cross(&c);

        let slant = self.slant_range_km(undistorted);
        let slant_sq = slant * slant;
        let s_norm_sq = s.norm_squared();
        let s_dot_c = s.dot(&c);

        let sub_spacecraft = SurfacePoint::from_rectangular(&s)?;
        let mut radius = shape
            .local_radius(sub_spacecraft.latitude(), sub_spacecraft.longitude())?
            .get::<kilometer>();

        for _ in 0..MAX_TIME_ITERATIONS {
            let alpha = (radius * radius - slant_sq - s_norm_sq) / (2.0 * s_dot_c);
            let arg = slant_sq - alpha * alpha;
            if arg < 0.0 {
                debug!(time, slant, "slant range does not reach the surface");
                return None;
            }
            let beta = match self.look_direction {
                LookDirection::Right => arg.sqrt(),
                LookDirection::Left => -arg.sqrt(),
            };

            let x = s + c * alpha + r * beta;
            let point = SurfacePoint::from_rectangular(&x)?;
            let next = shape
                .local_radius(point.latitude(), point.longitude())?
                .get::<kilometer>();

            if (next - radius).abs() <= RADIUS_TOLERANCE_KM {
                return Some(x);
            }
            radius = next;
        }

        debug!(time, "radar radius iteration did not converge");
        None
    }

    /// Along-track Doppler residual `(X − S)·V` of `ground` at `time`.
    fn doppler(&self, context: &SensorContext, ground: &Vector3<f64>, time: f64) -> Option<f64> {
        let s = context.ephemeris.position(time).ok()?;
        let v = context.ephemeris.velocity(time).ok()?;
        Some((ground - s).dot(&v))
    }

    /// Time of zero Doppler for `ground` within the acquisition window.
    pub(crate) fn observation_time(&self, context: &SensorContext, ground: &Vector3<f64>) -> Option<f64> {
        let (start, end) = context.search_window()?;
        let tolerance = (end - start) / context.lines as f64 / 20.0;

        let f_start = self.doppler(context, ground, start)?;
        let f_end = self.doppler(context, ground, end)?;
        if (f_start < 0.0 && f_end < 0.0) || (f_start > 0.0 && f_end > 0.0) {
            debug!(start, end, "ground point has no zero Doppler time in the window");
            return None;
        }

        let (mut tl, mut fl, mut th, mut fh) = if f_start < f_end {
            (start, f_start, end, f_end)
        } else {
            (end, f_end, start, f_start)
        };

        for _ in 0..MAX_TIME_ITERATIONS {
            let guess = tl + (th - tl) * fl / (fl - fh);
            let f = self.doppler(context, ground, guess)?;
            let step = if f < 0.0 {
                let step = tl - guess;
                tl = guess;
                fl = f;
                step
            } else {
                let step = th - guess;
                th = guess;
                fh = f;
                step
            };

            if step.abs() <= tolerance || f == 0.0 {
                return self.on_look_side(context, ground, guess).then_some(guess);
            }
        }

        debug!("zero Doppler search did not converge");
        None
    }

    /// Whether `ground` lies on the side the antenna looks to at `time`.
    fn on_look_side(&self, context: &SensorContext, ground: &Vector3<f64>, time: f64) -> bool {
        let (Ok(s), Ok(v)) = (context.ephemeris.position(time), context.ephemeris.velocity(time)) else {
            return false;
        };
        let dp = (ground - s).dot(&v.cross(&s));
        match self.look_direction {
            LookDirection::Right => dp > 0.0,
            LookDirection::Left => dp < 0.0,
        }
    }

    /// Slant range of `ground` at `time` as an undistorted focal plane
    /// position. The line axis carries no Doppler offset.
    pub(crate) fn focal_plane_at(
        &self,
        context: &SensorContext,
        ground: &Vector3<f64>,
        time: f64,
    ) -> Option<FocalPlanePoint> {
        let s = context.ephemeris.position(time).ok()?;
        let slant_km = (ground - s).norm();
        Some(FocalPlanePoint::new(slant_km * 1000.0 / self.range_sigma_m, 0.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slant_range_uses_range_sigma() {
        let map = RadarGroundMap::new(LookDirection::Left, 75.0);
        assert_eq!(map.slant_range_km(FocalPlanePoint::new(4000.0, 0.0)), 300.0);
        assert_eq!(map.look_direction(), LookDirection::Left);
    }
}
