//! Coupling between focal plane rays and the observed body.
//!
//! A ground map intersects an undistorted focal plane ray with the target, and
//! projects a known ground point back into the focal plane. For scanning
//! sensors the projection also has to discover *when* the point was seen, which
//! is a one dimensional root search over ephemeris time.

use crate::{
    coordinate::FocalPlanePoint,
    detector::{DetectorMap, DetectorModel},
    distortion::{DistortionMap, DistortionModel},
    focal_plane::FocalPlaneMap,
    radar::RadarGroundMap,
    search::find_time_root,
    shape::ShapeModel,
    spice::Ephemeris,
};
use nalgebra::Vector3;
use tracing::debug;

/// Everything a ground or sky map needs from the camera it belongs to.
#[derive(Clone, Copy)]
pub struct SensorContext<'a> {
    pub ephemeris: &'a dyn Ephemeris,
    pub focal_length_mm: f64,
    pub distortion: &'a DistortionMap,
    pub focal_plane: &'a FocalPlaneMap,
    pub detector: &'a DetectorMap,
    pub lines: usize,
}

impl SensorContext<'_> {
    /// Window in which a scanning sensor can have seen anything: the
    /// acquisition window clipped to the ephemeris coverage.
    pub fn search_window(&self) -> Option<(f64, f64)> {
        let (start, end) = self.detector.time_range(self.lines);
        let (eph_start, eph_end) = self.ephemeris.time_range();
        let (start, end) = (start.max(eph_start), end.min(eph_end));
        (start < end).then_some((start, end))
    }

    /// Signed distance in detector lines between the projection of a target
    /// at `time` and the scan line of the detector.
    pub fn line_offset(&self, undistorted: FocalPlanePoint) -> Option<f64> {
        let detector_line = self.detector.detector_line()?;
        let distorted = self.distortion.distort(undistorted)?;
        Some(self.focal_plane.focal_plane_to_detector(distorted).line() - detector_line)
    }

    /// Time at which a scanning sensor saw the target whose undistorted focal
    /// plane position at any time is given by `project`.
    pub fn scan_for_time<F>(&self, project: F) -> Option<f64>
    where
        F: Fn(f64) -> Option<FocalPlanePoint>,
    {
        let (start, end) = self.search_window()?;
        let tolerance = self.detector.min_line_rate()? / 10.0;
        find_time_root(start, end, tolerance, |t| self.line_offset(project(t)?))
    }
}

/// Look vector in the camera frame for an undistorted focal plane position.
pub fn camera_look(focal_length_mm: f64, undistorted: FocalPlanePoint) -> Vector3<f64> {
    Vector3::new(undistorted.x(), undistorted.y(), focal_length_mm)
}

/// Projects a camera frame vector onto the focal plane. Points behind the
/// camera have no projection.
pub fn project_camera_vector(focal_length_mm: f64, v: &Vector3<f64>) -> Option<FocalPlanePoint> {
    (v.z > 0.0).then(|| {
        FocalPlanePoint::new(focal_length_mm * v.x / v.z, focal_length_mm * v.y / v.z)
    })
}

/// Closed set of ground maps.
#[derive(Clone, Debug, PartialEq)]
pub enum GroundMap {
    /// All pixels share one ephemeris time.
    Framing,
    /// Each line has its own time.
    LineScan,
    /// Side-looking range/Doppler geometry.
    Radar(RadarGroundMap),
}

impl GroundMap {
    /// Body-fixed surface position (km) seen by `undistorted` at `time`.
    pub fn intersect(
        &self,
        context: &SensorContext,
        shape: &dyn ShapeModel,
        undistorted: FocalPlanePoint,
        time: f64,
    ) -> Option<Vector3<f64>> {
        match self {
            GroundMap::Framing | GroundMap::LineScan => {
                let observer = context.ephemeris.position(time).ok()?;
                let rotation = context.ephemeris.camera_to_body(time).ok()?;
                let look = rotation * camera_look(context.focal_length_mm, undistorted);
                let hit = shape.intersect(&observer, &look);
                if hit.is_none() {
                    debug!(time, "look vector misses the target");
                }
                hit
            }
            GroundMap::Radar(radar) => radar.intersect(context, shape, undistorted, time),
        }
    }

    /// Undistorted focal plane position of `ground` using the geometry at
    /// `time`, without searching for a better time.
    pub fn focal_plane_at(
        &self,
        context: &SensorContext,
        ground: &Vector3<f64>,
        time: f64,
    ) -> Option<FocalPlanePoint> {
        match self {
            GroundMap::Framing | GroundMap::LineScan => {
                let observer = context.ephemeris.position(time).ok()?;
                let rotation = context.ephemeris.camera_to_body(time).ok()?;
                let v = rotation.inverse() * (ground - observer);
                project_camera_vector(context.focal_length_mm, &v)
            }
            GroundMap::Radar(radar) => radar.focal_plane_at(context, ground, time),
        }
    }

    /// Time at which `ground` was observed.
    pub fn observation_time(&self, context: &SensorContext, ground: &Vector3<f64>) -> Option<f64> {
        match self {
            GroundMap::Framing => context.detector.exposure_time(),
            GroundMap::LineScan => {
                let found = context.scan_for_time(|t| self.focal_plane_at(context, ground, t));
                if found.is_none() {
                    debug!("ground point was not observed inside the scan window");
                }
                found
            }
            GroundMap::Radar(radar) => radar.observation_time(context, ground),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn projection_inverts_look() {
        let fp = FocalPlanePoint::new(1.25, -0.5);
        let look = camera_look(100.0, fp) * 3.0;
        let back = project_camera_vector(100.0, &look).unwrap();
        assert_relative_eq!(back.x(), 1.25, epsilon = 1e-12);
        assert_relative_eq!(back.y(), -0.5, epsilon = 1e-12);
    }

    #[test]
    fn behind_camera_has_no_projection() {
        assert_eq!(project_camera_vector(100.0, &Vector3::new(0.0, 0.0, -1.0)), None);
    }
}
