use crate::{
    coordinate::FocalPlanePoint,
    geometry::SkyPoint,
    ground::{SensorContext, camera_look, project_camera_vector},
};
use nalgebra::Vector3;
use tracing::debug;

/// Maps focal plane rays to inertial directions.
///
/// Only the instrument orientation matters here: stars are far enough away
/// that spacecraft position does not change where they appear.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SkyMap {
    Framing,
    LineScan,
}

impl SkyMap {
    /// Inertial direction seen by `undistorted` at `time`.
    pub fn direction(&self, context: &SensorContext, undistorted: FocalPlanePoint, time: f64) -> Option<SkyPoint> {
        let rotation = context.ephemeris.instrument_rotation(time).ok()?;
        SkyPoint::from_vector(&(rotation * camera_look(context.focal_length_mm, undistorted)))
    }

    /// Undistorted focal plane position of `sky` with the pointing at `time`.
    pub fn focal_plane_at(&self, context: &SensorContext, sky: &SkyPoint, time: f64) -> Option<FocalPlanePoint> {
        let rotation = context.ephemeris.instrument_rotation(time).ok()?;
        let v: Vector3<f64> = rotation.inverse() * sky.to_vector();
        project_camera_vector(context.focal_length_mm, &v)
    }

    /// Time at which `sky` was observed.
    pub fn observation_time(&self, context: &SensorContext, sky: &SkyPoint) -> Option<f64> {
        match self {
            SkyMap::Framing => context.detector.exposure_time(),
            SkyMap::LineScan => {
                let found = context.scan_for_time(|t| self.focal_plane_at(context, sky, t));
                if found.is_none() {
                    debug!("sky direction was not observed inside the scan window");
                }
                found
            }
        }
    }
}
