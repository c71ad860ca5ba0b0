//! Sensor geometric models for planetary images.
//!
//! A [`camera::Camera`] converts between image pixels and what they look at,
//! a body-fixed ground point or a direction on the sky, through four stages:
//! a detector map, a focal plane map, a distortion model and a ground or sky
//! map. The [`control`] module uses cameras to estimate control point
//! positions and measure residuals for bundle adjustment.

pub mod camera;
pub mod control;
pub mod coordinate;
pub mod detector;
pub mod distortion;
#[allow(missing_docs)]
pub mod error;
pub mod focal_plane;
pub mod geometry;
pub mod ground;
pub mod instrument;
pub mod radar;
pub mod search;
pub mod shape;
pub mod sky;
pub mod spice;

pub mod prelude {
    pub use crate::camera::{Camera, CameraBuilder, CameraKind, Observation, Target};
    pub use crate::control::{
        CameraLookup, ControlError, ControlMeasure, ControlNet, ControlPoint, MeasureType, PointType,
    };
    pub use crate::coordinate::{DetectorPoint, FocalPlanePoint, ImagePoint};
    pub use crate::detector::{DetectorMap, DetectorModel, DetectorSumming};
    pub use crate::distortion::{DistortionMap, DistortionModel};
    pub use crate::error::CameraError;
    pub use crate::focal_plane::FocalPlaneMap;
    pub use crate::geometry::{SkyPoint, SurfacePoint};
    pub use crate::shape::{Ellipsoid, ShapeModel};
    pub use crate::spice::{Ephemeris, EphemerisCache, EphemerisError, EphemerisState};
}
