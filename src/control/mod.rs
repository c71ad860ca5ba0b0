//! Control points and the apriori/residual computation that feeds bundle
//! adjustment.
//!
//! A [`ControlPoint`] is one physical feature seen in several images. Each
//! sighting is a [`ControlMeasure`] keyed by the serial number of its image,
//! and the [`Camera`] of that image is found through a [`CameraLookup`].

mod measure;
mod net;
mod point;

pub use measure::{ControlMeasure, MeasureType, Residual};
pub use net::{ControlNet, PointReport, ResidualReport};
pub use point::{ControlPoint, Outcome, PointState, PointType, Status, wrap_longitude};

use crate::camera::Camera;
use std::collections::{BTreeMap, HashMap};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ControlError {
    #[error("control point {id} is edit locked")]
    PointLocked { id: String },
    #[error("control point {id} already has a measure for serial number {serial}")]
    DuplicateSerial { id: String, serial: String },
    #[error("control point {id} has no measure for serial number {serial}")]
    UnknownSerial { id: String, serial: String },
    #[error("the reference measure {serial} of control point {id} cannot be deleted")]
    DeleteReference { id: String, serial: String },
    #[error("control point {id} is ground or held and requires latitude, longitude and radius")]
    MissingGround { id: String },
    #[error("cannot compute latitude and longitude for control point {id} measure {serial}")]
    AprioriFailed { id: String, serial: String },
    #[error("control point {id} has no measures which project to the ground")]
    NoProjectingMeasures { id: String },
    #[error("no camera is registered for serial number {serial}")]
    UnknownCamera { serial: String },
    #[error("control point {id} has no ground position")]
    NoSurfacePoint { id: String },
    #[error("the network already has a control point {id}")]
    DuplicatePoint { id: String },
}

/// Finds the camera of the image with a given serial number.
pub trait CameraLookup {
    fn camera(&self, serial: &str) -> Option<&Camera>;
}

impl CameraLookup for HashMap<String, Camera> {
    fn camera(&self, serial: &str) -> Option<&Camera> {
        self.get(serial)
    }
}

impl CameraLookup for BTreeMap<String, Camera> {
    fn camera(&self, serial: &str) -> Option<&Camera> {
        self.get(serial)
    }
}
