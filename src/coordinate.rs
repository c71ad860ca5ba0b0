//! Plain coordinate values passed between the stages of a camera model.
//!
//! Image and detector coordinates are in pixels with pixel centres on whole
//! numbers starting at 1. Focal plane coordinates are in millimetres.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A position in the full (parent) image.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ImagePoint {
    sample: f64,
    line: f64,
}

impl ImagePoint {
    pub fn new(sample: f64, line: f64) -> Self {
        Self { sample, line }
    }

    pub fn sample(&self) -> f64 {
        self.sample
    }

    pub fn line(&self) -> f64 {
        self.line
    }
}

impl AsRef<ImagePoint> for ImagePoint {
    fn as_ref(&self) -> &ImagePoint {
        self
    }
}

/// A position on the physical detector array.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DetectorPoint {
    sample: f64,
    line: f64,
}

impl DetectorPoint {
    pub fn new(sample: f64, line: f64) -> Self {
        Self { sample, line }
    }

    pub fn sample(&self) -> f64 {
        self.sample
    }

    pub fn line(&self) -> f64 {
        self.line
    }
}

/// A position on the idealised focal plane in millimetres.
///
/// The same type carries both distorted and undistorted positions; which one a
/// value holds is decided by the stage that produced it.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FocalPlanePoint {
    x: f64,
    y: f64,
}

impl FocalPlanePoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn x(&self) -> f64 {
        self.x
    }

    pub fn y(&self) -> f64 {
        self.y
    }

    /// Euclidean distance to `other` in millimetres.
    pub fn distance(&self, other: &FocalPlanePoint) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

impl AsRef<FocalPlanePoint> for FocalPlanePoint {
    fn as_ref(&self) -> &FocalPlanePoint {
        self
    }
}
