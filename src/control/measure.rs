use crate::coordinate::FocalPlanePoint;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum MeasureType {
    /// Placed but never measured. Skipped by every computation.
    #[default]
    Unmeasured,
    Measured,
    /// The measure other measures of the point were registered against.
    Reference,
}

/// Measured minus computed detector position, in detector pixels.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Residual {
    sample: f64,
    line: f64,
}

impl Residual {
    pub fn new(sample: f64, line: f64) -> Self {
        Self { sample, line }
    }

    pub fn sample(&self) -> f64 {
        self.sample
    }

    pub fn line(&self) -> f64 {
        self.line
    }

    pub fn magnitude(&self) -> f64 {
        self.sample.hypot(self.line)
    }
}

/// One observation of a control point in one image.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ControlMeasure {
    serial: String,
    sample: f64,
    line: f64,
    kind: MeasureType,
    ignore: bool,
    focal_plane_measured: Option<FocalPlanePoint>,
    focal_plane_computed: Option<FocalPlanePoint>,
    ephemeris_time: Option<f64>,
    residual: Option<Residual>,
}

impl ControlMeasure {
    /// `serial` identifies the image the measure was made on.
    pub fn new(serial: impl Into<String>, sample: f64, line: f64, kind: MeasureType) -> Self {
        Self {
            serial: serial.into(),
            sample,
            line,
            kind,
            ignore: false,
            focal_plane_measured: None,
            focal_plane_computed: None,
            ephemeris_time: None,
            residual: None,
        }
    }

    pub fn measured(serial: impl Into<String>, sample: f64, line: f64) -> Self {
        Self::new(serial, sample, line, MeasureType::Measured)
    }

    pub fn with_ignore(mut self, ignore: bool) -> Self {
        self.ignore = ignore;
        self
    }

    pub fn serial(&self) -> &str {
        &self.serial
    }

    pub fn sample(&self) -> f64 {
        self.sample
    }

    pub fn line(&self) -> f64 {
        self.line
    }

    pub fn kind(&self) -> MeasureType {
        self.kind
    }

    pub fn is_ignored(&self) -> bool {
        self.ignore
    }

    /// Takes part in apriori and residual computation.
    pub fn is_active(&self) -> bool {
        !self.ignore && self.kind != MeasureType::Unmeasured
    }

    /// Undistorted focal plane position of the measured pixel.
    pub fn focal_plane_measured(&self) -> Option<FocalPlanePoint> {
        self.focal_plane_measured
    }

    /// Undistorted focal plane position of the control point.
    pub fn focal_plane_computed(&self) -> Option<FocalPlanePoint> {
        self.focal_plane_computed
    }

    /// Time the measured pixel was acquired.
    pub fn ephemeris_time(&self) -> Option<f64> {
        self.ephemeris_time
    }

    pub fn residual(&self) -> Option<Residual> {
        self.residual
    }

    pub fn error_magnitude(&self) -> Option<f64> {
        self.residual.map(|r| r.magnitude())
    }

    /// Moves the measure. Derived values are cleared.
    pub fn set_coordinate(&mut self, sample: f64, line: f64) {
        self.sample = sample;
        self.line = line;
        self.focal_plane_measured = None;
        self.focal_plane_computed = None;
        self.ephemeris_time = None;
        self.residual = None;
    }

    pub fn set_kind(&mut self, kind: MeasureType) {
        self.kind = kind;
    }

    pub fn set_ignore(&mut self, ignore: bool) {
        self.ignore = ignore;
    }

    pub(crate) fn set_measured(&mut self, focal_plane: FocalPlanePoint, time: f64) {
        self.focal_plane_measured = Some(focal_plane);
        self.ephemeris_time = Some(time);
    }

    pub(crate) fn set_computed(&mut self, focal_plane: FocalPlanePoint, residual: Residual) {
        self.focal_plane_computed = Some(focal_plane);
        self.residual = Some(residual);
    }

    pub(crate) fn clear_computed(&mut self) {
        self.focal_plane_computed = None;
        self.residual = None;
    }
}
