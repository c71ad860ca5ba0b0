//! Parent image ↔ detector mappings.
//!
//! Every detector map undoes pixel summing and the starting detector offset.
//! Scanning sensors additionally bind each image line to the ephemeris time it
//! was acquired, so [`DetectorModel::parent_to_detector`] returns that time and
//! [`DetectorModel::detector_to_parent`] consumes it.

mod line_scan;
mod variable_line_scan;
mod variable_summing;

pub use line_scan::LineScanDetectorMap;
pub use variable_line_scan::{LineRateChange, LineRateTable, VariableLineScanDetectorMap};
pub use variable_summing::{DetectorLookup, VARIABLE_SUMMING_MODES, VariableSummingDetectorMap};

use crate::{
    coordinate::{DetectorPoint, ImagePoint},
    error::CameraError,
};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Summing (binning) along one axis plus the first detector used.
///
/// With summing `s` and starting detector `d0`, parent pixel 1 covers detectors
/// `d0 ..= d0 + s - 1` and its centre lands on `d0 + s/2 - 0.5`.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AxisSumming {
    summing: f64,
    starting_detector: f64,
}

impl AxisSumming {
    pub fn new(summing: f64, starting_detector: f64) -> Self {
        Self {
            summing,
            starting_detector,
        }
    }

    pub fn summing(&self) -> f64 {
        self.summing
    }

    fn centre(&self) -> f64 {
        self.summing / 2.0 + 0.5 + (self.starting_detector - 1.0)
    }

    pub fn to_detector(&self, parent: f64) -> f64 {
        (parent - 1.0) * self.summing + self.centre()
    }

    pub fn to_parent(&self, detector: f64) -> f64 {
        (detector - self.centre()) / self.summing + 1.0
    }
}

impl Default for AxisSumming {
    fn default() -> Self {
        Self::new(1.0, 1.0)
    }
}

/// Summing for both axes.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DetectorSumming {
    sample: AxisSumming,
    line: AxisSumming,
}

impl DetectorSumming {
    /// Both summing factors must be at least 1.
    pub fn new(sample: AxisSumming, line: AxisSumming) -> Result<Self, CameraError> {
        if !(sample.summing >= 1.0 && line.summing >= 1.0) {
            return Err(CameraError::InvalidSumming {
                sample: sample.summing,
                line: line.summing,
            });
        }
        Ok(Self { sample, line })
    }

    /// Summing factors with detector numbering starting at 1.
    pub fn uniform(sample: f64, line: f64) -> Result<Self, CameraError> {
        Self::new(AxisSumming::new(sample, 1.0), AxisSumming::new(line, 1.0))
    }

    pub fn sample(&self) -> AxisSumming {
        self.sample
    }

    pub fn line(&self) -> AxisSumming {
        self.line
    }

    pub fn to_detector(&self, parent: ImagePoint) -> DetectorPoint {
        DetectorPoint::new(
            self.sample.to_detector(parent.sample()),
            self.line.to_detector(parent.line()),
        )
    }

    pub fn to_parent(&self, detector: DetectorPoint) -> ImagePoint {
        ImagePoint::new(
            self.sample.to_parent(detector.sample()),
            self.line.to_parent(detector.line()),
        )
    }
}

/// Common interface of the detector maps.
pub trait DetectorModel {
    /// Detector position and acquisition time of a parent pixel.
    fn parent_to_detector(&self, parent: ImagePoint) -> Option<(DetectorPoint, f64)>;

    /// Parent pixel of a detector position observed at `time`.
    fn detector_to_parent(&self, detector: DetectorPoint, time: f64) -> Option<ImagePoint>;

    /// Acquisition window `(start, end)` of an image with `lines` lines.
    fn time_range(&self, lines: usize) -> (f64, f64);

    /// Integration time of the pixel, which may differ from the spacing
    /// between line starts.
    fn exposure_duration(&self, sample: f64, line: f64, band: usize) -> Option<f64>;

    /// Detector pixels per parent pixel along the sample axis.
    fn sample_scale_factor(&self) -> f64;

    /// Detector pixels per parent pixel along the line axis.
    fn line_scale_factor(&self) -> f64;
}

/// A framing sensor: every pixel is exposed at the same instant.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FramingDetectorMap {
    summing: DetectorSumming,
    time: f64,
    exposure_duration: f64,
}

impl FramingDetectorMap {
    /// `time` is the centre of the exposure.
    pub fn new(summing: DetectorSumming, time: f64, exposure_duration: f64) -> Self {
        Self {
            summing,
            time,
            exposure_duration,
        }
    }

    pub fn time(&self) -> f64 {
        self.time
    }
}

impl DetectorModel for FramingDetectorMap {
    fn parent_to_detector(&self, parent: ImagePoint) -> Option<(DetectorPoint, f64)> {
        Some((self.summing.to_detector(parent), self.time))
    }

    fn detector_to_parent(&self, detector: DetectorPoint, _time: f64) -> Option<ImagePoint> {
        Some(self.summing.to_parent(detector))
    }

    fn time_range(&self, _lines: usize) -> (f64, f64) {
        let half = self.exposure_duration / 2.0;
        (self.time - half, self.time + half)
    }

    fn exposure_duration(&self, _sample: f64, _line: f64, _band: usize) -> Option<f64> {
        Some(self.exposure_duration)
    }

    fn sample_scale_factor(&self) -> f64 {
        self.summing.sample.summing
    }

    fn line_scale_factor(&self) -> f64 {
        self.summing.line.summing
    }
}

/// Closed set of detector maps.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum DetectorMap {
    Framing(FramingDetectorMap),
    LineScan(LineScanDetectorMap),
    VariableLineScan(VariableLineScanDetectorMap),
    VariableSumming(VariableSummingDetectorMap),
}

impl DetectorMap {
    /// `true` for maps whose lines are acquired at different times.
    pub fn is_scanning(&self) -> bool {
        !matches!(self, DetectorMap::Framing(_))
    }

    /// The single acquisition time of a framing sensor.
    pub fn exposure_time(&self) -> Option<f64> {
        match self {
            DetectorMap::Framing(m) => Some(m.time()),
            _ => None,
        }
    }

    /// Fixed detector line of a scanning sensor.
    pub fn detector_line(&self) -> Option<f64> {
        match self {
            DetectorMap::Framing(_) => None,
            DetectorMap::LineScan(m) => Some(m.detector_line()),
            DetectorMap::VariableLineScan(m) => Some(m.detector_line()),
            DetectorMap::VariableSumming(m) => Some(m.line_scan().detector_line()),
        }
    }

    /// Smallest spacing between line starts of a scanning sensor.
    pub fn min_line_rate(&self) -> Option<f64> {
        match self {
            DetectorMap::Framing(_) => None,
            DetectorMap::LineScan(m) => Some(m.line_rate()),
            DetectorMap::VariableLineScan(m) => Some(m.table().min_rate()),
            DetectorMap::VariableSumming(m) => Some(m.line_scan().line_rate()),
        }
    }

    pub(crate) fn name(&self) -> &'static str {
        match self {
            DetectorMap::Framing(_) => "framing",
            DetectorMap::LineScan(_) => "line-scan",
            DetectorMap::VariableLineScan(_) => "variable-line-scan",
            DetectorMap::VariableSumming(_) => "variable-summing",
        }
    }

    fn model(&self) -> &dyn DetectorModel {
        match self {
            DetectorMap::Framing(m) => m,
            DetectorMap::LineScan(m) => m,
            DetectorMap::VariableLineScan(m) => m,
            DetectorMap::VariableSumming(m) => m,
        }
    }
}

impl DetectorModel for DetectorMap {
    fn parent_to_detector(&self, parent: ImagePoint) -> Option<(DetectorPoint, f64)> {
        self.model().parent_to_detector(parent)
    }

    fn detector_to_parent(&self, detector: DetectorPoint, time: f64) -> Option<ImagePoint> {
        self.model().detector_to_parent(detector, time)
    }

    fn time_range(&self, lines: usize) -> (f64, f64) {
        self.model().time_range(lines)
    }

    fn exposure_duration(&self, sample: f64, line: f64, band: usize) -> Option<f64> {
        self.model().exposure_duration(sample, line, band)
    }

    fn sample_scale_factor(&self) -> f64 {
        self.model().sample_scale_factor()
    }

    fn line_scale_factor(&self) -> f64 {
        self.model().line_scale_factor()
    }
}

impl From<FramingDetectorMap> for DetectorMap {
    fn from(map: FramingDetectorMap) -> Self {
        DetectorMap::Framing(map)
    }
}

impl From<LineScanDetectorMap> for DetectorMap {
    fn from(map: LineScanDetectorMap) -> Self {
        DetectorMap::LineScan(map)
    }
}

impl From<VariableLineScanDetectorMap> for DetectorMap {
    fn from(map: VariableLineScanDetectorMap) -> Self {
        DetectorMap::VariableLineScan(map)
    }
}

impl From<VariableSummingDetectorMap> for DetectorMap {
    fn from(map: VariableSummingDetectorMap) -> Self {
        DetectorMap::VariableSumming(map)
    }
}
