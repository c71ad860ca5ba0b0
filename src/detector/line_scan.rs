use super::{DetectorModel, DetectorSumming};
use crate::coordinate::{DetectorPoint, ImagePoint};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A push-broom sensor read out at a constant line rate.
///
/// Line `l` is acquired at `start_time + line_rate * (l - 0.5)`, so the top
/// edge of line 1 is `start_time`.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LineScanDetectorMap {
    summing: DetectorSumming,
    start_time: f64,
    line_rate: f64,
    detector_line: f64,
}

impl LineScanDetectorMap {
    /// `line_rate` is the time between line starts and already includes any
    /// line summing.
    pub fn new(summing: DetectorSumming, start_time: f64, line_rate: f64) -> Self {
        Self {
            summing,
            start_time,
            line_rate,
            detector_line: 0.0,
        }
    }

    /// Row of the detector array the scan line is read from.
    pub fn with_detector_line(mut self, detector_line: f64) -> Self {
        self.detector_line = detector_line;
        self
    }

    pub fn summing(&self) -> DetectorSumming {
        self.summing
    }

    pub fn start_time(&self) -> f64 {
        self.start_time
    }

    pub fn line_rate(&self) -> f64 {
        self.line_rate
    }

    pub fn detector_line(&self) -> f64 {
        self.detector_line
    }

    pub fn time_of_line(&self, line: f64) -> f64 {
        self.start_time + self.line_rate * (line - 0.5)
    }

    pub fn line_at_time(&self, time: f64) -> f64 {
        (time - self.start_time) / self.line_rate + 0.5
    }
}

impl DetectorModel for LineScanDetectorMap {
    fn parent_to_detector(&self, parent: ImagePoint) -> Option<(DetectorPoint, f64)> {
        let sample = self.summing.sample().to_detector(parent.sample());
        Some((
            DetectorPoint::new(sample, self.detector_line),
            self.time_of_line(parent.line()),
        ))
    }

    fn detector_to_parent(&self, detector: DetectorPoint, time: f64) -> Option<ImagePoint> {
        Some(ImagePoint::new(
            self.summing.sample().to_parent(detector.sample()),
            self.line_at_time(time),
        ))
    }

    fn time_range(&self, lines: usize) -> (f64, f64) {
        (self.start_time, self.start_time + self.line_rate * lines as f64)
    }

    fn exposure_duration(&self, _sample: f64, _line: f64, _band: usize) -> Option<f64> {
        Some(self.line_rate)
    }

    fn sample_scale_factor(&self) -> f64 {
        self.summing.sample().summing()
    }

    fn line_scale_factor(&self) -> f64 {
        self.summing.line().summing()
    }
}
