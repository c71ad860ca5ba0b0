use super::{DetectorModel, LineScanDetectorMap};
use crate::{
    coordinate::{DetectorPoint, ImagePoint},
    error::CameraError,
};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Summing modes of the wide-angle line scanner whose summed pixels have
/// uneven detector widths.
pub const VARIABLE_SUMMING_MODES: [u32; 2] = [13, 27];

/// First and last detector (inclusive) combined into each parent sample.
///
/// Within one parent pixel the detector coordinate is interpolated linearly, so
/// parent sample `i` spans detectors `start[i] - 0.5 .. end[i] + 0.5`.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DetectorLookup {
    spans: Vec<(f64, f64)>,
}

impl DetectorLookup {
    /// `spans[i]` is `(start, end)` for parent sample `i + 1`.
    pub fn new(spans: Vec<(f64, f64)>) -> Result<Self, CameraError> {
        if spans.is_empty() {
            return Err(CameraError::UnorderedDetectorLookup { index: 0 });
        }
        if let Some(index) = spans.iter().position(|(start, end)| end < start) {
            return Err(CameraError::UnorderedDetectorLookup { index });
        }
        if let Some(index) = spans.windows(2).position(|w| w[1].0 <= w[0].1) {
            return Err(CameraError::UnorderedDetectorLookup { index: index + 1 });
        }
        Ok(Self { spans })
    }

    /// Spans of a uniform `summing` starting at detector `first`.
    pub fn uniform(summing: f64, first: f64, samples: usize) -> Result<Self, CameraError> {
        let spans = (0..samples)
            .map(|i| {
                let start = first + i as f64 * summing;
                (start, start + summing - 1.0)
            })
            .collect();
        Self::new(spans)
    }

    pub fn len(&self) -> usize {
        self.spans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }

    fn span(&self, index: usize) -> (f64, f64) {
        self.spans[index.min(self.spans.len() - 1)]
    }

    pub fn to_detector(&self, sample: f64) -> f64 {
        let pixel = (sample + 0.5).floor().max(1.0) as usize;
        let index = pixel.min(self.spans.len()) - 1;
        let (start, end) = self.span(index);
        let width = end - start + 1.0;
        width * (sample - (index as f64 + 0.5)) + (start - 0.5)
    }

    pub fn to_parent(&self, detector: f64) -> f64 {
        let index = self
            .spans
            .iter()
            .position(|&(_, end)| detector < end + 0.5)
            .unwrap_or(self.spans.len() - 1);
        let (start, end) = self.span(index);
        let width = end - start + 1.0;
        (detector - (start - 0.5)) / width + index as f64 + 0.5
    }
}

/// A fixed-rate line scanner whose sample summing follows a calibration table
/// for some summing modes.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct VariableSummingDetectorMap {
    line_scan: LineScanDetectorMap,
    summing_mode: u32,
    lookup: Option<DetectorLookup>,
}

impl VariableSummingDetectorMap {
    /// Selects the lookup for the line scan's sample summing from
    /// `calibration`. Modes listed in `lookup_modes` must have one.
    pub fn new(
        line_scan: LineScanDetectorMap,
        calibration: &BTreeMap<u32, DetectorLookup>,
        lookup_modes: &[u32],
    ) -> Result<Self, CameraError> {
        let summing_mode = line_scan.summing().sample().summing().round() as u32;
        let lookup = if lookup_modes.contains(&summing_mode) {
            let lookup = calibration
                .get(&summing_mode)
                .cloned()
                .ok_or(CameraError::MissingDetectorLookup {
                    summing: summing_mode,
                })?;
            Some(lookup)
        } else {
            None
        };

        Ok(Self {
            line_scan,
            summing_mode,
            lookup,
        })
    }

    pub fn line_scan(&self) -> &LineScanDetectorMap {
        &self.line_scan
    }

    pub fn summing_mode(&self) -> u32 {
        self.summing_mode
    }

    pub fn lookup(&self) -> Option<&DetectorLookup> {
        self.lookup.as_ref()
    }
}

impl DetectorModel for VariableSummingDetectorMap {
    fn parent_to_detector(&self, parent: ImagePoint) -> Option<(DetectorPoint, f64)> {
        let (detector, time) = self.line_scan.parent_to_detector(parent)?;
        match &self.lookup {
            Some(lookup) => Some((
                DetectorPoint::new(lookup.to_detector(parent.sample()), detector.line()),
                time,
            )),
            None => Some((detector, time)),
        }
    }

    fn detector_to_parent(&self, detector: DetectorPoint, time: f64) -> Option<ImagePoint> {
        let parent = self.line_scan.detector_to_parent(detector, time)?;
        match &self.lookup {
            Some(lookup) => Some(ImagePoint::new(lookup.to_parent(detector.sample()), parent.line())),
            None => Some(parent),
        }
    }

    fn time_range(&self, lines: usize) -> (f64, f64) {
        self.line_scan.time_range(lines)
    }

    fn exposure_duration(&self, sample: f64, line: f64, band: usize) -> Option<f64> {
        self.line_scan.exposure_duration(sample, line, band)
    }

    fn sample_scale_factor(&self) -> f64 {
        self.line_scan.sample_scale_factor()
    }

    fn line_scale_factor(&self) -> f64 {
        self.line_scan.line_scale_factor()
    }
}
