use super::{DetectorModel, DetectorSumming};
use crate::{
    coordinate::{DetectorPoint, ImagePoint},
    error::CameraError,
};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use tracing::debug;

/// The line rate in effect from `start_line` until the next change.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LineRateChange {
    start_line: usize,
    start_time: f64,
    rate: f64,
}

impl LineRateChange {
    pub fn new(start_line: usize, start_time: f64, rate: f64) -> Self {
        Self {
            start_line,
            start_time,
            rate,
        }
    }

    /// First image line (1-based) this rate applies to.
    pub fn start_line(&self) -> usize {
        self.start_line
    }

    /// Time at the top edge of `start_line`.
    pub fn start_time(&self) -> f64 {
        self.start_time
    }

    pub fn rate(&self) -> f64 {
        self.rate
    }

    fn top_edge(&self) -> f64 {
        self.start_line as f64 - 0.5
    }
}

/// Validated, ordered line rate changes covering a whole image.
///
/// A single entry describes a constant rate for every line. Otherwise the last
/// entry must start on the last image line, which is what per-line timing
/// tables provide.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LineRateTable {
    entries: Vec<LineRateChange>,
}

impl LineRateTable {
    pub fn new(entries: Vec<LineRateChange>, image_lines: usize) -> Result<Self, CameraError> {
        let first = entries.first().ok_or(CameraError::EmptyLineRateTable)?;
        if first.start_line != 1 {
            return Err(CameraError::LineRateTableStart {
                line: first.start_line,
            });
        }

        for entry in &entries {
            if !(entry.rate > 0.0) {
                return Err(CameraError::InvalidLineRate {
                    line: entry.start_line,
                    rate: entry.rate,
                });
            }
        }

        if let Some(index) = entries
            .windows(2)
            .position(|w| w[1].start_line <= w[0].start_line || w[1].start_time <= w[0].start_time)
        {
            return Err(CameraError::UnorderedLineRateTable { index: index + 1 });
        }

        let last_line = entries.last().map_or(0, |e| e.start_line);
        if entries.len() > 1 && last_line != image_lines {
            return Err(CameraError::LineRateCoverage {
                table_lines: last_line,
                image_lines,
            });
        }

        debug!(entries = entries.len(), image_lines, "line rate table accepted");
        Ok(Self { entries })
    }

    pub fn entries(&self) -> &[LineRateChange] {
        &self.entries
    }

    /// Entry governing `line`, scanning from the end of the table.
    pub fn entry_for_line(&self, line: f64) -> Option<&LineRateChange> {
        self.entries.iter().rev().find(|e| e.top_edge() <= line)
    }

    /// Entry governing `time`, scanning from the end of the table.
    pub fn entry_for_time(&self, time: f64) -> Option<&LineRateChange> {
        self.entries.iter().rev().find(|e| e.start_time <= time)
    }

    pub fn time_of_line(&self, line: f64) -> Option<f64> {
        let entry = self.entry_for_line(line)?;
        Some(entry.start_time + (line - entry.top_edge()) * entry.rate)
    }

    pub fn line_at_time(&self, time: f64) -> Option<f64> {
        let entry = self.entry_for_time(time)?;
        Some((time - entry.start_time) / entry.rate + entry.top_edge())
    }

    pub fn min_rate(&self) -> f64 {
        self.entries
            .iter()
            .map(|e| e.rate)
            .fold(f64::INFINITY, f64::min)
    }
}

/// A push-broom sensor whose line rate changes during the observation.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct VariableLineScanDetectorMap {
    summing: DetectorSumming,
    table: LineRateTable,
    image_lines: usize,
    detector_line: f64,
}

impl VariableLineScanDetectorMap {
    pub fn new(summing: DetectorSumming, table: LineRateTable, image_lines: usize) -> Self {
        Self {
            summing,
            table,
            image_lines,
            detector_line: 0.0,
        }
    }

    /// Validates `entries` against the image height and builds the map.
    pub fn from_entries(
        summing: DetectorSumming,
        entries: Vec<LineRateChange>,
        image_lines: usize,
    ) -> Result<Self, CameraError> {
        let table = LineRateTable::new(entries, image_lines)?;
        Ok(Self::new(summing, table, image_lines))
    }

    pub fn with_detector_line(mut self, detector_line: f64) -> Self {
        self.detector_line = detector_line;
        self
    }

    pub fn table(&self) -> &LineRateTable {
        &self.table
    }

    pub fn detector_line(&self) -> f64 {
        self.detector_line
    }
}

impl DetectorModel for VariableLineScanDetectorMap {
    fn parent_to_detector(&self, parent: ImagePoint) -> Option<(DetectorPoint, f64)> {
        let time = self.table.time_of_line(parent.line())?;
        let sample = self.summing.sample().to_detector(parent.sample());
        Some((DetectorPoint::new(sample, self.detector_line), time))
    }

    fn detector_to_parent(&self, detector: DetectorPoint, time: f64) -> Option<ImagePoint> {
        let line = self.table.line_at_time(time)?;
        Some(ImagePoint::new(
            self.summing.sample().to_parent(detector.sample()),
            line,
        ))
    }

    fn time_range(&self, _lines: usize) -> (f64, f64) {
        let entries = self.table.entries();
        let start = entries.first().map_or(0.0, |e| e.start_time);
        match entries.last() {
            Some(last) if entries.len() > 1 => (start, last.start_time + last.rate),
            Some(only) => (start, start + only.rate * self.image_lines as f64),
            None => (start, start),
        }
    }

    fn exposure_duration(&self, _sample: f64, line: f64, _band: usize) -> Option<f64> {
        self.table.entry_for_line(line).map(|e| e.rate)
    }

    fn sample_scale_factor(&self) -> f64 {
        self.summing.sample().summing()
    }

    fn line_scale_factor(&self) -> f64 {
        self.summing.line().summing()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rstest::rstest;

    fn two_rate_table() -> LineRateTable {
        LineRateTable::new(
            vec![
                LineRateChange::new(1, 100.0, 0.01),
                LineRateChange::new(3, 100.02, 0.02),
                LineRateChange::new(5, 100.06, 0.04),
            ],
            5,
        )
        .unwrap()
    }

    #[rstest]
    #[case(1.0, 100.005)]
    #[case(2.5, 100.02)]
    #[case(3.0, 100.03)]
    #[case(4.5, 100.06)]
    #[case(5.0, 100.08)]
    fn line_times_follow_active_rate(#[case] line: f64, #[case] time: f64) {
        let table = two_rate_table();
        assert_relative_eq!(table.time_of_line(line).unwrap(), time, epsilon = 1e-12);
        assert_relative_eq!(table.line_at_time(time).unwrap(), line, epsilon = 1e-9);
    }

    #[test]
    fn nothing_before_first_line() {
        let table = two_rate_table();
        assert_eq!(table.time_of_line(0.4), None);
        assert_eq!(table.line_at_time(99.0), None);
    }

    #[test]
    fn exposure_comes_from_matching_entry() {
        let map = VariableLineScanDetectorMap::new(DetectorSumming::default(), two_rate_table(), 5);
        assert_eq!(map.exposure_duration(1.0, 3.2, 1), Some(0.02));
        assert_eq!(map.exposure_duration(1.0, 5.0, 1), Some(0.04));
        let (start, end) = map.time_range(5);
        assert_eq!(start, 100.0);
        assert_relative_eq!(end, 100.1, epsilon = 1e-12);
    }

    #[test]
    fn short_table_is_rejected() {
        let r = 0.005;
        let err = LineRateTable::new(
            vec![
                LineRateChange::new(1, 0.0, r),
                LineRateChange::new(500, 499.0 * r, 2.0 * r),
            ],
            999,
        );
        assert_eq!(
            err,
            Err(CameraError::LineRateCoverage {
                table_lines: 500,
                image_lines: 999
            })
        );
    }

    #[rstest]
    #[case(vec![], CameraError::EmptyLineRateTable)]
    #[case(vec![LineRateChange::new(2, 0.0, 0.1)], CameraError::LineRateTableStart { line: 2 })]
    #[case(vec![LineRateChange::new(1, 0.0, 0.0)], CameraError::InvalidLineRate { line: 1, rate: 0.0 })]
    #[case(
        vec![LineRateChange::new(1, 1.0, 0.1), LineRateChange::new(2, 0.5, 0.1)],
        CameraError::UnorderedLineRateTable { index: 1 }
    )]
    fn malformed_tables(#[case] entries: Vec<LineRateChange>, #[case] expected: CameraError) {
        assert_eq!(LineRateTable::new(entries, 2), Err(expected));
    }

    #[test]
    fn single_entry_covers_whole_image() {
        let table = LineRateTable::new(vec![LineRateChange::new(1, 10.0, 0.5)], 40).unwrap();
        let map = VariableLineScanDetectorMap::new(DetectorSumming::default(), table, 40);
        assert_eq!(map.time_range(40), (10.0, 30.0));
    }
}
