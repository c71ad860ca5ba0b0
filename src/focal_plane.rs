//! Affine mapping between detector pixels and focal plane millimetres.

use crate::{
    coordinate::{DetectorPoint, FocalPlanePoint},
    error::CameraError,
    instrument::{CoefficientSource, instrument_key},
};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Detector ↔ focal plane affine transform.
///
/// The forward (`trans_x`, `trans_y`) and inverse (`trans_s`, `trans_l`)
/// coefficients come separately from calibration and are not required to be
/// exact inverses of each other. Use [`FocalPlaneMap::round_trip_error`] to
/// measure how far apart they are for a given instrument.
///
/// Detector coordinates are first centred on the detector origin and shifted by
/// the detector offset:
///
/// ```text
/// cs = sample - origin_sample - offset_sample
/// x  = trans_x[0] + trans_x[1] * cs + trans_x[2] * cl
/// ```
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FocalPlaneMap {
    trans_x: [f64; 3],
    trans_y: [f64; 3],
    trans_s: [f64; 3],
    trans_l: [f64; 3],
    origin: DetectorPoint,
    offset: DetectorPoint,
}

impl FocalPlaneMap {
    pub fn new(trans_x: [f64; 3], trans_y: [f64; 3], trans_s: [f64; 3], trans_l: [f64; 3]) -> Self {
        Self {
            trans_x,
            trans_y,
            trans_s,
            trans_l,
            origin: DetectorPoint::new(0.0, 0.0),
            offset: DetectorPoint::new(0.0, 0.0),
        }
    }

    /// Square pixels of `pixel_pitch_mm` with the focal plane axes aligned to
    /// the detector axes.
    pub fn from_pixel_pitch(pixel_pitch_mm: f64) -> Result<Self, CameraError> {
        if !(pixel_pitch_mm > 0.0) {
            return Err(CameraError::InvalidPixelPitch { pixel_pitch_mm });
        }
        let inverse = 1.0 / pixel_pitch_mm;
        Ok(Self::new(
            [0.0, pixel_pitch_mm, 0.0],
            [0.0, 0.0, pixel_pitch_mm],
            [0.0, inverse, 0.0],
            [0.0, 0.0, inverse],
        ))
    }

    /// Reads `TRANSX`, `TRANSY`, `ITRANSS` and `ITRANSL` for the instrument.
    ///
    /// `BORESIGHT_SAMPLE` and `BORESIGHT_LINE`, when present, set the detector
    /// origin.
    pub fn from_source<S>(source: &S, code: i32) -> Result<Self, CameraError>
    where
        S: CoefficientSource + ?Sized,
    {
        let mut map = Self::new(
            source.require_n(&instrument_key(code, "TRANSX"))?,
            source.require_n(&instrument_key(code, "TRANSY"))?,
            source.require_n(&instrument_key(code, "ITRANSS"))?,
            source.require_n(&instrument_key(code, "ITRANSL"))?,
        );

        let sample = source.scalar(&instrument_key(code, "BORESIGHT_SAMPLE"));
        let line = source.scalar(&instrument_key(code, "BORESIGHT_LINE"));
        if let (Some(sample), Some(line)) = (sample, line) {
            map.set_detector_origin(sample, line);
        }

        Ok(map)
    }

    pub fn set_detector_origin(&mut self, sample: f64, line: f64) {
        self.origin = DetectorPoint::new(sample, line);
    }

    pub fn set_detector_offset(&mut self, sample: f64, line: f64) {
        self.offset = DetectorPoint::new(sample, line);
    }

    pub fn with_detector_origin(mut self, sample: f64, line: f64) -> Self {
        self.set_detector_origin(sample, line);
        self
    }

    pub fn with_detector_offset(mut self, sample: f64, line: f64) -> Self {
        self.set_detector_offset(sample, line);
        self
    }

    pub fn detector_origin(&self) -> DetectorPoint {
        self.origin
    }

    pub fn detector_offset(&self) -> DetectorPoint {
        self.offset
    }

    pub fn detector_to_focal_plane(&self, detector: DetectorPoint) -> FocalPlanePoint {
        let cs = detector.sample() - self.origin.sample() - self.offset.sample();
        let cl = detector.line() - self.origin.line() - self.offset.line();
        FocalPlanePoint::new(affine(&self.trans_x, cs, cl), affine(&self.trans_y, cs, cl))
    }

    pub fn focal_plane_to_detector(&self, focal_plane: FocalPlanePoint) -> DetectorPoint {
        let (x, y) = (focal_plane.x(), focal_plane.y());
        DetectorPoint::new(
            affine(&self.trans_s, x, y) + self.offset.sample() + self.origin.sample(),
            affine(&self.trans_l, x, y) + self.offset.line() + self.origin.line(),
        )
    }

    /// Pixel distance between `detector` and its image under the forward then
    /// inverse transform.
    pub fn round_trip_error(&self, detector: DetectorPoint) -> f64 {
        let back = self.focal_plane_to_detector(self.detector_to_focal_plane(detector));
        (back.sample() - detector.sample()).hypot(back.line() - detector.line())
    }

    /// The map for `band` of a multi-band sensor whose band footprints are
    /// displaced by `shift` on the focal plane. Band 1 is the map itself.
    ///
    /// Both constant terms move by `(band - 1) * shift`, with the inverse
    /// constants adjusted so the pair stays consistent.
    pub fn for_band(&self, band: usize, shift: FocalPlanePoint) -> Self {
        let n = band.saturating_sub(1) as f64;
        let (dx, dy) = (n * shift.x(), n * shift.y());

        let mut map = self.clone();
        map.trans_x[0] += dx;
        map.trans_y[0] += dy;
        map.trans_s[0] -= self.trans_s[1] * dx + self.trans_s[2] * dy;
        map.trans_l[0] -= self.trans_l[1] * dx + self.trans_l[2] * dy;
        map
    }

    /// Focal plane millimetres per detector pixel along the sample axis.
    pub fn sample_scale(&self) -> f64 {
        self.trans_x[1].hypot(self.trans_y[1])
    }

    /// Focal plane millimetres per detector pixel along the line axis.
    pub fn line_scale(&self) -> f64 {
        self.trans_x[2].hypot(self.trans_y[2])
    }
}

fn affine(c: &[f64; 3], a: f64, b: f64) -> f64 {
    c[0] + c[1] * a + c[2] * b
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instrument::KeywordMap;
    use approx::assert_relative_eq;
    use quickcheck_macros::quickcheck;

    #[test]
    fn pixel_pitch_map_scales_about_origin() {
        let map = FocalPlaneMap::from_pixel_pitch(0.007)
            .unwrap()
            .with_detector_origin(512.5, 512.5);
        let fp = map.detector_to_focal_plane(DetectorPoint::new(612.5, 412.5));
        assert_relative_eq!(fp.x(), 0.7, epsilon = 1e-12);
        assert_relative_eq!(fp.y(), -0.7, epsilon = 1e-12);
    }

    #[test]
    fn rejects_non_positive_pitch() {
        assert_eq!(
            FocalPlaneMap::from_pixel_pitch(-1.0),
            Err(CameraError::InvalidPixelPitch { pixel_pitch_mm: -1.0 })
        );
    }

    #[test]
    fn offset_applies_in_both_directions() {
        let map = FocalPlaneMap::from_pixel_pitch(0.01)
            .unwrap()
            .with_detector_origin(100.0, 1.0)
            .with_detector_offset(3.0, 0.0);
        let d = DetectorPoint::new(103.0, 1.0);
        let fp = map.detector_to_focal_plane(d);
        assert_relative_eq!(fp.x(), 0.0);
        assert_eq!(map.focal_plane_to_detector(fp), d);
    }

    #[test]
    fn mismatched_inverse_shows_round_trip_error() {
        // Inverse coefficients rounded the way calibration kernels often are.
        let map = FocalPlaneMap::new(
            [0.0, 0.014, 0.0],
            [0.0, 0.0, 0.014],
            [0.0, 71.4286, 0.0],
            [0.0, 0.0, 71.4286],
        );
        let err = map.round_trip_error(DetectorPoint::new(1000.0, -1000.0));
        assert!(err > 1e-6);
        assert!(err < 1e-3);
    }

    #[test]
    fn band_shift_keeps_inverse_consistent() {
        let base = FocalPlaneMap::from_pixel_pitch(0.027)
            .unwrap()
            .with_detector_origin(128.5, 0.5);
        let band = base.for_band(7, FocalPlanePoint::new(0.0, 0.027));
        let d = DetectorPoint::new(40.0, 0.5);

        let fp = band.detector_to_focal_plane(d);
        assert_relative_eq!(fp.y(), 6.0 * 0.027, epsilon = 1e-12);
        assert!(band.round_trip_error(d) < 1e-9);
        assert_eq!(base.for_band(1, FocalPlanePoint::new(1.0, 1.0)), base);
    }

    #[test]
    fn reads_instrument_keywords() {
        let mut source = KeywordMap::default();
        source.insert("INS-12345_TRANSX", vec![0.0, 0.01, 0.0]);
        source.insert("INS-12345_TRANSY", vec![0.0, 0.0, 0.01]);
        source.insert("INS-12345_ITRANSS", vec![0.0, 100.0, 0.0]);
        source.insert("INS-12345_ITRANSL", vec![0.0, 0.0, 100.0]);
        source.insert("INS-12345_BORESIGHT_SAMPLE", vec![256.5]);
        source.insert("INS-12345_BORESIGHT_LINE", vec![128.5]);

        let map = FocalPlaneMap::from_source(&source, -12345).unwrap();
        assert_eq!(map.detector_origin(), DetectorPoint::new(256.5, 128.5));

        let missing = FocalPlaneMap::from_source(&KeywordMap::default(), -12345);
        assert_eq!(
            missing,
            Err(CameraError::MissingKeyword {
                key: "INS-12345_TRANSX".into()
            })
        );
    }

    #[quickcheck]
    fn consistent_pair_round_trips(sample: u16, line: u16) -> bool {
        let map = FocalPlaneMap::from_pixel_pitch(0.0125)
            .unwrap()
            .with_detector_origin(1024.5, 1024.5)
            .with_detector_offset(-2.0, 1.0);
        let d = DetectorPoint::new(f64::from(sample % 2048) + 1.0, f64::from(line % 2048) + 1.0);
        map.round_trip_error(d) < 1e-6
    }
}
