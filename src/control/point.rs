use super::{CameraLookup, ControlError, ControlMeasure, MeasureType, Residual};
use crate::{
    camera::Camera, coordinate::FocalPlanePoint, detector::DetectorModel, geometry::SurfacePoint,
};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uom::si::{angle::degree, length::kilometer};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum PointType {
    /// Ground position is known and authoritative.
    Ground,
    /// Ground position is estimated from the measures.
    #[default]
    Tie,
}

/// How far a point has been processed since its measures last changed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum PointState {
    #[default]
    Unpopulated,
    HasMeasures,
    AprioriComputed,
    ResidualsComputed,
}

/// Measures visited by an apriori or residual pass.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Outcome {
    pub processed: usize,
    /// Serial numbers of measures that could not be projected.
    pub failed: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Status {
    Computed(Outcome),
    /// The point is ignored and was left untouched.
    Ignored,
}

impl Status {
    pub fn failed(&self) -> &[String] {
        match self {
            Status::Computed(outcome) => &outcome.failed,
            Status::Ignored => &[],
        }
    }
}

/// Moves `lon` by whole turns until it is within 180 degrees of `base`.
///
/// Non-finite inputs are returned unchanged.
pub fn wrap_longitude(mut lon: f64, base: f64) -> f64 {
    if !lon.is_finite() || !base.is_finite() {
        return lon;
    }
    let turns = ((base - lon) / 360.0).trunc();
    lon += turns * 360.0;
    let diff = base - lon;
    if diff < 0.0 {
        while lon - base > 180.0 {
            lon -= 360.0;
        }
    } else {
        while base - lon > 180.0 {
            lon += 360.0;
        }
    }
    lon
}

/// Running sum of projected ground positions.
///
/// Each longitude is wrapped towards the previous one so that points either
/// side of the prime meridian average to the meridian.
#[derive(Debug)]
struct GroundSum {
    latitude: f64,
    longitude: f64,
    radius: f64,
    base: f64,
    count: usize,
}

impl Default for GroundSum {
    fn default() -> Self {
        Self {
            latitude: 0.0,
            longitude: 0.0,
            radius: 0.0,
            base: 180.0,
            count: 0,
        }
    }
}

impl GroundSum {
    fn add(&mut self, point: &SurfacePoint) {
        let lon = wrap_longitude(point.longitude().get::<degree>(), self.base);
        self.latitude += point.latitude().get::<degree>();
        self.longitude += lon;
        self.radius += point.radius().get::<kilometer>();
        self.base = lon;
        self.count += 1;
    }

    fn mean(&self) -> Option<SurfacePoint> {
        if self.count == 0 {
            return None;
        }
        let n = self.count as f64;
        let mut lon = self.longitude / n;
        if lon < 0.0 {
            lon += 360.0;
        }
        Some(SurfacePoint::from_degrees(self.latitude / n, lon, self.radius / n))
    }
}

/// One physical feature observed in several images.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ControlPoint {
    id: String,
    kind: PointType,
    ignore: bool,
    held: bool,
    edit_lock: bool,
    invalid: bool,
    surface_point: Option<SurfacePoint>,
    measures: Vec<ControlMeasure>,
    state: PointState,
}

impl ControlPoint {
    pub fn new(id: impl Into<String>, kind: PointType) -> Self {
        Self {
            id: id.into(),
            kind,
            ignore: false,
            held: false,
            edit_lock: false,
            invalid: false,
            surface_point: None,
            measures: Vec::new(),
            state: PointState::Unpopulated,
        }
    }

    pub fn tie(id: impl Into<String>) -> Self {
        Self::new(id, PointType::Tie)
    }

    /// A ground point at a known position.
    pub fn ground(id: impl Into<String>, point: SurfacePoint) -> Self {
        let mut control = Self::new(id, PointType::Ground);
        control.surface_point = Some(point);
        control
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn kind(&self) -> PointType {
        self.kind
    }

    pub fn is_ignored(&self) -> bool {
        self.ignore
    }

    pub fn is_held(&self) -> bool {
        self.held
    }

    pub fn is_edit_locked(&self) -> bool {
        self.edit_lock
    }

    /// More than one measure shares a serial number.
    pub fn is_invalid(&self) -> bool {
        self.invalid
    }

    pub fn state(&self) -> PointState {
        self.state
    }

    pub fn surface_point(&self) -> Option<&SurfacePoint> {
        self.surface_point.as_ref()
    }

    pub fn measures(&self) -> &[ControlMeasure] {
        &self.measures
    }

    pub fn measure(&self, serial: &str) -> Option<&ControlMeasure> {
        self.measures.iter().find(|m| m.serial() == serial)
    }

    pub fn num_measures(&self) -> usize {
        self.measures.len()
    }

    /// Measures that are neither ignored nor unmeasured.
    pub fn num_valid_measures(&self) -> usize {
        self.measures.iter().filter(|m| m.is_active()).count()
    }

    /// Index of the first reference measure, or of the first measured one
    /// when no reference is set.
    pub fn reference_index(&self) -> Option<usize> {
        self.measures
            .iter()
            .position(|m| m.kind() == MeasureType::Reference)
            .or_else(|| self.measures.iter().position(|m| m.kind() == MeasureType::Measured))
    }

    fn check_unlocked(&self) -> Result<(), ControlError> {
        if self.edit_lock {
            return Err(ControlError::PointLocked { id: self.id.clone() });
        }
        Ok(())
    }

    fn measures_changed(&mut self) {
        self.state = if self.measures.is_empty() {
            PointState::Unpopulated
        } else {
            PointState::HasMeasures
        };
    }

    pub fn set_edit_lock(&mut self, lock: bool) {
        self.edit_lock = lock;
    }

    pub fn set_kind(&mut self, kind: PointType) -> Result<(), ControlError> {
        self.check_unlocked()?;
        self.kind = kind;
        Ok(())
    }

    pub fn set_ignore(&mut self, ignore: bool) -> Result<(), ControlError> {
        self.check_unlocked()?;
        self.ignore = ignore;
        Ok(())
    }

    pub fn set_held(&mut self, held: bool) -> Result<(), ControlError> {
        self.check_unlocked()?;
        self.held = held;
        Ok(())
    }

    /// Moving the point invalidates any computed residuals.
    pub fn set_surface_point(&mut self, point: Option<SurfacePoint>) -> Result<(), ControlError> {
        self.check_unlocked()?;
        self.surface_point = point;
        self.state = self.state.min(PointState::AprioriComputed);
        Ok(())
    }

    /// Adds a measure.
    ///
    /// A second measure for the same serial number is rejected unless `force`
    /// is set, in which case it is kept and the point is marked invalid.
    pub fn add(&mut self, measure: ControlMeasure, force: bool) -> Result<(), ControlError> {
        self.check_unlocked()?;
        if self.measure(measure.serial()).is_some() {
            if !force {
                return Err(ControlError::DuplicateSerial {
                    id: self.id.clone(),
                    serial: measure.serial().into(),
                });
            }
            self.invalid = true;
        }
        self.measures.push(measure);
        self.measures_changed();
        Ok(())
    }

    /// Removes the measure for `serial`. The reference measure cannot be
    /// removed while other measures remain.
    pub fn delete(&mut self, serial: &str) -> Result<ControlMeasure, ControlError> {
        self.check_unlocked()?;
        let index = self
            .measures
            .iter()
            .position(|m| m.serial() == serial)
            .ok_or_else(|| ControlError::UnknownSerial {
                id: self.id.clone(),
                serial: serial.into(),
            })?;
        if self.measures.len() > 1 && self.measures[index].kind() == MeasureType::Reference {
            return Err(ControlError::DeleteReference {
                id: self.id.clone(),
                serial: serial.into(),
            });
        }

        let removed = self.measures.remove(index);
        if self.invalid {
            self.invalid = self
                .measures
                .iter()
                .enumerate()
                .any(|(i, a)| self.measures[i + 1..].iter().any(|b| a.serial() == b.serial()));
        }
        self.measures_changed();
        Ok(removed)
    }

    /// Replaces the measure with the same serial number.
    pub fn update_measure(&mut self, measure: ControlMeasure) -> Result<(), ControlError> {
        self.check_unlocked()?;
        let slot = self
            .measures
            .iter_mut()
            .find(|m| m.serial() == measure.serial())
            .ok_or_else(|| ControlError::UnknownSerial {
                id: self.id.clone(),
                serial: measure.serial().into(),
            })?;
        *slot = measure;
        self.measures_changed();
        Ok(())
    }

    fn is_fixed(&self) -> bool {
        self.kind == PointType::Ground || self.held
    }

    /// Estimates the ground position by averaging where each measure
    /// projects.
    ///
    /// Every projecting measure records its undistorted focal plane position
    /// and acquisition time. Ground and held points keep their position and
    /// tolerate measures that do not project; a tie point fails on the first
    /// such measure and is left unchanged.
    pub fn compute_apriori<C>(&mut self, cameras: &C) -> Result<Status, ControlError>
    where
        C: CameraLookup + ?Sized,
    {
        if self.ignore {
            return Ok(Status::Ignored);
        }
        self.check_unlocked()?;
        let fixed = self.is_fixed();
        if fixed && self.surface_point.is_none() {
            return Err(ControlError::MissingGround { id: self.id.clone() });
        }

        let mut sum = GroundSum::default();
        let mut outcome = Outcome::default();
        let mut updates = Vec::with_capacity(self.measures.len());

        for (index, measure) in self.measures.iter().enumerate() {
            if !measure.is_active() {
                continue;
            }
            let camera = lookup(cameras, measure.serial())?;
            let projected = camera.set_image(measure.sample(), measure.line()).and_then(|o| {
                o.surface_point().map(|point| (*point, o.undistorted(), o.time()))
            });

            match projected {
                Some((point, undistorted, time)) => {
                    sum.add(&point);
                    updates.push((index, undistorted, time));
                    outcome.processed += 1;
                }
                None if fixed => {
                    warn!(point = %self.id, serial = measure.serial(), "measure does not project to the ground");
                    if let Some((undistorted, time)) = camera.image_to_undistorted(measure.sample(), measure.line()) {
                        updates.push((index, undistorted, time));
                    }
                    outcome.failed.push(measure.serial().into());
                }
                None => {
                    warn!(point = %self.id, serial = measure.serial(), "measure does not project to the ground");
                    return Err(ControlError::AprioriFailed {
                        id: self.id.clone(),
                        serial: measure.serial().into(),
                    });
                }
            }
        }

        if !fixed {
            let mean = sum
                .mean()
                .ok_or_else(|| ControlError::NoProjectingMeasures { id: self.id.clone() })?;
            self.surface_point = Some(mean);
        }

        for (index, undistorted, time) in updates {
            self.measures[index].set_measured(undistorted, time);
        }
        self.state = PointState::AprioriComputed;
        debug!(point = %self.id, measures = outcome.processed, "computed apriori");
        Ok(Status::Computed(outcome))
    }

    /// Back-projects the ground position through the geometry of each
    /// measure's acquisition time and stores the residual in detector pixels.
    ///
    /// Optical residuals skip the distortion model and are divided by the
    /// summing factors. Radar residuals compare the measured pixel with the
    /// pixel found by solving for the ground point's zero Doppler time.
    pub fn compute_residuals<C>(&mut self, cameras: &C) -> Result<Status, ControlError>
    where
        C: CameraLookup + ?Sized,
    {
        if self.ignore {
            return Ok(Status::Ignored);
        }
        self.check_unlocked()?;
        let point = self
            .surface_point
            .ok_or_else(|| ControlError::NoSurfacePoint { id: self.id.clone() })?;

        let mut outcome = Outcome::default();
        for measure in self.measures.iter_mut().filter(|m| m.is_active()) {
            let camera = lookup(cameras, measure.serial())?;
            match measure_residual(camera, &point, measure.sample(), measure.line()) {
                Some(r) => {
                    measure.set_measured(r.measured, r.time);
                    measure.set_computed(r.computed, r.residual);
                    outcome.processed += 1;
                }
                None => {
                    warn!(point = %self.id, serial = measure.serial(), "residual could not be computed");
                    measure.clear_computed();
                    outcome.failed.push(measure.serial().into());
                }
            }
        }

        self.state = PointState::ResidualsComputed;
        Ok(Status::Computed(outcome))
    }

    fn residuals(&self) -> impl Iterator<Item = Residual> + '_ {
        self.measures
            .iter()
            .filter(|_| !self.ignore)
            .filter(|m| m.is_active())
            .filter_map(|m| m.residual())
    }

    pub fn maximum_error(&self) -> Option<f64> {
        self.residuals().map(|r| r.magnitude()).reduce(f64::max)
    }

    pub fn minimum_error(&self) -> Option<f64> {
        self.residuals().map(|r| r.magnitude()).reduce(f64::min)
    }

    pub fn average_error(&self) -> Option<f64> {
        let (sum, n) = self
            .residuals()
            .fold((0.0, 0usize), |(sum, n), r| (sum + r.magnitude(), n + 1));
        (n > 0).then(|| sum / n as f64)
    }

    /// Largest absolute sample residual.
    pub fn maximum_sample_error(&self) -> Option<f64> {
        self.residuals().map(|r| r.sample().abs()).reduce(f64::max)
    }

    pub fn minimum_sample_error(&self) -> Option<f64> {
        self.residuals().map(|r| r.sample().abs()).reduce(f64::min)
    }

    /// Largest absolute line residual.
    pub fn maximum_line_error(&self) -> Option<f64> {
        self.residuals().map(|r| r.line().abs()).reduce(f64::max)
    }

    pub fn minimum_line_error(&self) -> Option<f64> {
        self.residuals().map(|r| r.line().abs()).reduce(f64::min)
    }
}

fn lookup<'c, C>(cameras: &'c C, serial: &str) -> Result<&'c Camera, ControlError>
where
    C: CameraLookup + ?Sized,
{
    cameras
        .camera(serial)
        .ok_or_else(|| ControlError::UnknownCamera { serial: serial.into() })
}

struct MeasureResidual {
    measured: FocalPlanePoint,
    computed: FocalPlanePoint,
    time: f64,
    residual: Residual,
}

fn measure_residual(camera: &Camera, point: &SurfacePoint, sample: f64, line: f64) -> Option<MeasureResidual> {
    let (measured, time) = camera.image_to_undistorted(sample, line)?;

    if camera.is_radar() {
        // Every radar pixel looks along zero Doppler, so only the full inverse
        // recovers the along track offset.
        let seen = camera.set_ground(point)?;
        return Some(MeasureResidual {
            measured,
            computed: seen.undistorted(),
            time,
            residual: Residual::new(sample - seen.image().sample(), line - seen.image().line()),
        });
    }

    let computed = camera.ground_to_focal_plane_at(point, time)?;
    let m = camera.undistorted_to_detector(measured);
    let c = camera.undistorted_to_detector(computed);
    let detector = camera.detector();
    let residual = Residual::new(
        (m.sample() - c.sample()) / detector.sample_scale_factor(),
        (m.line() - c.line()) / detector.line_scale_factor(),
    );

    Some(MeasureResidual {
        measured,
        computed,
        time,
        residual,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use quickcheck::quickcheck;
    use rstest::rstest;
    use std::collections::HashMap;

    fn mean_of(points: &[(f64, f64)]) -> SurfacePoint {
        let mut sum = GroundSum::default();
        for &(lat, lon) in points {
            sum.add(&SurfacePoint::from_degrees(lat, lon, 3396.19));
        }
        sum.mean().unwrap()
    }

    #[rstest]
    #[case(&[(10.0, 20.0), (10.0, 22.0)], 10.0, 21.0)]
    #[case(&[(0.0, 350.0), (0.0, 20.0)], 0.0, 5.0)]
    #[case(&[(-4.0, 90.0), (2.0, 90.0), (5.0, 90.0)], 1.0, 90.0)]
    fn averages_projected_positions(#[case] points: &[(f64, f64)], #[case] lat: f64, #[case] lon: f64) {
        let mean = mean_of(points);
        assert_relative_eq!(mean.latitude().get::<degree>(), lat, epsilon = 1e-9);
        assert_relative_eq!(mean.longitude().get::<degree>(), lon, epsilon = 1e-9);
    }

    #[test]
    fn averages_across_the_prime_meridian() {
        let lon = mean_of(&[(0.0, 359.0), (0.0, 1.0)]).longitude().get::<degree>();
        assert!(lon < 1e-9 || lon > 360.0 - 1e-9, "got {lon}");
    }

    #[rstest]
    #[case(1.0, 359.0, 361.0)]
    #[case(359.0, 1.0, -1.0)]
    #[case(20.0, 180.0, 20.0)]
    #[case(-300.0, 180.0, 60.0)]
    fn wraps_towards_base(#[case] lon: f64, #[case] base: f64, #[case] wrapped: f64) {
        assert_eq!(wrap_longitude(lon, base), wrapped);
    }

    #[rstest]
    #[case(f64::INFINITY)]
    #[case(f64::NEG_INFINITY)]
    #[case(f64::NAN)]
    fn non_finite_longitude_is_left_alone(#[case] lon: f64) {
        assert_eq!(wrap_longitude(lon, 180.0).to_bits(), lon.to_bits());
    }

    #[test]
    fn huge_longitude_wraps_without_looping() {
        let wrapped = wrap_longitude(1.0e20, 180.0);
        assert!(wrapped.is_finite());
    }

    quickcheck! {
        fn wrapped_longitude_is_near_base(lon: i16, base: i16) -> bool {
            let (lon, base) = (f64::from(lon), f64::from(base));
            let wrapped = wrap_longitude(lon, base);
            (wrapped - base).abs() <= 180.0 && ((wrapped - lon) / 360.0).fract() == 0.0
        }
    }

    #[test]
    fn duplicate_serials() {
        let mut point = ControlPoint::tie("P1");
        point.add(ControlMeasure::measured("A", 1.0, 1.0), false).unwrap();
        assert_eq!(
            point.add(ControlMeasure::measured("A", 2.0, 2.0), false),
            Err(ControlError::DuplicateSerial {
                id: "P1".into(),
                serial: "A".into()
            })
        );
        assert_eq!(point.num_measures(), 1);
        assert!(!point.is_invalid());

        point.add(ControlMeasure::measured("A", 2.0, 2.0), true).unwrap();
        assert_eq!(point.num_measures(), 2);
        assert!(point.is_invalid());

        point.delete("A").unwrap();
        assert!(!point.is_invalid());
    }

    #[test]
    fn reference_measure_is_kept() {
        let mut point = ControlPoint::tie("P1");
        point.add(ControlMeasure::measured("A", 1.0, 1.0), false).unwrap();
        point
            .add(ControlMeasure::new("B", 1.0, 1.0, MeasureType::Reference), false)
            .unwrap();
        assert_eq!(point.reference_index(), Some(1));
        assert!(matches!(point.delete("B"), Err(ControlError::DeleteReference { .. })));
        assert!(matches!(point.delete("C"), Err(ControlError::UnknownSerial { .. })));
        assert_eq!(point.delete("A").map(|m| m.serial().to_owned()), Ok("A".to_owned()));
        assert_eq!(point.delete("B").map(|m| m.kind()), Ok(MeasureType::Reference));
        assert_eq!(point.state(), PointState::Unpopulated);
    }

    #[test]
    fn first_measured_is_reference_by_default() {
        let mut point = ControlPoint::tie("P1");
        assert_eq!(point.reference_index(), None);
        point
            .add(ControlMeasure::new("A", 1.0, 1.0, MeasureType::Unmeasured), false)
            .unwrap();
        assert_eq!(point.reference_index(), None);
        point.add(ControlMeasure::measured("B", 1.0, 1.0), false).unwrap();
        assert_eq!(point.reference_index(), Some(1));
    }

    #[test]
    fn locked_point_rejects_edits() {
        let mut point = ControlPoint::tie("P1");
        point.set_edit_lock(true);
        let locked = Err(ControlError::PointLocked { id: "P1".into() });
        assert_eq!(point.add(ControlMeasure::measured("A", 1.0, 1.0), false), locked);
        assert_eq!(point.set_held(true), locked);
        assert_eq!(
            point.compute_apriori(&HashMap::<String, Camera>::new()).map(|_| ()),
            locked
        );
        assert_eq!(
            point.compute_residuals(&HashMap::<String, Camera>::new()).map(|_| ()),
            locked
        );
    }

    #[test]
    fn ground_point_needs_position() {
        let mut point = ControlPoint::new("G1", PointType::Ground);
        point.add(ControlMeasure::measured("A", 1.0, 1.0), false).unwrap();
        assert_eq!(
            point.compute_apriori(&HashMap::<String, Camera>::new()),
            Err(ControlError::MissingGround { id: "G1".into() })
        );
    }

    #[test]
    fn ignored_point_is_skipped() {
        let mut point = ControlPoint::tie("P1");
        point.add(ControlMeasure::measured("A", 1.0, 1.0), false).unwrap();
        point.set_ignore(true).unwrap();
        let cameras = HashMap::<String, Camera>::new();
        assert_eq!(point.compute_apriori(&cameras), Ok(Status::Ignored));
        assert_eq!(point.compute_residuals(&cameras), Ok(Status::Ignored));
        assert_eq!(point.state(), PointState::HasMeasures);
    }

    #[test]
    fn unknown_camera() {
        let mut point = ControlPoint::tie("P1");
        point.add(ControlMeasure::measured("A", 1.0, 1.0), false).unwrap();
        assert_eq!(
            point.compute_apriori(&HashMap::<String, Camera>::new()),
            Err(ControlError::UnknownCamera { serial: "A".into() })
        );
    }

    #[test]
    fn tie_point_without_active_measures() {
        let mut point = ControlPoint::tie("P1");
        point
            .add(ControlMeasure::measured("A", 1.0, 1.0).with_ignore(true), false)
            .unwrap();
        assert_eq!(
            point.compute_apriori(&HashMap::<String, Camera>::new()),
            Err(ControlError::NoProjectingMeasures { id: "P1".into() })
        );
    }

    #[test]
    fn statistics_need_residuals() {
        let point = ControlPoint::tie("P1");
        assert_eq!(point.maximum_error(), None);
        assert_eq!(point.average_error(), None);
    }
}
