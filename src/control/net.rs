use super::{CameraLookup, ControlError, ControlPoint, Status};
use crate::camera::Camera;
use rayon::prelude::*;
use std::{collections::HashMap, fmt};
use tracing::info;

/// Control points together with the cameras of the images they are measured
/// on.
#[derive(Clone, Debug, Default)]
pub struct ControlNet {
    points: Vec<ControlPoint>,
    cameras: HashMap<String, Camera>,
}

impl ControlNet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_point(&mut self, point: ControlPoint) -> Result<(), ControlError> {
        if self.point(point.id()).is_some() {
            return Err(ControlError::DuplicatePoint { id: point.id().into() });
        }
        self.points.push(point);
        Ok(())
    }

    pub fn remove_point(&mut self, id: &str) -> Option<ControlPoint> {
        let index = self.points.iter().position(|p| p.id() == id)?;
        Some(self.points.remove(index))
    }

    pub fn point(&self, id: &str) -> Option<&ControlPoint> {
        self.points.iter().find(|p| p.id() == id)
    }

    pub fn point_mut(&mut self, id: &str) -> Option<&mut ControlPoint> {
        self.points.iter_mut().find(|p| p.id() == id)
    }

    pub fn points(&self) -> &[ControlPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Registers the camera of the image with `serial`, returning the one it
    /// replaces.
    pub fn add_camera(&mut self, serial: impl Into<String>, camera: Camera) -> Option<Camera> {
        self.cameras.insert(serial.into(), camera)
    }

    pub fn cameras(&self) -> &HashMap<String, Camera> {
        &self.cameras
    }

    /// Computes the apriori position of every point in order, stopping at the
    /// first point that fails.
    pub fn compute_apriori(&mut self) -> Result<usize, ControlError> {
        let cameras = &self.cameras;
        let mut computed = 0;
        for point in &mut self.points {
            if let Status::Computed(_) = point.compute_apriori(cameras)? {
                computed += 1;
            }
        }
        info!(points = computed, "computed apriori positions");
        Ok(computed)
    }

    /// Computes the apriori position of every point in parallel. Results are
    /// in point order.
    pub fn par_compute_apriori(&mut self) -> Vec<Result<Status, ControlError>> {
        let cameras = &self.cameras;
        self.points
            .par_iter_mut()
            .map(|point| point.compute_apriori(cameras))
            .collect()
    }

    pub fn compute_residuals(&mut self) -> ResidualReport {
        let cameras = &self.cameras;
        let points = self
            .points
            .iter_mut()
            .map(|point| {
                let status = point.compute_residuals(cameras);
                PointReport::new(point, status)
            })
            .collect();
        ResidualReport::logged(points)
    }

    pub fn par_compute_residuals(&mut self) -> ResidualReport {
        let cameras = &self.cameras;
        let points = self
            .points
            .par_iter_mut()
            .map(|point| {
                let status = point.compute_residuals(cameras);
                PointReport::new(point, status)
            })
            .collect();
        ResidualReport::logged(points)
    }
}

impl CameraLookup for ControlNet {
    fn camera(&self, serial: &str) -> Option<&Camera> {
        self.cameras.get(serial)
    }
}

/// Residual summary of one control point.
#[derive(Clone, Debug, PartialEq)]
pub struct PointReport {
    id: String,
    measures: usize,
    failed: usize,
    max_error: Option<f64>,
    error: Option<ControlError>,
}

impl PointReport {
    fn new(point: &ControlPoint, status: Result<Status, ControlError>) -> Self {
        let (failed, error) = match status {
            Ok(status) => (status.failed().len(), None),
            Err(e) => (0, Some(e)),
        };
        Self {
            id: point.id().into(),
            measures: point.num_valid_measures(),
            failed,
            max_error: point.maximum_error(),
            error,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Active measures of the point.
    pub fn measures(&self) -> usize {
        self.measures
    }

    /// Active measures whose residual could not be computed.
    pub fn failed(&self) -> usize {
        self.failed
    }

    pub fn max_error(&self) -> Option<f64> {
        self.max_error
    }

    pub fn error(&self) -> Option<&ControlError> {
        self.error.as_ref()
    }
}

/// Outcome of a residual pass over a network.
///
/// Measures that fail to project are a data quality signal, so they are
/// counted per point rather than dropped.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ResidualReport {
    points: Vec<PointReport>,
}

impl ResidualReport {
    fn logged(points: Vec<PointReport>) -> Self {
        let report = Self { points };
        info!(
            points = report.points.len(),
            failed_measures = report.failed_measures(),
            failed_points = report.failed_points(),
            "computed residuals"
        );
        report
    }

    pub fn points(&self) -> &[PointReport] {
        &self.points
    }

    pub fn failed_measures(&self) -> usize {
        self.points.iter().map(|p| p.failed).sum()
    }

    /// Points that could not be processed at all.
    pub fn failed_points(&self) -> usize {
        self.points.iter().filter(|p| p.error.is_some()).count()
    }

    /// Largest residual magnitude over the network.
    pub fn max_error(&self) -> Option<f64> {
        self.points.iter().filter_map(|p| p.max_error).reduce(f64::max)
    }
}

impl fmt::Display for ResidualReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{:<12}{:>9}{:>8}{:>11}", "point", "measures", "failed", "max error")?;
        for p in &self.points {
            let max_error = p.max_error.map_or_else(|| "-".to_owned(), |e| format!("{e:.3}"));
            write!(f, "{:<12}{:>9}{:>8}{:>11}", p.id, p.measures, p.failed, max_error)?;
            match &p.error {
                Some(e) => writeln!(f, "  {e}")?,
                None => writeln!(f)?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::ControlMeasure;
    use insta::assert_snapshot;

    fn row(id: &str, measures: usize, failed: usize, max_error: Option<f64>, error: Option<ControlError>) -> PointReport {
        PointReport {
            id: id.into(),
            measures,
            failed,
            max_error,
            error,
        }
    }

    #[test]
    fn report_table() {
        let report = ResidualReport {
            points: vec![
                row("P001", 3, 0, Some(0.25), None),
                row("P002", 2, 1, Some(1.5), None),
                row(
                    "P003",
                    1,
                    0,
                    None,
                    Some(ControlError::UnknownCamera { serial: "MRO/CTX/1".into() }),
                ),
            ],
        };
        assert_eq!(report.failed_measures(), 1);
        assert_eq!(report.failed_points(), 1);
        assert_eq!(report.max_error(), Some(1.5));
        assert_snapshot!(report.to_string(), @r"
        point        measures  failed  max error
        P001                3       0      0.250
        P002                2       1      1.500
        P003                1       0          -  no camera is registered for serial number MRO/CTX/1
        ");
    }

    #[test]
    fn rejects_duplicate_points() {
        let mut net = ControlNet::new();
        net.add_point(ControlPoint::tie("P1")).unwrap();
        assert_eq!(
            net.add_point(ControlPoint::tie("P1")),
            Err(ControlError::DuplicatePoint { id: "P1".into() })
        );
        assert_eq!(net.len(), 1);
        assert!(net.remove_point("P1").is_some());
        assert!(net.is_empty());
    }

    #[test]
    fn missing_cameras_are_reported_per_point() {
        let mut net = ControlNet::new();
        let mut point = ControlPoint::tie("P1");
        point.add(ControlMeasure::measured("A", 1.0, 1.0), false).unwrap();
        net.add_point(point).unwrap();

        let results = net.par_compute_apriori();
        assert_eq!(results, vec![Err(ControlError::UnknownCamera { serial: "A".into() })]);

        let report = net.compute_residuals();
        assert_eq!(
            report.points()[0].error(),
            Some(&ControlError::NoSurfacePoint { id: "P1".into() })
        );
    }
}
