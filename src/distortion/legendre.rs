//! Per-axis Legendre polynomial distortion about a boresight.
//!
//! Each undistorted axis is a weighted sum of products `Pᵢ(xn) Pⱼ(yn)` with
//! `i + j ≤ degree`, where `xn`, `yn` are the distorted coordinates relative to
//! the boresight divided by a normalisation length. Terms are stored ordered by
//! total degree and, within one degree, by descending power of `x`:
//!
//! ```text
//! 1, P₁(x), P₁(y), P₂(x), P₁(x)P₁(y), P₂(y), ...
//! ```

use super::{DEFAULT_TOLERANCE, DistortionModel, solve_distorted};
use crate::{coordinate::FocalPlanePoint, error::CameraError};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LegendreDistortion {
    boresight: FocalPlanePoint,
    normalization: f64,
    degree: usize,
    x_coefficients: Vec<f64>,
    y_coefficients: Vec<f64>,
    tolerance: f64,
}

impl LegendreDistortion {
    /// Both coefficient lists must hold a complete triangle of terms.
    pub fn new(
        boresight: FocalPlanePoint,
        normalization: f64,
        x_coefficients: Vec<f64>,
        y_coefficients: Vec<f64>,
    ) -> Result<Self, CameraError> {
        if !(normalization > 0.0) {
            return Err(CameraError::NonPositive {
                name: "legendre normalization",
                value: normalization,
            });
        }

        let degree = degree_for_terms(x_coefficients.len()).ok_or(CameraError::LegendreTerms {
            found: x_coefficients.len(),
        })?;
        if y_coefficients.len() != x_coefficients.len() {
            return Err(CameraError::LegendreTerms {
                found: y_coefficients.len(),
            });
        }

        Ok(Self {
            boresight,
            normalization,
            degree,
            x_coefficients,
            y_coefficients,
            tolerance: DEFAULT_TOLERANCE,
        })
    }

    /// The model that returns every point unchanged for the given degree.
    pub fn identity(boresight: FocalPlanePoint, normalization: f64, degree: usize) -> Result<Self, CameraError> {
        let n = term_count(degree);
        let mut x = vec![0.0; n];
        let mut y = vec![0.0; n];
        if degree >= 1 {
            x[1] = 1.0;
            y[2] = 1.0;
        }
        Self::new(boresight, normalization, x, y)
    }

    pub fn degree(&self) -> usize {
        self.degree
    }

    pub fn boresight(&self) -> FocalPlanePoint {
        self.boresight
    }

    fn evaluate(&self, x: f64, y: f64) -> (f64, f64) {
        let xn = (x - self.boresight.x()) / self.normalization;
        let yn = (y - self.boresight.y()) / self.normalization;
        let px = legendre_series(xn, self.degree);
        let py = legendre_series(yn, self.degree);

        let mut sx = 0.0;
        let mut sy = 0.0;
        let mut term = 0;
        for total in 0..=self.degree {
            for i in (0..=total).rev() {
                let basis = px[i] * py[total - i];
                sx += self.x_coefficients[term] * basis;
                sy += self.y_coefficients[term] * basis;
                term += 1;
            }
        }

        (
            self.boresight.x() + sx * self.normalization,
            self.boresight.y() + sy * self.normalization,
        )
    }
}

impl DistortionModel for LegendreDistortion {
    fn undistort(&self, distorted: FocalPlanePoint) -> Option<FocalPlanePoint> {
        let (x, y) = self.evaluate(distorted.x(), distorted.y());
        (x.is_finite() && y.is_finite()).then(|| FocalPlanePoint::new(x, y))
    }

    fn distort(&self, undistorted: FocalPlanePoint) -> Option<FocalPlanePoint> {
        solve_distorted(undistorted, self.tolerance, |x, y| {
            let (ux, uy) = self.evaluate(x, y);
            Some((x - ux, y - uy))
        })
    }
}

fn term_count(degree: usize) -> usize {
    (degree + 1) * (degree + 2) / 2
}

fn degree_for_terms(terms: usize) -> Option<usize> {
    (0..).take_while(|&d| term_count(d) <= terms).find(|&d| term_count(d) == terms)
}

/// `P₀(t) ..= P_degree(t)` by Bonnet's recursion.
fn legendre_series(t: f64, degree: usize) -> Vec<f64> {
    let mut p = Vec::with_capacity(degree + 1);
    p.push(1.0);
    if degree >= 1 {
        p.push(t);
    }
    for n in 1..degree {
        let n_f = n as f64;
        let next = ((2.0 * n_f + 1.0) * t * p[n] - n_f * p[n - 1]) / (n_f + 1.0);
        p.push(next);
    }
    p
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rstest::rstest;

    #[rstest]
    #[case(1, Some(0))]
    #[case(3, Some(1))]
    #[case(6, Some(2))]
    #[case(10, Some(3))]
    #[case(4, None)]
    #[case(0, None)]
    fn triangular_term_counts(#[case] terms: usize, #[case] degree: Option<usize>) {
        assert_eq!(degree_for_terms(terms), degree);
    }

    #[test]
    fn legendre_polynomials_match_closed_forms() {
        let t = 0.3;
        let p = legendre_series(t, 3);
        assert_relative_eq!(p[2], 0.5 * (3.0 * t * t - 1.0));
        assert_relative_eq!(p[3], 0.5 * (5.0 * t * t * t - 3.0 * t));
    }

    #[test]
    fn rejects_incomplete_triangle() {
        let err = LegendreDistortion::new(FocalPlanePoint::new(0.0, 0.0), 10.0, vec![0.0; 4], vec![0.0; 4]);
        assert_eq!(err, Err(CameraError::LegendreTerms { found: 4 }));
    }

    #[test]
    fn identity_coefficients_are_identity() {
        let model = LegendreDistortion::identity(FocalPlanePoint::new(0.5, -0.2), 12.0, 3).unwrap();
        let p = FocalPlanePoint::new(4.0, -7.5);
        let u = model.undistort(p).unwrap();
        assert_relative_eq!(u.x(), p.x(), epsilon = 1e-12);
        assert_relative_eq!(u.y(), p.y(), epsilon = 1e-12);
    }

    #[test]
    fn distort_inverts_quadratic_terms() {
        let mut x = vec![0.0; 6];
        let mut y = vec![0.0; 6];
        x[1] = 1.0;
        y[2] = 1.0;
        x[3] = 2.0e-3;
        y[4] = -1.5e-3;
        let model = LegendreDistortion::new(FocalPlanePoint::new(0.0, 0.0), 15.0, x, y).unwrap();

        let u = FocalPlanePoint::new(6.0, -9.0);
        let d = model.distort(u).unwrap();
        let back = model.undistort(d).unwrap();
        assert!(back.distance(&u) < 1e-5);
    }
}
