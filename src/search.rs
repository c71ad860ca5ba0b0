//! One dimensional root finding over ephemeris time.

use tracing::debug;

/// Iteration budget of [`find_time_root`].
pub const MAX_TIME_ITERATIONS: usize = 30;

/// Finds the time in `[start, end]` where `residual` changes sign.
///
/// Regula falsi with the Illinois modification: each step interpolates
/// linearly between the bounds and replaces the bound whose residual has the
/// same sign as the new sample. Returns when the bracket or the step shrinks
/// below `tolerance`. Returns `None` when the residuals at the bounds share a
/// sign, when `residual` cannot be evaluated, or when the budget runs out.
pub fn find_time_root<F>(start: f64, end: f64, tolerance: f64, mut residual: F) -> Option<f64>
where
    F: FnMut(f64) -> Option<f64>,
{
    let (mut t0, mut t1) = (start, end);
    let mut f0 = residual(t0)?;
    let mut f1 = residual(t1)?;

    if f0 == 0.0 {
        return Some(t0);
    }
    if f1 == 0.0 {
        return Some(t1);
    }
    if f0.signum() == f1.signum() {
        debug!(start, end, f0, f1, "no sign change over the time window");
        return None;
    }

    // Which end was retained on the previous step, for the Illinois halving.
    let mut retained: Option<bool> = None;
    let mut previous = f64::NAN;

    for _ in 0..MAX_TIME_ITERATIONS {
        let t = t1 - f1 * (t1 - t0) / (f1 - f0);
        let f = residual(t)?;

        if f == 0.0 || (t - previous).abs() < tolerance {
            return Some(t);
        }
        previous = t;

        if f.signum() == f1.signum() {
            t1 = t;
            f1 = f;
            if retained == Some(false) {
                f0 /= 2.0;
            }
            retained = Some(false);
        } else {
            t0 = t;
            f0 = f;
            if retained == Some(true) {
                f1 /= 2.0;
            }
            retained = Some(true);
        }

        if (t1 - t0).abs() < tolerance {
            return Some(t);
        }
    }

    debug!(start, end, "time root search exhausted its iterations");
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use quickcheck_macros::quickcheck;

    #[test]
    fn linear_residual_is_exact() {
        let t = find_time_root(0.0, 10.0, 1e-6, |t| Some(2.0 * (t - 3.7))).unwrap();
        assert_relative_eq!(t, 3.7, epsilon = 1e-9);
    }

    #[test]
    fn curved_residual_converges() {
        let t = find_time_root(0.0, 2.0, 1e-9, |t| Some(t.powi(3) - 2.0)).unwrap();
        assert_relative_eq!(t, 2.0_f64.cbrt(), epsilon = 1e-8);
    }

    #[test]
    fn same_sign_fails() {
        assert_eq!(find_time_root(0.0, 1.0, 1e-6, |t| Some(t + 1.0)), None);
    }

    #[test]
    fn failed_evaluation_fails() {
        assert_eq!(
            find_time_root(0.0, 1.0, 1e-6, |t| if t > 0.5 { None } else { Some(t - 0.75) }),
            None
        );
    }

    #[test]
    fn root_on_bound() {
        assert_eq!(find_time_root(1.0, 4.0, 1e-6, |t| Some(t - 1.0)), Some(1.0));
    }

    #[quickcheck]
    fn monotonic_drift_root_is_found(root: u16) -> bool {
        let root = f64::from(root) / f64::from(u16::MAX) * 99.0 + 0.5;
        find_time_root(0.0, 100.0, 1e-4, |t| Some((t - root) * (1.0 + 0.01 * t)))
            .is_some_and(|t| (t - root).abs() < 1e-4)
    }
}
