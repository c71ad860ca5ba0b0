//! Spacecraft position and orientation as functions of ephemeris time.
//!
//! The geometric pipeline never reads kernels itself. It asks an [`Ephemeris`]
//! for the state at a time and treats any failure as "no valid mapping" for
//! the pixel being converted.

use chrono::{DateTime, Utc};
use nalgebra::{UnitQuaternion, Vector3};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Seconds from the Unix epoch to J2000 (2000-01-01 12:00:00 UTC).
const J2000_UNIX_SECONDS: i64 = 946_728_000;

/// TT − TAI in seconds.
const TT_MINUS_TAI: f64 = 32.184;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EphemerisError {
    #[error("time {time} is outside of the ephemeris window [{start}, {end}]")]
    OutOfRange { time: f64, start: f64, end: f64 },
    #[error("ephemeris cache has no states")]
    EmptyCache,
    #[error("ephemeris state {index} is not after the previous state")]
    Unordered { index: usize },
}

/// Ephemeris time in seconds past J2000 of a UTC instant.
///
/// `delta_at` is the TAI − UTC leap second count in effect at `utc`. The
/// periodic TDB − TT terms (under 2 ms) are ignored.
pub fn ephemeris_time_from_utc(utc: DateTime<Utc>, delta_at: f64) -> f64 {
    let seconds = (utc.timestamp() - J2000_UNIX_SECONDS) as f64;
    seconds + f64::from(utc.timestamp_subsec_nanos()) * 1.0e-9 + delta_at + TT_MINUS_TAI
}

/// Position and orientation provider.
///
/// Positions are in the target body-fixed frame in km, velocities in km/s.
pub trait Ephemeris: Send + Sync {
    fn position(&self, time: f64) -> Result<Vector3<f64>, EphemerisError>;

    fn velocity(&self, time: f64) -> Result<Vector3<f64>, EphemerisError>;

    /// Rotation from the camera frame to the inertial frame.
    fn instrument_rotation(&self, time: f64) -> Result<UnitQuaternion<f64>, EphemerisError>;

    /// Rotation from the inertial frame to the body-fixed frame.
    fn body_rotation(&self, time: f64) -> Result<UnitQuaternion<f64>, EphemerisError>;

    /// Inclusive window over which the provider can answer.
    fn time_range(&self) -> (f64, f64);

    /// Rotation from the camera frame to the body-fixed frame.
    fn camera_to_body(&self, time: f64) -> Result<UnitQuaternion<f64>, EphemerisError> {
        Ok(self.body_rotation(time)? * self.instrument_rotation(time)?)
    }
}

/// One tabulated spacecraft state.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct EphemerisState {
    pub time: f64,
    pub position: Vector3<f64>,
    pub velocity: Vector3<f64>,
    pub instrument_rotation: UnitQuaternion<f64>,
    pub body_rotation: UnitQuaternion<f64>,
}

/// Interpolating ephemeris over a table of states.
///
/// Position and velocity are interpolated linearly, rotations spherically.
/// Times outside the first and last state fail.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct EphemerisCache {
    states: Vec<EphemerisState>,
}

impl EphemerisCache {
    pub fn new(states: Vec<EphemerisState>) -> Result<Self, EphemerisError> {
        if states.is_empty() {
            return Err(EphemerisError::EmptyCache);
        }
        if let Some(index) = states.windows(2).position(|w| w[1].time <= w[0].time) {
            return Err(EphemerisError::Unordered { index: index + 1 });
        }
        Ok(Self { states })
    }

    /// A single state valid at every time.
    pub fn constant(state: EphemerisState) -> Self {
        Self {
            states: vec![state],
        }
    }

    pub fn states(&self) -> &[EphemerisState] {
        &self.states
    }

    /// Bracketing states and the fraction of the way between them.
    fn bracket(&self, time: f64) -> Result<(&EphemerisState, &EphemerisState, f64), EphemerisError> {
        let (start, end) = self.time_range();
        if let [only] = self.states.as_slice() {
            return Ok((only, only, 0.0));
        }
        if !(start..=end).contains(&time) {
            return Err(EphemerisError::OutOfRange { time, start, end });
        }

        let upper = self
            .states
            .partition_point(|s| s.time <= time)
            .clamp(1, self.states.len() - 1);
        let (a, b) = (&self.states[upper - 1], &self.states[upper]);
        Ok((a, b, (time - a.time) / (b.time - a.time)))
    }
}

fn slerp(a: &UnitQuaternion<f64>, b: &UnitQuaternion<f64>, t: f64) -> UnitQuaternion<f64> {
    // Antipodal pairs have no unique path; fall back to the nearer end.
    a.try_slerp(b, t, 1.0e-9)
        .unwrap_or(if t < 0.5 { *a } else { *b })
}

impl Ephemeris for EphemerisCache {
    fn position(&self, time: f64) -> Result<Vector3<f64>, EphemerisError> {
        let (a, b, t) = self.bracket(time)?;
        Ok(a.position.lerp(&b.position, t))
    }

    fn velocity(&self, time: f64) -> Result<Vector3<f64>, EphemerisError> {
        let (a, b, t) = self.bracket(time)?;
        Ok(a.velocity.lerp(&b.velocity, t))
    }

    fn instrument_rotation(&self, time: f64) -> Result<UnitQuaternion<f64>, EphemerisError> {
        let (a, b, t) = self.bracket(time)?;
        Ok(slerp(&a.instrument_rotation, &b.instrument_rotation, t))
    }

    fn body_rotation(&self, time: f64) -> Result<UnitQuaternion<f64>, EphemerisError> {
        let (a, b, t) = self.bracket(time)?;
        Ok(slerp(&a.body_rotation, &b.body_rotation, t))
    }

    fn time_range(&self) -> (f64, f64) {
        match (self.states.first(), self.states.last()) {
            (Some(first), Some(last)) if self.states.len() > 1 => (first.time, last.time),
            _ => (f64::NEG_INFINITY, f64::INFINITY),
        }
    }
}
