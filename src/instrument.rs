//! Per-instrument calibration keywords and the distortion model factory.
//!
//! Calibration values are looked up by keywords of the form
//! `INS<code>_<NAME>`, where `code` is the (usually negative) instrument id.

use crate::{
    coordinate::FocalPlanePoint,
    distortion::{
        DistortionMap, LegendreDistortion, OpenCvDistortion, PrincipalPointDistortion,
        RadialDecenteringDistortion, SimpleRadialDistortion, SlantRangeMap,
    },
    error::CameraError,
};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, fmt, str::FromStr};
use tracing::debug;

pub fn instrument_key(code: i32, name: &str) -> String {
    format!("INS{code}_{name}")
}

/// Flat keyword → values lookup.
pub trait CoefficientSource {
    fn get(&self, key: &str) -> Option<&[f64]>;

    fn require(&self, key: &str) -> Result<&[f64], CameraError> {
        self.get(key).ok_or_else(|| CameraError::MissingKeyword { key: key.into() })
    }

    /// Exactly `N` values.
    fn require_n<const N: usize>(&self, key: &str) -> Result<[f64; N], CameraError> {
        let values = self.require(key)?;
        values.try_into().map_err(|_| CameraError::KeywordLength {
            key: key.into(),
            expected: N,
            found: values.len(),
        })
    }

    /// First value, if the keyword is present and not empty.
    fn scalar(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(|v| v.first().copied())
    }

    fn require_scalar(&self, key: &str) -> Result<f64, CameraError> {
        let [value] = self.require_n::<1>(key)?;
        Ok(value)
    }
}

/// In-memory keyword table.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct KeywordMap {
    values: HashMap<String, Vec<f64>>,
}

impl KeywordMap {
    pub fn insert(&mut self, key: impl Into<String>, values: Vec<f64>) {
        self.values.insert(key.into(), values);
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Parses a JSON object of keyword → number array.
    #[cfg(feature = "serde")]
    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

impl CoefficientSource for KeywordMap {
    fn get(&self, key: &str) -> Option<&[f64]> {
        self.values.get(key).map(Vec::as_slice)
    }
}

impl<K: Into<String>> FromIterator<(K, Vec<f64>)> for KeywordMap {
    fn from_iter<T: IntoIterator<Item = (K, Vec<f64>)>>(iter: T) -> Self {
        Self {
            values: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

/// Distortion model families that can be built from keywords.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum DistortionKind {
    Identity,
    RadialDecentering,
    PrincipalPoint,
    SimpleRadial,
    Legendre,
    OpenCv,
    SlantRange,
}

impl fmt::Display for DistortionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DistortionKind::Identity => "identity",
            DistortionKind::RadialDecentering => "radial-decentering",
            DistortionKind::PrincipalPoint => "principal-point",
            DistortionKind::SimpleRadial => "simple-radial",
            DistortionKind::Legendre => "legendre",
            DistortionKind::OpenCv => "opencv",
            DistortionKind::SlantRange => "slant-range",
        };
        f.write_str(name)
    }
}

impl FromStr for DistortionKind {
    type Err = CameraError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "identity" | "none" => Ok(DistortionKind::Identity),
            "radial-decentering" => Ok(DistortionKind::RadialDecentering),
            "principal-point" => Ok(DistortionKind::PrincipalPoint),
            "simple-radial" => Ok(DistortionKind::SimpleRadial),
            "legendre" => Ok(DistortionKind::Legendre),
            "opencv" => Ok(DistortionKind::OpenCv),
            "slant-range" => Ok(DistortionKind::SlantRange),
            _ => Err(CameraError::UnknownDistortionModel { name: s.into() }),
        }
    }
}

impl DistortionKind {
    /// Reads the coefficients of this model for instrument `code`.
    pub fn build<S>(self, source: &S, code: i32) -> Result<DistortionMap, CameraError>
    where
        S: CoefficientSource + ?Sized,
    {
        let key = |name: &str| instrument_key(code, name);

        let map = match self {
            DistortionKind::Identity => DistortionMap::Identity,
            DistortionKind::RadialDecentering => RadialDecenteringDistortion::new(
                source.require_n(&key("OD_K"))?,
                source.require_n(&key("DECENTER_J"))?,
                source.require_scalar(&key("DECENTER_ANGLE"))?,
            )
            .into(),
            DistortionKind::PrincipalPoint => {
                let [x, y] = source.require_n(&key("PP"))?;
                PrincipalPointDistortion::new(
                    FocalPlanePoint::new(x, y),
                    source.require_n(&key("OD_K"))?,
                    source.require_n(&key("DECENTER"))?,
                )
                .into()
            }
            DistortionKind::SimpleRadial => {
                SimpleRadialDistortion::new(source.require_scalar(&key("OD_K"))?).into()
            }
            DistortionKind::Legendre => {
                let [x, y] = source.require_n(&key("BORESIGHT"))?;
                LegendreDistortion::new(
                    FocalPlanePoint::new(x, y),
                    source.require_scalar(&key("OD_NORMALIZATION"))?,
                    source.require(&key("OD_A"))?.to_vec(),
                    source.require(&key("OD_B"))?.to_vec(),
                )?
                .into()
            }
            DistortionKind::OpenCv => {
                let k = source.require_n(&key("OD_K"))?;
                let p = source.require_n(&key("DECENTER"))?;
                let model = match (
                    source.get(&key("FL_TEMP_COEFFS")),
                    source.scalar(&key("TEMPERATURE")),
                ) {
                    (Some(coefficients), Some(temperature)) => {
                        OpenCvDistortion::with_temperature(k, p, coefficients, temperature)?
                    }
                    _ => OpenCvDistortion::new(source.require_scalar(&key("FOCAL_LENGTH"))?, k, p)?,
                };
                match source.scalar(&key("TOLERANCE")) {
                    Some(tolerance) => model.with_tolerance(tolerance).into(),
                    None => model.into(),
                }
            }
            DistortionKind::SlantRange => SlantRangeMap::new(
                source.require_n(&key("RANGE_COEFFICIENTS"))?,
                source.scalar(&key("GROUND_RANGE_ORIGIN")).unwrap_or(0.0),
                source.require_scalar(&key("RANGE_SIGMA"))?,
            )?
            .into(),
        };

        debug!(code, model = %self, "built distortion model");
        Ok(map)
    }
}

/// Instrument id → distortion model family.
#[derive(Clone, Debug, Default)]
pub struct InstrumentRegistry {
    kinds: HashMap<i32, DistortionKind>,
}

impl InstrumentRegistry {
    pub fn register(&mut self, code: i32, kind: DistortionKind) -> &mut Self {
        self.kinds.insert(code, kind);
        self
    }

    pub fn kind(&self, code: i32) -> Option<DistortionKind> {
        self.kinds.get(&code).copied()
    }

    pub fn build<S>(&self, source: &S, code: i32) -> Result<DistortionMap, CameraError>
    where
        S: CoefficientSource + ?Sized,
    {
        let kind = self.kind(code).ok_or_else(|| CameraError::UnknownInstrument {
            instrument: code.to_string(),
        })?;
        kind.build(source, code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distortion::DistortionModel;
    use approx::assert_relative_eq;
    use rstest::rstest;

    fn keywords() -> KeywordMap {
        [
            ("INS-1_OD_K", vec![0.0, 0.0, 0.0]),
            ("INS-1_DECENTER_J", vec![0.0, 0.0]),
            ("INS-1_DECENTER_ANGLE", vec![0.0]),
            ("INS-2_OD_K", vec![1.0e-5]),
            ("INS-3_OD_K", vec![-0.1, 0.01, 0.0, 0.0, 0.0, 0.0]),
            ("INS-3_DECENTER", vec![0.0, 0.0]),
            ("INS-3_FL_TEMP_COEFFS", vec![150.0, 0.002]),
            ("INS-3_TEMPERATURE", vec![-20.0]),
        ]
        .into_iter()
        .collect()
    }

    #[rstest]
    #[case("opencv", DistortionKind::OpenCv)]
    #[case("LEGENDRE", DistortionKind::Legendre)]
    #[case("none", DistortionKind::Identity)]
    fn parses_model_names(#[case] name: &str, #[case] kind: DistortionKind) {
        assert_eq!(name.parse::<DistortionKind>(), Ok(kind));
    }

    #[test]
    fn unknown_model_name() {
        assert_eq!(
            "fisheye".parse::<DistortionKind>(),
            Err(CameraError::UnknownDistortionModel { name: "fisheye".into() })
        );
    }

    #[test]
    fn builds_registered_models() {
        let mut registry = InstrumentRegistry::default();
        registry
            .register(-1, DistortionKind::RadialDecentering)
            .register(-2, DistortionKind::SimpleRadial)
            .register(-3, DistortionKind::OpenCv);
        let source = keywords();

        let brown = registry.build(&source, -1).unwrap();
        let p = FocalPlanePoint::new(5.0, -3.0);
        assert_eq!(brown.undistort(p), Some(p));

        assert!(matches!(registry.build(&source, -2), Ok(DistortionMap::SimpleRadial(_))));

        match registry.build(&source, -3) {
            Ok(DistortionMap::OpenCv(model)) => assert_relative_eq!(model.focal_length_mm(), 149.96, epsilon = 1e-12),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn unregistered_instrument() {
        let registry = InstrumentRegistry::default();
        assert_eq!(
            registry.build(&keywords(), -99),
            Err(CameraError::UnknownInstrument { instrument: "-99".into() })
        );
    }

    #[test]
    fn wrong_coefficient_count() {
        let source: KeywordMap = [("INS-5_OD_K", vec![1.0, 2.0])].into_iter().collect();
        assert_eq!(
            DistortionKind::RadialDecentering.build(&source, -5),
            Err(CameraError::KeywordLength {
                key: "INS-5_OD_K".into(),
                expected: 3,
                found: 2
            })
        );
    }

    #[cfg(feature = "serde")]
    #[test]
    fn keywords_from_json() {
        let map = KeywordMap::from_json_str(r#"{"INS-7_OD_K": [0.5]}"#).unwrap();
        assert_eq!(map.require_scalar("INS-7_OD_K"), Ok(0.5));
    }
}
