use thiserror::Error;

/// Configuration errors raised while assembling a camera model.
///
/// These are reported eagerly at construction time, never on first use.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CameraError {
    #[error("required keyword {key} was not found")]
    MissingKeyword { key: String },
    #[error("keyword {key} expected {expected} values but got {found}")]
    KeywordLength {
        key: String,
        expected: usize,
        found: usize,
    },
    #[error("expected a positive focal length but got {focal_length_mm} mm")]
    InvalidFocalLength { focal_length_mm: f64 },
    #[error("expected a positive pixel pitch but got {pixel_pitch_mm} mm")]
    InvalidPixelPitch { pixel_pitch_mm: f64 },
    #[error("summing factors must be at least 1 but got ({sample}, {line})")]
    InvalidSumming { sample: f64, line: f64 },
    #[error("expected a positive line rate but got {rate} s at line {line}")]
    InvalidLineRate { line: usize, rate: f64 },
    #[error("line rate table is empty")]
    EmptyLineRateTable,
    #[error("line rate table must start at line 1 but starts at line {line}")]
    LineRateTableStart { line: usize },
    #[error("line rate table entry {index} does not increase in both line and time")]
    UnorderedLineRateTable { index: usize },
    #[error("line rate table covers {table_lines} lines but the image has {image_lines}")]
    LineRateCoverage {
        table_lines: usize,
        image_lines: usize,
    },
    #[error("summing mode {summing} requires a detector lookup table")]
    MissingDetectorLookup { summing: u32 },
    #[error("detector lookup span {index} is not ordered")]
    UnorderedDetectorLookup { index: usize },
    #[error("legendre model has {found} coefficients which is not a full triangle of terms")]
    LegendreTerms { found: usize },
    #[error("{name} must be positive but got {value}")]
    NonPositive { name: &'static str, value: f64 },
    #[error("camera is missing its {part}")]
    MissingPart { part: &'static str },
    #[error("a {kind} camera cannot use a {detector} detector map")]
    DetectorKind {
        kind: &'static str,
        detector: &'static str,
    },
    #[error("radar cameras require a slant range distortion map and a radar ground map")]
    RadarParts,
    #[error("band {band} is outside of 1..={bands}")]
    InvalidBand { band: usize, bands: usize },
    #[error("no distortion model is registered for instrument {instrument}")]
    UnknownInstrument { instrument: String },
    #[error("unknown distortion model name {name}")]
    UnknownDistortionModel { name: String },
    #[error("image dimensions must be non-zero but got {samples} x {lines}")]
    EmptyImage { samples: usize, lines: usize },
}
