#![allow(dead_code)]

use nalgebra::{UnitQuaternion, Vector3};
use planetcam::{
    camera::{Camera, CameraBuilder, CameraKind},
    detector::{DetectorSumming, FramingDetectorMap, LineScanDetectorMap},
    distortion::{DistortionMap, SlantRangeMap},
    focal_plane::FocalPlaneMap,
    radar::{LookDirection, RadarGroundMap},
    shape::Ellipsoid,
    spice::{EphemerisCache, EphemerisState},
};
use std::{f64::consts::FRAC_PI_2, sync::Arc};
use uom::si::{
    f64::Length,
    length::{kilometer, millimeter},
};

pub const MARS_RADIUS_KM: f64 = 3396.19;
pub const ALTITUDE_KM: f64 = 400.0;
pub const FOCAL_LENGTH_MM: f64 = 500.0;
pub const PIXEL_PITCH_MM: f64 = 0.01;
pub const START_TIME: f64 = 100.0;
pub const LINE_RATE: f64 = 0.001;
pub const LINES: usize = 1000;
pub const SAMPLES: usize = 1024;
/// Along track speed in km/s.
pub const SPEED: f64 = 3.0;

/// Nadir pointing over 0N 0E: camera `z` looks down body `-x`, camera `x`
/// points north and camera `y` east.
pub fn nadir() -> UnitQuaternion<f64> {
    UnitQuaternion::from_axis_angle(&Vector3::y_axis(), -FRAC_PI_2)
}

pub fn mars() -> Arc<Ellipsoid> {
    Arc::new(Ellipsoid::sphere(Length::new::<kilometer>(MARS_RADIUS_KM)).unwrap())
}

fn state(time: f64, east_km: f64, drift_rad_per_s: f64) -> EphemerisState {
    let mid = START_TIME + LINE_RATE * LINES as f64 / 2.0;
    EphemerisState {
        time,
        position: Vector3::new(MARS_RADIUS_KM + ALTITUDE_KM, east_km + SPEED * (time - mid), 0.0),
        velocity: Vector3::new(0.0, SPEED, 0.0),
        instrument_rotation: nadir()
            * UnitQuaternion::from_axis_angle(&Vector3::x_axis(), drift_rad_per_s * (time - mid)),
        body_rotation: UnitQuaternion::identity(),
    }
}

/// Spacecraft flying east along the equator with the pointing rolling about
/// the camera `x` axis at `drift_rad_per_s`.
pub fn moving_ephemeris(east_km: f64, drift_rad_per_s: f64) -> EphemerisCache {
    let end = START_TIME + LINE_RATE * LINES as f64;
    EphemerisCache::new(vec![
        state(START_TIME - 1.0, east_km, drift_rad_per_s),
        state(end + 1.0, east_km, drift_rad_per_s),
    ])
    .unwrap()
}

/// A stationary spacecraft `east_km` east of the 0N 0E nadir point.
pub fn hovering_ephemeris(east_km: f64) -> EphemerisCache {
    let mut hover = state(START_TIME, east_km, 0.0);
    hover.position.y = east_km;
    EphemerisCache::constant(hover)
}

pub fn framing_camera(east_km: f64, distortion: impl Into<DistortionMap>) -> Camera {
    CameraBuilder::new(CameraKind::Framing, SAMPLES, SAMPLES)
        .focal_length(Length::new::<millimeter>(FOCAL_LENGTH_MM))
        .focal_plane(
            FocalPlaneMap::from_pixel_pitch(PIXEL_PITCH_MM)
                .unwrap()
                .with_detector_origin(512.5, 512.5),
        )
        .distortion(distortion)
        .detector(FramingDetectorMap::new(DetectorSumming::default(), START_TIME, 0.01))
        .ephemeris(Arc::new(hovering_ephemeris(east_km)))
        .ground(mars())
        .build()
        .unwrap()
}

pub fn line_scan_camera(drift_rad_per_s: f64) -> Camera {
    CameraBuilder::new(CameraKind::LineScan, SAMPLES, LINES)
        .focal_length(Length::new::<millimeter>(FOCAL_LENGTH_MM))
        .focal_plane(
            FocalPlaneMap::from_pixel_pitch(PIXEL_PITCH_MM)
                .unwrap()
                .with_detector_origin(512.5, 0.0),
        )
        .detector(LineScanDetectorMap::new(DetectorSumming::default(), START_TIME, LINE_RATE))
        .ephemeris(Arc::new(moving_ephemeris(0.0, drift_rad_per_s)))
        .ground(mars())
        .build()
        .unwrap()
}

/// Range sigma of the radar fixture in metres.
pub const RANGE_SIGMA_M: f64 = 75.0;

/// Right looking radar whose sample 0 sits 5400 range cells from the
/// spacecraft.
pub fn radar_camera() -> Camera {
    let offset = 5400.0;
    CameraBuilder::new(CameraKind::Radar, SAMPLES, LINES)
        .focal_length(Length::new::<millimeter>(1.0))
        .pixel_pitch(Length::new::<millimeter>(1.0))
        .focal_plane(FocalPlaneMap::new(
            [offset, 1.0, 0.0],
            [0.0, 0.0, 1.0],
            [-offset, 1.0, 0.0],
            [0.0, 0.0, 1.0],
        ))
        .distortion(SlantRangeMap::new([0.0, 1.0, 0.0, 0.0], 0.0, RANGE_SIGMA_M).unwrap())
        .detector(LineScanDetectorMap::new(DetectorSumming::default(), START_TIME, LINE_RATE))
        .ephemeris(Arc::new(moving_ephemeris(0.0, 0.0)))
        .radar(RadarGroundMap::new(LookDirection::Right, RANGE_SIGMA_M))
        .ground(mars())
        .build()
        .unwrap()
}
