use approx::assert_relative_eq;
use planetcam::{
    coordinate::{DetectorPoint, FocalPlanePoint},
    distortion::{
        DistortionMap, DistortionModel, LegendreDistortion, OpenCvDistortion, PrincipalPointDistortion,
        RadialDecenteringDistortion, SimpleRadialDistortion, SlantRangeMap,
    },
    focal_plane::FocalPlaneMap,
};
use quickcheck::quickcheck;
use rstest::rstest;

fn models() -> Vec<DistortionMap> {
    let mut legendre_x = vec![0.0; 10];
    let mut legendre_y = vec![0.0; 10];
    legendre_x[1] = 1.0;
    legendre_x[3] = 2.0e-4;
    legendre_y[2] = 1.0;
    legendre_y[5] = -1.5e-4;

    vec![
        DistortionMap::Identity,
        RadialDecenteringDistortion::new([2.0e-5, -1.0e-9, 0.0], [3.0e-6, 1.0e-8], 0.7).into(),
        PrincipalPointDistortion::new(FocalPlanePoint::new(0.12, -0.08), [1.0e-5, 0.0, 0.0], [2.0e-6, -1.0e-6])
            .into(),
        SimpleRadialDistortion::new(-3.0e-6).into(),
        LegendreDistortion::new(FocalPlanePoint::new(0.5, 0.2), 20.0, legendre_x, legendre_y)
            .unwrap()
            .into(),
        OpenCvDistortion::new(150.0, [-0.08, 0.01, 0.0, 0.0, 0.0, 0.0], [1.0e-4, -5.0e-5])
            .unwrap()
            .into(),
        SlantRangeMap::new([850.0, 0.9, 1.0e-5, 0.0], 30.0, 12.5).unwrap().into(),
    ]
}

/// Focal plane position within a 20 mm square.
fn position(x: i16, y: i16) -> FocalPlanePoint {
    FocalPlanePoint::new(f64::from(x) / 32768.0 * 10.0, f64::from(y) / 32768.0 * 10.0)
}

quickcheck! {
    fn undistort_inverts_distort(x: i16, y: i16) -> bool {
        let p = position(x, y);
        models().iter().all(|model| {
            model
                .distort(p)
                .and_then(|d| model.undistort(d))
                .is_some_and(|back| back.distance(&p) < 1e-5)
        })
    }

    fn distort_inverts_undistort(x: i16, y: i16) -> bool {
        let p = position(x, y);
        models().iter().all(|model| {
            model
                .undistort(p)
                .and_then(|u| model.distort(u))
                .is_some_and(|back| back.distance(&p) < 1e-5)
        })
    }
}

#[rstest]
#[case(FocalPlaneMap::from_pixel_pitch(0.0074).unwrap().with_detector_origin(512.5, 512.5))]
#[case(FocalPlaneMap::new(
    [0.01, 0.0, 0.007],
    [-0.02, 0.007, 0.0],
    [2.857142857142857, 0.0, 142.85714285714286],
    [-1.4285714285714286, 142.85714285714286, 0.0],
))]
fn focal_plane_and_distortion_recover_detector_positions(#[case] focal_plane: FocalPlaneMap) {
    for model in models().iter().filter(|m| !m.is_slant_range()) {
        for (sample, line) in [(1.0, 1.0), (512.5, 512.5), (1024.0, 200.0), (40.0, 1000.0)] {
            let detector = DetectorPoint::new(sample, line);
            let undistorted = model
                .undistort(focal_plane.detector_to_focal_plane(detector))
                .unwrap();
            let back = focal_plane.focal_plane_to_detector(model.distort(undistorted).unwrap());
            assert_relative_eq!(back.sample(), sample, epsilon = 1e-6);
            assert_relative_eq!(back.line(), line, epsilon = 1e-6);
        }
    }
}
