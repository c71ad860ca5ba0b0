//! A complete sensor model for one image.
//!
//! [`Camera`] strings the stages together. Going from a pixel to the target:
//!
//! ```text
//! image ─ DetectorMap ─▶ detector ─ FocalPlaneMap ─▶ distorted
//!       ─ DistortionMap ─▶ undistorted ─ GroundMap/SkyMap ─▶ target
//! ```
//!
//! and the same chain in reverse to go from a target back to a pixel. Every
//! conversion returns an [`Observation`] value instead of mutating the camera,
//! so a single camera can be shared between threads.

use crate::{
    coordinate::{DetectorPoint, FocalPlanePoint, ImagePoint},
    detector::{DetectorMap, DetectorModel},
    distortion::{DistortionMap, DistortionModel},
    error::CameraError,
    focal_plane::FocalPlaneMap,
    geometry::{SkyPoint, SurfacePoint},
    ground::{GroundMap, SensorContext},
    radar::RadarGroundMap,
    shape::ShapeModel,
    sky::SkyMap,
    spice::Ephemeris,
};
use std::{fmt, sync::Arc};
use tracing::debug;
use uom::si::{
    f64::Length,
    length::{kilometer, meter, millimeter},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CameraKind {
    Framing,
    LineScan,
    Radar,
}

impl CameraKind {
    fn name(&self) -> &'static str {
        match self {
            CameraKind::Framing => "framing",
            CameraKind::LineScan => "line scan",
            CameraKind::Radar => "radar",
        }
    }
}

/// What a pixel looks at.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Target {
    Ground(SurfacePoint),
    Sky(SkyPoint),
}

/// The state of one completed conversion through the camera.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Observation {
    time: f64,
    image: ImagePoint,
    detector: DetectorPoint,
    focal_plane: FocalPlanePoint,
    undistorted: FocalPlanePoint,
    target: Target,
}

impl Observation {
    /// Ephemeris time of acquisition.
    pub fn time(&self) -> f64 {
        self.time
    }

    pub fn image(&self) -> ImagePoint {
        self.image
    }

    pub fn detector(&self) -> DetectorPoint {
        self.detector
    }

    /// Distorted focal plane position.
    pub fn focal_plane(&self) -> FocalPlanePoint {
        self.focal_plane
    }

    pub fn undistorted(&self) -> FocalPlanePoint {
        self.undistorted
    }

    pub fn target(&self) -> Target {
        self.target
    }

    pub fn surface_point(&self) -> Option<&SurfacePoint> {
        match &self.target {
            Target::Ground(point) => Some(point),
            Target::Sky(_) => None,
        }
    }

    pub fn sky_point(&self) -> Option<&SkyPoint> {
        match &self.target {
            Target::Sky(point) => Some(point),
            Target::Ground(_) => None,
        }
    }
}

#[derive(Clone)]
enum Projection {
    Ground {
        map: GroundMap,
        shape: Arc<dyn ShapeModel>,
    },
    Sky(SkyMap),
}

#[derive(Clone)]
pub struct Camera {
    kind: CameraKind,
    samples: usize,
    lines: usize,
    bands: usize,
    band: usize,
    focal_length_mm: f64,
    pixel_pitch_mm: f64,
    distortion: DistortionMap,
    base_focal_plane: FocalPlaneMap,
    focal_plane: FocalPlaneMap,
    band_shift: FocalPlanePoint,
    detector: DetectorMap,
    projection: Projection,
    ephemeris: Arc<dyn Ephemeris>,
}

impl fmt::Debug for Camera {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Camera")
            .field("kind", &self.kind)
            .field("samples", &self.samples)
            .field("lines", &self.lines)
            .field("band", &self.band)
            .field("focal_length_mm", &self.focal_length_mm)
            .field("distortion", &self.distortion.name())
            .field("detector", &self.detector.name())
            .finish_non_exhaustive()
    }
}

impl Camera {
    pub fn kind(&self) -> CameraKind {
        self.kind
    }

    pub fn samples(&self) -> usize {
        self.samples
    }

    pub fn lines(&self) -> usize {
        self.lines
    }

    pub fn bands(&self) -> usize {
        self.bands
    }

    /// Band the focal plane map is currently set up for.
    pub fn band(&self) -> usize {
        self.band
    }

    pub fn focal_length(&self) -> Length {
        Length::new::<millimeter>(self.focal_length_mm)
    }

    pub fn pixel_pitch(&self) -> Length {
        Length::new::<millimeter>(self.pixel_pitch_mm)
    }

    pub fn distortion(&self) -> &DistortionMap {
        &self.distortion
    }

    pub fn focal_plane(&self) -> &FocalPlaneMap {
        &self.focal_plane
    }

    pub fn detector(&self) -> &DetectorMap {
        &self.detector
    }

    pub fn ephemeris(&self) -> &dyn Ephemeris {
        self.ephemeris.as_ref()
    }

    pub fn is_radar(&self) -> bool {
        self.kind == CameraKind::Radar
    }

    fn context(&self) -> SensorContext<'_> {
        SensorContext {
            ephemeris: self.ephemeris.as_ref(),
            focal_length_mm: self.focal_length_mm,
            distortion: &self.distortion,
            focal_plane: &self.focal_plane,
            detector: &self.detector,
            lines: self.lines,
        }
    }

    /// The sky map used for right ascension and declination queries.
    fn sky_map(&self) -> Option<SkyMap> {
        match (&self.projection, self.kind) {
            (Projection::Sky(map), _) => Some(*map),
            (_, CameraKind::Framing) => Some(SkyMap::Framing),
            (_, CameraKind::LineScan) => Some(SkyMap::LineScan),
            (_, CameraKind::Radar) => None,
        }
    }

    /// Whether `image` lies on the image, edges included.
    pub fn in_image(&self, image: &ImagePoint) -> bool {
        (0.5..=self.samples as f64 + 0.5).contains(&image.sample())
            && (0.5..=self.lines as f64 + 0.5).contains(&image.line())
    }

    /// Acquisition window of the image.
    pub fn time_range(&self) -> (f64, f64) {
        self.detector.time_range(self.lines)
    }

    /// Stages of the forward chain short of the target: detector position,
    /// distorted and undistorted focal plane positions and acquisition time.
    fn image_to_focal_plane(&self, image: ImagePoint) -> Option<(DetectorPoint, FocalPlanePoint, FocalPlanePoint, f64)> {
        let (detector, time) = self.detector.parent_to_detector(image)?;
        let focal_plane = self.focal_plane.detector_to_focal_plane(detector);
        let Some(undistorted) = self.distortion.undistort(focal_plane) else {
            debug!(sample = image.sample(), line = image.line(), "distortion could not be removed");
            return None;
        };
        Some((detector, focal_plane, undistorted, time))
    }

    /// Undistorted focal plane position and acquisition time of a pixel,
    /// without intersecting the target.
    pub fn image_to_undistorted(&self, sample: f64, line: f64) -> Option<(FocalPlanePoint, f64)> {
        let (_, _, undistorted, time) = self.image_to_focal_plane(ImagePoint::new(sample, line))?;
        Some((undistorted, time))
    }

    /// Forward chain from a parent pixel to the target.
    pub fn set_image(&self, sample: f64, line: f64) -> Option<Observation> {
        let image = ImagePoint::new(sample, line);
        let (detector, focal_plane, undistorted, time) = self.image_to_focal_plane(image)?;

        let context = self.context();
        let target = match &self.projection {
            Projection::Ground { map, shape } => {
                let hit = map.intersect(&context, shape.as_ref(), undistorted, time)?;
                Target::Ground(SurfacePoint::from_rectangular(&hit)?)
            }
            Projection::Sky(map) => Target::Sky(map.direction(&context, undistorted, time)?),
        };

        Some(Observation {
            time,
            image,
            detector,
            focal_plane,
            undistorted,
            target,
        })
    }

    /// Inverse chain from a ground point to the pixel that imaged it.
    pub fn set_ground(&self, point: &SurfacePoint) -> Option<Observation> {
        let Projection::Ground { map, .. } = &self.projection else {
            debug!("camera observes the sky, not the ground");
            return None;
        };

        let context = self.context();
        let ground = point.to_rectangular();
        let time = map.observation_time(&context, &ground)?;
        let undistorted = map.focal_plane_at(&context, &ground, time)?;
        self.observation_from_undistorted(undistorted, time, Target::Ground(*point))
    }

    /// Inverse chain from a direction on the sky to the pixel that imaged it.
    pub fn set_right_ascension_declination(&self, sky: &SkyPoint) -> Option<Observation> {
        let map = self.sky_map()?;
        let context = self.context();
        let time = map.observation_time(&context, sky)?;
        let undistorted = map.focal_plane_at(&context, sky, time)?;
        self.observation_from_undistorted(undistorted, time, Target::Sky(*sky))
    }

    fn observation_from_undistorted(
        &self,
        undistorted: FocalPlanePoint,
        time: f64,
        target: Target,
    ) -> Option<Observation> {
        let Some(focal_plane) = self.distortion.distort(undistorted) else {
            debug!(time, "distortion could not be applied");
            return None;
        };
        let detector = self.focal_plane.focal_plane_to_detector(focal_plane);
        let image = self.detector.detector_to_parent(detector, time)?;

        Some(Observation {
            time,
            image,
            detector,
            focal_plane,
            undistorted,
            target,
        })
    }

    /// Undistorted focal plane position of `point` using the geometry at
    /// `time`, without searching for the time it was observed.
    pub fn ground_to_focal_plane_at(&self, point: &SurfacePoint, time: f64) -> Option<FocalPlanePoint> {
        let Projection::Ground { map, .. } = &self.projection else {
            return None;
        };
        map.focal_plane_at(&self.context(), &point.to_rectangular(), time)
    }

    /// Size of one detector pixel on the ground at `observation`.
    pub fn detector_resolution(&self, observation: &Observation) -> Option<Length> {
        if let Projection::Ground {
            map: GroundMap::Radar(radar),
            ..
        } = &self.projection
        {
            return Some(Length::new::<meter>(radar.range_sigma_m()));
        }

        let point = observation.surface_point()?;
        let spacecraft = self.ephemeris.position(observation.time).ok()?;
        let slant_km = (point.to_rectangular() - spacecraft).norm();
        let metres = slant_km * 1000.0 * self.pixel_pitch_mm / self.focal_length_mm;
        Some(Length::new::<meter>(metres))
    }

    pub fn sample_resolution(&self, observation: &Observation) -> Option<Length> {
        Some(self.detector_resolution(observation)? * self.detector.sample_scale_factor())
    }

    pub fn line_resolution(&self, observation: &Observation) -> Option<Length> {
        Some(self.detector_resolution(observation)? * self.detector.line_scale_factor())
    }

    /// Mean of the sample and line resolutions.
    pub fn pixel_resolution(&self, observation: &Observation) -> Option<Length> {
        let sample = self.sample_resolution(observation)?;
        let line = self.line_resolution(observation)?;
        Some((sample + line) / 2.0)
    }

    /// Distance from the spacecraft to the observed ground point.
    pub fn slant_distance(&self, observation: &Observation) -> Option<Length> {
        let point = observation.surface_point()?;
        let spacecraft = self.ephemeris.position(observation.time).ok()?;
        Some(Length::new::<kilometer>((point.to_rectangular() - spacecraft).norm()))
    }

    /// A copy set up for `band` of a multi-band sensor.
    pub fn with_band(&self, band: usize) -> Result<Camera, CameraError> {
        if band == 0 || band > self.bands {
            return Err(CameraError::InvalidBand {
                band,
                bands: self.bands,
            });
        }
        let mut camera = self.clone();
        camera.band = band;
        camera.focal_plane = self.base_focal_plane.for_band(band, self.band_shift);
        Ok(camera)
    }

    /// Detector sample and line of an undistorted focal plane position,
    /// skipping the distortion model.
    pub fn undistorted_to_detector(&self, undistorted: FocalPlanePoint) -> DetectorPoint {
        self.focal_plane.focal_plane_to_detector(undistorted)
    }
}

/// Assembles and validates a [`Camera`].
///
/// ```ignore
/// let camera = CameraBuilder::new(CameraKind::Framing, 1024, 1024)
///     .focal_length(Length::new::<millimeter>(1500.0))
///     .focal_plane(FocalPlaneMap::from_pixel_pitch(0.007)?)
///     .detector(FramingDetectorMap::new(DetectorSumming::default(), et, 0.01))
///     .ephemeris(Arc::new(cache))
///     .ground(Arc::new(Ellipsoid::sphere(radius)?))
///     .build()?;
/// ```
#[derive(Clone)]
pub struct CameraBuilder {
    kind: CameraKind,
    samples: usize,
    lines: usize,
    bands: usize,
    focal_length: Option<Length>,
    pixel_pitch: Option<Length>,
    distortion: DistortionMap,
    focal_plane: Option<FocalPlaneMap>,
    band_shift: FocalPlanePoint,
    detector: Option<DetectorMap>,
    shape: Option<Arc<dyn ShapeModel>>,
    radar: Option<RadarGroundMap>,
    sky: bool,
    ephemeris: Option<Arc<dyn Ephemeris>>,
}

impl CameraBuilder {
    pub fn new(kind: CameraKind, samples: usize, lines: usize) -> Self {
        Self {
            kind,
            samples,
            lines,
            bands: 1,
            focal_length: None,
            pixel_pitch: None,
            distortion: DistortionMap::Identity,
            focal_plane: None,
            band_shift: FocalPlanePoint::new(0.0, 0.0),
            detector: None,
            shape: None,
            radar: None,
            sky: false,
            ephemeris: None,
        }
    }

    /// Number of bands and the focal plane displacement between neighbours.
    pub fn bands(mut self, bands: usize, shift: FocalPlanePoint) -> Self {
        self.bands = bands;
        self.band_shift = shift;
        self
    }

    pub fn focal_length(mut self, focal_length: Length) -> Self {
        self.focal_length = Some(focal_length);
        self
    }

    /// Defaults to the sample scale of the focal plane map.
    pub fn pixel_pitch(mut self, pixel_pitch: Length) -> Self {
        self.pixel_pitch = Some(pixel_pitch);
        self
    }

    pub fn distortion(mut self, distortion: impl Into<DistortionMap>) -> Self {
        self.distortion = distortion.into();
        self
    }

    pub fn focal_plane(mut self, focal_plane: FocalPlaneMap) -> Self {
        self.focal_plane = Some(focal_plane);
        self
    }

    pub fn detector(mut self, detector: impl Into<DetectorMap>) -> Self {
        self.detector = Some(detector.into());
        self
    }

    /// Observe the surface of `shape`.
    pub fn ground(mut self, shape: Arc<dyn ShapeModel>) -> Self {
        self.shape = Some(shape);
        self.sky = false;
        self
    }

    /// Range/Doppler geometry of a radar camera.
    pub fn radar(mut self, radar: RadarGroundMap) -> Self {
        self.radar = Some(radar);
        self
    }

    /// Observe the celestial sphere instead of a body.
    pub fn sky(mut self) -> Self {
        self.sky = true;
        self.shape = None;
        self
    }

    pub fn ephemeris(mut self, ephemeris: Arc<dyn Ephemeris>) -> Self {
        self.ephemeris = Some(ephemeris);
        self
    }

    pub fn build(self) -> Result<Camera, CameraError> {
        if self.samples == 0 || self.lines == 0 {
            return Err(CameraError::EmptyImage {
                samples: self.samples,
                lines: self.lines,
            });
        }
        if self.bands == 0 {
            return Err(CameraError::InvalidBand { band: 0, bands: 0 });
        }

        let focal_length = self
            .focal_length
            .ok_or(CameraError::MissingPart { part: "focal length" })?;
        let focal_length_mm = focal_length.get::<millimeter>();
        if !(focal_length_mm > 0.0) {
            return Err(CameraError::InvalidFocalLength { focal_length_mm });
        }

        let focal_plane = self
            .focal_plane
            .ok_or(CameraError::MissingPart { part: "focal plane map" })?;
        let pixel_pitch_mm = self
            .pixel_pitch
            .map_or_else(|| focal_plane.sample_scale(), |p| p.get::<millimeter>());
        if !(pixel_pitch_mm > 0.0) {
            return Err(CameraError::InvalidPixelPitch { pixel_pitch_mm });
        }

        let detector = self
            .detector
            .ok_or(CameraError::MissingPart { part: "detector map" })?;
        let ephemeris = self
            .ephemeris
            .ok_or(CameraError::MissingPart { part: "ephemeris" })?;

        match (self.kind, &detector) {
            (CameraKind::Framing, DetectorMap::Framing(_)) => {}
            (CameraKind::LineScan | CameraKind::Radar, d) if d.is_scanning() => {}
            (kind, d) => {
                return Err(CameraError::DetectorKind {
                    kind: kind.name(),
                    detector: d.name(),
                });
            }
        }

        if let DetectorMap::VariableLineScan(map) = &detector {
            let table_lines = map.table().entries().last().map_or(0, |e| e.start_line());
            if map.table().entries().len() > 1 && table_lines != self.lines {
                return Err(CameraError::LineRateCoverage {
                    table_lines,
                    image_lines: self.lines,
                });
            }
        }

        let projection = match (self.kind, self.sky, self.shape, self.radar) {
            (CameraKind::Radar, false, Some(shape), Some(radar)) if self.distortion.is_slant_range() => {
                Projection::Ground {
                    map: GroundMap::Radar(radar),
                    shape,
                }
            }
            (CameraKind::Radar, ..) => return Err(CameraError::RadarParts),
            (_, _, _, Some(_)) => return Err(CameraError::RadarParts),
            (CameraKind::Framing, true, ..) => Projection::Sky(SkyMap::Framing),
            (CameraKind::LineScan, true, ..) => Projection::Sky(SkyMap::LineScan),
            (CameraKind::Framing, false, Some(shape), None) => Projection::Ground {
                map: GroundMap::Framing,
                shape,
            },
            (CameraKind::LineScan, false, Some(shape), None) => Projection::Ground {
                map: GroundMap::LineScan,
                shape,
            },
            (_, false, None, None) => return Err(CameraError::MissingPart { part: "target" }),
        };

        debug!(
            kind = self.kind.name(),
            samples = self.samples,
            lines = self.lines,
            distortion = self.distortion.name(),
            detector = detector.name(),
            "assembled camera"
        );

        Ok(Camera {
            kind: self.kind,
            samples: self.samples,
            lines: self.lines,
            bands: self.bands,
            band: 1,
            focal_length_mm,
            pixel_pitch_mm,
            distortion: self.distortion,
            base_focal_plane: focal_plane.clone(),
            focal_plane,
            band_shift: self.band_shift,
            detector,
            projection,
            ephemeris,
        })
    }
}
