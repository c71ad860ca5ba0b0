//! Target body shapes.

use crate::error::CameraError;
use nalgebra::Vector3;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use uom::si::{
    angle::radian,
    f64::{Angle, Length},
    length::kilometer,
};

/// Surface of the observed body in its body-fixed frame (km).
pub trait ShapeModel: Send + Sync {
    /// First surface point hit by a ray leaving `observer` along `look`.
    fn intersect(&self, observer: &Vector3<f64>, look: &Vector3<f64>) -> Option<Vector3<f64>>;

    /// Distance from the body centre to the surface at a position.
    fn local_radius(&self, latitude: Angle, longitude: Angle) -> Option<Length>;
}

/// A triaxial ellipsoid with semi-axes `a`, `b`, `c` along x, y, z.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Ellipsoid {
    radii: Vector3<f64>,
}

impl Ellipsoid {
    pub fn new(a: Length, b: Length, c: Length) -> Result<Self, CameraError> {
        let radii = Vector3::new(a.get::<kilometer>(), b.get::<kilometer>(), c.get::<kilometer>());
        let axes = [
            ("ellipsoid a axis", radii.x),
            ("ellipsoid b axis", radii.y),
            ("ellipsoid c axis", radii.z),
        ];
        if let Some((name, value)) = axes.into_iter().find(|(_, v)| !(*v > 0.0)) {
            return Err(CameraError::NonPositive { name, value });
        }
        Ok(Self { radii })
    }

    pub fn sphere(radius: Length) -> Result<Self, CameraError> {
        Self::new(radius, radius, radius)
    }

    /// Semi-axes in km.
    pub fn radii(&self) -> Vector3<f64> {
        self.radii
    }
}

impl ShapeModel for Ellipsoid {
    fn intersect(&self, observer: &Vector3<f64>, look: &Vector3<f64>) -> Option<Vector3<f64>> {
        // Scale into the unit sphere and solve |o + t d|² = 1.
        let o = observer.component_div(&self.radii);
        let d = look.component_div(&self.radii);

        let a = d.dot(&d);
        let b = 2.0 * o.dot(&d);
        let c = o.dot(&o) - 1.0;
        let discriminant = b * b - 4.0 * a * c;
        if a == 0.0 || discriminant < 0.0 {
            return None;
        }

        let root = discriminant.sqrt();
        let near = (-b - root) / (2.0 * a);
        let far = (-b + root) / (2.0 * a);
        let t = if near >= 0.0 {
            near
        } else if far >= 0.0 {
            far
        } else {
            return None;
        };

        Some(observer + look * t)
    }

    fn local_radius(&self, latitude: Angle, longitude: Angle) -> Option<Length> {
        let lat = latitude.get::<radian>();
        let lon = longitude.get::<radian>();
        let (a, b, c) = (self.radii.x, self.radii.y, self.radii.z);
        let x = lat.cos() * lon.cos() / a;
        let y = lat.cos() * lon.sin() / b;
        let z = lat.sin() / c;
        let inverse = (x * x + y * y + z * z).sqrt();
        (inverse > 0.0).then(|| Length::new::<kilometer>(1.0 / inverse))
    }
}
