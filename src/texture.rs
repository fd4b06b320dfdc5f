use crate::math::{Color, Point3};
use std::sync::Arc;

/// Surface color lookup. Materials sample their albedo through this
/// interface so procedural patterns and image-backed textures plug in
/// without the material knowing the difference. Image decoding lives
/// outside the core; anything exposing `value` participates.
pub trait Texture: Send + Sync {
    fn value(&self, u: f64, v: f64, point: Point3) -> Color;
}

// ─── Solid Color ────────────────────────────────────────────────────────────

pub struct SolidColor {
    albedo: Color,
}

impl SolidColor {
    pub const fn new(albedo: Color) -> Self {
        Self { albedo }
    }
}

impl From<Color> for SolidColor {
    fn from(albedo: Color) -> Self {
        Self::new(albedo)
    }
}

impl Texture for SolidColor {
    fn value(&self, _u: f64, _v: f64, _point: Point3) -> Color {
        self.albedo
    }
}

// ─── Checkerboard ───────────────────────────────────────────────────────────

/// A 3D checkerboard driven by the sign of a sine product over the hit
/// point, so the pattern needs no uv parameterization.
pub struct Checker {
    scale: f64,
    even: Arc<dyn Texture>,
    odd: Arc<dyn Texture>,
}

impl Checker {
    pub fn new(scale: f64, even: Arc<dyn Texture>, odd: Arc<dyn Texture>) -> Self {
        Self { scale, even, odd }
    }

    /// Two flat colors, the common case for ground planes.
    pub fn from_colors(scale: f64, even: Color, odd: Color) -> Self {
        Self::new(
            scale,
            Arc::new(SolidColor::new(even)),
            Arc::new(SolidColor::new(odd)),
        )
    }
}

impl Texture for Checker {
    fn value(&self, u: f64, v: f64, point: Point3) -> Color {
        let sines = (self.scale * point.x).sin()
            * (self.scale * point.y).sin()
            * (self.scale * point.z).sin();
        if sines < 0.0 {
            self.even.value(u, v, point)
        } else {
            self.odd.value(u, v, point)
        }
    }
}
