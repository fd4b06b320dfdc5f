use rand::Rng;
use std::fmt;
use std::ops::{Add, AddAssign, Div, DivAssign, Index, Mul, MulAssign, Neg, Sub};

/// A 3-component vector used for positions, directions, and colors in the
/// path tracer.
///
/// This type implements all standard arithmetic operations with operator
/// overloading, and provides geometric utilities (dot product, cross product,
/// reflection, refraction) needed for physically-based light transport
/// simulation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

pub type Point3 = Vec3;
pub type Color = Vec3;

impl Vec3 {
    #[inline(always)]
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    #[inline(always)]
    pub const fn zero() -> Self {
        Self::new(0.0, 0.0, 0.0)
    }

    #[inline(always)]
    pub const fn ones() -> Self {
        Self::new(1.0, 1.0, 1.0)
    }

    #[inline(always)]
    pub const fn unit_x() -> Self {
        Self::new(1.0, 0.0, 0.0)
    }

    #[inline(always)]
    pub const fn unit_y() -> Self {
        Self::new(0.0, 1.0, 0.0)
    }

    #[inline(always)]
    pub const fn unit_z() -> Self {
        Self::new(0.0, 0.0, 1.0)
    }

    /// Squared Euclidean length — avoids the sqrt for performance-critical
    /// paths such as BVH traversal and intersection culling.
    #[inline(always)]
    pub fn length_squared(self) -> f64 {
        self.x * self.x + self.y * self.y + self.z * self.z
    }

    #[inline(always)]
    pub fn length(self) -> f64 {
        self.length_squared().sqrt()
    }

    /// Returns the unit vector. Panics on zero-length vectors in debug mode.
    #[inline(always)]
    pub fn normalized(self) -> Self {
        let len = self.length();
        debug_assert!(len > 1e-12, "Attempted to normalize a zero-length vector");
        self / len
    }

    /// The standard Euclidean inner product, fundamental to all geometric
    /// queries in the path tracer (projection, angle computation, Lambertian
    /// shading).
    #[inline(always)]
    pub fn dot(self, rhs: Self) -> f64 {
        self.x * rhs.x + self.y * rhs.y + self.z * rhs.z
    }

    /// Cross product — used for constructing orthonormal camera bases and
    /// the tangent frames that cosine-weighted sampling is expressed in.
    #[inline(always)]
    pub fn cross(self, rhs: Self) -> Self {
        Self::new(
            self.y * rhs.z - self.z * rhs.y,
            self.z * rhs.x - self.x * rhs.z,
            self.x * rhs.y - self.y * rhs.x,
        )
    }

    /// Specular reflection of `self` about the surface normal `n`.
    /// Implements the GLSL `reflect` formula: I - 2·dot(I, N)·N
    #[inline(always)]
    pub fn reflect(self, normal: Self) -> Self {
        self - normal * 2.0 * self.dot(normal)
    }

    /// Snell's law refraction. Returns `None` for total internal reflection
    /// (TIR) when the discriminant is negative, which occurs at grazing
    /// angles when transitioning from a denser to a rarer medium (η > 1).
    #[inline]
    pub fn refract(self, normal: Self, eta_ratio: f64) -> Option<Self> {
        let cos_theta = (-self).dot(normal).min(1.0);
        let r_perp = (self + normal * cos_theta) * eta_ratio;
        let discriminant = 1.0 - r_perp.length_squared();
        if discriminant < 0.0 {
            return None;
        }
        let r_parallel = normal * -(discriminant.sqrt());
        Some(r_perp + r_parallel)
    }

    /// Component-wise (Hadamard) product — used for color modulation where
    /// each channel is attenuated independently by the surface albedo.
    #[inline(always)]
    pub fn hadamard(self, rhs: Self) -> Self {
        Self::new(self.x * rhs.x, self.y * rhs.y, self.z * rhs.z)
    }

    /// Component-wise linear interpolation: self·(1-t) + other·t
    #[inline(always)]
    pub fn lerp(self, other: Self, t: f64) -> Self {
        self * (1.0 - t) + other * t
    }

    /// Component-wise minimum — one corner of the bound of two points.
    #[inline(always)]
    pub fn min_components(self, rhs: Self) -> Self {
        Self::new(self.x.min(rhs.x), self.y.min(rhs.y), self.z.min(rhs.z))
    }

    /// Component-wise maximum.
    #[inline(always)]
    pub fn max_components(self, rhs: Self) -> Self {
        Self::new(self.x.max(rhs.x), self.y.max(rhs.y), self.z.max(rhs.z))
    }

    /// Checks if the vector is near-zero in all components, used to avoid
    /// degenerate scatter directions that would produce NaN in subsequent
    /// math.
    #[inline(always)]
    pub fn near_zero(self) -> bool {
        const EPS: f64 = 1e-8;
        self.x.abs() < EPS && self.y.abs() < EPS && self.z.abs() < EPS
    }

    /// Generates a uniformly distributed random point inside the unit sphere
    /// via rejection sampling. Used for glossy metal perturbation.
    pub fn random_in_unit_sphere(rng: &mut dyn rand::RngCore) -> Self {
        loop {
            let v = Self::new(
                rng.gen_range(-1.0..1.0),
                rng.gen_range(-1.0..1.0),
                rng.gen_range(-1.0..1.0),
            );
            if v.length_squared() < 1.0 {
                return v;
            }
        }
    }

    /// Generates a random unit vector, uniform over the sphere surface.
    /// This is the generator behind the isotropic phase function.
    pub fn random_unit_vector(rng: &mut dyn rand::RngCore) -> Self {
        Self::random_in_unit_sphere(rng).normalized()
    }

    /// Random point on the unit disk — used for depth-of-field simulation
    /// by jittering the camera ray origin across the lens aperture.
    pub fn random_in_unit_disk(rng: &mut dyn rand::RngCore) -> Self {
        loop {
            let v = Self::new(rng.gen_range(-1.0..1.0), rng.gen_range(-1.0..1.0), 0.0);
            if v.length_squared() < 1.0 {
                return v;
            }
        }
    }

    /// Cosine-weighted direction about +z: (cos φ·√r₂, sin φ·√r₂, √(1−r₂)).
    /// Transformed into a surface frame by [`Onb::local`], this is the
    /// optimal importance-sampling strategy for Lambertian BRDFs.
    pub fn random_cosine_direction(rng: &mut dyn rand::RngCore) -> Self {
        let r1: f64 = rng.gen();
        let r2: f64 = rng.gen();
        let phi = 2.0 * std::f64::consts::PI * r1;
        Self::new(
            phi.cos() * r2.sqrt(),
            phi.sin() * r2.sqrt(),
            (1.0 - r2).sqrt(),
        )
    }
}

impl fmt::Display for Vec3 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.3}, {:.3}, {:.3})", self.x, self.y, self.z)
    }
}

impl Neg for Vec3 {
    type Output = Self;
    #[inline(always)]
    fn neg(self) -> Self {
        Self::new(-self.x, -self.y, -self.z)
    }
}

impl Add for Vec3 {
    type Output = Self;
    #[inline(always)]
    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl AddAssign for Vec3 {
    #[inline(always)]
    fn add_assign(&mut self, rhs: Self) {
        self.x += rhs.x;
        self.y += rhs.y;
        self.z += rhs.z;
    }
}

impl Sub for Vec3 {
    type Output = Self;
    #[inline(always)]
    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Mul<f64> for Vec3 {
    type Output = Self;
    #[inline(always)]
    fn mul(self, t: f64) -> Self {
        Self::new(self.x * t, self.y * t, self.z * t)
    }
}

impl Mul<Vec3> for f64 {
    type Output = Vec3;
    #[inline(always)]
    fn mul(self, v: Vec3) -> Vec3 {
        v * self
    }
}

impl MulAssign<f64> for Vec3 {
    #[inline(always)]
    fn mul_assign(&mut self, t: f64) {
        self.x *= t;
        self.y *= t;
        self.z *= t;
    }
}

impl Div<f64> for Vec3 {
    type Output = Self;
    #[inline(always)]
    fn div(self, t: f64) -> Self {
        let inv = 1.0 / t;
        Self::new(self.x * inv, self.y * inv, self.z * inv)
    }
}

impl DivAssign<f64> for Vec3 {
    #[inline(always)]
    fn div_assign(&mut self, t: f64) {
        let inv = 1.0 / t;
        self.x *= inv;
        self.y *= inv;
        self.z *= inv;
    }
}

impl Index<usize> for Vec3 {
    type Output = f64;
    fn index(&self, i: usize) -> &f64 {
        match i {
            0 => &self.x,
            1 => &self.y,
            2 => &self.z,
            _ => panic!("Vec3 index out of bounds: {i}"),
        }
    }
}

// ─── Interval ───────────────────────────────────────────────────────────────

/// A closed 1-D range `[min, max]`. Used for ray parameter clipping during
/// traversal and as the per-axis building block of bounding boxes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Interval {
    pub min: f64,
    pub max: f64,
}

impl Interval {
    pub const EMPTY: Interval = Interval {
        min: f64::INFINITY,
        max: f64::NEG_INFINITY,
    };

    pub const UNIVERSE: Interval = Interval {
        min: f64::NEG_INFINITY,
        max: f64::INFINITY,
    };

    #[inline(always)]
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// The smallest interval containing both inputs.
    #[inline(always)]
    pub fn union(a: Interval, b: Interval) -> Self {
        Self::new(a.min.min(b.min), a.max.max(b.max))
    }

    #[inline(always)]
    pub fn size(self) -> f64 {
        self.max - self.min
    }

    /// Closed containment: endpoints are inside.
    #[inline(always)]
    pub fn contains(self, x: f64) -> bool {
        self.min <= x && x <= self.max
    }

    /// Open containment: endpoints are outside. Used for root selection in
    /// the sphere intersection, where a root exactly at the clip boundary
    /// must be rejected.
    #[inline(always)]
    pub fn surrounds(self, x: f64) -> bool {
        self.min < x && x < self.max
    }

    #[inline(always)]
    pub fn clamp(self, x: f64) -> f64 {
        x.clamp(self.min, self.max)
    }

    /// Pads the interval by `delta` in total, split equally on both sides.
    #[inline(always)]
    pub fn expand(self, delta: f64) -> Self {
        let pad = delta / 2.0;
        Self::new(self.min - pad, self.max + pad)
    }

    /// Shifts both endpoints by `d`.
    #[inline(always)]
    pub fn offset(self, d: f64) -> Self {
        Self::new(self.min + d, self.max + d)
    }
}

// ─── Orthonormal Basis ──────────────────────────────────────────────────────

/// An orthonormal frame (u, v, w) built around a surface normal. Directions
/// generated in the canonical +z hemisphere are rotated into the frame with
/// [`Onb::local`].
#[derive(Debug, Clone, Copy)]
pub struct Onb {
    u: Vec3,
    v: Vec3,
    w: Vec3,
}

impl Onb {
    /// Builds the frame with `w` along `normal`. The helper axis is chosen
    /// to avoid a degenerate cross product when the normal is nearly axial.
    pub fn new(normal: Vec3) -> Self {
        let w = normal.normalized();
        let a = if w.x.abs() > 0.9 {
            Vec3::unit_y()
        } else {
            Vec3::unit_x()
        };
        let v = w.cross(a).normalized();
        let u = w.cross(v);
        Self { u, v, w }
    }

    #[inline(always)]
    pub fn w(&self) -> Vec3 {
        self.w
    }

    /// Transforms a vector expressed in the basis into world space.
    #[inline(always)]
    pub fn local(&self, a: Vec3) -> Vec3 {
        self.u * a.x + self.v * a.y + self.w * a.z
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    #[test]
    fn normalized_has_unit_length() {
        let cases = [
            Vec3::new(1.0, 2.0, 3.0),
            Vec3::new(-4.5, 0.01, 2e3),
            Vec3::new(0.0, 0.0, 1e-6),
        ];
        for v in cases {
            assert!((v.normalized().length() - 1.0).abs() < 1e-6);
        }
    }

    #[test]
    fn cross_follows_right_hand_rule() {
        assert_eq!(Vec3::unit_x().cross(Vec3::unit_y()), Vec3::unit_z());
        assert_eq!(Vec3::unit_x().cross(-Vec3::unit_y()), -Vec3::unit_z());
    }

    #[test]
    fn reflect_negates_normal_component() {
        let v = Vec3::new(0.3, -0.8, 0.1).normalized();
        let n = Vec3::unit_y();
        let r = v.reflect(n);
        assert!((r.dot(n) + v.dot(n)).abs() < 1e-12);
    }

    #[test]
    fn refract_with_unit_ratio_is_identity() {
        let incident = Vec3::new(0.4, -0.7, 0.2).normalized();
        let n = Vec3::unit_y();
        let out = incident.refract(n, 1.0).unwrap();
        assert!((out - incident).length() < 1e-9);
    }

    #[test]
    fn interval_clamp_stays_inside() {
        let iv = Interval::new(-1.0, 2.5);
        for x in [-10.0, -1.0, 0.0, 2.5, 99.0] {
            let c = iv.clamp(x);
            assert!(iv.contains(c));
        }
    }

    #[test]
    fn interval_surrounds_is_strict() {
        let iv = Interval::new(0.0, 1.0);
        assert!(iv.contains(0.0));
        assert!(!iv.surrounds(0.0));
        assert!(iv.surrounds(0.5));
    }

    #[test]
    fn onb_is_orthonormal() {
        let basis = Onb::new(Vec3::new(0.2, 0.9, -0.3));
        let u = basis.local(Vec3::unit_x());
        let v = basis.local(Vec3::unit_y());
        let w = basis.local(Vec3::unit_z());
        assert!((u.length() - 1.0).abs() < 1e-12);
        assert!(u.dot(v).abs() < 1e-12);
        assert!(u.dot(w).abs() < 1e-12);
        assert!(v.dot(w).abs() < 1e-12);
    }

    #[test]
    fn cosine_direction_lies_in_upper_hemisphere() {
        let mut rng = SmallRng::seed_from_u64(7);
        for _ in 0..64 {
            let d = Vec3::random_cosine_direction(&mut rng);
            assert!(d.z >= 0.0);
            assert!((d.length() - 1.0).abs() < 1e-9);
        }
    }
}
