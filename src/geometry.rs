use crate::math::{Interval, Point3, Vec3};

/// Near-clip for secondary rays. Keeps a bounced ray from re-intersecting
/// the surface it just left (shadow acne).
pub const RAY_T_MIN: f64 = 1e-4;

// ─── Ray ────────────────────────────────────────────────────────────────────

/// A parametric ray R(t) = origin + t · direction, the fundamental geometric
/// primitive for all intersection queries in the path tracer. The `time`
/// stamp in [0, 1] positions moving geometry for motion blur.
#[derive(Debug, Clone, Copy)]
pub struct Ray {
    pub origin: Point3,
    pub direction: Vec3,
    pub time: f64,
}

impl Ray {
    #[inline(always)]
    pub const fn new(origin: Point3, direction: Vec3) -> Self {
        Self {
            origin,
            direction,
            time: 0.0,
        }
    }

    #[inline(always)]
    pub const fn at_time(origin: Point3, direction: Vec3, time: f64) -> Self {
        Self {
            origin,
            direction,
            time,
        }
    }

    /// Evaluates the ray at parameter t. Positive t gives points ahead of
    /// the origin.
    #[inline(always)]
    pub fn at(self, t: f64) -> Point3 {
        self.origin + self.direction * t
    }
}

// ─── Axis-Aligned Bounding Box ──────────────────────────────────────────────

/// Minimum per-axis extent of a bounding box. Boxes flatter than this are
/// padded symmetrically so the slab test never sees a zero-volume slab.
const MIN_AXIS_EXTENT: f64 = 1e-4;

/// An axis-aligned bounding box (AABB) used as the bounding volume in the
/// BVH. Stored as three per-axis intervals with the corner points cached for
/// construction and split decisions. Intersection is tested via the slab
/// method, which intersects the ray's parameter intervals across all three
/// axes.
#[derive(Debug, Clone, Copy)]
pub struct Aabb {
    pub x: Interval,
    pub y: Interval,
    pub z: Interval,
    min: Point3,
    max: Point3,
}

impl Aabb {
    pub const EMPTY: Aabb = Aabb {
        x: Interval::EMPTY,
        y: Interval::EMPTY,
        z: Interval::EMPTY,
        min: Vec3::new(f64::INFINITY, f64::INFINITY, f64::INFINITY),
        max: Vec3::new(f64::NEG_INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY),
    };

    /// Builds the box spanning two arbitrary corners. Axes are ordered and
    /// then padded up to the minimum extent.
    pub fn new(a: Point3, b: Point3) -> Self {
        let lo = a.min_components(b);
        let hi = a.max_components(b);
        Self::from_intervals(
            Interval::new(lo.x, hi.x),
            Interval::new(lo.y, hi.y),
            Interval::new(lo.z, hi.z),
        )
    }

    pub fn from_intervals(x: Interval, y: Interval, z: Interval) -> Self {
        let x = Self::pad_axis(x);
        let y = Self::pad_axis(y);
        let z = Self::pad_axis(z);
        Self {
            x,
            y,
            z,
            min: Point3::new(x.min, y.min, z.min),
            max: Point3::new(x.max, y.max, z.max),
        }
    }

    #[inline]
    fn pad_axis(iv: Interval) -> Interval {
        if iv.size() < MIN_AXIS_EXTENT {
            iv.expand(MIN_AXIS_EXTENT - iv.size())
        } else {
            iv
        }
    }

    #[inline(always)]
    pub fn min(&self) -> Point3 {
        self.min
    }

    #[inline(always)]
    pub fn max(&self) -> Point3 {
        self.max
    }

    #[inline(always)]
    pub fn axis(&self, i: usize) -> Interval {
        match i {
            0 => self.x,
            1 => self.y,
            _ => self.z,
        }
    }

    /// Computes the union of two AABBs — used during BVH construction to
    /// find the bounding volume of a set of child nodes.
    pub fn union_with(&self, other: &Aabb) -> Aabb {
        Self::from_intervals(
            Interval::union(self.x, other.x),
            Interval::union(self.y, other.y),
            Interval::union(self.z, other.z),
        )
    }

    /// The box translated by `v` — the world-space bound of translated
    /// instances.
    pub fn offset(&self, v: Vec3) -> Aabb {
        Self::from_intervals(self.x.offset(v.x), self.y.offset(v.y), self.z.offset(v.z))
    }

    /// Returns the index of the longest axis (0=x, 1=y, 2=z) — used as the
    /// split dimension during top-down BVH construction. Ties resolve
    /// z-to-x priority through the strict comparisons.
    pub fn longest_axis(&self) -> usize {
        let dx = self.x.size();
        let dy = self.y.size();
        let dz = self.z.size();
        if dx > dy && dx > dz {
            0
        } else if dy > dz {
            1
        } else {
            2
        }
    }

    /// Slab-method ray-AABB intersection test against `t_range`. Per axis,
    /// `(min-o)/d` and `(max-o)/d` bound the ray's overlap with the slab;
    /// the box is hit iff the running intersection of those bounds with
    /// `t_range` stays non-empty (strictly: exit > enter) on every axis.
    /// Division by a zero direction component yields ±∞, which resolves
    /// correctly without a branch.
    pub fn hit(&self, ray: &Ray, t_range: Interval) -> bool {
        let mut t_min = t_range.min;
        let mut t_max = t_range.max;
        for axis in 0..3 {
            let iv = self.axis(axis);
            let inv_d = 1.0 / ray.direction[axis];
            let mut t0 = (iv.min - ray.origin[axis]) * inv_d;
            let mut t1 = (iv.max - ray.origin[axis]) * inv_d;
            if inv_d < 0.0 {
                std::mem::swap(&mut t0, &mut t1);
            }
            t_min = t0.max(t_min);
            t_max = t1.min(t_max);
            if t_max <= t_min {
                return false;
            }
        }
        true
    }
}
