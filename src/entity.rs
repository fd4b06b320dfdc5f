use crate::geometry::{Aabb, Ray, RAY_T_MIN};
use crate::material::{Isotropic, Material};
use crate::math::{Interval, Onb, Point3, Vec3};
use crate::texture::Texture;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use std::cell::RefCell;
use std::f64::consts::PI;
use std::sync::Arc;

// ─── Hit Record ─────────────────────────────────────────────────────────────

/// Everything the shading code needs about an intersection: the point, the
/// unit normal oriented against the incoming ray, the surface material, the
/// ray parameter, and the texture coordinates.
pub struct HitRecord<'a> {
    pub point: Point3,
    pub normal: Vec3,
    pub material: &'a dyn Material,
    pub t: f64,
    pub u: f64,
    pub v: f64,
    pub front_face: bool,
}

impl<'a> HitRecord<'a> {
    /// Orients `outward_normal` against the ray and records which side was
    /// hit. `outward_normal` must be unit length.
    pub fn set_face_normal(&mut self, ray: &Ray, outward_normal: Vec3) {
        self.front_face = ray.direction.dot(outward_normal) < 0.0;
        self.normal = if self.front_face {
            outward_normal
        } else {
            -outward_normal
        };
    }
}

// ─── Entity Trait ───────────────────────────────────────────────────────────

/// Anything a ray can intersect. The `t_range` parameter is the closest-hit
/// mechanism: callers shrink it as hits are found, so implementations only
/// report intersections that beat the best known one.
///
/// `pdf_value` and `sample_direction` give entities a solid-angle measure
/// seen from an external point, which is what direct-light sampling needs;
/// geometry that is never sampled as a light keeps the zero defaults.
pub trait Entity: Send + Sync {
    fn hit(&self, ray: &Ray, t_range: Interval) -> Option<HitRecord<'_>>;

    fn bounding_box(&self) -> Aabb;

    /// Density, over the unit sphere of directions at `origin`, of sampling
    /// `direction` toward this entity.
    fn pdf_value(&self, _origin: Point3, _direction: Vec3) -> f64 {
        0.0
    }

    /// Draws a direction from `origin` toward this entity's surface.
    fn sample_direction(&self, _origin: Point3, _rng: &mut dyn rand::RngCore) -> Vec3 {
        Vec3::unit_x()
    }
}

// ─── Sphere ─────────────────────────────────────────────────────────────────

/// A sphere, optionally sweeping its center linearly over the shutter
/// interval for motion blur.
pub struct Sphere {
    center: Point3,
    motion: Vec3,
    radius: f64,
    material: Arc<dyn Material>,
    bbox: Aabb,
}

impl Sphere {
    pub fn new(center: Point3, radius: f64, material: Arc<dyn Material>) -> Self {
        let r = Vec3::new(radius.abs(), radius.abs(), radius.abs());
        Self {
            center,
            motion: Vec3::zero(),
            radius,
            material,
            bbox: Aabb::new(center - r, center + r),
        }
    }

    /// A sphere whose center moves from `center0` at time 0 to `center1` at
    /// time 1. The bound is the union of the endpoint bounds, each inflated
    /// by the radius.
    pub fn new_moving(
        center0: Point3,
        center1: Point3,
        radius: f64,
        material: Arc<dyn Material>,
    ) -> Self {
        let r = Vec3::new(radius.abs(), radius.abs(), radius.abs());
        let box0 = Aabb::new(center0 - r, center0 + r);
        let box1 = Aabb::new(center1 - r, center1 + r);
        Self {
            center: center0,
            motion: center1 - center0,
            radius,
            material,
            bbox: box0.union_with(&box1),
        }
    }

    #[inline(always)]
    fn center_at(&self, time: f64) -> Point3 {
        self.center + self.motion * time
    }

    /// Spherical uv from the outward unit normal:
    /// u = φ/2π with φ = atan2(-z, x) + π, v = θ/π with θ = acos(-y).
    fn sphere_uv(n: Vec3) -> (f64, f64) {
        let theta = (-n.y).acos();
        let phi = (-n.z).atan2(n.x) + PI;
        (phi / (2.0 * PI), theta / PI)
    }
}

impl Entity for Sphere {
    fn hit(&self, ray: &Ray, t_range: Interval) -> Option<HitRecord<'_>> {
        let center = self.center_at(ray.time);
        let oc = ray.origin - center;
        let a = ray.direction.length_squared();
        let half_b = oc.dot(ray.direction);
        let c = oc.length_squared() - self.radius * self.radius;
        let discriminant = half_b * half_b - a * c;
        if discriminant < 0.0 {
            return None;
        }

        // Prefer the near root; fall back to the far one when the near
        // root is clipped away (ray starting inside the sphere).
        let sqrtd = discriminant.sqrt();
        let mut root = (-half_b - sqrtd) / a;
        if !t_range.surrounds(root) {
            root = (-half_b + sqrtd) / a;
            if !t_range.surrounds(root) {
                return None;
            }
        }

        let point = ray.at(root);
        let outward_normal = (point - center) / self.radius;
        let (u, v) = Self::sphere_uv(outward_normal);
        let mut rec = HitRecord {
            point,
            normal: outward_normal,
            material: self.material.as_ref(),
            t: root,
            u,
            v,
            front_face: true,
        };
        rec.set_face_normal(ray, outward_normal);
        Some(rec)
    }

    fn bounding_box(&self) -> Aabb {
        self.bbox
    }

    fn pdf_value(&self, origin: Point3, direction: Vec3) -> f64 {
        // Light sampling treats the sphere at its rest position.
        let probe = Ray::new(origin, direction);
        if self
            .hit(&probe, Interval::new(RAY_T_MIN, f64::INFINITY))
            .is_none()
        {
            return 0.0;
        }
        let dist_squared = (self.center - origin).length_squared();
        let cos_theta_max = (1.0 - self.radius * self.radius / dist_squared)
            .max(0.0)
            .sqrt();
        let solid_angle = 2.0 * PI * (1.0 - cos_theta_max);
        if solid_angle <= 0.0 {
            0.0
        } else {
            1.0 / solid_angle
        }
    }

    fn sample_direction(&self, origin: Point3, rng: &mut dyn rand::RngCore) -> Vec3 {
        let to_center = self.center - origin;
        let dist_squared = to_center.length_squared();
        let basis = Onb::new(to_center);

        // Uniform over the cone subtended by the sphere.
        let r1: f64 = rng.gen();
        let r2: f64 = rng.gen();
        let cos_theta_max = (1.0 - self.radius * self.radius / dist_squared)
            .max(0.0)
            .sqrt();
        let z = 1.0 + r2 * (cos_theta_max - 1.0);
        let phi = 2.0 * PI * r1;
        let sin = (1.0 - z * z).max(0.0).sqrt();
        basis.local(Vec3::new(phi.cos() * sin, phi.sin() * sin, z))
    }
}

// ─── Quad (Parallelogram) ───────────────────────────────────────────────────

/// A parallelogram spanned by `axis1` and `axis2` from `start`. The cached
/// `w = n/|n|²` vector turns the planar hit point into its (α, β)
/// parameterization with two dot products.
pub struct Quad {
    start: Point3,
    axis1: Vec3,
    axis2: Vec3,
    w: Vec3,
    normal: Vec3,
    offset: f64,
    area: f64,
    material: Arc<dyn Material>,
    bbox: Aabb,
}

impl Quad {
    pub fn new(start: Point3, axis1: Vec3, axis2: Vec3, material: Arc<dyn Material>) -> Self {
        let n = axis1.cross(axis2);
        let normal = n.normalized();
        let bbox = Aabb::new(start, start + axis1 + axis2)
            .union_with(&Aabb::new(start + axis1, start + axis2));
        Self {
            start,
            axis1,
            axis2,
            w: n / n.length_squared(),
            normal,
            offset: normal.dot(start),
            area: n.length(),
            material,
            bbox,
        }
    }
}

impl Entity for Quad {
    fn hit(&self, ray: &Ray, t_range: Interval) -> Option<HitRecord<'_>> {
        let denom = self.normal.dot(ray.direction);
        // Parallel rays never cross the plane.
        if denom.abs() < 1e-8 {
            return None;
        }

        let t = (self.offset - self.normal.dot(ray.origin)) / denom;
        if !t_range.contains(t) {
            return None;
        }

        let point = ray.at(t);
        let planar = point - self.start;
        let alpha = self.w.dot(planar.cross(self.axis2));
        let beta = self.w.dot(self.axis1.cross(planar));
        let unit = Interval::new(0.0, 1.0);
        if !unit.contains(alpha) || !unit.contains(beta) {
            return None;
        }

        let mut rec = HitRecord {
            point,
            normal: self.normal,
            material: self.material.as_ref(),
            t,
            u: alpha,
            v: beta,
            front_face: true,
        };
        rec.set_face_normal(ray, self.normal);
        Some(rec)
    }

    fn bounding_box(&self) -> Aabb {
        self.bbox
    }

    fn pdf_value(&self, origin: Point3, direction: Vec3) -> f64 {
        let probe = Ray::new(origin, direction);
        let Some(rec) = self.hit(&probe, Interval::new(RAY_T_MIN, f64::INFINITY)) else {
            return 0.0;
        };
        // Convert the area measure to solid angle at the origin.
        let dist_squared = rec.t * rec.t * direction.length_squared();
        let cosine = (direction.dot(rec.normal) / direction.length()).abs();
        if cosine < 1e-12 {
            return 0.0;
        }
        dist_squared / (cosine * self.area)
    }

    fn sample_direction(&self, origin: Point3, rng: &mut dyn rand::RngCore) -> Vec3 {
        let p = self.start + self.axis1 * rng.gen::<f64>() + self.axis2 * rng.gen::<f64>();
        p - origin
    }
}

/// The axis-aligned box spanning two opposite corners, assembled from six
/// quads whose outward normals point away from the box center.
pub fn make_box(a: Point3, b: Point3, material: Arc<dyn Material>) -> EntityList {
    let min = a.min_components(b);
    let max = a.max_components(b);

    let dx = Vec3::new(max.x - min.x, 0.0, 0.0);
    let dy = Vec3::new(0.0, max.y - min.y, 0.0);
    let dz = Vec3::new(0.0, 0.0, max.z - min.z);

    let mut sides = EntityList::new();
    sides.push(Arc::new(Quad::new(
        Point3::new(min.x, min.y, max.z),
        dx,
        dy,
        Arc::clone(&material),
    ))); // front
    sides.push(Arc::new(Quad::new(
        Point3::new(max.x, min.y, max.z),
        -dz,
        dy,
        Arc::clone(&material),
    ))); // right
    sides.push(Arc::new(Quad::new(
        Point3::new(max.x, min.y, min.z),
        -dx,
        dy,
        Arc::clone(&material),
    ))); // back
    sides.push(Arc::new(Quad::new(
        Point3::new(min.x, min.y, min.z),
        dz,
        dy,
        Arc::clone(&material),
    ))); // left
    sides.push(Arc::new(Quad::new(
        Point3::new(min.x, max.y, max.z),
        dx,
        -dz,
        Arc::clone(&material),
    ))); // top
    sides.push(Arc::new(Quad::new(
        Point3::new(min.x, min.y, min.z),
        dx,
        dz,
        material,
    ))); // bottom
    sides
}

// ─── Entity Collection ──────────────────────────────────────────────────────

/// A flat collection of entities. Doubles as the light list: its pdf is the
/// average of its members', and sampling picks a member uniformly.
pub struct EntityList {
    objects: Vec<Arc<dyn Entity>>,
    bbox: Aabb,
}

impl Default for EntityList {
    fn default() -> Self {
        Self::new()
    }
}

impl EntityList {
    pub fn new() -> Self {
        Self {
            objects: Vec::new(),
            bbox: Aabb::EMPTY,
        }
    }

    pub fn push(&mut self, entity: Arc<dyn Entity>) {
        self.bbox = self.bbox.union_with(&entity.bounding_box());
        self.objects.push(entity);
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Surrenders the entities, typically to a BVH build.
    pub fn into_objects(self) -> Vec<Arc<dyn Entity>> {
        self.objects
    }
}

impl Entity for EntityList {
    fn hit(&self, ray: &Ray, t_range: Interval) -> Option<HitRecord<'_>> {
        let mut closest = t_range.max;
        let mut best = None;
        for object in &self.objects {
            if let Some(rec) = object.hit(ray, Interval::new(t_range.min, closest)) {
                closest = rec.t;
                best = Some(rec);
            }
        }
        best
    }

    fn bounding_box(&self) -> Aabb {
        self.bbox
    }

    fn pdf_value(&self, origin: Point3, direction: Vec3) -> f64 {
        if self.objects.is_empty() {
            return 0.0;
        }
        let weight = 1.0 / self.objects.len() as f64;
        self.objects
            .iter()
            .map(|o| o.pdf_value(origin, direction))
            .sum::<f64>()
            * weight
    }

    fn sample_direction(&self, origin: Point3, rng: &mut dyn rand::RngCore) -> Vec3 {
        if self.objects.is_empty() {
            return Vec3::unit_x();
        }
        let pick = rng.gen_range(0..self.objects.len());
        self.objects[pick].sample_direction(origin, rng)
    }
}

// ─── Instances ──────────────────────────────────────────────────────────────

/// A translated view of another entity. The ray is moved into object space,
/// the child answers, and the hit point moves back; normals are unaffected
/// by translation.
pub struct Translate {
    child: Arc<dyn Entity>,
    displacement: Vec3,
    bbox: Aabb,
}

impl Translate {
    pub fn new(child: Arc<dyn Entity>, displacement: Vec3) -> Self {
        let bbox = child.bounding_box().offset(displacement);
        Self {
            child,
            displacement,
            bbox,
        }
    }
}

impl Entity for Translate {
    fn hit(&self, ray: &Ray, t_range: Interval) -> Option<HitRecord<'_>> {
        let moved = Ray::at_time(ray.origin - self.displacement, ray.direction, ray.time);
        let mut rec = self.child.hit(&moved, t_range)?;
        rec.point += self.displacement;
        Some(rec)
    }

    fn bounding_box(&self) -> Aabb {
        self.bbox
    }
}

/// A rotation of another entity about the world y axis. The world-space
/// bound is recomputed from the child's eight transformed corners.
pub struct RotateY {
    child: Arc<dyn Entity>,
    sin_theta: f64,
    cos_theta: f64,
    bbox: Aabb,
}

impl RotateY {
    pub fn new(child: Arc<dyn Entity>, degrees: f64) -> Self {
        let radians = degrees.to_radians();
        let sin_theta = radians.sin();
        let cos_theta = radians.cos();

        let child_box = child.bounding_box();
        let mut min = Point3::new(f64::INFINITY, f64::INFINITY, f64::INFINITY);
        let mut max = Point3::new(f64::NEG_INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY);
        for i in 0..2 {
            for j in 0..2 {
                for k in 0..2 {
                    let x = if i == 0 {
                        child_box.min().x
                    } else {
                        child_box.max().x
                    };
                    let y = if j == 0 {
                        child_box.min().y
                    } else {
                        child_box.max().y
                    };
                    let z = if k == 0 {
                        child_box.min().z
                    } else {
                        child_box.max().z
                    };
                    let corner = Point3::new(
                        cos_theta * x + sin_theta * z,
                        y,
                        -sin_theta * x + cos_theta * z,
                    );
                    min = min.min_components(corner);
                    max = max.max_components(corner);
                }
            }
        }

        Self {
            child,
            sin_theta,
            cos_theta,
            bbox: Aabb::new(min, max),
        }
    }

    #[inline]
    fn to_object(&self, v: Vec3) -> Vec3 {
        Vec3::new(
            self.cos_theta * v.x - self.sin_theta * v.z,
            v.y,
            self.sin_theta * v.x + self.cos_theta * v.z,
        )
    }

    #[inline]
    fn to_world(&self, v: Vec3) -> Vec3 {
        Vec3::new(
            self.cos_theta * v.x + self.sin_theta * v.z,
            v.y,
            -self.sin_theta * v.x + self.cos_theta * v.z,
        )
    }
}

impl Entity for RotateY {
    fn hit(&self, ray: &Ray, t_range: Interval) -> Option<HitRecord<'_>> {
        let rotated = Ray::at_time(
            self.to_object(ray.origin),
            self.to_object(ray.direction),
            ray.time,
        );
        let mut rec = self.child.hit(&rotated, t_range)?;
        rec.point = self.to_world(rec.point);
        rec.normal = self.to_world(rec.normal);
        Some(rec)
    }

    fn bounding_box(&self) -> Aabb {
        self.bbox
    }
}

// ─── Constant-Density Medium ────────────────────────────────────────────────

thread_local! {
    // Free-flight sampling needs randomness inside `hit`, which carries no
    // sampler handle; a lazily seeded per-thread generator covers it.
    static MEDIUM_RNG: RefCell<SmallRng> = RefCell::new(SmallRng::from_entropy());
}

/// A volume of uniform density bounded by a convex entity. A ray entering
/// the boundary scatters after an exponentially distributed free flight, or
/// passes through when the sampled flight outruns the boundary.
pub struct ConstantMedium {
    boundary: Arc<dyn Entity>,
    neg_inv_density: f64,
    phase_function: Arc<dyn Material>,
}

impl ConstantMedium {
    pub fn new(boundary: Arc<dyn Entity>, density: f64, texture: Arc<dyn Texture>) -> Self {
        Self {
            boundary,
            neg_inv_density: -1.0 / density,
            phase_function: Arc::new(Isotropic::new(texture)),
        }
    }
}

impl Entity for ConstantMedium {
    fn hit(&self, ray: &Ray, t_range: Interval) -> Option<HitRecord<'_>> {
        // Entry and exit of the boundary, unclipped first so a ray that
        // starts inside still sees its entry at negative t.
        let rec1 = self.boundary.hit(ray, Interval::UNIVERSE)?;
        let rec2 = self
            .boundary
            .hit(ray, Interval::new(rec1.t + 0.0001, f64::INFINITY))?;

        let t_enter = rec1.t.max(t_range.min).max(0.0);
        let t_exit = rec2.t.min(t_range.max);
        if t_enter >= t_exit {
            return None;
        }

        let ray_length = ray.direction.length();
        let distance_inside = (t_exit - t_enter) * ray_length;
        let hit_distance =
            self.neg_inv_density * MEDIUM_RNG.with(|r| r.borrow_mut().gen::<f64>()).ln();
        if hit_distance > distance_inside {
            return None;
        }

        let t = t_enter + hit_distance / ray_length;
        Some(HitRecord {
            point: ray.at(t),
            normal: Vec3::unit_x(), // arbitrary; the phase function ignores it
            material: self.phase_function.as_ref(),
            t,
            u: 0.0,
            v: 0.0,
            front_face: true,
        })
    }

    fn bounding_box(&self) -> Aabb {
        self.boundary.bounding_box()
    }
}
