use crate::entity::HitRecord;
use crate::geometry::Ray;
use crate::math::{Color, Vec3};
use crate::pdf::Pdf;
use crate::texture::Texture;
use rand::Rng;
use std::f64::consts::PI;
use std::sync::Arc;

// ─── Scatter Record ─────────────────────────────────────────────────────────

/// The outcome of a surface interaction: the attenuation to apply to the
/// continued path plus either a delta-distribution bounce (mirror,
/// refraction) or a density to importance-sample. A specular bounce skips
/// the light-mixture machinery entirely; a diffuse bounce hands its density
/// to the integrator for 50/50 mixing with the light pdf.
pub struct ScatterRecord<'a> {
    pub attenuation: Color,
    pub kind: Scatter<'a>,
}

pub enum Scatter<'a> {
    /// The bounce direction is fully determined; follow this ray.
    Specular(Ray),
    /// Sample the bounce from this density.
    Diffuse(Pdf<'a>),
}

impl ScatterRecord<'_> {
    /// True for delta-distribution materials (metal, dielectric), which the
    /// estimator evaluates without a pdf division.
    pub fn is_specular(&self) -> bool {
        matches!(self.kind, Scatter::Specular(_))
    }
}

// ─── Material Trait (dyn-compatible via &mut dyn RngCore) ───────────────────

/// The material BRDF abstraction. Uses `&mut dyn rand::RngCore` for
/// dyn-compatibility, enabling heterogeneous material storage via trait
/// objects; the renderer passes its sampler through this handle so every
/// stochastic decision stays reproducible.
pub trait Material: Send + Sync {
    /// Computes the surface response. `None` means the ray is absorbed
    /// (emissive surfaces, grazing metal).
    fn scatter(
        &self,
        ray: &Ray,
        hit: &HitRecord,
        rng: &mut dyn rand::RngCore,
    ) -> Option<ScatterRecord<'_>>;

    /// Density the material's own BRDF assigns to `scattered` — the f·cos
    /// term of the estimator for non-delta materials.
    fn scattering_pdf(&self, _ray: &Ray, _hit: &HitRecord, _scattered: &Ray) -> f64 {
        0.0
    }

    fn emitted(&self, _ray: &Ray, _hit: &HitRecord) -> Color {
        Color::zero()
    }
}

// ─── Lambertian (Diffuse) ───────────────────────────────────────────────────

pub struct Lambertian {
    texture: Arc<dyn Texture>,
}

impl Lambertian {
    pub fn new(texture: Arc<dyn Texture>) -> Self {
        Self { texture }
    }

    pub fn from_color(albedo: Color) -> Self {
        Self::new(Arc::new(crate::texture::SolidColor::new(albedo)))
    }
}

impl Material for Lambertian {
    fn scatter(
        &self,
        _ray: &Ray,
        hit: &HitRecord,
        _rng: &mut dyn rand::RngCore,
    ) -> Option<ScatterRecord<'_>> {
        Some(ScatterRecord {
            attenuation: self.texture.value(hit.u, hit.v, hit.point),
            kind: Scatter::Diffuse(Pdf::cosine(hit.normal)),
        })
    }

    fn scattering_pdf(&self, _ray: &Ray, hit: &HitRecord, scattered: &Ray) -> f64 {
        let cosine = hit.normal.dot(scattered.direction.normalized());
        (cosine / PI).max(0.0)
    }
}

// ─── Isotropic (Phase Function) ─────────────────────────────────────────────

/// The scattering hook used by constant-density media: every direction is
/// equally likely.
pub struct Isotropic {
    texture: Arc<dyn Texture>,
}

impl Isotropic {
    pub fn new(texture: Arc<dyn Texture>) -> Self {
        Self { texture }
    }

    pub fn from_color(albedo: Color) -> Self {
        Self::new(Arc::new(crate::texture::SolidColor::new(albedo)))
    }
}

impl Material for Isotropic {
    fn scatter(
        &self,
        _ray: &Ray,
        hit: &HitRecord,
        _rng: &mut dyn rand::RngCore,
    ) -> Option<ScatterRecord<'_>> {
        Some(ScatterRecord {
            attenuation: self.texture.value(hit.u, hit.v, hit.point),
            kind: Scatter::Diffuse(Pdf::Sphere),
        })
    }

    fn scattering_pdf(&self, _ray: &Ray, _hit: &HitRecord, _scattered: &Ray) -> f64 {
        1.0 / (4.0 * PI)
    }
}

// ─── Metal (Specular) ───────────────────────────────────────────────────────

pub struct Metal {
    albedo: Color,
    fuzz: f64,
}

impl Metal {
    pub fn new(albedo: Color, fuzz: f64) -> Self {
        Self {
            albedo,
            fuzz: fuzz.min(1.0),
        }
    }
}

impl Material for Metal {
    fn scatter(
        &self,
        ray: &Ray,
        hit: &HitRecord,
        rng: &mut dyn rand::RngCore,
    ) -> Option<ScatterRecord<'_>> {
        let reflected = ray.direction.normalized().reflect(hit.normal);
        let fuzzed = reflected + Vec3::random_in_unit_sphere(rng) * self.fuzz;
        // A fuzzed reflection below the horizon is absorbed.
        if fuzzed.dot(hit.normal) <= 0.0 {
            return None;
        }
        Some(ScatterRecord {
            attenuation: self.albedo,
            kind: Scatter::Specular(Ray::at_time(hit.point, fuzzed, ray.time)),
        })
    }
}

// ─── Dielectric (Glass) ─────────────────────────────────────────────────────

pub struct Dielectric {
    refraction_index: f64,
}

impl Dielectric {
    pub const fn new(refraction_index: f64) -> Self {
        Self { refraction_index }
    }

    /// Schlick's polynomial approximation of Fresnel reflectance:
    /// r₀ + (1-r₀)(1-cos θ)⁵ with r₀ = ((1-η)/(1+η))².
    pub fn reflectance(cosine: f64, eta: f64) -> f64 {
        let r0 = ((1.0 - eta) / (1.0 + eta)).powi(2);
        r0 + (1.0 - r0) * (1.0 - cosine).powi(5)
    }
}

impl Material for Dielectric {
    fn scatter(
        &self,
        ray: &Ray,
        hit: &HitRecord,
        rng: &mut dyn rand::RngCore,
    ) -> Option<ScatterRecord<'_>> {
        let eta_ratio = if hit.front_face {
            1.0 / self.refraction_index
        } else {
            self.refraction_index
        };
        let unit_dir = ray.direction.normalized();
        let cos_theta = (-unit_dir).dot(hit.normal).min(1.0);
        let sin_theta = (1.0 - cos_theta * cos_theta).sqrt();

        let cannot_refract = eta_ratio * sin_theta > 1.0;
        let direction =
            if cannot_refract || Self::reflectance(cos_theta, eta_ratio) > rng.gen::<f64>() {
                unit_dir.reflect(hit.normal)
            } else {
                unit_dir
                    .refract(hit.normal, eta_ratio)
                    .unwrap_or_else(|| unit_dir.reflect(hit.normal))
            };

        Some(ScatterRecord {
            attenuation: Color::ones(),
            kind: Scatter::Specular(Ray::at_time(hit.point, direction, ray.time)),
        })
    }
}

// ─── Diffuse Emitter ────────────────────────────────────────────────────────

/// An area light: absorbs every incident ray and radiates from its front
/// face only, so the back of a ceiling panel stays dark.
pub struct DiffuseLight {
    texture: Arc<dyn Texture>,
}

impl DiffuseLight {
    pub fn new(texture: Arc<dyn Texture>) -> Self {
        Self { texture }
    }

    pub fn from_color(emit: Color) -> Self {
        Self::new(Arc::new(crate::texture::SolidColor::new(emit)))
    }
}

impl Material for DiffuseLight {
    fn scatter(
        &self,
        _ray: &Ray,
        _hit: &HitRecord,
        _rng: &mut dyn rand::RngCore,
    ) -> Option<ScatterRecord<'_>> {
        None
    }

    fn emitted(&self, _ray: &Ray, hit: &HitRecord) -> Color {
        if hit.front_face {
            self.texture.value(hit.u, hit.v, hit.point)
        } else {
            Color::zero()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Point3;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    fn test_hit<'a>(material: &'a dyn Material, front_face: bool) -> HitRecord<'a> {
        HitRecord {
            point: Point3::zero(),
            normal: Vec3::unit_y(),
            material,
            t: 1.0,
            u: 0.5,
            v: 0.5,
            front_face,
        }
    }

    #[test]
    fn schlick_reflectance_at_normal_incidence() {
        // η = 1.5 head-on: ((1-1.5)/(1+1.5))² = 0.04.
        assert!((Dielectric::reflectance(1.0, 1.5) - 0.04).abs() < 1e-12);
        // Grazing incidence approaches total reflection.
        assert!(Dielectric::reflectance(0.0, 1.5) > 0.99);
    }

    #[test]
    fn lambertian_pdf_is_cosine_over_pi() {
        let mat = Lambertian::from_color(Color::ones());
        let hit = test_hit(&mat, true);
        let incoming = Ray::new(Point3::new(0.0, 1.0, 0.0), -Vec3::unit_y());
        let up = Ray::new(Point3::zero(), Vec3::unit_y());
        assert!((mat.scattering_pdf(&incoming, &hit, &up) - 1.0 / PI).abs() < 1e-12);
        let below = Ray::new(Point3::zero(), -Vec3::unit_y());
        assert_eq!(mat.scattering_pdf(&incoming, &hit, &below), 0.0);
    }

    #[test]
    fn isotropic_pdf_is_uniform() {
        let mat = Isotropic::from_color(Color::ones());
        let hit = test_hit(&mat, true);
        let r = Ray::new(Point3::zero(), Vec3::unit_x());
        assert!((mat.scattering_pdf(&r, &hit, &r) - 1.0 / (4.0 * PI)).abs() < 1e-15);
    }

    #[test]
    fn metal_absorbs_below_horizon() {
        let mat = Metal::new(Color::ones(), 1.0);
        let hit = test_hit(&mat, true);
        let grazing = Ray::new(
            Point3::new(-1.0, 0.0001, 0.0),
            Vec3::new(1.0, -0.0001, 0.0),
        );
        let mut rng = SmallRng::seed_from_u64(3);
        let mut absorbed = 0;
        for _ in 0..64 {
            if mat.scatter(&grazing, &hit, &mut rng).is_none() {
                absorbed += 1;
            }
        }
        // Full fuzz at grazing incidence pushes many samples under the surface.
        assert!(absorbed > 0);
    }

    #[test]
    fn mirror_metal_reflects_exactly() {
        let mat = Metal::new(Color::ones(), 0.0);
        let hit = test_hit(&mat, true);
        let incoming = Ray::new(
            Point3::new(-1.0, 1.0, 0.0),
            Vec3::new(1.0, -1.0, 0.0).normalized(),
        );
        let mut rng = SmallRng::seed_from_u64(5);
        let rec = mat.scatter(&incoming, &hit, &mut rng).unwrap();
        let Scatter::Specular(out) = rec.kind else {
            panic!("metal must be specular");
        };
        let expected = Vec3::new(1.0, 1.0, 0.0).normalized();
        assert!((out.direction.normalized() - expected).length() < 1e-12);
    }

    #[test]
    fn emitter_radiates_from_front_face_only() {
        let mat = DiffuseLight::from_color(Color::new(4.0, 4.0, 4.0));
        let r = Ray::new(Point3::zero(), -Vec3::unit_y());
        let front = test_hit(&mat, true);
        assert_eq!(mat.emitted(&r, &front), Color::new(4.0, 4.0, 4.0));
        let back = test_hit(&mat, false);
        assert_eq!(mat.emitted(&r, &back), Color::zero());
    }

    #[test]
    fn dielectric_is_always_specular() {
        let mat = Dielectric::new(1.5);
        let hit = test_hit(&mat, true);
        let incoming = Ray::new(Point3::new(0.0, 1.0, 0.0), -Vec3::unit_y());
        let mut rng = SmallRng::seed_from_u64(9);
        let rec = mat.scatter(&incoming, &hit, &mut rng).unwrap();
        assert!(rec.is_specular());
        assert_eq!(rec.attenuation, Color::ones());
    }
}
