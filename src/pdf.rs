use crate::entity::Entity;
use crate::math::{Onb, Point3, Vec3};
use rand::Rng;
use std::f64::consts::PI;

/// A sampling density over directions. The integrator asks a `Pdf` for a
/// direction (`generate`) and for the density of an arbitrary direction
/// (`value`); dividing the two keeps the Monte-Carlo estimator unbiased.
///
/// A closed set of variants dispatched by match — the integrator only ever
/// composes these four shapes.
pub enum Pdf<'a> {
    /// Uniform over the whole sphere of directions, density 1/(4π).
    /// The sampling counterpart of the isotropic phase function.
    Sphere,
    /// Cosine-weighted about a surface normal, density max(0, cos θ)/π.
    Cosine { basis: Onb },
    /// Directed at a distinguished entity (an area light): delegates both
    /// operations to the entity's own solid-angle measure.
    Entity {
        entity: &'a dyn Entity,
        origin: Point3,
    },
    /// 50/50 blend of two densities — the multiple-importance-sampling
    /// combination of light sampling and BRDF sampling.
    Mixture(Box<Pdf<'a>>, Box<Pdf<'a>>),
}

impl<'a> Pdf<'a> {
    pub fn cosine(normal: Vec3) -> Self {
        Pdf::Cosine {
            basis: Onb::new(normal),
        }
    }

    pub fn entity(entity: &'a dyn Entity, origin: Point3) -> Self {
        Pdf::Entity { entity, origin }
    }

    pub fn mixture(a: Pdf<'a>, b: Pdf<'a>) -> Self {
        Pdf::Mixture(Box::new(a), Box::new(b))
    }

    /// Density of `direction` under this distribution.
    pub fn value(&self, direction: Vec3) -> f64 {
        match self {
            Pdf::Sphere => 1.0 / (4.0 * PI),
            Pdf::Cosine { basis } => {
                let cosine = direction.normalized().dot(basis.w());
                (cosine / PI).max(0.0)
            }
            Pdf::Entity { entity, origin } => entity.pdf_value(*origin, direction),
            Pdf::Mixture(a, b) => 0.5 * a.value(direction) + 0.5 * b.value(direction),
        }
    }

    /// Draws a direction distributed according to this density.
    pub fn generate(&self, rng: &mut dyn rand::RngCore) -> Vec3 {
        match self {
            Pdf::Sphere => Vec3::random_unit_vector(rng),
            Pdf::Cosine { basis } => {
                let dir = basis.local(Vec3::random_cosine_direction(rng));
                if dir.near_zero() {
                    basis.w()
                } else {
                    dir
                }
            }
            Pdf::Entity { entity, origin } => entity.sample_direction(*origin, rng),
            Pdf::Mixture(a, b) => {
                if rng.gen::<f64>() < 0.5 {
                    a.generate(rng)
                } else {
                    b.generate(rng)
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    #[test]
    fn sphere_density_is_uniform() {
        let pdf = Pdf::Sphere;
        let quarter = 1.0 / (4.0 * PI);
        assert!((pdf.value(Vec3::unit_x()) - quarter).abs() < 1e-15);
        assert!((pdf.value(-Vec3::unit_z()) - quarter).abs() < 1e-15);
    }

    #[test]
    fn cosine_density_matches_angle() {
        let pdf = Pdf::cosine(Vec3::unit_y());
        assert!((pdf.value(Vec3::unit_y()) - 1.0 / PI).abs() < 1e-12);
        // Orthogonal and below-horizon directions carry no density.
        assert_eq!(pdf.value(Vec3::unit_x()), 0.0);
        assert_eq!(pdf.value(-Vec3::unit_y()), 0.0);
    }

    #[test]
    fn cosine_generates_into_upper_hemisphere() {
        let normal = Vec3::new(0.3, 0.8, -0.1).normalized();
        let pdf = Pdf::cosine(normal);
        let mut rng = SmallRng::seed_from_u64(11);
        for _ in 0..128 {
            let d = pdf.generate(&mut rng);
            assert!(d.dot(normal) >= 0.0);
        }
    }

    #[test]
    fn mixture_averages_the_two_densities() {
        let pdf = Pdf::mixture(Pdf::Sphere, Pdf::cosine(Vec3::unit_y()));
        let dir = Vec3::unit_y();
        let expected = 0.5 * (1.0 / (4.0 * PI)) + 0.5 * (1.0 / PI);
        assert!((pdf.value(dir) - expected).abs() < 1e-12);
    }
}
