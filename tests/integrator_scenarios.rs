//! Scenario-level checks of the radiance estimator through the public
//! rendering API.

use lumen::bvh::BvhNode;
use lumen::camera::{Camera, CameraConfig};
use lumen::entity::{Entity, Sphere};
use lumen::material::{Dielectric, Lambertian};
use lumen::math::{Color, Point3, Vec3};
use lumen::renderer::{RenderConfig, Renderer};
use lumen::scene::{Scene, SceneId, SkyModel};
use std::sync::Arc;

fn head_on_sphere_scene(sky: SkyModel, material: Arc<dyn lumen::material::Material>) -> Scene {
    let sphere: Arc<dyn Entity> = Arc::new(Sphere::new(Point3::new(0.0, 0.0, -3.0), 1.0, material));
    Scene {
        name: "scenario",
        root: BvhNode::build(vec![sphere]),
        lights: None,
        camera: Camera::new(&CameraConfig {
            look_from: Point3::zero(),
            look_at: Point3::new(0.0, 0.0, -1.0),
            vup: Vec3::unit_y(),
            vfov_degrees: 40.0,
            aspect_ratio: 1.0,
            aperture: 0.0,
            focus_dist: 3.0,
        }),
        sky,
    }
}

#[test]
fn exhausted_depth_contributes_no_radiance() {
    // With a single bounce allowed, a surface hit recurses straight into
    // the depth-zero base case: hit pixels are black, misses see the sky.
    let sky = Color::new(0.8, 0.9, 1.0);
    let scene = head_on_sphere_scene(
        SkyModel::Solid(sky),
        Arc::new(Lambertian::from_color(Color::new(0.5, 0.5, 0.5))),
    );
    let config = RenderConfig {
        width: 9,
        height: 9,
        samples_per_pixel: 1,
        max_depth: 1,
        threads: 1,
        ..Default::default()
    };
    let (fb, _) = Renderer::new(&scene, &config).render().unwrap();
    assert_eq!(fb.get(4, 4), Color::zero());
    assert!((fb.get(0, 0) - sky).length() < 1e-9);
}

#[test]
fn clear_glass_under_a_flat_sky_stays_sky_colored() {
    // A dielectric attenuates nothing, so under a uniform environment any
    // path that terminates in the sky returns exactly the sky color; only
    // the rare depth-exhausted total-internal-reflection chains darken it.
    let sky = Color::new(0.6, 0.7, 0.9);
    let scene = head_on_sphere_scene(SkyModel::Solid(sky), Arc::new(Dielectric::new(1.5)));
    let config = RenderConfig {
        width: 9,
        height: 9,
        samples_per_pixel: 64,
        max_depth: 16,
        threads: 1,
        seed: 5,
        ..Default::default()
    };
    let (fb, _) = Renderer::new(&scene, &config).render().unwrap();
    let center = fb.get(4, 4);
    assert!(
        (center - sky).length() / sky.length() < 0.02,
        "glass tinted the sky: {center}"
    );
}

#[test]
fn preset_scenes_produce_finite_radiance() {
    for id in [SceneId::Balls, SceneId::ShrekQuads, SceneId::Emissive] {
        let scene = id.build(24, 16);
        let config = RenderConfig {
            width: 24,
            height: 16,
            samples_per_pixel: 2,
            max_depth: 6,
            threads: 2,
            seed: 11,
            ..Default::default()
        };
        let (fb, stats) = Renderer::new(&scene, &config).render().unwrap();
        assert_eq!(stats.total_rays, 24 * 16 * 2);
        for px in &fb.pixels {
            assert!(
                px.x.is_finite() && px.y.is_finite() && px.z.is_finite(),
                "{}: non-finite radiance {px}",
                scene.name
            );
            assert!(px.x >= 0.0 && px.y >= 0.0 && px.z >= 0.0);
        }
    }
}
