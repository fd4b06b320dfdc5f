use crate::bvh::BvhNode;
use crate::camera::{Camera, CameraConfig};
use crate::entity::{make_box, ConstantMedium, Entity, EntityList, Quad, RotateY, Sphere, Translate};
use crate::geometry::Ray;
use crate::material::{Dielectric, DiffuseLight, Lambertian, Material, Metal};
use crate::math::{Color, Point3, Vec3};
use crate::texture::{Checker, SolidColor};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use std::sync::Arc;
use tracing::debug;

// ─── Sky ────────────────────────────────────────────────────────────────────

/// What a ray that escapes the scene sees.
#[derive(Debug, Clone, Copy)]
pub enum SkyModel {
    Gradient { horizon: Color, zenith: Color },
    Solid(Color),
    Black,
}

impl SkyModel {
    pub fn sample(&self, ray: &Ray) -> Color {
        match self {
            SkyModel::Gradient { horizon, zenith } => {
                let unit_dir = ray.direction.normalized();
                let t = 0.5 * (unit_dir.y + 1.0);
                horizon.lerp(*zenith, t)
            }
            SkyModel::Solid(color) => *color,
            SkyModel::Black => Color::zero(),
        }
    }
}

// ─── Scene Container ────────────────────────────────────────────────────────

/// A complete renderable scene: the BVH over all geometry, the subset of
/// entities worth importance-sampling as lights, the camera, and the sky.
/// The scene owns every entity and material for the duration of the render.
pub struct Scene {
    pub name: &'static str,
    pub root: BvhNode,
    pub lights: Option<EntityList>,
    pub camera: Camera,
    pub sky: SkyModel,
}

/// Available built-in scene presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum SceneId {
    /// The classic random-spheres arrangement: diffuse, metallic, and glass
    /// spheres (some in motion) on a checkerboard ground under a sky
    /// gradient.
    #[value(name = "balls")]
    Balls,
    /// Five colored parallelograms facing the camera.
    #[value(name = "shrek_quads")]
    ShrekQuads,
    /// Two diffuse spheres lit only by an area quad and an emissive sphere.
    #[value(name = "emissive")]
    Emissive,
    /// The standard Cornell box with a rotated, translated box pair under a
    /// ceiling light.
    #[value(name = "cornell_box")]
    CornellBox,
    /// The grand tour: a box-grid ground, moving sphere, glass and metal
    /// spheres, fog volumes, and a rotated cluster of small spheres.
    #[value(name = "rtw_final")]
    RtwFinal,
}

impl SceneId {
    /// Builds the scene for the given output aspect ratio. Construction is
    /// deterministic: preset randomness comes from fixed per-scene seeds,
    /// so the entity order (and therefore the BVH) never varies between
    /// runs.
    pub fn build(self, width: u32, height: u32) -> Scene {
        let aspect = width as f64 / height as f64;
        let scene = match self {
            SceneId::Balls => build_balls(aspect),
            SceneId::ShrekQuads => build_shrek_quads(aspect),
            SceneId::Emissive => build_emissive(aspect),
            SceneId::CornellBox => build_cornell_box(aspect),
            SceneId::RtwFinal => build_rtw_final(aspect),
        };
        debug!(scene = scene.name, "scene constructed");
        scene
    }
}

fn lambertian(albedo: Color) -> Arc<dyn Material> {
    Arc::new(Lambertian::from_color(albedo))
}

// ─── Balls ──────────────────────────────────────────────────────────────────

fn build_balls(aspect: f64) -> Scene {
    let mut world = EntityList::new();
    let mut rng = SmallRng::seed_from_u64(0x5eed_ba11);

    // Ground — coarse checkerboard.
    let ground = Arc::new(Lambertian::new(Arc::new(Checker::from_colors(
        3.0,
        Color::new(0.05, 0.05, 0.05),
        Color::new(0.95, 0.95, 0.95),
    ))));
    world.push(Arc::new(Sphere::new(
        Point3::new(0.0, -1000.0, 0.0),
        1000.0,
        ground,
    )));

    // Three hero spheres: hollow glass, diffuse, mirror.
    let glass: Arc<dyn Material> = Arc::new(Dielectric::new(1.5));
    world.push(Arc::new(Sphere::new(
        Point3::new(0.0, 1.0, 0.0),
        1.0,
        Arc::clone(&glass),
    )));
    world.push(Arc::new(Sphere::new(
        Point3::new(0.0, 1.0, 0.0),
        -0.95,
        Arc::clone(&glass),
    )));
    world.push(Arc::new(Sphere::new(
        Point3::new(-4.0, 1.0, 0.0),
        1.0,
        lambertian(Color::new(0.7, 0.15, 0.15)),
    )));
    world.push(Arc::new(Sphere::new(
        Point3::new(4.0, 1.0, 0.0),
        1.0,
        Arc::new(Metal::new(Color::new(0.85, 0.85, 0.9), 0.0)),
    )));

    // Field of small spheres; diffuse ones bob upward over the shutter.
    for a in -8..8 {
        for b in -8..8 {
            let center = Point3::new(
                a as f64 + 0.9 * rng.gen::<f64>(),
                0.2,
                b as f64 + 0.9 * rng.gen::<f64>(),
            );

            if (center - Point3::new(4.0, 0.2, 0.0)).length() < 0.9
                || (center - Point3::new(-4.0, 0.2, 0.0)).length() < 0.9
                || (center - Point3::new(0.0, 0.2, 0.0)).length() < 0.9
            {
                continue;
            }

            let choose_mat: f64 = rng.gen();
            let sphere: Arc<dyn Entity> = if choose_mat < 0.7 {
                let albedo = Color::new(
                    rng.gen::<f64>() * rng.gen::<f64>(),
                    rng.gen::<f64>() * rng.gen::<f64>(),
                    rng.gen::<f64>() * rng.gen::<f64>(),
                );
                let lift = Vec3::new(0.0, rng.gen_range(0.0..0.5), 0.0);
                Arc::new(Sphere::new_moving(
                    center,
                    center + lift,
                    0.2,
                    lambertian(albedo),
                ))
            } else if choose_mat < 0.9 {
                let albedo = Color::new(
                    rng.gen_range(0.5..1.0),
                    rng.gen_range(0.5..1.0),
                    rng.gen_range(0.5..1.0),
                );
                let fuzz = rng.gen_range(0.0..0.3);
                Arc::new(Sphere::new(center, 0.2, Arc::new(Metal::new(albedo, fuzz))))
            } else {
                Arc::new(Sphere::new(center, 0.2, Arc::new(Dielectric::new(1.5))))
            };
            world.push(sphere);
        }
    }

    Scene {
        name: "balls",
        root: BvhNode::build(world.into_objects()),
        lights: None,
        camera: Camera::new(&CameraConfig {
            look_from: Point3::new(13.0, 2.0, 3.0),
            look_at: Point3::new(0.0, 0.5, 0.0),
            vup: Vec3::unit_y(),
            vfov_degrees: 20.0,
            aspect_ratio: aspect,
            aperture: 0.1,
            focus_dist: 10.0,
        }),
        sky: SkyModel::Gradient {
            horizon: Color::new(1.0, 1.0, 1.0),
            zenith: Color::new(0.5, 0.7, 1.0),
        },
    }
}

// ─── Shrek Quads ────────────────────────────────────────────────────────────

fn build_shrek_quads(aspect: f64) -> Scene {
    let mut world = EntityList::new();

    // Five swamp-toned panels boxing the view.
    let left = lambertian(Color::new(0.2, 0.5, 0.1));
    let back = lambertian(Color::new(0.4, 0.7, 0.2));
    let right = lambertian(Color::new(0.1, 0.35, 0.15));
    let top = lambertian(Color::new(0.65, 0.6, 0.2));
    let bottom = lambertian(Color::new(0.3, 0.25, 0.1));

    world.push(Arc::new(Quad::new(
        Point3::new(-3.0, -2.0, 5.0),
        Vec3::new(0.0, 0.0, -4.0),
        Vec3::new(0.0, 4.0, 0.0),
        left,
    )));
    world.push(Arc::new(Quad::new(
        Point3::new(-2.0, -2.0, 0.0),
        Vec3::new(4.0, 0.0, 0.0),
        Vec3::new(0.0, 4.0, 0.0),
        back,
    )));
    world.push(Arc::new(Quad::new(
        Point3::new(3.0, -2.0, 1.0),
        Vec3::new(0.0, 0.0, 4.0),
        Vec3::new(0.0, 4.0, 0.0),
        right,
    )));
    world.push(Arc::new(Quad::new(
        Point3::new(-2.0, 3.0, 1.0),
        Vec3::new(4.0, 0.0, 0.0),
        Vec3::new(0.0, 0.0, 4.0),
        top,
    )));
    world.push(Arc::new(Quad::new(
        Point3::new(-2.0, -3.0, 5.0),
        Vec3::new(4.0, 0.0, 0.0),
        Vec3::new(0.0, 0.0, -4.0),
        bottom,
    )));

    Scene {
        name: "shrek_quads",
        root: BvhNode::build(world.into_objects()),
        lights: None,
        camera: Camera::new(&CameraConfig {
            look_from: Point3::new(0.0, 0.0, 9.0),
            look_at: Point3::zero(),
            vup: Vec3::unit_y(),
            vfov_degrees: 80.0,
            aspect_ratio: aspect,
            aperture: 0.0,
            focus_dist: 9.0,
        }),
        sky: SkyModel::Solid(Color::new(0.7, 0.8, 1.0)),
    }
}

// ─── Emissive ───────────────────────────────────────────────────────────────

fn build_emissive(aspect: f64) -> Scene {
    let mut world = EntityList::new();
    let mut lights = EntityList::new();

    world.push(Arc::new(Sphere::new(
        Point3::new(0.0, -1000.0, 0.0),
        1000.0,
        lambertian(Color::new(0.48, 0.53, 0.4)),
    )));
    world.push(Arc::new(Sphere::new(
        Point3::new(0.0, 2.0, 0.0),
        2.0,
        lambertian(Color::new(0.4, 0.2, 0.1)),
    )));

    let panel: Arc<dyn Entity> = Arc::new(Quad::new(
        Point3::new(3.0, 1.0, -2.0),
        Vec3::new(2.0, 0.0, 0.0),
        Vec3::new(0.0, 2.0, 0.0),
        Arc::new(DiffuseLight::from_color(Color::new(4.0, 4.0, 4.0))),
    ));
    let lamp: Arc<dyn Entity> = Arc::new(Sphere::new(
        Point3::new(0.0, 7.0, 0.0),
        2.0,
        Arc::new(DiffuseLight::from_color(Color::new(2.0, 2.0, 2.0))),
    ));
    world.push(Arc::clone(&panel));
    world.push(Arc::clone(&lamp));
    lights.push(panel);
    lights.push(lamp);

    Scene {
        name: "emissive",
        root: BvhNode::build(world.into_objects()),
        lights: Some(lights),
        camera: Camera::new(&CameraConfig {
            look_from: Point3::new(26.0, 3.0, 6.0),
            look_at: Point3::new(0.0, 2.0, 0.0),
            vup: Vec3::unit_y(),
            vfov_degrees: 20.0,
            aspect_ratio: aspect,
            aperture: 0.0,
            focus_dist: 26.0,
        }),
        sky: SkyModel::Black,
    }
}

// ─── Cornell Box ────────────────────────────────────────────────────────────

fn build_cornell_box(aspect: f64) -> Scene {
    let mut world = EntityList::new();
    let mut lights = EntityList::new();

    let red = lambertian(Color::new(0.65, 0.05, 0.05));
    let white = lambertian(Color::new(0.73, 0.73, 0.73));
    let green = lambertian(Color::new(0.12, 0.45, 0.15));

    // Walls.
    world.push(Arc::new(Quad::new(
        Point3::new(555.0, 0.0, 0.0),
        Vec3::new(0.0, 555.0, 0.0),
        Vec3::new(0.0, 0.0, 555.0),
        green,
    )));
    world.push(Arc::new(Quad::new(
        Point3::new(0.0, 0.0, 0.0),
        Vec3::new(0.0, 555.0, 0.0),
        Vec3::new(0.0, 0.0, 555.0),
        red,
    )));
    world.push(Arc::new(Quad::new(
        Point3::new(0.0, 0.0, 0.0),
        Vec3::new(555.0, 0.0, 0.0),
        Vec3::new(0.0, 0.0, 555.0),
        Arc::clone(&white),
    )));
    world.push(Arc::new(Quad::new(
        Point3::new(555.0, 555.0, 555.0),
        Vec3::new(-555.0, 0.0, 0.0),
        Vec3::new(0.0, 0.0, -555.0),
        Arc::clone(&white),
    )));
    world.push(Arc::new(Quad::new(
        Point3::new(0.0, 0.0, 555.0),
        Vec3::new(555.0, 0.0, 0.0),
        Vec3::new(0.0, 555.0, 0.0),
        Arc::clone(&white),
    )));

    // Ceiling light, oriented downward.
    let light: Arc<dyn Entity> = Arc::new(Quad::new(
        Point3::new(343.0, 554.0, 332.0),
        Vec3::new(-130.0, 0.0, 0.0),
        Vec3::new(0.0, 0.0, -105.0),
        Arc::new(DiffuseLight::from_color(Color::new(15.0, 15.0, 15.0))),
    ));
    world.push(Arc::clone(&light));
    lights.push(light);

    // The two boxes, each rotated about y and shoved into place.
    let tall = Arc::new(make_box(
        Point3::zero(),
        Point3::new(165.0, 330.0, 165.0),
        Arc::clone(&white),
    ));
    world.push(Arc::new(Translate::new(
        Arc::new(RotateY::new(tall, 15.0)),
        Vec3::new(265.0, 0.0, 295.0),
    )));

    let short = Arc::new(make_box(
        Point3::zero(),
        Point3::new(165.0, 165.0, 165.0),
        white,
    ));
    world.push(Arc::new(Translate::new(
        Arc::new(RotateY::new(short, -18.0)),
        Vec3::new(130.0, 0.0, 65.0),
    )));

    Scene {
        name: "cornell_box",
        root: BvhNode::build(world.into_objects()),
        lights: Some(lights),
        camera: Camera::new(&CameraConfig {
            look_from: Point3::new(278.0, 278.0, -800.0),
            look_at: Point3::new(278.0, 278.0, 0.0),
            vup: Vec3::unit_y(),
            vfov_degrees: 40.0,
            aspect_ratio: aspect,
            aperture: 0.0,
            focus_dist: 800.0,
        }),
        sky: SkyModel::Black,
    }
}

// ─── RTW Final ──────────────────────────────────────────────────────────────

fn build_rtw_final(aspect: f64) -> Scene {
    let mut world = EntityList::new();
    let mut lights = EntityList::new();
    let mut rng = SmallRng::seed_from_u64(0xf1a1_beef);

    // Ground: a 20×20 grid of boxes with random heights.
    let ground_mat = lambertian(Color::new(0.48, 0.83, 0.53));
    let mut ground = EntityList::new();
    for i in 0..20 {
        for j in 0..20 {
            let w = 100.0;
            let x0 = -1000.0 + i as f64 * w;
            let z0 = -1000.0 + j as f64 * w;
            let y1 = rng.gen_range(1.0..101.0);
            ground.push(Arc::new(make_box(
                Point3::new(x0, 0.0, z0),
                Point3::new(x0 + w, y1, z0 + w),
                Arc::clone(&ground_mat),
            )));
        }
    }
    world.push(Arc::new(BvhNode::build(ground.into_objects())));

    let light: Arc<dyn Entity> = Arc::new(Quad::new(
        Point3::new(123.0, 554.0, 147.0),
        Vec3::new(300.0, 0.0, 0.0),
        Vec3::new(0.0, 0.0, 265.0),
        Arc::new(DiffuseLight::from_color(Color::new(7.0, 7.0, 7.0))),
    ));
    world.push(Arc::clone(&light));
    lights.push(light);

    // A sphere smeared across the shutter interval.
    let center = Point3::new(400.0, 400.0, 200.0);
    world.push(Arc::new(Sphere::new_moving(
        center,
        center + Vec3::new(30.0, 0.0, 0.0),
        50.0,
        lambertian(Color::new(0.7, 0.3, 0.1)),
    )));

    world.push(Arc::new(Sphere::new(
        Point3::new(260.0, 150.0, 45.0),
        50.0,
        Arc::new(Dielectric::new(1.5)),
    )));
    world.push(Arc::new(Sphere::new(
        Point3::new(0.0, 150.0, 145.0),
        50.0,
        Arc::new(Metal::new(Color::new(0.8, 0.8, 0.9), 1.0)),
    )));

    // A glass shell filled with blue haze.
    let shell: Arc<dyn Entity> = Arc::new(Sphere::new(
        Point3::new(360.0, 150.0, 145.0),
        70.0,
        Arc::new(Dielectric::new(1.5)),
    ));
    world.push(Arc::clone(&shell));
    world.push(Arc::new(ConstantMedium::new(
        shell,
        0.2,
        Arc::new(SolidColor::new(Color::new(0.2, 0.4, 0.9))),
    )));

    // Thin global mist over the whole scene.
    let mist_boundary: Arc<dyn Entity> =
        Arc::new(Sphere::new(Point3::zero(), 5000.0, Arc::new(Dielectric::new(1.5))));
    world.push(Arc::new(ConstantMedium::new(
        mist_boundary,
        0.0001,
        Arc::new(SolidColor::new(Color::ones())),
    )));

    // Patterned spheres standing in for image and noise textures.
    world.push(Arc::new(Sphere::new(
        Point3::new(400.0, 200.0, 400.0),
        100.0,
        Arc::new(Lambertian::new(Arc::new(Checker::from_colors(
            0.08,
            Color::new(0.2, 0.3, 0.1),
            Color::new(0.9, 0.9, 0.9),
        )))),
    )));
    world.push(Arc::new(Sphere::new(
        Point3::new(220.0, 280.0, 300.0),
        80.0,
        Arc::new(Lambertian::new(Arc::new(Checker::from_colors(
            0.4,
            Color::new(0.1, 0.1, 0.4),
            Color::new(0.8, 0.8, 0.9),
        )))),
    )));

    // A cube of small white spheres, rotated and floated up left.
    let white = lambertian(Color::new(0.73, 0.73, 0.73));
    let mut cluster = EntityList::new();
    for _ in 0..1000 {
        cluster.push(Arc::new(Sphere::new(
            Point3::new(
                rng.gen_range(0.0..165.0),
                rng.gen_range(0.0..165.0),
                rng.gen_range(0.0..165.0),
            ),
            10.0,
            Arc::clone(&white),
        )));
    }
    world.push(Arc::new(Translate::new(
        Arc::new(RotateY::new(
            Arc::new(BvhNode::build(cluster.into_objects())),
            15.0,
        )),
        Vec3::new(-100.0, 270.0, 395.0),
    )));

    Scene {
        name: "rtw_final",
        root: BvhNode::build(world.into_objects()),
        lights: Some(lights),
        camera: Camera::new(&CameraConfig {
            look_from: Point3::new(478.0, 278.0, -600.0),
            look_at: Point3::new(278.0, 278.0, 0.0),
            vup: Vec3::unit_y(),
            vfov_degrees: 40.0,
            aspect_ratio: aspect,
            aperture: 0.0,
            focus_dist: 600.0,
        }),
        sky: SkyModel::Black,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::RAY_T_MIN;
    use crate::math::Interval;

    #[test]
    fn every_preset_builds() {
        for id in [
            SceneId::Balls,
            SceneId::ShrekQuads,
            SceneId::Emissive,
            SceneId::CornellBox,
            SceneId::RtwFinal,
        ] {
            let scene = id.build(64, 36);
            let bbox = scene.root.bounding_box();
            assert!(bbox.max().x > bbox.min().x, "{}: empty bound", scene.name);
        }
    }

    #[test]
    fn lit_scenes_carry_a_light_list() {
        assert!(SceneId::CornellBox.build(32, 32).lights.is_some());
        assert!(SceneId::Emissive.build(32, 32).lights.is_some());
        assert!(SceneId::Balls.build(32, 32).lights.is_none());
    }

    #[test]
    fn cornell_camera_sees_the_back_wall() {
        let scene = SceneId::CornellBox.build(32, 32);
        // Above both boxes and below the light plane, so nothing but the
        // back wall lies along +z.
        let ray = Ray::new(
            Point3::new(278.0, 400.0, -800.0),
            Vec3::new(0.0, 0.0, 1.0),
        );
        let rec = scene
            .root
            .hit(&ray, Interval::new(RAY_T_MIN, f64::INFINITY))
            .expect("axis ray must reach the back wall");
        assert!((rec.t - 1355.0).abs() < 1e-6);
    }

    #[test]
    fn scene_construction_is_deterministic() {
        let a = SceneId::Balls.build(64, 36);
        let b = SceneId::Balls.build(64, 36);
        let probe = Ray::new(Point3::new(13.0, 2.0, 3.0), Vec3::new(-13.0, -1.5, -3.0));
        let range = Interval::new(RAY_T_MIN, f64::INFINITY);
        let ta = a.root.hit(&probe, range).map(|h| h.t);
        let tb = b.root.hit(&probe, range).map(|h| h.t);
        assert_eq!(ta, tb);
    }
}
