//! End-to-end reproducibility: the same scene, seed, and sampler must
//! produce byte-identical image files, run to run and regardless of worker
//! count.

use lumen::renderer::{RenderConfig, Renderer};
use lumen::sampler::SamplerKind;
use lumen::scene::SceneId;

fn render_to_bytes(threads: usize, sampler: SamplerKind) -> Vec<u8> {
    let config = RenderConfig {
        width: 48,
        height: 32,
        samples_per_pixel: 2,
        max_depth: 4,
        threads,
        sampler,
        seed: 1234,
        ..Default::default()
    };
    let scene = SceneId::CornellBox.build(config.width, config.height);
    let (fb, _) = Renderer::new(&scene, &config).render().unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("render.ppm");
    lumen::ppm::write_ppm(&fb, &path).unwrap();
    std::fs::read(&path).unwrap()
}

#[test]
fn identical_seeds_give_identical_files() {
    let first = render_to_bytes(2, SamplerKind::Sobol);
    let second = render_to_bytes(2, SamplerKind::Sobol);
    assert_eq!(first, second);
}

#[test]
fn worker_count_does_not_change_the_image() {
    let serial = render_to_bytes(1, SamplerKind::Sobol);
    let parallel = render_to_bytes(4, SamplerKind::Sobol);
    assert_eq!(serial, parallel);
}

#[test]
fn alternative_samplers_are_reproducible_too() {
    for sampler in [SamplerKind::Stratified, SamplerKind::Independent] {
        let first = render_to_bytes(2, sampler);
        let second = render_to_bytes(2, sampler);
        assert_eq!(first, second, "{sampler:?} must be seed-stable");
    }
}

#[test]
fn header_declares_the_image_dimensions() {
    let bytes = render_to_bytes(1, SamplerKind::Independent);
    let text = String::from_utf8(bytes).unwrap();
    assert!(text.starts_with("P3\n48 32\n255\n"));
    // One `r g b` line per pixel after the three header lines.
    assert_eq!(text.lines().count(), 3 + 48 * 32);
}
