use crate::sobol::{
    murmur2_mix, next_pow2_scale, sobol_interval_to_index, sobol_sample, Randomizer,
    N_SOBOL_DIMENSIONS, ONE_MINUS_EPSILON,
};
use rand::rngs::SmallRng;
use rand::{Rng, RngCore, SeedableRng};

/// Which pixel-sampling strategy the renderer uses. Sobol is the production
/// default; the other two are kept as configurable alternatives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum SamplerKind {
    /// Owen-scrambled Sobol sequence — best convergence per sample.
    Sobol,
    /// √spp × √spp jittered grid per pixel.
    Stratified,
    /// Plain pseudo-random jitter.
    Independent,
}

/// Per-worker sample source. One instance exists per tile task; all of its
/// state is derived from (seed, pixel, sample index), so renders are
/// reproducible regardless of how tiles land on threads.
///
/// Between `start_pixel_sample` calls the sampler is idle; the `get_*`
/// accessors may only be called while a pixel sample is open.
pub enum Sampler {
    Independent(IndependentSampler),
    Stratified(StratifiedSampler),
    Sobol(SobolSampler),
}

impl Sampler {
    pub fn new(kind: SamplerKind, width: u32, height: u32, spp: u32, seed: u64) -> Self {
        match kind {
            SamplerKind::Independent => Sampler::Independent(IndependentSampler::new(seed)),
            SamplerKind::Stratified => Sampler::Stratified(StratifiedSampler::new(spp, seed)),
            SamplerKind::Sobol => Sampler::Sobol(SobolSampler::new(width, height, seed)),
        }
    }

    /// Opens sample `sample_index` of `pixel`, resetting the dimension
    /// counter.
    pub fn start_pixel_sample(&mut self, pixel: (u32, u32), sample_index: u32) {
        match self {
            Sampler::Independent(s) => s.start_pixel_sample(pixel, sample_index),
            Sampler::Stratified(s) => s.start_pixel_sample(pixel, sample_index),
            Sampler::Sobol(s) => s.start_pixel_sample(pixel, sample_index),
        }
    }

    pub fn get_1d(&mut self) -> f64 {
        match self {
            Sampler::Independent(s) => s.rng.gen(),
            Sampler::Stratified(s) => s.rng.gen(),
            Sampler::Sobol(s) => s.next_dimension(),
        }
    }

    pub fn get_2d(&mut self) -> (f64, f64) {
        (self.get_1d(), self.get_1d())
    }

    /// The sample's position inside its pixel, in [0, 1)².
    pub fn get_pixel_2d(&mut self) -> (f64, f64) {
        match self {
            Sampler::Independent(s) => (s.rng.gen(), s.rng.gen()),
            Sampler::Stratified(s) => s.pixel_offset(),
            Sampler::Sobol(s) => s.pixel_offset(),
        }
    }
}

/// The sampler doubles as an RNG so materials and pdfs can draw from it
/// through `&mut dyn RngCore` without knowing which strategy is active.
impl RngCore for Sampler {
    fn next_u32(&mut self) -> u32 {
        (self.get_1d() * 4294967296.0) as u32
    }

    fn next_u64(&mut self) -> u64 {
        ((self.next_u32() as u64) << 32) | self.next_u32() as u64
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        for chunk in dest.chunks_mut(4) {
            let bytes = self.next_u32().to_le_bytes();
            chunk.copy_from_slice(&bytes[..chunk.len()]);
        }
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.fill_bytes(dest);
        Ok(())
    }
}

/// Mixes the render seed with the pixel/sample coordinates into a stream
/// seed, so every pixel sample owns an independent deterministic stream.
fn stream_seed(seed: u64, pixel: (u32, u32), sample_index: u32) -> u64 {
    let key = ((pixel.0 as u64) << 40) ^ ((pixel.1 as u64) << 20) ^ sample_index as u64;
    seed ^ key.wrapping_mul(0x9e37_79b9_7f4a_7c15)
}

// ─── Independent ────────────────────────────────────────────────────────────

pub struct IndependentSampler {
    seed: u64,
    rng: SmallRng,
}

impl IndependentSampler {
    fn new(seed: u64) -> Self {
        Self {
            seed,
            rng: SmallRng::seed_from_u64(seed),
        }
    }

    fn start_pixel_sample(&mut self, pixel: (u32, u32), sample_index: u32) {
        self.rng = SmallRng::seed_from_u64(stream_seed(self.seed, pixel, sample_index));
    }
}

// ─── Stratified ─────────────────────────────────────────────────────────────

/// Splits the pixel into a √spp × √spp grid and jitters one sample per
/// cell. Sample counts that are not perfect squares spill the remainder
/// uniformly over the grid.
pub struct StratifiedSampler {
    seed: u64,
    sqrt_spp: u32,
    cell: (u32, u32),
    rng: SmallRng,
}

impl StratifiedSampler {
    fn new(spp: u32, seed: u64) -> Self {
        let sqrt_spp = ((spp as f64).sqrt() as u32).max(1);
        Self {
            seed,
            sqrt_spp,
            cell: (0, 0),
            rng: SmallRng::seed_from_u64(seed),
        }
    }

    fn start_pixel_sample(&mut self, pixel: (u32, u32), sample_index: u32) {
        let wrapped = sample_index % (self.sqrt_spp * self.sqrt_spp);
        self.cell = (wrapped / self.sqrt_spp, wrapped % self.sqrt_spp);
        self.rng = SmallRng::seed_from_u64(stream_seed(self.seed, pixel, sample_index));
    }

    fn pixel_offset(&mut self) -> (f64, f64) {
        let inv = 1.0 / self.sqrt_spp as f64;
        (
            (self.cell.0 as f64 + self.rng.gen::<f64>()) * inv,
            (self.cell.1 as f64 + self.rng.gen::<f64>()) * inv,
        )
    }
}

// ─── Sobol with Owen-Fast Scrambling ────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SamplerState {
    Idle,
    InPixel,
}

/// Global Sobol sequence sampler. Each pixel sample maps to one index of
/// the global sequence via the van der Corput interval lookup; dimensions 0
/// and 1 carry the pixel position and stay unscrambled, dimensions 2+ are
/// Owen-scrambled with per-dimension seeds hashed from a per-pixel seed.
pub struct SobolSampler {
    seed: u32,
    scale: u32,
    log2_scale: u32,
    pixel: (u32, u32),
    pixel_seed: u32,
    sobol_index: u64,
    dimension: usize,
    state: SamplerState,
}

impl SobolSampler {
    fn new(width: u32, height: u32, seed: u64) -> Self {
        let (scale, log2_scale) = next_pow2_scale(width.max(height));
        Self {
            seed: seed as u32,
            scale,
            log2_scale,
            pixel: (0, 0),
            pixel_seed: 0,
            sobol_index: 0,
            dimension: 2,
            state: SamplerState::Idle,
        }
    }

    fn start_pixel_sample(&mut self, pixel: (u32, u32), sample_index: u32) {
        self.pixel = pixel;
        self.pixel_seed = murmur2_mix(pixel.0, murmur2_mix(pixel.1, self.seed));
        self.sobol_index =
            sobol_interval_to_index(self.log2_scale, sample_index as u64, pixel);
        self.dimension = 2;
        self.state = SamplerState::InPixel;
    }

    fn next_dimension(&mut self) -> f64 {
        debug_assert_eq!(self.state, SamplerState::InPixel);
        // Past the matrix table the counter wraps back to dimension 2.
        if self.dimension >= N_SOBOL_DIMENSIONS {
            self.dimension = 2;
        }
        let randomizer = Randomizer::FastOwen {
            seed: murmur2_mix(self.dimension as u32, self.pixel_seed),
        };
        let value = sobol_sample(self.sobol_index, self.dimension, randomizer);
        self.dimension += 1;
        value
    }

    fn pixel_offset(&mut self) -> (f64, f64) {
        debug_assert_eq!(self.state, SamplerState::InPixel);
        let scale = self.scale as f64;
        let u = sobol_sample(self.sobol_index, 0, Randomizer::None) * scale
            - self.pixel.0 as f64;
        let v = sobol_sample(self.sobol_index, 1, Randomizer::None) * scale
            - self.pixel.1 as f64;
        (
            u.clamp(0.0, ONE_MINUS_EPSILON),
            v.clamp(0.0, ONE_MINUS_EPSILON),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sobol(width: u32, height: u32, seed: u64) -> Sampler {
        Sampler::new(SamplerKind::Sobol, width, height, 16, seed)
    }

    #[test]
    fn sobol_pixel_offsets_stay_in_the_unit_square() {
        for (w, h) in [(7, 5), (640, 360), (4096, 4096)] {
            let mut sampler = sobol(w, h, 1);
            for py in (0..h).step_by((h as usize / 4).max(1)) {
                for px in (0..w).step_by((w as usize / 4).max(1)) {
                    for s in 0..8 {
                        sampler.start_pixel_sample((px, py), s);
                        let (u, v) = sampler.get_pixel_2d();
                        assert!((0.0..1.0).contains(&u), "{w}x{h} ({px},{py})#{s}: u={u}");
                        assert!((0.0..1.0).contains(&v), "{w}x{h} ({px},{py})#{s}: v={v}");
                    }
                }
            }
        }
    }

    #[test]
    fn sobol_streams_are_reproducible() {
        let mut a = sobol(128, 128, 7);
        let mut b = sobol(128, 128, 7);
        a.start_pixel_sample((17, 23), 3);
        b.start_pixel_sample((17, 23), 3);
        for _ in 0..8 {
            assert_eq!(a.get_1d(), b.get_1d());
        }

        let mut c = sobol(128, 128, 8);
        c.start_pixel_sample((17, 23), 3);
        let (mut a_vals, mut c_vals) = (Vec::new(), Vec::new());
        a.start_pixel_sample((17, 23), 3);
        for _ in 0..4 {
            a_vals.push(a.get_1d());
            c_vals.push(c.get_1d());
        }
        assert_ne!(a_vals, c_vals, "different seeds must scramble differently");
    }

    #[test]
    fn sobol_dimension_counter_wraps_without_panicking() {
        let mut sampler = sobol(64, 64, 3);
        sampler.start_pixel_sample((1, 1), 0);
        for _ in 0..(N_SOBOL_DIMENSIONS * 3) {
            let v = sampler.get_1d();
            assert!((0.0..1.0).contains(&v));
        }
    }

    #[test]
    fn stratified_cells_partition_the_pixel() {
        let mut sampler = Sampler::new(SamplerKind::Stratified, 8, 8, 4, 5);
        let mut quadrants = [false; 4];
        for s in 0..4 {
            sampler.start_pixel_sample((0, 0), s);
            let (u, v) = sampler.get_pixel_2d();
            let q = (u >= 0.5) as usize * 2 + (v >= 0.5) as usize;
            quadrants[q] = true;
        }
        assert_eq!(quadrants, [true; 4]);
    }

    #[test]
    fn independent_sampler_is_reproducible_per_seed() {
        let mut a = Sampler::new(SamplerKind::Independent, 8, 8, 1, 9);
        let mut b = Sampler::new(SamplerKind::Independent, 8, 8, 1, 9);
        a.start_pixel_sample((3, 4), 0);
        b.start_pixel_sample((3, 4), 0);
        assert_eq!(a.get_2d(), b.get_2d());
    }

    #[test]
    fn rng_adapter_yields_unit_floats() {
        use rand::Rng;
        let mut sampler = sobol(32, 32, 11);
        sampler.start_pixel_sample((2, 2), 1);
        for _ in 0..16 {
            let v: f64 = sampler.gen();
            assert!((0.0..1.0).contains(&v));
        }
    }
}
