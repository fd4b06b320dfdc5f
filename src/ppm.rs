//! Plain-ASCII PPM (P3) output.
//!
//! Every pixel is quantized up front, so the byte length of each output
//! chunk is known exactly before any writer runs. The file is then sized
//! once and the body is carved into disjoint per-chunk slices written in
//! parallel — through a memory map on hosts that have one, through
//! buffered writes otherwise.

use crate::error::RenderError;
use crate::math::Color;
use crate::renderer::Framebuffer;
use rayon::prelude::*;
use std::io::Write;
use std::path::Path;
use tracing::debug;

/// Pixels per output chunk; each chunk becomes one parallel write task.
pub const PIXEL_CHUNK: usize = 1024;

/// Quantizes one linear channel: gamma-2 transfer (√x), clamped to
/// [0, 0.999], scaled by 256 and floored. NaN and negative radiance clamp
/// to zero.
#[inline]
fn encode_channel(linear: f64) -> u8 {
    if !(linear > 0.0) {
        return 0;
    }
    let gamma = linear.sqrt();
    (256.0 * gamma.clamp(0.0, 0.999)) as u8
}

#[inline]
fn encode_pixel(c: Color) -> [u8; 3] {
    [encode_channel(c.x), encode_channel(c.y), encode_channel(c.z)]
}

#[inline]
fn digit_count(v: u8) -> usize {
    if v >= 100 {
        3
    } else if v >= 10 {
        2
    } else {
        1
    }
}

/// Exact encoded length of one `r g b\n` line: the digits plus two spaces
/// and the newline.
#[inline]
fn pixel_len(px: [u8; 3]) -> usize {
    digit_count(px[0]) + digit_count(px[1]) + digit_count(px[2]) + 3
}

/// Encodes `pixels` into `out`, which must be sized to their exact total
/// length.
fn write_chunk(mut out: &mut [u8], pixels: &[[u8; 3]]) {
    for px in pixels {
        writeln!(out, "{} {} {}", px[0], px[1], px[2])
            .expect("chunk slice is sized exactly for its pixels");
    }
    debug_assert!(out.is_empty(), "chunk length mismatch");
}

/// Writes the framebuffer to `path` as P3 PPM.
pub fn write_ppm(fb: &Framebuffer, path: &Path) -> Result<(), RenderError> {
    let header = format!("P3\n{} {}\n255\n", fb.width, fb.height);

    let encoded: Vec<[u8; 3]> = fb.pixels.par_iter().map(|c| encode_pixel(*c)).collect();
    let chunk_lens: Vec<usize> = encoded
        .par_chunks(PIXEL_CHUNK)
        .map(|chunk| chunk.iter().map(|px| pixel_len(*px)).sum())
        .collect();
    let total = header.len() + chunk_lens.iter().sum::<usize>();

    write_body(path, &header, &encoded, &chunk_lens, total)?;
    debug!(path = %path.display(), bytes = total, "image written");
    Ok(())
}

#[cfg(feature = "mmap")]
fn write_body(
    path: &Path,
    header: &str,
    encoded: &[[u8; 3]],
    chunk_lens: &[usize],
    total: usize,
) -> Result<(), RenderError> {
    let file = std::fs::File::options()
        .read(true)
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)?;
    file.set_len(total as u64)?;

    // The file was just created and is owned by this call alone; nothing
    // else maps or resizes it while the map is live.
    let mut map = unsafe { memmap2::MmapMut::map_mut(&file)? };
    #[cfg(unix)]
    let _ = map.advise(memmap2::Advice::Sequential);

    let (head, body) = map.split_at_mut(header.len());
    head.copy_from_slice(header.as_bytes());

    // Carve the body into per-chunk slices with exact byte lengths, then
    // let the pool fill them; disjointness comes from the split itself.
    let mut slices = Vec::with_capacity(chunk_lens.len());
    let mut rest = body;
    for &len in chunk_lens {
        let (chunk, tail) = std::mem::take(&mut rest).split_at_mut(len);
        slices.push(chunk);
        rest = tail;
    }
    debug_assert!(rest.is_empty());

    slices
        .into_par_iter()
        .zip(encoded.par_chunks(PIXEL_CHUNK))
        .for_each(|(slice, pixels)| write_chunk(slice, pixels));

    map.flush()?;
    Ok(())
}

#[cfg(not(feature = "mmap"))]
fn write_body(
    path: &Path,
    header: &str,
    encoded: &[[u8; 3]],
    chunk_lens: &[usize],
    _total: usize,
) -> Result<(), RenderError> {
    // Buffered fallback: chunks are still encoded in parallel into exact
    // sized buffers, then streamed out in order.
    let chunks: Vec<Vec<u8>> = encoded
        .par_chunks(PIXEL_CHUNK)
        .zip(chunk_lens.par_iter())
        .map(|(pixels, &len)| {
            let mut buf = vec![0u8; len];
            write_chunk(&mut buf, pixels);
            buf
        })
        .collect();

    let mut out = std::io::BufWriter::new(std::fs::File::create(path)?);
    out.write_all(header.as_bytes())?;
    for chunk in &chunks {
        out.write_all(chunk)?;
    }
    out.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_encoding_applies_gamma_and_clamps() {
        assert_eq!(encode_channel(0.0), 0);
        assert_eq!(encode_channel(-0.5), 0);
        assert_eq!(encode_channel(f64::NAN), 0);
        assert_eq!(encode_channel(f64::INFINITY), 255);
        assert_eq!(encode_channel(1.0), 255);
        // √0.25 = 0.5 → floor(256·0.5) = 128.
        assert_eq!(encode_channel(0.25), 128);
    }

    #[test]
    fn pixel_lengths_count_digits_exactly() {
        assert_eq!(pixel_len([0, 0, 0]), 6);
        assert_eq!(pixel_len([255, 255, 255]), 12);
        assert_eq!(pixel_len([5, 42, 255]), 9);
    }

    #[test]
    fn written_file_matches_the_format() {
        let mut fb = Framebuffer::new(2, 2);
        fb.pixels = vec![
            Color::new(1.0, 0.0, 0.0),
            Color::new(0.0, 0.25, 0.0),
            Color::new(f64::NAN, 1.0, 0.25),
            Color::zero(),
        ];
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.ppm");
        write_ppm(&fb, &path).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(
            contents,
            "P3\n2 2\n255\n255 0 0\n0 128 0\n0 255 128\n0 0 0\n"
        );
    }

    #[test]
    fn file_size_matches_the_precomputed_total() {
        let mut fb = Framebuffer::new(3, 1);
        fb.pixels = vec![
            Color::new(0.9, 0.9, 0.9),
            Color::new(0.01, 0.5, 0.02),
            Color::zero(),
        ];
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sized.ppm");
        write_ppm(&fb, &path).unwrap();

        let expected: usize = "P3\n3 1\n255\n".len()
            + fb.pixels
                .iter()
                .map(|c| pixel_len(encode_pixel(*c)))
                .sum::<usize>();
        assert_eq!(std::fs::metadata(&path).unwrap().len() as usize, expected);
    }
}
