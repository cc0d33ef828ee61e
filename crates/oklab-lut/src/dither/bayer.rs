//! Bayer 4x4 ordered dithering.
//!
//! Ordered dithering adds a fixed, tiled offset to every pixel before it is
//! quantized through the lookup table. Flat gradients that would collapse
//! into one palette entry get broken into a regular cross-hatch of the two
//! nearest entries. Each pixel is independent, so rows are processed in
//! parallel.
//!
//! The offset for pixel `(x, y)` is `amount * (BAYER_4X4[y % 4][x % 4] / 16 - 0.5)`,
//! added to the first three channels, rounded half-to-even and clamped to
//! `0..=255`.

use rayon::prelude::*;

/// Classic 4x4 Bayer threshold matrix.
pub const BAYER_4X4: [[u8; 4]; 4] = [
    [0, 8, 2, 10],
    [12, 4, 14, 6],
    [3, 11, 1, 9],
    [15, 7, 13, 5],
];

/// Normalized threshold in `-0.5..0.5` for pixel `(x, y)`.
#[inline]
pub fn threshold(x: usize, y: usize) -> f32 {
    BAYER_4X4[y % 4][x % 4] as f32 / 16.0 - 0.5
}

/// Apply Bayer 4x4 ordered dithering in place.
///
/// `pixels` is an interleaved row-major buffer with `channels` bytes per
/// pixel. Only the first three channels of each pixel are offset; alpha or
/// any further channels pass through. Buffers with fewer than three
/// channels are left unchanged.
///
/// # Panics
///
/// Panics if `pixels.len() != width * height * channels`.
///
/// # Example
///
/// ```
/// use oklab_lut::dither::ordered4;
///
/// let mut rgb = vec![128u8; 4 * 4 * 3];
/// ordered4(&mut rgb, 4, 4, 3, 16.0);
/// // Top-left threshold is 0/16 - 0.5 = -0.5, so 128 - 8 = 120
/// assert_eq!(&rgb[..3], &[120, 120, 120]);
/// ```
pub fn ordered4(pixels: &mut [u8], width: usize, height: usize, channels: usize, amount: f32) {
    assert_eq!(
        pixels.len(),
        width * height * channels,
        "buffer length must equal width * height * channels"
    );
    if channels < 3 || width == 0 || height == 0 {
        return;
    }

    // Offsets are identical for every row with the same y % 4
    let offsets: [[f32; 4]; 4] =
        std::array::from_fn(|ty| std::array::from_fn(|tx| amount * threshold(tx, ty)));

    pixels
        .par_chunks_mut(width * channels)
        .enumerate()
        .for_each(|(y, row)| {
            let row_offsets = &offsets[y % 4];
            for (x, px) in row.chunks_exact_mut(channels).enumerate() {
                let offset = row_offsets[x % 4];
                for c in &mut px[..3] {
                    *c = (*c as f32 + offset).round_ties_even().clamp(0.0, 255.0) as u8;
                }
            }
        });
}
