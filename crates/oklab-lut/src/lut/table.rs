//! The dense RGB -> palette index table and its parallel builder.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Instant;

use rayon::prelude::*;

use super::error::LutError;
use crate::color::{srgb8_to_linear, LinearRgb, Oklab};
use crate::palette::Palette;

/// Cells per axis.
pub const LUT_SIDE: usize = 256;

/// Cells in one red slice (a full green x blue plane).
pub const SLICE_CELLS: usize = LUT_SIDE * LUT_SIDE;

/// Total number of cells in the cube.
pub const LUT_CELLS: usize = LUT_SIDE * SLICE_CELLS;

/// Slices between progress log lines.
const PROGRESS_EVERY: usize = 32;

/// Storage width of one table element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LutWidth {
    /// One byte per cell; every index must be <= 255
    U8,
    /// Two bytes per cell, little-endian on disk
    U16,
}

impl LutWidth {
    /// The narrowest width that can hold every index the palette can match.
    pub fn for_palette(palette: &Palette) -> Self {
        if palette.max_candidate_index() > u8::MAX as u16 {
            LutWidth::U16
        } else {
            LutWidth::U8
        }
    }

    /// Bytes per element.
    pub fn bytes(self) -> usize {
        match self {
            LutWidth::U8 => 1,
            LutWidth::U16 => 2,
        }
    }
}

/// Table storage, row-major `[r][g][b]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LutData {
    U8(Vec<u8>),
    U16(Vec<u16>),
}

impl LutData {
    fn len(&self) -> usize {
        match self {
            LutData::U8(v) => v.len(),
            LutData::U16(v) => v.len(),
        }
    }
}

/// A dense lookup table mapping every 24-bit RGB color to the original
/// index of its nearest eligible palette entry.
///
/// Immutable once built; share it between workers behind an `Arc`.
///
/// # Example
///
/// ```
/// use std::collections::BTreeSet;
/// use oklab_lut::{ColorLut, LutWidth, Palette};
///
/// let palette = Palette::from_csv("0,0,0,0\n1,255,255,255\n", &BTreeSet::new()).unwrap();
/// let lut = ColorLut::build(&palette, LutWidth::U8).unwrap();
///
/// assert_eq!(lut.get(10, 10, 10), 0);
/// assert_eq!(lut.get(250, 250, 250), 1);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColorLut {
    data: LutData,
}

impl ColorLut {
    /// Wrap existing table data, checking that it covers the whole cube.
    pub fn from_data(data: LutData) -> Result<Self, LutError> {
        if data.len() != LUT_CELLS {
            return Err(LutError::Shape(format!(
                "expected {} cells, found {}",
                LUT_CELLS,
                data.len()
            )));
        }
        Ok(Self { data })
    }

    /// Build the table for `palette`. See [`ColorLut::build_with_cancel`].
    pub fn build(palette: &Palette, width: LutWidth) -> Result<Self, LutError> {
        Self::build_with_cancel(palette, width, &AtomicBool::new(false))
    }

    /// Build the table for `palette`, checking `cancel` before each red
    /// slice.
    ///
    /// Every cell receives the original index of the eligible entry with
    /// the smallest squared Oklab distance; ties go to the lower original
    /// index. Slices are computed in parallel, each worker writing only its
    /// own 256x256 plane.
    ///
    /// # Errors
    ///
    /// - [`LutError::IndexTooWide`] if `width` is `U8` and the palette can
    ///   match an index above 255
    /// - [`LutError::Cancelled`] if `cancel` was set during the build
    pub fn build_with_cancel(
        palette: &Palette,
        width: LutWidth,
        cancel: &AtomicBool,
    ) -> Result<Self, LutError> {
        let max_index = palette.max_candidate_index();
        if width == LutWidth::U8 && max_index > u8::MAX as u16 {
            return Err(LutError::IndexTooWide { index: max_index });
        }

        let started = Instant::now();
        tracing::info!(
            candidates = palette.len(),
            excluded = palette.excluded().len(),
            ?width,
            "Building color LUT"
        );

        let data = match width {
            LutWidth::U8 => {
                let mut cells = vec![0u8; LUT_CELLS];
                // Checked above: every candidate index fits in a byte
                fill_slices(&mut cells, palette, cancel, |idx| idx as u8);
                LutData::U8(cells)
            }
            LutWidth::U16 => {
                let mut cells = vec![0u16; LUT_CELLS];
                fill_slices(&mut cells, palette, cancel, |idx| idx);
                LutData::U16(cells)
            }
        };

        if cancel.load(Ordering::Relaxed) {
            tracing::warn!("LUT build cancelled");
            return Err(LutError::Cancelled);
        }

        tracing::info!(
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Color LUT built"
        );
        Ok(Self { data })
    }

    /// Original palette index for an RGB color.
    #[inline]
    pub fn get(&self, r: u8, g: u8, b: u8) -> u16 {
        let offset = ((r as usize) << 16) | ((g as usize) << 8) | b as usize;
        match &self.data {
            LutData::U8(v) => v[offset] as u16,
            LutData::U16(v) => v[offset],
        }
    }

    /// Element width of the table.
    pub fn width(&self) -> LutWidth {
        match self.data {
            LutData::U8(_) => LutWidth::U8,
            LutData::U16(_) => LutWidth::U16,
        }
    }

    /// Raw table storage.
    pub fn data(&self) -> &LutData {
        &self.data
    }

    /// Flat C-order bytes, multi-byte elements little-endian.
    pub fn to_bytes_le(&self) -> Vec<u8> {
        match &self.data {
            LutData::U8(v) => v.clone(),
            LutData::U16(v) => v.iter().flat_map(|x| x.to_le_bytes()).collect(),
        }
    }

    /// Parse a flat little-endian blob; the element width is inferred from
    /// its length.
    pub fn from_bytes_le(bytes: &[u8]) -> Result<Self, LutError> {
        let data = if bytes.len() == LUT_CELLS {
            LutData::U8(bytes.to_vec())
        } else if bytes.len() == LUT_CELLS * 2 {
            LutData::U16(
                bytes
                    .chunks_exact(2)
                    .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
                    .collect(),
            )
        } else {
            return Err(LutError::Shape(format!(
                "raw table of {} bytes is neither {} (8-bit) nor {} (16-bit)",
                bytes.len(),
                LUT_CELLS,
                LUT_CELLS * 2
            )));
        };
        Ok(Self { data })
    }

    /// Every distinct index stored in the table, ascending.
    pub fn distinct_indices(&self) -> Vec<u16> {
        let mut seen = vec![false; u16::MAX as usize + 1];
        match &self.data {
            LutData::U8(v) => v.iter().for_each(|&x| seen[x as usize] = true),
            LutData::U16(v) => v.iter().for_each(|&x| seen[x as usize] = true),
        }
        seen.iter()
            .enumerate()
            .filter(|&(_, &present)| present)
            .map(|(i, _)| i as u16)
            .collect()
    }
}

/// Fill `cells` slice by slice in parallel.
fn fill_slices<T, F>(cells: &mut [T], palette: &Palette, cancel: &AtomicBool, narrow: F)
where
    T: Copy + Send,
    F: Fn(u16) -> T + Sync,
{
    let finished = AtomicUsize::new(0);

    cells
        .par_chunks_mut(SLICE_CELLS)
        .enumerate()
        .for_each(|(r, slice)| {
            if cancel.load(Ordering::Relaxed) {
                return;
            }

            let lin_r = srgb8_to_linear(r as u8);
            for g in 0..LUT_SIDE {
                let lin_g = srgb8_to_linear(g as u8);
                let row = &mut slice[g * LUT_SIDE..(g + 1) * LUT_SIDE];
                for (b, cell) in row.iter_mut().enumerate() {
                    let lab = Oklab::from(LinearRgb::new(lin_r, lin_g, srgb8_to_linear(b as u8)));
                    *cell = narrow(palette.find_nearest(lab).0);
                }
            }

            let done = finished.fetch_add(1, Ordering::Relaxed) + 1;
            if done % PROGRESS_EVERY == 0 {
                tracing::debug!(slices = done, total = LUT_SIDE, "LUT progress");
            }
        });
}
