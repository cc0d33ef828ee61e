// Generated gamma table carries more digits than f32 can hold
#![allow(
    clippy::excessive_precision,
    clippy::needless_range_loop,
    clippy::module_inception
)]

//! oklab-lut: perceptual nearest-palette lookup tables
//!
//! This library maps 24-bit sRGB colors onto a fixed, indexed palette using
//! squared Euclidean distance in OKLab. Because the palette is fixed, the
//! whole answer can be precomputed once into a dense 256x256x256 table and
//! every later frame is quantized with one array read per pixel.
//!
//! # Quick Start
//!
//! ```
//! use std::collections::BTreeSet;
//! use oklab_lut::{ColorLut, LutWidth, Palette};
//!
//! let csv = "0,0,0,0\n1,255,255,255\n";
//! let palette = Palette::from_csv(csv, &BTreeSet::new()).unwrap();
//! let lut = ColorLut::build(&palette, LutWidth::for_palette(&palette)).unwrap();
//!
//! assert_eq!(lut.get(10, 10, 10), 0);
//! assert_eq!(lut.get(250, 250, 250), 1);
//! ```
//!
//! # Palettes
//!
//! A palette is a CSV of `index,r,g,b` records. Indices need not be
//! contiguous. Some indices can be excluded from matching (for example
//! entries that render transparently on the target device); they keep
//! their slot in the palette but are never produced by [`Palette::find_nearest`]
//! or by a table built from it.
//!
//! # Color Science
//!
//! | Color Space | Used For |
//! |-------------|----------|
//! | **sRGB** | Palette files, image pixels, table coordinates |
//! | **Linear RGB** | Intermediate step, exact IEC 61966-2-1 decode |
//! | **OKLab** | Distance metric for palette matching |
//!
//! Distances are compared squared; the square root never changes which
//! candidate wins. Ties go to the lower original palette index.
//!
//! # Lookup Tables
//!
//! [`ColorLut`] stores one element per RGB color in `[r][g][b]` order, 8 or
//! 16 bits wide. [`save_lut`] and [`load_lut`] read and write NumPy `.npy`,
//! raw blobs and gzip-compressed raw blobs.
//!
//! # Dithering
//!
//! [`ordered4`] applies a Bayer 4x4 ordered dither to an interleaved pixel
//! buffer before it is quantized, trading flat banding for a fine regular
//! pattern.

pub mod color;
pub mod dither;
pub mod lut;
pub mod palette;

pub use color::{srgb8_to_linear, LinearRgb, Oklab};
pub use dither::{ordered4, DitherMode, DitherOptions, DEFAULT_DITHER_AMOUNT};
pub use lut::{load_lut, save_lut, ColorLut, LutData, LutError, LutFormat, LutWidth};
pub use palette::{Palette, PaletteEntry, PaletteError, ParseRowError};
