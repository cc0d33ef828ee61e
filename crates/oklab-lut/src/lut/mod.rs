//! Perceptual color lookup tables.
//!
//! A [`ColorLut`] answers "which palette index is nearest to this RGB
//! color?" with a single array read. Building it is the expensive step:
//! every one of the 256³ colors is compared against every eligible palette
//! entry in Oklab space. Red slices are independent and built in parallel.
//!
//! # Example
//!
//! ```no_run
//! use std::collections::BTreeSet;
//! use oklab_lut::{load_lut, save_lut, ColorLut, LutWidth, Palette};
//!
//! let excluded = BTreeSet::from([0, 1, 2, 3]);
//! let palette = Palette::load("palette.csv", &excluded).unwrap();
//! let lut = ColorLut::build(&palette, LutWidth::for_palette(&palette)).unwrap();
//! save_lut(&lut, "colormap.lut").unwrap();
//!
//! let again = load_lut("colormap.lut").unwrap();
//! assert_eq!(again.get(12, 34, 56), lut.get(12, 34, 56));
//! ```

mod error;
mod io;
mod table;

pub use error::LutError;
pub use io::{load_lut, save_lut, LutFormat};
pub use table::{ColorLut, LutData, LutWidth, LUT_CELLS, LUT_SIDE, SLICE_CELLS};
