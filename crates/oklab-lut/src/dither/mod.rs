//! Pre-quantization dithering.
//!
//! Lookup-table quantization maps each pixel independently, so smooth
//! gradients band into flat regions of one palette entry. An ordered
//! dither pass nudges pixels by a tiled threshold pattern first, breaking
//! those regions into a regular mix of neighbouring entries.
//!
//! Only Bayer 4x4 ordered dithering is provided. Error diffusion would
//! serialize the frame and is not needed for the block-art use case.

mod bayer;
mod options;

pub use bayer::{ordered4, threshold, BAYER_4X4};
pub use options::{DitherMode, DitherOptions, UnknownDitherMode, DEFAULT_DITHER_AMOUNT};
