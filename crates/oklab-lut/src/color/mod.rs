//! Color types and conversion utilities
//!
//! 8-bit sRGB triples are linearized through an exact 256-entry table and
//! then projected into OKLab, where squared Euclidean distance is used for
//! palette matching.
//!
//! # Example
//!
//! ```
//! use oklab_lut::{LinearRgb, Oklab};
//!
//! let linear = LinearRgb::from_rgb8(128, 64, 32);
//! let lab = Oklab::from(linear);
//! assert_eq!(lab, Oklab::from_rgb8(128, 64, 32));
//! ```

mod gamma;
mod linear_rgb;
mod oklab;

pub use gamma::srgb8_to_linear;
pub use linear_rgb::LinearRgb;
pub use oklab::Oklab;
