//! Linear RGB color type
//!
//! Linear RGB is the input to the OKLab transform. 8-bit sRGB values are
//! decoded through the compile-time gamma table.

use super::gamma::srgb8_to_linear;

/// A color in linear RGB color space.
///
/// Values are in the range 0.0..=1.0 when decoded from 8-bit sRGB.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearRgb {
    /// Red channel (linear light intensity)
    pub r: f32,
    /// Green channel (linear light intensity)
    pub g: f32,
    /// Blue channel (linear light intensity)
    pub b: f32,
}

impl LinearRgb {
    /// Create a new LinearRgb color from linear RGB values.
    #[inline]
    pub fn new(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    /// Decode an 8-bit sRGB triple.
    ///
    /// # Example
    /// ```
    /// use oklab_lut::LinearRgb;
    /// let white = LinearRgb::from_rgb8(255, 255, 255);
    /// assert_eq!(white.r, 1.0);
    /// ```
    #[inline]
    pub fn from_rgb8(r: u8, g: u8, b: u8) -> Self {
        Self {
            r: srgb8_to_linear(r),
            g: srgb8_to_linear(g),
            b: srgb8_to_linear(b),
        }
    }
}
