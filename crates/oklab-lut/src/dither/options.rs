//! Dithering options and configuration.
//!
//! This module provides [`DitherMode`] and the [`DitherOptions`] struct that
//! pairs a mode with its strength.

use std::fmt;
use std::str::FromStr;

use super::bayer::ordered4;

/// Offset amplitude used when none is configured.
pub const DEFAULT_DITHER_AMOUNT: f32 = 12.0;

/// Which dithering pass runs before quantization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DitherMode {
    /// Quantize pixels as they are
    None,
    /// Bayer 4x4 ordered dithering (default)
    #[default]
    Ordered4,
}

impl DitherMode {
    /// Name as accepted by [`FromStr`].
    pub fn as_str(self) -> &'static str {
        match self {
            DitherMode::None => "none",
            DitherMode::Ordered4 => "ordered4",
        }
    }
}

impl fmt::Display for DitherMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unrecognized dither mode name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownDitherMode(pub String);

impl fmt::Display for UnknownDitherMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "unknown dither mode '{}' (expected 'none' or 'ordered4')",
            self.0
        )
    }
}

impl std::error::Error for UnknownDitherMode {}

impl FromStr for DitherMode {
    type Err = UnknownDitherMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" | "off" => Ok(DitherMode::None),
            "ordered4" | "bayer4" | "ordered" => Ok(DitherMode::Ordered4),
            _ => Err(UnknownDitherMode(s.to_string())),
        }
    }
}

/// Configuration for the pre-quantization dither pass.
///
/// # Example
///
/// ```
/// use oklab_lut::{DitherMode, DitherOptions};
///
/// let options = DitherOptions::new().amount(8.0);
/// assert_eq!(options.mode, DitherMode::Ordered4);
///
/// let off = DitherOptions::new().mode(DitherMode::None);
/// assert!(!off.is_active());
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DitherOptions {
    /// Dithering pass to run.
    ///
    /// Default: [`DitherMode::Ordered4`]
    pub mode: DitherMode,

    /// Peak-to-peak offset in 8-bit channel units.
    ///
    /// Default: `12.0`
    pub amount: f32,
}

impl Default for DitherOptions {
    fn default() -> Self {
        Self {
            mode: DitherMode::default(),
            amount: DEFAULT_DITHER_AMOUNT,
        }
    }
}

impl DitherOptions {
    /// Create new dither options with default values.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the dithering mode.
    #[inline]
    pub fn mode(mut self, mode: DitherMode) -> Self {
        self.mode = mode;
        self
    }

    /// Set the offset amplitude.
    #[inline]
    pub fn amount(mut self, amount: f32) -> Self {
        self.amount = amount;
        self
    }

    /// Whether [`apply`](Self::apply) would change any pixel.
    pub fn is_active(&self) -> bool {
        self.mode != DitherMode::None && self.amount != 0.0
    }

    /// Run the configured pass over an interleaved pixel buffer in place.
    pub fn apply(&self, pixels: &mut [u8], width: usize, height: usize, channels: usize) {
        match self.mode {
            DitherMode::None => {}
            DitherMode::Ordered4 => ordered4(pixels, width, height, channels, self.amount),
        }
    }
}
