//! Palette types and utilities
//!
//! This module provides the palette loader, the matching set derived from
//! it, and error types for parsing and validation.

mod error;
mod palette;

pub use error::{PaletteError, ParseRowError};
pub use palette::{Palette, PaletteEntry};
