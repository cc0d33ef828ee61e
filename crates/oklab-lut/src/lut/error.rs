//! Error type for LUT construction and LUT file I/O.

use std::fmt;

/// Error type for building, loading and saving color lookup tables.
#[derive(Debug)]
pub enum LutError {
    /// The table is not a 256x256x256 cube
    Shape(String),
    /// A palette index does not fit the requested element width
    IndexTooWide {
        /// Largest candidate index in the palette
        index: u16,
    },
    /// The build was cancelled between slices
    Cancelled,
    /// Reading or writing a table file failed
    Io(std::io::Error),
    /// The NumPy array file could not be read or written
    Npy(String),
}

impl From<std::io::Error> for LutError {
    fn from(err: std::io::Error) -> Self {
        LutError::Io(err)
    }
}

impl fmt::Display for LutError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LutError::Shape(detail) => {
                write!(f, "LUT must be a 256x256x256 cube: {}", detail)
            }
            LutError::IndexTooWide { index } => {
                write!(
                    f,
                    "palette index {} does not fit an 8-bit LUT (use 16-bit elements)",
                    index
                )
            }
            LutError::Cancelled => write!(f, "LUT build cancelled"),
            LutError::Io(err) => write!(f, "LUT file error: {}", err),
            LutError::Npy(detail) => write!(f, "NumPy LUT error: {}", detail),
        }
    }
}

impl std::error::Error for LutError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LutError::Io(err) => Some(err),
            _ => None,
        }
    }
}
