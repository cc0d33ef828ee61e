//! Error types for palette operations
//!
//! This module provides error types for palette record parsing and palette
//! validation.

use std::fmt;
use std::num::ParseIntError;

/// Why a single `index,r,g,b` record was rejected.
#[derive(Debug, Clone, PartialEq)]
pub enum ParseRowError {
    /// Fewer than four comma-separated fields
    MissingFields {
        /// Number of fields actually present
        found: usize,
    },
    /// A field is not an integer
    InvalidNumber(ParseIntError),
    /// Palette index does not fit the 16-bit index domain
    IndexOutOfRange(i64),
    /// A color channel is outside 0..=255
    ChannelOutOfRange(i64),
    /// The index was already defined on an earlier line
    DuplicateIndex {
        /// The repeated palette index
        index: u16,
        /// Line of the first definition (1-based)
        first_line: usize,
    },
}

impl From<ParseIntError> for ParseRowError {
    fn from(err: ParseIntError) -> Self {
        ParseRowError::InvalidNumber(err)
    }
}

impl fmt::Display for ParseRowError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseRowError::MissingFields { found } => {
                write!(f, "expected 4 fields (index,r,g,b), found {}", found)
            }
            ParseRowError::InvalidNumber(err) => write!(f, "invalid number: {}", err),
            ParseRowError::IndexOutOfRange(v) => {
                write!(f, "palette index {} outside 0..=65535", v)
            }
            ParseRowError::ChannelOutOfRange(v) => {
                write!(f, "color channel {} outside 0..=255", v)
            }
            ParseRowError::DuplicateIndex { index, first_line } => {
                write!(
                    f,
                    "duplicate palette index {} (first defined on line {})",
                    index, first_line
                )
            }
        }
    }
}

impl std::error::Error for ParseRowError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ParseRowError::InvalidNumber(err) => Some(err),
            _ => None,
        }
    }
}

/// Error type for palette loading and validation.
#[derive(Debug)]
pub enum PaletteError {
    /// A record could not be parsed
    Parse {
        /// 1-based line number of the offending record
        line: usize,
        /// What was wrong with it
        reason: ParseRowError,
    },
    /// No entries remain eligible for matching
    EmptyPalette {
        /// Number of entries before exclusion
        total: usize,
        /// Number of entries removed by the exclusion set
        excluded: usize,
    },
    /// The palette file could not be read
    Io(std::io::Error),
}

impl PaletteError {
    /// 1-based line number for parse errors.
    pub fn line(&self) -> Option<usize> {
        match self {
            PaletteError::Parse { line, .. } => Some(*line),
            _ => None,
        }
    }
}

impl From<std::io::Error> for PaletteError {
    fn from(err: std::io::Error) -> Self {
        PaletteError::Io(err)
    }
}

impl fmt::Display for PaletteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PaletteError::Parse { line, reason } => {
                write!(f, "palette line {}: {}", line, reason)
            }
            PaletteError::EmptyPalette { total, excluded } => {
                write!(
                    f,
                    "no eligible palette entries ({} defined, {} excluded)",
                    total, excluded
                )
            }
            PaletteError::Io(err) => write!(f, "cannot read palette: {}", err),
        }
    }
}

impl std::error::Error for PaletteError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PaletteError::Parse { reason, .. } => Some(reason),
            PaletteError::Io(err) => Some(err),
            _ => None,
        }
    }
}
