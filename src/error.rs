use std::path::PathBuf;

use oklab_lut::{LutError, PaletteError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Palette error: {0}")]
    Palette(#[from] PaletteError),

    #[error("LUT error: {0}")]
    Lut(#[from] LutError),

    #[error("Cannot read image {}: {source}", .path.display())]
    UnreadableImage {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("Payload size mismatch: expected {expected} bytes, got {actual}")]
    SizeMismatch { expected: usize, actual: usize },

    #[error("Palette index {index} does not fit in one byte")]
    IndexOverflow { index: u16 },

    #[error("Canvas too large for container: {width}x{height}")]
    CanvasTooLarge { width: u32, height: u32 },

    #[error("Invalid container: {0}")]
    InvalidContainer(String),

    #[error("{tool} failed: {detail}")]
    UpstreamTool { tool: String, detail: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, PipelineError>;
