pub mod canvas;
pub mod config;
pub mod index_image;

pub use canvas::{snap128, CanvasSize, CELL};
pub use config::{AppConfig, ToolsConfig};
pub use index_image::IndexImage;
