use std::path::{Path, PathBuf};
use std::str::FromStr;

use oklab_lut::{DitherMode, DEFAULT_DITHER_AMOUNT};
use serde::{Deserialize, Deserializer};

use crate::services::container::{Origin, OutputFormat};

/// Application configuration loaded from an optional YAML file.
///
/// Every key is optional; command-line flags override these values.
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    /// Lookup table used by `generate`
    pub lut: PathBuf,

    /// Dithering pass before quantization
    #[serde(deserialize_with = "from_str")]
    pub dither: DitherMode,

    /// Strength of the ordered dither
    pub dither_amount: f32,

    /// Pixel-art style resizing
    pub pixelate: bool,

    /// Output container
    pub format: OutputFormat,

    /// zlib-compress SMRF payloads
    pub compress: bool,

    /// World placement written into SMRF headers
    pub origin: Origin,

    /// External programs used by `extract`
    pub tools: ToolsConfig,
}

/// Names or paths of the external video tools
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct ToolsConfig {
    pub ffmpeg: String,
    pub ffprobe: String,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            ffmpeg: "ffmpeg".to_string(),
            ffprobe: "ffprobe".to_string(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            lut: PathBuf::from("colormap_oklab.npy"),
            dither: DitherMode::Ordered4,
            dither_amount: DEFAULT_DITHER_AMOUNT,
            pixelate: false,
            format: OutputFormat::Json,
            compress: true,
            origin: Origin::default(),
            tools: ToolsConfig::default(),
        }
    }
}

fn from_str<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let raw = String::deserialize(deserializer)?;
    raw.parse().map_err(serde::de::Error::custom)
}

impl AppConfig {
    /// Load configuration from `path`, or defaults when no path is given.
    ///
    /// A file that cannot be read or parsed is reported and replaced by
    /// the defaults.
    pub fn load(path: Option<&Path>) -> Self {
        let Some(path) = path else {
            tracing::debug!("No config file given, using defaults");
            return Self::default();
        };

        match std::fs::read_to_string(path) {
            Ok(content) => match serde_yaml::from_str::<Self>(&content) {
                Ok(config) => {
                    tracing::info!(
                        path = %path.display(),
                        lut = %config.lut.display(),
                        dither = %config.dither,
                        format = %config.format,
                        "Loaded configuration"
                    );
                    config
                }
                Err(e) => {
                    tracing::warn!(%e, path = %path.display(), "Failed to parse config, using defaults");
                    Self::default()
                }
            },
            Err(e) => {
                tracing::warn!(%e, path = %path.display(), "Failed to read config, using defaults");
                Self::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();

        assert_eq!(config.lut, PathBuf::from("colormap_oklab.npy"));
        assert_eq!(config.dither, DitherMode::Ordered4);
        assert_eq!(config.dither_amount, 12.0);
        assert!(!config.pixelate);
        assert_eq!(config.format, OutputFormat::Json);
        assert!(config.compress);
        assert_eq!(
            config.origin,
            Origin {
                x_min: 0,
                y_fix: 64,
                z_min: 0
            }
        );
        assert_eq!(config.tools.ffmpeg, "ffmpeg");
    }

    #[test]
    fn test_deserialize_config() {
        let yaml = r#"
lut: tables/colormap.lut.gz
dither: none
dither_amount: 8.5
pixelate: true
format: smrf
compress: false
origin: { x: -128, y: 70, z: 256 }
tools:
  ffmpeg: /opt/ffmpeg/bin/ffmpeg
"#;

        let config: AppConfig = serde_yaml::from_str(yaml).unwrap();

        assert_eq!(config.lut, PathBuf::from("tables/colormap.lut.gz"));
        assert_eq!(config.dither, DitherMode::None);
        assert_eq!(config.dither_amount, 8.5);
        assert!(config.pixelate);
        assert_eq!(config.format, OutputFormat::Smrf);
        assert!(!config.compress);
        assert_eq!(config.origin.x_min, -128);
        assert_eq!(config.origin.y_fix, 70);
        assert_eq!(config.origin.z_min, 256);
        assert_eq!(config.tools.ffmpeg, "/opt/ffmpeg/bin/ffmpeg");
        // Unset keys keep their defaults
        assert_eq!(config.tools.ffprobe, "ffprobe");
    }

    #[test]
    fn test_partial_origin_keeps_defaults() {
        let config: AppConfig = serde_yaml::from_str("origin: { x: 5 }").unwrap();
        assert_eq!(config.origin.x_min, 5);
        assert_eq!(config.origin.y_fix, 64);
    }

    #[test]
    fn test_unknown_dither_rejected() {
        let result = serde_yaml::from_str::<AppConfig>("dither: floyd");
        assert!(result.is_err());
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig::load(Some(&dir.path().join("missing.yaml")));
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn test_load_invalid_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "compress: [not, a, bool]").unwrap();
        assert_eq!(AppConfig::load(Some(&path)), AppConfig::default());
    }

    #[test]
    fn test_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "format: smrf\n").unwrap();
        let config = AppConfig::load(Some(&path));
        assert_eq!(config.format, OutputFormat::Smrf);
        assert_eq!(config.dither, DitherMode::Ordered4);
    }

    #[test]
    fn test_load_none() {
        assert_eq!(AppConfig::load(None), AppConfig::default());
    }
}
