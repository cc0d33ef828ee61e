//! Frame containers: the SMRF binary format and the nested-array JSON form.
//!
//! SMRF layout, all multi-byte fields big-endian:
//!
//! ```text
//! offset  size  field
//!      0     4  magic "SMRF"
//!      4     1  version (1)
//!      5     1  flags (bit 0: zlib payload)
//!      6     1  cols = width / 128
//!      7     1  rows = height / 128
//!      8     2  width
//!     10     2  height
//!     12     4  xMin (i32)
//!     16     4  yFix (i32)
//!     20     4  zMin (i32)
//!     24     -  payload: width * height index bytes, row-major
//! ```

use std::fmt;
use std::io::Read;
use std::io::Write;
use std::path::Path;
use std::str::FromStr;

use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use serde::Deserialize;

use crate::error::{PipelineError, Result};
use crate::models::{IndexImage, CELL};

pub const SMRF_MAGIC: [u8; 4] = *b"SMRF";
pub const SMRF_VERSION: u8 = 1;
pub const SMRF_HEADER_LEN: usize = 24;

/// Flag bit marking a zlib-compressed payload
pub const FLAG_ZLIB: u8 = 0x01;

/// World placement written into the SMRF header; not interpreted here
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Origin {
    #[serde(rename = "x")]
    pub x_min: i32,
    #[serde(rename = "y")]
    pub y_fix: i32,
    #[serde(rename = "z")]
    pub z_min: i32,
}

impl Default for Origin {
    fn default() -> Self {
        Self {
            x_min: 0,
            y_fix: 64,
            z_min: 0,
        }
    }
}

/// Decoded SMRF header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SmrfHeader {
    pub version: u8,
    pub flags: u8,
    pub cols: u8,
    pub rows: u8,
    pub width: u16,
    pub height: u16,
    pub origin: Origin,
}

impl SmrfHeader {
    /// Header for an image of the given size.
    ///
    /// Fails with [`PipelineError::CanvasTooLarge`] when a dimension does
    /// not fit its field, and with [`PipelineError::InvalidContainer`] when
    /// the size is not a whole number of cells.
    pub fn for_image(width: u32, height: u32, origin: Origin, compress: bool) -> Result<Self> {
        let too_large = || PipelineError::CanvasTooLarge { width, height };

        let header = Self {
            version: SMRF_VERSION,
            flags: if compress { FLAG_ZLIB } else { 0 },
            cols: u8::try_from(width / CELL).map_err(|_| too_large())?,
            rows: u8::try_from(height / CELL).map_err(|_| too_large())?,
            width: u16::try_from(width).map_err(|_| too_large())?,
            height: u16::try_from(height).map_err(|_| too_large())?,
            origin,
        };
        header.check_cells()?;
        Ok(header)
    }

    /// Width and height must be positive and match the cell counts exactly
    fn check_cells(&self) -> Result<()> {
        let cell = CELL as usize;
        let aligned = self.cols > 0
            && self.rows > 0
            && self.width as usize == self.cols as usize * cell
            && self.height as usize == self.rows as usize * cell;
        if aligned {
            Ok(())
        } else {
            Err(PipelineError::InvalidContainer(format!(
                "{}x{} is not {}x{} cells of {CELL} pixels",
                self.width, self.height, self.cols, self.rows
            )))
        }
    }

    pub fn is_compressed(&self) -> bool {
        self.flags & FLAG_ZLIB != 0
    }

    /// Number of payload bytes after decompression
    pub fn payload_len(&self) -> usize {
        self.width as usize * self.height as usize
    }

    pub fn encode(&self) -> [u8; SMRF_HEADER_LEN] {
        let mut out = [0u8; SMRF_HEADER_LEN];
        out[0..4].copy_from_slice(&SMRF_MAGIC);
        out[4] = self.version;
        out[5] = self.flags;
        out[6] = self.cols;
        out[7] = self.rows;
        out[8..10].copy_from_slice(&self.width.to_be_bytes());
        out[10..12].copy_from_slice(&self.height.to_be_bytes());
        out[12..16].copy_from_slice(&self.origin.x_min.to_be_bytes());
        out[16..20].copy_from_slice(&self.origin.y_fix.to_be_bytes());
        out[20..24].copy_from_slice(&self.origin.z_min.to_be_bytes());
        out
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let header: &[u8; SMRF_HEADER_LEN] = bytes
            .get(..SMRF_HEADER_LEN)
            .and_then(|h| h.try_into().ok())
            .ok_or_else(|| {
                PipelineError::InvalidContainer(format!(
                    "truncated header: {} of {} bytes",
                    bytes.len(),
                    SMRF_HEADER_LEN
                ))
            })?;

        if header[0..4] != SMRF_MAGIC {
            return Err(PipelineError::InvalidContainer(format!(
                "bad magic {:?}",
                String::from_utf8_lossy(&header[0..4])
            )));
        }
        if header[4] != SMRF_VERSION {
            return Err(PipelineError::InvalidContainer(format!(
                "unsupported version {}",
                header[4]
            )));
        }

        let be_u16 = |at: usize| u16::from_be_bytes([header[at], header[at + 1]]);
        let be_i32 = |at: usize| {
            i32::from_be_bytes([header[at], header[at + 1], header[at + 2], header[at + 3]])
        };

        let decoded = Self {
            version: header[4],
            flags: header[5],
            cols: header[6],
            rows: header[7],
            width: be_u16(8),
            height: be_u16(10),
            origin: Origin {
                x_min: be_i32(12),
                y_fix: be_i32(16),
                z_min: be_i32(20),
            },
        };
        decoded.check_cells()?;
        Ok(decoded)
    }
}

impl fmt::Display for SmrfHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "SMRF v{} {}x{} ({}x{} cells) origin=({}, {}, {}) {}",
            self.version,
            self.width,
            self.height,
            self.cols,
            self.rows,
            self.origin.x_min,
            self.origin.y_fix,
            self.origin.z_min,
            if self.is_compressed() { "zlib" } else { "raw" }
        )
    }
}

/// Narrow every index to one byte, reporting the largest one that does not fit
fn index_bytes(image: &IndexImage) -> Result<Vec<u8>> {
    if let Some(index) = image.max_index().filter(|&i| i > u8::MAX as u16) {
        return Err(PipelineError::IndexOverflow { index });
    }
    Ok(image.indices().iter().map(|&index| index as u8).collect())
}

/// Pack a frame into an SMRF container.
pub fn pack_smrf(image: &IndexImage, origin: Origin, compress: bool) -> Result<Vec<u8>> {
    let header = SmrfHeader::for_image(image.width(), image.height(), origin, compress)?;
    let payload = index_bytes(image)?;
    if payload.len() != header.payload_len() {
        return Err(PipelineError::SizeMismatch {
            expected: header.payload_len(),
            actual: payload.len(),
        });
    }

    let mut out = Vec::with_capacity(SMRF_HEADER_LEN + payload.len());
    out.extend_from_slice(&header.encode());
    if compress {
        let mut encoder = ZlibEncoder::new(out, Compression::default());
        encoder.write_all(&payload)?;
        out = encoder.finish()?;
    } else {
        out.extend_from_slice(&payload);
    }
    Ok(out)
}

/// Decode an SMRF container into its header and raw index payload.
pub fn unpack_smrf(bytes: &[u8]) -> Result<(SmrfHeader, Vec<u8>)> {
    let header = SmrfHeader::decode(bytes)?;
    let body = &bytes[SMRF_HEADER_LEN..];
    let expected = header.payload_len();

    let payload = if header.is_compressed() {
        let mut payload = Vec::with_capacity(expected);
        // Read one byte past the expected size so oversized payloads are detected
        ZlibDecoder::new(body)
            .take(expected as u64 + 1)
            .read_to_end(&mut payload)
            .map_err(|e| PipelineError::InvalidContainer(format!("zlib payload: {e}")))?;
        payload
    } else {
        body.to_vec()
    };

    if payload.len() != expected {
        return Err(PipelineError::SizeMismatch {
            expected,
            actual: payload.len(),
        });
    }
    Ok((header, payload))
}

/// Summary of a decoded one-byte payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PayloadStats {
    pub pixels: usize,
    pub distinct: usize,
    pub min: u8,
    pub max: u8,
    /// Most frequent index and its count; ties go to the lower index
    pub most_common: (u8, usize),
}

impl PayloadStats {
    pub fn from_payload(payload: &[u8]) -> Option<Self> {
        if payload.is_empty() {
            return None;
        }
        let mut counts = [0usize; 256];
        for &b in payload {
            counts[b as usize] += 1;
        }

        let present = || counts.iter().enumerate().filter(|&(_, &n)| n > 0);
        let (min, _) = present().next()?;
        let (max, _) = present().last()?;
        let (common, &common_count) = present()
            .max_by(|a, b| a.1.cmp(b.1).then(b.0.cmp(&a.0)))?;

        Some(Self {
            pixels: payload.len(),
            distinct: present().count(),
            min: min as u8,
            max: max as u8,
            most_common: (common as u8, common_count),
        })
    }
}

/// Nested-array JSON form: `height` arrays of `width` indices, no whitespace.
pub fn pack_text(image: &IndexImage) -> Result<String> {
    let rows: Vec<&[u16]> = image.rows().collect();
    Ok(serde_json::to_string(&rows)?)
}

/// Output container selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Smrf,
    #[default]
    Json,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Smrf => "smrf",
            OutputFormat::Json => "json",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "smrf" => Ok(OutputFormat::Smrf),
            "json" => Ok(OutputFormat::Json),
            other => Err(format!("unknown format '{other}' (expected 'smrf' or 'json')")),
        }
    }
}

/// Everything needed to serialize a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputSettings {
    pub format: OutputFormat,
    pub compress: bool,
    pub origin: Origin,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            format: OutputFormat::default(),
            compress: true,
            origin: Origin::default(),
        }
    }
}

impl OutputSettings {
    /// Serialize a frame in the configured format
    pub fn encode(&self, image: &IndexImage) -> Result<Vec<u8>> {
        match self.format {
            OutputFormat::Smrf => pack_smrf(image, self.origin, self.compress),
            OutputFormat::Json => pack_text(image).map(String::into_bytes),
        }
    }

    /// Serialize a frame and write it to `path`, creating parent directories
    pub fn write(&self, image: &IndexImage, path: &Path) -> Result<()> {
        let bytes = self.encode(image)?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, bytes)?;
        Ok(())
    }
}
