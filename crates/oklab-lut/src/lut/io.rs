//! Saving and loading lookup tables.
//!
//! The on-disk form is chosen from the file name:
//!
//! | Suffix | Format |
//! |--------|--------|
//! | `.npy` | NumPy array, shape `(256, 256, 256)`, `u1` or `<u2` |
//! | `.lut.gz`, `.bin.gz` | gzip of the raw blob |
//! | `.lut`, `.bin`, anything else | raw C-order blob, 16-bit elements little-endian |

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use ndarray::{ArrayD, ArrayView3};
use ndarray_npy::{read_npy, write_npy};

use super::error::LutError;
use super::table::{ColorLut, LutData, LUT_SIDE};

/// On-disk representation of a lookup table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LutFormat {
    /// NumPy `.npy` array
    Npy,
    /// gzip-compressed raw blob
    RawGzip,
    /// Raw blob
    Raw,
}

impl LutFormat {
    /// Pick the format from a file name (case-insensitive).
    pub fn from_path(path: &Path) -> Self {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_lowercase())
            .unwrap_or_default();

        if name.ends_with(".npy") {
            LutFormat::Npy
        } else if name.ends_with(".lut.gz") || name.ends_with(".bin.gz") {
            LutFormat::RawGzip
        } else {
            LutFormat::Raw
        }
    }
}

/// Write `lut` to `path` in the format implied by its name.
pub fn save_lut(lut: &ColorLut, path: impl AsRef<Path>) -> Result<LutFormat, LutError> {
    let path = path.as_ref();
    let format = LutFormat::from_path(path);
    let shape = (LUT_SIDE, LUT_SIDE, LUT_SIDE);

    match format {
        LutFormat::Npy => {
            let written = match lut.data() {
                LutData::U8(cells) => {
                    write_npy(path, &ArrayView3::from_shape(shape, cells.as_slice()).map_err(shape_error)?)
                }
                LutData::U16(cells) => {
                    write_npy(path, &ArrayView3::from_shape(shape, cells.as_slice()).map_err(shape_error)?)
                }
            };
            written.map_err(|e| LutError::Npy(e.to_string()))?;
        }
        LutFormat::RawGzip => {
            let file = File::create(path)?;
            let mut encoder = GzEncoder::new(BufWriter::new(file), Compression::default());
            encoder.write_all(&lut.to_bytes_le())?;
            encoder.finish()?.flush()?;
        }
        LutFormat::Raw => {
            let mut writer = BufWriter::new(File::create(path)?);
            writer.write_all(&lut.to_bytes_le())?;
            writer.flush()?;
        }
    }

    tracing::info!(
        path = %path.display(),
        ?format,
        width = ?lut.width(),
        "Saved LUT"
    );
    Ok(format)
}

/// Read a table written by [`save_lut`] (or by any tool using the same
/// layouts).
///
/// # Errors
///
/// [`LutError::Shape`] if the table is not a 256x256x256 cube of 8- or
/// 16-bit elements.
pub fn load_lut(path: impl AsRef<Path>) -> Result<ColorLut, LutError> {
    let path = path.as_ref();
    let format = LutFormat::from_path(path);

    let lut = match format {
        LutFormat::Npy => load_npy(path)?,
        LutFormat::RawGzip => {
            let mut bytes = Vec::new();
            GzDecoder::new(BufReader::new(File::open(path)?)).read_to_end(&mut bytes)?;
            ColorLut::from_bytes_le(&bytes)?
        }
        LutFormat::Raw => ColorLut::from_bytes_le(&std::fs::read(path)?)?,
    };

    tracing::debug!(path = %path.display(), ?format, width = ?lut.width(), "Loaded LUT");
    Ok(lut)
}

fn shape_error(err: ndarray::ShapeError) -> LutError {
    LutError::Shape(err.to_string())
}

fn load_npy(path: &Path) -> Result<ColorLut, LutError> {
    if !path.is_file() {
        return Err(LutError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("{} not found", path.display()),
        )));
    }

    // The element type is only known from the header, so try 8-bit first
    let data = match read_npy::<_, ArrayD<u8>>(path) {
        Ok(array) => LutData::U8(into_cells(array)?),
        Err(narrow_err) => match read_npy::<_, ArrayD<u16>>(path) {
            Ok(array) => LutData::U16(into_cells(array)?),
            Err(_) => return Err(LutError::Npy(narrow_err.to_string())),
        },
    };
    ColorLut::from_data(data)
}

fn into_cells<T: Copy>(array: ArrayD<T>) -> Result<Vec<T>, LutError> {
    if array.shape() != [LUT_SIDE, LUT_SIDE, LUT_SIDE] {
        return Err(LutError::Shape(format!("array shape is {:?}", array.shape())));
    }
    // Logical iteration order is C order even for Fortran-ordered files
    Ok(array.iter().copied().collect())
}
