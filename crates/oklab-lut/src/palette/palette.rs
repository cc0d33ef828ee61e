//! Palette loading and nearest-color matching.
//!
//! A palette is an ordered set of `(index, r, g, b)` entries. Some indices
//! may be excluded from matching while keeping their slot in the index
//! space, so the matching side is kept as two parallel arrays: candidate
//! Oklab colors and the original index each candidate stands for.

use std::collections::{BTreeSet, HashMap};
use std::path::Path;

use super::error::{PaletteError, ParseRowError};
use crate::color::Oklab;

/// One palette record: an original palette index and its sRGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaletteEntry {
    /// Index in the target renderer's palette
    pub index: u16,
    /// 8-bit sRGB color
    pub rgb: [u8; 3],
}

impl PaletteEntry {
    pub fn new(index: u16, r: u8, g: u8, b: u8) -> Self {
        Self { index, rgb: [r, g, b] }
    }
}

/// A palette with a precomputed matching set.
///
/// All entries are kept sorted by original index. Entries whose index is in
/// the exclusion set never win a match, but the remaining entries keep
/// their original indices.
///
/// # Example
///
/// ```
/// use std::collections::BTreeSet;
/// use oklab_lut::Palette;
///
/// let csv = "0,0,0,0\n1,255,255,255\n2,255,0,0\n";
/// let excluded = BTreeSet::from([1]);
/// let palette = Palette::from_csv(csv, &excluded).unwrap();
///
/// assert_eq!(palette.entries().len(), 3);
/// assert_eq!(palette.candidate_indices(), &[0, 2]);
/// ```
#[derive(Debug, Clone)]
pub struct Palette {
    // Every parsed entry, sorted by original index
    entries: Vec<PaletteEntry>,

    // Indices removed from matching that were actually present
    excluded: BTreeSet<u16>,

    // Matching set: Oklab colors and the original index of each
    candidate_oklab: Vec<Oklab>,
    candidate_index: Vec<u16>,
}

impl Palette {
    /// Parse a palette from `index,r,g,b` records, one per line.
    ///
    /// Blank lines and lines starting with `#` are skipped. Fields may be
    /// padded with whitespace; columns after the fourth are ignored.
    ///
    /// # Errors
    ///
    /// - [`PaletteError::Parse`] for a malformed record or a repeated index
    /// - [`PaletteError::EmptyPalette`] when no entry survives exclusion
    pub fn from_csv(source: &str, excluded: &BTreeSet<u16>) -> Result<Self, PaletteError> {
        let mut entries = Vec::new();
        let mut first_seen: HashMap<u16, usize> = HashMap::new();

        for (i, raw) in source.lines().enumerate() {
            let line = i + 1;
            let row = raw.trim();
            if row.is_empty() || row.starts_with('#') {
                continue;
            }

            let entry =
                parse_row(row).map_err(|reason| PaletteError::Parse { line, reason })?;

            if let Some(&first_line) = first_seen.get(&entry.index) {
                return Err(PaletteError::Parse {
                    line,
                    reason: ParseRowError::DuplicateIndex {
                        index: entry.index,
                        first_line,
                    },
                });
            }
            first_seen.insert(entry.index, line);
            entries.push(entry);
        }

        Self::build(entries, excluded)
    }

    /// Read and parse a palette file. See [`Palette::from_csv`].
    pub fn load(path: impl AsRef<Path>, excluded: &BTreeSet<u16>) -> Result<Self, PaletteError> {
        let source = std::fs::read_to_string(path)?;
        Self::from_csv(&source, excluded)
    }

    /// Build a palette from in-memory entries.
    ///
    /// Duplicate indices are reported as parse errors whose line is the
    /// 1-based position of the repeated entry.
    pub fn from_entries(
        entries: Vec<PaletteEntry>,
        excluded: &BTreeSet<u16>,
    ) -> Result<Self, PaletteError> {
        let mut first_seen: HashMap<u16, usize> = HashMap::new();
        for (i, entry) in entries.iter().enumerate() {
            if let Some(&first_line) = first_seen.get(&entry.index) {
                return Err(PaletteError::Parse {
                    line: i + 1,
                    reason: ParseRowError::DuplicateIndex {
                        index: entry.index,
                        first_line,
                    },
                });
            }
            first_seen.insert(entry.index, i + 1);
        }
        Self::build(entries, excluded)
    }

    fn build(mut entries: Vec<PaletteEntry>, excluded: &BTreeSet<u16>) -> Result<Self, PaletteError> {
        // Sorting fixes the tie-break order: lower original index wins
        entries.sort_by_key(|e| e.index);

        let present_excluded: BTreeSet<u16> = entries
            .iter()
            .map(|e| e.index)
            .filter(|i| excluded.contains(i))
            .collect();

        let (candidate_oklab, candidate_index): (Vec<Oklab>, Vec<u16>) = entries
            .iter()
            .filter(|e| !excluded.contains(&e.index))
            .map(|e| (Oklab::from_rgb8(e.rgb[0], e.rgb[1], e.rgb[2]), e.index))
            .unzip();

        if candidate_index.is_empty() {
            return Err(PaletteError::EmptyPalette {
                total: entries.len(),
                excluded: present_excluded.len(),
            });
        }

        Ok(Self {
            entries,
            excluded: present_excluded,
            candidate_oklab,
            candidate_index,
        })
    }

    /// All entries, including excluded ones, sorted by original index.
    #[inline]
    pub fn entries(&self) -> &[PaletteEntry] {
        &self.entries
    }

    /// Excluded indices that were present in the palette.
    #[inline]
    pub fn excluded(&self) -> &BTreeSet<u16> {
        &self.excluded
    }

    /// Oklab colors of the eligible entries, in original-index order.
    #[inline]
    pub fn candidate_oklab(&self) -> &[Oklab] {
        &self.candidate_oklab
    }

    /// Original index of each eligible entry, parallel to
    /// [`candidate_oklab()`](Palette::candidate_oklab).
    #[inline]
    pub fn candidate_indices(&self) -> &[u16] {
        &self.candidate_index
    }

    /// Number of entries eligible for matching.
    #[inline]
    pub fn len(&self) -> usize {
        self.candidate_index.len()
    }

    /// Always `false`: palettes without eligible entries are rejected.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.candidate_index.is_empty()
    }

    /// Largest original index any match can produce.
    pub fn max_candidate_index(&self) -> u16 {
        // Candidates are sorted, so the last one is the largest
        self.candidate_index.last().copied().unwrap_or(0)
    }

    /// Find the eligible entry nearest to `color`.
    ///
    /// Returns `(original_index, squared_distance)`. On equal distances the
    /// entry with the lower original index wins.
    #[inline]
    pub fn find_nearest(&self, color: Oklab) -> (u16, f32) {
        let mut best = 0;
        let mut best_dist = f32::MAX;

        for (i, &candidate) in self.candidate_oklab.iter().enumerate() {
            let dist = color.distance_squared(candidate);
            // Strict comparison keeps the earliest candidate on ties
            if dist < best_dist {
                best_dist = dist;
                best = i;
            }
        }

        (self.candidate_index[best], best_dist)
    }
}

fn parse_row(row: &str) -> Result<PaletteEntry, ParseRowError> {
    let fields: Vec<&str> = row.split(',').map(str::trim).collect();
    if fields.len() < 4 {
        return Err(ParseRowError::MissingFields {
            found: fields.len(),
        });
    }

    let index: i64 = fields[0].parse()?;
    let index = u16::try_from(index).map_err(|_| ParseRowError::IndexOutOfRange(index))?;

    let mut rgb = [0u8; 3];
    for (channel, field) in rgb.iter_mut().zip(&fields[1..4]) {
        let value: i64 = field.parse()?;
        *channel = u8::try_from(value).map_err(|_| ParseRowError::ChannelOutOfRange(value))?;
    }

    Ok(PaletteEntry { index, rgb })
}
