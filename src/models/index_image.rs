use crate::error::{PipelineError, Result};

/// A quantized frame: one original palette index per pixel, row-major
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexImage {
    width: u32,
    height: u32,
    indices: Vec<u16>,
}

impl IndexImage {
    pub fn new(width: u32, height: u32, indices: Vec<u16>) -> Result<Self> {
        let expected = width as usize * height as usize;
        if indices.len() != expected {
            return Err(PipelineError::SizeMismatch {
                expected,
                actual: indices.len(),
            });
        }
        Ok(Self {
            width,
            height,
            indices,
        })
    }

    /// Wrap indices whose length is already known to match
    pub(crate) fn from_raw(width: u32, height: u32, indices: Vec<u16>) -> Self {
        debug_assert_eq!(indices.len(), width as usize * height as usize);
        Self {
            width,
            height,
            indices,
        }
    }

    /// Image filled with a single index
    pub fn filled(width: u32, height: u32, index: u16) -> Self {
        Self {
            width,
            height,
            indices: vec![index; width as usize * height as usize],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn indices(&self) -> &[u16] {
        &self.indices
    }

    pub fn get(&self, x: u32, y: u32) -> Option<u16> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.indices
            .get(y as usize * self.width as usize + x as usize)
            .copied()
    }

    /// Iterate over rows from top to bottom
    pub fn rows(&self) -> impl Iterator<Item = &[u16]> {
        // chunks(0) panics; an empty image has no rows anyway
        self.indices.chunks(self.width.max(1) as usize)
    }

    /// Largest index in the image, if any
    pub fn max_index(&self) -> Option<u16> {
        self.indices.iter().copied().max()
    }
}
