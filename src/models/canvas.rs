use std::fmt;

/// Edge length of one map cell in pixels. Every canvas is a whole number of cells.
pub const CELL: u32 = 128;

// Largest cell count whose pixel size still fits in a u32
const MAX_CELLS: f64 = (u32::MAX / CELL) as f64;

/// Round `n` to the nearest multiple of 128, never below 128.
///
/// Halfway cases round to the even multiple: `snap128(192.0) == 256` and
/// `snap128(320.0) == 256`.
pub fn snap128(n: f64) -> u32 {
    // max() also maps NaN to a single cell
    let cells = (n / CELL as f64).round_ties_even().max(1.0).min(MAX_CELLS);
    cells as u32 * CELL
}

/// Target size for every frame of a batch, in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CanvasSize {
    pub width: u32,
    pub height: u32,
}

impl CanvasSize {
    /// Smallest canvas: a single cell
    pub const SINGLE: Self = Self {
        width: CELL,
        height: CELL,
    };

    /// Build a canvas from explicit dimensions; both must be positive
    /// multiples of 128.
    pub fn new(width: u32, height: u32) -> Option<Self> {
        let valid = |n: u32| n > 0 && n % CELL == 0;
        (valid(width) && valid(height)).then_some(Self { width, height })
    }

    /// Decide the canvas from the source dimensions of the first frame and
    /// the optional user request.
    ///
    /// - neither given: snap the source size
    /// - one given: scale the other side proportionally, then snap both
    /// - both given: snap both, ignoring the source aspect ratio
    pub fn decide(src_w: u32, src_h: u32, user_w: Option<u32>, user_h: Option<u32>) -> Self {
        // Zero-sized sources would divide by zero; treat them as one pixel
        let (src_w, src_h) = (src_w.max(1) as f64, src_h.max(1) as f64);

        let (w, h) = match (user_w, user_h) {
            (None, None) => (src_w, src_h),
            (Some(w), None) => {
                let w = w as f64;
                (w, src_h * (w / src_w))
            }
            (None, Some(h)) => {
                let h = h as f64;
                (src_w * (h / src_h), h)
            }
            (Some(w), Some(h)) => (w as f64, h as f64),
        };

        Self {
            width: snap128(w),
            height: snap128(h),
        }
    }

    /// Number of 128-pixel cells across
    pub fn cols(&self) -> u32 {
        self.width / CELL
    }

    /// Number of 128-pixel cells down
    pub fn rows(&self) -> u32 {
        self.height / CELL
    }
}

impl fmt::Display for CanvasSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}
