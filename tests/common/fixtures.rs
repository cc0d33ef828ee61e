//! Test fixtures and constants.

use image::{Rgb, RgbImage};

/// Palette used by every integration test
pub const PALETTE_CSV: &str = "\
# index,r,g,b
0,0,0,0
1,255,255,255
2,255,0,0
3,0,0,255
";

/// Palette indices of the fixture colors
pub mod idx {
    pub const BLACK: u16 = 0;
    pub const WHITE: u16 = 1;
    pub const RED: u16 = 2;
    pub const BLUE: u16 = 3;
}

/// A single-color frame
pub fn flat(width: u32, height: u32, rgb: [u8; 3]) -> RgbImage {
    RgbImage::from_pixel(width, height, Rgb(rgb))
}

/// Left half red, right half blue
pub fn split(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, _| {
        if x < width / 2 {
            Rgb([255, 0, 0])
        } else {
            Rgb([0, 0, 255])
        }
    })
}
