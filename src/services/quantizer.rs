use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::Arc;

use image::imageops::FilterType;
use image::{DynamicImage, ImageReader, RgbImage};
use oklab_lut::{ColorLut, DitherOptions};
use rayon::prelude::*;

use crate::error::{PipelineError, Result};
use crate::models::{CanvasSize, IndexImage};

/// Pixelate mode shrinks to a third before upscaling
const PIXELATE_FACTOR: u32 = 3;

/// Per-frame processing options
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct QuantizeOptions {
    pub dither: DitherOptions,
    /// Shrink then upscale with nearest-neighbour for a blocky look
    pub pixelate: bool,
}

/// Turns decoded images into frames of palette indices.
///
/// The lookup table is shared read-only, so one quantizer serves every
/// worker of a batch.
pub struct FrameQuantizer {
    lut: Arc<ColorLut>,
    options: QuantizeOptions,
}

impl FrameQuantizer {
    pub fn new(lut: Arc<ColorLut>, options: QuantizeOptions) -> Self {
        Self { lut, options }
    }

    /// Decode `path` and quantize it onto `canvas`
    pub fn quantize_file(&self, path: &Path, canvas: CanvasSize) -> Result<IndexImage> {
        let image = open_image(path)?;
        tracing::debug!(
            path = %path.display(),
            width = image.width(),
            height = image.height(),
            %canvas,
            "Decoded frame"
        );
        Ok(self.quantize_image(&image, canvas))
    }

    /// Resize `image` to `canvas`, dither, and map every pixel through the LUT
    pub fn quantize_image(&self, image: &DynamicImage, canvas: CanvasSize) -> IndexImage {
        let resized = self.resize(image, canvas);
        let channels = resized.color().channel_count() as usize;

        let mut rgb: RgbImage = resized.to_rgb8();
        if self.options.dither.is_active() && channels >= 3 {
            let (w, h) = rgb.dimensions();
            self.options
                .dither
                .apply(&mut rgb, w as usize, h as usize, 3);
        }

        self.lookup(&rgb)
    }

    fn resize(&self, image: &DynamicImage, canvas: CanvasSize) -> DynamicImage {
        let (w, h) = (canvas.width, canvas.height);
        if self.options.pixelate {
            let small_w = (w / PIXELATE_FACTOR).max(1);
            let small_h = (h / PIXELATE_FACTOR).max(1);
            image
                .resize_exact(small_w, small_h, FilterType::Triangle)
                .resize_exact(w, h, FilterType::Nearest)
        } else {
            image.resize_exact(w, h, FilterType::Triangle)
        }
    }

    fn lookup(&self, rgb: &RgbImage) -> IndexImage {
        let (w, h) = rgb.dimensions();
        let lut = &self.lut;

        let indices: Vec<u16> = rgb
            .as_raw()
            .par_chunks((w as usize * 3).max(1))
            .flat_map_iter(|row| {
                row.chunks_exact(3)
                    .map(|px| lut.get(px[0], px[1], px[2]))
            })
            .collect();

        IndexImage::from_raw(w, h, indices)
    }
}

fn unreadable(path: &Path) -> impl Fn(image::ImageError) -> PipelineError + '_ {
    move |source| PipelineError::UnreadableImage {
        path: path.to_path_buf(),
        source,
    }
}

/// Open `path` with the format sniffed from its content, not its extension
fn open_reader(path: &Path) -> Result<ImageReader<BufReader<File>>> {
    ImageReader::open(path)
        .and_then(|reader| reader.with_guessed_format())
        .map_err(|e| unreadable(path)(image::ImageError::IoError(e)))
}

/// Decode an image, sniffing the format from its content
pub fn open_image(path: &Path) -> Result<DynamicImage> {
    open_reader(path)?.decode().map_err(unreadable(path))
}

/// Read only the image header for its dimensions.
///
/// Uses the same format detection as [`open_image`], so anything that
/// decodes also reports its size.
pub fn probe_dimensions(path: &Path) -> Result<(u32, u32)> {
    open_reader(path)?.into_dimensions().map_err(unreadable(path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma, Rgb, Rgba, RgbaImage};
    use oklab_lut::{DitherMode, LutData};
    use std::sync::OnceLock;

    /// Table where the index is the red channel's top bit plus 2 * green's
    /// top bit, cheap to reason about without building a real palette.
    fn quadrant_lut() -> Arc<ColorLut> {
        static LUT: OnceLock<Arc<ColorLut>> = OnceLock::new();
        LUT.get_or_init(|| {
            let mut cells = vec![0u8; 256 * 256 * 256];
            for r in 0..256usize {
                for g in 0..256usize {
                    let index = (r >> 7) as u8 | (((g >> 7) as u8) << 1);
                    let start = (r << 16) | (g << 8);
                    cells[start..start + 256].fill(index);
                }
            }
            Arc::new(ColorLut::from_data(LutData::U8(cells)).unwrap())
        })
        .clone()
    }

    fn quantizer(dither: DitherMode, pixelate: bool) -> FrameQuantizer {
        FrameQuantizer::new(
            quadrant_lut(),
            QuantizeOptions {
                dither: DitherOptions::new().mode(dither),
                pixelate,
            },
        )
    }

    #[test]
    fn test_flat_image_maps_to_single_index() {
        let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(50, 30, Rgb([200, 10, 0])));
        let out = quantizer(DitherMode::None, false).quantize_image(&image, CanvasSize::SINGLE);
        assert_eq!((out.width(), out.height()), (128, 128));
        assert!(out.indices().iter().all(|&i| i == 1));
    }

    #[test]
    fn test_output_is_resized_to_canvas() {
        let image = DynamicImage::ImageRgb8(RgbImage::new(10, 10));
        let canvas = CanvasSize::new(384, 256).unwrap();
        let out = quantizer(DitherMode::Ordered4, true).quantize_image(&image, canvas);
        assert_eq!((out.width(), out.height()), (384, 256));
        assert_eq!(out.indices().len(), 384 * 256);
    }

    #[test]
    fn test_left_right_halves() {
        // Left half dark, right half bright red
        let image = RgbImage::from_fn(256, 128, |x, _| {
            if x < 128 {
                Rgb([0, 0, 0])
            } else {
                Rgb([255, 0, 0])
            }
        });
        let canvas = CanvasSize::new(256, 128).unwrap();
        let out = quantizer(DitherMode::None, false)
            .quantize_image(&DynamicImage::ImageRgb8(image), canvas);
        assert_eq!(out.get(10, 64), Some(0));
        assert_eq!(out.get(250, 64), Some(1));
    }

    #[test]
    fn test_grey_is_replicated() {
        let image = DynamicImage::ImageLuma8(GrayImage::from_pixel(8, 8, Luma([200])));
        let out = quantizer(DitherMode::Ordered4, false).quantize_image(&image, CanvasSize::SINGLE);
        // r >= 128 and g >= 128; grey input is not dithered
        assert!(out.indices().iter().all(|&i| i == 3));
    }

    #[test]
    fn test_alpha_is_dropped() {
        let image =
            DynamicImage::ImageRgba8(RgbaImage::from_pixel(128, 128, Rgba([0, 255, 0, 200])));
        let out = quantizer(DitherMode::Ordered4, false).quantize_image(&image, CanvasSize::SINGLE);
        assert!(out.indices().iter().all(|&i| i == 2));
    }

    #[test]
    fn test_dither_breaks_flat_boundary() {
        // Red exactly at the quadrant edge: dither pushes pixels both ways
        let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(128, 128, Rgb([128, 0, 0])));
        let out = quantizer(DitherMode::Ordered4, false).quantize_image(&image, CanvasSize::SINGLE);
        assert!(out.indices().contains(&0));
        assert!(out.indices().contains(&1));

        let plain = quantizer(DitherMode::None, false).quantize_image(&image, CanvasSize::SINGLE);
        assert!(plain.indices().iter().all(|&i| i == 1));
    }

    #[test]
    fn test_pixelate_builds_aligned_blocks() {
        // 6-pixel red/black stripes; 384 shrinks to exactly 128 before upscaling
        let image = RgbImage::from_fn(384, 384, |x, _| {
            if (x / 6) % 2 == 0 {
                Rgb([255, 0, 0])
            } else {
                Rgb([0, 0, 0])
            }
        });
        let canvas = CanvasSize::new(384, 384).unwrap();
        let out = quantizer(DitherMode::None, true)
            .quantize_image(&DynamicImage::ImageRgb8(image), canvas);

        assert!(out.indices().contains(&0));
        assert!(out.indices().contains(&1));
        for y in 0..384 {
            for x in 0..384 {
                assert_eq!(
                    out.get(x, y),
                    out.get(x / 3 * 3, y / 3 * 3),
                    "pixel ({x}, {y}) differs from its 3x3 block"
                );
            }
        }
    }

    #[test]
    fn test_unreadable_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.png");
        std::fs::write(&path, b"definitely not a png").unwrap();

        let result = quantizer(DitherMode::None, false).quantize_file(&path, CanvasSize::SINGLE);
        match result {
            Err(PipelineError::UnreadableImage { path: p, .. }) => assert_eq!(p, path),
            other => panic!("Expected UnreadableImage, got {other:?}"),
        }
        assert!(probe_dimensions(&path).is_err());
        assert!(open_image(&dir.path().join("missing.png")).is_err());
    }

    #[test]
    fn test_quantize_file_and_probe() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("frame.png");
        RgbImage::from_pixel(300, 200, Rgb([255, 255, 0]))
            .save(&path)
            .unwrap();

        assert_eq!(probe_dimensions(&path).unwrap(), (300, 200));
        let canvas = CanvasSize::decide(300, 200, None, None);
        let out = quantizer(DitherMode::Ordered4, false)
            .quantize_file(&path, canvas)
            .unwrap();
        assert_eq!(canvas.to_string(), "256x256");
        assert!(out.indices().iter().all(|&i| i == 3));
    }

    #[test]
    fn test_misnamed_file_reads_size_like_it_decodes() {
        // PNG content behind a .jpg name
        let dir = tempfile::tempdir().unwrap();
        let png = dir.path().join("frame.png");
        let path = dir.path().join("frame.jpg");
        RgbImage::from_pixel(128, 128, Rgb([255, 0, 0]))
            .save(&png)
            .unwrap();
        std::fs::rename(&png, &path).unwrap();

        assert_eq!(probe_dimensions(&path).unwrap(), (128, 128));
        let out = quantizer(DitherMode::None, false)
            .quantize_file(&path, CanvasSize::SINGLE)
            .unwrap();
        assert!(out.indices().iter().all(|&i| i == 1));
    }
}
