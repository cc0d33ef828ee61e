//! Test pipeline wrapper around a scratch directory and a shared LUT.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, OnceLock};

use image::RgbImage;
use mapframe::services::{BatchDriver, FrameQuantizer, OutputSettings, QuantizeOptions};
use oklab_lut::{ColorLut, LutWidth, Palette};
use tempfile::TempDir;

use super::fixtures::PALETTE_CSV;

/// The fixture table is identical for every test; build it once
fn shared_lut() -> Arc<ColorLut> {
    static LUT: OnceLock<Arc<ColorLut>> = OnceLock::new();
    LUT.get_or_init(|| {
        let palette = Palette::from_csv(PALETTE_CSV, &BTreeSet::new()).unwrap();
        Arc::new(ColorLut::build(&palette, LutWidth::U8).unwrap())
    })
    .clone()
}

/// Test pipeline with scratch input and output folders
pub struct TestPipeline {
    dir: TempDir,
    pub lut: Arc<ColorLut>,
    pub cancel: Arc<AtomicBool>,
    pub options: QuantizeOptions,
}

impl TestPipeline {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("in")).unwrap();
        Self {
            dir,
            lut: shared_lut(),
            cancel: Arc::new(AtomicBool::new(false)),
            options: QuantizeOptions::default(),
        }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn input_dir(&self) -> PathBuf {
        self.dir.path().join("in")
    }

    pub fn output_dir(&self) -> PathBuf {
        self.dir.path().join("out")
    }

    pub fn quantizer(&self) -> Arc<FrameQuantizer> {
        Arc::new(FrameQuantizer::new(self.lut.clone(), self.options))
    }

    pub fn driver(&self, output: OutputSettings) -> BatchDriver {
        BatchDriver::new(self.quantizer(), output, self.cancel.clone())
    }

    /// Save an image into the input folder
    pub fn write_frame(&self, name: &str, image: &RgbImage) -> PathBuf {
        let path = self.input_dir().join(name);
        image.save(&path).unwrap();
        path
    }

    /// Write arbitrary bytes into the input folder
    pub fn write_raw(&self, name: &str, bytes: &[u8]) -> PathBuf {
        let path = self.input_dir().join(name);
        std::fs::write(&path, bytes).unwrap();
        path
    }
}
