use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use rayon::prelude::*;

use crate::error::{PipelineError, Result};
use crate::models::CanvasSize;
use crate::services::container::{OutputFormat, OutputSettings};
use crate::services::quantizer::{probe_dimensions, FrameQuantizer};

/// File extensions treated as frames, compared case-insensitively
pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp", "tif", "tiff", "webp"];

/// Frames between progress log lines
const PROGRESS_EVERY: usize = 10;

/// Where a directory batch currently is
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchState {
    Start { frames: usize },
    SizeDecided(CanvasSize),
    Processing { total: usize },
    Done(BatchReport),
}

/// Outcome of a directory batch
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub total: usize,
    pub succeeded: usize,
    /// File name and error message of every frame that failed
    pub failed: Vec<(String, String)>,
    /// Frames skipped because the batch was cancelled
    pub cancelled: usize,
}

impl BatchReport {
    fn record(mut self, outcome: FrameOutcome) -> Self {
        self.total += 1;
        match outcome {
            FrameOutcome::Written => self.succeeded += 1,
            FrameOutcome::Failed { name, error } => self.failed.push((name, error.to_string())),
            FrameOutcome::Cancelled => self.cancelled += 1,
        }
        self
    }

    fn merge(mut self, other: Self) -> Self {
        self.total += other.total;
        self.succeeded += other.succeeded;
        self.failed.extend(other.failed);
        self.cancelled += other.cancelled;
        self
    }

    /// Every frame was written
    pub fn is_complete(&self) -> bool {
        self.succeeded == self.total
    }
}

impl fmt::Display for BatchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{} frames written, {} failed, {} cancelled",
            self.succeeded,
            self.total,
            self.failed.len(),
            self.cancelled
        )
    }
}

enum FrameOutcome {
    Written,
    Failed { name: String, error: PipelineError },
    Cancelled,
}

/// Quantizes single images or whole directories of frames
pub struct BatchDriver {
    quantizer: Arc<FrameQuantizer>,
    output: OutputSettings,
    cancel: Arc<AtomicBool>,
}

impl BatchDriver {
    pub fn new(quantizer: Arc<FrameQuantizer>, output: OutputSettings, cancel: Arc<AtomicBool>) -> Self {
        Self {
            quantizer,
            output,
            cancel,
        }
    }

    /// Process every frame in `input_dir` into `output_dir`.
    ///
    /// The canvas is decided once from the first frame's dimensions and
    /// applied to all frames. Per-frame failures are collected in the
    /// report; only an unreadable first frame or an I/O error on the
    /// output directory aborts the batch.
    pub fn run_dir(
        &self,
        input_dir: &Path,
        output_dir: &Path,
        user_w: Option<u32>,
        user_h: Option<u32>,
    ) -> Result<BatchReport> {
        let started = Instant::now();
        let frames = list_frames(input_dir)?;
        log_state(&BatchState::Start {
            frames: frames.len(),
        });

        let Some(first) = frames.first() else {
            tracing::warn!(input = %input_dir.display(), "No images in folder");
            let report = BatchReport::default();
            log_state(&BatchState::Done(report.clone()));
            return Ok(report);
        };

        let (src_w, src_h) = probe_dimensions(first)?;
        let canvas = CanvasSize::decide(src_w, src_h, user_w, user_h);
        log_state(&BatchState::SizeDecided(canvas));

        std::fs::create_dir_all(output_dir)?;
        let total = frames.len();
        log_state(&BatchState::Processing { total });

        let finished = AtomicUsize::new(0);
        let mut report = frames
            .par_iter()
            .map(|path| {
                let outcome = self.process_frame(path, output_dir, canvas);
                let done = finished.fetch_add(1, Ordering::Relaxed) + 1;
                if done % PROGRESS_EVERY == 0 || done == total {
                    tracing::info!(done, total, "Batch progress");
                }
                outcome
            })
            .fold(BatchReport::default, BatchReport::record)
            .reduce(BatchReport::default, BatchReport::merge);

        report.failed.sort_by(|a, b| a.0.cmp(&b.0));
        if report.cancelled > 0 {
            tracing::warn!(cancelled = report.cancelled, "Batch cancelled");
        }
        tracing::info!(
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Batch finished"
        );
        log_state(&BatchState::Done(report.clone()));
        Ok(report)
    }

    /// Process one image. Any error is returned to the caller.
    ///
    /// When `output` is an existing directory or ends with a path
    /// separator, the file name is derived from the input.
    pub fn run_file(
        &self,
        input: &Path,
        output: &Path,
        user_w: Option<u32>,
        user_h: Option<u32>,
    ) -> Result<PathBuf> {
        let started = Instant::now();
        let (src_w, src_h) = probe_dimensions(input)?;
        let canvas = CanvasSize::decide(src_w, src_h, user_w, user_h);
        tracing::info!(
            input = %input.display(),
            %canvas,
            cols = canvas.cols(),
            rows = canvas.rows(),
            "Single file"
        );

        let out_path = if output.is_dir() || ends_with_separator(output) {
            std::fs::create_dir_all(output)?;
            output_path_for(output, input, self.output.format)
        } else {
            output.to_path_buf()
        };

        let image = self.quantizer.quantize_file(input, canvas)?;
        self.output.write(&image, &out_path)?;

        tracing::info!(
            output = %out_path.display(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Frame written"
        );
        Ok(out_path)
    }

    fn process_frame(&self, path: &Path, output_dir: &Path, canvas: CanvasSize) -> FrameOutcome {
        if self.cancel.load(Ordering::Relaxed) {
            return FrameOutcome::Cancelled;
        }

        let out_path = output_path_for(output_dir, path, self.output.format);
        let result = self
            .quantizer
            .quantize_file(path, canvas)
            .and_then(|image| self.output.write(&image, &out_path));

        match result {
            Ok(()) => {
                tracing::debug!(output = %out_path.display(), "Frame written");
                FrameOutcome::Written
            }
            Err(error) => {
                let name = file_name(path);
                tracing::error!(file = %name, %error, "Frame failed");
                FrameOutcome::Failed { name, error }
            }
        }
    }
}

fn log_state(state: &BatchState) {
    match state {
        BatchState::Start { frames } => tracing::info!(frames, "Batch started"),
        BatchState::SizeDecided(canvas) => tracing::info!(
            %canvas,
            cols = canvas.cols(),
            rows = canvas.rows(),
            "Target size decided"
        ),
        BatchState::Processing { total } => tracing::info!(total, "Processing frames"),
        BatchState::Done(report) => tracing::info!(%report, "Batch done"),
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn ends_with_separator(path: &Path) -> bool {
    let raw = path.as_os_str().to_string_lossy();
    raw.ends_with('/') || raw.ends_with(std::path::MAIN_SEPARATOR)
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_ascii_lowercase())
        .is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext.as_str()))
}

/// Regular files in `dir` with an image extension, sorted by name
pub fn list_frames(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut frames = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && is_image(&path) {
            frames.push(path);
        }
    }
    frames.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(frames)
}

/// `output_dir/<input stem>.<format extension>`
pub fn output_path_for(output_dir: &Path, input: &Path, format: OutputFormat) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "frame".to_string());
    output_dir.join(format!("{stem}.{}", format.extension()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_image() {
        assert!(is_image(Path::new("a/00001.jpg")));
        assert!(is_image(Path::new("A.PNG")));
        assert!(is_image(Path::new("x.tiff")));
        assert!(is_image(Path::new("x.webp")));
        assert!(!is_image(Path::new("notes.txt")));
        assert!(!is_image(Path::new("noext")));
    }

    #[test]
    fn test_output_path_for() {
        assert_eq!(
            output_path_for(Path::new("out"), Path::new("in/00042.jpg"), OutputFormat::Smrf),
            PathBuf::from("out/00042.smrf")
        );
        assert_eq!(
            output_path_for(Path::new("out"), Path::new("frame.v2.png"), OutputFormat::Json),
            PathBuf::from("out/frame.v2.json")
        );
    }

    #[test]
    fn test_ends_with_separator() {
        assert!(ends_with_separator(Path::new("out/")));
        assert!(!ends_with_separator(Path::new("out/frame.json")));
    }

    #[test]
    fn test_list_frames_sorted_and_filtered() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.png", "a.JPG", "c.txt", "00010.jpg"] {
            std::fs::write(dir.path().join(name), b"x").unwrap();
        }
        std::fs::create_dir(dir.path().join("sub.png")).unwrap();

        let names: Vec<String> = list_frames(dir.path())
            .unwrap()
            .iter()
            .map(|p| file_name(p))
            .collect();
        assert_eq!(names, vec!["00010.jpg", "a.JPG", "b.png"]);
    }

    #[test]
    fn test_report_fold_and_merge() {
        let left = BatchReport::default()
            .record(FrameOutcome::Written)
            .record(FrameOutcome::Cancelled);
        let right = BatchReport::default().record(FrameOutcome::Failed {
            name: "bad.png".to_string(),
            error: PipelineError::InvalidContainer("x".to_string()),
        });
        let report = left.merge(right);

        assert_eq!(report.total, 3);
        assert_eq!(report.succeeded, 1);
        assert_eq!(report.cancelled, 1);
        assert_eq!(report.failed[0].0, "bad.png");
        assert!(!report.is_complete());
        assert_eq!(report.to_string(), "1/3 frames written, 1 failed, 1 cancelled");
    }
}
