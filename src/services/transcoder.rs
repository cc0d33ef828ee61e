use std::collections::HashMap;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use serde::Deserialize;
use tokio::process::Command;

use crate::error::{PipelineError, Result};
use crate::models::ToolsConfig;

/// Frame rate used when none is requested
pub const DEFAULT_FPS: f64 = 20.0;

/// Output file pattern handed to ffmpeg
const FRAME_PATTERN: &str = "%05d.jpg";

/// Lines of tool output kept in error messages
const DETAIL_LINES: usize = 8;

/// What to pull out of a video
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractRequest {
    pub input: PathBuf,
    pub output_dir: PathBuf,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub fps: f64,
    /// Delete existing `*.jpg` frames in `output_dir` first
    pub clean: bool,
}

impl ExtractRequest {
    pub fn new(input: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            output_dir: output_dir.into(),
            width: None,
            height: None,
            fps: DEFAULT_FPS,
            clean: false,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    width: u32,
    height: u32,
}

/// Round down to an even number; some encoders reject odd sizes
pub fn even(n: u32) -> u32 {
    n / 2 * 2
}

/// Target size for the scale filter.
///
/// With exactly one side requested, the other follows the source aspect
/// ratio and both are forced even. `source` is only consulted in that case.
pub fn target_size(
    width: Option<u32>,
    height: Option<u32>,
    source: impl FnOnce() -> Option<(u32, u32)>,
) -> Option<(u32, u32)> {
    match (width, height) {
        (Some(w), Some(h)) => Some((w, h)),
        (None, None) => None,
        (Some(w), None) => {
            let (src_w, src_h) = source()?;
            let h = (src_h as f64 * (w as f64 / src_w.max(1) as f64)).round_ties_even() as u32;
            Some((even(w), even(h)))
        }
        (None, Some(h)) => {
            let (src_w, src_h) = source()?;
            let w = (src_w as f64 * (h as f64 / src_h.max(1) as f64)).round_ties_even() as u32;
            Some((even(w), even(h)))
        }
    }
}

/// The `-vf` filter chain: frame rate first, then the optional scale
pub fn video_filter(fps: f64, size: Option<(u32, u32)>) -> String {
    match size {
        Some((w, h)) => format!("fps={fps},scale={w}:{h}"),
        None => format!("fps={fps}"),
    }
}

/// Runs ffprobe and ffmpeg as child processes
#[derive(Debug, Clone)]
pub struct Transcoder {
    ffmpeg: String,
    ffprobe: String,
}

impl Default for Transcoder {
    fn default() -> Self {
        Self::new(&ToolsConfig::default())
    }
}

impl Transcoder {
    pub fn new(tools: &ToolsConfig) -> Self {
        Self {
            ffmpeg: tools.ffmpeg.clone(),
            ffprobe: tools.ffprobe.clone(),
        }
    }

    /// Dimensions of the first video stream
    pub async fn probe_size(&self, input: &Path) -> Result<(u32, u32)> {
        let args: Vec<OsString> = vec![
            "-v".into(),
            "error".into(),
            "-select_streams".into(),
            "v:0".into(),
            "-show_entries".into(),
            "stream=width,height".into(),
            "-of".into(),
            "json".into(),
            input.as_os_str().to_owned(),
        ];
        let stdout = run_tool(&self.ffprobe, &args).await?;
        parse_probe(&self.ffprobe, &stdout)
    }

    /// Extract JPEG frames. Returns the number of frames in the output directory.
    pub async fn extract_frames(&self, request: &ExtractRequest) -> Result<usize> {
        tokio::fs::create_dir_all(&request.output_dir).await?;
        if request.clean {
            let removed = remove_frames(&request.output_dir).await?;
            tracing::info!(removed, dir = %request.output_dir.display(), "Cleaned old frames");
        }

        // Only probe when one side has to be derived
        let source = match (request.width, request.height) {
            (Some(_), None) | (None, Some(_)) => Some(self.probe_size(&request.input).await?),
            _ => None,
        };
        let size = target_size(request.width, request.height, || source);
        let filter = video_filter(request.fps, size);

        tracing::info!(
            input = %request.input.display(),
            output = %request.output_dir.display(),
            %filter,
            "Extracting frames"
        );
        let before = snapshot_frames(&request.output_dir).await?;
        run_tool(&self.ffmpeg, &ffmpeg_args(request, &filter)).await?;

        let frames = count_written(&request.output_dir, &before).await?;
        tracing::info!(frames, "Frames extracted");
        Ok(frames)
    }
}

fn ffmpeg_args(request: &ExtractRequest, filter: &str) -> Vec<OsString> {
    vec![
        "-y".into(),
        "-i".into(),
        request.input.as_os_str().to_owned(),
        "-vf".into(),
        filter.into(),
        "-q:v".into(),
        "2".into(),
        request.output_dir.join(FRAME_PATTERN).into_os_string(),
    ]
}

fn parse_probe(tool: &str, stdout: &str) -> Result<(u32, u32)> {
    let upstream = |detail: String| PipelineError::UpstreamTool {
        tool: tool.to_string(),
        detail,
    };
    let probe: ProbeOutput =
        serde_json::from_str(stdout).map_err(|e| upstream(format!("unexpected output: {e}")))?;
    probe
        .streams
        .first()
        .map(|s| (s.width, s.height))
        .ok_or_else(|| upstream("no video stream".to_string()))
}

async fn run_tool(program: &str, args: &[OsString]) -> Result<String> {
    tracing::debug!(program, ?args, "Running");
    let output = Command::new(program)
        .args(args)
        .output()
        .await
        .map_err(|e| PipelineError::UpstreamTool {
            tool: program.to_string(),
            detail: format!("cannot run: {e}"),
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let lines: Vec<&str> = stderr.lines().collect();
        let tail = lines[lines.len().saturating_sub(DETAIL_LINES)..].join("\n");
        return Err(PipelineError::UpstreamTool {
            tool: program.to_string(),
            detail: format!("{}: {}", output.status, tail.trim()),
        });
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

fn is_jpg(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "jpg")
}

async fn remove_frames(dir: &Path) -> Result<usize> {
    let mut removed = 0;
    let mut entries = tokio::fs::read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if is_jpg(&path) && entry.file_type().await?.is_file() {
            tokio::fs::remove_file(&path).await?;
            removed += 1;
        }
    }
    Ok(removed)
}

/// Modification time of every `.jpg` in `dir`
async fn snapshot_frames(dir: &Path) -> Result<HashMap<PathBuf, Option<SystemTime>>> {
    let mut frames = HashMap::new();
    let mut entries = tokio::fs::read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if is_jpg(&path) {
            let modified = entry.metadata().await?.modified().ok();
            frames.insert(path, modified);
        }
    }
    Ok(frames)
}

/// `.jpg` files that are new or were rewritten since `before` was taken.
///
/// ffmpeg overwrites frames with the same names, so a plain count would
/// include leftovers from an earlier run.
async fn count_written(dir: &Path, before: &HashMap<PathBuf, Option<SystemTime>>) -> Result<usize> {
    let after = snapshot_frames(dir).await?;
    Ok(after
        .iter()
        .filter(|(path, modified)| before.get(*path) != Some(*modified))
        .count())
}
