use clap::{Parser, Subcommand};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use mapframe::models::AppConfig;
use mapframe::services::container::{unpack_smrf, PayloadStats, SMRF_HEADER_LEN};
use mapframe::services::transcoder::DEFAULT_FPS;
use mapframe::services::{
    BatchDriver, ExtractRequest, FrameQuantizer, Origin, OutputFormat, OutputSettings,
    QuantizeOptions, Transcoder,
};
use oklab_lut::{load_lut, save_lut, ColorLut, DitherMode, DitherOptions, LutWidth, Palette};

#[derive(Parser)]
#[command(name = "mapframe")]
#[command(about = "Convert images and video frames into palette-indexed map-art frames")]
struct Cli {
    /// YAML configuration file
    #[arg(long, global = true, env = "MAPFRAME_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the RGB -> palette index lookup table
    BuildLut {
        /// Palette CSV (index,r,g,b per line)
        #[arg(short, long, default_value = "palette.csv")]
        palette: PathBuf,

        /// Output table (.npy, .lut, .bin, .lut.gz, .bin.gz)
        #[arg(short, long, default_value = "colormap_oklab.npy")]
        output: PathBuf,

        /// Palette indices never produced by the table (e.g. 0 1 2 3)
        #[arg(short, long, num_args = 1.., value_delimiter = ',')]
        ignore: Vec<u16>,

        /// Store 16-bit elements even if every index fits in 8 bits
        #[arg(long)]
        uint16: bool,
    },
    /// Quantize one image or a folder of frames
    Generate {
        /// Input image or folder
        #[arg(short, long)]
        input: PathBuf,

        /// Output file, or output folder when the input is a folder
        #[arg(short, long)]
        output: PathBuf,

        /// Lookup table built by build-lut
        #[arg(long)]
        lut: Option<PathBuf>,

        /// Target width, snapped to a multiple of 128
        #[arg(short, long)]
        width: Option<u32>,

        /// Target height, snapped to a multiple of 128
        #[arg(long)]
        height: Option<u32>,

        /// Dithering mode: none or ordered4
        #[arg(long)]
        dither: Option<DitherMode>,

        /// Ordered dither strength (8-16 typical)
        #[arg(long)]
        dither_amount: Option<f32>,

        /// Pixel-art style scaling
        #[arg(long)]
        pixelate: bool,

        /// Output format: smrf or json
        #[arg(short, long)]
        format: Option<OutputFormat>,

        /// Store SMRF payloads uncompressed
        #[arg(long)]
        no_compress: bool,

        /// World xMin written into SMRF headers
        #[arg(long, allow_negative_numbers = true)]
        x: Option<i32>,

        /// World yFix written into SMRF headers
        #[arg(long, allow_negative_numbers = true)]
        y: Option<i32>,

        /// World zMin written into SMRF headers
        #[arg(long, allow_negative_numbers = true)]
        z: Option<i32>,
    },
    /// Extract JPEG frames from a video with ffmpeg
    Extract {
        /// Input video
        #[arg(short, long)]
        input: PathBuf,

        /// Output folder
        #[arg(short, long)]
        output: PathBuf,

        /// Target width (height follows the aspect ratio if omitted)
        #[arg(long)]
        width: Option<u32>,

        /// Target height (width follows the aspect ratio if omitted)
        #[arg(long)]
        height: Option<u32>,

        /// Frames per second to extract
        #[arg(long, default_value_t = DEFAULT_FPS)]
        fps: f64,

        /// Remove existing .jpg files in the output folder first
        #[arg(long)]
        clean: bool,
    },
    /// Print the header and payload statistics of an SMRF file
    Inspect {
        /// SMRF file
        file: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mapframe=info,oklab_lut=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().without_time())
        .init();

    let config = AppConfig::load(cli.config.as_deref());
    let cancel = Arc::new(AtomicBool::new(false));
    cancel_on_ctrl_c(cancel.clone());

    match cli.command {
        Commands::BuildLut {
            palette,
            output,
            ignore,
            uint16,
        } => run_build_lut(palette, output, ignore, uint16, cancel).await,
        Commands::Generate {
            input,
            output,
            lut,
            width,
            height,
            dither,
            dither_amount,
            pixelate,
            format,
            no_compress,
            x,
            y,
            z,
        } => {
            let base = config.origin;
            let output_settings = OutputSettings {
                format: format.unwrap_or(config.format),
                compress: config.compress && !no_compress,
                origin: Origin {
                    x_min: x.unwrap_or(base.x_min),
                    y_fix: y.unwrap_or(base.y_fix),
                    z_min: z.unwrap_or(base.z_min),
                },
            };
            let options = QuantizeOptions {
                dither: DitherOptions::new()
                    .mode(dither.unwrap_or(config.dither))
                    .amount(dither_amount.unwrap_or(config.dither_amount)),
                pixelate: pixelate || config.pixelate,
            };
            let lut = lut.unwrap_or_else(|| config.lut.clone());
            run_generate(
                input,
                output,
                lut,
                (width, height),
                options,
                output_settings,
                cancel,
            )
            .await
        }
        Commands::Extract {
            input,
            output,
            width,
            height,
            fps,
            clean,
        } => {
            let request = ExtractRequest {
                input,
                output_dir: output,
                width,
                height,
                fps,
                clean,
            };
            let frames = Transcoder::new(&config.tools)
                .extract_frames(&request)
                .await?;
            println!("Extracted {frames} frames to {}", request.output_dir.display());
            Ok(())
        }
        Commands::Inspect { file } => run_inspect(&file),
    }
}

/// Set the shared cancel flag on the first Ctrl-C
fn cancel_on_ctrl_c(cancel: Arc<AtomicBool>) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, stopping after current work");
            cancel.store(true, Ordering::Relaxed);
        }
    });
}

async fn run_build_lut(
    palette_path: PathBuf,
    output: PathBuf,
    ignore: Vec<u16>,
    uint16: bool,
    cancel: Arc<AtomicBool>,
) -> anyhow::Result<()> {
    let excluded: BTreeSet<u16> = ignore.into_iter().collect();

    // The build saturates every core; keep it off the async workers
    let (width, format) = tokio::task::spawn_blocking(move || -> anyhow::Result<_> {
        let palette = Palette::load(&palette_path, &excluded)?;
        tracing::info!(
            palette = %palette_path.display(),
            entries = palette.entries().len(),
            candidates = palette.len(),
            excluded = ?palette.excluded(),
            "Loaded palette"
        );

        let needed = LutWidth::for_palette(&palette);
        let width = if uint16 { LutWidth::U16 } else { needed };
        if !uint16 && needed == LutWidth::U16 {
            tracing::warn!(
                max_index = palette.max_candidate_index(),
                "Palette indices exceed 255, storing 16-bit elements"
            );
        }

        let lut = ColorLut::build_with_cancel(&palette, width, &cancel)?;
        let format = save_lut(&lut, &output)?;
        Ok((width, format))
    })
    .await??;

    println!("Saved LUT ({width:?}, {format:?})");
    Ok(())
}

async fn run_generate(
    input: PathBuf,
    output: PathBuf,
    lut_path: PathBuf,
    (width, height): (Option<u32>, Option<u32>),
    options: QuantizeOptions,
    output_settings: OutputSettings,
    cancel: Arc<AtomicBool>,
) -> anyhow::Result<()> {
    tokio::task::spawn_blocking(move || -> anyhow::Result<()> {
        let lut = Arc::new(load_lut(&lut_path)?);
        tracing::info!(lut = %lut_path.display(), width = ?lut.width(), "Loaded LUT");

        let quantizer = Arc::new(FrameQuantizer::new(lut, options));
        let driver = BatchDriver::new(quantizer, output_settings, cancel);

        if input.is_dir() {
            let report = driver.run_dir(&input, &output, width, height)?;
            for (name, error) in &report.failed {
                eprintln!("[ERR] {name}: {error}");
            }
            println!("{report}");
            if report.cancelled > 0 {
                anyhow::bail!("Batch cancelled with {} frames left", report.cancelled);
            }
        } else {
            let written = driver.run_file(&input, &output, width, height)?;
            println!("Wrote {}", written.display());
        }
        Ok(())
    })
    .await?
}

fn run_inspect(path: &Path) -> anyhow::Result<()> {
    let bytes = std::fs::read(path)?;
    let (header, payload) = unpack_smrf(&bytes)?;

    println!("{}", path.display());
    println!("  {header}");
    println!(
        "  payload: {} bytes stored, {} bytes decoded",
        bytes.len() - SMRF_HEADER_LEN,
        payload.len()
    );
    if let Some(stats) = PayloadStats::from_payload(&payload) {
        println!(
            "  indices: {} distinct, range {}..={}, most common {} ({} px)",
            stats.distinct, stats.min, stats.max, stats.most_common.0, stats.most_common.1
        );
    }
    Ok(())
}
