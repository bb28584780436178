use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::{info, Level};

use lumina_compositor::config::Config;
use lumina_compositor::pipeline;

#[derive(Parser)]
#[command(
    name = "lumina-compositor",
    version,
    about = "Adaptive exposure correction and watermarking for images and video",
    long_about = "Lumina-Compositor measures each frame's brightness, applies the \
appropriate correction strategy (shadow equalization, smoothed brightness \
reduction, or a mild contrast boost) and composites a branded watermark, \
processing video frames in parallel without reordering them."
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Configuration file (optional)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Enhance a single still image
    Image {
        /// Input image path
        #[arg(short, long)]
        input: PathBuf,

        /// Output image path
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Enhance a video frame-by-frame
    Video {
        /// Input video path
        #[arg(short, long)]
        input: PathBuf,

        /// Output video path
        #[arg(short, long)]
        output: PathBuf,

        /// Frames per worker chunk
        #[arg(long)]
        chunk_size: Option<usize>,

        /// Worker pool size (defaults to CPU count)
        #[arg(long)]
        workers: Option<usize>,
    },

    /// Stitch multiple clips into one watermarked video
    Stitch {
        /// Input clips, in playback order
        #[arg(short, long, required = true, num_args = 1..)]
        inputs: Vec<PathBuf>,

        /// Output video path
        #[arg(short, long)]
        output: PathBuf,

        /// Output width
        #[arg(long)]
        width: Option<u32>,

        /// Output height
        #[arg(long)]
        height: Option<u32>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::fmt().with_max_level(log_level).init();

    info!("Starting Lumina-Compositor v{}", env!("CARGO_PKG_VERSION"));

    let mut config = match &cli.config {
        Some(path) => {
            info!("Loading configuration from {:?}", path);
            Config::from_file(path)?
        }
        None => Config::default(),
    };
    config.validate()?;

    let outcome = match cli.command {
        Command::Image { input, output } => {
            pipeline::enhance_image(input, output, &config).await
        }
        Command::Video {
            input,
            output,
            chunk_size,
            workers,
        } => {
            if let Some(chunk_size) = chunk_size {
                config.pipeline.chunk_size = chunk_size;
            }
            if let Some(workers) = workers {
                config.pipeline.worker_count = workers;
            }
            config.validate()?;
            pipeline::enhance_video(input, output, &config).await
        }
        Command::Stitch {
            inputs,
            output,
            width,
            height,
        } => pipeline::stitch_videos(&inputs, output, width, height, &config).await,
    };

    if outcome.success {
        info!("{}", outcome.message);
        Ok(())
    } else {
        Err(anyhow::anyhow!(outcome.message))
    }
}
