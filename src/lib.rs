//! # Lumina-Compositor
//!
//! Automated exposure correction and brand-watermark compositing for still
//! images and video streams.
//!
//! Every frame is measured on its Lab lightness channel, routed to one of
//! three correction strategies by configurable brightness thresholds, and
//! composited with a multi-line semi-transparent watermark. Video streams
//! run through a chunked worker pool that preserves frame order end to end,
//! with the bright-strategy factor temporally smoothed across frames to
//! avoid flicker.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use lumina_compositor::{config::Config, pipeline};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let config = Config::default();
//! let outcome = pipeline::enhance_video("input.mp4", "enhanced.mp4", &config).await;
//! println!("{}", outcome.message);
//! # }
//! ```
//!
//! ## Architecture
//!
//! - [`analysis`] - Per-frame brightness metrics
//! - [`correction`] - Exposure strategies, CLAHE, temporal smoothing
//! - [`watermark`] - Overlay layout and compositing
//! - [`video`] - Frame types and decoder/encoder boundary
//! - [`pipeline`] - Chunked executor, stitcher, and job boundary
//! - [`config`] - Configuration management

pub mod analysis;
pub mod color;
pub mod config;
pub mod correction;
pub mod error;
pub mod pipeline;
pub mod video;
pub mod watermark;

// Re-export commonly used types for convenience
pub use crate::{
    analysis::{FrameMetrics, FrameMetricsAnalyzer},
    config::Config,
    correction::{CorrectionThresholds, ExposureCorrector, TemporalSmoother},
    error::{LuminaError, Result},
    pipeline::{ChunkedPipelineExecutor, JobOutcome},
    video::{Frame, FrameSink, FrameSource},
    watermark::{WatermarkCompositor, WatermarkSpec},
};
