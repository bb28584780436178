//! # Pipeline Module
//!
//! Orchestrates the per-frame components into whole-media jobs: the chunked
//! order-preserving executor, the multi-clip stitcher, and the job boundary
//! that converts every failure into a success/message outcome.

pub mod executor;
pub mod jobs;
pub mod stitch;

pub use executor::ChunkedPipelineExecutor;
pub use jobs::{enhance_image, enhance_video, stitch_videos, JobOutcome};
pub use stitch::{fade_transition, StitchParams, VideoStitcher};
