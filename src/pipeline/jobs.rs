//! Job boundary: top-level operations returning a success/message contract.
//!
//! Nothing here propagates an error to the caller. Open/encode failures are
//! converted into a failed [`JobOutcome`] with a descriptive message; partial
//! video output is removed on failure.

use std::path::Path;

use tracing::{error, info, warn};

use crate::config::Config;
use crate::correction::ExposureCorrector;
use crate::error::{LuminaError, Result, SinkError, SourceError};
use crate::pipeline::executor::ChunkedPipelineExecutor;
use crate::pipeline::stitch::{StitchParams, VideoStitcher};
use crate::video::sink::{FfmpegSink, MemorySink};
use crate::video::source::{ffmpeg_available, FfmpegSource, FrameSource, MemorySource};
use crate::video::types::{Frame, VideoParams};
use crate::watermark::{WatermarkCompositor, WatermarkSpec};

/// Result contract for every top-level operation
#[derive(Debug, Clone)]
pub struct JobOutcome {
    pub success: bool,
    pub message: String,
    pub frames_processed: u64,
}

impl JobOutcome {
    fn ok<S: Into<String>>(message: S, frames_processed: u64) -> Self {
        Self {
            success: true,
            message: message.into(),
            frames_processed,
        }
    }

    fn failed(error: &LuminaError) -> Self {
        error!("job failed: {}", error);
        Self {
            success: false,
            message: error.user_message(),
            frames_processed: 0,
        }
    }
}

fn build_compositor(config: &Config, enabled: bool) -> Result<Option<WatermarkCompositor>> {
    if !enabled {
        return Ok(None);
    }
    let mut spec = WatermarkSpec::branded(
        config.watermark.brand.clone(),
        config.watermark.identity.clone(),
    );
    spec.alpha = config.watermark.alpha;
    Ok(Some(WatermarkCompositor::new(spec)?))
}

/// Enhance a single still image
///
/// Runs the same pipeline as video with chunk size 1 and no smoothing state
/// retained across calls.
pub async fn enhance_image<P: AsRef<Path>>(input: P, output: P, config: &Config) -> JobOutcome {
    match enhance_image_inner(input.as_ref(), output.as_ref(), config) {
        Ok(frames) => JobOutcome::ok("Image enhanced successfully", frames),
        Err(e) => JobOutcome::failed(&e),
    }
}

fn enhance_image_inner(input: &Path, output: &Path, config: &Config) -> Result<u64> {
    info!("Enhancing image {:?} -> {:?}", input, output);

    let loaded = image::open(input).map_err(|_| SourceError::OpenFailed {
        path: input.display().to_string(),
    })?;
    let frame = Frame::new(loaded.to_rgb8());

    let executor = ChunkedPipelineExecutor::new(
        ExposureCorrector::new(config.image),
        build_compositor(config, config.watermark.enabled_for_images)?,
        1,
        1,
        config.smoothing.window,
    )?;

    let mut source = MemorySource::new(vec![frame], 1.0);
    let mut sink = MemorySink::new();
    let frames = executor.run(&mut source, &mut sink)?;

    if let Some(parent) = output.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let enhanced = sink.frames().first().ok_or_else(|| SinkError::EncodeFailed {
        reason: "pipeline produced no output frame".to_string(),
    })?;
    enhanced.save(output).map_err(|e| SinkError::CreateFailed {
        path: format!("{} ({})", output.display(), e),
    })?;

    Ok(frames)
}

/// Correct exposure frame-by-frame across a whole video, watermarking each
/// frame, with chunked parallel processing and ordered output
pub async fn enhance_video<P: AsRef<Path>>(input: P, output: P, config: &Config) -> JobOutcome {
    let output = output.as_ref();
    match enhance_video_inner(input.as_ref(), output, config) {
        Ok(frames) => JobOutcome::ok(
            format!("Video processed successfully. Processed {} frames.", frames),
            frames,
        ),
        Err(e) => {
            remove_partial_output(output);
            JobOutcome::failed(&e)
        }
    }
}

fn enhance_video_inner(input: &Path, output: &Path, config: &Config) -> Result<u64> {
    info!("Enhancing video {:?} -> {:?}", input, output);

    if !ffmpeg_available() {
        return Err(LuminaError::generic(
            "FFmpeg not found. Please install FFmpeg.",
        ));
    }

    let mut source = FfmpegSource::open(input)?;
    let metadata = source.metadata().clone();
    let params = VideoParams::new(metadata.width, metadata.height, metadata.fps);
    let mut sink = FfmpegSink::create(output, &params)?;

    let executor = ChunkedPipelineExecutor::new(
        ExposureCorrector::new(config.video),
        build_compositor(config, config.watermark.enabled_for_video)?,
        config.pipeline.chunk_size,
        config.pipeline.worker_count,
        config.smoothing.window,
    )?;

    executor.run(&mut source, &mut sink)
}

/// Stitch multiple clips into one watermarked video with fade transitions
pub async fn stitch_videos<P: AsRef<Path>>(
    inputs: &[P],
    output: P,
    target_width: Option<u32>,
    target_height: Option<u32>,
    config: &Config,
) -> JobOutcome {
    let output = output.as_ref();
    match stitch_videos_inner(inputs, output, target_width, target_height, config) {
        Ok(frames) => JobOutcome::ok(
            format!("Videos stitched successfully. Processed {} frames.", frames),
            frames,
        ),
        Err(e) => {
            remove_partial_output(output);
            JobOutcome::failed(&e)
        }
    }
}

fn stitch_videos_inner<P: AsRef<Path>>(
    inputs: &[P],
    output: &Path,
    target_width: Option<u32>,
    target_height: Option<u32>,
    config: &Config,
) -> Result<u64> {
    if inputs.is_empty() {
        return Err(crate::error::PipelineError::NoInput.into());
    }
    if !ffmpeg_available() {
        return Err(LuminaError::generic(
            "FFmpeg not found. Please install FFmpeg.",
        ));
    }

    let params = StitchParams {
        target_width: target_width.unwrap_or(config.stitch.target_width),
        target_height: target_height.unwrap_or(config.stitch.target_height),
        fps: config.stitch.fps,
        transition_frames: config.stitch.transition_frames,
    };

    // An unreadable clip is skipped, not fatal, matching the sequential
    // best-effort behavior users expect from batch stitching
    let mut sources: Vec<Box<dyn FrameSource>> = Vec::new();
    for input in inputs {
        match FfmpegSource::open(input.as_ref()) {
            Ok(source) => sources.push(Box::new(source)),
            Err(e) => warn!("skipping clip {:?}: {}", input.as_ref(), e),
        }
    }
    if sources.is_empty() {
        return Err(LuminaError::generic("none of the input clips could be opened"));
    }

    let encoding = VideoParams::new(params.target_width, params.target_height, params.fps);
    let mut sink = FfmpegSink::create(output, &encoding)?;
    let compositor = build_compositor(config, config.watermark.enabled_for_video)?;
    let stitcher = VideoStitcher::new(params, compositor);

    stitcher.stitch(sources, &mut sink)
}

fn remove_partial_output(output: &Path) {
    // A partially written container is unusable
    if output.exists() {
        if let Err(e) = std::fs::remove_file(output) {
            warn!("could not remove partial output {:?}: {}", output, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_missing_image_input_fails_with_message() {
        let dir = tempdir().unwrap();
        let outcome = enhance_image(
            dir.path().join("missing.png"),
            dir.path().join("out.png"),
            &Config::default(),
        )
        .await;
        assert!(!outcome.success);
        assert!(outcome.message.contains("missing.png"));
        assert_eq!(outcome.frames_processed, 0);
    }

    #[tokio::test]
    async fn test_image_job_roundtrip() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("input.png");
        let output = dir.path().join("nested/output.png");

        Frame::new_filled(64, 64, [120, 120, 120]).save(&input).unwrap();

        let outcome = enhance_image(input, output.clone(), &Config::default()).await;
        assert!(outcome.success, "{}", outcome.message);
        assert_eq!(outcome.frames_processed, 1);
        assert!(output.exists());

        // In-range input: the optimize pass must stay subtle
        let enhanced = image::open(&output).unwrap().to_rgb8();
        let mean: f64 = enhanced.pixels().map(|p| p[0] as f64).sum::<f64>()
            / enhanced.pixels().len() as f64;
        assert!((mean - 120.0).abs() < 15.0);
    }

    #[tokio::test]
    async fn test_stitch_with_no_inputs_fails() {
        let dir = tempdir().unwrap();
        let inputs: Vec<std::path::PathBuf> = Vec::new();
        let outcome = stitch_videos(
            &inputs,
            dir.path().join("out.mp4"),
            None,
            None,
            &Config::default(),
        )
        .await;
        assert!(!outcome.success);
    }

    #[tokio::test]
    async fn test_missing_video_input_fails_with_message() {
        let dir = tempdir().unwrap();
        let outcome = enhance_video(
            dir.path().join("missing.mp4"),
            dir.path().join("out.mp4"),
            &Config::default(),
        )
        .await;
        assert!(!outcome.success);
        if ffmpeg_available() {
            assert!(outcome.message.contains("missing.mp4"));
        }
    }
}
