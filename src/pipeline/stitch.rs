//! Multi-clip stitching: letterbox resize to a common resolution, cross-fade
//! transitions between clips, and a watermark on every output frame.

use image::imageops::{self, FilterType};
use tracing::{info, warn};

use crate::error::Result;
use crate::video::sink::FrameSink;
use crate::video::source::FrameSource;
use crate::video::types::Frame;
use crate::watermark::WatermarkCompositor;

/// Stitching parameters
#[derive(Debug, Clone)]
pub struct StitchParams {
    pub target_width: u32,
    pub target_height: u32,
    pub fps: f64,

    /// Length of the cross-fade between consecutive clips, in frames
    pub transition_frames: u32,
}

impl Default for StitchParams {
    fn default() -> Self {
        Self {
            target_width: 1920,
            target_height: 1080,
            fps: 30.0,
            transition_frames: 30,
        }
    }
}

/// Concatenates clips into one watermarked output stream
pub struct VideoStitcher {
    params: StitchParams,
    compositor: Option<WatermarkCompositor>,
}

impl VideoStitcher {
    pub fn new(params: StitchParams, compositor: Option<WatermarkCompositor>) -> Self {
        Self { params, compositor }
    }

    /// Stitch `sources` in order into `sink`; returns frames written
    ///
    /// Transition frames are synthesized between the last frame of one clip
    /// and the first frame of the next, and count towards the total.
    pub fn stitch(
        &self,
        sources: Vec<Box<dyn FrameSource>>,
        sink: &mut dyn FrameSink,
    ) -> Result<u64> {
        let mut frames_written = 0u64;
        let mut last_frame: Option<Frame> = None;
        let total_clips = sources.len();

        for (clip_index, mut source) in sources.into_iter().enumerate() {
            info!("Stitching clip {}/{}", clip_index + 1, total_clips);
            let mut first_of_clip = true;

            while let Some(frame) = source.next_frame()? {
                let resized = self.letterbox(&frame);

                if first_of_clip {
                    if let Some(previous) = last_frame.take() {
                        for blended in
                            fade_transition(&previous, &resized, self.params.transition_frames)
                        {
                            sink.write_frame(&self.watermark(blended))?;
                            frames_written += 1;
                        }
                    }
                    first_of_clip = false;
                }

                sink.write_frame(&self.watermark(resized.clone()))?;
                frames_written += 1;
                last_frame = Some(resized);
            }

            if first_of_clip {
                warn!("clip {}/{} produced no frames", clip_index + 1, total_clips);
            }
        }

        sink.finish()?;
        info!("Stitched {} frames from {} clips", frames_written, total_clips);
        Ok(frames_written)
    }

    /// Resize preserving aspect ratio, centered on a black canvas
    pub fn letterbox(&self, frame: &Frame) -> Frame {
        let (tw, th) = (self.params.target_width, self.params.target_height);
        if frame.width() == tw && frame.height() == th {
            return frame.clone();
        }

        let frame_aspect = frame.width() as f64 / frame.height() as f64;
        let target_aspect = tw as f64 / th as f64;

        let (new_w, new_h) = if frame_aspect > target_aspect {
            (tw, ((tw as f64 / frame_aspect).round() as u32).max(1))
        } else {
            (((th as f64 * frame_aspect).round() as u32).max(1), th)
        };

        let resized = imageops::resize(frame.as_image(), new_w, new_h, FilterType::Lanczos3);

        let mut canvas = Frame::new_filled(tw, th, [0, 0, 0]);
        let x_off = (tw - new_w) / 2;
        let y_off = (th - new_h) / 2;
        imageops::overlay(canvas.as_image_mut(), &resized, x_off as i64, y_off as i64);
        canvas
    }

    fn watermark(&self, frame: Frame) -> Frame {
        match &self.compositor {
            Some(compositor) => compositor.apply(&frame),
            None => frame,
        }
    }
}

/// Linear cross-fade from `from` to `to` over `count` frames
pub fn fade_transition(from: &Frame, to: &Frame, count: u32) -> Vec<Frame> {
    let mut frames = Vec::with_capacity(count as usize);
    for i in 0..count {
        let alpha = i as f64 / count as f64;
        let mut blended = from.clone();
        for (pixel, target) in blended
            .as_image_mut()
            .pixels_mut()
            .zip(to.as_image().pixels())
        {
            for c in 0..3 {
                pixel[c] = (pixel[c] as f64 * (1.0 - alpha) + target[c] as f64 * alpha)
                    .round() as u8;
            }
        }
        frames.push(blended);
    }
    frames
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::video::sink::MemorySink;
    use crate::video::source::MemorySource;

    fn stitcher(w: u32, h: u32, transition: u32) -> VideoStitcher {
        VideoStitcher::new(
            StitchParams {
                target_width: w,
                target_height: h,
                fps: 30.0,
                transition_frames: transition,
            },
            None,
        )
    }

    #[test]
    fn test_letterbox_pads_wide_frame() {
        let stitcher = stitcher(100, 100, 0);
        let frame = Frame::new_filled(200, 100, [255, 255, 255]);
        let boxed = stitcher.letterbox(&frame);
        assert_eq!((boxed.width(), boxed.height()), (100, 100));
        // Black bars above and below, content centered
        assert_eq!(boxed.get_pixel(50, 5), [0, 0, 0]);
        assert_eq!(boxed.get_pixel(50, 50), [255, 255, 255]);
        assert_eq!(boxed.get_pixel(50, 95), [0, 0, 0]);
    }

    #[test]
    fn test_letterbox_pads_tall_frame() {
        let stitcher = stitcher(100, 100, 0);
        let frame = Frame::new_filled(50, 100, [255, 255, 255]);
        let boxed = stitcher.letterbox(&frame);
        assert_eq!(boxed.get_pixel(5, 50), [0, 0, 0]);
        assert_eq!(boxed.get_pixel(50, 50), [255, 255, 255]);
        assert_eq!(boxed.get_pixel(95, 50), [0, 0, 0]);
    }

    #[test]
    fn test_fade_transition_is_monotone() {
        let dark = Frame::new_filled(8, 8, [0, 0, 0]);
        let bright = Frame::new_filled(8, 8, [200, 200, 200]);
        let frames = fade_transition(&dark, &bright, 10);
        assert_eq!(frames.len(), 10);
        let values: Vec<u8> = frames.iter().map(|f| f.get_pixel(4, 4)[0]).collect();
        assert!(values.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(values[0], 0);
    }

    #[test]
    fn test_stitch_inserts_transition_between_clips() {
        let stitcher = stitcher(32, 32, 5);
        let clip_a: Vec<Frame> = (0..4).map(|_| Frame::new_filled(32, 32, [10, 10, 10])).collect();
        let clip_b: Vec<Frame> = (0..4).map(|_| Frame::new_filled(32, 32, [200, 200, 200])).collect();
        let sources: Vec<Box<dyn FrameSource>> = vec![
            Box::new(MemorySource::new(clip_a, 30.0)),
            Box::new(MemorySource::new(clip_b, 30.0)),
        ];
        let mut sink = MemorySink::new();
        let written = stitcher.stitch(sources, &mut sink).unwrap();
        assert_eq!(written, 4 + 5 + 4);
        assert!(sink.is_finished());

        // Transition frames sit between the clips and ramp upward
        let mid = sink.frames()[4].get_pixel(16, 16)[0];
        let later = sink.frames()[7].get_pixel(16, 16)[0];
        assert!(mid < later && later < 200);
    }

    #[test]
    fn test_stitch_single_clip_has_no_transition() {
        let stitcher = stitcher(32, 32, 5);
        let clip: Vec<Frame> = (0..3).map(|_| Frame::new_filled(32, 32, [50, 50, 50])).collect();
        let sources: Vec<Box<dyn FrameSource>> = vec![Box::new(MemorySource::new(clip, 30.0))];
        let mut sink = MemorySink::new();
        assert_eq!(stitcher.stitch(sources, &mut sink).unwrap(), 3);
    }
}
