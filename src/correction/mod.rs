//! # Exposure Correction Module
//!
//! Per-frame adaptive exposure correction. One of three mutually exclusive
//! strategies is selected from the frame's mean brightness: tile-local
//! equalization for dark frames, a (optionally smoothed) brightness scale
//! for overexposed frames, and a gentler equalization pass for everything
//! in between.

pub mod clahe;
pub mod smoothing;

use serde::{Deserialize, Serialize};

use crate::analysis::FrameMetrics;
use crate::color;
use crate::error::Result;
use crate::video::types::Frame;

pub use clahe::Clahe;
pub use smoothing::TemporalSmoother;

/// Clip limit for the dark-frame equalization pass
const DARK_CLIP_LIMIT: f64 = 3.0;

/// Clip limit for the mild optimize pass
const OPTIMIZE_CLIP_LIMIT: f64 = 2.0;

/// Brightness thresholds driving strategy selection
///
/// Image and video jobs carry independent threshold sets; the wider video
/// high threshold tolerates motion-induced transient overexposure.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CorrectionThresholds {
    /// Below this mean brightness the dark strategy applies
    pub low: f64,

    /// Above this mean brightness the bright strategy applies
    pub high: f64,

    /// Brightness the bright strategy corrects towards
    pub target_brightness: f64,
}

impl CorrectionThresholds {
    /// Defaults for still images
    pub fn image() -> Self {
        Self {
            low: 80.0,
            high: 130.0,
            target_brightness: 127.0,
        }
    }

    /// Defaults for video streams
    pub fn video() -> Self {
        Self {
            low: 80.0,
            high: 200.0,
            target_brightness: 127.0,
        }
    }
}

/// The strategy chosen for a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    Dark,
    Bright,
    Optimize,
}

/// Applies threshold-driven exposure correction to individual frames
pub struct ExposureCorrector {
    thresholds: CorrectionThresholds,
    dark_filter: Clahe,
    optimize_filter: Clahe,
}

impl ExposureCorrector {
    pub fn new(thresholds: CorrectionThresholds) -> Self {
        Self {
            thresholds,
            dark_filter: Clahe::new(DARK_CLIP_LIMIT),
            optimize_filter: Clahe::new(OPTIMIZE_CLIP_LIMIT),
        }
    }

    pub fn thresholds(&self) -> CorrectionThresholds {
        self.thresholds
    }

    /// Select the correction strategy for a frame's metrics
    ///
    /// A near-zero mean brightness routes to the dark strategy even when a
    /// misconfigured high threshold would nominally classify it as bright,
    /// so the bright factor never divides by zero.
    pub fn select_strategy(&self, metrics: &FrameMetrics) -> Strategy {
        if metrics.mean_brightness < self.thresholds.low || metrics.mean_brightness < 1.0 {
            Strategy::Dark
        } else if metrics.mean_brightness > self.thresholds.high {
            Strategy::Bright
        } else {
            Strategy::Optimize
        }
    }

    /// Raw bright-strategy scale factor, denominator floored at 1
    pub fn bright_factor(&self, metrics: &FrameMetrics) -> f64 {
        self.thresholds.target_brightness / metrics.mean_brightness.max(1.0)
    }

    /// Correct one frame, smoothing the bright factor when a smoother is given
    ///
    /// The smoother must be fed frames in stream order; passing `None` uses
    /// the stateless per-frame factor (the single-image path).
    pub fn correct(
        &self,
        frame: &Frame,
        metrics: &FrameMetrics,
        smoother: Option<&mut TemporalSmoother>,
    ) -> Result<Frame> {
        match self.select_strategy(metrics) {
            Strategy::Dark => self.equalize_lightness(frame, &self.dark_filter),
            Strategy::Bright => {
                let raw = self.bright_factor(metrics);
                let factor = match smoother {
                    Some(s) => s.smooth(raw),
                    None => raw,
                };
                Ok(self.scale_brightness(frame, factor))
            }
            Strategy::Optimize => self.equalize_lightness(frame, &self.optimize_filter),
        }
    }

    /// CLAHE on the Lab lightness channel only; color channels untouched
    fn equalize_lightness(&self, frame: &Frame, filter: &Clahe) -> Result<Frame> {
        let width = frame.width();
        let height = frame.height();

        let mut l_plane = Vec::with_capacity(frame.pixel_count());
        let mut ab_planes = Vec::with_capacity(frame.pixel_count());
        for pixel in frame.as_image().pixels() {
            let lab = color::rgb_to_lab([pixel[0], pixel[1], pixel[2]]);
            l_plane.push(lab[0]);
            ab_planes.push([lab[1], lab[2]]);
        }

        filter.apply(&mut l_plane, width, height)?;

        let mut output = frame.clone();
        for (i, pixel) in output.as_image_mut().pixels_mut().enumerate() {
            let rgb = color::lab_to_rgb([l_plane[i], ab_planes[i][0], ab_planes[i][1]]);
            pixel.0 = rgb;
        }
        Ok(output)
    }

    /// Scale the HSV value channel by `factor`, clamped to the valid range
    pub fn scale_brightness(&self, frame: &Frame, factor: f64) -> Frame {
        let mut output = frame.clone();
        for pixel in output.as_image_mut().pixels_mut() {
            let mut hsv = color::rgb_to_hsv(pixel.0);
            hsv[2] = (hsv[2] as f64 * factor).round().clamp(0.0, 255.0) as u8;
            pixel.0 = color::hsv_to_rgb(hsv);
        }
        output
    }
}
