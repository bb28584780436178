//! # Frame Analysis Module
//!
//! Extracts the brightness statistics that drive correction strategy
//! selection. Analysis runs over the Lab lightness channel so hue and
//! saturation never skew the measurement.

use crate::color;
use crate::error::{FrameError, Result};
use crate::video::types::Frame;

/// Brightness/contrast statistics for a single frame
#[derive(Debug, Clone, PartialEq)]
pub struct FrameMetrics {
    /// Arithmetic mean of the lightness channel (0..255)
    pub mean_brightness: f64,

    /// Population standard deviation of the lightness channel
    pub contrast: f64,

    /// Difference between the 95th and 5th percentile lightness values
    pub histogram_spread: f64,

    /// Position of the frame in its stream
    pub frame_index: u64,
}

/// Computes [`FrameMetrics`] for individual frames
///
/// Stateless; the same frame always yields the same metrics.
pub struct FrameMetricsAnalyzer;

impl FrameMetricsAnalyzer {
    pub fn new() -> Self {
        Self
    }

    /// Analyze one frame and return its brightness metrics
    pub fn analyze(&self, frame: &Frame, frame_index: u64) -> Result<FrameMetrics> {
        if frame.is_empty() {
            return Err(FrameError::InvalidFrame {
                reason: format!(
                    "zero-sized frame {}x{} at index {}",
                    frame.width(),
                    frame.height(),
                    frame_index
                ),
            }
            .into());
        }

        let mut histogram = [0u64; 256];
        let mut sum = 0.0f64;
        let mut sum_sq = 0.0f64;
        let total = frame.pixel_count() as f64;

        for pixel in frame.as_image().pixels() {
            let l = color::rgb_to_lab([pixel[0], pixel[1], pixel[2]])[0];
            histogram[l as usize] += 1;
            let lf = l as f64;
            sum += lf;
            sum_sq += lf * lf;
        }

        let mean = sum / total;
        let variance = (sum_sq / total - mean * mean).max(0.0);
        let spread = percentile(&histogram, total, 95.0) - percentile(&histogram, total, 5.0);

        Ok(FrameMetrics {
            mean_brightness: mean,
            contrast: variance.sqrt(),
            histogram_spread: spread,
            frame_index,
        })
    }
}

impl Default for FrameMetricsAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

/// Percentile of a 256-bin histogram using the nearest-rank method
fn percentile(histogram: &[u64; 256], total: f64, pct: f64) -> f64 {
    let rank = (pct / 100.0 * total).ceil().max(1.0) as u64;
    let mut seen = 0u64;
    for (value, &count) in histogram.iter().enumerate() {
        seen += count;
        if seen >= rank {
            return value as f64;
        }
    }
    255.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flat_frame(value: u8) -> Frame {
        Frame::new_filled(32, 32, [value, value, value])
    }

    #[test]
    fn test_flat_frame_has_zero_contrast() {
        let analyzer = FrameMetricsAnalyzer::new();
        let metrics = analyzer.analyze(&flat_frame(128), 0).unwrap();
        assert!(metrics.contrast < 1e-9);
        assert!(metrics.histogram_spread < 1e-9);
    }

    #[test]
    fn test_brightness_tracks_pixel_value() {
        let analyzer = FrameMetricsAnalyzer::new();
        let dark = analyzer.analyze(&flat_frame(20), 0).unwrap();
        let bright = analyzer.analyze(&flat_frame(230), 0).unwrap();
        assert!(dark.mean_brightness < 80.0);
        assert!(bright.mean_brightness > 200.0);
    }

    #[test]
    fn test_analysis_is_idempotent() {
        let analyzer = FrameMetricsAnalyzer::new();
        let mut frame = Frame::new_filled(16, 16, [0, 0, 0]);
        for y in 0..16 {
            for x in 0..16 {
                let v = ((x * 16 + y) % 256) as u8;
                frame.set_pixel(x as u32, y as u32, [v, v, v]);
            }
        }
        let first = analyzer.analyze(&frame, 3).unwrap();
        let second = analyzer.analyze(&frame, 3).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_empty_frame_rejected() {
        let analyzer = FrameMetricsAnalyzer::new();
        let frame = Frame::new_filled(0, 10, [0, 0, 0]);
        assert!(analyzer.analyze(&frame, 0).is_err());
    }

    #[test]
    fn test_spread_on_bimodal_frame() {
        let analyzer = FrameMetricsAnalyzer::new();
        let mut frame = Frame::new_filled(16, 16, [0, 0, 0]);
        for y in 0..16 {
            for x in 8..16 {
                frame.set_pixel(x, y, [255, 255, 255]);
            }
        }
        let metrics = analyzer.analyze(&frame, 0).unwrap();
        assert!(metrics.histogram_spread > 200.0);
        assert!(metrics.contrast > 100.0);
    }
}
