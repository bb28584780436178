use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{
    correction::CorrectionThresholds,
    error::{ConfigError, Result},
};

/// Main configuration for the Lumina-Compositor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Thresholds for the single-image path
    pub image: CorrectionThresholds,

    /// Thresholds for the video path (wider high threshold by design)
    pub video: CorrectionThresholds,

    /// Temporal smoothing settings
    pub smoothing: SmoothingConfig,

    /// Chunking and worker pool settings
    pub pipeline: PipelineConfig,

    /// Watermark content and styling
    pub watermark: WatermarkConfig,

    /// Stitching output settings
    pub stitch: StitchConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            image: CorrectionThresholds::image(),
            video: CorrectionThresholds::video(),
            smoothing: SmoothingConfig::default(),
            pipeline: PipelineConfig::default(),
            watermark: WatermarkConfig::default(),
            stitch: StitchConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
            path: path.display().to_string(),
        })?;

        let config: Config = toml::from_str(&content).map_err(|_| ConfigError::ParseFailed {
            path: path.display().to_string(),
        })?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self).map_err(|e| ConfigError::InvalidValue {
            key: "config".to_string(),
            value: e.to_string(),
        })?;

        std::fs::write(path, content)?;
        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        validate_thresholds("image", &self.image)?;
        validate_thresholds("video", &self.video)?;
        self.smoothing.validate()?;
        self.pipeline.validate()?;
        self.watermark.validate()?;
        self.stitch.validate()?;
        Ok(())
    }
}

fn validate_thresholds(section: &str, thresholds: &CorrectionThresholds) -> Result<()> {
    if thresholds.low >= thresholds.high {
        return Err(ConfigError::InvalidValue {
            key: format!("{}.threshold_range", section),
            value: format!("{}-{}", thresholds.low, thresholds.high),
        }
        .into());
    }
    if !(0.0..=255.0).contains(&thresholds.target_brightness) {
        return Err(ConfigError::InvalidValue {
            key: format!("{}.target_brightness", section),
            value: thresholds.target_brightness.to_string(),
        }
        .into());
    }
    Ok(())
}

/// Temporal smoothing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmoothingConfig {
    /// Sliding window length, in frames
    pub window: usize,
}

impl Default for SmoothingConfig {
    fn default() -> Self {
        Self { window: 5 }
    }
}

impl SmoothingConfig {
    fn validate(&self) -> Result<()> {
        if self.window == 0 {
            return Err(ConfigError::InvalidValue {
                key: "smoothing.window".to_string(),
                value: self.window.to_string(),
            }
            .into());
        }
        Ok(())
    }
}

/// Executor configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Frames per dispatched chunk
    pub chunk_size: usize,

    /// Worker pool size; 0 means one per CPU
    pub worker_count: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            chunk_size: 30,
            worker_count: num_cpus::get(),
        }
    }
}

impl PipelineConfig {
    fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(ConfigError::InvalidValue {
                key: "pipeline.chunk_size".to_string(),
                value: self.chunk_size.to_string(),
            }
            .into());
        }
        Ok(())
    }
}

/// Watermark configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatermarkConfig {
    /// Brand line text
    pub brand: String,

    /// Identity line text (rendered as "Created by: …")
    pub identity: String,

    /// Backdrop opacity
    pub alpha: f32,

    /// Watermark still images (off by default; a video-brand feature)
    pub enabled_for_images: bool,

    /// Watermark video frames
    pub enabled_for_video: bool,
}

impl Default for WatermarkConfig {
    fn default() -> Self {
        Self {
            brand: "Mansio".to_string(),
            identity: "lumina".to_string(),
            alpha: 0.5,
            enabled_for_images: false,
            enabled_for_video: true,
        }
    }
}

impl WatermarkConfig {
    fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.alpha) {
            return Err(ConfigError::InvalidValue {
                key: "watermark.alpha".to_string(),
                value: self.alpha.to_string(),
            }
            .into());
        }
        if self.brand.is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "watermark.brand".to_string(),
                value: "<empty>".to_string(),
            }
            .into());
        }
        Ok(())
    }
}

/// Stitching output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StitchConfig {
    pub target_width: u32,
    pub target_height: u32,
    pub fps: f64,

    /// Cross-fade length between clips, in frames
    pub transition_frames: u32,
}

impl Default for StitchConfig {
    fn default() -> Self {
        Self {
            target_width: 1920,
            target_height: 1080,
            fps: 30.0,
            transition_frames: 30,
        }
    }
}

impl StitchConfig {
    fn validate(&self) -> Result<()> {
        if self.target_width == 0 || self.target_height == 0 {
            return Err(ConfigError::InvalidValue {
                key: "stitch.target_resolution".to_string(),
                value: format!("{}x{}", self.target_width, self.target_height),
            }
            .into());
        }
        if self.fps <= 0.0 {
            return Err(ConfigError::InvalidValue {
                key: "stitch.fps".to_string(),
                value: self.fps.to_string(),
            }
            .into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_roundtrip() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("test_config.toml");

        let original = Config::default();
        original.save_to_file(&file_path).unwrap();
        let loaded = Config::from_file(&file_path).unwrap();

        assert_eq!(original.video.high, loaded.video.high);
        assert_eq!(original.smoothing.window, loaded.smoothing.window);
        assert_eq!(original.watermark.brand, loaded.watermark.brand);
    }

    #[test]
    fn test_inverted_thresholds_rejected() {
        let mut config = Config::default();
        config.video.low = 250.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_smoothing_window_rejected() {
        let mut config = Config::default();
        config.smoothing.window = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_out_of_range_alpha_rejected() {
        let mut config = Config::default();
        config.watermark.alpha = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_image_and_video_thresholds_stay_independent() {
        let config = Config::default();
        assert_eq!(config.image.high, 130.0);
        assert_eq!(config.video.high, 200.0);
    }
}
