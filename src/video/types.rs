use image::{ImageBuffer, Rgb, RgbImage};
use serde::{Deserialize, Serialize};

/// Represents a single video frame
///
/// This is a simple wrapper around an RGB image buffer that provides
/// convenient methods for the pixel manipulation used by correction and
/// watermarking.
#[derive(Clone, Debug)]
pub struct Frame {
    buffer: RgbImage,
}

impl Frame {
    /// Create a new frame from an RGB image buffer
    pub fn new(buffer: RgbImage) -> Self {
        Self { buffer }
    }

    /// Create a new frame with the given dimensions filled with the specified color
    pub fn new_filled(width: u32, height: u32, color: [u8; 3]) -> Self {
        let buffer = ImageBuffer::from_fn(width, height, |_, _| Rgb(color));
        Self { buffer }
    }

    /// Get the width of the frame
    pub fn width(&self) -> u32 {
        self.buffer.width()
    }

    /// Get the height of the frame
    pub fn height(&self) -> u32 {
        self.buffer.height()
    }

    /// Total pixel count
    pub fn pixel_count(&self) -> usize {
        self.buffer.width() as usize * self.buffer.height() as usize
    }

    /// Whether the frame has zero area
    pub fn is_empty(&self) -> bool {
        self.buffer.width() == 0 || self.buffer.height() == 0
    }

    /// Get a pixel at the given coordinates (returns RGB array)
    pub fn get_pixel(&self, x: u32, y: u32) -> [u8; 3] {
        let pixel = self.buffer.get_pixel(x, y);
        [pixel[0], pixel[1], pixel[2]]
    }

    /// Get a mutable reference to a pixel at the given coordinates
    pub fn get_pixel_mut(&mut self, x: u32, y: u32) -> &mut [u8] {
        let pixel = self.buffer.get_pixel_mut(x, y);
        &mut pixel.0
    }

    /// Set a pixel at the given coordinates
    pub fn set_pixel(&mut self, x: u32, y: u32, color: [u8; 3]) {
        self.buffer.put_pixel(x, y, Rgb(color));
    }

    /// Get the underlying image buffer
    pub fn as_image(&self) -> &RgbImage {
        &self.buffer
    }

    /// Get a mutable reference to the underlying image buffer
    pub fn as_image_mut(&mut self) -> &mut RgbImage {
        &mut self.buffer
    }

    /// Convert the frame to raw RGB bytes
    pub fn to_rgb_bytes(&self) -> Vec<u8> {
        self.buffer.as_raw().clone()
    }

    /// Create a frame from raw RGB bytes
    pub fn from_rgb_bytes(width: u32, height: u32, data: Vec<u8>) -> Option<Self> {
        ImageBuffer::from_raw(width, height, data).map(|buffer| Self { buffer })
    }

    /// Save the frame to an image file, format inferred from the extension
    pub fn save<P: AsRef<std::path::Path>>(&self, path: P) -> Result<(), image::ImageError> {
        self.buffer.save(path)
    }
}

/// A frame together with its position in the stream
///
/// The index is assigned by the source at decode time and is the key the
/// executor orders writes by.
#[derive(Clone, Debug)]
pub struct IndexedFrame {
    pub index: u64,
    pub frame: Frame,
}

impl IndexedFrame {
    pub fn new(index: u64, frame: Frame) -> Self {
        Self { index, frame }
    }
}

/// Output video parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoParams {
    /// Frame rate for output
    pub fps: f64,

    /// Resolution (width, height)
    pub resolution: (u32, u32),

    /// Video codec to use for output
    pub codec: String,
}

impl VideoParams {
    /// Parameters for the given geometry with the default codec
    pub fn new(width: u32, height: u32, fps: f64) -> Self {
        Self {
            fps,
            resolution: (width, height),
            ..Self::default()
        }
    }
}

impl Default for VideoParams {
    fn default() -> Self {
        Self {
            fps: 30.0,
            resolution: (1920, 1080),
            codec: "libx264".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_pixel_access() {
        let mut frame = Frame::new_filled(4, 4, [10, 20, 30]);
        assert_eq!(frame.get_pixel(0, 0), [10, 20, 30]);
        frame.set_pixel(1, 1, [200, 100, 50]);
        assert_eq!(frame.get_pixel(1, 1), [200, 100, 50]);
    }

    #[test]
    fn test_video_params_carries_geometry_and_codec() {
        let params = VideoParams::new(640, 480, 25.0);
        assert_eq!(params.resolution, (640, 480));
        assert_eq!(params.fps, 25.0);
        assert_eq!(params.codec, "libx264");
    }

    #[test]
    fn test_frame_rgb_bytes_roundtrip() {
        let frame = Frame::new_filled(3, 2, [1, 2, 3]);
        let bytes = frame.to_rgb_bytes();
        assert_eq!(bytes.len(), 3 * 2 * 3);
        let back = Frame::from_rgb_bytes(3, 2, bytes).unwrap();
        assert_eq!(back.get_pixel(2, 1), [1, 2, 3]);
    }
}
