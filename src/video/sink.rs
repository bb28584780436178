//! Frame sinks: ordered consumers of processed frames.

use std::io::Write;
use std::path::Path;
use std::process::{Child, ChildStdin, Command, Stdio};

use tracing::debug;

use crate::error::{Result, SinkError};
use crate::video::types::{Frame, VideoParams};

/// An ordered consumer of processed frames
///
/// `finish` must be called to flush and close the underlying encoder;
/// dropping without it discards whatever the encoder had buffered.
pub trait FrameSink: Send {
    fn write_frame(&mut self, frame: &Frame) -> Result<()>;

    /// Flush buffered output and release the encoder
    fn finish(&mut self) -> Result<()>;
}

/// Encodes frames to a streaming-friendly mp4 via an ffmpeg child process
///
/// Frames are piped as rawvideo rgb24 into libx264 with `+faststart`.
pub struct FfmpegSink {
    path: String,
    child: Option<Child>,
    stdin: Option<ChildStdin>,
    width: u32,
    height: u32,
    frames_written: u64,
}

impl FfmpegSink {
    pub fn create<P: AsRef<Path>>(path: P, params: &VideoParams) -> Result<Self> {
        let path = path.as_ref();
        let path_str = path.display().to_string();
        let (width, height) = params.resolution;

        if width == 0 || height == 0 {
            return Err(SinkError::CreateFailed { path: path_str }.into());
        }

        let mut child = Command::new("ffmpeg")
            .args(["-y", "-v", "error"])
            .args(["-f", "rawvideo", "-pix_fmt", "rgb24"])
            .args(["-s", &format!("{}x{}", width, height)])
            .args(["-r", &format!("{}", params.fps)])
            .args(["-i", "pipe:0"])
            .args(["-c:v", &params.codec, "-pix_fmt", "yuv420p"])
            .args(["-movflags", "+faststart"])
            .arg(path)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|_| SinkError::CreateFailed {
                path: path_str.clone(),
            })?;

        let stdin = child.stdin.take().ok_or_else(|| SinkError::CreateFailed {
            path: path_str.clone(),
        })?;

        debug!(
            "Opened video sink {}: {}x{} @ {:.2} fps ({})",
            path_str, width, height, params.fps, params.codec
        );

        Ok(Self {
            path: path_str,
            child: Some(child),
            stdin: Some(stdin),
            width,
            height,
            frames_written: 0,
        })
    }
}

impl FrameSink for FfmpegSink {
    fn write_frame(&mut self, frame: &Frame) -> Result<()> {
        if frame.width() != self.width || frame.height() != self.height {
            return Err(SinkError::WriteFailed {
                index: self.frames_written,
                reason: format!(
                    "frame is {}x{}, sink expects {}x{}",
                    frame.width(),
                    frame.height(),
                    self.width,
                    self.height
                ),
            }
            .into());
        }

        let stdin = self.stdin.as_mut().ok_or_else(|| SinkError::WriteFailed {
            index: self.frames_written,
            reason: "sink already finished".to_string(),
        })?;

        stdin
            .write_all(&frame.to_rgb_bytes())
            .map_err(|e| SinkError::WriteFailed {
                index: self.frames_written,
                reason: e.to_string(),
            })?;
        self.frames_written += 1;
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        // Closing stdin signals end-of-stream to the encoder
        drop(self.stdin.take());

        if let Some(mut child) = self.child.take() {
            let status = child.wait().map_err(|e| SinkError::EncodeFailed {
                reason: e.to_string(),
            })?;
            if !status.success() {
                return Err(SinkError::EncodeFailed {
                    reason: format!("ffmpeg exited with {} for {}", status, self.path),
                }
                .into());
            }
        }

        debug!("Finished video sink {} ({} frames)", self.path, self.frames_written);
        Ok(())
    }
}

impl Drop for FfmpegSink {
    fn drop(&mut self) {
        drop(self.stdin.take());
        if let Some(mut child) = self.child.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
    }
}

/// In-memory sink for tests
#[derive(Default)]
pub struct MemorySink {
    frames: Vec<Frame>,
    finished: bool,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    pub fn into_frames(self) -> Vec<Frame> {
        self.frames
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }
}

impl FrameSink for MemorySink {
    fn write_frame(&mut self, frame: &Frame) -> Result<()> {
        self.frames.push(frame.clone());
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.finished = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ffmpeg_sink_rejects_zero_resolution() {
        let params = VideoParams {
            resolution: (0, 0),
            ..VideoParams::default()
        };
        assert!(FfmpegSink::create("out.mp4", &params).is_err());
    }

    #[test]
    fn test_memory_sink_collects_in_write_order() {
        let mut sink = MemorySink::new();
        for v in [3u8, 1, 2] {
            sink.write_frame(&Frame::new_filled(2, 2, [v, v, v])).unwrap();
        }
        sink.finish().unwrap();
        assert!(sink.is_finished());
        let values: Vec<u8> = sink.frames().iter().map(|f| f.get_pixel(0, 0)[0]).collect();
        assert_eq!(values, vec![3, 1, 2]);
    }
}
