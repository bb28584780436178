//! Frame sources: lazy decoders the pipeline pulls frames from.

use std::io::Read;
use std::path::Path;
use std::process::{Child, ChildStdout, Command, Stdio};

use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::{Result, SourceError};
use crate::video::types::Frame;

/// Stream properties reported by the decoder at open time
#[derive(Debug, Clone)]
pub struct SourceMetadata {
    pub width: u32,
    pub height: u32,
    pub fps: f64,
    /// Total frames when the container reports them
    pub frame_count: Option<u64>,
}

/// A lazy, ordered producer of decoded frames
pub trait FrameSource: Send {
    fn metadata(&self) -> &SourceMetadata;

    /// Decode the next frame, or `None` when the stream is exhausted
    fn next_frame(&mut self) -> Result<Option<Frame>>;
}

/// Check whether the external ffmpeg binary is on the PATH
pub fn ffmpeg_available() -> bool {
    Command::new("ffmpeg")
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|status| status.success())
        .unwrap_or(false)
}

#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    #[serde(default)]
    streams: Vec<FfprobeStream>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    width: Option<u32>,
    height: Option<u32>,
    r_frame_rate: Option<String>,
    nb_frames: Option<String>,
}

/// Decodes a video file frame-by-frame via an ffmpeg child process
///
/// ffprobe supplies the stream geometry; the decoder child emits rawvideo
/// rgb24 on stdout which is sliced into frames on demand. The child is
/// reaped on drop so a failed job never leaks the process or its pipe.
pub struct FfmpegSource {
    metadata: SourceMetadata,
    child: Child,
    stdout: ChildStdout,
    frame_bytes: usize,
    exhausted: bool,
}

impl FfmpegSource {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(SourceError::OpenFailed {
                path: path.display().to_string(),
            }
            .into());
        }

        let metadata = Self::probe(path)?;
        debug!(
            "Opened video source {:?}: {}x{} @ {:.2} fps",
            path, metadata.width, metadata.height, metadata.fps
        );

        let mut child = Command::new("ffmpeg")
            .args(["-v", "error", "-i"])
            .arg(path)
            .args(["-f", "rawvideo", "-pix_fmt", "rgb24", "pipe:1"])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| SourceError::DecodeFailed {
                reason: format!("failed to spawn ffmpeg: {}", e),
            })?;

        let stdout = child.stdout.take().ok_or_else(|| SourceError::DecodeFailed {
            reason: "ffmpeg stdout unavailable".to_string(),
        })?;

        let frame_bytes = metadata.width as usize * metadata.height as usize * 3;
        Ok(Self {
            metadata,
            child,
            stdout,
            frame_bytes,
            exhausted: false,
        })
    }

    fn probe(path: &Path) -> Result<SourceMetadata> {
        let output = Command::new("ffprobe")
            .args([
                "-v",
                "error",
                "-select_streams",
                "v:0",
                "-show_entries",
                "stream=width,height,r_frame_rate,nb_frames",
                "-of",
                "json",
            ])
            .arg(path)
            .output()
            .map_err(|e| SourceError::ProbeFailed {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;

        if !output.status.success() {
            return Err(SourceError::OpenFailed {
                path: path.display().to_string(),
            }
            .into());
        }

        let probed: FfprobeOutput =
            serde_json::from_slice(&output.stdout).map_err(|e| SourceError::ProbeFailed {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;

        let stream = probed
            .streams
            .into_iter()
            .next()
            .ok_or_else(|| SourceError::OpenFailed {
                path: path.display().to_string(),
            })?;

        let (width, height) = match (stream.width, stream.height) {
            (Some(w), Some(h)) if w > 0 && h > 0 => (w, h),
            _ => {
                return Err(SourceError::ProbeFailed {
                    path: path.display().to_string(),
                    reason: "stream has no usable dimensions".to_string(),
                }
                .into())
            }
        };

        let fps = stream
            .r_frame_rate
            .as_deref()
            .and_then(parse_rational)
            .unwrap_or(30.0);
        let frame_count = stream.nb_frames.as_deref().and_then(|s| s.parse().ok());

        Ok(SourceMetadata {
            width,
            height,
            fps,
            frame_count,
        })
    }
}

impl FrameSource for FfmpegSource {
    fn metadata(&self) -> &SourceMetadata {
        &self.metadata
    }

    fn next_frame(&mut self) -> Result<Option<Frame>> {
        if self.exhausted {
            return Ok(None);
        }

        let mut buffer = vec![0u8; self.frame_bytes];
        let mut filled = 0usize;
        while filled < self.frame_bytes {
            match self.stdout.read(&mut buffer[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    return Err(SourceError::DecodeFailed {
                        reason: e.to_string(),
                    }
                    .into())
                }
            }
        }

        if filled == 0 {
            self.exhausted = true;
            return Ok(None);
        }
        if filled < self.frame_bytes {
            warn!(
                "truncated trailing frame ({} of {} bytes), dropping it",
                filled, self.frame_bytes
            );
            self.exhausted = true;
            return Ok(None);
        }

        let frame = Frame::from_rgb_bytes(self.metadata.width, self.metadata.height, buffer)
            .ok_or_else(|| SourceError::DecodeFailed {
                reason: "decoded bytes did not form a frame".to_string(),
            })?;
        Ok(Some(frame))
    }
}

impl Drop for FfmpegSource {
    fn drop(&mut self) {
        // Reap the decoder on every exit path
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

fn parse_rational(s: &str) -> Option<f64> {
    match s.split_once('/') {
        Some((num, den)) => {
            let num: f64 = num.parse().ok()?;
            let den: f64 = den.parse().ok()?;
            if den == 0.0 {
                None
            } else {
                Some(num / den)
            }
        }
        None => s.parse().ok(),
    }
}

/// In-memory source for tests and the single-image path
pub struct MemorySource {
    metadata: SourceMetadata,
    frames: std::vec::IntoIter<Frame>,
}

impl MemorySource {
    pub fn new(frames: Vec<Frame>, fps: f64) -> Self {
        let (width, height) = frames
            .first()
            .map(|f| (f.width(), f.height()))
            .unwrap_or((0, 0));
        let metadata = SourceMetadata {
            width,
            height,
            fps,
            frame_count: Some(frames.len() as u64),
        };
        Self {
            metadata,
            frames: frames.into_iter(),
        }
    }
}

impl FrameSource for MemorySource {
    fn metadata(&self) -> &SourceMetadata {
        &self.metadata
    }

    fn next_frame(&mut self) -> Result<Option<Frame>> {
        Ok(self.frames.next())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_rational() {
        assert_eq!(parse_rational("30000/1001").map(|f| (f * 100.0).round()), Some(2997.0));
        assert_eq!(parse_rational("25/1"), Some(25.0));
        assert_eq!(parse_rational("24"), Some(24.0));
        assert_eq!(parse_rational("1/0"), None);
    }

    #[test]
    fn test_memory_source_drains_in_order() {
        let frames = vec![
            Frame::new_filled(4, 4, [1, 1, 1]),
            Frame::new_filled(4, 4, [2, 2, 2]),
        ];
        let mut source = MemorySource::new(frames, 30.0);
        assert_eq!(source.metadata().frame_count, Some(2));
        assert_eq!(source.next_frame().unwrap().unwrap().get_pixel(0, 0), [1, 1, 1]);
        assert_eq!(source.next_frame().unwrap().unwrap().get_pixel(0, 0), [2, 2, 2]);
        assert!(source.next_frame().unwrap().is_none());
    }
}
