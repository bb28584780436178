//! # Video Module
//!
//! Frame types plus the decoder/encoder boundary. Video decode and encode is
//! delegated to an external `ffmpeg` binary over rawvideo pipes; still images
//! go through the `image` crate.

pub mod sink;
pub mod source;
pub mod types;

pub use sink::{FfmpegSink, FrameSink, MemorySink};
pub use source::{FfmpegSource, FrameSource, MemorySource, SourceMetadata};
pub use types::{Frame, IndexedFrame, VideoParams};
