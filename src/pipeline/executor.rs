//! Chunked, order-preserving frame pipeline execution.
//!
//! The executor reads frames lazily, dispatches fixed-size chunks to a
//! bounded worker pool, and serializes writes by input order with a reorder
//! buffer. Temporal smoothing never runs inside workers: bright-strategy
//! frames come back with their raw factor and the single writer smooths,
//! scales and watermarks them in frame order.

use std::collections::BTreeMap;
use std::sync::mpsc;

use tracing::{debug, info, warn};

use crate::analysis::FrameMetricsAnalyzer;
use crate::correction::{ExposureCorrector, Strategy, TemporalSmoother};
use crate::error::{PipelineError, Result};
use crate::video::sink::FrameSink;
use crate::video::source::FrameSource;
use crate::video::types::{Frame, IndexedFrame};
use crate::watermark::WatermarkCompositor;

/// Frames between coarse progress log lines
const PROGRESS_INTERVAL: u64 = 100;

/// Worker output for one frame
enum ProcessedFrame {
    /// Fully corrected and watermarked, ready to write
    Done(Frame),

    /// Bright-strategy frame awaiting its smoothed scale factor
    PendingScale { frame: Frame, raw_factor: f64 },
}

/// Runs the correction/watermark pipeline over a frame stream
pub struct ChunkedPipelineExecutor {
    analyzer: FrameMetricsAnalyzer,
    corrector: ExposureCorrector,
    compositor: Option<WatermarkCompositor>,
    chunk_size: usize,
    smoothing_window: usize,
    pool: rayon::ThreadPool,
}

impl ChunkedPipelineExecutor {
    pub fn new(
        corrector: ExposureCorrector,
        compositor: Option<WatermarkCompositor>,
        chunk_size: usize,
        worker_count: usize,
        smoothing_window: usize,
    ) -> Result<Self> {
        if chunk_size == 0 {
            return Err(PipelineError::InvalidParameters {
                details: "chunk_size must be at least 1".to_string(),
            }
            .into());
        }

        let worker_count = if worker_count == 0 {
            num_cpus::get()
        } else {
            worker_count
        };

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(worker_count)
            .build()
            .map_err(|e| PipelineError::WorkerPoolFailed {
                reason: e.to_string(),
            })?;

        Ok(Self {
            analyzer: FrameMetricsAnalyzer::new(),
            corrector,
            compositor,
            chunk_size,
            smoothing_window,
            pool,
        })
    }

    /// Process every frame from `source` into `sink`, preserving order
    ///
    /// Returns the number of frames written. Per-frame failures substitute
    /// the original frame; source/sink failures abort.
    pub fn run(&self, source: &mut dyn FrameSource, sink: &mut dyn FrameSink) -> Result<u64> {
        let total_hint = source.metadata().frame_count;
        let max_in_flight = self.pool.current_num_threads().max(1);
        debug!(
            "Executor starting: chunk_size={}, workers={}, expected_frames={:?}",
            self.chunk_size,
            self.pool.current_num_threads(),
            total_hint
        );

        // The reader/writer loop stays on the calling thread; only chunk
        // processing runs inside the pool. Blocking on recv here must never
        // occupy a pool thread or a single-worker pool would starve.
        let frames_written = self.pool.in_place_scope(|scope| -> Result<u64> {
            let (tx, rx) = mpsc::channel::<(u64, Vec<(u64, ProcessedFrame)>)>();

            let mut next_frame_index = 0u64;
            let mut next_chunk_index = 0u64;
            let mut next_write_chunk = 0u64;
            let mut in_flight = 0usize;
            let mut source_done = false;
            let mut pending: BTreeMap<u64, Vec<(u64, ProcessedFrame)>> = BTreeMap::new();
            let mut smoother = TemporalSmoother::new(self.smoothing_window);
            let mut frames_written = 0u64;

            loop {
                // Keep the pool fed without buffering the whole stream
                while !source_done && in_flight < max_in_flight {
                    let chunk = read_chunk(source, self.chunk_size, &mut next_frame_index)?;
                    if chunk.is_empty() {
                        source_done = true;
                        break;
                    }
                    let chunk_index = next_chunk_index;
                    next_chunk_index += 1;
                    in_flight += 1;

                    let tx = tx.clone();
                    scope.spawn(move |_| {
                        let results: Vec<(u64, ProcessedFrame)> = chunk
                            .into_iter()
                            .map(|f| (f.index, self.process_frame(f)))
                            .collect();
                        // Receiver outlives all workers; a send failure only
                        // happens after the run already aborted
                        let _ = tx.send((chunk_index, results));
                    });
                }

                if in_flight == 0 && pending.is_empty() {
                    break;
                }

                if in_flight > 0 {
                    let (chunk_index, results) =
                        rx.recv().map_err(|_| PipelineError::WorkerPoolFailed {
                            reason: "worker channel closed unexpectedly".to_string(),
                        })?;
                    in_flight -= 1;
                    pending.insert(chunk_index, results);
                }

                // Flush every chunk whose predecessors are already written
                while let Some(results) = pending.remove(&next_write_chunk) {
                    for (frame_index, processed) in results {
                        let frame = self.finalize_frame(processed, &mut smoother);
                        sink.write_frame(&frame)?;
                        frames_written += 1;
                        if frames_written % PROGRESS_INTERVAL == 0 {
                            match total_hint {
                                Some(total) if total > 0 => info!(
                                    "Processed {}/{} frames ({:.1}%)",
                                    frames_written,
                                    total,
                                    frames_written as f64 / total as f64 * 100.0
                                ),
                                _ => info!("Processed {} frames", frames_written),
                            }
                        }
                        debug!("wrote frame {}", frame_index);
                    }
                    next_write_chunk += 1;
                }
            }

            Ok(frames_written)
        })?;

        sink.finish()?;
        info!("Executor finished: {} frames written", frames_written);
        Ok(frames_written)
    }

    /// Worker-side per-frame work: analysis, correction, watermark
    ///
    /// Never fails; a frame that cannot be analyzed or corrected passes
    /// through unmodified (watermarked if watermarking is on).
    fn process_frame(&self, indexed: IndexedFrame) -> ProcessedFrame {
        let IndexedFrame { index, frame } = indexed;

        let metrics = match self.analyzer.analyze(&frame, index) {
            Ok(metrics) => metrics,
            Err(e) => {
                warn!("frame {} failed analysis, passing through: {}", index, e);
                return ProcessedFrame::Done(self.watermark(frame));
            }
        };

        match self.corrector.select_strategy(&metrics) {
            Strategy::Bright => ProcessedFrame::PendingScale {
                frame,
                raw_factor: self.corrector.bright_factor(&metrics),
            },
            _ => {
                let corrected = match self.corrector.correct(&frame, &metrics, None) {
                    Ok(corrected) => corrected,
                    Err(e) => {
                        warn!("frame {} failed correction, passing through: {}", index, e);
                        frame
                    }
                };
                ProcessedFrame::Done(self.watermark(corrected))
            }
        }
    }

    /// Writer-side completion: smooth deferred bright frames in stream order
    fn finalize_frame(&self, processed: ProcessedFrame, smoother: &mut TemporalSmoother) -> Frame {
        match processed {
            ProcessedFrame::Done(frame) => frame,
            ProcessedFrame::PendingScale { frame, raw_factor } => {
                let factor = smoother.smooth(raw_factor);
                let scaled = self.corrector.scale_brightness(&frame, factor);
                self.watermark(scaled)
            }
        }
    }

    fn watermark(&self, frame: Frame) -> Frame {
        match &self.compositor {
            Some(compositor) => compositor.apply(&frame),
            None => frame,
        }
    }
}

/// Pull up to `chunk_size` frames from the source
fn read_chunk(
    source: &mut dyn FrameSource,
    chunk_size: usize,
    next_index: &mut u64,
) -> Result<Vec<IndexedFrame>> {
    let mut chunk = Vec::with_capacity(chunk_size);
    while chunk.len() < chunk_size {
        match source.next_frame()? {
            Some(frame) => {
                chunk.push(IndexedFrame::new(*next_index, frame));
                *next_index += 1;
            }
            None => break,
        }
    }
    Ok(chunk)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::correction::CorrectionThresholds;
    use crate::video::sink::MemorySink;
    use crate::video::source::MemorySource;

    fn executor(chunk_size: usize, workers: usize) -> ChunkedPipelineExecutor {
        ChunkedPipelineExecutor::new(
            ExposureCorrector::new(CorrectionThresholds::video()),
            None,
            chunk_size,
            workers,
            5,
        )
        .unwrap()
    }

    /// Distinct frames: a gradient offset by the frame's position
    fn tagged_frames(count: usize) -> Vec<Frame> {
        (0..count)
            .map(|i| {
                let mut frame = Frame::new_filled(16, 16, [0, 0, 0]);
                for y in 0..16u32 {
                    for x in 0..16u32 {
                        let v = ((x * 10 + y * 3 + i as u32 * 7) % 256) as u8;
                        frame.set_pixel(x, y, [v, v, v]);
                    }
                }
                frame
            })
            .collect()
    }

    #[test]
    fn test_rejects_zero_chunk_size() {
        assert!(ChunkedPipelineExecutor::new(
            ExposureCorrector::new(CorrectionThresholds::video()),
            None,
            0,
            1,
            5,
        )
        .is_err());
    }

    #[test]
    fn test_order_preserved_across_chunk_and_worker_counts() {
        // The pipeline is deterministic in frame order, so any chunking and
        // worker count must reproduce the sequential output exactly
        let reference_exec = executor(1, 1);
        let mut source = MemorySource::new(tagged_frames(50), 30.0);
        let mut reference = MemorySink::new();
        reference_exec.run(&mut source, &mut reference).unwrap();
        assert_eq!(reference.frames().len(), 50);

        for (chunk_size, workers) in [(1, 4), (7, 2), (16, 4), (64, 3)] {
            let executor = executor(chunk_size, workers);
            let mut source = MemorySource::new(tagged_frames(50), 30.0);
            let mut sink = MemorySink::new();
            let written = executor.run(&mut source, &mut sink).unwrap();

            assert_eq!(written, 50);
            assert_eq!(sink.frames().len(), 50);
            for (i, (got, want)) in sink.frames().iter().zip(reference.frames()).enumerate() {
                assert_eq!(
                    got.to_rgb_bytes(),
                    want.to_rgb_bytes(),
                    "output diverged at frame {} with chunk_size={} workers={}",
                    i,
                    chunk_size,
                    workers
                );
            }
        }
    }

    #[test]
    fn test_remainder_chunk_is_flushed() {
        let executor = executor(8, 2);
        let mut source = MemorySource::new(tagged_frames(13), 30.0);
        let mut sink = MemorySink::new();
        assert_eq!(executor.run(&mut source, &mut sink).unwrap(), 13);
        assert!(sink.is_finished());
    }

    #[test]
    fn test_empty_source_finishes_cleanly() {
        let executor = executor(4, 2);
        let mut source = MemorySource::new(Vec::new(), 30.0);
        let mut sink = MemorySink::new();
        assert_eq!(executor.run(&mut source, &mut sink).unwrap(), 0);
        assert!(sink.is_finished());
    }

    #[test]
    fn test_invalid_frames_pass_through() {
        // A zero-sized frame fails analysis and must still come out the far
        // end unmodified instead of aborting the stream
        let executor = executor(2, 2);
        let frames = vec![
            Frame::new_filled(8, 8, [100, 100, 100]),
            Frame::new_filled(0, 8, [0, 0, 0]),
            Frame::new_filled(8, 8, [100, 100, 100]),
        ];
        let mut source = MemorySource::new(frames, 30.0);
        let mut sink = MemorySink::new();
        assert_eq!(executor.run(&mut source, &mut sink).unwrap(), 3);
        assert!(sink.frames()[1].is_empty());
    }

    #[test]
    fn test_bright_frames_are_smoothed_in_order() {
        // All-bright stream: smoothing makes each output at least as bright
        // as the previous one would be with an unsmoothed factor jump
        let executor = executor(4, 4);
        let mut frames = Vec::new();
        for i in 0..12 {
            let v = if i < 6 { 250u8 } else { 215u8 };
            frames.push(Frame::new_filled(16, 16, [v, v, v]));
        }
        let mut source = MemorySource::new(frames, 30.0);
        let mut sink = MemorySink::new();
        assert_eq!(executor.run(&mut source, &mut sink).unwrap(), 12);

        // Outputs are darker than inputs (bright strategy applied)
        let first_out = sink.frames()[0].get_pixel(8, 8)[0];
        assert!(first_out < 250);
    }
}
