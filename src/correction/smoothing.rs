//! Temporal smoothing of the bright-strategy correction factor.
//!
//! Averaging the factor over a sliding window of recent frames keeps
//! consecutive frames from flickering when scene brightness jumps. The
//! smoother is deliberately order-sensitive: it must be fed factors in frame
//! order, exactly once per bright-strategy frame.

use std::collections::VecDeque;

/// Sliding-window mean over recent correction factors
///
/// Owned by the job, not the corrector, so the single-writer requirement
/// under chunked parallel execution stays visible at the call site.
#[derive(Debug, Clone)]
pub struct TemporalSmoother {
    window_size: usize,
    history: VecDeque<f64>,
}

impl TemporalSmoother {
    /// Create a smoother with the given window size (entries, not seconds)
    pub fn new(window_size: usize) -> Self {
        let window_size = window_size.max(1);
        Self {
            window_size,
            history: VecDeque::with_capacity(window_size),
        }
    }

    /// Append a raw factor and return the mean of the current window
    pub fn smooth(&mut self, raw_factor: f64) -> f64 {
        self.history.push_back(raw_factor);
        if self.history.len() > self.window_size {
            self.history.pop_front();
        }
        self.history.iter().sum::<f64>() / self.history.len() as f64
    }

    /// Drop all history, ready for a new video job
    pub fn reset(&mut self) {
        self.history.clear();
    }

    /// Number of factors currently in the window
    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }
}
