//! Stream configuration.

use serde::{Deserialize, Serialize};

use crate::error::StreamError;

/// Default buffer capacity (4 KiB).
const DEFAULT_CAPACITY: usize = 4096;

/// Configuration for a [`BufferedStream`](crate::BufferedStream).
///
/// All values are fixed at construction. The thresholds express the
/// flow-control protocol between the background producer and the consumer:
///
/// - `read_size` — how many bytes the producer requests from the source per
///   refill chunk.
/// - `read_threshold` — how many bytes the consumer must free before a
///   sleeping producer resumes refilling.
/// - `ready_threshold` — the rising mark at which the stream reports
///   [`is_ready`](crate::BufferedStream::is_ready) and posts the ready
///   signal.
/// - `not_ready_threshold` — the falling mark at or below which the stream
///   reports [`is_not_ready`](crate::BufferedStream::is_not_ready). Must sit
///   strictly below `ready_threshold`; the gap between them is the
///   hysteresis band in which neither predicate holds.
///
/// # Example
///
/// ```
/// use bytepump::StreamConfig;
///
/// let config = StreamConfig::with_capacity(64 * 1024)
///     .with_wait_for_ready()
///     .with_end_with_source();
/// assert_eq!(config.buffer_size, 65536);
/// config.validate().unwrap();
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamConfig {
    /// Name for the producer thread. Observational only.
    pub task_name: String,
    /// Total ring capacity in bytes.
    pub buffer_size: usize,
    /// Bytes the consumer must free before the producer wakes to refill.
    pub read_threshold: usize,
    /// Bytes requested from the source per refill chunk.
    pub read_size: usize,
    /// Rising mark for readiness.
    pub ready_threshold: usize,
    /// Falling mark for not-readiness.
    pub not_ready_threshold: usize,
    /// Whether `read` blocks on the ready signal while the stream is
    /// not ready.
    pub wait_for_ready: bool,
    /// Whether the producer terminates when the source reports EOF, instead
    /// of treating it as transient and polling again.
    pub end_with_source: bool,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}

impl StreamConfig {
    /// Creates a configuration for the given buffer capacity, with the
    /// thresholds scaled proportionally: quarter-capacity chunks and refill
    /// gap, half-capacity ready mark, eighth-capacity not-ready mark.
    pub fn with_capacity(buffer_size: usize) -> Self {
        Self {
            task_name: "bytepump".to_string(),
            buffer_size,
            read_threshold: buffer_size / 4,
            read_size: (buffer_size / 4).max(1),
            ready_threshold: (buffer_size / 2).max(1),
            not_ready_threshold: buffer_size / 8,
            wait_for_ready: false,
            end_with_source: false,
        }
    }

    /// Sets the producer thread name.
    pub fn with_task_name(mut self, name: impl Into<String>) -> Self {
        self.task_name = name.into();
        self
    }

    /// Makes `read` block on the ready signal while the stream is not ready.
    pub fn with_wait_for_ready(mut self) -> Self {
        self.wait_for_ready = true;
        self
    }

    /// Makes the producer terminate when the source reports EOF.
    pub fn with_end_with_source(mut self) -> Self {
        self.end_with_source = true;
        self
    }

    /// Checks the threshold relationships.
    ///
    /// Enforced: `buffer_size > 0`, `read_size > 0`,
    /// `read_size <= buffer_size`, `read_threshold <= buffer_size`,
    /// `not_ready_threshold < ready_threshold <= buffer_size`.
    pub fn validate(&self) -> Result<(), StreamError> {
        if self.buffer_size == 0 {
            return Err(StreamError::ZeroBufferSize);
        }
        if self.read_size == 0 {
            return Err(StreamError::ZeroReadSize);
        }
        if self.read_size > self.buffer_size {
            return Err(StreamError::ReadSizeTooLarge {
                read_size: self.read_size,
                buffer_size: self.buffer_size,
            });
        }
        if self.read_threshold > self.buffer_size {
            return Err(StreamError::ReadThresholdTooLarge {
                read_threshold: self.read_threshold,
                buffer_size: self.buffer_size,
            });
        }
        if self.ready_threshold > self.buffer_size {
            return Err(StreamError::ReadyThresholdTooLarge {
                ready_threshold: self.ready_threshold,
                buffer_size: self.buffer_size,
            });
        }
        if self.not_ready_threshold >= self.ready_threshold {
            return Err(StreamError::NoHysteresis {
                not_ready_threshold: self.not_ready_threshold,
                ready_threshold: self.ready_threshold,
            });
        }
        Ok(())
    }
}
