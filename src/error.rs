//! Error types for stream configuration and lifecycle.

use thiserror::Error;

/// Errors surfaced by [`BufferedStream`](crate::BufferedStream) construction
/// and `open`.
///
/// Runtime data-path calls (`read`, `skip`) never fail: misuse and shutdown
/// races are reported as a zero return instead, so the hot path has no
/// exceptional control flow.
#[derive(Debug, Error)]
pub enum StreamError {
    /// The stream is already open; `close` it before reopening.
    #[error("bytepump: stream is already open")]
    AlreadyOpen,

    /// Buffer capacity must be nonzero.
    #[error("bytepump: buffer size must be greater than 0")]
    ZeroBufferSize,

    /// Chunk size must be nonzero; a zero-length source read is
    /// indistinguishable from EOF.
    #[error("bytepump: read size must be greater than 0")]
    ZeroReadSize,

    /// Chunk size cannot exceed the buffer capacity.
    #[error("bytepump: read size {read_size} exceeds buffer size {buffer_size}")]
    ReadSizeTooLarge { read_size: usize, buffer_size: usize },

    /// Refill gap cannot exceed the buffer capacity.
    #[error("bytepump: read threshold {read_threshold} exceeds buffer size {buffer_size}")]
    ReadThresholdTooLarge {
        read_threshold: usize,
        buffer_size: usize,
    },

    /// Ready mark cannot exceed the buffer capacity.
    #[error("bytepump: ready threshold {ready_threshold} exceeds buffer size {buffer_size}")]
    ReadyThresholdTooLarge {
        ready_threshold: usize,
        buffer_size: usize,
    },

    /// The not-ready mark must sit strictly below the ready mark, otherwise
    /// there is no hysteresis band and both predicates can hold at once.
    #[error(
        "bytepump: not-ready threshold {not_ready_threshold} must be below ready threshold {ready_threshold}"
    )]
    NoHysteresis {
        not_ready_threshold: usize,
        ready_threshold: usize,
    },

    /// The producer thread could not be spawned.
    #[error("bytepump: failed to spawn producer thread: {0}")]
    Spawn(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = StreamError::AlreadyOpen;
        assert_eq!(format!("{}", err), "bytepump: stream is already open");

        let err = StreamError::ReadSizeTooLarge {
            read_size: 128,
            buffer_size: 64,
        };
        assert_eq!(
            format!("{}", err),
            "bytepump: read size 128 exceeds buffer size 64"
        );
    }

    #[test]
    fn test_spawn_wraps_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::Other, "no threads left");
        let err = StreamError::from(io_err);
        assert!(format!("{}", err).contains("no threads left"));
    }
}
