//! Flow-controlled byte streaming over jittery sources.
//!
//! This crate provides [`BufferedStream`], a bounded ring buffer that
//! adapts a blocking byte source into a decoupled byte stream. A background
//! producer pulls fixed-size chunks from the source and deposits them into
//! a circular buffer; the consumer reads bytes out of the same buffer
//! without ever being exposed to the source's latency. The typical user is
//! an audio decoder on an embedded device fed by a network socket or slow
//! storage.
//!
//! # Flow control
//!
//! Readiness is hysteresis-based, with two marks on the buffered byte
//! count:
//!
//! - rising to `ready_threshold` makes the stream *ready* and posts the
//!   [`ready_signal`](BufferedStream::ready_signal) once;
//! - falling to `not_ready_threshold` makes it *not ready*.
//!
//! Between the marks neither predicate holds, so callers polling
//! [`is_ready`](BufferedStream::is_ready) /
//! [`is_not_ready`](BufferedStream::is_not_ready) as edge-triggered hints
//! don't oscillate around a single threshold. Callers that can't be
//! modified to poll can instead construct the stream with
//! `wait_for_ready`, which makes `read` block across the not-ready band.
//!
//! # Example
//!
//! ```
//! use bytepump::{BufferedStream, MemoryStream, StreamConfig};
//! use std::sync::Arc;
//!
//! let config = StreamConfig::with_capacity(4096)
//!     .with_wait_for_ready()
//!     .with_end_with_source();
//! let stream = BufferedStream::new(config).unwrap();
//!
//! stream.open(Arc::new(MemoryStream::new(b"some payload".to_vec()))).unwrap();
//!
//! let mut out = Vec::new();
//! let mut buf = [0u8; 64];
//! loop {
//!     let n = stream.read(&mut buf);
//!     if n == 0 {
//!         break;
//!     }
//!     out.extend_from_slice(&buf[..n]);
//! }
//! assert_eq!(out, b"some payload");
//! stream.close();
//! ```
//!
//! # Sources
//!
//! Anything implementing [`ByteStream`] can feed a stream. The trait takes
//! `&self` throughout so sources can be shared as `Arc<dyn ByteStream>`
//! between the caller and the producer thread. [`BufferedStream`]
//! implements it too, so streams can be layered.

mod buffered_stream;
mod config;
mod error;
mod semaphore;
mod stream;

pub use buffered_stream::BufferedStream;
pub use config::StreamConfig;
pub use error::StreamError;
pub use semaphore::Semaphore;
pub use stream::{ByteStream, MemoryStream};
