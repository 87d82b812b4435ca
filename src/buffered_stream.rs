//! Background-filled ring buffer over a byte source.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{debug, trace};

use crate::config::StreamConfig;
use crate::error::StreamError;
use crate::semaphore::Semaphore;
use crate::stream::ByteStream;

/// Backoff before re-polling a source that reported EOF while
/// `end_with_source` is off.
const SOURCE_IDLE_BACKOFF: Duration = Duration::from_millis(10);

/// Ring storage and cursors. Guarded by the buffer mutex so cursor updates
/// are atomic with the bytes they describe.
struct Ring {
    buf: Vec<u8>,
    read_pos: usize,
    write_pos: usize,
}

impl Ring {
    /// Contiguous run from `pos` to the wrap point.
    fn span_to_end(&self, pos: usize) -> usize {
        self.buf.len() - pos
    }

    fn advance_read(&mut self, n: usize) {
        self.read_pos += n;
        if self.read_pos == self.buf.len() {
            self.read_pos = 0;
        }
    }

    fn advance_write(&mut self, n: usize) {
        self.write_pos += n;
        if self.write_pos == self.buf.len() {
            self.write_pos = 0;
        }
    }
}

/// State shared between the stream handle and the producer thread.
struct Shared {
    ring: Mutex<Ring>,
    /// Bytes currently valid for consumption. Only the producer increases
    /// it, only the consumer decreases it; status predicates read it
    /// lock-free.
    available: AtomicUsize,
    /// Bytes delivered to callers since `open`.
    read_total: AtomicUsize,
    terminate: AtomicBool,
    /// Posted by the consumer after each read/skip; waited on by a producer
    /// parked on a full buffer.
    space_sem: Semaphore,
    /// Posted by the producer on each rising crossing of the ready mark,
    /// and once more when it exits.
    ready_sem: Semaphore,
}

impl Shared {
    /// Resets cursors and counters.
    ///
    /// Deliberately leaves `terminate` and the semaphores alone: after
    /// `close`, a consumer still parked on the ready signal needs both the
    /// terminate flag and the producer's exit post to observe shutdown.
    /// `open` clears them, when nothing can be waiting.
    fn reset(&self) {
        let mut ring = self.ring.lock().unwrap();
        ring.read_pos = 0;
        ring.write_pos = 0;
        self.available.store(0, Ordering::SeqCst);
        self.read_total.store(0, Ordering::SeqCst);
    }
}

/// A bounded ring buffer filled by a background producer.
///
/// `BufferedStream` wraps an arbitrary [`ByteStream`] and decouples its
/// jitter from the consumer: once opened, a producer thread pulls
/// fixed-size chunks from the source into a circular buffer, and `read`
/// serves bytes out of that buffer without ever touching the source.
///
/// Flow control is hysteresis-based. The stream becomes *ready* when the
/// buffered byte count rises to `ready_threshold` (posting the
/// [`ready_signal`](BufferedStream::ready_signal) once per crossing) and
/// *not ready* when it falls back to `not_ready_threshold`. With
/// `wait_for_ready` set, `read` blocks across the not-ready band instead of
/// returning short; in that mode `end_with_source` should usually be set
/// too, otherwise `read` blocks forever once the source ends.
///
/// Reads are single-span: a call never crosses the wrap point, so a caller
/// asking for more than the contiguous run receives a short read. This is
/// ordinary stream behavior — loop to fill a buffer.
///
/// # Example
///
/// ```
/// use bytepump::{BufferedStream, MemoryStream, StreamConfig};
/// use std::sync::Arc;
///
/// let config = StreamConfig::with_capacity(16)
///     .with_wait_for_ready()
///     .with_end_with_source();
/// let stream = BufferedStream::new(config).unwrap();
///
/// stream.open(Arc::new(MemoryStream::new(vec![1, 2, 3, 4, 5]))).unwrap();
///
/// let mut out = Vec::new();
/// let mut buf = [0u8; 16];
/// loop {
///     let n = stream.read(&mut buf);
///     if n == 0 {
///         break; // source drained
///     }
///     out.extend_from_slice(&buf[..n]);
/// }
/// assert_eq!(out, vec![1, 2, 3, 4, 5]);
/// stream.close();
/// ```
pub struct BufferedStream {
    config: StreamConfig,
    shared: Arc<Shared>,
    source: Mutex<Option<Arc<dyn ByteStream>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
    running: AtomicBool,
}

impl BufferedStream {
    /// Creates a dormant stream with the given configuration.
    ///
    /// The ring is allocated here, so neither `open` nor the data path
    /// allocates. Returns an error if the configuration violates the
    /// threshold relationships (see [`StreamConfig::validate`]).
    pub fn new(config: StreamConfig) -> Result<Self, StreamError> {
        config.validate()?;
        Ok(Self {
            shared: Arc::new(Shared {
                ring: Mutex::new(Ring {
                    buf: vec![0u8; config.buffer_size],
                    read_pos: 0,
                    write_pos: 0,
                }),
                available: AtomicUsize::new(0),
                read_total: AtomicUsize::new(0),
                terminate: AtomicBool::new(false),
                space_sem: Semaphore::new(0),
                ready_sem: Semaphore::new(0),
            }),
            source: Mutex::new(None),
            worker: Mutex::new(None),
            running: AtomicBool::new(false),
            config,
        })
    }

    /// Installs a source and starts the producer thread.
    ///
    /// Fails with [`StreamError::AlreadyOpen`] if the stream is open, in
    /// which case nothing changes. Cursors and counters start from zero
    /// even if the stream was used before.
    pub fn open(&self, source: Arc<dyn ByteStream>) -> Result<(), StreamError> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(StreamError::AlreadyOpen);
        }
        self.shared.reset();
        // Nothing can be waiting between sessions, so posts left over from
        // the previous one are safe to discard here.
        self.shared.space_sem.drain();
        self.shared.ready_sem.drain();
        self.shared.terminate.store(false, Ordering::SeqCst);
        *self.source.lock().unwrap() = Some(source.clone());

        let shared = self.shared.clone();
        let config = self.config.clone();
        let spawned = thread::Builder::new()
            .name(self.config.task_name.clone())
            .spawn(move || pump(&shared, source.as_ref(), &config));

        match spawned {
            Ok(handle) => {
                *self.worker.lock().unwrap() = Some(handle);
                debug!(
                    task = %self.config.task_name,
                    buffer_size = self.config.buffer_size,
                    "stream opened"
                );
                Ok(())
            }
            Err(e) => {
                *self.source.lock().unwrap() = None;
                self.running.store(false, Ordering::SeqCst);
                Err(StreamError::Spawn(e))
            }
        }
    }

    /// Stops the producer and resets the stream to its dormant state.
    ///
    /// Unblocks a producer parked on buffer space, joins the thread, drops
    /// the source reference, and clears cursors, counters, and pending
    /// signals. Safe to call repeatedly; the second call is a no-op.
    pub fn close(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            return;
        }
        debug!(task = %self.config.task_name, "closing stream");
        self.shared.terminate.store(true, Ordering::SeqCst);
        self.shared.space_sem.signal();
        if let Some(worker) = self.worker.lock().unwrap().take() {
            let _ = worker.join();
        }
        *self.source.lock().unwrap() = None;
        self.shared.reset();
    }

    /// Reads up to `dst.len()` bytes from the buffer.
    ///
    /// Returns 0 if the stream is not open. With `wait_for_ready`, blocks
    /// while the stream is not ready; a return of 0 then means the producer
    /// has terminated and the buffer is drained. Without it, returns
    /// whatever is contiguously available, possibly 0.
    pub fn read(&self, dst: &mut [u8]) -> usize {
        self.consume(dst.len(), Some(dst))
    }

    /// Discards up to `len` bytes from the buffer.
    ///
    /// Identical to [`read`](BufferedStream::read) except no copy occurs.
    /// Skipped bytes count toward [`position`](BufferedStream::position).
    pub fn skip(&self, len: usize) -> usize {
        self.consume(len, None)
    }

    fn consume(&self, len: usize, dst: Option<&mut [u8]>) -> usize {
        if !self.running.load(Ordering::SeqCst) {
            return 0;
        }

        if self.config.wait_for_ready {
            while self.is_not_ready() && !self.shared.terminate.load(Ordering::SeqCst) {
                self.shared.ready_sem.wait();
            }
            if self.shared.terminate.load(Ordering::SeqCst)
                && self.shared.available.load(Ordering::SeqCst) == 0
            {
                return 0;
            }
            if !self.running.load(Ordering::SeqCst) {
                return 0;
            }
        }

        let mut ring = self.shared.ring.lock().unwrap();
        let available = self.shared.available.load(Ordering::SeqCst);
        let read_pos = ring.read_pos;
        let n = len.min(available).min(ring.span_to_end(read_pos));
        if let Some(dst) = dst {
            dst[..n].copy_from_slice(&ring.buf[read_pos..read_pos + n]);
        }
        ring.advance_read(n);
        self.shared.available.fetch_sub(n, Ordering::SeqCst);
        self.shared.read_total.fetch_add(n, Ordering::SeqCst);
        drop(ring);

        self.shared.space_sem.signal();
        n
    }

    /// Whether a safe amount of data (at least `ready_threshold` bytes) is
    /// buffered. Lock-free.
    pub fn is_ready(&self) -> bool {
        self.shared.available.load(Ordering::SeqCst) >= self.config.ready_threshold
    }

    /// Whether the buffered amount has fallen to `not_ready_threshold` or
    /// below — data is being read faster than it can be refilled.
    /// Lock-free.
    pub fn is_not_ready(&self) -> bool {
        self.shared.available.load(Ordering::SeqCst) <= self.config.not_ready_threshold
    }

    /// Bytes currently available to read. Lock-free.
    pub fn available(&self) -> usize {
        self.shared.available.load(Ordering::SeqCst)
    }

    /// Total bytes delivered to callers since `open`.
    pub fn position(&self) -> usize {
        self.shared.read_total.load(Ordering::SeqCst)
    }

    /// The source's reported size, or 0 if unknown or not open.
    pub fn size(&self) -> usize {
        self.source
            .lock()
            .unwrap()
            .as_ref()
            .map(|s| s.size())
            .unwrap_or(0)
    }

    /// Signal posted when the stream becomes ready. Callers can wait on
    /// this instead of polling [`is_ready`](BufferedStream::is_ready).
    pub fn ready_signal(&self) -> &Semaphore {
        &self.shared.ready_sem
    }
}

impl ByteStream for BufferedStream {
    fn read(&self, dst: &mut [u8]) -> usize {
        BufferedStream::read(self, dst)
    }

    fn skip(&self, len: usize) -> usize {
        BufferedStream::skip(self, len)
    }

    fn position(&self) -> usize {
        BufferedStream::position(self)
    }

    fn size(&self) -> usize {
        BufferedStream::size(self)
    }

    fn close(&self) {
        BufferedStream::close(self)
    }
}

impl Drop for BufferedStream {
    fn drop(&mut self) {
        self.close();
    }
}

/// Producer loop. Pulls chunks from the source into the ring until
/// terminated, parking whenever the headroom is smaller than one chunk.
fn pump(shared: &Shared, source: &dyn ByteStream, config: &StreamConfig) {
    trace!(task = %config.task_name, "producer started");
    // Once parked, resume only after the consumer has freed the refill gap.
    let refill_gap = config.read_threshold.max(config.read_size);

    'pump: loop {
        if shared.terminate.load(Ordering::SeqCst) {
            break;
        }

        let free = config.buffer_size - shared.available.load(Ordering::SeqCst);
        if free < config.read_size {
            loop {
                shared.space_sem.wait();
                if shared.terminate.load(Ordering::SeqCst) {
                    break 'pump;
                }
                let free = config.buffer_size - shared.available.load(Ordering::SeqCst);
                if free >= refill_gap {
                    break;
                }
            }
            continue;
        }

        // The source writes directly into the ring; holding the mutex
        // across the call keeps the consumer from observing a
        // half-written region.
        let mut ring = shared.ring.lock().unwrap();
        let free = config.buffer_size - shared.available.load(Ordering::SeqCst);
        let write_pos = ring.write_pos;
        let span = config
            .read_size
            .min(ring.span_to_end(write_pos))
            .min(free);
        let n = source.read(&mut ring.buf[write_pos..write_pos + span]);

        if n > 0 {
            ring.advance_write(n);
            let before = shared.available.fetch_add(n, Ordering::SeqCst);
            drop(ring);
            if before < config.ready_threshold && before + n >= config.ready_threshold {
                trace!(task = %config.task_name, available = before + n, "ready mark crossed");
                shared.ready_sem.signal();
            }
        } else {
            drop(ring);
            if config.end_with_source {
                debug!(task = %config.task_name, "source ended, terminating");
                shared.terminate.store(true, Ordering::SeqCst);
                break;
            }
            thread::sleep(SOURCE_IDLE_BACKOFF);
        }
    }

    // A consumer blocked on readiness must observe termination.
    shared.ready_sem.signal();
    trace!(task = %config.task_name, "producer exited");
}
