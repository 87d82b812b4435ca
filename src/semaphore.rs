//! Counting semaphore used for producer/consumer signaling.

use std::sync::{Condvar, Mutex};
use std::time::Duration;

/// A counting semaphore over `Mutex` + `Condvar`.
///
/// Posts accumulate: `signal` never blocks, and each `wait` consumes exactly
/// one post. Over-posting is tolerated, which lets the stream signal
/// unconditionally from shutdown paths without tracking whether anyone is
/// waiting.
///
/// # Example
///
/// ```
/// use bytepump::Semaphore;
/// use std::sync::Arc;
/// use std::thread;
///
/// let sem = Arc::new(Semaphore::new(0));
/// let waiter = sem.clone();
///
/// let handle = thread::spawn(move || waiter.wait());
/// sem.signal();
/// handle.join().unwrap();
/// ```
pub struct Semaphore {
    count: Mutex<usize>,
    posted: Condvar,
}

impl Semaphore {
    /// Creates a semaphore with the given initial count.
    pub fn new(initial: usize) -> Self {
        Self {
            count: Mutex::new(initial),
            posted: Condvar::new(),
        }
    }

    /// Blocks until a post is available, then consumes it.
    pub fn wait(&self) {
        let mut count = self.count.lock().unwrap();
        while *count == 0 {
            count = self.posted.wait(count).unwrap();
        }
        *count -= 1;
    }

    /// Blocks until a post is available or the timeout elapses.
    ///
    /// Returns `true` if a post was consumed.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let mut count = self.count.lock().unwrap();
        while *count == 0 {
            let (guard, result) = self.posted.wait_timeout(count, timeout).unwrap();
            count = guard;
            if result.timed_out() && *count == 0 {
                return false;
            }
        }
        *count -= 1;
        true
    }

    /// Consumes a post if one is available, without blocking.
    ///
    /// Returns `true` if a post was consumed.
    pub fn try_wait(&self) -> bool {
        let mut count = self.count.lock().unwrap();
        if *count == 0 {
            return false;
        }
        *count -= 1;
        true
    }

    /// Posts once, waking one waiter.
    pub fn signal(&self) {
        let mut count = self.count.lock().unwrap();
        *count += 1;
        self.posted.notify_one();
    }

    /// Discards all pending posts.
    ///
    /// Used between stream sessions so a reopened stream never observes
    /// posts left over from the previous one.
    pub(crate) fn drain(&self) {
        *self.count.lock().unwrap() = 0;
    }
}
