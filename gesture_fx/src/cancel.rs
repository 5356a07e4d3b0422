//! Cooperative cancellation for the ramp thread.

use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

/// One-shot cancellation flag that a worker can also sleep on: a cancel
/// wakes any pending [`CancelToken::wait_timeout`] immediately.
#[derive(Debug, Default)]
pub struct CancelToken {
    cancelled: Mutex<bool>,
    wake:      Condvar,
}

impl CancelToken {
    pub fn new() -> Self {
        CancelToken::default()
    }

    pub fn cancel(&self) {
        *self.cancelled.lock() = true;
        self.wake.notify_all();
    }

    pub fn is_cancelled(&self) -> bool {
        *self.cancelled.lock()
    }

    /// Sleep for up to `timeout`. Returns `true` if cancelled, either
    /// before the call or while waiting.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut cancelled = self.cancelled.lock();
        while !*cancelled {
            if self.wake.wait_until(&mut cancelled, deadline).timed_out() {
                break;
            }
        }
        *cancelled
    }
}
