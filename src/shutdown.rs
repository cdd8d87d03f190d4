//! One-way shutdown latch.

use parking_lot::{Condvar, Mutex};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

/// Trips exactly once; every waiter is released when it does.
///
/// Each queue and hub owns one. Tripping it does not itself interrupt
/// parked takers or offerers; the owning structure does that while it
/// holds its own lock, then trips the latch for `await_shutdown` callers.
#[derive(Debug, Default)]
pub struct ShutdownLatch {
    tripped: AtomicBool,
    lock: Mutex<()>,
    cond: Condvar,
}

impl ShutdownLatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Trip the latch. Returns true only for the call that tripped it.
    pub fn trip(&self) -> bool {
        let _guard = self.lock.lock();
        if self.tripped.swap(true, Ordering::AcqRel) {
            return false;
        }
        self.cond.notify_all();
        true
    }

    pub fn is_tripped(&self) -> bool {
        self.tripped.load(Ordering::Acquire)
    }

    /// Block until tripped. Returns immediately if already tripped.
    pub fn wait(&self) {
        if self.is_tripped() {
            return;
        }
        let mut guard = self.lock.lock();
        while !self.is_tripped() {
            self.cond.wait(&mut guard);
        }
    }

    /// Block until tripped or `timeout` elapses. Returns whether it tripped.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        if self.is_tripped() {
            return true;
        }
        let deadline = Instant::now() + timeout;
        let mut guard = self.lock.lock();
        while !self.is_tripped() {
            if self.cond.wait_until(&mut guard, deadline).timed_out() {
                return self.is_tripped();
            }
        }
        true
    }
}
