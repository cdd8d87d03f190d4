//! Subscriber-side view of a hub.

use super::broadcast::HubShared;
use crate::error::{CourierError, Result};
use crate::queue::{Dequeue, Endpoint};
use crate::shutdown::ShutdownLatch;
use crate::types::SubscriptionId;
use crate::waiters::Woken;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

/// A cursor into a hub's shared log.
///
/// Exclusively owned by whoever called [`Hub::subscribe`](crate::Hub::subscribe).
/// Reading advances only this cursor. Dropping the subscription unregisters
/// it on every exit path, which may let the hub free log entries and
/// unblock Backpressure publishers.
pub struct Subscription<T> {
    id: SubscriptionId,
    hub: Arc<HubShared<T>>,
    latch: Arc<ShutdownLatch>,
}

impl<T> Subscription<T> {
    pub(crate) fn new(
        id: SubscriptionId,
        hub: Arc<HubShared<T>>,
        latch: Arc<ShutdownLatch>,
    ) -> Self {
        Self { id, hub, latch }
    }

    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Unregister now rather than at end of scope.
    pub fn unsubscribe(self) {
        drop(self);
    }

    pub fn capacity(&self) -> Option<usize> {
        self.hub.config.capacity
    }

    /// Items published since this subscriber's cursor. Zero once closed.
    pub fn size(&self) -> usize {
        self.hub.state.lock().pending(self.id).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    /// True once unsubscribed or the hub shut down.
    pub fn is_shutdown(&self) -> bool {
        self.latch.is_tripped()
    }

    /// Close this subscription only; the hub and other subscribers carry on.
    pub fn shutdown(&self) {
        self.hub.unregister(self.id);
    }

    /// Block until this subscription is closed.
    pub fn await_shutdown(&self) {
        self.latch.wait();
    }
}

impl<T: Clone> Subscription<T> {
    /// Next item in publish order, blocking until one is published.
    pub fn take(&self) -> Result<T> {
        self.take_until(None)
    }

    /// Take, giving up with `Interrupted(Cancelled)` after `timeout`.
    pub fn take_timeout(&self, timeout: Duration) -> Result<T> {
        self.take_until(Some(Instant::now() + timeout))
    }

    fn take_until(&self, deadline: Option<Instant>) -> Result<T> {
        loop {
            let (waiter, wait) = {
                let mut state = self.hub.state.lock();
                if state.shut_down {
                    return Err(CourierError::shutdown());
                }
                match state.read(self.id, 1) {
                    None => return Err(CourierError::shutdown()),
                    Some(mut items) => {
                        if let Some(item) = items.pop() {
                            return Ok(item);
                        }
                    }
                }
                state.park_reader()
            };

            match wait.wait(deadline) {
                // Woken by an append, by a close, or by shutdown: look again.
                Woken::Ready(()) | Woken::Released => continue,
                Woken::TimedOut => {
                    let mut state = self.hub.state.lock();
                    state.unpark_reader(waiter);
                    if !state.shut_down {
                        if let Some(item) = state.read(self.id, 1).and_then(|mut v| v.pop()) {
                            return Ok(item);
                        }
                    }
                    debug!(subscription = %self.id, "take cancelled by deadline");
                    return Err(CourierError::cancelled());
                }
            }
        }
    }

    /// Next item if one is already published. Never blocks.
    pub fn poll(&self) -> Result<Option<T>> {
        Ok(self.read(1)?.pop())
    }

    /// Up to `max` already-published items. Never blocks.
    pub fn take_up_to(&self, max: usize) -> Result<Vec<T>> {
        self.read(max)
    }

    /// Every already-published item. Never blocks.
    pub fn take_all(&self) -> Result<Vec<T>> {
        self.read(usize::MAX)
    }

    fn read(&self, max: usize) -> Result<Vec<T>> {
        let mut state = self.hub.state.lock();
        if state.shut_down {
            return Err(CourierError::shutdown());
        }
        state.read(self.id, max).ok_or_else(CourierError::shutdown)
    }
}

impl<T> Drop for Subscription<T> {
    fn drop(&mut self) {
        self.hub.unregister(self.id);
    }
}

impl<T> std::fmt::Debug for Subscription<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("closed", &self.is_shutdown())
            .finish()
    }
}

impl<T> Endpoint for Subscription<T> {
    fn capacity(&self) -> Option<usize> {
        Subscription::capacity(self)
    }

    fn size(&self) -> usize {
        Subscription::size(self)
    }

    fn is_shutdown(&self) -> bool {
        Subscription::is_shutdown(self)
    }

    fn shutdown(&self) {
        Subscription::shutdown(self)
    }

    fn await_shutdown(&self) {
        Subscription::await_shutdown(self)
    }
}

impl<T: Clone> Dequeue<T> for Subscription<T> {
    fn take(&self) -> Result<T> {
        Subscription::take(self)
    }

    fn take_timeout(&self, timeout: Duration) -> Result<T> {
        Subscription::take_timeout(self, timeout)
    }

    fn poll(&self) -> Result<Option<T>> {
        Subscription::poll(self)
    }

    fn take_up_to(&self, max: usize) -> Result<Vec<T>> {
        Subscription::take_up_to(self, max)
    }

    fn take_all(&self) -> Result<Vec<T>> {
        Subscription::take_all(self)
    }
}
