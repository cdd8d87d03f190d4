//! Capability-restricted views.
//!
//! A component that only holds an `impl Dequeue<T>` can take but never
//! offer, and vice versa. [`Queue`](super::Queue) implements both;
//! [`Hub`](crate::Hub) is an `Enqueue` and each
//! [`Subscription`](crate::Subscription) is a `Dequeue`.

use crate::error::Result;
use std::time::Duration;

/// Operations shared by both sides.
pub trait Endpoint {
    /// Fixed capacity (None = unbounded).
    fn capacity(&self) -> Option<usize>;

    /// Items currently waiting to be taken.
    fn size(&self) -> usize;

    fn is_shutdown(&self) -> bool;

    /// Idempotent. Releases every parked caller with `Interrupted`.
    fn shutdown(&self);

    /// Block until shut down.
    fn await_shutdown(&self);

    fn is_empty(&self) -> bool {
        self.size() == 0
    }

    fn is_full(&self) -> bool {
        self.capacity().map_or(false, |cap| self.size() >= cap)
    }
}

/// The offer family.
pub trait Enqueue<T>: Endpoint {
    /// Returns `Ok(false)` when a Dropping structure discards the item.
    fn offer(&self, item: T) -> Result<bool>;

    /// Offer a batch. Items of one batch stay contiguous and in order.
    fn offer_all<I: IntoIterator<Item = T>>(&self, items: I) -> Result<usize>;

    /// Offer, giving up with `Interrupted(Cancelled)` after `timeout`.
    fn offer_timeout(&self, item: T, timeout: Duration) -> Result<bool>;
}

/// The take family.
pub trait Dequeue<T>: Endpoint {
    /// Block until an item is available.
    fn take(&self) -> Result<T>;

    /// Take, giving up with `Interrupted(Cancelled)` after `timeout`.
    fn take_timeout(&self, timeout: Duration) -> Result<T>;

    /// Never blocks.
    fn poll(&self) -> Result<Option<T>>;

    /// Up to `max` immediately available items. Never blocks.
    fn take_up_to(&self, max: usize) -> Result<Vec<T>>;

    /// Everything immediately available. Never blocks.
    fn take_all(&self) -> Result<Vec<T>>;

    /// Block until at least `min` items were taken; return at most `max`.
    fn take_between(&self, min: usize, max: usize) -> Result<Vec<T>> {
        let mut taken = self.take_up_to(max)?;
        while taken.len() < min.min(max) {
            taken.push(self.take()?);
            let more = self.take_up_to(max - taken.len())?;
            taken.extend(more);
        }
        Ok(taken)
    }
}
