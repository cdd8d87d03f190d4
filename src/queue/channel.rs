//! Point-to-point queue: every item goes to exactly one taker.

use super::views::{Dequeue, Endpoint, Enqueue};
use crate::buffer::{BoundedBuffer, Offered};
use crate::error::{CourierError, Result};
use crate::shutdown::ShutdownLatch;
use crate::types::{OverflowStrategy, QueueConfig};
use crate::waiters::{signal, PendingOffer, Signal, WaitList, Woken};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, trace};

/// Everything mutable, guarded by one lock.
struct QueueState<T> {
    buffer: BoundedBuffer<T>,
    /// Never non-empty while `buffer` is non-empty.
    takers: WaitList<Signal<T>>,
    /// Only used under Backpressure.
    offerers: WaitList<PendingOffer<T>>,
    shut_down: bool,
}

impl<T> QueueState<T> {
    /// Hand `item` to the longest-waiting taker, else buffer it per strategy.
    fn admit(&mut self, mut item: T) -> Offered<T> {
        while let Some(taker) = self.takers.pop_front() {
            match taker.fire(item) {
                Ok(()) => return Offered::Accepted,
                Err(back) => item = back,
            }
        }
        self.buffer.offer(item)
    }

    /// Remove the oldest buffered item, then refill from parked offerers.
    fn take_one(&mut self) -> Option<T> {
        let item = self.buffer.pop()?;
        self.admit_pending();
        Some(item)
    }

    fn take_many(&mut self, max: usize) -> Vec<T> {
        let items = self.buffer.drain_front(max);
        if !items.is_empty() {
            self.admit_pending();
        }
        items
    }

    /// Move parked Backpressure items into freed room, oldest offerer first.
    fn admit_pending(&mut self) {
        while let Some(pending) = self.offerers.front_mut() {
            while let Some(item) = pending.items.pop_front() {
                if let Offered::Full(item) = self.buffer.offer(item) {
                    pending.items.push_front(item);
                    return;
                }
            }
            if let Some(done) = self.offerers.pop_front().map(|p| p.done) {
                // A gone offerer (cancelled mid-race) has nothing to learn.
                let _ = done.fire(());
            }
        }
    }
}

struct QueueShared<T> {
    state: Mutex<QueueState<T>>,
    latch: ShutdownLatch,
    config: QueueConfig,
}

/// Multi-producer, multi-consumer FIFO queue.
///
/// Cloning yields another handle to the same queue.
///
/// Suspension points are `take` on an empty queue and `offer` on a full
/// Backpressure queue. Everything else returns promptly.
pub struct Queue<T> {
    shared: Arc<QueueShared<T>>,
}

impl<T> Clone for Queue<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T> Queue<T> {
    /// Create a queue, rejecting a zero capacity.
    pub fn with_config(config: QueueConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(config))
    }

    fn build(config: QueueConfig) -> Self {
        debug!(capacity = ?config.capacity, strategy = %config.strategy, "queue created");

        Self {
            shared: Arc::new(QueueShared {
                state: Mutex::new(QueueState {
                    buffer: BoundedBuffer::new(config.capacity, config.strategy),
                    takers: WaitList::new(),
                    offerers: WaitList::new(),
                    shut_down: false,
                }),
                latch: ShutdownLatch::new(),
                config,
            }),
        }
    }

    /// Unbounded queue.
    pub fn unbounded() -> Self {
        Self::build(QueueConfig::unbounded())
    }

    /// Bounded queue with Backpressure.
    pub fn bounded(capacity: usize) -> Result<Self> {
        Self::with_config(QueueConfig::bounded(capacity))
    }

    /// Bounded queue that drops new items when full.
    pub fn dropping(capacity: usize) -> Result<Self> {
        Self::with_config(QueueConfig::dropping(capacity))
    }

    /// Bounded queue that evicts the oldest item when full.
    pub fn sliding(capacity: usize) -> Result<Self> {
        Self::with_config(QueueConfig::sliding(capacity))
    }

    pub fn strategy(&self) -> OverflowStrategy {
        self.shared.config.strategy
    }

    /// Fixed capacity (None = unbounded).
    pub fn capacity(&self) -> Option<usize> {
        self.shared.config.capacity
    }

    /// Buffered items only; parked takers and offerers are not counted.
    pub fn size(&self) -> usize {
        self.shared.state.lock().buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shared.state.lock().buffer.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.shared.state.lock().buffer.is_full()
    }

    pub fn is_shutdown(&self) -> bool {
        self.shared.state.lock().shut_down
    }

    // --- Offer family ---

    /// Offer one item.
    ///
    /// Returns `Ok(false)` if a Dropping queue discarded it. Blocks while a
    /// Backpressure queue is full.
    pub fn offer(&self, item: T) -> Result<bool> {
        self.offer_batch(vec![item], None).map(|n| n == 1)
    }

    /// Offer one item, giving up after `timeout`.
    ///
    /// On timeout the item is not admitted and the call returns
    /// `Interrupted(Cancelled)`.
    pub fn offer_timeout(&self, item: T, timeout: Duration) -> Result<bool> {
        self.offer_batch(vec![item], Some(Instant::now() + timeout))
            .map(|n| n == 1)
    }

    /// Offer a batch; returns how many items were accepted.
    ///
    /// The batch is enqueued contiguously and in order. Under Backpressure a
    /// batch larger than the free room is admitted partially and the caller
    /// blocks until the remainder fits.
    pub fn offer_all<I: IntoIterator<Item = T>>(&self, items: I) -> Result<usize> {
        self.offer_batch(items.into_iter().collect(), None)
    }

    fn offer_batch(&self, items: Vec<T>, deadline: Option<Instant>) -> Result<usize> {
        let total = items.len();
        let mut items: VecDeque<T> = items.into();

        let (id, wait) = {
            let mut state = self.shared.state.lock();
            if state.shut_down {
                return Err(CourierError::shutdown());
            }

            let mut accepted = 0;
            // Parked offerers keep their turn; new items queue behind them.
            if state.offerers.is_empty() {
                while let Some(item) = items.pop_front() {
                    match state.admit(item) {
                        Offered::Accepted => accepted += 1,
                        Offered::Slid(_) => {
                            trace!("sliding queue evicted oldest item");
                            accepted += 1;
                        }
                        Offered::Rejected(_) => trace!("dropping queue rejected item"),
                        Offered::Full(item) => {
                            items.push_front(item);
                            break;
                        }
                    }
                }
            }

            if items.is_empty() {
                return Ok(accepted);
            }

            let (done, wait) = signal();
            let id = state.offerers.register(PendingOffer { items, done });
            (id, wait)
        };

        match wait.wait(deadline) {
            Woken::Ready(()) => Ok(total),
            Woken::Released => Err(CourierError::shutdown()),
            Woken::TimedOut => {
                let mut state = self.shared.state.lock();
                if state.offerers.remove(id).is_some() {
                    debug!("offer cancelled by deadline");
                    return Err(CourierError::cancelled());
                }
                drop(state);
                // Completed (or shut down) between the timeout and the lock.
                match wait.try_take() {
                    Some(()) => Ok(total),
                    None => Err(CourierError::shutdown()),
                }
            }
        }
    }

    // --- Take family ---

    /// Remove the oldest item, blocking while empty.
    pub fn take(&self) -> Result<T> {
        self.take_until(None)
    }

    /// Take, giving up with `Interrupted(Cancelled)` after `timeout`.
    pub fn take_timeout(&self, timeout: Duration) -> Result<T> {
        self.take_until(Some(Instant::now() + timeout))
    }

    fn take_until(&self, deadline: Option<Instant>) -> Result<T> {
        let (id, wait) = {
            let mut state = self.shared.state.lock();
            if state.shut_down {
                return Err(CourierError::shutdown());
            }
            if let Some(item) = state.take_one() {
                return Ok(item);
            }
            let (sig, wait) = signal();
            (state.takers.register(sig), wait)
        };

        match wait.wait(deadline) {
            Woken::Ready(item) => Ok(item),
            Woken::Released => Err(CourierError::shutdown()),
            Woken::TimedOut => {
                let mut state = self.shared.state.lock();
                if state.takers.remove(id).is_some() {
                    debug!("take cancelled by deadline");
                    return Err(CourierError::cancelled());
                }
                drop(state);
                // An offer handed us an item just before the lock.
                wait.try_take().ok_or_else(CourierError::shutdown)
            }
        }
    }

    /// Oldest item if any. Never blocks.
    pub fn poll(&self) -> Result<Option<T>> {
        let mut state = self.shared.state.lock();
        if state.shut_down {
            return Err(CourierError::shutdown());
        }
        Ok(state.take_one())
    }

    /// Up to `max` buffered items, oldest first. Never blocks.
    pub fn take_up_to(&self, max: usize) -> Result<Vec<T>> {
        let mut state = self.shared.state.lock();
        if state.shut_down {
            return Err(CourierError::shutdown());
        }
        Ok(state.take_many(max))
    }

    /// Drain every buffered item. Never blocks.
    pub fn take_all(&self) -> Result<Vec<T>> {
        self.take_up_to(usize::MAX)
    }

    // --- Lifecycle ---

    /// Shut the queue down. Idempotent.
    ///
    /// Clears the buffer and releases every parked taker and offerer with
    /// `Interrupted(Shutdown)`.
    pub fn shutdown(&self) {
        let (takers, offerers) = {
            let mut state = self.shared.state.lock();
            if state.shut_down {
                return;
            }
            state.shut_down = true;
            state.buffer.clear();
            (state.takers.drain(), state.offerers.drain())
        };

        debug!(
            takers = takers.len(),
            offerers = offerers.len(),
            "queue shut down"
        );
        // Dropping the signals releases the parked callers.
        drop(takers);
        drop(offerers);
        self.shared.latch.trip();
    }

    /// Block until the queue is shut down.
    pub fn await_shutdown(&self) {
        self.shared.latch.wait();
    }

    /// Block until shut down or `timeout` elapses. Returns whether it was.
    pub fn await_shutdown_timeout(&self, timeout: Duration) -> bool {
        self.shared.latch.wait_timeout(timeout)
    }

    /// Number of parked takers (diagnostics).
    pub fn pending_takers(&self) -> usize {
        self.shared.state.lock().takers.len()
    }

    /// Number of parked offerers (diagnostics).
    pub fn pending_offerers(&self) -> usize {
        self.shared.state.lock().offerers.len()
    }
}

impl<T> std::fmt::Debug for Queue<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Queue")
            .field("capacity", &self.capacity())
            .field("strategy", &self.strategy())
            .field("size", &self.size())
            .finish()
    }
}

impl<T> Endpoint for Queue<T> {
    fn capacity(&self) -> Option<usize> {
        Queue::capacity(self)
    }

    fn size(&self) -> usize {
        Queue::size(self)
    }

    fn is_shutdown(&self) -> bool {
        Queue::is_shutdown(self)
    }

    fn shutdown(&self) {
        Queue::shutdown(self)
    }

    fn await_shutdown(&self) {
        Queue::await_shutdown(self)
    }
}

impl<T> Enqueue<T> for Queue<T> {
    fn offer(&self, item: T) -> Result<bool> {
        Queue::offer(self, item)
    }

    fn offer_all<I: IntoIterator<Item = T>>(&self, items: I) -> Result<usize> {
        Queue::offer_all(self, items)
    }

    fn offer_timeout(&self, item: T, timeout: Duration) -> Result<bool> {
        Queue::offer_timeout(self, item, timeout)
    }
}

impl<T> Dequeue<T> for Queue<T> {
    fn take(&self) -> Result<T> {
        Queue::take(self)
    }

    fn take_timeout(&self, timeout: Duration) -> Result<T> {
        Queue::take_timeout(self, timeout)
    }

    fn poll(&self) -> Result<Option<T>> {
        Queue::poll(self)
    }

    fn take_up_to(&self, max: usize) -> Result<Vec<T>> {
        Queue::take_up_to(self, max)
    }

    fn take_all(&self) -> Result<Vec<T>> {
        Queue::take_all(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_offer_hands_item_to_parked_taker() {
        let queue = Queue::bounded(1).unwrap();
        let taker = {
            let queue = queue.clone();
            thread::spawn(move || queue.take())
        };
        while queue.pending_takers() == 0 {
            thread::yield_now();
        }

        assert!(queue.offer(42).unwrap());
        assert_eq!(taker.join().unwrap(), Ok(42));
        // Handed over directly, never buffered.
        assert_eq!(queue.size(), 0);
    }

    #[test]
    fn test_take_timeout_leaves_no_registration() {
        let queue: Queue<u8> = Queue::unbounded();
        let result = queue.take_timeout(Duration::from_millis(10));
        assert_eq!(result, Err(CourierError::cancelled()));
        assert_eq!(queue.pending_takers(), 0);

        queue.offer(1).unwrap();
        assert_eq!(queue.size(), 1);
    }

    #[test]
    fn test_offer_timeout_does_not_admit() {
        let queue = Queue::bounded(1).unwrap();
        queue.offer('a').unwrap();

        let result = queue.offer_timeout('b', Duration::from_millis(10));
        assert_eq!(result, Err(CourierError::cancelled()));
        assert_eq!(queue.pending_offerers(), 0);
        assert_eq!(queue.take_all().unwrap(), vec!['a']);
    }

    #[test]
    fn test_zero_capacity_rejected_eagerly() {
        let result = Queue::<u8>::sliding(0);
        assert!(matches!(result, Err(CourierError::InvalidCapacity(0))));
    }

    #[test]
    fn test_dropping_offer_all_counts_accepted() {
        let queue = Queue::dropping(3).unwrap();
        assert_eq!(queue.offer_all(1..=5).unwrap(), 3);
        assert_eq!(queue.take_all().unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn test_sliding_offer_all_keeps_newest() {
        let queue = Queue::sliding(2).unwrap();
        assert_eq!(queue.offer_all(vec![1, 2, 3, 4]).unwrap(), 4);
        assert_eq!(queue.take_all().unwrap(), vec![3, 4]);
    }
}
