//! Broadcast hub: every published item reaches every live subscriber.

use super::log::SharedLog;
use super::subscription::Subscription;
use crate::buffer::Offered;
use crate::error::{CourierError, Result};
use crate::queue::{Endpoint, Enqueue};
use crate::shutdown::ShutdownLatch;
use crate::types::{HubConfig, OverflowStrategy, Sequence, SubscriptionId};
use crate::waiters::{signal, PendingOffer, Signal, Wait, WaitList, WaiterId, Woken};
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, trace};

/// The hub's non-owning view of a subscription.
struct Registration {
    cursor: Sequence,
    latch: Arc<ShutdownLatch>,
}

/// Everything mutable, guarded by one lock.
pub(crate) struct HubState<T> {
    log: SharedLog<T>,
    subscribers: HashMap<SubscriptionId, Registration>,
    /// Subscribers blocked in `take`, woken on every append.
    readers: WaitList<Signal<()>>,
    /// Only used under Backpressure.
    publishers: WaitList<PendingOffer<T>>,
    pub(crate) shut_down: bool,
}

impl<T> HubState<T> {
    fn wake_readers(&mut self) {
        for reader in self.readers.drain() {
            // A reader that gave up has already left the list or unwound.
            let _ = reader.fire(());
        }
    }

    /// Move parked Backpressure items into freed room, oldest publisher first.
    fn admit_pending(&mut self) {
        let mut admitted = false;
        'publishers: while let Some(pending) = self.publishers.front_mut() {
            while let Some(item) = pending.items.pop_front() {
                if let Offered::Full(item) = self.log.publish(item) {
                    pending.items.push_front(item);
                    break 'publishers;
                }
                admitted = true;
            }
            if let Some(done) = self.publishers.pop_front().map(|p| p.done) {
                let _ = done.fire(());
            }
        }
        if admitted {
            self.wake_readers();
        }
    }

    /// Read up to `max` items for `id`. `None` if it is not registered.
    pub(crate) fn read(&mut self, id: SubscriptionId, max: usize) -> Option<Vec<T>>
    where
        T: Clone,
    {
        let registration = self.subscribers.get_mut(&id)?;
        let (items, next) = self.log.read(registration.cursor, max);
        registration.cursor = next;
        if !items.is_empty() {
            self.admit_pending();
        }
        Some(items)
    }

    /// Unread items for `id`, or `None` if it is not registered.
    pub(crate) fn pending(&self, id: SubscriptionId) -> Option<usize> {
        self.subscribers
            .get(&id)
            .map(|registration| self.log.pending(registration.cursor))
    }

    /// Park a reader until the next append.
    pub(crate) fn park_reader(&mut self) -> (WaiterId, Wait<()>) {
        let (sig, wait) = signal();
        (self.readers.register(sig), wait)
    }

    pub(crate) fn unpark_reader(&mut self, id: WaiterId) {
        self.readers.remove(id);
    }
}

pub(crate) struct HubShared<T> {
    pub(crate) state: Mutex<HubState<T>>,
    latch: ShutdownLatch,
    pub(crate) config: HubConfig,
    next_id: AtomicU64,
}

impl<T> HubShared<T> {
    /// Remove a registration, release the log entries it pinned, and trip
    /// its latch. No-op if already gone.
    pub(crate) fn unregister(&self, id: SubscriptionId) {
        let registration = {
            let mut state = self.state.lock();
            let registration = state.subscribers.remove(&id);
            if let Some(registration) = &registration {
                state.log.remove_cursor(registration.cursor);
                state.admit_pending();
                // A take on this subscription from another thread must see it close.
                state.wake_readers();
            }
            registration
        };

        if let Some(registration) = registration {
            registration.latch.trip();
            trace!(subscription = %id, "unsubscribed");
        }
    }
}

/// Publish/subscribe hub over a single shared log.
///
/// Each subscriber owns a cursor into the log instead of a private copy of
/// every message. Appending to the log is O(1) regardless of subscriber
/// count, and memory is bounded by the slowest subscriber's backlog rather
/// than by subscribers × messages. The cost is cursor bookkeeping: entries
/// are freed only once every live cursor has moved past them.
///
/// An append that lands while readers are parked wakes all of them, so a
/// publish costs O(parked readers) on top of the append. The same holds
/// when parked Backpressure items are admitted after a read.
///
/// For bounded hubs, "full" means the slowest live subscriber is
/// `capacity` items behind. A Sliding hub then force-advances that
/// subscriber, which silently misses the evicted entries.
///
/// Cloning yields another handle to the same hub.
pub struct Hub<T> {
    shared: Arc<HubShared<T>>,
}

impl<T> Clone for Hub<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T> Hub<T> {
    /// Create a hub, rejecting a zero capacity.
    pub fn with_config(config: HubConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(config))
    }

    fn build(config: HubConfig) -> Self {
        debug!(capacity = ?config.capacity, strategy = %config.strategy, "hub created");

        Self {
            shared: Arc::new(HubShared {
                state: Mutex::new(HubState {
                    log: SharedLog::new(config.capacity, config.strategy),
                    subscribers: HashMap::new(),
                    readers: WaitList::new(),
                    publishers: WaitList::new(),
                    shut_down: false,
                }),
                latch: ShutdownLatch::new(),
                config,
                next_id: AtomicU64::new(1),
            }),
        }
    }

    /// Unbounded hub.
    pub fn unbounded() -> Self {
        Self::build(HubConfig::unbounded())
    }

    /// Bounded hub with Backpressure.
    pub fn bounded(capacity: usize) -> Result<Self> {
        Self::with_config(HubConfig::bounded(capacity))
    }

    /// Bounded hub that drops new items when the slowest subscriber is full.
    pub fn dropping(capacity: usize) -> Result<Self> {
        Self::with_config(HubConfig::dropping(capacity))
    }

    /// Bounded hub that evicts the oldest entry when full.
    pub fn sliding(capacity: usize) -> Result<Self> {
        Self::with_config(HubConfig::sliding(capacity))
    }

    pub fn strategy(&self) -> OverflowStrategy {
        self.shared.config.strategy
    }

    pub fn capacity(&self) -> Option<usize> {
        self.shared.config.capacity
    }

    /// Largest backlog across live subscribers.
    pub fn size(&self) -> usize {
        self.shared.state.lock().log.len()
    }

    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    pub fn is_full(&self) -> bool {
        self.shared.state.lock().log.is_full()
    }

    pub fn is_shutdown(&self) -> bool {
        self.shared.state.lock().shut_down
    }

    pub fn subscriber_count(&self) -> usize {
        self.shared.state.lock().subscribers.len()
    }

    /// Number of parked publishers (diagnostics).
    pub fn pending_publishers(&self) -> usize {
        self.shared.state.lock().publishers.len()
    }

    // --- Subscribing ---

    /// Register a subscriber that sees every item published from now on.
    ///
    /// The returned [`Subscription`] unregisters itself when dropped. A
    /// subscription taken after shutdown receives nothing and its `take`
    /// fails immediately.
    pub fn subscribe(&self) -> Subscription<T> {
        let id = SubscriptionId(self.shared.next_id.fetch_add(1, Ordering::SeqCst));
        let latch = Arc::new(ShutdownLatch::new());

        {
            let mut state = self.shared.state.lock();
            if state.shut_down {
                latch.trip();
            } else {
                let cursor = state.log.add_cursor();
                state.subscribers.insert(
                    id,
                    Registration {
                        cursor,
                        latch: Arc::clone(&latch),
                    },
                );
                trace!(subscription = %id, cursor = ?cursor, "subscribed");
            }
        }

        Subscription::new(id, Arc::clone(&self.shared), latch)
    }

    // --- Publishing ---

    /// Publish one item to every live subscriber.
    ///
    /// Returns `Ok(false)` if a Dropping hub discarded it. Blocks while a
    /// Backpressure hub is full. With no subscribers the item is accepted
    /// and discarded.
    pub fn publish(&self, item: T) -> Result<bool> {
        self.publish_batch(vec![item], None).map(|n| n == 1)
    }

    /// Publish, giving up with `Interrupted(Cancelled)` after `timeout`.
    pub fn publish_timeout(&self, item: T, timeout: Duration) -> Result<bool> {
        self.publish_batch(vec![item], Some(Instant::now() + timeout))
            .map(|n| n == 1)
    }

    /// Publish a batch; returns how many items were accepted. The batch
    /// stays contiguous and in order in every subscriber's view.
    pub fn publish_all<I: IntoIterator<Item = T>>(&self, items: I) -> Result<usize> {
        self.publish_batch(items.into_iter().collect(), None)
    }

    fn publish_batch(&self, items: Vec<T>, deadline: Option<Instant>) -> Result<usize> {
        let total = items.len();
        let mut items: VecDeque<T> = items.into();

        let (id, wait) = {
            let mut state = self.shared.state.lock();
            if state.shut_down {
                return Err(CourierError::shutdown());
            }

            let mut accepted = 0;
            if state.publishers.is_empty() {
                while let Some(item) = items.pop_front() {
                    match state.log.publish(item) {
                        Offered::Accepted => accepted += 1,
                        Offered::Slid(_) => {
                            trace!("sliding hub evicted oldest entry");
                            accepted += 1;
                        }
                        Offered::Rejected(_) => trace!("dropping hub rejected item"),
                        Offered::Full(item) => {
                            items.push_front(item);
                            break;
                        }
                    }
                }
            }

            if accepted > 0 {
                state.wake_readers();
            }
            if items.is_empty() {
                return Ok(accepted);
            }

            let (done, wait) = signal();
            let id = state.publishers.register(PendingOffer { items, done });
            (id, wait)
        };

        match wait.wait(deadline) {
            Woken::Ready(()) => Ok(total),
            Woken::Released => Err(CourierError::shutdown()),
            Woken::TimedOut => {
                let mut state = self.shared.state.lock();
                if state.publishers.remove(id).is_some() {
                    debug!("publish cancelled by deadline");
                    return Err(CourierError::cancelled());
                }
                drop(state);
                match wait.try_take() {
                    Some(()) => Ok(total),
                    None => Err(CourierError::shutdown()),
                }
            }
        }
    }

    // --- Lifecycle ---

    /// Shut the hub down. Idempotent.
    ///
    /// Every live subscription is shut down with it: parked readers and
    /// publishers are released with `Interrupted(Shutdown)`.
    pub fn shutdown(&self) {
        let (registrations, readers, publishers) = {
            let mut state = self.shared.state.lock();
            if state.shut_down {
                return;
            }
            state.shut_down = true;
            state.log.clear();
            let registrations: Vec<Registration> =
                state.subscribers.drain().map(|(_, r)| r).collect();
            (registrations, state.readers.drain(), state.publishers.drain())
        };

        debug!(
            subscribers = registrations.len(),
            readers = readers.len(),
            publishers = publishers.len(),
            "hub shut down"
        );
        drop(readers);
        drop(publishers);
        for registration in registrations {
            registration.latch.trip();
        }
        self.shared.latch.trip();
    }

    /// Block until the hub is shut down.
    pub fn await_shutdown(&self) {
        self.shared.latch.wait();
    }

    /// Block until shut down or `timeout` elapses. Returns whether it was.
    pub fn await_shutdown_timeout(&self, timeout: Duration) -> bool {
        self.shared.latch.wait_timeout(timeout)
    }
}

impl<T> std::fmt::Debug for Hub<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Hub")
            .field("capacity", &self.capacity())
            .field("strategy", &self.strategy())
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

impl<T> Endpoint for Hub<T> {
    fn capacity(&self) -> Option<usize> {
        Hub::capacity(self)
    }

    fn size(&self) -> usize {
        Hub::size(self)
    }

    fn is_shutdown(&self) -> bool {
        Hub::is_shutdown(self)
    }

    fn shutdown(&self) {
        Hub::shutdown(self)
    }

    fn await_shutdown(&self) {
        Hub::await_shutdown(self)
    }
}

impl<T> Enqueue<T> for Hub<T> {
    fn offer(&self, item: T) -> Result<bool> {
        self.publish(item)
    }

    fn offer_all<I: IntoIterator<Item = T>>(&self, items: I) -> Result<usize> {
        self.publish_all(items)
    }

    fn offer_timeout(&self, item: T, timeout: Duration) -> Result<bool> {
        self.publish_timeout(item, timeout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_publish_without_subscribers_is_accepted() {
        let hub = Hub::bounded(1).unwrap();
        assert!(hub.publish(1).unwrap());
        assert!(hub.publish(2).unwrap());
        assert_eq!(hub.size(), 0);
    }

    #[test]
    fn test_size_tracks_slowest_subscriber() {
        let hub = Hub::unbounded();
        let fast = hub.subscribe();
        let slow = hub.subscribe();

        hub.publish_all(vec![1, 2, 3]).unwrap();
        assert_eq!(hub.size(), 3);

        assert_eq!(fast.take_all().unwrap(), vec![1, 2, 3]);
        assert_eq!(hub.size(), 3);

        assert_eq!(slow.take_up_to(2).unwrap(), vec![1, 2]);
        assert_eq!(hub.size(), 1);

        drop(slow);
        assert_eq!(hub.size(), 0);
        assert_eq!(hub.subscriber_count(), 1);
    }

    #[test]
    fn test_unsubscribe_releases_backpressure() {
        let hub = Hub::bounded(1).unwrap();
        let _fast = hub.subscribe();
        let slow = hub.subscribe();
        hub.publish('a').unwrap();

        let publisher = {
            let hub = hub.clone();
            std::thread::spawn(move || hub.publish('b'))
        };
        while hub.pending_publishers() == 0 {
            std::thread::yield_now();
        }

        slow.unsubscribe();
        // `_fast` still pins 'a', so 'b' waits for it.
        assert_eq!(hub.pending_publishers(), 1);
        drop(_fast);
        assert_eq!(publisher.join().unwrap(), Ok(true));
    }

    #[test]
    fn test_zero_capacity_rejected_eagerly() {
        let result = Hub::<u8>::dropping(0);
        assert!(matches!(result, Err(CourierError::InvalidCapacity(0))));
    }
}
