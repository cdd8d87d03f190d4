//! Capacity-limited FIFO buffer and the overflow decision applied to it.
//!
//! Both the queue and the hub's shared log sit on a [`BoundedBuffer`]; the
//! only difference is who consumes from the front.

use crate::types::OverflowStrategy;
use std::collections::VecDeque;

/// Outcome of deciding whether one more item fits.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Admission {
    /// Room available (or unbounded).
    Admit,
    /// Full under Backpressure: the producer must wait.
    Suspend,
    /// Full under Dropping: discard the new item.
    Reject,
    /// Full under Sliding: evict the oldest, then admit.
    EvictOldest,
}

/// Decide what happens to one incoming item given the current length.
pub(crate) fn admission(
    len: usize,
    capacity: Option<usize>,
    strategy: OverflowStrategy,
) -> Admission {
    match capacity {
        Some(cap) if len >= cap => match strategy {
            OverflowStrategy::Backpressure => Admission::Suspend,
            OverflowStrategy::Dropping => Admission::Reject,
            OverflowStrategy::Sliding => Admission::EvictOldest,
        },
        _ => Admission::Admit,
    }
}

/// Result of [`BoundedBuffer::offer`].
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Offered<T> {
    /// Appended without displacing anything.
    Accepted,
    /// Appended after evicting the returned oldest item.
    Slid(T),
    /// Discarded under Dropping; the item is handed back.
    Rejected(T),
    /// Full under Backpressure; the item is handed back for the caller to park.
    Full(T),
}

/// Ordered, optionally capacity-limited sequence.
#[derive(Debug)]
pub(crate) struct BoundedBuffer<T> {
    items: VecDeque<T>,
    capacity: Option<usize>,
    strategy: OverflowStrategy,
}

impl<T> BoundedBuffer<T> {
    /// Storage grows on demand; `capacity` is only a limit.
    pub fn new(capacity: Option<usize>, strategy: OverflowStrategy) -> Self {
        Self {
            items: VecDeque::new(),
            capacity,
            strategy,
        }
    }

    /// Append per the overflow strategy.
    pub fn offer(&mut self, item: T) -> Offered<T> {
        match admission(self.items.len(), self.capacity, self.strategy) {
            Admission::Admit => {
                self.items.push_back(item);
                Offered::Accepted
            }
            Admission::Suspend => Offered::Full(item),
            Admission::Reject => Offered::Rejected(item),
            Admission::EvictOldest => {
                let evicted = self.items.pop_front();
                self.items.push_back(item);
                match evicted {
                    Some(old) => Offered::Slid(old),
                    None => Offered::Accepted,
                }
            }
        }
    }

    pub fn pop(&mut self) -> Option<T> {
        self.items.pop_front()
    }

    /// Item at `index` positions from the front.
    pub fn get(&self, index: usize) -> Option<&T> {
        self.items.get(index)
    }

    /// Remove up to `n` items from the front.
    pub fn drain_front(&mut self, n: usize) -> Vec<T> {
        let n = n.min(self.items.len());
        self.items.drain(..n).collect()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn has_room(&self) -> bool {
        self.capacity.map_or(true, |cap| self.items.len() < cap)
    }

    pub fn is_full(&self) -> bool {
        !self.has_room()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_admission_unbounded_always_admits() {
        for strategy in [
            OverflowStrategy::Backpressure,
            OverflowStrategy::Dropping,
            OverflowStrategy::Sliding,
        ] {
            assert_eq!(admission(1_000_000, None, strategy), Admission::Admit);
        }
    }

    #[test]
    fn test_admission_when_full() {
        assert_eq!(
            admission(2, Some(2), OverflowStrategy::Backpressure),
            Admission::Suspend
        );
        assert_eq!(
            admission(2, Some(2), OverflowStrategy::Dropping),
            Admission::Reject
        );
        assert_eq!(
            admission(2, Some(2), OverflowStrategy::Sliding),
            Admission::EvictOldest
        );
        assert_eq!(
            admission(1, Some(2), OverflowStrategy::Dropping),
            Admission::Admit
        );
    }

    #[test]
    fn test_offer_sliding_evicts_oldest() {
        let mut buf = BoundedBuffer::new(Some(2), OverflowStrategy::Sliding);
        assert_eq!(buf.offer(1), Offered::Accepted);
        assert_eq!(buf.offer(2), Offered::Accepted);
        assert_eq!(buf.offer(3), Offered::Slid(1));
        assert_eq!(buf.len(), 2);
        assert_eq!(buf.get(0), Some(&2));
    }

    #[test]
    fn test_offer_dropping_keeps_existing() {
        let mut buf = BoundedBuffer::new(Some(1), OverflowStrategy::Dropping);
        assert_eq!(buf.offer("x"), Offered::Accepted);
        assert_eq!(buf.offer("y"), Offered::Rejected("y"));
        assert_eq!(buf.pop(), Some("x"));
        assert!(buf.is_empty());
    }

    #[test]
    fn test_offer_backpressure_hands_item_back() {
        let mut buf = BoundedBuffer::new(Some(1), OverflowStrategy::Backpressure);
        assert_eq!(buf.offer(10), Offered::Accepted);
        assert!(buf.is_full());
        assert_eq!(buf.offer(11), Offered::Full(11));
        assert_eq!(buf.len(), 1);
    }

    #[test]
    fn test_drain_front_partial() {
        let mut buf = BoundedBuffer::new(None, OverflowStrategy::Backpressure);
        for i in 0..5 {
            assert_eq!(buf.offer(i), Offered::Accepted);
        }
        assert_eq!(buf.drain_front(3), vec![0, 1, 2]);
        assert_eq!(buf.drain_front(10), vec![3, 4]);
        assert_eq!(buf.get(0), None);
    }

    #[test]
    fn test_huge_capacity_allocates_lazily() {
        let mut buf = BoundedBuffer::new(Some(usize::MAX), OverflowStrategy::Dropping);
        assert_eq!(buf.offer(1u64), Offered::Accepted);
        assert!(buf.has_room());
        assert_eq!(buf.pop(), Some(1));
    }
}
