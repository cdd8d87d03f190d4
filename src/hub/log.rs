//! Shared append-only log with per-subscriber cursors.
//!
//! The log holds one copy of each published item no matter how many
//! subscribers there are. Live cursors are kept in an ordered multiset so
//! the slowest one is always at hand; the log's head is kept equal to it,
//! which means the entry count is exactly the backlog of the slowest
//! subscriber and the capacity check is a plain length check.

use crate::buffer::{BoundedBuffer, Offered};
use crate::types::{OverflowStrategy, Sequence};
use std::collections::BTreeMap;

#[derive(Debug)]
pub(crate) struct SharedLog<T> {
    /// `entries[0]` has sequence `head`.
    entries: BoundedBuffer<T>,
    head: Sequence,
    /// cursor -> number of live subscribers positioned there.
    cursors: BTreeMap<Sequence, usize>,
}

impl<T> SharedLog<T> {
    pub fn new(capacity: Option<usize>, strategy: OverflowStrategy) -> Self {
        Self {
            entries: BoundedBuffer::new(capacity, strategy),
            head: Sequence(0),
            cursors: BTreeMap::new(),
        }
    }

    /// Sequence the next published item will get.
    pub fn tail(&self) -> Sequence {
        Sequence(self.head.0 + self.entries.len() as u64)
    }

    /// Slowest live cursor.
    pub fn min_cursor(&self) -> Option<Sequence> {
        self.cursors.keys().next().copied()
    }

    /// Entries retained for the slowest subscriber.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_full(&self) -> bool {
        self.entries.is_full()
    }

    /// Items a subscriber at `cursor` has not read yet.
    pub fn pending(&self, cursor: Sequence) -> usize {
        self.effective(cursor).distance_to(self.tail())
    }

    /// A cursor left behind by a Sliding eviction reads from the head.
    fn effective(&self, cursor: Sequence) -> Sequence {
        cursor.max(self.head)
    }

    // --- Cursor bookkeeping ---

    /// Register a cursor at the tail: it sees only later publishes.
    pub fn add_cursor(&mut self) -> Sequence {
        let at = self.tail();
        *self.cursors.entry(at).or_insert(0) += 1;
        at
    }

    /// Drop a cursor and release entries nobody needs any more.
    pub fn remove_cursor(&mut self, at: Sequence) {
        self.release_cursor(self.effective(at));
        self.truncate();
    }

    fn release_cursor(&mut self, at: Sequence) {
        if let Some(count) = self.cursors.get_mut(&at) {
            *count -= 1;
            if *count == 0 {
                self.cursors.remove(&at);
            }
        }
    }

    /// Drop entries below the slowest cursor. Returns how many went.
    pub fn truncate(&mut self) -> usize {
        let floor = self.min_cursor().unwrap_or_else(|| self.tail());
        let mut removed = 0;
        while self.head < floor {
            if self.entries.pop().is_none() {
                break;
            }
            self.head = self.head.next();
            removed += 1;
        }
        removed
    }

    // --- Publishing ---

    /// Append one item per the overflow strategy.
    ///
    /// With no live cursors the item is counted as accepted and discarded
    /// immediately. A Sliding eviction advances every cursor that pointed
    /// at the evicted entry.
    pub fn publish(&mut self, item: T) -> Offered<T> {
        if self.cursors.is_empty() {
            self.head = self.head.next();
            return Offered::Accepted;
        }

        let offered = self.entries.offer(item);
        if let Offered::Slid(_) = offered {
            let evicted = self.head;
            self.head = self.head.next();
            if let Some(count) = self.cursors.remove(&evicted) {
                *self.cursors.entry(self.head).or_insert(0) += count;
            }
        }
        offered
    }

    /// Drop every entry and cursor. Sequence numbering continues from the tail.
    pub fn clear(&mut self) {
        self.head = self.tail();
        self.entries.clear();
        self.cursors.clear();
    }

    // --- Reading ---

    /// Read up to `max` entries from `cursor`, advancing it.
    ///
    /// Returns the items and the new cursor. Entries skipped by a Sliding
    /// eviction are silently lost to this reader. Truncates behind the
    /// slowest cursor afterwards.
    pub fn read(&mut self, cursor: Sequence, max: usize) -> (Vec<T>, Sequence)
    where
        T: Clone,
    {
        let cursor = self.effective(cursor);
        let n = self.pending(cursor).min(max);
        if n == 0 {
            return (Vec::new(), cursor);
        }

        let start = self.head.distance_to(cursor);
        let items: Vec<T> = (start..start + n)
            .filter_map(|i| self.entries.get(i).cloned())
            .collect();

        let next = Sequence(cursor.0 + n as u64);
        self.release_cursor(cursor);
        *self.cursors.entry(next).or_insert(0) += 1;
        self.truncate();
        (items, next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_publish_without_cursors_discards() {
        let mut log = SharedLog::new(Some(2), OverflowStrategy::Backpressure);
        for i in 0..5 {
            assert_eq!(log.publish(i), Offered::Accepted);
        }
        assert_eq!(log.len(), 0);
        assert_eq!(log.tail(), Sequence(5));
    }

    #[test]
    fn test_clear_keeps_numbering() {
        let mut log = SharedLog::new(Some(4), OverflowStrategy::Sliding);
        let cursor = log.add_cursor();
        log.publish('a');
        log.publish('b');

        log.clear();
        assert_eq!(log.len(), 0);
        assert_eq!(log.min_cursor(), None);
        assert_eq!(log.tail(), Sequence(cursor.0 + 2));
    }

    #[test]
    fn test_truncate_follows_slowest_cursor() {
        let mut log = SharedLog::new(None, OverflowStrategy::Backpressure);
        let fast = log.add_cursor();
        let slow = log.add_cursor();
        assert_eq!(fast, slow);

        log.publish('a');
        log.publish('b');
        log.publish('c');

        let (items, fast) = log.read(fast, 3);
        assert_eq!(items, vec!['a', 'b', 'c']);
        assert_eq!(log.len(), 3);

        let (items, slow) = log.read(slow, 2);
        assert_eq!(items, vec!['a', 'b']);
        assert_eq!(log.len(), 1);
        assert_eq!(log.min_cursor(), Some(slow));

        log.remove_cursor(slow);
        assert_eq!(log.len(), 0);
        assert_eq!(log.min_cursor(), Some(fast));
    }

    #[test]
    fn test_sliding_eviction_advances_slow_cursor() {
        let mut log = SharedLog::new(Some(2), OverflowStrategy::Sliding);
        let cursor = log.add_cursor();

        log.publish(1);
        log.publish(2);
        assert!(matches!(log.publish(3), Offered::Slid(1)));
        assert_eq!(log.min_cursor(), Some(Sequence(1)));

        // The caller's copy of the cursor is stale; reading clamps it.
        assert_eq!(log.pending(cursor), 2);
        let (items, next) = log.read(cursor, usize::MAX);
        assert_eq!(items, vec![2, 3]);
        assert_eq!(next, Sequence(3));
        assert_eq!(log.len(), 0);
    }

    #[test]
    fn test_full_is_measured_against_slowest() {
        let mut log = SharedLog::new(Some(2), OverflowStrategy::Dropping);
        let fast = log.add_cursor();
        let _slow = log.add_cursor();

        log.publish(1);
        log.publish(2);
        let (_, fast) = log.read(fast, usize::MAX);
        assert!(log.is_full());
        assert!(matches!(log.publish(3), Offered::Rejected(3)));
        assert_eq!(log.pending(fast), 0);
    }
}
