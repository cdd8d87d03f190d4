//! Explicit wait lists for suspended callers.
//!
//! A suspended caller registers a [`Signal`] in a [`WaitList`] while holding
//! the structure's lock, releases the lock, then blocks on the matching
//! [`Wait`]. The mutator that changes the awaited condition fires (or drops)
//! the signal. Dropping a signal without firing it releases the waiter as
//! interrupted, which is how shutdown reaches every parked caller.

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TrySendError};
use std::collections::VecDeque;
use std::time::Instant;

/// Identifies one registration in a [`WaitList`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub(crate) struct WaiterId(u64);

/// Sending half of a one-shot wake channel.
#[derive(Debug)]
pub(crate) struct Signal<M> {
    sender: Sender<M>,
}

/// Receiving half of a one-shot wake channel.
#[derive(Debug)]
pub(crate) struct Wait<M> {
    receiver: Receiver<M>,
}

/// How a blocked [`Wait`] ended.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Woken<M> {
    /// The mutator fired the signal.
    Ready(M),
    /// The signal was dropped unfired (shutdown).
    Released,
    /// The deadline elapsed first.
    TimedOut,
}

/// Create a connected signal/wait pair.
pub(crate) fn signal<M>() -> (Signal<M>, Wait<M>) {
    let (sender, receiver) = bounded(1);
    (Signal { sender }, Wait { receiver })
}

impl<M> Signal<M> {
    /// Wake the waiter with `message`.
    ///
    /// Hands the message back if the waiter is gone (its thread unwound)
    /// or was already woken.
    pub fn fire(self, message: M) -> Result<(), M> {
        match self.sender.try_send(message) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(m)) | Err(TrySendError::Disconnected(m)) => Err(m),
        }
    }
}

impl<M> Wait<M> {
    /// Block until fired, released, or (if given) the deadline passes.
    pub fn wait(&self, deadline: Option<Instant>) -> Woken<M> {
        match deadline {
            None => match self.receiver.recv() {
                Ok(m) => Woken::Ready(m),
                Err(_) => Woken::Released,
            },
            Some(at) => match self.receiver.recv_deadline(at) {
                Ok(m) => Woken::Ready(m),
                Err(RecvTimeoutError::Timeout) => Woken::TimedOut,
                Err(RecvTimeoutError::Disconnected) => Woken::Released,
            },
        }
    }

    /// Collect a message that raced a timeout.
    pub fn try_take(&self) -> Option<M> {
        self.receiver.try_recv().ok()
    }
}

/// A producer parked under Backpressure, holding the part of its batch not
/// yet admitted. `done` fires once the last item is in.
#[derive(Debug)]
pub(crate) struct PendingOffer<T> {
    pub items: VecDeque<T>,
    pub done: Signal<()>,
}

/// FIFO list of parked callers.
#[derive(Debug)]
pub(crate) struct WaitList<E> {
    entries: VecDeque<(WaiterId, E)>,
    next_id: u64,
}

impl<E> WaitList<E> {
    pub fn new() -> Self {
        Self {
            entries: VecDeque::new(),
            next_id: 0,
        }
    }

    /// Park an entry at the back; returns its id for cancellation.
    pub fn register(&mut self, entry: E) -> WaiterId {
        let id = WaiterId(self.next_id);
        self.next_id += 1;
        self.entries.push_back((id, entry));
        id
    }

    /// Remove a specific entry (cancellation). `None` if already woken.
    pub fn remove(&mut self, id: WaiterId) -> Option<E> {
        let pos = self.entries.iter().position(|(eid, _)| *eid == id)?;
        self.entries.remove(pos).map(|(_, e)| e)
    }

    /// Longest-waiting entry.
    pub fn pop_front(&mut self) -> Option<E> {
        self.entries.pop_front().map(|(_, e)| e)
    }

    pub fn front_mut(&mut self) -> Option<&mut E> {
        self.entries.front_mut().map(|(_, e)| e)
    }

    /// Take every entry, oldest first.
    pub fn drain(&mut self) -> Vec<E> {
        self.entries.drain(..).map(|(_, e)| e).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

impl<E> Default for WaitList<E> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_fire_wakes_waiter() {
        let (sig, wait) = signal();
        sig.fire(7).unwrap();
        assert_eq!(wait.wait(None), Woken::Ready(7));
    }

    #[test]
    fn test_dropped_signal_releases_waiter() {
        let (sig, wait) = signal::<u32>();
        drop(sig);
        assert_eq!(wait.wait(None), Woken::Released);
    }

    #[test]
    fn test_deadline_times_out() {
        let (_sig, wait) = signal::<u32>();
        let deadline = Instant::now() + Duration::from_millis(10);
        assert_eq!(wait.wait(Some(deadline)), Woken::TimedOut);
    }

    #[test]
    fn test_fire_to_gone_waiter_hands_back() {
        let (sig, wait) = signal();
        drop(wait);
        assert_eq!(sig.fire("item"), Err("item"));
    }

    #[test]
    fn test_wait_list_fifo_and_remove() {
        let mut list = WaitList::new();
        let a = list.register('a');
        let _b = list.register('b');
        let c = list.register('c');

        assert_eq!(list.remove(c), Some('c'));
        assert_eq!(list.remove(c), None);
        assert_eq!(list.len(), 2);
        assert_eq!(list.pop_front(), Some('a'));
        assert_eq!(list.remove(a), None);
        assert_eq!(list.drain(), vec!['b']);
        assert!(list.is_empty());
    }
}
