//! # Courier
//!
//! In-process message passing: a point-to-point queue and a broadcast hub,
//! both with a pluggable overflow strategy and a one-way shutdown.
//!
//! ## Core Concepts
//!
//! - **Queue**: every item goes to exactly one taker, FIFO
//! - **Hub**: every item goes to every live subscriber, via one shared log
//! - **Overflow strategy**: Backpressure, Dropping, or Sliding when bounded
//! - **Shutdown**: idempotent; every parked or later caller gets `Interrupted`
//!
//! Blocking operations park the calling thread on a private wake channel
//! registered in an explicit wait list. Every blocking call has a
//! `*_timeout` variant that withdraws cleanly when its deadline wins.
//!
//! ## Example
//!
//! ```
//! use courier::{Hub, Queue};
//! use std::thread;
//!
//! let jobs = Queue::bounded(16)?;
//! let worker = {
//!     let jobs = jobs.clone();
//!     thread::spawn(move || jobs.take())
//! };
//! jobs.offer("compile")?;
//! assert_eq!(worker.join().unwrap()?, "compile");
//!
//! let events = Hub::unbounded();
//! let a = events.subscribe();
//! let b = events.subscribe();
//! events.publish("ready")?;
//! assert_eq!(a.take()?, "ready");
//! assert_eq!(b.take()?, "ready");
//! # Ok::<(), courier::CourierError>(())
//! ```

pub mod error;
pub mod hub;
pub mod queue;
pub mod shutdown;
pub mod types;

mod buffer;
mod waiters;

// Re-exports
pub use error::{CourierError, Interruption, Result};
pub use hub::{Hub, Subscription};
pub use queue::{Dequeue, Endpoint, Enqueue, Queue};
pub use shutdown::ShutdownLatch;
pub use types::{HubConfig, OverflowStrategy, QueueConfig, Sequence, SubscriptionId};
