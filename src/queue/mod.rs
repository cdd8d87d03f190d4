//! Point-to-point queue.
//!
//! Every offered item is delivered to exactly one taker, in offer order.
//! Takers that find the queue empty park in FIFO order and are handed items
//! directly, skipping the buffer.
//!
//! # Example
//!
//! ```
//! use courier::Queue;
//!
//! let queue = Queue::bounded(2)?;
//! queue.offer(1)?;
//! queue.offer(2)?;
//! assert_eq!(queue.take()?, 1);
//! assert_eq!(queue.take_all()?, vec![2]);
//! # Ok::<(), courier::CourierError>(())
//! ```

mod channel;
mod views;

pub use channel::Queue;
pub use views::{Dequeue, Endpoint, Enqueue};
