//! Broadcast publish/subscribe hub.
//!
//! Every item published reaches every subscriber that was registered when it
//! was published. Subscribers read through private cursors into one shared
//! log, so fan-out costs no per-subscriber copies.
//!
//! # Example
//!
//! ```
//! use courier::Hub;
//!
//! let hub = Hub::sliding(2)?;
//! let sub = hub.subscribe();
//! hub.publish_all(vec![1, 2, 3])?;
//!
//! // 1 was evicted before `sub` read it.
//! assert_eq!(sub.take_all()?, vec![2, 3]);
//! # Ok::<(), courier::CourierError>(())
//! ```

mod broadcast;
mod log;
mod subscription;

pub use broadcast::Hub;
pub use subscription::Subscription;
