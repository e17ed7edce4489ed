//! Snapshot fan-out to live subscribers

mod broadcaster;
mod registry;

pub use broadcaster::{BroadcastStats, Broadcaster};
pub use registry::{Delivery, SnapshotLine, SubscriberHandle, SubscriberId, SubscriberRegistry};
