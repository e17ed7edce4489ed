//! Snapshot broadcaster
//!
//! Serializes the controller state once per emission and fans the line out
//! to every registered subscriber. Never blocks and never fails the caller.

use parking_lot::Mutex;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

use super::registry::{SnapshotLine, SubscriberHandle, SubscriberRegistry};
use crate::state::ControllerState;

/// Broadcast counters, exposed on the health route
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct BroadcastStats {
    pub subscribers: usize,
    pub emitted: u64,
    pub pruned: u64,
}

pub struct Broadcaster {
    registry: Arc<SubscriberRegistry>,
    /// Last emitted line, used to prime late joiners
    latest: Mutex<Option<SnapshotLine>>,
    prime_new_subscribers: bool,
    emitted: AtomicU64,
    pruned: AtomicU64,
}

impl Broadcaster {
    pub fn new(registry: Arc<SubscriberRegistry>) -> Self {
        Self {
            registry,
            latest: Mutex::new(None),
            prime_new_subscribers: true,
            emitted: AtomicU64::new(0),
            pruned: AtomicU64::new(0),
        }
    }

    /// Whether new subscribers immediately receive the last emitted snapshot
    pub fn with_initial_snapshot(mut self, enabled: bool) -> Self {
        self.prime_new_subscribers = enabled;
        self
    }

    pub fn registry(&self) -> &Arc<SubscriberRegistry> {
        &self.registry
    }

    /// Serialize `state` and deliver it to all current subscribers.
    ///
    /// Returns the number of subscribers the snapshot was handed to.
    pub fn emit(&self, state: &ControllerState) -> usize {
        let line: SnapshotLine = match state.to_line() {
            Ok(line) => Arc::from(line),
            Err(e) => {
                warn!("Failed to serialize snapshot: {}", e);
                return 0;
            }
        };

        *self.latest.lock() = Some(Arc::clone(&line));
        self.emitted.fetch_add(1, Ordering::Relaxed);

        let delivery = self.registry.deliver(&line);
        if delivery.pruned > 0 {
            self.pruned
                .fetch_add(delivery.pruned as u64, Ordering::Relaxed);
        }

        debug!("📤 {} -> {} subscribers", line, delivery.delivered);
        delivery.delivered
    }

    /// Join the registry; primed with the latest snapshot when enabled.
    pub fn subscribe(&self, label: impl Into<String>) -> SubscriberHandle {
        if !self.prime_new_subscribers {
            return self.registry.join(label);
        }
        // Hold `latest` across the join so an emit cannot slip in between
        let latest = self.latest.lock();
        self.registry.join_with(label, latest.clone())
    }

    /// Last emitted snapshot line, if any
    pub fn latest(&self) -> Option<SnapshotLine> {
        self.latest.lock().clone()
    }

    pub fn stats(&self) -> BroadcastStats {
        BroadcastStats {
            subscribers: self.registry.len(),
            emitted: self.emitted.load(Ordering::Relaxed),
            pruned: self.pruned.load(Ordering::Relaxed),
        }
    }

    /// Drop every subscriber
    pub fn shutdown(&self) {
        self.registry.clear();
    }
}
