//! Subscriber registry
//!
//! Tracks live subscribers and hands each one a latest-value mailbox. The
//! registry lock is only held to copy the subscriber list; delivery happens
//! outside of it so joins and leaves never wait on a broadcast.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::debug;

/// Serialized snapshot line shared between all subscribers
pub type SnapshotLine = Arc<str>;

/// Unique subscriber identifier
pub type SubscriberId = u64;

type Mailbox = Arc<watch::Sender<Option<SnapshotLine>>>;

struct Entry {
    label: String,
    mailbox: Mailbox,
}

/// Outcome of one delivery round
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Delivery {
    /// Subscribers that accepted the snapshot
    pub delivered: usize,
    /// Subscribers removed because their receiving side was gone
    pub pruned: usize,
}

/// Receiving side of a subscription
///
/// Only the newest snapshot is kept: a consumer that falls behind skips
/// intermediate states and picks up the latest one on its next `recv`.
pub struct SubscriberHandle {
    id: SubscriberId,
    label: String,
    rx: watch::Receiver<Option<SnapshotLine>>,
}

impl SubscriberHandle {
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Wait for the next snapshot.
    ///
    /// Returns `None` once the subscriber has been removed from the registry
    /// (explicit leave, or registry cleared at shutdown).
    pub async fn recv(&mut self) -> Option<SnapshotLine> {
        self.rx.changed().await.ok()?;
        self.rx.borrow_and_update().clone()
    }
}

impl std::fmt::Debug for SubscriberHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriberHandle")
            .field("id", &self.id)
            .field("label", &self.label)
            .finish()
    }
}

/// Concurrency-safe set of live subscribers
#[derive(Default)]
pub struct SubscriberRegistry {
    subscribers: RwLock<HashMap<SubscriberId, Entry>>,
    next_id: AtomicU64,
}

impl SubscriberRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new subscriber with an empty mailbox
    pub fn join(&self, label: impl Into<String>) -> SubscriberHandle {
        self.join_with(label, None)
    }

    /// Register a new subscriber, optionally primed with a snapshot that
    /// its first `recv` returns immediately.
    pub fn join_with(
        &self,
        label: impl Into<String>,
        initial: Option<SnapshotLine>,
    ) -> SubscriberHandle {
        let label = label.into();
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);

        let (tx, rx) = watch::channel(None);
        if initial.is_some() {
            tx.send_replace(initial);
        }

        let count = {
            let mut subscribers = self.subscribers.write();
            subscribers.insert(
                id,
                Entry {
                    label: label.clone(),
                    mailbox: Arc::new(tx),
                },
            );
            subscribers.len()
        };
        debug!("Subscriber {} ({}) joined ({} total)", id, label, count);

        SubscriberHandle { id, label, rx }
    }

    /// Remove a subscriber. Its handle observes end-of-stream.
    ///
    /// Returns `false` if the id was unknown (already left or pruned).
    pub fn leave(&self, id: SubscriberId) -> bool {
        let mut subscribers = self.subscribers.write();
        match subscribers.remove(&id) {
            Some(entry) => {
                debug!(
                    "Subscriber {} ({}) left ({} total)",
                    id,
                    entry.label,
                    subscribers.len()
                );
                true
            }
            None => false,
        }
    }

    /// Number of live subscribers
    pub fn len(&self) -> usize {
        self.subscribers.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscribers.read().is_empty()
    }

    /// Drop every subscriber (shutdown, no drain)
    pub fn clear(&self) {
        let mut subscribers = self.subscribers.write();
        let dropped = subscribers.len();
        subscribers.clear();
        if dropped > 0 {
            debug!("Dropped {} subscribers", dropped);
        }
    }

    /// Push a snapshot line into every mailbox that existed when the call
    /// started. Subscribers whose receiving side is gone are removed.
    pub fn deliver(&self, line: &SnapshotLine) -> Delivery {
        let targets: Vec<(SubscriberId, Mailbox)> = self
            .subscribers
            .read()
            .iter()
            .map(|(id, entry)| (*id, Arc::clone(&entry.mailbox)))
            .collect();

        let mut delivery = Delivery::default();
        let mut failed = Vec::new();

        for (id, mailbox) in targets {
            if mailbox.send(Some(Arc::clone(line))).is_ok() {
                delivery.delivered += 1;
            } else {
                failed.push(id);
            }
        }

        if !failed.is_empty() {
            let mut subscribers = self.subscribers.write();
            for id in failed {
                if let Some(entry) = subscribers.remove(&id) {
                    debug!("Subscriber {} ({}) gone, removed", id, entry.label);
                    delivery.pruned += 1;
                }
            }
        }

        delivery
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    fn line(s: &str) -> SnapshotLine {
        Arc::from(s)
    }

    #[tokio::test]
    async fn test_join_and_deliver() {
        let registry = SubscriberRegistry::new();
        let mut a = registry.join("a");
        let mut b = registry.join("b");
        assert_eq!(registry.len(), 2);

        let delivery = registry.deliver(&line("one"));
        assert_eq!(delivery, Delivery { delivered: 2, pruned: 0 });

        assert_eq!(a.recv().await.as_deref(), Some("one"));
        assert_eq!(b.recv().await.as_deref(), Some("one"));
    }

    #[tokio::test]
    async fn test_slow_subscriber_sees_latest_only() {
        let registry = SubscriberRegistry::new();
        let mut slow = registry.join("slow");

        registry.deliver(&line("1"));
        registry.deliver(&line("2"));
        registry.deliver(&line("3"));

        assert_eq!(slow.recv().await.as_deref(), Some("3"));
    }

    #[tokio::test]
    async fn test_leave_ends_stream() {
        let registry = SubscriberRegistry::new();
        let mut handle = registry.join("gone");

        assert!(registry.leave(handle.id()));
        assert!(!registry.leave(handle.id()));
        assert!(registry.is_empty());
        assert_eq!(handle.recv().await, None);
    }

    #[tokio::test]
    async fn test_dropped_handle_is_pruned_without_affecting_others() {
        let registry = SubscriberRegistry::new();
        let dropped = registry.join("dropped");
        let mut alive = registry.join("alive");
        drop(dropped);

        let delivery = registry.deliver(&line("x"));
        assert_eq!(delivery, Delivery { delivered: 1, pruned: 1 });
        assert_eq!(registry.len(), 1);
        assert_eq!(alive.recv().await.as_deref(), Some("x"));
    }

    #[tokio::test]
    async fn test_primed_join() {
        let registry = SubscriberRegistry::new();
        let mut handle = registry.join_with("late", Some(line("current")));
        assert_eq!(handle.recv().await.as_deref(), Some("current"));
    }

    #[tokio::test]
    async fn test_clear_ends_all_streams() {
        let registry = SubscriberRegistry::new();
        let mut a = registry.join("a");
        let mut b = registry.join("b");
        registry.clear();
        assert_eq!(a.recv().await, None);
        assert_eq!(b.recv().await, None);
    }

    #[test]
    fn test_churn_during_delivery() {
        let registry = Arc::new(SubscriberRegistry::new());
        let keeper = registry.join("keeper");

        let churners: Vec<_> = (0..4)
            .map(|i| {
                let registry = Arc::clone(&registry);
                thread::spawn(move || {
                    for n in 0..200 {
                        let handle = registry.join(format!("churn-{}-{}", i, n));
                        if n % 2 == 0 {
                            registry.leave(handle.id());
                        }
                    }
                })
            })
            .collect();

        for n in 0..500 {
            let delivery = registry.deliver(&line(&n.to_string()));
            // The keeper is never skipped
            assert!(delivery.delivered >= 1);
        }

        for churner in churners {
            churner.join().unwrap();
        }

        assert!(registry.len() >= 1);
        assert_eq!(keeper.rx.borrow().as_deref(), Some("499"));
    }
}
