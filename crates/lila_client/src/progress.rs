//! Per-operation delivery of backend progress pushes.
//!
//! The transport hands every `updateProgress` push to [`ProgressHub::deliver`]
//! from a single reader task, so a subscription observes pushes in the order
//! the backend emitted them.

use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc, Mutex,
};

use lila_shared::protocol::ProgressUpdate;
use tokio::sync::mpsc::{self, error::TryRecvError};
use tracing::{debug, warn};

struct ActiveSlot {
    id: u64,
    label: &'static str,
    tx: mpsc::UnboundedSender<ProgressUpdate>,
}

#[derive(Default)]
pub struct ProgressHub {
    active: Mutex<Option<ActiveSlot>>,
    next_id: AtomicU64,
}

impl ProgressHub {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Registers the consumer for the operation about to start. Any older
    /// registration is replaced and its receiver closes.
    pub fn register(self: &Arc<Self>, label: &'static str) -> ProgressSubscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let (tx, rx) = mpsc::unbounded_channel();
        let previous = self
            .lock_active()
            .replace(ActiveSlot { id, label, tx });
        if let Some(previous) = previous {
            warn!(
                replaced = previous.label,
                operation = label,
                "progress subscription replaced while still registered"
            );
        }
        debug!(operation = label, subscription = id, "progress subscription registered");
        ProgressSubscription {
            id,
            hub: Arc::clone(self),
            rx,
        }
    }

    /// Forwards a push to the active subscription. Returns `false` when no
    /// operation is listening and the update was dropped.
    pub fn deliver(&self, update: ProgressUpdate) -> bool {
        let guard = self.lock_active();
        match guard.as_ref() {
            Some(slot) => slot.tx.send(update).is_ok(),
            None => {
                debug!(percent = ?update.percent, "dropping progress push with no active operation");
                false
            }
        }
    }

    pub fn has_subscriber(&self) -> bool {
        self.lock_active().is_some()
    }

    fn unregister(&self, id: u64) {
        let mut guard = self.lock_active();
        if guard.as_ref().is_some_and(|slot| slot.id == id) {
            *guard = None;
        }
    }

    fn lock_active(&self) -> std::sync::MutexGuard<'_, Option<ActiveSlot>> {
        // The slot holds no invariant a panicking holder could break.
        self.active
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Receiving end for one operation's progress. Dropping it unregisters.
pub struct ProgressSubscription {
    id: u64,
    hub: Arc<ProgressHub>,
    rx: mpsc::UnboundedReceiver<ProgressUpdate>,
}

impl ProgressSubscription {
    pub async fn recv(&mut self) -> Option<ProgressUpdate> {
        self.rx.recv().await
    }

    /// Returns an update that is already buffered, without waiting.
    pub fn try_recv(&mut self) -> Option<ProgressUpdate> {
        match self.rx.try_recv() {
            Ok(update) => Some(update),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }
}

impl Drop for ProgressSubscription {
    fn drop(&mut self) {
        self.hub.unregister(self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn updates_arrive_in_delivery_order() {
        let hub = ProgressHub::new();
        let mut sub = hub.register("summary");
        for percent in [10.0, 20.0, 30.0] {
            assert!(hub.deliver(ProgressUpdate::percent(percent)));
        }

        let mut seen = Vec::new();
        while let Some(update) = sub.try_recv() {
            seen.push(update.percent);
        }
        assert_eq!(seen, vec![Some(10.0), Some(20.0), Some(30.0)]);
    }

    #[test]
    fn pushes_without_subscriber_are_dropped() {
        let hub = ProgressHub::new();
        assert!(!hub.deliver(ProgressUpdate::percent(50.0)));

        let sub = hub.register("summary");
        assert!(hub.has_subscriber());
        drop(sub);
        assert!(!hub.has_subscriber());
        assert!(!hub.deliver(ProgressUpdate::percent(60.0)));
    }

    #[tokio::test]
    async fn newer_registration_replaces_older_one() {
        let hub = ProgressHub::new();
        let mut first = hub.register("first");
        let mut second = hub.register("second");

        hub.deliver(ProgressUpdate::percent(5.0));
        assert_eq!(first.recv().await, None);
        assert_eq!(second.try_recv().map(|u| u.percent), Some(Some(5.0)));

        drop(first);
        assert!(hub.has_subscriber(), "stale drop must not unregister the newer subscription");
    }
}
