//! User-facing operation feedback.
//!
//! Sync engines publish an [`OperationResult`] after each mutation; the
//! notifier keeps the most recent one visible for a few seconds and then
//! clears it. A newer message always supersedes an older one, including the
//! older message's pending expiry.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tidewater_core::{OperationResult, Severity};

use crate::store::Store;

/// How long a message stays visible.
const DISPLAY_TTL: Duration = Duration::from_secs(3);

/// Publishes transient operation feedback to a store.
#[derive(Clone)]
pub struct Notifier {
    store: Store<Option<OperationResult>>,
    generation: Arc<AtomicU64>,
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new()
    }
}

impl Notifier {
    #[must_use]
    pub fn new() -> Self {
        Self {
            store: Store::new(None),
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    /// The store consumers subscribe to. `None` means nothing to show.
    #[must_use]
    pub fn store(&self) -> &Store<Option<OperationResult>> {
        &self.store
    }

    /// Publish a message and schedule its expiry. The expiry only fires if
    /// no newer message has been published in the meantime.
    pub(crate) fn publish(&self, result: OperationResult) {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.store.set(Some(result));

        let store = self.store.clone();
        let guard = Arc::clone(&self.generation);
        tokio::spawn(async move {
            tokio::time::sleep(DISPLAY_TTL).await;
            if guard.load(Ordering::SeqCst) == generation {
                store.set(None);
            }
        });
    }

    pub(crate) fn success(&self, message: impl Into<String>) {
        self.publish(OperationResult::new(Severity::Success, message));
    }

    pub(crate) fn info(&self, message: impl Into<String>) {
        self.publish(OperationResult::new(Severity::Info, message));
    }

    pub(crate) fn warning(&self, message: impl Into<String>) {
        self.publish(OperationResult::new(Severity::Warning, message));
    }

    pub(crate) fn error(&self, message: impl Into<String>) {
        self.publish(OperationResult::new(Severity::Error, message));
    }

    /// Dismiss the current message immediately.
    pub fn clear(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.store.set(None);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_message_expires_after_ttl() {
        let notifier = Notifier::new();
        notifier.success("item added");
        assert!(notifier.store().get().is_some());

        tokio::time::sleep(Duration::from_secs(4)).await;
        tokio::task::yield_now().await;
        assert!(notifier.store().get().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_newer_message_survives_older_expiry() {
        let notifier = Notifier::new();
        notifier.success("first");

        tokio::time::sleep(Duration::from_secs(2)).await;
        notifier.warning("second");

        // The first message's timer fires here; the second must survive it
        tokio::time::sleep(Duration::from_secs(2)).await;
        tokio::task::yield_now().await;
        let current = notifier.store().get();
        assert_eq!(current.map(|r| r.message), Some("second".to_string()));

        tokio::time::sleep(Duration::from_secs(2)).await;
        tokio::task::yield_now().await;
        assert!(notifier.store().get().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_clear_dismisses_immediately() {
        let notifier = Notifier::new();
        notifier.error("failed");
        notifier.clear();
        assert!(notifier.store().get().is_none());

        // A cleared message's timer must not clear a later one
        notifier.info("later");
        tokio::time::sleep(Duration::from_secs(1)).await;
        tokio::task::yield_now().await;
        assert!(notifier.store().get().is_some());
    }
}
