//! Reactive state containers.
//!
//! A [`Store`] holds the latest published value and notifies subscribers on
//! every change. Publication rights stay inside the crate: sync engines call
//! [`Store::set`] and [`Store::update`], consumers only read and subscribe.
//! Derived views live in [`projections`] as pure functions over snapshots,
//! so they can never drift out of sync with the source store.

pub mod projections;

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock, Weak};

type Listener<T> = Box<dyn Fn(&T) + Send + Sync>;

/// A shared observable value.
///
/// Clones are handles to the same state. Listeners run synchronously on the
/// publishing task, after the value lock is released, in an unspecified order.
pub struct Store<T> {
    inner: Arc<Inner<T>>,
}

struct Inner<T> {
    value: RwLock<T>,
    listeners: Mutex<HashMap<u64, Listener<T>>>,
    next_id: AtomicU64,
}

impl<T> Clone for Store<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Clone + Send + Sync + 'static> Store<T> {
    #[must_use]
    pub fn new(initial: T) -> Self {
        Self {
            inner: Arc::new(Inner {
                value: RwLock::new(initial),
                listeners: Mutex::new(HashMap::new()),
                next_id: AtomicU64::new(0),
            }),
        }
    }

    /// Snapshot of the current value.
    ///
    /// A poisoned lock is recovered; the last written value wins.
    #[must_use]
    pub fn get(&self) -> T {
        self.inner
            .value
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }

    /// Register a listener. It fires immediately with the current value and
    /// again on every subsequent publish, until the returned [`Subscription`]
    /// is dropped.
    #[must_use = "dropping the subscription unsubscribes the listener"]
    pub fn subscribe(&self, listener: impl Fn(&T) + Send + Sync + 'static) -> Subscription {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);

        let snapshot = self.get();
        listener(&snapshot);

        self.inner
            .listeners
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .insert(id, Box::new(listener));

        Subscription {
            store: Arc::downgrade(&self.inner) as Weak<dyn Unsubscribe>,
            id,
        }
    }

    /// Replace the value and notify subscribers.
    pub(crate) fn set(&self, value: T) {
        {
            let mut guard = self
                .inner
                .value
                .write()
                .unwrap_or_else(std::sync::PoisonError::into_inner);
            *guard = value;
        }
        self.notify();
    }

    /// Mutate the value in place and notify subscribers.
    pub(crate) fn update(&self, f: impl FnOnce(&mut T)) {
        {
            let mut guard = self
                .inner
                .value
                .write()
                .unwrap_or_else(std::sync::PoisonError::into_inner);
            f(&mut guard);
        }
        self.notify();
    }

    fn notify(&self) {
        // Snapshot outside the listener lock so a listener may re-read the store
        let snapshot = self.get();
        let listeners = self
            .inner
            .listeners
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        for listener in listeners.values() {
            listener(&snapshot);
        }
    }
}

impl<T: Clone + Default + Send + Sync + 'static> Default for Store<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

trait Unsubscribe: Send + Sync {
    fn remove(&self, id: u64);
}

impl<T: Send + Sync> Unsubscribe for Inner<T> {
    fn remove(&self, id: u64) {
        self.listeners
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .remove(&id);
    }
}

/// Handle to an active subscription. Dropping it unsubscribes.
pub struct Subscription {
    store: Weak<dyn Unsubscribe>,
    id: u64,
}

impl Subscription {
    /// Detach without unsubscribing; the listener lives as long as the store.
    pub fn forever(mut self) {
        self.store = Weak::<Never>::new();
    }
}

// Placeholder target for detached subscriptions.
struct Never;

impl Unsubscribe for Never {
    fn remove(&self, _id: u64) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(store) = self.store.upgrade() {
            store.remove(self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn test_subscribe_fires_immediately_and_on_publish() {
        let store = Store::new(1_i64);
        let seen = Arc::new(Mutex::new(Vec::new()));

        let seen_by_listener = Arc::clone(&seen);
        let sub = store.subscribe(move |v| seen_by_listener.lock().unwrap().push(*v));

        store.set(2);
        store.update(|v| *v += 10);

        assert_eq!(*seen.lock().unwrap(), vec![1, 2, 12]);
        assert_eq!(store.get(), 12);
        drop(sub);
    }

    #[test]
    fn test_drop_unsubscribes() {
        let store = Store::new(0_u32);
        let calls = Arc::new(AtomicUsize::new(0));

        let calls_by_listener = Arc::clone(&calls);
        let sub = store.subscribe(move |_| {
            calls_by_listener.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        drop(sub);
        store.set(5);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_forever_outlives_handle() {
        let store = Store::new(0_u32);
        let calls = Arc::new(AtomicUsize::new(0));

        let calls_by_listener = Arc::clone(&calls);
        store
            .subscribe(move |_| {
                calls_by_listener.fetch_add(1, Ordering::SeqCst);
            })
            .forever();

        store.set(1);
        store.set(2);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_listener_can_read_store() {
        let store = Store::new(7_i64);
        let observed = Arc::new(Mutex::new(None));

        let handle = store.clone();
        let observed_by_listener = Arc::clone(&observed);
        let _sub = store.subscribe(move |_| {
            *observed_by_listener.lock().unwrap() = Some(handle.get());
        });

        store.set(9);
        assert_eq!(*observed.lock().unwrap(), Some(9));
    }

    #[test]
    fn test_clones_share_state() {
        let a = Store::new(String::from("x"));
        let b = a.clone();
        a.set(String::from("y"));
        assert_eq!(b.get(), "y");
    }
}
