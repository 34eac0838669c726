//! Single-writer state container with batched notifications.

use dashmap::DashMap;
use std::collections::HashSet;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use tracing::trace;

use crate::store::derived::DerivedGraph;

/// Names of the slices that moved in one update.
pub type Changes = HashSet<&'static str>;

/// State types that can report which slices differ between two snapshots.
pub trait Slices: Clone + Send + Sync + 'static {
    fn changed(prev: &Self, next: &Self) -> Changes;
}

pub type Listener<S> = Arc<dyn Fn(&S, &Changes) + Send + Sync>;

#[derive(Default)]
struct BatchState {
    depth: usize,
    changed: Changes,
}

/// Holds the current snapshot, recomputes derived values, notifies listeners.
pub struct Store<S: Slices> {
    state: RwLock<Arc<S>>,
    derived: DerivedGraph<S>,
    listeners: Arc<DashMap<u64, Listener<S>>>,
    next_listener: AtomicU64,
    batch: Mutex<BatchState>,
}

impl<S: Slices + fmt::Debug> fmt::Debug for Store<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store")
            .field("derived", &self.derived)
            .field("listeners", &self.listeners.len())
            .finish_non_exhaustive()
    }
}

impl<S: Slices> Store<S> {
    pub fn new(mut initial: S, derived: DerivedGraph<S>) -> Self {
        derived.recompute_all(&mut initial);
        Self {
            state: RwLock::new(Arc::new(initial)),
            derived,
            listeners: Arc::new(DashMap::new()),
            next_listener: AtomicU64::new(0),
            batch: Mutex::new(BatchState::default()),
        }
    }

    /// Current snapshot.
    pub fn get(&self) -> Arc<S> {
        self.state
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Apply `f` to a copy of the state and publish the result.
    pub fn set<F: FnOnce(&mut S)>(&self, f: F) {
        let in_batch = self.batch_guard().depth > 0;

        let mut guard = self
            .state
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let prev = guard.clone();
        let mut next = (*prev).clone();
        f(&mut next);
        let mut changed = S::changed(&prev, &next);
        if changed.is_empty() {
            return;
        }

        if in_batch {
            *guard = Arc::new(next);
            drop(guard);
            self.batch_guard().changed.extend(changed);
            return;
        }

        self.derived.recompute(&mut next, &mut changed);
        let snapshot = Arc::new(next);
        *guard = snapshot.clone();
        drop(guard);
        self.notify(&snapshot, &changed);
    }

    /// Run `f` with notifications deferred; listeners see one update at the end.
    pub fn batch<R, F: FnOnce() -> R>(&self, f: F) -> R {
        self.batch_guard().depth += 1;
        let out = f();
        let changed = {
            let mut batch = self.batch_guard();
            batch.depth -= 1;
            if batch.depth > 0 {
                return out;
            }
            std::mem::take(&mut batch.changed)
        };
        if !changed.is_empty() {
            self.flush(changed);
        }
        out
    }

    fn flush(&self, mut changed: Changes) {
        let mut guard = self
            .state
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let mut next = (**guard).clone();
        self.derived.recompute(&mut next, &mut changed);
        let snapshot = Arc::new(next);
        *guard = snapshot.clone();
        drop(guard);
        self.notify(&snapshot, &changed);
    }

    fn notify(&self, snapshot: &S, changed: &Changes) {
        trace!(?changed, listeners = self.listeners.len(), "store updated");
        // collect first so a listener may unsubscribe without deadlocking the map
        let listeners: Vec<Listener<S>> = self.listeners.iter().map(|l| l.value().clone()).collect();
        for listener in listeners {
            listener(snapshot, changed);
        }
    }

    /// Register a listener. It stays registered while the returned guard lives.
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&S, &Changes) + Send + Sync + 'static,
    {
        let id = self.next_listener.fetch_add(1, Ordering::Relaxed);
        self.listeners.insert(id, Arc::new(listener));
        let listeners = Arc::downgrade(&self.listeners);
        Subscription {
            unsubscribe: Some(Box::new(move || {
                if let Some(listeners) = listeners.upgrade() {
                    listeners.remove(&id);
                }
            })),
        }
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    fn batch_guard(&self) -> std::sync::MutexGuard<'_, BatchState> {
        self.batch
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Unsubscribes on drop.
pub struct Subscription {
    unsubscribe: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl Subscription {
    /// Keep the listener registered for the store's lifetime.
    pub fn detach(mut self) {
        self.unsubscribe = None;
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(unsubscribe) = self.unsubscribe.take() {
            unsubscribe();
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.unsubscribe.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::derived::DerivedNode;
    use std::sync::atomic::AtomicUsize;

    #[derive(Debug, Clone, Default)]
    struct Counter {
        a: i32,
        b: i32,
        sum: i32,
    }

    impl Slices for Counter {
        fn changed(prev: &Self, next: &Self) -> Changes {
            let mut out = Changes::new();
            if prev.a != next.a {
                out.insert("a");
            }
            if prev.b != next.b {
                out.insert("b");
            }
            out
        }
    }

    fn store() -> Store<Counter> {
        let derived = DerivedGraph::new(vec![DerivedNode::new("sum", &["a", "b"], |s: &mut Counter| {
            let v = s.a + s.b;
            let changed = v != s.sum;
            s.sum = v;
            changed
        })])
        .unwrap();
        Store::new(Counter { a: 1, b: 2, sum: 0 }, derived)
    }

    #[test]
    fn test_initial_derived_values() {
        assert_eq!(store().get().sum, 3);
    }

    #[test]
    fn test_batch_notifies_once() {
        let s = store();
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = calls.clone();
        let _sub = s.subscribe(move |state, changed| {
            seen.fetch_add(1, Ordering::SeqCst);
            assert_eq!(state.sum, 30);
            assert!(changed.contains("a") && changed.contains("b") && changed.contains("sum"));
        });
        s.batch(|| {
            s.set(|c| c.a = 10);
            s.set(|c| c.b = 20);
        });
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_no_op_update_is_silent() {
        let s = store();
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = calls.clone();
        let _sub = s.subscribe(move |_, _| {
            seen.fetch_add(1, Ordering::SeqCst);
        });
        s.set(|c| c.a = 1);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_subscription_drop_unsubscribes() {
        let s = store();
        let sub = s.subscribe(|_, _| {});
        assert_eq!(s.listener_count(), 1);
        drop(sub);
        assert_eq!(s.listener_count(), 0);
        s.subscribe(|_, _| {}).detach();
        assert_eq!(s.listener_count(), 1);
    }

    #[test]
    fn test_nested_batch_flushes_at_outermost() {
        let s = store();
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = calls.clone();
        let _sub = s.subscribe(move |_, _| {
            seen.fetch_add(1, Ordering::SeqCst);
        });
        s.batch(|| {
            s.batch(|| s.set(|c| c.a = 5));
            assert_eq!(calls.load(Ordering::SeqCst), 0);
            s.set(|c| c.b = 5);
        });
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(s.get().sum, 10);
    }
}
