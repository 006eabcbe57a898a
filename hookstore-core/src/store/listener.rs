//! Listener registry for stores.
//!
//! A [`Listener`] is a zero-argument callback with identity: two clones of
//! the same `Listener` are the same listener, so registering it twice on one
//! store yields a single registration.
//!
//! Every registration carries a generation number. An [`Unsubscribe`] handle
//! remembers the generation it was issued for and only removes a registration
//! with that exact generation. Once a listener has been removed and then
//! registered again, stale handles from the first registration do nothing.

use std::fmt::Debug;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use indexmap::IndexMap;
use parking_lot::Mutex;
use smallvec::SmallVec;

/// A change callback registered on a store.
///
/// Cloning a `Listener` is cheap and preserves its identity.
#[derive(Clone)]
pub struct Listener {
    callback: Arc<dyn Fn() + Send + Sync>,
}

impl Listener {
    /// Wrap a callback into a listener with a fresh identity.
    pub fn new<F>(callback: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        Self {
            callback: Arc::new(callback),
        }
    }

    /// Invoke the callback.
    pub fn notify(&self) {
        (self.callback)();
    }

    /// Whether both handles refer to the same listener.
    pub fn same_as(&self, other: &Listener) -> bool {
        self.key() == other.key()
    }

    fn key(&self) -> ListenerKey {
        ListenerKey(Arc::as_ptr(&self.callback) as *const () as usize)
    }
}

impl Debug for Listener {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Listener").field(&self.key().0).finish()
    }
}

/// Identity of a registered listener (the address of its callback).
///
/// The registry holds a clone of the listener for as long as the key is in
/// use, so the address cannot be reused by another allocation meanwhile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct ListenerKey(usize);

#[derive(Debug)]
struct Registration {
    listener: Listener,
    generation: u64,
}

/// The set of listeners attached to one store.
#[derive(Debug, Default)]
pub(crate) struct ListenerSet {
    entries: Mutex<IndexMap<ListenerKey, Registration>>,
    generations: AtomicU64,
}

/// Listeners captured for one notification pass.
pub(crate) type ListenerSnapshot = SmallVec<[Listener; 4]>;

impl ListenerSet {
    /// Register `listener`, returning the generation of its registration.
    ///
    /// An existing registration of the same listener is kept as is.
    pub(crate) fn insert(&self, listener: &Listener) -> (u64, bool) {
        let mut entries = self.entries.lock();
        if let Some(existing) = entries.get(&listener.key()) {
            return (existing.generation, false);
        }
        let generation = self.generations.fetch_add(1, Ordering::Relaxed);
        entries.insert(
            listener.key(),
            Registration {
                listener: listener.clone(),
                generation,
            },
        );
        (generation, true)
    }

    /// Remove the registration of `key` if it is still `generation`.
    fn remove(&self, key: ListenerKey, generation: u64) -> bool {
        let mut entries = self.entries.lock();
        match entries.get(&key) {
            Some(registration) if registration.generation == generation => {
                entries.shift_remove(&key);
                true
            }
            _ => false,
        }
    }

    /// Whether `listener` is registered right now.
    pub(crate) fn contains(&self, listener: &Listener) -> bool {
        self.entries.lock().contains_key(&listener.key())
    }

    /// Copy the current listeners out, in registration order.
    pub(crate) fn snapshot(&self) -> ListenerSnapshot {
        self.entries
            .lock()
            .values()
            .map(|registration| registration.listener.clone())
            .collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.lock().len()
    }
}

/// Cancels one listener registration.
///
/// Calling [`unsubscribe`](Unsubscribe::unsubscribe) more than once, or after
/// the store itself is gone, is a no-op. Dropping the handle does NOT
/// unsubscribe.
#[derive(Clone)]
pub struct Unsubscribe {
    listeners: Weak<ListenerSet>,
    key: ListenerKey,
    generation: u64,
}

impl Unsubscribe {
    pub(crate) fn new(listeners: &Arc<ListenerSet>, listener: &Listener, generation: u64) -> Self {
        Self {
            listeners: Arc::downgrade(listeners),
            key: listener.key(),
            generation,
        }
    }

    /// Remove the registration this handle was issued for.
    pub fn unsubscribe(&self) {
        if let Some(listeners) = self.listeners.upgrade() {
            if listeners.remove(self.key, self.generation) {
                tracing::trace!(listener = self.key.0, "listener unsubscribed");
            }
        }
    }
}

impl Debug for Unsubscribe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Unsubscribe")
            .field("listener", &self.key.0)
            .field("generation", &self.generation)
            .finish()
    }
}
