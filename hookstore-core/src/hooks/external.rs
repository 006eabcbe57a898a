//! Subscribing components to shared stores.

use crate::error::HookError;
use crate::render::{use_sync_external_store, ExternalSource};
use crate::store::{Extended, Listener, Store, Unsubscribe};

impl<T> ExternalSource for Store<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    type Snapshot = T;

    fn source_id(&self) -> u64 {
        self.id()
    }

    fn subscribe(&self, listener: &Listener) -> Unsubscribe {
        Store::subscribe(self, listener)
    }

    fn snapshot(&self) -> T {
        self.get()
    }

    // Stores have no separate server-side value.
    fn server_snapshot(&self) -> T {
        self.get()
    }
}

impl<T, M> ExternalSource for Extended<T, M>
where
    T: Clone + PartialEq + Send + Sync + 'static,
    M: Clone + Send + Sync + 'static,
{
    type Snapshot = T;

    fn source_id(&self) -> u64 {
        self.store().source_id()
    }

    fn subscribe(&self, listener: &Listener) -> Unsubscribe {
        self.store().subscribe(listener)
    }

    fn snapshot(&self) -> T {
        self.store().snapshot()
    }

    fn server_snapshot(&self) -> T {
        self.store().server_snapshot()
    }
}

/// Read a store from inside a render and re-render when its value changes.
///
/// Writing a value equal to the rendered one does not re-render. Values
/// must be read through this hook rather than with [`Store::get`] inside a
/// render, otherwise a write landing mid-render can go unnoticed.
pub fn use_external_subscription<S>(source: &S) -> Result<S::Snapshot, HookError>
where
    S: ExternalSource,
{
    use_sync_external_store(source)
}

/// Shorthand for [`use_external_subscription`].
pub fn use_store<S>(source: &S) -> Result<S::Snapshot, HookError>
where
    S: ExternalSource,
{
    use_external_subscription(source)
}
