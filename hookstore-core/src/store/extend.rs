//! Stores with attached methods.
//!
//! [`Store::extend`] pairs a store with a value `M` built from it, usually a
//! small struct whose methods read and write the store. The pair derefs to
//! `M`, so the methods are called directly on it, and it still exposes the
//! full store API on the very same store.

use std::fmt::Debug;
use std::ops::Deref;

use super::listener::{Listener, Unsubscribe};
use super::store::Store;
use crate::error::HookError;

/// A store together with methods attached to it.
///
/// # Example
///
/// ```rust
/// use hookstore_core::store::{create_with, Store};
///
/// #[derive(Clone)]
/// struct Counter(Store<i32>);
///
/// impl Counter {
///     fn increment(&self) {
///         self.0.update(|c| c + 1);
///     }
/// }
///
/// let counter = create_with(0, |store| Counter(store.clone()));
/// counter.increment();
/// assert_eq!(counter.get(), 1);
/// ```
pub struct Extended<T, M>
where
    T: Clone + Send + Sync + 'static,
{
    store: Store<T>,
    methods: M,
}

impl<T, M> Extended<T, M>
where
    T: Clone + Send + Sync + 'static,
{
    pub(crate) fn new(store: Store<T>, methods: M) -> Self {
        Self { store, methods }
    }

    /// The underlying store.
    pub fn store(&self) -> &Store<T> {
        &self.store
    }

    /// The attached methods.
    pub fn methods(&self) -> &M {
        &self.methods
    }

    /// Split into the store and its methods.
    pub fn into_parts(self) -> (Store<T>, M) {
        (self.store, self.methods)
    }

    /// Whether this is attached to `store`.
    pub fn ptr_eq(&self, store: &Store<T>) -> bool {
        self.store.ptr_eq(store)
    }

    /// Attach further methods on top of the current ones.
    pub fn extend<N, F>(self, f: F) -> Extended<T, (M, N)>
    where
        F: FnOnce(&Store<T>) -> N,
    {
        let more = f(&self.store);
        Extended::new(self.store, (self.methods, more))
    }

    pub fn id(&self) -> u64 {
        self.store.id()
    }

    pub fn get(&self) -> T {
        self.store.get()
    }

    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.store.with(f)
    }

    pub fn set(&self, value: T) {
        self.store.set(value);
    }

    pub fn update<F>(&self, f: F)
    where
        F: FnOnce(&T) -> T,
    {
        self.store.update(f);
    }

    pub fn try_update<F, E>(&self, f: F) -> Result<(), E>
    where
        F: FnOnce(&T) -> Result<T, E>,
    {
        self.store.try_update(f)
    }

    pub fn subscribe(&self, listener: &Listener) -> Unsubscribe {
        self.store.subscribe(listener)
    }

    pub fn subscribe_fn<F>(&self, f: F) -> Unsubscribe
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.store.subscribe_fn(f)
    }

    pub fn subscriber_count(&self) -> usize {
        self.store.subscriber_count()
    }

    /// See [`Store::use_value`].
    pub fn use_value(&self) -> Result<T, HookError>
    where
        T: PartialEq,
    {
        self.store.use_value()
    }
}

impl<T, M> Deref for Extended<T, M>
where
    T: Clone + Send + Sync + 'static,
{
    type Target = M;

    fn deref(&self) -> &M {
        &self.methods
    }
}

impl<T, M> AsRef<Store<T>> for Extended<T, M>
where
    T: Clone + Send + Sync + 'static,
{
    fn as_ref(&self) -> &Store<T> {
        &self.store
    }
}

impl<T, M> Clone for Extended<T, M>
where
    T: Clone + Send + Sync + 'static,
    M: Clone,
{
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            methods: self.methods.clone(),
        }
    }
}

impl<T, M> Debug for Extended<T, M>
where
    T: Clone + Send + Sync + Debug + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Extended")
            .field("store", &self.store)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{create, create_with};

    #[derive(Clone)]
    struct Counter {
        store: Store<i32>,
    }

    impl Counter {
        fn increment(&self) {
            self.store.update(|c| c + 1);
        }

        fn reset(&self) {
            self.store.set(0);
        }
    }

    #[test]
    fn extend_keeps_store_identity() {
        let store = create(5);
        let extended = store.clone().extend(|s| Counter { store: s.clone() });

        assert!(extended.ptr_eq(&store));
        assert_eq!(extended.id(), store.id());

        extended.increment();
        assert_eq!(store.get(), 6);

        store.set(40);
        assert_eq!(extended.get(), 40);

        extended.reset();
        assert_eq!(store.get(), 0);
    }

    #[test]
    fn create_with_matches_create_then_extend() {
        let counter = create_with(1, |s| Counter { store: s.clone() });
        counter.increment();
        counter.increment();
        assert_eq!(counter.get(), 3);
        assert!(counter.methods().store.ptr_eq(counter.store()));
    }

    #[test]
    fn extend_twice_keeps_both_method_sets() {
        #[derive(Clone)]
        struct Doubler(Store<i32>);
        impl Doubler {
            fn double(&self) {
                self.0.update(|v| v * 2);
            }
        }

        let both = create_with(3, |s| Counter { store: s.clone() })
            .extend(|s| Doubler(s.clone()));

        both.0.increment();
        both.1.double();
        assert_eq!(both.get(), 8);
    }

    #[test]
    fn methods_notify_subscribers() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        use std::sync::Arc;

        let counter = create_with(0, |s| Counter { store: s.clone() });
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = calls.clone();
        counter.subscribe_fn(move || {
            calls_clone.fetch_add(1, Ordering::SeqCst);
        });

        counter.increment();
        counter.increment();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
