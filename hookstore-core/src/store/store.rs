//! Store Implementation
//!
//! A Store is an observable value cell shared by every clone of its handle.
//! Reads return the last committed value; writes commit a new value and then
//! notify every registered listener before returning.
//!
//! # Write Sequence
//!
//! 1. Take the store's writer lock.
//! 2. Compute the next value (for updaters). A panic or `Err` here leaves the
//!    value untouched and notifies nobody.
//! 3. Commit the value.
//! 4. Snapshot the listener set and invoke each listener that is still
//!    registered when its turn comes.
//!
//! # Thread Safety
//!
//! The value lives behind a `RwLock`, so reads from any thread proceed
//! without waiting on one another. Writes are serialized by a reentrant
//! writer lock that is held through notification: a set on one thread waits
//! for another thread's notification pass to finish, while a listener running
//! on the writing thread may still read or write the store.
//!
//! # Listener Panics
//!
//! A panicking listener unwinds out of the write call. Listeners later in
//! the same pass are not invoked and the new value stays committed.

use std::fmt::Debug;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::{ReentrantMutex, RwLock};

use super::action::Action;
use super::extend::Extended;
use super::listener::{Listener, ListenerSet, Unsubscribe};
use crate::error::HookError;

/// Counter for generating unique store IDs.
static STORE_ID_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Generate a new unique store ID.
fn next_store_id() -> u64 {
    STORE_ID_COUNTER.fetch_add(1, Ordering::Relaxed)
}

/// A shared observable value of type T.
///
/// # Example
///
/// ```rust
/// use hookstore_core::store::Store;
///
/// let count = Store::new(0);
/// let seen = count.clone();
///
/// let unsubscribe = count.subscribe_fn(move || println!("now {}", seen.get()));
/// count.update(|c| c + 1);
/// unsubscribe.unsubscribe();
///
/// assert_eq!(count.get(), 1);
/// ```
pub struct Store<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Unique identifier, shared by all clones.
    id: u64,

    /// The committed value.
    value: Arc<RwLock<T>>,

    /// Serializes commit + notify.
    writer: Arc<ReentrantMutex<()>>,

    /// Number of committed writes.
    version: Arc<AtomicU64>,

    /// Registered change listeners.
    listeners: Arc<ListenerSet>,
}

impl<T> Store<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Create a new store holding `value`.
    pub fn new(value: T) -> Self {
        Self {
            id: next_store_id(),
            value: Arc::new(RwLock::new(value)),
            writer: Arc::new(ReentrantMutex::new(())),
            version: Arc::new(AtomicU64::new(0)),
            listeners: Arc::new(ListenerSet::default()),
        }
    }

    /// Get the store's unique ID.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Whether both handles refer to the same store.
    pub fn ptr_eq(&self, other: &Store<T>) -> bool {
        Arc::ptr_eq(&self.value, &other.value)
    }

    /// Get a clone of the current value.
    pub fn get(&self) -> T {
        self.value.read().clone()
    }

    /// Read the current value by reference.
    ///
    /// `f` must not access this store, not even to read it: the read lock is
    /// held while `f` runs and is not recursive.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.value.read())
    }

    /// Replace the value and notify listeners.
    pub fn set(&self, value: T) {
        let _writer = self.writer.lock();
        *self.value.write() = value;
        self.version.fetch_add(1, Ordering::Release);
        tracing::trace!(store = self.id, "value set");
        self.notify();
    }

    /// Replace the value with `f(current)` and notify listeners.
    ///
    /// If `f` panics, the value is left as it was and no listener runs.
    pub fn update<F>(&self, f: F)
    where
        F: FnOnce(&T) -> T,
    {
        let _writer = self.writer.lock();
        let next = f(&self.get());
        *self.value.write() = next;
        self.version.fetch_add(1, Ordering::Release);
        tracing::trace!(store = self.id, "value updated");
        self.notify();
    }

    /// Like [`update`](Self::update), with an updater that can fail.
    ///
    /// On `Err` the value is unchanged, no listener runs, and the error is
    /// handed back untouched.
    pub fn try_update<F, E>(&self, f: F) -> Result<(), E>
    where
        F: FnOnce(&T) -> Result<T, E>,
    {
        let _writer = self.writer.lock();
        let next = f(&self.get())?;
        *self.value.write() = next;
        self.version.fetch_add(1, Ordering::Release);
        tracing::trace!(store = self.id, "value updated");
        self.notify();
        Ok(())
    }

    /// Perform a read or a write through one entry point.
    ///
    /// Returns `Some(value)` for [`Action::Get`] and `None` for writes.
    pub fn call(&self, action: Action<T>) -> Option<T> {
        match action {
            Action::Get => Some(self.get()),
            Action::Set(value) => {
                self.set(value);
                None
            }
            Action::Update(f) => {
                self.update(f);
                None
            }
        }
    }

    /// Register `listener`, to be called after every write.
    ///
    /// Registering a listener that is already registered returns a handle to
    /// the existing registration.
    pub fn subscribe(&self, listener: &Listener) -> Unsubscribe {
        let (generation, inserted) = self.listeners.insert(listener);
        if inserted {
            tracing::trace!(store = self.id, generation, "listener subscribed");
        }
        Unsubscribe::new(&self.listeners, listener, generation)
    }

    /// Register a closure as a new listener.
    pub fn subscribe_fn<F>(&self, f: F) -> Unsubscribe
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.subscribe(&Listener::new(f))
    }

    /// Number of writes committed so far.
    ///
    /// Every `set`, `update` and successful `try_update` bumps it, even when
    /// the new value equals the old one.
    pub fn version(&self) -> u64 {
        self.version.load(Ordering::Acquire)
    }

    /// Get the number of registered listeners.
    pub fn subscriber_count(&self) -> usize {
        self.listeners.len()
    }

    /// Attach methods built from this store.
    ///
    /// The returned value refers to this same store.
    pub fn extend<M, F>(self, f: F) -> Extended<T, M>
    where
        F: FnOnce(&Store<T>) -> M,
    {
        let methods = f(&self);
        Extended::new(self, methods)
    }

    /// Read the value from inside a component render and re-render the
    /// component whenever it changes.
    pub fn use_value(&self) -> Result<T, HookError>
    where
        T: PartialEq,
    {
        crate::hooks::use_external_subscription(self)
    }

    /// Notify every listener registered at the start of the pass.
    fn notify(&self) {
        let pass = self.listeners.snapshot();
        for listener in &pass {
            // Skip listeners removed by an earlier listener in this pass.
            if self.listeners.contains(listener) {
                listener.notify();
            }
        }
    }
}

impl<T> Clone for Store<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            value: Arc::clone(&self.value),
            writer: Arc::clone(&self.writer),
            version: Arc::clone(&self.version),
            listeners: Arc::clone(&self.listeners),
        }
    }
}

impl<T> Debug for Store<T>
where
    T: Clone + Send + Sync + Debug + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("id", &self.id)
            .field("value", &*self.value.read())
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

/// Create a store holding `value`.
pub fn create<T>(value: T) -> Store<T>
where
    T: Clone + Send + Sync + 'static,
{
    Store::new(value)
}

/// Create a store and attach methods to it in one step.
///
/// Same as `create(value).extend(f)`.
pub fn create_with<T, M, F>(value: T, f: F) -> Extended<T, M>
where
    T: Clone + Send + Sync + 'static,
    F: FnOnce(&Store<T>) -> M,
{
    create(value).extend(f)
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::panic::{catch_unwind, AssertUnwindSafe};
    use std::sync::atomic::AtomicUsize;

    use parking_lot::Mutex;

    fn counting_listener() -> (Listener, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = calls.clone();
        let listener = Listener::new(move || {
            calls_clone.fetch_add(1, Ordering::SeqCst);
        });
        (listener, calls)
    }

    #[test]
    fn store_get_and_set() {
        let store = Store::new(0);
        assert_eq!(store.get(), 0);

        store.set(42);
        assert_eq!(store.get(), 42);
    }

    #[test]
    fn store_update() {
        let store = Store::new(10);
        store.update(|v| v + 5);
        assert_eq!(store.get(), 15);
    }

    #[test]
    fn falsy_values_are_writes() {
        let maybe = Store::new(Some(3));
        maybe.set(None);
        assert_eq!(maybe.get(), None);

        let number = Store::new(7);
        number.set(0);
        assert_eq!(number.get(), 0);

        let flag = Store::new(true);
        flag.set(false);
        assert!(!flag.get());

        let text = Store::new(String::from("hello"));
        text.set(String::new());
        assert_eq!(text.get(), "");

        let unit = Store::new(());
        let (listener, calls) = counting_listener();
        unit.subscribe(&listener);
        unit.set(());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn call_dispatches_on_variant() {
        let store = Store::new(Some(1));

        assert_eq!(store.call(Action::Get), Some(Some(1)));
        assert_eq!(store.call(Action::Set(None)), None);
        assert_eq!(store.call(Action::Get), Some(None));

        assert_eq!(store.call(Action::update(|v: &Option<i32>| v.or(Some(9)))), None);
        assert_eq!(store.get(), Some(9));

        // A bare value converts into a literal write.
        store.call(Some(4).into());
        assert_eq!(store.get(), Some(4));
    }

    #[test]
    fn function_values_are_set_literally() {
        fn double(x: i32) -> i32 {
            x * 2
        }
        fn triple(x: i32) -> i32 {
            x * 3
        }

        let store: Store<fn(i32) -> i32> = Store::new(double);
        store.set(triple);
        assert_eq!((store.get())(2), 6);
    }

    #[test]
    fn store_notifies_each_listener_once() {
        let store = Store::new(0);
        let listeners: Vec<_> = (0..5).map(|_| counting_listener()).collect();
        for (listener, _) in &listeners {
            store.subscribe(listener);
        }

        store.set(1);

        for (_, calls) in &listeners {
            assert_eq!(calls.load(Ordering::SeqCst), 1);
        }
    }

    #[test]
    fn listeners_see_committed_value() {
        let store = Store::new(0);
        let seen = Arc::new(Mutex::new(Vec::new()));

        let reader = store.clone();
        let seen_clone = seen.clone();
        store.subscribe_fn(move || seen_clone.lock().push(reader.get()));

        store.set(1);
        store.update(|v| v * 10);
        assert_eq!(*seen.lock(), vec![1, 10]);
    }

    #[test]
    fn duplicate_subscribe_counts_once() {
        let store = Store::new(0);
        let (listener, calls) = counting_listener();

        let first = store.subscribe(&listener);
        let second = store.subscribe(&listener.clone());
        assert_eq!(store.subscriber_count(), 1);

        store.set(1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        // Either handle removes the single registration.
        second.unsubscribe();
        assert_eq!(store.subscriber_count(), 0);
        first.unsubscribe();

        store.set(2);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn version_counts_committed_writes() {
        let store = Store::new(1);
        let clone = store.clone();
        assert_eq!(store.version(), 0);

        store.set(1);
        clone.update(|v| v + 1);
        assert_eq!(store.version(), 2);

        assert_eq!(store.try_update(|_| Err::<i32, _>("no")), Err("no"));
        let outcome = catch_unwind(AssertUnwindSafe(|| store.update(|_| panic!("boom"))));
        assert!(outcome.is_err());
        assert_eq!(clone.version(), 2);
    }

    #[test]
    fn store_unsubscribe() {
        let store = Store::new(0);
        let (kept, kept_calls) = counting_listener();
        let (removed, removed_calls) = counting_listener();

        store.subscribe(&kept);
        let unsubscribe = store.subscribe(&removed);

        store.set(1);
        unsubscribe.unsubscribe();
        store.set(2);

        assert_eq!(kept_calls.load(Ordering::SeqCst), 2);
        assert_eq!(removed_calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn double_unsubscribe_is_noop() {
        let store = Store::new(0);
        let (listener, calls) = counting_listener();
        let (other, other_calls) = counting_listener();

        let unsubscribe = store.subscribe(&listener);
        store.subscribe(&other);

        unsubscribe.unsubscribe();
        unsubscribe.unsubscribe();
        assert_eq!(store.subscriber_count(), 1);

        // A later registration of the same listener survives the old handle.
        store.subscribe(&listener);
        unsubscribe.unsubscribe();
        assert_eq!(store.subscriber_count(), 2);

        store.set(1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(other_calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn failed_try_update_is_atomic() {
        let store = Store::new(5);
        let (listener, calls) = counting_listener();
        store.subscribe(&listener);

        let result: Result<(), &str> = store.try_update(|_| Err("rejected"));

        assert_eq!(result, Err("rejected"));
        assert_eq!(store.get(), 5);
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        store.try_update(|v| Ok::<_, &str>(v + 1)).unwrap();
        assert_eq!(store.get(), 6);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn panicking_updater_is_atomic() {
        let store = Store::new(5);
        let (listener, calls) = counting_listener();
        store.subscribe(&listener);

        let outcome = catch_unwind(AssertUnwindSafe(|| {
            store.update(|_| panic!("updater failed"));
        }));

        assert!(outcome.is_err());
        assert_eq!(store.get(), 5);
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        // The store is still usable afterwards.
        store.set(6);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn panicking_listener_stops_the_pass() {
        let store = Store::new(0);
        let (before, before_calls) = counting_listener();
        let (after, after_calls) = counting_listener();

        store.subscribe(&before);
        store.subscribe_fn(|| panic!("listener failed"));
        store.subscribe(&after);

        let outcome = catch_unwind(AssertUnwindSafe(|| store.set(1)));

        assert!(outcome.is_err());
        assert_eq!(store.get(), 1);
        assert_eq!(before_calls.load(Ordering::SeqCst), 1);
        assert_eq!(after_calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn listener_removed_mid_pass_is_skipped() {
        let store = Store::new(0);
        let (victim, victim_calls) = counting_listener();
        let (bystander, bystander_calls) = counting_listener();

        let victim_handle = Arc::new(Mutex::new(None::<Unsubscribe>));
        let handle_clone = victim_handle.clone();
        store.subscribe_fn(move || {
            if let Some(handle) = handle_clone.lock().as_ref() {
                handle.unsubscribe();
            }
        });
        *victim_handle.lock() = Some(store.subscribe(&victim));
        store.subscribe(&bystander);

        store.set(1);

        assert_eq!(victim_calls.load(Ordering::SeqCst), 0);
        assert_eq!(bystander_calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn listener_added_mid_pass_waits_for_next_set() {
        let store = Store::new(0);
        let (late, late_calls) = counting_listener();

        let store_clone = store.clone();
        let late_clone = late.clone();
        store.subscribe_fn(move || {
            store_clone.subscribe(&late_clone);
        });

        store.set(1);
        assert_eq!(late_calls.load(Ordering::SeqCst), 0);

        store.set(2);
        assert_eq!(late_calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn listener_may_write_reentrantly() {
        let store = Store::new(0);
        let clamp = store.clone();
        store.subscribe_fn(move || {
            if clamp.get() > 10 {
                clamp.set(10);
            }
        });

        store.set(25);
        assert_eq!(store.get(), 10);
    }

    #[test]
    fn concurrent_updates_are_serialized() {
        let store = Store::new(0usize);
        let (listener, calls) = counting_listener();
        store.subscribe(&listener);

        let threads: Vec<_> = (0..4)
            .map(|_| {
                let store = store.clone();
                std::thread::spawn(move || {
                    for _ in 0..250 {
                        store.update(|v| v + 1);
                    }
                })
            })
            .collect();
        for thread in threads {
            thread.join().unwrap();
        }

        assert_eq!(store.get(), 1000);
        assert_eq!(calls.load(Ordering::SeqCst), 1000);
    }

    #[test]
    fn store_clone_shares_state() {
        let store1 = Store::new(0);
        let store2 = store1.clone();

        store1.set(42);
        assert_eq!(store2.get(), 42);
        assert!(store1.ptr_eq(&store2));
        assert_eq!(store1.id(), store2.id());
    }

    #[test]
    fn store_ids_are_unique() {
        let s1 = Store::new(0);
        let s2 = Store::new(0);

        assert_ne!(s1.id(), s2.id());
        assert!(!s1.ptr_eq(&s2));
    }

    #[test]
    fn replacing_a_struct_does_not_merge() {
        #[derive(Clone, Debug, PartialEq)]
        struct Form {
            a: i32,
            b: Option<i32>,
        }

        let store = create(Form { a: 1, b: Some(2) });
        store.set(Form { a: 2, b: None });
        assert_eq!(store.get(), Form { a: 2, b: None });
    }
}
