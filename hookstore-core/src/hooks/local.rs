//! Component-private stores driven by a reducer.
//!
//! [`use_local_store`] gives each component instance its own store with
//! attached methods. Unlike [`use_store`](super::use_store) it re-renders
//! through the host's reducer dispatch: every store write dispatches a
//! no-payload action, and the reducer re-reads the store. This skips the
//! tear check, which is fine because only the owning component and the
//! handles it gives out can write to the store.
//!
//! The reducer state carries the store version its value was read at. When
//! the subscription is made after the first commit, a newer version means a
//! write landed before anyone was listening, and a refresh is dispatched.

use crate::error::HookError;
use crate::render::{use_mount_effect, use_reducer, Cleanup};
use crate::store::{create_with, Extended, Store};

/// Reducer state: the latest value, the store it came from and the store
/// version it was read at.
type LocalState<T, M> = (T, Extended<T, M>, u64);

fn read<T, M>(store: Extended<T, M>) -> LocalState<T, M>
where
    T: Clone + Send + Sync + 'static,
{
    let version = store.store().version();
    (store.get(), store, version)
}

fn refresh<T, M>(state: &LocalState<T, M>, _action: ()) -> LocalState<T, M>
where
    T: Clone + Send + Sync + 'static,
    M: Clone,
{
    read(state.1.clone())
}

/// Create a store private to the rendering instance, with methods built by
/// `extension`, and re-render whenever it is written.
///
/// The store is created on the first render; `initial` and `extension` are
/// ignored afterwards. Returns the current value and the extended store.
/// The subscription lives until the instance unmounts.
pub fn use_local_store<T, M, F>(initial: T, extension: F) -> Result<(T, Extended<T, M>), HookError>
where
    T: Clone + Send + Sync + 'static,
    M: Clone + Send + Sync + 'static,
    F: FnOnce(&Store<T>) -> M,
{
    let ((value, store, version), dispatch) =
        use_reducer(refresh::<T, M>, || read(create_with(initial, extension)))?;

    let subscribed = store.clone();
    use_mount_effect(move || {
        let listener = dispatch.clone();
        let unsubscribe = subscribed.subscribe_fn(move || listener.dispatch(()));
        if subscribed.store().version() != version {
            dispatch.dispatch(());
        }
        Some(Box::new(move || unsubscribe.unsubscribe()) as Cleanup)
    })?;

    Ok((value, store))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use parking_lot::Mutex;

    use crate::render::Component;

    #[derive(Clone)]
    struct Counter {
        store: Store<i32>,
    }

    impl Counter {
        fn increment(&self) {
            self.store.update(|c| c + 1);
        }
    }

    type Handle = Arc<Mutex<Option<Extended<i32, Counter>>>>;

    fn counter_component(handle: Handle) -> Component<i32> {
        Component::new(move || {
            let (count, counter) = use_local_store(0, |s| Counter { store: s.clone() })?;
            *handle.lock() = Some(counter);
            Ok(count)
        })
    }

    fn take(handle: &Handle) -> Extended<i32, Counter> {
        handle.lock().clone().expect("component rendered")
    }

    #[test]
    fn writes_rerender_with_latest_value() {
        let handle = Handle::default();
        let mut component = counter_component(handle.clone());

        assert_eq!(component.render(), Ok(0));
        let counter = take(&handle);

        counter.increment();
        assert!(component.is_stale());
        assert_eq!(component.flush(), Ok(Some(1)));

        counter.increment();
        counter.set(10);
        assert_eq!(component.flush(), Ok(Some(10)));
        assert_eq!(component.flush(), Ok(None));
    }

    #[test]
    fn store_identity_is_stable_across_renders() {
        let handle = Handle::default();
        let mut component = counter_component(handle.clone());

        component.render().unwrap();
        let first = take(&handle);
        first.increment();
        component.flush().unwrap();
        component.render().unwrap();

        assert!(take(&handle).ptr_eq(first.store()));
        assert_eq!(first.subscriber_count(), 1);
    }

    #[test]
    fn instances_are_independent() {
        let handle_a = Handle::default();
        let handle_b = Handle::default();
        let mut a = counter_component(handle_a.clone());
        let mut b = counter_component(handle_b.clone());

        a.render().unwrap();
        b.render().unwrap();

        take(&handle_a).increment();

        assert_eq!(a.flush(), Ok(Some(1)));
        assert!(!b.is_stale());
        assert_eq!(b.flush(), Ok(None));
        assert_eq!(take(&handle_b).get(), 0);
    }

    #[test]
    fn write_during_first_render_is_picked_up() {
        let handle = Handle::default();
        let handle_clone = handle.clone();
        let mut component = Component::new(move || {
            let (count, counter) = use_local_store(0, |s| Counter { store: s.clone() })?;
            if handle_clone.lock().is_none() {
                counter.set(5);
            }
            *handle_clone.lock() = Some(counter);
            Ok(count)
        });

        assert_eq!(component.render(), Ok(0));
        assert!(component.is_stale());
        assert_eq!(component.flush(), Ok(Some(5)));
        assert_eq!(component.flush(), Ok(None));
        assert_eq!(take(&handle).subscriber_count(), 1);
    }

    #[test]
    fn write_from_earlier_mount_effect_is_picked_up() {
        let handle = Handle::default();
        let handle_clone = handle.clone();
        let mut component = Component::new(move || {
            let writer: Arc<Mutex<Option<Extended<i32, Counter>>>> = Arc::default();
            let slot = writer.clone();
            use_mount_effect(move || {
                if let Some(counter) = slot.lock().take() {
                    counter.set(7);
                }
                None
            })?;
            let (count, counter) = use_local_store(0, |s| Counter { store: s.clone() })?;
            *writer.lock() = Some(counter.clone());
            *handle_clone.lock() = Some(counter);
            Ok(count)
        });

        assert_eq!(component.render(), Ok(0));
        assert_eq!(take(&handle).get(), 7);
        assert_eq!(component.flush(), Ok(Some(7)));
    }

    #[test]
    fn unmount_removes_subscription() {
        let handle = Handle::default();
        let mut component = counter_component(handle.clone());
        component.render().unwrap();
        let counter = take(&handle);
        assert_eq!(counter.subscriber_count(), 1);

        component.unmount();
        assert_eq!(counter.subscriber_count(), 0);

        counter.increment();
        assert!(!component.is_stale());
    }
}
