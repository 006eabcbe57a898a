//! Host Primitives
//!
//! The low-level hooks the host offers to component code and to the
//! store hooks built on top of it:
//!
//! - [`use_ref`]: a mutable cell that persists for the life of the instance.
//! - [`use_reducer`]: state advanced by dispatched actions; dispatching
//!   requests a re-render.
//! - [`use_mount_effect`]: work that runs once, after the first commit, with
//!   an optional cleanup at unmount.
//! - [`use_sync_external_store`]: reads a value that lives outside the
//!   component and re-renders the component when it changes.
//!
//! # Tear-Free Reads
//!
//! [`use_sync_external_store`] records the snapshot it returned. Before a
//! render commits, the host re-reads every recorded source; if any changed
//! while the render was running, the render is thrown away and run again.
//! A committed render therefore never mixes values from different moments.

use std::fmt::{self, Debug};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};

use super::context::RenderContext;
use super::instance::{Cleanup, RenderMode, WeakInstance};
use crate::error::HookError;
use crate::store::{Listener, Unsubscribe};

// ----------------------------------------------------------------------------
// use_ref
// ----------------------------------------------------------------------------

/// A mutable cell owned by a component instance.
pub struct HookRef<T> {
    cell: Arc<Mutex<T>>,
}

impl<T> HookRef<T> {
    /// Get a clone of the current value.
    pub fn get(&self) -> T
    where
        T: Clone,
    {
        self.cell.lock().clone()
    }

    /// Replace the value. Does not trigger a re-render.
    pub fn set(&self, value: T) {
        *self.cell.lock() = value;
    }

    /// Lock the cell for in-place access.
    pub fn lock(&self) -> MutexGuard<'_, T> {
        self.cell.lock()
    }

    /// Whether both handles refer to the same cell.
    pub fn ptr_eq(&self, other: &HookRef<T>) -> bool {
        Arc::ptr_eq(&self.cell, &other.cell)
    }
}

impl<T> Clone for HookRef<T> {
    fn clone(&self) -> Self {
        Self {
            cell: Arc::clone(&self.cell),
        }
    }
}

impl<T: Debug> Debug for HookRef<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("HookRef").field(&*self.cell.lock()).finish()
    }
}

/// Get the instance's persistent cell, initialised with `init()` on the
/// first render.
pub fn use_ref<T, I>(init: I) -> Result<HookRef<T>, HookError>
where
    T: Send + 'static,
    I: FnOnce() -> T,
{
    let instance = RenderContext::require()?;
    let (cell, _) = instance.slot(|| HookRef {
        cell: Arc::new(Mutex::new(init())),
    })?;
    Ok(cell)
}

// ----------------------------------------------------------------------------
// use_reducer
// ----------------------------------------------------------------------------

/// Sends actions to a [`use_reducer`] slot.
pub struct Dispatch<A> {
    queue: Arc<Mutex<Vec<A>>>,
    owner: WeakInstance,
}

impl<A> Dispatch<A> {
    /// Queue `action` and request a re-render of the owning instance.
    ///
    /// The action is applied during that re-render.
    pub fn dispatch(&self, action: A) {
        self.queue.lock().push(action);
        self.owner.mark_stale();
    }

    /// Number of actions waiting for the next render.
    pub fn pending(&self) -> usize {
        self.queue.lock().len()
    }
}

impl<A> Clone for Dispatch<A> {
    fn clone(&self) -> Self {
        Self {
            queue: Arc::clone(&self.queue),
            owner: self.owner.clone(),
        }
    }
}

impl<A> Debug for Dispatch<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatch")
            .field("pending", &self.pending())
            .finish()
    }
}

struct ReducerSlot<S, A> {
    state: Arc<Mutex<S>>,
    queue: Arc<Mutex<Vec<A>>>,
}

impl<S, A> Clone for ReducerSlot<S, A> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            queue: Arc::clone(&self.queue),
        }
    }
}

/// Reducer-managed state.
///
/// `init` builds the state on the first render. On every render, actions
/// dispatched since the previous one are folded into the state with
/// `reducer`, in dispatch order.
pub fn use_reducer<S, A, R, I>(reducer: R, init: I) -> Result<(S, Dispatch<A>), HookError>
where
    S: Clone + Send + 'static,
    A: Send + 'static,
    R: Fn(&S, A) -> S,
    I: FnOnce() -> S,
{
    let instance = RenderContext::require()?;
    let (slot, _) = instance.slot(|| ReducerSlot {
        state: Arc::new(Mutex::new(init())),
        queue: Arc::new(Mutex::new(Vec::<A>::new())),
    })?;

    let pending = std::mem::take(&mut *slot.queue.lock());
    let mut state = slot.state.lock().clone();
    if !pending.is_empty() {
        for action in pending {
            state = reducer(&state, action);
        }
        *slot.state.lock() = state.clone();
    }

    let dispatch = Dispatch {
        queue: slot.queue,
        owner: instance.downgrade(),
    };
    Ok((state, dispatch))
}

// ----------------------------------------------------------------------------
// use_mount_effect
// ----------------------------------------------------------------------------

#[derive(Clone)]
struct MountSlot(Arc<AtomicBool>);

/// Run `effect` once, after the instance's first committed render.
///
/// A returned cleanup runs when the instance unmounts. Server renders never
/// run the effect.
pub fn use_mount_effect<F>(effect: F) -> Result<(), HookError>
where
    F: FnOnce() -> Option<Cleanup> + Send + 'static,
{
    let instance = RenderContext::require()?;
    let (MountSlot(ran), _) = instance.slot(|| MountSlot(Arc::new(AtomicBool::new(false))))?;
    if ran.load(Ordering::SeqCst) {
        return Ok(());
    }

    let owner = instance.downgrade();
    instance.push_effect(Box::new(move || {
        if ran.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Some(cleanup) = effect() {
            match owner.upgrade() {
                Some(instance) => instance.on_unmount(cleanup),
                None => cleanup(),
            }
        }
    }));
    Ok(())
}

// ----------------------------------------------------------------------------
// use_sync_external_store
// ----------------------------------------------------------------------------

/// A value living outside any component that components can subscribe to.
pub trait ExternalSource: Clone + Send + Sync + 'static {
    /// The value handed to the component.
    type Snapshot: Clone + PartialEq + Send + Sync + 'static;

    /// Identity of the source; a different ID means a different source.
    fn source_id(&self) -> u64;

    /// Register `listener` to be called on every change.
    fn subscribe(&self, listener: &Listener) -> Unsubscribe;

    /// Read the current value.
    fn snapshot(&self) -> Self::Snapshot;

    /// Read the value used for server renders.
    fn server_snapshot(&self) -> Self::Snapshot;
}

struct Subscription<T> {
    source_id: Option<u64>,
    handle: Option<Unsubscribe>,
    rendered: Option<T>,
}

impl<T> Subscription<T> {
    fn is_outdated(&self, latest: &T) -> bool
    where
        T: PartialEq,
    {
        self.rendered.as_ref() != Some(latest)
    }
}

struct ExternalSlot<T> {
    subscription: Arc<Mutex<Subscription<T>>>,
}

impl<T> Clone for ExternalSlot<T> {
    fn clone(&self) -> Self {
        Self {
            subscription: Arc::clone(&self.subscription),
        }
    }
}

/// Read `source` and re-render whenever its snapshot changes.
///
/// The subscription is made when the render commits, kept across renders
/// while the component reads the same source, moved when it switches to
/// another source, and removed on unmount.
pub fn use_sync_external_store<S>(source: &S) -> Result<S::Snapshot, HookError>
where
    S: ExternalSource,
{
    let instance = RenderContext::require()?;
    let (slot, created) = instance.slot(|| ExternalSlot::<S::Snapshot> {
        subscription: Arc::new(Mutex::new(Subscription {
            source_id: None,
            handle: None,
            rendered: None,
        })),
    })?;

    if instance.mode() == RenderMode::Server {
        return Ok(source.server_snapshot());
    }

    let snapshot = source.snapshot();
    let subscribed_to = {
        let mut subscription = slot.subscription.lock();
        subscription.rendered = Some(snapshot.clone());
        subscription.source_id
    };

    if created {
        let subscription = Arc::clone(&slot.subscription);
        instance.on_unmount(Box::new(move || {
            if let Some(handle) = subscription.lock().handle.take() {
                handle.unsubscribe();
            }
        }));
    }

    {
        let source = source.clone();
        let expected = snapshot.clone();
        instance.push_tear_check(Box::new(move || source.snapshot() != expected));
    }

    if subscribed_to != Some(source.source_id()) {
        let source = source.clone();
        let subscription = Arc::clone(&slot.subscription);
        let owner = instance.downgrade();
        instance.push_effect(Box::new(move || {
            subscribe_source(&source, &subscription, &owner);
        }));
    }

    Ok(snapshot)
}

/// Replace the slot's subscription with one on `source`.
fn subscribe_source<S>(
    source: &S,
    subscription: &Arc<Mutex<Subscription<S::Snapshot>>>,
    owner: &WeakInstance,
) where
    S: ExternalSource,
{
    let previous = subscription.lock().handle.take();
    if let Some(handle) = previous {
        handle.unsubscribe();
    }

    let listener = {
        let source = source.clone();
        let subscription = Arc::clone(subscription);
        let owner = owner.clone();
        Listener::new(move || {
            if subscription.lock().is_outdated(&source.snapshot()) {
                owner.mark_stale();
            }
        })
    };
    let handle = source.subscribe(&listener);

    let outdated = {
        let mut state = subscription.lock();
        state.source_id = Some(source.source_id());
        state.handle = Some(handle);
        state.is_outdated(&source.snapshot())
    };
    // The source may have changed between render and subscription.
    if outdated {
        owner.mark_stale();
    }
}
