//! Component instances.
//!
//! An [`Instance`] is the host-side record of one mounted component: the
//! ordered list of hook slots that persist across its renders, the effects
//! queued by the render in progress, the cleanups to run on unmount, and a
//! "stale" flag that change notifications raise to request a re-render.
//!
//! Hooks are matched to slots by call order, so a component must call the
//! same hooks in the same order on every render.

use std::any::{type_name, Any};
use std::fmt::{self, Debug, Display};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use crate::error::HookError;

/// Unique identifier for a component instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InstanceId(u64);

impl InstanceId {
    /// Generate a new unique instance ID.
    pub(crate) fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Where a component is being rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RenderMode {
    /// Interactive rendering: effects run, stores are subscribed to.
    #[default]
    Client,

    /// One-shot rendering: server snapshots are read, effects never run.
    Server,
}

/// Work deferred to unmount.
pub type Cleanup = Box<dyn FnOnce() + Send>;

type Effect = Box<dyn FnOnce() + Send>;

/// Returns true when a value read during the render has since changed.
type TearCheck = Box<dyn Fn() -> bool + Send>;

#[derive(Default)]
struct HookState {
    slots: Vec<Box<dyn Any + Send>>,
    cursor: usize,
    layout_fixed: bool,
    effects: Vec<Effect>,
    tear_checks: Vec<TearCheck>,
    cleanups: Vec<Cleanup>,
}

struct InstanceInner {
    id: InstanceId,
    mode: RenderMode,
    hooks: Mutex<HookState>,
    stale: AtomicBool,
    mounted: AtomicBool,
    unmounted: AtomicBool,
    commits: AtomicUsize,
}

/// A component instance. Clones share the same instance.
#[derive(Clone)]
pub struct Instance {
    inner: Arc<InstanceInner>,
}

impl Instance {
    pub(crate) fn new(mode: RenderMode) -> Self {
        Self {
            inner: Arc::new(InstanceInner {
                id: InstanceId::new(),
                mode,
                hooks: Mutex::new(HookState::default()),
                stale: AtomicBool::new(false),
                mounted: AtomicBool::new(false),
                unmounted: AtomicBool::new(false),
                commits: AtomicUsize::new(0),
            }),
        }
    }

    pub fn id(&self) -> InstanceId {
        self.inner.id
    }

    pub fn mode(&self) -> RenderMode {
        self.inner.mode
    }

    /// Whether a change was signalled since the last render started.
    pub fn is_stale(&self) -> bool {
        self.inner.stale.load(Ordering::SeqCst)
    }

    /// Whether at least one render has been committed.
    pub fn is_mounted(&self) -> bool {
        self.inner.mounted.load(Ordering::SeqCst)
    }

    pub fn is_unmounted(&self) -> bool {
        self.inner.unmounted.load(Ordering::SeqCst)
    }

    /// Number of committed renders.
    pub fn commit_count(&self) -> usize {
        self.inner.commits.load(Ordering::SeqCst)
    }

    /// Number of hook slots in use.
    pub fn slot_count(&self) -> usize {
        self.inner.hooks.lock().slots.len()
    }

    /// Request a re-render.
    pub fn mark_stale(&self) {
        if !self.is_unmounted() && !self.inner.stale.swap(true, Ordering::SeqCst) {
            tracing::trace!(instance = %self.id(), "instance marked stale");
        }
    }

    pub(crate) fn downgrade(&self) -> WeakInstance {
        WeakInstance(Arc::downgrade(&self.inner))
    }

    /// Claim the next hook slot, creating it with `init` on first use.
    ///
    /// Returns a clone of the slot value and whether it was just created.
    /// `init` runs without the instance lock held but must not call hooks.
    pub(crate) fn slot<S, I>(&self, init: I) -> Result<(S, bool), HookError>
    where
        S: Any + Clone + Send,
        I: FnOnce() -> S,
    {
        let index = {
            let mut hooks = self.inner.hooks.lock();
            let index = hooks.cursor;
            hooks.cursor += 1;

            if let Some(slot) = hooks.slots.get(index) {
                let slot = slot.downcast_ref::<S>().ok_or(HookError::SlotMismatch {
                    index,
                    expected: type_name::<S>(),
                })?;
                return Ok((slot.clone(), false));
            }
            if hooks.layout_fixed {
                return Err(HookError::HookCountChanged {
                    previous: hooks.slots.len(),
                    rendered: index + 1,
                });
            }
            index
        };

        let value = init();

        let mut hooks = self.inner.hooks.lock();
        if hooks.slots.len() != index || hooks.cursor != index + 1 {
            return Err(HookError::NestedHook { index });
        }
        hooks.slots.push(Box::new(value.clone()));
        Ok((value, true))
    }

    /// Queue `effect` to run when the current render commits.
    pub(crate) fn push_effect(&self, effect: Effect) {
        self.inner.hooks.lock().effects.push(effect);
    }

    /// Register a check that the current render read up-to-date values.
    pub(crate) fn push_tear_check(&self, check: TearCheck) {
        self.inner.hooks.lock().tear_checks.push(check);
    }

    /// Run `cleanup` when the instance unmounts.
    pub(crate) fn on_unmount(&self, cleanup: Cleanup) {
        if self.is_unmounted() {
            cleanup();
            return;
        }
        self.inner.hooks.lock().cleanups.push(cleanup);
    }

    /// Reset per-pass state before running the render body.
    pub(crate) fn begin_pass(&self) -> Result<(), HookError> {
        if self.is_unmounted() {
            return Err(HookError::Unmounted(self.id()));
        }
        let mut hooks = self.inner.hooks.lock();
        hooks.cursor = 0;
        hooks.effects.clear();
        hooks.tear_checks.clear();
        self.inner.stale.store(false, Ordering::SeqCst);
        Ok(())
    }

    /// Verify that the pass called exactly the hooks of previous passes.
    pub(crate) fn end_pass(&self) -> Result<(), HookError> {
        let hooks = self.inner.hooks.lock();
        if hooks.cursor != hooks.slots.len() {
            return Err(HookError::HookCountChanged {
                previous: hooks.slots.len(),
                rendered: hooks.cursor,
            });
        }
        Ok(())
    }

    /// Whether any value read during the pass has changed since.
    pub(crate) fn is_torn(&self) -> bool {
        let checks = std::mem::take(&mut self.inner.hooks.lock().tear_checks);
        checks.iter().any(|check| check())
    }

    /// Fix the hook layout and run the queued effects.
    pub(crate) fn commit(&self) {
        let effects = {
            let mut hooks = self.inner.hooks.lock();
            hooks.layout_fixed = true;
            std::mem::take(&mut hooks.effects)
        };
        self.inner.mounted.store(true, Ordering::SeqCst);
        self.inner.commits.fetch_add(1, Ordering::SeqCst);

        if self.mode() == RenderMode::Server {
            return;
        }
        for effect in effects {
            effect();
        }
    }

    /// Run cleanups in reverse registration order. Returns false if the
    /// instance was already unmounted.
    pub(crate) fn unmount(&self) -> bool {
        if self.inner.unmounted.swap(true, Ordering::SeqCst) {
            return false;
        }
        let cleanups = {
            let mut hooks = self.inner.hooks.lock();
            hooks.effects.clear();
            hooks.tear_checks.clear();
            std::mem::take(&mut hooks.cleanups)
        };
        for cleanup in cleanups.into_iter().rev() {
            cleanup();
        }
        self.inner.stale.store(false, Ordering::SeqCst);
        true
    }
}

impl Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instance")
            .field("id", &self.id())
            .field("mode", &self.mode())
            .field("slots", &self.slot_count())
            .field("stale", &self.is_stale())
            .field("commits", &self.commit_count())
            .finish()
    }
}

/// Non-owning handle to an instance, held by store listeners.
#[derive(Clone)]
pub(crate) struct WeakInstance(Weak<InstanceInner>);

impl WeakInstance {
    pub(crate) fn upgrade(&self) -> Option<Instance> {
        self.0.upgrade().map(|inner| Instance { inner })
    }

    pub(crate) fn mark_stale(&self) {
        if let Some(instance) = self.upgrade() {
            instance.mark_stale();
        }
    }
}
