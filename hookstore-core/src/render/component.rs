//! Component driver.
//!
//! A [`Component`] owns a render body and the [`Instance`] its hooks live
//! in. It is the piece of the host that decides when the body runs:
//!
//! 1. `render()` runs a pass inside a [`RenderContext`].
//! 2. If a value read through `use_sync_external_store` changed during the
//!    pass, the pass is discarded and run again.
//! 3. Otherwise the pass commits: the hook layout is fixed and queued
//!    effects (such as store subscriptions) run.
//! 4. Notifications mark the instance stale; `flush()` re-renders stale
//!    components, so several writes between flushes cost one render.

use std::fmt::{self, Debug};

use super::context::RenderContext;
use super::instance::{Instance, InstanceId, RenderMode};
use crate::error::HookError;

/// Rendering limits and mode for a [`Component`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComponentOptions {
    /// Client or server rendering.
    pub mode: RenderMode,

    /// Upper bound on passes per `render()` before giving up with
    /// [`HookError::TooManyRenders`].
    pub max_render_passes: usize,
}

impl Default for ComponentOptions {
    fn default() -> Self {
        Self {
            mode: RenderMode::Client,
            max_render_passes: 50,
        }
    }
}

impl ComponentOptions {
    /// Options for a server render.
    pub fn server() -> Self {
        Self {
            mode: RenderMode::Server,
            ..Self::default()
        }
    }

    pub fn with_max_render_passes(mut self, passes: usize) -> Self {
        self.max_render_passes = passes;
        self
    }
}

type Body<R> = Box<dyn FnMut() -> Result<R, HookError>>;

/// A mounted component: a render body plus its instance state.
///
/// # Example
///
/// ```rust
/// use hookstore_core::hooks::use_store;
/// use hookstore_core::render::Component;
/// use hookstore_core::store::create;
///
/// let count = create(0);
/// let source = count.clone();
/// let mut view = Component::new(move || use_store(&source).map(|c| format!("count = {c}")));
///
/// assert_eq!(view.render().unwrap(), "count = 0");
///
/// count.set(3);
/// assert_eq!(view.flush().unwrap(), Some("count = 3".to_string()));
/// ```
pub struct Component<R> {
    instance: Instance,
    body: Body<R>,
    options: ComponentOptions,
}

impl<R> Component<R> {
    /// Create a client component around `body`. Nothing renders until
    /// [`render`](Self::render) or [`flush`](Self::flush) is called.
    pub fn new<F>(body: F) -> Self
    where
        F: FnMut() -> Result<R, HookError> + 'static,
    {
        Self::with_options(ComponentOptions::default(), body)
    }

    pub fn with_options<F>(options: ComponentOptions, body: F) -> Self
    where
        F: FnMut() -> Result<R, HookError> + 'static,
    {
        Self {
            instance: Instance::new(options.mode),
            body: Box::new(body),
            options,
        }
    }

    pub fn id(&self) -> InstanceId {
        self.instance.id()
    }

    pub fn instance(&self) -> &Instance {
        &self.instance
    }

    /// Whether a change is waiting to be rendered.
    pub fn is_stale(&self) -> bool {
        self.instance.is_stale()
    }

    /// Number of committed renders.
    pub fn render_count(&self) -> usize {
        self.instance.commit_count()
    }

    /// Render the body and commit the result.
    pub fn render(&mut self) -> Result<R, HookError> {
        let limit = self.options.max_render_passes.max(1);

        for pass in 1..=limit {
            self.instance.begin_pass()?;
            let output = {
                let _ctx = RenderContext::enter(self.instance.clone());
                (self.body)()
            }?;
            self.instance.end_pass()?;

            if self.instance.is_torn() {
                tracing::trace!(instance = %self.id(), pass, "store changed during render, rendering again");
                continue;
            }

            self.instance.commit();
            tracing::debug!(
                instance = %self.id(),
                passes = pass,
                commits = self.render_count(),
                "component rendered"
            );
            return Ok(output);
        }

        tracing::warn!(instance = %self.id(), limit, "render did not settle");
        Err(HookError::TooManyRenders(limit))
    }

    /// Render if the component has never rendered or has been marked stale.
    pub fn flush(&mut self) -> Result<Option<R>, HookError> {
        if self.instance.is_mounted() && !self.instance.is_stale() {
            return Ok(None);
        }
        self.render().map(Some)
    }

    /// Run the instance's cleanups. Later renders fail with
    /// [`HookError::Unmounted`].
    pub fn unmount(&mut self) {
        if self.instance.unmount() {
            tracing::debug!(instance = %self.id(), "component unmounted");
        }
    }
}

impl<R> Drop for Component<R> {
    fn drop(&mut self) {
        self.unmount();
    }
}

impl<R> Debug for Component<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Component")
            .field("instance", &self.instance)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}
