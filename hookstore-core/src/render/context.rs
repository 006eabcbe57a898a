//! Render Context
//!
//! The render context tracks which component instance is currently
//! rendering. Hooks look the instance up here instead of taking it as an
//! argument.
//!
//! # Implementation
//!
//! We use a thread-local stack of instances. Rendering a component pushes
//! its instance; the guard returned by [`RenderContext::enter`] pops it
//! again, also when the render body panics. Nested renders (a component
//! rendering another component inline) see their own instance on top.

use std::cell::RefCell;

use super::instance::{Instance, InstanceId};
use crate::error::HookError;

thread_local! {
    static RENDER_STACK: RefCell<Vec<Instance>> = const { RefCell::new(Vec::new()) };
}

/// Guard that pops the rendering instance when dropped.
pub struct RenderContext {
    instance_id: InstanceId,
}

impl RenderContext {
    /// Make `instance` the current rendering instance until the guard drops.
    pub fn enter(instance: Instance) -> Self {
        let instance_id = instance.id();
        RENDER_STACK.with(|stack| stack.borrow_mut().push(instance));
        Self { instance_id }
    }

    /// Check whether a component is rendering on this thread.
    pub fn is_active() -> bool {
        RENDER_STACK.with(|stack| !stack.borrow().is_empty())
    }

    /// Get the instance that is rendering, if any.
    pub fn current() -> Option<Instance> {
        RENDER_STACK.with(|stack| stack.borrow().last().cloned())
    }

    /// Get the rendering instance or fail with [`HookError::OutsideRender`].
    pub(crate) fn require() -> Result<Instance, HookError> {
        Self::current().ok_or(HookError::OutsideRender)
    }
}

impl Drop for RenderContext {
    fn drop(&mut self) {
        RENDER_STACK.with(|stack| {
            let popped = stack.borrow_mut().pop();

            if let Some(instance) = popped {
                debug_assert_eq!(
                    instance.id(),
                    self.instance_id,
                    "RenderContext mismatch: expected {}, got {}",
                    self.instance_id,
                    instance.id()
                );
            }
        });
    }
}
