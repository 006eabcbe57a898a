//! Error types for hooks and the render host.

use thiserror::Error;

use crate::render::InstanceId;

/// Errors raised while rendering a component.
///
/// Store operations themselves never fail; these come from calling hooks in
/// the wrong place or in an order that differs between renders.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HookError {
    #[error("hook called outside of a component render")]
    OutsideRender,

    #[error("hook slot {index} holds a different hook (expected {expected})")]
    SlotMismatch { index: usize, expected: &'static str },

    #[error("rendered {rendered} hooks, previous render used {previous}")]
    HookCountChanged { previous: usize, rendered: usize },

    #[error("hook initializer for slot {index} called another hook")]
    NestedHook { index: usize },

    #[error("component state kept changing during render after {0} passes")]
    TooManyRenders(usize),

    #[error("component instance {0} has been unmounted")]
    Unmounted(InstanceId),
}
