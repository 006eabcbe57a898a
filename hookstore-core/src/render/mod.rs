//! Render Host
//!
//! This module is the minimal component host the store hooks run on. It
//! provides just what they need from a UI framework:
//!
//! - A way to persist values per component instance ([`use_ref`]).
//! - Reducer-driven local state whose dispatch forces a re-render
//!   ([`use_reducer`]).
//! - Effects tied to mount and unmount ([`use_mount_effect`]).
//! - Tear-free subscription to values outside the component
//!   ([`use_sync_external_store`] over an [`ExternalSource`]).
//!
//! # Concepts
//!
//! ## Instances
//!
//! Each mounted component has an [`Instance`] holding its hook slots. Hooks
//! are matched to slots by call order; calling a different set of hooks on a
//! later render is reported as a [`HookError`](crate::error::HookError).
//!
//! ## Rendering
//!
//! A [`Component`] runs its body inside a [`RenderContext`], so hooks find
//! their instance without it being passed around. A render that read an
//! external value which changed before the render finished is discarded and
//! repeated, then committed. Change notifications never render directly;
//! they mark the instance stale and [`Component::flush`] picks it up.

mod component;
mod context;
mod instance;
mod primitives;

pub use component::{Component, ComponentOptions};
pub use context::RenderContext;
pub use instance::{Cleanup, Instance, InstanceId, RenderMode};
pub use primitives::{
    use_mount_effect, use_reducer, use_ref, use_sync_external_store, Dispatch, ExternalSource,
    HookRef,
};
