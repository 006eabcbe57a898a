//! Store Hooks
//!
//! Hooks that connect stores to component renders:
//!
//! - [`use_external_subscription`] (also [`use_store`] and
//!   [`Store::use_value`](crate::store::Store::use_value)): read a shared
//!   store and re-render when it changes, with tear-free reads.
//! - [`use_lazy_once`]: build a value, typically a store, once per instance.
//! - [`use_local_store`]: a store private to one instance, with attached
//!   methods, re-rendering through reducer dispatch.
//!
//! All hooks must be called from inside a component render, in the same
//! order on every render.

mod external;
mod lazy;
mod local;

pub use external::{use_external_subscription, use_store};
pub use lazy::use_lazy_once;
pub use local::use_local_store;
