//! Hookstore Core
//!
//! This crate provides shared observable stores and the hooks that connect
//! them to component renders. It implements:
//!
//! - Stores: value cells with get/set/update, synchronous change
//!   notification, and attachable methods
//! - Hooks that subscribe a component to a store, build a value once per
//!   component instance, or give a component its own private store
//! - A small render host (instances, hook slots, effects, tear-free reads)
//!   that the hooks run on
//!
//! The crate can also be built as a Python extension module via PyO3
//! (feature `python`).
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - `store`: the store primitive and its listener registry
//! - `render`: component instances, render context, host primitives
//! - `hooks`: store hooks built on the host primitives
//! - `error`: hook and render errors
//!
//! # Example
//!
//! ```rust
//! use hookstore_core::hooks::use_store;
//! use hookstore_core::render::Component;
//! use hookstore_core::store::create;
//!
//! // A store shared by any number of components
//! let count = create(0);
//!
//! // A component that shows it
//! let source = count.clone();
//! let mut label = Component::new(move || {
//!     let value = use_store(&source)?;
//!     Ok(format!("Count: {value}"))
//! });
//! assert_eq!(label.render().unwrap(), "Count: 0");
//!
//! // Writing from outside any component marks the label for re-render
//! count.update(|c| c + 1);
//! assert_eq!(label.flush().unwrap().as_deref(), Some("Count: 1"));
//! ```

pub mod error;
pub mod hooks;
pub mod render;
pub mod store;

#[cfg(feature = "python")]
mod python;

pub use error::HookError;
pub use hooks::{use_external_subscription, use_lazy_once, use_local_store, use_store};
pub use store::{create, create_with, Action, Extended, Listener, Store, Unsubscribe};

#[cfg(feature = "python")]
use pyo3::prelude::*;

/// Python module definition.
///
/// This function is called by Python when importing the module.
/// It registers all Python-exposed types.
#[cfg(feature = "python")]
#[pymodule]
fn _core(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<python::PyStore>()?;
    m.add_class::<python::PyUnsubscribe>()?;

    // Add version info
    m.add("__version__", env!("CARGO_PKG_VERSION"))?;

    Ok(())
}
