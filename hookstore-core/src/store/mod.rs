//! Stores
//!
//! A store is a shared, observable value cell. Any holder of a handle can
//! read it, write it, or subscribe to its changes; every write notifies all
//! subscribers synchronously before it returns.
//!
//! # Reads and Writes
//!
//! - [`Store::get`] reads the committed value.
//! - [`Store::set`] writes a literal value.
//! - [`Store::update`] and [`Store::try_update`] compute the next value from
//!   the current one. A failing updater commits nothing.
//! - [`Store::call`] takes an [`Action`] for callers that prefer one entry
//!   point.
//!
//! # Subscriptions
//!
//! [`Store::subscribe`] registers a [`Listener`] and hands back an
//! [`Unsubscribe`] handle. A listener has identity, so subscribing the same
//! one twice yields a single registration.
//!
//! # Extensions
//!
//! [`Store::extend`] and [`create_with`] attach domain methods to a store
//! without changing which store it is. See [`Extended`].

mod action;
mod extend;
mod listener;
#[allow(clippy::module_inception)]
mod store;

pub use action::{Action, Updater};
pub use extend::Extended;
pub use listener::{Listener, Unsubscribe};
pub use store::{create, create_with, Store};
