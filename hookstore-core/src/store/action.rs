//! Single-entry-point access to a store.
//!
//! [`Store::call`](super::Store::call) takes an [`Action`] so that callers
//! wanting one operation for both reads and writes can keep that shape. The
//! variant, not the payload, decides what happens: `Set(None)`, `Set(0)` and
//! `Set(false)` are all writes.

use std::fmt::Debug;

/// Boxed updater for [`Action::Update`].
pub type Updater<T> = Box<dyn FnOnce(&T) -> T>;

/// A read or a write against a store.
pub enum Action<T> {
    /// Read the current value.
    Get,

    /// Replace the value with a literal.
    Set(T),

    /// Compute the next value from the current one.
    Update(Updater<T>),
}

impl<T> Action<T> {
    /// Build an [`Action::Update`] from a closure.
    pub fn update<F>(f: F) -> Self
    where
        F: FnOnce(&T) -> T + 'static,
    {
        Action::Update(Box::new(f))
    }

    /// Whether this action reads rather than writes.
    pub fn is_get(&self) -> bool {
        matches!(self, Action::Get)
    }
}

impl<T> From<T> for Action<T> {
    fn from(value: T) -> Self {
        Action::Set(value)
    }
}

impl<T: Debug> Debug for Action<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Action::Get => f.write_str("Get"),
            Action::Set(value) => f.debug_tuple("Set").field(value).finish(),
            Action::Update(_) => f.write_str("Update(..)"),
        }
    }
}
