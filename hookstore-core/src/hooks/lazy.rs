//! Values built once per component instance.

use crate::error::HookError;
use crate::render::use_ref;

/// Build a value on the instance's first render and return that same value
/// on every later render.
///
/// `generator` runs at most once per instance, even when it returns a value
/// that looks empty (`None`, `()`, an empty collection): whether the value
/// has been built is tracked separately from the value itself.
///
/// Nothing is subscribed. To react to a store built here, pass it to
/// [`use_store`](super::use_store).
pub fn use_lazy_once<T, G>(generator: G) -> Result<T, HookError>
where
    T: Clone + Send + 'static,
    G: FnOnce() -> T,
{
    let holder = use_ref(|| None::<T>)?;
    if let Some(value) = holder.lock().as_ref() {
        return Ok(value.clone());
    }

    let value = generator();
    holder.set(Some(value.clone()));
    Ok(value)
}
