//! Python Bindings
//!
//! Exposes stores to Python as a single callable object:
//!
//! ```python
//! count = Store(0)
//! count()               # -> 0
//! count(5)              # set
//! count(lambda c: c + 1)
//! off = count.subscribe(lambda: print("changed"))
//! off()
//! ```
//!
//! Called with no arguments the store returns its value; called with one
//! argument it writes. Dispatch is on the number of arguments, so
//! `count(None)`, `count(0)` and `count(False)` are all writes. A callable
//! argument is applied as an updater; an exception raised by it propagates
//! and leaves the store unchanged.
//!
//! Writes release the GIL while they wait for the store and re-take it only
//! to run Python updaters and listeners, so several Python threads can write
//! to one store. An exception raised by a listener stops the notification
//! pass and is re-raised, with its original type, from the write that
//! triggered it. The written value stays committed.

use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use pyo3::exceptions::PyTypeError;
use pyo3::prelude::*;
use pyo3::types::PyTuple;

use crate::store::{Listener, Store, Unsubscribe};

type PyValue = Arc<PyObject>;

/// Listeners keyed by the address of their Python callable.
type ListenerMap = Mutex<HashMap<usize, Listener>>;

/// Unwind payload carrying an exception raised by a listener back to the
/// write that ran it.
struct ListenerError(PyErr);

/// Python-exposed Store type.
#[pyclass(name = "Store", frozen)]
pub struct PyStore {
    store: Store<PyValue>,

    /// One listener per subscribed Python callable, so subscribing the same
    /// callable twice yields one registration.
    listeners: Arc<ListenerMap>,
}

impl PyStore {
    /// Run a write with the GIL released.
    fn write<F>(&self, py: Python<'_>, f: F) -> PyResult<()>
    where
        F: FnOnce(&Store<PyValue>) -> PyResult<()> + Send,
    {
        let store = &self.store;
        let outcome = py.allow_threads(|| panic::catch_unwind(AssertUnwindSafe(|| f(store))));
        match outcome {
            Ok(result) => result,
            Err(payload) => match payload.downcast::<ListenerError>() {
                Ok(raised) => Err(raised.0),
                Err(payload) => panic::resume_unwind(payload),
            },
        }
    }
}

#[pymethods]
impl PyStore {
    #[new]
    fn new(initial: PyObject) -> Self {
        Self {
            store: Store::new(Arc::new(initial)),
            listeners: Arc::default(),
        }
    }

    #[pyo3(signature = (*args))]
    fn __call__(&self, py: Python<'_>, args: &Bound<'_, PyTuple>) -> PyResult<PyObject> {
        match args.len() {
            0 => {
                let value = py.allow_threads(|| self.store.get());
                Ok(value.clone_ref(py))
            }
            1 => {
                let arg = args.get_item(0)?;
                if arg.is_callable() {
                    let updater = arg.unbind();
                    self.write(py, move |store| {
                        store.try_update(|current| {
                            Python::with_gil(|py| {
                                updater
                                    .call1(py, (current.clone_ref(py),))
                                    .map(Arc::new)
                            })
                        })
                    })?;
                } else {
                    let value = Arc::new(arg.unbind());
                    self.write(py, move |store| {
                        store.set(value);
                        Ok(())
                    })?;
                }
                Ok(py.None())
            }
            given => Err(PyTypeError::new_err(format!(
                "Store() takes at most 1 argument ({given} given)"
            ))),
        }
    }

    /// Call `callback` after every write. Returns a callable that cancels
    /// the subscription.
    fn subscribe(&self, callback: PyObject) -> PyUnsubscribe {
        let key = callback.as_ptr() as usize;
        let listener = self
            .listeners
            .lock()
            .entry(key)
            .or_insert_with(|| {
                Listener::new(move || {
                    Python::with_gil(|py| {
                        if let Err(err) = callback.call0(py) {
                            panic::resume_unwind(Box::new(ListenerError(err)));
                        }
                    })
                })
            })
            .clone();

        PyUnsubscribe {
            handle: self.store.subscribe(&listener),
            key,
            listener,
            listeners: Arc::downgrade(&self.listeners),
        }
    }

    #[getter]
    fn id(&self) -> u64 {
        self.store.id()
    }

    fn subscriber_count(&self) -> usize {
        self.store.subscriber_count()
    }

    fn __repr__(&self, py: Python<'_>) -> String {
        let value = self.store.get();
        let repr = value
            .bind(py)
            .repr()
            .map(|r| r.to_string())
            .unwrap_or_else(|_| "?".to_string());
        format!(
            "Store(id={}, value={}, subscribers={})",
            self.store.id(),
            repr,
            self.store.subscriber_count()
        )
    }
}

/// Callable returned by `Store.subscribe`.
#[pyclass(name = "Unsubscribe", frozen)]
pub struct PyUnsubscribe {
    handle: Unsubscribe,
    key: usize,
    listener: Listener,
    listeners: Weak<ListenerMap>,
}

#[pymethods]
impl PyUnsubscribe {
    fn __call__(&self) {
        self.handle.unsubscribe();

        // Release the callable unless it has been subscribed again since.
        if let Some(listeners) = self.listeners.upgrade() {
            let mut listeners = listeners.lock();
            if listeners
                .get(&self.key)
                .is_some_and(|current| current.same_as(&self.listener))
            {
                listeners.remove(&self.key);
            }
        }
    }
}
