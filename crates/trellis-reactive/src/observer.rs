//! Observers and unsubscribe tokens

use std::cell::Cell;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;

use trellis_core::ObserverError;

/// Future returned by an observer invocation
pub type ObserverFuture = Pin<Box<dyn Future<Output = Result<(), ObserverError>>>>;

/// A change handler, called with `(value, previous)`.
///
/// `previous` is `None` only for the initial delivery made by `observe`.
/// Cloning an observer keeps its identity: a cell registers a given observer
/// at most once.
///
/// Never set the cell being observed from inside its observer; the mutation
/// waits on the pass that is running it and never completes.
pub struct Observer<T> {
    callback: Rc<dyn Fn(T, Option<T>) -> ObserverFuture>,
}

impl<T: 'static> Observer<T> {
    /// Create an observer from an async handler
    pub fn new<F, Fut>(f: F) -> Self
    where
        F: Fn(T, Option<T>) -> Fut + 'static,
        Fut: Future<Output = Result<(), ObserverError>> + 'static,
    {
        Observer {
            callback: Rc::new(move |value: T, previous: Option<T>| -> ObserverFuture {
                Box::pin(f(value, previous))
            }),
        }
    }

    /// Create an observer from a handler that completes immediately
    pub fn sync<F>(f: F) -> Self
    where
        F: Fn(T, Option<T>) -> Result<(), ObserverError> + 'static,
    {
        Observer::new(move |value, previous| std::future::ready(f(value, previous)))
    }
}

impl<T> Observer<T> {
    /// Check whether both observers are the same registration identity
    #[inline]
    pub fn ptr_eq(&self, other: &Observer<T>) -> bool {
        Rc::as_ptr(&self.callback) as *const u8 == Rc::as_ptr(&other.callback) as *const u8
    }

    pub(crate) fn call(&self, value: T, previous: Option<T>) -> ObserverFuture {
        (self.callback)(value, previous)
    }
}

impl<T> Clone for Observer<T> {
    fn clone(&self) -> Self {
        Observer {
            callback: Rc::clone(&self.callback),
        }
    }
}

impl<T> fmt::Debug for Observer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Observer({:p})", Rc::as_ptr(&self.callback) as *const u8)
    }
}

/// Removes one observer registration.
///
/// The first call removes the observer; later calls do nothing.
#[must_use = "dropping an Unobserve keeps the observer registered"]
pub struct Unobserve {
    remove: Cell<Option<Box<dyn FnOnce()>>>,
}

impl Unobserve {
    pub fn new(remove: impl FnOnce() + 'static) -> Self {
        Unobserve {
            remove: Cell::new(Some(Box::new(remove))),
        }
    }

    pub fn unobserve(&self) {
        if let Some(remove) = self.remove.take() {
            remove();
        }
    }

    /// Whether `unobserve` has already run
    pub fn is_spent(&self) -> bool {
        // Cell<Option<Box<_>>> cannot be peeked without taking it
        let remove = self.remove.take();
        let spent = remove.is_none();
        self.remove.set(remove);
        spent
    }
}

impl fmt::Debug for Unobserve {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Unobserve")
            .field("spent", &self.is_spent())
            .finish()
    }
}
