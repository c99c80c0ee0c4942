//! Reactive data cell
//!
//! A [`ReactiveData`] holds one value and notifies its observers whenever the
//! value changes. Every mutation and every initial delivery runs inside the
//! cell's exclusive section, so observers see a totally ordered history with
//! no missed or duplicated transitions.
//!
//! # Delivery rules
//!
//! 1. `set` with a value equal to the current one notifies nobody.
//! 2. Observers run one at a time, in registration order.
//! 3. A failing observer is logged and skipped; the pass continues.
//! 4. `observe` registers immediately. When no pass is running it delivers the
//!    current value with `previous = None`. When a pass is running it waits for
//!    that pass and delivers nothing; the first notification is the next `set`.
//! 5. An observer registered during a pass is not called by that pass, and one
//!    removed during a pass is not called by the rest of it.
//!
//! There is no timeout: a stalled observer stalls the whole pass.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::future::Future;
use std::rc::{Rc, Weak};

use tokio::sync::Mutex;
use trellis_core::{TrellisError, TrellisResult};

use crate::{Observer, Unobserve};

/// Equality predicate deciding whether a `set` is a change
pub type Comparer<T> = Rc<dyn Fn(&T, &T) -> bool>;

/// Read side of a reactive value
pub trait Observable<T> {
    fn get(&self) -> T;

    /// Register `observer` and return the token that removes it
    fn observe(&self, observer: Observer<T>)
        -> impl Future<Output = TrellisResult<Unobserve>> + 'static;
}

struct Inner<T> {
    value: RefCell<T>,
    observers: RefCell<Vec<Observer<T>>>,
    comparer: Comparer<T>,
    running: Cell<bool>,
    gate: Mutex<()>,
}

impl<T> Inner<T> {
    fn register(&self, observer: &Observer<T>) {
        let mut observers = self.observers.borrow_mut();
        if !observers.iter().any(|o| o.ptr_eq(observer)) {
            observers.push(observer.clone());
        }
    }

    fn unregister(&self, observer: &Observer<T>) {
        self.observers.borrow_mut().retain(|o| !o.ptr_eq(observer));
    }

    fn is_registered(&self, observer: &Observer<T>) -> bool {
        self.observers.borrow().iter().any(|o| o.ptr_eq(observer))
    }

    fn equals(&self, value: &T) -> bool {
        (self.comparer)(value, &self.value.borrow())
    }
}

/// Clears the in-flight flag even if the pass is dropped halfway
struct InFlight<'a>(&'a Cell<bool>);

impl<'a> InFlight<'a> {
    fn enter(flag: &'a Cell<bool>) -> Self {
        flag.set(true);
        InFlight(flag)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

/// A mutable value with serialized mutation and ordered change notification.
///
/// Cloning a `ReactiveData` creates a new handle to the same cell.
pub struct ReactiveData<T> {
    inner: Rc<Inner<T>>,
}

impl<T: Clone + 'static> ReactiveData<T> {
    /// Create a cell that treats `PartialEq`-equal values as unchanged
    pub fn new(value: T) -> Self
    where
        T: PartialEq,
    {
        Self::with_comparer(value, |a: &T, b: &T| a == b)
    }

    /// Create a cell with a custom equality predicate
    pub fn with_comparer(value: T, comparer: impl Fn(&T, &T) -> bool + 'static) -> Self {
        ReactiveData {
            inner: Rc::new(Inner {
                value: RefCell::new(value),
                observers: RefCell::new(Vec::new()),
                comparer: Rc::new(comparer),
                running: Cell::new(false),
                gate: Mutex::new(()),
            }),
        }
    }

    pub fn get(&self) -> T {
        self.inner.value.borrow().clone()
    }

    /// Replace the value and notify every observer.
    ///
    /// Waits for any running mutation or initial delivery first. Returns once
    /// every observer has finished.
    pub async fn set(&self, value: T) {
        let inner = &self.inner;
        let _guard = inner.gate.lock().await;

        if inner.equals(&value) {
            return;
        }

        let _in_flight = InFlight::enter(&inner.running);
        let previous = inner.value.replace(value.clone());
        let snapshot: Vec<Observer<T>> = inner.observers.borrow().clone();

        for observer in snapshot {
            if !inner.is_registered(&observer) {
                continue;
            }
            tracing::trace!(?observer, "notifying observer");
            if let Err(error) = observer.call(value.clone(), Some(previous.clone())).await {
                tracing::error!(error = %error, "observer failed while handling a change");
            }
        }
    }

    /// Register `observer`.
    ///
    /// Registration happens when this is called, not when the returned future
    /// is first polled. Dropping the future without awaiting it leaves the
    /// observer registered with no [`Unobserve`] token to remove it.
    pub fn observe(
        &self,
        observer: Observer<T>,
    ) -> impl Future<Output = TrellisResult<Unobserve>> + 'static {
        let inner = Rc::clone(&self.inner);
        inner.register(&observer);
        let running = inner.running.get();

        async move {
            if running {
                drop(inner.gate.lock().await);
            } else {
                let guard = inner.gate.lock().await;
                let current = inner.value.borrow().clone();
                if let Err(error) = observer.call(current, None).await {
                    drop(guard);
                    inner.unregister(&observer);
                    tracing::warn!(error = %error, "initial delivery failed, observer removed");
                    return Err(TrellisError::ObserverFailed(error));
                }
            }

            let weak: Weak<Inner<T>> = Rc::downgrade(&inner);
            Ok(Unobserve::new(move || {
                if let Some(inner) = weak.upgrade() {
                    inner.unregister(&observer);
                }
            }))
        }
    }

    /// Whether a mutation pass is currently running
    pub fn is_in_flight(&self) -> bool {
        self.inner.running.get()
    }

    pub fn observer_count(&self) -> usize {
        self.inner.observers.borrow().len()
    }
}

impl<U: ?Sized + 'static> ReactiveData<Rc<U>> {
    /// Create a cell that only treats the same allocation as unchanged
    pub fn identity(value: Rc<U>) -> Self {
        Self::with_comparer(value, |a: &Rc<U>, b: &Rc<U>| Rc::ptr_eq(a, b))
    }
}

impl<T: Clone + 'static> Observable<T> for ReactiveData<T> {
    fn get(&self) -> T {
        ReactiveData::get(self)
    }

    fn observe(
        &self,
        observer: Observer<T>,
    ) -> impl Future<Output = TrellisResult<Unobserve>> + 'static {
        ReactiveData::observe(self, observer)
    }
}

impl<T> Clone for ReactiveData<T> {
    fn clone(&self) -> Self {
        ReactiveData {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for ReactiveData<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReactiveData")
            .field("value", &self.inner.value.borrow())
            .field("observers", &self.inner.observers.borrow().len())
            .field("running", &self.inner.running.get())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::fmt::Display;

    use proptest::prelude::*;
    use tokio::sync::oneshot;
    use tokio::task::{spawn_local, LocalSet};
    use trellis_core::ObserverError;

    type Log<T> = Rc<RefCell<Vec<(T, Option<T>)>>>;

    fn recorder<T: Clone + 'static>() -> (Observer<T>, Log<T>) {
        let log: Log<T> = Rc::new(RefCell::new(Vec::new()));
        let sink = log.clone();
        let observer = Observer::sync(move |value, previous| {
            sink.borrow_mut().push((value, previous));
            Ok(())
        });
        (observer, log)
    }

    fn failing<T: 'static>(msg: &'static str) -> Observer<T> {
        Observer::sync(move |_, _| Err(ObserverError::from(msg)))
    }

    /// Observer that blocks its first real change until released
    fn blocker<T: 'static>() -> (Observer<T>, oneshot::Receiver<()>, oneshot::Sender<()>) {
        let (entered_tx, entered_rx) = oneshot::channel::<()>();
        let (release_tx, release_rx) = oneshot::channel::<()>();
        let gate = Rc::new(RefCell::new(Some((entered_tx, release_rx))));

        let observer = Observer::new(move |_value: T, previous: Option<T>| {
            let gate = gate.clone();
            async move {
                if previous.is_some() {
                    let taken = gate.borrow_mut().take();
                    if let Some((entered, release)) = taken {
                        let _ = entered.send(());
                        let _ = release.await;
                    }
                }
                Ok::<(), ObserverError>(())
            }
        });

        (observer, entered_rx, release_tx)
    }

    #[tokio::test]
    async fn test_change_sequence() {
        let cell = ReactiveData::new(0);
        let (o1, log) = recorder();

        let _token = cell.observe(o1).await.unwrap();
        assert_eq!(*log.borrow(), vec![(0, None)]);

        cell.set(1).await;
        cell.set(1).await;
        cell.set(2).await;

        assert_eq!(*log.borrow(), vec![(0, None), (1, Some(0)), (2, Some(1))]);
        assert_eq!(cell.get(), 2);
    }

    #[tokio::test]
    async fn test_equal_value_does_not_notify() {
        let cell = ReactiveData::new(String::from("a"));
        let (o1, log) = recorder();
        let (o2, log2) = recorder();
        let _t1 = cell.observe(o1).await.unwrap();
        let _t2 = cell.observe(o2).await.unwrap();

        cell.set(String::from("a")).await;
        assert_eq!(log.borrow().len(), 1);

        cell.set(String::from("b")).await;
        assert_eq!(log.borrow().last(), Some(&("b".to_string(), Some("a".to_string()))));
        assert_eq!(log2.borrow().last(), Some(&("b".to_string(), Some("a".to_string()))));
        assert_eq!(log.borrow().len(), 2);
        assert_eq!(log2.borrow().len(), 2);
    }

    #[tokio::test]
    async fn test_custom_comparer() {
        let cell = ReactiveData::with_comparer(String::from("Hello"), |a: &String, b: &String| {
            a.eq_ignore_ascii_case(b)
        });
        let (o1, log) = recorder();
        let _token = cell.observe(o1).await.unwrap();

        cell.set(String::from("HELLO")).await;
        assert_eq!(cell.get(), "Hello");
        assert_eq!(log.borrow().len(), 1);

        cell.set(String::from("World")).await;
        assert_eq!(log.borrow().len(), 2);
    }

    #[tokio::test]
    async fn test_identity_comparer() {
        let first = Rc::new(vec![1, 2]);
        let cell = ReactiveData::identity(first.clone());
        let (o1, log) = recorder();
        let _token = cell.observe(o1).await.unwrap();

        cell.set(first.clone()).await;
        assert_eq!(log.borrow().len(), 1);

        // Same contents, different allocation
        cell.set(Rc::new(vec![1, 2])).await;
        assert_eq!(log.borrow().len(), 2);
    }

    #[tokio::test]
    async fn test_failing_observer_is_isolated() {
        let cell = ReactiveData::new(0);
        let calls = Rc::new(Cell::new(0));
        let counter = calls.clone();
        let flaky = Observer::sync(move |_, previous: Option<i32>| {
            counter.set(counter.get() + 1);
            if previous.is_some() {
                return Err(ObserverError::from("flaky"));
            }
            Ok(())
        });
        let (later, log) = recorder();

        let _t1 = cell.observe(flaky).await.unwrap();
        let _t2 = cell.observe(later).await.unwrap();

        cell.set(1).await;

        assert_eq!(calls.get(), 2);
        assert_eq!(log.borrow().last(), Some(&(1, Some(0))));
        assert_eq!(cell.get(), 1);
        assert!(!cell.is_in_flight());
    }

    #[tokio::test]
    async fn test_initial_delivery_failure_removes_observer() {
        let cell = ReactiveData::new(0);

        let result = cell.observe(failing("nope")).await;

        match result {
            Err(TrellisError::ObserverFailed(e)) => assert_eq!(e.to_string(), "nope"),
            other => panic!("unexpected result: {:?}", other.map(|_| ())),
        }
        assert_eq!(cell.observer_count(), 0);
    }

    #[tokio::test]
    async fn test_unobserve_is_idempotent() {
        let cell = ReactiveData::new(0);
        let (o1, log) = recorder();
        let (o2, log2) = recorder();
        let t1 = cell.observe(o1).await.unwrap();
        let _t2 = cell.observe(o2).await.unwrap();

        t1.unobserve();
        t1.unobserve();
        cell.set(5).await;

        assert_eq!(*log.borrow(), vec![(0, None)]);
        assert_eq!(log2.borrow().last(), Some(&(5, Some(0))));
        assert_eq!(cell.observer_count(), 1);
    }

    #[tokio::test]
    async fn test_dropped_observe_future_stays_registered() {
        let cell = ReactiveData::new(0);
        let (o1, log) = recorder();

        drop(cell.observe(o1));
        assert_eq!(cell.observer_count(), 1);

        // never got an initial delivery, but still sees changes
        cell.set(1).await;
        assert_eq!(*log.borrow(), vec![(1, Some(0))]);
    }

    #[tokio::test]
    async fn test_duplicate_observer_registered_once() {
        let cell = ReactiveData::new(0);
        let (o1, log) = recorder();

        let _a = cell.observe(o1.clone()).await.unwrap();
        let _b = cell.observe(o1).await.unwrap();
        assert_eq!(cell.observer_count(), 1);

        cell.set(1).await;
        let changes = log.borrow().iter().filter(|(_, p)| p.is_some()).count();
        assert_eq!(changes, 1);
    }

    #[tokio::test]
    async fn test_observe_during_pass_skips_initial_delivery() {
        LocalSet::new()
            .run_until(async {
                let cell = ReactiveData::new(0);
                let (block, entered, release) = blocker();
                let _tb = cell.observe(block).await.unwrap();

                let setter = {
                    let cell = cell.clone();
                    spawn_local(async move { cell.set(1).await })
                };
                entered.await.unwrap();
                assert!(cell.is_in_flight());

                let (late, log) = recorder();
                let pending = cell.observe(late);
                assert_eq!(cell.observer_count(), 2);

                release.send(()).unwrap();
                let _tl = pending.await.unwrap();
                setter.await.unwrap();

                assert!(log.borrow().is_empty());

                cell.set(2).await;
                assert_eq!(*log.borrow(), vec![(2, Some(1))]);
            })
            .await;
    }

    #[tokio::test]
    async fn test_unobserve_during_pass() {
        LocalSet::new()
            .run_until(async {
                let cell = ReactiveData::new(0);
                let (block, entered, release) = blocker();
                let (victim, log) = recorder();
                let _tb = cell.observe(block).await.unwrap();
                let tv = cell.observe(victim).await.unwrap();

                let setter = {
                    let cell = cell.clone();
                    spawn_local(async move { cell.set(1).await })
                };
                entered.await.unwrap();

                tv.unobserve();
                release.send(()).unwrap();
                setter.await.unwrap();
                cell.set(2).await;
                tv.unobserve();

                assert_eq!(*log.borrow(), vec![(0, None)]);
            })
            .await;
    }

    #[tokio::test]
    async fn test_concurrent_sets_are_serialized() {
        LocalSet::new()
            .run_until(async {
                let cell = ReactiveData::new(0);
                let trace: Rc<RefCell<Vec<String>>> = Rc::new(RefCell::new(Vec::new()));
                let sink = trace.clone();
                let slow = Observer::new(move |value: i32, previous: Option<i32>| {
                    let sink = sink.clone();
                    async move {
                        if previous.is_some() {
                            sink.borrow_mut().push(format!("start {value}"));
                            tokio::task::yield_now().await;
                            tokio::task::yield_now().await;
                            sink.borrow_mut().push(format!("end {value}"));
                        }
                        Ok::<(), ObserverError>(())
                    }
                });
                let _token = cell.observe(slow).await.unwrap();

                let a = {
                    let cell = cell.clone();
                    spawn_local(async move { cell.set(1).await })
                };
                let b = {
                    let cell = cell.clone();
                    spawn_local(async move { cell.set(2).await })
                };
                a.await.unwrap();
                b.await.unwrap();

                assert_eq!(
                    *trace.borrow(),
                    vec!["start 1", "end 1", "start 2", "end 2"]
                );
                assert_eq!(cell.get(), 2);
            })
            .await;
    }

    #[tokio::test]
    async fn test_observable_trait() {
        async fn first_value<T: Clone + Display + 'static>(source: &impl Observable<T>) -> String {
            let seen = Rc::new(RefCell::new(String::new()));
            let sink = seen.clone();
            let token = source
                .observe(Observer::sync(move |v: T, _| {
                    *sink.borrow_mut() = v.to_string();
                    Ok(())
                }))
                .await
                .unwrap();
            token.unobserve();
            let out = seen.borrow().clone();
            out
        }

        let cell = ReactiveData::new(7u8);
        assert_eq!(first_value(&cell).await, "7");
        assert_eq!(Observable::get(&cell), 7);
        assert_eq!(cell.observer_count(), 0);
    }

    proptest! {
        #[test]
        fn prop_observer_sees_each_change_once(values in proptest::collection::vec(0u8..4, 0..32)) {
            let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
            let log = runtime.block_on(async {
                let cell = ReactiveData::new(0u8);
                let (o1, log) = recorder();
                let _token = cell.observe(o1).await.unwrap();
                for v in &values {
                    cell.set(*v).await;
                }
                let out = log.borrow().clone();
                out
            });

            let mut expected = vec![(0u8, None)];
            let mut current = 0u8;
            for v in values {
                if v != current {
                    expected.push((v, Some(current)));
                    current = v;
                }
            }
            prop_assert_eq!(log, expected);
        }
    }
}
