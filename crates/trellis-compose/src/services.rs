//! Scoped service container
//!
//! A [`ServiceCollection`] builds each service lazily, the first time it is
//! resolved, and keeps it for the rest of its own lifetime. A scope created
//! from a collection falls back to its parent for anything it has no factory
//! for, without caching what the parent returns.

use std::any::{type_name, Any, TypeId};
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::{Rc, Weak};

use async_trait::async_trait;
use trellis_core::{Disposable, TrellisError, TrellisResult};

use crate::Composition;

/// Identity of a service: the service type itself
#[derive(Clone, Copy)]
pub struct ServiceKey {
    id: TypeId,
    name: &'static str,
}

impl ServiceKey {
    pub fn of<T: ?Sized + 'static>() -> Self {
        ServiceKey {
            id: TypeId::of::<T>(),
            name: type_name::<T>(),
        }
    }

    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl PartialEq for ServiceKey {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ServiceKey {}

impl Hash for ServiceKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for ServiceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Service({})", self.name)
    }
}

/// A constructed service
struct Instance {
    /// Holds an `Rc<T>` for the service type `T`
    value: Box<dyn Any>,
    /// Set when the service takes part in disposal
    disposer: Option<Rc<dyn Disposable>>,
}

type Factory = Rc<dyn Fn(&Rc<ServiceCollection>) -> TrellisResult<Instance>>;

/// Hierarchical, memoizing service container
pub struct ServiceCollection {
    factories: RefCell<HashMap<ServiceKey, Factory>>,
    instances: RefCell<HashMap<ServiceKey, Instance>>,
    /// Keys in first-resolution order
    order: RefCell<Vec<ServiceKey>>,
    /// Keys whose factory is currently running
    resolving: RefCell<HashSet<ServiceKey>>,
    parent: Option<Weak<ServiceCollection>>,
}

impl ServiceCollection {
    /// Create a root collection
    pub fn new() -> Rc<Self> {
        Rc::new(Self::with_parent(None))
    }

    fn with_parent(parent: Option<Weak<ServiceCollection>>) -> Self {
        ServiceCollection {
            factories: RefCell::new(HashMap::new()),
            instances: RefCell::new(HashMap::new()),
            order: RefCell::new(Vec::new()),
            resolving: RefCell::new(HashSet::new()),
            parent,
        }
    }

    /// Create a child scope of this collection.
    ///
    /// The scope is not owned by anything; prefer [`scope_to`](Self::scope_to)
    /// unless the caller disposes it itself.
    pub fn create_scope(self: &Rc<Self>) -> Rc<Self> {
        tracing::debug!("creating service scope");
        Rc::new(Self::with_parent(Some(Rc::downgrade(self))))
    }

    /// Create a child scope that is disposed together with `owner`
    pub fn scope_to(self: &Rc<Self>, owner: &Composition) -> Rc<Self> {
        let scope = self.create_scope();
        owner.add_dependencies([scope.clone() as Rc<dyn Disposable>]);
        scope
    }

    /// The enclosing collection, if it is still alive
    pub fn parent(&self) -> Option<Rc<ServiceCollection>> {
        self.parent.as_ref().and_then(Weak::upgrade)
    }

    /// Install a factory for `T` at this level, replacing any previous one.
    ///
    /// Instances built here are never disposed by the collection, even when
    /// `T` implements [`Disposable`]. Register those with
    /// [`register_disposable`](Self::register_disposable).
    pub fn register<T, F>(&self, factory: F)
    where
        T: ?Sized + 'static,
        F: Fn(&Rc<ServiceCollection>) -> TrellisResult<Rc<T>> + 'static,
    {
        let factory: Factory = Rc::new(move |services: &Rc<ServiceCollection>| {
            Ok(Instance {
                value: Box::new(factory(services)?),
                disposer: None,
            })
        });
        self.factories
            .borrow_mut()
            .insert(ServiceKey::of::<T>(), factory);
    }

    /// Install a factory for a service that is disposed with this collection.
    ///
    /// Every `Disposable` service must be registered through this method to
    /// take part in [`Disposable::dispose`] on the collection.
    pub fn register_disposable<T, F>(&self, factory: F)
    where
        T: Disposable + 'static,
        F: Fn(&Rc<ServiceCollection>) -> TrellisResult<Rc<T>> + 'static,
    {
        let factory: Factory = Rc::new(move |services: &Rc<ServiceCollection>| {
            let service = factory(services)?;
            let disposer: Rc<dyn Disposable> = service.clone();
            Ok(Instance {
                value: Box::new(service),
                disposer: Some(disposer),
            })
        });
        self.factories
            .borrow_mut()
            .insert(ServiceKey::of::<T>(), factory);
    }

    /// Whether this level has a factory for `T`
    pub fn is_registered<T: ?Sized + 'static>(&self) -> bool {
        self.factories
            .borrow()
            .contains_key(&ServiceKey::of::<T>())
    }

    /// Number of services constructed at this level
    pub fn instance_count(&self) -> usize {
        self.instances.borrow().len()
    }

    /// Resolve `T`, constructing it on first use.
    ///
    /// Looks at this level's cache, then this level's factory, then the
    /// parent chain.
    pub fn resolve<T: ?Sized + 'static>(self: &Rc<Self>) -> TrellisResult<Rc<T>> {
        let key = ServiceKey::of::<T>();

        if let Some(instance) = self.cached::<T>(key) {
            return Ok(instance);
        }

        let factory = self.factories.borrow().get(&key).cloned();
        let Some(factory) = factory else {
            return match self.parent() {
                Some(parent) => parent.resolve::<T>(),
                None => Err(TrellisError::UnresolvedService {
                    service: key.name(),
                }),
            };
        };

        if !self.resolving.borrow_mut().insert(key) {
            return Err(TrellisError::CircularService {
                service: key.name(),
            });
        }
        tracing::debug!(service = key.name(), "constructing service");
        let built = factory(self);
        self.resolving.borrow_mut().remove(&key);
        let instance = built?;

        let service = instance
            .value
            .downcast_ref::<Rc<T>>()
            .cloned()
            .ok_or(TrellisError::UnresolvedService {
                service: key.name(),
            })?;
        self.instances.borrow_mut().insert(key, instance);
        self.order.borrow_mut().push(key);

        Ok(service)
    }

    fn cached<T: ?Sized + 'static>(&self, key: ServiceKey) -> Option<Rc<T>> {
        self.instances
            .borrow()
            .get(&key)
            .and_then(|i| i.value.downcast_ref::<Rc<T>>().cloned())
    }
}

#[async_trait(?Send)]
impl Disposable for ServiceCollection {
    /// Dispose constructed services, most recently constructed first
    async fn dispose(&self) -> TrellisResult<()> {
        loop {
            let next = self.order.borrow_mut().pop();
            let Some(key) = next else {
                return Ok(());
            };
            let instance = self.instances.borrow_mut().remove(&key);
            if let Some(disposer) = instance.and_then(|i| i.disposer) {
                tracing::debug!(service = key.name(), "disposing service");
                disposer.dispose().await?;
            }
        }
    }
}

impl fmt::Debug for ServiceCollection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceCollection")
            .field("factories", &self.factories.borrow().len())
            .field("instances", &self.order.borrow())
            .field("has_parent", &self.parent.is_some())
            .finish()
    }
}
