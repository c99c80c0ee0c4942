//! Component lifecycle
//!
//! A component embeds a [`Composition`], which records everything the
//! component acquires while it is alive:
//! - watches on observable values
//! - children (components, or host nodes it inserted into its container)
//! - dependencies (anything [`Disposable`], including service scopes)
//!
//! Disposing the composition releases them in that order, each list last
//! registered first. Child components are disposed one at a time and fully
//! before the next. Nothing runs concurrently and nothing times out.
//!
//! A failure while disposing a child or dependency stops the teardown and is
//! returned to the caller. Entries not reached yet stay registered.

use std::any::type_name;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use async_trait::async_trait;
use trellis_core::{
    dispose_in_reverse, Container, Disposable, Node, TrellisError, TrellisResult,
};
use trellis_reactive::{Observable, Observer, Unobserve};

use crate::{Activate, ServiceCollection};

/// A unit of UI with a managed lifetime
#[async_trait(?Send)]
pub trait Component: 'static {
    fn composition(&self) -> &Composition;

    async fn render(&self) -> TrellisResult<()> {
        Err(TrellisError::RenderUndefined {
            component: type_name::<Self>(),
        })
    }

    /// Tear the component down. Must be called exactly once.
    async fn dispose(&self) -> TrellisResult<()> {
        self.composition().dispose().await
    }
}

/// Where a new component gets its services from
pub enum ServiceSource {
    /// Use this collection as is
    Shared(Rc<ServiceCollection>),
    /// Create a child scope of `parent`, owned by the new component
    Scoped {
        parent: Rc<ServiceCollection>,
        configure: Option<Box<dyn FnOnce(&Rc<ServiceCollection>)>>,
    },
}

impl ServiceSource {
    pub fn scoped(parent: Rc<ServiceCollection>) -> Self {
        ServiceSource::Scoped {
            parent,
            configure: None,
        }
    }

    /// Scoped source whose scope is populated by `configure`
    pub fn scoped_with(
        parent: Rc<ServiceCollection>,
        configure: impl FnOnce(&Rc<ServiceCollection>) + 'static,
    ) -> Self {
        ServiceSource::Scoped {
            parent,
            configure: Some(Box::new(configure)),
        }
    }
}

impl From<Rc<ServiceCollection>> for ServiceSource {
    fn from(services: Rc<ServiceCollection>) -> Self {
        ServiceSource::Shared(services)
    }
}

impl fmt::Debug for ServiceSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceSource::Shared(_) => write!(f, "ServiceSource::Shared"),
            ServiceSource::Scoped { .. } => write!(f, "ServiceSource::Scoped"),
        }
    }
}

/// What every component is built from
pub struct ComponentParams {
    pub services: ServiceSource,
    pub container: Rc<dyn Container>,
}

impl ComponentParams {
    pub fn new(services: impl Into<ServiceSource>, container: Rc<dyn Container>) -> Self {
        ComponentParams {
            services: services.into(),
            container,
        }
    }
}

/// Something a composition tears down in its children pass
pub enum Child {
    /// A host node inserted into the composition's container
    Node(Node),
    Component(Rc<dyn Component>),
}

impl fmt::Debug for Child {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Child::Node(node) => write!(f, "Child::Node({node:?})"),
            Child::Component(_) => write!(f, "Child::Component"),
        }
    }
}

/// Lifecycle state owned by a component
pub struct Composition {
    services: Rc<ServiceCollection>,
    activator: Rc<dyn Activate>,
    /// Shared with the host; never torn down here
    container: Rc<dyn Container>,
    children: RefCell<Vec<Child>>,
    dependencies: RefCell<Vec<Rc<dyn Disposable>>>,
    watches: RefCell<Vec<Unobserve>>,
}

impl Composition {
    /// Build the lifecycle state for a new component.
    ///
    /// A scoped service source gets its scope created here and registered as
    /// the first dependency, so it is disposed last.
    pub fn new(params: ComponentParams) -> TrellisResult<Self> {
        let dependencies: RefCell<Vec<Rc<dyn Disposable>>> = RefCell::new(Vec::new());

        let services = match params.services {
            ServiceSource::Shared(services) => services,
            ServiceSource::Scoped { parent, configure } => {
                let scope = parent.create_scope();
                dependencies.borrow_mut().push(scope.clone());
                if let Some(configure) = configure {
                    configure(&scope);
                }
                scope
            }
        };
        let activator = services.resolve::<dyn Activate>()?;

        Ok(Composition {
            services,
            activator,
            container: params.container,
            children: RefCell::new(Vec::new()),
            dependencies,
            watches: RefCell::new(Vec::new()),
        })
    }

    #[inline]
    pub fn services(&self) -> &Rc<ServiceCollection> {
        &self.services
    }

    #[inline]
    pub fn container(&self) -> &Rc<dyn Container> {
        &self.container
    }

    #[inline]
    pub fn activator(&self) -> &Rc<dyn Activate> {
        &self.activator
    }

    /// Params for a child sharing this component's services and container
    pub fn child_params(&self) -> ComponentParams {
        ComponentParams::new(self.services.clone(), self.container.clone())
    }

    /// Register disposables to release after the children
    pub fn add_dependencies(&self, deps: impl IntoIterator<Item = Rc<dyn Disposable>>) {
        self.dependencies.borrow_mut().extend(deps);
    }

    /// Construct a child component through the activator and adopt it
    pub fn create_component<C, P, F>(&self, constructor: F, params: P) -> TrellisResult<Rc<C>>
    where
        C: Component,
        P: 'static,
        F: FnOnce(P) -> TrellisResult<C> + 'static,
    {
        let component = self.activator.create(constructor, params)?;
        self.adopt(component.clone());
        Ok(component)
    }

    /// Take ownership of a component built elsewhere, such as by a slot
    pub fn adopt(&self, component: Rc<dyn Component>) {
        self.children.borrow_mut().push(Child::Component(component));
    }

    /// Append a host node to the container and remember it for teardown
    pub fn append_node(&self, node: Node) -> TrellisResult<()> {
        self.container.append_child(node.clone())?;
        self.children.borrow_mut().push(Child::Node(node));
        Ok(())
    }

    /// Insert a host node before `before` and remember it for teardown
    pub fn insert_node_before(&self, node: Node, before: Option<&Node>) -> TrellisResult<Node> {
        let inserted = self.container.insert_before(node, before)?;
        self.children.borrow_mut().push(Child::Node(inserted.clone()));
        Ok(inserted)
    }

    /// Observe `target` until this composition is disposed.
    ///
    /// `handler` must not set `target`: the set would wait for the pass that
    /// is running the handler.
    pub async fn watch<T, S>(&self, target: &S, handler: Observer<T>) -> TrellisResult<()>
    where
        S: Observable<T>,
    {
        let token = target.observe(handler).await?;
        self.watches.borrow_mut().push(token);
        Ok(())
    }

    pub fn watch_count(&self) -> usize {
        self.watches.borrow().len()
    }

    pub fn child_count(&self) -> usize {
        self.children.borrow().len()
    }

    pub fn dependency_count(&self) -> usize {
        self.dependencies.borrow().len()
    }

    /// Release watches, then children, then dependencies
    pub async fn dispose(&self) -> TrellisResult<()> {
        tracing::debug!(
            watches = self.watch_count(),
            children = self.child_count(),
            dependencies = self.dependency_count(),
            "disposing composition"
        );

        // stop observing
        loop {
            let next = self.watches.borrow_mut().pop();
            match next {
                Some(token) => token.unobserve(),
                None => break,
            }
        }

        // dispose children
        loop {
            let next = self.children.borrow_mut().pop();
            let Some(child) = next else {
                break;
            };
            match child {
                Child::Component(component) => Component::dispose(&*component).await?,
                Child::Node(node) => match self.container.remove_child(&node) {
                    Ok(_) => {}
                    Err(e) if e.is_not_found() => {
                        tracing::debug!(?node, "node already detached");
                    }
                    Err(e) => return Err(e.into()),
                },
            }
        }

        // dispose dependencies
        dispose_in_reverse(&self.dependencies).await
    }
}

impl fmt::Debug for Composition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Composition")
            .field("watches", &self.watch_count())
            .field("children", &self.children.borrow())
            .field("dependencies", &self.dependency_count())
            .finish()
    }
}
