//! End-to-end scenarios
//!
//! A small counter application wired through every layer:
//! - `ReactiveData` drives the view
//! - components own their nodes, watches, and service scopes
//! - the mount adapters sit between the components and a [`MemoryContainer`]

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

use async_trait::async_trait;
use trellis_compose::{
    Activate, Activation, Component, ComponentActivator, ComponentParams, Composition,
    ServiceCollection, ServiceSource,
};
use trellis_core::{Container, Disposable, Node, TrellisResult};
use trellis_mount::{RenderBuffer, RootContainer, Toggleable};
use trellis_reactive::{Observer, ReactiveData};

use crate::harness::{EventLog, MemoryContainer, Probe};

// ============================================================================
// COMPONENTS
// ============================================================================

/// Host element rendered for a component
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub tag: &'static str,
    pub text: String,
}

impl Element {
    pub fn node(tag: &'static str, text: impl Into<String>) -> Node {
        Node::new(Element {
            tag,
            text: text.into(),
        })
    }
}

/// Leaf component rendering one element
pub struct Label {
    composition: Composition,
    text: String,
    log: EventLog,
}

impl Label {
    pub fn new(params: ComponentParams, text: impl Into<String>, log: EventLog) -> TrellisResult<Self> {
        Ok(Label {
            composition: Composition::new(params)?,
            text: text.into(),
            log,
        })
    }
}

#[async_trait(?Send)]
impl Component for Label {
    fn composition(&self) -> &Composition {
        &self.composition
    }

    async fn render(&self) -> TrellisResult<()> {
        self.composition
            .append_node(Element::node("span", self.text.clone()))
    }

    async fn dispose(&self) -> TrellisResult<()> {
        self.log.push(format!("dispose label {}", self.text));
        self.composition.dispose().await
    }
}

/// Counter view: a heading followed by a toggleable region of labels
pub struct CounterView {
    composition: Composition,
    region: Rc<Toggleable>,
    log: EventLog,
    labels: Cell<usize>,
}

impl CounterView {
    /// Build the view in its own service scope
    pub fn new(parent: Rc<ServiceCollection>, container: Rc<dyn Container>, log: EventLog) -> TrellisResult<Self> {
        let composition = Composition::new(ComponentParams::new(
            ServiceSource::scoped(parent),
            container.clone(),
        ))?;
        composition.append_node(Element::node("h1", "counter"))?;

        let region = Rc::new(Toggleable::new(container, Element::node("guide", ""))?);
        composition.add_dependencies([region.clone() as Rc<dyn Disposable>]);

        Ok(CounterView {
            composition,
            region,
            log,
            labels: Cell::new(0),
        })
    }

    pub fn region(&self) -> &Rc<Toggleable> {
        &self.region
    }

    /// Add a label child rendering into the toggleable region
    pub async fn add_label(&self, text: String) -> TrellisResult<Rc<Label>> {
        let params = ComponentParams::new(
            self.composition.services().clone(),
            self.region.clone() as Rc<dyn Container>,
        );
        let log = self.log.clone();
        let label = self
            .composition
            .create_component(move |params| Label::new(params, text, log), params)?;
        label.render().await?;
        self.labels.set(self.labels.get() + 1);
        Ok(label)
    }

    pub fn label_count(&self) -> usize {
        self.labels.get()
    }
}

#[async_trait(?Send)]
impl Component for CounterView {
    fn composition(&self) -> &Composition {
        &self.composition
    }

    async fn render(&self) -> TrellisResult<()> {
        self.region.show()?;

        let count = self.composition.services().resolve::<ReactiveData<u32>>()?;
        let log = self.log.clone();
        self.composition
            .watch(
                &*count,
                Observer::sync(move |value: u32, previous: Option<u32>| {
                    log.push(format!("count {previous:?} -> {value}"));
                    Ok(())
                }),
            )
            .await
    }

    async fn dispose(&self) -> TrellisResult<()> {
        self.log.push("dispose counter");
        self.composition.dispose().await
    }
}

// ============================================================================
// ACTIVATION
// ============================================================================

/// Activator recording the type name of everything it constructs
#[derive(Default)]
pub struct RecordingActivator {
    pub constructed: RefCell<Vec<&'static str>>,
}

impl Activate for RecordingActivator {
    fn activate(&self, activation: Activation) -> TrellisResult<Rc<dyn Any>> {
        self.constructed.borrow_mut().push(activation.component());
        activation.construct()
    }
}

// ============================================================================
// APPLICATION
// ============================================================================

/// A mounted counter application
pub struct CounterApp {
    pub host: Rc<MemoryContainer>,
    pub services: Rc<ServiceCollection>,
    pub count: Rc<ReactiveData<u32>>,
    pub view: Rc<CounterView>,
    pub log: EventLog,
}

impl CounterApp {
    /// Render the counter into a buffered root and flush it to a fresh host
    pub async fn mount(services: Rc<ServiceCollection>) -> TrellisResult<Self> {
        let host = MemoryContainer::new();
        let log = EventLog::new();

        let count = Rc::new(ReactiveData::new(0u32));
        let shared = count.clone();
        services.register::<ReactiveData<u32>, _>(move |_| Ok(shared.clone()));

        let root = Rc::new(RootContainer::new(host.clone()));
        root.append_child(Element::node("body", ""))?;

        let buffer = Rc::new(RenderBuffer::new(host.clone()));
        let view = Rc::new(CounterView::new(services.clone(), buffer.clone(), log.clone())?);
        view.render().await?;
        buffer.flush()?;
        tracing::debug!(nodes = host.len(), "counter mounted");

        Ok(CounterApp {
            host,
            services,
            count,
            view,
            log,
        })
    }

    /// Set the counter and add a label for the new value
    pub async fn increment(&self) -> TrellisResult<()> {
        let next = self.count.get() + 1;
        self.count.set(next).await;
        self.view.add_label(format!("#{next}")).await?;
        Ok(())
    }

    pub async fn unmount(&self) -> TrellisResult<()> {
        self.view.dispose().await
    }
}

/// Root services with the default activator installed
pub fn default_services() -> Rc<ServiceCollection> {
    let services = ServiceCollection::new();
    ComponentActivator::install(&services);
    services
}

/// Register a probe as a disposable service in `services`
pub fn register_probe<T: Disposable + 'static>(
    services: &ServiceCollection,
    make: impl Fn() -> Rc<T> + 'static,
) {
    services.register_disposable::<T, _>(move |_| Ok(make()));
}

/// Convenience for scenarios needing a named probe service
pub fn probe_service(services: &ServiceCollection, name: &'static str, log: &EventLog) -> Rc<Probe> {
    let probe = Probe::new(name, log);
    let registered = probe.clone();
    register_probe(services, move || registered.clone());
    probe
}
