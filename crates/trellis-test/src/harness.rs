//! Shared test doubles
//!
//! - [`MemoryContainer`]: in-memory node container that records every call
//! - [`EventLog`]: ordered log shared between doubles
//! - [`Probe`]: disposable that logs its disposal

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use async_trait::async_trait;
use trellis_core::{position_of, Container, ContainerError, Disposable, Node, TrellisResult};

// ============================================================================
// EVENT LOG
// ============================================================================

/// Cheaply cloneable ordered list of events
#[derive(Clone, Default)]
pub struct EventLog {
    events: Rc<RefCell<Vec<String>>>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, event: impl Into<String>) {
        self.events.borrow_mut().push(event.into());
    }

    /// Copy of every event so far
    pub fn events(&self) -> Vec<String> {
        self.events.borrow().clone()
    }

    /// Remove and return every event so far
    pub fn take(&self) -> Vec<String> {
        std::mem::take(&mut *self.events.borrow_mut())
    }

    pub fn len(&self) -> usize {
        self.events.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.borrow().is_empty()
    }
}

impl fmt::Debug for EventLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.events.borrow().iter()).finish()
    }
}

// ============================================================================
// PROBE
// ============================================================================

/// A disposable that writes `dispose <name>` to its log
pub struct Probe {
    name: String,
    log: EventLog,
    disposals: Cell<usize>,
    fail: Cell<bool>,
}

impl Probe {
    pub fn new(name: impl Into<String>, log: &EventLog) -> Rc<Self> {
        Rc::new(Probe {
            name: name.into(),
            log: log.clone(),
            disposals: Cell::new(0),
            fail: Cell::new(false),
        })
    }

    /// Make the next disposals fail
    pub fn fail_on_dispose(&self, fail: bool) {
        self.fail.set(fail);
    }

    pub fn disposals(&self) -> usize {
        self.disposals.get()
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

#[async_trait(?Send)]
impl Disposable for Probe {
    async fn dispose(&self) -> TrellisResult<()> {
        if self.fail.get() {
            self.log.push(format!("fail {}", self.name));
            return Err(ContainerError::structure(format!("{} refused to dispose", self.name)).into());
        }
        self.disposals.set(self.disposals.get() + 1);
        self.log.push(format!("dispose {}", self.name));
        Ok(())
    }
}

// ============================================================================
// MEMORY CONTAINER
// ============================================================================

/// A call made on a [`MemoryContainer`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContainerCall {
    Append(Node),
    InsertBefore(Node, Option<Node>),
    Remove(Node),
}

/// In-memory node container.
///
/// Keeps its nodes in order, records every call, and can be told to fail
/// removals.
#[derive(Default)]
pub struct MemoryContainer {
    nodes: RefCell<Vec<Node>>,
    calls: RefCell<Vec<ContainerCall>>,
    fail_removals: Cell<bool>,
}

impl MemoryContainer {
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    /// Current children in order
    pub fn nodes(&self) -> Vec<Node> {
        self.nodes.borrow().clone()
    }

    pub fn len(&self) -> usize {
        self.nodes.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.borrow().is_empty()
    }

    pub fn contains(&self, node: &Node) -> bool {
        position_of(&self.nodes.borrow(), node).is_some()
    }

    pub fn position(&self, node: &Node) -> Option<usize> {
        position_of(&self.nodes.borrow(), node)
    }

    /// Every call made so far
    pub fn calls(&self) -> Vec<ContainerCall> {
        self.calls.borrow().clone()
    }

    /// Make `remove_child` fail with a backend error
    pub fn fail_removals(&self, fail: bool) {
        self.fail_removals.set(fail);
    }
}

impl Container for MemoryContainer {
    fn append_child(&self, node: Node) -> Result<(), ContainerError> {
        self.calls.borrow_mut().push(ContainerCall::Append(node.clone()));
        self.nodes.borrow_mut().push(node);
        Ok(())
    }

    fn insert_before(&self, node: Node, before: Option<&Node>) -> Result<Node, ContainerError> {
        self.calls
            .borrow_mut()
            .push(ContainerCall::InsertBefore(node.clone(), before.cloned()));

        let mut nodes = self.nodes.borrow_mut();
        match before.and_then(|b| position_of(&nodes, b)) {
            Some(at) => nodes.insert(at, node.clone()),
            None => nodes.push(node.clone()),
        }
        Ok(node)
    }

    fn remove_child(&self, child: &Node) -> Result<Node, ContainerError> {
        self.calls.borrow_mut().push(ContainerCall::Remove(child.clone()));

        if self.fail_removals.get() {
            return Err(ContainerError::Backend("removal failed".into()));
        }

        let mut nodes = self.nodes.borrow_mut();
        let at = position_of(&nodes, child).ok_or(ContainerError::NotFound)?;
        Ok(nodes.remove(at))
    }
}

impl fmt::Debug for MemoryContainer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryContainer")
            .field("nodes", &self.nodes.borrow())
            .field("calls", &self.calls.borrow().len())
            .finish()
    }
}
