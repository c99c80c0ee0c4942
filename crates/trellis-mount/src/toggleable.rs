//! Show/hide container

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use async_trait::async_trait;
use trellis_core::{position_of, Container, ContainerError, Disposable, Node, TrellisResult};

/// A placeholder that remembers its nodes and only puts them in the parent
/// while visible.
///
/// Starts hidden. Nodes added while hidden are tracked and inserted on the
/// next [`show`](Toggleable::show).
pub struct Toggleable {
    parent: Rc<dyn Container>,
    guide: Node,
    nodes: RefCell<Vec<Node>>,
    visible: Cell<bool>,
}

impl Toggleable {
    /// Append `guide` to `parent` and use it as the insertion point
    pub fn new(parent: Rc<dyn Container>, guide: Node) -> Result<Self, ContainerError> {
        parent.append_child(guide.clone())?;
        Ok(Toggleable {
            parent,
            guide,
            nodes: RefCell::new(Vec::new()),
            visible: Cell::new(false),
        })
    }

    #[inline]
    pub fn is_visible(&self) -> bool {
        self.visible.get()
    }

    /// Number of tracked nodes, visible or not
    pub fn len(&self) -> usize {
        self.nodes.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.borrow().is_empty()
    }

    /// Insert every tracked node before the guide. No-op when visible.
    pub fn show(&self) -> Result<(), ContainerError> {
        if self.visible.get() {
            return Ok(());
        }

        let nodes = self.nodes.borrow().clone();
        for node in nodes {
            self.parent.insert_before(node, Some(&self.guide))?;
        }

        self.visible.set(true);
        Ok(())
    }

    /// Remove every tracked node from the parent, last first. No-op when hidden.
    pub fn hide(&self) -> Result<(), ContainerError> {
        if !self.visible.get() {
            return Ok(());
        }

        let nodes = self.nodes.borrow().clone();
        for node in nodes.iter().rev() {
            self.parent.remove_child(node)?;
        }

        self.visible.set(false);
        Ok(())
    }
}

impl Container for Toggleable {
    fn append_child(&self, node: Node) -> Result<(), ContainerError> {
        self.nodes.borrow_mut().push(node.clone());

        if self.visible.get() {
            self.parent.insert_before(node, Some(&self.guide))?;
        }
        Ok(())
    }

    fn insert_before(&self, node: Node, before: Option<&Node>) -> Result<Node, ContainerError> {
        let anchor = {
            let mut nodes = self.nodes.borrow_mut();
            match before.and_then(|b| position_of(&nodes, b)) {
                Some(at) => {
                    let anchor = nodes[at].clone();
                    nodes.insert(at, node.clone());
                    anchor
                }
                None => {
                    nodes.push(node.clone());
                    self.guide.clone()
                }
            }
        };

        if self.visible.get() {
            self.parent.insert_before(node.clone(), Some(&anchor))?;
        }
        Ok(node)
    }

    fn remove_child(&self, child: &Node) -> Result<Node, ContainerError> {
        let removed = {
            let mut nodes = self.nodes.borrow_mut();
            let at = position_of(&nodes, child).ok_or(ContainerError::NotFound)?;
            nodes.remove(at)
        };

        if self.visible.get() {
            self.parent.remove_child(child)?;
        }
        Ok(removed)
    }
}

#[async_trait(?Send)]
impl Disposable for Toggleable {
    async fn dispose(&self) -> TrellisResult<()> {
        self.parent.remove_child(&self.guide)?;
        Ok(())
    }
}
