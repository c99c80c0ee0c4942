//! Application root

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

use trellis_core::{Container, ContainerError, Node};

type Accept = Box<dyn Fn(&Node) -> bool>;

/// Container for the top of a component tree. It takes exactly one node.
pub struct RootContainer {
    host: Rc<dyn Container>,
    accept: Option<Accept>,
    mounted: Cell<bool>,
}

impl RootContainer {
    pub fn new(host: Rc<dyn Container>) -> Self {
        RootContainer {
            host,
            accept: None,
            mounted: Cell::new(false),
        }
    }

    /// Only mount nodes `accept` returns true for
    pub fn with_acceptance<F>(host: Rc<dyn Container>, accept: F) -> Self
    where
        F: Fn(&Node) -> bool + 'static,
    {
        RootContainer {
            host,
            accept: Some(Box::new(accept)),
            mounted: Cell::new(false),
        }
    }

    #[inline]
    pub fn is_mounted(&self) -> bool {
        self.mounted.get()
    }
}

impl Container for RootContainer {
    fn append_child(&self, node: Node) -> Result<(), ContainerError> {
        if self.mounted.get() {
            return Err(ContainerError::structure(
                "The application must contain only a single node",
            ));
        }

        if let Some(accept) = &self.accept {
            if !accept(&node) {
                return Err(ContainerError::structure(
                    "The node is not a valid application root",
                ));
            }
        }

        tracing::debug!(?node, "mounting application root");
        self.host.append_child(node)?;
        self.mounted.set(true);
        Ok(())
    }

    fn insert_before(&self, _node: Node, _before: Option<&Node>) -> Result<Node, ContainerError> {
        Err(ContainerError::structure(
            "The application must contain only a single node",
        ))
    }

    fn remove_child(&self, child: &Node) -> Result<Node, ContainerError> {
        self.host.remove_child(child)
    }
}

impl fmt::Debug for RootContainer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RootContainer")
            .field("mounted", &self.mounted.get())
            .field("filtered", &self.accept.is_some())
            .finish()
    }
}
