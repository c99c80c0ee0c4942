//! Buffered container

use std::cell::RefCell;
use std::rc::Rc;

use trellis_core::{position_of, Container, ContainerError, Node};

/// Collects nodes in memory and writes them to `output` on [`flush`].
///
/// After the flush every operation passes straight through to `output`.
///
/// [`flush`]: RenderBuffer::flush
pub struct RenderBuffer {
    output: Rc<dyn Container>,
    buffer: RefCell<Option<Vec<Node>>>,
}

impl RenderBuffer {
    pub fn new(output: Rc<dyn Container>) -> Self {
        RenderBuffer {
            output,
            buffer: RefCell::new(Some(Vec::new())),
        }
    }

    /// Append every buffered node to the output, in order
    pub fn flush(&self) -> Result<(), ContainerError> {
        let nodes = self
            .buffer
            .borrow_mut()
            .take()
            .ok_or_else(|| ContainerError::structure("This buffer is already flushed"))?;

        tracing::trace!(nodes = nodes.len(), "flushing render buffer");
        for node in nodes {
            self.output.append_child(node)?;
        }
        Ok(())
    }

    pub fn is_flushed(&self) -> bool {
        self.buffer.borrow().is_none()
    }

    /// Number of nodes waiting for the flush
    pub fn buffered(&self) -> usize {
        self.buffer.borrow().as_ref().map_or(0, Vec::len)
    }
}

impl Container for RenderBuffer {
    fn append_child(&self, node: Node) -> Result<(), ContainerError> {
        match self.buffer.borrow_mut().as_mut() {
            Some(buffer) => {
                buffer.push(node);
                Ok(())
            }
            None => self.output.append_child(node),
        }
    }

    fn insert_before(&self, node: Node, before: Option<&Node>) -> Result<Node, ContainerError> {
        match self.buffer.borrow_mut().as_mut() {
            Some(buffer) => {
                // unknown anchors append
                match before.and_then(|b| position_of(buffer, b)) {
                    Some(at) => buffer.insert(at, node.clone()),
                    None => buffer.push(node.clone()),
                }
                Ok(node)
            }
            None => self.output.insert_before(node, before),
        }
    }

    fn remove_child(&self, child: &Node) -> Result<Node, ContainerError> {
        match self.buffer.borrow_mut().as_mut() {
            Some(buffer) => {
                let at = position_of(buffer, child).ok_or(ContainerError::NotFound)?;
                Ok(buffer.remove(at))
            }
            None => self.output.remove_child(child),
        }
    }
}
