//! Trellis Mount - Node-insertion adapters
//!
//! Each adapter implements [`Container`](trellis_core::Container) by wrapping
//! another container:
//! - [`RenderBuffer`]: hold nodes back until flushed
//! - [`Placeholder`]: insert at a fixed position marked by a guide node
//! - [`Toggleable`]: a placeholder whose nodes can be shown and hidden
//! - [`RootContainer`]: accept a single root node

pub mod placeholder;
pub mod render_buffer;
pub mod root;
pub mod toggleable;

pub use placeholder::Placeholder;
pub use render_buffer::RenderBuffer;
pub use root::RootContainer;
pub use toggleable::Toggleable;

#[cfg(test)]
pub(crate) mod testing {
    use std::cell::RefCell;

    use trellis_core::{position_of, Container, ContainerError, Node};

    /// Host container keeping its nodes in document order
    #[derive(Default)]
    pub struct Host {
        pub nodes: RefCell<Vec<Node>>,
    }

    impl Host {
        pub fn len(&self) -> usize {
            self.nodes.borrow().len()
        }

        pub fn position(&self, node: &Node) -> Option<usize> {
            position_of(&self.nodes.borrow(), node)
        }

        pub fn contains(&self, node: &Node) -> bool {
            self.position(node).is_some()
        }
    }

    impl Container for Host {
        fn append_child(&self, node: Node) -> Result<(), ContainerError> {
            self.nodes.borrow_mut().push(node);
            Ok(())
        }

        fn insert_before(&self, node: Node, before: Option<&Node>) -> Result<Node, ContainerError> {
            let mut nodes = self.nodes.borrow_mut();
            match before.and_then(|b| position_of(&nodes, b)) {
                Some(at) => nodes.insert(at, node.clone()),
                None => nodes.push(node.clone()),
            }
            Ok(node)
        }

        fn remove_child(&self, child: &Node) -> Result<Node, ContainerError> {
            let mut nodes = self.nodes.borrow_mut();
            let at = position_of(&nodes, child).ok_or(ContainerError::NotFound)?;
            Ok(nodes.remove(at))
        }
    }
}
