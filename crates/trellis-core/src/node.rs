//! Opaque node handles and the node-container capability
//!
//! Trellis never looks inside a rendered unit. A [`Node`] is a shared,
//! identity-comparable handle over whatever the host renders into; the host
//! recovers its own type with [`Node::downcast_ref`].

use std::any::Any;
use std::fmt;
use std::rc::Rc;

use crate::ContainerError;

/// Opaque rendered unit, compared by identity
#[derive(Clone)]
pub struct Node {
    inner: Rc<dyn Any>,
}

impl Node {
    pub fn new<T: Any>(value: T) -> Self {
        Node {
            inner: Rc::new(value),
        }
    }

    /// Check whether both handles point at the same node
    #[inline]
    pub fn ptr_eq(&self, other: &Node) -> bool {
        self.addr() == other.addr()
    }

    #[inline]
    pub fn is<T: Any>(&self) -> bool {
        self.inner.is::<T>()
    }

    #[inline]
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.inner.downcast_ref::<T>()
    }

    fn addr(&self) -> *const u8 {
        Rc::as_ptr(&self.inner) as *const u8
    }
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for Node {}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Node({:p})", self.addr())
    }
}

/// Node-container capability.
///
/// Supplied by the host and shared by the components rendering into it. A
/// component never owns its container; it only uses it to insert and remove
/// its own nodes.
pub trait Container {
    fn append_child(&self, node: Node) -> Result<(), ContainerError>;

    /// Insert `node` before `before`, or at the end when `before` is `None`
    fn insert_before(&self, node: Node, before: Option<&Node>) -> Result<Node, ContainerError>;

    /// Remove `child`, failing with [`ContainerError::NotFound`] when it is
    /// not currently contained
    fn remove_child(&self, child: &Node) -> Result<Node, ContainerError>;
}

/// Position of `node` in `nodes`, by identity
pub fn position_of(nodes: &[Node], node: &Node) -> Option<usize> {
    nodes.iter().position(|n| n.ptr_eq(node))
}
