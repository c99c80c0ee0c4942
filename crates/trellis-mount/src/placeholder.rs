//! Fixed insertion point inside a parent container

use std::rc::Rc;

use async_trait::async_trait;
use trellis_core::{Container, ContainerError, Disposable, Node, TrellisResult};

/// Appends in front of a guide node the placeholder owns in its parent.
///
/// The guide is usually an empty marker such as a comment. Disposing the
/// placeholder removes it.
pub struct Placeholder {
    parent: Rc<dyn Container>,
    guide: Node,
}

impl Placeholder {
    /// Append `guide` to `parent` and use it as the insertion point
    pub fn new(parent: Rc<dyn Container>, guide: Node) -> Result<Self, ContainerError> {
        parent.append_child(guide.clone())?;
        Ok(Placeholder { parent, guide })
    }

    pub fn guide(&self) -> &Node {
        &self.guide
    }
}

impl Container for Placeholder {
    fn append_child(&self, node: Node) -> Result<(), ContainerError> {
        self.parent.insert_before(node, Some(&self.guide))?;
        Ok(())
    }

    fn insert_before(&self, node: Node, before: Option<&Node>) -> Result<Node, ContainerError> {
        self.parent.insert_before(node, before)
    }

    fn remove_child(&self, child: &Node) -> Result<Node, ContainerError> {
        self.parent.remove_child(child)
    }
}

#[async_trait(?Send)]
impl Disposable for Placeholder {
    async fn dispose(&self) -> TrellisResult<()> {
        self.parent.remove_child(&self.guide)?;
        Ok(())
    }
}
