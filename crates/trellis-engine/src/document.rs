//! Document - a node tree plus the handles issued for its nodes

use trellis_dom::{DomTree, NodeId};

use crate::Handle;

/// A document owns one tree. Slot `ROOT` of the handle table holds the
/// document's own handle.
#[derive(Debug, Default)]
pub struct Document {
    tree: DomTree,
    handles: Vec<Option<Handle>>,
}

impl Document {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub fn tree(&self) -> &DomTree {
        &self.tree
    }

    pub(crate) fn tree_mut(&mut self) -> &mut DomTree {
        &mut self.tree
    }

    /// Record the handle issued for `node`
    pub(crate) fn bind(&mut self, node: NodeId, handle: Handle) {
        let index = node.raw() as usize;
        if self.handles.len() <= index {
            self.handles.resize(index + 1, None);
        }
        self.handles[index] = Some(handle);
    }

    pub(crate) fn unbind(&mut self, node: NodeId) -> Option<Handle> {
        self.handles.get_mut(node.raw() as usize).and_then(Option::take)
    }

    /// Handle issued for `node`; the root maps to the document itself
    pub fn handle_of(&self, node: NodeId) -> Option<Handle> {
        self.handles.get(node.raw() as usize).copied().flatten()
    }

    /// Handles of every node (excluding the document itself)
    pub(crate) fn node_handles(&self) -> impl Iterator<Item = Handle> + '_ {
        self.handles.iter().skip(1).filter_map(|h| *h)
    }

    /// Map tree results back to handles
    pub(crate) fn handles_for(&self, nodes: impl IntoIterator<Item = NodeId>) -> Vec<Handle> {
        nodes.into_iter().filter_map(|n| self.handle_of(n)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bind_unbind() {
        let mut doc = Document::new();
        let el = doc.tree_mut().create_element("p");
        let h = Handle::from_raw(5).unwrap();

        assert_eq!(doc.handle_of(el), None);
        doc.bind(el, h);
        assert_eq!(doc.handle_of(el), Some(h));
        assert_eq!(doc.node_handles().collect::<Vec<_>>(), [h]);
        assert_eq!(doc.unbind(el), Some(h));
        assert_eq!(doc.handle_of(el), None);
    }
}
