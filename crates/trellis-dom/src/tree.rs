//! DOM Tree (arena-based allocation)
//!
//! Slot 0 always holds the document node. Freed slots are recycled; callers
//! that need identities stable across removal keep their own mapping on top
//! of `NodeId` (the engine registry does).

use crate::{DomError, DomResult, ElementData, Node, NodeId, NodeKind};

/// Arena-based DOM tree
#[derive(Debug, Clone)]
pub struct DomTree {
    nodes: Vec<Option<Node>>,
    free: Vec<u32>,
    live: usize,
    /// Bumped on every mutation
    generation: u64,
}

impl DomTree {
    /// Create a tree holding only its document node
    pub fn new() -> Self {
        Self {
            nodes: vec![Some(Node::document())],
            free: Vec::new(),
            live: 1,
            generation: 0,
        }
    }

    /// The document node
    #[inline]
    pub fn root(&self) -> NodeId {
        NodeId::ROOT
    }

    /// Get a node by ID
    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.index()).and_then(Option::as_ref)
    }

    fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id.index()).and_then(Option::as_mut)
    }

    fn node(&self, id: NodeId) -> DomResult<&Node> {
        self.get(id).ok_or(DomError::InvalidNode(id))
    }

    fn node_mut(&mut self, id: NodeId) -> DomResult<&mut Node> {
        self.get_mut(id).ok_or(DomError::InvalidNode(id))
    }

    /// Check whether `id` names a live node
    pub fn contains(&self, id: NodeId) -> bool {
        self.get(id).is_some()
    }

    /// Number of live nodes, the document node included
    pub fn node_count(&self) -> usize {
        self.live
    }

    /// Mutation counter. Equal generations mean an identical tree.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    fn bump(&mut self) {
        self.generation = self.generation.wrapping_add(1);
    }

    fn alloc(&mut self, node: Node) -> NodeId {
        self.live += 1;
        self.bump();

        if let Some(index) = self.free.pop() {
            self.nodes[index as usize] = Some(node);
            NodeId(index)
        } else {
            let id = NodeId(self.nodes.len() as u32);
            self.nodes.push(Some(node));
            id
        }
    }

    /// Create a detached element
    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.alloc(Node::element(tag))
    }

    /// Create a detached text node
    pub fn create_text_node(&mut self, text: &str) -> NodeId {
        self.alloc(Node::text(text))
    }

    // ------------------------------------------------------------------
    // Mutation
    // ------------------------------------------------------------------

    /// Append `child` as the last child of `parent`, detaching it from its
    /// current parent first.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> DomResult<()> {
        self.insert_before(parent, child, None)
    }

    /// Insert `child` before `reference` (or last when `reference` is None).
    ///
    /// Fails without touching the tree when `parent` is a text node, when
    /// `child` is the document node, or when `child` is `parent` or one of its
    /// ancestors.
    pub fn insert_before(
        &mut self,
        parent: NodeId,
        child: NodeId,
        reference: Option<NodeId>,
    ) -> DomResult<()> {
        self.check_insert(parent, child)?;

        if let Some(reference) = reference {
            if self.node(reference)?.parent != Some(parent) {
                return Err(DomError::NotAChild { parent, child: reference });
            }
            // inserting a node before itself keeps it where it is
            if reference == child {
                return Ok(());
            }
        }

        self.unlink(child);

        let siblings = &mut self.node_mut(parent)?.children;
        let index = reference
            .and_then(|r| siblings.iter().position(|&c| c == r))
            .unwrap_or(siblings.len());
        siblings.insert(index, child);

        self.node_mut(child)?.parent = Some(parent);
        self.bump();

        tracing::trace!("inserted {:?} under {:?} at {}", child, parent, index);
        Ok(())
    }

    fn check_insert(&self, parent: NodeId, child: NodeId) -> DomResult<()> {
        let parent_node = self.node(parent)?;
        let child_node = self.node(child)?;

        if !parent_node.can_have_children() {
            return Err(DomError::InvalidParent(parent));
        }
        if child_node.kind() == NodeKind::Document {
            return Err(DomError::InvalidChild(child));
        }
        if self.is_inclusive_ancestor(child, parent) {
            return Err(DomError::CyclicAppend { parent, child });
        }
        Ok(())
    }

    /// Remove `child` from `parent`. The child stays alive, detached.
    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) -> DomResult<()> {
        self.node(parent)?;
        if self.node(child)?.parent != Some(parent) {
            return Err(DomError::NotAChild { parent, child });
        }
        self.unlink(child);
        Ok(())
    }

    /// Detach a node from its parent, if it has one
    pub fn detach(&mut self, id: NodeId) -> DomResult<()> {
        self.node(id)?;
        self.unlink(id);
        Ok(())
    }

    fn unlink(&mut self, child: NodeId) {
        let Some(parent) = self.get(child).and_then(|n| n.parent) else {
            return;
        };

        if let Some(p) = self.get_mut(parent) {
            p.children.retain(|&c| c != child);
        }
        if let Some(c) = self.get_mut(child) {
            c.parent = None;
        }
        self.bump();
    }

    /// Free a node. It is detached from its parent and its children are
    /// detached (they stay alive). The document node cannot be removed.
    pub fn remove(&mut self, id: NodeId) -> DomResult<Node> {
        if id == NodeId::ROOT {
            return Err(DomError::InvalidNode(id));
        }
        self.node(id)?;
        self.unlink(id);

        let mut node = self.nodes[id.index()].take().ok_or(DomError::InvalidNode(id))?;
        for child in std::mem::take(&mut node.children) {
            if let Some(c) = self.get_mut(child) {
                c.parent = None;
            }
        }

        self.free.push(id.0);
        self.live -= 1;
        self.bump();

        tracing::trace!("removed {:?}", id);
        Ok(node)
    }

    // ------------------------------------------------------------------
    // Navigation
    // ------------------------------------------------------------------

    /// True when `ancestor` is `node` or one of its ancestors
    pub fn is_inclusive_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.get(id).and_then(|n| n.parent);
        }
        false
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.get(id)?.parent
    }

    /// Children of `id` in insertion order (empty for unknown ids)
    pub fn children(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.get(id)
            .map(|n| n.children.as_slice())
            .unwrap_or(&[])
            .iter()
            .copied()
    }

    pub fn first_child(&self, id: NodeId) -> Option<NodeId> {
        self.get(id)?.children.first().copied()
    }

    pub fn last_child(&self, id: NodeId) -> Option<NodeId> {
        self.get(id)?.children.last().copied()
    }

    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        let siblings = &self.get(self.parent(id)?)?.children;
        let index = siblings.iter().position(|&c| c == id)?;
        siblings.get(index + 1).copied()
    }

    pub fn prev_sibling(&self, id: NodeId) -> Option<NodeId> {
        let siblings = &self.get(self.parent(id)?)?.children;
        let index = siblings.iter().position(|&c| c == id)?;
        siblings.get(index.checked_sub(1)?).copied()
    }

    /// Pre-order depth-first walk over the descendants of `root`
    /// (`root` itself excluded).
    pub fn descendants(&self, root: NodeId) -> Descendants<'_> {
        let stack = self
            .get(root)
            .map(|n| n.children.iter().rev().copied().collect())
            .unwrap_or_default();
        Descendants { tree: self, stack }
    }

    /// Every node the tree owns apart from the document: the attached tree
    /// in pre-order, then each detached subtree in slot order.
    pub fn owned_nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        let detached = self
            .nodes
            .iter()
            .enumerate()
            .skip(1)
            .filter(|(_, node)| node.as_ref().is_some_and(|n| n.parent.is_none()))
            .map(|(index, _)| NodeId(index as u32));
        self.descendants(NodeId::ROOT)
            .chain(detached.flat_map(move |id| std::iter::once(id).chain(self.descendants(id))))
    }

    // ------------------------------------------------------------------
    // Node data
    // ------------------------------------------------------------------

    pub fn kind(&self, id: NodeId) -> Option<NodeKind> {
        self.get(id).map(Node::kind)
    }

    pub fn element(&self, id: NodeId) -> Option<&ElementData> {
        self.get(id)?.as_element()
    }

    pub fn tag_name(&self, id: NodeId) -> Option<&str> {
        self.element(id).map(ElementData::tag)
    }

    pub fn text(&self, id: NodeId) -> Option<&str> {
        self.get(id)?.as_text()
    }

    /// Replace the data of a text node
    pub fn set_text(&mut self, id: NodeId, data: &str) -> DomResult<()> {
        match &mut self.node_mut(id)?.data {
            crate::NodeData::Text(text) => *text = data.to_string(),
            _ => return Err(DomError::NotText(id)),
        }
        self.bump();
        Ok(())
    }

    pub fn attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        self.element(id)?.attr(name)
    }

    pub fn set_attribute(&mut self, id: NodeId, name: &str, value: &str) -> DomResult<()> {
        self.node_mut(id)?
            .as_element_mut()
            .ok_or(DomError::NotAnElement(id))?
            .set_attr(name, value);
        self.bump();
        Ok(())
    }

    /// Remove an attribute. Returns the old value, if any.
    pub fn remove_attribute(&mut self, id: NodeId, name: &str) -> DomResult<Option<String>> {
        let old = self
            .node_mut(id)?
            .as_element_mut()
            .ok_or(DomError::NotAnElement(id))?
            .remove_attr(name);
        if old.is_some() {
            self.bump();
        }
        Ok(old)
    }
}

impl Default for DomTree {
    fn default() -> Self {
        Self::new()
    }
}

/// Pre-order iterator over a subtree, see [`DomTree::descendants`]
#[derive(Debug)]
pub struct Descendants<'a> {
    tree: &'a DomTree,
    stack: Vec<NodeId>,
}

impl Iterator for Descendants<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let id = self.stack.pop()?;
        if let Some(node) = self.tree.get(id) {
            self.stack.extend(node.children.iter().rev().copied());
        }
        Some(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_tree_has_document_root() {
        let tree = DomTree::new();
        assert_eq!(tree.kind(tree.root()), Some(NodeKind::Document));
        assert_eq!(tree.node_count(), 1);
        assert_eq!(tree.first_child(tree.root()), None);
    }

    #[test]
    fn test_append_and_siblings() {
        let mut tree = DomTree::new();
        let root = tree.root();
        let a = tree.create_element("a");
        let b = tree.create_element("b");
        let c = tree.create_element("c");

        tree.append_child(root, a).unwrap();
        tree.append_child(root, b).unwrap();
        tree.append_child(root, c).unwrap();

        assert_eq!(tree.children(root).collect::<Vec<_>>(), [a, b, c]);
        assert_eq!(tree.next_sibling(a), Some(b));
        assert_eq!(tree.prev_sibling(a), None);
        assert_eq!(tree.prev_sibling(c), Some(b));
        assert_eq!(tree.next_sibling(c), None);
        assert_eq!(tree.parent(b), Some(root));
    }

    #[test]
    fn test_reappend_moves_child() {
        let mut tree = DomTree::new();
        let p1 = tree.create_element("p");
        let p2 = tree.create_element("p");
        let span = tree.create_element("span");

        tree.append_child(p1, span).unwrap();
        tree.append_child(p2, span).unwrap();

        assert_eq!(tree.parent(span), Some(p2));
        assert_eq!(tree.children(p1).count(), 0);
        assert_eq!(tree.children(p2).collect::<Vec<_>>(), [span]);
    }

    #[test]
    fn test_cycle_rejected_and_tree_unchanged() {
        let mut tree = DomTree::new();
        let outer = tree.create_element("div");
        let inner = tree.create_element("div");
        tree.append_child(outer, inner).unwrap();
        let generation = tree.generation();

        assert_eq!(
            tree.append_child(inner, outer),
            Err(DomError::CyclicAppend { parent: inner, child: outer })
        );
        assert_eq!(
            tree.append_child(outer, outer),
            Err(DomError::CyclicAppend { parent: outer, child: outer })
        );
        assert_eq!(tree.parent(inner), Some(outer));
        assert_eq!(tree.parent(outer), None);
        assert_eq!(tree.generation(), generation);
    }

    #[test]
    fn test_text_cannot_be_parent() {
        let mut tree = DomTree::new();
        let text = tree.create_text_node("hi");
        let div = tree.create_element("div");

        assert_eq!(tree.append_child(text, div), Err(DomError::InvalidParent(text)));
        assert_eq!(tree.parent(div), None);
    }

    #[test]
    fn test_document_cannot_be_child() {
        let mut tree = DomTree::new();
        let div = tree.create_element("div");
        let root = tree.root();

        assert_eq!(tree.append_child(div, root), Err(DomError::InvalidChild(root)));
    }

    #[test]
    fn test_insert_before() {
        let mut tree = DomTree::new();
        let ul = tree.create_element("ul");
        let a = tree.create_element("li");
        let b = tree.create_element("li");
        let c = tree.create_element("li");

        tree.append_child(ul, c).unwrap();
        tree.insert_before(ul, a, Some(c)).unwrap();
        tree.insert_before(ul, b, Some(c)).unwrap();
        assert_eq!(tree.children(ul).collect::<Vec<_>>(), [a, b, c]);

        // reference that is the child itself is a no-op
        tree.insert_before(ul, b, Some(b)).unwrap();
        assert_eq!(tree.children(ul).collect::<Vec<_>>(), [a, b, c]);

        // move within the same parent
        tree.insert_before(ul, c, Some(a)).unwrap();
        assert_eq!(tree.children(ul).collect::<Vec<_>>(), [c, a, b]);
    }

    #[test]
    fn test_insert_before_foreign_reference() {
        let mut tree = DomTree::new();
        let ul = tree.create_element("ul");
        let li = tree.create_element("li");
        let stray = tree.create_element("li");

        assert_eq!(
            tree.insert_before(ul, li, Some(stray)),
            Err(DomError::NotAChild { parent: ul, child: stray })
        );
    }

    #[test]
    fn test_remove_child() {
        let mut tree = DomTree::new();
        let div = tree.create_element("div");
        let text = tree.create_text_node("x");
        tree.append_child(div, text).unwrap();

        tree.remove_child(div, text).unwrap();
        assert_eq!(tree.parent(text), None);
        assert!(tree.contains(text));
        assert_eq!(
            tree.remove_child(div, text),
            Err(DomError::NotAChild { parent: div, child: text })
        );
    }

    #[test]
    fn test_remove_detaches_children() {
        let mut tree = DomTree::new();
        let root = tree.root();
        let div = tree.create_element("div");
        let span = tree.create_element("span");
        tree.append_child(root, div).unwrap();
        tree.append_child(div, span).unwrap();

        let removed = tree.remove(div).unwrap();
        assert!(removed.is_element());
        assert!(!tree.contains(div));
        assert!(tree.contains(span));
        assert_eq!(tree.parent(span), None);
        assert_eq!(tree.children(root).count(), 0);
        assert_eq!(tree.node_count(), 2);

        assert_eq!(tree.remove(root).unwrap_err(), DomError::InvalidNode(root));
    }

    #[test]
    fn test_slot_reuse() {
        let mut tree = DomTree::new();
        let a = tree.create_element("a");
        tree.remove(a).unwrap();
        let b = tree.create_element("b");

        assert_eq!(a, b);
        assert_eq!(tree.tag_name(b), Some("b"));
    }

    #[test]
    fn test_descendants_preorder() {
        let mut tree = DomTree::new();
        let root = tree.root();
        let a = tree.create_element("a");
        let a1 = tree.create_element("a1");
        let a2 = tree.create_element("a2");
        let b = tree.create_element("b");
        tree.append_child(root, a).unwrap();
        tree.append_child(a, a1).unwrap();
        tree.append_child(a, a2).unwrap();
        tree.append_child(root, b).unwrap();

        assert_eq!(tree.descendants(root).collect::<Vec<_>>(), [a, a1, a2, b]);
        assert_eq!(tree.descendants(a).collect::<Vec<_>>(), [a1, a2]);
    }

    #[test]
    fn test_owned_nodes_attached_then_detached() {
        let mut tree = DomTree::new();
        let root = tree.root();
        let loose = tree.create_element("loose");
        let a = tree.create_element("a");
        let inner = tree.create_text_node("inner");
        let orphan = tree.create_element("orphan");
        tree.append_child(root, a).unwrap();
        tree.append_child(loose, inner).unwrap();

        assert_eq!(tree.owned_nodes().collect::<Vec<_>>(), [a, loose, inner, orphan]);

        tree.remove_child(root, a).unwrap();
        assert_eq!(tree.owned_nodes().collect::<Vec<_>>(), [loose, inner, a, orphan]);
    }

    #[test]
    fn test_text_and_attributes() {
        let mut tree = DomTree::new();
        let text = tree.create_text_node("hello");
        let div = tree.create_element("div");

        tree.set_text(text, "hello world").unwrap();
        assert_eq!(tree.text(text), Some("hello world"));
        assert_eq!(tree.set_text(div, "x"), Err(DomError::NotText(div)));

        tree.set_attribute(div, "id", "main").unwrap();
        assert_eq!(tree.attribute(div, "id"), Some("main"));
        assert_eq!(tree.set_attribute(text, "id", "x"), Err(DomError::NotAnElement(text)));
        assert_eq!(tree.remove_attribute(div, "id").unwrap().as_deref(), Some("main"));
        assert_eq!(tree.attribute(div, "id"), None);
    }
}
