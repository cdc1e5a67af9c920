//! Trellis DOM - Document node tree
//!
//! Arena-backed tree of document, element and text nodes, plus
//! single-token selector queries over it.

mod error;
mod node;
mod selector;
mod tree;

pub use error::{DomError, DomResult};
pub use node::{ElementData, Node, NodeData, NodeKind};
pub use selector::SimpleSelector;
pub use tree::{Descendants, DomTree};

/// Node identifier (index into a tree's arena)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    /// Root node ID. Every tree's root is its document node.
    pub const ROOT: NodeId = NodeId(0);

    /// Build an id from a raw arena index
    #[inline]
    pub const fn from_raw(raw: u32) -> Self {
        NodeId(raw)
    }

    /// Raw arena index
    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }

    #[inline]
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}
