//! Registry objects

use trellis_dom::NodeId;

use crate::registry::Kinded;
use crate::{Application, Document, Handle, ObjectKind, Renderer, Window};

/// Everything the engine hands out a handle for
#[derive(Debug)]
pub enum Object {
    Application(Application),
    Window(Window),
    Document(Document),
    Node(NodeRef),
    Renderer(Renderer),
}

impl Kinded for Object {
    fn kind(&self) -> ObjectKind {
        match self {
            Self::Application(_) => ObjectKind::Application,
            Self::Window(_) => ObjectKind::Window,
            Self::Document(_) => ObjectKind::Document,
            Self::Node(_) => ObjectKind::Node,
            Self::Renderer(_) => ObjectKind::Renderer,
        }
    }
}

/// Registry entry for a node: the owning document and the node's place in
/// that document's tree
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeRef {
    pub document: Handle,
    pub node: NodeId,
}

/// Something that can act as a tree position: a document stands for its
/// root node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeTarget {
    Document(Handle),
    Node(NodeRef),
}

impl NodeTarget {
    /// Handle of the document owning the target
    pub fn document(self) -> Handle {
        match self {
            Self::Document(document) => document,
            Self::Node(node) => node.document,
        }
    }

    /// Position in the document's tree
    pub fn node(self) -> NodeId {
        match self {
            Self::Document(_) => NodeId::ROOT,
            Self::Node(node) => node.node,
        }
    }
}
