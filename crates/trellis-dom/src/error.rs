//! DOM operation errors

use crate::NodeId;

/// Result type for DOM operations
pub type DomResult<T> = Result<T, DomError>;

/// DOM operation errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DomError {
    #[error("node {0:?} does not exist")]
    InvalidNode(NodeId),

    #[error("appending {child:?} under {parent:?} would create a cycle")]
    CyclicAppend { parent: NodeId, child: NodeId },

    #[error("node {0:?} cannot have children")]
    InvalidParent(NodeId),

    #[error("node {0:?} cannot be inserted as a child")]
    InvalidChild(NodeId),

    #[error("node {child:?} is not a child of {parent:?}")]
    NotAChild { parent: NodeId, child: NodeId },

    #[error("node {0:?} is not an element")]
    NotAnElement(NodeId),

    #[error("node {0:?} is not a text node")]
    NotText(NodeId),
}
