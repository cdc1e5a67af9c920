//! Engine errors

use crate::{Handle, ObjectKind};
use trellis_dom::DomError;

/// Result type for engine operations
pub type EngineResult<T> = Result<T, EngineError>;

/// Engine error
///
/// Every variant is recoverable: a bad call from outside the engine is
/// reported, never fatal.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    /// Unknown, destroyed, or wrong-kind handle
    #[error("invalid {} handle {handle:#x}", kind_label(.expected))]
    InvalidHandle { handle: u32, expected: Option<ObjectKind> },

    #[error("appending {child:?} under {parent:?} would create a cycle")]
    CyclicAppend { parent: Handle, child: Handle },

    #[error("{0:?} cannot have children")]
    InvalidParent(Handle),

    #[error("{0:?} cannot be inserted as a child")]
    InvalidChild(Handle),

    #[error("{child:?} is not a child of {parent:?}")]
    NotAChild { parent: Handle, child: Handle },

    #[error("{parent:?} and {child:?} belong to different documents")]
    WrongDocument { parent: Handle, child: Handle },

    #[error("application already initialized")]
    AlreadyInitialized,

    #[error("registry is full ({capacity} live objects)")]
    RegistryFull { capacity: usize },

    #[error(transparent)]
    Dom(#[from] DomError),
}

impl EngineError {
    pub(crate) fn invalid(handle: u32, expected: Option<ObjectKind>) -> Self {
        Self::InvalidHandle { handle, expected }
    }
}

fn kind_label(expected: &Option<ObjectKind>) -> &'static str {
    expected.map_or("object", ObjectKind::name)
}
