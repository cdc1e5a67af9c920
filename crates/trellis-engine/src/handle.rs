//! Handles - opaque object identifiers
//!
//! A handle packs a registry slot index and that slot's generation into one
//! `u32`. The raw value 0 never names an object and is used as the
//! "no object" sentinel at the C boundary.
//!
//! ```text
//!  31        22 21                   0
//! +------------+----------------------+
//! | generation |   slot index + 1     |
//! +------------+----------------------+
//! ```

use std::fmt;
use std::num::NonZeroU32;

/// Opaque, copyable identifier of an engine-owned object
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct Handle(NonZeroU32);

impl Handle {
    /// Bits used for the slot index
    pub const INDEX_BITS: u32 = 22;
    const INDEX_MASK: u32 = (1 << Self::INDEX_BITS) - 1;

    /// Highest generation a slot can reach before it is retired
    pub const MAX_GENERATION: u32 = u32::MAX >> Self::INDEX_BITS;

    /// Number of addressable slots
    pub const MAX_SLOTS: u32 = Self::INDEX_MASK;

    #[inline]
    pub(crate) fn new(slot: u32, generation: u32) -> Self {
        debug_assert!(slot < Self::MAX_SLOTS);
        debug_assert!(generation <= Self::MAX_GENERATION);
        // slot + 1 fits in the index bits, so the add never carries
        Handle(NonZeroU32::MIN.saturating_add((generation << Self::INDEX_BITS) | slot))
    }

    /// Reinterpret a raw value received from outside the engine.
    ///
    /// Returns `None` for the sentinel 0 and for values that cannot have been
    /// issued (empty index bits).
    pub fn from_raw(raw: u32) -> Option<Self> {
        if raw & Self::INDEX_MASK == 0 {
            return None;
        }
        NonZeroU32::new(raw).map(Handle)
    }

    /// Raw value for handing across the boundary
    #[inline]
    pub fn raw(self) -> u32 {
        self.0.get()
    }

    /// Raw value of an optional handle, 0 for `None`
    #[inline]
    pub fn raw_or_zero(handle: Option<Self>) -> u32 {
        handle.map_or(0, Self::raw)
    }

    #[inline]
    pub(crate) fn slot(self) -> u32 {
        (self.0.get() & Self::INDEX_MASK) - 1
    }

    #[inline]
    pub(crate) fn generation(self) -> u32 {
        self.0.get() >> Self::INDEX_BITS
    }
}

impl fmt::Debug for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Handle({}v{})", self.slot(), self.generation())
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.raw())
    }
}

/// Kind of object a handle refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    Application,
    Window,
    Document,
    Node,
    Renderer,
}

impl ObjectKind {
    pub fn name(self) -> &'static str {
        match self {
            Self::Application => "application",
            Self::Window => "window",
            Self::Document => "document",
            Self::Node => "node",
            Self::Renderer => "renderer",
        }
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
