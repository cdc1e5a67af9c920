//! Renderer - turns a document into a frame for a window
//!
//! No layout or rasterization happens here: a [`Frame`] is a flat display
//! list in document order, which the platform is free to draw however it
//! likes.

use trellis_dom::{DomTree, NodeData, NodeId};

use crate::Handle;

/// Display list item
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisplayItem {
    /// Element box. `depth` is 1 for children of the document.
    Box { tag: String, depth: u32 },
    Text { text: String, depth: u32 },
}

/// One presented frame
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    pub items: Vec<DisplayItem>,
}

impl Frame {
    /// Build the display list for `tree`, pre-order, children in order
    pub fn build(tree: &DomTree, width: u32, height: u32) -> Self {
        let mut items = Vec::new();
        let mut stack: Vec<(NodeId, u32)> = tree.children(tree.root()).map(|c| (c, 1)).collect();
        stack.reverse();

        while let Some((id, depth)) = stack.pop() {
            let Some(node) = tree.get(id) else { continue };
            match node.data() {
                NodeData::Element(el) => items.push(DisplayItem::Box {
                    tag: el.tag().to_string(),
                    depth,
                }),
                NodeData::Text(text) => items.push(DisplayItem::Text {
                    text: text.clone(),
                    depth,
                }),
                NodeData::Document => {}
            }
            stack.extend(node.children().iter().rev().map(|&c| (c, depth + 1)));
        }

        Self { width, height, items }
    }

    /// Concatenated text content
    pub fn text(&self) -> String {
        self.items
            .iter()
            .filter_map(|item| match item {
                DisplayItem::Text { text, .. } => Some(text.as_str()),
                DisplayItem::Box { .. } => None,
            })
            .collect()
    }
}

/// Outcome of [`crate::Engine::render`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderStatus {
    /// A new frame was handed to the platform
    Presented,
    /// Nothing changed since the last frame this tick
    Unchanged,
}

/// Inputs a frame depends on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct RenderKey {
    pub tick: u64,
    pub tree_generation: u64,
    pub size: (u32, u32),
}

/// Binds one document to one window
#[derive(Debug)]
pub struct Renderer {
    pub(crate) document: Handle,
    pub(crate) window: Handle,
    pub(crate) last: Option<RenderKey>,
}

impl Renderer {
    pub(crate) fn new(document: Handle, window: Handle) -> Self {
        Self { document, window, last: None }
    }

    pub fn document(&self) -> Handle {
        self.document
    }

    pub fn window(&self) -> Handle {
        self.window
    }
}
