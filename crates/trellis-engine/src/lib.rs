//! Trellis Engine
//!
//! Native UI engine core driven through opaque handles.
//!
//! Every engine-owned object (application, window, document, node,
//! renderer) lives in one generational [`Registry`]. Callers only hold
//! [`Handle`]s, which can be passed across a C boundary as plain `u32`s.
//!
//! # Example
//! ```rust
//! use trellis_engine::{Config, Engine};
//!
//! let mut engine = Engine::new(Config::default());
//! let app = engine.init_app()?;
//! let window = engine.create_window("Hello", 640, 480)?;
//! let doc = engine.create_document()?;
//! let div = engine.create_element(doc, "div")?;
//! let text = engine.create_text_node(doc, "Hello")?;
//! engine.append_child(div, text)?;
//! engine.append_child(doc, div)?;
//!
//! let renderer = engine.create_renderer(doc, window)?;
//! engine.tick(app)?;
//! engine.render(renderer)?;
//! assert_eq!(engine.query_selector(doc, "div")?, Some(div));
//! # Ok::<(), trellis_engine::EngineError>(())
//! ```

mod app;
mod config;
mod document;
mod engine;
mod error;
mod handle;
mod object;
pub mod platform;
pub mod registry;
mod renderer;
mod window;

pub use app::Application;
pub use config::{Config, LOG_ENV, MAX_OBJECTS_ENV};
pub use document::Document;
pub use engine::Engine;
pub use error::{EngineError, EngineResult};
pub use handle::{Handle, ObjectKind};
pub use object::{NodeRef, NodeTarget, Object};
pub use platform::{HeadlessHandle, HeadlessPlatform, Platform, PlatformEvent, PlatformWindowId, Visibility};
pub use registry::{Kinded, Registry};
pub use renderer::{DisplayItem, Frame, RenderStatus, Renderer};
pub use window::Window;

// Re-export the tree crate for advanced usage
pub use trellis_dom as dom;
pub use trellis_dom::{NodeId, NodeKind};

/// Engine version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
