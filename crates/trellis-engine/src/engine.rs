//! Engine - Main entry point
//!
//! Owns the registry and the platform. Every operation takes handles,
//! resolves them (kind-checked) and delegates to the tree, selector or
//! platform code. Nothing here blocks.

use std::collections::HashMap;
use std::time::Instant;

use trellis_dom::{DomError, DomTree, NodeId, NodeKind};

use crate::platform::{HeadlessHandle, HeadlessPlatform, Platform, PlatformEvent, PlatformWindowId, Visibility};
use crate::registry::{Kinded, Registry};
use crate::renderer::RenderKey;
use crate::{
    Application, Config, Document, EngineError, EngineResult, Frame, Handle, NodeRef, NodeTarget,
    Object, ObjectKind, RenderStatus, Renderer, Window,
};

/// Resolve a handle to one concrete object type
macro_rules! typed_access {
    ($(#[$meta:meta])* $get:ident, $get_mut:ident => $variant:ident($ty:ty)) => {
        $(#[$meta])*
        pub fn $get(&self, handle: Handle) -> EngineResult<&$ty> {
            match self.objects.resolve(handle, ObjectKind::$variant)? {
                Object::$variant(value) => Ok(value),
                _ => Err(EngineError::invalid(handle.raw(), Some(ObjectKind::$variant))),
            }
        }

        fn $get_mut(&mut self, handle: Handle) -> EngineResult<&mut $ty> {
            match self.objects.resolve_mut(handle, ObjectKind::$variant)? {
                Object::$variant(value) => Ok(value),
                _ => Err(EngineError::invalid(handle.raw(), Some(ObjectKind::$variant))),
            }
        }
    };
}

/// The Trellis engine
pub struct Engine {
    config: Config,
    objects: Registry<Object>,
    platform: Box<dyn Platform>,
    app_handle: Option<Handle>,
    /// Ticks of every application together; renders are idempotent per step
    tick_epoch: u64,
    windows: HashMap<PlatformWindowId, Handle>,
}

impl Engine {
    /// Create an engine on the headless platform
    pub fn new(config: Config) -> Self {
        Self::with_platform(config, Box::new(HeadlessPlatform::new()))
    }

    /// Create a headless engine and keep a handle on its platform
    pub fn headless(config: Config) -> (Self, HeadlessHandle) {
        let platform = HeadlessPlatform::new();
        let handle = platform.handle();
        (Self::with_platform(config, Box::new(platform)), handle)
    }

    /// Create an engine on a custom platform
    pub fn with_platform(config: Config, platform: Box<dyn Platform>) -> Self {
        tracing::info!("Trellis engine {} initialized", crate::VERSION);
        Self {
            objects: Registry::with_capacity(config.max_objects),
            config,
            platform,
            app_handle: None,
            tick_epoch: 0,
            windows: HashMap::new(),
        }
    }

    /// Get engine configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Number of live objects of every kind
    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    /// Kind of a live object, `None` for unknown or destroyed handles
    pub fn kind_of(&self, handle: Handle) -> Option<ObjectKind> {
        self.objects.kind_of(handle)
    }

    /// Live objects in slot order
    pub fn objects(&self) -> impl Iterator<Item = (Handle, ObjectKind)> + '_ {
        self.objects.iter().map(|(handle, object)| (handle, object.kind()))
    }

    typed_access!(
        /// Resolve an application handle
        app, app_mut => Application(Application)
    );
    typed_access!(
        /// Resolve a window handle
        window, window_mut => Window(Window)
    );
    typed_access!(
        /// Resolve a document handle
        document, document_mut => Document(Document)
    );
    typed_access!(
        /// Resolve a renderer handle
        renderer, renderer_mut => Renderer(Renderer)
    );

    /// Destroy any object.
    ///
    /// Destroying a document destroys its node handles. Destroying a node
    /// detaches it; its children are detached but stay alive.
    pub fn destroy(&mut self, handle: Handle) -> EngineResult<()> {
        let object = self.objects.destroy(handle)?;
        match object {
            Object::Application(_) => {
                if self.app_handle == Some(handle) {
                    self.app_handle = self
                        .objects
                        .iter()
                        .find(|(_, object)| object.kind() == ObjectKind::Application)
                        .map(|(h, _)| h);
                }
            }
            Object::Window(window) => {
                self.windows.remove(&window.platform_id);
                self.platform.destroy_window(window.platform_id);
            }
            Object::Document(document) => {
                let mut count = 0;
                for node in document.node_handles() {
                    if self.objects.destroy(node).is_ok() {
                        count += 1;
                    }
                }
                tracing::debug!("document {:?} dropped with {} nodes", handle, count);
            }
            Object::Node(node) => {
                if let Ok(document) = self.document_mut(node.document) {
                    document.unbind(node.node);
                    if let Err(err) = document.tree_mut().remove(node.node) {
                        tracing::debug!("node {:?} already gone: {}", handle, err);
                    }
                }
            }
            Object::Renderer(_) => {}
        }
        Ok(())
    }

    // ========================================================================
    // Application
    // ========================================================================

    /// Create an application. With [`Config::single_instance_app`] set, only
    /// one may be alive at a time.
    pub fn init_app(&mut self) -> EngineResult<Handle> {
        if let Some(existing) = self.app_handle() {
            if self.config.single_instance_app {
                tracing::warn!("application already initialized as {:?}", existing);
                return Err(EngineError::AlreadyInitialized);
            }
        }

        let handle = self.objects.register(Object::Application(Application::new()))?;
        if self.app_handle().is_none() {
            self.app_handle = Some(handle);
        }
        tracing::info!("application {:?} initialized", handle);
        Ok(handle)
    }

    /// The oldest live application, if any
    pub fn app_handle(&self) -> Option<Handle> {
        self.app_handle.filter(|&h| self.objects.contains(h))
    }

    /// Advance the application by one step and apply pending platform
    /// events to window state
    pub fn tick(&mut self, app: Handle) -> EngineResult<()> {
        let app_state = self.app_mut(app)?;
        app_state.advance(Instant::now());
        let ticks = app_state.tick_count();
        self.tick_epoch = self.tick_epoch.wrapping_add(1);

        let events = self.platform.poll_events();
        let count = events.len();
        for event in events {
            self.apply_event(event);
        }

        tracing::trace!("tick {} ({} events)", ticks, count);
        Ok(())
    }

    fn apply_event(&mut self, event: PlatformEvent) {
        let Some(&handle) = self.windows.get(&event.window()) else {
            tracing::trace!("dropping event for unknown window: {:?}", event);
            return;
        };
        let Ok(window) = self.window_mut(handle) else {
            return;
        };

        match event {
            PlatformEvent::CloseRequested(_) => {
                tracing::debug!("close requested for {:?}", handle);
                window.should_close = true;
            }
            PlatformEvent::Resized { width, height, .. } => {
                window.width = width;
                window.height = height;
            }
            PlatformEvent::Focused { focused, .. } => window.focused = focused,
        }
    }

    /// Interrupt any platform wait so the host loop can tick again
    pub fn wake_up(&mut self, app: Handle) -> EngineResult<()> {
        self.app_mut(app)?.record_wake_up();
        self.platform.wake_up();
        Ok(())
    }

    // ========================================================================
    // Windows
    // ========================================================================

    /// Open a window. Non-positive dimensions fall back to
    /// [`Config::default_window_size`].
    pub fn create_window(&mut self, title: &str, width: i32, height: i32) -> EngineResult<Handle> {
        let (width, height) = self.config.window_size(width, height);
        let platform_id = self.platform.create_window(title, width, height);

        match self.objects.register(Object::Window(Window::new(platform_id, title, width, height))) {
            Ok(handle) => {
                self.windows.insert(platform_id, handle);
                tracing::info!("window {:?} {:?} ({}x{})", handle, title, width, height);
                Ok(handle)
            }
            Err(err) => {
                self.platform.destroy_window(platform_id);
                Err(err)
            }
        }
    }

    pub fn should_close(&self, window: Handle) -> EngineResult<bool> {
        Ok(self.window(window)?.should_close)
    }

    pub fn set_title(&mut self, window: Handle, title: &str) -> EngineResult<()> {
        let state = self.window_mut(window)?;
        state.title = title.to_string();
        let platform_id = state.platform_id;
        self.platform.set_title(platform_id, title);
        Ok(())
    }

    pub fn resize(&mut self, window: Handle, width: i32, height: i32) -> EngineResult<()> {
        let (width, height) = self.config.window_size(width, height);
        let state = self.window_mut(window)?;
        state.width = width;
        state.height = height;
        let platform_id = state.platform_id;
        self.platform.resize(platform_id, width, height);
        Ok(())
    }

    pub fn set_visibility(&mut self, window: Handle, visibility: Visibility) -> EngineResult<()> {
        let state = self.window_mut(window)?;
        state.visibility = visibility;
        let platform_id = state.platform_id;
        self.platform.set_visibility(platform_id, visibility);
        Ok(())
    }

    /// Give a window input focus; every other window loses it
    pub fn focus(&mut self, window: Handle) -> EngineResult<()> {
        let platform_id = self.window(window)?.platform_id;
        self.platform.focus(platform_id);

        let all: Vec<Handle> = self.windows.values().copied().collect();
        for handle in all {
            if let Ok(state) = self.window_mut(handle) {
                state.focused = handle == window;
            }
        }
        Ok(())
    }

    // ========================================================================
    // Documents and nodes
    // ========================================================================

    /// Create an empty document
    pub fn create_document(&mut self) -> EngineResult<Handle> {
        let handle = self.objects.register(Object::Document(Document::new()))?;
        self.document_mut(handle)?.bind(NodeId::ROOT, handle);
        tracing::debug!("document {:?} created", handle);
        Ok(handle)
    }

    /// Create a detached element owned by `document`
    pub fn create_element(&mut self, document: Handle, tag: &str) -> EngineResult<Handle> {
        let node = self.document_mut(document)?.tree_mut().create_element(tag);
        self.register_node(document, node)
    }

    /// Create a detached text node owned by `document`
    pub fn create_text_node(&mut self, document: Handle, text: &str) -> EngineResult<Handle> {
        let node = self.document_mut(document)?.tree_mut().create_text_node(text);
        self.register_node(document, node)
    }

    fn register_node(&mut self, document: Handle, node: NodeId) -> EngineResult<Handle> {
        match self.objects.register(Object::Node(NodeRef { document, node })) {
            Ok(handle) => {
                self.document_mut(document)?.bind(node, handle);
                Ok(handle)
            }
            Err(err) => {
                // roll the tree back so it holds no unreachable node
                if let Ok(doc) = self.document_mut(document) {
                    doc.tree_mut().remove(node).ok();
                }
                Err(err)
            }
        }
    }

    /// Resolve a node or document handle to a tree position
    pub fn target(&self, handle: Handle) -> EngineResult<NodeTarget> {
        match self.objects.get(handle) {
            Some(Object::Document(_)) => Ok(NodeTarget::Document(handle)),
            Some(Object::Node(node)) => Ok(NodeTarget::Node(*node)),
            _ => Err(EngineError::invalid(handle.raw(), Some(ObjectKind::Node))),
        }
    }

    fn locate(&self, handle: Handle) -> EngineResult<(&Document, NodeId)> {
        let target = self.target(handle)?;
        Ok((self.document(target.document())?, target.node()))
    }

    /// Append `child` under `parent` (a node or a document), moving it from
    /// its previous parent
    pub fn append_child(&mut self, parent: Handle, child: Handle) -> EngineResult<()> {
        self.insert_before(parent, child, None)
    }

    /// Insert `child` under `parent` before `reference`, or last when
    /// `reference` is `None`
    pub fn insert_before(
        &mut self,
        parent: Handle,
        child: Handle,
        reference: Option<Handle>,
    ) -> EngineResult<()> {
        let parent_target = self.target(parent)?;
        let child_target = self.target(child)?;
        let document = parent_target.document();
        if child_target.document() != document {
            return Err(EngineError::WrongDocument { parent, child });
        }

        let reference = match reference {
            Some(r) => {
                let target = self.target(r)?;
                if target.document() != document {
                    return Err(EngineError::NotAChild { parent, child: r });
                }
                Some(target.node())
            }
            None => None,
        };

        let doc = self.document_mut(document)?;
        let result = doc
            .tree_mut()
            .insert_before(parent_target.node(), child_target.node(), reference);
        result.map_err(|err| dom_error(doc, err))?;

        tracing::debug!("inserted {:?} under {:?}", child, parent);
        Ok(())
    }

    /// Detach `child` from `parent`. The child stays alive.
    pub fn remove_child(&mut self, parent: Handle, child: Handle) -> EngineResult<()> {
        let parent_target = self.target(parent)?;
        let child_target = self.target(child)?;
        if parent_target.document() != child_target.document() {
            return Err(EngineError::NotAChild { parent, child });
        }

        let doc = self.document_mut(parent_target.document())?;
        let result = doc.tree_mut().remove_child(parent_target.node(), child_target.node());
        result.map_err(|err| dom_error(doc, err))
    }

    /// Canonical handle of a live node or document
    pub fn node_id(&self, handle: Handle) -> EngineResult<Handle> {
        let (doc, node) = self.locate(handle)?;
        doc.handle_of(node)
            .ok_or(EngineError::invalid(handle.raw(), Some(ObjectKind::Node)))
    }

    pub fn node_kind(&self, handle: Handle) -> EngineResult<NodeKind> {
        let (doc, node) = self.locate(handle)?;
        doc.tree()
            .kind(node)
            .ok_or(EngineError::invalid(handle.raw(), Some(ObjectKind::Node)))
    }

    /// Document owning a node (a document owns itself)
    pub fn document_of(&self, handle: Handle) -> EngineResult<Handle> {
        Ok(self.target(handle)?.document())
    }

    fn navigate(
        &self,
        handle: Handle,
        step: impl FnOnce(&DomTree, NodeId) -> Option<NodeId>,
    ) -> EngineResult<Option<Handle>> {
        let (doc, node) = self.locate(handle)?;
        Ok(step(doc.tree(), node).and_then(|n| doc.handle_of(n)))
    }

    pub fn parent_node(&self, handle: Handle) -> EngineResult<Option<Handle>> {
        self.navigate(handle, DomTree::parent)
    }

    pub fn first_child(&self, handle: Handle) -> EngineResult<Option<Handle>> {
        self.navigate(handle, DomTree::first_child)
    }

    pub fn last_child(&self, handle: Handle) -> EngineResult<Option<Handle>> {
        self.navigate(handle, DomTree::last_child)
    }

    pub fn previous_sibling(&self, handle: Handle) -> EngineResult<Option<Handle>> {
        self.navigate(handle, DomTree::prev_sibling)
    }

    pub fn next_sibling(&self, handle: Handle) -> EngineResult<Option<Handle>> {
        self.navigate(handle, DomTree::next_sibling)
    }

    /// Children in order
    pub fn child_nodes(&self, handle: Handle) -> EngineResult<Vec<Handle>> {
        let (doc, node) = self.locate(handle)?;
        Ok(doc.handles_for(doc.tree().children(node)))
    }

    /// Lowercased tag of an element
    pub fn tag_name(&self, handle: Handle) -> EngineResult<&str> {
        let (doc, node) = self.locate(handle)?;
        doc.tree()
            .tag_name(node)
            .ok_or(EngineError::Dom(DomError::NotAnElement(node)))
    }

    /// Data of a text node
    pub fn text(&self, handle: Handle) -> EngineResult<&str> {
        let (doc, node) = self.locate(handle)?;
        doc.tree().text(node).ok_or(EngineError::Dom(DomError::NotText(node)))
    }

    pub fn set_text(&mut self, handle: Handle, data: &str) -> EngineResult<()> {
        let target = self.target(handle)?;
        let doc = self.document_mut(target.document())?;
        let result = doc.tree_mut().set_text(target.node(), data);
        result.map_err(|err| dom_error(doc, err))
    }

    pub fn attribute(&self, handle: Handle, name: &str) -> EngineResult<Option<&str>> {
        let (doc, node) = self.locate(handle)?;
        let element = doc
            .tree()
            .element(node)
            .ok_or(EngineError::Dom(DomError::NotAnElement(node)))?;
        Ok(element.attr(name))
    }

    pub fn set_attribute(&mut self, handle: Handle, name: &str, value: &str) -> EngineResult<()> {
        let target = self.target(handle)?;
        let doc = self.document_mut(target.document())?;
        let result = doc.tree_mut().set_attribute(target.node(), name, value);
        result.map_err(|err| dom_error(doc, err))
    }

    /// Remove an attribute, returning its old value
    pub fn remove_attribute(&mut self, handle: Handle, name: &str) -> EngineResult<Option<String>> {
        let target = self.target(handle)?;
        let doc = self.document_mut(target.document())?;
        let result = doc.tree_mut().remove_attribute(target.node(), name);
        result.map_err(|err| dom_error(doc, err))
    }

    // ========================================================================
    // Selectors
    // ========================================================================

    /// First descendant of `root` matching `selector`, in document order.
    /// Against a document handle the scan also covers nodes that were
    /// created but never attached, after the attached tree.
    pub fn query_selector(&self, root: Handle, selector: &str) -> EngineResult<Option<Handle>> {
        let (doc, node) = self.locate(root)?;
        Ok(doc
            .tree()
            .query_selector(node, selector)
            .and_then(|n| doc.handle_of(n)))
    }

    /// Every descendant of `root` matching `selector`, in document order
    pub fn query_selector_all(&self, root: Handle, selector: &str) -> EngineResult<Vec<Handle>> {
        let (doc, node) = self.locate(root)?;
        Ok(doc.handles_for(doc.tree().query_selector_all(node, selector)))
    }

    pub fn matches(&self, handle: Handle, selector: &str) -> EngineResult<bool> {
        let (doc, node) = self.locate(handle)?;
        Ok(doc.tree().matches(node, selector))
    }

    // ========================================================================
    // Rendering
    // ========================================================================

    /// Bind a document to a window
    pub fn create_renderer(&mut self, document: Handle, window: Handle) -> EngineResult<Handle> {
        self.document(document)?;
        self.window(window)?;
        let handle = self.objects.register(Object::Renderer(Renderer::new(document, window)))?;
        tracing::debug!("renderer {:?} for {:?} -> {:?}", handle, document, window);
        Ok(handle)
    }

    /// Present the document in the window. Rendering again within the same
    /// tick, with no tree change and no resize, does nothing.
    pub fn render(&mut self, renderer: Handle) -> EngineResult<RenderStatus> {
        let (document, window, last) = {
            let r = self.renderer(renderer)?;
            (r.document, r.window, r.last)
        };
        let stale = || EngineError::invalid(renderer.raw(), Some(ObjectKind::Renderer));
        let tick = self.tick_epoch;

        let doc = self.document(document).map_err(|_| stale())?;
        let win = self.window(window).map_err(|_| stale())?;
        let key = RenderKey {
            tick,
            tree_generation: doc.tree().generation(),
            size: win.size(),
        };
        if last == Some(key) {
            return Ok(RenderStatus::Unchanged);
        }

        let frame = Frame::build(doc.tree(), win.width(), win.height());
        let platform_id = win.platform_id();
        self.platform.present(platform_id, &frame);

        self.window_mut(window)?.frames_presented += 1;
        self.renderer_mut(renderer)?.last = Some(key);
        tracing::debug!("renderer {:?} presented {} items", renderer, frame.items.len());
        Ok(RenderStatus::Presented)
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        for &platform_id in self.windows.keys() {
            self.platform.destroy_window(platform_id);
        }
        tracing::info!("Trellis engine shut down ({} live objects)", self.objects.len());
    }
}

/// Translate tree errors into handle terms
fn dom_error(doc: &Document, err: DomError) -> EngineError {
    let handle = |id: NodeId| doc.handle_of(id);
    let mapped = match err {
        DomError::CyclicAppend { parent, child } => handle(parent)
            .zip(handle(child))
            .map(|(parent, child)| EngineError::CyclicAppend { parent, child }),
        DomError::NotAChild { parent, child } => handle(parent)
            .zip(handle(child))
            .map(|(parent, child)| EngineError::NotAChild { parent, child }),
        DomError::InvalidParent(id) => handle(id).map(EngineError::InvalidParent),
        DomError::InvalidChild(id) => handle(id).map(EngineError::InvalidChild),
        DomError::InvalidNode(_) | DomError::NotAnElement(_) | DomError::NotText(_) => None,
    };
    mapped.unwrap_or(EngineError::Dom(err))
}
