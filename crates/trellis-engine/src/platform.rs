//! Platform seam
//!
//! Everything the engine needs from a window system goes through
//! [`Platform`]. [`HeadlessPlatform`] keeps windows in memory and lets an
//! embedder (or a test) inject events through a [`HeadlessHandle`].

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::Frame;

/// Platform-side window identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PlatformWindowId(pub u64);

/// Window visibility state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Visibility {
    #[default]
    Shown,
    Hidden,
    Minimized,
    Maximized,
}

/// Event reported by the platform, drained on every tick
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlatformEvent {
    CloseRequested(PlatformWindowId),
    Resized { window: PlatformWindowId, width: u32, height: u32 },
    Focused { window: PlatformWindowId, focused: bool },
}

/// Window-system integration
pub trait Platform: Send {
    fn create_window(&mut self, title: &str, width: u32, height: u32) -> PlatformWindowId;
    fn destroy_window(&mut self, window: PlatformWindowId);
    fn set_title(&mut self, window: PlatformWindowId, title: &str);
    fn resize(&mut self, window: PlatformWindowId, width: u32, height: u32);
    fn set_visibility(&mut self, window: PlatformWindowId, visibility: Visibility);
    fn focus(&mut self, window: PlatformWindowId);

    /// Pending events. Must not block.
    fn poll_events(&mut self) -> Vec<PlatformEvent>;

    /// Show a rendered frame in a window
    fn present(&mut self, window: PlatformWindowId, frame: &Frame);

    /// Interrupt whatever wait the platform may be in
    fn wake_up(&mut self);
}

// ============================================================================
// Headless platform
// ============================================================================

/// In-memory window state
#[derive(Debug, Clone, Default)]
pub struct HeadlessWindow {
    pub title: String,
    pub width: u32,
    pub height: u32,
    pub visibility: Visibility,
    pub focused: bool,
    pub presented: u64,
    pub last_frame: Option<Frame>,
}

#[derive(Debug, Default)]
struct HeadlessState {
    next_id: u64,
    windows: HashMap<PlatformWindowId, HeadlessWindow>,
    pending: VecDeque<PlatformEvent>,
    wakeups: u64,
}

/// Platform without a window system
#[derive(Debug, Default)]
pub struct HeadlessPlatform {
    state: Arc<Mutex<HeadlessState>>,
}

/// Shared view of a [`HeadlessPlatform`]
#[derive(Debug, Clone)]
pub struct HeadlessHandle {
    state: Arc<Mutex<HeadlessState>>,
}

fn lock(state: &Mutex<HeadlessState>) -> MutexGuard<'_, HeadlessState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

impl HeadlessPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle for injecting events and inspecting windows
    pub fn handle(&self) -> HeadlessHandle {
        HeadlessHandle { state: Arc::clone(&self.state) }
    }
}

impl Platform for HeadlessPlatform {
    fn create_window(&mut self, title: &str, width: u32, height: u32) -> PlatformWindowId {
        let mut state = lock(&self.state);
        state.next_id += 1;
        let id = PlatformWindowId(state.next_id);
        state.windows.insert(id, HeadlessWindow {
            title: title.to_string(),
            width,
            height,
            ..Default::default()
        });
        id
    }

    fn destroy_window(&mut self, window: PlatformWindowId) {
        let mut state = lock(&self.state);
        state.windows.remove(&window);
        state.pending.retain(|event| event.window() != window);
    }

    fn set_title(&mut self, window: PlatformWindowId, title: &str) {
        if let Some(w) = lock(&self.state).windows.get_mut(&window) {
            w.title = title.to_string();
        }
    }

    fn resize(&mut self, window: PlatformWindowId, width: u32, height: u32) {
        if let Some(w) = lock(&self.state).windows.get_mut(&window) {
            w.width = width;
            w.height = height;
        }
    }

    fn set_visibility(&mut self, window: PlatformWindowId, visibility: Visibility) {
        if let Some(w) = lock(&self.state).windows.get_mut(&window) {
            w.visibility = visibility;
        }
    }

    fn focus(&mut self, window: PlatformWindowId) {
        let mut state = lock(&self.state);
        for (id, w) in state.windows.iter_mut() {
            w.focused = *id == window;
        }
    }

    fn poll_events(&mut self) -> Vec<PlatformEvent> {
        lock(&self.state).pending.drain(..).collect()
    }

    fn present(&mut self, window: PlatformWindowId, frame: &Frame) {
        if let Some(w) = lock(&self.state).windows.get_mut(&window) {
            w.presented += 1;
            w.last_frame = Some(frame.clone());
        }
    }

    fn wake_up(&mut self) {
        lock(&self.state).wakeups += 1;
    }
}

impl HeadlessHandle {
    /// Queue a close request, as a user clicking the close button would
    pub fn request_close(&self, window: PlatformWindowId) {
        lock(&self.state).pending.push_back(PlatformEvent::CloseRequested(window));
    }

    /// Queue a resize, as a user dragging the window border would
    pub fn request_resize(&self, window: PlatformWindowId, width: u32, height: u32) {
        let mut state = lock(&self.state);
        if let Some(w) = state.windows.get_mut(&window) {
            w.width = width;
            w.height = height;
        }
        state.pending.push_back(PlatformEvent::Resized { window, width, height });
    }

    /// Queue a focus change
    pub fn set_focused(&self, window: PlatformWindowId, focused: bool) {
        lock(&self.state).pending.push_back(PlatformEvent::Focused { window, focused });
    }

    /// Snapshot of a window
    pub fn window(&self, window: PlatformWindowId) -> Option<HeadlessWindow> {
        lock(&self.state).windows.get(&window).cloned()
    }

    pub fn window_count(&self) -> usize {
        lock(&self.state).windows.len()
    }

    pub fn pending_events(&self) -> usize {
        lock(&self.state).pending.len()
    }

    pub fn wakeups(&self) -> u64 {
        lock(&self.state).wakeups
    }
}

impl PlatformEvent {
    pub fn window(&self) -> PlatformWindowId {
        match self {
            Self::CloseRequested(window) => *window,
            Self::Resized { window, .. } | Self::Focused { window, .. } => *window,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_events_drained_once() {
        let mut platform = HeadlessPlatform::new();
        let handle = platform.handle();
        let w = platform.create_window("t", 10, 10);

        handle.request_close(w);
        handle.request_resize(w, 20, 30);

        let events = platform.poll_events();
        assert_eq!(events, [
            PlatformEvent::CloseRequested(w),
            PlatformEvent::Resized { window: w, width: 20, height: 30 },
        ]);
        assert!(platform.poll_events().is_empty());
    }

    #[test]
    fn test_destroy_drops_pending_events() {
        let mut platform = HeadlessPlatform::new();
        let handle = platform.handle();
        let a = platform.create_window("a", 1, 1);
        let b = platform.create_window("b", 1, 1);

        handle.request_close(a);
        handle.request_close(b);
        platform.destroy_window(a);

        assert_eq!(platform.poll_events(), [PlatformEvent::CloseRequested(b)]);
        assert_eq!(handle.window_count(), 1);
    }

    #[test]
    fn test_focus_is_exclusive() {
        let mut platform = HeadlessPlatform::new();
        let handle = platform.handle();
        let a = platform.create_window("a", 1, 1);
        let b = platform.create_window("b", 1, 1);

        platform.focus(a);
        platform.focus(b);

        assert!(!handle.window(a).unwrap().focused);
        assert!(handle.window(b).unwrap().focused);
    }
}
