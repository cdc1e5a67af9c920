//! Window state mirrored from the platform

use crate::platform::{PlatformWindowId, Visibility};

/// Engine-side window
#[derive(Debug, Clone)]
pub struct Window {
    pub(crate) platform_id: PlatformWindowId,
    pub(crate) title: String,
    pub(crate) width: u32,
    pub(crate) height: u32,
    pub(crate) should_close: bool,
    pub(crate) visibility: Visibility,
    pub(crate) focused: bool,
    pub(crate) frames_presented: u64,
}

impl Window {
    pub(crate) fn new(platform_id: PlatformWindowId, title: &str, width: u32, height: u32) -> Self {
        Self {
            platform_id,
            title: title.to_string(),
            width,
            height,
            should_close: false,
            visibility: Visibility::Shown,
            focused: false,
            frames_presented: 0,
        }
    }

    pub fn platform_id(&self) -> PlatformWindowId {
        self.platform_id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// (width, height)
    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Set once the platform reports a close request. Never cleared.
    pub fn should_close(&self) -> bool {
        self.should_close
    }

    pub fn visibility(&self) -> Visibility {
        self.visibility
    }

    pub fn is_focused(&self) -> bool {
        self.focused
    }

    /// Frames handed to the platform for this window
    pub fn frames_presented(&self) -> u64 {
        self.frames_presented
    }
}
