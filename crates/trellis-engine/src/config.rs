//! Engine Configuration

use std::env;

/// Environment variable overriding [`Config::max_objects`]
pub const MAX_OBJECTS_ENV: &str = "TRELLIS_MAX_OBJECTS";

/// Environment variable overriding [`Config::log_filter`]
pub const LOG_ENV: &str = "TRELLIS_LOG";

/// Engine configuration options
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Maximum number of live objects (all kinds together)
    pub max_objects: usize,

    /// Window size used when a caller passes a non-positive dimension
    pub default_window_size: (u32, u32),

    /// Only one application may be alive at a time. When false, every
    /// `init_app` creates an independent application with its own tick state.
    pub single_instance_app: bool,

    /// `tracing` filter directive used when a subscriber is installed
    pub log_filter: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_objects: 1 << 20,
            default_window_size: (800, 600),
            single_instance_app: true,
            log_filter: "warn".to_string(),
        }
    }
}

impl Config {
    /// Defaults overlaid with `TRELLIS_MAX_OBJECTS` and `TRELLIS_LOG`
    pub fn from_env() -> Self {
        Self::default().with_overrides(
            env::var(MAX_OBJECTS_ENV).ok().as_deref(),
            env::var(LOG_ENV).ok().as_deref(),
        )
    }

    fn with_overrides(mut self, max_objects: Option<&str>, log: Option<&str>) -> Self {
        if let Some(raw) = max_objects {
            match raw.trim().parse::<usize>() {
                Ok(n) if n > 0 => self.max_objects = n,
                _ => tracing::warn!("ignoring {}={:?}", MAX_OBJECTS_ENV, raw),
            }
        }
        if let Some(filter) = log.map(str::trim).filter(|f| !f.is_empty()) {
            self.log_filter = filter.to_string();
        }
        self
    }

    /// Clamp caller-supplied window dimensions
    pub fn window_size(&self, width: i32, height: i32) -> (u32, u32) {
        let (dw, dh) = self.default_window_size;
        (
            u32::try_from(width).ok().filter(|&w| w > 0).unwrap_or(dw),
            u32::try_from(height).ok().filter(|&h| h > 0).unwrap_or(dh),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overrides() {
        let config = Config::default().with_overrides(Some(" 64 "), Some("trellis=debug"));
        assert_eq!(config.max_objects, 64);
        assert_eq!(config.log_filter, "trellis=debug");
    }

    #[test]
    fn test_bad_overrides_ignored() {
        let config = Config::default().with_overrides(Some("lots"), Some("  "));
        assert_eq!(config, Config::default());

        let config = Config::default().with_overrides(Some("0"), None);
        assert_eq!(config.max_objects, 1 << 20);
    }

    #[test]
    fn test_window_size_fallback() {
        let config = Config::default();
        assert_eq!(config.window_size(1024, 768), (1024, 768));
        assert_eq!(config.window_size(0, 768), (800, 768));
        assert_eq!(config.window_size(-5, -1), (800, 600));
    }
}
