// ── Overlay creation options ──────────────────────────────────────────────────
//
// Plain data.  Collaborators either build it in code or load it from JSON
// with `CreateOptions::from_json`; every field is optional in JSON and falls
// back to the defaults below.

use serde::{Deserialize, Serialize};

use crate::{error::ConfigError, surface::SurfaceFlags};

/// What to create.
///
/// `width` / `height` ≤ 0 mean "use the display's full resolution", which is
/// the default: an overlay is full-screen unless told otherwise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CreateOptions {
    /// Debug name of the surface, visible in `dumpsys SurfaceFlinger`.
    pub name: String,
    pub width: i32,
    pub height: i32,
    /// Exclude the overlay from screenshots and screen recording.
    pub skip_screenshot: bool,
    /// Additional builder flags, OR-ed with the skip-screenshot flag.
    pub extra_flags: SurfaceFlags,
}

impl Default for CreateOptions {
    fn default() -> Self {
        Self {
            name: String::new(),
            width: -1,
            height: -1,
            skip_screenshot: false,
            extra_flags: SurfaceFlags::empty(),
        }
    }
}

impl CreateOptions {
    /// Full-screen options with the given surface name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_size(mut self, width: i32, height: i32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn skip_screenshot(mut self, skip: bool) -> Self {
        self.skip_screenshot = skip;
        self
    }

    pub fn with_flags(mut self, flags: SurfaceFlags) -> Self {
        self.extra_flags |= flags;
        self
    }

    /// Parse options from JSON.  Missing fields take their defaults.
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(text)?)
    }

    /// `true` when the geometry must come from the display.
    pub(crate) fn wants_display_size(&self) -> bool {
        self.width <= 0 || self.height <= 0
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
