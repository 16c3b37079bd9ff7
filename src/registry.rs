// ── Window context registry ───────────────────────────────────────────────────
//
// The single source of truth for live overlay windows.  A `WindowContext` is
// assembled privately by `Overlay::create` and only enters the map once every
// required step has succeeded, so lookups never see a half-built entry.
// Removal hands the context back to the caller, which tears it down outside
// the lock.
//
// Per-window lifecycle:
//   Absent → Constructing (local to `create`) → Registered → Destroying → Absent

use std::{
    collections::{HashMap, VecDeque},
    fmt,
    sync::Arc,
};

use parking_lot::Mutex;

use crate::{
    refs::DurableObjectRef,
    runtime::{Env, NativeWindow, ObjectHandle, Runtime},
};

// ── WindowContext ─────────────────────────────────────────────────────────────

/// Everything that produced one overlay window.
///
/// Owns the native window acquisition and both global references; nothing
/// else releases them.  Fields drop in declaration order, so a context
/// dropped without `release_with` still releases window, then surface, then
/// surface control.
pub(crate) struct WindowContext {
    runtime: Arc<dyn Runtime>,
    native: Option<NativeWindow>,
    surface: DurableObjectRef,
    surface_control: DurableObjectRef,
    width: i32,
    height: i32,
    skip_screenshot: bool,
}

impl WindowContext {
    pub(crate) fn new(
        runtime: Arc<dyn Runtime>,
        window: NativeWindow,
        surface: DurableObjectRef,
        surface_control: DurableObjectRef,
        (width, height): (i32, i32),
        skip_screenshot: bool,
    ) -> Self {
        Self {
            runtime,
            native: Some(window),
            surface,
            surface_control,
            width,
            height,
            skip_screenshot,
        }
    }

    pub(crate) fn size(&self) -> (i32, i32) {
        (self.width, self.height)
    }

    pub(crate) fn surface_control(&self) -> Option<ObjectHandle> {
        self.surface_control.get()
    }

    pub(crate) fn skip_screenshot(&self) -> bool {
        self.skip_screenshot
    }

    /// A second global reference to the surface control, owned by the
    /// caller, so compositor calls can run after the registry lock is gone.
    pub(crate) fn retain_surface_control(&self, env: &dyn Env) -> Option<DurableObjectRef> {
        self.surface_control.duplicate(env)
    }

    /// Release everything through an `Env` the caller already holds.
    pub(crate) fn release_with(mut self, env: &dyn Env) {
        if let Some(window) = self.native.take() {
            self.runtime.release_native_window(window);
        }
        self.surface.release_with(env);
        self.surface_control.release_with(env);
    }
}

impl Drop for WindowContext {
    fn drop(&mut self) {
        if let Some(window) = self.native.take() {
            self.runtime.release_native_window(window);
        }
    }
}

impl fmt::Debug for WindowContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WindowContext")
            .field("native", &self.native)
            .field("surface", &self.surface)
            .field("surface_control", &self.surface_control)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("skip_screenshot", &self.skip_screenshot)
            .finish()
    }
}

// ── WindowRegistry ────────────────────────────────────────────────────────────

/// How many torn-down windows are remembered for double-destroy detection.
/// Older addresses are forgotten; the allocator may hand them out again.
pub(crate) const RETIRED_CAPACITY: usize = 64;

/// Outcome of [`WindowRegistry::remove`], decided under one lock.
#[derive(Debug)]
pub(crate) enum Removal {
    /// Registered → Destroying.  The caller tears the context down.
    Removed(WindowContext),
    /// Torn down recently; a repeated destroy.
    Retired,
    /// Never registered here, or retired too long ago to remember.
    Unknown,
}

#[derive(Default)]
struct Windows {
    live: HashMap<NativeWindow, WindowContext>,
    /// Recently torn-down windows, oldest first, at most `RETIRED_CAPACITY`.
    retired: VecDeque<NativeWindow>,
}

impl Windows {
    fn retire(&mut self, window: NativeWindow) {
        self.unretire(window);
        if self.retired.len() == RETIRED_CAPACITY {
            self.retired.pop_front();
        }
        self.retired.push_back(window);
    }

    fn unretire(&mut self, window: NativeWindow) {
        self.retired.retain(|w| *w != window);
    }
}

/// Live overlay windows, keyed by their native window.
#[derive(Default)]
pub(crate) struct WindowRegistry {
    windows: Mutex<Windows>,
}

impl WindowRegistry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Constructing → Registered.
    pub(crate) fn insert(&self, window: NativeWindow, context: WindowContext) {
        let stale = {
            let mut w = self.windows.lock();
            w.unretire(window);
            w.live.insert(window, context)
        };
        if let Some(stale) = stale {
            // The runtime handed out a pointer we still tracked; the old entry
            // can no longer be reached by callers, so drop (release) it.
            log::warn!("native window {window:?} registered twice; releasing the stale entry");
            drop(stale);
        }
    }

    /// Registered → Destroying.  The entry is gone from the map on return.
    pub(crate) fn remove(&self, window: NativeWindow) -> Removal {
        let mut w = self.windows.lock();
        match w.live.remove(&window) {
            Some(context) => {
                w.retire(window);
                Removal::Removed(context)
            }
            None if w.retired.contains(&window) => Removal::Retired,
            None => Removal::Unknown,
        }
    }

    /// Remove every entry.
    pub(crate) fn drain(&self) -> Vec<WindowContext> {
        let mut w = self.windows.lock();
        let drained: Vec<(NativeWindow, WindowContext)> = w.live.drain().collect();
        drained
            .into_iter()
            .map(|(window, ctx)| {
                w.retire(window);
                ctx
            })
            .collect()
    }

    pub(crate) fn contains(&self, window: NativeWindow) -> bool {
        self.windows.lock().live.contains_key(&window)
    }

    #[cfg(test)]
    pub(crate) fn is_retired(&self, window: NativeWindow) -> bool {
        self.windows.lock().retired.contains(&window)
    }

    #[cfg(test)]
    pub(crate) fn retired_len(&self) -> usize {
        self.windows.lock().retired.len()
    }

    #[cfg(test)]
    pub(crate) fn is_locked(&self) -> bool {
        self.windows.is_locked()
    }

    /// Requested geometry, or `None` if `window` is not registered.
    pub(crate) fn size(&self, window: NativeWindow) -> Option<(i32, i32)> {
        self.windows.lock().live.get(&window).map(WindowContext::size)
    }

    /// Run `f` against a registered context while holding the lock, so the
    /// context cannot be torn down underneath it.
    pub(crate) fn with_context<R>(&self, window: NativeWindow, f: impl FnOnce(&WindowContext) -> R) -> Option<R> {
        self.windows.lock().live.get(&window).map(f)
    }

    pub(crate) fn len(&self) -> usize {
        self.windows.lock().live.len()
    }
}

impl fmt::Debug for WindowRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WindowRegistry").field("len", &self.len()).finish()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
