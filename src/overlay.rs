// ── Overlay facade ────────────────────────────────────────────────────────────
//
// The only entry point collaborators use.  `Overlay` owns the window
// registry and the runtime root; nothing here is static, and dropping the
// `Overlay` tears down every window it still tracks.
//
// Failures never cross this boundary as errors: `create` returns `None`,
// `destroy` is always safe, queries return `None` / `false`.  The cause is
// logged where it is detected.

use std::sync::Arc;

use crate::{
    error::ReflectError,
    options::CreateOptions,
    reflect::{self, DisplayInfo},
    refs::DurableObjectRef,
    registry::{Removal, WindowContext, WindowRegistry},
    runtime::{Env, NativeWindow, ObjectHandle, Runtime},
    surface::{self, SurfaceControlBuilder, Transaction, TOP_LAYER},
};

/// Creates, tracks and destroys layered overlay windows on one host.
///
/// `Send + Sync`: creation on one thread and destruction on another is fine;
/// each call attaches its own thread to the runtime.
pub struct Overlay {
    runtime: Arc<dyn Runtime>,
    registry: WindowRegistry,
}

impl Overlay {
    pub fn new(runtime: Arc<dyn Runtime>) -> Self {
        Self {
            runtime,
            registry: WindowRegistry::new(),
        }
    }

    // ── Queries ───────────────────────────────────────────────────────────────

    /// The host's default display, read fresh.  All zeroes if unavailable.
    pub fn display_info(&self, host: ObjectHandle) -> DisplayInfo {
        match self.attach("display_info") {
            Some(env) => reflect::display_info(&*env, host),
            None => DisplayInfo::default(),
        }
    }

    /// `true` while `window` is a live overlay created here.
    pub fn is_valid(&self, window: NativeWindow) -> bool {
        self.registry.contains(window)
    }

    /// Geometry `window` was created with, or `None` if it is not a live
    /// overlay.  `Some((0, 0))` is never produced for an unknown window.
    pub fn window_size(&self, window: NativeWindow) -> Option<(i32, i32)> {
        self.registry.size(window)
    }

    /// Whether `window` was created with screenshot exclusion.
    pub fn skips_screenshot(&self, window: NativeWindow) -> Option<bool> {
        self.registry.with_context(window, WindowContext::skip_screenshot)
    }

    /// Number of live overlays.
    pub fn window_count(&self) -> usize {
        self.registry.len()
    }

    // ── Create ────────────────────────────────────────────────────────────────

    /// Build a layered overlay above the host's content and return its
    /// native window.
    ///
    /// Non-positive `width`/`height` take the display's full resolution.  A
    /// host without a root surface yet still gets an (unparented) layer.
    /// On `None` nothing was registered and nothing is left held.
    pub fn create(&self, host: ObjectHandle, options: &CreateOptions) -> Option<NativeWindow> {
        let env = self.attach("create")?;
        let env = &*env;

        let (width, height) = resolve_size(env, host, options)?;

        let parent = reflect::parent_surface_control(env, host);
        if parent.is_none() {
            log::info!("create: host has no root surface yet, building an unparented layer");
        }

        let builder = SurfaceControlBuilder::new(env);
        if !builder.is_valid() {
            log::error!("create: SurfaceControl.Builder could not be constructed");
            return None;
        }
        let mut builder = builder
            .set_name(&options.name)
            .set_buffer_size(width, height)
            .set_skip_screenshot(options.skip_screenshot)
            .set_parent(parent.as_ref().and_then(|p| p.get()));
        if !options.extra_flags.is_empty() {
            builder = builder.set_flags(options.extra_flags, options.extra_flags);
        }
        log::debug!("create: requesting flags {:?}", builder.flags());

        let Some(local_sc) = builder.build() else {
            log::error!("create: SurfaceControl.Builder.build failed");
            return None;
        };
        let Some(surface_control) = DurableObjectRef::promote(&self.runtime, env, &local_sc) else {
            log::error!("create: could not retain the surface control");
            return None;
        };
        drop(local_sc);
        drop(parent);

        let shown = Transaction::new(env)
            .set_alpha(surface_control.get(), 1.0)
            .set_layer(surface_control.get(), TOP_LAYER)
            .show(surface_control.get())
            .apply();
        if !shown {
            log::error!("create: initial transaction was not applied");
            discard(env, surface_control, None);
            return None;
        }

        let Some(sc) = surface_control.get() else {
            discard(env, surface_control, None);
            return None;
        };
        let local_surface = match surface::wrap_surface(env, sc) {
            Ok(s) => s,
            Err(e) => {
                log::error!("create: Surface(SurfaceControl) failed: {e}");
                discard(env, surface_control, None);
                return None;
            }
        };
        let Some(surface) = DurableObjectRef::promote(&self.runtime, env, &local_surface) else {
            log::error!("create: could not retain the surface");
            discard(env, surface_control, None);
            return None;
        };
        drop(local_surface);

        let window = surface.get().and_then(|s| env.native_window_from_surface(s));
        if env.check_and_clear("ANativeWindow_fromSurface") {
            if let Some(w) = window {
                self.runtime.release_native_window(w);
            }
            discard(env, surface_control, Some(surface));
            return None;
        }
        let Some(window) = window else {
            log::error!("create: ANativeWindow_fromSurface returned null");
            discard(env, surface_control, Some(surface));
            return None;
        };

        let context = WindowContext::new(
            Arc::clone(&self.runtime),
            window,
            surface,
            surface_control,
            (width, height),
            options.skip_screenshot,
        );
        self.registry.insert(window, context);
        log::info!("overlay {:?} created: {width}x{height} at {window:?}", options.name);
        Some(window)
    }

    // ── Mutate ────────────────────────────────────────────────────────────────

    /// Show or hide a live overlay.  `false` if it is unknown or the
    /// transaction did not apply.
    pub fn set_visible(&self, window: NativeWindow, visible: bool) -> bool {
        let Some(env) = self.attach("set_visible") else {
            return false;
        };
        let env = &*env;
        // Only the reference is taken under the lock; the compositor call is not.
        let Some(mut surface_control) = self
            .registry
            .with_context(window, |ctx| ctx.retain_surface_control(env))
            .flatten()
        else {
            return false;
        };
        let tx = Transaction::new(env);
        let tx = if visible {
            tx.show(surface_control.get())
        } else {
            tx.hide(surface_control.get())
        };
        let applied = tx.apply();
        surface_control.release_with(env);
        applied
    }

    // ── Destroy ───────────────────────────────────────────────────────────────

    /// Remove an overlay and release everything it holds.
    ///
    /// Safe on `None`, on windows already destroyed, and on windows never
    /// created here; the last kind is released as a plain `ANativeWindow`
    /// so the caller's acquisition does not leak.  Only the most recent
    /// `RETIRED_CAPACITY` destroyed windows are remembered as such; an older
    /// address counts as never created here, since it may have been reused.
    pub fn destroy(&self, window: Option<NativeWindow>) {
        let Some(window) = window else {
            return;
        };
        match self.registry.remove(window) {
            Removal::Removed(context) => self.teardown(context),
            Removal::Retired => {
                log::debug!("destroy: {window:?} already destroyed");
            }
            Removal::Unknown => {
                log::debug!("destroy: {window:?} is not an overlay; releasing it");
                self.runtime.release_native_window(window);
            }
        }
    }

    /// Destroy every live overlay.
    pub fn destroy_all(&self) {
        for context in self.registry.drain() {
            self.teardown(context);
        }
    }

    fn attach(&self, op: &str) -> Option<Box<dyn Env + '_>> {
        let env = self.runtime.attach();
        if env.is_none() {
            log::warn!("{op}: {}", ReflectError::NotAttached);
        }
        env
    }

    /// Destroying → Absent.  The registry entry is already gone; the
    /// compositor removal and reference release are best effort.
    fn teardown(&self, context: WindowContext) {
        match self.attach("destroy") {
            Some(env) => {
                let removed = Transaction::new(&*env).remove(context.surface_control()).apply();
                if !removed {
                    log::warn!("destroy: remove transaction not applied, releasing references anyway");
                }
                context.release_with(&*env);
            }
            // The native window is still released; the global references
            // are abandoned.
            None => drop(context),
        }
    }
}

impl Drop for Overlay {
    fn drop(&mut self) {
        self.destroy_all();
    }
}

impl std::fmt::Debug for Overlay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Overlay").field("registry", &self.registry).finish()
    }
}

// ── Helpers ───────────────────────────────────────────────────────────────────

fn resolve_size(env: &dyn Env, host: ObjectHandle, options: &CreateOptions) -> Option<(i32, i32)> {
    if !options.wants_display_size() {
        return Some((options.width, options.height));
    }
    let info = reflect::display_info(env, host);
    if !info.is_available() {
        log::error!("create: display size unavailable for a full-screen overlay");
        return None;
    }
    Some((info.width, info.height))
}

/// Unwind a half-built overlay: pull the layer out of the compositor, then
/// release the references acquired so far.
fn discard(env: &dyn Env, mut surface_control: DurableObjectRef, surface: Option<DurableObjectRef>) {
    if let Some(mut surface) = surface {
        surface.release_with(env);
    }
    if surface_control.is_valid() {
        Transaction::new(env).remove(surface_control.get()).apply();
    }
    surface_control.release_with(env);
}

// ── Tests ─────────────────────────────────────────────────────────────────────
