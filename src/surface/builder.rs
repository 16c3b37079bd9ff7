// ── SurfaceControl.Builder ────────────────────────────────────────────────────
//
// One-shot wrapper around a reflectively constructed `SurfaceControl$Builder`.
// Whether the builder is live or inert is decided once, in `new`; every
// setter then goes through `invoke`, which is the only place that knows how
// to skip a call.  A setter whose backing method is missing on this runtime
// version is skipped the same way, so callers chain unconditionally.

use crate::{
    reflect::{self, Method},
    refs::ScopedObjectRef,
    runtime::{Arg, Env, ObjectHandle},
};

use super::SurfaceFlags;

const BUILDER_CLASS: &str = "android/view/SurfaceControl$Builder";

const SET_NAME: Method = Method {
    name: "setName",
    sig: "(Ljava/lang/String;)Landroid/view/SurfaceControl$Builder;",
};
const SET_PARENT: Method = Method {
    name: "setParent",
    sig: "(Landroid/view/SurfaceControl;)Landroid/view/SurfaceControl$Builder;",
};
const SET_BUFFER_SIZE: Method = Method {
    name: "setBufferSize",
    sig: "(II)Landroid/view/SurfaceControl$Builder;",
};
const SET_FLAGS: Method = Method {
    name: "setFlags",
    sig: "(II)Landroid/view/SurfaceControl$Builder;",
};
const BUILD: Method = Method {
    name: "build",
    sig: "()Landroid/view/SurfaceControl;",
};

enum State<'e> {
    Live(ScopedObjectRef<'e>),
    Inert,
}

/// Configures and builds one `SurfaceControl`.
pub(crate) struct SurfaceControlBuilder<'e> {
    env: &'e dyn Env,
    state: State<'e>,
    /// Flags the runtime has accepted so far.
    flags: SurfaceFlags,
}

impl<'e> SurfaceControlBuilder<'e> {
    /// `new SurfaceControl.Builder()`.  Inert if the class or its constructor
    /// is unavailable.
    pub(crate) fn new(env: &'e dyn Env) -> Self {
        let state = match reflect::construct(env, BUILDER_CLASS, "()V", &[]) {
            Ok(builder) => State::Live(builder),
            Err(e) => {
                log::warn!("SurfaceControl.Builder unavailable: {e}");
                State::Inert
            }
        };
        Self {
            env,
            state,
            flags: SurfaceFlags::empty(),
        }
    }

    pub(crate) fn is_valid(&self) -> bool {
        matches!(&self.state, State::Live(builder) if builder.is_valid())
    }

    /// Flags requested so far, as the builder now holds them.
    pub(crate) fn flags(&self) -> SurfaceFlags {
        self.flags
    }

    /// Call a fluent setter.  Returns whether the call went through.
    fn invoke(&self, method: Method, args: &[Arg]) -> bool {
        let State::Live(builder) = &self.state else {
            return false;
        };
        let Some(target) = builder.get() else {
            return false;
        };
        // The setter returns `this` as a fresh local reference; drop it.
        match reflect::call_object(self.env, target, method, args) {
            Ok(_this) => true,
            Err(e) => {
                log::debug!("SurfaceControl.Builder.{} skipped: {e}", method.name);
                false
            }
        }
    }

    pub(crate) fn set_name(self, name: &str) -> Self {
        if !self.is_valid() {
            return self;
        }
        let jname = ScopedObjectRef::new(self.env, self.env.new_string(name));
        if self.env.check_and_clear("NewStringUTF") {
            return self;
        }
        if let Some(s) = jname.get() {
            self.invoke(SET_NAME, &[Arg::Object(s)]);
        }
        self
    }

    /// Attach under `parent`.  `None` leaves the surface unparented.
    pub(crate) fn set_parent(self, parent: Option<ObjectHandle>) -> Self {
        if let Some(p) = parent {
            self.invoke(SET_PARENT, &[Arg::Object(p)]);
        }
        self
    }

    pub(crate) fn set_buffer_size(self, width: i32, height: i32) -> Self {
        self.invoke(SET_BUFFER_SIZE, &[Arg::Int(width), Arg::Int(height)]);
        self
    }

    /// `setFlags(flags, mask)`: bits in `mask` take their value from `flags`.
    pub(crate) fn set_flags(mut self, flags: SurfaceFlags, mask: SurfaceFlags) -> Self {
        // Java ints carry the bit pattern unchanged.
        let args = [Arg::Int(flags.bits() as i32), Arg::Int(mask.bits() as i32)];
        if self.invoke(SET_FLAGS, &args) {
            self.flags = self.flags.with_masked(flags, mask);
        }
        self
    }

    /// Exclude the surface from screen capture.  Must be requested before
    /// `build`; `false` requests nothing.
    pub(crate) fn set_skip_screenshot(self, skip: bool) -> Self {
        if !skip {
            return self;
        }
        self.set_flags(SurfaceFlags::SKIP_SCREENSHOT, SurfaceFlags::SKIP_SCREENSHOT)
    }

    /// `build()`.  Consumes the builder; `None` if it was never live or the
    /// call failed.
    pub(crate) fn build(self) -> Option<ScopedObjectRef<'e>> {
        let State::Live(builder) = &self.state else {
            return None;
        };
        let target = builder.get()?;
        match reflect::call_object(self.env, target, BUILD, &[]) {
            Ok(surface_control) => Some(surface_control),
            Err(e) => {
                log::error!("SurfaceControl.Builder.build failed: {e}");
                None
            }
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
