// ── Surface construction ──────────────────────────────────────────────────────
//
// builder      – configures and builds the overlay's `SurfaceControl`
// transaction  – atomic show / layer / remove batches against it
// flags        – `SurfaceControl` builder flag bits
//
// `wrap_surface` is the last step: the `Surface` it constructs is what
// `ANativeWindow_fromSurface` accepts.

mod builder;
mod flags;
mod transaction;

pub(crate) use builder::SurfaceControlBuilder;
pub use flags::SurfaceFlags;
pub(crate) use transaction::{Transaction, TOP_LAYER};

use crate::{
    error::Result,
    reflect,
    refs::ScopedObjectRef,
    runtime::{Arg, Env, ObjectHandle},
};

const SURFACE_CLASS: &str = "android/view/Surface";

/// `new Surface(surfaceControl)`.
pub(crate) fn wrap_surface<'e>(env: &'e dyn Env, surface_control: ObjectHandle) -> Result<ScopedObjectRef<'e>> {
    reflect::construct(
        env,
        SURFACE_CLASS,
        "(Landroid/view/SurfaceControl;)V",
        &[Arg::Object(surface_control)],
    )
}
