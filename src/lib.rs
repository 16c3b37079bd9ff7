// ── Safety policy ────────────────────────────────────────────────────────────
// Unsafe code is forbidden everywhere except:
//   • `platform::android` – JNI / NDK FFI
// Each unsafe block in that module MUST carry a `// SAFETY:` comment.
#![deny(unsafe_code)]

//! Layered native windows for a host Android activity.
//!
//! `surfacelayer` builds a `SurfaceControl` child of the host's root surface
//! by driving the framework's Java windowing APIs reflectively, wraps it in a
//! `Surface`, and hands back the `ANativeWindow` extracted from it. Every
//! reference acquired along the way is tracked in a registry owned by the
//! [`Overlay`] facade and released exactly once.
//!
//! ```ignore
//! let (runtime, host) = unsafe { AndroidRuntime::from_native_activity(activity) }?;
//! let overlay = Overlay::new(Arc::new(runtime));
//! let window = overlay.create(host, &CreateOptions::new("Overlay").skip_screenshot(true));
//! ```

mod error;
mod options;
mod overlay;
mod platform;
mod refs;
mod reflect;
mod registry;
mod runtime;
mod surface;

#[cfg(test)]
mod testing;

pub use error::{ConfigError, ReflectError};
pub use options::CreateOptions;
pub use overlay::Overlay;
pub use reflect::{DisplayInfo, Rotation, NOMINAL_REFRESH_RATE};
pub use runtime::{Arg, Env, MemberId, NativeWindow, ObjectHandle, ReturnKind, Runtime, Value};
pub use surface::SurfaceFlags;

#[cfg(target_os = "android")]
pub use platform::android::AndroidRuntime;
