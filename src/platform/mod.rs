// ── Platform layer ────────────────────────────────────────────────────────────
//
// The concrete `Runtime` / `Env` for a real JavaVM.  No `unsafe` lives above
// this module; all JNI and NDK FFI is confined to the `android` sub-module and
// leaves it only as opaque handles.

#[cfg(target_os = "android")]
pub mod android;
