// ── Runtime attachment ────────────────────────────────────────────────────────
//
// The seam between this crate and the managed runtime.  `Runtime` is the
// process-wide root (the JavaVM); `Env` is the per-thread access point handed
// out by `Runtime::attach`.  Everything above this module speaks only in
// opaque handles so that the reflective layers stay free of `unsafe` and can
// be exercised without a VM.
//
// Handles are stored as non-zero integers: they are tokens, never
// dereferenced outside `platform::android`.

use std::{ffi::c_void, num::NonZeroUsize};

// ── Opaque handles ────────────────────────────────────────────────────────────

/// A non-null managed object reference (local or global).
///
/// Null is always expressed as `Option::None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjectHandle(NonZeroUsize);

impl ObjectHandle {
    /// Wrap a raw `jobject`.  Returns `None` for null.
    pub fn from_raw(ptr: *mut c_void) -> Option<Self> {
        NonZeroUsize::new(ptr as usize).map(Self)
    }

    /// The raw `jobject` this handle names.
    pub fn as_ptr(self) -> *mut c_void {
        self.0.get() as *mut c_void
    }
}

/// A resolved method or field id (`jmethodID` / `jfieldID`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MemberId(NonZeroUsize);

impl MemberId {
    /// Wrap a raw member id.  Returns `None` for null.
    pub fn from_raw(ptr: *mut c_void) -> Option<Self> {
        NonZeroUsize::new(ptr as usize).map(Self)
    }

    /// The raw member id.
    pub fn as_ptr(self) -> *mut c_void {
        self.0.get() as *mut c_void
    }
}

/// An `ANativeWindow*` produced by `ANativeWindow_fromSurface`.
///
/// This is the key of the window registry and the value handed to
/// collaborators, who pass `as_ptr()` to EGL / Vulkan surface creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NativeWindow(NonZeroUsize);

impl NativeWindow {
    /// Wrap a raw `ANativeWindow*`.  Returns `None` for null.
    pub fn from_raw(ptr: *mut c_void) -> Option<Self> {
        NonZeroUsize::new(ptr as usize).map(Self)
    }

    /// The raw `ANativeWindow*`.
    pub fn as_ptr(self) -> *mut c_void {
        self.0.get() as *mut c_void
    }
}

// ── Call arguments and results ────────────────────────────────────────────────

/// One argument of a reflective call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Arg {
    Object(ObjectHandle),
    Int(i32),
    Float(f32),
}

/// The declared return type of a reflective call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReturnKind {
    Object,
    Int,
    Float,
    Void,
}

/// The result of a reflective call or field read.
///
/// An `Object` result is a *new local reference* owned by the caller.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value {
    Object(Option<ObjectHandle>),
    Int(i32),
    Float(f32),
    Void,
}

// ── Env ───────────────────────────────────────────────────────────────────────

/// Thread-bound access to the managed runtime (a `JNIEnv`).
///
/// Implementations must never let a failed lookup leave an exception pending:
/// `find_class`, `method_id` and `field_id` clear the error they raise and
/// return `None`.  Calls (`new_object`, `call_method`, `field_value`) leave
/// any exception pending for [`Env::check_and_clear`] to observe.
pub trait Env {
    fn find_class(&self, name: &str) -> Option<ObjectHandle>;
    fn object_class(&self, obj: ObjectHandle) -> Option<ObjectHandle>;
    fn method_id(&self, class: ObjectHandle, name: &str, sig: &str) -> Option<MemberId>;
    fn field_id(&self, class: ObjectHandle, name: &str, sig: &str) -> Option<MemberId>;

    fn new_object(&self, class: ObjectHandle, ctor: MemberId, args: &[Arg]) -> Option<ObjectHandle>;
    fn call_method(&self, target: ObjectHandle, method: MemberId, ret: ReturnKind, args: &[Arg]) -> Value;
    fn field_value(&self, obj: ObjectHandle, field: MemberId, kind: ReturnKind) -> Value;
    fn new_string(&self, text: &str) -> Option<ObjectHandle>;

    fn delete_local_ref(&self, obj: ObjectHandle);
    fn new_global_ref(&self, obj: ObjectHandle) -> Option<ObjectHandle>;
    fn delete_global_ref(&self, obj: ObjectHandle);

    fn exception_pending(&self) -> bool;
    /// Print the pending exception to the runtime's log and clear it.
    fn describe_and_clear_exception(&self);

    /// `ANativeWindow_fromSurface`.  The returned window carries one
    /// acquisition that must be balanced by [`Runtime::release_native_window`].
    fn native_window_from_surface(&self, surface: ObjectHandle) -> Option<NativeWindow>;

    /// Clear a pending exception raised by the last call.
    ///
    /// Returns `true` if one was pending; the result of that call must then be
    /// treated as invalid even if it was non-null.
    fn check_and_clear(&self, context: &str) -> bool {
        if !self.exception_pending() {
            return false;
        }
        self.describe_and_clear_exception();
        log::warn!("exception raised by {context}; cleared");
        true
    }
}

// ── Runtime ───────────────────────────────────────────────────────────────────

/// The process-wide managed runtime root (a `JavaVM`).
pub trait Runtime: Send + Sync {
    /// Attach the calling thread if it is not attached yet.
    ///
    /// Returns `None` when the runtime is unusable.  The thread stays attached
    /// after the returned `Env` is dropped.
    fn attach(&self) -> Option<Box<dyn Env + '_>>;

    /// `ANativeWindow_release`.  Needs no attachment.
    fn release_native_window(&self, window: NativeWindow);
}
