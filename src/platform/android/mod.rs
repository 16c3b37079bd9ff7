// ── Android platform implementation ───────────────────────────────────────────
//
// The only module in the crate where `unsafe` code is permitted.  Every
// `unsafe` block MUST carry a `// SAFETY:` comment that states:
//   • which invariant makes the operation sound, and
//   • what the caller is responsible for maintaining.
//
// Handles crossing the `Env` boundary are raw `jobject` / `jmethodID` /
// `jfieldID` values.  They are only ever produced by this module, from the
// same VM, so turning them back into `jni` wrappers here is sound as long as
// the reference has not been deleted; the reference wrappers in `refs`
// guarantee that.

#![allow(unsafe_code)]

use std::{cell::RefCell, ffi::c_void, ptr};

use jni::{
    objects::{JClass, JFieldID, JMethodID, JObject, JValueOwned},
    signature::{Primitive, ReturnType},
    sys::{jobject, jvalue},
    JNIEnv, JavaVM,
};

use crate::runtime::{Arg, Env, MemberId, NativeWindow, ObjectHandle, ReturnKind, Runtime, Value};

// ── AndroidRuntime ────────────────────────────────────────────────────────────

/// A `Runtime` backed by the process's JavaVM.
pub struct AndroidRuntime {
    vm: JavaVM,
}

impl AndroidRuntime {
    /// Wrap the VM and activity of a `NativeActivity`.
    ///
    /// Returns the runtime and the host activity handle to pass to
    /// [`crate::Overlay::create`], or `None` if either pointer is null.
    ///
    /// # Safety
    ///
    /// `activity` must point to the live `ANativeActivity` handed to the
    /// native glue, and must outlive every use of the returned host handle.
    pub unsafe fn from_native_activity(activity: *mut ndk_sys::ANativeActivity) -> Option<(Self, ObjectHandle)> {
        if activity.is_null() {
            return None;
        }
        // SAFETY: non-null and, per this function's contract, a live
        // `ANativeActivity`; both fields are plain pointer reads.
        let (vm, clazz) = unsafe { ((*activity).vm, (*activity).clazz) };
        let host = ObjectHandle::from_raw(clazz.cast())?;
        // SAFETY: `vm` is the activity's JavaVM, valid for the process lifetime.
        let runtime = unsafe { Self::from_raw(vm.cast()) }?;
        Some((runtime, host))
    }

    /// Wrap a raw `JavaVM*`, e.g. the one passed to `JNI_OnLoad`.
    ///
    /// # Safety
    ///
    /// `vm` must be a valid JavaVM pointer for the life of the process.
    pub unsafe fn from_raw(vm: *mut jni::sys::JavaVM) -> Option<Self> {
        if vm.is_null() {
            return None;
        }
        // SAFETY: non-null and valid per this function's contract.
        match unsafe { JavaVM::from_raw(vm) } {
            Ok(vm) => Some(Self { vm }),
            Err(e) => {
                log::error!("JavaVM unusable: {e}");
                None
            }
        }
    }
}

impl Runtime for AndroidRuntime {
    fn attach(&self) -> Option<Box<dyn Env + '_>> {
        match self.vm.attach_current_thread_permanently() {
            Ok(env) => Some(Box::new(AndroidEnv { env: RefCell::new(env) })),
            Err(e) => {
                log::error!("AttachCurrentThread failed: {e}");
                None
            }
        }
    }

    fn release_native_window(&self, window: NativeWindow) {
        // SAFETY: `window` came from `ANativeWindow_fromSurface` and carries
        // exactly one acquisition; the registry releases it exactly once.
        unsafe { ndk_sys::ANativeWindow_release(window.as_ptr().cast()) };
    }
}

impl std::fmt::Debug for AndroidRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AndroidRuntime").finish_non_exhaustive()
    }
}

// ── AndroidEnv ────────────────────────────────────────────────────────────────

/// `JNIEnv` for the attached calling thread.  The `jni` wrappers need
/// `&mut`; `Env` is single-threaded, so a `RefCell` supplies it.
struct AndroidEnv<'a> {
    env: RefCell<JNIEnv<'a>>,
}

// ── Handle conversion ─────────────────────────────────────────────────────────

fn handle(obj: JObject<'_>) -> Option<ObjectHandle> {
    ObjectHandle::from_raw(obj.into_raw().cast())
}

/// # Safety
/// `h` must name a live reference created by this VM.
unsafe fn object<'a>(h: ObjectHandle) -> JObject<'a> {
    // SAFETY: upheld by the caller.
    unsafe { JObject::from_raw(h.as_ptr() as jobject) }
}

/// # Safety
/// `h` must name a live reference to a `java.lang.Class`.
unsafe fn class<'a>(h: ObjectHandle) -> JClass<'a> {
    // SAFETY: upheld by the caller.
    unsafe { JClass::from_raw(h.as_ptr() as jobject) }
}

fn jvalues(args: &[Arg]) -> Vec<jvalue> {
    args.iter()
        .map(|a| match *a {
            Arg::Object(h) => jvalue { l: h.as_ptr() as jobject },
            Arg::Int(i) => jvalue { i },
            Arg::Float(f) => jvalue { f },
        })
        .collect()
}

fn return_type(kind: ReturnKind) -> ReturnType {
    match kind {
        ReturnKind::Object => ReturnType::Object,
        ReturnKind::Int => ReturnType::Primitive(Primitive::Int),
        ReturnKind::Float => ReturnType::Primitive(Primitive::Float),
        ReturnKind::Void => ReturnType::Primitive(Primitive::Void),
    }
}

fn value(kind: ReturnKind, result: jni::errors::Result<JValueOwned<'_>>) -> Value {
    let Ok(v) = result else {
        // Failed calls leave the exception pending for `check_and_clear`.
        return match kind {
            ReturnKind::Object => Value::Object(None),
            ReturnKind::Int => Value::Int(0),
            ReturnKind::Float => Value::Float(0.0),
            ReturnKind::Void => Value::Void,
        };
    };
    match kind {
        ReturnKind::Object => Value::Object(v.l().ok().and_then(handle)),
        ReturnKind::Int => Value::Int(v.i().unwrap_or(0)),
        ReturnKind::Float => Value::Float(v.f().unwrap_or(0.0)),
        ReturnKind::Void => Value::Void,
    }
}

impl AndroidEnv<'_> {
    /// Lookups raise `ClassNotFoundError` / `NoSuchMethodError`; they never
    /// escape `Env`.
    fn clear_lookup_failure(&self) {
        let env = self.env.borrow();
        if env.exception_check().unwrap_or(false) {
            let _ = env.exception_clear();
        }
    }

    fn raw(&self) -> *mut jni::sys::JNIEnv {
        self.env.borrow().get_raw()
    }
}

impl Env for AndroidEnv<'_> {
    fn find_class(&self, name: &str) -> Option<ObjectHandle> {
        let found = self.env.borrow_mut().find_class(name);
        match found {
            Ok(cls) => handle(JObject::from(cls)),
            Err(e) => {
                log::debug!("FindClass({name}) failed: {e}");
                self.clear_lookup_failure();
                None
            }
        }
    }

    fn object_class(&self, obj: ObjectHandle) -> Option<ObjectHandle> {
        // SAFETY: `obj` is a live reference held by a `refs` wrapper.
        let target = unsafe { object(obj) };
        let found = self.env.borrow_mut().get_object_class(&target);
        match found {
            Ok(cls) => handle(JObject::from(cls)),
            Err(_) => {
                self.clear_lookup_failure();
                None
            }
        }
    }

    fn method_id(&self, cls: ObjectHandle, name: &str, sig: &str) -> Option<MemberId> {
        // SAFETY: `cls` came from `find_class` / `object_class` and is live.
        let cls = unsafe { class(cls) };
        let found = self.env.borrow_mut().get_method_id(&cls, name, sig);
        match found {
            Ok(id) => MemberId::from_raw(id.into_raw().cast()),
            Err(_) => {
                self.clear_lookup_failure();
                None
            }
        }
    }

    fn field_id(&self, cls: ObjectHandle, name: &str, sig: &str) -> Option<MemberId> {
        // SAFETY: `cls` came from `find_class` / `object_class` and is live.
        let cls = unsafe { class(cls) };
        let found = self.env.borrow_mut().get_field_id(&cls, name, sig);
        match found {
            Ok(id) => MemberId::from_raw(id.into_raw().cast()),
            Err(_) => {
                self.clear_lookup_failure();
                None
            }
        }
    }

    fn new_object(&self, cls: ObjectHandle, ctor: MemberId, args: &[Arg]) -> Option<ObjectHandle> {
        let args = jvalues(args);
        // SAFETY: `cls` is a live class reference and `ctor` was resolved on
        // it with the signature the caller built `args` for.
        let created = unsafe {
            let ctor = JMethodID::from_raw(ctor.as_ptr().cast());
            self.env.borrow_mut().new_object_unchecked(&class(cls), ctor, &args)
        };
        created.ok().and_then(handle)
    }

    fn call_method(&self, target: ObjectHandle, method: MemberId, ret: ReturnKind, args: &[Arg]) -> Value {
        let args = jvalues(args);
        // SAFETY: `method` was resolved on the runtime class of `target` with
        // a signature whose argument and return types match `args` / `ret`.
        let result = unsafe {
            let id = JMethodID::from_raw(method.as_ptr().cast());
            self.env
                .borrow_mut()
                .call_method_unchecked(&object(target), id, return_type(ret), &args)
        };
        value(ret, result)
    }

    fn field_value(&self, obj: ObjectHandle, field: MemberId, kind: ReturnKind) -> Value {
        // SAFETY: `field` was resolved on the class of `obj` with the JNI type
        // matching `kind`.
        let result = unsafe {
            let id = JFieldID::from_raw(field.as_ptr().cast());
            self.env.borrow_mut().get_field_unchecked(&object(obj), id, return_type(kind))
        };
        value(kind, result)
    }

    fn new_string(&self, text: &str) -> Option<ObjectHandle> {
        let created = self.env.borrow_mut().new_string(text);
        created.ok().and_then(|s| handle(JObject::from(s)))
    }

    fn delete_local_ref(&self, obj: ObjectHandle) {
        // SAFETY: `obj` is a local reference owned by a `ScopedObjectRef`,
        // which deletes it exactly once.
        let local = unsafe { object(obj) };
        if let Err(e) = self.env.borrow_mut().delete_local_ref(local) {
            log::warn!("DeleteLocalRef failed: {e}");
        }
    }

    fn new_global_ref(&self, obj: ObjectHandle) -> Option<ObjectHandle> {
        let raw = self.raw();
        // SAFETY: `raw` is this thread's attached JNIEnv and `obj` a live
        // reference.  The `jni` crate's `GlobalRef` deletes on drop, so the raw
        // table is used to hand ownership to `DurableObjectRef` instead.
        let global = unsafe {
            match (**raw).NewGlobalRef {
                Some(new_global) => new_global(raw, obj.as_ptr() as jobject),
                None => ptr::null_mut(),
            }
        };
        ObjectHandle::from_raw(global.cast::<c_void>())
    }

    fn delete_global_ref(&self, obj: ObjectHandle) {
        let raw = self.raw();
        // SAFETY: `obj` is a global reference created by `new_global_ref`;
        // `DurableObjectRef` deletes it exactly once.
        unsafe {
            if let Some(delete_global) = (**raw).DeleteGlobalRef {
                delete_global(raw, obj.as_ptr() as jobject);
            }
        }
    }

    fn exception_pending(&self) -> bool {
        self.env.borrow().exception_check().unwrap_or(false)
    }

    fn describe_and_clear_exception(&self) {
        let env = self.env.borrow();
        let _ = env.exception_describe();
        let _ = env.exception_clear();
    }

    fn native_window_from_surface(&self, surface: ObjectHandle) -> Option<NativeWindow> {
        let raw = self.raw();
        // SAFETY: `raw` is this thread's attached JNIEnv and `surface` a live
        // reference to an `android.view.Surface`.  The returned window carries
        // one acquisition, balanced by `release_native_window`.
        let window = unsafe { ndk_sys::ANativeWindow_fromSurface(raw.cast(), surface.as_ptr().cast()) };
        NativeWindow::from_raw(window.cast())
    }
}
