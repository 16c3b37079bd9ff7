// ── Reflective accessors ──────────────────────────────────────────────────────
//
// Stateless walks over the host's framework object graph.  Each step is a
// function returning `error::Result`, and a chain is a pipeline of
// `and_then` steps: the first missing class, missing method, null link or
// raised exception ends it.
//
// Every call is followed by `Env::check_and_clear`.  A call that raised is a
// failure even if it handed back an object; that object's local reference is
// released before the error is returned.

use serde::{Deserialize, Serialize};

use crate::{
    error::{ReflectError, Result},
    refs::ScopedObjectRef,
    runtime::{Arg, Env, MemberId, ObjectHandle, ReturnKind, Value},
};

// ── Method descriptors ────────────────────────────────────────────────────────

/// A method located by name and JNI signature.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Method {
    pub(crate) name: &'static str,
    pub(crate) sig: &'static str,
}

const GET_WINDOW_MANAGER: Method = Method {
    name: "getWindowManager",
    sig: "()Landroid/view/WindowManager;",
};
const GET_DEFAULT_DISPLAY: Method = Method {
    name: "getDefaultDisplay",
    sig: "()Landroid/view/Display;",
};
const GET_REAL_METRICS: Method = Method {
    name: "getRealMetrics",
    sig: "(Landroid/util/DisplayMetrics;)V",
};
const GET_ROTATION: Method = Method {
    name: "getRotation",
    sig: "()I",
};
const GET_REFRESH_RATE: Method = Method {
    name: "getRefreshRate",
    sig: "()F",
};
const GET_WINDOW: Method = Method {
    name: "getWindow",
    sig: "()Landroid/view/Window;",
};
const GET_DECOR_VIEW: Method = Method {
    name: "getDecorView",
    sig: "()Landroid/view/View;",
};
const GET_VIEW_ROOT_IMPL: Method = Method {
    name: "getViewRootImpl",
    sig: "()Landroid/view/ViewRootImpl;",
};
const GET_SURFACE_CONTROL: Method = Method {
    name: "getSurfaceControl",
    sig: "()Landroid/view/SurfaceControl;",
};

const DISPLAY_METRICS_CLASS: &str = "android/util/DisplayMetrics";

/// Refresh rate reported when the display does not expose one.
pub const NOMINAL_REFRESH_RATE: f32 = 60.0;

// ── Call helpers ──────────────────────────────────────────────────────────────

/// Wrap a freshly returned local reference, failing on exception or null.
fn scoped<'e>(
    env: &'e dyn Env,
    call: &'static str,
    raw: Option<ObjectHandle>,
) -> Result<ScopedObjectRef<'e>> {
    let obj = ScopedObjectRef::new(env, raw);
    if env.check_and_clear(call) {
        return Err(ReflectError::Exception { call });
    }
    obj.require(call)?;
    Ok(obj)
}

pub(crate) fn find_class<'e>(env: &'e dyn Env, class: &'static str) -> Result<ScopedObjectRef<'e>> {
    scoped(env, class, env.find_class(class)).map_err(|_| ReflectError::ClassNotFound { class })
}

fn class_of<'e>(env: &'e dyn Env, obj: ObjectHandle) -> Result<ScopedObjectRef<'e>> {
    scoped(env, "GetObjectClass", env.object_class(obj))
        .map_err(|_| ReflectError::ClassNotFound { class: "<receiver>" })
}

fn method_in(env: &dyn Env, class: &ScopedObjectRef<'_>, method: Method) -> Result<MemberId> {
    let found = env.method_id(class.require("FindClass")?, method.name, method.sig);
    // A failed lookup raises NoSuchMethodError; never let it leak.
    env.check_and_clear(method.name);
    found.ok_or(ReflectError::MethodNotFound {
        name: method.name,
        sig: method.sig,
    })
}

/// Resolve `method` on the runtime class of `target`.
pub(crate) fn method_of(env: &dyn Env, target: ObjectHandle, method: Method) -> Result<MemberId> {
    let class = class_of(env, target)?;
    method_in(env, &class, method)
}

/// Invoke `method` on `target` and check for a raised exception.
pub(crate) fn call(
    env: &dyn Env,
    target: ObjectHandle,
    method: Method,
    ret: ReturnKind,
    args: &[Arg],
) -> Result<Value> {
    let id = method_of(env, target, method)?;
    let value = env.call_method(target, id, ret, args);
    if env.check_and_clear(method.name) {
        if let Value::Object(Some(obj)) = value {
            env.delete_local_ref(obj);
        }
        return Err(ReflectError::Exception { call: method.name });
    }
    Ok(value)
}

pub(crate) fn call_object<'e>(
    env: &'e dyn Env,
    target: ObjectHandle,
    method: Method,
    args: &[Arg],
) -> Result<ScopedObjectRef<'e>> {
    match call(env, target, method, ReturnKind::Object, args)? {
        Value::Object(raw) => scoped(env, method.name, raw),
        _ => Err(ReflectError::NullResult { call: method.name }),
    }
}

pub(crate) fn call_void(env: &dyn Env, target: ObjectHandle, method: Method, args: &[Arg]) -> Result<()> {
    call(env, target, method, ReturnKind::Void, args).map(|_| ())
}

fn call_int(env: &dyn Env, target: ObjectHandle, method: Method) -> Result<i32> {
    match call(env, target, method, ReturnKind::Int, &[])? {
        Value::Int(v) => Ok(v),
        _ => Err(ReflectError::NullResult { call: method.name }),
    }
}

fn call_float(env: &dyn Env, target: ObjectHandle, method: Method) -> Result<f32> {
    match call(env, target, method, ReturnKind::Float, &[])? {
        Value::Float(v) => Ok(v),
        _ => Err(ReflectError::NullResult { call: method.name }),
    }
}

/// `new <class>(args)` through the constructor with signature `sig`.
pub(crate) fn construct<'e>(
    env: &'e dyn Env,
    class: &'static str,
    sig: &'static str,
    args: &[Arg],
) -> Result<ScopedObjectRef<'e>> {
    let cls = find_class(env, class)?;
    let ctor = method_in(env, &cls, Method { name: "<init>", sig })?;
    let raw = env.new_object(cls.require(class)?, ctor, args);
    scoped(env, class, raw)
}

fn field(
    env: &dyn Env,
    obj: ObjectHandle,
    class: &ScopedObjectRef<'_>,
    name: &'static str,
    sig: &'static str,
    kind: ReturnKind,
) -> Result<Value> {
    let id = env.field_id(class.require("FindClass")?, name, sig);
    env.check_and_clear(name);
    let id = id.ok_or(ReflectError::FieldNotFound { name })?;
    let value = env.field_value(obj, id, kind);
    if env.check_and_clear(name) {
        return Err(ReflectError::Exception { call: name });
    }
    Ok(value)
}

fn int_field(env: &dyn Env, obj: ObjectHandle, class: &ScopedObjectRef<'_>, name: &'static str) -> Result<i32> {
    match field(env, obj, class, name, "I", ReturnKind::Int)? {
        Value::Int(v) => Ok(v),
        _ => Err(ReflectError::FieldNotFound { name }),
    }
}

fn float_field(env: &dyn Env, obj: ObjectHandle, class: &ScopedObjectRef<'_>, name: &'static str) -> Result<f32> {
    match field(env, obj, class, name, "F", ReturnKind::Float)? {
        Value::Float(v) => Ok(v),
        _ => Err(ReflectError::FieldNotFound { name }),
    }
}

// ── Display info ──────────────────────────────────────────────────────────────

/// The four orientations `Display.getRotation()` reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Rotation {
    #[default]
    Rotation0,
    Rotation90,
    Rotation180,
    Rotation270,
}

impl Rotation {
    /// Map `Surface.ROTATION_*` (0..=3).
    pub fn from_raw(raw: i32) -> Option<Self> {
        match raw {
            0 => Some(Self::Rotation0),
            1 => Some(Self::Rotation90),
            2 => Some(Self::Rotation180),
            3 => Some(Self::Rotation270),
            _ => None,
        }
    }

    pub fn degrees(self) -> i32 {
        match self {
            Self::Rotation0 => 0,
            Self::Rotation90 => 90,
            Self::Rotation180 => 180,
            Self::Rotation270 => 270,
        }
    }
}

/// A snapshot of the host's default display.
///
/// Queried fresh every time.  Zero `width`/`height` means the display could
/// not be reached, not a 0×0 screen.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct DisplayInfo {
    /// Full physical width in pixels (`getRealMetrics`).
    pub width: i32,
    /// Full physical height in pixels.
    pub height: i32,
    pub rotation: Rotation,
    /// Hz.  [`NOMINAL_REFRESH_RATE`] when the display does not report one.
    pub refresh_rate: f32,
    /// Logical density scale, e.g. `2.75`.
    pub density: f32,
    pub density_dpi: i32,
}

impl DisplayInfo {
    /// Rotation as 0 / 90 / 180 / 270 degrees.
    pub fn rotation_degrees(&self) -> i32 {
        self.rotation.degrees()
    }

    /// `true` when the display dimensions were actually read.
    pub fn is_available(&self) -> bool {
        self.width > 0 && self.height > 0
    }
}

struct RealMetrics {
    width: i32,
    height: i32,
    density: f32,
    density_dpi: i32,
}

fn default_display<'e>(env: &'e dyn Env, host: ObjectHandle) -> Result<ScopedObjectRef<'e>> {
    call_object(env, host, GET_WINDOW_MANAGER, &[])
        .and_then(|wm| call_object(env, wm.require(GET_WINDOW_MANAGER.name)?, GET_DEFAULT_DISPLAY, &[]))
}

fn real_metrics(env: &dyn Env, display: ObjectHandle) -> Result<RealMetrics> {
    let metrics = construct(env, DISPLAY_METRICS_CLASS, "()V", &[])?;
    let m = metrics.require(DISPLAY_METRICS_CLASS)?;
    call_void(env, display, GET_REAL_METRICS, &[Arg::Object(m)])?;

    let class = class_of(env, m)?;
    Ok(RealMetrics {
        width: int_field(env, m, &class, "widthPixels")?,
        height: int_field(env, m, &class, "heightPixels")?,
        density: float_field(env, m, &class, "density").unwrap_or(0.0),
        density_dpi: int_field(env, m, &class, "densityDpi").unwrap_or(0),
    })
}

/// Read the host's default display.
///
/// Host → `getWindowManager()` → `getDefaultDisplay()`, then metrics,
/// rotation and refresh rate are read independently: a field that fails
/// keeps its default while the others are still filled in.  If the display
/// itself cannot be reached every field is zero.
pub(crate) fn display_info(env: &dyn Env, host: ObjectHandle) -> DisplayInfo {
    let display = match default_display(env, host) {
        Ok(display) => display,
        Err(e) => {
            log::warn!("default display unavailable: {e}");
            return DisplayInfo::default();
        }
    };
    let Some(d) = display.get() else {
        return DisplayInfo::default();
    };

    let mut info = DisplayInfo {
        refresh_rate: NOMINAL_REFRESH_RATE,
        ..DisplayInfo::default()
    };

    match real_metrics(env, d) {
        Ok(m) => {
            info.width = m.width;
            info.height = m.height;
            info.density = m.density;
            info.density_dpi = m.density_dpi;
        }
        Err(e) => log::warn!("display metrics unavailable: {e}"),
    }

    match call_int(env, d, GET_ROTATION) {
        Ok(raw) => info.rotation = Rotation::from_raw(raw).unwrap_or_default(),
        Err(e) => log::debug!("rotation unavailable: {e}"),
    }

    match call_float(env, d, GET_REFRESH_RATE) {
        Ok(hz) if hz > 0.0 => info.refresh_rate = hz,
        Ok(_) => {}
        Err(e) => log::debug!("refresh rate unavailable, assuming {NOMINAL_REFRESH_RATE} Hz: {e}"),
    }

    info
}

// ── Parent surface ────────────────────────────────────────────────────────────

/// The `SurfaceControl` behind the host's root view.
///
/// Host → `getWindow()` → `getDecorView()` → `getViewRootImpl()` →
/// `getSurfaceControl()`.  `None` is a normal answer early in the host's
/// lifetime, before its window is attached.
pub(crate) fn parent_surface_control<'e>(env: &'e dyn Env, host: ObjectHandle) -> Option<ScopedObjectRef<'e>> {
    let chain = call_object(env, host, GET_WINDOW, &[])
        .and_then(|window| call_object(env, window.require(GET_WINDOW.name)?, GET_DECOR_VIEW, &[]))
        .and_then(|decor| call_object(env, decor.require(GET_DECOR_VIEW.name)?, GET_VIEW_ROOT_IMPL, &[]))
        .and_then(|root| call_object(env, root.require(GET_VIEW_ROOT_IMPL.name)?, GET_SURFACE_CONTROL, &[]));

    match chain {
        Ok(parent) => Some(parent),
        Err(e) => {
            log::debug!("no parent surface control: {e}");
            None
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
