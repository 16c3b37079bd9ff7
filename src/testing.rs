// ── In-memory managed runtime for tests ───────────────────────────────────────
//
// `FakeRuntime` models just enough of the Android framework object graph for
// the reflective chains in this crate: an activity with a window manager,
// default display, window, decor view, view root and surface control, plus
// the `SurfaceControl.Builder` / `Transaction` / `Surface` classes.
//
// Only the (class, method, signature) triples listed in `METHODS` resolve, so
// a typo in a name or signature surfaces as a failing test.  Every local and
// global reference is counted; deleting a reference twice (or with the wrong
// kind) is recorded instead of panicking.

use std::{
    collections::{HashMap, HashSet},
    ffi::c_void,
    sync::Arc,
};

use parking_lot::Mutex;

use crate::runtime::{Arg, Env, MemberId, NativeWindow, ObjectHandle, ReturnKind, Runtime, Value};

// ── Class and member tables ───────────────────────────────────────────────────

pub(crate) const ACTIVITY: &str = "android/app/NativeActivity";
pub(crate) const WINDOW_MANAGER: &str = "android/view/WindowManagerImpl";
pub(crate) const DISPLAY: &str = "android/view/Display";
pub(crate) const METRICS: &str = "android/util/DisplayMetrics";
pub(crate) const WINDOW: &str = "com/android/internal/policy/PhoneWindow";
pub(crate) const DECOR_VIEW: &str = "com/android/internal/policy/DecorView";
pub(crate) const VIEW_ROOT: &str = "android/view/ViewRootImpl";
pub(crate) const SURFACE_CONTROL: &str = "android/view/SurfaceControl";
pub(crate) const BUILDER: &str = "android/view/SurfaceControl$Builder";
pub(crate) const TRANSACTION: &str = "android/view/SurfaceControl$Transaction";
pub(crate) const SURFACE: &str = "android/view/Surface";
const STRING: &str = "java/lang/String";
const CLASS: &str = "java/lang/Class";

const BUILDER_RET: &str = "Landroid/view/SurfaceControl$Builder;";
const TX_RET: &str = "Landroid/view/SurfaceControl$Transaction;";

/// Every method the fake framework exposes: (class, name, signature).
fn methods() -> Vec<(&'static str, &'static str, String)> {
    let mut m: Vec<(&'static str, &'static str, String)> = vec![
        (ACTIVITY, "getWindowManager", "()Landroid/view/WindowManager;".into()),
        (ACTIVITY, "getWindow", "()Landroid/view/Window;".into()),
        (WINDOW_MANAGER, "getDefaultDisplay", "()Landroid/view/Display;".into()),
        (DISPLAY, "getRealMetrics", "(Landroid/util/DisplayMetrics;)V".into()),
        (DISPLAY, "getRotation", "()I".into()),
        (DISPLAY, "getRefreshRate", "()F".into()),
        (METRICS, "<init>", "()V".into()),
        (WINDOW, "getDecorView", "()Landroid/view/View;".into()),
        (DECOR_VIEW, "getViewRootImpl", "()Landroid/view/ViewRootImpl;".into()),
        (VIEW_ROOT, "getSurfaceControl", "()Landroid/view/SurfaceControl;".into()),
        (BUILDER, "<init>", "()V".into()),
        (BUILDER, "build", "()Landroid/view/SurfaceControl;".into()),
        (TRANSACTION, "<init>", "()V".into()),
        (TRANSACTION, "apply", "()V".into()),
        (SURFACE, "<init>", "(Landroid/view/SurfaceControl;)V".into()),
    ];
    m.push((BUILDER, "setName", format!("(Ljava/lang/String;){BUILDER_RET}")));
    m.push((BUILDER, "setParent", format!("(Landroid/view/SurfaceControl;){BUILDER_RET}")));
    m.push((BUILDER, "setBufferSize", format!("(II){BUILDER_RET}")));
    m.push((BUILDER, "setFlags", format!("(II){BUILDER_RET}")));
    m.push((TRANSACTION, "setAlpha", format!("(Landroid/view/SurfaceControl;F){TX_RET}")));
    m.push((TRANSACTION, "setLayer", format!("(Landroid/view/SurfaceControl;I){TX_RET}")));
    for op in ["show", "hide", "remove"] {
        m.push((TRANSACTION, op, format!("(Landroid/view/SurfaceControl;){TX_RET}")));
    }
    m
}

const FIELDS: &[(&str, &str, &str)] = &[
    (METRICS, "widthPixels", "I"),
    (METRICS, "heightPixels", "I"),
    (METRICS, "density", "F"),
    (METRICS, "densityDpi", "I"),
];

// ── State ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RefKind {
    Local,
    Global,
    /// The host activity reference: owned by the test, never counted.
    Pinned,
}

struct Obj {
    class: String,
    /// For class objects: the class they describe.
    of: Option<String>,
    fields: HashMap<String, Value>,
}

/// One recorded reflective call.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Call {
    pub(crate) class: String,
    pub(crate) method: String,
    pub(crate) args: Vec<Arg>,
}

struct State {
    next_id: usize,
    refs: HashMap<usize, (usize, RefKind)>,
    objects: HashMap<usize, Obj>,
    members: HashMap<usize, (String, String)>,
    member_ids: HashMap<(String, String, String), usize>,

    missing_classes: HashSet<String>,
    missing_members: HashSet<(String, String)>,
    throwing: HashSet<(String, String)>,
    null_returning: HashSet<(String, String)>,

    pending: bool,
    attachable: bool,
    native_window_fails: bool,

    width: i32,
    height: i32,
    rotation: i32,
    refresh_rate: f32,

    calls: Vec<Call>,
    double_deletes: usize,
    native_windows: HashSet<usize>,
    released_unknown: Vec<NativeWindow>,
    host: usize,
    /// Run after a method of that name returns, outside the state lock.
    hooks: HashMap<String, Hook>,
}

type Hook = Arc<dyn Fn() + Send + Sync>;

impl State {
    fn next(&mut self) -> usize {
        self.next_id += 8;
        self.next_id
    }

    fn new_obj(&mut self, class: &str, of: Option<&str>) -> usize {
        let id = self.next();
        self.objects.insert(
            id,
            Obj {
                class: class.to_owned(),
                of: of.map(str::to_owned),
                fields: HashMap::new(),
            },
        );
        id
    }

    fn new_ref(&mut self, referent: usize, kind: RefKind) -> ObjectHandle {
        let id = self.next();
        self.refs.insert(id, (referent, kind));
        handle(id)
    }

    fn referent(&self, h: ObjectHandle) -> Option<usize> {
        self.refs.get(&(h.as_ptr() as usize)).map(|(r, _)| *r)
    }

    fn class_of(&self, h: ObjectHandle) -> Option<String> {
        let r = self.referent(h)?;
        self.objects.get(&r).map(|o| o.class.clone())
    }

    fn described_class(&self, class: ObjectHandle) -> Option<String> {
        let r = self.referent(class)?;
        self.objects.get(&r).and_then(|o| o.of.clone())
    }

    fn member(&self, id: MemberId) -> Option<(String, String)> {
        self.members.get(&(id.as_ptr() as usize)).cloned()
    }

    fn intern_member(&mut self, class: &str, name: &str, sig: &str) -> MemberId {
        let key = (class.to_owned(), name.to_owned(), sig.to_owned());
        let id = match self.member_ids.get(&key) {
            Some(id) => *id,
            None => {
                let id = self.next();
                self.member_ids.insert(key, id);
                self.members.insert(id, (class.to_owned(), name.to_owned()));
                id
            }
        };
        MemberId::from_raw(id as *mut c_void).expect("non-zero member id")
    }

    fn object_result(&mut self, class: &str, name: &str, produce: impl FnOnce(&mut Self) -> usize) -> Value {
        if self.null_returning.contains(&(class.to_owned(), name.to_owned())) {
            return Value::Object(None);
        }
        let referent = produce(self);
        Value::Object(Some(self.new_ref(referent, RefKind::Local)))
    }

    fn raise_if_configured(&mut self, class: &str, name: &str) {
        if self.throwing.contains(&(class.to_owned(), name.to_owned())) {
            self.pending = true;
        }
    }
}

fn handle(id: usize) -> ObjectHandle {
    ObjectHandle::from_raw(id as *mut c_void).expect("non-zero handle")
}

// ── FakeRuntime ───────────────────────────────────────────────────────────────

pub(crate) struct FakeRuntime {
    state: Mutex<State>,
}

impl FakeRuntime {
    /// A host whose default display is `width` × `height`, rotation 0, 60 Hz.
    pub(crate) fn display(width: i32, height: i32) -> Arc<Self> {
        let mut state = State {
            next_id: 0x1000,
            refs: HashMap::new(),
            objects: HashMap::new(),
            members: HashMap::new(),
            member_ids: HashMap::new(),
            missing_classes: HashSet::new(),
            missing_members: HashSet::new(),
            throwing: HashSet::new(),
            null_returning: HashSet::new(),
            pending: false,
            attachable: true,
            native_window_fails: false,
            width,
            height,
            rotation: 0,
            refresh_rate: 60.0,
            calls: Vec::new(),
            double_deletes: 0,
            native_windows: HashSet::new(),
            released_unknown: Vec::new(),
            host: 0,
            hooks: HashMap::new(),
        };
        let activity = state.new_obj(ACTIVITY, None);
        let host = state.new_ref(activity, RefKind::Pinned);
        state.host = host.as_ptr() as usize;
        Arc::new(Self {
            state: Mutex::new(state),
        })
    }

    /// The host activity object every chain starts from.
    pub(crate) fn host(&self) -> ObjectHandle {
        handle(self.state.lock().host)
    }

    // ── Knobs ─────────────────────────────────────────────────────────────────

    pub(crate) fn set_attachable(&self, attachable: bool) {
        self.state.lock().attachable = attachable;
    }

    pub(crate) fn remove_class(&self, class: &str) {
        self.state.lock().missing_classes.insert(class.to_owned());
    }

    pub(crate) fn remove_method(&self, class: &str, name: &str) {
        self.state
            .lock()
            .missing_members
            .insert((class.to_owned(), name.to_owned()));
    }

    pub(crate) fn throw_from(&self, class: &str, name: &str) {
        self.state.lock().throwing.insert((class.to_owned(), name.to_owned()));
    }

    pub(crate) fn return_null_from(&self, class: &str, name: &str) {
        self.state
            .lock()
            .null_returning
            .insert((class.to_owned(), name.to_owned()));
    }

    pub(crate) fn set_rotation(&self, rotation: i32) {
        self.state.lock().rotation = rotation;
    }

    pub(crate) fn set_refresh_rate(&self, hz: f32) {
        self.state.lock().refresh_rate = hz;
    }

    pub(crate) fn fail_native_window(&self) {
        self.state.lock().native_window_fails = true;
    }

    /// Run `hook` every time a method named `method` returns.
    pub(crate) fn on_call(&self, method: &str, hook: impl Fn() + Send + Sync + 'static) {
        self.state.lock().hooks.insert(method.to_owned(), Arc::new(hook));
    }

    pub(crate) fn clear_hooks(&self) {
        self.state.lock().hooks.clear();
    }

    pub(crate) fn raise_pending(&self) {
        self.state.lock().pending = true;
    }

    // ── Observations ──────────────────────────────────────────────────────────

    pub(crate) fn live_locals(&self) -> usize {
        self.count(RefKind::Local)
    }

    pub(crate) fn live_globals(&self) -> usize {
        self.count(RefKind::Global)
    }

    fn count(&self, kind: RefKind) -> usize {
        self.state.lock().refs.values().filter(|(_, k)| *k == kind).count()
    }

    pub(crate) fn double_deletes(&self) -> usize {
        self.state.lock().double_deletes
    }

    pub(crate) fn live_native_windows(&self) -> usize {
        self.state.lock().native_windows.len()
    }

    pub(crate) fn released_unknown_windows(&self) -> Vec<NativeWindow> {
        self.state.lock().released_unknown.clone()
    }

    pub(crate) fn calls(&self) -> Vec<Call> {
        self.state.lock().calls.clone()
    }

    /// Arguments of every recorded call to `method`, in order.
    pub(crate) fn calls_to(&self, method: &str) -> Vec<Vec<Arg>> {
        self.state
            .lock()
            .calls
            .iter()
            .filter(|c| c.method == method)
            .map(|c| c.args.clone())
            .collect()
    }

    pub(crate) fn clear_calls(&self) {
        self.state.lock().calls.clear();
    }

    /// Class name of the object a handle refers to.
    pub(crate) fn class_of(&self, obj: ObjectHandle) -> Option<String> {
        self.state.lock().class_of(obj)
    }
}

impl Runtime for FakeRuntime {
    fn attach(&self) -> Option<Box<dyn Env + '_>> {
        if !self.state.lock().attachable {
            return None;
        }
        Some(Box::new(FakeEnv { rt: self }))
    }

    fn release_native_window(&self, window: NativeWindow) {
        let mut s = self.state.lock();
        if !s.native_windows.remove(&(window.as_ptr() as usize)) {
            s.released_unknown.push(window);
        }
    }
}

// ── FakeEnv ───────────────────────────────────────────────────────────────────

struct FakeEnv<'a> {
    rt: &'a FakeRuntime,
}

impl Env for FakeEnv<'_> {
    fn find_class(&self, name: &str) -> Option<ObjectHandle> {
        let mut s = self.rt.state.lock();
        if s.missing_classes.contains(name) {
            return None;
        }
        let class = s.new_obj(CLASS, Some(name));
        Some(s.new_ref(class, RefKind::Local))
    }

    fn object_class(&self, obj: ObjectHandle) -> Option<ObjectHandle> {
        let mut s = self.rt.state.lock();
        let name = s.class_of(obj)?;
        let class = s.new_obj(CLASS, Some(&name));
        Some(s.new_ref(class, RefKind::Local))
    }

    fn method_id(&self, class: ObjectHandle, name: &str, sig: &str) -> Option<MemberId> {
        let mut s = self.rt.state.lock();
        let owner = s.described_class(class)?;
        if s.missing_members.contains(&(owner.clone(), name.to_owned())) {
            return None;
        }
        let known = methods()
            .iter()
            .any(|(c, n, g)| *c == owner && *n == name && g == sig);
        known.then(|| s.intern_member(&owner, name, sig))
    }

    fn field_id(&self, class: ObjectHandle, name: &str, sig: &str) -> Option<MemberId> {
        let mut s = self.rt.state.lock();
        let owner = s.described_class(class)?;
        if s.missing_members.contains(&(owner.clone(), name.to_owned())) {
            return None;
        }
        let known = FIELDS
            .iter()
            .any(|(c, n, g)| *c == owner && *n == name && *g == sig);
        known.then(|| s.intern_member(&owner, name, sig))
    }

    fn new_object(&self, class: ObjectHandle, ctor: MemberId, args: &[Arg]) -> Option<ObjectHandle> {
        let mut s = self.rt.state.lock();
        let owner = s.described_class(class)?;
        let (member_class, name) = s.member(ctor)?;
        assert_eq!(member_class, owner, "constructor used on the wrong class");
        assert_eq!(name, "<init>", "new_object called with a non-constructor");
        s.calls.push(Call {
            class: owner.clone(),
            method: name.clone(),
            args: args.to_vec(),
        });
        s.raise_if_configured(&owner, &name);
        if s.null_returning.contains(&(owner.clone(), name)) {
            return None;
        }
        let obj = s.new_obj(&owner, None);
        Some(s.new_ref(obj, RefKind::Local))
    }

    fn call_method(&self, target: ObjectHandle, method: MemberId, ret: ReturnKind, args: &[Arg]) -> Value {
        let mut s = self.rt.state.lock();
        let Some((class, name)) = s.member(method) else {
            return Value::Void;
        };
        let target_class = s.class_of(target).expect("call on a released reference");
        assert_eq!(target_class, class, "{name} called on a {target_class}");
        s.calls.push(Call {
            class: class.clone(),
            method: name.clone(),
            args: args.to_vec(),
        });
        s.raise_if_configured(&class, &name);

        let value = match (class.as_str(), name.as_str()) {
            (ACTIVITY, "getWindowManager") => s.object_result(&class, &name, |s| s.new_obj(WINDOW_MANAGER, None)),
            (ACTIVITY, "getWindow") => s.object_result(&class, &name, |s| s.new_obj(WINDOW, None)),
            (WINDOW_MANAGER, "getDefaultDisplay") => s.object_result(&class, &name, |s| s.new_obj(DISPLAY, None)),
            (WINDOW, "getDecorView") => s.object_result(&class, &name, |s| s.new_obj(DECOR_VIEW, None)),
            (DECOR_VIEW, "getViewRootImpl") => s.object_result(&class, &name, |s| s.new_obj(VIEW_ROOT, None)),
            (VIEW_ROOT, "getSurfaceControl") | (BUILDER, "build") => {
                s.object_result(&class, &name, |s| s.new_obj(SURFACE_CONTROL, None))
            }
            (DISPLAY, "getRealMetrics") => {
                if let Some(Arg::Object(metrics)) = args.first() {
                    let (w, h) = (s.width, s.height);
                    let r = s.referent(*metrics).expect("live metrics reference");
                    if let Some(obj) = s.objects.get_mut(&r) {
                        obj.fields.insert("widthPixels".into(), Value::Int(w));
                        obj.fields.insert("heightPixels".into(), Value::Int(h));
                        obj.fields.insert("density".into(), Value::Float(2.75));
                        obj.fields.insert("densityDpi".into(), Value::Int(440));
                    }
                }
                Value::Void
            }
            (DISPLAY, "getRotation") => Value::Int(s.rotation),
            (DISPLAY, "getRefreshRate") => Value::Float(s.refresh_rate),
            (BUILDER, _) | (TRANSACTION, _) if ret == ReturnKind::Object => {
                // Fluent setters return `this`.
                let r = s.referent(target).expect("live receiver");
                s.object_result(&class, &name, |_| r)
            }
            _ => Value::Void,
        };
        let hook = s.hooks.get(&name).cloned();
        drop(s);
        if let Some(hook) = hook {
            hook();
        }
        value
    }

    fn field_value(&self, obj: ObjectHandle, field: MemberId, kind: ReturnKind) -> Value {
        let s = self.rt.state.lock();
        let Some((_, name)) = s.member(field) else {
            return Value::Void;
        };
        let stored = s
            .referent(obj)
            .and_then(|r| s.objects.get(&r))
            .and_then(|o| o.fields.get(&name).copied());
        match (stored, kind) {
            (Some(v), _) => v,
            (None, ReturnKind::Float) => Value::Float(0.0),
            (None, _) => Value::Int(0),
        }
    }

    fn new_string(&self, _text: &str) -> Option<ObjectHandle> {
        let mut s = self.rt.state.lock();
        let obj = s.new_obj(STRING, None);
        Some(s.new_ref(obj, RefKind::Local))
    }

    fn delete_local_ref(&self, obj: ObjectHandle) {
        let mut s = self.rt.state.lock();
        let key = obj.as_ptr() as usize;
        match s.refs.get(&key) {
            Some((_, RefKind::Local)) => {
                s.refs.remove(&key);
            }
            _ => s.double_deletes += 1,
        }
    }

    fn new_global_ref(&self, obj: ObjectHandle) -> Option<ObjectHandle> {
        let mut s = self.rt.state.lock();
        let referent = s.referent(obj)?;
        Some(s.new_ref(referent, RefKind::Global))
    }

    fn delete_global_ref(&self, obj: ObjectHandle) {
        let mut s = self.rt.state.lock();
        let key = obj.as_ptr() as usize;
        match s.refs.get(&key) {
            Some((_, RefKind::Global)) => {
                s.refs.remove(&key);
            }
            _ => s.double_deletes += 1,
        }
    }

    fn exception_pending(&self) -> bool {
        self.rt.state.lock().pending
    }

    fn describe_and_clear_exception(&self) {
        self.rt.state.lock().pending = false;
    }

    fn native_window_from_surface(&self, surface: ObjectHandle) -> Option<NativeWindow> {
        let mut s = self.rt.state.lock();
        assert_eq!(s.class_of(surface).as_deref(), Some(SURFACE));
        if s.native_window_fails {
            return None;
        }
        let id = s.next();
        s.native_windows.insert(id);
        NativeWindow::from_raw(id as *mut c_void)
    }
}
