// ── Reference ownership ───────────────────────────────────────────────────────
//
// Two lifetimes, two types:
//   • `ScopedObjectRef<'e>` – a local reference.  Borrows the `Env` it came
//     from, so the borrow checker rejects any attempt to keep it past the
//     attachment; `DeleteLocalRef` runs on drop.
//   • `DurableObjectRef`   – a global reference.  Owns an `Arc<dyn Runtime>`
//     so it can release itself from any thread; `DeleteGlobalRef` runs once,
//     either through `release` or on drop.
//
// Neither type is `Clone`.  Moving one moves the obligation to release it.

use std::{fmt, sync::Arc};

use crate::{
    error::{ReflectError, Result},
    runtime::{Env, ObjectHandle, Runtime},
};

// ── ScopedObjectRef ───────────────────────────────────────────────────────────

/// A local reference released when it goes out of scope.
pub(crate) struct ScopedObjectRef<'e> {
    env: &'e dyn Env,
    obj: Option<ObjectHandle>,
}

impl<'e> ScopedObjectRef<'e> {
    /// Take ownership of a local reference returned by a reflective call.
    pub(crate) fn new(env: &'e dyn Env, obj: Option<ObjectHandle>) -> Self {
        Self { env, obj }
    }

    pub(crate) fn get(&self) -> Option<ObjectHandle> {
        self.obj
    }

    pub(crate) fn is_valid(&self) -> bool {
        self.obj.is_some()
    }

    /// The handle, or `NullResult` naming the call that produced it.
    pub(crate) fn require(&self, call: &'static str) -> Result<ObjectHandle> {
        self.obj.ok_or(ReflectError::NullResult { call })
    }
}

impl Drop for ScopedObjectRef<'_> {
    fn drop(&mut self) {
        if let Some(obj) = self.obj.take() {
            self.env.delete_local_ref(obj);
        }
    }
}

impl fmt::Debug for ScopedObjectRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ScopedObjectRef").field(&self.obj).finish()
    }
}

// ── DurableObjectRef ──────────────────────────────────────────────────────────

/// A global reference that keeps its referent alive until released.
pub(crate) struct DurableObjectRef {
    runtime: Arc<dyn Runtime>,
    obj: Option<ObjectHandle>,
}

impl DurableObjectRef {
    /// Promote a local reference to a global one.
    ///
    /// The local reference is left untouched; the caller's scope still owns it.
    pub(crate) fn promote(
        runtime: &Arc<dyn Runtime>,
        env: &dyn Env,
        local: &ScopedObjectRef<'_>,
    ) -> Option<Self> {
        let global = env.new_global_ref(local.get()?)?;
        Some(Self {
            runtime: Arc::clone(runtime),
            obj: Some(global),
        })
    }

    /// A second, independently released global reference to the same
    /// referent.  `None` once this one has been released.
    pub(crate) fn duplicate(&self, env: &dyn Env) -> Option<Self> {
        let global = env.new_global_ref(self.obj?)?;
        Some(Self {
            runtime: Arc::clone(&self.runtime),
            obj: Some(global),
        })
    }

    pub(crate) fn get(&self) -> Option<ObjectHandle> {
        self.obj
    }

    pub(crate) fn is_valid(&self) -> bool {
        self.obj.is_some()
    }

    /// Release through an `Env` the caller already holds.  Idempotent.
    pub(crate) fn release_with(&mut self, env: &dyn Env) {
        if let Some(obj) = self.obj.take() {
            env.delete_global_ref(obj);
        }
    }

    /// Release, attaching the current thread if needed.  Idempotent.
    ///
    /// If the runtime can no longer be attached the reference is abandoned:
    /// there is nothing left to release it against.
    pub(crate) fn release(&mut self) {
        let Some(obj) = self.obj.take() else {
            return;
        };
        match self.runtime.attach() {
            Some(env) => env.delete_global_ref(obj),
            None => log::warn!("global reference {obj:?} abandoned: runtime not attachable"),
        }
    }
}

impl Drop for DurableObjectRef {
    fn drop(&mut self) {
        self.release();
    }
}

impl fmt::Debug for DurableObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("DurableObjectRef").field(&self.obj).finish()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
