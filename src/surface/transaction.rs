// ── SurfaceControl.Transaction ────────────────────────────────────────────────
//
// One-shot batch of compositor mutations.  Nothing queued here is visible
// until `apply`, which commits the whole batch at once.  Same live/inert
// split as the builder: mutators on an inert transaction, or against a null
// target, do nothing.

use crate::{
    reflect::{self, Method},
    refs::ScopedObjectRef,
    runtime::{Arg, Env, ObjectHandle},
};

const TRANSACTION_CLASS: &str = "android/view/SurfaceControl$Transaction";

/// Just below `i32::MAX`, which the compositor reserves.
pub(crate) const TOP_LAYER: i32 = i32::MAX - 1;

const SET_ALPHA: Method = Method {
    name: "setAlpha",
    sig: "(Landroid/view/SurfaceControl;F)Landroid/view/SurfaceControl$Transaction;",
};
const SET_LAYER: Method = Method {
    name: "setLayer",
    sig: "(Landroid/view/SurfaceControl;I)Landroid/view/SurfaceControl$Transaction;",
};
const SHOW: Method = Method {
    name: "show",
    sig: "(Landroid/view/SurfaceControl;)Landroid/view/SurfaceControl$Transaction;",
};
const HIDE: Method = Method {
    name: "hide",
    sig: "(Landroid/view/SurfaceControl;)Landroid/view/SurfaceControl$Transaction;",
};
const REMOVE: Method = Method {
    name: "remove",
    sig: "(Landroid/view/SurfaceControl;)Landroid/view/SurfaceControl$Transaction;",
};
const APPLY: Method = Method {
    name: "apply",
    sig: "()V",
};

enum State<'e> {
    Live(ScopedObjectRef<'e>),
    Inert,
}

pub(crate) struct Transaction<'e> {
    env: &'e dyn Env,
    state: State<'e>,
    /// Mutations the runtime accepted since construction.
    queued: usize,
}

impl<'e> Transaction<'e> {
    /// `new SurfaceControl.Transaction()`.
    pub(crate) fn new(env: &'e dyn Env) -> Self {
        let state = match reflect::construct(env, TRANSACTION_CLASS, "()V", &[]) {
            Ok(tx) => State::Live(tx),
            Err(e) => {
                log::warn!("SurfaceControl.Transaction unavailable: {e}");
                State::Inert
            }
        };
        Self { env, state, queued: 0 }
    }

    #[cfg(test)]
    pub(crate) fn is_valid(&self) -> bool {
        matches!(&self.state, State::Live(tx) if tx.is_valid())
    }

    #[cfg(test)]
    pub(crate) fn queued(&self) -> usize {
        self.queued
    }

    fn queue(mut self, method: Method, target: Option<ObjectHandle>, extra: Option<Arg>) -> Self {
        let receiver = match &self.state {
            State::Live(tx) => tx.get(),
            State::Inert => None,
        };
        let (Some(receiver), Some(target)) = (receiver, target) else {
            return self;
        };
        let mut args = vec![Arg::Object(target)];
        args.extend(extra);
        match reflect::call_object(self.env, receiver, method, &args) {
            Ok(_this) => self.queued += 1,
            Err(e) => log::debug!("SurfaceControl.Transaction.{} skipped: {e}", method.name),
        }
        self
    }

    pub(crate) fn set_alpha(self, target: Option<ObjectHandle>, alpha: f32) -> Self {
        self.queue(SET_ALPHA, target, Some(Arg::Float(alpha)))
    }

    pub(crate) fn set_layer(self, target: Option<ObjectHandle>, z: i32) -> Self {
        self.queue(SET_LAYER, target, Some(Arg::Int(z)))
    }

    pub(crate) fn show(self, target: Option<ObjectHandle>) -> Self {
        self.queue(SHOW, target, None)
    }

    pub(crate) fn hide(self, target: Option<ObjectHandle>) -> Self {
        self.queue(HIDE, target, None)
    }

    pub(crate) fn remove(self, target: Option<ObjectHandle>) -> Self {
        self.queue(REMOVE, target, None)
    }

    /// Commit every queued mutation.  Returns `true` if the commit reached
    /// the compositor.
    pub(crate) fn apply(self) -> bool {
        let State::Live(tx) = &self.state else {
            return false;
        };
        let Some(receiver) = tx.get() else {
            return false;
        };
        match reflect::call_void(self.env, receiver, APPLY, &[]) {
            Ok(()) => {
                log::debug!("SurfaceControl.Transaction applied {} mutation(s)", self.queued);
                true
            }
            Err(e) => {
                log::warn!("SurfaceControl.Transaction.apply failed: {e}");
                false
            }
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
