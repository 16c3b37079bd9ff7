// ── Central error types ───────────────────────────────────────────────────────
//
// Reflective steps inside the crate return `error::Result<T>`.  Nothing in
// here crosses the `Overlay` facade: it logs the error and reports failure as
// `None` / `false`.

use thiserror::Error;

/// Why a reflective call chain stopped early.
///
/// Every variant is recoverable; the caller decides whether the step was
/// optional (degrade) or required (abort `create`).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReflectError {
    /// The calling thread could not be attached to the managed runtime.
    #[error("managed runtime is not attachable from this thread")]
    NotAttached,

    /// `FindClass` / `GetObjectClass` found nothing.
    #[error("class {class} not found")]
    ClassNotFound {
        /// JNI-style class name, or a description of the receiver.
        class: &'static str,
    },

    /// The method is absent on this runtime version.
    #[error("method {name}{sig} not found")]
    MethodNotFound {
        /// Method name, e.g. `"getWindowManager"`.
        name: &'static str,
        /// JNI signature, e.g. `"()Landroid/view/WindowManager;"`.
        sig: &'static str,
    },

    /// The field is absent on this runtime version.
    #[error("field {name} not found")]
    FieldNotFound {
        /// Field name, e.g. `"widthPixels"`.
        name: &'static str,
    },

    /// A call succeeded but returned `null` where an object was required.
    #[error("{call} returned null")]
    NullResult {
        /// The call that produced the null, for display purposes.
        call: &'static str,
    },

    /// The call raised a Java exception (already described and cleared).
    #[error("{call} raised an exception")]
    Exception {
        /// The call that raised, for display purposes.
        call: &'static str,
    },
}

/// Errors from loading [`CreateOptions`](crate::CreateOptions).
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The JSON text did not describe a valid options record.
    #[error("invalid overlay options: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Convenience alias used throughout the reflective layers.
pub type Result<T> = std::result::Result<T, ReflectError>;
