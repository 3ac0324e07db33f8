//! Errors raised by Crucible operations.

/// Errors raised when reading, writing, calling, or serializing values in a
/// [`Crucible`](crate::Crucible).
///
/// Write errors carry the dotted path that was rejected so script-level
/// diagnostics can point at the offending variable.
#[derive(Debug, Clone, thiserror::Error)]
pub enum CrucibleError {
    /// No scope in the chain defines the variable.
    #[error("variable '{0}' not found in the crucible")]
    ValueNotFound(String),

    /// A path component did not resolve inside an existing container.
    #[error("key '{key}' not found at '{at}' in the crucible")]
    KeyNotFound { key: String, at: String },

    /// Write attempted on a read-only scope.
    #[error("cannot write '{0}': scope is read-only")]
    ReadOnly(String),

    /// Write would change the runtime type of a protected variable.
    #[error("cannot mutate '{path}': type {existing} -> {incoming} is invalid")]
    Protected {
        path: String,
        existing: &'static str,
        incoming: &'static str,
    },

    /// Write would introduce a new key into a protected scope.
    #[error("cannot write '{0}': scope is protected")]
    ProtectedScope(String),

    /// Write would shadow an ancestor variable in a no-shadowing scope.
    #[error("cannot shadow variable '{0}': shadowing is not allowed in this scope")]
    Shadowing(String),

    /// Write attempted on a key frozen by a `const` declaration.
    #[error("cannot write '{0}': variable is constant")]
    Constant(String),

    /// `call` target is not a callable value.
    #[error("variable '{0}' is not callable")]
    NotCallable(String),

    /// The value has no tagged serialization (callables, for instance).
    #[error("cannot serialize value of type {0}")]
    Serialize(&'static str),

    /// Unknown tag or malformed payload during rehydration.
    #[error("cannot deserialize value: {0}")]
    Deserialization(String),

    /// A native function rejected its arguments.
    #[error("{0}")]
    CallFailed(String),
}
