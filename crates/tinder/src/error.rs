//! Tinder error taxonomy: compile-time failures and script runtime errors.

use firestarter::FirestarterError;
use tinder_core::CrucibleError;

/// Errors raised while compiling a script: parse/reduce failures from the
/// Firestarter layer plus resolver structure errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum CompileError {
    #[error(transparent)]
    Firestarter(#[from] FirestarterError),

    /// A structured marker without its partner (`endif` with no `if`, an
    /// unterminated `for`, ...).
    #[error("error on line {line}: unmatched '{marker}'")]
    UnmatchedBlock { line: usize, marker: &'static str },

    #[error("error on line {line}: duplicate label '{label}'")]
    DuplicateLabel { line: usize, label: String },

    #[error("unknown grammar version '{0}'")]
    UnknownVersion(String),
}

/// Errors raised while a script runs. The interrupt table matches handlers
/// against [`name`](RuntimeError::name).
#[derive(Debug, Clone, thiserror::Error)]
pub enum RuntimeError {
    #[error(transparent)]
    Crucible(#[from] CrucibleError),

    #[error("division by zero")]
    DivideByZero,

    #[error("cannot {op} {left} and {right}")]
    TypeMismatch {
        op: &'static str,
        left: &'static str,
        right: &'static str,
    },

    #[error("value of type {0} is not iterable")]
    NotIterable(&'static str),

    #[error("jump target '{0}' is not an instruction index")]
    BadJumpTarget(String),

    #[error("invalid index {index} into {container}")]
    BadIndex {
        index: String,
        container: &'static str,
    },

    /// A structured block reached the runtime without resolver linking.
    #[error("structured block was not resolved")]
    UnlinkedBlock,
}

impl RuntimeError {
    /// Stable name used to match registered interrupt handlers.
    pub fn name(&self) -> &'static str {
        match self {
            RuntimeError::Crucible(inner) => match inner {
                CrucibleError::ValueNotFound(_) => "ValueNotFound",
                CrucibleError::KeyNotFound { .. } => "KeyNotFound",
                CrucibleError::ReadOnly(_) => "ReadOnlyError",
                CrucibleError::Protected { .. } | CrucibleError::ProtectedScope(_) => {
                    "ProtectedError"
                }
                CrucibleError::Shadowing(_) => "ShadowingError",
                CrucibleError::Constant(_) => "ConstantError",
                CrucibleError::NotCallable(_) => "NotCallable",
                CrucibleError::Serialize(_) => "SerializeError",
                CrucibleError::Deserialization(_) => "DeserializationError",
                CrucibleError::CallFailed(_) => "CallError",
            },
            RuntimeError::DivideByZero => "DivideByZero",
            RuntimeError::TypeMismatch { .. } => "TypeMismatch",
            RuntimeError::NotIterable(_) => "NotIterable",
            RuntimeError::BadJumpTarget(_) => "BadJumpTarget",
            RuntimeError::BadIndex { .. } => "BadIndex",
            RuntimeError::UnlinkedBlock => "UnlinkedBlock",
        }
    }
}

/// A runtime error wrapped with the source line it occurred on, surfaced to
/// the host when no interrupt handler claimed it.
#[derive(Debug, Clone, thiserror::Error)]
#[error("error at line {line}: {cause}")]
pub struct ScriptError {
    pub line: usize,
    pub cause: RuntimeError,
}
