//! Unified error taxonomy: a user-facing logic error raised during
//! inference or codegen, an internal-inconsistency error carrying a
//! source location, and a runtime error, as a flat `thiserror` enum
//! with one variant per failure class.

use thiserror::Error;

/// User-facing semantic errors raised by inference or codegen against a
/// well-formed parse tree (§7's "Logic error" list).
#[derive(Debug, Error, Clone, PartialEq)]
pub enum LogicError {
    #[error("variable '{0}' already exists in this scope")]
    VariableExists(String),
    #[error("variable '{0}' does not exist")]
    VariableNotExist(String),
    #[error("variable '{0}' has the wrong type for this operation")]
    VariableType(String),
    #[error("cannot assign to constant '{0}'")]
    NoConstantAssign(String),
    #[error("operator '{op}' is not valid for type {ty}")]
    BadOperatorForType { op: String, ty: String },
    #[error("type {0} cannot be the target of a conversion")]
    BadConvType(String),
    #[error("cannot convert from {from} to {to}")]
    BadConvTarget { from: String, to: String },
    #[error("'{0}' is not a known object")]
    BadObject(String),
    #[error("list index must be an integer")]
    IndexNotInt,
    #[error("too many indexes for this list")]
    TooManyIndexes,
    #[error("list elements must all share one type")]
    ListTypeMismatch,
    #[error("assigned value does not match the list's element type")]
    ListAssignMismatch,
    #[error("function '{0}' return type cannot change between calls")]
    FunctionTypeSet(String),
    #[error("wrong number of arguments for '{0}'")]
    WrongArgs(String),
    #[error("'{0}' is not a callable function or method")]
    CallableNotExist(String),
    #[error("class '{0}' already exists")]
    ClassExists(String),
    #[error("function '{0}' already exists")]
    FunctionExists(String),
    #[error("'return' must be the final statement in a block")]
    ReturnAtEnd,
    #[error("'return' is only valid inside a function or method")]
    ReturnOnlyInFunction,
    #[error("'{0}' cannot be called at the top level")]
    FunctionTopLevel(String),
    #[error("an empty list literal needs an explicit element type")]
    EmptyListNeedsType,
    #[error("unable to load native library '{0}'")]
    BadLibrary(String),
    #[error("native function '{0}' has an unsupported signature")]
    BadNativeFn(String),
}

/// "Should be unreachable for well-formed input" — the Rust analogue of
/// `CompilerError`/`UnexpectedError0`, carrying the Rust source location
/// that detected the inconsistency instead of a C++ `__FILE__`/`__LINE__`.
#[derive(Debug, Error, Clone, PartialEq)]
#[error("internal error at {file}:{line}: {message}")]
pub struct InternalError {
    pub file: &'static str,
    pub line: u32,
    pub message: String,
}

/// Raised by `rill_parser` (re-exported here so the driver has one `?`
/// surface across parse/infer/codegen).
pub use rill_parser::ParseError as SyntaxError;
/// Raised by `rill_runtime` at call time (out-of-range index, bad UTF-8).
pub use rill_runtime::RuntimeError;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum Error {
    #[error(transparent)]
    Syntax(#[from] SyntaxError),
    #[error(transparent)]
    Logic(#[from] LogicError),
    #[error(transparent)]
    Internal(#[from] InternalError),
    #[error(transparent)]
    Runtime(#[from] RuntimeError),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Builds an [`InternalError`] at the call site, the Rust analogue of
/// `original_source`'s `UnexpectedError0`/`CompilerError` macros.
#[macro_export]
macro_rules! bail_internal {
    ($($arg:tt)*) => {
        return Err($crate::error::Error::Internal($crate::error::InternalError {
            file: file!(),
            line: line!(),
            message: format!($($arg)*),
        }))
    };
}
