//! Runtime support library for rill JIT-compiled code.
//!
//! Every function here is `extern "C"` and registered as a JIT symbol by
//! `rill_vm::jit`; generated code calls these exactly as it would call a
//! statically linked native function. None of these panic on well-formed
//! input; malformed UTF-8 and out-of-range indices are reported through
//! [`RuntimeError`] via the thread-local slot in [`context`].

pub mod abi;
pub mod context;
pub mod convert;
pub mod format;
pub mod heap;
pub mod ops;
pub mod strings;
pub mod value;

pub use abi::RawKind;
pub use context::RuntimeContext;
pub use heap::{Complex, Instance, RList, RString};
pub use value::RawValue;

use thiserror::Error;

/// Runtime errors from §7: fatal to the current submission, reported by the
/// top-level driver.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum RuntimeError {
    #[error("index {index} out of range for length {length}")]
    IndexOutOfRange { index: i64, length: usize },
    #[error("malformed UTF-8 string")]
    BadString,
}
