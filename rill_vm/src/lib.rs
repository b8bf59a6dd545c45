//! Type inference, Cranelift code generation, and the JIT driver for rill
//! (§4, §5, §6).
//!
//! `rill_parser` produces the AST; this crate is everything between that
//! tree and a runnable function pointer: the type model (§4.1), the
//! function/class instantiation cache (§4.1/§4.5), the two-pass type
//! inference engine (§4.2), the Cranelift code generator (§4.3/§4.4), and
//! the driver that links and executes one compilation unit (§4.5).

pub mod cache;
pub mod codegen;
pub mod constants;
pub mod driver;
pub mod error;
pub mod infer;
pub mod symbols;
pub mod types;

pub use error::{Error, Result};
