//! Runtime context layout (§6): the handle generated code threads through
//! every call into this crate.
//!
//! Grounded on `original_source/src/utility/Context.hpp`'s `Context` class:
//! a raw, geometrically-growing globals array, the input/output streams, and
//! (by reference, not duplicated here) the constants pool and global symbol
//! table that live on the `rill_vm` side of the boundary. Those last two stay
//! opaque `rill_vm`-owned pointers as far as this crate is concerned — the
//! runtime never reaches into them, it only carries the pointer so generated
//! code can pass one `&mut RuntimeContext` around instead of half a dozen
//! loose arguments.

use crate::value::RawValue;
use crate::RuntimeError;
use std::cell::RefCell;
use std::ffi::c_void;
use std::io::{self, BufRead, Write};

thread_local! {
    static LAST_ERROR: RefCell<Option<RuntimeError>> = RefCell::new(None);
}

/// Records a runtime error for the current thread. A call that can fail
/// (list indexing, UTF-8 validation) sets this instead of aborting in
/// place, and keeps going with a harmless fallback value; the driver
/// checks [`take_last_error`] once the current submission's entry point
/// returns and turns a `Some` into the top-level error report, matching
/// §5's "propagates to the top-level driver" without needing a native
/// exception mechanism or per-call branching in generated code.
pub fn set_last_error(err: RuntimeError) {
    LAST_ERROR.with(|slot| *slot.borrow_mut() = Some(err));
}

/// Takes (and clears) the last recorded runtime error, if any.
pub fn take_last_error() -> Option<RuntimeError> {
    LAST_ERROR.with(|slot| slot.borrow_mut().take())
}

/// The geometrically-growing global value array plus I/O handles that every
/// runtime call receives a pointer to.
pub struct RuntimeContext {
    globals: Vec<RawValue>,
    /// Opaque pointer to `rill_vm`'s `Constants` pool; never dereferenced by
    /// this crate, only carried for generated code's convenience.
    pub constants_ptr: *mut c_void,
    /// Opaque pointer to `rill_vm`'s global symbol table.
    pub globals_symbols_ptr: *mut c_void,
    /// Opaque pointer to `rill_vm`'s function/class cache.
    pub cache_ptr: *mut c_void,
    input: Box<dyn BufRead>,
    output: Box<dyn Write>,
}

impl RuntimeContext {
    /// Builds a context over real process stdin/stdout, as the CLI and REPL
    /// do.
    pub fn with_stdio() -> Self {
        RuntimeContext {
            globals: Vec::new(),
            constants_ptr: std::ptr::null_mut(),
            globals_symbols_ptr: std::ptr::null_mut(),
            cache_ptr: std::ptr::null_mut(),
            input: Box::new(io::BufReader::new(io::stdin())),
            output: Box::new(io::stdout()),
        }
    }

    /// Builds a context over caller-supplied streams, for golden-program
    /// tests that capture output into an in-memory buffer.
    pub fn with_streams(input: Box<dyn BufRead>, output: Box<dyn Write>) -> Self {
        RuntimeContext {
            globals: Vec::new(),
            constants_ptr: std::ptr::null_mut(),
            globals_symbols_ptr: std::ptr::null_mut(),
            cache_ptr: std::ptr::null_mut(),
            input,
            output,
        }
    }

    /// Grows the global array to at least `len` slots, zero-filling new
    /// slots, the way `Context`'s `RawArray` geometrically reallocates
    /// `rawGlobals` as new top-level variables are declared.
    pub fn ensure_globals(&mut self, len: usize) {
        if self.globals.len() < len {
            self.globals.resize(len, RawValue::from_integer(0));
        }
    }

    pub fn global_slot(&mut self, index: usize) -> &mut RawValue {
        self.ensure_globals(index + 1);
        &mut self.globals[index]
    }

    pub fn globals_len(&self) -> usize {
        self.globals.len()
    }

    pub(crate) fn write_str(&mut self, s: &str) {
        let _ = self.output.write_all(s.as_bytes());
    }

    pub fn flush(&mut self) {
        let _ = self.output.flush();
    }

    pub(crate) fn read_line(&mut self) -> io::Result<String> {
        let mut line = String::new();
        self.input.read_line(&mut line)?;
        if line.ends_with('\n') {
            line.pop();
            if line.ends_with('\r') {
                line.pop();
            }
        }
        Ok(line)
    }
}

/// Returns a pointer to global slot `index`, growing the backing array first
/// if necessary. Generated code calls this on every global access rather
/// than caching the pointer across calls, since a growth can relocate the
/// backing `Vec` (§5: "generated code always re-loads the array base through
/// `context.globals`").
///
/// # Safety
/// `ctx` must point at a live `RuntimeContext`.
#[no_mangle]
pub unsafe extern "C" fn context_global_slot(ctx: *mut RuntimeContext, index: i64) -> *mut RawValue {
    (*ctx).global_slot(index as usize) as *mut RawValue
}

/// Returns the opaque `rill_vm::Constants` pool pointer carried by `ctx`, for
/// generated code's string/complex literal sites to pass on to
/// `rill_vm::constants::constants_get_string`/`constants_get_complex`.
///
/// # Safety
/// `ctx` must point at a live `RuntimeContext`.
#[no_mangle]
pub unsafe extern "C" fn context_constants_ptr(ctx: *mut RuntimeContext) -> *mut c_void {
    (*ctx).constants_ptr
}

impl std::fmt::Debug for RuntimeContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuntimeContext")
            .field("globals_len", &self.globals.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn globals_grow_and_zero_fill() {
        let mut ctx = RuntimeContext::with_stdio();
        *ctx.global_slot(3) = RawValue::from_integer(7);
        assert_eq!(ctx.globals_len(), 4);
        assert_eq!(unsafe { ctx.global_slot(0).as_integer() }, 0);
        assert_eq!(unsafe { ctx.global_slot(3).as_integer() }, 7);
    }

    #[test]
    fn last_error_roundtrip() {
        take_last_error();
        assert!(take_last_error().is_none());
        set_last_error(RuntimeError::BadString);
        assert_eq!(take_last_error(), Some(RuntimeError::BadString));
        assert!(take_last_error().is_none());
    }
}
