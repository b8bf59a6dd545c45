//! Shared harness for golden-program integration tests (SPEC_FULL §13).
//!
//! Each file under `tests/` mirrors one `original_source/testing/*.cpp`
//! file, translating its `(program, input, result, output prefix)` table
//! into rill's semicolon-terminated concrete syntax and driving it through
//! a real [`Jit`], the same way `driver.rs`'s own inline tests do.

use rill_runtime::context::RuntimeContext;
use rill_vm::driver::Jit;
use std::cell::RefCell;
use std::io::Cursor;
use std::rc::Rc;

/// `RuntimeContext::with_streams` takes `Box<dyn Write>` (implicitly
/// `+ 'static`), so a borrowed `&mut Vec<u8>` can't be boxed into it directly
/// — sharing ownership through `Rc<RefCell<_>>` gets the bytes back out
/// afterwards without needing a lifetime on `RuntimeContext`.
#[derive(Clone)]
struct SharedBuf(Rc<RefCell<Vec<u8>>>);

impl std::io::Write for SharedBuf {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }
    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// Compiles and runs `source` against a fresh JIT instance, feeding `input`
/// in as stdin, and returns everything written to stdout. Panics (failing
/// the enclosing test) if compilation or execution errors — use
/// [`try_run`] for golden cases that expect a rejection.
pub fn run(source: &str, input: &str) -> String {
    try_run(source, input).unwrap_or_else(|e| panic!("expected {source:?} to run, got error: {e}"))
}

/// Like [`run`], but returns the error message instead of panicking.
pub fn try_run(source: &str, input: &str) -> Result<String, String> {
    let mut jit = Jit::new().map_err(|e| e.to_string())?;
    let out = SharedBuf(Rc::new(RefCell::new(Vec::new())));
    let mut ctx = RuntimeContext::with_streams(Box::new(Cursor::new(input.as_bytes().to_vec())), Box::new(out.clone()));
    jit.run(source, &mut ctx).map_err(|e| e.to_string())?;
    ctx.flush();
    Ok(String::from_utf8(out.0.borrow().clone()).expect("program output should be valid UTF-8"))
}

/// Asserts that `run(source, input)`'s captured output starts with `prefix`,
/// matching `original_source/testing/*.cpp`'s own
/// `jit.getOutput().starts_with(test.output)` assertion style.
pub fn assert_prefix(source: &str, input: &str, prefix: &str) {
    let out = run(source, input);
    assert!(out.starts_with(prefix), "expected output starting with {prefix:?}, got {out:?}");
}
