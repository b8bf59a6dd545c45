//! The constants pool (§4.1, §7): deduplicated heap-backed literals shared
//! by every instantiation in one compilation.
//!
//! Grounded on `original_source/src/utility/Constant.hpp`/`.cpp`'s
//! `Constants` class: `add()` linear-scans existing entries and returns the
//! index of a structural match instead of allocating a duplicate, and the
//! destructor frees each entry's heap payload while swallowing any error
//! that destruction raises (`try { ... } catch (...) {}` in the original —
//! here, `catch_unwind` around the one call that could conceivably panic).

use crate::types::Kind;
use rill_runtime::heap::{destroy_value, make_complex, make_string};
use rill_runtime::value::RawValue;

pub struct Constants {
    entries: Vec<(Kind, RawValue)>,
}

impl Constants {
    pub fn new() -> Self {
        Constants { entries: Vec::new() }
    }

    pub fn add_none(&mut self) -> usize {
        if let Some(idx) = self.entries.iter().position(|(k, _)| *k == Kind::None) {
            return idx;
        }
        self.push(Kind::None, RawValue::from_integer(0))
    }

    pub fn add_bool(&mut self, value: bool) -> usize {
        if let Some(idx) = self
            .entries
            .iter()
            .position(|(k, v)| *k == Kind::Boolean && unsafe { v.as_boolean() } == value)
        {
            return idx;
        }
        self.push(Kind::Boolean, RawValue::from_boolean(value))
    }

    pub fn add_integer(&mut self, value: i64) -> usize {
        if let Some(idx) = self
            .entries
            .iter()
            .position(|(k, v)| *k == Kind::Integer && unsafe { v.as_integer() } == value)
        {
            return idx;
        }
        self.push(Kind::Integer, RawValue::from_integer(value))
    }

    pub fn add_floating(&mut self, value: f64) -> usize {
        if let Some(idx) = self
            .entries
            .iter()
            .position(|(k, v)| *k == Kind::Floating && unsafe { v.as_floating() } == value)
        {
            return idx;
        }
        self.push(Kind::Floating, RawValue::from_floating(value))
    }

    pub fn add_complex(&mut self, real: f64, imag: f64) -> usize {
        // SAFETY: `make_complex` always returns a fresh, valid allocation.
        let candidate = unsafe { make_complex(real, imag) };
        let existing = self.entries.iter().position(|(k, v)| {
            *k == Kind::Complex && unsafe {
                let p = v.as_pointer() as *const rill_runtime::heap::Complex;
                (*p).real == real && (*p).imag == imag
            }
        });
        if let Some(idx) = existing {
            unsafe { rill_runtime::heap::destroy_complex(candidate) };
            return idx;
        }
        self.push(Kind::Complex, RawValue::from_pointer(candidate as *mut _))
    }

    pub fn add_string(&mut self, text: &str) -> usize {
        // SAFETY: `make_string` validates UTF-8 itself; `text` already is.
        let candidate = unsafe { make_string(text.as_ptr(), text.len()) };
        let existing = self.entries.iter().position(|(k, v)| {
            *k == Kind::String && unsafe {
                let p = v.as_pointer() as *const rill_runtime::heap::RString;
                rill_runtime::strings::str_view(p) == Some(text)
            }
        });
        if let Some(idx) = existing {
            unsafe { rill_runtime::heap::destroy_string(candidate) };
            return idx;
        }
        self.push(Kind::String, RawValue::from_pointer(candidate as *mut _))
    }

    pub fn get(&self, index: usize) -> Option<(Kind, RawValue)> {
        self.entries.get(index).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn push(&mut self, kind: Kind, value: RawValue) -> usize {
        let idx = self.entries.len();
        self.entries.push((kind, value));
        idx
    }
}

impl Default for Constants {
    fn default() -> Self {
        Self::new()
    }
}

/// Clones pool entry `index` (known statically by the code generator to
/// hold a `String`) for a literal's codegen site to own independently of
/// the pool's own copy.
///
/// # Safety
/// `constants` must point at a live `Constants` pool and `index` must name
/// an entry added by [`Constants::add_string`].
#[no_mangle]
pub unsafe extern "C" fn constants_get_string(constants: *const Constants, index: i64) -> *mut rill_runtime::heap::RString {
    let (_, value) = (*constants).get(index as usize).expect("codegen only emits indices returned by add_string");
    rill_runtime::heap::clone_string(value.as_pointer() as *mut _)
}

/// As [`constants_get_string`], for `Complex` entries.
///
/// # Safety
/// Same contract as [`constants_get_string`], against [`Constants::add_complex`].
#[no_mangle]
pub unsafe extern "C" fn constants_get_complex(constants: *const Constants, index: i64) -> *mut rill_runtime::heap::Complex {
    let (_, value) = (*constants).get(index as usize).expect("codegen only emits indices returned by add_complex");
    rill_runtime::heap::clone_complex(value.as_pointer() as *mut _)
}

impl Drop for Constants {
    fn drop(&mut self) {
        for (kind, value) in self.entries.drain(..) {
            let raw = kind.raw_tag();
            let _ = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| unsafe {
                destroy_value(raw, value);
            }));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integers_and_floats_dedup_independently() {
        let mut pool = Constants::new();
        let a = pool.add_integer(5);
        let b = pool.add_integer(5);
        let c = pool.add_floating(5.0);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(pool.len(), 2);
    }

    #[test]
    fn strings_dedup_by_content() {
        let mut pool = Constants::new();
        let a = pool.add_string("hello");
        let b = pool.add_string("hello");
        let c = pool.add_string("world");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(pool.len(), 2);
    }

    #[test]
    fn complex_dedups_by_components() {
        let mut pool = Constants::new();
        let a = pool.add_complex(1.0, 2.0);
        let b = pool.add_complex(1.0, 2.0);
        assert_eq!(a, b);
        assert_eq!(pool.len(), 1);
    }
}
