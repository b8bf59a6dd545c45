//! UTF-8 aware string indexing and list/string index arithmetic (§4.6, §8).
//!
//! Grounded on `original_source/src/lib/Abaci.cpp`'s `validIndex`,
//! `indexString`, `sliceString`, `spliceString` and `utf8StrPos`/`utf8StrLen`
//! helpers, and on `compareString`/`concatString`.

use crate::context::set_last_error;
use crate::heap::{make_string, RString};
use crate::RuntimeError;
use std::cmp::Ordering;
use std::ptr;

/// Reads a heap string's bytes as `&str`.
///
/// # Safety
/// `p` must point at a live `RString`.
pub unsafe fn str_view<'a>(p: *const RString) -> Option<&'a str> {
    if p.is_null() {
        return Some("");
    }
    let s = &*p;
    if s.data.is_null() {
        return Some("");
    }
    let bytes = std::slice::from_raw_parts(s.data, s.byte_len);
    std::str::from_utf8(bytes).ok()
}

/// Resolves a (possibly negative) logical index against `limit` elements,
/// the way `original_source`'s `validIndex(index, limit, isSlice)` does:
/// negative indices count back from the end, and a slice bound may equal
/// `limit` while a plain index may not.
///
/// Returns `None` (and records a [`RuntimeError::IndexOutOfRange`]) when the
/// resolved index is out of bounds.
pub fn valid_index(index: i64, limit: usize, is_slice: bool) -> Option<usize> {
    let limit = limit as i64;
    let bias = if is_slice { 1 } else { 0 };
    let positive = if index >= 0 { index } else { limit + index - bias };
    if positive < 0 || positive >= limit + bias {
        set_last_error(RuntimeError::IndexOutOfRange {
            index,
            length: limit.max(0) as usize,
        });
        return None;
    }
    Some(positive as usize)
}

/// Returns the single character at logical index `index` as a new heap
/// string, or null (with the last-error slot set) if out of range.
///
/// # Safety
/// `p` must point at a live `RString`.
#[no_mangle]
pub unsafe extern "C" fn index_string(p: *const RString, index: i64) -> *mut RString {
    let s = &*p;
    let text = match str_view(p) {
        Some(t) => t,
        None => {
            set_last_error(RuntimeError::BadString);
            return ptr::null_mut();
        }
    };
    let pos = match valid_index(index, s.char_len, false) {
        Some(pos) => pos,
        None => return ptr::null_mut(),
    };
    let ch = text.chars().nth(pos).expect("validated index");
    let mut buf = [0u8; 4];
    let encoded = ch.encode_utf8(&mut buf);
    make_string(encoded.as_ptr(), encoded.len())
}

/// Returns the codepoint half-open range `[from, to)` as a new heap string.
///
/// # Safety
/// `p` must point at a live `RString`.
#[no_mangle]
pub unsafe extern "C" fn slice_string(p: *const RString, from: i64, to: i64) -> *mut RString {
    let s = &*p;
    let text = match str_view(p) {
        Some(t) => t,
        None => {
            set_last_error(RuntimeError::BadString);
            return ptr::null_mut();
        }
    };
    let start = match valid_index(from, s.char_len, true) {
        Some(v) => v,
        None => return ptr::null_mut(),
    };
    let end = match valid_index(to, s.char_len, true) {
        Some(v) => v,
        None => return ptr::null_mut(),
    };
    if end < start {
        set_last_error(RuntimeError::IndexOutOfRange {
            index: to,
            length: s.char_len,
        });
        return ptr::null_mut();
    }
    let slice: String = text.chars().skip(start).take(end - start).collect();
    make_string(slice.as_ptr(), slice.len())
}

/// Replaces the codepoint half-open range `[from, to)` of `p` with
/// `replacement`, returning a new heap string (strings are immutable heap
/// objects; splicing never mutates in place).
///
/// # Safety
/// `p` and `replacement` must point at live `RString`s.
#[no_mangle]
pub unsafe extern "C" fn splice_string(
    p: *const RString,
    from: i64,
    to: i64,
    replacement: *const RString,
) -> *mut RString {
    let s = &*p;
    let text = match str_view(p) {
        Some(t) => t,
        None => {
            set_last_error(RuntimeError::BadString);
            return ptr::null_mut();
        }
    };
    let repl = match str_view(replacement) {
        Some(t) => t,
        None => {
            set_last_error(RuntimeError::BadString);
            return ptr::null_mut();
        }
    };
    let start = match valid_index(from, s.char_len, true) {
        Some(v) => v,
        None => return ptr::null_mut(),
    };
    let end = match valid_index(to, s.char_len, true) {
        Some(v) => v,
        None => return ptr::null_mut(),
    };
    if end < start {
        set_last_error(RuntimeError::IndexOutOfRange {
            index: to,
            length: s.char_len,
        });
        return ptr::null_mut();
    }
    let chars: Vec<char> = text.chars().collect();
    let mut result = String::with_capacity(text.len() + repl.len());
    result.extend(chars[..start].iter());
    result.push_str(repl);
    result.extend(chars[end..].iter());
    make_string(result.as_ptr(), result.len())
}

/// Three-way comparison of two heap strings, used by the `<`/`<=`/`==`/...
/// family of codegen'd comparisons (`original_source`'s `compareString`
/// returns the same `strcmp`-style sign).
///
/// # Safety
/// Both pointers must point at live `RString`s.
#[no_mangle]
pub unsafe extern "C" fn compare_string(a: *const RString, b: *const RString) -> i32 {
    let a = str_view(a).unwrap_or("");
    let b = str_view(b).unwrap_or("");
    match a.cmp(b) {
        Ordering::Less => -1,
        Ordering::Equal => 0,
        Ordering::Greater => 1,
    }
}

/// Concatenates two heap strings into a freshly allocated result.
///
/// # Safety
/// Both pointers must point at live `RString`s.
#[no_mangle]
pub unsafe extern "C" fn concat_string(a: *const RString, b: *const RString) -> *mut RString {
    let a = str_view(a).unwrap_or("");
    let b = str_view(b).unwrap_or("");
    let mut combined = String::with_capacity(a.len() + b.len());
    combined.push_str(a);
    combined.push_str(b);
    make_string(combined.as_ptr(), combined.len())
}

/// `!s`: codepoint length of a string, for the list/string length operator.
///
/// # Safety
/// `p` must point at a live `RString`.
#[no_mangle]
pub unsafe extern "C" fn string_length(p: *const RString) -> i64 {
    (*p).char_len as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_index_negative_resolves_from_end() {
        assert_eq!(valid_index(-1, 5, false), Some(4));
        assert_eq!(valid_index(-1, 5, true), Some(3));
    }

    #[test]
    fn valid_index_rejects_out_of_range() {
        assert_eq!(valid_index(5, 5, false), None);
        assert_eq!(valid_index(6, 5, true), None);
        assert_eq!(valid_index(5, 5, true), Some(5));
    }

    #[test]
    fn slice_and_index_are_codepoint_based() {
        unsafe {
            let text = "héllo";
            let s = make_string(text.as_ptr(), text.len());
            let one = index_string(s, 1);
            assert_eq!(str_view(one), Some("é"));
            let tail = slice_string(s, 2, 5);
            assert_eq!(str_view(tail), Some("llo"));
        }
    }

    #[test]
    fn compare_and_concat() {
        unsafe {
            let a = make_string("ab".as_ptr(), 2);
            let b = make_string("ac".as_ptr(), 2);
            assert_eq!(compare_string(a, b), -1);
            let combined = concat_string(a, b);
            assert_eq!(str_view(combined), Some("abac"));
        }
    }
}
