//! Heap object layouts and their make/clone/destroy contract (§4.6).
//!
//! Grounded on `original_source/src/utility/Type.hpp`'s `AbaciValue::Complex
//! / String / Instance / List` union members and on the `make*`/`clone*`/
//! `destroy*` family in `src/lib/Abaci.cpp`.
//!
//! One departure from the original layout: `Instance` and `RList` each carry
//! their field/element kinds alongside the data (`field_kinds`,
//! `element_kind`). The C++ original could reach back into a single global
//! `Cache`/`TypeInstance` to look up a field's type during a generic clone or
//! destroy; splitting the runtime into its own crate means it cannot depend
//! on `rill_vm`'s cache, so the kind travels with the value instead. This is
//! recorded as a deliberate open-question resolution in DESIGN.md.

use crate::abi::{self, RawKind};
use crate::strings;
use crate::value::RawValue;
use std::alloc::{alloc, alloc_zeroed, dealloc, Layout};
use std::ffi::c_void;
use std::ptr;

#[repr(C)]
pub struct Complex {
    pub real: f64,
    pub imag: f64,
}

#[repr(C)]
pub struct RString {
    pub data: *mut u8,
    pub byte_len: usize,
    pub char_len: usize,
}

#[repr(C)]
pub struct Instance {
    pub class_name: *mut u8,
    pub class_name_len: usize,
    pub field_count: usize,
    pub fields: *mut RawValue,
    pub field_kinds: *mut RawKind,
}

#[repr(C)]
pub struct RList {
    pub length: usize,
    pub elements: *mut RawValue,
    pub element_kind: RawKind,
}

unsafe fn alloc_array<T>(count: usize) -> *mut T {
    if count == 0 {
        return ptr::null_mut();
    }
    let layout = Layout::array::<T>(count).expect("array layout overflow");
    alloc_zeroed(layout) as *mut T
}

unsafe fn dealloc_array<T>(p: *mut T, count: usize) {
    if p.is_null() || count == 0 {
        return;
    }
    let layout = Layout::array::<T>(count).expect("array layout overflow");
    dealloc(p as *mut u8, layout);
}

/// Clones a single runtime value of the given kind, deep-copying heap
/// payloads. Mirrors the per-kind dispatch in `original_source`'s
/// `Context::cloneValue` equivalent.
///
/// # Safety
/// `value` must currently hold a value of `kind`.
pub unsafe fn clone_value(kind: RawKind, value: RawValue) -> RawValue {
    match abi::raw(kind) {
        abi::NONE | abi::BOOLEAN | abi::INTEGER | abi::FLOATING => value,
        abi::COMPLEX => RawValue::from_pointer(clone_complex(value.as_pointer() as *mut Complex) as *mut c_void),
        abi::STRING => RawValue::from_pointer(clone_string(value.as_pointer() as *mut RString) as *mut c_void),
        abi::INSTANCE => RawValue::from_pointer(clone_instance(value.as_pointer() as *mut Instance) as *mut c_void),
        abi::LIST => RawValue::from_pointer(clone_list(value.as_pointer() as *mut RList) as *mut c_void),
        _ => value,
    }
}

/// Destroys a single runtime value of the given kind, freeing heap payloads.
///
/// # Safety
/// `value` must currently hold a value of `kind`, owned by the caller.
pub unsafe fn destroy_value(kind: RawKind, value: RawValue) {
    match abi::raw(kind) {
        abi::NONE | abi::BOOLEAN | abi::INTEGER | abi::FLOATING => {}
        abi::COMPLEX => destroy_complex(value.as_pointer() as *mut Complex),
        abi::STRING => destroy_string(value.as_pointer() as *mut RString),
        abi::INSTANCE => destroy_instance(value.as_pointer() as *mut Instance),
        abi::LIST => destroy_list(value.as_pointer() as *mut RList),
        _ => {}
    }
}

#[no_mangle]
pub unsafe extern "C" fn make_complex(real: f64, imag: f64) -> *mut Complex {
    let layout = Layout::new::<Complex>();
    let p = alloc(layout) as *mut Complex;
    ptr::write(p, Complex { real, imag });
    p
}

#[no_mangle]
pub unsafe extern "C" fn clone_complex(src: *mut Complex) -> *mut Complex {
    make_complex((*src).real, (*src).imag)
}

#[no_mangle]
pub unsafe extern "C" fn destroy_complex(p: *mut Complex) {
    if p.is_null() {
        return;
    }
    ptr::drop_in_place(p);
    dealloc(p as *mut u8, Layout::new::<Complex>());
}

/// Builds a heap string from a UTF-8 byte buffer. Returns null if the bytes
/// are not valid UTF-8 (surfaced by the caller as [`crate::RuntimeError::BadString`]).
#[no_mangle]
pub unsafe extern "C" fn make_string(bytes: *const u8, byte_len: usize) -> *mut RString {
    let slice = std::slice::from_raw_parts(bytes, byte_len);
    let text = match std::str::from_utf8(slice) {
        Ok(t) => t,
        Err(_) => return ptr::null_mut(),
    };
    let char_len = text.chars().count();
    let data = if byte_len == 0 {
        ptr::null_mut()
    } else {
        let buf = alloc_array::<u8>(byte_len);
        ptr::copy_nonoverlapping(bytes, buf, byte_len);
        buf
    };
    let layout = Layout::new::<RString>();
    let p = alloc(layout) as *mut RString;
    ptr::write(
        p,
        RString {
            data,
            byte_len,
            char_len,
        },
    );
    p
}

#[no_mangle]
pub unsafe extern "C" fn clone_string(src: *mut RString) -> *mut RString {
    make_string((*src).data, (*src).byte_len)
}

#[no_mangle]
pub unsafe extern "C" fn destroy_string(p: *mut RString) {
    if p.is_null() {
        return;
    }
    dealloc_array((*p).data, (*p).byte_len);
    ptr::drop_in_place(p);
    dealloc(p as *mut u8, Layout::new::<RString>());
}

/// Builds an instance shell with `field_count` zeroed slots. The caller
/// (generated code) fills in each field afterwards with its own initializer,
/// the same adopt-on-store discipline as a local variable.
#[no_mangle]
pub unsafe extern "C" fn make_instance(
    class_name: *const u8,
    class_name_len: usize,
    field_count: usize,
    field_kinds: *const RawKind,
) -> *mut Instance {
    let name_buf = if class_name_len == 0 {
        ptr::null_mut()
    } else {
        let buf = alloc_array::<u8>(class_name_len);
        ptr::copy_nonoverlapping(class_name, buf, class_name_len);
        buf
    };
    let fields = alloc_array::<RawValue>(field_count);
    let kinds = alloc_array::<RawKind>(field_count);
    if field_count > 0 {
        ptr::copy_nonoverlapping(field_kinds, kinds, field_count);
    }
    let layout = Layout::new::<Instance>();
    let p = alloc(layout) as *mut Instance;
    ptr::write(
        p,
        Instance {
            class_name: name_buf,
            class_name_len,
            field_count,
            fields,
            field_kinds: kinds,
        },
    );
    p
}

/// As [`make_instance`], taking the class name as a heap `RString` rather
/// than a raw byte pointer — generated code only ever has the class name
/// available as a constants-pool string, not a standalone byte buffer.
///
/// # Safety
/// `class_name`, if non-null, must point at a live `RString`; `field_kinds`
/// must point at `field_count` initialized tags.
#[no_mangle]
pub unsafe extern "C" fn make_instance_named(
    class_name: *const RString,
    field_count: usize,
    field_kinds: *const RawKind,
) -> *mut Instance {
    let (ptr, len) = if class_name.is_null() {
        (ptr::null(), 0)
    } else {
        ((*class_name).data as *const u8, (*class_name).byte_len)
    };
    make_instance(ptr, len, field_count, field_kinds)
}

#[no_mangle]
pub unsafe extern "C" fn clone_instance(src: *mut Instance) -> *mut Instance {
    let s = &*src;
    let dst = make_instance(s.class_name, s.class_name_len, s.field_count, s.field_kinds);
    for i in 0..s.field_count {
        let kind = *s.field_kinds.add(i);
        let cloned = clone_value(kind, *s.fields.add(i));
        ptr::write((*dst).fields.add(i), cloned);
    }
    dst
}

#[no_mangle]
pub unsafe extern "C" fn destroy_instance(p: *mut Instance) {
    if p.is_null() {
        return;
    }
    let s = &*p;
    for i in 0..s.field_count {
        let kind = *s.field_kinds.add(i);
        destroy_value(kind, *s.fields.add(i));
    }
    dealloc_array(s.fields, s.field_count);
    dealloc_array(s.field_kinds, s.field_count);
    dealloc_array(s.class_name, s.class_name_len);
    ptr::drop_in_place(p);
    dealloc(p as *mut u8, Layout::new::<Instance>());
}

#[no_mangle]
pub unsafe extern "C" fn make_list(length: usize, element_kind: RawKind) -> *mut RList {
    let elements = alloc_array::<RawValue>(length);
    let layout = Layout::new::<RList>();
    let p = alloc(layout) as *mut RList;
    ptr::write(
        p,
        RList {
            length,
            elements,
            element_kind,
        },
    );
    p
}

#[no_mangle]
pub unsafe extern "C" fn clone_list(src: *mut RList) -> *mut RList {
    let s = &*src;
    let dst = make_list(s.length, s.element_kind);
    for i in 0..s.length {
        let cloned = clone_value(s.element_kind, *s.elements.add(i));
        ptr::write((*dst).elements.add(i), cloned);
    }
    dst
}

#[no_mangle]
pub unsafe extern "C" fn destroy_list(p: *mut RList) {
    if p.is_null() {
        return;
    }
    let s = &*p;
    for i in 0..s.length {
        destroy_value(s.element_kind, *s.elements.add(i));
    }
    dealloc_array(s.elements, s.length);
    ptr::drop_in_place(p);
    dealloc(p as *mut u8, Layout::new::<RList>());
}

/// Reads a heap string's bytes as a `&str`, validating UTF-8 again since the
/// buffer may have been spliced by `strings::splice_string`.
///
/// # Safety
/// `p` must be a live `RString` produced by [`make_string`] or a clone of one.
pub unsafe fn str_view<'a>(p: *const RString) -> Option<&'a str> {
    strings::str_view(p)
}

/// Exposes an instance's field array base pointer to generated code, which
/// addresses individual fields by `idx * size_of::<RawValue>()` offsets from
/// it rather than hard-coding `Instance`'s own field layout.
///
/// # Safety
/// `p` must point at a live `Instance`.
#[no_mangle]
pub unsafe extern "C" fn instance_fields_ptr(p: *const Instance) -> *mut RawValue {
    (*p).fields
}

/// As [`instance_fields_ptr`], for a list's element array.
///
/// # Safety
/// `p` must point at a live `RList`.
#[no_mangle]
pub unsafe extern "C" fn list_elements_ptr(p: *const RList) -> *mut RawValue {
    (*p).elements
}

thread_local! {
    /// Fallback slot handed back by [`list_element_ptr`] when the index is
    /// out of range, so generated code always has a valid address to load
    /// from or store through rather than dereferencing past the element
    /// array. The real failure is recorded via `set_last_error` and
    /// reported once the current submission's entry point returns.
    static INDEX_FAULT_SLOT: std::cell::UnsafeCell<RawValue> = std::cell::UnsafeCell::new(RawValue::from_integer(0));
}

/// `&list[index]`, with the same negative-index and bounds rules as
/// `strings::valid_index(index, length, is_slice: false)`. Out-of-range
/// indexes record a [`crate::RuntimeError::IndexOutOfRange`] and hand back a
/// thread-local scratch slot instead of an address outside the element
/// array, so an indexing mistake never corrupts memory even though it isn't
/// caught until the submission finishes running.
///
/// # Safety
/// `p` must point at a live `RList`.
#[no_mangle]
pub unsafe extern "C" fn list_element_ptr(p: *const RList, index: i64) -> *mut RawValue {
    let s = &*p;
    match strings::valid_index(index, s.length, false) {
        Some(pos) => s.elements.add(pos),
        None => INDEX_FAULT_SLOT.with(|cell| cell.get()),
    }
}

/// `!list`: element count, for the list length operator.
///
/// # Safety
/// `p` must point at a live `RList`.
#[no_mangle]
pub unsafe extern "C" fn list_length(p: *const RList) -> i64 {
    (*p).length as i64
}

/// `a + b` for two lists of the same element kind: a fresh list holding `a`'s
/// elements followed by `b`'s, each deep-cloned.
///
/// # Safety
/// Both pointers must point at live `RList`s sharing the same `element_kind`.
#[no_mangle]
pub unsafe extern "C" fn concat_list(a: *const RList, b: *const RList) -> *mut RList {
    let (sa, sb) = (&*a, &*b);
    let dst = make_list(sa.length + sb.length, sa.element_kind);
    for i in 0..sa.length {
        let cloned = clone_value(sa.element_kind, *sa.elements.add(i));
        ptr::write((*dst).elements.add(i), cloned);
    }
    for i in 0..sb.length {
        let cloned = clone_value(sb.element_kind, *sb.elements.add(i));
        ptr::write((*dst).elements.add(sa.length + i), cloned);
    }
    dst
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn complex_roundtrip() {
        unsafe {
            let c = make_complex(1.5, -2.5);
            let cloned = clone_complex(c);
            assert_eq!((*cloned).real, 1.5);
            assert_eq!((*cloned).imag, -2.5);
            destroy_complex(c);
            destroy_complex(cloned);
        }
    }

    #[test]
    fn string_roundtrip() {
        unsafe {
            let bytes = "héllo".as_bytes();
            let s = make_string(bytes.as_ptr(), bytes.len());
            assert!(!s.is_null());
            assert_eq!((*s).byte_len, bytes.len());
            assert_eq!((*s).char_len, 5);
            let cloned = clone_string(s);
            assert_eq!(str_view(cloned), Some("héllo"));
            destroy_string(s);
            destroy_string(cloned);
        }
    }

    #[test]
    fn bad_utf8_rejected() {
        unsafe {
            let bytes: [u8; 2] = [0xff, 0xfe];
            let s = make_string(bytes.as_ptr(), bytes.len());
            assert!(s.is_null());
        }
    }

    #[test]
    fn list_clone_deep_copies_strings() {
        unsafe {
            let bytes = b"hi";
            let s = make_string(bytes.as_ptr(), bytes.len());
            let list = make_list(1, abi::STRING);
            ptr::write((*list).elements, RawValue::from_pointer(s as *mut c_void));
            let cloned = clone_list(list);
            let cloned_str = (*cloned).elements.read().as_pointer() as *mut RString;
            assert_ne!(cloned_str, s);
            assert_eq!(str_view(cloned_str), Some("hi"));
            destroy_list(list);
            destroy_list(cloned);
        }
    }

    #[test]
    fn list_element_ptr_resolves_negative_index() {
        unsafe {
            let list = make_list(3, abi::INTEGER);
            ptr::write((*list).elements, RawValue::from_integer(10));
            ptr::write((*list).elements.add(1), RawValue::from_integer(20));
            ptr::write((*list).elements.add(2), RawValue::from_integer(30));
            let last = list_element_ptr(list, -1);
            assert_eq!((*last).as_integer(), 30);
            destroy_list(list);
        }
    }

    #[test]
    fn list_element_ptr_out_of_range_returns_fault_slot_not_oob_memory() {
        unsafe {
            let list = make_list(2, abi::INTEGER);
            ptr::write((*list).elements, RawValue::from_integer(1));
            ptr::write((*list).elements.add(1), RawValue::from_integer(2));
            let p = list_element_ptr(list, 5);
            assert_ne!(p as *const RawValue, (*list).elements as *const RawValue);
            ptr::write(p, RawValue::from_integer(999));
            destroy_list(list);
        }
    }
}
