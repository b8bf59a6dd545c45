//! The fixed-width runtime value slot (§4.6, §DATA MODEL).
//!
//! A `Value` is always exactly one 64-bit word: inline for `Boolean`,
//! `Integer` and `Floating`, or a pointer to a heap object (`Complex`,
//! `RString`, `Instance`, `RList`) for the rest. Generated code never
//! branches on which union arm is live — the surrounding `rill_vm` type model
//! already knows the kind statically, the same way `original_source`'s
//! `AbaciValue` union in `utility/Type.hpp` carries no discriminant of its
//! own and relies on the caller knowing the `Type` out of band.

use std::ffi::c_void;

/// One 64-bit runtime value slot.
///
/// # Safety
/// Reading a union field is only sound when the reader knows, from the
/// surrounding static type, which field was last written. This matches the
/// discipline `original_source`'s codegen follows around `AbaciValue`.
#[repr(C)]
#[derive(Clone, Copy)]
pub union RawValue {
    pub boolean: bool,
    pub integer: i64,
    pub floating: f64,
    /// Pointer to a heap object: `Complex`, `RString`, `Instance` or `RList`.
    pub pointer: *mut c_void,
}

impl RawValue {
    pub fn from_integer(v: i64) -> Self {
        RawValue { integer: v }
    }

    pub fn from_floating(v: f64) -> Self {
        RawValue { floating: v }
    }

    pub fn from_boolean(v: bool) -> Self {
        RawValue { boolean: v }
    }

    pub fn from_pointer(p: *mut c_void) -> Self {
        RawValue { pointer: p }
    }

    /// # Safety
    /// Caller must know the slot currently holds an integer.
    pub unsafe fn as_integer(&self) -> i64 {
        self.integer
    }

    /// # Safety
    /// Caller must know the slot currently holds a float.
    pub unsafe fn as_floating(&self) -> f64 {
        self.floating
    }

    /// # Safety
    /// Caller must know the slot currently holds a boolean.
    pub unsafe fn as_boolean(&self) -> bool {
        self.boolean
    }

    /// # Safety
    /// Caller must know the slot currently holds a heap pointer.
    pub unsafe fn as_pointer(&self) -> *mut c_void {
        self.pointer
    }
}

impl std::fmt::Debug for RawValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // SAFETY: purely diagnostic; reinterprets the slot as a raw i64 bit
        // pattern rather than trusting any particular arm is live.
        write!(f, "RawValue({:#x})", unsafe { self.integer as u64 })
    }
}
