//! Raw kind tags shared across the parser/runtime boundary.
//!
//! `rill_vm::types::Kind` is the rich compile-time type model; these are the
//! small integers its codegen bakes into generated calls (`toType`, the
//! `printValue<T>` dispatch key) so `rill_runtime` never needs to know about
//! `rill_vm`'s types. Mirrors the numbering of `AbaciValue::Type` in
//! `original_source/src/utility/Type.hpp`, with `Real`/`Imag` kept as
//! conversion-only pseudo-kinds that are never actually stored in a `Value`.

/// A raw, storage-level type tag. The low four bits (below [`MASK`]) name one
/// of the eight scalar/heap kinds; bit 6 ([`CONSTANT`]) may be OR'd on by the
/// type model to mark a const-qualified type without changing its storage
/// layout.
pub type RawKind = u8;

pub const NONE: RawKind = 0;
pub const BOOLEAN: RawKind = 1;
pub const INTEGER: RawKind = 2;
pub const FLOATING: RawKind = 3;
pub const COMPLEX: RawKind = 4;
pub const STRING: RawKind = 5;
pub const INSTANCE: RawKind = 6;
pub const LIST: RawKind = 7;

/// Conversion-target-only pseudo-kinds (`toType`'s `real`/`imag` cases);
/// never appear as the stored kind of a `Value`.
pub const REAL: RawKind = 8;
pub const IMAG: RawKind = 9;

/// Masks off the [`CONSTANT`] bit, recovering one of the eight kinds above.
pub const MASK: RawKind = 0x0F;
/// OR'd onto a stored kind to mark the value as const-qualified.
pub const CONSTANT: RawKind = 0x40;

/// Strips the `Constant` bit, returning one of the eight storage kinds.
pub fn raw(kind: RawKind) -> RawKind {
    kind & MASK
}

/// Tests whether `kind` has the `Constant` bit set.
pub fn is_constant(kind: RawKind) -> bool {
    kind & CONSTANT != 0
}

pub fn add_const(kind: RawKind) -> RawKind {
    kind | CONSTANT
}

pub fn remove_const(kind: RawKind) -> RawKind {
    kind & !CONSTANT
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_strips_constant_bit() {
        assert_eq!(raw(add_const(INTEGER)), INTEGER);
        assert_eq!(raw(INTEGER), INTEGER);
    }

    #[test]
    fn constant_roundtrip() {
        let k = add_const(STRING);
        assert!(is_constant(k));
        assert!(!is_constant(remove_const(k)));
    }
}
