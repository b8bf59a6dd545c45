//! Complex-number arithmetic, the one numeric kind whose operators cannot be
//! inlined as a handful of Cranelift instructions (§4.6, §4.2).
//!
//! Grounded on `original_source/src/lib/Abaci.cpp`'s `opComplex`, which
//! dispatches on an `Operator` value and treats a null second operand as
//! unary negation. Comparison and arithmetic are split into two entry points
//! here because their Rust return types differ (`bool` vs `*mut Complex`) and
//! the call site in `rill_vm::codegen` always knows statically which one it
//! wants.

use crate::heap::{make_complex, Complex};
use num_complex::Complex64;

pub const PLUS: u8 = 1;
pub const MINUS: u8 = 2;
pub const TIMES: u8 = 3;
pub const DIVIDE: u8 = 4;
pub const EQUAL: u8 = 5;
pub const NOT_EQUAL: u8 = 6;

unsafe fn read(p: *const Complex) -> Complex64 {
    Complex64::new((*p).real, (*p).imag)
}

/// Unary negation (`-z`).
///
/// # Safety
/// `a` must point at a live `Complex`.
#[no_mangle]
pub unsafe extern "C" fn complex_negate(a: *const Complex) -> *mut Complex {
    let v = -read(a);
    make_complex(v.re, v.im)
}

/// Binary arithmetic (`+ - * /`).
///
/// # Safety
/// `a` and `b` must point at live `Complex` values.
#[no_mangle]
pub unsafe extern "C" fn complex_arith(op: u8, a: *const Complex, b: *const Complex) -> *mut Complex {
    let x = read(a);
    let y = read(b);
    let result = match op {
        PLUS => x + y,
        MINUS => x - y,
        TIMES => x * y,
        DIVIDE => x / y,
        _ => unreachable!("complex_arith called with non-arithmetic op {op}"),
    };
    make_complex(result.re, result.im)
}

/// Equality comparison (`== !=`).
///
/// # Safety
/// `a` and `b` must point at live `Complex` values.
#[no_mangle]
pub unsafe extern "C" fn complex_compare(op: u8, a: *const Complex, b: *const Complex) -> bool {
    let x = read(a);
    let y = read(b);
    match op {
        EQUAL => x == y,
        NOT_EQUAL => x != y,
        _ => unreachable!("complex_compare called with non-comparison op {op}"),
    }
}

/// `a ** b` for two floats (integer operands are promoted to `Floating`
/// before this is called, matching §4.2's "`**` on two integers yields a
/// float").
#[no_mangle]
pub extern "C" fn pow(base: f64, exponent: f64) -> f64 {
    base.powf(exponent)
}

/// `a ** b` for two complex numbers.
///
/// # Safety
/// `a` and `b` must point at live `Complex` values.
#[no_mangle]
pub unsafe extern "C" fn complex_pow(a: *const Complex, b: *const Complex) -> *mut Complex {
    let result = read(a).powc(read(b));
    make_complex(result.re, result.im)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::heap::destroy_complex;

    #[test]
    fn arithmetic_matches_num_complex() {
        unsafe {
            let a = make_complex(1.0, 2.0);
            let b = make_complex(3.0, -1.0);
            let sum = complex_arith(PLUS, a, b);
            assert_eq!(((*sum).real, (*sum).imag), (4.0, 1.0));
            destroy_complex(a);
            destroy_complex(b);
            destroy_complex(sum);
        }
    }

    #[test]
    fn negate_flips_both_parts() {
        unsafe {
            let a = make_complex(1.0, -2.0);
            let n = complex_negate(a);
            assert_eq!(((*n).real, (*n).imag), (-1.0, 2.0));
            destroy_complex(a);
            destroy_complex(n);
        }
    }

    #[test]
    fn equality_is_componentwise() {
        unsafe {
            let a = make_complex(1.0, 2.0);
            let b = make_complex(1.0, 2.0);
            assert!(complex_compare(EQUAL, a, b));
            assert!(!complex_compare(NOT_EQUAL, a, b));
            destroy_complex(a);
            destroy_complex(b);
        }
    }
}
