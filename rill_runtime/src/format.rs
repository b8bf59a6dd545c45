//! Console output formatting (§4.6): the `printValue<T>` family plus the
//! `print`-statement separators.
//!
//! Grounded on `original_source/src/lib/Abaci.cpp`'s `printValue<bool>`,
//! `printValue<uint64_t>`, `printValue<double>`, `printValue<Complex*>`,
//! `printValue<String*>`, `printValue<Instance*>`, `printValue<List*>`,
//! `printComma` and `printLn`. The `{:.10g}` / `{:+.10g}{}` format strings are
//! reproduced exactly: ten significant digits, general (`g`) notation,
//! explicit sign on the imaginary part.

use crate::context::RuntimeContext;
use crate::heap::{Complex, Instance, RList, RString};
use crate::strings::str_view;

const IMAGINARY_SUFFIX: &str = "j";
const NIL: &str = "nil";

/// Formats a float the way `fmt::format("{:.10g}", x)` does: ten significant
/// digits, trailing zeros and an unnecessary decimal point trimmed, falling
/// back to exponential notation only when `%g` would.
pub fn format_floating(value: f64) -> String {
    if value == 0.0 {
        return "0".to_string();
    }
    if !value.is_finite() {
        return if value.is_nan() {
            "nan".to_string()
        } else if value > 0.0 {
            "inf".to_string()
        } else {
            "-inf".to_string()
        };
    }
    let exponent = value.abs().log10().floor() as i32;
    if !(-4..10).contains(&exponent) {
        let mantissa_digits = 9;
        let sci = format!("{value:.mantissa_digits$e}");
        return trim_scientific(&sci);
    }
    let precision = (9 - exponent).max(0) as usize;
    let fixed = format!("{value:.precision$}");
    trim_trailing_zeros(&fixed)
}

fn trim_trailing_zeros(s: &str) -> String {
    if !s.contains('.') {
        return s.to_string();
    }
    let trimmed = s.trim_end_matches('0');
    let trimmed = trimmed.trim_end_matches('.');
    trimmed.to_string()
}

fn trim_scientific(s: &str) -> String {
    let (mantissa, exp) = match s.split_once('e') {
        Some(parts) => parts,
        None => return s.to_string(),
    };
    let mantissa = trim_trailing_zeros(mantissa);
    let exp_value: i32 = exp.parse().unwrap_or(0);
    format!("{mantissa}e{}{:02}", if exp_value >= 0 { "+" } else { "-" }, exp_value.abs())
}

/// Formats a complex number: real part always, imaginary part (with an
/// explicit `+`/`-` sign) only when nonzero.
pub fn format_complex(value: &Complex) -> String {
    let mut s = format_floating(value.real);
    if value.imag != 0.0 {
        let imag = format_floating(value.imag.abs());
        s.push_str(if value.imag < 0.0 { "-" } else { "+" });
        s.push_str(&imag);
        s.push_str(IMAGINARY_SUFFIX);
    }
    s
}

/// # Safety
/// `ctx` must be a live `RuntimeContext`.
#[no_mangle]
pub unsafe extern "C" fn print_bool(ctx: *mut RuntimeContext, value: bool) {
    (*ctx).write_str(if value { "true" } else { "false" });
}

/// # Safety
/// `ctx` must be a live `RuntimeContext`.
#[no_mangle]
pub unsafe extern "C" fn print_integer(ctx: *mut RuntimeContext, value: i64) {
    (*ctx).write_str(&value.to_string());
}

/// # Safety
/// `ctx` must be a live `RuntimeContext`.
#[no_mangle]
pub unsafe extern "C" fn print_floating(ctx: *mut RuntimeContext, value: f64) {
    (*ctx).write_str(&format_floating(value));
}

/// # Safety
/// `ctx` must be a live `RuntimeContext`; `value` a live `Complex`.
#[no_mangle]
pub unsafe extern "C" fn print_complex(ctx: *mut RuntimeContext, value: *const Complex) {
    (*ctx).write_str(&format_complex(&*value));
}

/// # Safety
/// `ctx` must be a live `RuntimeContext`; `value` a live `RString`.
#[no_mangle]
pub unsafe extern "C" fn print_string(ctx: *mut RuntimeContext, value: *const RString) {
    (*ctx).write_str(str_view(value).unwrap_or(""));
}

/// # Safety
/// `ctx` must be a live `RuntimeContext`; `value` a live `Instance` or null.
#[no_mangle]
pub unsafe extern "C" fn print_instance(ctx: *mut RuntimeContext, value: *const Instance) {
    if value.is_null() {
        (*ctx).write_str(NIL);
        return;
    }
    let s = &*value;
    let name_bytes = std::slice::from_raw_parts(s.class_name, s.class_name_len);
    let name = std::str::from_utf8(name_bytes).unwrap_or("?");
    (*ctx).write_str(&format!("<Instance of {name}>"));
}

/// Renders one element of a [`RList`] by its `element_kind`, the same
/// per-kind dispatch `print_*` uses for a top-level value. Nested lists
/// print as an opaque placeholder since `RList` only carries one level of
/// element-kind metadata (§9's "no user-observable sharing" tradeoff,
/// documented in DESIGN.md).
unsafe fn format_element(kind: crate::abi::RawKind, value: crate::value::RawValue) -> String {
    use crate::abi;
    match abi::raw(kind) {
        abi::NONE => NIL.to_string(),
        abi::BOOLEAN => if value.as_boolean() { "true" } else { "false" }.to_string(),
        abi::INTEGER => value.as_integer().to_string(),
        abi::FLOATING => format_floating(value.as_floating()),
        abi::COMPLEX => format_complex(&*(value.as_pointer() as *const Complex)),
        abi::STRING => str_view(value.as_pointer() as *const RString).unwrap_or("").to_string(),
        abi::INSTANCE => "<Instance>".to_string(),
        abi::LIST => "[...]".to_string(),
        _ => NIL.to_string(),
    }
}

/// # Safety
/// `ctx` must be a live `RuntimeContext`; `value` a live `RList`.
#[no_mangle]
pub unsafe extern "C" fn print_list(ctx: *mut RuntimeContext, value: *const RList) {
    let list = &*value;
    let mut out = String::from("[");
    for i in 0..list.length {
        if i > 0 {
            out.push_str(", ");
        }
        out.push_str(&format_element(list.element_kind, *list.elements.add(i)));
    }
    out.push(']');
    (*ctx).write_str(&out);
}

/// # Safety
/// `ctx` must be a live `RuntimeContext`.
#[no_mangle]
pub unsafe extern "C" fn print_comma(ctx: *mut RuntimeContext) {
    (*ctx).write_str(" ");
}

/// # Safety
/// `ctx` must be a live `RuntimeContext`.
#[no_mangle]
pub unsafe extern "C" fn print_line(ctx: *mut RuntimeContext) {
    (*ctx).write_str("\n");
    (*ctx).flush();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn floating_trims_trailing_zeros() {
        assert_eq!(format_floating(1.5), "1.5");
        assert_eq!(format_floating(2.0), "2");
        assert_eq!(format_floating(0.0), "0");
    }

    #[test]
    fn complex_hides_zero_imaginary_part() {
        let c = Complex { real: 1.0, imag: 0.0 };
        assert_eq!(format_complex(&c), "1");
        let c = Complex { real: 1.0, imag: 2.0 };
        assert_eq!(format_complex(&c), "1+2j");
        let c = Complex { real: 1.0, imag: -2.0 };
        assert_eq!(format_complex(&c), "1-2j");
    }
}
