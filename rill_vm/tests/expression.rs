//! Golden programs translated from `original_source/testing/expression.cpp`:
//! re-assignment, numeric/string/list operators, and rejecting
//! reassignment of an immutable binding.
//!
//! `expression.cpp`'s own final case (`g[1] <- nil` deleting a list
//! element, shrinking its length) has no counterpart in spec.md/SPEC_FULL —
//! the runtime has no element-removal primitive and neither document
//! commits to that behavior, only to list indexing/index-assignment
//! existing at all (see DESIGN.md's Open Question decisions). That case is
//! replaced below with a plain index-assign-then-read-back case covering
//! the same supplemented feature without inventing deletion semantics.

mod common;

use common::{assert_prefix, try_run};

#[test]
fn reassigning_a_mutable_integer_preserves_equality() {
    assert_prefix("let a = 1; print a = 1;", "", "true");
}

#[test]
fn reassigning_a_mutable_float_preserves_equality() {
    assert_prefix("let b <- 1.1; b <- b + 1.1; print b = 2.2;", "", "true");
}

#[test]
fn complex_arithmetic_scales_both_components() {
    assert_prefix("let c <- 1 + 2j; c <- c * 2; print c;", "", "2+4j");
}

#[test]
fn string_concatenation_chains_across_reassignment() {
    assert_prefix(
        "let d <- \"Aba\" + \"ci\"; d <- d + \"Progr\" + \"am\"; print d;",
        "",
        "AbaciProgram",
    );
}

#[test]
fn empty_typed_list_concatenation_reports_length_and_type_name() {
    assert_prefix("let e: int <- []; e <- e + [1, 2]; print !e, ?e;", "", "2 [int]");
}

#[test]
fn reassigning_an_immutable_binding_is_rejected() {
    let err = try_run("let f = 2; f <- f + 1;", "").unwrap_err();
    assert!(!err.is_empty());
}

#[test]
fn list_index_assignment_replaces_an_element_in_place() {
    assert_prefix("let g <- [1.1, 2.2, 3.3]; g[1] <- 9.9; print g[1];", "", "9.9");
}

#[test]
fn ordering_strings_is_a_static_error() {
    let err = try_run("print \"a\" < \"b\";", "").unwrap_err();
    assert!(err.contains("not valid for type"), "expected a BadOperatorForType error, got {err:?}");
}
