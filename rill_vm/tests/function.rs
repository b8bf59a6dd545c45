//! Golden programs translated from `original_source/testing/function.cpp`:
//! free functions, monomorphization across call-site argument types, and
//! `return` from inside an `if`/`else`.

mod common;

use common::assert_prefix;

#[test]
fn a_zero_argument_function_prints_and_returns() {
    assert_prefix(
        r#"
        fn a()
            print "Abaci";
        endfn

        a();
        "#,
        "",
        "Abaci",
    );
}

#[test]
fn a_function_is_instantiated_once_per_argument_type() {
    assert_prefix(
        r#"
        fn show(n)
            print n;
        endfn

        show(1);
        show(1.1);
        show(1 - 1j);
        "#,
        "",
        "1\n1.1\n1-1j\n",
    );
}

#[test]
fn return_from_inside_an_if_else_picks_the_taken_branch() {
    assert_prefix(
        r#"
        fn difference(c, d)
            if c < d
                return d - c;
            else
                return c - d;
            endif
        endfn

        print difference(2, 5);
        print difference(4.4, 1.1);
        "#,
        "",
        "3\n3.3\n",
    );
}
