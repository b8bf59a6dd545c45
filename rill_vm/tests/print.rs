//! Golden program translated from `original_source/testing/print.cpp`:
//! string concatenation via `+`.

mod common;

use common::assert_prefix;

#[test]
fn print_concatenates_two_string_literals() {
    assert_prefix(r#"print "Abaci" + "JIT";"#, "", "AbaciJIT");
}
