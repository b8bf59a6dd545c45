//! Golden programs translated from `original_source/testing/block.cpp`:
//! `while`/`repeat until`/`case when` block forms.

mod common;

use common::assert_prefix;

#[test]
fn while_loop_counts_down_with_suppressed_newlines() {
    assert_prefix(
        r#"
        let n <- 10;
        while n > 0
            print n,;
            n <- n - 1;
        endwhile

        let s = "Blastoff!";
        print s;
        "#,
        "",
        "10 9 8 7 6 5 4 3 2 1 Blastoff!",
    );
}

#[test]
fn repeat_until_accumulates_a_complex_sequence() {
    assert_prefix(
        r#"
        let i <- 3;
        repeat
            let j = i + 4j;
            print j;
            i <- i * 2;
        until i > 20;
        "#,
        "",
        "3+4j\n6+4j\n12+4j\n",
    );
}

#[test]
fn case_dispatches_on_a_comparison_chain() {
    assert_prefix(
        r#"
        let n <- 5;
        print n,;
        case true;
            when 0 <= n < 5;
                print "is between 0 and 4";
            when 5 <= n < 10;
                print "is between 5 and 9";
            else
                print "is below 0 or above 9";
        endcase
        "#,
        "",
        "5 is between 5 and 9",
    );
}
