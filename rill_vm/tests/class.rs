//! Golden programs translated from `original_source/testing/class.cpp`:
//! class instances, clone-on-assign and chained field access/assignment.

mod common;

use common::assert_prefix;

#[test]
fn assigning_a_class_instance_clones_its_fields() {
    assert_prefix(
        r#"
        class c(a,b);
        endclass

        let a <- c(1,"A");
        print a.a,;
        print a.b;
        let b = a;
        print b.a,;
        print b.b;
        a.a <- 9;
        print a.a,;
        print b.a;
        "#,
        "",
        "1 A\n1 A\n9 1",
    );
}

#[test]
fn nested_class_instances_chain_field_access_and_assignment() {
    assert_prefix(
        r#"
        class c(a,b);
        endclass

        let d <- c(1.1,c(2.2,3.3));
        print d.a,;
        print d.b.a,;
        print d.b.b;

        d.b.a <- 9.9;
        print d.b.a;

        d.b <- c(4.4,5.5);
        print d.b.a,;
        print d.b.b;
        "#,
        "",
        "1.1 2.2 3.3\n9.9\n4.4 5.5",
    );
}
