//! Golden program translated from `original_source/testing/method.cpp`:
//! methods, `this`, and clone-on-assign across method calls.

mod common;

use common::assert_prefix;

#[test]
fn methods_read_and_mutate_this_independently_per_clone() {
    assert_prefix(
        r#"
        class c(n);
            fn show()
                print this.n;
            endfn
            fn add(m)
                print m + this.n;
            endfn
            fn get()
                return this.n;
            endfn
            fn sub(m)
                return this.n - m;
            endfn
            fn set(m)
                this.n <- m;
            endfn
        endclass

        let a <- c(1.1j);
        a.show();
        a.add(2.2);
        print a.get();
        print a.sub(2.2);
        let b <- a;
        b.show();
        b.set(3.3j);
        b.show();
        print a.n,;
        print b.n;
        "#,
        "",
        "0+1.1j\n2.2+1.1j\n0+1.1j\n-2.2+1.1j\n0+1.1j\n0+3.3j\n0+1.1j 0+3.3j",
    );
}
