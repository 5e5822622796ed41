//! Tests `lengtho`, the relational counterpart of a plain list-length
//! function, over ground and partially-ground lists.

use flowkanren::relations::lists::lengtho;
use flowkanren::unify::walk;
use flowkanren::Term;

fn count_of(list: Term) -> String {
    let n = Term::fresh_var();
    let (results, _) = lengtho(list, n.clone()).run(1);
    walk(&n, &results[0]).to_string()
}

#[test]
fn lengtho_counts_an_empty_list() {
    assert_eq!(count_of(Term::Nil), "0");
}

#[test]
fn lengtho_counts_a_ground_list() {
    let list = Term::logic_list(vec![Term::str("a"), Term::str("b"), Term::str("c")]);
    assert_eq!(count_of(list), "3");
}

#[test]
fn lengtho_counts_a_list_with_a_ground_tail() {
    let tail = Term::logic_list(vec![Term::str("one"), Term::str("two"), Term::str("three")]);
    let list = Term::logic_list_with_tail(
        vec![Term::str("red"), Term::str("green"), Term::str("blue")],
        tail,
    );
    assert_eq!(count_of(list), "6");
}
