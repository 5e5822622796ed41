//! Tests `failo`, the always-failing relation used to force backtracking
//! past an exhausted disjunction.

use flowkanren::goal::{and, or};
use flowkanren::relations::control::failo;
use flowkanren::unify::walk;
use flowkanren::Term;

#[test]
fn failo_never_emits_a_result() {
    let (results, _) = failo().run(10);
    assert_eq!(results.len(), 0);
}

#[test]
fn or_skips_a_branch_that_fails() {
    let x = Term::fresh_var();
    use flowkanren::goal::eq;
    let g = or(vec![
        and(vec![eq(x.clone(), Term::int(1)), failo()]),
        eq(x.clone(), Term::int(4)),
    ]);
    let (results, _) = g.run(10);
    assert_eq!(results.len(), 1);
    assert_eq!(walk(&x, &results[0]).to_string(), "4");
}
