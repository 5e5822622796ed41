//! Tests the numeric comparison relations `gto`/`lto`/`gteo`/`lteo`.

use flowkanren::goal::and;
use flowkanren::relations::numeric::{gteo, gto, lteo, lto};
use flowkanren::Term;

#[test]
fn gto_and_lto_agree_with_ordinary_ordering() {
    assert_eq!(gto(Term::int(23), Term::int(18)).run(1).0.len(), 1);
    assert_eq!(gto(Term::int(18), Term::int(23)).run(1).0.len(), 0);
    assert_eq!(lto(Term::int(18), Term::int(23)).run(1).0.len(), 1);
    assert_eq!(lto(Term::int(23), Term::int(18)).run(1).0.len(), 0);
}

#[test]
fn gteo_and_lteo_include_equality() {
    assert_eq!(gteo(Term::int(23), Term::int(23)).run(1).0.len(), 1);
    assert_eq!(lteo(Term::int(23), Term::int(23)).run(1).0.len(), 1);
}

#[test]
fn comparisons_suspend_until_both_sides_are_grounded() {
    let x = Term::fresh_var();
    use flowkanren::goal::eq;
    let g = and(vec![gto(x.clone(), Term::int(10)), eq(x.clone(), Term::int(23))]);
    let (results, _) = g.run(1);
    assert_eq!(results.len(), 1);
}
