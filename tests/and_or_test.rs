//! Tests the `and`/`or` combinators over a small family relation modelled
//! as a [FactTable]: father/mother/parent.

use flowkanren::goal::{and, or};
use flowkanren::unify::walk;
use flowkanren::{FactTable, RelOptions, Term};

fn family_table() -> FactTable {
    let mut t = FactTable::new();
    t.add_row("father", vec![Term::str("George"), Term::str("Frank")]);
    t.add_row("father", vec![Term::str("George"), Term::str("Sam")]);
    t.add_row("father", vec![Term::str("Frank"), Term::str("Marcus")]);
    t.add_row("mother", vec![Term::str("Gina"), Term::str("Frank")]);
    t.add_row("mother", vec![Term::str("Gina"), Term::str("Sam")]);
    t
}

#[test]
fn or_combines_two_relations_into_parent() {
    let table = family_table();
    let x = Term::fresh_var();
    let y = Term::fresh_var();
    let pattern = Term::seq(vec![x.clone(), y.clone()]);
    let parent = or(vec![
        table.rel("father", pattern.clone(), RelOptions::default()),
        table.rel("mother", pattern, RelOptions::default()),
    ]);
    let (results, _) = parent.run(100);
    assert_eq!(results.len(), 5);
}

#[test]
fn and_chains_father_through_a_grandparent_relationship() {
    let table = family_table();
    let x = Term::fresh_var();
    let z = Term::fresh_var();
    let y = Term::fresh_var();
    let father_xz = table.rel("father", Term::seq(vec![x.clone(), z.clone()]), RelOptions::default());
    let father_zy = table.rel("father", Term::seq(vec![z.clone(), y.clone()]), RelOptions::default());
    let g = and(vec![father_xz, father_zy]);
    let (results, _) = g.run(10);
    assert_eq!(results.len(), 1);
    assert_eq!(walk(&x, &results[0]).to_string(), "George");
    assert_eq!(walk(&y, &results[0]).to_string(), "Marcus");
}
