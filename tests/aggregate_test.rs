//! Tests the aggregation layer (§4.7): `collecto`, `group_by_collecto`,
//! `maxo`, over a small sales-record [FactTable].

use flowkanren::goal::and;
use flowkanren::unify::walk;
use flowkanren::{collecto, group_by_collecto, maxo};
use flowkanren::{FactTable, RelOptions, Term};

fn sales_table() -> FactTable {
    let mut t = FactTable::new();
    t.add_row("sale", vec![Term::str("coffee"), Term::int(3)]);
    t.add_row("sale", vec![Term::str("tea"), Term::int(5)]);
    t.add_row("sale", vec![Term::str("coffee"), Term::int(7)]);
    t
}

#[test]
fn collecto_gathers_every_matching_quantity() {
    let table = sales_table();
    let item = Term::str("coffee");
    let qty = Term::fresh_var();
    let g = table.rel("sale", Term::seq(vec![item, qty.clone()]), RelOptions::default());
    let out = Term::fresh_var();
    let (results, _) = collecto(qty, g, out.clone()).run(1);
    let items = walk(&out, &results[0]).logic_list_to_vec().unwrap();
    assert_eq!(items.len(), 2);
}

#[test]
fn group_by_collecto_groups_quantities_by_item() {
    let table = sales_table();
    let item = Term::fresh_var();
    let qty = Term::fresh_var();
    let g = table.rel("sale", Term::seq(vec![item.clone(), qty.clone()]), RelOptions::default());
    let out_key = Term::fresh_var();
    let out_vals = Term::fresh_var();
    let (results, _) = group_by_collecto(item, qty, g, out_key.clone(), out_vals.clone()).run(10);
    assert_eq!(results.len(), 2);
}

#[test]
fn maxo_keeps_only_the_best_selling_quantity() {
    let table = sales_table();
    let item = Term::fresh_var();
    let qty = Term::fresh_var();
    let g = table.rel("sale", Term::seq(vec![item.clone(), qty.clone()]), RelOptions::default());
    let (results, _) = and(vec![g, maxo(qty.clone())]).run(10);
    assert_eq!(results.len(), 1);
    assert_eq!(walk(&qty, &results[0]).to_string(), "7");
}
