//! Object/record relations (§4.6): `extract`, `extractEach`.
//!
//! [crate::term::Term::Record] is a string-keyed map, and "fetch a field"
//! becomes an ordinary `eq` against the walked field value once the record
//! itself is ground enough to read.

use std::collections::BTreeMap;

use crate::goal::{and, eq, Goal};
use crate::stream::Stream;
use crate::term::Term;
use crate::unify::walk;

/// `extract(obj, {key -> var, ...})`: unifies each named field of the
/// walked record `obj` against its corresponding target term. Fails if
/// `obj` does not walk to a [Term::Record], or if any requested key is
/// absent from it.
pub fn extract(obj: Term, fields: BTreeMap<String, Term>) -> Goal {
    Goal::new("extract", move |input| {
        let obj = obj.clone();
        let fields = fields.clone();
        input.flat_map(move |s| {
            let walked = walk(&obj, &s);
            let record = match &walked {
                Term::Record(r) => r.clone(),
                _ => return Stream::empty(),
            };
            let mut goals = Vec::with_capacity(fields.len());
            for (key, target) in &fields {
                match record.get(key) {
                    Some(value) => goals.push(eq(target.clone(), value.clone())),
                    None => return Stream::empty(),
                }
            }
            and(goals).apply(Stream::singleton(s))
        })
    })
}

/// `extractEach(arr, {key -> var, ...})`: for every element of the walked
/// sequence/list `arr`, extracts the requested fields and emits one
/// result per element (fan-out, like `or` over the elements).
pub fn extract_each(arr: Term, fields: BTreeMap<String, Term>) -> Goal {
    Goal::new("extractEach", move |input| {
        let arr = arr.clone();
        let fields = fields.clone();
        input.flat_map(move |s| {
            let walked = walk(&arr, &s);
            let items: Vec<Term> = match &walked {
                Term::Sequence(items) => (**items).clone(),
                Term::Cons(_, _) | Term::Nil => match walked.logic_list_to_vec() {
                    Some(items) => items,
                    None => return Stream::empty(),
                },
                _ => return Stream::empty(),
            };
            let branches: Vec<Stream<crate::substitution::Subst>> = items
                .into_iter()
                .map(|item| extract(item, fields.clone()).apply(Stream::singleton(s.clone())))
                .collect();
            branches.into_iter().reduce(|a, b| a.merge(&b)).unwrap_or_else(Stream::empty)
        })
    })
}
