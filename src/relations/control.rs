//! Control relations (§4.6): `neqo`, `onceo`, `succeedo`, `failo`,
//! `groundo`, `nonGroundo`, `uniqueo`. `not` itself lives on
//! [crate::goal] alongside the other combinators it is one of; this module
//! re-exports it so every control relation listed in §4.6 can be reached
//! from one place.

use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;

use crate::goal::{self, Goal};
use crate::stream::Stream;
use crate::substitution::Subst;
use crate::term::Term;
use crate::unify::{unify_and_wake, walk};

pub use crate::goal::not;

/// Always emits the incoming substitution unchanged.
pub fn succeedo() -> Goal {
    Goal::new("succeedo", |input| input)
}

/// Never emits anything.
pub fn failo() -> Goal {
    Goal::new("failo", |_input| Stream::empty())
}

/// Limits `g` to its first result. Alias for [goal::once] kept here so
/// every name in §4.6's Control row resolves to a relation in this module.
pub fn onceo(g: Goal) -> Goal {
    goal::once(g)
}

fn is_ground(t: &Term) -> bool {
    match t {
        Term::Var(_) => false,
        Term::Sequence(items) => items.iter().all(is_ground),
        Term::Record(fields) => fields.values().all(is_ground),
        Term::Cons(h, tail) => is_ground(h) && is_ground(tail),
        Term::Atom(_) | Term::Nil => true,
    }
}

/// Succeeds iff `t`'s walked form contains no unbound variable anywhere.
pub fn groundo(t: Term) -> Goal {
    Goal::new("groundo", move |input| {
        let t = t.clone();
        input.flat_map(move |s| {
            if is_ground(&walk(&t, &s)) { Stream::singleton(s) } else { Stream::empty() }
        })
    })
}

/// Succeeds iff `t`'s walked form contains at least one unbound variable.
pub fn non_groundo(t: Term) -> Goal {
    Goal::new("nonGroundo", move |input| {
        let t = t.clone();
        input.flat_map(move |s| {
            if is_ground(&walk(&t, &s)) { Stream::empty() } else { Stream::singleton(s) }
        })
    })
}

/// Structural disequality (§4.6): suspends until both sides are ground
/// enough to compare, then succeeds iff `a` and `b` do *not* unify.
/// Grounded on the same suspend-until-resolvable shape as the numeric
/// relations, but the evaluator never needs to bind anything itself.
pub fn neqo(a: Term, b: Term) -> Goal {
    Goal::new("neqo", move |input| {
        let a = a.clone();
        let b = b.clone();
        input.flat_map(move |s| {
            let wa = walk(&a, &s);
            let wb = walk(&b, &s);
            if is_ground(&wa) && is_ground(&wb) {
                if unify_and_wake(&wa, &wb, &s).is_some() {
                    Stream::empty()
                } else {
                    Stream::singleton(s)
                }
            } else if wa.to_string() == wb.to_string() {
                Stream::empty()
            } else {
                Stream::singleton(s)
            }
        })
    })
}

/// Drives `g`; for each result, walks `t` and drops the result if an
/// already-seen walked value (keyed by canonical serialization) recurs.
/// Variable-valued walks always pass through. Walks `t` once, at arrival —
/// see SPEC_FULL.md §13 for why this does not re-walk after downstream
/// re-binding.
pub fn uniqueo(t: Term, g: Goal) -> Goal {
    Goal::new("uniqueo", move |input| {
        let t = t.clone();
        let g = g.clone();
        let seen: Rc<RefCell<HashSet<String>>> = Rc::new(RefCell::new(HashSet::new()));
        input.flat_map(move |s| {
            let t = t.clone();
            let seen = Rc::clone(&seen);
            g.apply(Stream::singleton(s)).filter(move |r| {
                let walked = walk(&t, r);
                if walked.is_var() { return true; }
                let key = walked.canonical_key();
                seen.borrow_mut().insert(key)
            })
        })
    })
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::goal::and;

    #[test]
    fn groundo_rejects_unbound_variables() {
        let x = Term::fresh_var();
        let (results, _) = groundo(x).run(10);
        assert_eq!(results.len(), 0);
    }

    #[test]
    fn groundo_accepts_ground_terms() {
        let (results, _) = groundo(Term::int(1)).run(10);
        assert_eq!(results.len(), 1);
    }

    #[test]
    fn neqo_succeeds_on_different_ground_atoms() {
        let (results, _) = neqo(Term::int(1), Term::int(2)).run(10);
        assert_eq!(results.len(), 1);
    }

    #[test]
    fn neqo_fails_on_equal_ground_atoms() {
        let (results, _) = neqo(Term::int(1), Term::int(1)).run(10);
        assert_eq!(results.len(), 0);
    }

    #[test]
    fn uniqueo_drops_repeated_values() {
        let x = Term::fresh_var();
        let g = and(vec![crate::relations::lists::membero(
            x.clone(),
            Term::logic_list(vec![Term::int(1), Term::int(1), Term::int(2)]),
        )]);
        let (results, _) = uniqueo(x.clone(), g).run(10);
        assert_eq!(results.len(), 2);
    }
}
