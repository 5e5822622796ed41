//! List relations (§4.6): `membero`, `firsto`, `resto`, `appendo`,
//! `lengtho`, `permuteo`, `mapo`, `removeFirsto`, `alldistincto`.
//!
//! Each is defined the way the glossary describes the engine's logic
//! lists — structural recursion over cons cells — rather than a host-side
//! `Vec` walk. The recursive clauses below call back into the same public
//! function (e.g.
//! `appendo` calling `appendo`), but that call happens inside a
//! `flat_map` closure, which only runs once the goal is actually driven
//! against an incoming substitution — so the recursion unrolls one cons
//! cell per delivered substitution rather than building an infinite goal
//! tree the moment `appendo(...)` is called. A query whose first list
//! argument is unbound is a true relation and may enumerate indefinitely;
//! callers should bound it with `once`/`take`, the same discipline any
//! miniKanren-style relation expects of its caller.

use crate::goal::{and, eq, fresh, not, or, Goal};
use crate::stream::Stream;
use crate::term::Term;

/// `membero(x, list)`: `x` is an element of `list`.
pub fn membero(x: Term, list: Term) -> Goal {
    Goal::new("membero", move |input| {
        let x = x.clone();
        let list = list.clone();
        input.flat_map(move |s| {
            let x = x.clone();
            let list = list.clone();
            fresh(2, move |vars| {
                let h = vars[0].clone();
                let t = vars[1].clone();
                or(vec![
                    and(vec![eq(list.clone(), Term::cons(h.clone(), t.clone())), eq(x.clone(), h)]),
                    and(vec![eq(list, Term::cons(h, t.clone())), membero(x, t)]),
                ])
            })
            .apply(Stream::singleton(s))
        })
    })
}

/// `firsto(list, x)`: `x` is the head of `list`.
pub fn firsto(list: Term, x: Term) -> Goal {
    fresh(1, move |vars| eq(list, Term::cons(x, vars[0].clone())))
}

/// `resto(list, tail)`: `tail` is `list` with its head removed.
pub fn resto(list: Term, tail: Term) -> Goal {
    fresh(1, move |vars| eq(list, Term::cons(vars[0].clone(), tail)))
}

/// `appendo(a, b, ab)`: `ab` is `a` followed by `b`.
pub fn appendo(a: Term, b: Term, ab: Term) -> Goal {
    Goal::new("appendo", move |input| {
        let a = a.clone();
        let b = b.clone();
        let ab = ab.clone();
        input.flat_map(move |s| {
            let a = a.clone();
            let b = b.clone();
            let ab = ab.clone();
            let base = and(vec![eq(a.clone(), Term::Nil), eq(b.clone(), ab.clone())]);
            let recursive = fresh(3, move |vars| {
                let h = vars[0].clone();
                let ta = vars[1].clone();
                let tab = vars[2].clone();
                and(vec![
                    eq(a.clone(), Term::cons(h.clone(), ta.clone())),
                    eq(ab.clone(), Term::cons(h, tab.clone())),
                    appendo(ta, b.clone(), tab),
                ])
            });
            or(vec![base, recursive]).apply(Stream::singleton(s))
        })
    })
}

/// `lengtho(list, n)`: `n` is the number of elements in `list`.
pub fn lengtho(list: Term, n: Term) -> Goal {
    Goal::new("lengtho", move |input| {
        let list = list.clone();
        let n = n.clone();
        input.flat_map(move |s| {
            let list = list.clone();
            let n = n.clone();
            let base = and(vec![eq(list.clone(), Term::Nil), eq(n.clone(), Term::int(0))]);
            let recursive = fresh(3, move |vars| {
                let h = vars[0].clone();
                let t = vars[1].clone();
                let n1 = vars[2].clone();
                and(vec![
                    eq(list.clone(), Term::cons(h, t.clone())),
                    lengtho(t, n1.clone()),
                    crate::relations::numeric::pluso(n1, Term::int(1), n.clone()),
                ])
            });
            or(vec![base, recursive]).apply(Stream::singleton(s))
        })
    })
}

/// `removeFirsto(x, list, rest)`: `rest` is `list` with the first
/// occurrence of `x` removed.
pub fn remove_firsto(x: Term, list: Term, rest: Term) -> Goal {
    Goal::new("removeFirsto", move |input| {
        let x = x.clone();
        let list = list.clone();
        let rest = rest.clone();
        input.flat_map(move |s| {
            let x = x.clone();
            let list = list.clone();
            let rest = rest.clone();
            let head_match = fresh(1, {
                let x = x.clone();
                let list = list.clone();
                let rest = rest.clone();
                move |vars| {
                    let t = vars[0].clone();
                    and(vec![eq(list, Term::cons(x, t.clone())), eq(rest, t)])
                }
            });
            let skip = fresh(3, move |vars| {
                let h = vars[0].clone();
                let t = vars[1].clone();
                let t2 = vars[2].clone();
                and(vec![
                    eq(list.clone(), Term::cons(h.clone(), t.clone())),
                    not(eq(h.clone(), x.clone())),
                    eq(rest.clone(), Term::cons(h, t2.clone())),
                    remove_firsto(x.clone(), t, t2),
                ])
            });
            or(vec![head_match, skip]).apply(Stream::singleton(s))
        })
    })
}

/// `permuteo(list, perm)`: `perm` is some permutation of `list`.
pub fn permuteo(list: Term, perm: Term) -> Goal {
    Goal::new("permuteo", move |input| {
        let list = list.clone();
        let perm = perm.clone();
        input.flat_map(move |s| {
            let list = list.clone();
            let perm = perm.clone();
            let base = and(vec![eq(list.clone(), Term::Nil), eq(perm.clone(), Term::Nil)]);
            let recursive = fresh(3, move |vars| {
                let h = vars[0].clone();
                let t = vars[1].clone();
                let rest = vars[2].clone();
                and(vec![
                    eq(perm.clone(), Term::cons(h.clone(), t.clone())),
                    remove_firsto(h, list.clone(), rest.clone()),
                    permuteo(rest, t),
                ])
            });
            or(vec![base, recursive]).apply(Stream::singleton(s))
        })
    })
}

/// `mapo(rel, list_in, list_out)`: applies the binary relation-builder
/// `rel` elementwise, recursing over both lists in lockstep.
pub fn mapo(rel: std::rc::Rc<dyn Fn(Term, Term) -> Goal>, list_in: Term, list_out: Term) -> Goal {
    Goal::new("mapo", move |input| {
        let rel = std::rc::Rc::clone(&rel);
        let list_in = list_in.clone();
        let list_out = list_out.clone();
        input.flat_map(move |s| {
            let rel = std::rc::Rc::clone(&rel);
            let list_in = list_in.clone();
            let list_out = list_out.clone();
            let base = and(vec![eq(list_in.clone(), Term::Nil), eq(list_out.clone(), Term::Nil)]);
            let recursive = fresh(4, move |vars| {
                let h = vars[0].clone();
                let t = vars[1].clone();
                let h2 = vars[2].clone();
                let t2 = vars[3].clone();
                and(vec![
                    eq(list_in.clone(), Term::cons(h.clone(), t.clone())),
                    eq(list_out.clone(), Term::cons(h2.clone(), t2.clone())),
                    (rel)(h, h2),
                    mapo(std::rc::Rc::clone(&rel), t, t2),
                ])
            });
            or(vec![base, recursive]).apply(Stream::singleton(s))
        })
    })
}

/// `alldistincto(list)`: every element of `list` is pairwise distinct.
/// Fast-paths a fully-ground proper list via `canonical_key` deduplication;
/// falls back to pairwise `not(eq(...))` recursion otherwise.
pub fn alldistincto(list: Term) -> Goal {
    Goal::new("alldistincto", move |input| {
        let list = list.clone();
        input.flat_map(move |s| {
            let walked = crate::unify::walk(&list, &s);
            if let Some(items) = walked.logic_list_to_vec() {
                let mut seen = std::collections::HashSet::new();
                for item in &items {
                    if !item.is_var() && !seen.insert(item.canonical_key()) {
                        return Stream::empty();
                    }
                }
                return Stream::singleton(s);
            }
            distinct_recursive(walked).apply(Stream::singleton(s))
        })
    })
}

fn distinct_recursive(list: Term) -> Goal {
    match &list {
        Term::Nil => and(vec![]),
        Term::Cons(h, t) => {
            let h = (**h).clone();
            let t = (**t).clone();
            and(vec![not(crate::relations::lists::membero(h, t.clone())), distinct_recursive(t)])
        }
        _ => and(vec![]),
    }
}
