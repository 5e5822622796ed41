//! Structural unification: `walk`, `occurs_check`, `unify`.
//!
//! Structural unification over this engine's
//! Variable/Atom/Sequence/Record/Cons/Nil term algebra, expressed through
//! the immutable `Subst::extend` used throughout this engine rather than
//! any in-place mutation of a binding set.

use crate::substitution::Subst;
use crate::term::Term;

/// Resolves a term against a substitution by following variable bindings
/// transitively, and recursing into structural children. Idempotent:
/// `walk(walk(t, s), s) == walk(t, s)`.
pub fn walk(t: &Term, s: &Subst) -> Term {
    let mut cur = t.clone();
    // Chase variable chains iteratively first, to avoid stack growth on long chains.
    loop {
        match &cur {
            Term::Var(v) => match s.get_binding(v) {
                Some(bound) => cur = bound.clone(),
                None => return cur,
            },
            _ => break,
        }
    }
    // Structural walk: recurse into children, never copying ground leaves.
    match cur {
        Term::Sequence(items) => {
            Term::seq(items.iter().map(|t| walk(t, s)).collect())
        }
        Term::Record(fields) => {
            Term::record(fields.iter().map(|(k, v)| (k.clone(), walk(v, s))).collect())
        }
        Term::Cons(h, t) => Term::cons(walk(&h, s), walk(&t, s)),
        other => other,
    }
}

/// Returns true iff `v` occurs anywhere inside the walked form of `t`.
///
/// Descends into cons cells, sequences, *and* record values (resolved open
/// question, see SPEC_FULL.md §13: a record is a first-class structural
/// term here, so skipping it would let a cyclic binding slip past the
/// occurs-check and break walk's idempotence guarantee).
pub fn occurs_check(v: &crate::term::Variable, t: &Term, s: &Subst) -> bool {
    let walked = walk(t, s);
    occurs_in_walked(v, &walked)
}

fn occurs_in_walked(v: &crate::term::Variable, t: &Term) -> bool {
    match t {
        Term::Var(w) => w.id == v.id,
        Term::Sequence(items) => items.iter().any(|t| occurs_in_walked(v, t)),
        Term::Record(fields) => fields.values().any(|t| occurs_in_walked(v, t)),
        Term::Cons(h, tail) => occurs_in_walked(v, h) || occurs_in_walked(v, tail),
        Term::Atom(_) | Term::Nil => false,
    }
}

/// Structural unification (§4.1). Returns the extended substitution, or
/// `None` on failure. Never mutates `s`; existing bindings are preserved
/// (monotonic extension).
///
/// This is the pure structural primitive and does not itself wake
/// suspensions — goal-level call sites (`eq`, relations) should go through
/// [unify_and_wake] instead, which additionally runs the suspension
/// fixpoint (§4.5) over every variable this call bound.
pub fn unify(u: &Term, v: &Term, s: &Subst) -> Option<Subst> {
    let mut bound = Vec::new();
    unify_tracking(u, v, s, &mut bound)
}

/// Unifies, then wakes any suspension watching a variable this call bound
/// (§4.5: "called whenever new bindings are added"). Returns `None` both on
/// ordinary unification failure and on a suspension reporting constraint
/// violation — both are silent drops per §7.
pub fn unify_and_wake(u: &Term, v: &Term, s: &Subst) -> Option<Subst> {
    let mut bound = Vec::new();
    let extended = unify_tracking(u, v, s, &mut bound)?;
    crate::suspend::wake_up_suspends(&extended, &bound)
}

fn unify_tracking(u: &Term, v: &Term, s: &Subst, bound: &mut Vec<u64>) -> Option<Subst> {
    let wu = walk(u, s);
    let wv = walk(v, s);

    match (&wu, &wv) {
        (Term::Var(a), Term::Var(b)) if a.id == b.id => Some(s.clone()),
        (Term::Var(a), _) => bind(a, &wv, s, bound),
        (_, Term::Var(b)) => bind(b, &wu, s, bound),
        (Term::Atom(a), Term::Atom(b)) => if a == b { Some(s.clone()) } else { None },
        (Term::Nil, Term::Nil) => Some(s.clone()),
        (Term::Cons(h1, t1), Term::Cons(h2, t2)) => {
            let s = unify_tracking(h1, h2, s, bound)?;
            unify_tracking(t1, t2, &s, bound)
        }
        (Term::Sequence(a), Term::Sequence(b)) => {
            if a.len() != b.len() { return None; }
            let mut cur = s.clone();
            for (x, y) in a.iter().zip(b.iter()) {
                cur = unify_tracking(x, y, &cur, bound)?;
            }
            Some(cur)
        }
        (Term::Record(a), Term::Record(b)) => {
            if a.len() != b.len() { return None; }
            let mut cur = s.clone();
            for (k, x) in a.iter() {
                let y = b.get(k)?;
                cur = unify_tracking(x, y, &cur, bound)?;
            }
            Some(cur)
        }
        _ => None,
    }
}

fn bind(var: &std::rc::Rc<crate::term::Variable>, term: &Term, s: &Subst, bound: &mut Vec<u64>) -> Option<Subst> {
    if let Term::Var(other) = term {
        if other.id == var.id { return Some(s.clone()); }
    }
    if occurs_check(var, term, s) { return None; }
    bound.push(var.id);
    Some(s.extend(var, term.clone()))
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::term::Variable;

    #[test]
    fn walk_unbound_variable_is_identity() {
        let s = Subst::empty();
        let v = Term::fresh_var();
        assert_eq!(walk(&v, &s).to_string(), v.to_string());
    }

    #[test]
    fn walk_is_idempotent() {
        let v = Variable::fresh();
        let s = Subst::empty().extend(&v, Term::int(5));
        let once = walk(&Term::Var(std::rc::Rc::new(v)), &s);
        let twice = walk(&once, &s);
        assert_eq!(once.to_string(), twice.to_string());
    }

    #[test]
    fn unify_binds_unbound_variable() {
        let v = Term::fresh_var();
        let s = unify(&v, &Term::int(42), &Subst::empty()).expect("unifies");
        assert_eq!(walk(&v, &s).to_string(), "42");
    }

    #[test]
    fn unify_fails_on_mismatched_atoms() {
        assert!(unify(&Term::int(1), &Term::int(2), &Subst::empty()).is_none());
    }

    #[test]
    fn occurs_check_rejects_cyclic_binding() {
        let var = Variable::fresh();
        let v_term = Term::var(var.clone());
        let cyclic = Term::cons(v_term.clone(), Term::Nil);
        assert!(unify(&v_term, &cyclic, &Subst::empty()).is_none());
    }

    #[test]
    fn unify_sequences_pointwise() {
        let a = Term::seq(vec![Term::int(1), Term::fresh_var()]);
        let b = Term::seq(vec![Term::int(1), Term::int(2)]);
        let s = unify(&a, &b, &Subst::empty()).expect("unifies");
        assert_eq!(walk(&a, &s).to_string(), "(1, 2)");
    }

    #[test]
    fn unify_sequences_of_different_length_fails() {
        let a = Term::seq(vec![Term::int(1)]);
        let b = Term::seq(vec![Term::int(1), Term::int(2)]);
        assert!(unify(&a, &b, &Subst::empty()).is_none());
    }

    #[test]
    fn unify_records_over_union_of_keys() {
        use std::collections::BTreeMap;
        let mut fa = BTreeMap::new();
        fa.insert("a".to_string(), Term::int(1));
        let mut fb = BTreeMap::new();
        fb.insert("a".to_string(), Term::int(1));
        fb.insert("b".to_string(), Term::int(2));
        let ra = Term::record(fa);
        let rb = Term::record(fb);
        assert!(unify(&ra, &rb, &Subst::empty()).is_none());
    }
}
