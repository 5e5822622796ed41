//! Directional, suspending arithmetic relations (§4.5, §4.6).
//!
//! A plain arithmetic evaluator requires every operand to already be
//! ground and would otherwise have to panic. These relations instead
//! suspend via [crate::suspend::suspendable] and resume once enough
//! operands become bound — so `pluso(x, 3, z)` can run before `x` is
//! known, deciding the int/float promotion only once both sides are
//! actually in hand.

use std::rc::Rc;

use crate::goal::Goal;
use crate::stream::Stream;
use crate::substitution::Subst;
use crate::suspend::{self, SuspendOutcome};
use crate::term::{Atom, Term};
use crate::unify::unify_and_wake;

#[derive(Clone, Copy, Debug)]
enum Num {
    Int(i64),
    Float(f64),
}

impl Num {
    fn from_term(t: &Term) -> Option<Num> {
        match t {
            Term::Atom(Atom::Integer(i)) => Some(Num::Int(*i)),
            Term::Atom(Atom::Float(f)) => Some(Num::Float(*f)),
            _ => None,
        }
    }

    fn as_f64(self) -> f64 {
        match self {
            Num::Int(i) => i as f64,
            Num::Float(f) => f,
        }
    }

    fn to_term(self) -> Term {
        match self {
            Num::Int(i) => Term::int(i),
            Num::Float(f) => Term::float(f),
        }
    }
}

fn numeric_cmp(a: Num, b: Num) -> std::cmp::Ordering {
    match (a, b) {
        (Num::Int(x), Num::Int(y)) => x.cmp(&y),
        _ => a.as_f64().partial_cmp(&b.as_f64()).unwrap_or(std::cmp::Ordering::Equal),
    }
}

/// Builds a 3-argument directional arithmetic relation (`pluso`, `minuso`,
/// `multo`, `dividebyo`): given any two of `a op b = c`, solves for the
/// third once it is the only one still unbound; suspends otherwise.
fn ternary_relation(
    name: &'static str,
    a: Term,
    b: Term,
    c: Term,
    solve: Rc<dyn Fn(Option<Num>, Option<Num>, Option<Num>) -> Option<Num>>,
) -> Goal {
    Goal::new(name, move |input| {
        let a = a.clone();
        let b = b.clone();
        let c = c.clone();
        let solve = Rc::clone(&solve);
        input.flat_map(move |s| {
            let a2 = a.clone();
            let b2 = b.clone();
            let c2 = c.clone();
            let solve2 = Rc::clone(&solve);
            match ternary_check(&a, &b, &c, Rc::clone(&solve), &s) {
                SuspendOutcome::Failed => Stream::empty(),
                SuspendOutcome::CheckLater(watched) => {
                    let resume: Rc<dyn Fn(&Subst) -> SuspendOutcome> =
                        Rc::new(move |s: &Subst| ternary_check(&a2, &b2, &c2, Rc::clone(&solve2), s));
                    Stream::singleton(suspend::add_suspend(&s, watched, resume))
                }
                SuspendOutcome::Resolved(extended, _) => Stream::singleton(extended),
            }
        })
    })
}

fn ternary_check(
    a: &Term,
    b: &Term,
    c: &Term,
    solve: Rc<dyn Fn(Option<Num>, Option<Num>, Option<Num>) -> Option<Num>>,
    s: &Subst,
) -> SuspendOutcome {
    let vars = vec![a.clone(), b.clone(), c.clone()];
    let evaluator: Rc<dyn Fn(&[Term], &Subst) -> SuspendOutcome> = Rc::new(move |walked, s| {
        let na = Num::from_term(&walked[0]);
        let nb = Num::from_term(&walked[1]);
        let nc = Num::from_term(&walked[2]);
        match solve(na, nb, nc) {
            None => SuspendOutcome::Failed,
            Some(resolved) => {
                let target = match (na, nb, nc) {
                    (None, _, _) => &walked[0],
                    (_, None, _) => &walked[1],
                    _ => &walked[2],
                };
                match unify_and_wake(target, &resolved.to_term(), s) {
                    Some(extended) => SuspendOutcome::Resolved(extended, vec![]),
                    None => SuspendOutcome::Failed,
                }
            }
        }
    });
    suspend::suspendable(s, vars, evaluator, Some(2))
}

/// `pluso(a, b, c)`: `a + b = c`, solvable in any direction.
pub fn pluso(a: Term, b: Term, c: Term) -> Goal {
    ternary_relation("pluso", a, b, c, Rc::new(|a, b, c| match (a, b, c) {
        (Some(a), Some(b), _) => Some(add(a, b)),
        (Some(a), _, Some(c)) => Some(sub(c, a)),
        (_, Some(b), Some(c)) => Some(sub(c, b)),
        _ => None,
    }))
}

/// `minuso(a, b, c)`: `a - b = c`, solvable in any direction.
pub fn minuso(a: Term, b: Term, c: Term) -> Goal {
    ternary_relation("minuso", a, b, c, Rc::new(|a, b, c| match (a, b, c) {
        (Some(a), Some(b), _) => Some(sub(a, b)),
        (Some(a), _, Some(c)) => Some(sub(a, c)),
        (_, Some(b), Some(c)) => Some(add(c, b)),
        _ => None,
    }))
}

/// `multo(a, b, c)`: `a * b = c`, solvable in any direction (division by
/// zero when solving for a factor simply fails, rather than panicking).
pub fn multo(a: Term, b: Term, c: Term) -> Goal {
    ternary_relation("multo", a, b, c, Rc::new(|a, b, c| match (a, b, c) {
        (Some(a), Some(b), _) => Some(mul(a, b)),
        (Some(a), _, Some(c)) => checked_div(c, a),
        (_, Some(b), Some(c)) => checked_div(c, b),
        _ => None,
    }))
}

/// `dividebyo(a, b, c)`: `a / b = c`, solvable in any direction.
pub fn dividebyo(a: Term, b: Term, c: Term) -> Goal {
    ternary_relation("dividebyo", a, b, c, Rc::new(|a, b, c| match (a, b, c) {
        (Some(a), Some(b), _) => checked_div(a, b),
        (_, Some(b), Some(c)) => Some(mul(c, b)),
        (Some(a), _, Some(c)) => checked_div(a, c),
        _ => None,
    }))
}

fn add(a: Num, b: Num) -> Num {
    match (a, b) {
        (Num::Int(x), Num::Int(y)) => Num::Int(x + y),
        _ => Num::Float(a.as_f64() + b.as_f64()),
    }
}
fn sub(a: Num, b: Num) -> Num {
    match (a, b) {
        (Num::Int(x), Num::Int(y)) => Num::Int(x - y),
        _ => Num::Float(a.as_f64() - b.as_f64()),
    }
}
fn mul(a: Num, b: Num) -> Num {
    match (a, b) {
        (Num::Int(x), Num::Int(y)) => Num::Int(x * y),
        _ => Num::Float(a.as_f64() * b.as_f64()),
    }
}
fn checked_div(a: Num, b: Num) -> Option<Num> {
    match (a, b) {
        (_, Num::Int(0)) => None,
        (_, Num::Float(f)) if f == 0.0 => None,
        (Num::Int(x), Num::Int(y)) if x % y == 0 => Some(Num::Int(x / y)),
        _ => Some(Num::Float(a.as_f64() / b.as_f64())),
    }
}

fn comparison_check(a: &Term, b: &Term, ok: Rc<dyn Fn(std::cmp::Ordering) -> bool>, s: &Subst) -> SuspendOutcome {
    let vars = vec![a.clone(), b.clone()];
    let ok2 = Rc::clone(&ok);
    let evaluator: Rc<dyn Fn(&[Term], &Subst) -> SuspendOutcome> = Rc::new(move |walked, s| {
        match (Num::from_term(&walked[0]), Num::from_term(&walked[1])) {
            (Some(na), Some(nb)) if ok2(numeric_cmp(na, nb)) => SuspendOutcome::Resolved(s.clone(), vec![]),
            (Some(_), Some(_)) => SuspendOutcome::Failed,
            _ => SuspendOutcome::Failed,
        }
    });
    suspend::suspendable(s, vars, evaluator, Some(2))
}

fn comparison(name: &'static str, a: Term, b: Term, ok: impl Fn(std::cmp::Ordering) -> bool + 'static) -> Goal {
    let ok: Rc<dyn Fn(std::cmp::Ordering) -> bool> = Rc::new(ok);
    Goal::new(name, move |input| {
        let a = a.clone();
        let b = b.clone();
        let ok = Rc::clone(&ok);
        input.flat_map(move |s| {
            let a2 = a.clone();
            let b2 = b.clone();
            let ok2 = Rc::clone(&ok);
            match comparison_check(&a, &b, Rc::clone(&ok), &s) {
                SuspendOutcome::Failed => Stream::empty(),
                SuspendOutcome::CheckLater(watched) => {
                    let resume: Rc<dyn Fn(&Subst) -> SuspendOutcome> =
                        Rc::new(move |s: &Subst| comparison_check(&a2, &b2, Rc::clone(&ok2), s));
                    Stream::singleton(suspend::add_suspend(&s, watched, resume))
                }
                SuspendOutcome::Resolved(extended, _) => Stream::singleton(extended),
            }
        })
    })
}

pub fn gto(a: Term, b: Term) -> Goal { comparison("gto", a, b, |o| o == std::cmp::Ordering::Greater) }
pub fn lto(a: Term, b: Term) -> Goal { comparison("lto", a, b, |o| o == std::cmp::Ordering::Less) }
pub fn gteo(a: Term, b: Term) -> Goal { comparison("gteo", a, b, |o| o != std::cmp::Ordering::Less) }
pub fn lteo(a: Term, b: Term) -> Goal { comparison("lteo", a, b, |o| o != std::cmp::Ordering::Greater) }

#[cfg(test)]
mod test {
    use super::*;
    use crate::unify::walk;

    #[test]
    fn pluso_solves_for_the_missing_operand() {
        let z = Term::fresh_var();
        let g = pluso(Term::int(2), Term::int(3), z.clone());
        let (results, _) = g.run(10);
        assert_eq!(results.len(), 1);
        assert_eq!(walk(&z, &results[0]).to_string(), "5");
    }

    #[test]
    fn pluso_solves_for_a_left_operand() {
        let x = Term::fresh_var();
        let g = pluso(x.clone(), Term::int(3), Term::int(8));
        let (results, _) = g.run(10);
        assert_eq!(walk(&x, &results[0]).to_string(), "5");
    }

    #[test]
    fn gto_succeeds_when_ordered_correctly() {
        let g = gto(Term::int(5), Term::int(3));
        let (results, _) = g.run(10);
        assert_eq!(results.len(), 1);
    }

    #[test]
    fn gto_fails_when_ordered_incorrectly() {
        let g = gto(Term::int(3), Term::int(5));
        let (results, _) = g.run(10);
        assert_eq!(results.len(), 0);
    }
}
