//! The goal protocol and its combinators (§4.3).
//!
//! A [Goal] is a function from a stream of substitutions to a stream of
//! substitutions. Conjunction and disjunction keep the classic two-shape
//! split (conjunction threads one substitution through a left-to-right
//! chain, disjunction fans one substitution out across branches), built
//! here on top of [crate::stream::Stream] rather than a pull-based search
//! tree. Per §9's design note, a goal does not carry
//! its transformer closure through the substitution — only a [GoalHandle]
//! does, so `GROUP_INNER_GOALS`/`GROUP_OUTER_GOALS` never risk a reference
//! cycle back into the goal that produced them.

use std::rc::Rc;

use crate::error::EngineError;
use crate::group::{next_group_id, GoalHandle, GroupFrame, GroupKind};
use crate::stream::Stream;
use crate::substitution::{GroupMeta, Subst};
use crate::term::Term;
use crate::unify::unify_and_wake;

/// A goal: `Stream<Subst> -> Stream<Subst>`, plus a lightweight handle used
/// for group enrichment (§4.4) and diagnostics.
#[derive(Clone)]
pub struct Goal {
    pub handle: GoalHandle,
    transform: Rc<dyn Fn(Stream<Subst>) -> Stream<Subst>>,
}

impl Goal {
    pub fn new(
        display_name: &'static str,
        transform: impl Fn(Stream<Subst>) -> Stream<Subst> + 'static,
    ) -> Self {
        Goal { handle: GoalHandle::new(display_name), transform: Rc::new(transform) }
    }

    pub fn apply(&self, input: Stream<Subst>) -> Stream<Subst> {
        (self.transform)(input)
    }

    /// Runs this goal from the empty substitution, applying `limit` results,
    /// and drains the resulting stream synchronously (§4.8 "Running").
    pub fn run(&self, limit: usize) -> (Vec<Subst>, Option<Rc<EngineError>>) {
        let root = Stream::singleton(Subst::empty());
        self.apply(root).take(limit).drain()
    }
}

/// Unifies `a` and `b` against the incoming substitution, emitting the
/// extended substitution on success and nothing on failure (§4.3).
pub fn eq(a: Term, b: Term) -> Goal {
    Goal::new("eq", move |input| {
        let a = a.clone();
        let b = b.clone();
        input.flat_map(move |s| match unify_and_wake(&a, &b, &s) {
            Some(extended) => Stream::singleton(extended),
            None => Stream::empty(),
        })
    })
}

/// Introduces fresh logic variables and passes them to `body`, which builds
/// the goal to run with them in scope. Freshness here is lexical — the
/// variables are allocated once, when `fresh` is called — matching how
/// `fresh(...)` reads at a goal-construction call site rather than being
/// re-instantiated per incoming substitution.
pub fn fresh(n: usize, body: impl FnOnce(Vec<Term>) -> Goal) -> Goal {
    let vars: Vec<Term> = (0..n).map(|_| Term::fresh_var()).collect();
    body(vars)
}

fn with_group_frame(s: &Subst, kind: GroupKind, id: u64, branch: Option<usize>, inner: Rc<Vec<GoalHandle>>) -> Subst {
    let mut path = s.group.as_ref().map(|g| (*g.group_path).clone()).unwrap_or_default();
    path.push(GroupFrame { kind, id, branch });
    let outer: Vec<GoalHandle> = s
        .group
        .as_ref()
        .map(|g| {
            let mut v = (*g.outer_goals).clone();
            v.extend((*g.inner_goals).iter().cloned());
            v
        })
        .unwrap_or_default();
    s.with_group(GroupMeta {
        group_id: id,
        group_path: Rc::new(path),
        inner_goals: inner,
        outer_goals: Rc::new(outer),
    })
}

/// Left-to-right conjunction (§4.3). Empty `and` is the identity; a single
/// goal is returned unchanged. Enriches the input stream with group
/// metadata identifying this conjunction before threading it through the
/// chain (§4.4).
pub fn and(goals: Vec<Goal>) -> Goal {
    if goals.is_empty() {
        return Goal::new("and.empty", |input| input);
    }
    if goals.len() == 1 {
        return goals.into_iter().next().unwrap();
    }

    let group_id = next_group_id();
    let inner: Rc<Vec<GoalHandle>> = Rc::new(goals.iter().map(|g| g.handle.clone()).collect());
    let goals = Rc::new(goals);

    Goal::new("and", move |input| {
        let inner = Rc::clone(&inner);
        let goals = Rc::clone(&goals);
        let enriched = input.flat_map(move |s| {
            Stream::singleton(with_group_frame(&s, GroupKind::And, group_id, None, Rc::clone(&inner)))
        });
        goals.iter().fold(enriched, |acc, g| g.apply(acc))
    })
}

/// Fan-out disjunction (§4.3, §4.4). The upstream substitution is shared
/// (replayable, see `Stream::share`) so every branch can subscribe to it
/// independently; each branch's substitution is enriched with its own
/// `GROUP_PATH` branch index before the branch goal consumes it. Empty `or`
/// is the empty stream; a single goal is returned unchanged.
pub fn or(goals: Vec<Goal>) -> Goal {
    if goals.is_empty() {
        return Goal::new("or.empty", |_input| Stream::empty());
    }
    if goals.len() == 1 {
        return goals.into_iter().next().unwrap();
    }

    let group_id = next_group_id();
    let inner: Rc<Vec<GoalHandle>> = Rc::new(goals.iter().map(|g| g.handle.clone()).collect());
    let goals = Rc::new(goals);

    Goal::new("or", move |input| {
        let shared = input.share();
        let mut branches: Vec<Stream<Subst>> = Vec::with_capacity(goals.len());
        for (branch_idx, g) in goals.iter().enumerate() {
            let inner = Rc::clone(&inner);
            let branched = shared.flat_map(move |s| {
                Stream::singleton(with_group_frame(&s, GroupKind::Or, group_id, Some(branch_idx), Rc::clone(&inner)))
            });
            branches.push(g.apply(branched));
        }
        branches
            .into_iter()
            .reduce(|a, b| a.merge(&b))
            .unwrap_or_else(Stream::empty)
    })
}

/// Sugar for `or(and(clause1…), and(clause2…), …)` (§4.3).
pub fn conde(clauses: Vec<Vec<Goal>>) -> Goal {
    or(clauses.into_iter().map(and).collect())
}

/// Negation-as-failure (§4.3). For each incoming substitution `s`, drives
/// `g` on `of(s)`. A result that is *just* `s` again (no new bindings) is
/// treated as a proof of `s`, so `not` emits nothing; if `g` produces no
/// results at all, `not` emits `s` unchanged. A result that introduces new
/// bindings is neither a proof nor a refutation and is ignored — this is
/// the soundness guard that keeps `not` from ever binding a variable
/// itself.
pub fn not(g: Goal) -> Goal {
    Goal::new("not", move |input| {
        let g = g.clone();
        input.flat_map(move |s| {
            let (results, _err) = g.apply(Stream::singleton(s.clone())).drain();
            let proved = results.iter().any(|r| r.no_new_bindings_beyond(&s));
            if proved { Stream::empty() } else { Stream::singleton(s) }
        })
    })
}

/// If-then-else (§4.3). Drains `cond` on the incoming substitution; if it
/// produced at least one result, pipes those results through `then`,
/// otherwise pipes the original substitution through `else_`.
pub fn ifte(cond: Goal, then: Goal, else_: Goal) -> Goal {
    Goal::new("ifte", move |input| {
        let cond = cond.clone();
        let then = then.clone();
        let else_ = else_.clone();
        input.flat_map(move |s| {
            let (results, _err) = cond.apply(Stream::singleton(s.clone())).drain();
            if results.is_empty() {
                else_.apply(Stream::singleton(s))
            } else {
                then.apply(Stream::of(results))
            }
        })
    })
}

/// Limits `g` to its first result (§4.3).
pub fn once(g: Goal) -> Goal {
    Goal::new("once", move |input| g.apply(input).take(1))
}

/// Fails the output with a timeout error if `g` has not completed within
/// `ms` milliseconds (§4.3, §7). Each call gets its own timer (see
/// [crate::time_out]) whose firing emits directly on this goal's own
/// stream rather than being polled from a shared stop flag.
pub fn timeout(g: Goal, ms: u64) -> Goal {
    Goal::new("timeout", move |input| {
        let g = g.clone();
        input.flat_map(move |s| crate::time_out::with_timeout(g.apply(Stream::singleton(s)), ms))
    })
}

/// Lifts a host function `Term -> Term` into a goal that unifies its result
/// against `out` (§4.3, §6). Any error the function reports propagates as
/// [EngineError::HostFunction].
pub fn lift(
    name: &'static str,
    f: impl Fn(&Term) -> Result<Term, String> + 'static,
    input_term: Term,
    out: Term,
) -> Goal {
    let f = Rc::new(f);
    Goal::new(name, move |input| {
        let f = Rc::clone(&f);
        let input_term = input_term.clone();
        let out = out.clone();
        input.flat_map(move |s| {
            let walked = crate::unify::walk(&input_term, &s);
            match f(&walked) {
                Ok(value) => match unify_and_wake(&out, &value, &s) {
                    Some(extended) => Stream::singleton(extended),
                    None => Stream::empty(),
                },
                Err(msg) => Stream::fail(EngineError::HostFunction(msg)),
            }
        })
    })
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn eq_binds_a_fresh_variable() {
        let x = Term::fresh_var();
        let g = eq(x.clone(), Term::int(5));
        let (results, _) = g.run(10);
        assert_eq!(results.len(), 1);
        assert_eq!(crate::unify::walk(&x, &results[0]).to_string(), "5");
    }

    #[test]
    fn and_runs_goals_left_to_right_over_one_substitution() {
        let x = Term::fresh_var();
        let y = Term::fresh_var();
        let g = and(vec![eq(x.clone(), Term::int(1)), eq(y.clone(), Term::int(2))]);
        let (results, _) = g.run(10);
        assert_eq!(results.len(), 1);
        assert_eq!(crate::unify::walk(&x, &results[0]).to_string(), "1");
        assert_eq!(crate::unify::walk(&y, &results[0]).to_string(), "2");
    }

    #[test]
    fn or_produces_cartesian_product_with_and() {
        let x = Term::fresh_var();
        let y = Term::fresh_var();
        let g = and(vec![
            or(vec![eq(x.clone(), Term::int(1)), eq(x.clone(), Term::int(2))]),
            or(vec![eq(y.clone(), Term::str("a")), eq(y.clone(), Term::str("b"))]),
        ]);
        let (results, _) = g.run(10);
        assert_eq!(results.len(), 4);
    }

    #[test]
    fn not_emits_original_when_goal_has_no_results() {
        let x = Term::fresh_var();
        let g = and(vec![eq(x.clone(), Term::int(1)), not(eq(x.clone(), Term::int(2)))]);
        let (results, _) = g.run(10);
        assert_eq!(results.len(), 1);
    }

    #[test]
    fn not_emits_nothing_when_goal_proves_the_input_unchanged() {
        let x = Term::fresh_var();
        let bound_first = and(vec![eq(x.clone(), Term::int(1))]);
        let g = and(vec![bound_first, not(eq(x.clone(), Term::int(1)))]);
        let (results, _) = g.run(10);
        assert_eq!(results.len(), 0);
    }

    #[test]
    fn not_emits_the_unchanged_input_when_goal_only_adds_a_new_binding() {
        // y is free going in; `eq(y, 5)` succeeds but only by binding y,
        // which must not count as a proof of the incoming substitution.
        let y = crate::term::Variable::fresh();
        let (results, _) = not(eq(Term::var(y.clone()), Term::int(5))).run(10);
        assert_eq!(results.len(), 1);
        assert!(!results[0].is_bound(&y));
    }

    #[test]
    fn once_limits_to_first_result() {
        let x = Term::fresh_var();
        let g = once(or(vec![eq(x.clone(), Term::int(1)), eq(x.clone(), Term::int(2))]));
        let (results, _) = g.run(10);
        assert_eq!(results.len(), 1);
    }

    #[test]
    fn ifte_takes_then_branch_when_cond_succeeds() {
        let x = Term::fresh_var();
        let g = ifte(
            eq(x.clone(), Term::int(1)),
            eq(Term::str("yes"), Term::str("yes")),
            eq(Term::str("no"), Term::str("yes")),
        );
        let (results, _) = g.run(10);
        assert_eq!(results.len(), 1);
    }
}
