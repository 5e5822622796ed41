//! The constraint suspension engine (§4.5).
//!
//! Arithmetic and comparison relations need every operand ground before
//! they can evaluate; rather than panicking when an operand is still
//! unbound, they suspend here and wake up once a sibling goal narrows the
//! substitution enough to retry.

use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::substitution::Subst;

static NEXT_SUSPENSION_ID: AtomicU64 = AtomicU64::new(0);

fn next_suspension_id() -> u64 { NEXT_SUSPENSION_ID.fetch_add(1, Ordering::Relaxed) }

/// What a suspended constraint's evaluator returns when re-invoked.
pub enum SuspendOutcome {
    /// The constraint is violated: drop the substitution silently (§7 — this
    /// is *not* a stream error, matching "the enclosing goal emits nothing
    /// for it").
    Failed,
    /// Still not enough information; re-suspend watching these variable
    /// ids (the subset of the original watch set still unbound).
    CheckLater(Vec<u64>),
    /// The constraint is satisfied (or made more progress); the returned
    /// substitution may have newly bound some of the watched variables,
    /// named explicitly here so `wake_up_suspends` does not need to diff
    /// two substitutions to find out what changed.
    Resolved(Subst, Vec<u64>),
}

/// A suspended partial constraint (§4.5). Cloning is O(1); the evaluator is
/// behind an `Rc`.
#[derive(Clone)]
pub struct Suspension {
    pub id: u64,
    pub watched: Vec<u64>,
    resume: Rc<dyn Fn(&Subst) -> SuspendOutcome>,
}

impl fmt::Debug for Suspension {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Suspension#{}(watching {:?})", self.id, self.watched)
    }
}

/// Registers a new suspension on `s`, watching `watched` variable ids, and
/// returns the extended substitution unchanged in every other respect
/// (§4.5 "Registration").
pub fn add_suspend(
    s: &Subst,
    watched: Vec<u64>,
    resume: Rc<dyn Fn(&Subst) -> SuspendOutcome>,
) -> Subst {
    let suspension = Suspension { id: next_suspension_id(), watched, resume };
    let mut list = (*s.suspended).clone();
    list.push(suspension);
    s.with_suspensions(list)
}

/// Re-evaluates every suspension whose watched set intersects
/// `newly_bound`, iterating to a fixpoint (§4.5 "Wake-up"). Returns `None`
/// if any re-invoked constraint reports [SuspendOutcome::Failed] — per §7
/// this is a silent drop, not a stream error.
pub fn wake_up_suspends(s: &Subst, newly_bound: &[u64]) -> Option<Subst> {
    if s.suspended.is_empty() {
        return Some(s.clone());
    }

    let mut current = s.clone();
    let mut working: Vec<u64> = newly_bound.to_vec();

    loop {
        let hit = current
            .suspended
            .iter()
            .position(|susp| susp.watched.iter().any(|v| working.contains(v)));

        let idx = match hit {
            Some(i) => i,
            None => break,
        };

        let mut remaining = (*current.suspended).clone();
        let fired = remaining.remove(idx);
        let without_this = current.with_suspensions(remaining);

        log::trace!("waking suspension {} (watching {:?})", fired.id, fired.watched);

        match (fired.resume)(&without_this) {
            SuspendOutcome::Failed => {
                log::debug!("suspension {} reported constraint violation", fired.id);
                return None;
            }
            SuspendOutcome::CheckLater(still_free) => {
                let mut list = (*without_this.suspended).clone();
                list.push(Suspension { id: fired.id, watched: still_free, resume: fired.resume });
                current = without_this.with_suspensions(list);
            }
            SuspendOutcome::Resolved(new_subst, newly_bound_here) => {
                current = new_subst;
                working.extend(newly_bound_here);
            }
        }
    }

    Some(current)
}

/// A convenience wrapper for constraints shaped like arithmetic relations:
/// given `vars`, walk each; if at least `min_grounded` are non-variable,
/// call `evaluator`; otherwise suspend, watching whichever of `vars` are
/// still free (§4.5 `suspendable`).
pub fn suspendable(
    s: &Subst,
    vars: Vec<crate::term::Term>,
    evaluator: Rc<dyn Fn(&[crate::term::Term], &Subst) -> SuspendOutcome>,
    min_grounded: Option<usize>,
) -> SuspendOutcome {
    let min_grounded = min_grounded.unwrap_or(vars.len().saturating_sub(1));
    let walked: Vec<crate::term::Term> = vars.iter().map(|t| crate::unify::walk(t, s)).collect();
    let grounded_count = walked.iter().filter(|t| !t.is_var()).count();

    if grounded_count >= min_grounded {
        evaluator(&walked, s)
    } else {
        let still_free: Vec<u64> = walked
            .iter()
            .filter_map(|t| match t {
                crate::term::Term::Var(v) => Some(v.id),
                _ => None,
            })
            .collect();
        SuspendOutcome::CheckLater(still_free)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::term::Term;

    #[test]
    fn wake_up_with_no_suspensions_is_identity() {
        let s = Subst::empty();
        let out = wake_up_suspends(&s, &[]).unwrap();
        assert!(out.suspended.is_empty());
    }

    #[test]
    fn suspension_fires_and_resolves() {
        let s = Subst::empty();
        let v = crate::term::Variable::fresh();
        let watched = vec![v.id];
        let resume: Rc<dyn Fn(&Subst) -> SuspendOutcome> = {
            let v = v.clone();
            Rc::new(move |s: &Subst| {
                let extended = s.extend(&v, Term::int(99));
                SuspendOutcome::Resolved(extended, vec![v.id])
            })
        };
        let s = add_suspend(&s, watched, resume);
        assert_eq!(s.suspended.len(), 1);

        let woken = wake_up_suspends(&s, &[v.id]).expect("resolves");
        assert!(woken.suspended.is_empty());
        assert_eq!(woken.get_binding(&v).unwrap().to_string(), "99");
    }

    #[test]
    fn suspension_violation_drops_silently() {
        let s = Subst::empty();
        let v = crate::term::Variable::fresh();
        let resume: Rc<dyn Fn(&Subst) -> SuspendOutcome> = Rc::new(|_s: &Subst| SuspendOutcome::Failed);
        let s = add_suspend(&s, vec![v.id], resume);
        assert!(wake_up_suspends(&s, &[v.id]).is_none());
    }
}
