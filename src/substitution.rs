//! The persistent substitution.
//!
//! A dense, `Rc`-shared array of optional bindings, owned rather than
//! lifetime-scoped, that also carries the reserved system entries (group
//! metadata, suspended constraints, the back-end row cache) a purely
//! term-valued substitution would never need.
//!
//! A dynamically typed source would store these system entries as sentinel
//! keys inside one generic map. Here each reserved entry is instead a typed
//! field on [Subst] — same semantics (extending any part of it produces a
//! new, structurally-shared `Subst`), but the compiler enforces the shape of
//! each entry instead of the relation author having to downcast a dynamic
//! value.

use std::collections::BTreeMap;
use std::rc::Rc;

use crate::group::{GroupFrame, GoalHandle};
use crate::suspend::Suspension;
use crate::term::{Term, Variable};

/// Bindings indexed by variable id, copy-on-write. Index `i` holds the
/// binding for variable id `i`, or `None` if unbound/never seen.
#[derive(Debug, Clone, Default)]
struct Bindings(Rc<Vec<Option<Term>>>);

impl Bindings {
    fn get(&self, id: u64) -> Option<&Term> {
        self.0.get(id as usize).and_then(|o| o.as_ref())
    }

    /// True iff `self` binds nothing that `base` left unbound — i.e. every
    /// variable id bound in `self` was already bound in `base`. Does not
    /// require the two to agree on already-bound values: `extend` never
    /// rebinds an id, so any id bound in both necessarily holds the same
    /// term in both.
    fn no_new_bindings_beyond(&self, base: &Bindings) -> bool {
        if Rc::ptr_eq(&self.0, &base.0) {
            return true;
        }
        self.0
            .iter()
            .enumerate()
            .all(|(i, slot)| slot.is_none() || base.0.get(i).map_or(false, |b| b.is_some()))
    }

    /// Returns a new `Bindings` with `id` bound to `term`. Does not mutate `self`.
    fn extended(&self, id: u64, term: Term) -> Bindings {
        let idx = id as usize;
        let mut v = (*self.0).clone();
        if v.len() <= idx {
            v.resize(idx + 1, None);
        }
        v[idx] = Some(term);
        Bindings(Rc::new(v))
    }
}

/// Group-enrichment metadata (§4.4). Absent at the query root.
#[derive(Debug, Clone, Default)]
pub struct GroupMeta {
    pub group_id: u64,
    pub group_path: Rc<Vec<GroupFrame>>,
    pub inner_goals: Rc<Vec<GoalHandle>>,
    pub outer_goals: Rc<Vec<GoalHandle>>,
}

/// An immutable substitution: variable bindings plus the reserved system
/// entries described in §3. Cloning a `Subst` is O(1); every field is `Rc`
/// or `Copy`.
#[derive(Debug, Clone, Default)]
pub struct Subst {
    bindings: Bindings,
    pub group: Option<Rc<GroupMeta>>,
    pub suspended: Rc<Vec<Suspension>>,
    pub row_cache: Rc<BTreeMap<u64, Vec<Term>>>,
}

impl Subst {
    pub fn empty() -> Self { Subst::default() }

    pub fn get_binding(&self, var: &Variable) -> Option<&Term> {
        self.bindings.get(var.id)
    }

    pub fn is_bound(&self, var: &Variable) -> bool {
        self.get_binding(var).is_some()
    }

    /// Extends the substitution with `var ↦ term`. Pure: returns a new `Subst`.
    pub fn extend(&self, var: &Variable, term: Term) -> Subst {
        let mut s = self.clone();
        s.bindings = self.bindings.extended(var.id, term);
        s
    }

    pub fn with_group(&self, group: GroupMeta) -> Subst {
        let mut s = self.clone();
        s.group = Some(Rc::new(group));
        s
    }

    pub fn with_suspensions(&self, suspended: Vec<Suspension>) -> Subst {
        let mut s = self.clone();
        s.suspended = Rc::new(suspended);
        s
    }

    pub fn with_row_cache_entry(&self, goal_id: u64, rows: Vec<Term>) -> Subst {
        let mut s = self.clone();
        let mut cache = (*self.row_cache).clone();
        cache.insert(goal_id, rows);
        s.row_cache = Rc::new(cache);
        s
    }

    pub fn group_id(&self) -> Option<u64> {
        self.group.as_ref().map(|g| g.group_id)
    }

    /// True iff `self` binds no variable that `base` left unbound — used by
    /// [crate::goal::not] to tell "this result is just `base` again" apart
    /// from "this result narrowed `base` further".
    pub fn no_new_bindings_beyond(&self, base: &Subst) -> bool {
        self.bindings.no_new_bindings_beyond(&base.bindings)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn extend_is_pure() {
        let s0 = Subst::empty();
        let v = Variable::fresh();
        let s1 = s0.extend(&v, Term::int(7));
        assert!(!s0.is_bound(&v));
        assert!(s1.is_bound(&v));
    }

    #[test]
    fn extend_preserves_earlier_bindings() {
        let s0 = Subst::empty();
        let a = Variable::fresh();
        let b = Variable::fresh();
        let s1 = s0.extend(&a, Term::int(1));
        let s2 = s1.extend(&b, Term::int(2));
        assert_eq!(s2.get_binding(&a).unwrap().to_string(), "1");
        assert_eq!(s2.get_binding(&b).unwrap().to_string(), "2");
    }
}
