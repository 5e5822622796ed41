//! The query builder and runner (§4.8).
//!
//! Queries follow a three-step shape — accumulate goals, run, read results
//! back out by variable name — exposed here as a builder so an embedding
//! program assembles a query with `select`/`where`/`limit` instead of
//! hand-rolling the goal-composition and draining logic itself.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use log::debug;

use crate::error::EngineError;
use crate::goal::{and, Goal};
use crate::stream::Stream;
use crate::substitution::Subst;
use crate::term::Term;
use crate::unify::walk;

/// A property accessor that lazily allocates a named logic variable on
/// first access and returns the same variable on every later access by
/// that name. `"_"` always allocates a fresh anonymous variable instead of
/// reusing one (§4.8).
#[derive(Clone, Default)]
pub struct VarProxy {
    vars: Rc<RefCell<BTreeMap<String, Term>>>,
}

impl VarProxy {
    pub fn new() -> Self {
        VarProxy::default()
    }

    pub fn get(&self, name: &str) -> Term {
        if name == "_" {
            return Term::fresh_var();
        }
        let mut vars = self.vars.borrow_mut();
        vars.entry(name.to_string()).or_insert_with(|| Term::named_var(name)).clone()
    }

    /// Every named variable allocated through this proxy so far, keyed by
    /// name. Used by `select_all` to project the full set of bindings a
    /// query's goals actually named, rather than every internal variable
    /// id the substitution happens to carry.
    fn named_vars(&self) -> BTreeMap<String, Term> {
        self.vars.borrow().clone()
    }
}

/// The output projection chosen by `select` (§4.8).
enum Projection {
    All,
    Shape(Rc<dyn Fn(&VarProxy) -> Term>),
}

/// A query under construction. Goals accumulated across multiple `where`
/// calls compose with `and`, the same way a comma-separated subgoal list
/// composes in a rule body.
pub struct Query {
    proxy: VarProxy,
    goals: Vec<Goal>,
    projection: Projection,
    limit: usize,
}

impl Query {
    pub fn new() -> Self {
        Query { proxy: VarProxy::new(), goals: Vec::new(), projection: Projection::All, limit: usize::MAX }
    }

    pub fn proxy(&self) -> &VarProxy {
        &self.proxy
    }

    /// `select("*")` — emit every named binding the query's goals
    /// introduced, as a record keyed by variable name.
    pub fn select_all(mut self) -> Self {
        self.projection = Projection::All;
        self
    }

    /// `select(proxy => shape)` — project each result through `shape`,
    /// called with this query's variable proxy.
    pub fn select(mut self, shape: impl Fn(&VarProxy) -> Term + 'static) -> Self {
        self.projection = Projection::Shape(Rc::new(shape));
        self
    }

    /// `where(proxy => goal)` — adds one goal, built against this query's
    /// proxy, to the conjunction.
    pub fn where_goal(mut self, goal: impl Fn(&VarProxy) -> Goal) -> Self {
        self.goals.push(goal(&self.proxy));
        self
    }

    /// `where(proxy => goal[])` — adds several goals at once.
    pub fn where_all(mut self, goals: impl Fn(&VarProxy) -> Vec<Goal>) -> Self {
        self.goals.extend(goals(&self.proxy));
        self
    }

    pub fn limit(mut self, n: usize) -> Self {
        self.limit = n;
        self
    }

    fn run_stream(&self) -> Stream<Subst> {
        let root = and(self.goals.clone());
        root.apply(Stream::singleton(Subst::empty())).take(self.limit)
    }

    fn project(&self, s: &Subst) -> Term {
        match &self.projection {
            Projection::All => {
                let fields = self
                    .proxy
                    .named_vars()
                    .into_iter()
                    .map(|(name, var)| (name, deep_walk(&var, s)))
                    .collect();
                Term::record(fields)
            }
            Projection::Shape(f) => deep_walk(&f(&self.proxy), s),
        }
    }

    /// `toArray()` (§4.8): drains the stream into a `Vec`, stopping at the
    /// first error.
    pub fn to_array(&self) -> Result<Vec<Term>, Rc<EngineError>> {
        if self.goals.is_empty() {
            let e = Rc::new(EngineError::InvalidQuery("query has no where goals".to_string()));
            debug!("query run: terminal error {}", e);
            return Err(e);
        }
        debug!("query run: subscribing");
        let (results, err) = self.run_stream().drain();
        let out = results.iter().map(|s| self.project(s)).collect();
        match err {
            Some(e) => {
                debug!("query run: terminal error {}", e);
                Err(e)
            }
            None => {
                debug!("query run: terminal complete, {} result(s)", results.len());
                Ok(out)
            }
        }
    }

    /// Async iteration (§4.8) modelled synchronously: this engine drains
    /// eagerly (§5), so "lazy yield" collapses to handing back an iterator
    /// over an already-computed vector rather than a true coroutine. A host
    /// wiring this onto a real async runtime would instead drive `subscribe`
    /// from its executor and yield one item per wake-up.
    pub fn iter(&self) -> Result<std::vec::IntoIter<Term>, Rc<EngineError>> {
        self.to_array().map(|v| v.into_iter())
    }
}

impl Default for Query {
    fn default() -> Self {
        Query::new()
    }
}

/// Walks `t` against `s`, recursing into sequences/records/cons cells so a
/// projection shape built from nested terms is fully resolved (§4.8:
/// "variables ... are walked and deeply converted").
fn deep_walk(t: &Term, s: &Subst) -> Term {
    let walked = walk(t, s);
    match walked {
        Term::Sequence(items) => Term::seq(items.iter().map(|i| deep_walk(i, s)).collect()),
        Term::Record(fields) => {
            let mut out = BTreeMap::new();
            for (k, v) in fields.iter() {
                out.insert(k.clone(), deep_walk(v, s));
            }
            Term::record(out)
        }
        Term::Cons(h, t2) => Term::cons(deep_walk(&h, s), deep_walk(&t2, s)),
        other => other,
    }
}
