//! The external relation back-end contract (§6).
//!
//! A back-end is anything that can answer "give me the rows matching this
//! query pattern" — a SQL table, a REST resource, or (the reference
//! implementation here) an in-memory fact table. The contract is
//! deliberately narrow: implement [RelationBackend::rel] to return an
//! ordinary [Goal], built from the same `Stream<Subst> -> Stream<Subst>`
//! shape as every other goal in this crate, so a back-end composes with
//! `and`/`or`/the aggregators without the core ever special-casing it.
//!
//! Generalized from "the only possible back-end is this process's own
//! in-memory table" to a trait any external source can implement.

use std::collections::HashMap;
use std::rc::Rc;

use log::{debug, trace};

use crate::error::EngineError;
use crate::goal::Goal;
use crate::group::next_goal_id;
use crate::stream::Stream;
use crate::substitution::Subst;
use crate::term::Term;
use crate::unify::unify_and_wake;

/// Options passed to [RelationBackend::rel]. Reserved for back-end-specific
/// tuning (e.g. a debounce window for batched fetches); empty for
/// [FactTable].
#[derive(Debug, Clone, Default)]
pub struct RelOptions {
    pub debounce_ms: Option<u64>,
}

/// A source of external relations. `rel(identifier, options)` returns a
/// goal that, for every substitution it processes, walks the query
/// pattern, consults `ROW_CACHE` for this goal invocation's id, and
/// unifies each retrieved row against the pattern (§6).
pub trait RelationBackend {
    fn rel(&self, identifier: &str, pattern: Term, options: RelOptions) -> Goal;
}

/// The reference back-end (§6): an in-memory table of rows, indexed by
/// relation name. It stores plain rows (sequences of terms) rather than
/// head/body rule pairs, since this engine's relations are goals, not
/// Prolog-style clauses resolved by a separate unifier loop.
#[derive(Debug, Clone, Default)]
pub struct FactTable {
    rows: HashMap<String, Vec<Vec<Term>>>,
}

impl FactTable {
    pub fn new() -> Self {
        FactTable { rows: HashMap::new() }
    }

    /// Adds one row (a tuple of ground or partially-ground terms) under
    /// `relation`.
    pub fn add_row(&mut self, relation: impl Into<String>, row: Vec<Term>) {
        self.rows.entry(relation.into()).or_default().push(row);
    }

    fn rows_for(&self, relation: &str) -> Vec<Vec<Term>> {
        self.rows.get(relation).cloned().unwrap_or_default()
    }
}

/// Encodes a rowset as ROW_CACHE stores it: one [Term::Sequence] per row.
fn encode_rowset(rows: &[Vec<Term>]) -> Vec<Term> {
    rows.iter().map(|row| Term::seq(row.clone())).collect()
}

/// Inverse of [encode_rowset].
fn decode_rowset(cached: &[Term]) -> Vec<Vec<Term>> {
    cached
        .iter()
        .map(|t| match t {
            Term::Sequence(cols) => (**cols).clone(),
            other => vec![other.clone()],
        })
        .collect()
}

impl RelationBackend for FactTable {
    /// `pattern` must walk to a [Term::Sequence] whose arity matches the
    /// stored rows; each element unifies against the corresponding column
    /// of every candidate row, fanning out one substitution per match.
    fn rel(&self, identifier: &str, pattern: Term, _options: RelOptions) -> Goal {
        let relation = identifier.to_string();
        let goal_id = next_goal_id();
        let rows = self.rows_for(identifier);
        Goal::new("rel", move |input| {
            let relation = relation.clone();
            let pattern = pattern.clone();
            let rows = rows.clone();
            input.flat_map(move |s| {
                let walked = crate::unify::walk(&pattern, &s);
                trace!("FactTable lookup: relation={} goal_id={}", relation, goal_id);
                let (candidates, base): (Vec<Vec<Term>>, Subst) = match s.row_cache.get(&goal_id) {
                    Some(cached) => {
                        debug!("FactTable ROW_CACHE hit: relation={} goal_id={}", relation, goal_id);
                        (decode_rowset(cached), s.clone())
                    }
                    None => {
                        let base = s.with_row_cache_entry(goal_id, encode_rowset(&rows));
                        (rows.clone(), base)
                    }
                };
                let columns: Vec<Term> = match &walked {
                    Term::Sequence(items) => (**items).clone(),
                    other => vec![other.clone()],
                };
                let branches: Vec<Stream<Subst>> = candidates
                    .into_iter()
                    .filter_map(|row| {
                        if row.len() != columns.len() {
                            return None;
                        }
                        let mut cur = base.clone();
                        for (col, cell) in columns.iter().zip(row.iter()) {
                            cur = unify_and_wake(col, cell, &cur)?;
                        }
                        Some(Stream::singleton(cur))
                    })
                    .collect();
                branches.into_iter().reduce(|a, b| a.merge(&b)).unwrap_or_else(Stream::empty)
            })
        })
    }
}

/// Wraps a fallible external fetch (e.g. a real SQL/REST call) as a goal,
/// surfacing any failure as [EngineError::BackendIo] (§6, §7). A back-end
/// author reaches for this instead of [FactTable] once rows must be
/// fetched from outside the process.
pub fn external_rel(
    fetch: impl Fn(&Term) -> Result<Vec<Vec<Term>>, String> + 'static,
    pattern: Term,
) -> Goal {
    let fetch = Rc::new(fetch);
    Goal::new("external_rel", move |input| {
        let fetch = Rc::clone(&fetch);
        let pattern = pattern.clone();
        input.flat_map(move |s| {
            let walked = crate::unify::walk(&pattern, &s);
            let columns: Vec<Term> = match &walked {
                Term::Sequence(items) => (**items).clone(),
                other => vec![other.clone()],
            };
            match fetch(&walked) {
                Err(msg) => Stream::fail(EngineError::BackendIo(msg)),
                Ok(rows) => {
                    let branches: Vec<Stream<Subst>> = rows
                        .into_iter()
                        .filter_map(|row| {
                            if row.len() != columns.len() {
                                return None;
                            }
                            let mut cur = s.clone();
                            for (col, cell) in columns.iter().zip(row.iter()) {
                                cur = unify_and_wake(col, cell, &cur)?;
                            }
                            Some(Stream::singleton(cur))
                        })
                        .collect();
                    branches.into_iter().reduce(|a, b| a.merge(&b)).unwrap_or_else(Stream::empty)
                }
            }
        })
    })
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::unify::walk;

    #[test]
    fn fact_table_unifies_matching_rows() {
        let mut table = FactTable::new();
        table.add_row("parent", vec![Term::str("ada"), Term::str("byron")]);
        table.add_row("parent", vec![Term::str("byron"), Term::str("annabella")]);

        let child = Term::fresh_var();
        let pattern = Term::seq(vec![Term::str("ada"), child.clone()]);
        let g = table.rel("parent", pattern, RelOptions::default());
        let (results, _) = g.run(10);
        assert_eq!(results.len(), 1);
        assert_eq!(walk(&child, &results[0]).to_string(), "byron");
    }

    #[test]
    fn fact_table_fans_out_over_every_row_when_fully_unbound() {
        let mut table = FactTable::new();
        table.add_row("parent", vec![Term::str("ada"), Term::str("byron")]);
        table.add_row("parent", vec![Term::str("byron"), Term::str("annabella")]);

        let p = Term::fresh_var();
        let c = Term::fresh_var();
        let pattern = Term::seq(vec![p, c]);
        let g = table.rel("parent", pattern, RelOptions::default());
        let (results, _) = g.run(10);
        assert_eq!(results.len(), 2);
    }

    #[test]
    fn fact_table_rel_consults_a_populated_row_cache_instead_of_its_own_rows() {
        let mut table = FactTable::new();
        table.add_row("parent", vec![Term::str("ada"), Term::str("byron")]);

        let child = Term::fresh_var();
        let pattern = Term::seq(vec![Term::str("ada"), child.clone()]);
        let g = table.rel("parent", pattern, RelOptions::default());

        // First pass: cache miss, populates ROW_CACHE with the real rows.
        let (first, _) = g.clone().run(10);
        assert_eq!(first.len(), 1);
        assert_eq!(walk(&child, &first[0]).to_string(), "byron");
        let goal_id = *first[0].row_cache.keys().next().expect("ROW_CACHE entry populated on miss");

        // Fabricate a substitution whose ROW_CACHE entry for this goal_id
        // holds a row that does not exist in the table, then drive the
        // same goal on it: if the cache is actually consulted, the result
        // reflects the fabricated row, not the table's real contents.
        let fake_row = vec![Term::str("ada"), Term::str("not-a-real-child")];
        let tampered = Subst::empty().with_row_cache_entry(goal_id, encode_rowset(&[fake_row]));
        let (second, _) = g.apply(Stream::singleton(tampered)).drain();
        assert_eq!(second.len(), 1);
        assert_eq!(walk(&child, &second[0]).to_string(), "not-a-real-child");
    }

    #[test]
    fn external_rel_surfaces_fetch_failure_as_backend_io_error() {
        let g = external_rel(|_t| Err("connection refused".to_string()), Term::fresh_var());
        let (_results, err) = g.run(10);
        assert!(matches!(err.as_deref(), Some(EngineError::BackendIo(_))));
    }
}
