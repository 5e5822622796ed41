//! The aggregation layer (§4.7).
//!
//! An aggregator buffers a stream until it completes, then emits derived
//! substitutions — the mirror image of `not`/`ifte` in [crate::goal], which
//! already established the "drain a subgoal synchronously, then decide"
//! shape this module generalizes. Rather than walking a fully-materialized
//! result vector produced by some outer solver loop, each aggregator here
//! is expressed as an ordinary goal so it composes with `and`/`or` like any
//! other relation.
//!
//! Every aggregator here follows the same four steps: subscribe to the
//! driven subgoal's output accumulating results; on completion compute and
//! emit; on error discard the buffer and propagate; on unsubscribe discard
//! the buffer and cancel upstream. Because this engine drains synchronously
//! (§5), that shape collapses to a `drain()` call followed by ordinary
//! host-side computation — no separate teardown path is needed, since a
//! synchronous `drain()` already owns cancellation of its subscription.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::rc::Rc;

use crate::goal::Goal;
use crate::stream::Stream;
use crate::substitution::Subst;
use crate::term::Term;
use crate::unify::{unify_and_wake, walk};

/// Runs `g` from a singleton input `s`, returning its results or
/// propagating its error as a one-shot failing stream.
fn drive(g: &Goal, s: &Subst) -> Result<Vec<Subst>, Stream<Subst>> {
    let (results, err) = g.apply(Stream::singleton(s.clone())).drain();
    match err {
        Some(e) => Err(Stream::fail((*e).clone())),
        None => Ok(results),
    }
}

fn dedup_by_key(items: Vec<Term>) -> Vec<Term> {
    let mut seen = std::collections::HashSet::new();
    items.into_iter().filter(|t| seen.insert(t.canonical_key())).collect()
}

/// `collecto(x, g, out)`: drives `g`, collects each result's walked `x`
/// into a logic list, unifies it with `out`.
pub fn collecto(x: Term, g: Goal, out: Term) -> Goal {
    Goal::new("collecto", move |input| {
        let x = x.clone();
        let g = g.clone();
        let out = out.clone();
        input.flat_map(move |s| {
            let results = match drive(&g, &s) {
                Ok(r) => r,
                Err(failed) => return failed,
            };
            let items: Vec<Term> = results.iter().map(|r| walk(&x, r)).collect();
            match unify_and_wake(&out, &Term::logic_list(items), &s) {
                Some(extended) => Stream::singleton(extended),
                None => Stream::empty(),
            }
        })
    })
}

/// `collect_distincto(x, g, out)`: like [collecto], deduplicated by
/// canonical serialization.
pub fn collect_distincto(x: Term, g: Goal, out: Term) -> Goal {
    Goal::new("collect_distincto", move |input| {
        let x = x.clone();
        let g = g.clone();
        let out = out.clone();
        input.flat_map(move |s| {
            let results = match drive(&g, &s) {
                Ok(r) => r,
                Err(failed) => return failed,
            };
            let items = dedup_by_key(results.iter().map(|r| walk(&x, r)).collect());
            match unify_and_wake(&out, &Term::logic_list(items), &s) {
                Some(extended) => Stream::singleton(extended),
                None => Stream::empty(),
            }
        })
    })
}

/// `counto(x, g, n, distinct)`: binds `n` to the number of walked `x`
/// results from `g`, deduplicated by canonical serialization when
/// `distinct` is `true`, counting every result (duplicates included)
/// otherwise.
pub fn counto(x: Term, g: Goal, n: Term, distinct: bool) -> Goal {
    Goal::new("counto", move |input| {
        let x = x.clone();
        let g = g.clone();
        let n = n.clone();
        input.flat_map(move |s| {
            let results = match drive(&g, &s) {
                Ok(r) => r,
                Err(failed) => return failed,
            };
            let walked: Vec<Term> = results.iter().map(|r| walk(&x, r)).collect();
            let count = if distinct { dedup_by_key(walked).len() } else { walked.len() };
            match unify_and_wake(&n, &Term::int(count as i64), &s) {
                Some(extended) => Stream::singleton(extended),
                None => Stream::empty(),
            }
        })
    })
}

/// `group_by_collecto(key, val, g, out_key, out_vals)`: groups `g`'s
/// results by distinct walked `key`, emitting one substitution per group
/// binding `out_key`/`out_vals` to the key and the logic list of that
/// group's walked `val`s, in first-encountered order.
pub fn group_by_collecto(key: Term, val: Term, g: Goal, out_key: Term, out_vals: Term) -> Goal {
    Goal::new("group_by_collecto", move |input| {
        let key = key.clone();
        let val = val.clone();
        let g = g.clone();
        let out_key = out_key.clone();
        let out_vals = out_vals.clone();
        input.flat_map(move |s| {
            let results = match drive(&g, &s) {
                Ok(r) => r,
                Err(failed) => return failed,
            };
            let groups = group_results(&key, &val, &results);
            let branches: Vec<Stream<Subst>> = groups
                .into_iter()
                .map(|(k, vals)| {
                    let bound = unify_and_wake(&out_key, &k, &s)
                        .and_then(|s2| unify_and_wake(&out_vals, &Term::logic_list(vals), &s2));
                    match bound {
                        Some(extended) => Stream::singleton(extended),
                        None => Stream::empty(),
                    }
                })
                .collect();
            branches.into_iter().reduce(|a, b| a.merge(&b)).unwrap_or_else(Stream::empty)
        })
    })
}

/// `group_by_counto(key, g, out_key, out_count)`: like [group_by_collecto]
/// but emits each group's size instead of its values.
pub fn group_by_counto(key: Term, g: Goal, out_key: Term, out_count: Term) -> Goal {
    Goal::new("group_by_counto", move |input| {
        let key = key.clone();
        let g = g.clone();
        let out_key = out_key.clone();
        let out_count = out_count.clone();
        input.flat_map(move |s| {
            let results = match drive(&g, &s) {
                Ok(r) => r,
                Err(failed) => return failed,
            };
            let groups = group_results(&key, &key, &results);
            let branches: Vec<Stream<Subst>> = groups
                .into_iter()
                .map(|(k, vals)| {
                    let bound = unify_and_wake(&out_key, &k, &s)
                        .and_then(|s2| unify_and_wake(&out_count, &Term::int(vals.len() as i64), &s2));
                    match bound {
                        Some(extended) => Stream::singleton(extended),
                        None => Stream::empty(),
                    }
                })
                .collect();
            branches.into_iter().reduce(|a, b| a.merge(&b)).unwrap_or_else(Stream::empty)
        })
    })
}

/// Groups `results` by walked `key`, collecting walked `val` per group, in
/// first-encountered order.
fn group_results(key: &Term, val: &Term, results: &[Subst]) -> Vec<(Term, Vec<Term>)> {
    let mut order: Vec<String> = Vec::new();
    let mut groups: BTreeMap<String, (Term, Vec<Term>)> = BTreeMap::new();
    for r in results {
        let k = walk(key, r);
        let v = walk(val, r);
        let key_str = k.canonical_key();
        groups
            .entry(key_str.clone())
            .and_modify(|(_, vals)| vals.push(v.clone()))
            .or_insert_with(|| {
                order.push(key_str.clone());
                (k.clone(), vec![v])
            });
    }
    order.into_iter().map(|k| groups.remove(&k).unwrap()).collect()
}

/// `sort_by_streamo(x, ascending)`: pure stream reshaper. Buffers the whole
/// incoming stream, sorts by walked `x`'s canonical key, and re-emits —
/// the only order-changing aggregator (§4.7).
pub fn sort_by_streamo(x: Term, ascending: bool) -> Goal {
    Goal::new("sort_by_streamo", move |input| {
        let x = x.clone();
        let (mut results, err) = input.drain();
        if let Some(e) = err {
            return Stream::fail((*e).clone());
        }
        results.sort_by(|a, b| {
            let ka = walk(&x, a).canonical_key();
            let kb = walk(&x, b).canonical_key();
            let ord = ka.cmp(&kb);
            if ascending { ord } else { ord.reverse() }
        });
        Stream::of(results)
    })
}

/// `take_streamo(n)`: the first `n` substitutions of the current stream,
/// then completes early — an alias over [Stream::take] exposed as an
/// aggregator so it composes with `and` like the rest of §4.7.
pub fn take_streamo(n: usize) -> Goal {
    Goal::new("take_streamo", move |input| input.take(n))
}

/// `group_by_count_streamo(key, out_key, out_count, drop)`: groups the
/// *current* stream (not a subgoal's output) by walked `key`. When `drop`
/// is true the emitted substitutions carry only `out_key`/`out_count`
/// bound against the empty substitution; otherwise each group's first
/// original substitution is kept and extended with the two new bindings.
pub fn group_by_count_streamo(key: Term, out_key: Term, out_count: Term, drop: bool) -> Goal {
    Goal::new("group_by_count_streamo", move |input| {
        let key = key.clone();
        let out_key = out_key.clone();
        let out_count = out_count.clone();
        let (results, err) = input.drain();
        if let Some(e) = err {
            return Stream::fail((*e).clone());
        }
        let groups = group_by_first(&key, &results);
        let out: Vec<Subst> = groups
            .into_iter()
            .filter_map(|(k, members)| {
                let base = if drop { Subst::empty() } else { members[0].clone() };
                let bound = unify_and_wake(&out_key, &k, &base)
                    .and_then(|s2| unify_and_wake(&out_count, &Term::int(members.len() as i64), &s2));
                bound
            })
            .collect();
        Stream::of(out)
    })
}

/// `group_by_collect_streamo(key, val, out_key, out_vals, drop)`: like
/// [group_by_count_streamo] but emits each group's logic list of walked
/// `val`s instead of its size.
pub fn group_by_collect_streamo(key: Term, val: Term, out_key: Term, out_vals: Term, drop: bool) -> Goal {
    Goal::new("group_by_collect_streamo", move |input| {
        let key = key.clone();
        let val = val.clone();
        let out_key = out_key.clone();
        let out_vals = out_vals.clone();
        let (results, err) = input.drain();
        if let Some(e) = err {
            return Stream::fail((*e).clone());
        }
        let groups = group_by_first(&key, &results);
        let out: Vec<Subst> = groups
            .into_iter()
            .filter_map(|(k, members)| {
                let base = if drop { Subst::empty() } else { members[0].clone() };
                let vals: Vec<Term> = members.iter().map(|m| walk(&val, m)).collect();
                let bound = unify_and_wake(&out_key, &k, &base)
                    .and_then(|s2| unify_and_wake(&out_vals, &Term::logic_list(vals), &s2));
                bound
            })
            .collect();
        Stream::of(out)
    })
}

/// Groups whole substitutions by walked `key`, in first-encountered order,
/// keeping every member substitution (not just the walked value).
fn group_by_first(key: &Term, results: &[Subst]) -> Vec<(Term, Vec<Subst>)> {
    let mut order: Vec<String> = Vec::new();
    let mut groups: BTreeMap<String, (Term, Vec<Subst>)> = BTreeMap::new();
    for r in results {
        let k = walk(key, r);
        let key_str = k.canonical_key();
        groups
            .entry(key_str.clone())
            .and_modify(|(_, members)| members.push(r.clone()))
            .or_insert_with(|| {
                order.push(key_str.clone());
                (k.clone(), vec![r.clone()])
            });
    }
    order.into_iter().map(|k| groups.remove(&k).unwrap()).collect()
}

/// A general bridge between a subgoal's results and a caller-supplied
/// aggregation function (§4.7). Drives `g` on a singleton input, extracts
/// a value per result via `extract`, aggregates the extracted values via
/// `aggregator`, and unifies the aggregate into `bind`.
pub struct Subquery {
    pub goal: Goal,
    pub extract: Rc<dyn Fn(&Subst) -> Term>,
    pub bind: Term,
    pub aggregator: Rc<dyn Fn(Vec<Term>) -> Term>,
}

impl Subquery {
    pub fn new(
        goal: Goal,
        extract: impl Fn(&Subst) -> Term + 'static,
        bind: Term,
        aggregator: impl Fn(Vec<Term>) -> Term + 'static,
    ) -> Self {
        Subquery { goal, extract: Rc::new(extract), bind, aggregator: Rc::new(aggregator) }
    }

    pub fn into_goal(self) -> Goal {
        let Subquery { goal, extract, bind, aggregator } = self;
        Goal::new("subquery", move |input| {
            let goal = goal.clone();
            let extract = Rc::clone(&extract);
            let bind = bind.clone();
            let aggregator = Rc::clone(&aggregator);
            input.flat_map(move |s| {
                let results = match drive(&goal, &s) {
                    Ok(r) => r,
                    Err(failed) => return failed,
                };
                let extracted: Vec<Term> = results.iter().map(|r| extract(r)).collect();
                let value = aggregator(extracted);
                match unify_and_wake(&bind, &value, &s) {
                    Some(extended) => Stream::singleton(extended),
                    None => Stream::empty(),
                }
            })
        })
    }
}

fn numeric_key(t: &Term) -> Option<f64> {
    match t {
        Term::Atom(crate::term::Atom::Integer(i)) => Some(*i as f64),
        Term::Atom(crate::term::Atom::Float(f)) => Some(*f),
        _ => None,
    }
}

fn extremum(results: &[Subst], x: &Term, pick: impl Fn(Ordering) -> bool) -> Option<String> {
    let mut best: Option<(f64, String)> = None;
    for r in results {
        let walked = walk(x, r);
        let n = numeric_key(&walked)?;
        let key = walked.canonical_key();
        best = match best {
            None => Some((n, key)),
            Some((bn, bk)) => {
                if pick(n.partial_cmp(&bn).unwrap_or(Ordering::Equal)) {
                    Some((n, key))
                } else {
                    Some((bn, bk))
                }
            }
        };
    }
    best.map(|(_, k)| k)
}

/// `maxo(x)`: buffers the current stream, re-emits only the substitutions
/// whose walked `x` is numerically maximal.
pub fn maxo(x: Term) -> Goal {
    Goal::new("maxo", move |input| {
        let x = x.clone();
        let (results, err) = input.drain();
        if let Some(e) = err {
            return Stream::fail((*e).clone());
        }
        match extremum(&results, &x, |o| o == Ordering::Greater) {
            Some(best_key) => Stream::of(
                results.into_iter().filter(|r| walk(&x, r).canonical_key() == best_key).collect(),
            ),
            None => Stream::empty(),
        }
    })
}

/// `mino(x)`: like [maxo], but keeps only the numerically minimal results.
pub fn mino(x: Term) -> Goal {
    Goal::new("mino", move |input| {
        let x = x.clone();
        let (results, err) = input.drain();
        if let Some(e) = err {
            return Stream::fail((*e).clone());
        }
        match extremum(&results, &x, |o| o == Ordering::Less) {
            Some(best_key) => Stream::of(
                results.into_iter().filter(|r| walk(&x, r).canonical_key() == best_key).collect(),
            ),
            None => Stream::empty(),
        }
    })
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::goal::{and, eq, or};

    #[test]
    fn collecto_gathers_every_result_into_a_logic_list() {
        let x = Term::fresh_var();
        let out = Term::fresh_var();
        let g = or(vec![eq(x.clone(), Term::int(1)), eq(x.clone(), Term::int(2))]);
        let (results, _) = collecto(x, g, out.clone()).run(10);
        assert_eq!(results.len(), 1);
        let items = walk(&out, &results[0]).logic_list_to_vec().unwrap();
        assert_eq!(items.len(), 2);
    }

    #[test]
    fn counto_with_distinct_true_dedups_before_counting() {
        let x = Term::fresh_var();
        let n = Term::fresh_var();
        let g = or(vec![
            eq(x.clone(), Term::int(1)),
            eq(x.clone(), Term::int(1)),
            eq(x.clone(), Term::int(2)),
        ]);
        let (results, _) = counto(x, g, n.clone(), true).run(10);
        assert_eq!(walk(&n, &results[0]).to_string(), "2");
    }

    #[test]
    fn counto_with_distinct_false_counts_every_result() {
        let x = Term::fresh_var();
        let n = Term::fresh_var();
        let g = or(vec![
            eq(x.clone(), Term::int(1)),
            eq(x.clone(), Term::int(1)),
            eq(x.clone(), Term::int(2)),
        ]);
        let (results, _) = counto(x, g, n.clone(), false).run(10);
        assert_eq!(walk(&n, &results[0]).to_string(), "3");
    }

    #[test]
    fn group_by_collecto_groups_by_key() {
        let k = Term::fresh_var();
        let v = Term::fresh_var();
        let out_key = Term::fresh_var();
        let out_vals = Term::fresh_var();
        let g = or(vec![
            and(vec![eq(k.clone(), Term::str("a")), eq(v.clone(), Term::int(1))]),
            and(vec![eq(k.clone(), Term::str("a")), eq(v.clone(), Term::int(2))]),
            and(vec![eq(k.clone(), Term::str("b")), eq(v.clone(), Term::int(3))]),
        ]);
        let (results, _) = group_by_collecto(k, v, g, out_key.clone(), out_vals.clone()).run(10);
        assert_eq!(results.len(), 2);
    }

    #[test]
    fn maxo_keeps_only_the_numeric_maximum() {
        let x = Term::fresh_var();
        let g = or(vec![
            eq(x.clone(), Term::int(3)),
            eq(x.clone(), Term::int(7)),
            eq(x.clone(), Term::int(5)),
        ]);
        let (results, _) = and(vec![g, maxo(x.clone())]).run(10);
        assert_eq!(results.len(), 1);
        assert_eq!(walk(&x, &results[0]).to_string(), "7");
    }

    #[test]
    fn sort_by_streamo_reorders_ascending() {
        let x = Term::fresh_var();
        let g = or(vec![
            eq(x.clone(), Term::int(3)),
            eq(x.clone(), Term::int(1)),
            eq(x.clone(), Term::int(2)),
        ]);
        let (results, _) = and(vec![g, sort_by_streamo(x.clone(), true)]).run(10);
        let values: Vec<String> = results.iter().map(|r| walk(&x, r).to_string()).collect();
        assert_eq!(values, vec!["1", "2", "3"]);
    }
}
