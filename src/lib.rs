//! # flowkanren
//!
//! An embeddable relational/logic query engine in the miniKanren
//! tradition, built on push-based observable substitution streams rather
//! than a pull-based backtracking solver.
//!
//! A goal is a function from a stream of substitutions to a stream of
//! substitutions:
//!
//! <pre>
//! type Goal = fn(Stream&lt;Subst&gt;) -&gt; Stream&lt;Subst&gt;</pre>
//!
//! Queries are built from a handful of primitives — [goal::eq], [goal::and],
//! [goal::or], [goal::fresh], [goal::not] — composed with relations
//! ([relations]) and aggregators ([aggregate]) the same way a user-defined
//! relation would compose them. There is no separate fact/rule text
//! language to parse: a query is assembled directly from these Rust
//! combinators, or driven through the builder in [query].
//!
//! ## A short example
//!
//! ```
//! use flowkanren::goal::{and, eq, or};
//! use flowkanren::relations::lists::membero;
//! use flowkanren::term::Term;
//!
//! let x = Term::fresh_var();
//! let list = Term::logic_list(vec![Term::int(1), Term::int(2), Term::int(3)]);
//! let (results, _err) = membero(x.clone(), list).run(10);
//! assert_eq!(results.len(), 3);
//! ```
//!
//! ## Constraints
//!
//! Directional arithmetic relations ([relations::numeric::pluso] and
//! friends) suspend rather than fail or panic when not enough operands are
//! bound yet, and resume automatically once a sibling goal narrows the
//! substitution further:
//!
//! ```
//! use flowkanren::goal::{and, eq};
//! use flowkanren::relations::numeric::pluso;
//! use flowkanren::term::Term;
//!
//! let x = Term::fresh_var();
//! let y = Term::fresh_var();
//! let z = Term::fresh_var();
//! let g = and(vec![pluso(x.clone(), y.clone(), z.clone()), eq(x.clone(), Term::int(10)), eq(y.clone(), Term::int(5))]);
//! let (results, _err) = g.run(10);
//! assert_eq!(flowkanren::unify::walk(&z, &results[0]).to_string(), "15");
//! ```
//!
//! ## External relations
//!
//! Programs back their own relations with [backend::RelationBackend]; the
//! engine ships one reference implementation, [backend::FactTable], an
//! in-memory indexed fact table.
//!
//! ## Concurrency
//!
//! The engine is single-threaded and cooperative (see the module docs on
//! [stream]): exactly one actor drives a query's stream at a time, so every
//! internal structure is built on `Rc`/`RefCell` rather than `Send`/`Sync`
//! machinery. The sole exception is [time_out], whose background timer
//! thread only ever touches a `Send`-safe atomic flag.
//!
//! ## History
//!
//! The term algebra, knowledge-base lookup idiom, and timeout handling
//! here grew out of an earlier Prolog-like inference engine, reworked
//! around a reactive substitution stream instead of a pull-based solver.

pub mod aggregate;
pub mod backend;
pub mod error;
pub mod goal;
pub mod group;
pub mod query;
pub mod relations;
pub mod stream;
pub mod substitution;
pub mod suspend;
pub mod term;
pub mod time_out;
pub mod unify;

#[macro_use]
pub mod macros;

pub use aggregate::{
    collect_distincto, collecto, counto, group_by_collect_streamo, group_by_collecto,
    group_by_count_streamo, group_by_counto, maxo, mino, sort_by_streamo, take_streamo, Subquery,
};
pub use backend::{external_rel, FactTable, RelOptions, RelationBackend};
pub use error::EngineError;
pub use goal::{and, conde, eq, fresh, ifte, lift, not, once, or, timeout, Goal};
pub use group::{GoalHandle, GroupFrame, GroupKind};
pub use query::{Query, VarProxy};
pub use stream::{Event, Stream, Subscription};
pub use substitution::{GroupMeta, Subst};
pub use suspend::{SuspendOutcome, Suspension};
pub use term::{Atom, Term, Variable};
pub use unify::{unify, unify_and_wake, walk};
