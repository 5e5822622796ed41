//! Relations over the substitution stream (§4.6).
//!
//! Every relation here is itself a [crate::goal::Goal] built from the same
//! primitives (`eq`, `and`, `or`, `fresh`) that an embedding program would
//! use, in the miniKanren tradition: `membero`/`appendo`/etc. are
//! structural recursion over cons lists, not host-side loops, so they
//! compose and backtrack like any other goal. Each submodule still keeps a
//! fast path for the fully-ground case — when every list argument is
//! already ground, operating on `Term::Sequence`/`logic_list_to_vec`
//! directly avoids paying for recursive unification.

pub mod control;
pub mod lists;
pub mod numeric;
pub mod objects;
