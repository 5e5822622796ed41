//! The error taxonomy (§7).
//!
//! §7 describes a richer taxonomy with distinct, recoverable categories
//! that must all surface on the stream's error channel rather than unwind
//! the process, so this engine uses a `thiserror` enum rather than bare
//! `Result<_, String>` or panics for recoverable conditions. Unification
//! and occurs-check failure keep their own, separate lane: a silent
//! `None`, never an `EngineError` (§7: "Unification failures never become
//! errors") — only genuinely exceptional conditions become variants here.

use thiserror::Error;

/// An error surfaced on a stream's `error` channel (§7). Unification
/// failure is deliberately absent: it is represented by a goal emitting no
/// substitution, never by this type.
#[derive(Debug, Error, Clone)]
pub enum EngineError {
    /// A lifted host function, or an aggregator's caller-supplied callback,
    /// raised an exception (§7).
    #[error("host function error: {0}")]
    HostFunction(String),

    /// `timeout(g, ms)` elapsed before `g` completed (§4.3, §7).
    #[error("query timed out after {0} ms")]
    Timeout(u64),

    /// An external relation back-end failed to fetch rows (§6, §7).
    #[error("back-end I/O error: {0}")]
    BackendIo(String),

    /// A [crate::query::Query] was run without ever calling `where_goal`/
    /// `where_all`, so it has no goal to drive. Not in the distilled spec's
    /// taxonomy, but needed so `query.rs` has somewhere to put this
    /// programmer mistake without panicking, matching §7's prescription
    /// that only host exceptions are fatal, not malformed engine usage.
    #[error("invalid query: {0}")]
    InvalidQuery(String),
}
