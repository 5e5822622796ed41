//! Goal-group enrichment (§4.4).
//!
//! The JS source attaches `inner_goals` directly to goal function objects
//! and threads goal references through the substitution's back-channel,
//! which in a language with closures and a GC creates no particular
//! problem. A systems implementation storing live closures inside the very
//! substitution that goals consume would create reference cycles (a goal
//! closure capturing a substitution that names the goal). Per §9's design
//! note, this engine instead gives every goal a small, `Copy`, arena-style
//! [GoalHandle] — an id plus a display name — and carries *handles* through
//! `GROUP_INNER_GOALS`/`GROUP_OUTER_GOALS`, never the closures themselves.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_GOAL_ID: AtomicU64 = AtomicU64::new(0);
static NEXT_GROUP_ID: AtomicU64 = AtomicU64::new(0);

pub fn next_goal_id() -> u64 { NEXT_GOAL_ID.fetch_add(1, Ordering::Relaxed) }
pub fn next_group_id() -> u64 { NEXT_GROUP_ID.fetch_add(1, Ordering::Relaxed) }

/// A lightweight, cheaply-cloned reference to a goal, carried through the
/// substitution's group metadata instead of the goal's actual closure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoalHandle {
    pub id: u64,
    pub display_name: &'static str,
}

impl GoalHandle {
    pub fn new(display_name: &'static str) -> Self {
        GoalHandle { id: next_goal_id(), display_name }
    }
}

impl fmt::Display for GoalHandle {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}#{}", self.display_name, self.id)
    }
}

/// The kind of combinator that opened a group, carried in [GroupFrame].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupKind {
    And,
    Or,
    Not,
    Branch,
    Aggregate,
    Subquery,
}

/// One frame of `GROUP_PATH`: the group a substitution passed through, plus
/// which branch index it took if the group was a disjunction.
#[derive(Debug, Clone)]
pub struct GroupFrame {
    pub kind: GroupKind,
    pub id: u64,
    pub branch: Option<usize>,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn goal_handles_get_unique_ids() {
        let a = GoalHandle::new("eq");
        let b = GoalHandle::new("eq");
        assert_ne!(a.id, b.id);
    }
}
