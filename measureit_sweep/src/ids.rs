//! Sweep identity and relatedness.
//!
//! The original design tracks relatedness by walking an ancestor chain of
//! composed sweeps. A chain walk needs the tree to provably terminate, which
//! the invariant guarantees but which costs O(depth) per check. Since every
//! sweep in a composed tree is assigned the same `root_id` at construction,
//! relatedness collapses to a single equality check.

use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

/// A process-unique sweep identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SweepId(u64);

impl SweepId {
    /// Allocate a fresh identifier.
    pub fn new() -> Self {
        Self(NEXT_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// The raw integer value, for logging/display.
    pub fn value(self) -> u64 {
        self.0
    }
}

impl Default for SweepId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SweepId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "sweep-{}", self.0)
    }
}

/// A sweep's own id plus the root id of the composed tree it belongs to.
/// A standalone sweep is its own root (`root_id == id`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ancestry {
    id: SweepId,
    root_id: SweepId,
}

impl Ancestry {
    /// A fresh standalone sweep: its own root.
    pub fn standalone() -> Self {
        let id = SweepId::new();
        Self { id, root_id: id }
    }

    /// A fresh sweep nested under `parent`'s root.
    pub fn nested_under(parent: Ancestry) -> Self {
        Self { id: SweepId::new(), root_id: parent.root_id }
    }

    /// This sweep's own id.
    pub fn id(self) -> SweepId {
        self.id
    }

    /// The root id of the tree this sweep belongs to.
    pub fn root_id(self) -> SweepId {
        self.root_id
    }

    /// Two sweeps are related iff they share a root.
    pub fn related_to(self, other: Ancestry) -> bool {
        self.root_id == other.root_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standalone_sweep_is_its_own_root() {
        let a = Ancestry::standalone();
        assert_eq!(a.id(), a.root_id());
    }

    #[test]
    fn nested_sweeps_share_root_and_are_related() {
        let parent = Ancestry::standalone();
        let child = Ancestry::nested_under(parent);
        assert_eq!(child.root_id(), parent.root_id());
        assert!(child.related_to(parent));
    }

    #[test]
    fn unrelated_standalone_sweeps_are_not_related() {
        let a = Ancestry::standalone();
        let b = Ancestry::standalone();
        assert!(!a.related_to(b));
    }

    #[test]
    fn ids_are_unique() {
        let a = SweepId::new();
        let b = SweepId::new();
        assert_ne!(a, b);
    }
}
