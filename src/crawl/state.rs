//! Run-scoped bookkeeping for a single walk.

use crate::model::{Checksum, PackageName};
use std::collections::HashSet;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisitState {
    Unseen,
    Visited,
}

/// Visited packages and claimed checksums of one walk.
///
/// Created empty per run and owned by that run's stack frame; nothing here
/// outlives the walk.
#[derive(Debug, Default)]
pub struct VisitLedger {
    visited: HashSet<PackageName>,
    checksums: HashSet<String>,
}

impl VisitLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self, name: &PackageName) -> VisitState {
        if self.visited.contains(name) {
            VisitState::Visited
        } else {
            VisitState::Unseen
        }
    }

    /// Transitions `name` to `Visited`. Returns `false` if it already was.
    pub fn mark_visited(&mut self, name: &PackageName) -> bool {
        self.visited.insert(name.clone())
    }

    /// Claims `checksum` for a new module. Returns `false` on overlap.
    ///
    /// The unknown sentinel is always claimable.
    pub fn claim_checksum(&mut self, checksum: &Checksum) -> bool {
        match checksum.key() {
            Some(key) => self.checksums.insert(key.to_string()),
            None => true,
        }
    }
}

/// Counters for one walk.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct WalkStats {
    /// Dependency edges encountered, duplicates included
    pub edges: usize,

    /// Packages reached again after their first visit
    pub duplicates: usize,

    /// Packages dropped because their checksum was already emitted
    pub overlaps: usize,

    /// Nodes skipped on fetch, parse or link-resolution failure
    pub failed: usize,

    /// Modules appended to the manifest
    pub emitted: usize,

    /// Emitted modules whose checksum is unknown
    pub unresolved: usize,
}

impl WalkStats {
    /// Nodes reached: every edge plus the root.
    pub fn visits(&self) -> usize {
        self.edges + 1
    }

    /// Every reached node ends up emitted, duplicate, overlapping or failed.
    pub fn is_balanced(&self) -> bool {
        self.visits() == self.emitted + self.duplicates + self.overlaps + self.failed
    }
}

impl fmt::Display for WalkStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} dependencies walked, {} duplicates, {} overlaps, {} failed, {} unresolved checksums",
            self.edges, self.duplicates, self.overlaps, self.failed, self.unresolved
        )
    }
}
