//! Crawl module - dependency closure walk over a package site.
//!
//! - **Walker**: post-order traversal via [`DependencyWalker`]
//! - **State**: per-run visit ledger and counters via [`VisitLedger`] and [`WalkStats`]

pub mod state;
pub mod walker;

pub use state::{VisitLedger, VisitState, WalkStats};
pub use walker::{DependencyWalker, WalkError, WalkOutcome};
