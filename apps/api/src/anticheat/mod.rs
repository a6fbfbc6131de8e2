//! Anti-Cheat Session Tracker — accumulates behavioral signals for live
//! interview sessions and computes an integrity score.
//!
//! Live records are ephemeral: created at session start, mutated through the
//! session's lifetime, finalized into an [`IntegritySummary`] and evicted at
//! completion. The caller persists the summary; a process restart losing
//! in-flight history is acceptable.

pub mod tracker;

pub use tracker::{AntiCheatTracker, ClientEvent, IntegritySummary, RiskLevel};
