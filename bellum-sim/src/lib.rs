//! Scenario runner around `bellum-core`.
//!
//! Loads a small JSON world (players, villages, wars) plus a scripted
//! list of attacks, marches each attack to its target, resolves it
//! through the battle engine, then reports war summaries and the
//! leaderboard straight from the ledger. See [`scenario`] for the file
//! format.

pub mod scenario;

pub use scenario::{run, RunReport, Scenario};
