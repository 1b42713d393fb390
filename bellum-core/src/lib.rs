//! # Bellum Core
//!
//! Deterministic battle outcome engine for a browser-based multiplayer
//! strategy game.
//!
//! This crate implements the full attack pipeline: force validation →
//! combat resolution → an immutable battle record. Resolution is a pure
//! function over explicit inputs; the append-only ledger is the only
//! shared mutable state; war scores and leaderboards are recomputed
//! from it on demand and can never drift out of sync.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────┐    ┌──────────────┐    ┌──────────────┐
//! │ AttackCommand │───▶│ BattleEngine │───▶│ BattleLedger │
//! └───────────────┘    │  + resolve() │    │ (append-only)│
//!                      └──────┬───────┘    └──────┬───────┘
//!                             │                   │
//!                      ┌──────▼────────┐   ┌──────▼───────────────┐
//!                      │EntityDirectory│   │ WarAggregator        │
//!                      │   (lookups)   │   │ LeaderboardProjector │
//!                      └───────────────┘   └──────────────────────┘
//! ```
//!
//! ## Key Types
//!
//! | Type | Purpose |
//! |------|---------|
//! | [`Force`] | Validated unit-type → count mapping |
//! | [`resolve`] | Pure function: engagement → losses, loot, result |
//! | [`Battle`] | Immutable outcome record, the wire contract |
//! | [`BattleLedger`] | Append-only storage ([`MemoryLedger`], [`JournalLedger`]) |
//! | [`WarAggregator`] | Folds a war's battles into a signed score |
//! | [`LeaderboardProjector`] | Ranks players from ledger history |
//!
//! ## Determinism
//!
//! All combat math runs on [`Fixed`] (4 decimal places, `i64`), so the
//! same inputs resolve identically on every platform. Optional loss
//! jitter is driven by an explicit seed carried in the engagement, not
//! by ambient randomness.

pub mod battle;
pub mod catalog;
pub mod combat;
pub mod config;
pub mod directory;
pub mod engine;
pub mod error;
pub mod fixed;
pub mod force;
pub mod leaderboard;
pub mod ledger;
pub mod march;
pub mod testing;
pub mod war;

pub use battle::{
    AllianceId, Battle, BattleDraft, BattleId, BattleResult, Loot, PlayerBattleStats, PlayerId,
    Resources, Timestamp, VillageId, WarId, WorldId,
};
pub use catalog::{UnitCatalog, UnitStats, UnitType};
pub use combat::{resolve, AttackKind, Engagement, ResolvedBattle};
pub use config::{
    CombatConfig, EngineConfig, LedgerConfig, LootConfig, WarScoreConfig, WorldConfig,
};
pub use directory::{EntityDirectory, VillageSnapshot};
pub use engine::{AttackCommand, BattleEngine};
pub use error::{EngineError, ErrorKind};
pub use fixed::Fixed;
pub use force::Force;
pub use leaderboard::{LeaderboardProjector, LeaderboardScope};
pub use ledger::{
    BattleFilter, BattleLedger, JournalLedger, MemoryLedger, Page, ParticipantRole, QueryPage,
};
pub use march::{arrival, distance, march_duration, Position};
pub use war::{War, WarAggregator, WarBattles, WarStatus, WarSummary};
