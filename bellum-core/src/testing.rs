//! Fixtures shared across the test suite: canned forces, a static
//! directory, and a ledger wrapper that injects write conflicts.

use crate::battle::{
    AllianceId, Battle, BattleDraft, BattleId, PlayerId, Resources, Timestamp, VillageId, WarId,
    WorldId,
};
use crate::catalog::UnitCatalog;
use crate::directory::{EntityDirectory, VillageSnapshot};
use crate::error::EngineError;
use crate::fixed::Fixed;
use crate::force::Force;
use crate::ledger::{BattleFilter, BattleLedger, Page, QueryPage};
use crate::march::Position;
use crate::war::{War, WarStatus};
use rustc_hash::FxHashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

/// The production roster, under the name tests reach for.
pub fn standard_catalog() -> UnitCatalog {
    UnitCatalog::standard()
}

/// Builds a force from unit/count pairs against the standard catalog.
pub fn force(units: &[(&str, i64)]) -> Force {
    Force::from_counts(
        &standard_catalog(),
        units.iter().map(|(unit, count)| (unit.to_string(), *count)),
    )
    .expect("valid test force")
}

/// An unwalled village at the map origin.
pub fn village_snapshot(owner: PlayerId, garrison: Force, stocks: Resources) -> VillageSnapshot {
    VillageSnapshot {
        owner,
        position: Position::default(),
        defense_bonus: Fixed::ONE,
        garrison,
        stocks,
    }
}

pub struct DirectoryBuilder {
    players: FxHashMap<PlayerId, WorldId>,
    villages: FxHashMap<VillageId, VillageSnapshot>,
    wars: FxHashMap<WarId, War>,
}

impl DirectoryBuilder {
    pub fn new() -> Self {
        DirectoryBuilder {
            players: FxHashMap::default(),
            villages: FxHashMap::default(),
            wars: FxHashMap::default(),
        }
    }

    pub fn player(mut self, id: PlayerId, world: WorldId) -> Self {
        self.players.insert(id, world);
        self
    }

    pub fn village(mut self, id: VillageId, snapshot: VillageSnapshot) -> Self {
        self.villages.insert(id, snapshot);
        self
    }

    pub fn war(
        mut self,
        id: WarId,
        aggressor: AllianceId,
        defender: AllianceId,
        start: Timestamp,
    ) -> Self {
        self.wars.insert(
            id,
            War {
                id,
                aggressor,
                defender,
                status: WarStatus::Active,
                start_date: start,
                end_date: None,
            },
        );
        self
    }

    pub fn build(self) -> StaticDirectory {
        StaticDirectory {
            players: self.players,
            villages: self.villages,
            wars: self.wars,
        }
    }
}

impl Default for DirectoryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Immutable [`EntityDirectory`] over fixed maps.
pub struct StaticDirectory {
    players: FxHashMap<PlayerId, WorldId>,
    villages: FxHashMap<VillageId, VillageSnapshot>,
    wars: FxHashMap<WarId, War>,
}

impl EntityDirectory for StaticDirectory {
    fn player_world(&self, player: PlayerId) -> Option<WorldId> {
        self.players.get(&player).copied()
    }

    fn village(&self, village: VillageId) -> Option<VillageSnapshot> {
        self.villages.get(&village).cloned()
    }

    fn war(&self, war: WarId) -> Option<War> {
        self.wars.get(&war).cloned()
    }
}

/// Wraps a ledger so the next `conflicts` queries fail with a write
/// conflict before delegating. Exercises retry paths without a real
/// concurrent writer.
pub struct ConflictLedger {
    inner: Arc<dyn BattleLedger>,
    remaining: AtomicU32,
}

impl ConflictLedger {
    pub fn failing(inner: Arc<dyn BattleLedger>, conflicts: u32) -> Self {
        ConflictLedger {
            inner,
            remaining: AtomicU32::new(conflicts),
        }
    }
}

impl BattleLedger for ConflictLedger {
    fn record(&self, draft: BattleDraft) -> Result<BattleId, EngineError> {
        self.inner.record(draft)
    }

    fn battle(&self, id: BattleId) -> Result<Battle, EngineError> {
        self.inner.battle(id)
    }

    fn query(&self, filter: &BattleFilter, page: Page) -> Result<QueryPage, EngineError> {
        let conflicted = self
            .remaining
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| n.checked_sub(1))
            .is_ok();
        if conflicted {
            return Err(EngineError::WriteConflict);
        }
        self.inner.query(filter, page)
    }
}
