//! Battle records and the small value types they carry.
//!
//! A `Battle` is an immutable fact: once the ledger assigns its id, the
//! stored data never changes. Field names here are the wire contract the
//! API layer serves; renaming a field is a breaking protocol change.

use crate::error::EngineError;
use crate::fixed::Fixed;
use crate::force::Force;
use serde::{Deserialize, Serialize};

pub type PlayerId = u64;
pub type VillageId = u64;
pub type AllianceId = u64;
pub type WarId = u64;
pub type BattleId = u64;
pub type WorldId = u32;

/// Logical combat time, in whole seconds.
///
/// Resolution time may differ from persistence time (a battle marched
/// for hours before it landed), so records carry their own clock.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Timestamp(pub i64);

impl Timestamp {
    pub const fn from_secs(secs: i64) -> Self {
        Timestamp(secs)
    }

    pub const fn as_secs(self) -> i64 {
        self.0
    }

    pub fn plus_seconds(self, secs: u64) -> Self {
        Timestamp(self.0.saturating_add(secs as i64))
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Per-resource amounts over the closed resource set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Resources {
    pub wood: u64,
    pub clay: u64,
    pub iron: u64,
    pub crop: u64,
}

/// Resources transferred attacker-ward on victory. Same shape as stocks.
pub type Loot = Resources;

impl Resources {
    pub const ZERO: Resources = Resources {
        wood: 0,
        clay: 0,
        iron: 0,
        crop: 0,
    };

    pub const fn new(wood: u64, clay: u64, iron: u64, crop: u64) -> Self {
        Resources {
            wood,
            clay,
            iron,
            crop,
        }
    }

    pub fn total(&self) -> u64 {
        self.wood
            .saturating_add(self.clay)
            .saturating_add(self.iron)
            .saturating_add(self.crop)
    }

    pub fn is_zero(&self) -> bool {
        self.total() == 0
    }
}

/// Outcome from the attacker's perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BattleResult {
    Victory,
    Defeat,
    Draw,
}

impl std::fmt::Display for BattleResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            BattleResult::Victory => "victory",
            BattleResult::Defeat => "defeat",
            BattleResult::Draw => "draw",
        };
        f.write_str(s)
    }
}

/// Everything a battle record holds except the ledger-assigned id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BattleDraft {
    pub attacker_id: PlayerId,
    pub defender_id: PlayerId,
    pub village_id: VillageId,
    pub attacker_troops: Force,
    pub defender_troops: Force,
    pub attacker_losses: Force,
    pub defender_losses: Force,
    pub loot: Loot,
    pub result: BattleResult,
    pub war_id: Option<WarId>,
    pub occurred_at: Timestamp,
}

impl BattleDraft {
    /// Consistency gate run before a draft reaches storage: losses may
    /// never exceed troops, and loot must be zero outside victory.
    pub fn check_invariants(&self) -> Result<(), EngineError> {
        check_losses(&self.attacker_troops, &self.attacker_losses)?;
        check_losses(&self.defender_troops, &self.defender_losses)?;
        if self.result != BattleResult::Victory && !self.loot.is_zero() {
            return Err(EngineError::LootWithoutVictory);
        }
        Ok(())
    }
}

fn check_losses(troops: &Force, losses: &Force) -> Result<(), EngineError> {
    for (unit, lost) in losses.units() {
        let had = troops.count(unit);
        if lost > had {
            return Err(EngineError::LossesExceedTroops {
                unit: unit.to_string(),
                losses: lost,
                troops: had,
            });
        }
    }
    Ok(())
}

/// One resolved combat event between two forces at a village.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Battle {
    pub id: BattleId,
    pub attacker_id: PlayerId,
    pub defender_id: PlayerId,
    pub village_id: VillageId,
    pub attacker_troops: Force,
    pub defender_troops: Force,
    pub attacker_losses: Force,
    pub defender_losses: Force,
    pub loot: Loot,
    pub result: BattleResult,
    pub war_id: Option<WarId>,
    pub occurred_at: Timestamp,
}

impl Battle {
    pub fn from_draft(id: BattleId, draft: BattleDraft) -> Self {
        Battle {
            id,
            attacker_id: draft.attacker_id,
            defender_id: draft.defender_id,
            village_id: draft.village_id,
            attacker_troops: draft.attacker_troops,
            defender_troops: draft.defender_troops,
            attacker_losses: draft.attacker_losses,
            defender_losses: draft.defender_losses,
            loot: draft.loot,
            result: draft.result,
            war_id: draft.war_id,
            occurred_at: draft.occurred_at,
        }
    }

    pub fn involves(&self, player: PlayerId) -> bool {
        self.attacker_id == player || self.defender_id == player
    }

    /// The winning player, if the battle was not a draw.
    pub fn winner(&self) -> Option<PlayerId> {
        match self.result {
            BattleResult::Victory => Some(self.attacker_id),
            BattleResult::Defeat => Some(self.defender_id),
            BattleResult::Draw => None,
        }
    }
}

/// Derived per-player record, computed fresh from the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PlayerBattleStats {
    pub player_id: PlayerId,
    pub total_battles: u64,
    pub victories: u64,
    pub defeats: u64,
    pub draws: u64,
    pub win_rate: Fixed,
    pub total_loot_gained: u64,
}

impl PlayerBattleStats {
    pub fn zero(player_id: PlayerId) -> Self {
        PlayerBattleStats {
            player_id,
            total_battles: 0,
            victories: 0,
            defeats: 0,
            draws: 0,
            win_rate: Fixed::ZERO,
            total_loot_gained: 0,
        }
    }
}
