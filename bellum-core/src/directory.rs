//! Read-only lookups into the surrounding game world.
//!
//! The engine never owns players, villages, or wars; it asks an
//! [`EntityDirectory`] for them at the moment of a write so recorded
//! battles only ever reference entities that exist.

use crate::battle::{PlayerId, Resources, VillageId, WarId, WorldId};
use crate::fixed::Fixed;
use crate::force::Force;
use crate::march::Position;
use crate::war::War;
use serde::{Deserialize, Serialize};

/// Everything combat needs to know about a village at attack time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VillageSnapshot {
    pub owner: PlayerId,
    pub position: Position,
    /// Wall and palisade multiplier, at least 1.0.
    pub defense_bonus: Fixed,
    pub garrison: Force,
    pub stocks: Resources,
}

/// Game-state lookups injected into the engine.
///
/// Implementations are expected to be cheap; every lookup happens on
/// the attack path. The engine never mutates anything behind this
/// trait.
pub trait EntityDirectory: Send + Sync {
    /// The world a player lives on, if the player exists.
    fn player_world(&self, player: PlayerId) -> Option<WorldId>;

    fn village(&self, village: VillageId) -> Option<VillageSnapshot>;

    fn war(&self, war: WarId) -> Option<War>;

    fn player_exists(&self, player: PlayerId) -> bool {
        self.player_world(player).is_some()
    }
}
