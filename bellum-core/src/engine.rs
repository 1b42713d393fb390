//! The attack pipeline: directory lookups, combat resolution, ledger
//! write, one battle out.
//!
//! [`BattleEngine`] owns nothing but wiring. Game state comes from the
//! injected [`EntityDirectory`], the outcome goes to the injected
//! [`BattleLedger`], and the returned [`Battle`] is read back from
//! storage so callers see exactly what was recorded.

use crate::battle::{Battle, BattleDraft, PlayerId, Timestamp, VillageId, WarId};
use crate::catalog::UnitCatalog;
use crate::combat::{resolve, AttackKind, Engagement};
use crate::config::EngineConfig;
use crate::directory::EntityDirectory;
use crate::error::EngineError;
use crate::fixed::Fixed;
use crate::force::Force;
use crate::ledger::BattleLedger;
use crate::march::{march_duration, Position};
use std::sync::Arc;
use tracing::instrument;

/// Everything a caller must supply to launch an attack. The defender
/// is derived from the target village, never passed in.
#[derive(Debug, Clone)]
pub struct AttackCommand {
    pub attacker_id: PlayerId,
    pub village_id: VillageId,
    pub attacker: Force,
    pub kind: AttackKind,
    /// Engagement-level multiplier on defender power, > 0.
    pub terrain: Fixed,
    pub war_id: Option<WarId>,
    pub occurred_at: Timestamp,
    pub seed: Option<u64>,
}

impl AttackCommand {
    pub fn new(
        attacker_id: PlayerId,
        village_id: VillageId,
        attacker: Force,
        occurred_at: Timestamp,
    ) -> Self {
        AttackCommand {
            attacker_id,
            village_id,
            attacker,
            kind: AttackKind::Normal,
            terrain: Fixed::ONE,
            war_id: None,
            occurred_at,
            seed: None,
        }
    }
}

pub struct BattleEngine {
    catalog: UnitCatalog,
    config: EngineConfig,
    directory: Arc<dyn EntityDirectory>,
    ledger: Arc<dyn BattleLedger>,
}

impl std::fmt::Debug for BattleEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BattleEngine")
            .field("catalog", &self.catalog)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl BattleEngine {
    /// Wires up an engine. Fails fast on an invalid config rather than
    /// misresolving battles later.
    pub fn new(
        catalog: UnitCatalog,
        config: EngineConfig,
        directory: Arc<dyn EntityDirectory>,
        ledger: Arc<dyn BattleLedger>,
    ) -> Result<Self, EngineError> {
        config.validate()?;
        Ok(BattleEngine {
            catalog,
            config,
            directory,
            ledger,
        })
    }

    /// Resolves an attack against a village and records the outcome.
    ///
    /// The returned battle is read back from the ledger after the
    /// write, so it carries the assigned id and is guaranteed to match
    /// what a later query will see.
    #[instrument(skip_all, name = "attack")]
    pub fn attack(&self, command: AttackCommand) -> Result<Battle, EngineError> {
        if !self.directory.player_exists(command.attacker_id) {
            return Err(EngineError::PlayerNotFound(command.attacker_id));
        }
        let village = self
            .directory
            .village(command.village_id)
            .ok_or(EngineError::VillageNotFound(command.village_id))?;
        if village.owner == command.attacker_id {
            return Err(EngineError::SelfAttack(command.attacker_id));
        }
        if let Some(war_id) = command.war_id {
            if self.directory.war(war_id).is_none() {
                return Err(EngineError::WarNotFound(war_id));
            }
        }

        let engagement = Engagement {
            attacker: &command.attacker,
            defender: &village.garrison,
            defense_bonus: village.defense_bonus,
            terrain: command.terrain,
            kind: command.kind,
            defender_stocks: village.stocks,
            seed: command.seed,
        };
        let resolved = resolve(&engagement, &self.catalog, &self.config)?;

        let id = self.ledger.record(BattleDraft {
            attacker_id: command.attacker_id,
            defender_id: village.owner,
            village_id: command.village_id,
            attacker_troops: command.attacker,
            defender_troops: village.garrison,
            attacker_losses: resolved.attacker_losses,
            defender_losses: resolved.defender_losses,
            loot: resolved.loot,
            result: resolved.result,
            war_id: command.war_id,
            occurred_at: command.occurred_at,
        })?;
        let battle = self.ledger.battle(id)?;

        log::info!(
            "battle {}: player {} vs player {} at village {}, {}",
            battle.id,
            battle.attacker_id,
            battle.defender_id,
            battle.village_id,
            battle.result
        );
        Ok(battle)
    }

    /// Travel time for a force between two map positions, using the
    /// configured world size and server speed.
    pub fn plan_march(&self, force: &Force, from: Position, to: Position) -> Result<u64, EngineError> {
        march_duration(
            force,
            &self.catalog,
            from,
            to,
            self.config.world.map_size,
            self.config.world.server_speed,
        )
    }

    pub fn catalog(&self) -> &UnitCatalog {
        &self.catalog
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn ledger(&self) -> Arc<dyn BattleLedger> {
        Arc::clone(&self.ledger)
    }

    pub fn directory(&self) -> Arc<dyn EntityDirectory> {
        Arc::clone(&self.directory)
    }
}
