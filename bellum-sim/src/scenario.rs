//! Scenario files and the runner.
//!
//! A scenario is one JSON document:
//!
//! ```json
//! {
//!   "config":   { "combat": { "draw_upper": 13000 } },
//!   "players":  [ { "id": 1, "world": 1 } ],
//!   "villages": [ { "id": 20, "owner": 2, "x": 6, "y": 8,
//!                   "garrison": { "legionnaires": 80 },
//!                   "stocks": { "wood": 1000, "clay": 0, "iron": 0, "crop": 0 } } ],
//!   "wars":     [ { "id": 7, "aggressor": 100, "defender": 200 } ],
//!   "attacks":  [ { "attacker_id": 1, "village_id": 20,
//!                   "units": { "legionnaires": 100 },
//!                   "origin": { "x": 0, "y": 0 }, "war_id": 7 } ]
//! }
//! ```
//!
//! Fixed-point fields (`defense_bonus`, `terrain`, everything under
//! `config`) are raw values: 10000 means 1.0. Attacks resolve in the
//! order they are listed; an attack with an `origin` strikes at
//! departure plus march time, otherwise at its departure time.

use anyhow::{Context, Result};
use bellum_core::{
    arrival, AttackCommand, AttackKind, Battle, BattleEngine, BattleLedger, EngineConfig,
    EngineError, EntityDirectory, Fixed, Force, JournalLedger, LeaderboardProjector,
    LeaderboardScope, MemoryLedger, PlayerBattleStats, PlayerId, Position, Resources, Timestamp,
    UnitCatalog, VillageId, VillageSnapshot, War, WarAggregator, WarId, WarStatus, WarSummary,
    WorldId,
};
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::Arc;

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Scenario {
    #[serde(default)]
    pub config: EngineConfig,
    pub players: Vec<PlayerDef>,
    #[serde(default)]
    pub villages: Vec<VillageDef>,
    #[serde(default)]
    pub wars: Vec<WarDef>,
    #[serde(default)]
    pub attacks: Vec<AttackDef>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PlayerDef {
    pub id: PlayerId,
    pub world: WorldId,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VillageDef {
    pub id: VillageId,
    pub owner: PlayerId,
    #[serde(default)]
    pub x: i32,
    #[serde(default)]
    pub y: i32,
    /// Raw fixed-point, 10000 = 1.0 (no wall).
    #[serde(default = "fixed_one")]
    pub defense_bonus: Fixed,
    #[serde(default)]
    pub garrison: BTreeMap<String, i64>,
    #[serde(default)]
    pub stocks: Resources,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WarDef {
    pub id: WarId,
    pub aggressor: u64,
    pub defender: u64,
    /// Start time in seconds.
    #[serde(default)]
    pub start: i64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AttackDef {
    pub attacker_id: PlayerId,
    pub village_id: VillageId,
    pub units: BTreeMap<String, i64>,
    #[serde(default)]
    pub kind: AttackKind,
    /// Raw fixed-point, 10000 = 1.0.
    #[serde(default = "fixed_one")]
    pub terrain: Fixed,
    #[serde(default)]
    pub war_id: Option<WarId>,
    /// Departure time in seconds.
    #[serde(default)]
    pub departure: i64,
    /// Where the force marches from. Omit to strike at departure.
    #[serde(default)]
    pub origin: Option<Position>,
    #[serde(default)]
    pub seed: Option<u64>,
}

fn fixed_one() -> Fixed {
    Fixed::ONE
}

impl Scenario {
    pub fn load(path: &Path) -> Result<Scenario> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading scenario {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("parsing scenario {}", path.display()))
    }

    fn directory(&self, catalog: &UnitCatalog) -> Result<ScenarioDirectory> {
        let players: HashMap<PlayerId, WorldId> =
            self.players.iter().map(|p| (p.id, p.world)).collect();

        let mut villages = HashMap::new();
        for def in &self.villages {
            let garrison = build_force(catalog, &def.garrison)
                .with_context(|| format!("garrison of village {}", def.id))?;
            villages.insert(
                def.id,
                VillageSnapshot {
                    owner: def.owner,
                    position: Position::new(def.x, def.y),
                    defense_bonus: def.defense_bonus,
                    garrison,
                    stocks: def.stocks,
                },
            );
        }

        let wars = self
            .wars
            .iter()
            .map(|def| {
                (
                    def.id,
                    War {
                        id: def.id,
                        aggressor: def.aggressor,
                        defender: def.defender,
                        status: WarStatus::Active,
                        start_date: Timestamp::from_secs(def.start),
                        end_date: None,
                    },
                )
            })
            .collect();

        Ok(ScenarioDirectory {
            players,
            villages,
            wars,
        })
    }
}

fn build_force(catalog: &UnitCatalog, units: &BTreeMap<String, i64>) -> Result<Force> {
    let force = Force::from_counts(
        catalog,
        units.iter().map(|(unit, count)| (unit.clone(), *count)),
    )?;
    Ok(force)
}

/// The scenario's fixed world, served through the directory trait.
struct ScenarioDirectory {
    players: HashMap<PlayerId, WorldId>,
    villages: HashMap<VillageId, VillageSnapshot>,
    wars: HashMap<WarId, War>,
}

impl EntityDirectory for ScenarioDirectory {
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

/// Everything a run produces, in the order it happened.
#[derive(Debug)]
pub struct RunReport {
    pub battles: Vec<Battle>,
    pub wars: Vec<WarSummary>,
    pub leaderboard: Vec<PlayerBattleStats>,
}

/// Runs a scenario end to end.
///
/// With a journal path the ledger is durable and a rerun extends the
/// same history; otherwise battles live in memory for this run only.
pub fn run(scenario: &Scenario, journal: Option<&Path>, limit: usize) -> Result<RunReport> {
    let catalog = UnitCatalog::standard();
    let directory: Arc<dyn EntityDirectory> = Arc::new(scenario.directory(&catalog)?);

    let ledger: Arc<dyn BattleLedger> = match journal {
        Some(path) => Arc::new(JournalLedger::open(path, Arc::clone(&directory))?),
        None => Arc::new(MemoryLedger::new(Arc::clone(&directory))),
    };

    let engine = BattleEngine::new(
        catalog,
        scenario.config.clone(),
        Arc::clone(&directory),
        Arc::clone(&ledger),
    )?;

    let mut battles = Vec::with_capacity(scenario.attacks.len());
    for (index, def) in scenario.attacks.iter().enumerate() {
        let battle = launch(&engine, def)
            .with_context(|| format!("attack #{} on village {}", index + 1, def.village_id))?;
        battles.push(battle);
    }

    let aggregator = WarAggregator::new(
        Arc::clone(&ledger),
        Arc::clone(&directory),
        scenario.config.clone(),
    );
    let mut wars = Vec::with_capacity(scenario.wars.len());
    for def in &scenario.wars {
        wars.push(aggregator.war_summary(def.id)?);
    }

    let projector = LeaderboardProjector::new(ledger, directory, scenario.config.clone());
    let leaderboard = projector.leaderboard(LeaderboardScope::Global, limit)?;

    Ok(RunReport {
        battles,
        wars,
        leaderboard,
    })
}

fn launch(engine: &BattleEngine, def: &AttackDef) -> Result<Battle> {
    let force = build_force(engine.catalog(), &def.units)?;
    let departure = Timestamp::from_secs(def.departure);

    let occurred_at = match def.origin {
        Some(origin) => {
            let target = engine
                .directory()
                .village(def.village_id)
                .ok_or(EngineError::VillageNotFound(def.village_id))?;
            let secs = engine.plan_march(&force, origin, target.position)?;
            log::debug!(
                "march to village {} takes {}s from ({}, {})",
                def.village_id,
                secs,
                origin.x,
                origin.y
            );
            arrival(departure, secs)
        }
        None => departure,
    };

    let mut command = AttackCommand::new(def.attacker_id, def.village_id, force, occurred_at);
    command.kind = def.kind;
    command.terrain = def.terrain;
    command.war_id = def.war_id;
    command.seed = def.seed;
    Ok(engine.attack(command)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bellum_core::BattleResult;

    fn scenario_json() -> &'static str {
        r#"{
            "players": [
                {"id": 1, "world": 1},
                {"id": 2, "world": 1}
            ],
            "villages": [
                {"id": 20, "owner": 2, "x": 6, "y": 8,
                 "garrison": {"legionnaires": 80, "praetorians": 40},
                 "stocks": {"wood": 1000, "clay": 800, "iron": 600, "crop": 400}}
            ],
            "wars": [{"id": 7, "aggressor": 100, "defender": 200}],
            "attacks": [
                {"attacker_id": 1, "village_id": 20,
                 "units": {"legionnaires": 100, "praetorians": 50},
                 "war_id": 7, "origin": {"x": 0, "y": 0}}
            ]
        }"#
    }

    #[test]
    fn test_scenario_parses_with_defaults() {
        let scenario: Scenario = serde_json::from_str(scenario_json()).unwrap();
        assert_eq!(scenario.players.len(), 2);
        assert_eq!(scenario.attacks[0].kind, AttackKind::Normal);
        assert_eq!(scenario.attacks[0].terrain, Fixed::ONE);
        assert_eq!(scenario.villages[0].defense_bonus, Fixed::ONE);
        assert!(scenario.config.validate().is_ok());
    }

    #[test]
    fn test_unknown_scenario_fields_rejected() {
        let err = serde_json::from_str::<Scenario>(r#"{"players": [], "vilages": []}"#)
            .unwrap_err();
        assert!(err.to_string().contains("vilages"));
    }

    #[test]
    fn test_run_marches_resolves_and_reports() {
        let scenario: Scenario = serde_json::from_str(scenario_json()).unwrap();
        let report = run(&scenario, None, 10).unwrap();

        assert_eq!(report.battles.len(), 1);
        let battle = &report.battles[0];
        assert_eq!(battle.result, BattleResult::Victory);
        assert_eq!(battle.war_id, Some(7));
        // 10 fields at the column's slowest speed (praetorians, 5/h)
        assert_eq!(battle.occurred_at, Timestamp::from_secs(7_200));

        assert_eq!(report.wars.len(), 1);
        assert_eq!(report.wars[0].battles, 1);
        assert_eq!(report.wars[0].attacker_victories, 1);
        assert_eq!(report.wars[0].score, 5);

        assert_eq!(report.leaderboard[0].player_id, 1);
        assert_eq!(report.leaderboard[0].victories, 1);
    }

    #[test]
    fn test_attack_without_origin_strikes_at_departure() {
        let mut scenario: Scenario = serde_json::from_str(scenario_json()).unwrap();
        scenario.attacks[0].origin = None;
        scenario.attacks[0].departure = 500;

        let report = run(&scenario, None, 10).unwrap();
        assert_eq!(report.battles[0].occurred_at, Timestamp::from_secs(500));
    }

    #[test]
    fn test_unknown_units_fail_run_with_context() {
        let mut scenario: Scenario = serde_json::from_str(scenario_json()).unwrap();
        scenario.attacks[0].units.insert("phalanx".to_string(), 10);

        let err = run(&scenario, None, 10).unwrap_err();
        let chain = format!("{err:#}");
        assert!(chain.contains("attack #1"), "missing context: {chain}");
        assert!(chain.contains("phalanx"), "missing cause: {chain}");
    }

    #[test]
    fn test_journaled_runs_extend_history() {
        let dir = tempfile::tempdir().unwrap();
        let journal = dir.path().join("battles.jsonl");
        let scenario: Scenario = serde_json::from_str(scenario_json()).unwrap();

        let first = run(&scenario, Some(&journal), 10).unwrap();
        assert_eq!(first.wars[0].battles, 1);

        let second = run(&scenario, Some(&journal), 10).unwrap();
        assert_eq!(second.wars[0].battles, 2);
        assert_eq!(second.wars[0].score, 10);
        assert_eq!(second.battles[0].id, 2); // ids continue across runs
    }
}
