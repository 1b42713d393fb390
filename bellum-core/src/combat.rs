//! Combat resolution.
//!
//! The resolver is a pure function: two forces, the engagement
//! modifiers, and the configuration in; losses, loot, and a result out.
//! Nothing here persists or reads shared state, so it is safe to call
//! concurrently from any number of requests.
//!
//! Flow:
//!
//! ```text
//!   attacker force ──┐
//!                    ├─ effective power ─ ratio ─ classify ─┐
//!   defender force ──┘        (defense bonus × terrain)     │
//!                                                           ▼
//!   loss fractions (sigma curve, raid damping, seeded jitter)
//!                                                           │
//!   per-unit floor ─ survivors ─ carry-capped loot ─ ResolvedBattle
//! ```
//!
//! The curve: `sigma(x) = x^1.5 / 2` below parity and
//! `(2 − x^-1.5) / 2` above it. The side with the power advantage loses
//! the small branch of the curve, the other side the large branch. Every
//! threshold, cap, and factor comes from [`CombatConfig`].

use crate::battle::{BattleResult, Loot, Resources};
use crate::catalog::UnitCatalog;
use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::fixed::Fixed;
use crate::force::Force;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::instrument;

/// How the attacker fights. Raids are hit-and-run: both sides bleed
/// less, loot rules are unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttackKind {
    #[default]
    Normal,
    Raid,
}

/// One combat to resolve. Forces are borrowed; the resolver never
/// mutates them.
#[derive(Debug, Clone, Copy)]
pub struct Engagement<'a> {
    pub attacker: &'a Force,
    pub defender: &'a Force,
    /// Multiplier ≥ 1.0 from wall/building state.
    pub defense_bonus: Fixed,
    /// Engagement-level multiplier on defender power, > 0.
    pub terrain: Fixed,
    pub kind: AttackKind,
    /// The defending village's stocks, the loot base.
    pub defender_stocks: Resources,
    /// Explicit luck seed; only consulted when the config enables
    /// jitter. Part of the inputs, never ambient.
    pub seed: Option<u64>,
}

impl<'a> Engagement<'a> {
    pub fn new(attacker: &'a Force, defender: &'a Force) -> Self {
        Engagement {
            attacker,
            defender,
            defense_bonus: Fixed::ONE,
            terrain: Fixed::ONE,
            kind: AttackKind::Normal,
            defender_stocks: Resources::ZERO,
            seed: None,
        }
    }
}

/// The resolver's output. Persisting it is the ledger's job.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedBattle {
    pub attacker_losses: Force,
    pub defender_losses: Force,
    pub loot: Loot,
    pub result: BattleResult,
}

/// Resolve one engagement.
///
/// Fails on invalid modifiers or forces before any computation; a power
/// overflow mid-computation is surfaced as a fatal invariant violation.
#[instrument(skip_all, name = "resolve_battle")]
pub fn resolve(
    engagement: &Engagement,
    catalog: &UnitCatalog,
    config: &EngineConfig,
) -> Result<ResolvedBattle, EngineError> {
    let cfg = &config.combat;

    if engagement.defense_bonus < Fixed::ONE {
        return Err(EngineError::DefenseBonusBelowOne(engagement.defense_bonus));
    }
    if engagement.terrain <= Fixed::ZERO {
        return Err(EngineError::NonPositiveTerrain(engagement.terrain));
    }

    let attacker_power = engagement.attacker.effective_power(catalog, Fixed::ONE)?;
    let defender_power = engagement
        .defender
        .effective_power(catalog, engagement.defense_bonus * engagement.terrain)?;

    let ratio = attacker_power / defender_power.max(cfg.power_epsilon);
    let result = classify(ratio, cfg.draw_lower, cfg.draw_upper);
    log::debug!(
        "combat: attacker power {attacker_power} vs defender power {defender_power}, ratio {ratio} → {result}"
    );

    let inverse = Fixed::ONE / ratio.max(cfg.power_epsilon);
    let (mut attacker_fraction, mut defender_fraction) = match result {
        BattleResult::Victory => (sigma(inverse), sigma(ratio) * cfg.wipe_factor),
        BattleResult::Defeat => (sigma(inverse) * cfg.wipe_factor, sigma(ratio)),
        BattleResult::Draw => (sigma(inverse), sigma(ratio)),
    };

    if engagement.kind == AttackKind::Raid {
        attacker_fraction *= cfg.raid_damping;
        defender_fraction *= cfg.raid_damping;
    }

    if let (Some(seed), true) = (engagement.seed, cfg.loss_jitter > Fixed::ZERO) {
        let mut rng = StdRng::seed_from_u64(seed);
        let band = cfg.loss_jitter.raw();
        attacker_fraction *= Fixed::ONE + Fixed::from_raw(rng.gen_range(-band..=band));
        defender_fraction *= Fixed::ONE + Fixed::from_raw(rng.gen_range(-band..=band));
    }

    // The caps have the final word, whatever damping and jitter did.
    match result {
        BattleResult::Victory => {
            attacker_fraction = attacker_fraction.min(cfg.winner_loss_cap);
            defender_fraction = defender_fraction.min(Fixed::ONE);
        }
        BattleResult::Defeat => {
            attacker_fraction = attacker_fraction.min(Fixed::ONE);
            defender_fraction = defender_fraction.min(cfg.winner_loss_cap);
        }
        BattleResult::Draw => {
            attacker_fraction = attacker_fraction.min(Fixed::ONE);
            defender_fraction = defender_fraction.min(Fixed::ONE);
        }
    }

    let attacker_losses = engagement.attacker.proportional_losses(attacker_fraction);
    let defender_losses = engagement.defender.proportional_losses(defender_fraction);

    let loot = match result {
        BattleResult::Victory => plunder(engagement, &attacker_losses, catalog, config)?,
        BattleResult::Defeat | BattleResult::Draw => Loot::ZERO,
    };

    Ok(ResolvedBattle {
        attacker_losses,
        defender_losses,
        loot,
        result,
    })
}

fn classify(ratio: Fixed, draw_lower: Fixed, draw_upper: Fixed) -> BattleResult {
    if ratio > draw_upper {
        BattleResult::Victory
    } else if ratio < draw_lower {
        BattleResult::Defeat
    } else {
        BattleResult::Draw
    }
}

/// Smoothed loss curve: `x^1.5 / 2` up to parity, `(2 − x^-1.5) / 2`
/// beyond it. Continuous at 1 (both branches give 0.5), approaches 1
/// asymptotically.
fn sigma(x: Fixed) -> Fixed {
    if x > Fixed::ONE {
        (Fixed::TWO - Fixed::ONE / x.pow_three_halves()) * Fixed::HALF
    } else {
        x.pow_three_halves() * Fixed::HALF
    }
}

/// Victory bounty: the configured fraction of each stock, scaled down
/// proportionally when the survivors cannot haul it all.
fn plunder(
    engagement: &Engagement,
    attacker_losses: &Force,
    catalog: &UnitCatalog,
    config: &EngineConfig,
) -> Result<Loot, EngineError> {
    let survivors = engagement.attacker.apply_losses(attacker_losses)?;
    let capacity = survivors.carry_capacity(catalog)?;
    let fraction = config.loot.fraction.clamp(Fixed::ZERO, Fixed::ONE);

    let stocks = engagement.defender_stocks;
    let desired = Resources::new(
        take_fraction(stocks.wood, fraction),
        take_fraction(stocks.clay, fraction),
        take_fraction(stocks.iron, fraction),
        take_fraction(stocks.crop, fraction),
    );

    let total = desired.total();
    if total <= capacity {
        return Ok(desired);
    }
    log::debug!("loot capped: {total} desired, {capacity} carryable");
    Ok(Resources::new(
        scale_part(desired.wood, capacity, total),
        scale_part(desired.clay, capacity, total),
        scale_part(desired.iron, capacity, total),
        scale_part(desired.crop, capacity, total),
    ))
}

/// floor(amount × fraction) without leaving the integer domain.
fn take_fraction(amount: u64, fraction: Fixed) -> u64 {
    (amount as u128 * fraction.raw().max(0) as u128 / Fixed::SCALE as u128) as u64
}

/// floor(part × capacity / total); sums of these never exceed capacity.
fn scale_part(part: u64, capacity: u64, total: u64) -> u64 {
    if total == 0 {
        return 0;
    }
    (part as u128 * capacity as u128 / total as u128) as u64
}
