//! Engine configuration.
//!
//! Every balance constant lives here so tuning never needs a code
//! change. Defaults are product placeholders, not reverse-engineered
//! facts; `validate()` guards the ranges the resolver relies on.

use crate::error::EngineError;
use crate::fixed::Fixed;
use serde::{Deserialize, Serialize};

/// Top-level engine tunables, grouped by subsystem.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub combat: CombatConfig,
    pub loot: LootConfig,
    pub war_score: WarScoreConfig,
    pub ledger: LedgerConfig,
    pub world: WorldConfig,
}

impl EngineConfig {
    pub fn validate(&self) -> Result<(), EngineError> {
        self.combat.validate()?;
        self.loot.validate()?;
        self.war_score.validate()?;
        self.ledger.validate()?;
        self.world.validate()
    }
}

/// Resolver thresholds and loss-curve shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CombatConfig {
    /// Power ratios above this are attacker victories. Default: 1.1
    pub draw_upper: Fixed,
    /// Power ratios below this are attacker defeats. Default: 0.9
    pub draw_lower: Fixed,
    /// The winning side never loses more than this fraction. Default: 0.5
    pub winner_loss_cap: Fixed,
    /// Scales the loser's curve fraction toward wipeout at large
    /// ratios. Default: 1.25
    pub wipe_factor: Fixed,
    /// Loss damping applied to both sides of a raid. Default: 0.5
    pub raid_damping: Fixed,
    /// Floor for defender power in the ratio, so an empty garrison
    /// divides cleanly. Default: 0.0001
    pub power_epsilon: Fixed,
    /// Half-width of the seeded loss jitter band; zero disables the
    /// jitter path entirely. Default: 0
    pub loss_jitter: Fixed,
}

impl Default for CombatConfig {
    fn default() -> Self {
        CombatConfig {
            draw_upper: Fixed::from_raw(11_000),
            draw_lower: Fixed::from_raw(9_000),
            winner_loss_cap: Fixed::HALF,
            wipe_factor: Fixed::from_raw(12_500),
            raid_damping: Fixed::HALF,
            power_epsilon: Fixed::from_raw(1),
            loss_jitter: Fixed::ZERO,
        }
    }
}

impl CombatConfig {
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.draw_lower <= Fixed::ZERO {
            return Err(EngineError::InvalidConfig(
                "draw_lower must be positive".to_string(),
            ));
        }
        if self.draw_lower > self.draw_upper {
            return Err(EngineError::InvalidConfig(
                "draw_lower must not exceed draw_upper".to_string(),
            ));
        }
        if self.winner_loss_cap <= Fixed::ZERO || self.winner_loss_cap > Fixed::ONE {
            return Err(EngineError::InvalidConfig(
                "winner_loss_cap must lie in (0, 1]".to_string(),
            ));
        }
        if self.wipe_factor < Fixed::ONE {
            return Err(EngineError::InvalidConfig(
                "wipe_factor must be at least 1".to_string(),
            ));
        }
        if self.raid_damping <= Fixed::ZERO || self.raid_damping > Fixed::ONE {
            return Err(EngineError::InvalidConfig(
                "raid_damping must lie in (0, 1]".to_string(),
            ));
        }
        if self.power_epsilon <= Fixed::ZERO {
            return Err(EngineError::InvalidConfig(
                "power_epsilon must be positive".to_string(),
            ));
        }
        if self.loss_jitter < Fixed::ZERO || self.loss_jitter >= Fixed::HALF {
            return Err(EngineError::InvalidConfig(
                "loss_jitter must lie in [0, 0.5)".to_string(),
            ));
        }
        Ok(())
    }
}

/// Plunder rules applied on attacker victory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LootConfig {
    /// Fraction of village stocks available as bounty. Default: 0.5
    pub fraction: Fixed,
}

impl Default for LootConfig {
    fn default() -> Self {
        LootConfig {
            fraction: Fixed::HALF,
        }
    }
}

impl LootConfig {
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.fraction < Fixed::ZERO || self.fraction > Fixed::ONE {
            return Err(EngineError::InvalidConfig(
                "loot fraction must lie in [0, 1]".to_string(),
            ));
        }
        Ok(())
    }
}

/// Per-battle weights for the war score fold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WarScoreConfig {
    /// Score added per attacker victory. Default: 5
    pub victory_weight: i64,
    /// Score subtracted per defender victory. Default: 5
    pub defeat_weight: i64,
}

impl Default for WarScoreConfig {
    fn default() -> Self {
        WarScoreConfig {
            victory_weight: 5,
            defeat_weight: 5,
        }
    }
}

impl WarScoreConfig {
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.victory_weight < 0 || self.defeat_weight < 0 {
            return Err(EngineError::InvalidConfig(
                "war score weights must be non-negative".to_string(),
            ));
        }
        Ok(())
    }
}

/// Paging and retry budgets for ledger-backed folds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Records fetched per page when folding large histories. Default: 256
    pub page_size: u32,
    /// Write-conflict retries before the aggregator surfaces the
    /// conflict. Default: 3
    pub conflict_retries: u32,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        LedgerConfig {
            page_size: 256,
            conflict_retries: 3,
        }
    }
}

impl LedgerConfig {
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.page_size == 0 {
            return Err(EngineError::InvalidConfig(
                "page_size must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// World-level march parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    /// Fields per map axis; the world wraps at this size. Default: 401
    pub map_size: u32,
    /// Global march speed multiplier. Default: 1.0
    pub server_speed: Fixed,
}

impl Default for WorldConfig {
    fn default() -> Self {
        WorldConfig {
            map_size: 401,
            server_speed: Fixed::ONE,
        }
    }
}

impl WorldConfig {
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.map_size == 0 {
            return Err(EngineError::InvalidConfig(
                "map_size must be at least 1".to_string(),
            ));
        }
        if self.server_speed <= Fixed::ZERO {
            return Err(EngineError::InvalidConfig(
                "server_speed must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.combat.draw_upper, Fixed::from_raw(11_000));
        assert_eq!(config.war_score.victory_weight, 5);
        assert_eq!(config.ledger.page_size, 256);
    }

    #[test]
    fn test_inverted_draw_band_rejected() {
        let mut config = EngineConfig::default();
        config.combat.draw_lower = Fixed::from_raw(12_000);
        let err = config.validate().unwrap_err();
        assert!(matches!(err, EngineError::InvalidConfig(_)));
    }

    #[test]
    fn test_out_of_range_fractions_rejected() {
        let mut config = EngineConfig::default();
        config.combat.winner_loss_cap = Fixed::from_raw(10_001);
        assert!(config.validate().is_err());

        let mut config = EngineConfig::default();
        config.loot.fraction = Fixed::from_raw(-1);
        assert!(config.validate().is_err());

        let mut config = EngineConfig::default();
        config.ledger.page_size = 0;
        assert!(config.validate().is_err());

        let mut config = EngineConfig::default();
        config.world.server_speed = Fixed::ZERO;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_override_fills_defaults() {
        let config: EngineConfig =
            serde_json::from_str(r#"{"combat":{"draw_upper":13000}}"#).unwrap();
        assert_eq!(config.combat.draw_upper, Fixed::from_raw(13_000));
        assert_eq!(config.combat.draw_lower, Fixed::from_raw(9_000));
        assert_eq!(config.loot.fraction, Fixed::HALF);
    }
}
