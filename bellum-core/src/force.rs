//! Force model: a troop composition and the arithmetic combat needs.
//!
//! Counts are validated against a catalog at construction and stored in
//! sorted-key order, so serialization and iteration are deterministic.

use crate::catalog::UnitCatalog;
use crate::error::EngineError;
use crate::fixed::Fixed;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Unit-type → count mapping. Never holds a negative or unknown unit
/// when constructed through [`Force::from_counts`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Force {
    units: BTreeMap<String, u32>,
}

impl Force {
    pub fn empty() -> Self {
        Force::default()
    }

    /// Build a force from wire counts.
    ///
    /// Rejects unit types outside the catalog, negative counts, and
    /// counts beyond `u32`. Duplicate entries accumulate.
    pub fn from_counts<I>(catalog: &UnitCatalog, counts: I) -> Result<Self, EngineError>
    where
        I: IntoIterator<Item = (String, i64)>,
    {
        let mut units: BTreeMap<String, u32> = BTreeMap::new();
        for (unit, count) in counts {
            if !catalog.contains(&unit) {
                return Err(EngineError::UnknownUnit(unit));
            }
            if count < 0 {
                return Err(EngineError::NegativeCount { unit, count });
            }
            let total = units.get(&unit).copied().unwrap_or(0) as i64 + count;
            if total > u32::MAX as i64 {
                return Err(EngineError::CountTooLarge { unit, count: total });
            }
            units.insert(unit, total as u32);
        }
        Ok(Force { units })
    }

    pub fn count(&self, unit: &str) -> u32 {
        self.units.get(unit).copied().unwrap_or(0)
    }

    /// Entries in sorted unit order. Zero counts are retained so loss
    /// snapshots stay structurally parallel to troop snapshots.
    pub fn units(&self) -> impl Iterator<Item = (&str, u32)> {
        self.units.iter().map(|(unit, count)| (unit.as_str(), *count))
    }

    pub fn total_units(&self) -> u64 {
        self.units.values().map(|count| *count as u64).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.total_units() == 0
    }

    /// Combat power: Σ count × strength, scaled by `modifier`.
    ///
    /// All arithmetic is checked; leaving the representable range is a
    /// fatal invariant violation, not a wrap.
    pub fn effective_power(
        &self,
        catalog: &UnitCatalog,
        modifier: Fixed,
    ) -> Result<Fixed, EngineError> {
        const WHAT: &str = "combat power";
        let mut sum: u64 = 0;
        for (unit, count) in self.units() {
            let stats = catalog
                .stats(unit)
                .ok_or_else(|| EngineError::UnknownUnit(unit.to_string()))?;
            let part = (count as u64)
                .checked_mul(stats.strength as u64)
                .ok_or(EngineError::Overflow(WHAT))?;
            sum = sum.checked_add(part).ok_or(EngineError::Overflow(WHAT))?;
        }
        if sum > (i64::MAX / Fixed::SCALE) as u64 {
            return Err(EngineError::Overflow(WHAT));
        }
        let raw = sum as i128 * modifier.raw() as i128;
        if raw > i64::MAX as i128 || raw < i64::MIN as i128 {
            return Err(EngineError::Overflow(WHAT));
        }
        Ok(Fixed::from_raw(raw as i64))
    }

    /// Loot capacity of the whole force: Σ count × carry.
    pub fn carry_capacity(&self, catalog: &UnitCatalog) -> Result<u64, EngineError> {
        const WHAT: &str = "carry capacity";
        let mut sum: u64 = 0;
        for (unit, count) in self.units() {
            let stats = catalog
                .stats(unit)
                .ok_or_else(|| EngineError::UnknownUnit(unit.to_string()))?;
            let part = (count as u64)
                .checked_mul(stats.carry as u64)
                .ok_or(EngineError::Overflow(WHAT))?;
            sum = sum.checked_add(part).ok_or(EngineError::Overflow(WHAT))?;
        }
        Ok(sum)
    }

    /// Per-unit losses at a uniform fraction, rounded down.
    ///
    /// `fraction` must lie in `[0, 1]`; the resolver clamps before
    /// calling. Rounding down means no unit count ever increases and a
    /// fraction of exactly one takes the whole force.
    pub fn proportional_losses(&self, fraction: Fixed) -> Force {
        let units = self
            .units
            .iter()
            .map(|(unit, count)| {
                let lost = (Fixed::from_int(*count as i64) * fraction).to_int() as u32;
                (unit.clone(), lost)
            })
            .collect();
        Force { units }
    }

    /// Survivors after subtracting `losses`.
    ///
    /// A loss count above the troop count is a consistency bug and fails
    /// loudly; counts never go below zero. Survivor entries are kept even
    /// at zero.
    pub fn apply_losses(&self, losses: &Force) -> Result<Force, EngineError> {
        for (unit, lost) in losses.units() {
            let had = self.count(unit);
            if lost > had {
                return Err(EngineError::LossesExceedTroops {
                    unit: unit.to_string(),
                    losses: lost,
                    troops: had,
                });
            }
        }
        let units = self
            .units
            .iter()
            .map(|(unit, count)| (unit.clone(), count - losses.count(unit)))
            .collect();
        Ok(Force { units })
    }
}
