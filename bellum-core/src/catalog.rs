//! The closed set of unit types and their balance stats.
//!
//! Forces are validated against a catalog at construction, so every unit
//! the resolver meets has stats. Catalogs are immutable after
//! construction; balance changes ship as new catalogs, not mutations.

use crate::error::EngineError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Unit type identifier, e.g. `"legionnaires"`.
pub type UnitType = String;

/// Per-unit balance stats.
///
/// `strength` is a single scalar combat rating used for both roles;
/// attack/defense asymmetry enters through engagement modifiers, not the
/// catalog. `carry` is loot capacity per surviving unit. `speed` is map
/// fields per hour for the march planner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitStats {
    pub strength: u32,
    pub carry: u32,
    pub speed: u32,
}

/// Validated, sorted unit-type → stats table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitCatalog {
    units: BTreeMap<UnitType, UnitStats>,
}

impl UnitCatalog {
    /// Validate and freeze a unit set.
    ///
    /// Rejects empty catalogs, blank unit names, and zero march speeds
    /// (a unit that cannot move can never reach a battle).
    pub fn new(units: BTreeMap<UnitType, UnitStats>) -> Result<Self, EngineError> {
        if units.is_empty() {
            return Err(EngineError::EmptyCatalog);
        }
        for (unit, stats) in &units {
            if unit.trim().is_empty() {
                return Err(EngineError::BlankUnitName);
            }
            if stats.speed == 0 {
                return Err(EngineError::ZeroSpeed(unit.clone()));
            }
        }
        Ok(UnitCatalog { units })
    }

    /// The stock Roman roster with placeholder balance stats.
    pub fn standard() -> Self {
        let mut units = BTreeMap::new();
        for (unit, strength, carry, speed) in [
            ("legionnaires", 40, 50, 6),
            ("praetorians", 55, 20, 5),
            ("imperians", 70, 50, 7),
            ("equites_legati", 10, 0, 16),
            ("equites_imperatoris", 120, 100, 14),
            ("equites_caesaris", 180, 70, 10),
            ("battering_rams", 60, 0, 4),
            ("fire_catapults", 75, 0, 3),
        ] {
            units.insert(
                unit.to_string(),
                UnitStats {
                    strength,
                    carry,
                    speed,
                },
            );
        }
        UnitCatalog { units }
    }

    pub fn stats(&self, unit: &str) -> Option<&UnitStats> {
        self.units.get(unit)
    }

    pub fn contains(&self, unit: &str) -> bool {
        self.units.contains_key(unit)
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Units in sorted order, for deterministic iteration.
    pub fn units(&self) -> impl Iterator<Item = (&str, &UnitStats)> {
        self.units.iter().map(|(unit, stats)| (unit.as_str(), stats))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_roster_closed_and_sorted() {
        let catalog = UnitCatalog::standard();
        assert_eq!(catalog.len(), 8);
        assert!(catalog.contains("legionnaires"));
        assert!(catalog.contains("praetorians"));
        assert!(!catalog.contains("phalanxes"));

        let names: Vec<&str> = catalog.units().map(|(unit, _)| unit).collect();
        let mut sorted = names.clone();
        sorted.sort_unstable();
        assert_eq!(names, sorted);
    }

    #[test]
    fn test_rejects_empty_catalog() {
        let err = UnitCatalog::new(BTreeMap::new()).unwrap_err();
        assert!(matches!(err, EngineError::EmptyCatalog));
    }

    #[test]
    fn test_rejects_blank_names_and_zero_speeds() {
        let mut units = BTreeMap::new();
        units.insert(
            "  ".to_string(),
            UnitStats {
                strength: 1,
                carry: 0,
                speed: 1,
            },
        );
        assert!(matches!(
            UnitCatalog::new(units).unwrap_err(),
            EngineError::BlankUnitName
        ));

        let mut units = BTreeMap::new();
        units.insert(
            "oxcarts".to_string(),
            UnitStats {
                strength: 0,
                carry: 200,
                speed: 0,
            },
        );
        assert!(matches!(
            UnitCatalog::new(units).unwrap_err(),
            EngineError::ZeroSpeed(unit) if unit == "oxcarts"
        ));
    }

    #[test]
    fn test_custom_catalogs_accepted() {
        let mut units = BTreeMap::new();
        units.insert(
            "militia".to_string(),
            UnitStats {
                strength: 10,
                carry: 5,
                speed: 7,
            },
        );
        let catalog = UnitCatalog::new(units).unwrap();
        assert_eq!(catalog.stats("militia").unwrap().carry, 5);
    }
}
