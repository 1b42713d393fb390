//! Error taxonomy for the battle engine.
//!
//! Every fallible operation returns `EngineError`. The HTTP layer maps
//! `ErrorKind` to status codes; the engine itself never panics on bad
//! input and never silently corrects an invariant violation.

use crate::battle::{BattleId, PlayerId, VillageId, WarId};
use crate::fixed::Fixed;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("unknown unit type '{0}'")]
    UnknownUnit(String),

    #[error("negative count {count} for unit type '{unit}'")]
    NegativeCount { unit: String, count: i64 },

    #[error("count {count} for unit type '{unit}' exceeds the unit limit")]
    CountTooLarge { unit: String, count: i64 },

    #[error("unit catalog is empty")]
    EmptyCatalog,

    #[error("blank unit type name in catalog")]
    BlankUnitName,

    #[error("unit type '{0}' has zero march speed")]
    ZeroSpeed(String),

    #[error("defense bonus {0} is below 1.0")]
    DefenseBonusBelowOne(Fixed),

    #[error("terrain modifier {0} must be positive")]
    NonPositiveTerrain(Fixed),

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("cannot march an empty force")]
    EmptyMarch,

    #[error("page numbers are 1-based and per_page must be positive")]
    InvalidPage,

    #[error("player {0} cannot attack their own village")]
    SelfAttack(PlayerId),

    #[error("player {0} not found")]
    PlayerNotFound(PlayerId),

    #[error("village {0} not found")]
    VillageNotFound(VillageId),

    #[error("war {0} not found")]
    WarNotFound(WarId),

    #[error("battle {0} not found")]
    BattleNotFound(BattleId),

    /// A loss snapshot claims more casualties than the force had.
    #[error("losses exceed troops for unit type '{unit}': {losses} > {troops}")]
    LossesExceedTroops {
        unit: String,
        losses: u32,
        troops: u32,
    },

    #[error("loot recorded on a non-victory result")]
    LootWithoutVictory,

    /// Power/carry sums left the representable range. A bug, not a
    /// recoverable condition.
    #[error("arithmetic overflow computing {0}")]
    Overflow(&'static str),

    /// Optimistic-concurrency backends report this on contended writes.
    #[error("ledger write conflict")]
    WriteConflict,

    #[error("journal io: {0}")]
    Io(#[from] std::io::Error),

    #[error("journal serialization: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("corrupt journal line {line}: {reason}")]
    CorruptJournal { line: usize, reason: String },
}

/// Coarse classification the API boundary maps to status codes
/// (422 validation, 404 not found, 409 conflict, 500 invariant/storage).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    NotFound,
    Invariant,
    Conflict,
    Storage,
}

impl EngineError {
    pub fn kind(&self) -> ErrorKind {
        use EngineError::*;
        match self {
            UnknownUnit(_)
            | NegativeCount { .. }
            | CountTooLarge { .. }
            | EmptyCatalog
            | BlankUnitName
            | ZeroSpeed(_)
            | DefenseBonusBelowOne(_)
            | NonPositiveTerrain(_)
            | InvalidConfig(_)
            | EmptyMarch
            | InvalidPage
            | SelfAttack(_) => ErrorKind::Validation,
            PlayerNotFound(_) | VillageNotFound(_) | WarNotFound(_) | BattleNotFound(_) => {
                ErrorKind::NotFound
            }
            LossesExceedTroops { .. } | LootWithoutVictory | Overflow(_) => ErrorKind::Invariant,
            WriteConflict => ErrorKind::Conflict,
            Io(_) | Serialize(_) | CorruptJournal { .. } => ErrorKind::Storage,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds_partition_taxonomy() {
        assert_eq!(
            EngineError::UnknownUnit("phalanx".into()).kind(),
            ErrorKind::Validation
        );
        assert_eq!(EngineError::PlayerNotFound(7).kind(), ErrorKind::NotFound);
        assert_eq!(
            EngineError::LossesExceedTroops {
                unit: "legionnaires".into(),
                losses: 5,
                troops: 3,
            }
            .kind(),
            ErrorKind::Invariant
        );
        assert_eq!(EngineError::WriteConflict.kind(), ErrorKind::Conflict);
        assert_eq!(
            EngineError::CorruptJournal {
                line: 3,
                reason: "truncated".into(),
            }
            .kind(),
            ErrorKind::Storage
        );
    }

    #[test]
    fn test_messages_name_offender() {
        let err = EngineError::NegativeCount {
            unit: "praetorians".into(),
            count: -3,
        };
        assert_eq!(
            err.to_string(),
            "negative count -3 for unit type 'praetorians'"
        );
        assert_eq!(
            EngineError::VillageNotFound(42).to_string(),
            "village 42 not found"
        );
    }
}
