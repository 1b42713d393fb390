//! Battle storage.
//!
//! The ledger is the only shared mutable state in the engine and it is
//! append-only: a battle that has been accepted is never updated or
//! deleted. Everything else (war scores, leaderboards, player stats)
//! is recomputed from it.
//!
//! # Design Principles
//!
//! - **Validate at the door**: a draft is checked for internal
//!   consistency and referential integrity before it gets an id.
//!   Nothing downstream re-validates.
//! - **Reads never block writes**: backends keep their index in a
//!   persistent ordered map, so a query works on an O(1) clone taken
//!   under the lock and released immediately.
//! - **One ordering**: every query result is sorted by `occurred_at`,
//!   then id, so pagination is stable across backends.

mod journal;
mod memory;

pub use journal::JournalLedger;
pub use memory::MemoryLedger;

use crate::battle::{Battle, BattleDraft, BattleId, BattleResult, PlayerId, Timestamp, WarId};
use crate::directory::EntityDirectory;
use crate::error::EngineError;
use serde::{Deserialize, Serialize};

/// Which side of a battle a participant filter matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParticipantRole {
    Attacker,
    Defender,
    Either,
}

/// Conjunctive battle query. Unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BattleFilter {
    pub participant: Option<(PlayerId, ParticipantRole)>,
    pub war_id: Option<WarId>,
    pub result: Option<BattleResult>,
    pub occurred_from: Option<Timestamp>,
    pub occurred_to: Option<Timestamp>,
}

impl BattleFilter {
    pub fn with_participant(mut self, player: PlayerId, role: ParticipantRole) -> Self {
        self.participant = Some((player, role));
        self
    }

    pub fn with_war(mut self, war: WarId) -> Self {
        self.war_id = Some(war);
        self
    }

    pub fn with_result(mut self, result: BattleResult) -> Self {
        self.result = Some(result);
        self
    }

    pub fn from_date(mut self, from: Timestamp) -> Self {
        self.occurred_from = Some(from);
        self
    }

    pub fn to_date(mut self, to: Timestamp) -> Self {
        self.occurred_to = Some(to);
        self
    }

    /// Date bounds are inclusive on both ends.
    pub fn matches(&self, battle: &Battle) -> bool {
        if let Some((player, role)) = self.participant {
            let hit = match role {
                ParticipantRole::Attacker => battle.attacker_id == player,
                ParticipantRole::Defender => battle.defender_id == player,
                ParticipantRole::Either => battle.involves(player),
            };
            if !hit {
                return false;
            }
        }
        if let Some(war_id) = self.war_id {
            if battle.war_id != Some(war_id) {
                return false;
            }
        }
        if let Some(result) = self.result {
            if battle.result != result {
                return false;
            }
        }
        if let Some(from) = self.occurred_from {
            if battle.occurred_at < from {
                return false;
            }
        }
        if let Some(to) = self.occurred_to {
            if battle.occurred_at > to {
                return false;
            }
        }
        true
    }
}

/// 1-based page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub number: u32,
    pub per_page: u32,
}

impl Page {
    pub fn new(number: u32, per_page: u32) -> Self {
        Page { number, per_page }
    }

    pub fn first(per_page: u32) -> Self {
        Page::new(1, per_page)
    }
}

/// One page of results plus the metadata callers expose as `meta`.
#[derive(Debug, Clone, Serialize)]
pub struct QueryPage {
    pub battles: Vec<Battle>,
    pub current_page: u32,
    pub per_page: u32,
    pub total: u64,
    pub last_page: u32,
}

impl QueryPage {
    pub fn is_last(&self) -> bool {
        self.current_page >= self.last_page
    }
}

/// Append-only battle storage.
///
/// `record` is the only mutation. Implementations must make the insert
/// atomic, assign ids monotonically from 1, and never hand out a
/// battle that differs from what was recorded.
pub trait BattleLedger: Send + Sync {
    /// Validates and stores a draft, returning the assigned id.
    fn record(&self, draft: BattleDraft) -> Result<BattleId, EngineError>;

    /// Fetches one battle by id.
    fn battle(&self, id: BattleId) -> Result<Battle, EngineError>;

    /// Runs a filtered query, ordered by `occurred_at` then id.
    fn query(&self, filter: &BattleFilter, page: Page) -> Result<QueryPage, EngineError>;
}

/// Write-side gate shared by every backend: drafts must be internally
/// consistent and reference entities that exist at the moment of the
/// write. History is never re-checked against the directory.
pub(crate) fn admission_check(
    draft: &BattleDraft,
    directory: &dyn EntityDirectory,
) -> Result<(), EngineError> {
    if let Err(err) = draft.check_invariants() {
        log::error!("rejecting corrupt battle draft: {err}");
        return Err(err);
    }
    if !directory.player_exists(draft.attacker_id) {
        return Err(EngineError::PlayerNotFound(draft.attacker_id));
    }
    if !directory.player_exists(draft.defender_id) {
        return Err(EngineError::PlayerNotFound(draft.defender_id));
    }
    if directory.village(draft.village_id).is_none() {
        return Err(EngineError::VillageNotFound(draft.village_id));
    }
    if let Some(war_id) = draft.war_id {
        if directory.war(war_id).is_none() {
            return Err(EngineError::WarNotFound(war_id));
        }
    }
    Ok(())
}

/// Sorts matched battles and cuts the requested page.
pub(crate) fn paginate(mut battles: Vec<Battle>, page: Page) -> Result<QueryPage, EngineError> {
    if page.number == 0 || page.per_page == 0 {
        return Err(EngineError::InvalidPage);
    }
    battles.sort_unstable_by_key(|battle| (battle.occurred_at, battle.id));

    let total = battles.len() as u64;
    let per = page.per_page as u64;
    let last_page = ((total + per - 1) / per).max(1).min(u32::MAX as u64) as u32;

    let start = (page.number as u64 - 1).saturating_mul(per);
    let battles: Vec<Battle> = battles
        .into_iter()
        .skip(start.min(total) as usize)
        .take(page.per_page as usize)
        .collect();

    Ok(QueryPage {
        battles,
        current_page: page.number,
        per_page: page.per_page,
        total,
        last_page,
    })
}
