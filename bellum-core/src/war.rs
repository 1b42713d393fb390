//! War aggregation: folding a war's recorded battles into a score.
//!
//! The aggregator never stores anything. Every summary is recomputed
//! from the ledger, page by page, in `occurred_at` order, so a war
//! score can always be audited against the battles behind it.

use crate::battle::{AllianceId, Battle, BattleResult, Timestamp, WarId};
use crate::config::EngineConfig;
use crate::directory::EntityDirectory;
use crate::error::EngineError;
use crate::ledger::{BattleFilter, BattleLedger, Page};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::instrument;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WarStatus {
    Active,
    Concluded,
}

/// A declared war between two alliances.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct War {
    pub id: WarId,
    pub aggressor: AllianceId,
    pub defender: AllianceId,
    pub status: WarStatus,
    pub start_date: Timestamp,
    pub end_date: Option<Timestamp>,
}

/// Outcome of folding one war's battles.
///
/// `score` is positive when the aggressor side is ahead, negative when
/// the defending side is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WarSummary {
    pub war_id: WarId,
    pub battles: u64,
    pub attacker_victories: u64,
    pub defender_victories: u64,
    pub draws: u64,
    pub score: i64,
}

/// Recomputes war scores from the ledger on demand.
pub struct WarAggregator {
    ledger: Arc<dyn BattleLedger>,
    directory: Arc<dyn EntityDirectory>,
    config: EngineConfig,
}

impl WarAggregator {
    pub fn new(
        ledger: Arc<dyn BattleLedger>,
        directory: Arc<dyn EntityDirectory>,
        config: EngineConfig,
    ) -> Self {
        WarAggregator {
            ledger,
            directory,
            config,
        }
    }

    /// Folds every battle recorded against `war_id` into a summary.
    ///
    /// Battles are consumed in `occurred_at` order regardless of the
    /// order they were recorded in. Draws count toward `battles` but
    /// never move the score.
    #[instrument(skip_all, name = "war_summary")]
    pub fn war_summary(&self, war_id: WarId) -> Result<WarSummary, EngineError> {
        let mut summary = WarSummary {
            war_id,
            battles: 0,
            attacker_victories: 0,
            defender_victories: 0,
            draws: 0,
            score: 0,
        };

        for battle in self.war_battles(war_id)? {
            let battle = battle?;
            summary.battles += 1;
            match battle.result {
                BattleResult::Victory => summary.attacker_victories += 1,
                BattleResult::Defeat => summary.defender_victories += 1,
                BattleResult::Draw => summary.draws += 1,
            }
        }

        let weights = &self.config.war_score;
        let gained = (summary.attacker_victories as i64).saturating_mul(weights.victory_weight);
        let lost = (summary.defender_victories as i64).saturating_mul(weights.defeat_weight);
        summary.score = gained.saturating_sub(lost);

        log::debug!(
            "war {}: {} battles, {}V/{}D/{} draws, score {}",
            war_id,
            summary.battles,
            summary.attacker_victories,
            summary.defender_victories,
            summary.draws,
            summary.score
        );
        Ok(summary)
    }

    /// Just the folded score. See [`WarAggregator::war_summary`].
    pub fn war_score(&self, war_id: WarId) -> Result<i64, EngineError> {
        Ok(self.war_summary(war_id)?.score)
    }

    /// Lazy iterator over a war's battles in `occurred_at` order.
    ///
    /// Pages are fetched from the ledger as the iterator advances, so
    /// long wars never load into memory at once.
    pub fn war_battles(&self, war_id: WarId) -> Result<WarBattles, EngineError> {
        self.ensure_war(war_id)?;
        Ok(WarBattles {
            ledger: Arc::clone(&self.ledger),
            war_id,
            page_size: self.config.ledger.page_size,
            retry_budget: self.config.ledger.conflict_retries,
            buffer: VecDeque::new(),
            next_page: 1,
            done: false,
        })
    }

    fn ensure_war(&self, war_id: WarId) -> Result<War, EngineError> {
        self.directory
            .war(war_id)
            .ok_or(EngineError::WarNotFound(war_id))
    }
}

/// Paged cursor over one war's battles.
///
/// Each exhausted buffer triggers one ledger query. A query that fails
/// with a write conflict is retried up to the configured budget; once
/// the budget runs out the error is yielded and the cursor stops.
pub struct WarBattles {
    ledger: Arc<dyn BattleLedger>,
    war_id: WarId,
    page_size: u32,
    retry_budget: u32,
    buffer: VecDeque<Battle>,
    next_page: u32,
    done: bool,
}

impl WarBattles {
    fn fetch_next_page(&mut self) -> Result<(), EngineError> {
        let filter = BattleFilter::default().with_war(self.war_id);
        let mut attempts = 0;
        loop {
            match self
                .ledger
                .query(&filter, Page::new(self.next_page, self.page_size))
            {
                Ok(page) => {
                    if page.is_last() {
                        self.done = true;
                    }
                    self.next_page += 1;
                    self.buffer.extend(page.battles);
                    return Ok(());
                }
                Err(EngineError::WriteConflict) if attempts < self.retry_budget => {
                    attempts += 1;
                    log::warn!(
                        "war {} page {} hit a write conflict, retry {}/{}",
                        self.war_id,
                        self.next_page,
                        attempts,
                        self.retry_budget
                    );
                }
                Err(err) => return Err(err),
            }
        }
    }
}

impl Iterator for WarBattles {
    type Item = Result<Battle, EngineError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(battle) = self.buffer.pop_front() {
                return Some(Ok(battle));
            }
            if self.done {
                return None;
            }
            if let Err(err) = self.fetch_next_page() {
                self.done = true;
                return Some(Err(err));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::battle::{BattleDraft, Resources};
    use crate::force::Force;
    use crate::ledger::MemoryLedger;
    use crate::testing::{force, ConflictLedger, DirectoryBuilder};

    fn draft(result: BattleResult, war_id: WarId, occurred_at: i64) -> BattleDraft {
        let troops = force(&[("legionnaires", 100)]);
        BattleDraft {
            attacker_id: 1,
            defender_id: 2,
            village_id: 20,
            attacker_troops: troops.clone(),
            defender_troops: troops.clone(),
            attacker_losses: Force::empty(),
            defender_losses: Force::empty(),
            loot: Resources::ZERO,
            result,
            war_id: Some(war_id),
            occurred_at: Timestamp::from_secs(occurred_at),
        }
    }

    fn fixture() -> (Arc<MemoryLedger>, Arc<dyn EntityDirectory>) {
        let directory: Arc<dyn EntityDirectory> = Arc::new(
            DirectoryBuilder::new()
                .player(1, 1)
                .player(2, 1)
                .village(20, crate::testing::village_snapshot(2, Force::empty(), Resources::ZERO))
                .war(7, 100, 200, Timestamp::from_secs(0))
                .build(),
        );
        let ledger = Arc::new(MemoryLedger::new(Arc::clone(&directory)));
        (ledger, directory)
    }

    #[test]
    fn test_score_follows_recorded_outcomes() {
        let (ledger, directory) = fixture();
        // two attacker victories and one defender victory, recorded
        // out of chronological order
        ledger.record(draft(BattleResult::Victory, 7, 300)).unwrap();
        ledger.record(draft(BattleResult::Defeat, 7, 100)).unwrap();
        ledger.record(draft(BattleResult::Victory, 7, 200)).unwrap();

        let aggregator = WarAggregator::new(ledger, directory, EngineConfig::default());
        let summary = aggregator.war_summary(7).unwrap();

        assert_eq!(summary.battles, 3);
        assert_eq!(summary.attacker_victories, 2);
        assert_eq!(summary.defender_victories, 1);
        assert_eq!(summary.draws, 0);
        assert_eq!(summary.score, 5); // 2 * 5 - 1 * 5
    }

    #[test]
    fn test_battles_arrive_in_occurrence_order() {
        let (ledger, directory) = fixture();
        for at in [300, 100, 500, 200, 400] {
            ledger.record(draft(BattleResult::Draw, 7, at)).unwrap();
        }

        let mut config = EngineConfig::default();
        config.ledger.page_size = 2; // force several pages
        let aggregator = WarAggregator::new(ledger, directory, config);

        let seen: Vec<i64> = aggregator
            .war_battles(7)
            .unwrap()
            .map(|battle| battle.unwrap().occurred_at.as_secs())
            .collect();
        assert_eq!(seen, vec![100, 200, 300, 400, 500]);

        // the cursor is restartable
        let again: Vec<i64> = aggregator
            .war_battles(7)
            .unwrap()
            .map(|battle| battle.unwrap().occurred_at.as_secs())
            .collect();
        assert_eq!(again, seen);
    }

    #[test]
    fn test_draws_leave_score_untouched() {
        let (ledger, directory) = fixture();
        ledger.record(draft(BattleResult::Victory, 7, 100)).unwrap();
        ledger.record(draft(BattleResult::Draw, 7, 200)).unwrap();
        ledger.record(draft(BattleResult::Draw, 7, 300)).unwrap();

        let aggregator = WarAggregator::new(ledger, directory, EngineConfig::default());
        let summary = aggregator.war_summary(7).unwrap();

        assert_eq!(summary.battles, 3);
        assert_eq!(summary.draws, 2);
        assert_eq!(summary.score, 5);
    }

    #[test]
    fn test_weights_are_configuration() {
        let (ledger, directory) = fixture();
        ledger.record(draft(BattleResult::Victory, 7, 100)).unwrap();
        ledger.record(draft(BattleResult::Victory, 7, 200)).unwrap();
        ledger.record(draft(BattleResult::Defeat, 7, 300)).unwrap();

        let mut config = EngineConfig::default();
        config.war_score.victory_weight = 10;
        config.war_score.defeat_weight = 3;
        let aggregator = WarAggregator::new(ledger, directory, config);

        assert_eq!(aggregator.war_score(7).unwrap(), 17); // 2 * 10 - 1 * 3
    }

    #[test]
    fn test_transient_conflicts_are_retried() {
        let (ledger, directory) = fixture();
        ledger.record(draft(BattleResult::Victory, 7, 100)).unwrap();
        ledger.record(draft(BattleResult::Defeat, 7, 200)).unwrap();

        // two conflicts fit inside the default budget of three retries
        let flaky = Arc::new(ConflictLedger::failing(ledger, 2));
        let aggregator = WarAggregator::new(flaky, directory, EngineConfig::default());

        let summary = aggregator.war_summary(7).unwrap();
        assert_eq!(summary.battles, 2);
        assert_eq!(summary.score, 0);
    }

    #[test]
    fn test_exhausted_retry_budget_surfaces_conflict() {
        let (ledger, directory) = fixture();
        ledger.record(draft(BattleResult::Victory, 7, 100)).unwrap();

        let flaky = Arc::new(ConflictLedger::failing(ledger, 10));
        let aggregator = WarAggregator::new(flaky, directory, EngineConfig::default());

        let err = aggregator.war_summary(7).unwrap_err();
        assert!(matches!(err, EngineError::WriteConflict));
    }

    #[test]
    fn test_unknown_wars_are_refused() {
        let (ledger, directory) = fixture();
        let aggregator = WarAggregator::new(ledger, directory, EngineConfig::default());

        let err = aggregator.war_summary(999).unwrap_err();
        assert!(matches!(err, EngineError::WarNotFound(999)));
    }

    #[test]
    fn test_empty_wars_fold_to_zero() {
        let (ledger, directory) = fixture();
        let aggregator = WarAggregator::new(ledger, directory, EngineConfig::default());

        let summary = aggregator.war_summary(7).unwrap();
        assert_eq!(summary.battles, 0);
        assert_eq!(summary.score, 0);
    }
}
