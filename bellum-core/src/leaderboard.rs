//! Leaderboard projection: per-player stats derived from the ledger.
//!
//! Nothing here is stored. Rankings are folded from battle history on
//! every call, so they can never drift out of sync with the ledger.

use crate::battle::{Battle, PlayerBattleStats, PlayerId, WorldId};
use crate::config::EngineConfig;
use crate::directory::EntityDirectory;
use crate::error::EngineError;
use crate::fixed::Fixed;
use crate::ledger::{BattleFilter, BattleLedger, Page, ParticipantRole};
use rayon::prelude::*;
use rustc_hash::FxHashMap;
use std::sync::Arc;
use tracing::instrument;

/// Which players a leaderboard covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeaderboardScope {
    Global,
    World(WorldId),
}

/// Running totals for one player while folding battle pages.
#[derive(Default)]
struct Tally {
    victories: u64,
    defeats: u64,
    draws: u64,
    loot: u64,
}

impl Tally {
    fn absorb(&mut self, battle: &Battle, as_attacker: bool) {
        use crate::battle::BattleResult::*;
        match (as_attacker, battle.result) {
            (true, Victory) => {
                self.victories += 1;
                self.loot = self.loot.saturating_add(battle.loot.total());
            }
            (false, Defeat) => self.victories += 1,
            (true, Defeat) | (false, Victory) => self.defeats += 1,
            (_, Draw) => self.draws += 1,
        }
    }

    fn into_stats(self, player_id: PlayerId) -> PlayerBattleStats {
        let total = self.victories + self.defeats + self.draws;
        PlayerBattleStats {
            player_id,
            total_battles: total,
            victories: self.victories,
            defeats: self.defeats,
            draws: self.draws,
            win_rate: Fixed::from_ratio(self.victories as i64, total as i64),
            total_loot_gained: self.loot,
        }
    }
}

pub struct LeaderboardProjector {
    ledger: Arc<dyn BattleLedger>,
    directory: Arc<dyn EntityDirectory>,
    config: EngineConfig,
}

impl LeaderboardProjector {
    pub fn new(
        ledger: Arc<dyn BattleLedger>,
        directory: Arc<dyn EntityDirectory>,
        config: EngineConfig,
    ) -> Self {
        LeaderboardProjector {
            ledger,
            directory,
            config,
        }
    }

    /// Ranks players by victories, then win rate, then id.
    ///
    /// `World` scoping keeps only players the directory places on that
    /// world; the global board keeps everyone in the ledger, including
    /// players the directory no longer knows.
    #[instrument(skip_all, name = "leaderboard")]
    pub fn leaderboard(
        &self,
        scope: LeaderboardScope,
        limit: usize,
    ) -> Result<Vec<PlayerBattleStats>, EngineError> {
        let mut tallies: FxHashMap<PlayerId, Tally> = FxHashMap::default();
        self.fold_pages(&BattleFilter::default(), |battle| {
            tallies.entry(battle.attacker_id).or_default().absorb(battle, true);
            tallies.entry(battle.defender_id).or_default().absorb(battle, false);
        })?;

        let mut entries: Vec<PlayerBattleStats> = tallies
            .into_iter()
            .filter(|(player, _)| match scope {
                LeaderboardScope::Global => true,
                LeaderboardScope::World(world) => {
                    self.directory.player_world(*player) == Some(world)
                }
            })
            .map(|(player, tally)| tally.into_stats(player))
            .collect();

        entries.par_sort_unstable_by(|a, b| {
            b.victories
                .cmp(&a.victories)
                .then_with(|| b.win_rate.cmp(&a.win_rate))
                .then_with(|| a.player_id.cmp(&b.player_id))
        });
        entries.truncate(limit);

        log::debug!("projected {} leaderboard entries", entries.len());
        Ok(entries)
    }

    /// One player's record, folded from every battle they appear in.
    ///
    /// A player with no recorded battles gets the zero record; the
    /// directory is not consulted.
    pub fn player_stats(&self, player: PlayerId) -> Result<PlayerBattleStats, EngineError> {
        let filter = BattleFilter::default().with_participant(player, ParticipantRole::Either);
        let mut tally = Tally::default();
        self.fold_pages(&filter, |battle| {
            if battle.attacker_id == player {
                tally.absorb(battle, true);
            }
            if battle.defender_id == player {
                tally.absorb(battle, false);
            }
        })?;
        Ok(tally.into_stats(player))
    }

    fn fold_pages(
        &self,
        filter: &BattleFilter,
        mut fold: impl FnMut(&Battle),
    ) -> Result<(), EngineError> {
        let per_page = self.config.ledger.page_size;
        let mut number = 1;
        loop {
            let page = self.ledger.query(filter, Page::new(number, per_page))?;
            for battle in &page.battles {
                fold(battle);
            }
            if page.is_last() {
                return Ok(());
            }
            number += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::battle::{BattleDraft, BattleResult, Resources, Timestamp};
    use crate::force::Force;
    use crate::ledger::MemoryLedger;
    use crate::testing::{force, village_snapshot, DirectoryBuilder};

    fn fixture() -> (Arc<MemoryLedger>, Arc<dyn EntityDirectory>) {
        let directory: Arc<dyn EntityDirectory> = Arc::new(
            DirectoryBuilder::new()
                .player(1, 1)
                .player(2, 1)
                .player(3, 2)
                .player(4, 2)
                .village(20, village_snapshot(2, Force::empty(), Resources::ZERO))
                .build(),
        );
        let ledger = Arc::new(MemoryLedger::new(Arc::clone(&directory)));
        (ledger, directory)
    }

    fn record(
        ledger: &MemoryLedger,
        attacker: u64,
        defender: u64,
        result: BattleResult,
        loot: u64,
        occurred_at: i64,
    ) {
        ledger
            .record(BattleDraft {
                attacker_id: attacker,
                defender_id: defender,
                village_id: 20,
                attacker_troops: force(&[("legionnaires", 100)]),
                defender_troops: force(&[("praetorians", 50)]),
                attacker_losses: Force::empty(),
                defender_losses: Force::empty(),
                loot: Resources::new(loot, 0, 0, 0),
                result,
                war_id: None,
                occurred_at: Timestamp::from_secs(occurred_at),
            })
            .unwrap();
    }

    #[test]
    fn test_stats_fold_both_sides_of_record() {
        let (ledger, directory) = fixture();
        // player 1: three victories attacking, two defending a failed
        // attack, one loss each way, one draw. 5V 2D 1 draw of 8.
        record(&ledger, 1, 2, BattleResult::Victory, 100, 1);
        record(&ledger, 1, 2, BattleResult::Victory, 200, 2);
        record(&ledger, 1, 2, BattleResult::Victory, 0, 3);
        record(&ledger, 2, 1, BattleResult::Defeat, 0, 4);
        record(&ledger, 2, 1, BattleResult::Defeat, 0, 5);
        record(&ledger, 1, 2, BattleResult::Defeat, 0, 6);
        record(&ledger, 2, 1, BattleResult::Victory, 50, 7);
        record(&ledger, 1, 2, BattleResult::Draw, 0, 8);

        let projector = LeaderboardProjector::new(ledger, directory, EngineConfig::default());
        let stats = projector.player_stats(1).unwrap();

        assert_eq!(stats.total_battles, 8);
        assert_eq!(stats.victories, 5);
        assert_eq!(stats.defeats, 2);
        assert_eq!(stats.draws, 1);
        assert_eq!(stats.win_rate, Fixed::from_raw(6_250)); // 5/8
        // loot from own victorious attacks only
        assert_eq!(stats.total_loot_gained, 300);
        assert_eq!(
            stats.victories + stats.defeats + stats.draws,
            stats.total_battles
        );
    }

    #[test]
    fn test_unseen_players_get_zero_record() {
        let (ledger, directory) = fixture();
        let projector = LeaderboardProjector::new(ledger, directory, EngineConfig::default());

        let stats = projector.player_stats(42).unwrap();
        assert_eq!(stats, PlayerBattleStats::zero(42));
    }

    #[test]
    fn test_ranking_breaks_ties_by_rate_then_id() {
        let (ledger, directory) = fixture();
        // player 1: 2 victories in 2 battles (rate 1.0)
        record(&ledger, 1, 2, BattleResult::Victory, 0, 1);
        record(&ledger, 1, 2, BattleResult::Victory, 0, 2);
        // player 3: 2 victories in 3 battles (rate 2/3)
        record(&ledger, 3, 2, BattleResult::Victory, 0, 3);
        record(&ledger, 3, 2, BattleResult::Victory, 0, 4);
        record(&ledger, 3, 2, BattleResult::Draw, 0, 5);
        // player 4: 1 victory in 1 battle
        record(&ledger, 4, 2, BattleResult::Victory, 0, 6);

        let projector = LeaderboardProjector::new(ledger, directory, EngineConfig::default());
        let board = projector
            .leaderboard(LeaderboardScope::Global, 10)
            .unwrap();
        let order: Vec<u64> = board.iter().map(|s| s.player_id).collect();

        // 1 and 3 tie on victories and the better rate wins; player 2
        // lost every defense and ranks last
        assert_eq!(order, vec![1, 3, 4, 2]);

        let two = board.iter().find(|s| s.player_id == 2).unwrap();
        assert_eq!(two.victories, 0);
        assert_eq!(two.defeats, 5);
        assert_eq!(two.draws, 1);
    }

    #[test]
    fn test_equal_records_order_by_player_id() {
        let (ledger, directory) = fixture();
        record(&ledger, 3, 2, BattleResult::Victory, 0, 1);
        record(&ledger, 1, 2, BattleResult::Victory, 0, 2);

        let projector = LeaderboardProjector::new(ledger, directory, EngineConfig::default());
        let board = projector
            .leaderboard(LeaderboardScope::Global, 10)
            .unwrap();

        // identical 1-victory records: the smaller id ranks first
        assert_eq!(board[0].player_id, 1);
        assert_eq!(board[1].player_id, 3);
    }

    #[test]
    fn test_world_scope_drops_other_worlds() {
        let (ledger, directory) = fixture();
        record(&ledger, 1, 2, BattleResult::Victory, 0, 1); // world 1 pair
        record(&ledger, 3, 2, BattleResult::Victory, 0, 2); // 3 is world 2

        let projector = LeaderboardProjector::new(ledger, directory, EngineConfig::default());

        let world_one = projector
            .leaderboard(LeaderboardScope::World(1), 10)
            .unwrap();
        let ids: Vec<u64> = world_one.iter().map(|s| s.player_id).collect();
        assert_eq!(ids, vec![1, 2]);

        let world_two = projector
            .leaderboard(LeaderboardScope::World(2), 10)
            .unwrap();
        let ids: Vec<u64> = world_two.iter().map(|s| s.player_id).collect();
        assert_eq!(ids, vec![3]);
    }

    #[test]
    fn test_limit_cuts_board() {
        let (ledger, directory) = fixture();
        record(&ledger, 1, 2, BattleResult::Victory, 0, 1);
        record(&ledger, 3, 4, BattleResult::Victory, 0, 2);

        let projector = LeaderboardProjector::new(ledger, directory, EngineConfig::default());
        let board = projector.leaderboard(LeaderboardScope::Global, 1).unwrap();
        assert_eq!(board.len(), 1);
        assert_eq!(board[0].player_id, 1);
    }

    #[test]
    fn test_folds_span_page_boundaries() {
        let (ledger, directory) = fixture();
        for at in 1..=9 {
            record(&ledger, 1, 2, BattleResult::Victory, 10, at);
        }

        let mut config = EngineConfig::default();
        config.ledger.page_size = 2; // nine battles across five pages
        let projector = LeaderboardProjector::new(ledger, directory, config);

        let stats = projector.player_stats(1).unwrap();
        assert_eq!(stats.victories, 9);
        assert_eq!(stats.total_loot_gained, 90);

        let board = projector
            .leaderboard(LeaderboardScope::Global, 10)
            .unwrap();
        assert_eq!(board[0].victories, 9);
    }

    #[test]
    fn test_empty_ledger_projects_empty_board() {
        let (ledger, directory) = fixture();
        let projector = LeaderboardProjector::new(ledger, directory, EngineConfig::default());
        let board = projector
            .leaderboard(LeaderboardScope::Global, 10)
            .unwrap();
        assert!(board.is_empty());
    }
}
