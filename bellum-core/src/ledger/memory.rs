//! In-memory ledger, the default backend for tests and simulations.

use super::{admission_check, paginate, BattleFilter, BattleLedger, Page, QueryPage};
use crate::battle::{Battle, BattleDraft, BattleId};
use crate::directory::EntityDirectory;
use crate::error::EngineError;
use std::sync::{Arc, PoisonError, RwLock};

/// Ledger backed by a persistent ordered map.
///
/// Queries clone the map (O(1) structural sharing) and filter outside
/// the lock, so a long scan never blocks a writer.
pub struct MemoryLedger {
    directory: Arc<dyn EntityDirectory>,
    inner: RwLock<Store>,
}

struct Store {
    battles: im::OrdMap<BattleId, Battle>,
    next_id: BattleId,
}

impl MemoryLedger {
    pub fn new(directory: Arc<dyn EntityDirectory>) -> Self {
        MemoryLedger {
            directory,
            inner: RwLock::new(Store {
                battles: im::OrdMap::new(),
                next_id: 1,
            }),
        }
    }

    // The store is replaced whole under the lock, so a poisoned guard
    // still holds a consistent map.
    fn snapshot(&self) -> im::OrdMap<BattleId, Battle> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .battles
            .clone()
    }
}

impl BattleLedger for MemoryLedger {
    fn record(&self, draft: BattleDraft) -> Result<BattleId, EngineError> {
        admission_check(&draft, self.directory.as_ref())?;

        let mut store = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        let id = store.next_id;
        store.battles.insert(id, Battle::from_draft(id, draft));
        store.next_id = id + 1;
        log::trace!("recorded battle {id}");
        Ok(id)
    }

    fn battle(&self, id: BattleId) -> Result<Battle, EngineError> {
        self.snapshot()
            .get(&id)
            .cloned()
            .ok_or(EngineError::BattleNotFound(id))
    }

    fn query(&self, filter: &BattleFilter, page: Page) -> Result<QueryPage, EngineError> {
        let matched: Vec<Battle> = self
            .snapshot()
            .values()
            .filter(|battle| filter.matches(battle))
            .cloned()
            .collect();
        paginate(matched, page)
    }
}
