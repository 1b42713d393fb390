//! Durable ledger: one JSON battle per line.
//!
//! Records are appended and flushed before the write is acknowledged,
//! so an acknowledged battle survives a crash. Opening replays the
//! whole file into an in-memory index; queries never touch disk.

use super::{admission_check, paginate, BattleFilter, BattleLedger, Page, QueryPage};
use crate::battle::{Battle, BattleDraft, BattleId};
use crate::directory::EntityDirectory;
use crate::error::EngineError;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};

pub struct JournalLedger {
    directory: Arc<dyn EntityDirectory>,
    inner: Mutex<JournalInner>,
}

impl std::fmt::Debug for JournalLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JournalLedger").finish_non_exhaustive()
    }
}

struct JournalInner {
    writer: Box<dyn Write + Send>,
    index: im::OrdMap<BattleId, Battle>,
    next_id: BattleId,
}

impl JournalLedger {
    /// Opens (or creates) a journal file and replays it.
    ///
    /// Any line that fails to parse aborts the open: a journal that
    /// cannot be replayed in full must not accept new writes. Replay
    /// does not re-run referential checks; records were validated
    /// against the directory when they were written.
    pub fn open(
        path: impl AsRef<Path>,
        directory: Arc<dyn EntityDirectory>,
    ) -> Result<Self, EngineError> {
        let path = path.as_ref();
        let mut index = im::OrdMap::new();
        let mut next_id: BattleId = 1;

        if path.exists() {
            let reader = BufReader::new(File::open(path)?);
            for (number, line) in reader.lines().enumerate() {
                let line = line?;
                let battle: Battle =
                    serde_json::from_str(&line).map_err(|err| EngineError::CorruptJournal {
                        line: number + 1,
                        reason: err.to_string(),
                    })?;
                next_id = next_id.max(battle.id + 1);
                index.insert(battle.id, battle);
            }
            log::info!("replayed {} battles from {}", index.len(), path.display());
        }

        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(JournalLedger {
            directory,
            inner: Mutex::new(JournalInner {
                writer: Box::new(BufWriter::new(file)),
                index,
                next_id,
            }),
        })
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, JournalInner> {
        // the index is only updated after a complete, flushed append,
        // so a poisoned guard still holds a consistent view
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl BattleLedger for JournalLedger {
    fn record(&self, draft: BattleDraft) -> Result<BattleId, EngineError> {
        admission_check(&draft, self.directory.as_ref())?;

        let mut inner = self.lock();
        let id = inner.next_id;
        let battle = Battle::from_draft(id, draft);

        serde_json::to_writer(&mut inner.writer, &battle)?;
        writeln!(inner.writer)?;
        inner.writer.flush()?;

        // indexed only once the bytes are down
        inner.index.insert(id, battle);
        inner.next_id = id + 1;
        log::trace!("journaled battle {id}");
        Ok(id)
    }

    fn battle(&self, id: BattleId) -> Result<Battle, EngineError> {
        self.lock()
            .index
            .get(&id)
            .cloned()
            .ok_or(EngineError::BattleNotFound(id))
    }

    fn query(&self, filter: &BattleFilter, page: Page) -> Result<QueryPage, EngineError> {
        let snapshot = self.lock().index.clone();
        let matched: Vec<Battle> = snapshot
            .values()
            .filter(|battle| filter.matches(battle))
            .cloned()
            .collect();
        paginate(matched, page)
    }
}
