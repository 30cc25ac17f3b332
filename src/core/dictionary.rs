use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use crossbeam::channel::Sender;
use log::{error, info};
use parking_lot::{Mutex, RwLock};
use rayon::prelude::*;
use crate::core::config::Config;
use crate::core::entry::EntryRef;
use crate::core::error::{Error, ErrorKind, Result};
use crate::core::file::{FileEntries, FileInfo};
use crate::core::types::FileId;
use crate::schema::column::Column;
use crate::search::cancel::CancelToken;
use crate::search::cache::CacheStats;
use crate::search::engine::{SearchEngine, SearchOutcome};
use crate::search::results::{MatchResult, MatchResultChunk, SearchColumn};
use crate::storage::loader::{self, LoadWarning};
use crate::storage::sequence::FileIdSequence;
use crate::writer::export::Exporter;

/// The record store: every loaded file plus one flattened record list.
///
/// The flattened list is copy-on-write. A search works on the snapshot it
/// started with, so an `add` running alongside never changes which records
/// it sees; record contents themselves are shared.
pub struct Dictionary {
    files: Vec<Mutex<FileEntries>>,
    positions: HashMap<FileId, usize>,
    entries: RwLock<Arc<Vec<EntryRef>>>,
    engine: SearchEngine,
}

impl Dictionary {
    pub fn new(mut files: Vec<FileEntries>, config: &Config) -> Self {
        files.sort_by_key(|f| f.id);
        let entries: Vec<EntryRef> = files.iter()
            .flat_map(|f| f.entries.iter().cloned())
            .collect();
        let positions = files.iter().enumerate().map(|(i, f)| (f.id, i)).collect();

        Dictionary {
            files: files.into_iter().map(Mutex::new).collect(),
            positions,
            entries: RwLock::new(Arc::new(entries)),
            engine: SearchEngine::new(config.search_chunk_size, config.search_cache_capacity),
        }
    }

    /// Load `config.dict_paths` and everything they import.
    pub fn load(config: &Config) -> Result<(Self, Vec<LoadWarning>)> {
        let ids = FileIdSequence::new();
        let outcome = loader::load(&config.dict_paths, &ids)?;
        Ok((Dictionary::new(outcome.files, config), outcome.warnings))
    }

    /// Snapshot of every record, soft-deleted ones included.
    pub fn entries(&self) -> Arc<Vec<EntryRef>> {
        self.entries.read().clone()
    }

    pub fn live_entries(&self) -> Vec<EntryRef> {
        self.entries.read().iter().filter(|e| !e.is_deleted()).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn file_slot(&self, id: FileId) -> Result<&Mutex<FileEntries>> {
        self.positions
            .get(&id)
            .map(|i| &self.files[*i])
            .ok_or_else(|| Error::new(ErrorKind::NotFound, format!("no loaded file with id {}", id.value())))
    }

    pub fn files(&self) -> Vec<FileInfo> {
        self.files.iter().map(|f| f.lock().info()).collect()
    }

    pub fn file(&self, id: FileId) -> Option<FileInfo> {
        self.file_slot(id).ok().map(|f| f.lock().info())
    }

    pub fn file_columns(&self, id: FileId) -> Option<Vec<Column>> {
        self.file_slot(id).ok().map(|f| f.lock().columns.clone())
    }

    /// File loaded from `path`, if any.
    pub fn file_by_path(&self, path: &Path) -> Option<FileId> {
        self.files.iter().map(|f| f.lock()).find(|f| f.path.as_path() == path).map(|f| f.id)
    }

    /// Add a record to its file and to the flattened list.
    ///
    /// The search cache is left alone; call [`Dictionary::reset_matcher`]
    /// once a batch of mutations is done.
    pub fn add(&self, entry: EntryRef) -> Result<()> {
        let mut file = self.file_slot(entry.fid)?.lock();
        let mut entries = self.entries.write();
        file.entries.push(entry.clone());
        Arc::make_mut(&mut *entries).push(entry);
        Ok(())
    }

    /// Soft-delete; the bytes go away on the next flush.
    pub fn delete(&self, entry: &EntryRef) {
        entry.delete();
    }

    pub fn reset_matcher(&self) {
        self.engine.reset();
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.engine.cache_stats()
    }

    /// Search `column` for `key`, streaming chunks tagged with `version`.
    ///
    /// An empty key lists every live record, unscored, in one chunk.
    pub fn search(
        &self,
        key: &str,
        column: SearchColumn,
        version: u64,
        sender: &Sender<MatchResultChunk>,
        cancel: &CancelToken,
    ) -> SearchOutcome {
        let corpus = self.entries();
        if !key.is_empty() {
            return self.engine.search(key, column, version, &corpus, sender, cancel);
        }

        let results: Vec<MatchResult> = corpus.iter()
            .filter(|e| !e.is_deleted())
            .map(|e| MatchResult::new(e.clone(), 0))
            .collect();
        let count = results.len();
        match cancel.run_unless_cancelled(|| sender.send(MatchResultChunk { version, results }).is_ok()) {
            Some(true) => SearchOutcome::Completed(count),
            _ => SearchOutcome::Cancelled,
        }
    }

    /// Write every dirty file back in place, in parallel. Returns whether
    /// any file changed.
    ///
    /// A failing file does not stop the others; the first error is
    /// returned after all of them finished.
    pub fn flush(&self) -> Result<bool> {
        let start = Instant::now();
        let results: Vec<Result<bool>> = self.files
            .par_iter()
            .map(|file| {
                let mut file = file.lock();
                if !file.is_dirty() {
                    return Ok(false);
                }
                file.flush().inspect_err(|e| error!("flush of {} failed: {}", file.path.display(), e))
            })
            .collect();

        {
            let mut entries = self.entries.write();
            if entries.iter().any(|e| e.is_retired()) {
                Arc::make_mut(&mut *entries).retain(|e| !e.is_retired());
            }
        }

        let mut changed = false;
        let mut first_error = None;
        for result in results {
            match result {
                Ok(file_changed) => changed |= file_changed,
                Err(e) => {
                    first_error.get_or_insert(e);
                }
            }
        }
        info!("flush finished in {:?}, changed: {}", start.elapsed(), changed);

        match first_error {
            Some(e) => Err(e),
            None => Ok(changed),
        }
    }

    /// Export live records of every file, in file order then record order.
    pub fn export(&self, path: &Path, columns: &[Column]) -> Result<usize> {
        let mut exporter = Exporter::create(path, columns)?;
        for file in &self.files {
            exporter.write_file(&file.lock())?;
        }
        exporter.finish()
    }
}
