use std::fmt;
use std::sync::Arc;
use parking_lot::RwLock;
use crate::codec::record::Data;
use crate::core::types::{FileId, ModifyType};
use crate::schema::column::Column;
use crate::search::results::SearchColumn;

pub type EntryRef = Arc<Entry>;

/// One dictionary row bound to its file.
///
/// `seek` and `raw_size` locate the row in the file's last committed byte
/// snapshot; they go stale as soon as a mutation is pending and are
/// recomputed by the next flush.
pub struct Entry {
    pub fid: FileId,
    state: RwLock<EntryState>,
}

#[derive(Debug, Clone)]
pub struct EntryState {
    pub raw: String,
    pub data: Data,
    pub seek: usize,
    pub raw_size: usize,
    pub modify: ModifyType,
    pub deleted: bool,
    /// Bumped by every mutation; a flush commits only the generation it wrote
    pub generation: u64,
}

impl Entry {
    /// Record read from disk at `[seek, seek + raw_size)`.
    pub fn loaded(raw: &str, fid: FileId, seek: usize, raw_size: usize, columns: &[Column]) -> EntryRef {
        Arc::new(Entry {
            fid,
            state: RwLock::new(EntryState {
                raw: raw.to_string(),
                data: Data::parse(raw, columns),
                seek,
                raw_size,
                modify: ModifyType::Unchanged,
                deleted: false,
                generation: 0,
            }),
        })
    }

    /// Record created by the user; it has no bytes on disk until flushed.
    pub fn added(data: Data, fid: FileId) -> EntryRef {
        Arc::new(Entry {
            fid,
            state: RwLock::new(EntryState {
                raw: data.to_line(),
                data,
                seek: 0,
                raw_size: 0,
                modify: ModifyType::Added,
                deleted: false,
                generation: 0,
            }),
        })
    }

    pub fn snapshot(&self) -> EntryState {
        self.state.read().clone()
    }

    pub fn raw(&self) -> String {
        self.state.read().raw.clone()
    }

    pub fn data(&self) -> Data {
        self.state.read().data.clone()
    }

    pub fn seek(&self) -> usize {
        self.state.read().seek
    }

    pub fn raw_size(&self) -> usize {
        self.state.read().raw_size
    }

    pub fn modify_type(&self) -> ModifyType {
        self.state.read().modify
    }

    pub fn is_deleted(&self) -> bool {
        self.state.read().deleted
    }

    /// Deleted and already removed from disk.
    pub fn is_retired(&self) -> bool {
        let state = self.state.read();
        state.deleted && state.modify == ModifyType::Unchanged
    }

    pub fn generation(&self) -> u64 {
        self.state.read().generation
    }

    /// Replace the record's line; it is re-parsed against its own columns.
    pub fn re_raw(&self, raw: impl Into<String>) {
        let mut state = self.state.write();
        let raw = raw.into();
        state.data = Data::parse(&raw, &state.data.columns);
        state.raw = raw;
        state.generation = state.generation.wrapping_add(1);
        if state.modify == ModifyType::Unchanged {
            state.modify = ModifyType::Modified;
        }
    }

    pub fn delete(&self) {
        let mut state = self.state.write();
        state.modify = ModifyType::Deleted;
        state.deleted = true;
        state.generation = state.generation.wrapping_add(1);
    }

    /// Text matched by a search on `column`.
    pub fn haystack(&self, column: SearchColumn) -> String {
        let state = self.state.read();
        match column {
            SearchColumn::Code => state.data.code.clone(),
            SearchColumn::Text => state.data.text.clone(),
            SearchColumn::Raw => state.raw.clone(),
        }
    }

    /// Mark the mutation of `generation` as written at its new location.
    ///
    /// If the record was mutated again after the flush read it, the bytes
    /// now on disk are stale: the new location is kept but the record stays
    /// pending for the next flush.
    pub(crate) fn commit(&self, seek: usize, raw_size: usize, generation: u64) {
        let mut state = self.state.write();
        state.seek = seek;
        state.raw_size = raw_size;
        state.modify = match (state.generation == generation, state.deleted, raw_size > 0) {
            (true, _, _) => ModifyType::Unchanged,
            (false, true, true) => ModifyType::Deleted,
            (false, true, false) => ModifyType::Unchanged,
            (false, false, true) => ModifyType::Modified,
            (false, false, false) => ModifyType::Added,
        };
    }

    /// Shift an untouched record to where the last flush moved its bytes.
    pub(crate) fn relocate(&self, seek: usize) {
        self.state.write().seek = seek;
    }
}

impl fmt::Debug for Entry {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let state = self.state.read();
        f.debug_struct("Entry")
            .field("fid", &self.fid)
            .field("raw", &state.raw)
            .field("seek", &state.seek)
            .field("raw_size", &state.raw_size)
            .field("modify", &state.modify)
            .field("deleted", &state.deleted)
            .finish()
    }
}

impl fmt::Display for Entry {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.state.read().raw)
    }
}
