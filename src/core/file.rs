use std::path::PathBuf;
use crate::core::entry::EntryRef;
use crate::core::error::Result;
use crate::core::types::{FileId, ModifyType};
use crate::schema::column::Column;
use crate::writer::patch;

/// One loaded dictionary file: its schema, its committed bytes and its rows.
#[derive(Debug)]
pub struct FileEntries {
    pub path: PathBuf,
    pub id: FileId,
    pub columns: Vec<Column>,
    pub raw_bs: Vec<u8>,
    pub entries: Vec<EntryRef>,
}

/// Presentation-facing summary of a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileInfo {
    pub id: FileId,
    pub path: PathBuf,
    pub columns: Vec<Column>,
    pub len: usize,
}

impl FileEntries {
    pub fn new(path: PathBuf, id: FileId, columns: Vec<Column>, raw_bs: Vec<u8>) -> Self {
        FileEntries {
            path,
            id,
            columns,
            raw_bs,
            entries: Vec::new(),
        }
    }

    /// Any record waiting to be written.
    pub fn is_dirty(&self) -> bool {
        self.entries.iter().any(|e| e.modify_type() != ModifyType::Unchanged)
    }

    pub fn info(&self) -> FileInfo {
        FileInfo {
            id: self.id,
            path: self.path.clone(),
            columns: self.columns.clone(),
            len: self.entries.len(),
        }
    }

    /// Write pending mutations back into the file. Returns whether the file changed.
    pub fn flush(&mut self) -> Result<bool> {
        patch::patch_file(&self.path, &mut self.raw_bs, &mut self.entries)
    }
}
