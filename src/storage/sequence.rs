use std::sync::atomic::{AtomicU32, Ordering};
use crate::core::types::FileId;

/// Hands out file identifiers for one load.
///
/// Ids are taken when a file's parse task is scheduled, so they follow
/// discovery order rather than completion order.
#[derive(Debug)]
pub struct FileIdSequence {
    next: AtomicU32,
}

impl FileIdSequence {
    pub fn new() -> Self {
        Self::starting_at(1)
    }

    pub fn starting_at(first: u32) -> Self {
        FileIdSequence {
            next: AtomicU32::new(first),
        }
    }

    pub fn next_id(&self) -> FileId {
        FileId(self.next.fetch_add(1, Ordering::SeqCst))
    }

    /// Id the next call to `next_id` will return.
    pub fn peek(&self) -> FileId {
        FileId(self.next.load(Ordering::SeqCst))
    }
}

impl Default for FileIdSequence {
    fn default() -> Self {
        Self::new()
    }
}
