use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use log::debug;
use crate::core::entry::EntryRef;
use crate::core::error::{Error, ErrorKind, Result};
use crate::core::types::ModifyType;

/// New content of one file plus the bookkeeping to apply once it is on disk.
#[derive(Debug, Default)]
pub struct Patch {
    pub content: Vec<u8>,
    pub commits: Vec<Commit>,
    /// Whether `content` differs from the snapshot it was built from
    pub changed: bool,
}

#[derive(Debug)]
pub enum Commit {
    /// Untouched record whose bytes moved
    Relocate { entry: EntryRef, seek: usize },
    /// Mutation of `generation` now written at `seek`; deleted records get size 0
    Written { entry: EntryRef, seek: usize, raw_size: usize, generation: u64 },
}

impl Patch {
    /// Move every touched record to its committed state.
    pub fn apply(&self) {
        for commit in &self.commits {
            match commit {
                Commit::Relocate { entry, seek } => entry.relocate(*seek),
                Commit::Written { entry, seek, raw_size, generation } => entry.commit(*seek, *raw_size, *generation),
            }
        }
    }
}

/// Rebuild a file's bytes with its pending mutations applied.
///
/// Records that have bytes on disk are visited in `seek` order and the
/// untouched spans between them are copied verbatim, so every byte nobody
/// edited survives. Deleted ranges are dropped, modified ranges replaced by
/// the new line, and added records appended at the end in list order.
pub fn build_patch(raw: &[u8], entries: &[EntryRef]) -> Result<Patch> {
    let mut patch = Patch::default();
    let mut on_disk = Vec::new();
    let mut added = Vec::new();

    for entry in entries {
        let state = entry.snapshot();
        let modify = state.modify;
        match modify {
            ModifyType::Added => added.push((entry, state)),
            ModifyType::Deleted if state.raw_size == 0 => {
                // never written: nothing to remove
                patch.commits.push(Commit::Written { entry: entry.clone(), seek: 0, raw_size: 0, generation: state.generation });
            }
            _ if state.raw_size > 0 => on_disk.push((entry, state)),
            _ => {}
        }
    }
    on_disk.sort_by_key(|(_, state)| state.seek);

    let mut out = Vec::with_capacity(raw.len());
    let mut cursor = 0;
    for (entry, state) in on_disk {
        let end = state.seek + state.raw_size;
        if state.seek < cursor || end > raw.len() {
            return Err(Error::new(
                ErrorKind::InvalidState,
                format!("record [{}] at {}..{} does not fit the file snapshot ({} bytes)", state.raw, state.seek, end, raw.len()),
            ));
        }
        out.extend_from_slice(&raw[cursor..state.seek]);
        let seek = out.len();

        match state.modify {
            ModifyType::Deleted => {
                debug!("{} {}", state.modify.label(), state.raw);
                patch.commits.push(Commit::Written { entry: entry.clone(), seek, raw_size: 0, generation: state.generation });
                patch.changed = true;
            }
            ModifyType::Modified => {
                debug!("{} {}", state.modify.label(), state.raw);
                out.extend_from_slice(state.raw.as_bytes());
                out.push(b'\n');
                patch.commits.push(Commit::Written {
                    entry: entry.clone(),
                    seek,
                    raw_size: out.len() - seek,
                    generation: state.generation,
                });
                patch.changed = true;
            }
            _ => {
                out.extend_from_slice(&raw[state.seek..end]);
                if seek != state.seek {
                    patch.commits.push(Commit::Relocate { entry: entry.clone(), seek });
                }
            }
        }
        cursor = end;
    }
    out.extend_from_slice(&raw[cursor..]);

    if !added.is_empty() {
        if out.last().is_some_and(|b| *b != b'\n') {
            out.push(b'\n');
        }
        for (entry, state) in added {
            debug!("{} {}", state.modify.label(), state.raw);
            let seek = out.len();
            out.extend_from_slice(state.raw.as_bytes());
            out.push(b'\n');
            patch.commits.push(Commit::Written {
                entry: entry.clone(),
                seek,
                raw_size: out.len() - seek,
                generation: state.generation,
            });
        }
        patch.changed = true;
    }

    patch.content = out;
    Ok(patch)
}

/// Flush one file in place. Returns whether the file changed.
///
/// The whole new content is built in memory first; the file is then
/// rewritten from the start and truncated to the new length. Records are
/// only committed once the write succeeded, and retired records leave
/// `entries`.
pub fn patch_file(path: &Path, raw_bs: &mut Vec<u8>, entries: &mut Vec<EntryRef>) -> Result<bool> {
    let patch = build_patch(raw_bs, entries)?;

    if patch.changed {
        let mut file = OpenOptions::new()
            .write(true)
            .open(path)
            .map_err(|e| Error::io_at(path, e))?;
        file.write_all(&patch.content).map_err(|e| Error::io_at(path, e))?;
        file.set_len(patch.content.len() as u64).map_err(|e| Error::io_at(path, e))?;
        file.sync_all().map_err(|e| Error::io_at(path, e))?;
    }

    patch.apply();
    if patch.changed {
        *raw_bs = patch.content;
    }
    entries.retain(|e| !e.is_retired());
    entries.sort_by_key(|e| e.seek());
    Ok(patch.changed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::record::Data;
    use crate::core::entry::Entry;
    use crate::core::types::FileId;
    use crate::schema::column::DEFAULT_COLUMNS;

    /// Load every line of `raw` as a record, like the loader does.
    fn load(raw: &str) -> Vec<EntryRef> {
        let mut seek = 0;
        raw.split_inclusive('\n')
            .map(|line| {
                let entry = Entry::loaded(line.trim(), FileId(1), seek, line.len(), &DEFAULT_COLUMNS);
                seek += line.len();
                entry
            })
            .collect()
    }

    fn added(line: &str) -> EntryRef {
        Entry::added(Data::parse(line, &DEFAULT_COLUMNS), FileId(1))
    }

    #[test]
    fn test_nothing_pending_is_unchanged() {
        let raw = "一\tyi\n二\ter\n";
        let patch = build_patch(raw.as_bytes(), &load(raw)).unwrap();
        assert!(!patch.changed);
        assert_eq!(patch.content, raw.as_bytes());
        assert!(patch.commits.is_empty());
    }

    #[test]
    fn test_delete_shifts_following_records() {
        let raw = "aaaaaaa\tx\nbb\tx\nbb\tx\ncc\tx\n";
        let entries = load(raw);
        assert_eq!((entries[1].seek(), entries[1].raw_size()), (10, 5));
        assert_eq!(entries[3].seek(), 20);

        entries[1].delete();
        let patch = build_patch(raw.as_bytes(), &entries).unwrap();
        patch.apply();
        assert_eq!(patch.content, b"aaaaaaa\tx\nbb\tx\ncc\tx\n");
        assert_eq!(entries[2].seek(), 10);
        assert_eq!(entries[3].seek(), 15);
        assert!(entries[1].is_retired());
    }

    #[test]
    fn test_modify_with_size_change() {
        let raw = "一\tyi\n二\ter\n三\tsan\n";
        let entries = load(raw);
        entries[0].re_raw("一\tyi\t100");
        entries[2].delete();
        let patch = build_patch(raw.as_bytes(), &entries).unwrap();
        patch.apply();
        let expected = "一\tyi\t100\n二\ter\n";
        assert_eq!(String::from_utf8(patch.content).unwrap(), expected);
        assert_eq!(entries[0].raw_size(), "一\tyi\t100\n".len());
        assert_eq!(entries[1].seek(), "一\tyi\t100\n".len());
        assert_eq!(entries[0].modify_type(), ModifyType::Unchanged);
    }

    #[test]
    fn test_added_records_append_in_order() {
        let raw = "一\tyi";
        let mut entries = load(raw);
        let a = added("甲\tjia");
        let b = added("乙\tyi\t3");
        entries.push(a.clone());
        entries.push(b.clone());

        let patch = build_patch(raw.as_bytes(), &entries).unwrap();
        patch.apply();
        assert_eq!(String::from_utf8(patch.content).unwrap(), "一\tyi\n甲\tjia\n乙\tyi\t3\n");
        assert_eq!(a.seek(), "一\tyi\n".len());
        assert_eq!(b.seek(), a.seek() + a.raw_size());
        assert_eq!(a.modify_type(), ModifyType::Unchanged);
    }

    #[test]
    fn test_added_then_deleted_never_reaches_disk() {
        let raw = "一\tyi\n";
        let mut entries = load(raw);
        let ghost = added("鬼\tgui");
        ghost.delete();
        entries.push(ghost.clone());
        let patch = build_patch(raw.as_bytes(), &entries).unwrap();
        assert!(!patch.changed);
        patch.apply();
        assert!(ghost.is_retired());
    }

    #[test]
    fn test_out_of_range_record_is_rejected() {
        let entries = load("一\tyi\n二\ter\n");
        entries[1].delete();
        let err = build_patch("一\tyi\n".as_bytes(), &entries).unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidState);
    }

    #[test]
    fn test_edit_during_flush_is_written_next_time() {
        let raw = "一\tyi\n你好\tnihao\t5\n";
        let entries = load(raw);
        entries[1].re_raw("你好\tnihao\t6");
        let first = build_patch(raw.as_bytes(), &entries).unwrap();
        entries[1].re_raw("你好\tnihao\t7");
        first.apply();
        assert_eq!(String::from_utf8(first.content.clone()).unwrap(), "一\tyi\n你好\tnihao\t6\n");
        assert_eq!(entries[1].modify_type(), ModifyType::Modified);

        let second = build_patch(&first.content, &entries).unwrap();
        assert!(second.changed);
        second.apply();
        assert_eq!(String::from_utf8(second.content).unwrap(), "一\tyi\n你好\tnihao\t7\n");
        assert_eq!(entries[1].modify_type(), ModifyType::Unchanged);
    }

    #[test]
    fn test_delete_during_flush_is_removed_next_time() {
        let raw = "一\tyi\n你好\tnihao\t5\n";
        let entries = load(raw);
        entries[1].re_raw("你好\tnihao\t6");
        let first = build_patch(raw.as_bytes(), &entries).unwrap();
        entries[1].delete();
        first.apply();
        assert!(!entries[1].is_retired());
        assert_eq!(entries[1].modify_type(), ModifyType::Deleted);

        let second = build_patch(&first.content, &entries).unwrap();
        second.apply();
        assert_eq!(String::from_utf8(second.content).unwrap(), "一\tyi\n");
        assert!(entries[1].is_retired());
    }

    #[test]
    fn test_added_record_edited_during_flush_is_not_appended_twice() {
        let raw = "一\tyi\n";
        let mut entries = load(raw);
        let fresh = added("甲\tjia");
        entries.push(fresh.clone());
        let first = build_patch(raw.as_bytes(), &entries).unwrap();
        fresh.re_raw("甲\tjia\t3");
        first.apply();
        assert_eq!(fresh.modify_type(), ModifyType::Modified);

        let second = build_patch(&first.content, &entries).unwrap();
        assert_eq!(String::from_utf8(second.content).unwrap(), "一\tyi\n甲\tjia\t3\n");
    }
}
