use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use dictstore::storage::loader::load;
use dictstore::storage::sequence::FileIdSequence;
use dictstore::{Config, Data, Dictionary, Entry, ErrorKind, FileEntries, ModifyType};

const CONTENT: &str = "\n---\nname: xkjd6.whatever\n...\n早早\tzzzzmod\n早早\tzzzz\n测试\tceek\n  ";

fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, content).unwrap();
    path
}

fn load_one(path: &Path) -> FileEntries {
    load(&[path.to_path_buf()], &FileIdSequence::new()).unwrap().files.remove(0)
}

fn assert_offsets(file: &FileEntries) {
    for entry in &file.entries {
        let bytes = &file.raw_bs[entry.seek()..entry.seek() + entry.raw_size()];
        assert_eq!(String::from_utf8_lossy(bytes).trim(), entry.raw());
    }
}

fn assert_on_disk(file: &FileEntries, want: &str) {
    assert_eq!(fs::read_to_string(&file.path).unwrap(), want);
    assert_eq!(String::from_utf8_lossy(&file.raw_bs), want);
    assert_offsets(file);
}

#[test]
fn test_delete_one_record() {
    let dir = TempDir::new().unwrap();
    let mut file = load_one(&write(dir.path(), "t.dict.yaml", CONTENT));
    file.entries[0].delete();

    assert!(file.flush().unwrap());
    assert_on_disk(&file, "\n---\nname: xkjd6.whatever\n...\n早早\tzzzz\n测试\tceek\n  ");
    assert_eq!(file.entries.len(), 2);
}

#[test]
fn test_delete_across_two_flushes() {
    let dir = TempDir::new().unwrap();
    let mut file = load_one(&write(dir.path(), "t.dict.yaml", CONTENT));
    let last = file.entries[2].clone();
    file.entries[0].delete();
    assert!(file.flush().unwrap());
    last.delete();
    assert!(file.flush().unwrap());

    assert_on_disk(&file, "\n---\nname: xkjd6.whatever\n...\n早早\tzzzz\n  ");
    assert!(!file.flush().unwrap());
}

#[test]
fn test_delete_and_modify_in_one_flush() {
    let dir = TempDir::new().unwrap();
    let mut file = load_one(&write(dir.path(), "t.dict.yaml", CONTENT));
    file.entries[0].delete();
    file.entries[1].re_raw("早早\tzaozao");
    file.entries[2].re_raw("测试\tceshi");

    assert!(file.flush().unwrap());
    assert_on_disk(&file, "\n---\nname: xkjd6.whatever\n...\n早早\tzaozao\n测试\tceshi\n  ");
}

#[test]
fn test_mutations_over_several_flushes() {
    let dir = TempDir::new().unwrap();
    let mut file = load_one(&write(dir.path(), "t.dict.yaml", CONTENT));
    let (first, second, third) = (file.entries[0].clone(), file.entries[1].clone(), file.entries[2].clone());

    first.delete();
    assert!(file.flush().unwrap());
    second.re_raw("早早\tzaozao");
    assert!(file.flush().unwrap());
    third.re_raw("测试\tceshi");
    assert!(file.flush().unwrap());

    assert_on_disk(&file, "\n---\nname: xkjd6.whatever\n...\n早早\tzaozao\n测试\tceshi\n  ");
    assert!(!file.flush().unwrap());
}

#[test]
fn test_deleted_record_shifts_later_offsets() {
    let dir = TempDir::new().unwrap();
    let path = write(dir.path(), "shift.dict.yaml", "一\tyi\t1\n二\ter\n三\tsan\n四\tsi\n");
    let mut file = load_one(&path);
    let (deleted, after, last) = (file.entries[1].clone(), file.entries[2].clone(), file.entries[3].clone());
    assert_eq!((deleted.seek(), deleted.raw_size()), (9, 7));
    let (after_seek, last_seek) = (after.seek(), last.seek());

    deleted.delete();
    assert!(file.flush().unwrap());
    assert_eq!(after.seek(), after_seek - 7);
    assert_eq!(last.seek(), last_seek - 7);
    assert!(deleted.is_retired());
    assert_on_disk(&file, "一\tyi\t1\n三\tsan\n四\tsi\n");
}

#[test]
fn test_added_records_append_in_submission_order() {
    let dir = TempDir::new().unwrap();
    let path = write(dir.path(), "add.dict.yaml", "一\tyi");
    let mut file = load_one(&path);
    let a = Entry::added(Data::parse("甲\tjia", &file.columns), file.id);
    let b = Entry::added(Data::parse("乙\tyi", &file.columns), file.id);
    file.entries.push(a.clone());
    file.entries.push(b.clone());

    assert!(file.flush().unwrap());
    assert_on_disk(&file, "一\tyi\n甲\tjia\n乙\tyi\n");
    assert_eq!(a.seek(), "一\tyi\n".len());
    assert_eq!(b.seek(), a.seek() + a.raw_size());
    assert_eq!(b.modify_type(), ModifyType::Unchanged);
}

#[test]
fn test_dictionary_flush_is_idempotent_and_prunes_deleted() {
    let dir = TempDir::new().unwrap();
    let a = write(dir.path(), "a.dict.yaml", "甲\tjia\n乙\tyi\n");
    let b = write(dir.path(), "b.dict.yaml", "丙\tbing\n");
    let config = Config { dict_paths: vec![a.clone(), b.clone()], ..Config::default() };
    let (dict, _) = Dictionary::load(&config).unwrap();

    assert!(!dict.flush().unwrap());
    let first = dict.entries()[0].clone();
    dict.delete(&first);
    dict.add(Entry::added(Data::parse("丁\tding", &dict.file_columns(first.fid).unwrap()), first.fid)).unwrap();

    assert!(dict.flush().unwrap());
    let once = fs::read(&a).unwrap();
    assert_eq!(String::from_utf8_lossy(&once), "乙\tyi\n丁\tding\n");
    assert_eq!(dict.len(), 3);
    assert_eq!(dict.file(first.fid).unwrap().len, 2);

    assert!(!dict.flush().unwrap());
    assert_eq!(fs::read(&a).unwrap(), once);
    assert_eq!(fs::read_to_string(&b).unwrap(), "丙\tbing\n");
}

#[test]
fn test_one_failing_file_does_not_block_others() {
    let dir = TempDir::new().unwrap();
    let a = write(dir.path(), "a.dict.yaml", "甲\tjia\n乙\tyi\n");
    let b = write(dir.path(), "b.dict.yaml", "丙\tbing\n丁\tding\n");
    let config = Config { dict_paths: vec![a.clone(), b.clone()], ..Config::default() };
    let (dict, _) = Dictionary::load(&config).unwrap();

    for entry in dict.entries().iter() {
        if entry.raw().starts_with('甲') || entry.raw().starts_with('丙') {
            dict.delete(entry);
        }
    }
    fs::remove_file(&a).unwrap();

    let err = dict.flush().unwrap_err();
    assert_eq!(err.kind, ErrorKind::Io);
    assert!(err.context.contains("a.dict.yaml"));
    assert_eq!(fs::read_to_string(&b).unwrap(), "丁\tding\n");
    // the failed file keeps its pending delete
    assert_eq!(dict.live_entries().len(), 2);
    assert_eq!(dict.len(), 3);
}
