pub mod core;
pub mod schema;
pub mod codec;
pub mod storage;
pub mod search;
pub mod writer;

pub use crate::codec::input::{parse_input, ParsedInput};
pub use crate::codec::record::Data;
pub use crate::core::config::Config;
pub use crate::core::dictionary::Dictionary;
pub use crate::core::entry::{Entry, EntryRef};
pub use crate::core::error::{Error, ErrorKind, Result};
pub use crate::core::file::{FileEntries, FileInfo};
pub use crate::core::item::ListItem;
pub use crate::core::session::{FlushStatus, ReloadHook, Session, ShellReload, WeightStep};
pub use crate::core::types::{FileId, ModifyType};
pub use crate::schema::column::Column;
pub use crate::search::cancel::CancelToken;
pub use crate::search::engine::SearchOutcome;
pub use crate::search::results::{MatchResult, MatchResultChunk, SearchColumn};
pub use crate::storage::loader::{LoadOutcome, LoadWarning};

/*
┌────────────────────────────────────────────────────────────────────────────────────────────┐
│                               DICTSTORE STRUCT ARCHITECTURE                                │
└────────────────────────────────────────────────────────────────────────────────────────────┘

┌─────────────────────────────────────── CORE LAYER ─────────────────────────────────────────┐
│                                                                                            │
│  ┌──────────────────────────────────────────────────────────────────────────────────┐      │
│  │                                struct Session                                    │      │
│  │ dict: Arc<Dictionary>              // Shared record store                        │      │
│  │ config: Config                     // Paths, search + flush tuning               │      │
│  │ syncer: Syncer                     // FlushGuard + ReloadHook                    │      │
│  │ debouncer: Debouncer               // Coalesces weight-edit flushes              │      │
│  └──────────────────────────────────────────────────────────────────────────────────┘      │
│                                                                                            │
│  ┌──────────────────────────────────────────────────────────────────────────────────┐      │
│  │                               struct Dictionary                                  │      │
│  │ files: Vec<Mutex<FileEntries>>     // One per loaded file, id order              │      │
│  │ entries: RwLock<Arc<Vec<EntryRef>>>// Flattened, copy-on-write                   │      │
│  │ engine: SearchEngine               // Chunked fuzzy search + narrowing cache     │      │
│  └──────────────────────────────────────────────────────────────────────────────────┘      │
│                                                                                            │
│  ┌────────────────────────┐  ┌──────────────────────────┐  ┌─────────────────────────┐     │
│  │ struct FileEntries     │  │ struct Entry             │  │ enum ModifyType         │     │
│  │ • path: PathBuf        │  │ • fid: FileId            │  │ • Unchanged             │     │
│  │ • id: FileId           │  │ • state: RwLock<..>      │  │ • Deleted               │     │
│  │ • columns: Vec<Column> │  │   raw, data: Data        │  │ • Modified              │     │
│  │ • raw_bs: Vec<u8>      │  │   seek, raw_size         │  │ • Added                 │     │
│  │ • entries: Vec<Entry>  │  │   modify, deleted        │  └─────────────────────────┘     │
│  └────────────────────────┘  └──────────────────────────┘                                  │
└────────────────────────────────────────────────────────────────────────────────────────────┘

┌──────────────────────────────────── LOAD / CODEC LAYER ────────────────────────────────────┐
│                                                                                            │
│  loader::load(paths, &FileIdSequence)                                                      │
│     │  rayon::scope ── spawn per file ── spawn per import (recursive)                      │
│     │  header::scan_header → header::parse_metadata (nom)                                  │
│     │  inference::infer_columns (first data line) / DEFAULT_COLUMNS + LoadWarning          │
│     └─ crossbeam channel → sort by id → drop duplicate paths → LoadOutcome                 │
│                                                                                            │
│  ┌──────────────────────────┐  ┌───────────────────────────────────────────────────┐       │
│  │ struct Data              │  │ parse_input(raw, has_stem) → ParsedInput          │       │
│  │ • text, code, stem       │  │   digits → Weight, first latin → Code,            │       │
│  │ • weight: i64 (0 unset)  │  │   other latin → Stem, rest → Text                 │       │
│  │ • columns: Vec<Column>   │  │ Data::parse(raw, columns) fixed-schema fast path  │       │
│  └──────────────────────────┘  └───────────────────────────────────────────────────┘       │
└────────────────────────────────────────────────────────────────────────────────────────────┘

┌────────────────────────────────────── SEARCH LAYER ────────────────────────────────────────┐
│                                                                                            │
│  SearchEngine::search(key, column, version, corpus, sender, cancel)                        │
│     │  SearchCache::lookup ── Exact → one cached chunk                                     │
│     │                     ├─ Prefix → candidates = cached results                          │
│     │                     └─ Miss   → candidates = corpus                                  │
│     │  par_chunks(chunk_size).map_init(FuzzyScorer) ── nucleo-matcher                      │
│     │  CancelToken::run_unless_cancelled(send MatchResultChunk { version, results })       │
│     └─ completed → SearchCache::put(key, results)                                          │
└────────────────────────────────────────────────────────────────────────────────────────────┘

┌────────────────────────────────────── WRITER LAYER ────────────────────────────────────────┐
│                                                                                            │
│  patch::build_patch(raw_bs, entries) → Patch { content, commits, changed }                 │
│     copy untouched spans │ drop Deleted │ replace Modified │ append Added                  │
│  patch::patch_file → write_all + set_len + sync_all → Patch::apply                         │
│                                                                                            │
│  ┌───────────────────┐  ┌──────────────────────┐  ┌───────────────────────────────┐        │
│  │ struct FlushGuard │  │ struct Debouncer     │  │ struct Exporter               │        │
│  │ • in_use: Atomic  │  │ • delay: Duration    │  │ • columns: Vec<Column>        │        │
│  └───────────────────┘  │ • pending: JoinHandle│  │ • writer: BufWriter<File>     │        │
│                         └──────────────────────┘  └───────────────────────────────┘        │
└────────────────────────────────────────────────────────────────────────────────────────────┘
*/
