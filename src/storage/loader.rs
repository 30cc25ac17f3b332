use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;
use crossbeam::channel::{self, Sender};
use log::{debug, info, warn};
use crate::core::entry::Entry;
use crate::core::error::{Error, Result};
use crate::core::file::FileEntries;
use crate::core::types::FileId;
use crate::schema::column::{columns_from_names, Column, DEFAULT_COLUMNS};
use crate::schema::inference::infer_columns;
use crate::storage::header::{parse_metadata, scan_header, Metadata};
use crate::storage::sequence::FileIdSequence;

pub const DICT_SUFFIX: &str = ".dict.yaml";

/// Recovered problem found while loading; shown to the user as status text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadWarning {
    /// First data line did not reveal the columns; default schema in use
    SchemaFallback { path: PathBuf, line: String },
    /// Metadata block could not be parsed and was ignored
    MalformedHeader { path: PathBuf, reason: String },
    /// Import that leads back to one of its own importers
    ImportCycle { path: PathBuf },
}

impl fmt::Display for LoadWarning {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            LoadWarning::SchemaFallback { path, line } => write!(
                f,
                "WARNING: cannot infer columns of {} from line [{}]; using default columns [text, code, weight]. \
                 If the file uses another order, search and modify will be wrong: declare `columns:` in its header",
                path.display(), line
            ),
            LoadWarning::MalformedHeader { path, reason } => {
                write!(f, "WARNING: ignoring unreadable header of {}: {}", path.display(), reason)
            }
            LoadWarning::ImportCycle { path } => write!(f, "import cycle through {}", path.display()),
        }
    }
}

#[derive(Debug, Default)]
pub struct LoadOutcome {
    /// Loaded files in id order
    pub files: Vec<FileEntries>,
    pub warnings: Vec<LoadWarning>,
}

struct Parsed {
    file: FileEntries,
    warnings: Vec<LoadWarning>,
}

enum Message {
    File(Result<Parsed>),
    Warning(LoadWarning),
}

struct LoadContext<'a> {
    ids: &'a FileIdSequence,
    tx: Sender<Message>,
}

/// Load the root dictionaries and everything they import.
///
/// Every file is parsed by its own task; imports fan out recursively. A file
/// that cannot be read fails the whole load.
pub fn load(paths: &[PathBuf], ids: &FileIdSequence) -> Result<LoadOutcome> {
    let start = Instant::now();
    let (tx, rx) = channel::unbounded();
    let ctx = LoadContext { ids, tx };

    rayon::scope(|s| {
        for path in paths {
            let id = ctx.ids.next_id();
            let ctx = &ctx;
            let path = path.clone();
            s.spawn(move |s| load_file(s, ctx, path, id, None, Vec::new()));
        }
    });
    drop(ctx);

    let mut outcome = LoadOutcome::default();
    let mut parsed = Vec::new();
    for message in rx.iter() {
        match message {
            Message::File(file) => parsed.push(file?),
            Message::Warning(warning) => outcome.warnings.push(warning),
        }
    }
    parsed.sort_by_key(|p| p.file.id);

    let mut seen: HashSet<PathBuf> = HashSet::new();
    for Parsed { file, warnings } in parsed {
        outcome.warnings.extend(warnings);
        if !seen.insert(file.path.clone()) {
            debug!("file [{}] already loaded", file.path.display());
            continue;
        }
        outcome.files.push(file);
    }

    for warning in &outcome.warnings {
        warn!("{}", warning);
    }
    info!(
        "loaded {} files, {} records in {:?}",
        outcome.files.len(),
        outcome.files.iter().map(|f| f.entries.len()).sum::<usize>(),
        start.elapsed()
    );
    Ok(outcome)
}

fn load_file<'s>(
    scope: &rayon::Scope<'s>,
    ctx: &'s LoadContext<'s>,
    path: PathBuf,
    id: FileId,
    inherited: Option<Vec<Column>>,
    ancestors: Vec<PathBuf>,
) {
    let parsed = parse_file(&path, id, inherited).map(|(parsed, imports, declared)| {
        let mut chain = ancestors;
        chain.push(path);
        for import in imports {
            if chain.contains(&import) {
                let _ = ctx.tx.send(Message::Warning(LoadWarning::ImportCycle { path: import }));
                continue;
            }
            let import_id = ctx.ids.next_id();
            let columns = declared.clone();
            let chain = chain.clone();
            scope.spawn(move |s| load_file(s, ctx, import, import_id, columns, chain));
        }
        parsed
    });
    // receiver lives until the scope has joined
    let _ = ctx.tx.send(Message::File(parsed));
}

/// Resolve `import_tables` entries to sibling `<stem>.dict.yaml` files.
pub fn import_paths(path: &Path, meta: &Metadata) -> Vec<PathBuf> {
    let dir = path.parent().unwrap_or_else(|| Path::new(""));
    meta.import_tables
        .iter()
        .map(|stem| dir.join(format!("{}{}", stem, DICT_SUFFIX)))
        .collect()
}

/// Parse one file. Returns the file, the files it imports and the columns
/// handed down to imports that declare none: its own declared columns, or
/// the ones it inherited.
fn parse_file(path: &Path, id: FileId, inherited: Option<Vec<Column>>) -> Result<(Parsed, Vec<PathBuf>, Option<Vec<Column>>)> {
    let raw_bs = fs::read(path).map_err(|e| Error::io_at(path, e))?;
    let mut warnings = Vec::new();
    let mut imports = Vec::new();
    let mut declared = None;
    let mut data_start = 0;

    if let Some(header) = scan_header(&raw_bs) {
        data_start = header.end;
        match parse_metadata(&header.text) {
            Ok(meta) => {
                let columns = columns_from_names(&meta.columns);
                if !columns.is_empty() {
                    declared = Some(columns);
                }
                imports = import_paths(path, &meta);
            }
            Err(e) => warnings.push(LoadWarning::MalformedHeader {
                path: path.to_path_buf(),
                reason: e.context,
            }),
        }
    }

    let declared = declared.or(inherited);
    let mut columns = declared.clone();
    let mut records: Vec<(usize, usize, String)> = Vec::new();
    let mut seek = data_start;
    for line in raw_bs[data_start..].split_inclusive(|b| *b == b'\n') {
        let size = line.len();
        let line_seek = seek;
        seek += size;
        if line.first() == Some(&b'#') {
            continue;
        }
        let text = String::from_utf8_lossy(line);
        let text = text.trim();
        if text.is_empty() {
            continue;
        }
        if columns.is_none() {
            let fields: Vec<&str> = text.split('\t').collect();
            if fields.len() < 2 {
                continue;
            }
            columns = Some(match infer_columns(&fields) {
                Ok(inferred) => inferred,
                Err(_) => {
                    warnings.push(LoadWarning::SchemaFallback {
                        path: path.to_path_buf(),
                        line: text.to_string(),
                    });
                    DEFAULT_COLUMNS.to_vec()
                }
            });
        }
        records.push((line_seek, size, text.to_string()));
    }

    let columns = columns.unwrap_or_else(|| DEFAULT_COLUMNS.to_vec());
    let mut file = FileEntries::new(path.to_path_buf(), id, columns, Vec::new());
    file.entries = records
        .into_iter()
        .map(|(seek, size, text)| Entry::loaded(&text, id, seek, size, &file.columns))
        .collect();
    file.raw_bs = raw_bs;

    debug!("parsed {} ({} records, columns {:?})", path.display(), file.entries.len(), file.columns);
    Ok((Parsed { file, warnings }, imports, declared))
}
