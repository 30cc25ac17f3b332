use std::env;
use std::path::Path;
use std::process::Command;
use std::sync::Arc;
use std::time::Duration;
use crossbeam::channel::Sender;
use log::{debug, error, info, warn};
use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use crate::codec::input::parse_input;
use crate::codec::record::Data;
use crate::core::config::Config;
use crate::core::dictionary::Dictionary;
use crate::core::entry::{Entry, EntryRef};
use crate::core::error::{Error, ErrorKind, Result};
use crate::core::item::ListItem;
use crate::core::types::FileId;
use crate::search::cancel::CancelToken;
use crate::search::engine::SearchOutcome;
use crate::search::results::{choose_search_column, MatchResultChunk};
use crate::storage::loader::LoadWarning;
use crate::writer::debounce::Debouncer;
use crate::writer::guard::FlushGuard;

/// Run after a flush that changed at least one file.
pub trait ReloadHook: Send + Sync {
    fn reload(&self) -> Result<()>;
}

/// Runs a command line through the user's shell (`$SHELL -c`, else `sh -c`).
#[derive(Debug, Clone)]
pub struct ShellReload {
    pub command: String,
}

impl ReloadHook for ShellReload {
    fn reload(&self) -> Result<()> {
        let shell = env::var("SHELL").ok().filter(|s| !s.is_empty()).unwrap_or_else(|| "sh".to_string());
        debug!("running reload command [{}] with {}", self.command, shell);
        let status = Command::new(&shell).arg("-c").arg(&self.command).status()?;
        if !status.success() {
            return Err(Error::new(
                ErrorKind::Internal,
                format!("reload command [{}] exited with {}", self.command, status),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushStatus {
    /// Another flush held the guard; nothing was done
    Dropped,
    /// Not forced and `sync_on_change` is off
    Skipped,
    Unchanged,
    /// Files were written and the reload hook ran
    Changed,
}

/// New weight for a record being re-ranked.
///
/// Lists render the best match at the bottom, so moving a record up ranks it
/// just under the record above it and moving it down just over the one below.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WeightStep {
    /// Weight of the neighbour being passed upwards
    Up(i64),
    /// Weight of the neighbour being passed downwards
    Down(i64),
    Increment,
    Decrement,
}

impl WeightStep {
    pub fn apply(&self, current: i64) -> i64 {
        let weight = match self {
            WeightStep::Up(next) => next.saturating_sub(1),
            WeightStep::Down(prev) => prev.saturating_add(1),
            WeightStep::Increment => current.saturating_add(1),
            WeightStep::Decrement => current.saturating_sub(1),
        };
        weight.max(1)
    }
}

/// Flush plus reload, shareable with background tasks.
#[derive(Clone)]
struct Syncer {
    dict: Arc<Dictionary>,
    guard: Arc<FlushGuard>,
    reload: Option<Arc<dyn ReloadHook>>,
    last_error: Arc<Mutex<Option<Error>>>,
}

impl Syncer {
    fn flush(&self) -> Result<FlushStatus> {
        let Some(_permit) = self.guard.try_acquire() else {
            warn!("flush already running, request dropped");
            return Ok(FlushStatus::Dropped);
        };
        if !self.dict.flush()? {
            return Ok(FlushStatus::Unchanged);
        }
        if let Some(hook) = &self.reload {
            hook.reload()?;
        }
        Ok(FlushStatus::Changed)
    }

    /// Flush from a background task; failures are kept for the session to pick up.
    fn flush_in_background(&self) {
        if let Err(e) = self.flush() {
            error!("background flush failed: {}", e);
            *self.last_error.lock() = Some(e);
        }
    }
}

/// One interactive editing session over a loaded dictionary.
///
/// Must be opened inside a tokio runtime: flushes run on its blocking pool
/// and weight edits are flushed through a debounce timer.
pub struct Session {
    dict: Arc<Dictionary>,
    config: Config,
    syncer: Syncer,
    debouncer: Debouncer,
    handle: Handle,
}

impl Session {
    pub fn open(config: Config) -> Result<(Self, Vec<LoadWarning>)> {
        let (dict, warnings) = Dictionary::load(&config)?;
        let session = Session::with_dictionary(Arc::new(dict), config)?;
        Ok((session, warnings))
    }

    pub fn with_dictionary(dict: Arc<Dictionary>, config: Config) -> Result<Self> {
        let handle = Handle::try_current()
            .map_err(|e| Error::new(ErrorKind::InvalidState, format!("session needs a tokio runtime: {}", e)))?;
        let reload = config.reload_command
            .clone()
            .filter(|c| !c.trim().is_empty())
            .map(|command| Arc::new(ShellReload { command }) as Arc<dyn ReloadHook>);
        let syncer = Syncer {
            dict: dict.clone(),
            guard: Arc::new(FlushGuard::new()),
            reload,
            last_error: Arc::new(Mutex::new(None)),
        };
        let debouncer = Debouncer::new(Duration::from_millis(config.flush_debounce_ms), handle.clone());
        Ok(Session { dict, config, syncer, debouncer, handle })
    }

    /// Replace the reload hook (the configured shell command by default).
    pub fn with_reload_hook(mut self, hook: Arc<dyn ReloadHook>) -> Self {
        self.syncer.reload = Some(hook);
        self
    }

    pub fn dictionary(&self) -> &Arc<Dictionary> {
        &self.dict
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// File new records go to: `user_path` when loaded, else the first file.
    pub fn default_file(&self) -> Option<FileId> {
        self.config.user_path
            .as_deref()
            .and_then(|path| self.dict.file_by_path(path))
            .or_else(|| self.dict.files().first().map(|f| f.id))
    }

    pub fn file_items(&self) -> Vec<ListItem> {
        self.dict.files().into_iter().map(ListItem::File).collect()
    }

    /// Add a record typed as free text to `file`.
    ///
    /// Input without any field is ignored. When `beside` has the same code
    /// and the input names no weight, the new record ranks just over it.
    pub async fn add_input(&self, file: FileId, raw: &str, beside: Option<&EntryRef>) -> Result<Option<EntryRef>> {
        let parsed = parse_input(raw, self.config.has_stem);
        if parsed.is_empty() {
            return Ok(None);
        }
        let columns = self.dict
            .file_columns(file)
            .ok_or_else(|| Error::new(ErrorKind::NotFound, format!("no loaded file with id {}", file.value())))?;

        let mut data = Data::from_input(&parsed);
        if let Some(beside) = beside {
            let current = beside.data();
            if data.weight == 0 && data.code == current.code {
                data.weight = current.weight + 1;
            }
        }
        data.reset_columns(&columns);
        let entry = Entry::added(data, file);
        self.dict.add(entry.clone())?;
        self.dict.reset_matcher();
        info!("added [{}]", entry);
        self.sync_after_change().await?;
        Ok(Some(entry))
    }

    /// Replace a record with free-text input, serialized in its file's schema.
    ///
    /// Input with fewer than two fields is ignored. Returns whether the
    /// record changed.
    pub async fn modify_input(&self, entry: &EntryRef, raw: &str) -> Result<bool> {
        let parsed = parse_input(raw, self.config.has_stem);
        if parsed.len() < 2 {
            return Ok(false);
        }
        let columns = self.dict
            .file_columns(entry.fid)
            .ok_or_else(|| Error::new(ErrorKind::NotFound, format!("no loaded file with id {}", entry.fid.value())))?;
        let line = Data::from_input(&parsed).to_line_with(&columns);
        info!("modify [{}] -> [{}]", entry, line);
        entry.re_raw(line);
        self.dict.reset_matcher();
        self.sync_after_change().await?;
        Ok(true)
    }

    pub async fn delete(&self, entry: &EntryRef) -> Result<()> {
        info!("delete [{}]", entry);
        self.dict.delete(entry);
        self.dict.reset_matcher();
        self.sync_after_change().await?;
        Ok(())
    }

    /// Re-rank a record. The flush waits for the edits to settle.
    pub fn adjust_weight(&self, entry: &EntryRef, step: WeightStep) -> i64 {
        let mut data = entry.data();
        data.weight = step.apply(data.weight);
        let weight = data.weight;
        entry.re_raw(data.to_line());
        self.dict.reset_matcher();

        if self.config.sync_on_change {
            let syncer = self.syncer.clone();
            self.debouncer.call(move || syncer.flush_in_background());
        }
        weight
    }

    /// Flush pending mutations and run the reload hook if files changed.
    ///
    /// Without `force`, nothing happens unless `sync_on_change` is set.
    pub async fn flush_and_sync(&self, force: bool) -> Result<FlushStatus> {
        if !force && !self.config.sync_on_change {
            return Ok(FlushStatus::Skipped);
        }
        self.debouncer.cancel();
        let syncer = self.syncer.clone();
        self.handle
            .spawn_blocking(move || syncer.flush())
            .await
            .map_err(|e| Error::new(ErrorKind::Internal, format!("flush task failed: {}", e)))?
    }

    async fn sync_after_change(&self) -> Result<()> {
        self.flush_and_sync(false).await.map(|_| ())
    }

    /// Error of the last failed debounced flush, if any.
    pub fn take_flush_error(&self) -> Option<Error> {
        self.syncer.last_error.lock().take()
    }

    /// Search what the user typed, on the calling thread.
    pub fn search(&self, input: &str, version: u64, sender: &Sender<MatchResultChunk>, cancel: &CancelToken) -> SearchOutcome {
        let (column, key) = choose_search_column(input, self.config.has_stem);
        self.dict.search(&key, column, version, sender, cancel)
    }

    /// Search on the blocking pool. Cancel the previous token before
    /// starting the next query.
    pub fn spawn_search(
        &self,
        input: &str,
        version: u64,
        sender: Sender<MatchResultChunk>,
        cancel: CancelToken,
    ) -> JoinHandle<SearchOutcome> {
        let (column, key) = choose_search_column(input, self.config.has_stem);
        let dict = self.dict.clone();
        self.handle.spawn_blocking(move || dict.search(&key, column, version, &sender, &cancel))
    }

    pub fn export(&self, path: &Path) -> Result<usize> {
        self.dict.export(path, &self.config.export_columns)
    }
}
