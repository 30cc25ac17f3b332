use std::path::PathBuf;
use serde::{Serialize, Deserialize};
use crate::schema::column::{Column, DEFAULT_COLUMNS};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Root dictionary files; their imports are discovered while loading
    pub dict_paths: Vec<PathBuf>,
    /// Preferred target for new records
    pub user_path: Option<PathBuf>,
    /// Shell command run after a flush that changed at least one file
    pub reload_command: Option<String>,
    pub sync_on_change: bool,

    // Free-text parsing
    pub has_stem: bool,

    // Search
    pub search_chunk_size: usize,
    pub search_cache_capacity: usize,

    // Writes
    pub flush_debounce_ms: u64,
    pub export_columns: Vec<Column>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            dict_paths: Vec::new(),
            user_path: None,
            reload_command: None,
            sync_on_change: true,

            has_stem: true,

            search_chunk_size: 500,                  // records per streamed chunk
            search_cache_capacity: 1024,             // distinct query strings kept

            flush_debounce_ms: 1000,                 // quiet period before a weight flush
            export_columns: DEFAULT_COLUMNS.to_vec(),
        }
    }
}
