use std::fmt;
use serde::{Serialize, Deserialize};

/// Kind of one tab-separated field in a dictionary line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Column {
    Text,
    Code,
    Weight,
    Stem,
}

/// Schema used when a file neither declares nor reveals its columns.
pub const DEFAULT_COLUMNS: [Column; 3] = [Column::Text, Column::Code, Column::Weight];

impl Column {
    pub fn from_name(name: &str) -> Option<Column> {
        match name.trim() {
            "text" => Some(Column::Text),
            "code" => Some(Column::Code),
            "weight" => Some(Column::Weight),
            "stem" => Some(Column::Stem),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Column::Text => "text",
            Column::Code => "code",
            Column::Weight => "weight",
            Column::Stem => "stem",
        }
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Map declared column names to kinds, dropping names we do not know.
pub fn columns_from_names<S: AsRef<str>>(names: &[S]) -> Vec<Column> {
    names.iter()
        .filter_map(|name| Column::from_name(name.as_ref()))
        .collect()
}
