use std::cmp::Ordering;
use std::sync::Arc;
use crate::core::file::FileInfo;
use crate::search::results::{rank_cmp, MatchResult};

/// Anything the presentation layer shows in its one list.
#[derive(Debug, Clone)]
pub enum ListItem {
    File(FileInfo),
    Match(MatchResult),
    Text(String),
}

impl ListItem {
    pub fn display(&self) -> String {
        match self {
            ListItem::File(info) => info.path.display().to_string(),
            ListItem::Match(result) => result.entry.raw(),
            ListItem::Text(text) => text.clone(),
        }
    }

    /// Both items stand for the same file or the same record.
    pub fn same_as(&self, other: &ListItem) -> bool {
        match (self, other) {
            (ListItem::File(a), ListItem::File(b)) => a.id == b.id,
            (ListItem::Match(a), ListItem::Match(b)) => Arc::ptr_eq(&a.entry, &b.entry),
            (ListItem::Text(a), ListItem::Text(b)) => a == b,
            _ => false,
        }
    }

    /// Ordering within one list; items of different kinds are not ordered.
    pub fn compare(&self, other: &ListItem) -> Ordering {
        match (self, other) {
            (ListItem::File(a), ListItem::File(b)) => a.id.cmp(&b.id),
            (ListItem::Match(a), ListItem::Match(b)) => rank_cmp(a, b),
            (ListItem::Text(a), ListItem::Text(b)) => a.cmp(b),
            _ => Ordering::Equal,
        }
    }
}

impl From<MatchResult> for ListItem {
    fn from(result: MatchResult) -> Self {
        ListItem::Match(result)
    }
}
