use std::cmp::Ordering;
use crate::codec::input::parse_input;
use crate::core::entry::EntryRef;
use crate::schema::column::Column;

/// Projection of a record a query is matched against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SearchColumn {
    Code,
    Text,
    /// The whole serialized line
    Raw,
}

/// Record with relevance score
#[derive(Debug, Clone)]
pub struct MatchResult {
    pub entry: EntryRef,
    pub score: u32,
}

/// Batch of results streamed to the caller, tagged with the search it belongs to.
#[derive(Debug, Clone)]
pub struct MatchResultChunk {
    pub version: u64,
    pub results: Vec<MatchResult>,
}

impl MatchResult {
    pub fn new(entry: EntryRef, score: u32) -> Self {
        MatchResult { entry, score }
    }
}

/// Presentation order of two results.
pub fn rank_cmp(a: &MatchResult, b: &MatchResult) -> Ordering {
    let (da, db) = (a.entry.data(), b.entry.data());
    b.score
        .cmp(&a.score)
        .then(db.weight.cmp(&da.weight))
        .then(da.code.len().cmp(&db.code.len()))
}

/// Presentation order: score desc, then weight desc, then shorter code first.
pub fn sort_results(results: &mut [MatchResult]) {
    results.sort_by(rank_cmp);
}

/// Decide what a typed query searches for.
///
/// A query with a code token searches codes; a lone ascii token is taken as
/// a code too. Anything else searches the text column.
pub fn choose_search_column(input: &str, has_stem: bool) -> (SearchColumn, String) {
    let parsed = parse_input(input, has_stem);
    if parsed.is_empty() {
        return (SearchColumn::Code, String::new());
    }
    if let Some(code) = parsed.value_of(Column::Code) {
        return (SearchColumn::Code, code.to_string());
    }
    if parsed.len() == 1 && parsed.values[0].is_ascii() {
        return (SearchColumn::Code, parsed.values[0].clone());
    }
    match parsed.value_of(Column::Text) {
        Some(text) => (SearchColumn::Text, text.to_string()),
        None => (SearchColumn::Raw, input.trim().to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::entry::Entry;
    use crate::core::types::FileId;
    use crate::schema::column::DEFAULT_COLUMNS;

    fn result(raw: &str, score: u32) -> MatchResult {
        MatchResult::new(Entry::loaded(raw, FileId(1), 0, raw.len(), &DEFAULT_COLUMNS), score)
    }

    #[test]
    fn test_sort_results() {
        let mut results = vec![
            result("一\tyi\t1", 10),
            result("衣\tyi\t9", 10),
            result("以\tyix\t9", 10),
            result("亿\ty\t1", 20),
        ];
        sort_results(&mut results);
        let order: Vec<String> = results.iter().map(|r| r.entry.data().text).collect();
        assert_eq!(order, vec!["亿", "衣", "以", "一"]);
    }

    #[test]
    fn test_choose_search_column() {
        assert_eq!(choose_search_column("nihao", true), (SearchColumn::Code, "nihao".to_string()));
        assert_eq!(choose_search_column("你好 nihao", true), (SearchColumn::Code, "nihao".to_string()));
        assert_eq!(choose_search_column("你好", true), (SearchColumn::Text, "你好".to_string()));
        assert_eq!(choose_search_column("  ", true), (SearchColumn::Code, String::new()));
    }
}
