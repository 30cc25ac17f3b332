use std::sync::atomic::{AtomicBool, Ordering};
use crossbeam::channel::Sender;
use log::debug;
use rayon::prelude::*;
use crate::core::entry::EntryRef;
use crate::search::cache::{CacheStats, Lookup, QueryKey, SearchCache};
use crate::search::cancel::CancelToken;
use crate::search::matcher::FuzzyScorer;
use crate::search::results::{MatchResult, MatchResultChunk, SearchColumn};

pub const DEFAULT_CHUNK_SIZE: usize = 500;

/// How a search ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchOutcome {
    /// Scanned; number of matches streamed
    Completed(usize),
    /// Served from the cache in one chunk
    Cached(usize),
    /// Cancelled, or the receiver went away
    Cancelled,
}

/// Chunked fuzzy search over the record list with a narrowing cache.
pub struct SearchEngine {
    pub cache: SearchCache,
    pub chunk_size: usize,
}

impl SearchEngine {
    pub fn new(chunk_size: usize, cache_capacity: usize) -> Self {
        SearchEngine {
            cache: SearchCache::new(cache_capacity),
            chunk_size: chunk_size.max(1),
        }
    }

    /// Drop every cached result set. Required after any mutation.
    pub fn reset(&self) {
        self.cache.clear();
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Match `key` against `column` of `corpus`, streaming each chunk's
    /// matches as soon as it is scored.
    ///
    /// Chunks are scored in parallel and arrive in no particular order. Only
    /// a search that ran to completion is written back to the cache.
    pub fn search(
        &self,
        key: &str,
        column: SearchColumn,
        version: u64,
        corpus: &[EntryRef],
        sender: &Sender<MatchResultChunk>,
        cancel: &CancelToken,
    ) -> SearchOutcome {
        let cache_key = QueryKey::new(column, key);
        let narrowed: Vec<EntryRef>;
        let candidates: &[EntryRef] = match self.cache.lookup(&cache_key) {
            Lookup::Exact(cached) => {
                let results: Vec<MatchResult> = cached.iter()
                    .filter(|r| !r.entry.is_deleted())
                    .cloned()
                    .collect();
                let count = results.len();
                debug!("search [{}] served from cache ({} results)", key, count);
                let sent = cancel.run_unless_cancelled(|| sender.send(MatchResultChunk { version, results }).is_ok());
                return match sent {
                    Some(true) => SearchOutcome::Cached(count),
                    _ => SearchOutcome::Cancelled,
                };
            }
            Lookup::Prefix(prefix, cached) => {
                debug!("search [{}] narrowed to {} results of [{}]", key, cached.len(), prefix);
                narrowed = cached.iter().map(|r| r.entry.clone()).collect();
                &narrowed
            }
            Lookup::Miss => corpus,
        };

        if cancel.is_cancelled() {
            return SearchOutcome::Cancelled;
        }

        let abandoned = AtomicBool::new(false);
        let matched: Vec<Vec<MatchResult>> = candidates
            .par_chunks(self.chunk_size)
            .map_init(
                || FuzzyScorer::new(key),
                |scorer, chunk| {
                    if abandoned.load(Ordering::Relaxed) || cancel.is_cancelled() {
                        return Vec::new();
                    }
                    let results = score_chunk(scorer, chunk, column);
                    if !results.is_empty() {
                        let chunk = MatchResultChunk { version, results: results.clone() };
                        if cancel.run_unless_cancelled(|| sender.send(chunk).is_ok()) != Some(true) {
                            abandoned.store(true, Ordering::Relaxed);
                        }
                    }
                    results
                },
            )
            .collect();

        if abandoned.load(Ordering::Relaxed) || cancel.is_cancelled() {
            debug!("search [{}] version {} cancelled", key, version);
            return SearchOutcome::Cancelled;
        }

        let results: Vec<MatchResult> = matched.into_iter().flatten().collect();
        let count = results.len();
        self.cache.put(cache_key, results);
        SearchOutcome::Completed(count)
    }
}

fn score_chunk(scorer: &mut FuzzyScorer, chunk: &[EntryRef], column: SearchColumn) -> Vec<MatchResult> {
    chunk.iter()
        .filter(|entry| !entry.is_deleted())
        .filter_map(|entry| {
            let score = scorer.score(&entry.haystack(column))?;
            (score > 0).then(|| MatchResult::new(entry.clone(), score))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam::channel::unbounded;
    use crate::core::entry::Entry;
    use crate::core::types::FileId;
    use crate::schema::column::DEFAULT_COLUMNS;

    fn corpus(raws: &[&str]) -> Vec<EntryRef> {
        raws.iter()
            .map(|raw| Entry::loaded(raw, FileId(1), 0, raw.len(), &DEFAULT_COLUMNS))
            .collect()
    }

    fn codes(chunks: &[MatchResultChunk]) -> Vec<String> {
        let mut codes: Vec<String> = chunks.iter()
            .flat_map(|c| c.results.iter().map(|r| r.entry.data().code))
            .collect();
        codes.sort();
        codes
    }

    #[test]
    fn test_streams_matches_in_chunks() {
        let entries = corpus(&["你\tni", "好\thao", "你好\tnihao", "泥\tni", "呢\tne"]);
        let engine = SearchEngine::new(2, 16);
        let (tx, rx) = unbounded();
        let outcome = engine.search("ni", SearchColumn::Code, 3, &entries, &tx, &CancelToken::new());
        drop(tx);
        let chunks: Vec<_> = rx.iter().collect();
        assert_eq!(outcome, SearchOutcome::Completed(3));
        assert!(chunks.iter().all(|c| c.version == 3 && c.results.len() <= 2));
        assert_eq!(codes(&chunks), vec!["ni", "ni", "nihao"]);
    }

    #[test]
    fn test_repeat_query_is_cached_and_longer_query_narrows() {
        let entries = corpus(&["你\tni", "好\thao", "你好\tnihao"]);
        let engine = SearchEngine::new(500, 16);
        let (tx, rx) = unbounded();
        let cancel = CancelToken::new();
        engine.search("ni", SearchColumn::Code, 1, &entries, &tx, &cancel);
        assert_eq!(engine.search("ni", SearchColumn::Code, 2, &entries, &tx, &cancel), SearchOutcome::Cached(2));
        assert_eq!(engine.search("nih", SearchColumn::Code, 3, &entries, &tx, &cancel), SearchOutcome::Completed(1));
        drop(tx);
        let last = rx.iter().last().unwrap();
        assert_eq!(last.version, 3);
        let stats = engine.cache_stats();
        assert_eq!((stats.hit_count, stats.narrow_count, stats.miss_count), (1, 1, 1));
    }

    #[test]
    fn test_cancelled_before_start_sends_nothing() {
        let entries = corpus(&["你\tni", "你好\tnihao"]);
        let engine = SearchEngine::new(1, 16);
        let (tx, rx) = unbounded();
        let cancel = CancelToken::new();
        cancel.cancel();
        assert_eq!(engine.search("ni", SearchColumn::Code, 1, &entries, &tx, &cancel), SearchOutcome::Cancelled);
        drop(tx);
        assert_eq!(rx.iter().count(), 0);
        assert_eq!(engine.cache_stats().size, 0);
    }

    #[test]
    fn test_deleted_records_are_skipped() {
        let entries = corpus(&["你\tni", "泥\tni"]);
        entries[1].delete();
        let engine = SearchEngine::new(500, 16);
        let (tx, rx) = unbounded();
        assert_eq!(
            engine.search("ni", SearchColumn::Code, 1, &entries, &tx, &CancelToken::new()),
            SearchOutcome::Completed(1)
        );
        drop(tx);
        assert_eq!(codes(&rx.iter().collect::<Vec<_>>()), vec!["ni"]);
    }

    #[test]
    fn test_dropped_receiver_abandons_search() {
        let entries = corpus(&["你\tni"]);
        let engine = SearchEngine::new(500, 16);
        let (tx, rx) = unbounded();
        drop(rx);
        assert_eq!(
            engine.search("ni", SearchColumn::Code, 1, &entries, &tx, &CancelToken::new()),
            SearchOutcome::Cancelled
        );
    }
}
