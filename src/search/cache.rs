use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use parking_lot::Mutex;
use crate::search::results::{MatchResult, SearchColumn};

pub type CachedResults = Arc<Vec<MatchResult>>;

/// Narrowing cache: full result sets keyed by the exact query that produced them.
///
/// A longer query is only scanned against the results of its longest cached
/// prefix. That is exact for subsequence-style fuzzy scoring, where a record
/// that misses `ab` also misses `abc`, and an approximation for anything else.
pub struct SearchCache {
    pub cache: Mutex<LruCache<QueryKey, CachedResults>>,
    pub size_limit: usize,
    pub hit_count: AtomicUsize,
    pub narrow_count: AtomicUsize,
    pub miss_count: AtomicUsize,
}

#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub struct QueryKey {
    pub column: SearchColumn,
    pub query: String,
}

/// Outcome of a cache lookup.
#[derive(Debug, Clone)]
pub enum Lookup {
    /// The query itself was cached
    Exact(CachedResults),
    /// Longest cached proper prefix and its results
    Prefix(String, CachedResults),
    Miss,
}

impl QueryKey {
    pub fn new(column: SearchColumn, query: impl Into<String>) -> Self {
        QueryKey { column, query: query.into() }
    }
}

impl SearchCache {
    pub fn new(size_limit: usize) -> Self {
        let cap = NonZeroUsize::new(size_limit).unwrap_or(NonZeroUsize::MIN);
        SearchCache {
            cache: Mutex::new(LruCache::new(cap)),
            size_limit: cap.get(),
            hit_count: AtomicUsize::new(0),
            narrow_count: AtomicUsize::new(0),
            miss_count: AtomicUsize::new(0),
        }
    }

    /// Find the longest cached prefix of `key.query`, the query itself included.
    pub fn lookup(&self, key: &QueryKey) -> Lookup {
        let mut cache = self.cache.lock();
        let ends = key.query.char_indices().map(|(i, _)| i).skip(1).chain([key.query.len()]);
        let mut ends: Vec<usize> = ends.collect();
        ends.reverse();

        for end in ends {
            let prefix = &key.query[..end];
            if let Some(results) = cache.get(&QueryKey::new(key.column, prefix)) {
                if end == key.query.len() {
                    self.hit_count.fetch_add(1, Ordering::Relaxed);
                    return Lookup::Exact(results.clone());
                }
                self.narrow_count.fetch_add(1, Ordering::Relaxed);
                return Lookup::Prefix(prefix.to_string(), results.clone());
            }
        }
        self.miss_count.fetch_add(1, Ordering::Relaxed);
        Lookup::Miss
    }

    pub fn put(&self, key: QueryKey, results: Vec<MatchResult>) {
        self.cache.lock().put(key, Arc::new(results));
    }

    pub fn clear(&self) {
        self.cache.lock().clear();
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hit_count: self.hit_count.load(Ordering::Relaxed),
            narrow_count: self.narrow_count.load(Ordering::Relaxed),
            miss_count: self.miss_count.load(Ordering::Relaxed),
            size: self.cache.lock().len(),
            capacity: self.size_limit,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheStats {
    pub hit_count: usize,
    pub narrow_count: usize,
    pub miss_count: usize,
    pub size: usize,
    pub capacity: usize,
}

impl CacheStats {
    /// Share of lookups that avoided a full corpus scan.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hit_count + self.narrow_count + self.miss_count;
        if total == 0 {
            0.0
        } else {
            (self.hit_count + self.narrow_count) as f64 / total as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::entry::Entry;
    use crate::core::types::FileId;
    use crate::schema::column::DEFAULT_COLUMNS;

    fn results(raws: &[&str]) -> Vec<MatchResult> {
        raws.iter()
            .map(|raw| MatchResult::new(Entry::loaded(raw, FileId(1), 0, raw.len(), &DEFAULT_COLUMNS), 1))
            .collect()
    }

    #[test]
    fn test_exact_prefix_and_miss() {
        let cache = SearchCache::new(8);
        cache.put(QueryKey::new(SearchColumn::Code, "ni"), results(&["你\tni", "泥\tni"]));

        match cache.lookup(&QueryKey::new(SearchColumn::Code, "ni")) {
            Lookup::Exact(hit) => assert_eq!(hit.len(), 2),
            other => panic!("expected exact hit, got {:?}", other),
        }
        match cache.lookup(&QueryKey::new(SearchColumn::Code, "nihao")) {
            Lookup::Prefix(prefix, hit) => {
                assert_eq!(prefix, "ni");
                assert_eq!(hit.len(), 2);
            }
            other => panic!("expected prefix hit, got {:?}", other),
        }
        assert!(matches!(cache.lookup(&QueryKey::new(SearchColumn::Text, "nihao")), Lookup::Miss));
        assert!(matches!(cache.lookup(&QueryKey::new(SearchColumn::Code, "hao")), Lookup::Miss));

        let stats = cache.stats();
        assert_eq!((stats.hit_count, stats.narrow_count, stats.miss_count), (1, 1, 2));
        assert_eq!(stats.size, 1);
    }

    #[test]
    fn test_longest_prefix_wins() {
        let cache = SearchCache::new(8);
        cache.put(QueryKey::new(SearchColumn::Code, "n"), results(&["你\tni", "好\thao"]));
        cache.put(QueryKey::new(SearchColumn::Code, "nih"), results(&["你好\tnihao"]));
        match cache.lookup(&QueryKey::new(SearchColumn::Code, "niha")) {
            Lookup::Prefix(prefix, hit) => {
                assert_eq!(prefix, "nih");
                assert_eq!(hit.len(), 1);
            }
            other => panic!("expected prefix hit, got {:?}", other),
        }
    }

    #[test]
    fn test_prefixes_split_on_char_boundaries() {
        let cache = SearchCache::new(8);
        cache.put(QueryKey::new(SearchColumn::Text, "你"), results(&["你好\tnihao"]));
        assert!(matches!(cache.lookup(&QueryKey::new(SearchColumn::Text, "你好")), Lookup::Prefix(..)));
    }

    #[test]
    fn test_hit_rate_counts_narrowed_lookups() {
        let cache = SearchCache::new(8);
        assert_eq!(cache.stats().hit_rate(), 0.0);
        cache.put(QueryKey::new(SearchColumn::Code, "ni"), results(&["你\tni"]));
        cache.lookup(&QueryKey::new(SearchColumn::Code, "ni"));
        cache.lookup(&QueryKey::new(SearchColumn::Code, "nih"));
        cache.lookup(&QueryKey::new(SearchColumn::Code, "hao"));
        cache.lookup(&QueryKey::new(SearchColumn::Text, "ni"));
        assert_eq!(cache.stats().hit_rate(), 0.5);
    }

    #[test]
    fn test_clear() {
        let cache = SearchCache::new(0);
        assert_eq!(cache.stats().capacity, 1);
        cache.put(QueryKey::new(SearchColumn::Code, "a"), Vec::new());
        cache.clear();
        assert!(matches!(cache.lookup(&QueryKey::new(SearchColumn::Code, "a")), Lookup::Miss));
    }
}
