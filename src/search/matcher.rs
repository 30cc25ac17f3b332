use nucleo_matcher::pattern::{Atom, AtomKind, CaseMatching, Normalization};
use nucleo_matcher::{Config, Matcher, Utf32Str};

/// Fuzzy scorer for one query.
///
/// Holds a `Matcher` and its scratch buffers, so it is not shared between
/// threads; every search worker builds its own.
pub struct FuzzyScorer {
    matcher: Matcher,
    atom: Atom,
    buf: Vec<char>,
}

impl FuzzyScorer {
    pub fn new(query: &str) -> Self {
        FuzzyScorer {
            matcher: Matcher::new(Config::DEFAULT),
            atom: Atom::new(query, CaseMatching::Ignore, Normalization::Smart, AtomKind::Fuzzy, false),
            buf: Vec::new(),
        }
    }

    /// Score `haystack`; `None` means no match.
    pub fn score(&mut self, haystack: &str) -> Option<u32> {
        let hay = Utf32Str::new(haystack, &mut self.buf);
        self.atom.score(hay, &mut self.matcher).map(u32::from)
    }
}
