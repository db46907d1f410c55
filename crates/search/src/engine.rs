use crate::error::{ErrorKind, Result};
use crate::fold::fold;
use crate::target::SearchCorpus;
use exn::ResultExt;
use scripture_corpus::BookId;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::Instrument;

pub const DEFAULT_MAX_RESULTS: usize = 200;
pub const DEFAULT_MIN_QUERY_LENGTH: usize = 3;
/// How many verses are scanned between two supersession checks.
const CHECK_INTERVAL: usize = 512;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchOptions {
    /// Upper bound on the number of hits returned for a single query.
    pub max_results: usize,
    /// Queries shorter than this (in characters, after folding) return no
    /// hits without scanning.
    pub min_query_length: usize,
}
impl Default for SearchOptions {
    fn default() -> Self {
        Self { max_results: DEFAULT_MAX_RESULTS, min_query_length: DEFAULT_MIN_QUERY_LENGTH }
    }
}

/// A verse matching a query.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub book: BookId,
    pub chapter: u32,
    pub verse: u32,
    pub text: String,
    /// Always `1.0`: matching is match/no-match, ordering is canonical.
    pub score: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SearchOutcome {
    /// The scan ran to completion (or hit the result cap).
    Complete(Vec<SearchHit>),
    /// A newer search started before this one finished; its results were
    /// discarded.
    Superseded,
}
impl SearchOutcome {
    /// Hits of a completed search; nothing for a superseded one.
    pub fn into_hits(self) -> Vec<SearchHit> {
        match self {
            Self::Complete(hits) => hits,
            Self::Superseded => Vec::new(),
        }
    }

    pub fn is_superseded(&self) -> bool {
        matches!(self, Self::Superseded)
    }
}

/// Runs queries against a [`SearchCorpus`].
///
/// Every query takes a ticket from a shared counter. Starting a query (or
/// calling [`cancel`](Self::cancel)) invalidates every older ticket, and a
/// scan holding an invalid ticket stops early and reports
/// [`Superseded`](SearchOutcome::Superseded). Debouncing keystrokes is the
/// caller's job.
#[derive(Debug, Clone, Default)]
pub struct SearchEngine {
    options: SearchOptions,
    generation: Arc<AtomicU64>,
}

impl SearchEngine {
    pub fn new(options: SearchOptions) -> Self {
        Self { options, generation: Arc::new(AtomicU64::new(0)) }
    }

    pub fn options(&self) -> &SearchOptions {
        &self.options
    }

    /// Supersede every search currently in flight.
    pub fn cancel(&self) {
        self.next_ticket();
    }

    fn next_ticket(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::AcqRel) + 1
    }

    fn is_current(&self, ticket: u64) -> bool {
        self.generation.load(Ordering::Acquire) == ticket
    }

    /// Find every verse whose folded text contains the folded query, in
    /// canonical order, capped at `max_results`.
    ///
    /// The query takes its ticket when this is called, not when the returned
    /// future is first polled, so of two searches started back to back the
    /// first is always superseded. The scan itself runs on the blocking
    /// thread pool.
    pub fn search(
        &self,
        corpus: Arc<SearchCorpus>,
        query: &str,
    ) -> impl Future<Output = Result<SearchOutcome>> + Send + use<> {
        let ticket = self.next_ticket();
        let needle = fold(query);
        let engine = self.clone();
        let span = tracing::debug_span!("search", ticket, verses = corpus.len());
        async move {
            if needle.chars().count() < engine.options.min_query_length {
                tracing::trace!("Query below minimum length");
                return Ok(SearchOutcome::Complete(Vec::new()));
            }
            let scanner = engine.clone();
            let limit = engine.options.max_results;
            let hits = tokio::task::spawn_blocking(move || scanner.scan(&corpus, &needle, limit, ticket))
                .await
                .or_raise(|| ErrorKind::Worker)?;
            Ok(engine.deliver(ticket, hits))
        }
        .instrument(span)
    }

    /// Hand back a finished scan. Re-checks the ticket: a newer query may
    /// have started after the scan finished.
    fn deliver(&self, ticket: u64, hits: Option<Vec<SearchHit>>) -> SearchOutcome {
        match hits {
            Some(hits) if self.is_current(ticket) => {
                tracing::debug!(hits = hits.len(), "Search complete");
                SearchOutcome::Complete(hits)
            },
            _ => {
                tracing::debug!("Search superseded");
                SearchOutcome::Superseded
            },
        }
    }

    /// Linear scan; `None` if the ticket was invalidated part-way.
    fn scan(&self, corpus: &SearchCorpus, needle: &str, limit: usize, ticket: u64) -> Option<Vec<SearchHit>> {
        let mut hits = Vec::new();
        for (index, entry) in corpus.entries().iter().enumerate() {
            if index % CHECK_INTERVAL == 0 && !self.is_current(ticket) {
                return None;
            }
            if hits.len() >= limit {
                break;
            }
            if entry.folded.contains(needle) {
                hits.push(SearchHit {
                    book: entry.book,
                    chapter: entry.chapter,
                    verse: entry.verse,
                    text: entry.text.clone(),
                    score: 1.0,
                });
            }
        }
        Some(hits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use scripture_corpus::fixture::sample_rows;
    use scripture_corpus::{Verse, VerseRecord};

    fn sample() -> Arc<SearchCorpus> {
        let records: Vec<VerseRecord> = sample_rows()
            .into_iter()
            .map(|(book, chapter, verse, text)| VerseRecord {
                book: BookId::parse(book).unwrap(),
                chapter,
                verse: Verse::new(verse, text),
            })
            .collect();
        Arc::new(SearchCorpus::from_records(&records).unwrap())
    }

    fn refs(hits: &[SearchHit]) -> Vec<(&'static str, u32, u32)> {
        hits.iter().map(|hit| (hit.book.key(), hit.chapter, hit.verse)).collect()
    }

    #[rstest]
    #[case("")]
    #[case("ab")]
    #[case("   ab   ")]
    #[tokio::test]
    async fn test_short_queries_return_nothing(#[case] query: &str) {
        let engine = SearchEngine::default();
        let outcome = engine.search(sample(), query).await.unwrap();
        assert_eq!(outcome, SearchOutcome::Complete(Vec::new()));
    }

    #[tokio::test]
    async fn test_matches_in_canonical_order() {
        let engine = SearchEngine::default();
        let hits = engine.search(sample(), "love").await.unwrap().into_hits();
        assert_eq!(
            refs(&hits),
            vec![
                ("genesis", 22, 2),
                ("genesis", 29, 20),
                ("john", 3, 16),
                ("john", 3, 35),
                ("1john", 4, 7),
                ("1john", 4, 8),
            ]
        );
        assert!(hits.iter().all(|hit| hit.score == 1.0));
        // Deterministic across repeated runs.
        let again = engine.search(sample(), "love").await.unwrap().into_hits();
        assert_eq!(hits, again);
    }

    #[tokio::test]
    async fn test_case_insensitive() {
        let engine = SearchEngine::default();
        let hits = engine.search(sample(), "IN THE BEGINNING").await.unwrap().into_hits();
        assert_eq!(refs(&hits), vec![("genesis", 1, 1), ("john", 1, 1), ("john", 1, 2)]);
    }

    #[tokio::test]
    async fn test_results_are_capped() {
        let engine = SearchEngine::new(SearchOptions { max_results: 2, ..Default::default() });
        let hits = engine.search(sample(), "love").await.unwrap().into_hits();
        assert_eq!(refs(&hits), vec![("genesis", 22, 2), ("genesis", 29, 20)]);
    }

    #[rstest]
    #[case("jose")]
    #[case("JOSÉ")]
    #[case("josé más")]
    #[tokio::test]
    async fn test_diacritics_are_folded(#[case] query: &str) {
        let records = [VerseRecord {
            book: BookId::parse("genesis").unwrap(),
            chapter: 37,
            verse: Verse::new(3, "Y amaba Israel a José más que a todos sus hijos"),
        }];
        let corpus = Arc::new(SearchCorpus::from_records(&records).unwrap());
        let hits = SearchEngine::default().search(corpus, query).await.unwrap().into_hits();
        assert_eq!(refs(&hits), vec![("genesis", 37, 3)]);
        assert_eq!(hits[0].text, "Y amaba Israel a José más que a todos sus hijos");
    }

    #[test]
    fn test_stale_ticket_aborts_scan() {
        let engine = SearchEngine::default();
        let stale = engine.next_ticket();
        engine.cancel();
        assert!(!engine.is_current(stale));
        assert_eq!(engine.scan(&sample(), "love", DEFAULT_MAX_RESULTS, stale), None);
    }

    #[tokio::test]
    async fn test_newer_search_supersedes_older() {
        let engine = SearchEngine::default();
        let first = engine.search(sample(), "love");
        let second = engine.search(sample(), "in the beginning");
        let (first, second) = tokio::join!(first, second);
        assert_eq!(first.unwrap(), SearchOutcome::Superseded);
        assert_eq!(refs(&second.unwrap().into_hits()), vec![("genesis", 1, 1), ("john", 1, 1), ("john", 1, 2)]);
    }

    #[tokio::test]
    async fn test_cancel_supersedes_started_search() {
        let engine = SearchEngine::default();
        let pending = engine.search(sample(), "love");
        engine.cancel();
        assert!(pending.await.unwrap().is_superseded());
    }

    #[test]
    fn test_finished_scan_superseded_before_delivery() {
        let engine = SearchEngine::default();
        let ticket = engine.next_ticket();
        let hits = engine.scan(&sample(), "love", DEFAULT_MAX_RESULTS, ticket);
        assert_eq!(hits.as_ref().map(Vec::len), Some(6));
        // A newer query starts after the scan finished.
        engine.next_ticket();
        assert_eq!(engine.deliver(ticket, hits), SearchOutcome::Superseded);
    }

    #[test]
    fn test_current_scan_is_delivered() {
        let engine = SearchEngine::default();
        let ticket = engine.next_ticket();
        let hits = engine.scan(&sample(), "love", DEFAULT_MAX_RESULTS, ticket);
        assert_eq!(engine.deliver(ticket, hits).into_hits().len(), 6);
    }

    #[test]
    fn test_clones_share_the_ticket_counter() {
        let engine = SearchEngine::default();
        let ticket = engine.next_ticket();
        engine.clone().cancel();
        assert!(!engine.is_current(ticket));
    }

    #[test]
    fn test_outcome_helpers() {
        assert!(SearchOutcome::Superseded.is_superseded());
        assert!(SearchOutcome::Superseded.into_hits().is_empty());
    }
}
