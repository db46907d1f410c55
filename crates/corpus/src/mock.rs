//! In-memory corpus for testing.

use crate::book::BookId;
use crate::error::{Error, ErrorKind, Result};
use crate::loader::{Corpus, CorpusHandle, CorpusLoader, VerseStream};
use crate::models::{Chapter, CorpusInfo, Verse, VerseRecord};
use async_stream::stream;
use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::{RwLock, RwLockWriteGuard};

#[derive(Default)]
struct MockState {
    rows: RwLock<Vec<VerseRecord>>,
    opens: AtomicUsize,
    closes: AtomicUsize,
    chapter_reads: AtomicUsize,
    row_scans: AtomicUsize,
    missing: AtomicBool,
    corrupt: AtomicBool,
    failing_reads: AtomicUsize,
    corrupt_reads: AtomicUsize,
    read_gate: RwLock<()>,
}

/// In-memory corpus loader for testing.
///
/// Every handle it opens shares the same rows and counters, so tests can spy
/// on how often the storage layer is actually hit, and inject faults to drive
/// error paths (missing asset, corruption, transient I/O failures).
///
/// # Examples
///
/// ```ignore
/// use scripture_corpus::{BookId, Corpus, CorpusLoader, MockLoader};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let loader = MockLoader::with_rows([
///     ("genesis", 1, 1, "In the beginning God created the heaven and the earth."),
/// ]);
/// let corpus = loader.open().await?;
/// let chapter = corpus.read_chapter(BookId::parse("genesis").unwrap(), 1).await?;
/// assert_eq!(chapter.len(), 1);
/// assert_eq!(loader.chapter_reads(), 1);
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Default)]
pub struct MockLoader {
    state: Arc<MockState>,
}

impl MockLoader {
    /// Create a mock loader pre-populated with `(book, chapter, verse, text)` rows.
    ///
    /// Panics if a book name does not resolve. If test setup is wrong, then
    /// the test should not pass.
    pub fn with_rows<B, T>(rows: impl IntoIterator<Item = (B, u32, u32, T)>) -> Self
    where
        B: AsRef<str>,
        T: Into<String>,
    {
        let loader = Self::default();
        loader.replace_rows(rows);
        loader
    }

    /// Swap the stored rows, e.g. to simulate an updated asset before a reset.
    pub fn replace_rows<B, T>(&self, rows: impl IntoIterator<Item = (B, u32, u32, T)>)
    where
        B: AsRef<str>,
        T: Into<String>,
    {
        let records = rows
            .into_iter()
            .map(|(book, chapter, number, text)| {
                let Some(id) = BookId::parse(book.as_ref()) else {
                    // The panic here is DELIBERATE. MockLoader is intended to be
                    // used in tests; panics are expected. There is no error result.
                    panic!("MockLoader::with_rows: unknown book {}", book.as_ref());
                };
                VerseRecord { book: id, chapter, verse: Verse::new(number, text) }
            })
            .collect();
        // Only contended when a test races itself; never held across awaits.
        match self.state.rows.try_write() {
            Ok(mut guard) => *guard = records,
            Err(_) => panic!("MockLoader::replace_rows: rows are locked"),
        }
    }

    /// Make subsequent opens fail as if the asset were missing.
    pub fn set_missing(&self, missing: bool) {
        self.state.missing.store(missing, Ordering::SeqCst);
    }

    /// Make subsequent opens and reads fail structural validation.
    pub fn set_corrupt(&self, corrupt: bool) {
        self.state.corrupt.store(corrupt, Ordering::SeqCst);
    }

    /// Fail the next `count` chapter reads with a transient I/O error.
    pub fn fail_next_reads(&self, count: usize) {
        self.state.failing_reads.store(count, Ordering::SeqCst);
    }

    /// Fail the next `count` chapter reads as if the data were corrupt,
    /// without affecting opens.
    pub fn corrupt_next_reads(&self, count: usize) {
        self.state.corrupt_reads.store(count, Ordering::SeqCst);
    }

    /// Hold every chapter read, after its rows were fetched, until the
    /// returned guard is dropped.
    pub async fn hold_reads(&self) -> RwLockWriteGuard<'_, ()> {
        self.state.read_gate.write().await
    }

    /// Number of times [`open`](CorpusLoader::open) was called.
    pub fn opens(&self) -> usize {
        self.state.opens.load(Ordering::SeqCst)
    }

    /// Number of handles that were closed (repeat closes are not counted).
    pub fn closes(&self) -> usize {
        self.state.closes.load(Ordering::SeqCst)
    }

    /// Number of [`read_chapter`](Corpus::read_chapter) calls across all handles.
    pub fn chapter_reads(&self) -> usize {
        self.state.chapter_reads.load(Ordering::SeqCst)
    }

    /// Number of [`verse_rows`](Corpus::verse_rows) scans across all handles.
    pub fn row_scans(&self) -> usize {
        self.state.row_scans.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CorpusLoader for MockLoader {
    fn name(&self) -> &str {
        "mock"
    }

    async fn open(&self) -> Result<CorpusHandle> {
        self.state.opens.fetch_add(1, Ordering::SeqCst);
        // Give concurrent callers a chance to observe the open in flight.
        tokio::task::yield_now().await;
        if self.state.missing.load(Ordering::SeqCst) {
            exn::bail!(ErrorKind::Unavailable("mock".into()));
        }
        if self.state.corrupt.load(Ordering::SeqCst) {
            exn::bail!(ErrorKind::Corrupt("mock corruption"));
        }
        Ok(Arc::new(MockCorpus {
            state: Arc::clone(&self.state),
            info: CorpusInfo { translation: Some("MOCK".to_string()), schema_version: crate::SCHEMA_VERSION },
            closed: AtomicBool::new(false),
        }))
    }
}

/// Decrement a fault counter, returning whether a fault was pending.
fn take_one(counter: &AtomicUsize) -> bool {
    counter.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1)).is_ok()
}

struct MockCorpus {
    state: Arc<MockState>,
    info: CorpusInfo,
    closed: AtomicBool,
}

#[async_trait]
impl Corpus for MockCorpus {
    fn info(&self) -> &CorpusInfo {
        &self.info
    }

    async fn read_chapter(&self, book: BookId, chapter: u32) -> Result<Chapter> {
        if self.is_closed() {
            exn::bail!(ErrorKind::Closed);
        }
        self.state.chapter_reads.fetch_add(1, Ordering::SeqCst);
        if take_one(&self.state.failing_reads) {
            exn::bail!(ErrorKind::Io);
        }
        if take_one(&self.state.corrupt_reads) || self.state.corrupt.load(Ordering::SeqCst) {
            exn::bail!(ErrorKind::Corrupt("mock corruption"));
        }
        let verses: Vec<Verse> = self
            .state
            .rows
            .read()
            .await
            .iter()
            .filter(|record| record.book == book && record.chapter == chapter)
            .map(|record| record.verse.clone())
            .collect();
        if verses.is_empty() {
            exn::bail!(ErrorKind::ChapterNotFound(book, chapter));
        }
        drop(self.state.read_gate.read().await);
        Chapter::new(book, chapter, verses)
    }

    fn verse_rows(&self) -> VerseStream<'_> {
        Box::pin(stream! {
            if self.is_closed() {
                yield Err(Error::from(ErrorKind::Closed));
                return;
            }
            self.state.row_scans.fetch_add(1, Ordering::SeqCst);
            if self.state.corrupt.load(Ordering::SeqCst) {
                yield Err(Error::from(ErrorKind::Corrupt("mock corruption")));
                return;
            }
            // Snapshot under the read lock, then drop it before yielding.
            let rows = self.state.rows.read().await.clone();
            for record in rows {
                yield Ok(record);
            }
        })
    }

    async fn close(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            self.state.closes.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}
