//! Corpus loader traits.
//!
//! A [`CorpusLoader`] knows where the bundled asset lives and how to open it;
//! every successful [`open`](CorpusLoader::open) yields a fresh [`Corpus`]
//! handle. The lifecycle owner keeps the loader for the whole process and
//! swaps handles on reset.

use crate::book::BookId;
use crate::error::Result;
use crate::models::{Chapter, CorpusInfo, VerseRecord};
use async_trait::async_trait;
use futures::Stream;
use std::pin::Pin;
use std::sync::Arc;

pub type VerseStream<'a> = Pin<Box<dyn Stream<Item = Result<VerseRecord>> + Send + 'a>>;
pub type CorpusHandle = Arc<dyn Corpus>;
pub type LoaderHandle = Arc<dyn CorpusLoader>;

/// Locates and opens the read-only corpus asset.
#[async_trait]
pub trait CorpusLoader: Send + Sync {
    /// Short description of where the corpus comes from (used for logging only).
    fn name(&self) -> &str;

    /// Open the asset and validate its structure.
    ///
    /// Returns [`Unavailable`](crate::error::ErrorKind::Unavailable) if the
    /// asset is missing or unreadable and
    /// [`Corrupt`](crate::error::ErrorKind::Corrupt) if validation fails.
    async fn open(&self) -> Result<CorpusHandle>;
}

/// An opened corpus.
///
/// All reads are direct storage reads: nothing is cached at this level.
#[async_trait]
pub trait Corpus: Send + Sync {
    fn info(&self) -> &CorpusInfo;

    /// Read every verse of one chapter, in ascending verse order.
    ///
    /// Returns [`ChapterNotFound`](crate::error::ErrorKind::ChapterNotFound)
    /// if the corpus has no rows for the chapter.
    async fn read_chapter(&self, book: BookId, chapter: u32) -> Result<Chapter>;

    /// Stream every verse of the corpus, in storage order.
    ///
    /// Intended to be consumed once at startup. Calling it again restarts the
    /// scan from the beginning.
    ///
    /// # Examples
    ///
    /// ```
    /// use futures::TryStreamExt;
    /// # use scripture_corpus::{Corpus, error::Result};
    /// # async fn example(corpus: &dyn Corpus) -> Result<()> {
    /// let mut rows = corpus.verse_rows();
    /// let mut total = 0;
    /// while let Some(record) = rows.try_next().await? {
    ///     total += record.verse.text.len();
    /// }
    /// println!("{total} bytes of scripture");
    /// # Ok(())
    /// # }
    /// ```
    fn verse_rows(&self) -> VerseStream<'_>;

    /// Release the underlying resources.
    ///
    /// Idempotent: second and further calls are no-ops. Reads after closing
    /// fail with [`Closed`](crate::error::ErrorKind::Closed).
    async fn close(&self);

    fn is_closed(&self) -> bool;
}
