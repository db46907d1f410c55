//! Book/chapter index.
//!
//! Built once per opened corpus by streaming every verse row, and read-only
//! afterwards. It answers "how many chapters does this book have" and "does
//! this chapter exist" without touching storage.

use crate::error::{ErrorKind, Result, corpus_error};
use exn::OptionExt;
use futures::TryStreamExt;
use scripture_corpus::{BookId, ChapterRef, Corpus, Testament, VerseRecord};
use scripture_search::SearchCorpusBuilder;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::instrument;

/// A book present in the corpus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Book {
    pub id: BookId,
    /// 1-based position among the books present in the corpus.
    pub ordinal: u32,
    pub chapter_count: u32,
}
impl Book {
    pub fn key(&self) -> &'static str {
        self.id.key()
    }

    pub fn name(&self) -> &'static str {
        self.id.name()
    }

    pub fn testament(&self) -> Testament {
        self.id.testament()
    }
}

#[derive(Debug, Default)]
pub struct BookIndex {
    books: Vec<Book>,
    positions: HashMap<BookId, usize>,
    verse_counts: HashMap<ChapterRef, u32>,
    verses: usize,
}

impl BookIndex {
    /// Stream every verse of `corpus` once, building the index and feeding
    /// each verse to the search builder on the way.
    #[instrument(skip_all)]
    pub async fn build(corpus: &dyn Corpus, search: &mut SearchCorpusBuilder) -> Result<Self> {
        let mut builder = IndexBuilder::default();
        let mut rows = corpus.verse_rows();
        while let Some(record) = rows.try_next().await.map_err(corpus_error)? {
            search.push(&record);
            builder.push(&record);
        }
        let index = builder.finish()?;
        tracing::info!(books = index.books.len(), verses = index.verses, "Built book index");
        Ok(index)
    }

    /// Build from records already in memory.
    pub fn from_records<'a>(records: impl IntoIterator<Item = &'a VerseRecord>) -> Result<Self> {
        let mut builder = IndexBuilder::default();
        records.into_iter().for_each(|record| builder.push(record));
        builder.finish()
    }

    /// Look up a book by any naming variant.
    pub fn book(&self, name: &str) -> Option<&Book> {
        BookId::parse(name).and_then(|id| self.get(id))
    }

    pub fn get(&self, id: BookId) -> Option<&Book> {
        self.positions.get(&id).map(|position| &self.books[*position])
    }

    /// Number of chapters in a book.
    pub fn chapter_count(&self, name: &str) -> Result<u32> {
        let book = self.book(name).ok_or_raise(|| ErrorKind::UnknownBook(name.to_string()))?;
        Ok(book.chapter_count)
    }

    /// Highest verse number of a chapter, if the chapter exists.
    pub fn verse_count(&self, chapter: ChapterRef) -> Option<u32> {
        self.verse_counts.get(&chapter).copied()
    }

    pub fn contains(&self, chapter: ChapterRef) -> bool {
        self.get(chapter.book).is_some_and(|book| (1..=book.chapter_count).contains(&chapter.chapter))
    }

    /// Books in canonical order (Old Testament first).
    pub fn book_order(&self) -> &[Book] {
        &self.books
    }

    /// Chapter 1 of the first book.
    pub fn first_chapter(&self) -> Option<ChapterRef> {
        self.books.first().map(|book| ChapterRef::new(book.id, 1))
    }

    /// Total number of verses seen while building.
    pub fn verses(&self) -> usize {
        self.verses
    }
}

#[derive(Default)]
struct IndexBuilder {
    // Verse numbers seen, per chapter, per book.
    books: BTreeMap<BookId, BTreeMap<u32, BTreeSet<u32>>>,
    verses: usize,
    repeated: Option<(ChapterRef, u32)>,
}
impl IndexBuilder {
    fn push(&mut self, record: &VerseRecord) {
        let verses = self.books.entry(record.book).or_default().entry(record.chapter).or_default();
        if !verses.insert(record.verse.number) && self.repeated.is_none() {
            self.repeated = Some((ChapterRef::new(record.book, record.chapter), record.verse.number));
        }
        self.verses += 1;
    }

    fn finish(self) -> Result<BookIndex> {
        if let Some((chapter, verse)) = self.repeated {
            tracing::warn!(%chapter, verse, "Corpus repeats a verse");
            exn::bail!(ErrorKind::CorpusCorrupt);
        }
        if self.books.is_empty() {
            tracing::warn!("Corpus contains no verses");
            exn::bail!(ErrorKind::CorpusCorrupt);
        }
        let mut index = BookIndex { verses: self.verses, ..Default::default() };
        for (position, (id, chapters)) in self.books.into_iter().enumerate() {
            // Chapter keys are unique and at least 1, so they are exactly
            // 1..=max iff there are max of them.
            let chapter_count = chapters.keys().next_back().copied().unwrap_or_default();
            if chapters.len() != chapter_count as usize {
                tracing::warn!(
                    book = %id,
                    chapters = chapters.len(),
                    highest = chapter_count,
                    "Corpus has a chapter gap"
                );
                exn::bail!(ErrorKind::CorpusCorrupt);
            }
            for (chapter, verses) in chapters {
                let highest = verses.last().copied().unwrap_or_default();
                index.verse_counts.insert(ChapterRef::new(id, chapter), highest);
            }
            index.positions.insert(id, position);
            index.books.push(Book { id, ordinal: position as u32 + 1, chapter_count });
        }
        Ok(index)
    }
}
