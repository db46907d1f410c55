use crate::error::{ErrorKind, Result};
use crate::fold::fold;
use scripture_corpus::{BookId, ChapterRef, VerseRecord};

/// One searchable verse, with its folded text computed up front.
#[derive(Debug, Clone)]
pub(crate) struct Entry {
    pub(crate) book: BookId,
    pub(crate) chapter: u32,
    pub(crate) verse: u32,
    pub(crate) text: String,
    pub(crate) folded: String,
}

/// The in-memory scan target: every verse in canonical order.
///
/// Built once per opened corpus (in the same pass that builds the book index)
/// and shared read-only between searches.
#[derive(Debug, Default)]
pub struct SearchCorpus {
    entries: Vec<Entry>,
}
impl SearchCorpus {
    pub fn builder() -> SearchCorpusBuilder {
        SearchCorpusBuilder::default()
    }

    pub fn from_records<'a>(records: impl IntoIterator<Item = &'a VerseRecord>) -> Result<Self> {
        let mut builder = Self::builder();
        records.into_iter().for_each(|record| builder.push(record));
        builder.build()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn entries(&self) -> &[Entry] {
        &self.entries
    }
}

/// Accumulates verses in storage order.
#[derive(Debug, Default)]
pub struct SearchCorpusBuilder {
    entries: Vec<Entry>,
}
impl SearchCorpusBuilder {
    pub fn push(&mut self, record: &VerseRecord) {
        self.entries.push(Entry {
            book: record.book,
            chapter: record.chapter,
            verse: record.verse.number,
            folded: fold(&record.verse.text),
            text: record.verse.text.clone(),
        });
    }

    /// Sort into canonical order.
    ///
    /// Fails with [`RepeatedVerse`](ErrorKind::RepeatedVerse) if any verse
    /// was pushed more than once.
    pub fn build(mut self) -> Result<SearchCorpus> {
        self.entries.sort_by_key(|entry| (entry.book, entry.chapter, entry.verse));
        let key = |entry: &Entry| (entry.book, entry.chapter, entry.verse);
        if let Some(pair) = self.entries.windows(2).find(|pair| key(&pair[0]) == key(&pair[1])) {
            let repeated = &pair[0];
            exn::bail!(ErrorKind::RepeatedVerse {
                chapter: ChapterRef::new(repeated.book, repeated.chapter),
                verse: repeated.verse,
            });
        }
        Ok(SearchCorpus { entries: self.entries })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scripture_corpus::Verse;

    fn record(book: &str, chapter: u32, verse: u32, text: &str) -> VerseRecord {
        VerseRecord { book: BookId::parse(book).unwrap(), chapter, verse: Verse::new(verse, text) }
    }

    #[test]
    fn test_build_sorts_canonically() {
        let records = [
            record("1 John", 4, 8, "God is love."),
            record("genesis", 2, 1, "Thus the heavens and the earth were finished."),
            record("genesis", 1, 1, "In the beginning God created the heaven and the earth."),
            record("john", 3, 16, "For God so loved the world."),
        ];
        let corpus = SearchCorpus::from_records(&records).unwrap();
        let order: Vec<_> = corpus.entries().iter().map(|e| (e.book.key(), e.chapter, e.verse)).collect();
        assert_eq!(order, vec![("genesis", 1, 1), ("genesis", 2, 1), ("john", 3, 16), ("1john", 4, 8)]);
        assert_eq!(corpus.entries()[0].folded, "in the beginning god created the heaven and the earth.");
    }

    #[test]
    fn test_build_rejects_repeats() {
        let records = [record("ruth", 1, 16, "first"), record("ruth", 2, 1, "other"), record("ruth", 1, 16, "second")];
        let err = SearchCorpus::from_records(&records).unwrap_err();
        let ruth = BookId::parse("ruth").unwrap();
        assert_eq!(*err, ErrorKind::RepeatedVerse { chapter: ChapterRef::new(ruth, 1), verse: 16 });
        assert_eq!((*err).to_string(), "repeated verse: Ruth 1:16");
    }
}
