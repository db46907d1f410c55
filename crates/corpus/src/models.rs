//! Strongly-typed corpus entities.
//!
//! Nothing in this module is constructed from unchecked storage values: rows
//! pass through the parse step in `rows.rs` first.

use crate::book::BookId;
use crate::error::{ErrorKind, Result};

/// A single verse of a chapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verse {
    /// Verse number, starting at 1.
    pub number: u32,
    /// Non-empty verse text.
    pub text: String,
}
impl Verse {
    pub fn new(number: u32, text: impl Into<String>) -> Self {
        Self { number, text: text.into() }
    }
}

/// An immutable chapter payload, as loaded from the corpus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chapter {
    pub book: BookId,
    pub number: u32,
    /// Verses in ascending order of verse number, without duplicates.
    verses: Vec<Verse>,
}
impl Chapter {
    /// Build a chapter from verses in any order.
    ///
    /// Verses are sorted by number. Repeated verse numbers mean the asset is
    /// structurally broken and are rejected with
    /// [`Corrupt`](ErrorKind::Corrupt).
    pub fn new(book: BookId, number: u32, mut verses: Vec<Verse>) -> Result<Self> {
        verses.sort_by_key(|verse| verse.number);
        if verses.windows(2).any(|pair| pair[0].number == pair[1].number) {
            exn::bail!(ErrorKind::Corrupt("duplicate verse number"));
        }
        Ok(Self { book, number, verses })
    }

    pub fn verses(&self) -> &[Verse] {
        &self.verses
    }

    pub fn verse(&self, number: u32) -> Option<&Verse> {
        self.verses.binary_search_by_key(&number, |verse| verse.number).ok().map(|index| &self.verses[index])
    }

    pub fn len(&self) -> usize {
        self.verses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.verses.is_empty()
    }
}

/// One fully-qualified verse, as streamed out of the corpus at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerseRecord {
    pub book: BookId,
    pub chapter: u32,
    pub verse: Verse,
}

/// Descriptive metadata embedded in the asset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorpusInfo {
    /// Translation label (e.g. `"KJV"`), if the asset declares one.
    pub translation: Option<String>,
    pub schema_version: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn genesis() -> BookId {
        BookId::parse("genesis").unwrap()
    }

    #[test]
    fn test_chapter_sorts_verses() {
        let chapter = Chapter::new(
            genesis(),
            1,
            vec![
                Verse::new(3, "And God said, Let there be light: and there was light."),
                Verse::new(1, "In the beginning"),
            ],
        )
        .unwrap();
        let numbers: Vec<_> = chapter.verses().iter().map(|v| v.number).collect();
        assert_eq!(numbers, vec![1, 3]);
        assert_eq!(chapter.verse(3).unwrap().text, "And God said, Let there be light: and there was light.");
        assert!(chapter.verse(2).is_none());
    }

    #[test]
    fn test_chapter_rejects_duplicates() {
        let err = Chapter::new(genesis(), 1, vec![Verse::new(1, "a"), Verse::new(1, "b")]).unwrap_err();
        assert!(matches!(&*err, ErrorKind::Corrupt(_)));
    }
}
