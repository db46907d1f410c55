//! Canonical book catalog.
//!
//! Book identifiers are positions in the fixed traditional ordering (Old
//! Testament then New Testament). Names coming from the asset or from callers
//! are normalized before lookup, so `"Song of Solomon"`, `"song-of-solomon"`
//! and `"SongOfSolomon"` all resolve to the same [`BookId`].

use crate::error::{Error, ErrorKind};
use std::collections::HashMap;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;
use std::sync::LazyLock;

/// Number of books in the canon.
pub const CANON_LEN: usize = 66;
/// Books before this index belong to the Old Testament.
const NEW_TESTAMENT_START: usize = 39;

/// Canonical key and display name, in canonical order.
static BOOKS: [(&str, &str); CANON_LEN] = [
    ("genesis", "Genesis"),
    ("exodus", "Exodus"),
    ("leviticus", "Leviticus"),
    ("numbers", "Numbers"),
    ("deuteronomy", "Deuteronomy"),
    ("joshua", "Joshua"),
    ("judges", "Judges"),
    ("ruth", "Ruth"),
    ("1samuel", "1 Samuel"),
    ("2samuel", "2 Samuel"),
    ("1kings", "1 Kings"),
    ("2kings", "2 Kings"),
    ("1chronicles", "1 Chronicles"),
    ("2chronicles", "2 Chronicles"),
    ("ezra", "Ezra"),
    ("nehemiah", "Nehemiah"),
    ("esther", "Esther"),
    ("job", "Job"),
    ("psalms", "Psalms"),
    ("proverbs", "Proverbs"),
    ("ecclesiastes", "Ecclesiastes"),
    ("songofsolomon", "Song of Solomon"),
    ("isaiah", "Isaiah"),
    ("jeremiah", "Jeremiah"),
    ("lamentations", "Lamentations"),
    ("ezekiel", "Ezekiel"),
    ("daniel", "Daniel"),
    ("hosea", "Hosea"),
    ("joel", "Joel"),
    ("amos", "Amos"),
    ("obadiah", "Obadiah"),
    ("jonah", "Jonah"),
    ("micah", "Micah"),
    ("nahum", "Nahum"),
    ("habakkuk", "Habakkuk"),
    ("zephaniah", "Zephaniah"),
    ("haggai", "Haggai"),
    ("zechariah", "Zechariah"),
    ("malachi", "Malachi"),
    ("matthew", "Matthew"),
    ("mark", "Mark"),
    ("luke", "Luke"),
    ("john", "John"),
    ("acts", "Acts"),
    ("romans", "Romans"),
    ("1corinthians", "1 Corinthians"),
    ("2corinthians", "2 Corinthians"),
    ("galatians", "Galatians"),
    ("ephesians", "Ephesians"),
    ("philippians", "Philippians"),
    ("colossians", "Colossians"),
    ("1thessalonians", "1 Thessalonians"),
    ("2thessalonians", "2 Thessalonians"),
    ("1timothy", "1 Timothy"),
    ("2timothy", "2 Timothy"),
    ("titus", "Titus"),
    ("philemon", "Philemon"),
    ("hebrews", "Hebrews"),
    ("james", "James"),
    ("1peter", "1 Peter"),
    ("2peter", "2 Peter"),
    ("1john", "1 John"),
    ("2john", "2 John"),
    ("3john", "3 John"),
    ("jude", "Jude"),
    ("revelation", "Revelation"),
];

/// Alternative (already normalized) names that map onto a canonical key.
static ALIASES: [(&str, &str); 6] = [
    ("psalm", "psalms"),
    ("songofsongs", "songofsolomon"),
    ("canticles", "songofsolomon"),
    ("actsoftheapostles", "acts"),
    ("revelations", "revelation"),
    ("therevelation", "revelation"),
];

static LOOKUP: LazyLock<HashMap<&'static str, BookId>> = LazyLock::new(|| {
    let mut map: HashMap<&'static str, BookId> =
        BOOKS.iter().enumerate().map(|(index, (key, _))| (*key, BookId(index as u8))).collect();
    for (alias, key) in ALIASES {
        if let Some(id) = map.get(key).copied() {
            map.insert(alias, id);
        }
    }
    map
});

/// Collapse naming variants of a book name to one lookup key: lowercase,
/// whitespace, hyphens and underscores removed.
///
/// # Examples
///
/// ```
/// use scripture_corpus::normalize_book_name;
/// assert_eq!(normalize_book_name(" Song-of Solomon "), "songofsolomon");
/// assert_eq!(normalize_book_name("1 John"), "1john");
/// ```
pub fn normalize(name: impl AsRef<str>) -> String {
    name.as_ref()
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '-' && *c != '_')
        .flat_map(char::to_lowercase)
        .collect()
}

/// Which half of the canon a book belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Testament {
    Old,
    New,
}

/// Identifier of one canonical book.
///
/// Ordering follows canonical order, so sorting by `BookId` sorts Genesis
/// before Exodus and Malachi before Matthew.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BookId(u8);

impl BookId {
    /// Resolve any naming variant of a book to its identifier.
    ///
    /// # Examples
    ///
    /// ```
    /// use scripture_corpus::BookId;
    /// let id = BookId::parse("1 Corinthians").unwrap();
    /// assert_eq!(id.key(), "1corinthians");
    /// assert_eq!(BookId::parse("Song-of-Songs").unwrap().key(), "songofsolomon");
    /// assert!(BookId::parse("Hezekiah").is_none());
    /// ```
    pub fn parse(name: impl AsRef<str>) -> Option<Self> {
        LOOKUP.get(normalize(name).as_str()).copied()
    }

    /// Identifier for a 1-based position in the full canon.
    pub fn from_position(position: usize) -> Option<Self> {
        match position {
            1..=CANON_LEN => Some(Self((position - 1) as u8)),
            _ => None,
        }
    }

    /// Every canonical book, in canonical order.
    pub fn all() -> impl Iterator<Item = Self> {
        (0..CANON_LEN as u8).map(Self)
    }

    /// Canonical lowercase key, e.g. `"genesis"` or `"1john"`.
    pub fn key(self) -> &'static str {
        BOOKS[usize::from(self.0)].0
    }

    /// Display name, e.g. `"1 John"`.
    pub fn name(self) -> &'static str {
        BOOKS[usize::from(self.0)].1
    }

    /// 1-based position in the full 66-book canon.
    pub fn position(self) -> usize {
        usize::from(self.0) + 1
    }

    pub fn testament(self) -> Testament {
        match usize::from(self.0) < NEW_TESTAMENT_START {
            true => Testament::Old,
            false => Testament::New,
        }
    }
}
impl Display for BookId {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.key())
    }
}
impl FromStr for BookId {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| Error::from(ErrorKind::UnknownBook(s.to_string())))
    }
}

/// A `(book, chapter)` pair, e.g. the chapter of the daily verse or the
/// user's last reading position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChapterRef {
    pub book: BookId,
    pub chapter: u32,
}
impl ChapterRef {
    pub fn new(book: BookId, chapter: u32) -> Self {
        Self { book, chapter }
    }
}
impl Display for ChapterRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{} {}", self.book.name(), self.chapter)
    }
}
/// Parses `"<book name> <chapter>"`, where the book name may itself contain
/// spaces (`"Song of Solomon 2"`, `"1 John 4"`).
impl FromStr for ChapterRef {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || Error::from(ErrorKind::UnknownBook(s.to_string()));
        let (book, chapter) = s.trim().rsplit_once(char::is_whitespace).ok_or_else(invalid)?;
        let chapter = chapter.parse::<u32>().ok().filter(|c| *c > 0).ok_or_else(invalid)?;
        Ok(Self { book: book.parse()?, chapter })
    }
}
