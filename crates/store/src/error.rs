//! Store Error Types
//!
//! This is the public error taxonomy. Errors from the corpus, search and
//! configuration crates are translated into one of these kinds at the store
//! boundary, with the lower-level error kept as a child in the `exn` error tree.

use derive_more::{Display, Error};
use scripture_corpus::ChapterRef;
use scripture_corpus::error::{Error as CorpusError, ErrorKind as CorpusErrorKind};

/// A store error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for store operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// The corpus asset is missing or unreadable. Initialization cannot
    /// succeed until it is restored.
    #[display("scripture data is unavailable")]
    CorpusUnavailable,
    /// The corpus asset failed validation (after one automatic retry).
    #[display("scripture data is corrupt")]
    CorpusCorrupt,
    #[display("unknown book: {_0}")]
    UnknownBook(#[error(not(source))] String),
    #[display("chapter not found: {_0}")]
    ChapterNotFound(#[error(not(source))] ChapterRef),
    /// A read failed even after retrying.
    #[display("storage I/O error")]
    StorageIo,
    /// The store was closed.
    #[display("store is closed")]
    StoreClosed,
    /// The store is not initialized (or is between states) for this operation.
    #[display("store is not ready")]
    NotReady,
    #[display("search failed")]
    SearchFailed,
    #[display("invalid configuration")]
    InvalidConfig,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::StorageIo | Self::NotReady | Self::SearchFailed)
    }

    /// `true` for the kinds the lenient read API maps to an empty result.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::UnknownBook(_) | Self::ChapterNotFound(_))
    }
}

/// Translate a corpus error, keeping it as a child in the error tree.
#[track_caller]
pub(crate) fn corpus_error(err: CorpusError) -> Error {
    let kind = match &*err {
        CorpusErrorKind::Unavailable(_) => ErrorKind::CorpusUnavailable,
        CorpusErrorKind::Corrupt(_) => ErrorKind::CorpusCorrupt,
        CorpusErrorKind::UnknownBook(name) => ErrorKind::UnknownBook(name.clone()),
        CorpusErrorKind::ChapterNotFound(book, chapter) => {
            ErrorKind::ChapterNotFound(ChapterRef::new(*book, *chapter))
        },
        CorpusErrorKind::Io => ErrorKind::StorageIo,
        CorpusErrorKind::Closed => ErrorKind::StoreClosed,
    };
    err.raise(kind)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use scripture_corpus::BookId;
    use std::path::PathBuf;

    #[rstest]
    #[case(CorpusErrorKind::Unavailable(PathBuf::from("bible.sqlite")), ErrorKind::CorpusUnavailable)]
    #[case(CorpusErrorKind::Corrupt("unknown book label"), ErrorKind::CorpusCorrupt)]
    #[case(CorpusErrorKind::Io, ErrorKind::StorageIo)]
    #[case(CorpusErrorKind::Closed, ErrorKind::StoreClosed)]
    #[case(CorpusErrorKind::UnknownBook("hezekiah".into()), ErrorKind::UnknownBook("hezekiah".into()))]
    fn test_corpus_error_translation(#[case] from: CorpusErrorKind, #[case] to: ErrorKind) {
        assert_eq!(*corpus_error(CorpusError::from(from)), to);
    }

    #[test]
    fn test_chapter_not_found_display() {
        let genesis = BookId::parse("genesis").unwrap();
        let err = corpus_error(CorpusError::from(CorpusErrorKind::ChapterNotFound(genesis, 51)));
        assert_eq!((*err).to_string(), "chapter not found: Genesis 51");
        assert!(err.is_not_found());
        assert!(!err.is_retryable());
    }
}
