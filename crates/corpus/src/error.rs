//! Corpus Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use crate::book::BookId;
use derive_more::{Display, Error};
use std::path::PathBuf;

/// A corpus error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for corpus operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// The asset is missing or cannot be opened. Nothing works without it.
    #[display("corpus unavailable: {}", _0.display())]
    Unavailable(#[error(not(source))] PathBuf),
    /// The asset opened but failed structural validation, or a row did not
    /// survive the typed parse step.
    #[display("corpus corrupt: {_0}")]
    Corrupt(#[error(not(source))] &'static str),
    /// The name does not resolve to any canonical book.
    #[display("unknown book: {_0}")]
    UnknownBook(#[error(not(source))] String),
    /// The book exists but the corpus holds no such chapter.
    #[display("chapter not found: {_0} {_1}")]
    ChapterNotFound(#[error(not(source))] BookId, #[error(not(source))] u32),
    /// Transient read failure.
    #[display("storage I/O error")]
    Io,
    /// The handle was used after [`Corpus::close`](crate::Corpus::close).
    #[display("corpus handle closed")]
    Closed,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Io)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_kind_display() {
        let genesis = BookId::parse("genesis").unwrap();
        assert_eq!(ErrorKind::ChapterNotFound(genesis, 51).to_string(), "chapter not found: genesis 51");
        assert_eq!(ErrorKind::Corrupt("empty verse text").to_string(), "corpus corrupt: empty verse text");
        assert_eq!(ErrorKind::UnknownBook("hezekiah".to_string()).to_string(), "unknown book: hezekiah");
    }

    #[test]
    fn error_kind_retryable() {
        assert!(ErrorKind::Io.is_retryable());
        assert!(!ErrorKind::Closed.is_retryable());
        assert!(!ErrorKind::Corrupt("schema").is_retryable());
    }
}
