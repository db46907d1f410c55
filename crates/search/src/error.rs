//! Search Error Types

use derive_more::{Display, Error};
use scripture_corpus::ChapterRef;

/// A search error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for search operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// The blocking scan task panicked or was cancelled by the runtime.
    #[display("search worker failed")]
    Worker,
    /// The same verse was pushed twice while building the scan target.
    #[display("repeated verse: {chapter}:{verse}")]
    RepeatedVerse { chapter: ChapterRef, verse: u32 },
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Worker)
    }
}
