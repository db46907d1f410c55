//! Case- and diacritic-insensitive verse search.
//!
//! Searching is a plain substring match over folded verse text (see
//! [`fold`]). The folded text of every verse is computed once, when the
//! [`SearchCorpus`] is built, so a query is a single linear scan with no
//! allocation per verse. Results come back in canonical order (book, chapter,
//! verse) and are capped.
//!
//! Queries are expected to be driven by (debounced) typing, so a newer query
//! supersedes any older one still scanning.

mod engine;
pub mod error;
mod fold;
mod target;

pub use crate::engine::{
    DEFAULT_MAX_RESULTS, DEFAULT_MIN_QUERY_LENGTH, SearchEngine, SearchHit, SearchOptions, SearchOutcome,
};
pub use crate::fold::fold;
pub use crate::target::{SearchCorpus, SearchCorpusBuilder};
