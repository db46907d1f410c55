//! Embedded scripture data store.
//!
//! [`BibleStore`] ties the other crates together: it opens the bundled corpus
//! (`scripture-corpus`), builds a [`BookIndex`] and a search scan target from
//! a single pass over the verses, serves chapters through a bounded LRU cache
//! (`scripture-cache`), and runs verse searches (`scripture-search`).
//!
//! # Example
//!
//! ```no_run
//! use scripture_config::Config;
//! use scripture_store::BibleStore;
//! # async fn example() -> scripture_store::error::Result<()> {
//! let store = BibleStore::from_config(&Config::default())?;
//! store.initialize_bible_data().await?;
//! assert_eq!(store.get_book_chapters("genesis").await?, 50);
//! let verses = store.get_chapter("genesis", 1).await?;
//! let hits = store.search_bible("in the beginning").await;
//! store.close_bible_database().await;
//! # Ok(())
//! # }
//! ```
//!
//! Failures are reported using the taxonomy in [`error::ErrorKind`]. The
//! lenient read API (`get_chapter`, `get_book_chapters`, `search_bible`)
//! turns "does not exist" into empty results; the strict API
//! ([`BibleStore::chapter`], [`BibleStore::search`]) reports it.

pub mod error;
mod index;
mod options;
mod store;

pub use crate::index::{Book, BookIndex};
pub use crate::options::StoreOptions;
pub use crate::store::{BibleStore, State};
pub use scripture_cache::{CacheStats, PreloadReport};
pub use scripture_corpus::{BookId, Chapter, ChapterRef, CorpusInfo, Testament, Verse};
pub use scripture_search::{SearchHit, SearchOutcome};
