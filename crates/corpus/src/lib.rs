//! Read-only access to the bundled scripture corpus.
//!
//! The corpus is a single SQLite asset shipped with the application. This
//! crate knows how to open it, validate it, and read it back as strongly-typed
//! entities; it does no caching of its own.
//!
//! # Architecture
//! - **Book catalog**: the fixed 66-book canon. Every book name coming out of
//!   the asset or in from a caller is resolved to a [`BookId`] first.
//! - **Loader / Corpus**: a [`CorpusLoader`] opens the asset into a
//!   [`Corpus`] handle. Handles are cheap to drop and replace, which is how
//!   the lifecycle owner implements reset.
//! - **Rows**: raw storage rows are parsed into [`VerseRecord`]s before they
//!   reach anything else, so a malformed asset surfaces as
//!   [`Corrupt`](error::ErrorKind::Corrupt) instead of a panic.

mod book;
pub mod error;
#[cfg(any(test, feature = "fixture"))]
pub mod fixture;
mod loader;
#[cfg(any(test, feature = "mock"))]
mod mock;
mod models;
mod rows;
mod sqlite;

pub use crate::book::{BookId, CANON_LEN, ChapterRef, Testament, normalize as normalize_book_name};
pub use crate::loader::{Corpus, CorpusHandle, CorpusLoader, LoaderHandle, VerseStream};
#[cfg(any(test, feature = "mock"))]
pub use crate::mock::MockLoader;
pub use crate::models::{Chapter, CorpusInfo, Verse, VerseRecord};
pub use crate::sqlite::{SCHEMA_VERSION, SqliteCorpus, SqliteLoader};
