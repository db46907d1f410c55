//! In-memory chapter cache.
//!
//! Chapters are the unit of reading, so they are also the unit of caching:
//! the cache maps a [`ChapterRef`](scripture_corpus::ChapterRef) to an
//! immutable, shared [`Chapter`](scripture_corpus::Chapter). Capacity is
//! counted in chapters and the least recently used chapter is evicted first.
//!
//! The cache is memory-only. It is never persisted and is cleared whenever
//! the underlying corpus handle is replaced or released.

mod cache;
mod report;

pub use crate::cache::{CacheEntry, DEFAULT_CAPACITY, VerseCache};
pub use crate::report::{CacheStats, PreloadReport};
