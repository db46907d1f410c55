use crate::error::{Error, ErrorKind};
use scripture_cache::DEFAULT_CAPACITY;
use scripture_config::Config;
use scripture_corpus::{BookId, ChapterRef};
use scripture_search::SearchOptions;

/// Tunables for a [`BibleStore`](crate::BibleStore).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreOptions {
    /// Chapters kept in the verse cache.
    pub cache_capacity: usize,
    pub search: SearchOptions,
    /// Chapters preloaded by
    /// [`preload_frequently_accessed_data`](crate::BibleStore::preload_frequently_accessed_data),
    /// after chapter 1 of the first book.
    pub hot_chapters: Vec<ChapterRef>,
}
impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            cache_capacity: DEFAULT_CAPACITY,
            search: SearchOptions::default(),
            hot_chapters: BookId::parse("genesis").map(|genesis| ChapterRef::new(genesis, 1)).into_iter().collect(),
        }
    }
}
impl TryFrom<&Config> for StoreOptions {
    type Error = Error;
    fn try_from(config: &Config) -> Result<Self, Self::Error> {
        let hot_chapters = config.preload_chapters().map_err(|err| err.raise(ErrorKind::InvalidConfig))?;
        Ok(Self {
            cache_capacity: config.cache.capacity,
            search: SearchOptions {
                max_results: config.search.max_results,
                min_query_length: config.search.min_query_length,
            },
            hot_chapters,
        })
    }
}
