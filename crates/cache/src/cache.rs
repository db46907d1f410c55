use crate::report::{CacheStats, PreloadReport};
use lru::LruCache;
use parking_lot::Mutex;
use scripture_corpus::{Chapter, ChapterRef};
use std::collections::HashSet;
use std::fmt::Display;
use std::num::NonZeroUsize;
use std::sync::Arc;
use time::UtcDateTime;

/// Default capacity, in chapters.
pub const DEFAULT_CAPACITY: usize = 32;

/// A cached chapter plus its access bookkeeping.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    chapter: Arc<Chapter>,
    last_access: UtcDateTime,
    hits: u64,
}
impl CacheEntry {
    fn new(chapter: Arc<Chapter>) -> Self {
        Self { chapter, last_access: UtcDateTime::now(), hits: 0 }
    }

    fn touch(&mut self) {
        self.last_access = UtcDateTime::now();
        self.hits += 1;
    }

    pub fn chapter(&self) -> &Arc<Chapter> {
        &self.chapter
    }

    /// When the entry was inserted or last returned by [`VerseCache::get`].
    pub fn last_access(&self) -> UtcDateTime {
        self.last_access
    }

    /// How many times the entry has been returned by [`VerseCache::get`].
    pub fn hits(&self) -> u64 {
        self.hits
    }
}

struct Inner {
    entries: LruCache<ChapterRef, CacheEntry>,
    // Bumped by every `clear`.
    epoch: u64,
    hits: u64,
    misses: u64,
    evictions: u64,
}
impl Inner {
    fn lookup(&mut self, key: &ChapterRef) -> Option<Arc<Chapter>> {
        match self.entries.get_mut(key) {
            Some(entry) => {
                entry.touch();
                self.hits += 1;
                Some(Arc::clone(&entry.chapter))
            },
            None => {
                self.misses += 1;
                None
            },
        }
    }

    fn insert(&mut self, key: ChapterRef, chapter: Arc<Chapter>) {
        if let Some((evicted, _)) = self.entries.push(key, CacheEntry::new(chapter))
            && evicted != key
        {
            self.evictions += 1;
            tracing::trace!(chapter = %evicted, "Evicted chapter from cache");
        }
    }
}

/// Thread-safe, bounded LRU cache of chapters.
///
/// Every operation takes a short synchronous lock; the lock is never held
/// while a chapter is being fetched, so a slow read of one chapter does not
/// block hits on others.
pub struct VerseCache {
    inner: Mutex<Inner>,
}

impl Default for VerseCache {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl VerseCache {
    /// Create a cache holding at most `capacity` chapters (at least one).
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        let inner = Inner { entries: LruCache::new(capacity), epoch: 0, hits: 0, misses: 0, evictions: 0 };
        Self { inner: Mutex::new(inner) }
    }

    /// Get a cached chapter, promoting it to most-recently-used.
    pub fn get(&self, key: &ChapterRef) -> Option<Arc<Chapter>> {
        self.inner.lock().lookup(key)
    }

    /// Look at an entry without promoting it or touching the statistics.
    pub fn peek(&self, key: &ChapterRef) -> Option<CacheEntry> {
        self.inner.lock().entries.peek(key).cloned()
    }

    pub fn contains(&self, key: &ChapterRef) -> bool {
        self.inner.lock().entries.contains(key)
    }

    /// Insert or replace a chapter, evicting the least recently used entry
    /// when the cache is full.
    pub fn put(&self, key: ChapterRef, chapter: Arc<Chapter>) {
        self.inner.lock().insert(key, chapter);
    }

    /// Return the cached chapter, or fetch and insert it on a miss.
    ///
    /// Nothing is inserted if `fetch` fails, or if the cache was cleared
    /// while `fetch` was running: the fetched chapter may predate the clear.
    pub async fn get_or_fetch<F, Fut, E>(&self, key: ChapterRef, fetch: F) -> Result<Arc<Chapter>, E>
    where
        F: FnOnce(ChapterRef) -> Fut,
        Fut: Future<Output = Result<Arc<Chapter>, E>>,
    {
        let epoch = {
            let mut inner = self.inner.lock();
            if let Some(chapter) = inner.lookup(&key) {
                return Ok(chapter);
            }
            inner.epoch
        };
        let chapter = fetch(key).await?;
        let mut inner = self.inner.lock();
        if inner.epoch == epoch {
            inner.insert(key, Arc::clone(&chapter));
        } else {
            tracing::trace!(chapter = %key, "Cache cleared during fetch, not inserting");
        }
        Ok(chapter)
    }

    /// Eagerly load `keys`, one at a time, in order.
    ///
    /// Best-effort: a chapter that fails to load is logged and recorded in the
    /// report, and the remaining keys are still attempted. Repeated keys are
    /// only loaded once.
    pub async fn preload<F, Fut, E>(&self, keys: impl IntoIterator<Item = ChapterRef>, mut fetch: F) -> PreloadReport
    where
        F: FnMut(ChapterRef) -> Fut,
        Fut: Future<Output = Result<Arc<Chapter>, E>>,
        E: Display,
    {
        let mut report = PreloadReport::default();
        let mut seen = HashSet::new();
        for key in keys {
            if !seen.insert(key) {
                continue;
            }
            match self.get_or_fetch(key, &mut fetch).await {
                Ok(_) => report.loaded.push(key),
                Err(err) => {
                    tracing::warn!(chapter = %key, error = %err, "Failed to preload chapter");
                    report.failed.push(key);
                },
            }
        }
        report
    }

    /// Drop every entry. Statistics are kept.
    pub fn clear(&self) {
        let mut inner = self.inner.lock();
        inner.entries.clear();
        inner.epoch += 1;
    }

    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.inner.lock().entries.cap().get()
    }

    pub fn stats(&self) -> CacheStats {
        let inner = self.inner.lock();
        CacheStats {
            hits: inner.hits,
            misses: inner.misses,
            evictions: inner.evictions,
            len: inner.entries.len(),
            capacity: inner.entries.cap().get(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use scripture_corpus::{BookId, Verse};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn key(chapter: u32) -> ChapterRef {
        ChapterRef::new(BookId::parse("genesis").unwrap(), chapter)
    }

    fn chapter(number: u32) -> Arc<Chapter> {
        let verses = vec![Verse::new(1, format!("Genesis {number}:1."))];
        Arc::new(Chapter::new(BookId::parse("genesis").unwrap(), number, verses).unwrap())
    }

    #[rstest]
    #[case(0, 1)]
    #[case(1, 1)]
    #[case(DEFAULT_CAPACITY, 32)]
    fn test_capacity(#[case] requested: usize, #[case] expected: usize) {
        assert_eq!(VerseCache::new(requested).capacity(), expected);
    }

    #[test]
    fn test_miss_then_hit() {
        let cache = VerseCache::default();
        assert!(cache.get(&key(1)).is_none());
        cache.put(key(1), chapter(1));
        let hit = cache.get(&key(1)).unwrap();
        assert_eq!(hit.number, 1);
        let stats = cache.stats();
        assert_eq!((stats.hits, stats.misses, stats.len), (1, 1, 1));
    }

    #[test]
    fn test_least_recently_used_is_evicted() {
        let cache = VerseCache::new(2);
        cache.put(key(1), chapter(1));
        cache.put(key(2), chapter(2));
        // Promote 1, so 2 becomes the eviction candidate.
        cache.get(&key(1));
        cache.put(key(3), chapter(3));
        assert!(cache.contains(&key(1)));
        assert!(!cache.contains(&key(2)));
        assert!(cache.contains(&key(3)));
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.stats().evictions, 1);
    }

    #[test]
    fn test_replacing_is_not_an_eviction() {
        let cache = VerseCache::new(1);
        cache.put(key(1), chapter(1));
        cache.put(key(1), chapter(1));
        assert_eq!(cache.stats().evictions, 0);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_access_bookkeeping() {
        let cache = VerseCache::default();
        cache.put(key(1), chapter(1));
        let inserted = cache.peek(&key(1)).unwrap();
        assert_eq!(inserted.hits(), 0);
        cache.get(&key(1));
        cache.get(&key(1));
        let touched = cache.peek(&key(1)).unwrap();
        assert_eq!(touched.hits(), 2);
        assert!(touched.last_access() >= inserted.last_access());
        // Peeking does not count as a hit.
        assert_eq!(cache.stats().hits, 2);
    }

    #[tokio::test]
    async fn test_get_or_fetch_fetches_once() {
        let cache = VerseCache::default();
        let fetches = AtomicUsize::new(0);
        for _ in 0..3 {
            let result: Result<_, String> = cache
                .get_or_fetch(key(7), |k| {
                    fetches.fetch_add(1, Ordering::SeqCst);
                    async move { Ok(chapter(k.chapter)) }
                })
                .await;
            assert_eq!(result.unwrap().number, 7);
        }
        assert_eq!(fetches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failed_fetch_is_not_cached() {
        let cache = VerseCache::default();
        let result = cache.get_or_fetch(key(1), |_| async { Err::<Arc<Chapter>, _>("storage I/O error") }).await;
        assert!(result.is_err());
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_fetch_spanning_clear_is_not_cached() {
        let cache = VerseCache::default();
        let result: Result<_, String> = cache
            .get_or_fetch(key(4), |k| {
                // Cleared after the miss, before the fetch completes.
                cache.clear();
                async move { Ok(chapter(k.chapter)) }
            })
            .await;
        assert_eq!(result.unwrap().number, 4);
        assert!(!cache.contains(&key(4)));
        // The next miss is cached as usual.
        let result: Result<_, String> = cache.get_or_fetch(key(4), |k| async move { Ok(chapter(k.chapter)) }).await;
        assert!(result.is_ok());
        assert!(cache.contains(&key(4)));
    }

    #[tokio::test]
    async fn test_preload_is_best_effort() {
        let cache = VerseCache::default();
        let keys = [key(1), key(2), key(1), key(3)];
        let report = cache
            .preload(keys, |k| async move {
                match k.chapter {
                    2 => Err("chapter not found"),
                    n => Ok(chapter(n)),
                }
            })
            .await;
        assert_eq!(report.loaded, vec![key(1), key(3)]);
        assert_eq!(report.failed, vec![key(2)]);
        assert!(!report.is_complete());
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_clear() {
        let cache = VerseCache::default();
        cache.put(key(1), chapter(1));
        cache.put(key(2), chapter(2));
        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.stats().evictions, 0);
    }
}
