use scripture_corpus::ChapterRef;

/// Point-in-time cache counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    /// Entries dropped to make room (replacements and `clear` are not evictions).
    pub evictions: u64,
    pub len: usize,
    pub capacity: usize,
}
impl CacheStats {
    /// Hit rate between `0.0` and `1.0`.
    pub fn hit_rate(&self) -> f64 {
        match self.hits + self.misses {
            0 => 0.0,
            total => self.hits as f64 / total as f64,
        }
    }
}

/// Outcome of a best-effort preload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PreloadReport {
    /// Chapters now resident in the cache, in request order.
    pub loaded: Vec<ChapterRef>,
    /// Chapters that could not be fetched.
    pub failed: Vec<ChapterRef>,
}
impl PreloadReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}
