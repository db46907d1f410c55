use crate::error::{Error, ErrorKind, Result, corpus_error};
use crate::index::{Book, BookIndex};
use crate::options::StoreOptions;
use derive_more::Display;
use exn::{OptionExt, ResultExt};
use parking_lot::Mutex;
use scripture_cache::{CacheStats, PreloadReport, VerseCache};
use scripture_config::Config;
use scripture_corpus::{Chapter, ChapterRef, CorpusHandle, CorpusInfo, LoaderHandle, SqliteLoader, Verse};
use scripture_search::{SearchCorpus, SearchEngine, SearchHit, SearchOutcome};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::instrument;

/// Observable lifecycle state.
///
/// A reset goes `Ready → Resetting → Initializing → Ready`: `Resetting` while
/// the cache is dropped and the old handle closed, `Initializing` while the
/// corpus is reopened and indexed.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
pub enum State {
    #[display("uninitialized")]
    Uninitialized,
    /// Opening and indexing the corpus, on first use or as part of a reset.
    #[display("initializing")]
    Initializing,
    #[display("ready")]
    Ready,
    /// Tearing down the previous handle before reopening.
    #[display("resetting")]
    Resetting,
    #[display("closing")]
    Closing,
    #[display("closed")]
    Closed,
}

/// Everything that belongs to one opened corpus. Replaced as a whole on
/// reset, so readers never see a handle paired with another handle's index.
struct Loaded {
    corpus: CorpusHandle,
    index: BookIndex,
    search: Arc<SearchCorpus>,
}

type Outcome = std::result::Result<Arc<Loaded>, ErrorKind>;
type Pending = watch::Receiver<Option<Outcome>>;

enum Role {
    Leader(watch::Sender<Option<Outcome>>),
    Follower(Pending),
}

enum Phase {
    Uninitialized,
    Initializing(Pending),
    Ready(Arc<Loaded>),
    Resetting(Pending),
    Closing,
    Closed,
}

/// The scripture data store.
///
/// Owns the corpus loader, the book index, the verse cache and the search
/// engine, and drives them through the lifecycle:
///
/// ```text
/// Uninitialized → Initializing → Ready → Closing → Closed
///                      ↑           │
///                      └ Resetting ┘
/// ```
///
/// All operations take `&self`; share the store behind an [`Arc`] as needed.
/// The lifecycle lock is synchronous and never held across an `.await`.
pub struct BibleStore {
    loader: LoaderHandle,
    options: StoreOptions,
    cache: VerseCache,
    search: SearchEngine,
    phase: Mutex<Phase>,
}

impl BibleStore {
    pub fn new(loader: LoaderHandle, options: StoreOptions) -> Self {
        Self {
            loader,
            cache: VerseCache::new(options.cache_capacity),
            search: SearchEngine::new(options.search),
            options,
            phase: Mutex::new(Phase::Uninitialized),
        }
    }

    /// Store reading the SQLite asset named in the configuration.
    pub fn from_config(config: &Config) -> Result<Self> {
        let options = StoreOptions::try_from(config)?;
        let loader = SqliteLoader::new(&config.corpus.path).with_integrity_check(config.corpus.verify_integrity);
        Ok(Self::new(Arc::new(loader), options))
    }

    pub fn options(&self) -> &StoreOptions {
        &self.options
    }

    pub fn state(&self) -> State {
        match &*self.phase.lock() {
            Phase::Uninitialized => State::Uninitialized,
            Phase::Initializing(_) => State::Initializing,
            Phase::Ready(_) => State::Ready,
            Phase::Resetting(_) => State::Resetting,
            Phase::Closing => State::Closing,
            Phase::Closed => State::Closed,
        }
    }

    // Lifecycle.

    /// Open the corpus and build the index.
    ///
    /// Concurrent callers share a single initialization and all observe its
    /// result. Returns immediately if the store is already ready. A corrupt
    /// corpus is retried once with a fresh handle before giving up.
    pub async fn initialize(&self) -> Result<()> {
        let role = {
            let mut phase = self.phase.lock();
            match &*phase {
                Phase::Ready(_) => return Ok(()),
                Phase::Closing => exn::bail!(ErrorKind::StoreClosed),
                // A pending load whose leader is gone (its future was dropped)
                // is abandoned; take it over.
                Phase::Initializing(pending) | Phase::Resetting(pending) if pending.has_changed().is_ok() => {
                    Role::Follower(pending.clone())
                },
                Phase::Uninitialized | Phase::Closed | Phase::Initializing(_) | Phase::Resetting(_) => {
                    let (tx, rx) = watch::channel(None);
                    *phase = Phase::Initializing(rx);
                    Role::Leader(tx)
                },
            }
        };
        match role {
            Role::Follower(pending) => Self::wait(pending).await.map(|_| ()),
            Role::Leader(leader) => {
                tracing::info!(loader = self.loader.name(), "Initializing scripture store");
                let result = self.load_with_retry().await;
                self.publish(leader, result).await.map(|_| ())
            },
        }
    }

    /// Tear down and rebuild: clear the cache, close the corpus handle, then
    /// reopen it and rebuild the index.
    ///
    /// Only valid when ready. If rebuilding fails the store is left
    /// uninitialized.
    pub async fn reset(&self) -> Result<()> {
        let (leader, previous) = {
            let mut phase = self.phase.lock();
            let previous = match &*phase {
                Phase::Ready(loaded) => Arc::clone(loaded),
                Phase::Closing | Phase::Closed => exn::bail!(ErrorKind::StoreClosed),
                Phase::Uninitialized | Phase::Initializing(_) | Phase::Resetting(_) => {
                    exn::bail!(ErrorKind::NotReady)
                },
            };
            let (tx, rx) = watch::channel(None);
            *phase = Phase::Resetting(rx);
            // Cleared under the phase lock: a reader can only insert while
            // holding it and seeing its own snapshot as current.
            self.cache.clear();
            (tx, previous)
        };
        tracing::info!(loader = self.loader.name(), "Resetting scripture store");
        self.search.cancel();
        previous.corpus.close().await;
        {
            let mut phase = self.phase.lock();
            if let Phase::Resetting(pending) = &*phase
                && pending.same_channel(&leader.subscribe())
            {
                *phase = Phase::Initializing(pending.clone());
            }
        }
        let result = self.load_with_retry().await;
        self.publish(leader, result).await.map(|_| ())
    }

    /// Release the corpus handle and clear the cache.
    ///
    /// Valid in any state and idempotent. An initialization or reset still in
    /// flight discards its result and reports
    /// [`StoreClosed`](ErrorKind::StoreClosed).
    pub async fn close(&self) {
        let previous = {
            let mut phase = self.phase.lock();
            let previous = match std::mem::replace(&mut *phase, Phase::Closing) {
                Phase::Ready(loaded) => Some(loaded),
                Phase::Closing => return,
                Phase::Closed => {
                    *phase = Phase::Closed;
                    return;
                },
                Phase::Uninitialized | Phase::Initializing(_) | Phase::Resetting(_) => None,
            };
            self.cache.clear();
            previous
        };
        self.search.cancel();
        if let Some(loaded) = previous {
            loaded.corpus.close().await;
        }
        *self.phase.lock() = Phase::Closed;
        tracing::info!("Closed scripture store");
    }

    /// Eagerly cache chapter 1 of the first book, the configured hot chapters
    /// and `extra` (e.g. the last reading position).
    ///
    /// Best-effort: never fails. When the store is not ready nothing is
    /// loaded and a warning is logged.
    #[instrument(skip_all)]
    pub async fn preload_frequently_accessed_data(
        &self,
        extra: impl IntoIterator<Item = ChapterRef>,
    ) -> PreloadReport {
        let loaded = match self.snapshot() {
            Ok(loaded) => loaded,
            Err(err) => {
                tracing::warn!(error = %*err, "Skipping preload");
                return PreloadReport::default();
            },
        };
        let keys: Vec<ChapterRef> = loaded
            .index
            .first_chapter()
            .into_iter()
            .chain(self.options.hot_chapters.iter().copied())
            .chain(extra)
            .collect();
        let report = self
            .cache
            .preload(keys, |key| {
                let loaded = Arc::clone(&loaded);
                async move {
                    // The cache skips the insert if it was cleared since the
                    // miss, so past this check a stale chapter is never kept.
                    if !self.is_current(&loaded) {
                        return Err(ErrorKind::NotReady);
                    }
                    if !loaded.index.contains(key) {
                        return Err(ErrorKind::ChapterNotFound(key));
                    }
                    self.fetch_chapter(loaded, key).await.map_err(|err| (*err).clone())
                }
            })
            .await;
        tracing::info!(loaded = report.loaded.len(), failed = report.failed.len(), "Preloaded chapters");
        report
    }

    pub async fn initialize_bible_data(&self) -> Result<()> {
        self.initialize().await
    }

    pub async fn reset_database(&self) -> Result<()> {
        self.reset().await
    }

    pub async fn close_bible_database(&self) {
        self.close().await
    }

    // Reads.

    /// Number of chapters in a book, or `0` if the corpus has no such book.
    pub async fn get_book_chapters(&self, book: &str) -> Result<u32> {
        let loaded = self.ready().await?;
        match loaded.index.book(book) {
            Some(book) => Ok(book.chapter_count),
            None => {
                tracing::debug!(book, "Unknown book");
                Ok(0)
            },
        }
    }

    /// Verses of a chapter in ascending order, or nothing if the book or
    /// chapter does not exist.
    pub async fn get_chapter(&self, book: &str, chapter: u32) -> Result<Vec<Verse>> {
        match self.chapter(book, chapter).await {
            Ok(chapter) => Ok(chapter.verses().to_vec()),
            Err(err) if err.is_not_found() => {
                tracing::debug!(book, chapter, error = %*err, "Chapter not found");
                Ok(Vec::new())
            },
            Err(err) => Err(err),
        }
    }

    /// Like [`get_chapter`](Self::get_chapter), but a missing book or chapter
    /// is an error, and the payload is shared with the cache.
    pub async fn chapter(&self, book: &str, chapter: u32) -> Result<Arc<Chapter>> {
        let loaded = self.ready().await?;
        let id = loaded.index.book(book).ok_or_raise(|| ErrorKind::UnknownBook(book.to_string()))?.id;
        let key = ChapterRef::new(id, chapter);
        if !loaded.index.contains(key) {
            exn::bail!(ErrorKind::ChapterNotFound(key));
        }
        if let Some(chapter) = self.cache.get(&key) {
            return Ok(chapter);
        }
        self.fetch_chapter(loaded, key).await
    }

    /// A single verse, or `None` if it does not exist.
    pub async fn get_verse(&self, book: &str, chapter: u32, verse: u32) -> Result<Option<Verse>> {
        match self.chapter(book, chapter).await {
            Ok(chapter) => Ok(chapter.verse(verse).cloned()),
            Err(err) if err.is_not_found() => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// Books present in the corpus, in canonical order.
    pub async fn books(&self) -> Result<Vec<Book>> {
        Ok(self.ready().await?.index.book_order().to_vec())
    }

    pub async fn corpus_info(&self) -> Result<CorpusInfo> {
        Ok(self.ready().await?.corpus.info().clone())
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    // Search.

    /// Search verse text, superseding any search still in flight.
    pub async fn search(&self, query: &str) -> Result<SearchOutcome> {
        let loaded = self.ready().await?;
        let outcome = self.search.search(Arc::clone(&loaded.search), query).await;
        outcome.map_err(|err| err.raise(ErrorKind::SearchFailed))
    }

    /// Search verse text. Never fails: errors and superseded searches yield
    /// no hits.
    pub async fn search_bible(&self, query: &str) -> Vec<SearchHit> {
        match self.search(query).await {
            Ok(outcome) => outcome.into_hits(),
            Err(err) => {
                tracing::warn!(error = %*err, "Search failed");
                Vec::new()
            },
        }
    }

    // Internals.

    /// Open, index and seed search, retrying once on corruption.
    async fn load_with_retry(&self) -> Result<Arc<Loaded>> {
        match self.load().await {
            Err(err) if *err == ErrorKind::CorpusCorrupt => {
                tracing::warn!("Corpus failed validation, retrying with a fresh handle");
                self.load().await
            },
            result => result,
        }
    }

    #[instrument(skip_all, fields(loader = self.loader.name()))]
    async fn load(&self) -> Result<Arc<Loaded>> {
        let corpus = self.loader.open().await.map_err(corpus_error)?;
        let mut search = SearchCorpus::builder();
        let built = match BookIndex::build(corpus.as_ref(), &mut search).await {
            Ok(index) => match search.build() {
                Ok(search) => Ok((index, search)),
                Err(err) => Err(err.raise(ErrorKind::CorpusCorrupt)),
            },
            Err(err) => Err(err),
        };
        match built {
            Ok((index, search)) => Ok(Arc::new(Loaded { corpus, index, search: Arc::new(search) })),
            Err(err) => {
                corpus.close().await;
                Err(err)
            },
        }
    }

    /// Install the result of a load we lead, unless the store was closed
    /// while loading, in which case the new handle is closed again.
    async fn publish(
        &self,
        leader: watch::Sender<Option<Outcome>>,
        result: Result<Arc<Loaded>>,
    ) -> Result<Arc<Loaded>> {
        let ours = leader.subscribe();
        let current = {
            let mut phase = self.phase.lock();
            let current = matches!(
                &*phase,
                Phase::Initializing(pending) | Phase::Resetting(pending) if pending.same_channel(&ours)
            );
            if current {
                *phase = match &result {
                    Ok(loaded) => Phase::Ready(Arc::clone(loaded)),
                    Err(_) => Phase::Uninitialized,
                };
            }
            current
        };
        let result = match (current, result) {
            (true, result) => result,
            (false, Ok(loaded)) => {
                loaded.corpus.close().await;
                Err(Error::from(ErrorKind::StoreClosed))
            },
            (false, Err(err)) => Err(err.raise(ErrorKind::StoreClosed)),
        };
        match &result {
            Ok(loaded) => tracing::info!(books = loaded.index.book_order().len(), "Scripture store ready"),
            Err(err) => tracing::warn!(error = %**err, "Scripture store failed to load"),
        }
        leader.send_replace(Some(result.as_ref().map(Arc::clone).map_err(|err| (**err).clone())));
        result
    }

    /// Wait for a load led by someone else.
    async fn wait(mut pending: Pending) -> Result<Arc<Loaded>> {
        let outcome = pending.wait_for(Option::is_some).await.or_raise(|| ErrorKind::NotReady)?.clone();
        match outcome {
            Some(Ok(loaded)) => Ok(loaded),
            Some(Err(kind)) => Err(Error::from(kind)),
            None => exn::bail!(ErrorKind::NotReady),
        }
    }

    /// The current snapshot, without waiting.
    fn snapshot(&self) -> Result<Arc<Loaded>> {
        match &*self.phase.lock() {
            Phase::Ready(loaded) => Ok(Arc::clone(loaded)),
            Phase::Closing | Phase::Closed => exn::bail!(ErrorKind::StoreClosed),
            Phase::Uninitialized | Phase::Initializing(_) | Phase::Resetting(_) => exn::bail!(ErrorKind::NotReady),
        }
    }

    /// The current snapshot, waiting for an initialization or reset in flight.
    async fn ready(&self) -> Result<Arc<Loaded>> {
        let pending = match &*self.phase.lock() {
            Phase::Initializing(pending) | Phase::Resetting(pending) => pending.clone(),
            Phase::Ready(loaded) => return Ok(Arc::clone(loaded)),
            Phase::Closing | Phase::Closed => exn::bail!(ErrorKind::StoreClosed),
            Phase::Uninitialized => exn::bail!(ErrorKind::NotReady),
        };
        Self::wait(pending).await
    }

    fn is_current(&self, loaded: &Arc<Loaded>) -> bool {
        matches!(&*self.phase.lock(), Phase::Ready(current) if Arc::ptr_eq(current, loaded))
    }

    /// Cache a chapter unless the handle it was read from has been replaced.
    ///
    /// The check and the insert happen under the phase lock, which is also
    /// held by `reset` and `close` while they clear the cache.
    fn cache_if_current(&self, loaded: &Arc<Loaded>, key: ChapterRef, chapter: &Arc<Chapter>) {
        let phase = self.phase.lock();
        if matches!(&*phase, Phase::Ready(current) if Arc::ptr_eq(current, loaded)) {
            self.cache.put(key, Arc::clone(chapter));
        }
    }

    /// Read a chapter from storage and cache it.
    ///
    /// A transient I/O failure is retried once. A corrupt read resets the
    /// store once and retries against the fresh handle; so does a read that
    /// raced with a reset and hit the old, closed handle.
    async fn fetch_chapter(&self, mut loaded: Arc<Loaded>, key: ChapterRef) -> Result<Arc<Chapter>> {
        let mut retried_io = false;
        let mut recovered = false;
        loop {
            let err = match loaded.corpus.read_chapter(key.book, key.chapter).await {
                Ok(chapter) => {
                    let chapter = Arc::new(chapter);
                    self.cache_if_current(&loaded, key, &chapter);
                    return Ok(chapter);
                },
                Err(err) => corpus_error(err),
            };
            match &*err {
                ErrorKind::StorageIo if !retried_io => {
                    tracing::warn!(chapter = %key, "Chapter read failed, retrying");
                    retried_io = true;
                },
                ErrorKind::CorpusCorrupt if !recovered => {
                    tracing::warn!(chapter = %key, "Chapter read found corruption, resetting store");
                    recovered = true;
                    if self.is_current(&loaded) {
                        match self.reset().await {
                            Err(reset) if *reset != ErrorKind::NotReady => return Err(reset),
                            _ => {},
                        }
                    }
                    loaded = self.ready().await?;
                },
                ErrorKind::StoreClosed if !recovered && !self.is_current(&loaded) => {
                    recovered = true;
                    loaded = self.ready().await?;
                },
                _ => return Err(err),
            }
        }
    }
}
