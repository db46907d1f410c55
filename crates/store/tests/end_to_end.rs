use scripture_config::Config;
use scripture_corpus::fixture::{SAMPLE_TRANSLATION, sample_rows, write_corpus, write_sample_corpus};
use scripture_store::error::ErrorKind;
use scripture_store::{BibleStore, BookId, ChapterRef, State};
use tempfile::TempDir;

async fn sample_store(dir: &TempDir) -> BibleStore {
    let path = dir.path().join("bible.sqlite");
    write_sample_corpus(&path).await.unwrap();
    let mut config = Config::default();
    config.corpus.path = path;
    config.preload.chapters = vec!["John 3".to_string()];
    BibleStore::from_config(&config).unwrap()
}

#[tokio::test]
async fn test_sqlite_corpus_end_to_end() {
    let dir = TempDir::new().unwrap();
    let store = sample_store(&dir).await;
    store.initialize_bible_data().await.unwrap();
    assert_eq!(store.state(), State::Ready);
    assert_eq!(store.corpus_info().await.unwrap().translation.as_deref(), Some(SAMPLE_TRANSLATION));

    assert_eq!(store.get_book_chapters("Genesis").await.unwrap(), 50);
    assert_eq!(store.get_book_chapters("exodus").await.unwrap(), 0);
    let verses = store.get_chapter("genesis", 1).await.unwrap();
    assert_eq!(verses.len(), 5);
    assert!(verses[0].text.starts_with("In the beginning"));

    let hits = store.search_bible("beginning").await;
    let hits: Vec<_> = hits.iter().map(|hit| (hit.book.key(), hit.chapter, hit.verse)).collect();
    assert_eq!(hits, vec![("genesis", 1, 1), ("john", 1, 1), ("john", 1, 2)]);

    let john = BookId::parse("john").unwrap();
    let report = store.preload_frequently_accessed_data([ChapterRef::new(john, 2)]).await;
    assert!(report.is_complete());
    assert_eq!(report.loaded.len(), 3);

    store.close_bible_database().await;
    assert_eq!(*store.get_chapter("genesis", 1).await.unwrap_err(), ErrorKind::StoreClosed);
}

#[tokio::test]
async fn test_missing_asset_is_unavailable() {
    let dir = TempDir::new().unwrap();
    let mut config = Config::default();
    config.corpus.path = dir.path().join("missing.sqlite");
    let store = BibleStore::from_config(&config).unwrap();
    assert_eq!(*store.initialize().await.unwrap_err(), ErrorKind::CorpusUnavailable);
    assert_eq!(store.state(), State::Uninitialized);
}

#[tokio::test]
async fn test_reset_against_sqlite() {
    let dir = TempDir::new().unwrap();
    let store = sample_store(&dir).await;
    store.initialize().await.unwrap();
    store.get_chapter("ruth", 1).await.unwrap();
    store.reset_database().await.unwrap();
    assert_eq!(store.cache_stats().len, 0);
    assert_eq!(store.get_chapter("ruth", 1).await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_repeated_verse_is_corrupt() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("bible.sqlite");
    let mut rows = sample_rows();
    rows.push(("John", 3, 16, "For God so loved the world.".to_string()));
    write_corpus(&path, SAMPLE_TRANSLATION, rows).await.unwrap();
    let mut config = Config::default();
    config.corpus.path = path;
    let store = BibleStore::from_config(&config).unwrap();
    assert_eq!(*store.initialize().await.unwrap_err(), ErrorKind::CorpusCorrupt);
    assert_eq!(store.state(), State::Uninitialized);
}
