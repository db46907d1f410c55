//! SQLite-backed corpus.
//!
//! The bundled asset is a plain SQLite database opened read-only. Opening it
//! validates the structure up front so that a broken asset is reported once,
//! at startup, instead of on every read.

use crate::book::BookId;
use crate::error::{Error, ErrorKind, Result};
use crate::loader::{Corpus, CorpusHandle, CorpusLoader, VerseStream};
use crate::models::{Chapter, CorpusInfo, VerseRecord};
use crate::rows::VerseRow;
use async_stream::stream;
use async_trait::async_trait;
use exn::OptionExt;
use futures::StreamExt;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::instrument;

/// Schema version this crate understands.
pub const SCHEMA_VERSION: u32 = 1;
const REQUIRED_COLUMNS: [&str; 4] = ["book", "chapter", "verse", "text"];
// Reads are short and mostly served from the verse cache; a couple of
// connections is plenty for a single reader.
const MAX_CONNECTIONS: u32 = 2;
const SQLITE_CORRUPT: i32 = 11;
const SQLITE_NOTADB: i32 = 26;

/// Translate a raw `sqlx` error into an actionable kind, keeping the `sqlx` error
/// as a child in the error tree.
fn sqlx_error(err: sqlx::Error, fallback: ErrorKind) -> Error {
    let kind = classify(&err, fallback);
    exn::Exn::from(err).raise(kind)
}

fn classify(err: &sqlx::Error, fallback: ErrorKind) -> ErrorKind {
    match err {
        sqlx::Error::Io(_) | sqlx::Error::PoolTimedOut | sqlx::Error::WorkerCrashed => ErrorKind::Io,
        sqlx::Error::PoolClosed => ErrorKind::Closed,
        sqlx::Error::ColumnDecode { .. }
        | sqlx::Error::ColumnNotFound(_)
        | sqlx::Error::Decode(_)
        | sqlx::Error::TypeNotFound { .. } => ErrorKind::Corrupt("unexpected row shape"),
        sqlx::Error::Database(db) => match db.code().and_then(|code| code.parse::<i32>().ok()) {
            // Extended result codes keep the primary code in the low byte.
            Some(code) if matches!(code & 0xff, SQLITE_CORRUPT | SQLITE_NOTADB) => {
                ErrorKind::Corrupt("not a valid database")
            },
            _ => fallback,
        },
        _ => fallback,
    }
}

/// Opens the bundled SQLite asset at a fixed path.
#[derive(Debug, Clone)]
pub struct SqliteLoader {
    path: PathBuf,
    name: String,
    verify_integrity: bool,
}
impl SqliteLoader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        Self { name: path.display().to_string(), path, verify_integrity: true }
    }

    /// Whether to run `PRAGMA quick_check` when opening (default: `true`).
    pub fn with_integrity_check(mut self, verify: bool) -> Self {
        self.verify_integrity = verify;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl CorpusLoader for SqliteLoader {
    fn name(&self) -> &str {
        &self.name
    }

    async fn open(&self) -> Result<CorpusHandle> {
        let corpus = SqliteCorpus::open(&self.path, self.verify_integrity).await?;
        Ok(Arc::new(corpus))
    }
}

/// An opened, validated SQLite corpus.
#[derive(Debug)]
pub struct SqliteCorpus {
    pool: SqlitePool,
    info: CorpusInfo,
    // Book label exactly as stored in the asset, for querying by book.
    labels: HashMap<BookId, String>,
    closed: AtomicBool,
}

impl SqliteCorpus {
    /// Open the asset at `path` read-only and validate its structure.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub async fn open(path: impl AsRef<Path>, verify_integrity: bool) -> Result<Self> {
        let path = path.as_ref();
        let unavailable = || ErrorKind::Unavailable(path.to_path_buf());
        match tokio::fs::metadata(path).await {
            Ok(meta) if meta.is_file() => {},
            Ok(_) => exn::bail!(unavailable()),
            Err(err) => return Err(exn::Exn::from(err).raise(unavailable())),
        }
        let pool = SqlitePoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .connect_with(Self::base_options().filename(path))
            .await
            .map_err(|err| sqlx_error(err, unavailable()))?;
        match Self::validate(&pool, verify_integrity).await {
            Ok((info, labels)) => {
                tracing::debug!(translation = ?info.translation, books = labels.len(), "Opened corpus");
                Ok(Self { pool, info, labels, closed: AtomicBool::new(false) })
            },
            Err(err) => {
                pool.close().await;
                Err(err)
            },
        }
    }

    /// Connection options for the read-only asset.
    fn base_options() -> SqliteConnectOptions {
        SqliteConnectOptions::new()
            // The asset ships with the application and is never written to.
            .read_only(true)
            .create_if_missing(false)
            .busy_timeout(std::time::Duration::from_millis(500))
    }

    async fn validate(pool: &SqlitePool, verify_integrity: bool) -> Result<(CorpusInfo, HashMap<BookId, String>)> {
        let schema_error = |err| sqlx_error(err, ErrorKind::Corrupt("unexpected schema"));

        let columns: Vec<String> = sqlx::query_scalar(include_str!("../queries/verse_columns.sql"))
            .fetch_all(pool)
            .await
            .map_err(schema_error)?;
        if !REQUIRED_COLUMNS.iter().all(|required| columns.iter().any(|column| column == required)) {
            exn::bail!(ErrorKind::Corrupt("verses table is missing required columns"));
        }

        let version: Option<String> = sqlx::query_scalar(include_str!("../queries/get_metadata.sql"))
            .bind("schema_version")
            .fetch_optional(pool)
            .await
            .map_err(schema_error)?;
        let schema_version = version
            .and_then(|v| v.trim().parse::<u32>().ok())
            .ok_or_raise(|| ErrorKind::Corrupt("missing schema version marker"))?;
        if schema_version != SCHEMA_VERSION {
            tracing::warn!(found = schema_version, expected = SCHEMA_VERSION, "Unsupported corpus schema version");
            exn::bail!(ErrorKind::Corrupt("unsupported schema version"));
        }
        let translation: Option<String> = sqlx::query_scalar(include_str!("../queries/get_metadata.sql"))
            .bind("translation")
            .fetch_optional(pool)
            .await
            .map_err(schema_error)?;

        if verify_integrity {
            let report: Vec<String> =
                sqlx::query_scalar("PRAGMA quick_check").fetch_all(pool).await.map_err(schema_error)?;
            if report.first().map(String::as_str) != Some("ok") {
                tracing::warn!(?report, "Corpus failed integrity check");
                exn::bail!(ErrorKind::Corrupt("integrity check failed"));
            }
        }

        let stored: Vec<String> = sqlx::query_scalar(include_str!("../queries/list_book_labels.sql"))
            .fetch_all(pool)
            .await
            .map_err(schema_error)?;
        let mut labels = HashMap::with_capacity(stored.len());
        for label in stored {
            let Some(book) = BookId::parse(&label) else {
                tracing::warn!(label, "Corpus contains a book outside the canon");
                exn::bail!(ErrorKind::Corrupt("unknown book label"));
            };
            if labels.insert(book, label).is_some() {
                exn::bail!(ErrorKind::Corrupt("book stored under more than one label"));
            }
        }

        Ok((CorpusInfo { translation, schema_version }, labels))
    }

    fn ensure_open(&self) -> Result<()> {
        match self.closed.load(Ordering::Acquire) {
            true => exn::bail!(ErrorKind::Closed),
            false => Ok(()),
        }
    }

    /// Get a reference to the underlying connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl Corpus for SqliteCorpus {
    fn info(&self) -> &CorpusInfo {
        &self.info
    }

    async fn read_chapter(&self, book: BookId, chapter: u32) -> Result<Chapter> {
        self.ensure_open()?;
        let label = self.labels.get(&book).ok_or_raise(|| ErrorKind::ChapterNotFound(book, chapter))?;
        let rows: Vec<VerseRow> = sqlx::query_as(include_str!("../queries/read_chapter.sql"))
            .bind(label)
            .bind(i64::from(chapter))
            .fetch_all(&self.pool)
            .await
            .map_err(|err| sqlx_error(err, ErrorKind::Io))?;
        if rows.is_empty() {
            exn::bail!(ErrorKind::ChapterNotFound(book, chapter));
        }
        let verses = rows
            .into_iter()
            .map(|row| VerseRecord::try_from(row).map(|record| record.verse))
            .collect::<Result<Vec<_>>>()?;
        Chapter::new(book, chapter, verses)
    }

    fn verse_rows(&self) -> VerseStream<'_> {
        if let Err(err) = self.ensure_open() {
            return Box::pin(futures::stream::once(async move { Err(err) }));
        }
        Box::pin(stream! {
            let mut rows = sqlx::query_as::<_, VerseRow>(include_str!("../queries/all_verses.sql")).fetch(&self.pool);
            while let Some(row) = rows.next().await {
                yield match row {
                    Ok(row) => VerseRecord::try_from(row),
                    Err(err) => Err(sqlx_error(err, ErrorKind::Io)),
                };
            }
        })
    }

    async fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        self.pool.close().await;
        tracing::debug!("Closed corpus");
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}
