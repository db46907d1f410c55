//! Builders for corpus assets used in tests.
//!
//! The runtime never writes to the corpus; this module exists so that tests
//! (here and in dependent crates, via the `fixture` feature) can produce a
//! real asset file without shipping binary fixtures.

use crate::error::{ErrorKind, Result};
use crate::sqlite::SCHEMA_VERSION;
use exn::ResultExt;
use sqlx::Connection;
use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection};
use std::path::Path;

pub const SAMPLE_TRANSLATION: &str = "KJV (sample)";

/// Write a complete, valid corpus asset to `path` from
/// `(book label, chapter, verse, text)` rows.
pub async fn write_corpus<B, T>(
    path: impl AsRef<Path>,
    translation: &str,
    rows: impl IntoIterator<Item = (B, u32, u32, T)>,
) -> Result<()>
where
    B: AsRef<str>,
    T: AsRef<str>,
{
    let options = SqliteConnectOptions::new().filename(path.as_ref()).create_if_missing(true);
    let mut conn = SqliteConnection::connect_with(&options).await.or_raise(|| ErrorKind::Io)?;
    let mut tx = conn.begin().await.or_raise(|| ErrorKind::Io)?;
    sqlx::query(include_str!("../queries/schema.sql")).execute(&mut *tx).await.or_raise(|| ErrorKind::Io)?;
    for (key, value) in [("schema_version", SCHEMA_VERSION.to_string()), ("translation", translation.to_string())] {
        sqlx::query(include_str!("../queries/insert_metadata.sql"))
            .bind(key)
            .bind(value)
            .execute(&mut *tx)
            .await
            .or_raise(|| ErrorKind::Io)?;
    }
    for (book, chapter, verse, text) in rows {
        sqlx::query(include_str!("../queries/insert_verse.sql"))
            .bind(book.as_ref())
            .bind(i64::from(chapter))
            .bind(i64::from(verse))
            .bind(text.as_ref())
            .execute(&mut *tx)
            .await
            .or_raise(|| ErrorKind::Io)?;
    }
    tx.commit().await.or_raise(|| ErrorKind::Io)?;
    conn.close().await.or_raise(|| ErrorKind::Io)?;
    Ok(())
}

/// Write [`sample_rows`] to `path`.
pub async fn write_sample_corpus(path: impl AsRef<Path>) -> Result<()> {
    write_corpus(path, SAMPLE_TRANSLATION, sample_rows()).await
}

/// A small KJV-derived corpus.
///
/// - Genesis has all 50 chapters (mostly single placeholder verses), with
///   chapter 1 stored in reverse verse order.
/// - Ruth has 4 chapters, John 3 and 1 John 4.
/// - Books are stored out of canonical order and under display-name labels.
pub fn sample_rows() -> Vec<(&'static str, u32, u32, String)> {
    let mut rows = vec![
        ("1 John", 4, 8, "He that loveth not knoweth not God; for God is love.".to_string()),
        (
            "1 John",
            4,
            7,
            "Beloved, let us love one another: for love is of God; and every one that loveth is born of God, and \
             knoweth God."
                .to_string(),
        ),
        ("John", 1, 1, "In the beginning was the Word, and the Word was with God, and the Word was God.".to_string()),
        ("John", 1, 2, "The same was in the beginning with God.".to_string()),
        ("John", 2, 1, "And the third day there was a marriage in Cana of Galilee.".to_string()),
        (
            "John",
            3,
            16,
            "For God so loved the world, that he gave his only begotten Son, that whosoever believeth in him should \
             not perish, but have everlasting life."
                .to_string(),
        ),
        ("John", 3, 35, "The Father loveth the Son, and hath given all things into his hand.".to_string()),
        (
            "Ruth",
            1,
            1,
            "Now it came to pass in the days when the judges ruled, that there was a famine in the land.".to_string(),
        ),
        (
            "Ruth",
            1,
            16,
            "And Ruth said, Intreat me not to leave thee, or to return from following after thee: for whither thou \
             goest, I will go."
                .to_string(),
        ),
    ];
    for chapter in 1..=3 {
        rows.push(("1 John", chapter, 1, format!("1 John {chapter}:1.")));
    }
    for chapter in 2..=4 {
        rows.push(("Ruth", chapter, 1, format!("Ruth {chapter}:1.")));
    }
    let genesis_one = [
        "In the beginning God created the heaven and the earth.",
        "And the earth was without form, and void; and darkness was upon the face of the deep. And the Spirit of God \
         moved upon the face of the waters.",
        "And God said, Let there be light: and there was light.",
        "And God saw the light, that it was good: and God divided the light from the darkness.",
        "And God called the light Day, and the darkness he called Night. And the evening and the morning were the \
         first day.",
    ];
    for (index, text) in genesis_one.iter().enumerate().rev() {
        rows.push(("Genesis", 1, index as u32 + 1, text.to_string()));
    }
    for chapter in 2..=50 {
        rows.push(("Genesis", chapter, 1, format!("Genesis {chapter}:1.")));
    }
    rows.push((
        "Genesis",
        22,
        2,
        "And he said, Take now thy son, thine only son Isaac, whom thou lovest, and get thee into the land of Moriah."
            .to_string(),
    ));
    rows.push((
        "Genesis",
        29,
        20,
        "And Jacob served seven years for Rachel; and they seemed unto him but a few days, for the love he had to her."
            .to_string(),
    ));
    rows
}
