use crate::book::BookId;
use crate::error::{Error, ErrorKind};
use crate::models::{Verse, VerseRecord};
use exn::OptionExt;

/// A raw row of the `verses` table.
///
/// SQLite gives no compile-time guarantees about what is actually stored, so
/// this is only ever converted into a [`VerseRecord`] through [`TryFrom`].
#[derive(Debug, sqlx::FromRow)]
pub(crate) struct VerseRow {
    pub(crate) book: String,
    pub(crate) chapter: i64,
    pub(crate) verse: i64,
    pub(crate) text: String,
}
impl TryFrom<VerseRow> for VerseRecord {
    type Error = Error;
    fn try_from(row: VerseRow) -> Result<Self, Self::Error> {
        let book = BookId::parse(&row.book).ok_or_raise(|| ErrorKind::Corrupt("unknown book label"))?;
        let chapter = positive(row.chapter).ok_or_raise(|| ErrorKind::Corrupt("chapter number"))?;
        let number = positive(row.verse).ok_or_raise(|| ErrorKind::Corrupt("verse number"))?;
        if row.text.trim().is_empty() {
            exn::bail!(ErrorKind::Corrupt("empty verse text"));
        }
        Ok(Self { book, chapter, verse: Verse::new(number, row.text) })
    }
}

fn positive(value: i64) -> Option<u32> {
    u32::try_from(value).ok().filter(|v| *v > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn row(book: &str, chapter: i64, verse: i64, text: &str) -> VerseRow {
        VerseRow { book: book.to_string(), chapter, verse, text: text.to_string() }
    }

    #[test]
    fn test_row_to_record() {
        let record = VerseRecord::try_from(row("1 John", 4, 8, "He that loveth not knoweth not God; for God is love."))
            .unwrap();
        assert_eq!(record.book.key(), "1john");
        assert_eq!(record.chapter, 4);
        assert_eq!(record.verse.number, 8);
    }

    #[rstest]
    #[case(row("hezekiah", 1, 1, "text"))]
    #[case(row("genesis", 0, 1, "text"))]
    #[case(row("genesis", -1, 1, "text"))]
    #[case(row("genesis", 1, 0, "text"))]
    #[case(row("genesis", 1, i64::MAX, "text"))]
    #[case(row("genesis", 1, 1, "   "))]
    fn test_malformed_rows_are_corrupt(#[case] row: VerseRow) {
        let err = VerseRecord::try_from(row).unwrap_err();
        assert!(matches!(&*err, ErrorKind::Corrupt(_)));
    }
}
