use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

/// Fold text for case- and diacritic-insensitive comparison.
///
/// Decomposes to NFD, drops combining marks, lowercases, and collapses runs of
/// whitespace to a single space (trimming both ends).
///
/// # Examples
///
/// ```
/// use scripture_search::fold;
/// assert_eq!(fold("José  MÁS"), "jose mas");
/// assert_eq!(fold(" Ñandú\n"), "nandu");
/// ```
pub fn fold(text: &str) -> String {
    let mut folded = String::with_capacity(text.len());
    let mut pending_space = false;
    for c in text.nfd().filter(|c| !is_combining_mark(*c)) {
        if c.is_whitespace() {
            pending_space = !folded.is_empty();
            continue;
        }
        if pending_space {
            folded.push(' ');
            pending_space = false;
        }
        folded.extend(c.to_lowercase());
    }
    folded
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("In the Beginning", "in the beginning")]
    #[case("José", "jose")]
    #[case("Jose\u{301}", "jose")]
    #[case("ÉLOHÎM", "elohim")]
    #[case("  spaced\t\tout  ", "spaced out")]
    #[case("", "")]
    fn test_fold(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(fold(input), expected);
    }

    #[test]
    fn test_fold_is_idempotent() {
        let once = fold("Y amaba Israel a José más que a todos sus hijos");
        assert_eq!(fold(&once), once);
    }
}
