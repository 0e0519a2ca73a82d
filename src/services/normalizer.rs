//! Text canonicalization shared by local matching and index documents.
//!
//! Lower-cases, folds diacritics (NFD then drop combining marks), maps
//! everything outside `[a-z0-9 ]` to a space and collapses whitespace.

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Shortest token that goes into the term index.
pub const MIN_INDEX_TOKEN_LEN: usize = 3;

/// Canonicalize text for matching.
///
/// ```
/// use winelist_match::services::normalizer::normalize;
///
/// assert_eq!(normalize("Château Margaux, 1er Cru!"), "chateau margaux 1er cru");
/// assert_eq!(normalize("  Côte-Rôtie  "), "cote rotie");
/// ```
pub fn normalize(text: &str) -> String {
    let mapped: String = text
        .chars()
        .flat_map(char::to_lowercase)
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .map(|c| match c {
            'a'..='z' | '0'..='9' => c,
            _ => ' ',
        })
        .collect();

    mapped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Whitespace tokens of already-normalized text.
pub fn tokenize(normalized: &str) -> impl Iterator<Item = &str> {
    normalized.split_whitespace()
}

/// Tokens long enough to be worth indexing.
pub fn indexable_tokens(normalized: &str) -> impl Iterator<Item = &str> {
    tokenize(normalized).filter(|t| t.chars().count() >= MIN_INDEX_TOKEN_LEN)
}
