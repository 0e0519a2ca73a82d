//! Blended token-overlap and edit-distance similarity for normalized strings.

use std::collections::HashSet;

use strsim::levenshtein;

use crate::services::normalizer::tokenize;

const TOKEN_WEIGHT: f64 = 0.6;
const EDIT_WEIGHT: f64 = 0.4;

/// Jaccard similarity of the whitespace token sets. Two empty sets score 0.
pub fn jaccard(a: &str, b: &str) -> f64 {
    let left: HashSet<&str> = tokenize(a).collect();
    let right: HashSet<&str> = tokenize(b).collect();

    let union = left.union(&right).count();
    if union == 0 {
        return 0.0;
    }
    left.intersection(&right).count() as f64 / union as f64
}

/// `1 - levenshtein / longer length`, counted in chars.
///
/// Two empty strings are identical (1.0); one empty operand scores 0.
pub fn edit_similarity(a: &str, b: &str) -> f64 {
    let longest = a.chars().count().max(b.chars().count());
    match (a.is_empty(), b.is_empty()) {
        (true, true) => 1.0,
        (true, false) | (false, true) => 0.0,
        _ => 1.0 - levenshtein(a, b) as f64 / longest as f64,
    }
}

/// Weighted blend in `[0, 1]`: 0.6 token overlap plus 0.4 edit similarity.
pub fn similarity(a: &str, b: &str) -> f64 {
    let score = TOKEN_WEIGHT * jaccard(a, b) + EDIT_WEIGHT * edit_similarity(a, b);
    score.clamp(0.0, 1.0)
}
