//! Text Normalizer — turns raw extracted text into a canonical token sequence.
//!
//! Lower-cases, replaces every non-alphabetic character with a separator,
//! splits on whitespace and drops stopwords. Deterministic and idempotent:
//! normalizing the space-joined output again yields the same tokens.

use std::collections::HashSet;
use std::sync::LazyLock;

use crate::models::{Document, NormalizedDocument};

/// English stopwords. Process-wide, initialized once, never mutated.
static STOPWORDS: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    [
        "a", "about", "above", "after", "again", "against", "all", "am", "an", "and", "any",
        "are", "as", "at", "be", "because", "been", "before", "being", "below", "between",
        "both", "but", "by", "can", "could", "did", "do", "does", "doing", "down", "during",
        "each", "etc", "few", "for", "from", "further", "had", "has", "have", "having", "he",
        "her", "here", "hers", "herself", "him", "himself", "his", "how", "i", "if", "in",
        "into", "is", "it", "its", "itself", "just", "me", "more", "most", "my", "myself", "no",
        "nor", "not", "now", "of", "off", "on", "once", "only", "or", "other", "our", "ours",
        "ourselves", "out", "over", "own", "same", "she", "should", "so", "some", "such",
        "than", "that", "the", "their", "theirs", "them", "themselves", "then", "there",
        "these", "they", "this", "those", "through", "to", "too", "under", "until", "up",
        "very", "was", "we", "were", "what", "when", "where", "which", "while", "who", "whom",
        "why", "will", "with", "would", "you", "your", "yours", "yourself", "yourselves",
    ]
    .into_iter()
    .collect()
});

/// Returns `true` if `token` (already lower-cased) is a stopword.
pub fn is_stopword(token: &str) -> bool {
    STOPWORDS.contains(token)
}

/// Normalizes raw text into an ordered token sequence.
///
/// Never fails; empty or symbol-only input yields an empty sequence.
pub fn normalize(raw_text: &str) -> Vec<String> {
    let cleaned: String = raw_text
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphabetic() { c } else { ' ' })
        .collect();

    cleaned
        .split_whitespace()
        .filter(|token| !is_stopword(token))
        .map(str::to_string)
        .collect()
}

/// Normalizes a whole document, keeping its id.
pub fn normalize_document(document: &Document) -> NormalizedDocument {
    NormalizedDocument {
        id: document.id,
        tokens: normalize(&document.raw_text),
    }
}
