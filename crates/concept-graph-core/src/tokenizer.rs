//! Token normalization shared by the query cache, the store's token index and
//! association extraction.
//!
//! Normalization rules:
//! - split on every non-alphanumeric character
//! - lowercase
//! - drop tokens shorter than 2 characters
//! - drop a small set of English stopwords

use std::collections::BTreeSet;

/// Normalized, ordered, deduplicated token set.
pub type TokenSet = BTreeSet<String>;

const STOPWORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "been", "but", "by", "can", "did", "do", "does",
    "for", "from", "had", "has", "have", "how", "if", "in", "into", "is", "it", "its", "of", "on",
    "or", "so", "than", "that", "the", "their", "them", "then", "there", "these", "they", "this",
    "to", "was", "were", "what", "when", "where", "which", "who", "why", "will", "with", "would",
];

fn is_stopword(token: &str) -> bool {
    STOPWORDS.binary_search(&token).is_ok()
}

/// Tokenize text into normalized tokens, preserving order and duplicates.
///
/// # Example
///
/// ```rust
/// use concept_graph_core::tokenize;
///
/// assert_eq!(tokenize("The Cat sat on the mat."), vec!["cat", "sat", "mat"]);
/// ```
pub fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|raw| raw.chars().count() >= 2)
        .map(str::to_lowercase)
        .filter(|token| !is_stopword(token))
        .collect()
}

/// Normalize text into a token set.
///
/// Two queries that differ only in word order, case, punctuation or
/// stopwords produce the same set.
pub fn normalize_tokens(text: &str) -> TokenSet {
    tokenize(text).into_iter().collect()
}

/// Fraction of `entry`'s tokens that also appear in `other`.
///
/// Returns 0.0 when `entry` is empty.
pub fn token_overlap(entry: &TokenSet, other: &TokenSet) -> f32 {
    if entry.is_empty() {
        return 0.0;
    }
    let shared = entry.intersection(other).count();
    shared as f32 / entry.len() as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stopwords_sorted_for_binary_search() {
        let mut sorted = STOPWORDS.to_vec();
        sorted.sort_unstable();
        assert_eq!(sorted, STOPWORDS);
    }

    #[test]
    fn test_tokenize_lowercases_and_strips_punctuation() {
        assert_eq!(
            tokenize("Water, boils at 100 degrees!"),
            vec!["water", "boils", "100", "degrees"]
        );
    }

    #[test]
    fn test_tokenize_drops_single_characters() {
        assert_eq!(tokenize("x y zz"), vec!["zz"]);
    }

    #[test]
    fn test_normalize_is_order_insensitive() {
        assert_eq!(
            normalize_tokens("How does gravity affect tides?"),
            normalize_tokens("tides affect GRAVITY")
        );
    }

    #[test]
    fn test_token_overlap() {
        let entry = normalize_tokens("gravity tides moon");
        let other = normalize_tokens("moon landing");
        let overlap = token_overlap(&entry, &other);
        assert!((overlap - 1.0 / 3.0).abs() < 1e-6);
        assert_eq!(token_overlap(&TokenSet::new(), &other), 0.0);
    }
}
