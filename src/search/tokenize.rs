//! Query and index tokenization.
//!
//! The same tokenizer feeds both sides of the search index: song/artist text
//! at ingestion time and the user's query at search time, so a query token
//! can only ever miss when the text genuinely does not contain it.

use crate::text::{remove_chords, remove_diacritics, remove_markup_tags};

/// Separators the source text is split on, besides whitespace.
const SEPARATORS: &str = "-().,;!?\"'/+*&";

/// Turn text fragments into lowercase alphabetic tokens of length >= 2.
///
/// Processing order: chord annotations out, markup tags out, diacritics
/// folded, lowercased, split on separators, remaining non-alphabetic
/// characters stripped per word. Token order follows the input; duplicates
/// are preserved (callers dedup where the schema wants a set).
pub fn tokenize(fragments: &[&str]) -> Vec<String> {
    let mut tokens = Vec::new();
    for fragment in fragments {
        let cleaned =
            remove_diacritics(&remove_markup_tags(&remove_chords(fragment))).to_lowercase();
        for word in cleaned.split(|c: char| c.is_whitespace() || SEPARATORS.contains(c)) {
            let trimmed: String = word.chars().filter(char::is_ascii_lowercase).collect();
            if trimmed.len() >= 2 {
                tokens.push(trimmed);
            }
        }
    }
    tokens
}

/// Deduplicate tokens keeping the first occurrence of each.
pub fn dedup_tokens(tokens: Vec<String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    tokens
        .into_iter()
        .filter(|token| seen.insert(token.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lowercases_and_folds_diacritics() {
        assert_eq!(tokenize(&["Café-Bar!"]), vec!["cafe", "bar"]);
    }

    #[test]
    fn splits_on_separator_set() {
        assert_eq!(
            tokenize(&["one,two;three/four(five)"]),
            vec!["one", "two", "three", "four", "five"]
        );
    }

    #[test]
    fn drops_short_and_non_alphabetic_fragments() {
        assert_eq!(tokenize(&["a b2c x 42 hello"]), vec!["bc", "hello"]);
    }

    #[test]
    fn strips_chords_before_splitting() {
        assert_eq!(
            tokenize(&["Text[Ami] to be [Fmaj]continued"]),
            vec!["text", "to", "be", "continued"]
        );
    }

    #[test]
    fn preserves_order_and_duplicates() {
        assert_eq!(
            tokenize(&["la la land"]),
            vec!["la", "la", "land"]
        );
        assert_eq!(
            dedup_tokens(tokenize(&["la la land"])),
            vec!["la", "land"]
        );
    }

    #[test]
    fn multiple_fragments_concatenate() {
        assert_eq!(tokenize(&["first", "second"]), vec!["first", "second"]);
    }

    #[test]
    fn is_deterministic() {
        let a = tokenize(&["Žluťoučký kůň <i>pěl</i> [C]ďábelské ódy"]);
        let b = tokenize(&["Žluťoučký kůň <i>pěl</i> [C]ďábelské ódy"]);
        assert_eq!(a, b);
        assert_eq!(a, vec!["zlutoucky", "kun", "pel", "dabelske", "ody"]);
    }
}
