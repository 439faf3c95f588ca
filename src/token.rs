//! Tokenizer/stemmer contract (spec §6). The index layer only ever consumes
//! this module's output, and it must be called identically at index time and
//! at query time — any change here changes what documents are findable.

use regex::Regex;
use std::sync::OnceLock;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    /// Byte offset of the token's first character within the source text.
    pub offset: usize,
    /// Lowercased, non-word characters removed.
    pub stemmed: String,
    /// The token exactly as it appeared in the source.
    pub raw: String,
}

fn whitespace_run() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\S+").expect("static pattern is valid"))
}

/// Splits `text` on runs of whitespace, yielding one token per non-whitespace
/// run in order.
pub fn tokenize(text: &str) -> Vec<Token> {
    whitespace_run()
        .find_iter(text)
        .map(|m| {
            let raw = m.as_str().to_string();
            let stemmed = stem(&raw);
            Token {
                offset: m.start(),
                stemmed,
                raw,
            }
        })
        .collect()
}

/// Lowercases `raw` and strips everything that isn't alphanumeric or `_`.
pub fn stem(raw: &str) -> String {
    raw.chars()
        .filter(|c| c.is_alphanumeric() || *c == '_')
        .flat_map(|c| c.to_lowercase())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_on_whitespace_and_tracks_offsets() {
        let tokens = tokenize("Hello   world");
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[0].offset, 0);
        assert_eq!(tokens[0].raw, "Hello");
        assert_eq!(tokens[1].offset, 8);
        assert_eq!(tokens[1].raw, "world");
    }

    #[test]
    fn stem_strips_punctuation_and_lowercases() {
        assert_eq!(stem("World!"), "world");
        assert_eq!(stem("can't"), "cant");
        assert_eq!(stem("HELLO"), "hello");
    }

    #[test]
    fn stemming_is_case_insensitive_and_matches_across_forms() {
        assert_eq!(stem("Hello"), stem("HELLO!"));
    }
}
