//! Keyword extraction from free-form summary text
//!
//! Text is lower-cased and split into runs of word characters (Latin and
//! Arabic alike). Short tokens and stop words are dropped; what survives is
//! deduplicated into a sorted set.

use regex::Regex;
use std::collections::{BTreeSet, HashSet};
use std::sync::OnceLock;

/// Deduplicated, ordered keyword set.
pub type KeywordSet = BTreeSet<String>;

/// Tokens shorter than this many characters are dropped by default.
pub const DEFAULT_MIN_KEYWORD_CHARS: usize = 3;

/// Stop words removed before highlighting.
pub const DEFAULT_STOP_WORDS: &[&str] = &[
    "the", "and", "of", "in", "to", "a", "is", "that", "for", "it", "as", "was", "be", "are",
    "this", "with", "on", "at", "من", "في", "إلى", "على", "و", "أو", "أن",
];

fn token_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| match Regex::new(r"[\w\x{0600}-\x{06FF}]+") {
        Ok(regex) => regex,
        Err(err) => unreachable!("token pattern is valid: {err}"),
    })
}

/// Configurable extractor. [`Default`] uses the built-in stop words and a
/// minimum of [`DEFAULT_MIN_KEYWORD_CHARS`] characters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeywordExtractor {
    stop_words: HashSet<String>,
    min_chars: usize,
}

impl Default for KeywordExtractor {
    fn default() -> Self {
        Self {
            stop_words: DEFAULT_STOP_WORDS.iter().map(|word| (*word).to_owned()).collect(),
            min_chars: DEFAULT_MIN_KEYWORD_CHARS,
        }
    }
}

impl KeywordExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the minimum token length in characters.
    pub fn with_min_chars(mut self, min_chars: usize) -> Self {
        self.min_chars = min_chars;
        self
    }

    /// Adds stop words on top of the current set. Words are lower-cased.
    pub fn with_stop_words<I, S>(mut self, words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.stop_words.extend(
            words
                .into_iter()
                .map(|word| word.as_ref().trim().to_lowercase())
                .filter(|word| !word.is_empty()),
        );
        self
    }

    pub fn is_stop_word(&self, word: &str) -> bool {
        self.stop_words.contains(word)
    }

    pub fn extract(&self, text: &str) -> KeywordSet {
        let lowered = text.to_lowercase();
        token_pattern()
            .find_iter(&lowered)
            .map(|token| token.as_str())
            .filter(|token| token.chars().count() >= self.min_chars && !self.is_stop_word(token))
            .map(str::to_owned)
            .collect()
    }
}

/// Extract keywords with the default extractor.
pub fn extract_keywords(text: &str) -> KeywordSet {
    KeywordExtractor::default().extract(text)
}
