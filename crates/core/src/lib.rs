//! keymark core library
//!
//! Keyword extraction from summary text and keyword highlighting in PDF
//! documents. Front-ends (the command line, or anything else) sit on top.

pub mod color;
pub mod config;
pub mod highlighter;
pub mod keywords;

pub use color::{HighlightColor, UnknownColor};
pub use config::{ConfigError, HighlightConfig};
pub use highlighter::{
    highlight, HighlightError, HighlightErrorKind, HighlightOutcome, HighlightReport,
    HighlightRequest, Highlighter, PageReport,
};
pub use keywords::{
    extract_keywords, KeywordExtractor, KeywordSet, DEFAULT_MIN_KEYWORD_CHARS, DEFAULT_STOP_WORDS,
};
