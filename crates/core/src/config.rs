//! Highlighting configuration.
//!
//! Settings can be loaded from a file, environment variables, or created
//! programmatically. Command-line flags are applied on top by the caller.

use crate::color::HighlightColor;
use crate::keywords::{KeywordExtractor, DEFAULT_MIN_KEYWORD_CHARS};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

const ENV_COLOR: &str = "KEYMARK_COLOR";
const ENV_MIN_KEYWORD_CHARS: &str = "KEYMARK_MIN_KEYWORD_CHARS";
const ENV_STOP_WORDS: &str = "KEYMARK_STOP_WORDS";
const ENV_CASE_SENSITIVE: &str = "KEYMARK_CASE_SENSITIVE";

/// User-configurable highlighting settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HighlightConfig {
    /// Highlight color
    pub color: HighlightColor,
    /// Keywords shorter than this many characters are ignored
    pub min_keyword_chars: usize,
    /// Stop words on top of the built-in list
    pub extra_stop_words: Vec<String>,
    /// Match keywords case-sensitively
    pub case_sensitive: bool,
}

impl Default for HighlightConfig {
    fn default() -> Self {
        Self {
            color: HighlightColor::default(),
            min_keyword_chars: DEFAULT_MIN_KEYWORD_CHARS,
            extra_stop_words: Vec::new(),
            case_sensitive: false,
        }
    }
}

impl HighlightConfig {
    pub fn with_color(mut self, color: HighlightColor) -> Self {
        self.color = color;
        self
    }

    pub fn with_min_keyword_chars(mut self, min_chars: usize) -> Self {
        self.min_keyword_chars = min_chars;
        self
    }

    pub fn with_stop_words<I, S>(mut self, words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extra_stop_words.extend(words.into_iter().map(Into::into));
        self
    }

    pub fn with_case_sensitive(mut self, case_sensitive: bool) -> Self {
        self.case_sensitive = case_sensitive;
        self
    }

    /// Keyword extractor matching these settings.
    pub fn extractor(&self) -> KeywordExtractor {
        KeywordExtractor::new()
            .with_min_chars(self.min_keyword_chars)
            .with_stop_words(&self.extra_stop_words)
    }

    /// Default configuration file location.
    ///
    /// - Linux: ~/.config/keymark/config.toml
    /// - macOS: ~/Library/Application Support/keymark/config.toml
    /// - Windows: %APPDATA%\keymark\config.toml
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("keymark").join("config.toml"))
    }

    /// Loads configuration the way the command line does: an explicit file,
    /// else the default file when it exists, then environment overrides.
    ///
    /// # Errors
    /// Returns an error if a file cannot be read or a value is invalid.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config = match path {
            Some(path) => Self::from_file(path)?,
            None => match Self::default_path().filter(|path| path.is_file()) {
                Some(path) => Self::from_file(path)?,
                None => Self::default(),
            },
        };
        config.apply_env()
    }

    /// Loads configuration from environment variables.
    ///
    /// Environment variables:
    /// - `KEYMARK_COLOR`: highlight color name
    /// - `KEYMARK_MIN_KEYWORD_CHARS`: minimum keyword length
    /// - `KEYMARK_STOP_WORDS`: comma-separated extra stop words
    /// - `KEYMARK_CASE_SENSITIVE`: `true` or `false`
    ///
    /// # Errors
    /// Returns an error if any environment variable contains an invalid value.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().apply_env()
    }

    /// Overrides settings with any environment variables that are set.
    pub fn apply_env(mut self) -> Result<Self, ConfigError> {
        for key in [ENV_COLOR, ENV_MIN_KEYWORD_CHARS, ENV_STOP_WORDS, ENV_CASE_SENSITIVE] {
            if let Ok(value) = std::env::var(key) {
                self.set(key, &value)?;
            }
        }
        Ok(self)
    }

    /// Loads configuration from a TOML-style `key = value` file.
    ///
    /// Expected file format:
    /// ```toml
    /// color = "red"
    /// min_keyword_chars = 3
    /// stop_words = "system, data"
    /// case_sensitive = false
    /// ```
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path.as_ref())?;
        Self::from_toml(&contents)
    }

    fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        for line in toml_str.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            if let Some((key, value)) = line.split_once('=') {
                config.set(key.trim(), value.trim().trim_matches('"'))?;
            }
        }

        Ok(config)
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let invalid = || ConfigError::InvalidValue(key.to_owned());

        match key {
            "color" | ENV_COLOR => self.color = value.parse().map_err(|_| invalid())?,
            "min_keyword_chars" | ENV_MIN_KEYWORD_CHARS => {
                self.min_keyword_chars = value.trim().parse().map_err(|_| invalid())?;
            }
            "stop_words" | ENV_STOP_WORDS => {
                self.extra_stop_words = value
                    .split(',')
                    .map(|word| word.trim().to_lowercase())
                    .filter(|word| !word.is_empty())
                    .collect();
            }
            "case_sensitive" | ENV_CASE_SENSITIVE => {
                self.case_sensitive = value.trim().parse().map_err(|_| invalid())?;
            }
            _ => {} // Ignore unknown keys
        }

        Ok(())
    }

    /// Saves configuration to a file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be written.
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path.as_ref(), self.to_toml())?;
        Ok(())
    }

    pub fn to_toml(&self) -> String {
        format!(
            "# keymark configuration\n\
             color = \"{}\"\n\
             min_keyword_chars = {}\n\
             stop_words = \"{}\"\n\
             case_sensitive = {}\n",
            self.color,
            self.min_keyword_chars,
            self.extra_stop_words.join(", "),
            self.case_sensitive
        )
    }
}

/// Errors that can occur during configuration operations.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for configuration key: {0}")]
    InvalidValue(String),
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}
