//! Highlight color palette.

use pdf_engine::Rgb;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Colors a highlight can be drawn in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HighlightColor {
    #[default]
    Yellow,
    Red,
    Blue,
    Green,
    Pink,
    Cyan,
    Purple,
}

impl HighlightColor {
    pub const ALL: [HighlightColor; 7] = [
        HighlightColor::Yellow,
        HighlightColor::Red,
        HighlightColor::Blue,
        HighlightColor::Green,
        HighlightColor::Pink,
        HighlightColor::Cyan,
        HighlightColor::Purple,
    ];

    /// Canonical lower-case English name.
    pub fn name(self) -> &'static str {
        match self {
            HighlightColor::Yellow => "yellow",
            HighlightColor::Red => "red",
            HighlightColor::Blue => "blue",
            HighlightColor::Green => "green",
            HighlightColor::Pink => "pink",
            HighlightColor::Cyan => "cyan",
            HighlightColor::Purple => "purple",
        }
    }

    fn arabic_label(self) -> &'static str {
        match self {
            HighlightColor::Yellow => "أصفر",
            HighlightColor::Red => "أحمر",
            HighlightColor::Blue => "أزرق",
            HighlightColor::Green => "أخضر",
            HighlightColor::Pink => "وردي",
            HighlightColor::Cyan => "سماوي",
            HighlightColor::Purple => "أرجواني",
        }
    }

    /// Components in the unit interval.
    pub fn rgb(self) -> Rgb {
        match self {
            HighlightColor::Yellow => Rgb::new(1.0, 1.0, 0.0),
            HighlightColor::Red => Rgb::new(1.0, 0.0, 0.0),
            HighlightColor::Blue => Rgb::new(0.0, 0.0, 1.0),
            HighlightColor::Green => Rgb::new(0.0, 1.0, 0.0),
            HighlightColor::Pink => Rgb::new(1.0, 0.75, 0.8),
            HighlightColor::Cyan => Rgb::new(0.0, 1.0, 1.0),
            HighlightColor::Purple => Rgb::new(0.5, 0.0, 0.5),
        }
    }

    /// Look up a color by English name (any case) or Arabic label.
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim();
        Self::ALL
            .into_iter()
            .find(|color| color.name().eq_ignore_ascii_case(name) || color.arabic_label() == name)
    }

    /// Like [`HighlightColor::from_name`], falling back to yellow.
    pub fn resolve(name: &str) -> Self {
        Self::from_name(name).unwrap_or_else(|| {
            tracing::debug!(color = name, "unknown highlight color, using yellow");
            Self::default()
        })
    }
}

impl fmt::Display for HighlightColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown highlight color '{0}' (expected yellow, red, blue, green, pink, cyan or purple)")]
pub struct UnknownColor(pub String);

impl FromStr for HighlightColor {
    type Err = UnknownColor;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s).ok_or_else(|| UnknownColor(s.to_owned()))
    }
}
