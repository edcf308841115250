//! Positioned page text and substring search
//!
//! Characters are kept in content-stream order with their glyph boxes in page
//! space. Searching works on a reconstructed text where lines are separated by
//! newlines and wide horizontal gaps become spaces.

use crate::geometry::Rect;

/// A single character placed on the page.
#[derive(Debug, Clone, PartialEq)]
pub struct TextChar {
    /// The character
    pub ch: char,

    /// Glyph box in page coordinates
    pub bbox: Rect,

    /// Pen position on the baseline in page coordinates
    pub origin: (f32, f32),

    /// Effective font size in page units
    pub size: f32,
}

/// Gap (in font sizes) above which a virtual space is inserted.
const WORD_GAP: f32 = 0.25;

#[derive(Debug, Clone, Copy, PartialEq)]
struct Slot {
    ch: char,
    /// Index into `chars`, `None` for virtual separators.
    source: Option<usize>,
}

/// Text of one page with the geometry needed to locate matches.
#[derive(Debug, Clone, Default)]
pub struct PageText {
    chars: Vec<TextChar>,
    lines: Vec<usize>,
    slots: Vec<Slot>,
}

impl PageText {
    /// Build the searchable text from characters in content order.
    pub fn from_chars(chars: Vec<TextChar>) -> Self {
        let mut lines = Vec::with_capacity(chars.len());
        let mut slots = Vec::with_capacity(chars.len());
        let mut line = 0;

        for (index, current) in chars.iter().enumerate() {
            if let Some(previous) = index.checked_sub(1).map(|i| &chars[i]) {
                let size = previous.size.max(current.size).max(1.0);
                let baseline_shift = (current.origin.1 - previous.origin.1).abs();
                let backwards = previous.bbox.x0 - current.bbox.x0;

                if baseline_shift > size * 0.5 || backwards > size {
                    line += 1;
                    slots.push(Slot { ch: '\n', source: None });
                } else {
                    let gap = current.bbox.x0 - previous.bbox.x1;
                    let separated = !previous.ch.is_whitespace() && !current.ch.is_whitespace();
                    if gap > size * WORD_GAP && separated {
                        slots.push(Slot { ch: ' ', source: None });
                    }
                }
            }

            lines.push(line);
            slots.push(Slot { ch: current.ch, source: Some(index) });
        }

        Self { chars, lines, slots }
    }

    pub fn chars(&self) -> &[TextChar] {
        &self.chars
    }

    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }

    /// Reconstructed page text, lines separated by `\n`.
    pub fn text(&self) -> String {
        self.slots.iter().map(|slot| slot.ch).collect()
    }

    /// Find every occurrence of `needle`.
    ///
    /// Returns one rectangle per line touched by each hit, in reading order.
    /// Hits never overlap: scanning resumes after the end of a hit.
    /// If `case_sensitive` is false, both sides are lower-cased first.
    pub fn search(&self, needle: &str, case_sensitive: bool) -> Vec<Rect> {
        let pattern: Vec<char> = if case_sensitive {
            needle.chars().collect()
        } else {
            needle.chars().flat_map(char::to_lowercase).collect()
        };
        if pattern.is_empty() {
            return Vec::new();
        }

        let haystack: Vec<(char, Option<usize>)> = if case_sensitive {
            self.slots.iter().map(|slot| (slot.ch, slot.source)).collect()
        } else {
            self.slots
                .iter()
                .flat_map(|slot| slot.ch.to_lowercase().map(move |ch| (ch, slot.source)))
                .collect()
        };

        let mut rects = Vec::new();
        let mut start = 0;

        while start + pattern.len() <= haystack.len() {
            let window = &haystack[start..start + pattern.len()];
            if window.iter().map(|(ch, _)| *ch).eq(pattern.iter().copied()) {
                rects.extend(self.hit_rects(window.iter().filter_map(|(_, source)| *source)));
                start += pattern.len();
            } else {
                start += 1;
            }
        }

        rects
    }

    fn hit_rects(&self, sources: impl Iterator<Item = usize>) -> Vec<Rect> {
        let mut rects: Vec<(usize, Rect)> = Vec::new();

        for source in sources {
            let line = self.lines[source];
            let bbox = self.chars[source].bbox;
            match rects.last_mut() {
                Some((current_line, rect)) if *current_line == line => *rect = rect.union(&bbox),
                _ => rects.push((line, bbox)),
            }
        }

        rects.into_iter().map(|(_, rect)| rect).filter(|rect| !rect.is_empty()).collect()
    }
}
