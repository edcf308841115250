//! Font metrics and character decoding for text positioning.
//!
//! Fonts are loaded once per font dictionary and answer two questions for each
//! character code in a shown string: how far the pen advances, and which text
//! the code stands for.

use crate::cmap::ToUnicodeMap;
use crate::geometry::number;
use crate::resolve;
use lopdf::{Dictionary, Document, Object};
use std::collections::HashMap;

const DEFAULT_ASCENT: f32 = 800.0;
const DEFAULT_DESCENT: f32 = -200.0;

/// Helvetica advance widths for codes 32..=126, in glyph units.
const HELVETICA_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // 32-47
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556, // 48-63
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778, // 64-79
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556, // 80-95
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556, // 96-111
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584, // 112-126
];

/// WinAnsiEncoding for 0x80..=0x9F; the rest of the table matches Latin-1.
const WIN_ANSI_HIGH: [Option<char>; 32] = [
    Some('\u{20AC}'),
    None,
    Some('\u{201A}'),
    Some('\u{0192}'),
    Some('\u{201E}'),
    Some('\u{2026}'),
    Some('\u{2020}'),
    Some('\u{2021}'),
    Some('\u{02C6}'),
    Some('\u{2030}'),
    Some('\u{0160}'),
    Some('\u{2039}'),
    Some('\u{0152}'),
    None,
    Some('\u{017D}'),
    None,
    None,
    Some('\u{2018}'),
    Some('\u{2019}'),
    Some('\u{201C}'),
    Some('\u{201D}'),
    Some('\u{2022}'),
    Some('\u{2013}'),
    Some('\u{2014}'),
    Some('\u{02DC}'),
    Some('\u{2122}'),
    Some('\u{0161}'),
    Some('\u{203A}'),
    Some('\u{0153}'),
    None,
    Some('\u{017E}'),
    Some('\u{0178}'),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StandardMetrics {
    Helvetica,
    Courier,
}

impl StandardMetrics {
    fn for_base_font(base_font: &str) -> Self {
        if base_font.contains("Courier") {
            StandardMetrics::Courier
        } else {
            StandardMetrics::Helvetica
        }
    }

    fn width(self, code: u32) -> f32 {
        match self {
            StandardMetrics::Courier => 600.0,
            StandardMetrics::Helvetica => match code {
                32..=126 => f32::from(HELVETICA_WIDTHS[(code - 32) as usize]),
                _ => 556.0,
            },
        }
    }
}

/// `c_first c_last w` entry of a CID font's `/W` array.
#[derive(Debug, Clone, Copy, PartialEq)]
struct WidthRange {
    first: u32,
    last: u32,
    width: f32,
}

impl WidthRange {
    fn contains(&self, code: u32) -> bool {
        (self.first..=self.last).contains(&code)
    }
}

#[derive(Debug, Clone)]
enum Widths {
    Simple { first_char: u32, widths: Vec<f32>, missing_width: f32, standard: StandardMetrics },
    Composite { default_width: f32, widths: HashMap<u32, f32>, ranges: Vec<WidthRange> },
}

/// One decoded character code from a shown string.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct DecodedGlyph {
    pub text: String,
    /// Horizontal advance in text space for a font size of 1.
    pub width: f32,
    /// Single-byte code 32, the only code word spacing applies to.
    pub is_word_space: bool,
}

#[derive(Debug, Clone)]
pub(crate) struct Font {
    code_length: usize,
    encoding: Option<Box<[Option<char>; 256]>>,
    differences: HashMap<u32, String>,
    to_unicode: Option<ToUnicodeMap>,
    widths: Widths,
    width_scale: f32,
    /// Ascent and descent in text space for a font size of 1.
    pub ascent: f32,
    pub descent: f32,
}

impl Font {
    pub fn load(doc: &Document, dict: &Dictionary) -> Font {
        let subtype = name_of(doc, dict, b"Subtype").unwrap_or_default();
        let base_font = name_of(doc, dict, b"BaseFont").unwrap_or_default();
        let to_unicode = dict
            .get(b"ToUnicode")
            .ok()
            .map(|object| resolve(doc, object))
            .and_then(|object| object.as_stream().ok())
            .and_then(|stream| {
                stream.decompressed_content().ok().or_else(|| Some(stream.content.clone()))
            })
            .map(|data| ToUnicodeMap::parse(&data))
            .filter(|map| !map.is_empty());

        if subtype == "Type0" {
            let descendant = dict
                .get(b"DescendantFonts")
                .ok()
                .map(|object| resolve(doc, object))
                .and_then(|object| object.as_array().ok())
                .and_then(|array| array.first())
                .map(|object| resolve(doc, object))
                .and_then(|object| object.as_dict().ok());

            let (ascent, descent) =
                descendant.map_or((DEFAULT_ASCENT, DEFAULT_DESCENT), |d| metrics(doc, d));
            let widths = descendant.map_or_else(
                || Widths::Composite {
                    default_width: 1000.0,
                    widths: HashMap::new(),
                    ranges: Vec::new(),
                },
                |d| composite_widths(doc, d),
            );
            let code_length =
                to_unicode.as_ref().and_then(ToUnicodeMap::uniform_code_length).unwrap_or(2);

            return Font {
                code_length,
                encoding: None,
                differences: HashMap::new(),
                to_unicode,
                widths,
                width_scale: 0.001,
                ascent: ascent / 1000.0,
                descent: descent / 1000.0,
            };
        }

        let width_scale = if subtype == "Type3" {
            dict.get(b"FontMatrix")
                .ok()
                .map(|object| resolve(doc, object))
                .and_then(|object| object.as_array().ok())
                .and_then(|array| array.first())
                .and_then(number)
                .unwrap_or(0.001)
        } else {
            0.001
        };

        let (ascent, descent) = if subtype == "Type3" {
            (DEFAULT_ASCENT, DEFAULT_DESCENT)
        } else {
            metrics(doc, dict)
        };

        let (encoding, differences) = simple_encoding(doc, dict);

        Font {
            code_length: 1,
            encoding: Some(encoding),
            differences,
            to_unicode,
            widths: simple_widths(doc, dict, StandardMetrics::for_base_font(&base_font)),
            width_scale,
            ascent: ascent / 1000.0,
            descent: descent / 1000.0,
        }
    }

    /// Split a shown string into character codes and decode each one.
    pub fn decode(&self, bytes: &[u8]) -> Vec<DecodedGlyph> {
        bytes
            .chunks(self.code_length)
            .map(|chunk| {
                let code = chunk.iter().fold(0u32, |acc, byte| (acc << 8) | u32::from(*byte));
                DecodedGlyph {
                    text: self.unicode(code),
                    width: self.glyph_width(code) * self.width_scale,
                    is_word_space: self.code_length == 1 && code == 32,
                }
            })
            .collect()
    }

    fn unicode(&self, code: u32) -> String {
        if let Some(text) = self.to_unicode.as_ref().and_then(|map| map.get(code)) {
            return text.into_owned();
        }
        if let Some(text) = self.differences.get(&code) {
            return text.clone();
        }
        match self.encoding.as_ref().and_then(|table| table.get(code as usize).copied().flatten()) {
            Some(ch) => ch.to_string(),
            None => char::REPLACEMENT_CHARACTER.to_string(),
        }
    }

    fn glyph_width(&self, code: u32) -> f32 {
        match &self.widths {
            Widths::Simple { first_char, widths, missing_width, standard } => {
                if widths.is_empty() {
                    return standard.width(code);
                }
                code.checked_sub(*first_char)
                    .and_then(|index| widths.get(index as usize))
                    .copied()
                    .unwrap_or(*missing_width)
            }
            Widths::Composite { default_width, widths, ranges } => widths
                .get(&code)
                .copied()
                .or_else(|| {
                    ranges.iter().rev().find(|range| range.contains(code)).map(|range| range.width)
                })
                .unwrap_or(*default_width),
        }
    }
}

fn name_of(doc: &Document, dict: &Dictionary, key: &[u8]) -> Option<String> {
    match dict.get(key).ok().map(|object| resolve(doc, object)) {
        Some(Object::Name(name)) => Some(String::from_utf8_lossy(name).into_owned()),
        _ => None,
    }
}

fn descriptor<'a>(doc: &'a Document, dict: &'a Dictionary) -> Option<&'a Dictionary> {
    dict.get(b"FontDescriptor")
        .ok()
        .map(|object| resolve(doc, object))
        .and_then(|object| object.as_dict().ok())
}

fn metrics(doc: &Document, dict: &Dictionary) -> (f32, f32) {
    let Some(descriptor) = descriptor(doc, dict) else {
        return (DEFAULT_ASCENT, DEFAULT_DESCENT);
    };
    let read = |key: &[u8]| {
        descriptor
            .get(key)
            .ok()
            .map(|object| resolve(doc, object))
            .and_then(number)
            .filter(|v| *v != 0.0)
    };
    (read(b"Ascent").unwrap_or(DEFAULT_ASCENT), read(b"Descent").unwrap_or(DEFAULT_DESCENT))
}

fn simple_widths(doc: &Document, dict: &Dictionary, standard: StandardMetrics) -> Widths {
    let first_char = dict
        .get(b"FirstChar")
        .ok()
        .map(|object| resolve(doc, object))
        .and_then(number)
        .map_or(0, |value| value.max(0.0) as u32);
    let widths = dict
        .get(b"Widths")
        .ok()
        .map(|object| resolve(doc, object))
        .and_then(|object| object.as_array().ok())
        .map(|array| {
            array.iter().map(|object| number(resolve(doc, object)).unwrap_or(0.0)).collect()
        })
        .unwrap_or_default();
    let missing_width = descriptor(doc, dict)
        .and_then(|descriptor| descriptor.get(b"MissingWidth").ok())
        .map(|object| resolve(doc, object))
        .and_then(number)
        .unwrap_or(0.0);

    Widths::Simple { first_char, widths, missing_width, standard }
}

fn composite_widths(doc: &Document, descendant: &Dictionary) -> Widths {
    let default_width = descendant
        .get(b"DW")
        .ok()
        .map(|object| resolve(doc, object))
        .and_then(number)
        .unwrap_or(1000.0);
    let mut widths = HashMap::new();
    let mut ranges = Vec::new();

    let entries = descendant
        .get(b"W")
        .ok()
        .map(|object| resolve(doc, object))
        .and_then(|object| object.as_array().ok());

    if let Some(entries) = entries {
        let mut index = 0;
        while index < entries.len() {
            let Some(first) = number(resolve(doc, &entries[index])) else {
                break;
            };
            let first = first as u32;
            match entries.get(index + 1).map(|object| resolve(doc, object)) {
                // c [w1 w2 ...]
                Some(Object::Array(list)) => {
                    for (offset, width) in list.iter().enumerate() {
                        let code =
                            u32::try_from(offset).ok().and_then(|offset| first.checked_add(offset));
                        if let (Some(code), Some(width)) = (code, number(resolve(doc, width))) {
                            widths.insert(code, width);
                        }
                    }
                    index += 2;
                }
                // c_first c_last w
                Some(last) => {
                    let width = entries.get(index + 2).map(|object| resolve(doc, object));
                    let (Some(last), Some(width)) = (number(last), width.and_then(number)) else {
                        break;
                    };
                    let last = last as u32;
                    if first <= last {
                        ranges.push(WidthRange { first, last, width });
                    }
                    index += 3;
                }
                None => break,
            }
        }
    }

    Widths::Composite { default_width, widths, ranges }
}

fn simple_encoding(
    doc: &Document,
    dict: &Dictionary,
) -> (Box<[Option<char>; 256]>, HashMap<u32, String>) {
    let mut table = Box::new([None; 256]);
    for (code, slot) in table.iter_mut().enumerate() {
        *slot = match code {
            0x80..=0x9F => WIN_ANSI_HIGH[code - 0x80],
            0x00..=0x1F => None,
            _ => char::from_u32(code as u32),
        };
    }

    let mut differences = HashMap::new();
    let encoding = dict.get(b"Encoding").ok().map(|object| resolve(doc, object));

    if let Some(Object::Dictionary(encoding)) = encoding {
        let differences_entry = encoding.get(b"Differences").map(|object| resolve(doc, object));
        if let Ok(Object::Array(entries)) = differences_entry {
            let mut code = 0u32;
            for entry in entries {
                match resolve(doc, entry) {
                    Object::Integer(value) => code = (*value).max(0) as u32,
                    Object::Name(name) => {
                        let name = String::from_utf8_lossy(name);
                        if let Some(text) = glyph_name_to_unicode(&name) {
                            differences.insert(code, text);
                        }
                        code += 1;
                    }
                    _ => {}
                }
            }
        }
    }

    (table, differences)
}

/// Map a glyph name to its text.
pub(crate) fn glyph_name_to_unicode(name: &str) -> Option<String> {
    if name.len() == 1 && name.chars().all(|ch| ch.is_ascii_alphabetic()) {
        return Some(name.to_owned());
    }

    if let Some(hex) = name.strip_prefix("uni") {
        if hex.len() >= 4 && hex.len() % 4 == 0 {
            let units: Option<Vec<u16>> = hex
                .as_bytes()
                .chunks(4)
                .map(|chunk| u16::from_str_radix(std::str::from_utf8(chunk).ok()?, 16).ok())
                .collect();
            return units.map(|units| String::from_utf16_lossy(&units));
        }
    }

    if let Some(hex) = name.strip_prefix('u') {
        if (4..=6).contains(&hex.len()) {
            if let Some(ch) = u32::from_str_radix(hex, 16).ok().and_then(char::from_u32) {
                return Some(ch.to_string());
            }
        }
    }

    let text = match name {
        "space" | "nbspace" => " ",
        "exclam" => "!",
        "quotedbl" => "\"",
        "numbersign" => "#",
        "dollar" => "$",
        "percent" => "%",
        "ampersand" => "&",
        "quotesingle" => "'",
        "quoteright" => "\u{2019}",
        "quoteleft" => "\u{2018}",
        "quotedblleft" => "\u{201C}",
        "quotedblright" => "\u{201D}",
        "parenleft" => "(",
        "parenright" => ")",
        "asterisk" => "*",
        "plus" => "+",
        "comma" => ",",
        "hyphen" | "minus" => "-",
        "period" => ".",
        "slash" => "/",
        "zero" => "0",
        "one" => "1",
        "two" => "2",
        "three" => "3",
        "four" => "4",
        "five" => "5",
        "six" => "6",
        "seven" => "7",
        "eight" => "8",
        "nine" => "9",
        "colon" => ":",
        "semicolon" => ";",
        "less" => "<",
        "equal" => "=",
        "greater" => ">",
        "question" => "?",
        "at" => "@",
        "bracketleft" => "[",
        "backslash" => "\\",
        "bracketright" => "]",
        "asciicircum" => "^",
        "underscore" => "_",
        "grave" => "`",
        "braceleft" => "{",
        "bar" => "|",
        "braceright" => "}",
        "asciitilde" => "~",
        "bullet" => "\u{2022}",
        "endash" => "\u{2013}",
        "emdash" => "\u{2014}",
        "ellipsis" => "\u{2026}",
        "fi" => "fi",
        "fl" => "fl",
        "ff" => "ff",
        "ffi" => "ffi",
        "ffl" => "ffl",
        _ => return None,
    };
    Some(text.to_owned())
}
