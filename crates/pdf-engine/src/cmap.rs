//! ToUnicode CMap parsing.
//!
//! Only the subset needed to map character codes to text is understood:
//! codespace ranges, `bfchar` and `bfrange` sections. Everything else in the
//! CMap program is skipped.

use std::borrow::Cow;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Hex(Vec<u8>),
    Name(String),
    Keyword(String),
    ArrayStart,
    ArrayEnd,
}

/// Incrementing `bfrange`, resolved on lookup.
#[derive(Debug, Clone, PartialEq)]
struct CodeRange {
    start: u32,
    end: u32,
    base: Vec<u16>,
}

impl CodeRange {
    fn text(&self, code: u32) -> Option<String> {
        if code < self.start || code > self.end {
            return None;
        }
        let mut units = self.base.clone();
        if let Some(last) = units.last_mut() {
            *last = last.wrapping_add((code - self.start) as u16);
        }
        Some(String::from_utf16_lossy(&units))
    }

    fn span(&self) -> usize {
        ((self.end - self.start) as usize).saturating_add(1)
    }
}

/// Code-to-text mapping read from a `/ToUnicode` stream.
#[derive(Debug, Clone, Default)]
pub struct ToUnicodeMap {
    mappings: HashMap<u32, String>,
    ranges: Vec<CodeRange>,
    code_lengths: Vec<usize>,
}

impl ToUnicodeMap {
    pub fn parse(data: &[u8]) -> ToUnicodeMap {
        let tokens = tokenize(data);
        let mut map = ToUnicodeMap::default();
        let mut index = 0;

        while index < tokens.len() {
            match &tokens[index] {
                Token::Keyword(keyword) if keyword == "begincodespacerange" => {
                    index += 1;
                    while let (Some(Token::Hex(low)), Some(Token::Hex(_))) =
                        (tokens.get(index), tokens.get(index + 1))
                    {
                        map.add_code_length(low.len());
                        index += 2;
                    }
                }
                Token::Keyword(keyword) if keyword == "beginbfchar" => {
                    index += 1;
                    while let (Some(Token::Hex(source)), Some(target)) =
                        (tokens.get(index), tokens.get(index + 1))
                    {
                        if let Some(text) = token_text(target) {
                            map.insert(source, text);
                        }
                        index += 2;
                    }
                }
                Token::Keyword(keyword) if keyword == "beginbfrange" => {
                    index += 1;
                    index = map.parse_ranges(&tokens, index);
                }
                _ => index += 1,
            }
        }

        map
    }

    fn parse_ranges(&mut self, tokens: &[Token], mut index: usize) -> usize {
        while let (Some(Token::Hex(low)), Some(Token::Hex(high))) =
            (tokens.get(index), tokens.get(index + 1))
        {
            let start = code_value(low);
            let end = code_value(high);
            index += 2;

            match tokens.get(index) {
                Some(Token::Hex(target)) => {
                    if start <= end {
                        if self.code_lengths.is_empty() {
                            self.add_code_length(low.len());
                        }
                        self.ranges.push(CodeRange { start, end, base: utf16_units(target) });
                    }
                    index += 1;
                }
                Some(Token::ArrayStart) => {
                    index += 1;
                    let mut code = start;
                    while let Some(Token::Hex(target)) = tokens.get(index) {
                        if code <= end {
                            self.insert_code(code, low.len(), decode_utf16be(target));
                        }
                        code = code.saturating_add(1);
                        index += 1;
                    }
                    if tokens.get(index) == Some(&Token::ArrayEnd) {
                        index += 1;
                    }
                }
                _ => break,
            }
        }
        index
    }

    fn insert(&mut self, source: &[u8], text: String) {
        self.insert_code(code_value(source), source.len(), text);
    }

    fn insert_code(&mut self, code: u32, byte_len: usize, text: String) {
        if self.code_lengths.is_empty() {
            self.add_code_length(byte_len);
        }
        self.mappings.insert(code, text);
    }

    fn add_code_length(&mut self, len: usize) {
        if len > 0 && !self.code_lengths.contains(&len) {
            self.code_lengths.push(len);
        }
    }

    pub fn get(&self, code: u32) -> Option<Cow<'_, str>> {
        if let Some(text) = self.mappings.get(&code) {
            return Some(Cow::Borrowed(text.as_str()));
        }
        self.ranges.iter().rev().find_map(|range| range.text(code)).map(Cow::Owned)
    }

    /// Byte length of character codes, when the CMap declares a single one.
    pub fn uniform_code_length(&self) -> Option<usize> {
        match self.code_lengths.as_slice() {
            [len] => Some(*len),
            _ => None,
        }
    }

    /// Number of mapped codes.
    pub fn len(&self) -> usize {
        self.ranges
            .iter()
            .fold(self.mappings.len(), |total, range| total.saturating_add(range.span()))
    }

    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty() && self.ranges.is_empty()
    }
}

fn token_text(token: &Token) -> Option<String> {
    match token {
        Token::Hex(bytes) => Some(decode_utf16be(bytes)),
        Token::Name(name) => crate::font::glyph_name_to_unicode(name),
        _ => None,
    }
}

fn code_value(bytes: &[u8]) -> u32 {
    bytes.iter().take(4).fold(0u32, |acc, byte| (acc << 8) | u32::from(*byte))
}

fn utf16_units(bytes: &[u8]) -> Vec<u16> {
    bytes
        .chunks(2)
        .map(|pair| match pair {
            [hi, lo] => u16::from_be_bytes([*hi, *lo]),
            [single] => u16::from(*single),
            _ => 0,
        })
        .collect()
}

fn decode_utf16be(bytes: &[u8]) -> String {
    String::from_utf16_lossy(&utf16_units(bytes))
}

fn tokenize(data: &[u8]) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut pos = 0;

    while pos < data.len() {
        let byte = data[pos];
        match byte {
            b'%' => {
                while pos < data.len() && data[pos] != b'\n' && data[pos] != b'\r' {
                    pos += 1;
                }
            }
            b'<' if data.get(pos + 1) == Some(&b'<') => pos += 2,
            b'>' if data.get(pos + 1) == Some(&b'>') => pos += 2,
            b'<' => {
                let start = pos + 1;
                let end = data[start..]
                    .iter()
                    .position(|b| *b == b'>')
                    .map_or(data.len(), |p| start + p);
                tokens.push(Token::Hex(parse_hex(&data[start..end])));
                pos = end + 1;
            }
            b'[' => {
                tokens.push(Token::ArrayStart);
                pos += 1;
            }
            b']' => {
                tokens.push(Token::ArrayEnd);
                pos += 1;
            }
            b'(' => {
                // Literal strings only appear in CMap headers; skip them, honouring nesting.
                let mut depth = 0usize;
                while pos < data.len() {
                    match data[pos] {
                        b'\\' => pos += 1,
                        b'(' => depth += 1,
                        b')' => {
                            depth -= 1;
                            if depth == 0 {
                                break;
                            }
                        }
                        _ => {}
                    }
                    pos += 1;
                }
                pos += 1;
            }
            b'/' => {
                let start = pos + 1;
                pos = start;
                while pos < data.len() && is_regular(data[pos]) {
                    pos += 1;
                }
                tokens.push(Token::Name(String::from_utf8_lossy(&data[start..pos]).into_owned()));
            }
            _ if byte.is_ascii_whitespace() => pos += 1,
            _ => {
                let start = pos;
                while pos < data.len() && is_regular(data[pos]) {
                    pos += 1;
                }
                if pos == start {
                    pos += 1;
                    continue;
                }
                let keyword = String::from_utf8_lossy(&data[start..pos]).into_owned();
                tokens.push(Token::Keyword(keyword));
            }
        }
    }

    tokens
}

fn is_regular(byte: u8) -> bool {
    !byte.is_ascii_whitespace() && !b"()<>[]{}/%".contains(&byte)
}

fn parse_hex(digits: &[u8]) -> Vec<u8> {
    let nibbles: Vec<u8> = digits
        .iter()
        .filter_map(|digit| (*digit as char).to_digit(16).map(|value| value as u8))
        .collect();

    nibbles
        .chunks(2)
        .map(|pair| match pair {
            [hi, lo] => (hi << 4) | lo,
            [hi] => hi << 4,
            _ => 0,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &[u8] = b"/CIDInit /ProcSet findresource begin
12 dict begin
begincmap
/CIDSystemInfo << /Registry (Adobe) /Ordering (UCS) /Supplement 0 >> def
/CMapName /Adobe-Identity-UCS def
1 begincodespacerange
<0000> <FFFF>
endcodespacerange
2 beginbfchar
<0003> <0020>
<0011> <0627>
endbfchar
2 beginbfrange
<0020> <0022> <0041>
<0030> <0031> [<0066006C> <D83DDE00>]
endbfrange
endcmap
CMapName currentdict /CMap defineresource pop
end
end";

    #[test]
    fn parses_bfchar_entries() {
        let map = ToUnicodeMap::parse(SAMPLE);
        assert_eq!(map.get(0x0003).as_deref(), Some(" "));
        assert_eq!(map.get(0x0011).as_deref(), Some("\u{0627}"));
    }

    #[test]
    fn parses_incrementing_bfrange() {
        let map = ToUnicodeMap::parse(SAMPLE);
        assert_eq!(map.get(0x0020).as_deref(), Some("A"));
        assert_eq!(map.get(0x0021).as_deref(), Some("B"));
        assert_eq!(map.get(0x0022).as_deref(), Some("C"));
        assert_eq!(map.get(0x0023).as_deref(), None);
    }

    #[test]
    fn parses_array_bfrange_with_ligatures_and_surrogates() {
        let map = ToUnicodeMap::parse(SAMPLE);
        assert_eq!(map.get(0x0030).as_deref(), Some("fl"));
        assert_eq!(map.get(0x0031).as_deref(), Some("\u{1F600}"));
    }

    #[test]
    fn codespace_defines_code_length() {
        let map = ToUnicodeMap::parse(SAMPLE);
        assert_eq!(map.uniform_code_length(), Some(2));
        assert_eq!(map.len(), 7);
    }

    #[test]
    fn single_byte_maps_infer_length_from_entries() {
        let map = ToUnicodeMap::parse(b"1 beginbfchar <41> <0061> endbfchar");
        assert_eq!(map.uniform_code_length(), Some(1));
        assert_eq!(map.get(0x41).as_deref(), Some("a"));
    }

    #[test]
    fn garbage_yields_empty_map() {
        let map = ToUnicodeMap::parse(b"this is not a cmap ))) <<");
        assert!(map.is_empty());
    }

    #[test]
    fn huge_bfrange_is_kept_as_a_span() {
        let map = ToUnicodeMap::parse(b"1 beginbfrange <00000000> <FFFFFFFF> <0041> endbfrange");
        assert_eq!(map.get(0).as_deref(), Some("A"));
        assert_eq!(map.get(1).as_deref(), Some("B"));
        assert!(map.len() > usize::from(u16::MAX));
        assert_eq!(map.uniform_code_length(), Some(4));
    }

    #[test]
    fn bfchar_wins_over_range() {
        let map = ToUnicodeMap::parse(
            b"1 beginbfrange <0000> <00FF> <0061> endbfrange 1 beginbfchar <0001> <0627> endbfchar",
        );
        assert_eq!(map.get(0x0001).as_deref(), Some("\u{0627}"));
        assert_eq!(map.get(0x0002).as_deref(), Some("c"));
        assert_eq!(map.get(0x0100), None);
    }
}
