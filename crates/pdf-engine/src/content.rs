//! Content-stream interpreter that places text on the page.
//!
//! Only the operators that move the pen or show text are interpreted. Paths,
//! colors and images are ignored; form XObjects are followed so text inside
//! them is found at its painted position. Inline images are cut out of the
//! stream before decoding, since their binary data is not PDF syntax.

use crate::font::Font;
use crate::geometry::{number, Matrix};
use crate::text::TextChar;
use crate::{resolve, PdfEngineError};
use lopdf::content::Content;
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use std::borrow::Cow;
use std::collections::HashMap;
use std::rc::Rc;

const MAX_FORM_DEPTH: usize = 16;
/// Form XObjects painted per page before the rest are skipped.
const MAX_FORM_PAINTS: usize = 4096;

#[derive(Debug, Clone)]
struct TextParams {
    font: Option<Rc<Font>>,
    size: f32,
    char_spacing: f32,
    word_spacing: f32,
    horizontal_scaling: f32,
    leading: f32,
    rise: f32,
}

impl Default for TextParams {
    fn default() -> Self {
        Self {
            font: None,
            size: 0.0,
            char_spacing: 0.0,
            word_spacing: 0.0,
            horizontal_scaling: 1.0,
            leading: 0.0,
            rise: 0.0,
        }
    }
}

#[derive(Debug, Clone)]
struct GraphicsState {
    ctm: Matrix,
    text: TextParams,
}

/// Collects positioned characters from a page and the forms it paints.
pub(crate) struct TextCollector<'a> {
    doc: &'a Document,
    fonts: HashMap<ObjectId, Rc<Font>>,
    chars: Vec<TextChar>,
    /// Forms currently being painted, innermost last.
    active_forms: Vec<ObjectId>,
    forms_painted: usize,
}

impl<'a> TextCollector<'a> {
    pub fn new(doc: &'a Document) -> Self {
        Self {
            doc,
            fonts: HashMap::new(),
            chars: Vec::new(),
            active_forms: Vec::new(),
            forms_painted: 0,
        }
    }

    pub fn collect_page(mut self, page_id: ObjectId) -> Result<Vec<TextChar>, PdfEngineError> {
        let doc = self.doc;
        let page = doc.get_dictionary(page_id)?;
        let content = page_content(doc, page)?;
        let empty = Dictionary::new();
        let resources = inherited(doc, page_id, b"Resources")
            .map(|object| resolve(doc, object))
            .and_then(|object| object.as_dict().ok())
            .unwrap_or(&empty);

        self.run(&content, resources, Matrix::IDENTITY, 0)?;
        Ok(self.chars)
    }

    fn run(
        &mut self,
        content: &[u8],
        resources: &Dictionary,
        ctm: Matrix,
        depth: usize,
    ) -> Result<(), PdfEngineError> {
        let content = strip_inline_images(content)?;
        let expected = count_operators(&content);
        let content = Content::decode(&content)
            .map_err(|err| {
                PdfEngineError::Content(format!("failed to decode content stream: {err}"))
            })?;
        if content.operations.len() < expected {
            return Err(PdfEngineError::Content(format!(
                "content stream decoded {} of {expected} operators",
                content.operations.len()
            )));
        }

        let mut state = GraphicsState { ctm, text: TextParams::default() };
        let mut saved = Vec::new();
        let mut tm = Matrix::IDENTITY;
        let mut tlm = Matrix::IDENTITY;

        for operation in &content.operations {
            let operands = operation.operands.as_slice();
            let operand = |index: usize| operands.get(index).and_then(number).unwrap_or(0.0);

            match operation.operator.as_str() {
                "q" => saved.push(state.clone()),
                "Q" => {
                    if let Some(previous) = saved.pop() {
                        state = previous;
                    }
                }
                "cm" => {
                    if let Some(matrix) = Matrix::from_objects(operands) {
                        state.ctm = matrix.then(&state.ctm);
                    }
                }
                "BT" => {
                    tm = Matrix::IDENTITY;
                    tlm = Matrix::IDENTITY;
                }
                "Tf" => {
                    state.text.font = match operands.first() {
                        Some(Object::Name(name)) => self.font(resources, name),
                        _ => None,
                    };
                    state.text.size = operand(1);
                }
                "Tc" => state.text.char_spacing = operand(0),
                "Tw" => state.text.word_spacing = operand(0),
                "Tz" => state.text.horizontal_scaling = operand(0) / 100.0,
                "TL" => state.text.leading = operand(0),
                "Ts" => state.text.rise = operand(0),
                "Td" => {
                    tlm = Matrix::translation(operand(0), operand(1)).then(&tlm);
                    tm = tlm;
                }
                "TD" => {
                    state.text.leading = -operand(1);
                    tlm = Matrix::translation(operand(0), operand(1)).then(&tlm);
                    tm = tlm;
                }
                "Tm" => {
                    if let Some(matrix) = Matrix::from_objects(operands) {
                        tlm = matrix;
                        tm = matrix;
                    }
                }
                "T*" => {
                    tlm = Matrix::translation(0.0, -state.text.leading).then(&tlm);
                    tm = tlm;
                }
                "Tj" => {
                    if let Some(Object::String(bytes, _)) = operands.first() {
                        self.show(bytes, &state, &mut tm);
                    }
                }
                "'" => {
                    tlm = Matrix::translation(0.0, -state.text.leading).then(&tlm);
                    tm = tlm;
                    if let Some(Object::String(bytes, _)) = operands.first() {
                        self.show(bytes, &state, &mut tm);
                    }
                }
                "\"" => {
                    state.text.word_spacing = operand(0);
                    state.text.char_spacing = operand(1);
                    tlm = Matrix::translation(0.0, -state.text.leading).then(&tlm);
                    tm = tlm;
                    if let Some(Object::String(bytes, _)) = operands.get(2) {
                        self.show(bytes, &state, &mut tm);
                    }
                }
                "TJ" => {
                    let Some(Object::Array(items)) = operands.first() else {
                        continue;
                    };
                    for item in items {
                        match item {
                            Object::String(bytes, _) => self.show(bytes, &state, &mut tm),
                            other => {
                                if let Some(adjustment) = number(other) {
                                    let tx = -adjustment / 1000.0
                                        * state.text.size
                                        * state.text.horizontal_scaling;
                                    tm = Matrix::translation(tx, 0.0).then(&tm);
                                }
                            }
                        }
                    }
                }
                "Do" => {
                    if let Some(Object::Name(name)) = operands.first() {
                        self.paint_form(resources, name, &state.ctm, depth)?;
                    }
                }
                _ => {}
            }
        }

        Ok(())
    }

    fn show(&mut self, bytes: &[u8], state: &GraphicsState, tm: &mut Matrix) {
        let params = &state.text;
        let Some(font) = params.font.clone() else {
            return;
        };

        for glyph in font.decode(bytes) {
            let mut advance = glyph.width * params.size + params.char_spacing;
            if glyph.is_word_space {
                advance += params.word_spacing;
            }
            advance *= params.horizontal_scaling;

            let box_width = if advance > 0.0 {
                advance
            } else {
                glyph.width * params.size * params.horizontal_scaling
            };
            let bottom = params.rise + font.descent * params.size;
            let top = params.rise + font.ascent * params.size;
            let trm = tm.then(&state.ctm);
            let origin = trm.apply(0.0, params.rise);
            let size = params.size * trm.c.hypot(trm.d);

            let count = glyph.text.chars().count().max(1) as f32;
            for (index, ch) in glyph.text.chars().enumerate() {
                let x0 = box_width * index as f32 / count;
                let x1 = box_width * (index + 1) as f32 / count;
                let bbox = trm.transform_rect(x0, bottom, x1, top);
                self.chars.push(TextChar { ch, bbox, origin, size });
            }

            *tm = Matrix::translation(advance, 0.0).then(tm);
        }
    }

    fn paint_form(
        &mut self,
        resources: &Dictionary,
        name: &[u8],
        ctm: &Matrix,
        depth: usize,
    ) -> Result<(), PdfEngineError> {
        if depth >= MAX_FORM_DEPTH {
            tracing::warn!(depth, "form XObject nesting too deep, skipping");
            return Ok(());
        }

        let doc = self.doc;
        let Some(entry) = resources
            .get(b"XObject")
            .ok()
            .map(|object| resolve(doc, object))
            .and_then(|object| object.as_dict().ok())
            .and_then(|xobjects| xobjects.get(name).ok())
        else {
            return Ok(());
        };
        let form_id = entry.as_reference().ok();
        if form_id.is_some_and(|id| self.active_forms.contains(&id)) {
            tracing::debug!(
                form = %String::from_utf8_lossy(name),
                "form XObject paints itself, skipping"
            );
            return Ok(());
        }
        let Ok(stream) = resolve(doc, entry).as_stream() else {
            return Ok(());
        };

        if !matches!(stream.dict.get(b"Subtype"), Ok(Object::Name(subtype)) if subtype == b"Form") {
            return Ok(());
        }

        let matrix = stream
            .dict
            .get(b"Matrix")
            .ok()
            .map(|object| resolve(doc, object))
            .and_then(|object| object.as_array().ok())
            .and_then(|array| Matrix::from_objects(array))
            .unwrap_or(Matrix::IDENTITY);
        let form_resources = stream
            .dict
            .get(b"Resources")
            .ok()
            .map(|object| resolve(doc, object))
            .and_then(|object| object.as_dict().ok())
            .unwrap_or(resources);

        if self.forms_painted >= MAX_FORM_PAINTS {
            tracing::warn!(
                painted = self.forms_painted,
                "too many form XObjects painted, skipping"
            );
            return Ok(());
        }
        self.forms_painted += 1;

        let content = stream_content(stream)?;
        self.active_forms.extend(form_id);
        let result = self.run(&content, form_resources, matrix.then(ctm), depth + 1);
        if form_id.is_some() {
            self.active_forms.pop();
        }
        result
    }

    fn font(&mut self, resources: &Dictionary, name: &[u8]) -> Option<Rc<Font>> {
        let doc = self.doc;
        let entry = resources
            .get(b"Font")
            .ok()
            .map(|object| resolve(doc, object))
            .and_then(|object| object.as_dict().ok())
            .and_then(|fonts| fonts.get(name).ok());

        let font = match entry {
            Some(Object::Reference(id)) => {
                if let Some(font) = self.fonts.get(id) {
                    return Some(font.clone());
                }
                let dict = doc.get_object(*id).ok()?.as_dict().ok()?;
                let font = Rc::new(Font::load(doc, dict));
                self.fonts.insert(*id, font.clone());
                Some(font)
            }
            Some(Object::Dictionary(dict)) => Some(Rc::new(Font::load(doc, dict))),
            _ => None,
        };

        if font.is_none() {
            tracing::debug!(font = %String::from_utf8_lossy(name), "font resource not found");
        }
        font
    }
}

/// Look up a page attribute, walking up the page tree through `/Parent`.
pub(crate) fn inherited<'a>(
    doc: &'a Document,
    page_id: ObjectId,
    key: &[u8],
) -> Option<&'a Object> {
    let mut current = page_id;
    // Guards against cyclic /Parent chains.
    for _ in 0..64 {
        let dict = doc.get_dictionary(current).ok()?;
        if let Ok(value) = dict.get(key) {
            return Some(value);
        }
        current = dict.get(b"Parent").ok()?.as_reference().ok()?;
    }
    None
}

/// Concatenated, decoded bytes of a page's `/Contents`.
fn page_content(doc: &Document, page: &Dictionary) -> Result<Vec<u8>, PdfEngineError> {
    let Ok(contents) = page.get(b"Contents") else {
        return Ok(Vec::new());
    };

    match resolve(doc, contents) {
        Object::Stream(stream) => stream_content(stream),
        Object::Array(parts) => {
            let mut content = Vec::new();
            for part in parts {
                let stream = resolve(doc, part).as_stream().map_err(|err| {
                    PdfEngineError::Content(format!("/Contents array item is not a stream: {err}"))
                })?;
                if !content.is_empty() {
                    content.push(b'\n');
                }
                content.extend_from_slice(&stream_content(stream)?);
            }
            Ok(content)
        }
        Object::Null => Ok(Vec::new()),
        _ => Err(PdfEngineError::Content("/Contents is not a stream or array".to_owned())),
    }
}

fn stream_content(stream: &Stream) -> Result<Vec<u8>, PdfEngineError> {
    if stream.dict.get(b"Filter").is_ok() {
        stream
            .decompressed_content()
            .map_err(|err| {
                PdfEngineError::Content(format!("failed to decompress content stream: {err}"))
            })
    } else {
        Ok(stream.content.clone())
    }
}

/// Replace every `BI ... ID <data> EI` inline image with a single space.
fn strip_inline_images(content: &[u8]) -> Result<Cow<'_, [u8]>, PdfEngineError> {
    let unterminated = || PdfEngineError::Content("unterminated inline image".to_owned());
    let mut stripped: Option<Vec<u8>> = None;
    let mut copied = 0;
    let mut pos = 0;

    while let Some((start, end)) = next_token(content, pos) {
        pos = end;
        if &content[start..end] != b"BI" {
            continue;
        }

        let data = loop {
            let (token_start, token_end) = next_token(content, pos).ok_or_else(unterminated)?;
            pos = token_end;
            if &content[token_start..token_end] == b"ID" {
                // A single whitespace byte separates ID from the image data.
                break (token_end + 1).min(content.len());
            }
        };
        let image_end = inline_image_end(content, data).ok_or_else(unterminated)?;

        let output = stripped.get_or_insert_with(|| Vec::with_capacity(content.len()));
        output.extend_from_slice(&content[copied..start]);
        output.push(b' ');
        copied = image_end;
        pos = image_end;
    }

    Ok(match stripped {
        Some(mut output) => {
            output.extend_from_slice(&content[copied..]);
            Cow::Owned(output)
        }
        None => Cow::Borrowed(content),
    })
}

/// Offset just past the `EI` that closes image data starting at `data`.
fn inline_image_end(content: &[u8], data: usize) -> Option<usize> {
    (data..content.len().saturating_sub(1)).find_map(|index| {
        let preceded = index == data || content[index - 1].is_ascii_whitespace();
        let followed = content.get(index + 2).map_or(true, |byte| !is_regular(*byte));
        (preceded && followed && &content[index..index + 2] == b"EI").then_some(index + 2)
    })
}

/// Operators in a content stream: bare keywords other than numbers and
/// `true`/`false`/`null`.
fn count_operators(content: &[u8]) -> usize {
    let mut count = 0;
    let mut pos = 0;
    while let Some((start, end)) = next_token(content, pos) {
        pos = end;
        let token = &content[start..end];
        let numeric = matches!(token[0], b'0'..=b'9' | b'+' | b'-' | b'.');
        if !numeric && !matches!(token, b"true" | b"false" | b"null") {
            count += 1;
        }
    }
    count
}

/// Span of the next bare keyword or number at or after `pos`, skipping
/// strings, names and comments.
fn next_token(content: &[u8], mut pos: usize) -> Option<(usize, usize)> {
    while pos < content.len() {
        match content[pos] {
            b'%' => {
                while pos < content.len() && !matches!(content[pos], b'\r' | b'\n') {
                    pos += 1;
                }
            }
            b'(' => pos = skip_literal_string(content, pos + 1),
            b'<' if content.get(pos + 1) == Some(&b'<') => pos += 2,
            b'<' => {
                pos = content[pos..]
                    .iter()
                    .position(|byte| *byte == b'>')
                    .map_or(content.len(), |offset| pos + offset + 1);
            }
            b'/' => {
                pos += 1;
                while pos < content.len() && is_regular(content[pos]) {
                    pos += 1;
                }
            }
            byte if is_regular(byte) => {
                let start = pos;
                while pos < content.len() && is_regular(content[pos]) {
                    pos += 1;
                }
                return Some((start, pos));
            }
            _ => pos += 1,
        }
    }
    None
}

/// Offset just past the `)` closing a literal string whose body starts at `pos`.
fn skip_literal_string(content: &[u8], mut pos: usize) -> usize {
    let mut depth = 1usize;
    while pos < content.len() {
        match content[pos] {
            b'\\' => pos += 1,
            b'(' => depth += 1,
            b')' => {
                depth -= 1;
                if depth == 0 {
                    return pos + 1;
                }
            }
            _ => {}
        }
        pos += 1;
    }
    content.len()
}

fn is_regular(byte: u8) -> bool {
    !matches!(byte, b'\0' | b'\t' | b'\n' | b'\x0C' | b'\r' | b' ')
        && !b"()<>[]{}/%".contains(&byte)
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::dictionary;

    fn page_with_content(content: &[u8], extra_resources: Dictionary) -> (Document, ObjectId) {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Courier",
        });
        let mut resources = dictionary! { "Font" => dictionary! { "F1" => font_id } };
        for (key, value) in extra_resources.iter() {
            resources.set(key.clone(), value.clone());
        }
        let content_id = doc.add_object(Stream::new(Dictionary::new(), content.to_vec()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            "Contents" => content_id,
        });
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![Object::from(page_id)],
                "Count" => 1,
                "Resources" => resources,
            }),
        );
        (doc, page_id)
    }

    fn text_of(chars: &[TextChar]) -> String {
        chars.iter().map(|c| c.ch).collect()
    }

    #[test]
    fn places_glyphs_along_baseline() {
        let content = b"BT /F1 10 Tf 100 700 Td (abc) Tj ET";
        let (doc, page_id) = page_with_content(content, Dictionary::new());
        let chars = TextCollector::new(&doc).collect_page(page_id).expect("page should interpret");

        assert_eq!(text_of(&chars), "abc");
        assert!((chars[0].bbox.x0 - 100.0).abs() < 1e-3);
        assert!((chars[0].bbox.x1 - 106.0).abs() < 1e-3);
        assert!((chars[2].bbox.x1 - 118.0).abs() < 1e-3);
        assert!((chars[0].bbox.y0 - 698.0).abs() < 1e-3);
        assert!((chars[0].bbox.y1 - 708.0).abs() < 1e-3);
        assert_eq!(chars[0].size, 10.0);
    }

    #[test]
    fn resources_are_inherited_from_page_tree() {
        let (doc, page_id) = page_with_content(b"BT /F1 12 Tf 0 0 Td (x) Tj ET", Dictionary::new());
        let chars = TextCollector::new(&doc).collect_page(page_id).expect("page should interpret");
        assert_eq!(chars.len(), 1);
    }

    #[test]
    fn tj_adjustments_and_leading_move_the_pen() {
        let content = b"BT /F1 10 Tf 14 TL 50 500 Td [(a) -1000 (b)] TJ T* (c) Tj ET";
        let (doc, page_id) = page_with_content(content, Dictionary::new());
        let chars = TextCollector::new(&doc).collect_page(page_id).expect("page should interpret");

        assert_eq!(text_of(&chars), "abc");
        assert!((chars[1].bbox.x0 - 66.0).abs() < 1e-3);
        assert!((chars[2].bbox.x0 - 50.0).abs() < 1e-3);
        assert!((chars[2].origin.1 - 486.0).abs() < 1e-3);
    }

    #[test]
    fn ctm_and_graphics_state_stack_apply() {
        let content = b"q 2 0 0 2 10 10 cm BT /F1 10 Tf (a) Tj ET Q BT /F1 10 Tf (b) Tj ET";
        let (doc, page_id) = page_with_content(content, Dictionary::new());
        let chars = TextCollector::new(&doc).collect_page(page_id).expect("page should interpret");

        assert!((chars[0].bbox.x0 - 10.0).abs() < 1e-3);
        assert!((chars[0].bbox.x1 - 22.0).abs() < 1e-3);
        assert_eq!(chars[0].size, 20.0);
        assert!((chars[1].bbox.x0 - 0.0).abs() < 1e-3);
        assert_eq!(chars[1].size, 10.0);
    }

    #[test]
    fn text_inside_form_xobjects_is_collected() {
        let (mut doc, page_id) =
            page_with_content(b"q 1 0 0 1 200 0 cm /Fm1 Do Q", Dictionary::new());
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Courier",
        });
        let form_id = doc.add_object(Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Form",
                "BBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
                "Matrix" => vec![1.into(), 0.into(), 0.into(), 1.into(), 0.into(), 100.into()],
                "Resources" => dictionary! { "Font" => dictionary! { "F1" => font_id } },
            },
            b"BT /F1 10 Tf 0 0 Td (form) Tj ET".to_vec(),
        ));
        if let Ok(Object::Dictionary(page)) = doc.get_object_mut(page_id) {
            page.set("Resources", dictionary! { "XObject" => dictionary! { "Fm1" => form_id } });
        }

        let chars = TextCollector::new(&doc).collect_page(page_id).expect("page should interpret");

        assert_eq!(text_of(&chars), "form");
        assert!((chars[0].bbox.x0 - 200.0).abs() < 1e-3);
        assert!((chars[0].origin.1 - 100.0).abs() < 1e-3);
    }

    #[test]
    fn unknown_font_skips_text() {
        let (doc, page_id) = page_with_content(b"BT /F9 10 Tf (abc) Tj ET", Dictionary::new());
        let chars = TextCollector::new(&doc).collect_page(page_id).expect("page should interpret");
        assert!(chars.is_empty());
    }

    #[test]
    fn text_after_inline_image_is_collected() {
        let content: &[u8] = b"BT /F1 10 Tf 0 0 Td (ab) Tj ET
        q BI /W 2 /H 1 /BPC 8 /CS /G ID \x00\xFF EI Q
        BT /F1 10 Tf 0 20 Td (cd) Tj ET";
        let (doc, page_id) = page_with_content(content, Dictionary::new());
        let chars = TextCollector::new(&doc).collect_page(page_id).expect("page should interpret");

        assert_eq!(text_of(&chars), "abcd");
        assert!((chars[2].origin.1 - 20.0).abs() < 1e-3);
    }

    #[test]
    fn inline_image_data_may_contain_end_marker_bytes() {
        let content = b"q BI /W 4 /H 1 /BPC 8 /CS /G ID xEIy EI Q BT /F1 10 Tf (BI) Tj ET";
        let stripped = strip_inline_images(content).expect("image should be terminated");

        assert_eq!(&stripped[..], b"q   Q BT /F1 10 Tf (BI) Tj ET");
    }

    #[test]
    fn unterminated_inline_image_is_an_error() {
        let content = b"BT /F1 10 Tf (a) Tj ET BI /W 1 /H 1 ID abc";
        let (doc, page_id) = page_with_content(content, Dictionary::new());
        let result = TextCollector::new(&doc).collect_page(page_id);

        assert!(matches!(result, Err(PdfEngineError::Content(_))));
    }

    #[test]
    fn operators_are_counted_outside_strings_and_comments() {
        let content = b"q 1 0 0 1 0 0 cm BT /F1 10 Tf (x y Tj) Tj [(a) -5 (b)] TJ ET % Tj\nQ";
        assert_eq!(count_operators(content), 8);
        assert_eq!(count_operators(b""), 0);
    }

    #[test]
    fn self_referencing_form_is_painted_once() {
        let (mut doc, page_id) = page_with_content(b"/Fm1 Do", Dictionary::new());
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Courier",
        });
        let form_id = doc.new_object_id();
        doc.objects.insert(
            form_id,
            Object::Stream(Stream::new(
                dictionary! {
                    "Type" => "XObject",
                    "Subtype" => "Form",
                    "BBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
                    "Resources" => dictionary! {
                        "Font" => dictionary! { "F1" => font_id },
                        "XObject" => dictionary! { "Fm1" => form_id },
                    },
                },
                b"BT /F1 10 Tf (a) Tj ET /Fm1 Do /Fm1 Do /Fm1 Do".to_vec(),
            )),
        );
        if let Ok(Object::Dictionary(page)) = doc.get_object_mut(page_id) {
            page.set("Resources", dictionary! { "XObject" => dictionary! { "Fm1" => form_id } });
        }

        let chars = TextCollector::new(&doc).collect_page(page_id).expect("page should interpret");

        assert_eq!(text_of(&chars), "a");
    }

    #[test]
    fn sibling_forms_are_each_painted() {
        let (mut doc, page_id) =
            page_with_content(b"/Fm1 Do 1 0 0 1 0 50 cm /Fm1 Do", Dictionary::new());
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Courier",
        });
        let form_id = doc.add_object(Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Form",
                "Resources" => dictionary! { "Font" => dictionary! { "F1" => font_id } },
            },
            b"BT /F1 10 Tf (ab) Tj ET".to_vec(),
        ));
        if let Ok(Object::Dictionary(page)) = doc.get_object_mut(page_id) {
            page.set("Resources", dictionary! { "XObject" => dictionary! { "Fm1" => form_id } });
        }

        let chars = TextCollector::new(&doc).collect_page(page_id).expect("page should interpret");

        assert_eq!(text_of(&chars), "abab");
    }
}
