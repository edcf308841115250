//! In-memory PDF fixtures for tests.
//!
//! Latin text is set in Helvetica with WinAnsi encoding. Text added through
//! [`FixturePage::composite_text`] goes through a Type0 font with a ToUnicode
//! CMap, one two-byte code per distinct character.

use crate::geometry::Rect;
use crate::PdfEngineError;
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream};
use std::collections::BTreeMap;

/// A 2x1 grayscale inline image drawn in the page corner.
const INLINE_IMAGE: &[u8] =
    b"q 20 0 0 10 300 300 cm\nBI /W 2 /H 1 /BPC 8 /CS /G ID \x00\xFF\nEI Q\n";

#[derive(Debug, Clone)]
struct PlacedText {
    x: f32,
    y: f32,
    size: f32,
    text: String,
    composite: bool,
}

#[derive(Debug, Clone)]
enum Mark {
    Text(PlacedText),
    /// A 2x1 grey inline image.
    InlineImage,
}

#[derive(Debug, Clone, Default)]
pub struct FixturePage {
    marks: Vec<Mark>,
    annotations: Vec<(String, Rect)>,
    media_box: Option<Rect>,
}

impl FixturePage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Helvetica text with its baseline starting at `(x, y)`.
    pub fn text(mut self, x: f32, y: f32, size: f32, text: &str) -> Self {
        let text = text.to_owned();
        self.marks.push(Mark::Text(PlacedText { x, y, size, text, composite: false }));
        self
    }

    /// Text shown through a composite font, in logical character order.
    pub fn composite_text(mut self, x: f32, y: f32, size: f32, text: &str) -> Self {
        let text = text.to_owned();
        self.marks.push(Mark::Text(PlacedText { x, y, size, text, composite: true }));
        self
    }

    /// Paint an inline image after the text added so far.
    pub fn inline_image(mut self) -> Self {
        self.marks.push(Mark::InlineImage);
        self
    }

    pub fn annotation(mut self, subtype: &str, rect: Rect) -> Self {
        self.annotations.push((subtype.to_owned(), rect));
        self
    }

    pub fn highlight(self, rect: Rect) -> Self {
        self.annotation("Highlight", rect)
    }

    pub fn media_box(mut self, rect: Rect) -> Self {
        self.media_box = Some(rect);
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct PdfFixture {
    pages: Vec<FixturePage>,
}

impl PdfFixture {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(mut self, page: FixturePage) -> Self {
        self.pages.push(page);
        self
    }

    pub fn build(&self) -> Document {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();

        let codes = self.composite_codes();
        let helvetica = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
            "Encoding" => "WinAnsiEncoding",
        });
        let mut fonts = dictionary! { "F1" => helvetica };
        if !codes.is_empty() {
            let composite = add_composite_font(&mut doc, &codes);
            fonts.set("F2", composite);
        }
        let resources = doc.add_object(dictionary! { "Font" => fonts });

        let kids: Vec<Object> = self
            .pages
            .iter()
            .map(|page| Object::Reference(add_page(&mut doc, page, pages_id, resources, &codes)))
            .collect();

        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Count" => kids.len() as i64,
                "Kids" => kids,
                "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            }),
        );
        let catalog = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog);
        doc
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, PdfEngineError> {
        let mut bytes = Vec::new();
        self.build().save_to(&mut bytes)?;
        Ok(bytes)
    }

    fn composite_codes(&self) -> BTreeMap<char, u16> {
        let mut codes = BTreeMap::new();
        let chars = self
            .pages
            .iter()
            .flat_map(|page| &page.marks)
            .filter_map(|mark| match mark {
                Mark::Text(text) if text.composite => Some(text),
                _ => None,
            });
        for ch in chars.flat_map(|text| text.text.chars()) {
            let next = codes.len() as u16 + 1;
            codes.entry(ch).or_insert(next);
        }
        codes
    }
}

fn add_page(
    doc: &mut Document,
    page: &FixturePage,
    pages_id: ObjectId,
    resources: ObjectId,
    codes: &BTreeMap<char, u16>,
) -> ObjectId {
    let mut content = Vec::new();
    for mark in &page.marks {
        match mark {
            Mark::Text(text) => {
                let (font, shown) = if text.composite {
                    let hex: String = text
                        .text
                        .chars()
                        .filter_map(|ch| codes.get(&ch))
                        .map(|code| format!("{code:04X}"))
                        .collect();
                    ("F2", format!("<{hex}>"))
                } else {
                    ("F1", literal_string(&text.text))
                };
                let (size, x, y) = (text.size, text.x, text.y);
                let line = format!("BT /{font} {size} Tf {x} {y} Td {shown} Tj ET\n");
                content.extend_from_slice(line.as_bytes());
            }
            Mark::InlineImage => {
                content.extend_from_slice(INLINE_IMAGE);
            }
        }
    }
    let content_id = doc.add_object(Stream::new(Dictionary::new(), content));

    let mut dict = dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Resources" => resources,
        "Contents" => content_id,
    };
    if let Some(media_box) = page.media_box {
        dict.set("MediaBox", media_box.to_pdf_array());
    }
    if !page.annotations.is_empty() {
        let annots: Vec<Object> = page
            .annotations
            .iter()
            .map(|(subtype, rect)| {
                let mut annotation = dictionary! {
                    "Type" => "Annot",
                    "Subtype" => Object::Name(subtype.as_bytes().to_vec()),
                    "Rect" => rect.to_pdf_array(),
                };
                if subtype == "Highlight" {
                    annotation.set("QuadPoints", rect.to_quad_points());
                    annotation.set("C", vec![1.into(), 1.into(), 0.into()]);
                }
                Object::Reference(doc.add_object(annotation))
            })
            .collect();
        dict.set("Annots", annots);
    }
    doc.add_object(dict)
}

fn add_composite_font(doc: &mut Document, codes: &BTreeMap<char, u16>) -> ObjectId {
    let mut cmap = String::from(
        "/CIDInit /ProcSet findresource begin\n12 dict begin\nbegincmap\n\
         /CMapName /Fixture-UCS def\n1 begincodespacerange\n<0000> <FFFF>\nendcodespacerange\n",
    );
    cmap.push_str(&format!("{} beginbfchar\n", codes.len()));
    for (ch, code) in codes {
        let mut units = [0u16; 2];
        let target: String =
            ch.encode_utf16(&mut units).iter().map(|unit| format!("{unit:04X}")).collect();
        cmap.push_str(&format!("<{code:04X}> <{target}>\n"));
    }
    cmap.push_str("endbfchar\nendcmap\nCMapName currentdict /CMap defineresource pop\nend\nend\n");
    let to_unicode = doc.add_object(Stream::new(Dictionary::new(), cmap.into_bytes()));

    let descendant = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "CIDFontType2",
        "BaseFont" => "FixtureSans",
        "CIDSystemInfo" => dictionary! {
            "Registry" => Object::string_literal("Adobe"),
            "Ordering" => Object::string_literal("Identity"),
            "Supplement" => 0,
        },
        "DW" => 500,
    });

    doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type0",
        "BaseFont" => "FixtureSans",
        "Encoding" => "Identity-H",
        "DescendantFonts" => vec![Object::Reference(descendant)],
        "ToUnicode" => to_unicode,
    })
}

/// PDF literal string in WinAnsi; characters outside Latin-1 become `?`.
fn literal_string(text: &str) -> String {
    let mut literal = String::from("(");
    for ch in text.chars() {
        match ch {
            '(' | ')' | '\\' => {
                literal.push('\\');
                literal.push(ch);
            }
            ' '..='~' => literal.push(ch),
            _ => {
                let code = u32::from(ch);
                let byte = if code <= 0xFF { code } else { u32::from(b'?') };
                literal.push_str(&format!("\\{byte:03o}"));
            }
        }
    }
    literal.push(')');
    literal
}
