//! Reading page annotations and writing highlight annotations.

use crate::geometry::{Rect, Rgb};
use crate::{resolve, PdfEngineError};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream};

/// Annotation subtype, as far as highlighting cares.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnnotationKind {
    Highlight,
    Underline,
    StrikeOut,
    Squiggly,
    Text,
    FreeText,
    Link,
    Square,
    Circle,
    Ink,
    Popup,
    Other(String),
}

impl AnnotationKind {
    pub fn from_subtype(subtype: &str) -> Self {
        match subtype {
            "Highlight" => AnnotationKind::Highlight,
            "Underline" => AnnotationKind::Underline,
            "StrikeOut" => AnnotationKind::StrikeOut,
            "Squiggly" => AnnotationKind::Squiggly,
            "Text" => AnnotationKind::Text,
            "FreeText" => AnnotationKind::FreeText,
            "Link" => AnnotationKind::Link,
            "Square" => AnnotationKind::Square,
            "Circle" => AnnotationKind::Circle,
            "Ink" => AnnotationKind::Ink,
            "Popup" => AnnotationKind::Popup,
            other => AnnotationKind::Other(other.to_owned()),
        }
    }

    pub fn is_highlight(&self) -> bool {
        matches!(self, AnnotationKind::Highlight)
    }
}

/// An annotation found on a page.
#[derive(Debug, Clone, PartialEq)]
pub struct PageAnnotation {
    pub kind: AnnotationKind,
    pub rect: Rect,
}

pub(crate) fn page_annotations(
    doc: &Document,
    page_id: ObjectId,
) -> Result<Vec<PageAnnotation>, PdfEngineError> {
    let page = doc.get_dictionary(page_id)?;
    let Ok(annots) = page.get(b"Annots") else {
        return Ok(Vec::new());
    };
    let entries = match resolve(doc, annots) {
        Object::Array(entries) => entries,
        Object::Null => return Ok(Vec::new()),
        _ => return Err(PdfEngineError::Backend("/Annots is not an array".to_owned())),
    };

    let annotations = entries
        .iter()
        .filter_map(|entry| resolve(doc, entry).as_dict().ok())
        .filter_map(|dict| {
            let kind = match dict.get(b"Subtype").ok().map(|object| resolve(doc, object)) {
                Some(Object::Name(name)) => {
                    AnnotationKind::from_subtype(&String::from_utf8_lossy(name))
                }
                _ => return None,
            };
            let rect = resolve(doc, dict.get(b"Rect").ok()?).as_array().ok()?;
            Some(PageAnnotation { kind, rect: Rect::from_pdf_array(rect)? })
        })
        .collect();

    Ok(annotations)
}

pub(crate) fn add_highlight(
    doc: &mut Document,
    page_id: ObjectId,
    rect: Rect,
    color: Rgb,
) -> Result<ObjectId, PdfEngineError> {
    let appearance_id = doc.add_object(appearance_stream(rect, color));
    let annotation_id = doc.add_object(dictionary! {
        "Type" => "Annot",
        "Subtype" => "Highlight",
        "Rect" => rect.to_pdf_array(),
        "QuadPoints" => rect.to_quad_points(),
        "C" => color.to_pdf_array(),
        "F" => 4,
        "P" => page_id,
        "AP" => dictionary! { "N" => appearance_id },
    });

    attach_to_page(doc, page_id, annotation_id)?;
    Ok(annotation_id)
}

/// Normal appearance: the rectangle filled with the color, multiplied onto the page.
fn appearance_stream(rect: Rect, color: Rgb) -> Stream {
    let content = format!(
        "/H0 gs {} {} {} rg {} {} {} {} re f",
        color.r,
        color.g,
        color.b,
        rect.x0,
        rect.y0,
        rect.width(),
        rect.height()
    );
    let dict = dictionary! {
        "Type" => "XObject",
        "Subtype" => "Form",
        "BBox" => rect.to_pdf_array(),
        "Resources" => dictionary! {
            "ExtGState" => dictionary! {
                "H0" => dictionary! {
                    "Type" => "ExtGState",
                    "BM" => "Multiply",
                },
            },
        },
    };
    Stream::new(dict, content.into_bytes())
}

fn attach_to_page(
    doc: &mut Document,
    page_id: ObjectId,
    annotation_id: ObjectId,
) -> Result<(), PdfEngineError> {
    let existing = doc.get_dictionary(page_id)?.get(b"Annots").ok().cloned();

    match existing {
        Some(Object::Reference(array_id)) => match doc.get_object_mut(array_id)? {
            Object::Array(entries) => entries.push(Object::Reference(annotation_id)),
            _ => {
                return Err(PdfEngineError::Backend(
                    "/Annots reference is not an array".to_owned(),
                ))
            }
        },
        Some(Object::Array(_)) => {
            if let Ok(Object::Array(entries)) = page_mut(doc, page_id)?.get_mut(b"Annots") {
                entries.push(Object::Reference(annotation_id));
            }
        }
        Some(Object::Null) | None => {
            page_mut(doc, page_id)?.set("Annots", vec![Object::Reference(annotation_id)]);
        }
        Some(_) => return Err(PdfEngineError::Backend("/Annots is not an array".to_owned())),
    }

    Ok(())
}

fn page_mut(doc: &mut Document, page_id: ObjectId) -> Result<&mut Dictionary, PdfEngineError> {
    match doc.get_object_mut(page_id)? {
        Object::Dictionary(dict) => Ok(dict),
        _ => Err(PdfEngineError::Backend(format!("page {page_id:?} is not a dictionary"))),
    }
}
