//! Keyword highlighting over PDF documents
//!
//! Every page is searched for every keyword. A match becomes a highlight
//! annotation unless its rectangle intersects a highlight that is already on
//! the page, either from the input document or added earlier in the same run.

use crate::color::HighlightColor;
use crate::keywords::KeywordSet;
use pdf_engine::{LopdfEngine, OpenSource, PdfEngine, PdfEngineError, Rect};
use serde::Serialize;
use std::fmt;

/// Everything one highlighting run needs.
#[derive(Debug, Clone, PartialEq)]
pub struct HighlightRequest {
    pub document: Vec<u8>,
    pub keywords: KeywordSet,
    pub color: HighlightColor,
}

impl HighlightRequest {
    pub fn new(document: Vec<u8>, keywords: KeywordSet, color: HighlightColor) -> Self {
        Self { document, keywords, color }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HighlightErrorKind {
    /// Input does not parse as a PDF document
    InvalidDocument,
    /// Input is a PDF the engine cannot process (encrypted)
    Unsupported,
    Search,
    Annotate,
    Save,
}

impl fmt::Display for HighlightErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            HighlightErrorKind::InvalidDocument => "invalid document",
            HighlightErrorKind::Unsupported => "unsupported document",
            HighlightErrorKind::Search => "search failed",
            HighlightErrorKind::Annotate => "annotation failed",
            HighlightErrorKind::Save => "save failed",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct HighlightError {
    pub kind: HighlightErrorKind,
    pub message: String,
}

impl HighlightError {
    fn new(kind: HighlightErrorKind, source: PdfEngineError) -> Self {
        Self { kind, message: source.to_string() }
    }

    fn open(source: PdfEngineError) -> Self {
        let kind = match source {
            PdfEngineError::EncryptedUnsupported => HighlightErrorKind::Unsupported,
            _ => HighlightErrorKind::InvalidDocument,
        };
        Self::new(kind, source)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PageReport {
    /// 1-based page number
    pub page: u32,
    pub existing_highlights: usize,
    pub added: usize,
    pub skipped_overlaps: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HighlightReport {
    pub color: HighlightColor,
    pub keywords: Vec<String>,
    pub pages: Vec<PageReport>,
}

impl HighlightReport {
    pub fn added(&self) -> usize {
        self.pages.iter().map(|page| page.added).sum()
    }

    pub fn skipped(&self) -> usize {
        self.pages.iter().map(|page| page.skipped_overlaps).sum()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HighlightOutcome {
    pub document: Vec<u8>,
    pub report: HighlightReport,
}

/// Runs highlight requests against a [`PdfEngine`].
pub struct Highlighter<E: PdfEngine = LopdfEngine> {
    engine: E,
    case_sensitive: bool,
}

impl Highlighter<LopdfEngine> {
    pub fn new() -> Self {
        Self::with_engine(LopdfEngine::new())
    }
}

impl Default for Highlighter<LopdfEngine> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: PdfEngine> Highlighter<E> {
    pub fn with_engine(engine: E) -> Self {
        Self { engine, case_sensitive: false }
    }

    /// Match keywords case-sensitively. Off by default.
    pub fn case_sensitive(mut self, case_sensitive: bool) -> Self {
        self.case_sensitive = case_sensitive;
        self
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn run(&mut self, request: HighlightRequest) -> Result<HighlightOutcome, HighlightError> {
        let result = self.highlight_document(request);
        if let Err(err) = &result {
            tracing::debug!(kind = %err.kind, message = %err.message, "highlighting failed");
        }
        result
    }

    fn highlight_document(
        &mut self,
        request: HighlightRequest,
    ) -> Result<HighlightOutcome, HighlightError> {
        let HighlightRequest { document, keywords, color } = request;
        let case_sensitive = self.case_sensitive;
        let rgb = color.rgb();
        let search_error =
            |err: PdfEngineError| HighlightError::new(HighlightErrorKind::Search, err);

        let mut doc = self
            .engine
            .open_scoped(OpenSource::Bytes(document))
            .map_err(HighlightError::open)?;
        let page_count = doc.page_count().map_err(search_error)?;
        let mut pages = Vec::with_capacity(page_count as usize);

        for page_index in 0..page_count {
            let mut exclusions: Vec<Rect> = doc
                .annotations(page_index)
                .map_err(search_error)?
                .into_iter()
                .filter(|annotation| annotation.kind.is_highlight())
                .map(|annotation| annotation.rect)
                .collect();
            let mut report = PageReport {
                page: page_index + 1,
                existing_highlights: exclusions.len(),
                ..PageReport::default()
            };

            if !keywords.is_empty() {
                let text = doc.page_text(page_index).map_err(search_error)?;
                for keyword in &keywords {
                    for rect in text.search(keyword, case_sensitive) {
                        if exclusions.iter().any(|existing| existing.intersects(&rect)) {
                            report.skipped_overlaps += 1;
                            continue;
                        }
                        doc.add_highlight(page_index, rect, rgb)
                            .map_err(|err| HighlightError::new(HighlightErrorKind::Annotate, err))?;
                        exclusions.push(rect);
                        report.added += 1;
                    }
                }
            }

            tracing::debug!(
                page = report.page,
                existing = report.existing_highlights,
                added = report.added,
                skipped = report.skipped_overlaps,
                "page highlighted"
            );
            pages.push(report);
        }

        let document =
            doc.save().map_err(|err| HighlightError::new(HighlightErrorKind::Save, err))?;
        let report = HighlightReport { color, keywords: keywords.into_iter().collect(), pages };
        tracing::info!(
            pages = page_count,
            added = report.added(),
            skipped = report.skipped(),
            color = %color,
            "highlighting finished"
        );

        Ok(HighlightOutcome { document, report })
    }
}

/// Highlight `keywords` in `document` with the named color.
///
/// Unknown color names fall back to yellow.
pub fn highlight(
    document: &[u8],
    keywords: &KeywordSet,
    color: &str,
) -> Result<Vec<u8>, HighlightError> {
    let request =
        HighlightRequest::new(document.to_vec(), keywords.clone(), HighlightColor::resolve(color));
    Highlighter::new().run(request).map(|outcome| outcome.document)
}
