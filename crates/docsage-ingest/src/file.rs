//! Source document text extraction.

use std::path::Path;

use docsage_core::{Error, Result};
use tracing::debug;

/// Page-annotated text pulled from a source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedText {
    /// Full text with a `[PAGE n]` marker before each page.
    pub text: String,
    pub page_count: usize,
}

/// Turns a file into page-annotated text.
pub trait TextExtractor: Send + Sync {
    fn extract(&self, path: &Path) -> Result<ExtractedText>;
}

/// Join per-page text as `"\n[PAGE n]\n{text}\n"` blocks, numbering from 1.
pub fn annotate_pages<S: AsRef<str>>(pages: &[S]) -> String {
    pages
        .iter()
        .enumerate()
        .map(|(i, page)| format!("\n[PAGE {}]\n{}\n", i + 1, page.as_ref()))
        .collect()
}

fn require_text(extracted: ExtractedText, path: &Path) -> Result<ExtractedText> {
    let stripped = extracted
        .text
        .lines()
        .filter(|l| !l.starts_with("[PAGE "))
        .any(|l| !l.trim().is_empty());
    if !stripped {
        return Err(Error::Extraction(format!(
            "no text extracted from {}",
            path.display()
        )));
    }
    Ok(extracted)
}

/// UTF-8 text files. A form feed (`\x0C`) starts a new page.
#[derive(Debug, Default, Clone, Copy)]
pub struct PlainTextExtractor;

impl TextExtractor for PlainTextExtractor {
    fn extract(&self, path: &Path) -> Result<ExtractedText> {
        let bytes = std::fs::read(path)
            .map_err(|e| Error::Extraction(format!("cannot read {}: {e}", path.display())))?;
        let content = String::from_utf8(bytes)
            .map_err(|_| Error::Extraction(format!("{} is not UTF-8 text", path.display())))?;

        let pages: Vec<&str> = content.split('\x0C').collect();
        debug!("Read {} page(s) from {}", pages.len(), path.display());
        require_text(
            ExtractedText {
                text: annotate_pages(&pages),
                page_count: pages.len(),
            },
            path,
        )
    }
}

/// PDF text through `lopdf`. Layout fidelity is best effort.
#[cfg(feature = "pdf")]
#[derive(Debug, Default, Clone, Copy)]
pub struct PdfExtractor;

#[cfg(feature = "pdf")]
impl TextExtractor for PdfExtractor {
    fn extract(&self, path: &Path) -> Result<ExtractedText> {
        let doc = lopdf::Document::load(path)
            .map_err(|e| Error::Extraction(format!("failed to open PDF: {e}")))?;

        let mut pages = Vec::new();
        for page_number in doc.get_pages().keys() {
            // Pages whose content streams cannot be decoded count as blank.
            let text = doc.extract_text(&[*page_number]).unwrap_or_else(|e| {
                debug!("Page {} of {}: {}", page_number, path.display(), e);
                String::new()
            });
            pages.push(text);
        }

        debug!("Extracted {} page(s) from {}", pages.len(), path.display());
        require_text(
            ExtractedText {
                text: annotate_pages(&pages),
                page_count: pages.len(),
            },
            path,
        )
    }
}

/// Chooses an extractor from the file extension.
#[derive(Debug, Default, Clone, Copy)]
pub struct DocumentExtractor;

impl DocumentExtractor {
    /// Extensions accepted for upload.
    pub fn supports(file_name: &str) -> bool {
        matches!(
            extension_of(Path::new(file_name)).as_deref(),
            Some("pdf") | Some("txt")
        )
    }
}

fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
}

impl TextExtractor for DocumentExtractor {
    fn extract(&self, path: &Path) -> Result<ExtractedText> {
        match extension_of(path).as_deref() {
            Some("txt") => PlainTextExtractor.extract(path),
            Some("pdf") => extract_pdf(path),
            other => Err(Error::Extraction(format!(
                "unsupported file type: {}",
                other.unwrap_or("(none)")
            ))),
        }
    }
}

#[cfg(feature = "pdf")]
fn extract_pdf(path: &Path) -> Result<ExtractedText> {
    PdfExtractor.extract(path)
}

#[cfg(not(feature = "pdf"))]
fn extract_pdf(path: &Path) -> Result<ExtractedText> {
    Err(Error::Extraction(format!(
        "PDF support is disabled (enable the `pdf` feature): {}",
        path.display()
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_annotate_pages() {
        assert_eq!(
            annotate_pages(&["one", "two"]),
            "\n[PAGE 1]\none\n\n[PAGE 2]\ntwo\n"
        );
    }

    #[test]
    fn test_plain_text_form_feed_pages() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, "alpha\x0Cbeta\x0Cgamma").unwrap();
        let extracted = DocumentExtractor.extract(&path).unwrap();
        assert_eq!(extracted.page_count, 3);
        assert!(extracted.text.contains("[PAGE 2]\nbeta"));
    }

    #[test]
    fn test_empty_file_is_extraction_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.txt");
        std::fs::write(&path, "  \n").unwrap();
        assert!(matches!(
            DocumentExtractor.extract(&path),
            Err(Error::Extraction(_))
        ));
    }

    #[test]
    fn test_missing_file_is_extraction_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = PlainTextExtractor.extract(&dir.path().join("absent.txt"));
        assert!(matches!(result, Err(Error::Extraction(_))));
    }

    #[test]
    fn test_unsupported_extension() {
        assert!(DocumentExtractor::supports("Report.PDF"));
        assert!(DocumentExtractor::supports("a.txt"));
        assert!(!DocumentExtractor::supports("a.docx"));
        let result = DocumentExtractor.extract(Path::new("a.docx"));
        assert!(matches!(result, Err(Error::Extraction(_))));
    }

    #[cfg(feature = "pdf")]
    #[test]
    fn test_corrupt_pdf_is_extraction_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.pdf");
        std::fs::write(&path, b"not a pdf").unwrap();
        assert!(matches!(
            DocumentExtractor.extract(&path),
            Err(Error::Extraction(_))
        ));
    }
}
