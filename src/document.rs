//! Page-based document representation.
//!
//! Documents are a list of pages with their extracted text. PDFs are read
//! with `lopdf`; plain text files are split into pages on form feeds.

use crate::error::{EvalError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Page separator in extracted-text files.
pub const PAGE_BREAK: char = '\x0C';

/// A single page in a document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page {
    /// 1-indexed page number.
    pub number: usize,
    /// Text content of the page.
    pub content: String,
}

impl Page {
    /// Create a new page.
    pub fn new(number: usize, content: String) -> Self {
        Self { number, content }
    }

    /// Page text prefixed with a `[PAGE n]` marker.
    pub fn with_marker(&self) -> String {
        format!("[PAGE {}]\n{}", self.number, self.content)
    }
}

/// A document consisting of one or more pages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    /// Document name, used as the chunk `source` unless overridden.
    pub name: String,
    /// Original file path (if loaded from file).
    pub path: Option<PathBuf>,
    /// Pages in the document. Pages without text are not kept.
    pub pages: Vec<Page>,
}

impl Document {
    /// Create a new document with given name and pages.
    pub fn new(name: impl Into<String>, pages: Vec<Page>) -> Self {
        Self {
            name: name.into(),
            path: None,
            pages,
        }
    }

    fn name_from_path(path: &Path) -> String {
        path.file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("untitled")
            .to_string()
    }

    /// Load a PDF, extracting the text of every page.
    pub fn from_pdf(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(EvalError::FileNotFound(path.to_path_buf()));
        }

        let pdf = lopdf::Document::load(path).map_err(|e| EvalError::pdf(path, e.to_string()))?;

        let mut pages = Vec::new();
        for (number, _) in pdf.get_pages() {
            let text = pdf
                .extract_text(&[number])
                .map_err(|e| EvalError::pdf(path, format!("page {}: {}", number, e)))?;

            if text.trim().is_empty() {
                debug!(page = number, "skipping page without text");
                continue;
            }
            pages.push(Page::new(number as usize, text));
        }

        if pages.is_empty() {
            return Err(EvalError::pdf(path, "no extractable text"));
        }

        Ok(Self {
            name: Self::name_from_path(path),
            path: Some(path.to_path_buf()),
            pages,
        })
    }

    /// Load a text file. Form feeds (as written by `pdftotext`) separate
    /// pages; a file without any is one page. Blank pages are skipped but
    /// still counted in the numbering.
    pub fn from_text_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| EvalError::io(path, e))?;

        let pages: Vec<Page> = content
            .split(PAGE_BREAK)
            .enumerate()
            .filter(|(_, text)| !text.trim().is_empty())
            .map(|(i, text)| Page::new(i + 1, text.trim().to_string()))
            .collect();

        if pages.is_empty() {
            return Err(EvalError::InsufficientData(format!(
                "'{}' contains no text",
                path.display()
            )));
        }

        Ok(Self {
            name: Self::name_from_path(path),
            path: Some(path.to_path_buf()),
            pages,
        })
    }

    /// Load by extension: `.pdf` through the PDF reader, anything else as text.
    pub fn load(path: &Path) -> Result<Self> {
        let is_pdf = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("pdf"));

        if is_pdf {
            Self::from_pdf(path)
        } else {
            Self::from_text_file(path)
        }
    }

    /// Get total number of pages with text.
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Total characters across pages.
    pub fn char_count(&self) -> usize {
        self.pages.iter().map(|p| p.content.chars().count()).sum()
    }

    /// Whole document with `[PAGE n]` markers, pages separated by a blank line.
    pub fn content_with_markers(&self) -> String {
        self.pages
            .iter()
            .map(|p| p.with_marker())
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_page_marker() {
        let page = Page::new(5, "Test content".to_string());
        assert_eq!(page.with_marker(), "[PAGE 5]\nTest content");
    }

    #[test]
    fn test_content_with_markers() {
        let doc = Document::new(
            "survey",
            vec![
                Page::new(1, "Intro".to_string()),
                Page::new(3, "Results".to_string()),
            ],
        );
        assert_eq!(
            doc.content_with_markers(),
            "[PAGE 1]\nIntro\n\n[PAGE 3]\nResults"
        );
        assert_eq!(doc.char_count(), 12);
    }

    #[test]
    fn test_text_file_pages_split_on_form_feed() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("report.txt");
        std::fs::write(&path, "first page\x0C\x0Cthird page\x0C").unwrap();

        let doc = Document::from_text_file(&path).unwrap();
        assert_eq!(doc.name, "report");
        assert_eq!(doc.page_count(), 2);
        assert_eq!(doc.pages[0].number, 1);
        assert_eq!(doc.pages[1].number, 3);
        assert_eq!(doc.pages[1].content, "third page");
    }

    #[test]
    fn test_empty_text_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("empty.txt");
        std::fs::write(&path, " \n\x0C\n").unwrap();

        assert!(matches!(
            Document::from_text_file(&path),
            Err(EvalError::InsufficientData(_))
        ));
    }

    #[test]
    fn test_load_text_by_extension() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("notes.md");
        std::fs::write(&path, "hello").unwrap();

        let doc = Document::load(&path).unwrap();
        assert_eq!(doc.page_count(), 1);
        assert_eq!(doc.pages[0].content, "hello");
    }

    #[test]
    fn test_missing_pdf() {
        let err = Document::from_pdf(Path::new("/nonexistent/survey.pdf")).unwrap_err();
        assert!(matches!(err, EvalError::FileNotFound(_)));
    }

    #[test]
    fn test_invalid_pdf() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.pdf");
        std::fs::write(&path, "not a pdf").unwrap();

        let err = Document::from_pdf(&path).unwrap_err();
        assert!(matches!(err, EvalError::Pdf { .. }));
    }
}
