pub mod cleaner;
pub mod hwp;
pub mod integrator;
pub mod pdf;
pub mod pptx;

use std::path::Path;

use crate::error::Result;

pub use integrator::{DocumentIntegrator, UploadedFile, MIN_TEXT_CHARS};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Pdf,
    Hwp,
    Pptx,
}

impl DocumentKind {
    /// `ext` is lower-case and includes the leading dot.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext {
            ".pdf" => Some(DocumentKind::Pdf),
            ".hwp" => Some(DocumentKind::Hwp),
            ".pptx" => Some(DocumentKind::Pptx),
            _ => None,
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            DocumentKind::Pdf => ".pdf",
            DocumentKind::Hwp => ".hwp",
            DocumentKind::Pptx => ".pptx",
        }
    }
}

/// Lower-cased extension of `filename` with its leading dot, or an empty string.
pub fn file_extension(filename: &str) -> String {
    Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| format!(".{}", ext.to_lowercase()))
        .unwrap_or_default()
}

/// Turns a document on disk into plain text.
pub trait TextExtractor: Send + Sync {
    fn extract(&self, kind: DocumentKind, path: &Path) -> Result<String>;
}

/// Extracts with lopdf, cfb and zip/quick-xml depending on the format.
#[derive(Debug, Clone, Copy, Default)]
pub struct FormatExtractor;

impl TextExtractor for FormatExtractor {
    fn extract(&self, kind: DocumentKind, path: &Path) -> Result<String> {
        match kind {
            DocumentKind::Pdf => pdf::extract_text(path),
            DocumentKind::Hwp => hwp::extract_text(path),
            DocumentKind::Pptx => pptx::extract_text(path),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_extension() {
        assert_eq!(file_extension("제안요청서.PDF"), ".pdf");
        assert_eq!(file_extension("deck.final.pptx"), ".pptx");
        assert_eq!(file_extension("README"), "");
    }

    #[test]
    fn test_kind_from_extension() {
        assert_eq!(DocumentKind::from_extension(".hwp"), Some(DocumentKind::Hwp));
        assert_eq!(DocumentKind::from_extension(".docx"), None);
        assert_eq!(DocumentKind::Pptx.extension(), ".pptx");
    }
}
