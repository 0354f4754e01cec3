use lopdf::Document;
use std::path::Path;
use tracing::{info, warn};

use crate::error::{AppError, Result};

/// Extracts text page by page, each page under a `--- 페이지 N ---` marker.
pub fn extract_text(path: &Path) -> Result<String> {
    info!("Parsing PDF: {}", path.display());

    let doc = Document::load(path).map_err(|e| AppError::ParseError(format!("PDF를 열 수 없습니다: {}", e)))?;
    let pages = doc.get_pages();

    let mut full_text = String::new();
    for page_num in pages.keys() {
        let text = doc.extract_text(&[*page_num]).unwrap_or_else(|e| {
            warn!("Failed to extract text from page {}: {}", page_num, e);
            String::new()
        });
        full_text.push_str(&format!("\n--- 페이지 {} ---\n{}\n", page_num, text));
    }

    info!("Parsed PDF: {} pages", pages.len());
    Ok(full_text.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::content::{Content, Operation};
    use lopdf::{dictionary, Object, Stream};
    use tempfile::TempDir;

    fn write_pdf(path: &Path, line: &str) {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Courier",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        });
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 12.into()]),
                Operation::new("Td", vec![100.into(), 600.into()]),
                Operation::new("Tj", vec![Object::string_literal(line)]),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => resources_id,
        });
        let pages = dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        };
        doc.objects.insert(pages_id, Object::Dictionary(pages));
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);
        doc.save(path).unwrap();
    }

    #[test]
    fn test_extracts_page_text_with_marker() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("doc.pdf");
        write_pdf(&path, "Request for Proposal");

        let text = extract_text(&path).unwrap();
        assert!(text.starts_with("--- 페이지 1 ---"));
        assert!(text.contains("Request for Proposal"));
    }

    #[test]
    fn test_garbage_is_a_parse_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.pdf");
        std::fs::write(&path, b"this is not a pdf").unwrap();

        assert!(matches!(extract_text(&path), Err(AppError::ParseError(_))));
    }
}
