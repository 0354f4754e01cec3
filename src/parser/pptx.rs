//! PPTX text extraction.
//!
//! A PPTX file is a ZIP archive; each slide lives in `ppt/slides/slideN.xml`
//! and its visible text sits in `<a:t>` runs grouped into `<a:p>` paragraphs.

use quick_xml::events::Event;
use quick_xml::Reader;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::info;
use zip::ZipArchive;

use crate::error::{AppError, Result};

pub fn extract_text(path: &Path) -> Result<String> {
    info!("Parsing PPTX: {}", path.display());

    let file = File::open(path)?;
    let mut archive = ZipArchive::new(file)
        .map_err(|e| AppError::ParseError(format!("PPTX 압축을 열 수 없습니다: {}", e)))?;

    let mut slides: Vec<(usize, String)> = archive
        .file_names()
        .filter_map(|name| slide_number(name).map(|n| (n, name.to_string())))
        .collect();
    slides.sort_by_key(|(n, _)| *n);

    let mut full_text = String::new();
    for (idx, (_, name)) in slides.iter().enumerate() {
        let mut xml = String::new();
        archive
            .by_name(name)
            .map_err(|e| AppError::ParseError(format!("슬라이드를 읽을 수 없습니다: {}", e)))?
            .read_to_string(&mut xml)?;

        full_text.push_str(&format!("\n--- 슬라이드 {} ---\n", idx + 1));
        full_text.push_str(&slide_text(&xml)?);
    }

    info!("Parsed PPTX: {} slides", slides.len());
    Ok(full_text.trim().to_string())
}

fn slide_number(name: &str) -> Option<usize> {
    name.strip_prefix("ppt/slides/slide")?
        .strip_suffix(".xml")?
        .parse()
        .ok()
}

fn slide_text(xml: &str) -> Result<String> {
    let mut reader = Reader::from_str(xml);
    let mut text = String::new();
    let mut paragraph = String::new();
    let mut in_run = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) if e.local_name().as_ref() == b"t" => in_run = true,
            Ok(Event::Empty(e)) if e.local_name().as_ref() == b"br" => paragraph.push(' '),
            Ok(Event::Text(t)) if in_run => {
                let unescaped = t
                    .unescape()
                    .map_err(|e| AppError::ParseError(format!("슬라이드 XML 오류: {}", e)))?;
                paragraph.push_str(&unescaped);
            }
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"t" => in_run = false,
                b"p" => {
                    let line = paragraph.trim();
                    if !line.is_empty() {
                        text.push_str(line);
                        text.push('\n');
                    }
                    paragraph.clear();
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(AppError::ParseError(format!("슬라이드 XML 오류: {}", e))),
            _ => {}
        }
    }

    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;
    use zip::write::SimpleFileOptions;
    use zip::CompressionMethod;

    fn slide_xml(paragraphs: &[&str]) -> String {
        let body: String = paragraphs
            .iter()
            .map(|p| format!("<a:p><a:r><a:t>{}</a:t></a:r></a:p>", p))
            .collect();
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?><p:sld xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main"><p:cSld><p:spTree><p:sp><p:txBody>{}</p:txBody></p:sp></p:spTree></p:cSld></p:sld>"#,
            body
        )
    }

    fn write_pptx(path: &Path, slides: &[(&str, String)]) {
        let file = File::create(path).unwrap();
        let mut writer = zip::ZipWriter::new(file);
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
        for (name, xml) in slides {
            writer.start_file(*name, options).unwrap();
            writer.write_all(xml.as_bytes()).unwrap();
        }
        writer.finish().unwrap();
    }

    #[test]
    fn test_slides_in_numeric_order() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("deck.pptx");
        write_pptx(
            &path,
            &[
                ("ppt/slides/slide10.xml", slide_xml(&["열 번째"])),
                ("ppt/slides/slide2.xml", slide_xml(&["두 번째", "R&amp;D 계획"])),
                ("ppt/slides/slide1.xml", slide_xml(&["첫 번째"])),
                ("ppt/slideLayouts/slideLayout1.xml", slide_xml(&["레이아웃"])),
            ],
        );

        let text = extract_text(&path).unwrap();
        let first = text.find("첫 번째").unwrap();
        let second = text.find("두 번째").unwrap();
        let tenth = text.find("열 번째").unwrap();
        assert!(first < second && second < tenth);
        assert!(text.contains("R&D 계획"));
        assert!(text.contains("--- 슬라이드 3 ---"));
        assert!(!text.contains("레이아웃"));
    }

    #[test]
    fn test_slide_number() {
        assert_eq!(slide_number("ppt/slides/slide12.xml"), Some(12));
        assert_eq!(slide_number("ppt/slides/_rels/slide1.xml.rels"), None);
    }

    #[test]
    fn test_not_a_zip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.pptx");
        std::fs::write(&path, b"plain text").unwrap();
        assert!(matches!(extract_text(&path), Err(AppError::ParseError(_))));
    }
}
