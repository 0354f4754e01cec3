use std::io::Write;
use std::sync::Arc;
use tracing::{error, info};

use super::{cleaner, file_extension, DocumentKind, FormatExtractor, TextExtractor};
use crate::error::{AppError, Result};

/// Extracted text shorter than this is treated as a scanned image or an empty file.
pub const MIN_TEXT_CHARS: usize = 50;

#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl UploadedFile {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        UploadedFile {
            name: name.into(),
            bytes,
        }
    }
}

/// Combines several uploaded documents into one cleaned text.
#[derive(Clone)]
pub struct DocumentIntegrator {
    extractor: Arc<dyn TextExtractor>,
}

impl Default for DocumentIntegrator {
    fn default() -> Self {
        DocumentIntegrator::new(Arc::new(FormatExtractor))
    }
}

impl DocumentIntegrator {
    pub fn new(extractor: Arc<dyn TextExtractor>) -> Self {
        DocumentIntegrator { extractor }
    }

    /// Extracts every file in order and joins them under per-file delimiters.
    ///
    /// Fails as a whole on the first unsupported, unreadable or empty file.
    pub fn parse_multiple_files(&self, files: &[UploadedFile]) -> Result<String> {
        if files.is_empty() {
            return Err(AppError::ExtractionEmpty("분석할 파일이 없습니다.".to_string()));
        }

        let mut kinds = Vec::with_capacity(files.len());
        for file in files {
            let ext = file_extension(&file.name);
            match DocumentKind::from_extension(&ext) {
                Some(kind) => kinds.push(kind),
                None => {
                    error!("Unsupported file type: {} ({})", file.name, ext);
                    let shown = if ext.is_empty() { file.name.clone() } else { ext };
                    return Err(AppError::UnsupportedFormat(shown));
                }
            }
        }

        let mut combined = String::new();
        for (idx, (file, kind)) in files.iter().zip(kinds).enumerate() {
            info!("Parsing file {}/{}: {}", idx + 1, files.len(), file.name);

            let text = self.extract_one(file, kind)?;
            if text.trim().chars().count() < MIN_TEXT_CHARS {
                return Err(AppError::ExtractionEmpty(format!(
                    "파일 '{}'에서 유효한 텍스트를 추출할 수 없습니다.\n스캔된 이미지 PDF이거나 내용이 비어있을 수 있습니다.",
                    file.name
                )));
            }

            let rule = "=".repeat(80);
            combined.push_str(&format!("\n\n{}\n파일: {}\n{}\n\n", rule, file.name, rule));
            combined.push_str(&text);
        }

        let cleaned = cleaner::clean(&combined);
        if cleaned.chars().count() < MIN_TEXT_CHARS {
            return Err(AppError::ExtractionEmpty(
                "문서에서 유효한 텍스트를 추출할 수 없습니다. 스캔된 이미지 PDF이거나 내용이 비어있을 수 있습니다.".to_string(),
            ));
        }

        info!("Parsed {} files ({} chars)", files.len(), cleaned.chars().count());
        Ok(cleaned)
    }

    fn extract_one(&self, file: &UploadedFile, kind: DocumentKind) -> Result<String> {
        // Removed when dropped, whichever way extraction ends
        let mut temp = tempfile::Builder::new()
            .prefix("rfp-upload-")
            .suffix(kind.extension())
            .tempfile()?;
        temp.write_all(&file.bytes)?;
        temp.flush()?;

        self.extractor.extract(kind, temp.path()).map_err(|e| {
            error!("Failed to parse {}: {}", file.name, e);
            AppError::ParseError(format!(
                "파일 '{}' 파싱 실패: {}\n파일이 손상되지 않았는지, 표준 {} 형식인지 확인하세요.",
                file.name,
                e,
                kind.extension().trim_start_matches('.').to_uppercase()
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::{Path, PathBuf};
    use std::sync::Mutex;

    /// Returns the uploaded bytes as text and remembers which temp paths it saw.
    #[derive(Default)]
    struct EchoExtractor {
        seen: Mutex<Vec<PathBuf>>,
    }

    impl TextExtractor for EchoExtractor {
        fn extract(&self, _kind: DocumentKind, path: &Path) -> Result<String> {
            self.seen.lock().unwrap().push(path.to_path_buf());
            Ok(std::fs::read_to_string(path)?)
        }
    }

    struct FailingExtractor;

    impl TextExtractor for FailingExtractor {
        fn extract(&self, _kind: DocumentKind, _path: &Path) -> Result<String> {
            Err(AppError::ParseError("corrupt".to_string()))
        }
    }

    fn text_of(chars: usize) -> Vec<u8> {
        "가".repeat(chars).into_bytes()
    }

    #[test]
    fn test_short_file_fails_before_concatenation() {
        let extractor = Arc::new(EchoExtractor::default());
        let integrator = DocumentIntegrator::new(extractor.clone());
        let files = vec![
            UploadedFile::new("a.pdf", text_of(30)),
            UploadedFile::new("b.pdf", text_of(500)),
        ];

        let err = integrator.parse_multiple_files(&files).unwrap_err();
        let message = err.to_string();
        assert!(matches!(err, AppError::ExtractionEmpty(_)));
        assert!(message.contains("a.pdf"));
        assert!(message.contains("유효한 텍스트"));
        assert_eq!(extractor.seen.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_files_joined_with_delimiters_in_order() {
        let integrator = DocumentIntegrator::new(Arc::new(EchoExtractor::default()));
        let files = vec![
            UploadedFile::new("first.hwp", "첫 번째 문서 ".repeat(10).into_bytes()),
            UploadedFile::new("second.pptx", "두 번째 문서 ".repeat(10).into_bytes()),
        ];

        let text = integrator.parse_multiple_files(&files).unwrap();
        let first = text.find("파일: first.hwp").unwrap();
        let second = text.find("파일: second.pptx").unwrap();
        assert!(first < second);
        assert!(text.starts_with(&"=".repeat(80)));
        assert!(!text.contains("  "));
    }

    #[test]
    fn test_unsupported_extension_rejects_batch() {
        let extractor = Arc::new(EchoExtractor::default());
        let integrator = DocumentIntegrator::new(extractor.clone());
        let files = vec![
            UploadedFile::new("ok.pdf", text_of(100)),
            UploadedFile::new("notes.docx", text_of(100)),
        ];

        let err = integrator.parse_multiple_files(&files).unwrap_err();
        assert!(matches!(err, AppError::UnsupportedFormat(ref ext) if ext == ".docx"));
        assert!(extractor.seen.lock().unwrap().is_empty());
    }

    #[test]
    fn test_temp_files_are_removed() {
        let extractor = Arc::new(EchoExtractor::default());
        let integrator = DocumentIntegrator::new(extractor.clone());
        integrator
            .parse_multiple_files(&[UploadedFile::new("x.pdf", text_of(80))])
            .unwrap();
        let _ = integrator.parse_multiple_files(&[UploadedFile::new("y.pdf", text_of(10))]);

        let seen = extractor.seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert!(seen.iter().all(|path| !path.exists()));
    }

    #[test]
    fn test_extractor_failure_names_file() {
        let integrator = DocumentIntegrator::new(Arc::new(FailingExtractor));
        let err = integrator
            .parse_multiple_files(&[UploadedFile::new("broken.hwp", text_of(80))])
            .unwrap_err();
        assert!(matches!(err, AppError::ParseError(ref m) if m.contains("broken.hwp") && m.contains("HWP")));
    }

    #[test]
    fn test_empty_batch() {
        let integrator = DocumentIntegrator::default();
        assert!(matches!(integrator.parse_multiple_files(&[]), Err(AppError::ExtractionEmpty(_))));
    }
}
