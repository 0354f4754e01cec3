use std::path::Path;

use crate::analyzer::schema::AnalysisResult;
use crate::error::Result;

/// Writes a finished analysis to a report file (typically a PDF).
///
/// Failures should be reported as [`crate::error::AppError::Render`].
pub trait ReportRenderer: Send + Sync {
    fn render(&self, result: &AnalysisResult, output: &Path) -> Result<()>;
}

/// File name for a report about `project_name`, safe on common filesystems.
pub fn report_file_name(project_name: &str) -> String {
    let stem: String = project_name
        .trim()
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    let stem = stem.trim_matches('_');

    if stem.is_empty() {
        "report.pdf".to_string()
    } else {
        format!("{}_분석.pdf", stem)
    }
}
