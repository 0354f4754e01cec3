//! Run history persisted as a single JSON array.
//!
//! Every mutation rewrites `history.json` in full. Report PDFs are copied
//! into `pdfs/` next to it and referenced by a path relative to the data
//! directory, so the store can be moved as a unit.

use chrono::Local;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

use crate::error::{AppError, Result};

const HISTORY_FILE: &str = "history.json";
const HISTORY_TMP_FILE: &str = "history.json.tmp";
const PDF_DIR: &str = "pdfs";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HistoryKind {
    Summary,
    Analysis,
}

impl HistoryKind {
    fn as_str(&self) -> &'static str {
        match self {
            HistoryKind::Summary => "summary",
            HistoryKind::Analysis => "analysis",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: HistoryKind,
    pub date: String,
    pub files: Vec<String>,
    pub data: Value,
    pub pdf_path: Option<String>,
    #[serde(default)]
    pub strategy: Option<String>,
    #[serde(default)]
    pub references: Option<Value>,
}

#[derive(Debug)]
pub struct HistoryStore {
    data_dir: PathBuf,
}

impl HistoryStore {
    pub fn new(data_dir: impl Into<PathBuf>) -> Result<Self> {
        let data_dir = data_dir.into();
        fs::create_dir_all(data_dir.join(PDF_DIR))?;

        let store = HistoryStore { data_dir };
        if !store.history_file().exists() {
            store.save(&[])?;
        }
        Ok(store)
    }

    fn history_file(&self) -> PathBuf {
        self.data_dir.join(HISTORY_FILE)
    }

    fn load(&self) -> Vec<HistoryEntry> {
        let raw = match fs::read(self.history_file()) {
            Ok(raw) => raw,
            Err(e) => {
                error!("Failed to read history: {}", e);
                return Vec::new();
            }
        };

        serde_json::from_slice(&raw).unwrap_or_else(|e| {
            error!("Failed to parse history: {}", e);
            Vec::new()
        })
    }

    fn save(&self, history: &[HistoryEntry]) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(history).map_err(|e| AppError::Storage(e.to_string()))?;
        // Readers never see a half-written file
        let tmp = self.data_dir.join(HISTORY_TMP_FILE);
        fs::write(&tmp, bytes)?;
        fs::rename(&tmp, self.history_file())?;
        Ok(())
    }

    /// Appends a run. The report at `pdf_path` is copied into the store; if the
    /// copy fails the entry is still recorded, without a PDF.
    pub fn add_entry(
        &self,
        kind: HistoryKind,
        files: Vec<String>,
        data: Value,
        pdf_path: Option<&Path>,
        strategy: Option<String>,
        references: Option<Value>,
    ) -> Result<HistoryEntry> {
        let mut history = self.load();

        let now = Local::now();
        let base_id = now.format("%Y%m%d%H%M%S%3f").to_string();
        let mut id = base_id.clone();
        let mut suffix = 1;
        while history.iter().any(|entry| entry.id == id) {
            id = format!("{}-{}", base_id, suffix);
            suffix += 1;
        }

        let stored_pdf = pdf_path.and_then(|source| self.archive_pdf(source, kind, &id));

        let entry = HistoryEntry {
            id,
            kind,
            date: now.format("%Y-%m-%d %H:%M:%S").to_string(),
            files,
            data,
            pdf_path: stored_pdf,
            strategy,
            references,
        };

        history.push(entry.clone());
        self.save(&history)?;
        info!("History entry added: {}", entry.id);
        Ok(entry)
    }

    fn archive_pdf(&self, source: &Path, kind: HistoryKind, id: &str) -> Option<String> {
        let relative = format!("{}/{}_{}.pdf", PDF_DIR, kind.as_str(), id);
        match fs::copy(source, self.data_dir.join(&relative)) {
            Ok(_) => Some(relative),
            Err(e) => {
                warn!("Failed to archive report {}: {}", source.display(), e);
                None
            }
        }
    }

    /// All entries, newest first.
    pub fn get_all(&self) -> Vec<HistoryEntry> {
        let mut history = self.load();
        history.reverse();
        history
    }

    pub fn get(&self, id: &str) -> Option<HistoryEntry> {
        self.load().into_iter().find(|entry| entry.id == id)
    }

    /// Absolute location of an entry's archived report.
    pub fn resolve_pdf(&self, entry: &HistoryEntry) -> Option<PathBuf> {
        entry.pdf_path.as_ref().map(|rel| self.data_dir.join(rel))
    }

    /// Removes an entry and its PDF. Returns `false` if no entry has `id`.
    pub fn delete_entry(&self, id: &str) -> Result<bool> {
        let mut history = self.load();
        let Some(position) = history.iter().position(|entry| entry.id == id) else {
            return Ok(false);
        };

        let removed = history.remove(position);
        self.save(&history)?;

        if let Some(path) = self.resolve_pdf(&removed) {
            if let Err(e) = fs::remove_file(&path) {
                warn!("Failed to delete report {}: {}", path.display(), e);
            }
        }

        info!("History entry deleted: {}", id);
        Ok(true)
    }
}
