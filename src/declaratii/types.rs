//! Record types for the declaration retrieval run.

use serde::{Deserialize, Serialize};

/// A normalized person-name query. Dashes become spaces, surrounding
/// whitespace is dropped; the value is immutable after construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchQuery(String);

impl SearchQuery {
    pub fn new(raw: impl AsRef<str>) -> Self {
        Self(raw.as_ref().replace('-', " ").trim().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Display for SearchQuery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// One declaration entry as rendered in the results table. Cell order is
/// positional; text is trimmed but otherwise kept as displayed (the date
/// stays in its `DD.MM.YYYY` source form).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultRow {
    pub subject_name: String,
    pub institution: String,
    pub position: String,
    pub city: String,
    pub county: String,
    pub declaration_date: String,
    pub declaration_type: String,
    pub has_download: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DownloadStatus {
    Success,
    Failed,
    NoDownloadAvailable,
}

impl std::fmt::Display for DownloadStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let marker = match self {
            DownloadStatus::Success => "Success",
            DownloadStatus::Failed => "Failed",
            DownloadStatus::NoDownloadAvailable => "NoDownloadAvailable",
        };
        f.write_str(marker)
    }
}

/// What became of one row's document retrieval.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadOutcome {
    /// Name the file was persisted under, `None` when nothing was saved.
    pub saved_filename: Option<String>,
    pub status: DownloadStatus,
}

impl DownloadOutcome {
    pub fn success(saved_filename: impl Into<String>) -> Self {
        Self {
            saved_filename: Some(saved_filename.into()),
            status: DownloadStatus::Success,
        }
    }

    pub fn failed() -> Self {
        Self {
            saved_filename: None,
            status: DownloadStatus::Failed,
        }
    }

    pub fn not_available() -> Self {
        Self {
            saved_filename: None,
            status: DownloadStatus::NoDownloadAvailable,
        }
    }

    /// Export marker for the saved-filename column.
    pub fn saved_filename_marker(&self) -> &str {
        self.saved_filename.as_deref().unwrap_or("N/A")
    }
}

/// One row's full outcome: the originating query, the extracted row, and
/// the download result. Exactly one of these is appended per row seen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregateRecord {
    pub query: SearchQuery,
    pub row: ResultRow,
    pub outcome: DownloadOutcome,
}
