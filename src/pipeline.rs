//! # Merge Pipeline
//!
//! Runs the three stages of one interaction in order:
//! 1. Ingestion: every uploaded file is parsed on its own; failures are collected
//!    next to the parsed tables instead of aborting the run
//! 2. Merge: the parsed tables are concatenated and exact duplicate rows removed
//! 3. Export: the merged table is encoded as a workbook and a preview is cut
//!
//! The result is a [`MergeReport`]; callers decide how to present it.

use crate::config::MergeSettings;
use crate::database::merge::merge_tables;
use crate::database::merge::MergedTable;
use crate::database::table::Table;
use crate::error::MergerError;
use crate::export::ExportCache;
use crate::export::ExportedFile;
use crate::preview::Preview;
use crate::spreadsheet::read_table;
use serde::Serialize;
use std::sync::Arc;
use tracing::info;
use tracing::warn;

pub const MESSAGE_NO_FILES: &str = "Upload one or more Excel files using the upload control.";
pub const MESSAGE_NO_VALID_DATA: &str = "No valid Excel files were found to merge.";
pub const MESSAGE_MERGED: &str = "Files merged successfully and duplicate rows were removed!";

/// A named binary blob as received from the user.
#[derive(Clone, Debug)]
pub struct UploadedFile {
    pub name: String,
    pub content: Vec<u8>,
}

impl UploadedFile {
    pub fn new(name: impl Into<String>, content: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            content,
        }
    }
}

/// A file that could not be parsed, with the reason.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FileFailure {
    pub file_name: String,
    pub message: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusLevel {
    Info,
    Warning,
    Success,
    Error,
}

/// One user-facing status line.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct StatusMessage {
    pub level: StatusLevel,
    pub text: String,
}

impl StatusMessage {
    fn new(level: StatusLevel, text: impl Into<String>) -> Self {
        Self {
            level,
            text: text.into(),
        }
    }
}

/// Everything produced by a successful merge.
#[derive(Debug)]
pub struct MergeResult {
    pub merged: MergedTable,
    pub preview: Preview,
    pub export: Arc<ExportedFile>,
}

#[derive(Debug)]
pub enum Outcome {
    /// Nothing was uploaded
    NoFiles,
    /// Files were uploaded but none could be parsed
    NoValidData,
    Merged(Box<MergeResult>),
}

/// Result of one pipeline run: per-file failures plus the overall outcome.
#[derive(Debug)]
pub struct MergeReport {
    pub failures: Vec<FileFailure>,
    pub outcome: Outcome,
}

impl MergeReport {
    /// Report of an interaction without uploads.
    pub fn no_files() -> Self {
        Self {
            failures: Vec::new(),
            outcome: Outcome::NoFiles,
        }
    }

    /// Short machine-readable name of the outcome.
    pub fn status(&self) -> &'static str {
        match self.outcome {
            Outcome::NoFiles => "no_files",
            Outcome::NoValidData => "no_valid_data",
            Outcome::Merged(_) => "merged",
        }
    }

    /// The merge result, if any file could be parsed.
    pub fn merged(&self) -> Option<&MergeResult> {
        match &self.outcome {
            Outcome::Merged(result) => Some(result.as_ref()),
            _ => None,
        }
    }

    /// Status messages in display order: file errors first, then the outcome message.
    pub fn messages(&self) -> Vec<StatusMessage> {
        let mut messages: Vec<StatusMessage> = self
            .failures
            .iter()
            .map(|failure| {
                StatusMessage::new(
                    StatusLevel::Error,
                    format!("Error reading file {}: {}", failure.file_name, failure.message),
                )
            })
            .collect();
        messages.push(match self.outcome {
            Outcome::NoFiles => StatusMessage::new(StatusLevel::Info, MESSAGE_NO_FILES),
            Outcome::NoValidData => StatusMessage::new(StatusLevel::Warning, MESSAGE_NO_VALID_DATA),
            Outcome::Merged(_) => StatusMessage::new(StatusLevel::Success, MESSAGE_MERGED),
        });
        messages
    }
}

/// Parses every file, keeping upload order. A failing file never stops the others.
pub fn ingest(files: &[UploadedFile]) -> (Vec<Table>, Vec<FileFailure>) {
    files.iter().fold((Vec::new(), Vec::new()), |(mut tables, mut failures), file| {
        match read_table(&file.name, &file.content) {
            Ok(table) => {
                info!(file = %file.name, columns = table.column_count(), rows = table.row_count(), "Parsed uploaded file");
                tables.push(table);
            }
            Err(e) => {
                warn!(file = %file.name, error = %e, "Failed to parse uploaded file");
                failures.push(FileFailure {
                    file_name: file.name.clone(),
                    message: e.to_string(),
                });
            }
        }
        (tables, failures)
    })
}

/// Ingest, merge and export with a fixed preview size and a shared export cache.
pub struct Pipeline {
    preview_rows: usize,
    cache: ExportCache,
}

impl Pipeline {
    pub fn new(preview_rows: usize, cache_entries: usize) -> Self {
        Self {
            preview_rows,
            cache: ExportCache::new(cache_entries),
        }
    }

    pub fn from_settings(settings: &MergeSettings) -> Self {
        Self::new(settings.preview_rows, settings.cache_entries)
    }

    /// Runs one interaction over the given files.
    ///
    /// # Errors
    /// Only encoding the merged workbook can fail; parse errors are reported per file.
    pub fn run(&self, files: &[UploadedFile]) -> Result<MergeReport, MergerError> {
        if files.is_empty() {
            return Ok(MergeReport::no_files());
        }

        let (tables, failures) = ingest(files);
        let merged = match merge_tables(&tables) {
            Some(merged) => merged,
            None => {
                warn!(files = files.len(), "No uploaded file could be parsed");
                return Ok(MergeReport {
                    failures,
                    outcome: Outcome::NoValidData,
                });
            }
        };
        info!(
            tables = tables.len(),
            columns = merged.table.column_count(),
            rows = merged.table.row_count(),
            duplicates_removed = merged.duplicates_removed,
            "Merged uploaded files"
        );

        let export = self.cache.get_or_export(&merged)?;
        let preview = Preview::new(&merged, self.preview_rows);
        Ok(MergeReport {
            failures,
            outcome: Outcome::Merged(Box::new(MergeResult { merged, preview, export })),
        })
    }
}
