use super::page;
use super::AppState;
use crate::error::MergerError;
use crate::export::EXPORT_FILE_NAME;
use crate::export::XLSX_CONTENT_TYPE;
use crate::pipeline::FileFailure;
use crate::pipeline::MergeReport;
use crate::pipeline::StatusMessage;
use crate::pipeline::UploadedFile;
use axum::extract::multipart::MultipartError;
use axum::extract::Multipart;
use axum::extract::State;
use axum::http::header;
use axum::http::StatusCode;
use axum::response::Html;
use axum::response::IntoResponse;
use axum::response::Response;
use axum::Json;
use serde::Serialize;
use thiserror::Error;
use tokio::task::JoinError;
use tracing::error;
use tracing::info;

/// Failures that end a request before a report exists.
#[derive(Error, Debug)]
pub(crate) enum ServerError {
    #[error("Invalid upload: {0}")]
    Upload(#[from] MultipartError),

    #[error("Merge failed: {0}")]
    Merge(#[from] MergerError),

    #[error("Merge worker failed: {0}")]
    Worker(#[from] JoinError),
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = match &self {
            ServerError::Upload(e) => e.status(),
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        error!(status = status.as_u16(), error = %self, "Request failed");
        (status, self.to_string()).into_response()
    }
}

/// JSON form of a [`MergeReport`].
#[derive(Debug, Serialize)]
pub(crate) struct ReportBody {
    status: &'static str,
    messages: Vec<StatusMessage>,
    failures: Vec<FileFailure>,
    #[serde(skip_serializing_if = "Option::is_none")]
    merged: Option<MergedBody>,
}

#[derive(Debug, Serialize)]
pub(crate) struct MergedBody {
    columns: Vec<String>,
    source_rows: usize,
    rows: usize,
    duplicates_removed: usize,
    preview: Vec<Vec<String>>,
    preview_truncated: bool,
}

impl From<&MergeReport> for ReportBody {
    fn from(report: &MergeReport) -> Self {
        let merged = report.merged().map(|result| MergedBody {
            columns: result.merged.columns().to_vec(),
            source_rows: result.merged.source_rows,
            rows: result.merged.table.row_count(),
            duplicates_removed: result.merged.duplicates_removed,
            preview: result.preview.rows.clone(),
            preview_truncated: result.preview.is_truncated(),
        });
        Self {
            status: report.status(),
            messages: report.messages(),
            failures: report.failures.clone(),
            merged,
        }
    }
}

/// Collects the uploaded files in form order; parts without a file name are skipped.
async fn read_uploads(mut multipart: Multipart) -> Result<Vec<UploadedFile>, ServerError> {
    let mut files = Vec::new();
    while let Some(field) = multipart.next_field().await? {
        let name = match field.file_name() {
            Some(name) if !name.is_empty() => name.to_owned(),
            _ => continue,
        };
        let content = field.bytes().await?;
        files.push(UploadedFile::new(name, content.to_vec()));
    }
    Ok(files)
}

/// Runs the pipeline on a blocking worker.
async fn run_pipeline(state: AppState, multipart: Multipart) -> Result<MergeReport, ServerError> {
    let files = read_uploads(multipart).await?;
    info!(files = files.len(), "Merge requested");
    let report = tokio::task::spawn_blocking(move || state.pipeline.run(&files)).await??;
    Ok(report)
}

pub(crate) async fn index() -> Html<String> {
    Html(page::render(&MergeReport::no_files()))
}

pub(crate) async fn merge_page(State(state): State<AppState>, multipart: Multipart) -> Result<Html<String>, ServerError> {
    let report = run_pipeline(state, multipart).await?;
    Ok(Html(page::render(&report)))
}

pub(crate) async fn merge_report(State(state): State<AppState>, multipart: Multipart) -> Result<Json<ReportBody>, ServerError> {
    let report = run_pipeline(state, multipart).await?;
    Ok(Json(ReportBody::from(&report)))
}

/// Returns the workbook on success, otherwise the report with 422.
pub(crate) async fn merge_download(State(state): State<AppState>, multipart: Multipart) -> Result<Response, ServerError> {
    let report = run_pipeline(state, multipart).await?;
    let response = match report.merged() {
        Some(result) => (
            [
                (header::CONTENT_TYPE, XLSX_CONTENT_TYPE.to_owned()),
                (header::CONTENT_DISPOSITION, format!("attachment; filename=\"{}\"", EXPORT_FILE_NAME)),
            ],
            result.export.bytes.clone(),
        )
            .into_response(),
        None => (StatusCode::UNPROCESSABLE_ENTITY, Json(ReportBody::from(&report))).into_response(),
    };
    Ok(response)
}

pub(crate) async fn health() -> &'static str {
    "ok"
}
