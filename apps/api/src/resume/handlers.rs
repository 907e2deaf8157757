//! Axum route handler for resume upload.

use anyhow::Context;
use axum::{
    extract::{multipart::MultipartError, Multipart, State},
    http::StatusCode,
    Json,
};
use bytes::Bytes;
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::jobs::sweeper::{sweep_directory, STEADY_STATE_MAX_FILES};
use crate::models::job::Job;
use crate::resume::extractor::extract_text_blocking;
use crate::state::AppState;

const ALLOWED_EXTENSIONS: &[&str] = &["pdf"];
const FALLBACK_FILENAME: &str = "resume.pdf";

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub success: bool,
    pub job_id: Uuid,
    pub filename: String,
    #[serde(rename = "fileSize")]
    pub file_size: String,
}

/// POST /upload
///
/// Stores the PDF, extracts its text and registers an `uploaded` job.
pub async fn handle_upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, AppError> {
    let max_bytes = state.config.max_upload_bytes;
    let to_app_error = |e: MultipartError| multipart_error(e, max_bytes);

    let mut upload: Option<(String, Bytes)> = None;
    while let Some(field) = multipart.next_field().await.map_err(to_app_error)? {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field.file_name().unwrap_or_default().to_string();
        let data = field.bytes().await.map_err(to_app_error)?;
        upload = Some((filename, data));
        break;
    }

    let (filename, data) =
        upload.ok_or_else(|| AppError::Validation("No file part".to_string()))?;
    if filename.is_empty() {
        return Err(AppError::Validation("No selected file".to_string()));
    }
    if !allowed_file(&filename) {
        return Err(AppError::Validation("Only PDF files are allowed".to_string()));
    }

    let job_id = Uuid::new_v4();
    let filename = sanitize_filename(&filename);
    let source_path = state.config.upload_dir.join(format!("{job_id}_{filename}"));
    tokio::fs::write(&source_path, &data)
        .await
        .with_context(|| format!("Failed to save upload to {}", source_path.display()))?;

    let resume_text = extract_text_blocking(source_path.clone()).await;
    if resume_text.trim().is_empty() {
        if let Err(e) = tokio::fs::remove_file(&source_path).await {
            warn!("Could not remove rejected upload {}: {e}", source_path.display());
        }
        return Err(AppError::Validation(
            "Could not extract text from PDF. Please ensure it contains text.".to_string(),
        ));
    }

    let source_size = data.len() as u64;
    state
        .jobs
        .insert(Job::new(
            job_id,
            filename.clone(),
            resume_text,
            source_path,
            source_size,
        ))
        .await;
    info!("Registered job {job_id} for {filename} ({source_size} bytes)");

    sweep_directory(&state.config.upload_dir, STEADY_STATE_MAX_FILES).await;
    sweep_directory(&state.config.generated_dir, STEADY_STATE_MAX_FILES).await;

    Ok(Json(UploadResponse {
        success: true,
        job_id,
        filename,
        file_size: format_size(source_size),
    }))
}

fn multipart_error(e: MultipartError, max_bytes: usize) -> AppError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge(format!(
            "File too large. Maximum size is {}MB.",
            max_bytes / (1024 * 1024)
        ))
    } else {
        AppError::Validation(format!("Malformed upload: {}", e.body_text()))
    }
}

pub fn allowed_file(filename: &str) -> bool {
    filename
        .rsplit_once('.')
        .is_some_and(|(_, ext)| ALLOWED_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
}

/// Reduces a client-supplied name to a safe basename: ASCII alphanumerics,
/// `.`, `-`, `_`, with whitespace turned into `_`.
pub fn sanitize_filename(filename: &str) -> String {
    let base = filename
        .rsplit(|c: char| c == '/' || c == '\\')
        .next()
        .unwrap_or(filename);
    let cleaned: String = base
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'))
        .collect();
    let cleaned = cleaned.trim_matches(|c: char| c == '.' || c == '_');

    if cleaned.is_empty() || !allowed_file(cleaned) {
        FALLBACK_FILENAME.to_string()
    } else {
        cleaned.to_string()
    }
}

/// Megabytes with two decimals, e.g. `"0.25 MB"`.
pub fn format_size(bytes: u64) -> String {
    format!("{:.2} MB", bytes as f64 / (1024.0 * 1024.0))
}
