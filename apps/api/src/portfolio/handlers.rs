//! Axum route handlers for generating and retrieving portfolios.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::{header, HeaderValue},
    response::{Html, IntoResponse, Redirect, Response},
    Json,
};
use anyhow::Context;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::job::{Job, JobStatus};
use crate::portfolio::assembler::escape_html;
use crate::portfolio::generator::generate_portfolio;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct GenerateRequest {
    pub job_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct GenerateResponse {
    pub success: bool,
    pub message: String,
    pub job_id: Uuid,
    pub preview_url: String,
    pub download_url: String,
    pub view_url: String,
}

/// POST /generate
///
/// Runs the whole pipeline synchronously and returns the retrieval links.
pub async fn handle_generate(
    State(state): State<AppState>,
    payload: Result<Json<GenerateRequest>, JsonRejection>,
) -> Result<Json<GenerateResponse>, AppError> {
    let invalid = || AppError::Validation("Invalid job ID or file not uploaded".to_string());
    let Json(request) = payload.map_err(|rejection| {
        warn!("Rejected generate request body: {rejection}");
        invalid()
    })?;
    let job_id = request
        .job_id
        .as_deref()
        .and_then(|raw| Uuid::parse_str(raw.trim()).ok())
        .ok_or_else(invalid)?;
    if state.jobs.get(job_id).await.is_none() {
        return Err(invalid());
    }

    let job = generate_portfolio(
        &state.gateway,
        state.jobs.as_ref(),
        &state.config.generated_dir,
        job_id,
    )
    .await?;

    Ok(Json(GenerateResponse {
        success: true,
        message: "Portfolio generated successfully!".to_string(),
        job_id: job.id,
        preview_url: format!("/preview/{job_id}"),
        download_url: format!("/download/{job_id}"),
        view_url: format!("/view/{job_id}"),
    }))
}

/// The job behind `raw_id`, only if it finished successfully.
async fn completed_job(state: &AppState, raw_id: &str) -> Option<Job> {
    let id = Uuid::parse_str(raw_id).ok()?;
    state
        .jobs
        .get(id)
        .await
        .filter(|job| job.status == JobStatus::Completed && job.html_path.is_some())
}

async fn read_artifact(job: &Job) -> Result<String, AppError> {
    let path = job
        .html_path
        .as_ref()
        .ok_or_else(|| AppError::NotFound(format!("Job {} has no portfolio", job.id)))?;
    let html = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    Ok(html)
}

/// GET /preview/:job_id
///
/// The generated document verbatim. Anything but a completed job goes home.
pub async fn handle_preview(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> Result<Response, AppError> {
    let Some(job) = completed_job(&state, &job_id).await else {
        return Ok(Redirect::to("/").into_response());
    };
    Ok(Html(read_artifact(&job).await?).into_response())
}

/// GET /view/:job_id
///
/// Wrapper page framing the preview with download/home/new-tab actions.
pub async fn handle_view(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> Response {
    match completed_job(&state, &job_id).await {
        Some(job) => Html(render_view_page(&job)).into_response(),
        None => Redirect::to("/").into_response(),
    }
}

/// GET /download/:job_id
pub async fn handle_download(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> Result<Response, AppError> {
    let Some(job) = completed_job(&state, &job_id).await else {
        return Ok(Redirect::to("/").into_response());
    };
    let html = read_artifact(&job).await?;

    let disposition = format!(
        "attachment; filename=\"{}\"",
        download_filename(&job.filename, &Utc::now().format("%Y%m%d").to_string())
    );
    let disposition = HeaderValue::from_str(&disposition)
        .context("Download filename is not a valid header value")?;

    Ok((
        [
            (header::CONTENT_TYPE, HeaderValue::from_static("text/html; charset=utf-8")),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        html,
    )
        .into_response())
}

/// `<stem>_portfolio_<YYYYMMDD>.html`
pub fn download_filename(original: &str, date_stamp: &str) -> String {
    let stem = std::path::Path::new(original)
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .unwrap_or("resume");
    format!("{stem}_portfolio_{date_stamp}.html")
}

fn render_view_page(job: &Job) -> String {
    let id = job.id;
    let filename = escape_html(&job.filename);
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Portfolio Preview by PortfolioGen</title>
    <link href="https://cdn.jsdelivr.net/npm/bootstrap@5.3.0/dist/css/bootstrap.min.css" rel="stylesheet">
    <link rel="stylesheet" href="https://cdnjs.cloudflare.com/ajax/libs/font-awesome/6.4.0/css/all.min.css">
    <style>
        body {{ font-family: Arial, sans-serif; margin: 0; padding: 0; background: #f5f5f5; }}
        .header {{
            background: linear-gradient(135deg, #6366f1 0%, #8b5cf6 100%);
            color: white;
            padding: 25px;
            text-align: center;
        }}
        .actions {{
            text-align: center;
            padding: 25px;
            background: white;
            margin: 20px auto;
            max-width: 1400px;
            border-radius: 10px;
        }}
        .btn-portfolio {{
            background: linear-gradient(135deg, #6366f1 0%, #8b5cf6 100%);
            color: white;
            padding: 12px 30px;
            border-radius: 8px;
            text-decoration: none;
            display: inline-block;
            margin: 0 10px;
            font-weight: bold;
        }}
        .btn-portfolio:hover {{ color: white; transform: translateY(-2px); }}
        .btn-home {{ background: linear-gradient(135deg, #6b7280 0%, #4b5563 100%); }}
        .btn-open {{ background: linear-gradient(135deg, #10b981 0%, #059669 100%); }}
        .portfolio-container {{
            background: white;
            margin: 20px auto;
            max-width: 1400px;
            border-radius: 10px;
            overflow: hidden;
            min-height: 500px;
        }}
    </style>
</head>
<body>
    <div class="header">
        <h1><i class="fas fa-rocket me-2"></i>Portfolio Preview</h1>
        <p class="lead">Generated from: {filename}</p>
    </div>

    <div class="actions container">
        <a href="/download/{id}" class="btn-portfolio"><i class="fas fa-download me-2"></i>Download Portfolio</a>
        <a href="/" class="btn-portfolio btn-home"><i class="fas fa-home me-2"></i>Back to Home</a>
        <a href="/preview/{id}" target="_blank" class="btn-portfolio btn-open"><i class="fas fa-external-link-alt me-2"></i>Open in New Tab</a>
    </div>

    <div class="portfolio-container">
        <iframe src="/preview/{id}" style="width: 100%; height: 800px; border: none;" title="Portfolio Preview"></iframe>
    </div>

    <div class="text-center mt-4 mb-5">
        <p class="text-muted">This portfolio was generated using PortfolioGen. You can download and customize it as needed.</p>
    </div>
</body>
</html>"#
    )
}
