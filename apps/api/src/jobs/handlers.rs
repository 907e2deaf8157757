//! Axum route handlers for job status and cleanup.

use axum::{
    extract::{Path, State},
    Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::jobs::sweeper::{run_cleanup, CLEANUP_MAX_FILES};
use crate::models::job::JobStatus;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct JobStatusResponse {
    pub job_id: Uuid,
    pub status: JobStatus,
    pub filename: String,
    pub source_size: u64,
    pub created_at: DateTime<Utc>,
    pub generation_started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub html_size: Option<usize>,
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CleanupResponse {
    pub success: bool,
    pub message: String,
    pub evicted_jobs: usize,
    pub active_jobs: usize,
}

/// GET /job/:job_id/status
pub async fn handle_job_status(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> Result<Json<JobStatusResponse>, AppError> {
    let not_found = || AppError::NotFound("Job not found".to_string());
    let id = Uuid::parse_str(&job_id).map_err(|_| not_found())?;
    let job = state.jobs.get(id).await.ok_or_else(not_found)?;

    Ok(Json(JobStatusResponse {
        job_id: job.id,
        status: job.status,
        filename: job.filename,
        source_size: job.source_size,
        created_at: job.created_at,
        generation_started_at: job.generation_started_at,
        completed_at: job.completed_at,
        html_size: job.html_size,
        error: job.error,
    }))
}

/// POST /cleanup
///
/// Sweeps both artifact directories and evicts jobs past the age threshold.
pub async fn handle_cleanup(State(state): State<AppState>) -> Json<CleanupResponse> {
    let outcome = run_cleanup(&state.config, state.jobs.as_ref(), CLEANUP_MAX_FILES).await;
    info!(
        "Cleanup evicted {} jobs, {} remain",
        outcome.evicted_jobs, outcome.active_jobs
    );

    Json(CleanupResponse {
        success: true,
        message: format!("Cleaned up {} old jobs", outcome.evicted_jobs),
        evicted_jobs: outcome.evicted_jobs,
        active_jobs: outcome.active_jobs,
    })
}
