//! Portfolio Generation: orchestrates one job from stored resume text to a
//! saved artifact.
//!
//! Flow: begin_generation → build prompt → gateway.generate → assemble →
//!       write artifact → complete.
//!
//! Any failure after `begin_generation` marks the job failed, so a job never
//! stays in `generating` once this function returns.

use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::Utc;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::jobs::JobStore;
use crate::llm_client::ProviderGateway;
use crate::models::job::{Artifact, Job};
use crate::portfolio::assembler::assemble;
use crate::portfolio::prompts::build_portfolio_prompt;

/// Deterministic artifact location for a job.
pub fn artifact_path(generated_dir: &Path, job_id: Uuid) -> PathBuf {
    generated_dir.join(format!("{job_id}_portfolio.html"))
}

pub async fn generate_portfolio(
    gateway: &ProviderGateway,
    jobs: &dyn JobStore,
    generated_dir: &Path,
    job_id: Uuid,
) -> Result<Job, AppError> {
    // Step 1: uploaded → generating (rejects unknown and already-used tokens)
    let job = jobs.begin_generation(job_id, Utc::now()).await?;
    info!("Generating portfolio for job {job_id} ({})", job.filename);

    // Step 2: prompt + backend fallback
    let prompt = build_portfolio_prompt(&job.resume_text);
    let generation = match gateway.generate(&prompt).await {
        Ok(generation) => generation,
        Err(e) => {
            let message = e.to_string();
            jobs.fail(job_id, message.clone()).await?;
            return Err(AppError::Generation(format!("AI generation failed: {message}")));
        }
    };

    // Step 3: assemble (never fails; degrades to the fallback page)
    let completed_at = Utc::now();
    let html = assemble(&generation.text, completed_at);

    // Step 4: persist the artifact
    let html_path = artifact_path(generated_dir, job_id);
    let written = tokio::fs::write(&html_path, html.as_bytes())
        .await
        .with_context(|| format!("Failed to write {}", html_path.display()));
    if let Err(e) = written {
        error!("Could not save portfolio for job {job_id}: {e:#}");
        jobs.fail(job_id, "Could not save generated portfolio".to_string())
            .await?;
        return Err(AppError::Internal(e));
    }

    // Step 5: generating → completed
    let artifact = Artifact {
        path: html_path.clone(),
        size: html.len(),
        provider: generation.provider,
        completed_at,
    };
    let job = match jobs.complete(job_id, artifact).await {
        Ok(job) => job,
        Err(e) => {
            // The record is gone or moved on; nothing will ever reference the file.
            warn!("Discarding portfolio for job {job_id}: {e}");
            if let Err(io_err) = tokio::fs::remove_file(&html_path).await {
                warn!("Could not remove {}: {io_err}", html_path.display());
            }
            return Err(e.into());
        }
    };

    info!(
        "Portfolio for job {job_id} saved to {} ({} bytes)",
        html_path.display(),
        html.len()
    );

    Ok(job)
}
