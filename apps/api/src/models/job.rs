use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Lifecycle of one generation request.
///
/// The only legal moves are `Uploaded → Generating → {Completed | Failed}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Uploaded,
    Generating,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn can_transition_to(self, next: JobStatus) -> bool {
        matches!(
            (self, next),
            (JobStatus::Uploaded, JobStatus::Generating)
                | (JobStatus::Generating, JobStatus::Completed)
                | (JobStatus::Generating, JobStatus::Failed)
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Uploaded => "uploaded",
            JobStatus::Generating => "generating",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum TransitionError {
    #[error("Job {0} not found")]
    UnknownJob(Uuid),

    #[error("Job {id} cannot move from '{from}' to '{to}'")]
    Illegal {
        id: Uuid,
        from: JobStatus,
        to: JobStatus,
    },
}

/// Where a finished artifact lives and who produced it.
#[derive(Debug, Clone)]
pub struct Artifact {
    pub path: PathBuf,
    pub size: usize,
    /// Backend name. Internal diagnostics only, never returned to clients.
    pub provider: String,
    pub completed_at: DateTime<Utc>,
}

/// One resume-to-portfolio request. Owned by the job store; the files it
/// points at must be deleted together with the record.
#[derive(Debug, Clone)]
pub struct Job {
    pub id: Uuid,
    pub filename: String,
    pub resume_text: String,
    pub source_path: PathBuf,
    pub source_size: u64,
    pub status: JobStatus,
    pub created_at: DateTime<Utc>,
    pub generation_started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub error: Option<String>,
    pub html_path: Option<PathBuf>,
    pub html_size: Option<usize>,
    pub provider: Option<String>,
}

impl Job {
    pub fn new(
        id: Uuid,
        filename: String,
        resume_text: String,
        source_path: PathBuf,
        source_size: u64,
    ) -> Self {
        Job {
            id,
            filename,
            resume_text,
            source_path,
            source_size,
            status: JobStatus::Uploaded,
            created_at: Utc::now(),
            generation_started_at: None,
            completed_at: None,
            error: None,
            html_path: None,
            html_size: None,
            provider: None,
        }
    }

    fn transition(&mut self, next: JobStatus) -> Result<(), TransitionError> {
        if !self.status.can_transition_to(next) {
            return Err(TransitionError::Illegal {
                id: self.id,
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        Ok(())
    }

    pub fn begin_generation(&mut self, now: DateTime<Utc>) -> Result<(), TransitionError> {
        self.transition(JobStatus::Generating)?;
        self.generation_started_at = Some(now);
        Ok(())
    }

    pub fn complete(&mut self, artifact: Artifact) -> Result<(), TransitionError> {
        self.transition(JobStatus::Completed)?;
        self.completed_at = Some(artifact.completed_at);
        self.html_path = Some(artifact.path);
        self.html_size = Some(artifact.size);
        self.provider = Some(artifact.provider);
        self.error = None;
        Ok(())
    }

    pub fn fail(&mut self, error: String) -> Result<(), TransitionError> {
        self.transition(JobStatus::Failed)?;
        self.error = Some(error);
        Ok(())
    }

    /// Age at `now`. Clock skew never yields a negative age.
    pub fn age(&self, now: DateTime<Utc>) -> chrono::Duration {
        (now - self.created_at).max(chrono::Duration::zero())
    }
}
