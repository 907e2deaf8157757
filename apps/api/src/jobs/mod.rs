//! Job Store: the registry correlating upload, generate and retrieve calls.
//!
//! Handlers only see `Arc<dyn JobStore>`. The default backend is in-memory and
//! is lost on restart; swap it in `main` for anything durable.

pub mod handlers;
pub mod sweeper;

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::models::job::{Artifact, Job, TransitionError};

#[async_trait]
pub trait JobStore: Send + Sync {
    async fn insert(&self, job: Job);
    async fn get(&self, id: Uuid) -> Option<Job>;
    /// `uploaded → generating`. Returns the job as it was after the move.
    async fn begin_generation(&self, id: Uuid, now: DateTime<Utc>) -> Result<Job, TransitionError>;
    async fn complete(&self, id: Uuid, artifact: Artifact) -> Result<Job, TransitionError>;
    async fn fail(&self, id: Uuid, error: String) -> Result<Job, TransitionError>;
    async fn remove(&self, id: Uuid) -> Option<Job>;
    async fn list(&self) -> Vec<Job>;
    async fn len(&self) -> usize;
}

#[derive(Default)]
pub struct InMemoryJobStore {
    jobs: RwLock<HashMap<Uuid, Job>>,
}

impl InMemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    async fn update(
        &self,
        id: Uuid,
        apply: impl FnOnce(&mut Job) -> Result<(), TransitionError> + Send,
    ) -> Result<Job, TransitionError> {
        let mut jobs = self.jobs.write().await;
        let job = jobs.get_mut(&id).ok_or(TransitionError::UnknownJob(id))?;
        apply(job)?;
        Ok(job.clone())
    }
}

#[async_trait]
impl JobStore for InMemoryJobStore {
    async fn insert(&self, job: Job) {
        self.jobs.write().await.insert(job.id, job);
    }

    async fn get(&self, id: Uuid) -> Option<Job> {
        self.jobs.read().await.get(&id).cloned()
    }

    async fn begin_generation(&self, id: Uuid, now: DateTime<Utc>) -> Result<Job, TransitionError> {
        self.update(id, |job| job.begin_generation(now)).await
    }

    async fn complete(&self, id: Uuid, artifact: Artifact) -> Result<Job, TransitionError> {
        self.update(id, |job| job.complete(artifact)).await
    }

    async fn fail(&self, id: Uuid, error: String) -> Result<Job, TransitionError> {
        self.update(id, |job| job.fail(error)).await
    }

    async fn remove(&self, id: Uuid) -> Option<Job> {
        self.jobs.write().await.remove(&id)
    }

    async fn list(&self) -> Vec<Job> {
        self.jobs.read().await.values().cloned().collect()
    }

    async fn len(&self) -> usize {
        self.jobs.read().await.len()
    }
}
