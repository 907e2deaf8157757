//! Sweeper: bounded retention for artifact directories and job records.
//!
//! Two independent policies:
//! - count-based: keep only the N most recently modified files per directory
//! - age-based: drop jobs older than a threshold, together with their files
//!
//! Nothing here ever fails the caller. Filesystem errors are collected into the
//! returned report and logged once at the boundary.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::config::Config;
use crate::jobs::JobStore;
use crate::models::job::JobStatus;

/// File retention used after every upload and by the background sweep.
pub const STEADY_STATE_MAX_FILES: usize = 10;
/// File retention used at startup and by explicit cleanup calls.
pub const CLEANUP_MAX_FILES: usize = 5;

#[derive(Debug, Default)]
pub struct SweepReport {
    pub removed: Vec<PathBuf>,
    pub kept: usize,
    pub failures: Vec<(PathBuf, io::Error)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CleanupOutcome {
    pub evicted_jobs: usize,
    pub active_jobs: usize,
}

/// Deletes the oldest files in `dir` until at most `max_files` remain.
pub async fn sweep_directory(dir: &Path, max_files: usize) -> SweepReport {
    let mut report = SweepReport::default();

    let mut files = match list_files_by_mtime(dir).await {
        Ok(files) => files,
        Err(e) => {
            warn!("Cleanup error: could not list {}: {e}", dir.display());
            report.failures.push((dir.to_path_buf(), e));
            return report;
        }
    };

    let excess = files.len().saturating_sub(max_files);
    report.kept = files.len() - excess;

    for (path, _) in files.drain(..excess) {
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                info!("Cleaned up old file: {}", path.display());
                report.removed.push(path);
            }
            Err(e) => {
                warn!("Could not remove {}: {e}", path.display());
                report.failures.push((path, e));
            }
        }
    }

    report
}

/// Regular files in `dir`, oldest first. Ties break on path so order is stable.
async fn list_files_by_mtime(dir: &Path) -> io::Result<Vec<(PathBuf, SystemTime)>> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    let mut files = Vec::new();

    while let Some(entry) = entries.next_entry().await? {
        let metadata = match entry.metadata().await {
            Ok(m) => m,
            Err(e) => {
                // Vanished between listing and stat; another sweep got it.
                warn!("Skipping {}: {e}", entry.path().display());
                continue;
            }
        };
        if !metadata.is_file() {
            continue;
        }
        let modified = metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH);
        files.push((entry.path(), modified));
    }

    files.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(&b.0)));
    Ok(files)
}

/// Removes every job older than `max_age` and deletes its files.
/// Jobs still in `generating` are left alone; their artifact is not written yet.
/// Returns the number of evicted jobs.
pub async fn evict_expired_jobs(
    store: &dyn JobStore,
    now: DateTime<Utc>,
    max_age: chrono::Duration,
) -> usize {
    let expired: Vec<_> = store
        .list()
        .await
        .into_iter()
        .filter(|job| job.status != JobStatus::Generating && job.age(now) > max_age)
        .map(|job| job.id)
        .collect();

    let mut evicted = 0;
    for id in expired {
        let Some(job) = store.remove(id).await else {
            continue;
        };
        evicted += 1;

        let files = job.html_path.iter().chain(std::iter::once(&job.source_path));
        for path in files {
            if let Err(e) = remove_if_present(path).await {
                warn!("Could not remove file for evicted job {id}: {e}");
            }
        }
        info!("Evicted job {id} (created {})", job.created_at);
    }

    evicted
}

async fn remove_if_present(path: &Path) -> io::Result<()> {
    match tokio::fs::remove_file(path).await {
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        other => other,
    }
}

/// Sweeps both artifact directories to `max_files` and evicts expired jobs.
pub async fn run_cleanup(config: &Config, store: &dyn JobStore, max_files: usize) -> CleanupOutcome {
    sweep_directory(&config.upload_dir, max_files).await;
    sweep_directory(&config.generated_dir, max_files).await;

    let max_age = chrono::Duration::seconds(config.job_max_age_secs as i64);
    let evicted_jobs = evict_expired_jobs(store, Utc::now(), max_age).await;

    CleanupOutcome {
        evicted_jobs,
        active_jobs: store.len().await,
    }
}

/// Starts the periodic sweep, unless the configured interval is zero.
pub fn spawn_periodic_sweep(config: Config, store: Arc<dyn JobStore>) -> Option<JoinHandle<()>> {
    if config.sweep_interval_secs == 0 {
        return None;
    }
    let period = Duration::from_secs(config.sweep_interval_secs);
    info!("Background sweep every {}s", period.as_secs());

    Some(tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        // The first tick completes immediately; startup already swept.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let outcome = run_cleanup(&config, store.as_ref(), STEADY_STATE_MAX_FILES).await;
            info!(
                "Background sweep: evicted {} jobs, {} active",
                outcome.evicted_jobs, outcome.active_jobs
            );
        }
    }))
}
