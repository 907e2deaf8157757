use std::path::PathBuf;

use anyhow::{ensure, Context, Result};

/// Largest job age `chrono::Duration::seconds` accepts without panicking.
pub const MAX_JOB_AGE_SECS: u64 = (i64::MAX / 1000) as u64;

/// Application configuration loaded from environment variables.
/// Backend credentials are optional: with neither set the service still starts,
/// but every generation attempt fails.
#[derive(Debug, Clone)]
pub struct Config {
    pub google_api_key: Option<String>,
    pub groq_api_key: Option<String>,
    pub port: u16,
    pub rust_log: String,
    pub upload_dir: PathBuf,
    pub generated_dir: PathBuf,
    pub max_upload_bytes: usize,
    pub job_max_age_secs: u64,
    /// Period of the background sweep. Zero disables it.
    pub sweep_interval_secs: u64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            google_api_key: optional_env("GOOGLE_API_KEY"),
            groq_api_key: optional_env("GROQ_API_KEY"),
            port: parse_env("PORT", 5000)?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            upload_dir: std::env::var("UPLOAD_DIR")
                .unwrap_or_else(|_| "static/uploads".to_string())
                .into(),
            generated_dir: std::env::var("GENERATED_DIR")
                .unwrap_or_else(|_| "static/generated".to_string())
                .into(),
            max_upload_bytes: parse_env("MAX_UPLOAD_BYTES", 10 * 1024 * 1024)?,
            job_max_age_secs: check_job_max_age(parse_env("JOB_MAX_AGE_SECS", 3600)?)?,
            sweep_interval_secs: parse_env("SWEEP_INTERVAL_SECS", 0)?,
        })
    }

    /// Configuration rooted at the given directories, with no backend credentials.
    #[cfg(test)]
    pub fn for_dirs(upload_dir: PathBuf, generated_dir: PathBuf) -> Self {
        Config {
            google_api_key: None,
            groq_api_key: None,
            port: 0,
            rust_log: "debug".to_string(),
            upload_dir,
            generated_dir,
            max_upload_bytes: 10 * 1024 * 1024,
            job_max_age_secs: 3600,
            sweep_interval_secs: 0,
        }
    }
}

/// Returns the variable's value, treating a blank value as absent.
fn optional_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn check_job_max_age(secs: u64) -> Result<u64> {
    ensure!(
        secs <= MAX_JOB_AGE_SECS,
        "Environment variable 'JOB_MAX_AGE_SECS' must be at most {MAX_JOB_AGE_SECS}, got {secs}"
    );
    Ok(secs)
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("Environment variable '{key}' has an invalid value: {raw}")),
        Err(_) => Ok(default),
    }
}
