use std::env;
use std::path::PathBuf;
use std::time::Duration;

use tracing::info;

use crate::error::SleeplessError;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    // Remote search
    pub apify_api_token: String,
    /// Alternate API root (proxy or local fake); the public API when unset.
    pub apify_base_url: Option<String>,

    // Files
    pub corpus_path: PathBuf,
    pub snapshot_path: PathBuf,
    pub sources_path: PathBuf,
}

impl Config {
    /// Load configuration for a harvest run. The Apify token is required;
    /// file locations fall back to the working directory defaults.
    pub fn from_env() -> Result<Self, SleeplessError> {
        Ok(Self {
            apify_api_token: required_env("APIFY_API_TOKEN")?,
            ..Self::files_from_env()
        })
    }

    /// Load only the file locations (the offline analysis needs no secrets).
    pub fn files_from_env() -> Self {
        Self {
            apify_api_token: String::new(),
            apify_base_url: optional_env("APIFY_BASE_URL"),
            corpus_path: path_env("SLEEPLESS_CORPUS_PATH", "alltweets.jsonl"),
            snapshot_path: path_env("SLEEPLESS_SNAPSHOT_PATH", "alltweets2.jsonl"),
            sources_path: path_env("SLEEPLESS_SOURCES_PATH", "us-cities.txt"),
        }
    }

    /// Log the config with the token masked.
    pub fn log_redacted(&self) {
        info!(
            apify_api_token = redact(&self.apify_api_token),
            apify_base_url = self.apify_base_url.as_deref().unwrap_or("default"),
            corpus_path = %self.corpus_path.display(),
            snapshot_path = %self.snapshot_path.display(),
            sources_path = %self.sources_path.display(),
            "Config loaded"
        );
    }
}

/// Tuning knobs for the acquisition schedule.
#[derive(Debug, Clone)]
pub struct HarvestSettings {
    /// Delay between polls while results keep arriving.
    pub gather_delay: Duration,
    /// Cool-down once the remote side keeps returning nothing.
    pub backoff_delay: Duration,
    /// Consecutive empty polls tolerated before backing off.
    pub failure_threshold: u32,
    /// Full save after this many completed polls.
    pub save_every: u32,
    /// Upper bound on posts requested per poll.
    pub max_results: u32,
    /// Search radius around each source, in kilometres.
    pub radius_km: u32,
}

impl Default for HarvestSettings {
    fn default() -> Self {
        Self {
            gather_delay: Duration::from_secs(60),
            backoff_delay: Duration::from_secs(30 * 60),
            failure_threshold: 2,
            save_every: 10,
            max_results: 500,
            radius_km: 100,
        }
    }
}

fn required_env(key: &str) -> Result<String, SleeplessError> {
    env::var(key).map_err(|_| SleeplessError::Config(format!("{key} environment variable is required")))
}

fn optional_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn path_env(key: &str, default: &str) -> PathBuf {
    env::var(key)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(default))
}

fn redact(secret: &str) -> String {
    if secret.is_empty() {
        return "<unset>".to_string();
    }
    let visible: String = secret.chars().take(4).collect();
    format!("{visible}…")
}
