use std::path::Path;

use anyhow::{Context, Result};
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Uploader configuration, persisted as JSON next to the database.
///
/// `last_upload_time` is the durable watermark: it is rewritten only after
/// the server has confirmed an upload, so a failed cycle re-sends the same
/// window next time (the server dedups on event id).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    pub server_url: String,
    pub api_key: String,
    pub upload_interval_minutes: u64,
    pub max_events_per_upload: u32,
    pub retry_attempts: u32,
    pub retry_delay_seconds: u64,
    pub last_upload_time: String,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            server_url: "http://localhost:8080/upload_data.php".to_string(),
            api_key: "dev-key-change-me".to_string(),
            upload_interval_minutes: 5,
            max_events_per_upload: 100,
            retry_attempts: 3,
            retry_delay_seconds: 5,
            // First run picks up the last month of history.
            last_upload_time: (Utc::now() - Duration::days(30)).to_rfc3339(),
        }
    }
}

impl UploadConfig {
    /// Load the config, creating it with defaults on first run.
    pub fn load_or_create(path: &Path) -> Result<Self> {
        if path.exists() {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("cannot read config {}", path.display()))?;
            let config = serde_json::from_str(&text)
                .with_context(|| format!("cannot parse config {}", path.display()))?;
            info!("Configuration loaded from {}", path.display());
            return Ok(config);
        }

        let config = Self::default();
        config.save(path)?;
        info!("Default configuration created at {}", path.display());
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let text = serde_json::to_string_pretty(self).context("cannot serialize config")?;
        std::fs::write(path, text)
            .with_context(|| format!("cannot write config {}", path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("upload_config.json");

        let mut config = UploadConfig::load_or_create(&path).unwrap();
        assert!(path.exists());

        config.last_upload_time = "2025-06-01T00:00:00+00:00".to_string();
        config.retry_attempts = 7;
        config.save(&path).unwrap();

        let reloaded = UploadConfig::load_or_create(&path).unwrap();
        assert_eq!(reloaded.last_upload_time, "2025-06-01T00:00:00+00:00");
        assert_eq!(reloaded.retry_attempts, 7);
        assert_eq!(reloaded.max_events_per_upload, 100);
    }
}
