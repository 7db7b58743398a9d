use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::lifecycle::CleanupPolicy;
use crate::operator::PollConfig;

const DEFAULT_PROJECT_ID: &str = "local-project";
const DEFAULT_INSTANCE_ID: &str = "local-instance";
const DEFAULT_RUN_PREFIX: &str = "gantry";
const DEFAULT_POLL_INTERVAL_MS: u64 = 100;
const DEFAULT_TIMEOUT_SECS: u64 = 60;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HarnessConfig {
    /// Project identifier passed through to launch parameters.
    pub project_id: String,
    /// Storage endpoint identifier passed through to launch parameters.
    pub instance_id: String,
    /// Prefix for generated run names and derived resource names.
    pub run_prefix: String,
    /// Root directory for the staging area. A scratch directory is used
    /// when unset.
    pub staging_root: Option<PathBuf>,
    /// Credential material handed to the run context.
    pub credentials_path: Option<String>,
    pub poll_interval_ms: u64,
    pub timeout_secs: u64,
    pub cleanup_policy: CleanupPolicy,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            project_id: DEFAULT_PROJECT_ID.to_string(),
            instance_id: DEFAULT_INSTANCE_ID.to_string(),
            run_prefix: DEFAULT_RUN_PREFIX.to_string(),
            staging_root: None,
            credentials_path: None,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            cleanup_policy: CleanupPolicy::default(),
        }
    }
}

impl HarnessConfig {
    pub fn validate(&self) -> Result<()> {
        if self.run_prefix.is_empty() {
            return Err(anyhow::anyhow!("run_prefix must not be empty"));
        }

        // Run names become resource identifiers on the backing service.
        if !self
            .run_prefix
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
        {
            return Err(anyhow::anyhow!(
                "run_prefix '{}' must contain only lowercase letters, digits, and '-'",
                self.run_prefix
            ));
        }

        if self.poll_interval_ms == 0 {
            return Err(anyhow::anyhow!("poll_interval_ms must be greater than 0"));
        }

        if self.timeout_secs == 0 {
            return Err(anyhow::anyhow!("timeout_secs must be greater than 0"));
        }

        if Duration::from_millis(self.poll_interval_ms) > Duration::from_secs(self.timeout_secs) {
            return Err(anyhow::anyhow!(
                "poll_interval_ms ({}) exceeds timeout_secs ({})",
                self.poll_interval_ms,
                self.timeout_secs
            ));
        }

        Ok(())
    }

    pub fn poll_config(&self) -> PollConfig {
        PollConfig {
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            timeout: Duration::from_secs(self.timeout_secs),
        }
    }

    pub fn apply_env_overrides(&mut self) {
        if let Ok(project_id) = std::env::var("GANTRY_PROJECT_ID") {
            self.project_id = project_id;
        }

        if let Ok(instance_id) = std::env::var("GANTRY_INSTANCE_ID") {
            self.instance_id = instance_id;
        }

        if let Ok(prefix) = std::env::var("GANTRY_RUN_PREFIX") {
            self.run_prefix = prefix;
        }

        if let Ok(root) = std::env::var("GANTRY_STAGING_ROOT") {
            self.staging_root = Some(PathBuf::from(root));
        }

        if let Ok(credentials) = std::env::var("GANTRY_CREDENTIALS") {
            self.credentials_path = Some(credentials);
        }

        if let Ok(interval_str) = std::env::var("GANTRY_POLL_INTERVAL_MS") {
            if let Ok(interval) = interval_str.parse::<u64>() {
                self.poll_interval_ms = interval;
            }
        }

        if let Ok(timeout_str) = std::env::var("GANTRY_TIMEOUT_SECS") {
            if let Ok(timeout) = timeout_str.parse::<u64>() {
                self.timeout_secs = timeout;
            }
        }
    }
}

/// Load configuration: env vars > config file > defaults.
pub fn load_config(config_path: Option<&str>) -> Result<HarnessConfig> {
    let mut config = HarnessConfig::default();

    if let Some(path) = config_path {
        if Path::new(path).exists() {
            let file_content = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {path}"))?;

            config = toml::from_str(&file_content)
                .with_context(|| format!("Failed to parse config file: {path}"))?;

            log::info!("Loaded harness configuration from file: {path}");
        } else {
            log::info!("Config file not found: {path}, using defaults");
        }
    }

    config.apply_env_overrides();

    config
        .validate()
        .with_context(|| "Harness configuration validation failed")?;

    log::debug!("Final harness config: {config:?}");
    Ok(config)
}
