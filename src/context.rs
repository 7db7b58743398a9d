use chrono::{DateTime, Utc};
use rand::distributions::Alphanumeric;
use rand::Rng;

use crate::config::HarnessConfig;

/// Per-run identity: a generated unique run name (from which resource names
/// are derived), the project identifier, and optional credential material.
/// Created at test setup, discarded at test end.
#[derive(Debug, Clone)]
pub struct RunContext {
    pub run_name: String,
    pub project_id: String,
    pub credentials_path: Option<String>,
    pub started_at: DateTime<Utc>,
}

impl RunContext {
    /// Generates a fresh context. Run names embed a timestamp and a random
    /// suffix so concurrent runs against one shared backing service never
    /// collide on derived resource names.
    pub fn generate(config: &HarnessConfig) -> Self {
        let started_at = Utc::now();
        let run_name = format!(
            "{}-{}-{}",
            config.run_prefix,
            started_at.format("%Y%m%d%H%M%S"),
            random_suffix(6)
        );
        Self {
            run_name,
            project_id: config.project_id.clone(),
            credentials_path: config.credentials_path.clone(),
            started_at,
        }
    }

    /// Derives a unique table id for this run. Multiple calls yield distinct
    /// ids, all prefixed by the run name.
    pub fn table_id(&self) -> String {
        format!("{}-tbl-{}", self.run_name, random_suffix(4))
    }

    /// Derives a staging path for an input artifact of this run.
    pub fn input_path(&self, file_name: &str) -> String {
        format!("{}/input/{file_name}", self.run_name)
    }
}

fn random_suffix(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect::<String>()
        .to_lowercase()
}
