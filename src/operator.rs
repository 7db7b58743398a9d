//! Run monitor: polls a launched job to a terminal state within a budget.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::time::Instant;
use uuid::Uuid;

use crate::error::HarnessError;
use crate::launcher::{JobState, LaunchHandle, PipelineLauncher};

const DEFAULT_POLL_INTERVAL_MS: u64 = 100;
const DEFAULT_TIMEOUT_SECS: u64 = 60;

#[derive(Debug, Clone)]
pub struct PollConfig {
    pub poll_interval: Duration,
    pub timeout: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

/// Terminal outcome of one monitored run. Read-only after creation.
#[derive(Debug, Clone)]
pub struct RunResult {
    pub job_id: Uuid,
    pub job_name: String,
    pub state: JobState,
    pub elapsed: Duration,
    pub finished_at: DateTime<Utc>,
}

impl RunResult {
    pub fn is_succeeded(&self) -> bool {
        self.state == JobState::Succeeded
    }
}

/// Blocks (by bounded polling, with suspension between probes) until a
/// launched job reaches a terminal state or the budget runs out.
pub struct PipelineOperator {
    launcher: Arc<dyn PipelineLauncher>,
}

impl PipelineOperator {
    pub fn new(launcher: Arc<dyn PipelineLauncher>) -> Self {
        Self { launcher }
    }

    pub async fn wait_until_done(
        &self,
        handle: &LaunchHandle,
        config: &PollConfig,
    ) -> Result<RunResult, HarnessError> {
        let start = Instant::now();
        let deadline = start + config.timeout;

        loop {
            let state = self.launcher.job_state(handle).await?;
            if state.is_terminal() {
                let elapsed = start.elapsed();
                log::info!(
                    "job '{}' ({}) reached {state:?} after {:.2}s",
                    handle.job_name,
                    handle.job_id,
                    elapsed.as_secs_f64()
                );
                return Ok(RunResult {
                    job_id: handle.job_id,
                    job_name: handle.job_name.clone(),
                    state,
                    elapsed,
                    finished_at: Utc::now(),
                });
            }

            if Instant::now() >= deadline {
                log::warn!(
                    "job '{}' ({}) still {state:?} after {:?}",
                    handle.job_name,
                    handle.job_id,
                    config.timeout
                );
                return Err(HarnessError::Timeout {
                    job_name: handle.job_name.clone(),
                    timeout: config.timeout,
                });
            }

            tokio::time::sleep(config.poll_interval).await;
        }
    }
}
