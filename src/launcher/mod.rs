//! Pipeline launch boundary.
//!
//! A launcher accepts a [`LaunchConfig`] built for one run, returns a
//! [`LaunchHandle`], and exposes job state for the run monitor to poll.

pub mod local;

pub use local::{LocalLauncher, Template, TemplateParams};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("no template registered under '{0}'")]
    UnknownTemplate(String),

    #[error("template '{template}' requires parameter '{name}'")]
    MissingParameter { template: String, name: String },

    #[error("job {0} not found")]
    JobNotFound(Uuid),

    #[error("job {job_id} is already in terminal state {state:?}")]
    AlreadyTerminal { job_id: Uuid, state: JobState },
}

/// Observable state of a launched job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum JobState {
    Queued,
    Running,
    Succeeded,
    Failed,
    Cancelled,
}

impl JobState {
    /// Terminal states admit no further transition.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Succeeded | JobState::Failed | JobState::Cancelled)
    }
}

/// Parameter set for one pipeline run. Immutable once built and consumed
/// exactly once by [`PipelineLauncher::launch`]; parameter order is the
/// insertion order.
#[derive(Debug, Clone)]
pub struct LaunchConfig {
    job_name: String,
    template: String,
    parameters: Vec<(String, String)>,
}

impl LaunchConfig {
    pub fn builder(job_name: &str, template: &str) -> LaunchConfigBuilder {
        LaunchConfigBuilder {
            job_name: job_name.to_string(),
            template: template.to_string(),
            parameters: Vec::new(),
        }
    }

    pub fn job_name(&self) -> &str {
        &self.job_name
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    pub fn parameter(&self, name: &str) -> Option<&str> {
        self.parameters
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn parameters(&self) -> impl Iterator<Item = (&str, &str)> {
        self.parameters.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

#[derive(Debug)]
pub struct LaunchConfigBuilder {
    job_name: String,
    template: String,
    parameters: Vec<(String, String)>,
}

impl LaunchConfigBuilder {
    /// Adds a parameter, replacing any earlier value under the same name
    /// while keeping its original position.
    pub fn add_parameter(mut self, name: &str, value: &str) -> Self {
        match self.parameters.iter_mut().find(|(k, _)| k == name) {
            Some((_, v)) => *v = value.to_string(),
            None => self.parameters.push((name.to_string(), value.to_string())),
        }
        self
    }

    pub fn build(self) -> LaunchConfig {
        LaunchConfig {
            job_name: self.job_name,
            template: self.template,
            parameters: self.parameters,
        }
    }
}

/// Opaque handle to a launched job.
#[derive(Debug, Clone)]
pub struct LaunchHandle {
    pub job_id: Uuid,
    pub job_name: String,
    pub launched_at: DateTime<Utc>,
}

#[async_trait]
pub trait PipelineLauncher: Send + Sync {
    /// Submits a run. Fails if no such template is registered or required
    /// parameters are missing.
    async fn launch(&self, config: LaunchConfig) -> Result<LaunchHandle, LaunchError>;

    async fn job_state(&self, handle: &LaunchHandle) -> Result<JobState, LaunchError>;

    /// Drives a non-terminal job to `Cancelled`.
    async fn cancel(&self, handle: &LaunchHandle) -> Result<(), LaunchError>;
}
