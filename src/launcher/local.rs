use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use tokio::task::JoinHandle;
use uuid::Uuid;

use super::{JobState, LaunchConfig, LaunchError, LaunchHandle, PipelineLauncher};

/// Parameters handed to a running template, keyed by name.
#[derive(Debug, Clone, Default)]
pub struct TemplateParams {
    values: BTreeMap<String, String>,
}

impl TemplateParams {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    /// Fetches a parameter the template cannot run without. Launch-time
    /// validation covers declared parameters; this guards undeclared ones.
    pub fn require(&self, name: &str) -> anyhow::Result<&str> {
        self.get(name)
            .ok_or_else(|| anyhow::anyhow!("parameter '{name}' not provided"))
    }
}

impl From<&LaunchConfig> for TemplateParams {
    fn from(config: &LaunchConfig) -> Self {
        Self {
            values: config
                .parameters()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }
}

/// A named, parameterized pipeline definition executable by [`LocalLauncher`].
#[async_trait]
pub trait Template: Send + Sync {
    /// Parameters that must be present at launch time.
    fn required_parameters(&self) -> &[&str] {
        &[]
    }

    async fn run(&self, params: &TemplateParams) -> anyhow::Result<()>;
}

#[derive(Debug)]
struct JobEntry {
    job_name: String,
    state: JobState,
    error: Option<String>,
    task: Option<JoinHandle<()>>,
}

/// In-process launcher executing registered templates on the tokio runtime.
///
/// Stands in for an external managed pipeline service: jobs move
/// Queued → Running → {Succeeded, Failed}, or to Cancelled via [`cancel`].
///
/// [`cancel`]: PipelineLauncher::cancel
#[derive(Default)]
pub struct LocalLauncher {
    templates: DashMap<String, Arc<dyn Template>>,
    jobs: Arc<DashMap<Uuid, JobEntry>>,
}

impl LocalLauncher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_template(&self, name: &str, template: Arc<dyn Template>) {
        log::debug!("registered template '{name}'");
        self.templates.insert(name.to_string(), template);
    }

    /// Failure message of a terminal job, if any.
    pub fn job_error(&self, handle: &LaunchHandle) -> Option<String> {
        self.jobs
            .get(&handle.job_id)
            .and_then(|entry| entry.error.clone())
    }

    /// Records a terminal state unless the job already reached one. A job
    /// cancelled while its template body is finishing stays Cancelled.
    fn complete(jobs: &DashMap<Uuid, JobEntry>, job_id: Uuid, state: JobState, error: Option<String>) {
        if let Some(mut entry) = jobs.get_mut(&job_id) {
            if entry.state.is_terminal() {
                return;
            }
            entry.state = state;
            entry.error = error;
            entry.task = None;
        }
    }
}

#[async_trait]
impl PipelineLauncher for LocalLauncher {
    async fn launch(&self, config: LaunchConfig) -> Result<LaunchHandle, LaunchError> {
        let template = self
            .templates
            .get(config.template())
            .map(|t| Arc::clone(t.value()))
            .ok_or_else(|| LaunchError::UnknownTemplate(config.template().to_string()))?;

        for name in template.required_parameters() {
            if config.parameter(name).is_none() {
                return Err(LaunchError::MissingParameter {
                    template: config.template().to_string(),
                    name: (*name).to_string(),
                });
            }
        }

        let job_id = Uuid::new_v4();
        let handle = LaunchHandle {
            job_id,
            job_name: config.job_name().to_string(),
            launched_at: Utc::now(),
        };
        let params = TemplateParams::from(&config);

        self.jobs.insert(
            job_id,
            JobEntry {
                job_name: config.job_name().to_string(),
                state: JobState::Queued,
                error: None,
                task: None,
            },
        );

        let jobs = Arc::clone(&self.jobs);
        let job_name = config.job_name().to_string();
        let task = tokio::spawn(async move {
            if let Some(mut entry) = jobs.get_mut(&job_id) {
                if entry.state.is_terminal() {
                    return;
                }
                entry.state = JobState::Running;
            }

            match template.run(&params).await {
                Ok(()) => {
                    log::info!("job '{job_name}' ({job_id}) succeeded");
                    Self::complete(&jobs, job_id, JobState::Succeeded, None);
                }
                Err(e) => {
                    log::warn!("job '{job_name}' ({job_id}) failed: {e:#}");
                    Self::complete(&jobs, job_id, JobState::Failed, Some(format!("{e:#}")));
                }
            }
        });

        if let Some(mut entry) = self.jobs.get_mut(&job_id) {
            entry.task = Some(task);
        }

        log::info!(
            "launched job '{}' ({job_id}) from template '{}'",
            handle.job_name,
            config.template()
        );
        if log::log_enabled!(log::Level::Debug) {
            let params: serde_json::Map<String, serde_json::Value> = config
                .parameters()
                .map(|(k, v)| (k.to_string(), serde_json::Value::String(v.to_string())))
                .collect();
            log::debug!(
                "job '{}' parameters: {}",
                handle.job_name,
                serde_json::Value::Object(params)
            );
        }
        Ok(handle)
    }

    async fn job_state(&self, handle: &LaunchHandle) -> Result<JobState, LaunchError> {
        self.jobs
            .get(&handle.job_id)
            .map(|entry| entry.state)
            .ok_or(LaunchError::JobNotFound(handle.job_id))
    }

    async fn cancel(&self, handle: &LaunchHandle) -> Result<(), LaunchError> {
        let mut entry = self
            .jobs
            .get_mut(&handle.job_id)
            .ok_or(LaunchError::JobNotFound(handle.job_id))?;

        if entry.state.is_terminal() {
            return Err(LaunchError::AlreadyTerminal {
                job_id: handle.job_id,
                state: entry.state,
            });
        }

        if let Some(task) = entry.task.take() {
            task.abort();
        }
        entry.state = JobState::Cancelled;
        log::info!("cancelled job '{}' ({})", entry.job_name, handle.job_id);
        Ok(())
    }
}
