//! The test environment composing stager, provisioner, launcher, and monitor.
//!
//! One environment backs one test run: stage input → provision table →
//! launch job → poll to completion → read back → assert → always tear down.

use std::path::Path;
use std::sync::Arc;

use crate::config::HarnessConfig;
use crate::context::RunContext;
use crate::error::HarnessError;
use crate::launcher::{LaunchConfig, LaunchHandle, LocalLauncher, PipelineLauncher, Template};
use crate::lifecycle::ManagedTable;
use crate::operator::{PipelineOperator, RunResult};
use crate::staging::{LocalStagingArea, StagingArea};
use crate::storage::{InMemoryTableManager, RowRecord, TableManager};

/// Overall lifecycle of one test run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Setup,
    Running,
    Terminal,
    TornDown,
}

pub struct TemplateTestEnvironment {
    context: RunContext,
    config: HarnessConfig,
    staging: Arc<dyn StagingArea>,
    tables: Arc<dyn TableManager>,
    launcher: Arc<dyn PipelineLauncher>,
    local_launcher: Option<Arc<LocalLauncher>>,
    operator: PipelineOperator,
    managed: Vec<ManagedTable>,
    phase: Phase,
}

impl TemplateTestEnvironment {
    /// Builds an environment over caller-provided collaborator
    /// implementations.
    pub fn new(
        config: HarnessConfig,
        staging: Arc<dyn StagingArea>,
        tables: Arc<dyn TableManager>,
        launcher: Arc<dyn PipelineLauncher>,
    ) -> Result<Self, HarnessError> {
        config
            .validate()
            .map_err(|e| HarnessError::setup("validating configuration", e))?;

        let context = RunContext::generate(&config);
        log::info!("test environment '{}' initializing", context.run_name);

        let operator = PipelineOperator::new(Arc::clone(&launcher));
        Ok(Self {
            context,
            config,
            staging,
            tables,
            launcher,
            local_launcher: None,
            operator,
            managed: Vec::new(),
            phase: Phase::Setup,
        })
    }

    /// Builds an environment wired to the in-process collaborators: a
    /// filesystem staging area, an in-memory table store, and the local
    /// launcher (templates are registered via
    /// [`register_template`](Self::register_template)).
    pub fn local(config: HarnessConfig) -> Result<Self, HarnessError> {
        config
            .validate()
            .map_err(|e| HarnessError::setup("validating configuration", e))?;

        let context = RunContext::generate(&config);
        let staging_root = config
            .staging_root
            .clone()
            .unwrap_or_else(std::env::temp_dir)
            .join("gantry-staging")
            .join(&context.run_name);

        let staging: Arc<dyn StagingArea> = Arc::new(LocalStagingArea::new(staging_root));
        let tables: Arc<dyn TableManager> = Arc::new(InMemoryTableManager::new());
        let local_launcher = Arc::new(LocalLauncher::new());
        let launcher: Arc<dyn PipelineLauncher> = Arc::clone(&local_launcher) as Arc<dyn PipelineLauncher>;
        let operator = PipelineOperator::new(Arc::clone(&launcher));

        log::info!("local test environment '{}' initialized", context.run_name);
        Ok(Self {
            context,
            config,
            staging,
            tables,
            launcher,
            local_launcher: Some(local_launcher),
            operator,
            managed: Vec::new(),
            phase: Phase::Setup,
        })
    }

    pub fn context(&self) -> &RunContext {
        &self.context
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn staging(&self) -> &Arc<dyn StagingArea> {
        &self.staging
    }

    pub fn tables(&self) -> &Arc<dyn TableManager> {
        &self.tables
    }

    pub fn launcher(&self) -> &Arc<dyn PipelineLauncher> {
        &self.launcher
    }

    /// Registers a template with the local launcher. Only valid for
    /// environments built with [`local`](Self::local).
    pub fn register_template(
        &self,
        name: &str,
        template: Arc<dyn Template>,
    ) -> Result<(), HarnessError> {
        match &self.local_launcher {
            Some(launcher) => {
                launcher.register_template(name, template);
                Ok(())
            }
            None => Err(HarnessError::setup(
                "registering template",
                anyhow::anyhow!("environment was built over an external launcher"),
            )),
        }
    }

    /// Uploads a local fixture file into this run's staging area and returns
    /// the URI a launch parameter should carry.
    pub async fn stage_artifact(
        &self,
        dest_path: &str,
        local_path: &Path,
    ) -> Result<String, HarnessError> {
        self.staging
            .upload_artifact(dest_path, local_path)
            .await
            .map_err(|e| HarnessError::setup("staging artifact", e))
    }

    /// Uploads raw fixture bytes into this run's staging area.
    pub async fn stage_bytes(&self, dest_path: &str, content: &[u8]) -> Result<String, HarnessError> {
        self.staging
            .upload_bytes(dest_path, content)
            .await
            .map_err(|e| HarnessError::setup("staging artifact", e))
    }

    /// Provisions a table under a run-unique id and registers it for
    /// teardown. Returns the generated table id.
    pub async fn provision_table(&mut self, families: &[&str]) -> Result<String, HarnessError> {
        let table_id = self.context.table_id();
        let guard = ManagedTable::acquire(
            Arc::clone(&self.tables),
            &table_id,
            families,
            self.config.cleanup_policy,
        )
        .await
        .map_err(|e| HarnessError::setup("provisioning table", e))?;

        self.managed.push(guard);
        Ok(table_id)
    }

    /// Submits the run. Table provisioning strictly precedes launch;
    /// launch strictly precedes read-back.
    pub async fn launch(&mut self, config: LaunchConfig) -> Result<LaunchHandle, HarnessError> {
        let handle = self.launcher.launch(config).await?;
        self.transition(Phase::Running);
        Ok(handle)
    }

    /// Polls the launched job to a terminal state within the configured
    /// budget.
    pub async fn wait_until_done(
        &mut self,
        handle: &LaunchHandle,
    ) -> Result<RunResult, HarnessError> {
        let result = self
            .operator
            .wait_until_done(handle, &self.config.poll_config())
            .await?;
        self.transition(Phase::Terminal);
        Ok(result)
    }

    pub async fn read_table(&self, table_id: &str) -> Result<Vec<RowRecord>, HarnessError> {
        self.tables
            .read_table(table_id)
            .await
            .map_err(|e| HarnessError::setup("reading back table", e))
    }

    /// Releases every provisioned resource. Runs on every exit path and is
    /// safe to call repeatedly; only `CleanupPolicy::Fail` can surface an
    /// error, and even then every resource gets a release attempt first.
    pub async fn teardown(&mut self) -> Result<(), HarnessError> {
        if self.phase == Phase::TornDown {
            return Ok(());
        }

        // Guards release independently, so a slow or failing one never
        // blocks the others from getting their cleanup attempt.
        let results =
            futures::future::join_all(self.managed.iter_mut().map(ManagedTable::release)).await;
        let mut first_err = None;
        for result in results {
            if let Err(e) = result {
                log::error!("teardown: {e}");
                first_err.get_or_insert(e);
            }
        }

        if let Err(e) = self.staging.purge().await {
            // Staged fixtures are scratch data; never fail a run over them.
            log::warn!("teardown: failed to purge staging area: {e}");
        }

        match first_err {
            Some(e) => Err(e),
            None => {
                self.transition(Phase::TornDown);
                log::info!("test environment '{}' torn down", self.context.run_name);
                Ok(())
            }
        }
    }

    fn transition(&mut self, next: Phase) {
        if self.phase != next {
            log::debug!(
                "run '{}' phase {:?} -> {next:?}",
                self.context.run_name,
                self.phase
            );
            self.phase = next;
        }
    }
}

impl Drop for TemplateTestEnvironment {
    fn drop(&mut self) {
        if self.phase != Phase::TornDown {
            log::warn!(
                "test environment '{}' dropped in phase {:?} without teardown",
                self.context.run_name,
                self.phase
            );
        }
    }
}
