//! Terminal-state polling behavior: bounded timeouts, failed runs surfacing
//! as terminal results, and launch-time rejection of bad submissions.

#![cfg(feature = "test-harness")]

use std::time::Duration;

use async_trait::async_trait;
use std::sync::Arc;

use gantry::error::HarnessError;
use gantry::launcher::{LaunchError, Template, TemplateParams};
use gantry::{HarnessConfig, JobState, LaunchConfig, TemplateTestEnvironment};

use crate::integration::test_env;

/// Template that never finishes within any test budget.
struct StallingTemplate;

#[async_trait]
impl Template for StallingTemplate {
    async fn run(&self, _params: &TemplateParams) -> anyhow::Result<()> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok(())
    }
}

/// Template that fails partway through its work.
struct ExplodingTemplate;

#[async_trait]
impl Template for ExplodingTemplate {
    async fn run(&self, _params: &TemplateParams) -> anyhow::Result<()> {
        anyhow::bail!("input file is corrupt")
    }
}

fn stalling_env() -> TemplateTestEnvironment {
    let _ = env_logger::try_init();
    let config = HarnessConfig {
        poll_interval_ms: 10,
        // Small budget so the stalled run trips the timeout quickly.
        timeout_secs: 1,
        ..Default::default()
    };
    let env = TemplateTestEnvironment::local(config).unwrap();
    env.register_template("stall", Arc::new(StallingTemplate)).unwrap();
    env
}

#[tokio::test]
async fn test_stalled_run_reports_timeout_instead_of_hanging() {
    let mut env = stalling_env();

    let handle = env
        .launch(LaunchConfig::builder("stalled-run", "stall").build())
        .await
        .unwrap();

    let err = env.wait_until_done(&handle).await.unwrap_err();
    match err {
        HarnessError::Timeout { job_name, timeout } => {
            assert_eq!(job_name, "stalled-run");
            assert_eq!(timeout, Duration::from_secs(1));
        }
        other => panic!("expected Timeout, got {other:?}"),
    }

    // The run is still live after the budget expires; cancel drives it to a
    // terminal state.
    env.launcher().cancel(&handle).await.unwrap();
    assert_eq!(
        env.launcher().job_state(&handle).await.unwrap(),
        JobState::Cancelled
    );

    env.teardown().await.unwrap();
}

#[tokio::test]
async fn test_failed_run_is_a_terminal_result_not_an_error() {
    let mut env = test_env();
    env.register_template("explode", Arc::new(ExplodingTemplate)).unwrap();

    let handle = env
        .launch(LaunchConfig::builder("exploding-run", "explode").build())
        .await
        .unwrap();

    let result = env.wait_until_done(&handle).await.unwrap();
    assert_eq!(result.state, JobState::Failed);
    assert!(!result.is_succeeded());

    env.teardown().await.unwrap();
}

#[tokio::test]
async fn test_unknown_template_is_rejected_at_launch() {
    let mut env = test_env();

    let err = env
        .launch(LaunchConfig::builder("bad-run", "does-not-exist").build())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        HarnessError::Launch(LaunchError::UnknownTemplate(name)) if name == "does-not-exist"
    ));

    env.teardown().await.unwrap();
}

#[tokio::test]
async fn test_missing_required_parameter_is_rejected_at_launch() {
    let mut env = test_env();
    env.register_template(
        gantry::fixtures::TEMPLATE_AVRO_TO_TABLE,
        Arc::new(gantry::fixtures::AvroImportTemplate::new(
            Arc::clone(env.staging()),
            Arc::clone(env.tables()),
        )),
    )
    .unwrap();

    // No tableId or inputFilePattern.
    let err = env
        .launch(
            LaunchConfig::builder("bad-run", gantry::fixtures::TEMPLATE_AVRO_TO_TABLE).build(),
        )
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        HarnessError::Launch(LaunchError::MissingParameter { .. })
    ));

    env.teardown().await.unwrap();
}

#[tokio::test]
async fn test_cancelled_run_surfaces_as_terminal_state() {
    let mut env = stalling_env();

    let handle = env
        .launch(LaunchConfig::builder("cancelled-run", "stall").build())
        .await
        .unwrap();
    env.launcher().cancel(&handle).await.unwrap();

    let result = env.wait_until_done(&handle).await.unwrap();
    assert_eq!(result.state, JobState::Cancelled);

    env.teardown().await.unwrap();
}
