//! Provisioning and teardown semantics: unique table ids, deterministic
//! collision failures, and teardown that runs on every exit path without
//! masking the primary test outcome.

#![cfg(feature = "test-harness")]

use gantry::error::HarnessError;
use gantry::storage::StorageError;

use crate::integration::test_env;

#[tokio::test]
async fn test_teardown_is_idempotent() {
    let mut env = test_env();
    let table_id = env.provision_table(&["family1"]).await.unwrap();
    assert!(env.tables().table_exists(&table_id).await);

    env.teardown().await.unwrap();
    assert!(!env.tables().table_exists(&table_id).await);

    // Re-running teardown must not raise.
    env.teardown().await.unwrap();
}

#[tokio::test]
async fn test_table_collision_fails_deterministically() {
    let mut env = test_env();
    let table_id = env.provision_table(&["family1"]).await.unwrap();

    // A second creation under the same id must fail rather than silently
    // overwrite the existing table.
    let err = env
        .tables()
        .create_table(&table_id, &["family1"])
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::TableAlreadyExists(id) if id == table_id));

    env.teardown().await.unwrap();
}

#[tokio::test]
async fn test_teardown_runs_after_failed_act_phase() {
    let mut env = test_env();
    let table_id = env.provision_table(&["family1"]).await.unwrap();

    // Simulated act-phase failure: launching a template that does not exist.
    let launch = gantry::LaunchConfig::builder("doomed-run", "no-such-template").build();
    let err = env.launch(launch).await.unwrap_err();
    assert!(matches!(err, HarnessError::Launch(_)));

    // The cleanup guarantee holds regardless of the failure above.
    env.teardown().await.unwrap();
    assert!(!env.tables().table_exists(&table_id).await);
}

#[tokio::test]
async fn test_release_tolerates_externally_deleted_table() {
    let mut env = test_env();
    let table_id = env.provision_table(&["family1"]).await.unwrap();

    // Something else cleaned the table up first; release swallows the
    // "already deleted" condition.
    env.tables().delete_table(&table_id).await.unwrap();
    env.teardown().await.unwrap();
}

#[tokio::test]
async fn test_parallel_environments_do_not_collide() {
    let mut env_a = test_env();
    let mut env_b = test_env();

    let table_a = env_a.provision_table(&["family1"]).await.unwrap();
    let table_b = env_b.provision_table(&["family1"]).await.unwrap();

    assert_ne!(env_a.context().run_name, env_b.context().run_name);
    assert_ne!(table_a, table_b);

    env_a.teardown().await.unwrap();
    env_b.teardown().await.unwrap();
}
