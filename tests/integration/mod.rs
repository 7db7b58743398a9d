//! Integration tests for the gantry harness.
//!
//! This module contains end-to-end tests that drive the complete
//! stage → provision → launch → poll → assert → teardown cycle against the
//! in-process collaborators. These tests require the `test-harness` feature
//! to be enabled.
//!
//! ## Test Organization
//!
//! - **avro_import**: staging an Avro fixture, running the import template,
//!   and asserting the read-back rows
//! - **life_cycle**: provisioning, collision handling, and teardown semantics
//! - **run_monitor**: terminal-state polling, timeouts, and launch rejection
//!
//! ## Running Integration Tests
//!
//! ```bash
//! cargo test --features test-harness
//! ```

pub mod avro_import;
pub mod life_cycle;
pub mod run_monitor;

use gantry::{HarnessConfig, TemplateTestEnvironment};

/// Environment with poll settings tight enough for fast test turnaround.
pub fn test_env() -> TemplateTestEnvironment {
    let _ = env_logger::try_init();
    let config = HarnessConfig {
        poll_interval_ms: 10,
        timeout_secs: 10,
        ..Default::default()
    };
    TemplateTestEnvironment::local(config).expect("failed to build local test environment")
}
