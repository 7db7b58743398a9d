use std::time::Duration;
use thiserror::Error;

use crate::asserts::RecordMismatch;
use crate::launcher::LaunchError;

/// Top-level failure taxonomy for a harness run.
///
/// Setup, launch, timeout, and assertion failures abort the test immediately.
/// Cleanup failures are surfaced only under `CleanupPolicy::Fail`; otherwise
/// they are logged so they never mask the primary failure cause.
#[derive(Debug, Error)]
pub enum HarnessError {
    #[error("setup failed while {stage}: {source}")]
    Setup {
        stage: &'static str,
        #[source]
        source: anyhow::Error,
    },

    #[error("launch rejected: {0}")]
    Launch(#[from] LaunchError),

    #[error("job '{job_name}' did not reach a terminal state within {timeout:?}")]
    Timeout { job_name: String, timeout: Duration },

    #[error("record assertion failed: {0}")]
    Assertion(#[from] RecordMismatch),

    #[error("cleanup of {resource} failed: {message}")]
    Cleanup { resource: String, message: String },
}

impl HarnessError {
    pub fn setup(stage: &'static str, source: impl Into<anyhow::Error>) -> Self {
        HarnessError::Setup {
            stage,
            source: source.into(),
        }
    }

    /// Whether this failure occurred before the act phase.
    pub fn is_setup(&self) -> bool {
        matches!(self, HarnessError::Setup { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::StorageError;

    #[test]
    fn test_setup_error_display_names_stage() {
        let err = HarnessError::setup(
            "staging artifact",
            StorageError::TableNotFound("t1".to_string()),
        );
        let message = err.to_string();
        assert!(message.contains("setup failed while staging artifact"));
        assert!(message.contains("t1"));
    }

    #[test]
    fn test_timeout_error_display() {
        let err = HarnessError::Timeout {
            job_name: "import-job".to_string(),
            timeout: Duration::from_secs(30),
        };
        assert_eq!(
            err.to_string(),
            "job 'import-job' did not reach a terminal state within 30s"
        );
    }

    #[test]
    fn test_launch_error_converts() {
        let err: HarnessError = LaunchError::UnknownTemplate("no-such".to_string()).into();
        match err {
            HarnessError::Launch(LaunchError::UnknownTemplate(name)) => {
                assert_eq!(name, "no-such");
            }
            other => panic!("expected Launch variant, got {other:?}"),
        }
    }

    #[test]
    fn test_storage_error_wraps_as_setup() {
        let err = HarnessError::setup(
            "provisioning table",
            StorageError::TableAlreadyExists("dup".to_string()),
        );
        assert!(err.is_setup());
        assert!(err.to_string().contains("provisioning table"));
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<HarnessError>();
    }
}
