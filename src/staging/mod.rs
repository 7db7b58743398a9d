//! Artifact staging boundary.
//!
//! Input fixtures are uploaded to a staging location before launch and read
//! back by pipeline templates through the URI returned at upload time.

pub mod local;

pub use local::LocalStagingArea;

use async_trait::async_trait;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StagingError {
    #[error("artifact '{0}' not found in staging area")]
    NotFound(String),

    #[error("invalid staging path '{path}': {reason}")]
    InvalidPath { path: String, reason: String },

    #[error("staging I/O error for '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Stores input artifacts addressable by a generated path.
#[async_trait]
pub trait StagingArea: Send + Sync {
    /// Uploads a local file to `dest_path` and returns the resolved URI.
    async fn upload_artifact(&self, dest_path: &str, local_path: &Path)
        -> Result<String, StagingError>;

    /// Uploads raw bytes to `dest_path` and returns the resolved URI.
    async fn upload_bytes(&self, dest_path: &str, content: &[u8]) -> Result<String, StagingError>;

    /// Resolves a staging path to the URI a pipeline run receives as input.
    fn resolve_path(&self, dest_path: &str) -> String;

    /// Reads back a previously uploaded artifact by its URI.
    async fn read(&self, uri: &str) -> Result<Vec<u8>, StagingError>;

    /// Removes everything staged under this area.
    async fn purge(&self) -> Result<(), StagingError>;
}
