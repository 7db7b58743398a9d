use std::path::{Path, PathBuf};

use async_trait::async_trait;

use super::{StagingArea, StagingError};

/// Filesystem-backed staging area. Artifacts live under a root directory and
/// resolve to `file://` URIs, which is what local pipeline templates consume.
#[derive(Debug)]
pub struct LocalStagingArea {
    root: PathBuf,
}

impl LocalStagingArea {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn target_for(&self, dest_path: &str) -> Result<PathBuf, StagingError> {
        let relative = Path::new(dest_path);
        if relative.is_absolute() || dest_path.split('/').any(|seg| seg == "..") {
            return Err(StagingError::InvalidPath {
                path: dest_path.to_string(),
                reason: "staging paths must be relative and must not traverse upward".to_string(),
            });
        }
        Ok(self.root.join(relative))
    }

    fn io_err(path: &Path, source: std::io::Error) -> StagingError {
        StagingError::Io {
            path: path.display().to_string(),
            source,
        }
    }
}

#[async_trait]
impl StagingArea for LocalStagingArea {
    async fn upload_artifact(
        &self,
        dest_path: &str,
        local_path: &Path,
    ) -> Result<String, StagingError> {
        let content = tokio::fs::read(local_path)
            .await
            .map_err(|e| Self::io_err(local_path, e))?;
        self.upload_bytes(dest_path, &content).await
    }

    async fn upload_bytes(&self, dest_path: &str, content: &[u8]) -> Result<String, StagingError> {
        let target = self.target_for(dest_path)?;
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| Self::io_err(parent, e))?;
        }
        tokio::fs::write(&target, content)
            .await
            .map_err(|e| Self::io_err(&target, e))?;

        log::debug!("staged {} bytes at '{dest_path}'", content.len());
        Ok(self.resolve_path(dest_path))
    }

    fn resolve_path(&self, dest_path: &str) -> String {
        format!("file://{}", self.root.join(dest_path).display())
    }

    async fn read(&self, uri: &str) -> Result<Vec<u8>, StagingError> {
        let path = uri.strip_prefix("file://").unwrap_or(uri);
        match tokio::fs::read(path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StagingError::NotFound(uri.to_string()))
            }
            Err(e) => Err(Self::io_err(Path::new(path), e)),
        }
    }

    async fn purge(&self) -> Result<(), StagingError> {
        match tokio::fs::remove_dir_all(&self.root).await {
            Ok(()) => Ok(()),
            // Purging an empty area is a no-op, same as release on a
            // deleted table.
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Self::io_err(&self.root, e)),
        }
    }
}
